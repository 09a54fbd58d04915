//! Geo / copyright restriction filter

use crate::config::defaults::DEFAULT_BLOCKED_KEYWORDS;

/// Blocks entries whose name or URL mentions a restriction marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentFilter {
    keywords: Vec<String>,
}

impl ContentFilter {
    /// Keywords are matched case-insensitively; blank ones are ignored
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    pub fn is_blocked(&self, name: &str, url: &str) -> bool {
        let text = format!("{name}{url}").to_lowercase();
        self.keywords.iter().any(|k| text.contains(k.as_str()))
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

impl Default for ContentFilter {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCKED_KEYWORDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_keyword_in_name() {
        let filter = ContentFilter::default();
        assert!(filter.is_blocked("凤凰卫视(港澳限定)", "http://s/1.m3u8"));
        assert!(filter.is_blocked("TVB 仅限香港", "http://s/1.m3u8"));
    }

    #[test]
    fn test_blocks_keyword_in_url_case_insensitively() {
        let filter = ContentFilter::default();
        assert!(filter.is_blocked("CCTV-1", "http://cdn.example/GEO/cctv1.m3u8"));
        assert!(filter.is_blocked("CCTV-1", "http://cdn.example/Restricted/1.m3u8"));
    }

    #[test]
    fn test_allows_clean_entries() {
        let filter = ContentFilter::default();
        assert!(!filter.is_blocked("CCTV-1", "http://cdn.example/cctv1.m3u8"));
        assert!(!filter.is_blocked("湖南卫视", "https://cdn.example/hunan.m3u8"));
    }

    #[test]
    fn test_custom_keywords_replace_defaults() {
        let filter = ContentFilter::new(["Trial", "  ", ""]);
        assert_eq!(filter.keywords(), ["trial"]);
        assert!(filter.is_blocked("Free TRIAL", "http://x"));
        assert!(!filter.is_blocked("海外频道", "http://x"));
    }

    #[test]
    fn test_empty_filter_blocks_nothing() {
        let filter = ContentFilter::new(Vec::<String>::new());
        assert!(!filter.is_blocked("geo", "http://block"));
    }
}
