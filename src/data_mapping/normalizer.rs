//! Flagship channel family name normalization
//!
//! `CCTV1`, `CCTV-01`, `cctv_1 综合` and `CCTV 1` all become `CCTV-1`. The
//! configured "+" variants (by default only 5) keep their suffix, so `CCTV5+`
//! and `CCTV5＋` become `CCTV-5+` rather than collapsing into `CCTV-5`.
//! Trailing descriptions are dropped except regional feed qualifiers, so
//! `CCTV-4 欧洲` stays apart from `CCTV-4` as `CCTV-4 欧洲`. Names outside the
//! family, or whose number runs into a letter (`CCTV-4K`), pass through.

use regex::Regex;

use crate::errors::{AppError, AppResult};

const DEFAULT_MARKER: &str = "CCTV";
const DEFAULT_PLUS_VARIANTS: &[u32] = &[5];
const DEFAULT_REGIONAL_QUALIFIERS: &[&str] = &["欧洲", "美洲"];

#[derive(Debug, Clone)]
pub struct NameNormalizer {
    marker: String,
    plus_variants: Vec<u32>,
    regional_qualifiers: Vec<String>,
    pattern: Regex,
}

impl NameNormalizer {
    pub fn new(marker: &str, plus_variants: &[u32]) -> AppResult<Self> {
        let marker = marker.trim().to_uppercase();
        if marker.is_empty() {
            return Err(AppError::configuration("flagship marker must not be empty"));
        }
        let pattern = Regex::new(&format!(
            r"(?i)^{}[\s\-_]*(\d{{1,3}})([+＋])?($|[^0-9A-Za-z].*)",
            regex::escape(&marker)
        ))
        .map_err(|e| AppError::internal(format!("Invalid normalizer pattern: {e}")))?;

        Ok(Self {
            marker,
            plus_variants: plus_variants.to_vec(),
            regional_qualifiers: Vec::new(),
            pattern,
        })
    }

    /// Trailing words that mark a separate regional feed of the same number
    pub fn with_regional_qualifiers<I, S>(mut self, qualifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.regional_qualifiers = qualifiers.into_iter().map(Into::into).collect();
        self
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn normalize(&self, name: &str) -> String {
        let trimmed = name.trim();
        if !trimmed.to_uppercase().contains(&self.marker) {
            return trimmed.to_string();
        }

        let Some(caps) = self.pattern.captures(trimmed) else {
            return trimmed.to_string();
        };
        let Ok(number) = caps[1].parse::<u32>() else {
            return trimmed.to_string();
        };

        let mut canonical = if caps.get(2).is_some() && self.plus_variants.contains(&number) {
            format!("{}-{}+", self.marker, number)
        } else {
            format!("{}-{}", self.marker, number)
        };

        let rest = &caps[3];
        if let Some(qualifier) = self
            .regional_qualifiers
            .iter()
            .find(|q| rest.contains(q.as_str()))
        {
            canonical.push(' ');
            canonical.push_str(qualifier);
        }
        canonical
    }
}

impl Default for NameNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER, DEFAULT_PLUS_VARIANTS)
            .unwrap_or_else(|e| unreachable!("built-in normalizer pattern is valid: {e}"))
            .with_regional_qualifiers(DEFAULT_REGIONAL_QUALIFIERS.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(name: &str) -> String {
        NameNormalizer::default().normalize(name)
    }

    #[test]
    fn test_collapses_number_spellings() {
        for name in ["CCTV1", "CCTV-1", "CCTV-01", "CCTV 1", "cctv_01", "CCTV-001"] {
            assert_eq!(normalize(name), "CCTV-1", "input {name}");
        }
        assert_eq!(normalize("CCTV-05"), "CCTV-5");
        assert_eq!(normalize("CCTV17"), "CCTV-17");
    }

    #[test]
    fn test_drops_trailing_description() {
        assert_eq!(normalize("CCTV-1 综合"), "CCTV-1");
        assert_eq!(normalize("CCTV13新闻"), "CCTV-13");
        assert_eq!(normalize("CCTV-16 4K"), "CCTV-16");
    }

    #[test]
    fn test_plus_variant_is_kept_distinct() {
        assert_eq!(normalize("CCTV5+"), "CCTV-5+");
        assert_eq!(normalize("CCTV-05+ 体育赛事"), "CCTV-5+");
        assert_ne!(normalize("CCTV5+"), normalize("CCTV5"));
    }

    #[test]
    fn test_full_width_plus_matches_ascii_plus() {
        assert_eq!(normalize("CCTV-5＋"), "CCTV-5+");
        assert_eq!(normalize("CCTV05＋ 赛事"), "CCTV-5+");
        assert_eq!(normalize("CCTV-5＋"), normalize("CCTV5+"));
    }

    #[test]
    fn test_regional_feeds_stay_distinct() {
        assert_eq!(normalize("CCTV-4 欧洲"), "CCTV-4 欧洲");
        assert_eq!(normalize("CCTV4美洲"), "CCTV-4 美洲");
        assert_eq!(normalize("CCTV-04 中文国际 欧洲"), "CCTV-4 欧洲");
        assert_ne!(normalize("CCTV-4 欧洲"), normalize("CCTV-4 美洲"));
        assert_eq!(normalize("CCTV-4 中文国际"), "CCTV-4");
    }

    #[test]
    fn test_no_qualifiers_drops_every_description() {
        let normalizer = NameNormalizer::new("CCTV", &[5]).unwrap();
        assert_eq!(normalizer.normalize("CCTV-4 欧洲"), "CCTV-4");
    }

    #[test]
    fn test_plus_on_other_numbers_collapses() {
        assert_eq!(normalize("CCTV-1+"), "CCTV-1");
    }

    #[test]
    fn test_non_family_names_pass_through() {
        assert_eq!(normalize("凤凰卫视"), "凤凰卫视");
        assert_eq!(normalize("  湖南卫视 "), "湖南卫视");
        assert_eq!(normalize("CCTV-4K"), "CCTV-4K");
        assert_eq!(normalize("CCTV"), "CCTV");
        assert_eq!(normalize("CGTN"), "CGTN");
    }

    #[test]
    fn test_custom_marker() {
        let normalizer = NameNormalizer::new("btv", &[]).unwrap();
        assert_eq!(normalizer.normalize("BTV02"), "BTV-2");
        assert_eq!(normalizer.normalize("BTV5+"), "BTV-5");
        assert_eq!(normalizer.marker(), "BTV");
    }

    #[test]
    fn test_empty_marker_rejected() {
        assert!(NameNormalizer::new("  ", &[5]).is_err());
    }
}
