//! Remote playlist sources
//!
//! - the source list (`<url> <region>` per line)
//! - the [`fetcher::SourceFetcher`] seam used to retrieve playlist text
//! - the EXTINF entry parser in [`m3u`]

use std::path::Path;
use tracing::{debug, warn};

use crate::errors::AppResult;
use crate::models::Source;

pub mod fetcher;
pub mod m3u;

pub use fetcher::{HttpSourceFetcher, SourceFetcher};
pub use m3u::{EntryParser, parse_playlist};

/// Parse the source list. Blank lines and `#` comments are skipped, as are
/// lines that do not carry both a URL and a region.
pub fn parse_sources(text: &str) -> Vec<Source> {
    let mut sources = Vec::new();

    for (line_num, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut parts = line.splitn(2, char::is_whitespace);
        let url = parts.next().unwrap_or_default();
        let region = parts.next().map(str::trim).unwrap_or_default();

        if url.is_empty() || region.is_empty() {
            warn!(
                "Skipping malformed source line {}: '{}' (expected '<url> <region>')",
                line_num + 1,
                line
            );
            continue;
        }

        sources.push(Source::new(url, region));
    }

    debug!("Parsed {} sources", sources.len());
    sources
}

/// Read and parse the source list from disk
pub async fn load_sources(path: &Path) -> AppResult<Vec<Source>> {
    let text = tokio::fs::read_to_string(path).await?;
    Ok(parse_sources(&text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sources_skips_comments_and_blank_lines() {
        let text = "\
# mainland sources
http://a.example/list.m3u 中国大陆

https://b.example/hk.m3u\t中国香港
   # indented comment
";
        let sources = parse_sources(text);
        assert_eq!(
            sources,
            vec![
                Source::new("http://a.example/list.m3u", "中国大陆"),
                Source::new("https://b.example/hk.m3u", "中国香港"),
            ]
        );
    }

    #[test]
    fn test_parse_sources_skips_lines_without_region() {
        let sources = parse_sources("http://a.example/list.m3u\nhttp://b.example/x.m3u 国际频道\n");
        assert_eq!(sources, vec![Source::new("http://b.example/x.m3u", "国际频道")]);
    }

    #[test]
    fn test_parse_sources_keeps_file_order() {
        let sources = parse_sources("http://z.example 中国台湾\nhttp://a.example 中国台湾\n");
        assert_eq!(sources[0].url, "http://z.example");
        assert_eq!(sources[1].url, "http://a.example");
    }

    #[tokio::test]
    async fn test_load_sources_missing_file_is_error() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(load_sources(&dir.path().join("absent.txt")).await.is_err());
    }
}
