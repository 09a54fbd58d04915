//! EXTINF playlist entry parser
//!
//! Pairs each `#EXTINF` metadata line with the next stream URL line. The
//! display name is the text after the last comma of the metadata line. A URL
//! with no pending name is dropped, and a name is consumed by the first URL
//! that follows it, so every metadata line yields at most one entry.

use crate::models::RawEntry;

const EXTINF_MARKER: &str = "#EXTINF";
const URL_SCHEMES: &[&str] = &["http://", "https://"];

/// Iterator over the entries of one playlist text
pub struct EntryParser<'a> {
    lines: std::str::Lines<'a>,
    pending_name: Option<String>,
}

impl<'a> EntryParser<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines(),
            pending_name: None,
        }
    }
}

impl Iterator for EntryParser<'_> {
    type Item = RawEntry;

    fn next(&mut self) -> Option<Self::Item> {
        for line in self.lines.by_ref() {
            let line = line.trim();

            if line.starts_with(EXTINF_MARKER) {
                self.pending_name = display_name(line);
            } else if is_stream_url(line) {
                if let Some(name) = self.pending_name.take() {
                    return Some(RawEntry::new(name, line));
                }
            }
        }
        None
    }
}

/// Parse a whole playlist into entries
pub fn parse_playlist(text: &str) -> Vec<RawEntry> {
    EntryParser::new(text).collect()
}

fn display_name(extinf_line: &str) -> Option<String> {
    let (_, name) = extinf_line.rsplit_once(',')?;
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

fn is_stream_url(line: &str) -> bool {
    URL_SCHEMES.iter().any(|scheme| {
        line.get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}
