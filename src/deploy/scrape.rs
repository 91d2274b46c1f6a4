use serde::{Deserialize, Serialize};
use std::fmt;

/// Convention for locating a published identifier in stage output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "marker", rename_all = "kebab-case")]
pub enum ScrapeStrategy {
    /// A line starting with a fixed label, e.g. `New site object ID: 0xabc`
    LabeledPrefix(String),
    /// A whitespace-delimited token starting with a scheme, e.g. `ipfs://bafy...`;
    /// the identifier is the part after the scheme
    SchemeToken(String),
}

impl ScrapeStrategy {
    pub fn labeled(marker: impl Into<String>) -> Self {
        ScrapeStrategy::LabeledPrefix(marker.into())
    }

    pub fn scheme(scheme: impl Into<String>) -> Self {
        ScrapeStrategy::SchemeToken(scheme.into())
    }

    /// First non-empty match in `output`, scanning line by line.
    pub fn find(&self, output: &str) -> Option<String> {
        output.lines().find_map(|line| self.match_line(line.trim()))
    }

    fn match_line(&self, line: &str) -> Option<String> {
        match self {
            ScrapeStrategy::LabeledPrefix(marker) => {
                let marker = marker.trim();
                line.strip_prefix(marker)
                    .map(str::trim)
                    .filter(|rest| !rest.is_empty())
                    .map(str::to_string)
            }
            ScrapeStrategy::SchemeToken(scheme) => line.split_whitespace().find_map(|token| {
                let token = token.trim_start_matches(['"', '\'', '(', '<', '[']);
                token
                    .strip_prefix(scheme.as_str())
                    .map(|rest| {
                        rest.trim_end_matches(['"', '\'', ')', '>', ']', ',', '.', ';'])
                    })
                    .filter(|rest| !rest.is_empty())
                    .map(str::to_string)
            }),
        }
    }
}

impl fmt::Display for ScrapeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrapeStrategy::LabeledPrefix(marker) => write!(f, "labeled-prefix({:?})", marker),
            ScrapeStrategy::SchemeToken(scheme) => write!(f, "scheme-token({:?})", scheme),
        }
    }
}

/// Tries each strategy in order and returns the first that yields an identifier.
pub fn scrape_identifier<'a>(
    output: &str,
    strategies: &'a [ScrapeStrategy],
) -> Option<(&'a ScrapeStrategy, String)> {
    strategies
        .iter()
        .find_map(|strategy| strategy.find(output).map(|id| (strategy, id)))
}
