//! crates/nexus_core/src/scores.rs
//!
//! Pure extraction of the three optimization scores out of the provider's
//! free-form report text. The analysis persona asks the model to close its
//! response with a delimited block:
//!
//! ```text
//! [SCORES]
//! SEO: <int>
//! AEO: <int>
//! GEO: <int>
//! [/SCORES]
//! ```
//!
//! Extraction is tolerant: each name is searched independently, the first
//! match wins, and a missing name reads as `0` rather than an error. No
//! range check is applied; an out-of-range integer passes through unchanged.

use std::sync::LazyLock;

use regex::Regex;

static SEO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"SEO:\s*(\d+)").expect("Invalid regex"));
static AEO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"AEO:\s*(\d+)").expect("Invalid regex"));
static GEO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"GEO:\s*(\d+)").expect("Invalid regex"));

/// The three scores scraped from one report. `0` means "not found" as far as
/// callers are concerned; a legitimately reported zero is indistinguishable
/// from an absent score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreSet {
    pub seo: u32,
    pub aeo: u32,
    pub geo: u32,
}

impl ScoreSet {
    /// Whether every score was actually present in the report.
    pub fn is_complete(&self) -> bool {
        self.seo != 0 && self.aeo != 0 && self.geo != 0
    }
}

/// Scrapes the first `SEO:`, `AEO:` and `GEO:` integers out of `text`.
/// Names are case-sensitive; surrounding whitespace is arbitrary. An integer
/// too large for `u32` degrades to the same `0` as an absent score.
pub fn extract_scores(text: &str) -> ScoreSet {
    ScoreSet {
        seo: first_int(&SEO_RE, text),
        aeo: first_int(&AEO_RE, text),
        geo: first_int(&GEO_RE, text),
    }
}

fn first_int(re: &Regex, text: &str) -> u32 {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}
