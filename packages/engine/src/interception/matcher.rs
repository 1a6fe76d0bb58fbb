// packages/engine/src/interception/matcher.rs
//! Host-matching rule for rewritable URLs
//!
//! Recognizes `http://` or `https://` followed by a host that ends in one of
//! a fixed set of domain suffixes. Matching is not anchored: the rule finds
//! URLs inside arbitrary text, such as a JSON payload, as well as bare URLs.

use crate::utils::errors::{EngineError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use std::sync::Arc;

/// Domain suffixes whose URLs are eligible for rewriting
pub const RECOGNIZED_SUFFIXES: &[&str] = &["hoyoverse.com", "mihoyo.com", "bhsr.com"];

/// Characters a host may contain; anything else ends it
const HOST_CHARS: &str = r"[A-Za-z0-9._-]";

static RECOGNIZED: Lazy<Arc<MatchRule>> = Lazy::new(|| {
    Arc::new(
        MatchRule::with_suffixes(RECOGNIZED_SUFFIXES.iter().copied())
            .expect("built-in suffix rule must compile"),
    )
});

/// Byte range of a recognized `scheme://host` inside a candidate string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSpan {
    pub start: usize,
    pub end: usize,
}

impl MatchSpan {
    /// The matched text
    pub fn as_str<'a>(&self, haystack: &'a str) -> &'a str {
        &haystack[self.start..self.end]
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Compiled host-matching rule
#[derive(Debug)]
pub struct MatchRule {
    regex: Regex,
    suffixes: Vec<String>,
}

impl MatchRule {
    /// Process-wide rule for the built-in suffixes
    pub fn recognized() -> Arc<MatchRule> {
        Arc::clone(&RECOGNIZED)
    }

    /// Compile a rule for the given domain suffixes
    ///
    /// Suffixes are compared case-sensitively against the end of the host
    /// and must cover whole labels: `mihoyo.com` matches `api.mihoyo.com`
    /// and `mihoyo.com`, but not `notmihoyo.com`.
    pub fn with_suffixes<I, S>(suffixes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let suffixes: Vec<String> = suffixes
            .into_iter()
            .map(|s| s.as_ref().trim_start_matches('.').to_string())
            .collect();

        if suffixes.is_empty() || suffixes.iter().any(|s| s.is_empty()) {
            return Err(EngineError::ConfigError(
                "match rule needs at least one non-empty domain suffix".to_string(),
            ));
        }

        let alternatives = suffixes
            .iter()
            .map(|s| regex::escape(s))
            .collect::<Vec<_>>()
            .join("|");

        let pattern = format!(r"https?://(?:{HOST_CHARS}*\.)?(?:{alternatives})");
        let regex = Regex::new(&pattern)?;

        Ok(Self { regex, suffixes })
    }

    /// Domain suffixes this rule recognizes
    pub fn suffixes(&self) -> &[String] {
        &self.suffixes
    }

    /// All recognized spans in `candidate`, left to right
    ///
    /// `None` means the candidate contains nothing to rewrite.
    pub fn matches(&self, candidate: &str) -> Option<Vec<MatchSpan>> {
        let spans: Vec<MatchSpan> = self.spans(candidate).collect();
        if spans.is_empty() {
            None
        } else {
            Some(spans)
        }
    }

    /// Whether `candidate` contains at least one recognized span
    pub fn is_match(&self, candidate: &str) -> bool {
        self.spans(candidate).next().is_some()
    }

    /// Replace every recognized span with `replacement`, taken literally
    pub fn replace_all<'a>(&self, candidate: &'a str, replacement: &str) -> Cow<'a, str> {
        let mut spans = self.spans(candidate).peekable();
        if spans.peek().is_none() {
            return Cow::Borrowed(candidate);
        }

        let mut output = String::with_capacity(candidate.len() + replacement.len());
        let mut last = 0;
        for span in spans {
            output.push_str(&candidate[last..span.start]);
            output.push_str(replacement);
            last = span.end;
        }
        output.push_str(&candidate[last..]);

        Cow::Owned(output)
    }

    fn spans<'a>(&'a self, candidate: &'a str) -> impl Iterator<Item = MatchSpan> + 'a {
        self.regex
            .find_iter(candidate)
            .filter(move |m| !continues_hostname(candidate, m.end()))
            .map(|m| MatchSpan {
                start: m.start(),
                end: m.end(),
            })
    }
}

/// True when the byte at `pos` would extend the host past the suffix
///
/// Must accept exactly the bytes `HOST_CHARS` does.
fn continues_hostname(haystack: &str, pos: usize) -> bool {
    haystack
        .as_bytes()
        .get(pos)
        .is_some_and(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_'))
}
