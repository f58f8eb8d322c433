//! Find query parsing.
//!
//! A query of the form `/<pattern>/<flags>` is an explicit regular
//! expression. Anything else is a case-insensitive literal substring. Either
//! way the raw query is also tried as a glob (`*.py`, `report-??.pdf`), and a
//! name matches when either side does.
//!
//! Regexes run over the UTF-8 bytes of the name so the `a` flag can drop
//! Unicode mode without rejecting `.` or negated classes.

use crate::error::{EngineError, EngineResult};
use globset::{GlobBuilder, GlobMatcher};
use regex::bytes::{Regex, RegexBuilder};
use tracing::debug;

/// A compiled find query.
#[derive(Debug, Clone)]
pub struct Query {
    raw: String,
    regex: Regex,
    explicit: bool,
    glob: Option<GlobMatcher>,
}

impl Query {
    /// Compile `raw`.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidQuery`] when an explicit `/pattern/flags` regex
    /// does not compile. A query that is not a valid glob simply loses its
    /// glob branch.
    pub fn parse(raw: &str) -> EngineResult<Self> {
        let (regex, explicit) = match split_delimited(raw) {
            Some((pattern, flags)) => (build_regex(raw, pattern, flags)?, true),
            None => {
                let regex = RegexBuilder::new(&regex::escape(raw))
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| invalid(raw, e))?;
                (regex, false)
            }
        };

        let glob = match GlobBuilder::new(raw).literal_separator(true).build() {
            Ok(g) => Some(g.compile_matcher()),
            Err(e) => {
                debug!("Query {raw:?} is not a glob: {e}");
                None
            }
        };

        Ok(Self {
            raw: raw.to_owned(),
            regex,
            explicit,
            glob,
        })
    }

    /// Does a bare entry name satisfy the query?
    pub fn is_match(&self, name: &str) -> bool {
        self.regex.is_match(name.as_bytes())
            || self.glob.as_ref().is_some_and(|g| g.is_match(name))
    }

    /// `true` when the query used the `/pattern/flags` form.
    pub fn is_regex(&self) -> bool {
        self.explicit
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Split `/pattern/flags` into its parts. The pattern runs to the last `/`
/// and must not be empty.
fn split_delimited(raw: &str) -> Option<(&str, &str)> {
    let rest = raw.strip_prefix('/')?;
    let close = rest.rfind('/')?;
    let pattern = &rest[..close];
    if pattern.is_empty() {
        return None;
    }
    Some((pattern, &rest[close + 1..]))
}

/// Flags: `i` case-insensitive, `m` multi-line, `s` dot matches newline,
/// `x` verbose, `a` ASCII-only classes, `u` Unicode classes, `l` accepted
/// and ignored (no locale mode exists). Unknown letters are ignored.
fn build_regex(raw: &str, pattern: &str, flags: &str) -> EngineResult<Regex> {
    let mut builder = RegexBuilder::new(pattern);
    for flag in flags.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            'a' => builder.unicode(false),
            'u' => builder.unicode(true),
            _ => &mut builder,
        };
    }
    builder.build().map_err(|e| invalid(raw, e))
}

fn invalid(raw: &str, err: regex::Error) -> EngineError {
    EngineError::InvalidQuery {
        query: raw.to_owned(),
        message: err.to_string(),
    }
}
