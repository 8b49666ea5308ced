//! Placeholder substitution over text runs
//!
//! A token only matches when its full text sits inside a single run. Tokens
//! that the template editor split across runs (e.g. because part of the token
//! is bold) are left untouched, as are tokens with no entry in the map.

use serde::{Deserialize, Serialize};

use crate::preparer::SubstitutionMap;

/// Delimiters wrapped around each map key to form the literal template token.
///
/// The default is the bare key (`NOME_DONATARIO`); templates written as
/// `<<NOME_DONATARIO>>` use `open = "<<"`, `close = ">>"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenStyle {
    #[serde(default)]
    pub open: String,
    #[serde(default)]
    pub close: String,
}

impl TokenStyle {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }

    pub fn token(&self, key: &str) -> String {
        format!("{}{}{}", self.open, key, self.close)
    }
}

/// Literal token → replacement pairs, longest token first
#[derive(Debug, Clone)]
pub struct Substitutions {
    pairs: Vec<(String, String)>,
}

impl Substitutions {
    pub fn new(map: &SubstitutionMap, style: &TokenStyle) -> Self {
        let mut pairs: Vec<(String, String)> = map
            .iter()
            .filter(|(key, _)| !key.is_empty())
            .map(|(key, value)| (style.token(key), value.clone()))
            .collect();
        // Longest first so no token can eat part of a longer one
        pairs.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        Self { pairs }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Replace every token found in one run's text.
    ///
    /// Returns `None` when the run contains no token.
    pub fn apply(&self, text: &str) -> Option<String> {
        let mut out: Option<String> = None;
        for (token, value) in &self.pairs {
            let current = out.as_deref().unwrap_or(text);
            if current.contains(token.as_str()) {
                out = Some(current.replace(token.as_str(), value));
            }
        }
        out
    }

    /// Substitute in place across a sequence of runs; returns the number of runs changed
    pub fn apply_runs(&self, runs: &mut [String]) -> usize {
        let mut changed = 0;
        for run in runs.iter_mut() {
            if let Some(replaced) = self.apply(run) {
                *run = replaced;
                changed += 1;
            }
        }
        changed
    }
}
