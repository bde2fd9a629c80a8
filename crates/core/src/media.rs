//! Media types (RFC-7231 `type/subtype;params`).

use std::fmt;

use indexmap::IndexMap;

use crate::error::{Error, Result};

/// A media type: super/subtype plus insertion-ordered parameters. The
/// distinguished `q` parameter ranks candidates during codec selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    pub kind: String,
    pub subtype: String,
    pub parameters: IndexMap<String, String>,
}

impl MediaType {
    #[must_use]
    pub fn new(kind: impl Into<String>, subtype: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            subtype: subtype.into(),
            parameters: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Parse `type/subtype(;key=value)*`. Parameter values may be
    /// quoted (the quotes can carry `;` and `=`); surrounding
    /// whitespace is tolerated.
    pub fn parse(input: &str) -> Result<Self> {
        let mut segments = split_outside_quotes(input.trim());
        let essence = segments
            .next()
            .ok_or_else(|| Error::HeaderParse(input.to_string()))?;
        let (kind, subtype) = essence
            .split_once('/')
            .ok_or_else(|| Error::HeaderParse(format!("invalid media type: {input}")))?;
        let kind = kind.trim();
        let subtype = subtype.trim();
        if kind.is_empty() || subtype.is_empty() {
            return Err(Error::HeaderParse(format!("invalid media type: {input}")));
        }

        let mut parameters = IndexMap::new();
        for segment in segments {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (key, value) = segment
                .split_once('=')
                .ok_or_else(|| Error::HeaderParse(format!("invalid media type parameter: {segment}")))?;
            let value = value.trim().trim_matches('"');
            parameters.insert(key.trim().to_string(), value.to_string());
        }

        Ok(Self {
            kind: kind.to_string(),
            subtype: subtype.to_string(),
            parameters,
        })
    }

    /// Quality value from the `q` parameter; malformed or absent → 1.0.
    #[must_use]
    pub fn quality(&self) -> f32 {
        self.parameters
            .get("q")
            .and_then(|q| q.parse::<f32>().ok())
            .unwrap_or(1.0)
    }

    /// Two media types share an index iff their (type, subtype) pair
    /// matches, parameters aside. Matching is case-insensitive and
    /// honors `*` wildcards on either side.
    #[must_use]
    pub fn same_index(&self, other: &MediaType) -> bool {
        fn part_matches(a: &str, b: &str) -> bool {
            a == "*" || b == "*" || a.eq_ignore_ascii_case(b)
        }
        part_matches(&self.kind, &other.kind) && part_matches(&self.subtype, &other.subtype)
    }

    /// `type/subtype` without parameters.
    #[must_use]
    pub fn essence(&self) -> String {
        format!("{}/{}", self.kind, self.subtype)
    }

    /// Parameter layering for input/output resolution: `defaults`
    /// (lowest precedence) are overlaid with `self`'s parameters, then
    /// `overrides` (highest precedence, the document's own parameters).
    #[must_use]
    pub fn layered(&self, defaults: &IndexMap<String, String>, overrides: &IndexMap<String, String>) -> Self {
        let mut parameters = defaults.clone();
        for (key, value) in &self.parameters {
            parameters.insert(key.clone(), value.clone());
        }
        for (key, value) in overrides {
            parameters.insert(key.clone(), value.clone());
        }
        Self {
            kind: self.kind.clone(),
            subtype: self.subtype.clone(),
            parameters,
        }
    }

    /// Parameter lookup, `q` excluded from codec-visible parameters.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }
}

/// Split on `;` while honoring double quotes.
fn split_outside_quotes(input: &str) -> impl Iterator<Item = &str> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    for (at, c) in input.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                segments.push(&input[start..at]);
                start = at + 1;
            }
            _ => {}
        }
    }
    segments.push(&input[start..]);
    segments.into_iter()
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.subtype)?;
        for (key, value) in &self.parameters {
            write!(f, ";{key}={value}")?;
        }
        Ok(())
    }
}
