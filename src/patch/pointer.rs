//! JSON Pointer (RFC 6901)
//!
//! A pointer is a sequence of reference tokens. The empty pointer `""`
//! addresses the whole document; `"/a/0"` addresses element 0 of member `a`.
//! Tokens are stored unescaped; `~1` and `~0` are restored on display.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::PointerError;

/// A parsed JSON pointer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JsonPointer(Vec<String>);

impl JsonPointer {
    /// The pointer to the whole document.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Parse a pointer string.
    pub fn parse(text: &str) -> Result<Self, PointerError> {
        if text.is_empty() {
            return Ok(Self::root());
        }
        let Some(rest) = text.strip_prefix('/') else {
            return Err(PointerError::new(text, "must be empty or start with '/'"));
        };

        let mut tokens = Vec::new();
        for raw in rest.split('/') {
            tokens.push(unescape(raw).ok_or_else(|| {
                PointerError::new(text, "'~' must be followed by '0' or '1'")
            })?);
        }
        Ok(Self(tokens))
    }

    /// Returns the unescaped reference tokens.
    pub fn tokens(&self) -> &[String] {
        &self.0
    }

    /// True for the whole-document pointer.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Pointer to a named member below this one.
    pub fn key(&self, token: impl Into<String>) -> Self {
        let mut tokens = self.0.clone();
        tokens.push(token.into());
        Self(tokens)
    }

    /// Pointer to an array element below this one.
    pub fn index(&self, index: usize) -> Self {
        self.key(index.to_string())
    }

    /// Splits off the last token, returning the parent pointer and that token.
    pub fn split_last(&self) -> Option<(JsonPointer, &str)> {
        let (last, parent) = self.0.split_last()?;
        Some((Self(parent.to_vec()), last.as_str()))
    }

    /// True when `other` lies strictly inside the subtree addressed by `self`.
    pub fn is_proper_prefix_of(&self, other: &JsonPointer) -> bool {
        self.0.len() < other.0.len() && other.0.starts_with(&self.0)
    }

    /// Looks up the addressed value.
    pub fn resolve<'a>(&self, doc: &'a Value) -> Option<&'a Value> {
        let mut current = doc;
        for token in &self.0 {
            current = match current {
                Value::Object(map) => map.get(token)?,
                Value::Array(items) => items.get(array_index(token, items.len(), false)?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Looks up the addressed value mutably.
    pub fn resolve_mut<'a>(&self, doc: &'a mut Value) -> Option<&'a mut Value> {
        let mut current = doc;
        for token in &self.0 {
            current = match current {
                Value::Object(map) => map.get_mut(token)?,
                Value::Array(items) => {
                    let index = array_index(token, items.len(), false)?;
                    items.get_mut(index)?
                }
                _ => return None,
            };
        }
        Some(current)
    }
}

/// Interprets an array reference token.
///
/// Accepts `0` or digits without a leading zero. With `allow_end`, `-` and
/// `len` address the slot past the last element (insertion point for `add`).
pub(crate) fn array_index(token: &str, len: usize, allow_end: bool) -> Option<usize> {
    if token == "-" {
        return allow_end.then_some(len);
    }
    if token.is_empty()
        || !token.bytes().all(|b| b.is_ascii_digit())
        || (token.len() > 1 && token.starts_with('0'))
    {
        return None;
    }
    let index: usize = token.parse().ok()?;
    let bound = if allow_end { len + 1 } else { len };
    (index < bound).then_some(index)
}

fn unescape(raw: &str) -> Option<String> {
    if !raw.contains('~') {
        return Some(raw.to_string());
    }
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '~' {
            match chars.next() {
                Some('0') => out.push('~'),
                Some('1') => out.push('/'),
                _ => return None,
            }
        } else {
            out.push(c);
        }
    }
    Some(out)
}

impl fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.0 {
            write!(f, "/{}", token.replace('~', "~0").replace('/', "~1"))?;
        }
        Ok(())
    }
}

impl TryFrom<String> for JsonPointer {
    type Error = PointerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<JsonPointer> for String {
    fn from(pointer: JsonPointer) -> Self {
        pointer.to_string()
    }
}
