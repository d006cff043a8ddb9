//! Request parameter set.
//!
//! Query-string pairs, form pairs and path captures all land in one ordered
//! multi-map. Lookups by key return the first value, as query strings are
//! conventionally read, while every value stays available via
//! [`Params::get_all`].

use serde::Serialize;

/// Returned when a query string or form body is not valid
/// `application/x-www-form-urlencoded` data.
#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    #[error("invalid percent-encoding at byte {0}")]
    InvalidEscape(usize),

    #[error("percent-decoded data is not valid UTF-8")]
    InvalidUtf8,

    #[error("`;` is not a valid pair separator")]
    Semicolon,

    #[error(transparent)]
    Decode(#[from] serde_urlencoded::de::Error),
}

/// Ordered multi-map of parameter names to string values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Params {
    pairs: Vec<(String, String)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes `a=1&b=2` style input. An empty string yields an empty set.
    pub fn parse(encoded: &str) -> Result<Self, ParamsError> {
        validate(encoded)?;
        let pairs = serde_urlencoded::from_str::<Vec<(String, String)>>(encoded)?;
        Ok(Self { pairs })
    }

    /// First value recorded for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs.iter().filter(move |(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    /// Appends a value, keeping any existing values for `key`.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Replaces every value for `key` with `value`. Other keys are untouched.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.pairs.retain(|(k, _)| *k != key);
        self.pairs.push((key, value.into()));
    }

    pub fn remove(&mut self, key: &str) {
        self.pairs.retain(|(k, _)| k != key);
    }

    /// Appends every pair of `other`, preserving order.
    pub fn extend(&mut self, other: Params) {
        self.pairs.extend(other.pairs);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self { pairs: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }
}

impl IntoIterator for Params {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.into_iter()
    }
}

/// Rejects input that the decoder would otherwise repair silently.
fn validate(encoded: &str) -> Result<(), ParamsError> {
    let bytes = encoded.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b';' => return Err(ParamsError::Semicolon),
            b'%' => {
                let hex = bytes.get(i + 1..i + 3).ok_or(ParamsError::InvalidEscape(i))?;
                let hi = hex_value(hex[0]).ok_or(ParamsError::InvalidEscape(i))?;
                let lo = hex_value(hex[1]).ok_or(ParamsError::InvalidEscape(i))?;
                decoded.push((hi << 4) | lo);
                i += 3;
            }
            b => {
                decoded.push(b);
                i += 1;
            }
        }
    }
    std::str::from_utf8(&decoded).map(|_| ()).map_err(|_| ParamsError::InvalidUtf8)
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pairs_in_order() {
        let params = Params::parse("b=2&a=1&b=3").unwrap();
        assert_eq!(params.iter().collect::<Vec<_>>(), vec![("b", "2"), ("a", "1"), ("b", "3")]);
        assert_eq!(params.get("b"), Some("2"));
        assert_eq!(params.get_all("b").collect::<Vec<_>>(), vec!["2", "3"]);
    }

    #[test]
    fn decodes_escapes_and_plus() {
        let params = Params::parse("q=hello+world&name=caf%C3%A9").unwrap();
        assert_eq!(params.get("q"), Some("hello world"));
        assert_eq!(params.get("name"), Some("café"));
    }

    #[test]
    fn empty_input_is_empty_set() {
        assert!(Params::parse("").unwrap().is_empty());
    }

    #[test]
    fn rejects_bad_escape() {
        assert!(matches!(Params::parse("a=%zz"), Err(ParamsError::InvalidEscape(2))));
        assert!(matches!(Params::parse("a=%4"), Err(ParamsError::InvalidEscape(2))));
    }

    #[test]
    fn rejects_invalid_utf8() {
        assert!(matches!(Params::parse("a=%ff"), Err(ParamsError::InvalidUtf8)));
    }

    #[test]
    fn rejects_semicolon() {
        assert!(matches!(Params::parse("a=1;b=2"), Err(ParamsError::Semicolon)));
    }

    #[test]
    fn set_replaces_only_its_key() {
        let mut params = Params::parse("name=query&name=again&page=2").unwrap();
        params.set("name", "path");
        assert_eq!(params.get_all("name").collect::<Vec<_>>(), vec!["path"]);
        assert_eq!(params.get("page"), Some("2"));
    }

    #[test]
    fn serializes_as_pair_list() {
        let params: Params = [("a", "1"), ("a", "2")].into_iter().collect();
        assert_eq!(serde_json::to_string(&params).unwrap(), r#"[["a","1"],["a","2"]]"#);
    }
}
