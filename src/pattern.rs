//! URL pattern compiler.
//!
//! A pattern is a path template with two kinds of capture token:
//!
//! | Token | Matches | Capture name |
//! |---|---|---|
//! | `:name` | one or more characters except `/ # ?` | `name` |
//! | `**` | zero or more characters except `# ?` | `_1`, `_2`, … in order of appearance |
//!
//! Everything else is passed through to the regex engine untouched, so an
//! inline group such as `(?P<id>\d+)` works as well. A trailing `/` is always
//! optional and a match must consume the whole path.
//!
//! ```rust
//! use wicket::Pattern;
//!
//! let pattern = Pattern::compile("/hello/:name/:id").unwrap();
//! let captures = pattern.captures("/hello/guregodevo/1234").unwrap();
//! assert_eq!(captures, vec![
//!     ("name".to_owned(), "guregodevo".to_owned()),
//!     ("id".to_owned(),   "1234".to_owned()),
//! ]);
//! ```

use std::fmt;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// `:name`, where the name stops at `/ # ? ( ) . \`.
static NAMED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r":[^/#?().\\]+").expect("named-token regex is valid")
});

/// Returned when a pattern does not translate into a valid matcher.
#[derive(Debug, thiserror::Error)]
#[error("invalid route pattern `{pattern}`: {source}")]
pub struct PatternError {
    pattern: String,
    #[source]
    source: regex::Error,
}

impl PatternError {
    /// The pattern string that failed to compile.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

/// A compiled route pattern: an anchored matcher plus its capture names in
/// declaration order.
///
/// Compilation is pure. Compiling the same string twice gives matchers with
/// identical behaviour, and matching holds no state between calls.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
    names: Vec<String>,
}

impl Pattern {
    pub fn compile(pattern: &str) -> Result<Self, PatternError> {
        let translated = translate(pattern);
        let regex = Regex::new(&format!("^(?:{translated}/?)$")).map_err(|source| PatternError {
            pattern: pattern.to_owned(),
            source,
        })?;
        let names = regex.capture_names().flatten().map(str::to_owned).collect();
        Ok(Self { source: pattern.to_owned(), regex, names })
    }

    /// The pattern string as registered.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Capture names in declaration order, including synthesized `_k` names.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Matches `path` and returns its named captures in declaration order.
    ///
    /// `None` unless the whole path is consumed. A capture that took no part
    /// in the match is reported as an empty string.
    pub fn captures(&self, path: &str) -> Option<Vec<(String, String)>> {
        let caps = self.regex.captures(path)?;
        Some(
            self.names
                .iter()
                .map(|name| {
                    let value = caps.name(name).map_or("", |m| m.as_str());
                    (name.clone(), value.to_owned())
                })
                .collect(),
        )
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pattern")
            .field("source", &self.source)
            .field("regex", &self.regex.as_str())
            .field("names", &self.names)
            .finish()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Rewrites the capture tokens of `pattern` into regex syntax.
fn translate(pattern: &str) -> String {
    let named = NAMED.replace_all(pattern, |caps: &Captures<'_>| {
        format!("(?P<{}>[^/#?]+)", &caps[0][1..])
    });

    let mut out = String::with_capacity(named.len() + 16);
    let mut index = 0;
    let mut rest: &str = &named;
    while let Some(at) = rest.find("**") {
        index += 1;
        out.push_str(&rest[..at]);
        out.push_str(&format!("(?P<_{index}>[^#?]*)"));
        rest = &rest[at + 2..];
    }
    out.push_str(rest);
    out
}
