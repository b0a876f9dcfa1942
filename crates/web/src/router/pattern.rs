//! Path patterns: regular expressions with `{name}` placeholder sugar.
//!
//! A pattern is always anchored at both ends. `{ident}` expands to a named group matching
//! one or more characters other than `/` and `?`, everything else is kept as regex syntax:
//!
//! ```
//! use ember_web::router::RoutePattern;
//!
//! let pattern = RoutePattern::new("/user/{id}/").unwrap();
//! let args = pattern.captures("/user/2333/").unwrap();
//! assert_eq!(args.get("id"), Some("2333"));
//! assert!(pattern.captures("/user/2333/edit").is_none());
//!
//! let pattern = RoutePattern::new(r"/post/(\d+)").unwrap();
//! assert_eq!(pattern.reverse(&["42"]).unwrap(), "/post/42");
//! ```

use std::fmt;

use once_cell::sync::Lazy;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use regex::Regex;
use thiserror::Error;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder regex is valid"));

const CATCH_ALL_BODIES: [&str; 6] = [".*", "(.*)", "/.*", "/(.*)", ".+", "(.+)"];

/// Everything but unreserved characters and `/` is escaped in reversed arguments.
const ARGUMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~').remove(b'/');

#[derive(Error, Debug)]
#[error("invalid route pattern '{pattern}': {source}")]
pub struct PatternError {
    pattern: String,
    #[source]
    source: regex::Error,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReverseError {
    #[error("pattern '{pattern}' can not be reversed")]
    Unreversible { pattern: String },

    #[error("pattern expects {expected} arguments, got {got}")]
    ArgumentCount { expected: usize, got: usize },

    #[error("no route named '{name}'")]
    UnknownName { name: String },
}

/// Values captured from the path by a matching pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PathArgs {
    #[default]
    None,
    /// One slot per group, in pattern order. A group that took no part in the match is `None`.
    Positional(Vec<Option<String>>),
    Named(Vec<(String, String)>),
}

impl PathArgs {
    /// A named capture.
    pub fn get(&self, name: &str) -> Option<&str> {
        match self {
            PathArgs::Named(args) => args.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    /// The `index`th capture, counting named captures in pattern order as well.
    pub fn nth(&self, index: usize) -> Option<&str> {
        match self {
            PathArgs::None => None,
            PathArgs::Positional(args) => args.get(index).and_then(Option::as_deref),
            PathArgs::Named(args) => args.get(index).map(|(_, v)| v.as_str()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PathArgs::None => 0,
            PathArgs::Positional(args) => args.len(),
            PathArgs::Named(args) => args.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Argument,
}

/// A compiled path matcher.
#[derive(Clone)]
pub struct RoutePattern {
    source: String,
    regex: Regex,
    catch_all: bool,
    named: bool,
    reverse: Option<Vec<Piece>>,
}

impl fmt::Debug for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutePattern").field("source", &self.source).field("catch_all", &self.catch_all).finish()
    }
}

impl RoutePattern {
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        let mut source = PLACEHOLDER.replace_all(pattern, "(?P<${1}>[^/?]+)").into_owned();
        if !source.ends_with('$') {
            source.push('$');
        }

        let anchored = if source.starts_with('^') { source.clone() } else { format!("^{source}") };
        let regex = Regex::new(&anchored).map_err(|source| PatternError { pattern: pattern.to_owned(), source })?;

        let body = source.trim_start_matches('^').trim_end_matches('$');
        let catch_all = CATCH_ALL_BODIES.contains(&body);
        let named = regex.capture_names().flatten().next().is_some();
        let reverse = reverse_pieces(body, regex.captures_len() - 1);

        Ok(Self { source, regex, catch_all, named, reverse })
    }

    /// The expanded pattern, always ending with `$`.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether this pattern matches every path and so belongs at the end of the table.
    pub fn is_catch_all(&self) -> bool {
        self.catch_all
    }

    pub fn captures(&self, path: &str) -> Option<PathArgs> {
        let captures = self.regex.captures(path)?;
        if self.regex.captures_len() == 1 {
            return Some(PathArgs::None);
        }

        let args = if self.named {
            let named = self
                .regex
                .capture_names()
                .flatten()
                .filter_map(|name| captures.name(name).map(|m| (name.to_owned(), m.as_str().to_owned())))
                .collect();
            PathArgs::Named(named)
        } else {
            PathArgs::Positional(captures.iter().skip(1).map(|m| m.map(|m| m.as_str().to_owned())).collect())
        };
        Some(args)
    }

    /// Builds a concrete path by placing `args` into the groups of this pattern.
    pub fn reverse<S: AsRef<str>>(&self, args: &[S]) -> Result<String, ReverseError> {
        let pieces = self.reverse.as_ref().ok_or_else(|| ReverseError::Unreversible { pattern: self.source.clone() })?;

        let expected = pieces.iter().filter(|p| **p == Piece::Argument).count();
        if expected != args.len() {
            return Err(ReverseError::ArgumentCount { expected, got: args.len() });
        }

        let mut args = args.iter();
        let mut path = String::new();
        for piece in pieces {
            match piece {
                Piece::Literal(literal) => path.push_str(literal),
                Piece::Argument => {
                    if let Some(arg) = args.next() {
                        path.extend(utf8_percent_encode(arg.as_ref(), ARGUMENT));
                    }
                }
            }
        }
        Ok(path)
    }
}

/// Splits the pattern body into literals and groups. `None` when the pattern has nested or
/// non-capturing groups, or regex syntax outside of groups.
fn reverse_pieces(body: &str, groups: usize) -> Option<Vec<Piece>> {
    if body.matches('(').count() != groups {
        return None;
    }

    let mut fragments = body.split('(');
    let mut pieces = vec![Piece::Literal(unescape(fragments.next()?)?)];
    for fragment in fragments {
        let (_group, rest) = fragment.split_once(')')?;
        pieces.push(Piece::Argument);
        pieces.push(Piece::Literal(unescape(rest)?));
    }
    pieces.retain(|p| !matches!(p, Piece::Literal(l) if l.is_empty()));
    Some(pieces)
}

fn unescape(fragment: &str) -> Option<String> {
    let mut literal = String::with_capacity(fragment.len());
    let mut chars = fragment.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next()? {
                c if c.is_ascii_alphanumeric() => return None,
                c => literal.push(c),
            },
            '.' | '*' | '+' | '?' | '[' | ']' | '{' | '}' | '|' | '^' | '$' | ')' => return None,
            c => literal.push(c),
        }
    }
    Some(literal)
}
