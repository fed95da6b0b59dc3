//! Strategy registry: pluggable conversion rules for scalar types with an
//! ambiguous generic representation (dates, binary blobs) plus key-casing
//! transforms.
//!
//! Strategies are selected once per driver invocation and applied identically
//! to every governed value anywhere in the tree. Decoding must use the exact
//! inverse of the strategy that encoded the input; a mismatch is a caller
//! error the core does not detect.

use std::borrow::Cow;

/// How `DateTime<Utc>` values map to the generic value model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DateStrategy {
    /// Whole seconds since the Unix epoch as `Int`.
    EpochSeconds,
    /// Milliseconds since the Unix epoch as `Int`.
    EpochMillis,
    /// RFC 3339 text with seconds precision and a `Z` suffix.
    Iso8601,
    /// Text via a chrono `strftime`-style format string.
    Formatted(String),
    /// The date's own capability encoding: fractional Unix seconds as `Float`.
    #[default]
    Delegate,
}

/// How [`Blob`](crate::Blob) values map to the generic value model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlobStrategy {
    /// Standard-alphabet base64 text.
    Base64,
    /// `Bytes` passthrough.
    Raw,
    /// The blob's own capability encoding: an `Array` of `UInt` bytes.
    #[default]
    Delegate,
}

/// Key-casing transform applied to every keyed-container key.
///
/// On encode the written key is transformed before insertion; on decode the
/// requested key is transformed the same way before lookup, so the two sides
/// stay symmetric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyStrategy {
    #[default]
    AsIs,
    SnakeCase,
}

impl KeyStrategy {
    pub fn apply<'a>(&self, key: &'a str) -> Cow<'a, str> {
        match self {
            KeyStrategy::AsIs => Cow::Borrowed(key),
            KeyStrategy::SnakeCase => Cow::Owned(to_snake_case(key)),
        }
    }
}

/// Immutable strategy context captured at driver entry and threaded read-only
/// through every container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoderConfig {
    pub date: DateStrategy,
    pub blob: BlobStrategy,
    pub key: KeyStrategy,
}

impl CoderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn date(mut self, date: DateStrategy) -> Self {
        self.date = date;
        self
    }

    pub fn blob(mut self, blob: BlobStrategy) -> Self {
        self.blob = blob;
        self
    }

    pub fn key(mut self, key: KeyStrategy) -> Self {
        self.key = key;
        self
    }
}

/// `camelCase`/`PascalCase` to `snake_case`. Runs of uppercase letters stay
/// together until the run ends (`HTTPCode` → `http_code`).
fn to_snake_case(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let mut out = String::with_capacity(key.len() + 4);
    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_uppercase() {
            let prev_lower = i > 0 && chars[i - 1].is_lowercase();
            let prev_digit = i > 0 && chars[i - 1].is_ascii_digit();
            let next_lower = chars.get(i + 1).is_some_and(|c| c.is_lowercase());
            let prev_upper = i > 0 && chars[i - 1].is_uppercase();
            if prev_lower || prev_digit || (prev_upper && next_lower) {
                out.push('_');
            }
            for low in ch.to_lowercase() {
                out.push(low);
            }
        } else {
            out.push(ch);
        }
    }
    out
}
