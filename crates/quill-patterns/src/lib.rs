//! Text-shape predicates used alongside the Quill toolchain
//!
//! Each predicate is a full-match test against a lazily compiled,
//! anchored pattern. The decimal and quoted-string shapes mirror the
//! corresponding literal forms of the language itself.

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._]{2,}@[A-Za-z0-9~]+\.([A-Za-z0-9-]+\.)*[a-z]{3}$").unwrap()
});

/// Odd lengths from 11 through 19: eleven characters, then up to four
/// pairs. Newlines count as characters.
static ODD_STRING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^.{11}(?:..){0,4}$").unwrap());

static CHARACTER_LIST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^\[(?:(?:'.', ?)*'.')?\]$").unwrap());

static DECIMAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?(?:0|[1-9][0-9]*)\.[0-9]+$").unwrap());

static QUOTED_STRING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^"(?:[^"\\]|\\[bnrt'"\\])*"$"#).unwrap());

/// A simple email address: a name of at least two word characters, a
/// domain, and a three-letter lowercase top-level domain
pub fn is_email(input: &str) -> bool {
    EMAIL.is_match(input)
}

/// A string whose length is odd and between 11 and 19 inclusive
pub fn is_odd_string(input: &str) -> bool {
    ODD_STRING.is_match(input)
}

/// A bracketed list of single-quoted single characters, with an optional
/// space after each comma
pub fn is_character_list(input: &str) -> bool {
    CHARACTER_LIST.is_match(input)
}

/// A decimal number: an optional sign, an integer part with no leading
/// zeros, and at least one fractional digit
pub fn is_decimal(input: &str) -> bool {
    DECIMAL.is_match(input)
}

/// A double-quoted string whose escapes are limited to
/// `\b \n \r \t \' \" \\`
pub fn is_quoted_string(input: &str) -> bool {
    QUOTED_STRING.is_match(input)
}
