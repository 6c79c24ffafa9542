//! String helpers mirroring the classic PHP surface.
//!
//! These carry no state and no failure modes; they exist so callers of the
//! transport and process layers can keep using the same small toolkit for
//! line-protocol text munging. Semantics follow PHP where PHP has an opinion,
//! including the quirks (`explode` limit capping, `str_pad` preferring the
//! right side for odd `BOTH` padding).

use rand::Rng;

/// The whitespace set used by the trim family: space, newline, carriage
/// return, tab, form feed, vertical tab.
pub const WHITESPACE: &str = " \n\r\t\x0c\x0b";

/// Which side `str_pad` pads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pad {
    /// Pad on the right (default)
    Right,
    /// Pad on the left
    Left,
    /// Pad both sides, preferring the right when uneven
    Both,
}

/// Strip leading characters from `chars` (default whitespace set).
pub fn ltrim(s: &str, chars: &str) -> String {
    s.trim_start_matches(|c| chars.contains(c)).to_string()
}

/// Strip trailing characters from `chars`.
pub fn rtrim(s: &str, chars: &str) -> String {
    s.trim_end_matches(|c| chars.contains(c)).to_string()
}

/// Strip characters from `chars` on both ends.
pub fn trim(s: &str, chars: &str) -> String {
    s.trim_matches(|c| chars.contains(c)).to_string()
}

/// `trim` with the default whitespace set.
pub fn trim_ws(s: &str) -> String {
    trim(s, WHITESPACE)
}

/// True if `needle` occurs anywhere in `haystack`.
pub fn str_contains(haystack: &str, needle: &str) -> bool {
    haystack.contains(needle)
}

/// Reverse a string by character.
pub fn strrev(s: &str) -> String {
    s.chars().rev().collect()
}

/// Rotate ASCII letters by 13 places, leaving everything else alone.
pub fn str_rot13(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'a'..='m' | 'A'..='M' => ((c as u8) + 13) as char,
            'n'..='z' | 'N'..='Z' => ((c as u8) - 13) as char,
            _ => c,
        })
        .collect()
}

/// Repeat `s` `times` times.
pub fn str_repeat(s: &str, times: usize) -> String {
    s.repeat(times)
}

/// Pad `input` with `pad_str` until it is `length` characters long.
///
/// Returns the input untouched when it is already at least `length` long.
/// `Pad::Both` puts the extra character on the right when the total padding
/// is odd, matching PHP.
pub fn str_pad(input: &str, length: usize, pad_str: &str, pad_type: Pad) -> String {
    let in_len = input.chars().count();
    if in_len >= length || pad_str.is_empty() {
        return input.to_string();
    }
    let need = length - in_len;
    let fill = |n: usize| -> String { pad_str.chars().cycle().take(n).collect() };
    match pad_type {
        Pad::Right => format!("{input}{}", fill(need)),
        Pad::Left => format!("{}{input}", fill(need)),
        Pad::Both => {
            let left = need / 2;
            format!("{}{input}{}", fill(left), fill(need - left))
        }
    }
}

/// Uppercase the first character.
pub fn ucfirst(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Lowercase the first character.
pub fn lcfirst(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_lowercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Uppercase the whole string.
pub fn strtoupper(s: &str) -> String {
    s.to_uppercase()
}

/// Lowercase the whole string.
pub fn strtolower(s: &str) -> String {
    s.to_lowercase()
}

/// Replace every occurrence of `search` with `replace`.
pub fn str_replace(search: &str, replace: &str, subject: &str) -> String {
    subject.replace(search, replace)
}

/// Split `subject` on `search`.
///
/// Unlike PHP, a positive `limit` caps the element count and the final
/// element does NOT carry the rest of the string; `Some(0)` is treated as
/// a limit of 1. `None` means unlimited.
pub fn explode(search: &str, subject: &str, limit: Option<usize>) -> Vec<String> {
    let limit = match limit {
        Some(0) => 1,
        Some(n) => n,
        None => usize::MAX,
    };
    if search.is_empty() {
        return vec![subject.to_string()];
    }
    subject
        .split(search)
        .take(limit)
        .map(str::to_string)
        .collect()
}

/// Split `s` into chunks of at most `length` characters.
pub fn str_split(s: &str, length: usize) -> Vec<String> {
    if s.is_empty() || length == 0 {
        return vec![s.to_string()];
    }
    let chars: Vec<char> = s.chars().collect();
    chars
        .chunks(length)
        .map(|c| c.iter().collect())
        .collect()
}

/// Join `parts` with `separator` between elements.
pub fn implode(separator: &str, parts: &[String]) -> String {
    parts.join(separator)
}

/// True if the string consists only of ASCII digits. The empty string
/// counts as an integer, as in the original library.
pub fn is_int(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_digit())
}

/// A random integer in `min..=max`.
pub fn rand_range(min: i32, max: i32) -> i32 {
    rand::rng().random_range(min..=max)
}
