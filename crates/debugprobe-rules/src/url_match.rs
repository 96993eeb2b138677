//! Wildcard URL pattern matching shared by every rule engine.
//!
//! Per the matching algorithm: if the pattern contains `*`, escape
//! literal `.` characters, replace `*` with `.*`, and test the
//! resulting (unanchored) regex against the absolute URL; otherwise
//! fall back to a plain substring-contains check. Each compiled
//! pattern is cached, since the same handful of patterns are evaluated
//! against every captured request.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::sync::RwLock;

static COMPILED: Lazy<RwLock<HashMap<String, Regex>>> = Lazy::new(|| RwLock::new(HashMap::new()));

fn compile(pattern: &str) -> Regex {
    let escaped = pattern.replace('.', "\\.").replace('*', ".*");
    // Patterns are author-supplied but bounded in size; a malformed
    // pattern falls back to one that matches nothing rather than
    // panicking the caller.
    Regex::new(&escaped).unwrap_or_else(|_| Regex::new("$^").expect("static fallback is valid"))
}

/// Does `url` match `pattern`? An empty pattern matches everything (it
/// is the "any URL" wildcard rule). A pattern containing `*` is
/// compiled to a regex and matched anywhere in `url`; otherwise
/// `pattern` must appear as a substring of `url`.
pub fn matches(pattern: &str, url: &str) -> bool {
    if pattern.is_empty() || pattern == "*" {
        return true;
    }
    if !pattern.contains('*') {
        return url.contains(pattern);
    }
    if let Ok(cache) = COMPILED.read() {
        if let Some(re) = cache.get(pattern) {
            return re.is_match(url);
        }
    }
    let re = compile(pattern);
    let is_match = re.is_match(url);
    if let Ok(mut cache) = COMPILED.write() {
        cache.insert(pattern.to_string(), re);
    }
    is_match
}

/// Does `rule_method` accept `request_method`? `None`/empty means "any
/// method".
pub fn matches_method(rule_method: Option<&str>, request_method: &str) -> bool {
    match rule_method {
        None => true,
        Some(m) if m.is_empty() => true,
        Some(m) => m.eq_ignore_ascii_case(request_method),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_star_match_everything() {
        assert!(matches("", "https://api.example.com/users"));
        assert!(matches("*", "https://api.example.com/users"));
    }

    #[test]
    fn star_matches_any_suffix() {
        assert!(matches(
            "https://api.example.com/users/*",
            "https://api.example.com/users/42"
        ));
        assert!(!matches(
            "https://api.example.com/users/*",
            "https://api.example.com/orders/42"
        ));
    }

    #[test]
    fn pattern_without_star_is_plain_substring_contains() {
        assert!(matches("example.com/users", "https://example.com/users/42"));
        assert!(!matches("example.com/orders", "https://example.com/users/42"));
    }

    #[test]
    fn dots_in_a_star_pattern_are_escaped_as_literal_dots() {
        assert!(matches("*api.example.com*", "https://api.example.com/users"));
        assert!(!matches("*apiXexample.com*", "https://api.example.com/users"));
    }

    #[test]
    fn method_matching_is_case_insensitive_and_permissive() {
        assert!(matches_method(None, "GET"));
        assert!(matches_method(Some(""), "POST"));
        assert!(matches_method(Some("get"), "GET"));
        assert!(!matches_method(Some("POST"), "GET"));
    }
}
