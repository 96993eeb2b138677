//! Identifier validation and the `execute_query` denylist.

use crate::error::InspectorError;
use once_cell::sync::Lazy;
use regex::Regex;

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static pattern is valid"));

/// Denylisted keywords, matched as whole words (case-insensitive) so a
/// column named `createTimestamp` is never mistaken for `CREATE`.
const DENYLIST: &[&str] = &[
    "DROP", "DELETE", "INSERT", "UPDATE", "ALTER", "CREATE", "ATTACH", "DETACH",
];

/// Validate a table/column/order-by identifier that will be interpolated
/// into generated SQL. Identifiers come from the Hub and cannot be bound
/// as parameters; they are validated here and then quoted
/// with double quotes by the caller.
pub fn validate_identifier(name: &str) -> Result<(), InspectorError> {
    if name.len() > 128 || !IDENTIFIER.is_match(name) {
        return Err(InspectorError::InvalidQuery(format!(
            "invalid identifier: {name}"
        )));
    }
    Ok(())
}

/// Quote a validated identifier for interpolation into SQL.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{name}\"")
}

/// Does `sql`, trimmed and case-folded, begin with `SELECT` and contain
/// none of the denylisted keywords as a whole word?
pub fn validate_select_only(sql: &str) -> Result<(), InspectorError> {
    let trimmed = sql.trim();
    if !trimmed.to_ascii_uppercase().starts_with("SELECT") {
        return Err(InspectorError::InvalidQuery(
            "only SELECT statements are permitted".to_string(),
        ));
    }
    let upper = trimmed.to_ascii_uppercase();
    for keyword in DENYLIST {
        let pattern = format!(r"\b{keyword}\b");
        let re = Regex::new(&pattern).expect("denylist pattern is static and valid");
        if re.is_match(&upper) {
            return Err(InspectorError::InvalidQuery(format!(
                "query contains disallowed keyword: {keyword}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_simple_identifiers() {
        assert!(validate_identifier("users").is_ok());
        assert!(validate_identifier("_private_1").is_ok());
    }

    #[test]
    fn rejects_identifiers_with_punctuation() {
        assert!(validate_identifier("users; DROP TABLE x").is_err());
        assert!(validate_identifier("users-table").is_err());
    }

    #[test]
    fn rejects_overlong_identifiers() {
        let long = "a".repeat(129);
        assert!(validate_identifier(&long).is_err());
    }

    #[test]
    fn select_statements_are_allowed() {
        assert!(validate_select_only("  select * from t  ").is_ok());
    }

    #[test]
    fn non_select_statements_are_rejected() {
        assert!(validate_select_only("INSERT INTO t VALUES (1)").is_err());
    }

    #[test]
    fn denylisted_keywords_reject_even_inside_a_select() {
        let err = validate_select_only("SELECT * FROM t; DELETE FROM t").unwrap_err();
        assert!(matches!(err, InspectorError::InvalidQuery(_)));
    }

    #[test]
    fn whole_word_match_skips_false_positives() {
        assert!(validate_select_only("SELECT createTimestamp FROM t").is_ok());
    }
}
