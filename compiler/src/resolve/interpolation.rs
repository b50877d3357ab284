//! `${field.path}` interpolation tokens.

use once_cell::sync::Lazy;
use regex::Regex;

static TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]*)\}").expect("interpolation pattern compiles"));

/// Field paths referenced by `expression`, in order of appearance.
pub fn referenced_fields(expression: &str) -> impl Iterator<Item = &str> {
    TOKEN
        .captures_iter(expression)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|path| !path.is_empty())
}

/// Whether any of `expressions` references `field`.
pub fn references_field<'a, I>(expressions: I, field: &str) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    !field.is_empty()
        && expressions
            .into_iter()
            .any(|expr| referenced_fields(expr).any(|path| path == field))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_referenced_fields() {
        let fields: Vec<_> =
            referenced_fields("${event.otherFields.otherSiteId}${targetField}_${ sourceName }").collect();
        assert_eq!(fields, vec!["event.otherFields.otherSiteId", "targetField", "sourceName"]);
    }

    #[test]
    fn test_no_tokens() {
        assert_eq!(referenced_fields("2.0").count(), 0);
        assert_eq!(referenced_fields("${}").count(), 0);
        assert_eq!(referenced_fields("${unterminated").count(), 0);
    }

    #[test]
    fn test_references_field_is_exact() {
        let sources = ["${invalidSelfDependency}"];
        assert!(references_field(sources, "invalidSelfDependency"));
        assert!(!references_field(sources, "validSelfDependency"));
        assert!(!references_field(sources, ""));
    }
}
