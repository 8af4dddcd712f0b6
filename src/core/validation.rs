pub fn normalize_non_empty(input: Option<String>) -> Option<String> {
    input.and_then(|v| normalize_non_empty_str(&v))
}

pub fn normalize_non_empty_str(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Names of the required fields that are absent, in declaration order.
pub fn missing_fields<'a>(fields: &[(&'a str, &Option<String>)]) -> Vec<&'a str> {
    fields
        .iter()
        .filter(|(_, value)| value.is_none())
        .map(|(name, _)| *name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_optional_string() {
        assert_eq!(
            normalize_non_empty(Some("  hello  ".to_string())),
            Some("hello".to_string())
        );
        assert_eq!(normalize_non_empty(Some("   ".to_string())), None);
        assert_eq!(normalize_non_empty(None), None);
    }

    #[test]
    fn normalizes_raw_string() {
        assert_eq!(
            normalize_non_empty_str("\n test \t"),
            Some("test".to_string())
        );
        assert_eq!(normalize_non_empty_str(""), None);
    }

    #[test]
    fn lists_missing_fields_in_order() {
        let present = Some("x".to_string());
        let absent: Option<String> = None;
        assert_eq!(
            missing_fields(&[("message", &absent), ("agent_id", &present), ("other", &absent)]),
            vec!["message", "other"]
        );
        assert!(missing_fields(&[("message", &present)]).is_empty());
    }
}
