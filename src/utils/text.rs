pub fn truncate_utf8_prefix(value: &str, max_bytes: usize) -> String {
    if value.len() <= max_bytes {
        return value.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !value.is_char_boundary(end) {
        end -= 1;
    }
    value[..end].to_string()
}

/// Short, single-line fragment of a response body for error messages.
pub fn body_fragment(body: &str, max_bytes: usize) -> String {
    let flattened = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if flattened.len() <= max_bytes {
        return flattened;
    }
    format!("{}...", truncate_utf8_prefix(&flattened, max_bytes))
}

#[cfg(test)]
mod tests {
    use super::{body_fragment, truncate_utf8_prefix};

    #[test]
    fn truncate_utf8_prefix_does_not_split_utf8() {
        assert_eq!(truncate_utf8_prefix("hello", 3), "hel");
        assert_eq!(truncate_utf8_prefix("a\u{1F600}b", 2), "a");
    }

    #[test]
    fn body_fragment_flattens_and_truncates() {
        assert_eq!(body_fragment("{\n  \"error\": \"x\"\n}", 64), "{ \"error\": \"x\" }");
        assert_eq!(body_fragment("abcdef", 3), "abc...");
    }
}
