//! Raw model output cleanup before JSON parsing.

/// Strip code fences (bare or language-tagged) and surrounding whitespace.
///
/// If prose still surrounds a JSON object afterwards, the outermost `{ … }`
/// span is kept. Cleaning clean text is a no-op.
pub fn clean(text: &str) -> String {
    let mut s = text.trim();

    loop {
        let before = s;
        if let Some(rest) = s.strip_prefix("```") {
            // Drop the language tag (```json, ```JSON, ```javascript …) with the fence line.
            s = match rest.find('\n') {
                Some(nl) => &rest[nl + 1..],
                None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
            };
        }
        if let Some(rest) = s.trim_end().strip_suffix("```") {
            s = rest;
        }
        s = s.trim();
        if s == before {
            break;
        }
    }

    if !s.starts_with('{') {
        if let (Some(start), Some(end)) = (s.find('{'), s.rfind('}')) {
            if start < end {
                return s[start..=end].to_string();
            }
        }
    }
    s.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_language_tagged_fence() {
        let raw = "```json\n{\"a\": 1}\n```";
        assert_eq!(clean(raw), "{\"a\": 1}");
    }

    #[test]
    fn strips_bare_fence_and_whitespace() {
        assert_eq!(clean("  \n```\n{\"a\": 1}\n```  \n"), "{\"a\": 1}");
        assert_eq!(clean("```JSON\n{}\n```"), "{}");
    }

    #[test]
    fn single_line_fence() {
        assert_eq!(clean("```json{\"a\":1}```"), "{\"a\":1}");
    }

    #[test]
    fn extracts_object_from_surrounding_prose() {
        let raw = "Here is your question:\n```json\n{\"q\": \"x\"}\n```\nGood luck!";
        assert_eq!(clean(raw), "{\"q\": \"x\"}");
    }

    #[test]
    fn idempotent() {
        for raw in ["```json\n{\"a\": 1}\n```", "{\"b\": [1,2]}", "  plain  ", "note {\"c\": {}} end", ""] {
            let once = clean(raw);
            assert_eq!(clean(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn leaves_clean_json_untouched() {
        let raw = "{\"question_text\": \"What does `len` return?\"}";
        assert_eq!(clean(raw), raw);
    }
}
