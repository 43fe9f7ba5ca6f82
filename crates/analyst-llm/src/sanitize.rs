//! Cleanup for artifacts some models leave in free-text replies

use regex::Regex;
use std::sync::LazyLock;

static TOOL_CALL_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<tool_call>(.*?)</tool_call>").expect("tool call block pattern")
});
static TOOL_CALL_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?tool_call>").expect("tool call tag pattern"));
static CITATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\d+\]").expect("citation pattern"));

/// Remove hallucinated `<tool_call>` markup
///
/// A block whose body looks like a JSON call object (`{"name": ...}`) is
/// dropped entirely. Any other block keeps its body without the tags.
pub fn strip_tool_calls(text: &str) -> String {
    let unwrapped = TOOL_CALL_BLOCK.replace_all(text, |caps: &regex::Captures<'_>| {
        let inner = caps[1].trim();
        if inner.starts_with('{') && inner.contains("\"name\"") {
            String::new()
        } else {
            inner.to_string()
        }
    });

    remove_until_stable(&TOOL_CALL_TAG, &unwrapped).trim().to_string()
}

/// Remove numeric citation markers such as `[1]` or `[2][3]`
pub fn strip_citation_markers(text: &str) -> String {
    remove_until_stable(&CITATION, text).trim().to_string()
}

// Removing a match can splice a new one together ("[[1]2]" -> "[2]").
fn remove_until_stable(pattern: &Regex, text: &str) -> String {
    let mut current = text.to_string();
    while pattern.is_match(&current) {
        current = pattern.replace_all(&current, "").into_owned();
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_tool_call_removed() {
        let text = "Intro\n<tool_call>\n{\"name\": \"search\", \"arguments\": {}}\n</tool_call>\nOutro";
        assert_eq!(strip_tool_calls(text), "Intro\n\nOutro");
    }

    #[test]
    fn test_prose_tool_call_kept() {
        let text = "<tool_call> Revenue grew 8% </tool_call> overall.";
        assert_eq!(strip_tool_calls(text), "Revenue grew 8% overall.");
    }

    #[test]
    fn test_stray_tags_removed() {
        assert_eq!(strip_tool_calls("dangling </tool_call> tag<tool_call>"), "dangling  tag");
        assert_eq!(strip_tool_calls("<tool<tool_call>_call>x"), "x");
    }

    #[test]
    fn test_strip_tool_calls_idempotent() {
        let samples = [
            "<tool_call>{\"name\":\"x\"}</tool_call>  body ",
            "<tool_call>keep me</tool_call>",
            "<tool<tool_call>_call>x</tool_call>",
            "",
        ];
        for sample in samples {
            let once = strip_tool_calls(sample);
            assert_eq!(strip_tool_calls(&once), once);
        }
    }

    #[test]
    fn test_citations_removed() {
        assert_eq!(
            strip_citation_markers("Margins expanded[1][3]. Debt fell [12]. "),
            "Margins expanded. Debt fell ."
        );
        assert_eq!(strip_citation_markers("Keep [a] and [ 1 ]"), "Keep [a] and [ 1 ]");
    }

    #[test]
    fn test_strip_citations_idempotent() {
        for sample in ["[[1]2] text", " plain ", "x[1]"] {
            let once = strip_citation_markers(sample);
            assert_eq!(strip_citation_markers(&once), once);
        }
    }
}
