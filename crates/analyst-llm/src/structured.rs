//! Structured output: record shapes a model reply must validate against

use crate::{LLMError, Result};
use serde::de::DeserializeOwned;

/// A record shape the gateway can request from a model
///
/// The schema is sent as a JSON-schema `response_format`. The reply is parsed
/// and deserialized, then checked with [`StructuredOutput::validate`] for the
/// rules a schema cannot express.
pub trait StructuredOutput: DeserializeOwned + Send {
    /// Schema name sent to the provider
    const NAME: &'static str;

    /// JSON schema of the record
    fn schema() -> serde_json::Value;

    /// Extra validation after deserialization
    fn validate(&self) -> std::result::Result<(), String> {
        Ok(())
    }
}

/// Locate the JSON object inside a reply
///
/// Tolerates Markdown code fences and prose before or after the object.
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Parse, deserialize and validate a model reply as `T`
pub fn parse_structured<T: StructuredOutput>(text: &str) -> Result<T> {
    let invalid = |reason: String| LLMError::InvalidStructuredOutput {
        shape: T::NAME.to_string(),
        reason,
    };

    let json = extract_json(text).ok_or_else(|| invalid("no JSON object in reply".to_string()))?;
    let value: T = serde_json::from_str(json).map_err(|e| invalid(e.to_string()))?;
    value.validate().map_err(invalid)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Sample {
        ticker: String,
    }

    impl StructuredOutput for Sample {
        const NAME: &'static str = "sample";

        fn schema() -> serde_json::Value {
            json!({"type": "object", "properties": {"ticker": {"type": "string"}}})
        }

        fn validate(&self) -> std::result::Result<(), String> {
            if self.ticker.is_empty() {
                return Err("ticker must not be empty".to_string());
            }
            Ok(())
        }
    }

    #[test]
    fn test_extract_json_from_fence() {
        let text = "Here you go:\n```json\n{\"ticker\": \"AAPL\"}\n```\nDone.";
        assert_eq!(extract_json(text), Some("{\"ticker\": \"AAPL\"}"));
    }

    #[test]
    fn test_extract_json_missing() {
        assert_eq!(extract_json("no braces here"), None);
        assert_eq!(extract_json("} backwards {"), None);
    }

    #[test]
    fn test_parse_structured_ok() {
        let sample: Sample = parse_structured(r#"{"ticker":"MSFT"}"#).unwrap();
        assert_eq!(sample.ticker, "MSFT");
    }

    #[test]
    fn test_parse_structured_validation_failure() {
        let err = parse_structured::<Sample>(r#"{"ticker":""}"#).unwrap_err();
        assert!(matches!(
            err,
            LLMError::InvalidStructuredOutput { ref shape, ref reason }
                if shape == "sample" && reason.contains("empty")
        ));
    }

    #[test]
    fn test_parse_structured_shape_mismatch() {
        let err = parse_structured::<Sample>(r#"{"symbol":"MSFT"}"#).unwrap_err();
        assert!(matches!(err, LLMError::InvalidStructuredOutput { .. }));
    }
}
