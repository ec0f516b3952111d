use serde_json::Value;

use crate::codec::{self, CodecError};

/// Shape of a decoded request body
#[derive(Debug)]
pub enum ParsedInput {
    /// Any non-array value. Scalars are passed through; validation rejects them.
    Single(Value),
    /// A JSON array, possibly empty
    Batch(Vec<Value>),
    /// The text was not valid JSON
    Failure(CodecError),
}

/// Decode request text and split single requests from batches.
pub fn parse(text: &str) -> ParsedInput {
    match codec::decode(text) {
        Ok(Value::Array(items)) => ParsedInput::Batch(items),
        Ok(value) => ParsedInput::Single(value),
        Err(err) => ParsedInput::Failure(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_single_object() {
        match parse(r#"{"id": 1, "method": "add"}"#) {
            ParsedInput::Single(value) => assert_eq!(value["method"], "add"),
            other => panic!("expected single, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_scalar_is_single() {
        assert!(matches!(parse("42"), ParsedInput::Single(v) if v == json!(42)));
    }

    #[test]
    fn test_parse_empty_array_is_batch() {
        assert!(matches!(parse("[]"), ParsedInput::Batch(items) if items.is_empty()));
    }

    #[test]
    fn test_parse_failures() {
        assert!(matches!(parse("["), ParsedInput::Failure(_)));
        assert!(matches!(
            parse(r#"[ {"jsonrpc": "2.0", "method": "sum"}, {"jsonrpc": "2.0", "method"]"#),
            ParsedInput::Failure(_)
        ));
    }
}
