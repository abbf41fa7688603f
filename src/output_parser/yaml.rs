//! YAML decoding against a schema, in partial and strict flavors.
//!
//! [`parse_partial`] is the best-effort decoder run after every streamed
//! chunk: any failure is routine and reported as `None`. [`finalize`] is the
//! strict decoder run once the stream has ended; its failure is what sends
//! a generation to the fixer.

use serde_json::Value;

use crate::output_parser::error::{MalformedOutput, ParseError};
use crate::output_parser::sanitize::sanitize;
use crate::schema::Schema;

/// Decode YAML text into a JSON value.
///
/// Mappings with non-string keys, tagged values and other constructs that
/// have no JSON equivalent are decode errors.
pub fn decode(text: &str) -> Result<Value, ParseError> {
    if text.trim().is_empty() {
        return Err(ParseError::EmptyResponse);
    }
    serde_yaml::from_str::<Value>(text).map_err(|e| ParseError::Decode(e.to_string()))
}

/// Decode already-sanitized, possibly incomplete text against a partial schema.
///
/// Returns `None` when the text does not decode or the decoded value does
/// not satisfy `partial`. Never panics, whatever the input.
///
/// # Examples
///
/// ```
/// use kitchencraft_stream::output_parser::parse_partial;
/// use kitchencraft_stream::schema::{Field, Schema};
///
/// let schema = Schema::object([
///     Field::required("name", Schema::String),
///     Field::required("description", Schema::String),
/// ]);
/// let partial = schema.deep_partial();
///
/// let v = parse_partial("name: Tomato Soup", &partial).unwrap();
/// assert_eq!(v["name"], "Tomato Soup");
/// assert!(parse_partial("name: Tomato Soup\ndescri", &partial).is_none());
/// ```
pub fn parse_partial(sanitized: &str, partial: &Schema) -> Option<Value> {
    let value = decode(sanitized).ok()?;
    partial.validate(&value).ok()
}

/// Sanitize and strictly decode a complete output.
///
/// On failure the sanitized text travels with the error so the caller can
/// hand it to the fixer.
pub fn finalize(raw: &str, schema: &Schema) -> Result<Value, MalformedOutput> {
    let sanitized = sanitize(raw);
    let result = decode(&sanitized).and_then(|v| schema.validate(&v).map_err(ParseError::from));
    result.map_err(|error| MalformedOutput { error, sanitized })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;
    use serde_json::json;

    fn soup_schema() -> Schema {
        Schema::object([
            Field::required("name", Schema::String),
            Field::required("description", Schema::String),
            Field::optional("ingredients", Schema::array(Schema::String)),
        ])
    }

    #[test]
    fn partial_accepts_prefix() {
        let partial = soup_schema().deep_partial();
        let v = parse_partial("name: Tomato Soup", &partial).unwrap();
        assert_eq!(v, json!({"name": "Tomato Soup"}));
    }

    #[test]
    fn partial_rejects_dangling_plain_scalar() {
        let partial = soup_schema().deep_partial();
        assert!(parse_partial("name: Tomato Soup\ndesc", &partial).is_none());
    }

    #[test]
    fn partial_accepts_open_key() {
        // `description:` with no value yet decodes as null, which an optional
        // field treats as absent.
        let partial = soup_schema().deep_partial();
        let v = parse_partial("name: Soup\ndescription:", &partial).unwrap();
        assert_eq!(v, json!({"name": "Soup"}));
    }

    #[test]
    fn partial_rejects_empty_list_item() {
        let partial = soup_schema().deep_partial();
        let text = "name: Soup\ningredients:\n  - tomatoes\n  -";
        assert!(parse_partial(text, &partial).is_none());
    }

    #[test]
    fn partial_empty_is_none() {
        let partial = soup_schema().deep_partial();
        assert!(parse_partial("", &partial).is_none());
        assert!(parse_partial("   \n", &partial).is_none());
    }

    #[test]
    fn partial_never_panics_and_only_returns_valid_values() {
        let partial = soup_schema().deep_partial();
        let inputs = [
            "@@@not-yaml@@@",
            "-",
            "- [",
            "{",
            "}",
            ": :",
            "\"unterminated",
            "name: [1, 2",
            "&anchor",
            "*alias",
            "!tag x",
            "? complex\n: key",
            "%YAML 1.2",
            "\u{0}\u{1}\u{7f}",
            "name: !!binary aGVsbG8=",
            "1: numeric key",
            "name: .nan",
            "[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[",
            "name: Soup\nname: Dup",
            "\t",
            "é",
        ];
        for input in inputs {
            if let Some(v) = parse_partial(input, &partial) {
                assert!(partial.validate(&v).is_ok(), "invalid partial for {:?}", input);
            }
        }
    }

    #[test]
    fn finalize_accepts_fenced_complete_output() {
        let raw = "```yaml\nname: Tomato Soup\ndescription: A warm classic\n```";
        let v = finalize(raw, &soup_schema()).unwrap();
        assert_eq!(
            v,
            json!({"name": "Tomato Soup", "description": "A warm classic"})
        );
    }

    #[test]
    fn finalize_reports_missing_field() {
        let err = finalize("name: Tomato Soup", &soup_schema()).unwrap_err();
        assert!(matches!(err.error, ParseError::Invalid(_)));
        assert!(err.reason().contains("description: required field is missing"));
        assert_eq!(err.sanitized, "name: Tomato Soup");
    }

    #[test]
    fn finalize_keeps_inline_backticks_in_values() {
        let raw = "name: Soup\ndescription: garnish with ```basil``` leaves";
        let v = finalize(raw, &soup_schema()).unwrap();
        assert_eq!(v["description"], "garnish with ```basil``` leaves");
    }

    #[test]
    fn finalize_reports_decode_error() {
        let err = finalize("name: [unclosed", &soup_schema()).unwrap_err();
        assert!(matches!(err.error, ParseError::Decode(_)));
    }

    #[test]
    fn finalize_empty_is_empty_response() {
        let err = finalize("", &soup_schema()).unwrap_err();
        assert_eq!(err.error, ParseError::EmptyResponse);
    }
}
