//! Declarative output schemas and their deep-partial relaxation.
//!
//! A [`Schema`] describes the shape a generation must produce: field names,
//! primitive types, optionality, and nested objects/arrays/unions. It is an
//! explicit data structure rather than a Rust type, so the fully optional
//! variant used while a stream is still in flight can be derived mechanically
//! with [`Schema::deep_partial`].
//!
//! Validation works on `serde_json::Value` and returns a normalized copy:
//! unknown keys are dropped, optional `null`s are treated as absent, and
//! scalars are coerced to strings where the schema asks for one.

use serde_json::{Map, Value};
use std::fmt;

/// A declarative description of expected structured output.
///
/// # Example
///
/// ```
/// use kitchencraft_stream::schema::{Field, Schema};
/// use serde_json::json;
///
/// let schema = Schema::object([
///     Field::required("name", Schema::String),
///     Field::optional("tags", Schema::array(Schema::String)),
/// ]);
///
/// let value = schema.validate(&json!({"name": "Tomato Soup"})).unwrap();
/// assert_eq!(value, json!({"name": "Tomato Soup"}));
///
/// // Every field becomes optional in the partial variant.
/// assert!(schema.deep_partial().validate(&json!({})).is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    /// Any string. Numbers and booleans are coerced to their string form.
    String,
    /// Any number.
    Number,
    /// An integral number.
    Integer,
    /// `true` or `false`.
    Boolean,
    /// One of a fixed set of strings.
    Enum(Vec<String>),
    /// A mapping with named fields.
    Object(ObjectSchema),
    /// A sequence whose items all match the inner schema.
    Array(Box<Schema>),
    /// The first variant that validates wins.
    Union(Vec<Schema>),
}

/// The fields of a [`Schema::Object`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectSchema {
    pub fields: Vec<Field>,
}

/// A named field inside an object schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub schema: Schema,
    pub required: bool,
}

impl Field {
    /// A field that must be present in a final result.
    pub fn required(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            required: true,
        }
    }

    /// A field that may be absent.
    pub fn optional(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            required: false,
        }
    }
}

impl Schema {
    /// Build an object schema from its fields.
    pub fn object(fields: impl IntoIterator<Item = Field>) -> Self {
        Schema::Object(ObjectSchema {
            fields: fields.into_iter().collect(),
        })
    }

    /// Build an array schema.
    pub fn array(items: Schema) -> Self {
        Schema::Array(Box::new(items))
    }

    /// Build a union schema.
    pub fn one_of(variants: impl IntoIterator<Item = Schema>) -> Self {
        Schema::Union(variants.into_iter().collect())
    }

    /// Build an enum schema from string literals.
    pub fn enumeration(values: &[&str]) -> Self {
        Schema::Enum(values.iter().map(|v| v.to_string()).collect())
    }

    /// Derive the relaxation of this schema in which every object field, at
    /// every nesting level, is optional.
    ///
    /// Recurses through objects, array items and union variants. Primitive
    /// schemas are returned unchanged.
    pub fn deep_partial(&self) -> Schema {
        match self {
            Schema::Object(obj) => Schema::Object(ObjectSchema {
                fields: obj
                    .fields
                    .iter()
                    .map(|f| Field {
                        name: f.name.clone(),
                        schema: f.schema.deep_partial(),
                        required: false,
                    })
                    .collect(),
            }),
            Schema::Array(items) => Schema::Array(Box::new(items.deep_partial())),
            Schema::Union(variants) => {
                Schema::Union(variants.iter().map(Schema::deep_partial).collect())
            }
            primitive => primitive.clone(),
        }
    }

    /// Short human-readable name of the expected type, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Schema::String => "string",
            Schema::Number => "number",
            Schema::Integer => "integer",
            Schema::Boolean => "boolean",
            Schema::Enum(_) => "enum",
            Schema::Object(_) => "object",
            Schema::Array(_) => "array",
            Schema::Union(_) => "union",
        }
    }

    /// Validate `value` and return its normalized form.
    ///
    /// Collects every issue found rather than stopping at the first one, so
    /// the error can be handed to the fixer in full.
    pub fn validate(&self, value: &Value) -> Result<Value, ValidationError> {
        let mut path = Vec::new();
        let mut issues = Vec::new();
        match self.check(value, &mut path, &mut issues) {
            Some(v) if issues.is_empty() => Ok(v),
            _ => Err(ValidationError { issues }),
        }
    }

    fn check(
        &self,
        value: &Value,
        path: &mut Vec<Segment>,
        issues: &mut Vec<Issue>,
    ) -> Option<Value> {
        match (self, value) {
            (Schema::String, Value::String(_)) => Some(value.clone()),
            (Schema::String, Value::Number(n)) => Some(Value::String(n.to_string())),
            (Schema::String, Value::Bool(b)) => Some(Value::String(b.to_string())),
            (Schema::Number, Value::Number(_)) => Some(value.clone()),
            (Schema::Integer, Value::Number(n)) => {
                if n.is_i64() || n.is_u64() {
                    return Some(value.clone());
                }
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                        Some(Value::from(f as i64))
                    }
                    _ => {
                        issues.push(Issue::at(path, format!("expected integer, found {}", n)));
                        None
                    }
                }
            }
            (Schema::Boolean, Value::Bool(_)) => Some(value.clone()),
            (Schema::Enum(allowed), Value::String(s)) => {
                if allowed.iter().any(|a| a == s) {
                    Some(value.clone())
                } else {
                    issues.push(Issue::at(
                        path,
                        format!("expected one of {:?}, found {:?}", allowed, s),
                    ));
                    None
                }
            }
            (Schema::Object(obj), Value::Object(map)) => obj.check(map, path, issues),
            (Schema::Array(items), Value::Array(values)) => {
                let mut out = Vec::with_capacity(values.len());
                let mut ok = true;
                for (i, item) in values.iter().enumerate() {
                    path.push(Segment::Index(i));
                    match items.check(item, path, issues) {
                        Some(v) => out.push(v),
                        None => ok = false,
                    }
                    path.pop();
                }
                ok.then_some(Value::Array(out))
            }
            (Schema::Union(variants), _) => {
                for variant in variants {
                    let mut scratch = Vec::new();
                    if let Some(v) = variant.check(value, path, &mut scratch) {
                        if scratch.is_empty() {
                            return Some(v);
                        }
                    }
                }
                let names: Vec<&str> = variants.iter().map(Schema::type_name).collect();
                issues.push(Issue::at(
                    path,
                    format!("expected one of [{}], found {}", names.join(", "), kind(value)),
                ));
                None
            }
            (schema, other) => {
                issues.push(Issue::at(
                    path,
                    format!("expected {}, found {}", schema.type_name(), kind(other)),
                ));
                None
            }
        }
    }
}

impl ObjectSchema {
    fn check(
        &self,
        map: &Map<String, Value>,
        path: &mut Vec<Segment>,
        issues: &mut Vec<Issue>,
    ) -> Option<Value> {
        let mut out = Map::new();
        let mut ok = true;
        for field in &self.fields {
            path.push(Segment::Key(field.name.clone()));
            match map.get(&field.name) {
                None | Some(Value::Null) if !field.required => {}
                None => {
                    issues.push(Issue::at(path, "required field is missing".to_string()));
                    ok = false;
                }
                Some(v) => match field.schema.check(v, path, issues) {
                    Some(checked) => {
                        out.insert(field.name.clone(), checked);
                    }
                    None => ok = false,
                },
            }
            path.pop();
        }
        ok.then_some(Value::Object(out))
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone)]
enum Segment {
    Key(String),
    Index(usize),
}

fn render_path(path: &[Segment]) -> String {
    if path.is_empty() {
        return "(root)".to_string();
    }
    let mut out = String::new();
    for segment in path {
        match segment {
            Segment::Key(k) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(k);
            }
            Segment::Index(i) => out.push_str(&format!("[{}]", i)),
        }
    }
    out
}

/// A single schema violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    /// Dotted path to the offending value, e.g. `recipe.ingredients[2]`.
    pub path: String,
    pub message: String,
}

impl Issue {
    fn at(path: &[Segment], message: String) -> Self {
        Self {
            path: render_path(path),
            message,
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Returned by [`Schema::validate`] when a value does not satisfy the schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("schema validation failed: {}", render_issues(.issues))]
pub struct ValidationError {
    pub issues: Vec<Issue>,
}

fn render_issues(issues: &[Issue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn recipe_schema() -> Schema {
        Schema::object([
            Field::required("name", Schema::String),
            Field::required("servings", Schema::Integer),
            Field::required(
                "ingredients",
                Schema::array(Schema::object([
                    Field::required("item", Schema::String),
                    Field::optional("amount", Schema::String),
                ])),
            ),
            Field::optional("difficulty", Schema::enumeration(&["easy", "hard"])),
        ])
    }

    #[test]
    fn deep_partial_relaxes_every_level() {
        let partial = recipe_schema().deep_partial();
        let Schema::Object(obj) = &partial else {
            panic!("expected object");
        };
        assert!(obj.fields.iter().all(|f| !f.required));

        let ingredients = obj.fields.iter().find(|f| f.name == "ingredients").unwrap();
        let Schema::Array(items) = &ingredients.schema else {
            panic!("expected array");
        };
        let Schema::Object(item) = items.as_ref() else {
            panic!("expected object items");
        };
        assert!(item.fields.iter().all(|f| !f.required));
    }

    #[test]
    fn deep_partial_through_unions() {
        let schema = Schema::one_of([
            Schema::object([Field::required("a", Schema::String)]),
            Schema::String,
        ]);
        let partial = schema.deep_partial();
        assert!(partial.validate(&json!({})).is_ok());
        assert!(schema.validate(&json!({})).is_err());
    }

    #[test]
    fn deep_partial_leaves_primitives() {
        assert_eq!(Schema::String.deep_partial(), Schema::String);
        assert_eq!(
            Schema::enumeration(&["a"]).deep_partial(),
            Schema::enumeration(&["a"])
        );
    }

    #[test]
    fn validate_accepts_complete_value() {
        let v = json!({
            "name": "Tomato Soup",
            "servings": 4,
            "ingredients": [{"item": "tomatoes", "amount": "6"}],
        });
        assert_eq!(recipe_schema().validate(&v).unwrap(), v);
    }

    #[test]
    fn validate_reports_missing_required_with_path() {
        let v = json!({"name": "Soup", "ingredients": [{"amount": "1 cup"}]});
        let err = recipe_schema().validate(&v).unwrap_err();
        let paths: Vec<&str> = err.issues.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["servings", "ingredients[0].item"]);
        assert!(err.to_string().contains("ingredients[0].item: required field is missing"));
    }

    #[test]
    fn validate_drops_unknown_keys() {
        let schema = Schema::object([Field::required("name", Schema::String)]);
        let v = schema
            .validate(&json!({"name": "X", "Here is your recipe": null}))
            .unwrap();
        assert_eq!(v, json!({"name": "X"}));
    }

    #[test]
    fn optional_null_is_absent() {
        let schema = Schema::object([
            Field::required("name", Schema::String),
            Field::optional("description", Schema::String),
        ]);
        let v = schema
            .validate(&json!({"name": "X", "description": null}))
            .unwrap();
        assert_eq!(v, json!({"name": "X"}));
    }

    #[test]
    fn required_null_is_an_error() {
        let schema = Schema::object([Field::required("name", Schema::String)]);
        let err = schema.validate(&json!({"name": null})).unwrap_err();
        assert_eq!(err.issues[0].message, "expected string, found null");
    }

    #[test]
    fn string_coerces_scalars() {
        let schema = Schema::object([
            Field::required("yield", Schema::String),
            Field::required("vegan", Schema::String),
        ]);
        let v = schema.validate(&json!({"yield": 4, "vegan": true})).unwrap();
        assert_eq!(v, json!({"yield": "4", "vegan": "true"}));
    }

    #[test]
    fn integer_accepts_integral_floats_only() {
        assert_eq!(Schema::Integer.validate(&json!(3.0)).unwrap(), json!(3));
        assert!(Schema::Integer.validate(&json!(3.5)).is_err());
        assert!(Schema::Integer.validate(&json!("3")).is_err());
    }

    #[test]
    fn enum_rejects_unknown_variant() {
        let schema = Schema::enumeration(&["easy", "hard"]);
        assert!(schema.validate(&json!("easy")).is_ok());
        let err = schema.validate(&json!("medium")).unwrap_err();
        assert!(err.issues[0].message.contains("medium"));
    }

    #[test]
    fn union_picks_first_matching_variant() {
        let schema = Schema::one_of([Schema::Number, Schema::String]);
        assert_eq!(schema.validate(&json!(2)).unwrap(), json!(2));
        assert_eq!(schema.validate(&json!("two")).unwrap(), json!("two"));
        let err = schema.validate(&json!([1])).unwrap_err();
        assert!(err.issues[0].message.contains("[number, string]"));
    }

    #[test]
    fn root_type_mismatch_uses_root_path() {
        let err = recipe_schema().validate(&json!("just text")).unwrap_err();
        assert_eq!(err.issues[0].path, "(root)");
        assert_eq!(err.issues[0].message, "expected object, found string");
    }

    #[test]
    fn array_collects_every_bad_item() {
        let schema = Schema::array(Schema::Number);
        let err = schema.validate(&json!([1, "a", 2, null])).unwrap_err();
        assert_eq!(err.issues.len(), 2);
        assert_eq!(err.issues[0].path, "[1]");
        assert_eq!(err.issues[1].path, "[3]");
    }
}
