//! Schema coercion: pulls a JSON object out of noisy generator text and
//! validates it against a [`Schema`].
//!
//! Lenient about everything around the object (prose, code fences, trailing
//! chatter) and about omitted optional fields. Strict about required fields
//! and primitive shapes: a string where a list is declared fails the whole
//! parse rather than being patched up.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::extraction::schema::{Field, FieldType, Schema};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionError {
    #[error("no JSON object found in generated text")]
    NoStructureFound,

    #[error("generated JSON could not be parsed: {0}")]
    SyntaxInvalid(String),

    #[error("required field `{0}` is missing")]
    MissingField(String),

    #[error("field `{0}` does not match the declared shape")]
    SchemaMismatch(String),
}

/// Extracts the structured span from `raw` and returns it normalized against
/// `schema`: exactly the declared fields, optional gaps filled with empty values.
pub fn parse(raw: &str, schema: &Schema) -> Result<Value, CoercionError> {
    let tree = locate_structure(raw)?;
    validate(&tree, schema)
}

/// [`parse`] followed by the mapping into the schema's typed record.
pub fn parse_as<T: DeserializeOwned>(raw: &str, schema: &Schema) -> Result<T, CoercionError> {
    let normalized = parse(raw, schema)?;
    serde_json::from_value(normalized)
        .map_err(|_| CoercionError::SchemaMismatch(schema.name.to_string()))
}

/// Finds the JSON object in `raw`. A clean (optionally fenced) object is taken
/// directly; otherwise the largest parseable `{…}` span wins.
pub fn locate_structure(raw: &str) -> Result<Value, CoercionError> {
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(strip_json_fences(raw)) {
        return Ok(value);
    }
    largest_object_span(raw)
}

fn largest_object_span(raw: &str) -> Result<Value, CoercionError> {
    let mut best: Option<(usize, Value)> = None;
    let mut last_error: Option<String> = None;
    let mut saw_candidate = false;
    // Objects nested inside an accepted span are always smaller than it.
    let mut resume_at = 0;

    for (start, ch) in raw.char_indices() {
        if ch != '{' || start < resume_at {
            continue;
        }
        saw_candidate = true;

        let mut stream = serde_json::Deserializer::from_str(&raw[start..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(value @ Value::Object(_))) => {
                let len = stream.byte_offset();
                resume_at = start + len;
                if best.as_ref().map_or(true, |(best_len, _)| len > *best_len) {
                    best = Some((len, value));
                }
            }
            Some(Err(e)) => last_error = Some(e.to_string()),
            _ => {}
        }
    }

    match best {
        Some((_, value)) => Ok(value),
        None if saw_candidate => Err(CoercionError::SyntaxInvalid(
            last_error.unwrap_or_else(|| "unterminated object".to_string()),
        )),
        None => Err(CoercionError::NoStructureFound),
    }
}

/// Validates a parsed tree against `schema` and returns the normalized tree.
pub fn validate(value: &Value, schema: &Schema) -> Result<Value, CoercionError> {
    let object = value
        .as_object()
        .ok_or_else(|| CoercionError::SchemaMismatch(schema.name.to_string()))?;
    validate_fields(object, schema.fields, "")
}

fn validate_fields(
    object: &Map<String, Value>,
    fields: &[Field],
    prefix: &str,
) -> Result<Value, CoercionError> {
    let mut normalized = Map::with_capacity(fields.len());

    for field in fields {
        let path = join_path(prefix, field.name);
        let value = match object.get(field.name) {
            None | Some(Value::Null) if field.required => {
                return Err(CoercionError::MissingField(path))
            }
            None | Some(Value::Null) => default_for(&field.ty),
            Some(v) => coerce_field(v, &field.ty, &path)?,
        };
        normalized.insert(field.name.to_string(), value);
    }

    Ok(Value::Object(normalized))
}

fn coerce_field(value: &Value, ty: &FieldType, path: &str) -> Result<Value, CoercionError> {
    let mismatch = || CoercionError::SchemaMismatch(path.to_string());

    match ty {
        FieldType::Text => value
            .as_str()
            .map(|s| Value::String(s.trim().to_string()))
            .ok_or_else(mismatch),

        FieldType::TextList => {
            let items = value.as_array().ok_or_else(mismatch)?;
            items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    item.as_str()
                        .map(|s| Value::String(s.trim().to_string()))
                        .ok_or_else(|| CoercionError::SchemaMismatch(format!("{path}[{i}]")))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }

        FieldType::Integer => non_negative_integer(value)
            .map(Value::from)
            .ok_or_else(mismatch),

        FieldType::Enum { variants, .. } => {
            let wanted = value.as_str().ok_or_else(mismatch)?.trim().to_lowercase();
            variants
                .iter()
                .find(|v| **v == wanted)
                .map(|v| Value::String((*v).to_string()))
                .ok_or_else(mismatch)
        }

        FieldType::Object(fields) => {
            let object = value.as_object().ok_or_else(mismatch)?;
            validate_fields(object, fields, path)
        }

        FieldType::ObjectList(fields) => {
            let items = value.as_array().ok_or_else(mismatch)?;
            items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    let item_path = format!("{path}[{i}]");
                    let object = item
                        .as_object()
                        .ok_or_else(|| CoercionError::SchemaMismatch(item_path.clone()))?;
                    validate_fields(object, fields, &item_path)
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
    }
}

/// Integers and integral floats (`10.0`) that fit in a `u32`. Numeric
/// strings are rejected.
fn non_negative_integer(value: &Value) -> Option<u32> {
    match value.as_u64() {
        Some(n) => u32::try_from(n).ok(),
        None => value
            .as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0 && *f <= u32::MAX as f64)
            .map(|f| f as u32),
    }
}

fn default_for(ty: &FieldType) -> Value {
    match ty {
        FieldType::Text => Value::String(String::new()),
        FieldType::TextList | FieldType::ObjectList(_) => Value::Array(Vec::new()),
        FieldType::Integer => Value::from(0u64),
        FieldType::Enum { default, .. } => Value::String((*default).to_string()),
        FieldType::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|f| (f.name.to_string(), default_for(&f.ty)))
                .collect(),
        ),
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from generator output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(body) = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
    else {
        return text;
    };
    let body = body.trim_start();
    body.strip_suffix("```").map(str::trim).unwrap_or(body)
}
