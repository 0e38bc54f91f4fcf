//! Structured Output Extractor: pulls a JSON value out of free-form model
//! text and checks it against a caller-supplied [`ShapeContract`].
//!
//! Two stages: syntax (is there parseable JSON at all?) then shape (does it
//! satisfy the business rule?). The executor retries both the same way; the
//! distinction only matters for diagnostics.

use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("no JSON object or array found in model output")]
    NoJson,

    #[error("model output contained malformed JSON: {0}")]
    Syntax(#[source] serde_json::Error),

    #[error("output does not match expected shape ({expected}): {reason}")]
    Shape { expected: String, reason: String },
}

impl ExtractionError {
    pub fn is_shape_violation(&self) -> bool {
        matches!(self, ExtractionError::Shape { .. })
    }
}

type Predicate = dyn Fn(&Value) -> Result<(), String> + Send + Sync;

/// A validation rule over a parsed value plus a human-readable description.
#[derive(Clone)]
pub struct ShapeContract {
    description: String,
    predicate: Arc<Predicate>,
}

impl fmt::Debug for ShapeContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShapeContract")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl ShapeContract {
    pub fn custom<F>(description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Accepts any JSON value.
    #[cfg(test)]
    pub fn any() -> Self {
        Self::custom("any JSON value", |_| Ok(()))
    }

    #[cfg(test)]
    pub fn array() -> Self {
        Self::custom("JSON array", |value| {
            if value.is_array() {
                Ok(())
            } else {
                Err(format!("expected an array, got {}", kind_of(value)))
            }
        })
    }

    /// An array whose length is in any of the `allowed` ranges.
    pub fn array_len(allowed: Vec<RangeInclusive<usize>>) -> Self {
        let description = format!(
            "JSON array, length {}",
            allowed
                .iter()
                .map(|r| {
                    if r.start() == r.end() {
                        r.start().to_string()
                    } else {
                        format!("{}-{}", r.start(), r.end())
                    }
                })
                .collect::<Vec<_>>()
                .join(" or ")
        );
        Self::custom(description, move |value| {
            let items = value
                .as_array()
                .ok_or_else(|| format!("expected an array, got {}", kind_of(value)))?;
            if allowed.iter().any(|r| r.contains(&items.len())) {
                Ok(())
            } else {
                Err(format!("array length {} is not allowed", items.len()))
            }
        })
    }

    /// An object that has every key in `keys`.
    pub fn object_with_keys(keys: &[&str]) -> Self {
        let keys: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        Self::custom(
            format!("JSON object with keys [{}]", keys.join(", ")),
            move |value| {
                let object = value
                    .as_object()
                    .ok_or_else(|| format!("expected an object, got {}", kind_of(value)))?;
                let missing: Vec<&str> = keys
                    .iter()
                    .filter(|k| !object.contains_key(k.as_str()))
                    .map(String::as_str)
                    .collect();
                if missing.is_empty() {
                    Ok(())
                } else {
                    Err(format!("missing keys: {}", missing.join(", ")))
                }
            },
        )
    }

    /// Field `key` must be an integer within `range`.
    pub fn integer_field(key: &'static str, range: RangeInclusive<u64>) -> Self {
        Self::custom(
            format!("{key} within {}-{}", range.start(), range.end()),
            move |value| match value.get(key).and_then(Value::as_u64) {
                Some(n) if range.contains(&n) => Ok(()),
                Some(n) => Err(format!("{key} {n} out of range")),
                None => Err(format!("{key} is not a non-negative integer")),
            },
        )
    }

    /// The value must deserialize into `T`.
    pub fn typed<T: DeserializeOwned + 'static>() -> Self {
        Self::custom(
            format!("deserializable as {}", short_type_name::<T>()),
            |value| {
                T::deserialize(value)
                    .map(|_| ())
                    .map_err(|e| e.to_string())
            },
        )
    }

    /// Both contracts must hold; `self` is checked first.
    pub fn and(self, other: ShapeContract) -> Self {
        let description = format!("{} and {}", self.description, other.description);
        let (first, second) = (self.predicate, other.predicate);
        Self {
            description,
            predicate: Arc::new(move |value| {
                first(value)?;
                second(value)
            }),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn check(&self, value: &Value) -> Result<(), ExtractionError> {
        (self.predicate)(value).map_err(|reason| ExtractionError::Shape {
            expected: self.description.clone(),
            reason,
        })
    }
}

/// Extracts the first parseable JSON object/array from `raw` and validates it.
/// A fenced block is tried first; if it holds no usable JSON the whole text is scanned.
pub fn extract(raw: &str, contract: &ShapeContract) -> Result<Value, ExtractionError> {
    let whole = raw.trim();
    let fenced = strip_code_fences(whole);
    let value = match locate_json(fenced) {
        Ok(value) => value,
        Err(_) if fenced.len() != whole.len() => locate_json(whole)?,
        Err(e) => return Err(e),
    };
    contract.check(&value)?;
    Ok(value)
}

/// Returns the body of the first fenced block (```json ... ``` or ``` ... ```),
/// or the whole trimmed text when there is no fence.
fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(open) = text.find("```") else {
        return text;
    };

    let after_open = &text[open + 3..];
    // Drop an optional language tag on the fence line, e.g. ```json
    let body = match after_open.find('\n') {
        Some(nl) if after_open[..nl].trim().chars().all(|c| c.is_ascii_alphanumeric()) => {
            &after_open[nl + 1..]
        }
        _ => after_open
            .strip_prefix("json")
            .unwrap_or(after_open),
    };

    match body.find("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

/// Tries every `{` / `[` as a candidate start; the first balanced substring
/// that parses wins.
fn locate_json(text: &str) -> Result<Value, ExtractionError> {
    let mut last_error = None;

    for (start, ch) in text.char_indices() {
        if ch != '{' && ch != '[' {
            continue;
        }
        let Some(end) = balanced_end(&text[start..]) else {
            continue;
        };
        match serde_json::from_str::<Value>(&text[start..start + end]) {
            Ok(value) => return Ok(value),
            Err(e) => last_error = Some(e),
        }
    }

    Err(last_error.map_or(ExtractionError::NoJson, ExtractionError::Syntax))
}

/// Byte length of the balanced bracket run starting at `text[0]`, honouring
/// string literals and escapes. `None` if it never closes.
fn balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + ch.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// `alloc::vec::Vec<my_crate::Week>` → `Vec<Week>`.
fn short_type_name<T>() -> String {
    let full = std::any::type_name::<T>();
    let mut out = String::with_capacity(full.len());
    let mut path = String::new();
    for ch in full.chars() {
        if ch.is_alphanumeric() || ch == '_' || ch == ':' {
            path.push(ch);
        } else {
            out.push_str(path.rsplit("::").next().unwrap_or_default());
            path.clear();
            out.push(ch);
        }
    }
    out.push_str(path.rsplit("::").next().unwrap_or_default());
    out
}
