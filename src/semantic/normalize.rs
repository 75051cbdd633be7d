//! Flattening of embedding model output into a single vector.
//!
//! Providers disagree on what they hand back for one input: a tensor-like
//! wrapper around a flat buffer, a batch of one, or one vector per token
//! when pooling was not applied. [`normalize`] reduces all of these to one
//! flat `Vec<f32>`, mean-pooling token vectors if needed.

use serde_json::Value;

/// Raw output of an embedding call.
#[derive(Debug, Clone, PartialEq)]
pub enum RawEmbedding {
    /// Tensor-like wrapper exposing a flat data buffer
    Wrapped(Vec<f32>),
    /// Nested sequence; one element is a singleton batch dimension
    Batch(Vec<RawEmbedding>),
    /// One vector per input token (T x D)
    Tokens(Vec<Vec<f32>>),
    /// Already pooled vector
    Flat(Vec<f32>),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EmbeddingShapeError {
    #[error("unexpected embedding shape: {0}")]
    UnexpectedShape(String),

    #[error("cannot pool an empty token sequence")]
    EmptyTokens,

    #[error("token vectors have inconsistent dimensions: expected {expected}, got {got}")]
    RaggedTokens { expected: usize, got: usize },
}

/// Reduce raw model output to one flat vector.
pub fn normalize(raw: RawEmbedding) -> Result<Vec<f32>, EmbeddingShapeError> {
    let mut value = raw;
    loop {
        value = match value {
            RawEmbedding::Wrapped(buffer) | RawEmbedding::Flat(buffer) => return Ok(buffer),
            RawEmbedding::Batch(mut items) if items.len() == 1 => items.remove(0),
            RawEmbedding::Tokens(mut tokens) if tokens.len() == 1 => {
                RawEmbedding::Flat(tokens.remove(0))
            }
            RawEmbedding::Tokens(tokens) => return mean_pool(&tokens),
            RawEmbedding::Batch(items) => {
                return Err(EmbeddingShapeError::UnexpectedShape(format!(
                    "nested sequence of {} elements",
                    items.len()
                )))
            }
        };
    }
}

/// Element-wise mean over token vectors.
fn mean_pool(tokens: &[Vec<f32>]) -> Result<Vec<f32>, EmbeddingShapeError> {
    let first = tokens.first().ok_or(EmbeddingShapeError::EmptyTokens)?;
    let dim = first.len();

    let mut sums = vec![0.0f64; dim];
    for token in tokens {
        if token.len() != dim {
            return Err(EmbeddingShapeError::RaggedTokens {
                expected: dim,
                got: token.len(),
            });
        }
        for (sum, x) in sums.iter_mut().zip(token) {
            *sum += f64::from(*x);
        }
    }

    let count = tokens.len() as f64;
    Ok(sums.into_iter().map(|sum| (sum / count) as f32).collect())
}

impl RawEmbedding {
    /// Interpret JSON output from an embedding provider.
    ///
    /// Objects are accepted when they expose a `data` (or `embedding`) field;
    /// arrays are classified by the kind of their elements.
    pub fn from_json(value: &Value) -> Result<Self, EmbeddingShapeError> {
        match value {
            Value::Object(map) => {
                let inner = map
                    .get("data")
                    .or_else(|| map.get("embedding"))
                    .ok_or_else(|| {
                        EmbeddingShapeError::UnexpectedShape("object without a data field".into())
                    })?;
                match inner {
                    Value::Array(items) if items.iter().all(Value::is_number) => {
                        Ok(RawEmbedding::Wrapped(numbers(items)?))
                    }
                    other => Self::from_json(other),
                }
            }
            Value::Array(items) if items.iter().all(Value::is_number) => {
                Ok(RawEmbedding::Flat(numbers(items)?))
            }
            Value::Array(items) if items.iter().all(is_number_array) => items
                .iter()
                .filter_map(Value::as_array)
                .map(|row| numbers(row))
                .collect::<Result<Vec<_>, _>>()
                .map(RawEmbedding::Tokens),
            Value::Array(items) => items
                .iter()
                .map(Self::from_json)
                .collect::<Result<Vec<_>, _>>()
                .map(RawEmbedding::Batch),
            other => Err(EmbeddingShapeError::UnexpectedShape(format!(
                "expected array or object, got {}",
                json_kind(other)
            ))),
        }
    }
}

fn is_number_array(value: &Value) -> bool {
    matches!(value, Value::Array(row) if !row.is_empty() && row.iter().all(Value::is_number))
}

fn numbers(items: &[Value]) -> Result<Vec<f32>, EmbeddingShapeError> {
    items
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|x| x as f32)
                .filter(|x| x.is_finite())
                .ok_or_else(|| EmbeddingShapeError::UnexpectedShape(format!("non-finite value {v}")))
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
