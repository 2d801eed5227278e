use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{ClientError, TransportError};
use crate::method::{EnvelopeShape, Method};

pub const MMRPC_VERSION: &str = "2.0";

/// Shared daemon credential injected into every request as `userpass`.
#[derive(Clone, PartialEq, Eq)]
pub struct Userpass(String);

impl Userpass {
    pub fn new(secret: impl Into<String>) -> Result<Self, ClientError> {
        let secret = secret.into();
        let trimmed = secret.trim();
        if trimmed.is_empty() {
            return Err(ClientError::MissingCredential);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Userpass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Userpass(<redacted>)")
    }
}

/// Build the JSON body for one call.
///
/// Legacy methods take their params flattened next to `method`, so the
/// params must be an object (or null for "no params").
pub fn build_envelope(
    method: Method,
    params: Value,
    userpass: &Userpass,
    id: u64,
) -> Result<Value, TransportError> {
    let mut body = Map::new();
    match method.shape() {
        EnvelopeShape::Legacy => {
            match params {
                Value::Object(fields) => {
                    for (key, value) in fields {
                        body.insert(key, value);
                    }
                }
                Value::Null => {}
                other => {
                    return Err(TransportError::InvalidParams {
                        method: method.name(),
                        reason: format!("legacy params must be an object, got {other}"),
                    })
                }
            }
            body.insert("method".into(), Value::from(method.name()));
        }
        EnvelopeShape::Versioned => {
            let params = match params {
                Value::Null => Value::Object(Map::new()),
                obj @ Value::Object(_) => obj,
                other => {
                    return Err(TransportError::InvalidParams {
                        method: method.name(),
                        reason: format!("params must be an object, got {other}"),
                    })
                }
            };
            body.insert("mmrpc".into(), Value::from(MMRPC_VERSION));
            body.insert("method".into(), Value::from(method.name()));
            body.insert("params".into(), params);
            body.insert("id".into(), Value::from(id));
        }
    }
    body.insert("userpass".into(), Value::from(userpass.expose()));
    Ok(Value::Object(body))
}

/// Domain-level failure reported by the daemon in an `error` field.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcFailure {
    pub message: String,
    pub error_type: Option<String>,
    pub body: Value,
}

impl RpcFailure {
    pub fn contains(&self, needle: &str) -> bool {
        self.message.contains(needle)
    }
}

impl fmt::Display for RpcFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_type {
            Some(kind) => write!(f, "{kind}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// A classified daemon response. Domain failures are values, not errors:
/// callers branch on the variant.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcResponse {
    Success(Value),
    Failure(RpcFailure),
}

impl RpcResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, RpcResponse::Success(_))
    }

    pub fn result(&self) -> Option<&Value> {
        match self {
            RpcResponse::Success(value) => Some(value),
            RpcResponse::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&RpcFailure> {
        match self {
            RpcResponse::Success(_) => None,
            RpcResponse::Failure(failure) => Some(failure),
        }
    }

    /// Deserialize the success payload; a failure or a payload that does
    /// not fit `T` yields `None`.
    pub fn parse<T: DeserializeOwned>(&self) -> Option<T> {
        self.result()
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }
}

/// Classify a decoded body according to the shape the method was sent with.
pub fn classify_response(method: Method, body: Value) -> Result<RpcResponse, TransportError> {
    let Value::Object(mut fields) = body else {
        return Err(TransportError::MalformedEnvelope {
            method: method.name(),
            reason: "response body is not a JSON object".into(),
        });
    };

    if let Some(error) = fields.get("error").cloned() {
        let message = match &error {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        let error_type = fields
            .get("error_type")
            .and_then(Value::as_str)
            .map(str::to_owned);
        return Ok(RpcResponse::Failure(RpcFailure {
            message,
            error_type,
            body: Value::Object(fields),
        }));
    }

    match method.shape() {
        EnvelopeShape::Versioned => match fields.remove("result") {
            Some(result) => Ok(RpcResponse::Success(result)),
            None => Err(TransportError::MalformedEnvelope {
                method: method.name(),
                reason: "response carries neither `result` nor `error`".into(),
            }),
        },
        // Legacy replies are flat: the whole body is the result.
        EnvelopeShape::Legacy => Ok(RpcResponse::Success(Value::Object(fields))),
    }
}
