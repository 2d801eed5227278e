use thiserror::Error;

/// Failures below the daemon's own error reporting. Any of these means no
/// usable response envelope came back.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status: {status} body={body}")]
    UnexpectedStatus {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("response for {method} is not valid JSON: {source}")]
    Decode {
        method: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("malformed response envelope for {method}: {reason}")]
    MalformedEnvelope {
        method: &'static str,
        reason: String,
    },
    #[error("invalid params for {method}: {reason}")]
    InvalidParams {
        method: &'static str,
        reason: String,
    },
    #[error("daemon unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("daemon credential (userpass) is empty")]
    MissingCredential,
    #[error("invalid daemon url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("failed to build http client: {0}")]
    Build(#[from] reqwest::Error),
}
