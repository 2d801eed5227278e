use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use tracing::{debug, info, trace, warn};

use crate::envelope::{build_envelope, classify_response, RpcResponse, Userpass};
use crate::error::{ClientError, TransportError};
use crate::method::Method;
use crate::transport::RpcTransport;

pub const DEFAULT_DEX_URL: &str = "http://127.0.0.1:7783";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP client for the daemon's JSON-RPC endpoint.
pub struct DexClient {
    http: Client,
    url: Url,
    userpass: Userpass,
    next_id: AtomicU64,
}

impl DexClient {
    pub fn new(url: &str, userpass: Userpass) -> Result<Self, ClientError> {
        Self::with_timeout(url, userpass, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(
        url: &str,
        userpass: Userpass,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let url = Url::parse(url).map_err(|err| ClientError::InvalidUrl {
            url: url.to_owned(),
            reason: err.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::InvalidUrl {
                url: url.to_string(),
                reason: "scheme must be http or https".into(),
            });
        }
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url,
            userpass,
            next_id: AtomicU64::new(1),
        })
    }

    fn correlation_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait]
impl RpcTransport for DexClient {
    async fn call(&self, method: Method, params: Value) -> Result<RpcResponse, TransportError> {
        let id = self.correlation_id();
        debug!(method = %method, id, params = %params, "dex rpc request");
        let body = build_envelope(method, params, &self.userpass, id)?;

        let res = self.http.post(self.url.clone()).json(&body).send().await?;
        let status = res.status();
        let text = res.text().await?;
        trace!(method = %method, id, %status, body = %text, "dex rpc raw response");

        // The daemon reports domain errors with non-2xx statuses and a JSON
        // body, so only give up on the status when the body is not JSON.
        let decoded: Value = match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(_) if !status.is_success() => {
                return Err(TransportError::UnexpectedStatus { status, body: text });
            }
            Err(source) => {
                return Err(TransportError::Decode {
                    method: method.name(),
                    source,
                });
            }
        };

        let response = classify_response(method, decoded)?;
        match &response {
            RpcResponse::Success(result) => {
                info!(method = %method, id, "dex rpc ok");
                debug!(method = %method, id, result = %result, "dex rpc result");
            }
            RpcResponse::Failure(failure) => {
                warn!(method = %method, id, %status, error = %failure, "dex rpc error");
            }
        }
        Ok(response)
    }
}
