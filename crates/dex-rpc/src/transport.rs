use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::envelope::RpcResponse;
use crate::error::TransportError;
use crate::method::Method;

/// One request/response exchange with the daemon.
///
/// `Ok` covers both success and domain failure envelopes; `Err` is
/// reserved for transport-level problems.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn call(&self, method: Method, params: Value) -> Result<RpcResponse, TransportError>;
}

#[async_trait]
impl<T: RpcTransport + ?Sized> RpcTransport for Arc<T> {
    async fn call(&self, method: Method, params: Value) -> Result<RpcResponse, TransportError> {
        (**self).call(method, params).await
    }
}

#[async_trait]
impl<T: RpcTransport + ?Sized> RpcTransport for &T {
    async fn call(&self, method: Method, params: Value) -> Result<RpcResponse, TransportError> {
        (**self).call(method, params).await
    }
}
