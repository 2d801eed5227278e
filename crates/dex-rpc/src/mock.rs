use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::envelope::{classify_response, RpcResponse};
use crate::error::TransportError;
use crate::method::Method;
use crate::transport::RpcTransport;

/// A call observed by [`MockTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: Method,
    pub params: Value,
}

#[derive(Debug, Clone)]
enum Scripted {
    Body(Value),
    Unavailable(String),
}

#[derive(Default)]
struct Script {
    queued: VecDeque<Scripted>,
    fallback: Option<Scripted>,
}

/// In-memory daemon for tests and offline wiring.
///
/// Responses are scripted per method as raw JSON bodies and classified the
/// same way the HTTP client classifies them. Queued bodies are consumed in
/// order; once a method's queue is empty its repeating body (if any) is
/// served, otherwise the call fails as unavailable.
#[derive(Default)]
pub struct MockTransport {
    scripts: Mutex<HashMap<Method, Script>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn enqueue(&self, method: Method, body: Value) {
        self.scripts
            .lock()
            .await
            .entry(method)
            .or_default()
            .queued
            .push_back(Scripted::Body(body));
    }

    pub async fn enqueue_unavailable(&self, method: Method, reason: impl Into<String>) {
        self.scripts
            .lock()
            .await
            .entry(method)
            .or_default()
            .queued
            .push_back(Scripted::Unavailable(reason.into()));
    }

    pub async fn repeat(&self, method: Method, body: Value) {
        self.scripts.lock().await.entry(method).or_default().fallback =
            Some(Scripted::Body(body));
    }

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }

    pub async fn calls_to(&self, method: Method) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|c| c.method == method)
            .cloned()
            .collect()
    }

    pub async fn count(&self, method: Method) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|c| c.method == method)
            .count()
    }
}

#[async_trait]
impl RpcTransport for MockTransport {
    async fn call(&self, method: Method, params: Value) -> Result<RpcResponse, TransportError> {
        self.calls.lock().await.push(RecordedCall {
            method,
            params: params.clone(),
        });

        let next = {
            let mut scripts = self.scripts.lock().await;
            scripts.get_mut(&method).and_then(|script| {
                script
                    .queued
                    .pop_front()
                    .or_else(|| script.fallback.clone())
            })
        };

        match next {
            Some(Scripted::Body(body)) => classify_response(method, body),
            Some(Scripted::Unavailable(reason)) => Err(TransportError::Unavailable(reason)),
            None => Err(TransportError::Unavailable(format!(
                "no scripted response for {method}"
            ))),
        }
    }
}
