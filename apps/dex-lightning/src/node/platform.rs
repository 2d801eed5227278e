use async_trait::async_trait;
use dex_rpc::{Method, RpcResponse, RpcTransport};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::activation::ActivationError;
use super::session::Tickers;

pub const DEFAULT_ACTIVATION_COMMANDS_URL: &str =
    "https://stats.kmd.io/api/atomicdex/activation_commands/";

/// Where the UTXO activation request for a base coin comes from.
#[async_trait]
pub trait ActivationSource: Send + Sync {
    /// Raw activation command for `coin`, as published upstream.
    async fn activation_command(&self, coin: &str) -> Result<Value, ActivationError>;
}

/// Fetches activation commands from the public stats API.
pub struct StatsActivationSource {
    http: Client,
    base_url: String,
}

impl StatsActivationSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ActivationSource for StatsActivationSource {
    async fn activation_command(&self, coin: &str) -> Result<Value, ActivationError> {
        debug!(coin, url = %self.base_url, "fetching activation command");
        let res = self
            .http
            .get(&self.base_url)
            .query(&[("coin", coin)])
            .send()
            .await
            .map_err(|err| ActivationError::Source(err.to_string()))?;
        if !res.status().is_success() {
            return Err(ActivationError::Source(format!(
                "unexpected status {}",
                res.status()
            )));
        }
        res.json::<Value>()
            .await
            .map_err(|err| ActivationError::Source(err.to_string()))
    }
}

/// Fixed command table, for tests and offline setups.
pub struct StaticActivationSource(pub Value);

#[async_trait]
impl ActivationSource for StaticActivationSource {
    async fn activation_command(&self, _coin: &str) -> Result<Value, ActivationError> {
        Ok(self.0.clone())
    }
}

/// Turn an upstream command into the method and params for the segwit
/// platform coin. Commands without a `coin` mean the coin is unknown; only
/// the legacy `electrum` and `enable` methods are accepted.
pub fn platform_command(
    tickers: &Tickers,
    mut command: Value,
) -> Result<(Method, Value), ActivationError> {
    let unknown = || ActivationError::UnknownCoin(tickers.base.clone());
    let fields = command.as_object_mut().ok_or_else(unknown)?;
    if !fields.contains_key("coin") {
        return Err(unknown());
    }
    fields.insert("coin".into(), Value::from(tickers.platform.as_str()));

    let name = match fields.remove("method") {
        Some(Value::String(name)) => name,
        Some(other) => other.to_string(),
        None => return Err(ActivationError::UnsupportedMethod(String::new())),
    };
    let method = Method::from_name(&name)
        .filter(|m| matches!(m, Method::Electrum | Method::Enable))
        .ok_or(ActivationError::UnsupportedMethod(name))?;
    fields.remove("userpass");
    Ok((method, command))
}

/// Enable the segwit platform coin the lightning node runs on.
///
/// Domain errors (most often "already activated") are logged and ignored;
/// the lightning activation that follows reports anything that matters.
pub async fn enable_platform_coin<T, S>(
    rpc: &T,
    source: &S,
    tickers: &Tickers,
) -> Result<RpcResponse, ActivationError>
where
    T: RpcTransport + ?Sized,
    S: ActivationSource + ?Sized,
{
    let command = source.activation_command(&tickers.base).await?;
    let (method, params) = platform_command(tickers, command)?;
    info!(coin = %tickers.platform, %method, "enabling platform coin");
    let response = rpc.call(method, params).await?;
    if let RpcResponse::Failure(failure) = &response {
        warn!(coin = %tickers.platform, error = %failure, "platform coin activation reported an error");
    }
    Ok(response)
}
