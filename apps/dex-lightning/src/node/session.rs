use std::fmt;

use serde::Deserialize;
use serde_json::Value;

pub const DEFAULT_NODE_NAME: &str = "dragonhound-lightning";
pub const DEFAULT_LISTENING_PORT: u16 = 9735;
pub const DEFAULT_NODE_COLOR: &str = "000000";
pub const DEFAULT_PAYMENT_RETRIES: u32 = 5;

/// Settings sent with `task::enable_lightning::init`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSettings {
    pub name: String,
    pub port: u16,
    pub color: String,
    pub payment_retries: u32,
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_NODE_NAME.into(),
            port: DEFAULT_LISTENING_PORT,
            color: DEFAULT_NODE_COLOR.into(),
            payment_retries: DEFAULT_PAYMENT_RETRIES,
        }
    }
}

/// Tickers derived from a base coin such as `tBTC`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tickers {
    pub base: String,
    pub platform: String,
    pub lightning: String,
}

impl Tickers {
    /// Anything after the first `-` is a variant suffix and is dropped, so
    /// `tBTC`, `tBTC-segwit` and `tBTC-lightning` all derive the same set.
    pub fn derive(coin: &str) -> Self {
        let base = coin.trim().split('-').next().unwrap_or_default().to_owned();
        Self {
            platform: format!("{base}-segwit"),
            lightning: format!("{base}-lightning"),
            base,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletSnapshot {
    pub address: String,
    pub balance: String,
}

impl WalletSnapshot {
    /// Read `{address, balance}` from a `my_balance` reply.
    pub fn from_my_balance(result: &Value) -> Option<Self> {
        #[derive(Deserialize)]
        struct MyBalance {
            address: String,
            balance: Value,
        }
        let parsed: MyBalance = serde_json::from_value(result.clone()).ok()?;
        Some(Self {
            address: parsed.address,
            balance: balance_text(&parsed.balance),
        })
    }
}

impl fmt::Display for WalletSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {}", self.address, self.balance)
    }
}

/// Balances arrive as decimal strings or bare numbers depending on the
/// daemon version.
pub(crate) fn balance_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => "-".into(),
        other => other.to_string(),
    }
}

/// Local view of one activated lightning-capable asset. The daemon is the
/// authority; this only mirrors what the last calls reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSession {
    pub tickers: Tickers,
    pub settings: NodeSettings,
    pub platform: Option<WalletSnapshot>,
    pub lightning: Option<WalletSnapshot>,
    pub public_key: Option<String>,
}

impl NodeSession {
    pub fn new(coin: &str, settings: NodeSettings) -> Self {
        Self {
            tickers: Tickers::derive(coin),
            settings,
            platform: None,
            lightning: None,
            public_key: None,
        }
    }

    pub fn lightning_ticker(&self) -> &str {
        &self.tickers.lightning
    }

    pub fn status_lines(&self) -> [String; 3] {
        let unknown = || "- | -".to_string();
        [
            format!(
                "[{} | Initialized | Port {} | Color #{}]",
                self.settings.name, self.settings.port, self.settings.color
            ),
            format!(
                "[{} | {}]",
                self.tickers.platform,
                self.platform
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_else(unknown)
            ),
            format!(
                "[{} | {}]",
                self.tickers.lightning,
                self.lightning
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_else(unknown)
            ),
        ]
    }
}
