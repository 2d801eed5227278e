//! Parameter shapes for the lightning method set.
//!
//! Each builder produces the `params` object for exactly one daemon call.
//! Nothing here computes amounts or validates against channel state; the
//! daemon does that.

use serde::Serialize;
use serde_json::{json, Value};

/// Funding amount for a new channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum ChannelAmount {
    Exact(f64),
    /// Let the daemon fund with the maximum spendable amount.
    Max,
}

pub const DEFAULT_CHANNEL_VALUE: f64 = 0.0004;
pub const DEFAULT_CHANNEL_AMOUNT: ChannelAmount = ChannelAmount::Exact(DEFAULT_CHANNEL_VALUE);

/// How a payment is addressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Payment {
    Invoice {
        invoice: String,
    },
    Keysend {
        destination: String,
        amount_in_msat: u64,
        expiry: u32,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PaymentFilter {
    #[default]
    All,
    Inbound,
    Outbound,
}

impl PaymentFilter {
    fn payment_type(self) -> Option<&'static str> {
        match self {
            PaymentFilter::All => None,
            PaymentFilter::Inbound => Some("Inbound Payment"),
            PaymentFilter::Outbound => Some("Outbound Payment"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub page: u32,
    pub limit: u32,
}

impl Default for Paging {
    fn default() -> Self {
        Self { page: 1, limit: 10 }
    }
}

/// Fee and policy knobs for `update_channel`; unset fields are left as the
/// daemon has them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChannelOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proportional_fee_in_millionths_sats: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_fee_msat: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cltv_expiry_delta: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_dust_htlc_exposure_msat: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_close_avoidance_max_fee_sats: Option<u64>,
}

pub fn public_key_params() -> Value {
    json!({})
}

pub fn my_balance_params(coin: &str) -> Value {
    json!({ "coin": coin })
}

pub fn connect_params(coin: &str, node_address: &str) -> Value {
    json!({ "coin": coin, "node_address": node_address })
}

pub fn coin_params(coin: &str) -> Value {
    json!({ "coin": coin })
}

pub fn trusted_node_params(coin: &str, node_id: &str) -> Value {
    json!({ "coin": coin, "node_id": node_id })
}

pub fn open_channel_params(coin: &str, node_address: &str, amount: ChannelAmount) -> Value {
    json!({ "coin": coin, "node_address": node_address, "amount": amount })
}

pub fn update_channel_params(coin: &str, uuid: &str, options: &ChannelOptions) -> Value {
    json!({ "coin": coin, "uuid": uuid, "channel_options": options })
}

pub fn generate_invoice_params(
    coin: &str,
    description: &str,
    amount_in_msat: u64,
    expiry: u32,
) -> Value {
    json!({
        "coin": coin,
        "description": description,
        "amount_in_msat": amount_in_msat,
        "expiry": expiry,
    })
}

pub fn send_payment_params(coin: &str, payment: &Payment) -> Value {
    json!({ "coin": coin, "payment": payment })
}

pub fn payment_details_params(coin: &str, payment_hash: &str) -> Value {
    json!({ "coin": coin, "payment_hash": payment_hash })
}

pub fn list_payments_params(coin: &str, filter: PaymentFilter, paging: Paging) -> Value {
    let mut params = json!({
        "coin": coin,
        "limit": paging.limit,
        "paging_options": { "PageNumber": paging.page },
    });
    if let Some(kind) = filter.payment_type() {
        params["filter"] = json!({ "payment_type": { "type": kind } });
    }
    params
}

pub fn claimable_balances_params(coin: &str, include_open_channels_balances: bool) -> Value {
    json!({
        "coin": coin,
        "include_open_channels_balances": include_open_channels_balances,
    })
}
