pub mod activation;
pub mod operations;
pub mod platform;
pub mod session;

use dex_rpc::{Method, RpcResponse, RpcTransport, TransportError};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use activation::{Activation, ActivationError, ActivationState, RetryPolicy};
use operations::{ChannelAmount, ChannelOptions, Paging, Payment, PaymentFilter};
use platform::{enable_platform_coin, ActivationSource};
use session::{NodeSession, NodeSettings, Tickers, WalletSnapshot};

pub type RpcResult = Result<RpcResponse, TransportError>;

/// A lightning node living on the daemon, plus the local session mirror.
pub struct LightningNode<T> {
    rpc: T,
    session: NodeSession,
}

impl<T: RpcTransport> LightningNode<T> {
    /// Enable the platform coin, read the public key, then run the
    /// lightning activation workflow. Any error returned here is fatal.
    pub async fn activate<S>(
        rpc: T,
        source: &S,
        coin: &str,
        settings: NodeSettings,
        policy: RetryPolicy,
    ) -> Result<(Self, ActivationState), ActivationError>
    where
        S: ActivationSource + ?Sized,
    {
        let tickers = Tickers::derive(coin);
        enable_platform_coin(&rpc, source, &tickers).await?;

        let mut node = Self {
            rpc,
            session: NodeSession::new(coin, settings),
        };
        node.refresh_public_key().await?;

        let mut workflow = Activation::new(
            node.session.tickers.lightning.clone(),
            node.session.settings.clone(),
            policy,
        );
        workflow.run(&node.rpc).await?;
        let state = workflow.into_state();
        node.apply_activation(&state);
        Ok((node, state))
    }

    /// Wrap an existing transport and session, e.g. in tests.
    pub fn from_parts(rpc: T, session: NodeSession) -> Self {
        Self { rpc, session }
    }

    pub fn session(&self) -> &NodeSession {
        &self.session
    }

    fn apply_activation(&mut self, state: &ActivationState) {
        if let ActivationState::Ok(activated) = state {
            if let Some(address) = &activated.address {
                self.session.lightning = Some(WalletSnapshot {
                    address: address.clone(),
                    balance: activated.balance.clone().unwrap_or_else(|| "0".into()),
                });
            }
        }
    }

    fn coin(&self) -> &str {
        &self.session.tickers.lightning
    }

    pub async fn refresh_public_key(&mut self) -> RpcResult {
        #[derive(Deserialize)]
        struct PublicKey {
            public_key: String,
        }
        let response = self
            .rpc
            .call(Method::GetPublicKey, operations::public_key_params())
            .await?;
        if let Some(key) = response.parse::<PublicKey>() {
            self.session.public_key = Some(key.public_key);
        }
        Ok(response)
    }

    /// Re-read public key (when unknown) and both wallet balances.
    pub async fn refresh(&mut self) -> Result<(), TransportError> {
        if self.session.public_key.is_none() {
            self.refresh_public_key().await?;
        }
        let platform = self.session.tickers.platform.clone();
        if let Some(snapshot) = self.balance(&platform).await? {
            self.session.platform = Some(snapshot);
        }
        let lightning = self.session.tickers.lightning.clone();
        if let Some(snapshot) = self.balance(&lightning).await? {
            self.session.lightning = Some(snapshot);
        }
        debug!(session = ?self.session, "session refreshed");
        Ok(())
    }

    async fn balance(&self, coin: &str) -> Result<Option<WalletSnapshot>, TransportError> {
        let response = self
            .rpc
            .call(Method::MyBalance, operations::my_balance_params(coin))
            .await?;
        match &response {
            RpcResponse::Success(result) => Ok(WalletSnapshot::from_my_balance(result)),
            RpcResponse::Failure(failure) => {
                warn!(coin, error = %failure, "balance refresh failed");
                Ok(None)
            }
        }
    }

    async fn call(&self, method: Method, params: Value) -> RpcResult {
        self.rpc.call(method, params).await
    }

    pub async fn connect_to_node(&self, node_address: &str) -> RpcResult {
        self.call(
            Method::ConnectToNode,
            operations::connect_params(self.coin(), node_address),
        )
        .await
    }

    pub async fn list_trusted_nodes(&self) -> RpcResult {
        self.call(Method::ListTrustedNodes, operations::coin_params(self.coin()))
            .await
    }

    pub async fn add_trusted_node(&self, node_id: &str) -> RpcResult {
        self.call(
            Method::AddTrustedNode,
            operations::trusted_node_params(self.coin(), node_id),
        )
        .await
    }

    pub async fn remove_trusted_node(&self, node_id: &str) -> RpcResult {
        self.call(
            Method::RemoveTrustedNode,
            operations::trusted_node_params(self.coin(), node_id),
        )
        .await
    }

    pub async fn open_channel(&self, node_address: &str, amount: ChannelAmount) -> RpcResult {
        self.call(
            Method::OpenChannel,
            operations::open_channel_params(self.coin(), node_address, amount),
        )
        .await
    }

    pub async fn update_channel(&self, uuid: &str, options: &ChannelOptions) -> RpcResult {
        self.call(
            Method::UpdateChannel,
            operations::update_channel_params(self.coin(), uuid, options),
        )
        .await
    }

    pub async fn list_open_channels(&self) -> RpcResult {
        self.call(Method::ListOpenChannels, operations::coin_params(self.coin()))
            .await
    }

    pub async fn list_closed_channels(&self) -> RpcResult {
        self.call(
            Method::ListClosedChannels,
            operations::coin_params(self.coin()),
        )
        .await
    }

    pub async fn generate_invoice(
        &self,
        description: &str,
        amount_in_msat: u64,
        expiry: u32,
    ) -> RpcResult {
        self.call(
            Method::GenerateInvoice,
            operations::generate_invoice_params(self.coin(), description, amount_in_msat, expiry),
        )
        .await
    }

    pub async fn send_payment(&self, payment: &Payment) -> RpcResult {
        self.call(
            Method::SendPayment,
            operations::send_payment_params(self.coin(), payment),
        )
        .await
    }

    pub async fn get_payment_details(&self, payment_hash: &str) -> RpcResult {
        self.call(
            Method::GetPaymentDetails,
            operations::payment_details_params(self.coin(), payment_hash),
        )
        .await
    }

    pub async fn list_payments(&self, filter: PaymentFilter, paging: Paging) -> RpcResult {
        self.call(
            Method::ListPayments,
            operations::list_payments_params(self.coin(), filter, paging),
        )
        .await
    }

    pub async fn get_claimable_balances(&self, include_open_channels_balances: bool) -> RpcResult {
        self.call(
            Method::GetClaimableBalances,
            operations::claimable_balances_params(self.coin(), include_open_channels_balances),
        )
        .await
    }
}
