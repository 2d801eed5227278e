//! Interactive read-dispatch-display loop.

pub mod console;
pub mod menu;

use std::io::{BufRead, Write};

use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};
use dex_rpc::{RpcResponse, RpcTransport, TransportError};
use tracing::{error, info};

use crate::node::activation::{ActivationError, ActivationState, RetryPolicy};
use crate::node::operations::{
    ChannelAmount, ChannelOptions, DEFAULT_CHANNEL_AMOUNT, DEFAULT_CHANNEL_VALUE, Paging, Payment,
    PaymentFilter,
};
use crate::node::platform::ActivationSource;
use crate::node::session::NodeSettings;
use crate::node::LightningNode;
use console::{Console, Tone};
use menu::{parse_choice, MenuAction};

pub const SUPPORTED_COINS: [&str; 3] = ["tBTC", "BTC", "LTC"];
pub const DEFAULT_PEER: &str =
    "038863cf8ab91046230f561cd5b386cbff8309fa02e3f0c3ed161a3aeb64a643b9@203.132.94.196:9735";
const DEFAULT_PAYMENT_HASH: &str =
    "414f9b3524fc4e48c99f2723952732d8bc2eba1b35ce3bf2a70f5144b40f599e";
const WIDTH: usize = 100;
const NOT_INITIALIZED: &str = "Lightning not initialized. Please initialize lightning first.";

const BANNER: &str = r"
      ____  _______  __   __    _       __    __        _
     / __ \/ ____/ |/ /  / /   (_)___ _/ /_  / /_____  (_)___  ____ _
    / / / / __/  |   /  / /   / / __ `/ __ \/ __/ __ \/ / __ \/ __ `/
   / /_/ / /___ /   |  / /___/ / /_/ / / / / /_/ / / / / / / / /_/ /
  /_____/_____//_/|_| /_____/_/\__, /_/ /_/\__/_/ /_/_/_/ /_/\__, /
                              /____/                        /____/
";

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("terminal i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("input closed")]
    InputClosed,
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Activation could not produce a session; the process must stop.
    #[error("lightning activation failed: {0}")]
    Activation(#[from] ActivationError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

#[derive(Debug, Clone, Default)]
pub struct ShellOptions {
    pub retry: RetryPolicy,
    pub node_defaults: NodeSettings,
    pub clear_screen: bool,
}

pub struct Shell<T, S, R, W> {
    rpc: T,
    source: S,
    options: ShellOptions,
    node: Option<LightningNode<T>>,
    console: Console<R, W>,
}

impl<T, S, R, W> Shell<T, S, R, W>
where
    T: RpcTransport + Clone,
    S: ActivationSource,
    R: BufRead,
    W: Write,
{
    pub fn new(rpc: T, source: S, options: ShellOptions, input: R, output: W) -> Self {
        Self {
            rpc,
            source,
            options,
            node: None,
            console: Console::new(input, output),
        }
    }

    /// Start with an already activated node.
    pub fn with_node(mut self, node: LightningNode<T>) -> Self {
        self.node = Some(node);
        self
    }

    pub fn node(&self) -> Option<&LightningNode<T>> {
        self.node.as_ref()
    }

    pub fn into_output(self) -> W {
        self.console.into_output()
    }

    /// Loop until `Exit`, end of input, or a fatal activation error.
    pub async fn run(&mut self) -> Result<(), ShellError> {
        loop {
            match self.iteration().await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Exit) | Err(ShellError::InputClosed) => break,
                Err(err) => return Err(err),
            }
        }
        self.console.say(" Exiting TUI", Tone::Error)?;
        Ok(())
    }

    async fn iteration(&mut self) -> Result<Flow, ShellError> {
        self.render()?;
        let choice = self.console.ask("\n Select menu option: ")?;
        self.console.blank()?;

        match parse_choice(&choice) {
            Err(err) => {
                info!(input = %choice, error = %err, "invalid menu selection");
                self.console.say("Invalid menu option!", Tone::Error)?;
            }
            Ok(action) => match self.dispatch(action).await {
                Ok(Flow::Exit) => return Ok(Flow::Exit),
                Ok(Flow::Continue) => {}
                Err(ShellError::Transport(err)) => {
                    error!(action = action.label(), error = %err, "operation failed");
                    self.console.say(&format!("Error: {err}"), Tone::Error)?;
                }
                Err(err) => return Err(err),
            },
        }
        self.console.blank()?;

        if let Some(node) = self.node.as_mut() {
            if let Err(err) = node.refresh().await {
                self.console
                    .say(&format!("Error refreshing status: {err}"), Tone::Error)?;
            }
        }
        self.console.ask("Press Enter to continue...")?;
        Ok(Flow::Continue)
    }

    fn render(&mut self) -> Result<(), ShellError> {
        if self.options.clear_screen {
            queue!(self.console.output(), Clear(ClearType::All), MoveTo(0, 0))?;
        }
        self.console.say(BANNER, Tone::Banner)?;
        self.console.say(
            &format!("{:^WIDTH$}", "DEX Lightning TUI v0.1"),
            Tone::Info,
        )?;
        self.console.blank()?;
        match &self.node {
            Some(node) => {
                for line in node.session().status_lines() {
                    self.console.say(&format!("{line:^WIDTH$}"), Tone::Status)?;
                }
            }
            None => self
                .console
                .say(&format!("{NOT_INITIALIZED:^WIDTH$}"), Tone::Error)?,
        }
        self.console.blank()?;
        for (index, action) in MenuAction::ALL.iter().enumerate() {
            self.console
                .say(&format!("      [{index}] {}", action.label()), Tone::Menu)?;
        }
        Ok(())
    }

    /// Run one menu action.
    pub async fn dispatch(&mut self, action: MenuAction) -> Result<Flow, ShellError> {
        match action {
            MenuAction::InitializeLightning => self.initialize().await?,
            MenuAction::ViewExplorers => self.explorers()?,
            MenuAction::GrabCoffee => self.coffee()?,
            MenuAction::Help => self.help()?,
            MenuAction::Exit => return Ok(Flow::Exit),
            _ => {
                let Some(node) = self.node.as_ref() else {
                    self.console
                        .say(&format!(" {NOT_INITIALIZED}"), Tone::Error)?;
                    return Ok(Flow::Continue);
                };
                if let Some(response) = Self::node_action(node, &mut self.console, action).await?
                {
                    self.show(&response)?;
                }
            }
        }
        Ok(Flow::Continue)
    }

    /// Prompt for the action's arguments and issue its single daemon call.
    /// Returns `None` for actions that do not address the node.
    async fn node_action(
        node: &LightningNode<T>,
        console: &mut Console<R, W>,
        action: MenuAction,
    ) -> Result<Option<RpcResponse>, ShellError> {
        let response = match action {
            MenuAction::ConnectToNode => {
                let address = console.ask_or(
                    " Enter lightning node address to connect to: ",
                    DEFAULT_PEER,
                )?;
                node.connect_to_node(&address).await?
            }
            MenuAction::AddTrustedNode => {
                let node_id = console.ask(" Enter Node ID: ")?;
                node.add_trusted_node(&node_id).await?
            }
            MenuAction::RemoveTrustedNode => {
                let node_id = console.ask(" Enter Node ID: ")?;
                node.remove_trusted_node(&node_id).await?
            }
            MenuAction::ListTrustedNodes => node.list_trusted_nodes().await?,
            MenuAction::OpenChannel => {
                let address = console.ask_or(
                    " Enter lightning node address to open a channel with: ",
                    DEFAULT_PEER,
                )?;
                let amount = ask_channel_amount(console)?;
                node.open_channel(&address, amount).await?
            }
            MenuAction::UpdateChannel => {
                let uuid = console.ask(" Enter channel uuid: ")?;
                let options = ChannelOptions {
                    proportional_fee_in_millionths_sats: console
                        .ask_optional_number(" Enter proportional_fee_in_millionths_sats: ")?,
                    base_fee_msat: console.ask_optional_number(" Enter base_fee_msat: ")?,
                    cltv_expiry_delta: console
                        .ask_optional_number(" Enter cltv_expiry_delta: ")?,
                    max_dust_htlc_exposure_msat: console
                        .ask_optional_number(" Enter max_dust_htlc_exposure_msat: ")?,
                    force_close_avoidance_max_fee_sats: console
                        .ask_optional_number(" Enter force_close_avoidance_max_fee_sats: ")?,
                };
                node.update_channel(&uuid, &options).await?
            }
            MenuAction::ListOpenChannels => node.list_open_channels().await?,
            MenuAction::ListClosedChannels => node.list_closed_channels().await?,
            MenuAction::GenerateInvoice => {
                let description = console.ask(" Enter description: ")?;
                let amount: u64 = console.ask_number(" Enter amount_in_msat: ", None)?;
                let expiry: u32 = console.ask_number(" Enter expiry: ", None)?;
                node.generate_invoice(&description, amount, expiry).await?
            }
            MenuAction::PayInvoice => {
                let invoice = console.ask(" Enter invoice: ")?;
                node.send_payment(&Payment::Invoice { invoice }).await?
            }
            MenuAction::PayKeysend => {
                let destination = console.ask(" Enter pubkey: ")?;
                let amount_in_msat: u64 = console.ask_number(" Enter amount_in_msat: ", None)?;
                let expiry: u32 = console.ask_number(" Enter expiry: ", None)?;
                node.send_payment(&Payment::Keysend {
                    destination,
                    amount_in_msat,
                    expiry,
                })
                .await?
            }
            MenuAction::ListPayments => {
                let filter = ask_payment_filter(console)?;
                let page = console.ask_number(" Page [1]: ", Some(1u32))?;
                let limit = console.ask_number(" Limit [10]: ", Some(10u32))?;
                node.list_payments(filter, Paging { page, limit }).await?
            }
            MenuAction::ViewPaymentDetails => {
                let hash = console.ask_or(" Enter payment_hash: ", DEFAULT_PAYMENT_HASH)?;
                node.get_payment_details(&hash).await?
            }
            MenuAction::GetClaimableBalances => {
                let include =
                    console.ask_bool(" Include open channels balances? [Y/n]: ", true)?;
                node.get_claimable_balances(include).await?
            }
            MenuAction::InitializeLightning
            | MenuAction::ViewExplorers
            | MenuAction::GrabCoffee
            | MenuAction::Help
            | MenuAction::Exit => return Ok(None),
        };
        Ok(Some(response))
    }

    async fn initialize(&mut self) -> Result<(), ShellError> {
        if self.node.is_some() {
            self.console
                .say(" Lightning is already initialized.", Tone::Info)?;
            return Ok(());
        }

        let prompt = format!(
            " Select coin to initialize lightning [{}]: ",
            SUPPORTED_COINS.join(", ")
        );
        let coin = loop {
            let coin = self.console.ask_or(&prompt, SUPPORTED_COINS[0])?;
            if SUPPORTED_COINS.contains(&coin.as_str()) {
                break coin;
            }
            self.console
                .say(" Invalid coin selection. Please try again.", Tone::Error)?;
        };
        let defaults = self.options.node_defaults.clone();
        let port = self.console.ask_number(
            &format!(" Select lightning port [{}]: ", defaults.port),
            Some(defaults.port),
        )?;
        let name = self.console.ask_or(
            &format!(" Select lightning node name [{}]: ", defaults.name),
            &defaults.name,
        )?;
        let color = self.console.ask_or(
            &format!(" Select lightning node color (in hex) [{}]: ", defaults.color),
            &defaults.color,
        )?;
        let settings = NodeSettings {
            name,
            port,
            color,
            payment_retries: defaults.payment_retries,
        };

        self.console.say(
            &format!(" Activating {coin} lightning node, this can take a minute..."),
            Tone::Info,
        )?;
        let (node, state) = LightningNode::activate(
            self.rpc.clone(),
            &self.source,
            &coin,
            settings,
            self.options.retry,
        )
        .await?;

        match &state {
            ActivationState::Ok(_) | ActivationState::AlreadyActive => {
                self.console.say(
                    &format!(" {} is active.", node.session().lightning_ticker()),
                    Tone::Ok,
                )?;
                self.node = Some(node);
            }
            ActivationState::Error(message) => {
                self.console
                    .say(&format!(" Activation failed: {message}"), Tone::Error)?;
            }
            ActivationState::TimedOut => {
                self.console.say(
                    " Activation did not finish in time; the task was cancelled.",
                    Tone::Error,
                )?;
            }
            other => {
                self.console
                    .say(&format!(" Activation ended: {other:?}"), Tone::Error)?;
            }
        }
        Ok(())
    }

    fn show(&mut self, response: &RpcResponse) -> Result<(), ShellError> {
        match response {
            RpcResponse::Success(result) => {
                let pretty = serde_json::to_string_pretty(result).unwrap_or_default();
                self.console.say(&pretty, Tone::Ok)
            }
            RpcResponse::Failure(failure) => {
                self.console.say(&format!("Error: {failure}"), Tone::Error)
            }
        }
    }

    fn explorers(&mut self) -> Result<(), ShellError> {
        self.console
            .say("      === Lightning Explorers ===", Tone::Info)?;
        for url in [
            "https://1ml.com/",
            "https://mempool.space/lightning",
            "https://explorer.acinq.co/",
        ] {
            self.console.say(&format!("      {url}"), Tone::Ok)?;
        }
        Ok(())
    }

    fn coffee(&mut self) -> Result<(), ShellError> {
        let lines = [
            ("      Once you have:", Tone::Info),
            ("        - initialised your node", Tone::Info),
            (
                "        - connected to a well known node (check the lightning explorers)",
                Tone::Info,
            ),
            ("        - opened a channel from node", Tone::Info),
            (
                "\n      You can get an invoice for a coffee from https://starblocks.acinq.co!",
                Tone::Menu,
            ),
            (
                "\n        Then pay it with `Pay Invoice` and follow up with `View Payment Details` or `List Payments`",
                Tone::Info,
            ),
        ];
        for (line, tone) in lines {
            self.console.say(line, tone)?;
        }
        Ok(())
    }

    fn help(&mut self) -> Result<(), ShellError> {
        self.console.say(
            "      Get more information about the DEX API Lightning features at:",
            Tone::Ok,
        )?;
        self.console.say(
            "      https://github.com/KomodoPlatform/komodo-docs-mdx/pull/31/files",
            Tone::Ok,
        )
    }
}

fn ask_channel_amount<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
) -> Result<ChannelAmount, ShellError> {
    loop {
        let answer = console.ask(&format!(
            " Enter channel amount or 'max' [{DEFAULT_CHANNEL_VALUE}]: "
        ))?;
        if answer.is_empty() {
            return Ok(DEFAULT_CHANNEL_AMOUNT);
        }
        if answer.eq_ignore_ascii_case("max") {
            return Ok(ChannelAmount::Max);
        }
        match answer.parse::<f64>() {
            Ok(value) if value.is_finite() && value > 0.0 => {
                return Ok(ChannelAmount::Exact(value));
            }
            _ => console.say(" Invalid amount. Enter a positive number or 'max'.", Tone::Error)?,
        }
    }
}

fn ask_payment_filter<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
) -> Result<PaymentFilter, ShellError> {
    loop {
        let answer = console
            .ask(" Filter payments [all/inbound/outbound] (all): ")?
            .to_ascii_lowercase();
        match answer.as_str() {
            "" | "all" => return Ok(PaymentFilter::All),
            "inbound" | "in" => return Ok(PaymentFilter::Inbound),
            "outbound" | "out" => return Ok(PaymentFilter::Outbound),
            _ => console.say(" Unknown filter. Please try again.", Tone::Error)?,
        }
    }
}
