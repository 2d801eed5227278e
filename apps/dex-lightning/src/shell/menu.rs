/// Entries of the main menu, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    InitializeLightning,
    ConnectToNode,
    AddTrustedNode,
    RemoveTrustedNode,
    ListTrustedNodes,
    OpenChannel,
    UpdateChannel,
    ListOpenChannels,
    ListClosedChannels,
    GenerateInvoice,
    PayInvoice,
    PayKeysend,
    ListPayments,
    ViewPaymentDetails,
    GetClaimableBalances,
    ViewExplorers,
    GrabCoffee,
    Help,
    Exit,
}

impl MenuAction {
    pub const ALL: [MenuAction; 19] = [
        MenuAction::InitializeLightning,
        MenuAction::ConnectToNode,
        MenuAction::AddTrustedNode,
        MenuAction::RemoveTrustedNode,
        MenuAction::ListTrustedNodes,
        MenuAction::OpenChannel,
        MenuAction::UpdateChannel,
        MenuAction::ListOpenChannels,
        MenuAction::ListClosedChannels,
        MenuAction::GenerateInvoice,
        MenuAction::PayInvoice,
        MenuAction::PayKeysend,
        MenuAction::ListPayments,
        MenuAction::ViewPaymentDetails,
        MenuAction::GetClaimableBalances,
        MenuAction::ViewExplorers,
        MenuAction::GrabCoffee,
        MenuAction::Help,
        MenuAction::Exit,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MenuAction::InitializeLightning => "Initialize Lightning",
            MenuAction::ConnectToNode => "Connect to Lightning Node",
            MenuAction::AddTrustedNode => "Add Trusted Node",
            MenuAction::RemoveTrustedNode => "Remove Trusted Node",
            MenuAction::ListTrustedNodes => "List Trusted Nodes",
            MenuAction::OpenChannel => "Open Channel",
            MenuAction::UpdateChannel => "Update Channel",
            MenuAction::ListOpenChannels => "List Open Channels",
            MenuAction::ListClosedChannels => "List Closed Channels",
            MenuAction::GenerateInvoice => "Generate Invoice",
            MenuAction::PayInvoice => "Pay Invoice",
            MenuAction::PayKeysend => "Pay Keysend",
            MenuAction::ListPayments => "List Payments",
            MenuAction::ViewPaymentDetails => "View Payment Details",
            MenuAction::GetClaimableBalances => "Get Claimable Balances",
            MenuAction::ViewExplorers => "View Lightning Explorers",
            MenuAction::GrabCoffee => "Grab a coffee from StarBlocks",
            MenuAction::Help => "Help!",
            MenuAction::Exit => "Exit TUI",
        }
    }

    pub fn index(self) -> usize {
        MenuAction::ALL
            .iter()
            .position(|a| *a == self)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChoiceError {
    #[error("{0:?} is not a number")]
    NotANumber(String),
    #[error("option {index} is out of range (0-{max})")]
    OutOfRange { index: i64, max: usize },
}

/// Parse a menu selection typed by the user.
pub fn parse_choice(input: &str) -> Result<MenuAction, ChoiceError> {
    let trimmed = input.trim();
    let index: i64 = trimmed
        .parse()
        .map_err(|_| ChoiceError::NotANumber(trimmed.to_owned()))?;
    let max = MenuAction::ALL.len() - 1;
    usize::try_from(index)
        .ok()
        .and_then(|i| MenuAction::ALL.get(i).copied())
        .ok_or(ChoiceError::OutOfRange { index, max })
}
