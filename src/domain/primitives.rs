//! Domain primitives: AccountId, TransactionId, ChainId, Side, RowType,
//! ChainStatus.

use serde::{Deserialize, Serialize};

/// Broker account identifier (nickname after normalization).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(pub String);

impl AccountId {
    /// Create an AccountId from a string.
    pub fn new(account: impl Into<String>) -> Self {
        AccountId(account.into())
    }

    /// Get the account as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Globally unique transaction identifier within an account's history.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub String);

impl TransactionId {
    /// Create a TransactionId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        TransactionId(id.into())
    }

    /// Get the id as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable chain identifier, minted once and preserved across imports.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChainId(pub String);

impl ChainId {
    /// Create a ChainId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        ChainId(id.into())
    }

    /// Get the id as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trade instruction: Buy or Sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy side (adds to a long position).
    Buy,
    /// Sell side (adds to a short position).
    Sell,
}

impl Side {
    /// Get the signed multiplier for this side (+1 for Buy, -1 for Sell).
    pub fn sign(&self) -> i32 {
        match self {
            Side::Buy => 1,
            Side::Sell => -1,
        }
    }

    /// The opposite instruction.
    pub fn flipped(&self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Kind of a ledger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RowType {
    /// A real broker transaction.
    #[default]
    Transaction,
    /// A synthesized opening row from an initial-positions file.
    Open,
    /// A synthetic valuation row for open inventory.
    Mark,
}

impl std::fmt::Display for RowType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowType::Transaction => write!(f, "Transaction"),
            RowType::Open => write!(f, "Open"),
            RowType::Mark => write!(f, "Mark"),
        }
    }
}

/// Review status of a chain.
///
/// ACTIVE and CLOSED are derived by the engine every run. FINAL and
/// IGNORE are set only by hand in the chains database and are never
/// changed by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChainStatus {
    /// Open inventory remains; the default for new chains.
    #[default]
    Active,
    /// All inventory returned to zero at the last transaction.
    Closed,
    /// User-confirmed complete; the closure invariant is enforced.
    Final,
    /// User-excluded; transactions are bound verbatim, never re-matched.
    Ignore,
}

impl ChainStatus {
    /// Terminal statuses are owned by the user and never recomputed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChainStatus::Final | ChainStatus::Ignore)
    }
}

impl std::fmt::Display for ChainStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainStatus::Active => write!(f, "ACTIVE"),
            ChainStatus::Closed => write!(f, "CLOSED"),
            ChainStatus::Final => write!(f, "FINAL"),
            ChainStatus::Ignore => write!(f, "IGNORE"),
        }
    }
}
