//! Chain records and the ordered chains database.
//!
//! A chain is one complete trade lifecycle. The record is a three-way
//! merge surface: `ids` and the annotation fields belong to the user and
//! are copied through verbatim; `status` and `auto_ids` belong to the
//! engine and are recomputed every import; `chain_id` is the identity key
//! aligning the two.

use crate::domain::{ChainId, ChainStatus, Decimal, TransactionId};
use serde::{Deserialize, Serialize};

/// One logical trade and its review-workflow state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chain {
    /// Stable identity, minted once and preserved across imports.
    pub chain_id: ChainId,

    /// Review status; FINAL and IGNORE only ever set by hand.
    #[serde(default)]
    pub status: ChainStatus,

    /// Presentation group label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    /// Best-effort strategy label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,

    /// Free-form note, may be multi-line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    /// Probability of profit estimate in [0, 1].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pop: Option<Decimal>,

    /// Win fraction for target derivation (settings default when absent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Decimal>,

    /// Explicit win target; never overwritten by the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pnl_win: Option<Decimal>,

    /// Explicit loss target; never overwritten by the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pnl_loss: Option<Decimal>,

    /// User-curated transaction ids. The engine never adds to or removes
    /// from this set.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<TransactionId>,

    /// Engine-owned transaction ids, discarded and rebuilt each import.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub auto_ids: Vec<TransactionId>,
}

impl Chain {
    /// A freshly discovered chain with only its identity set.
    pub fn new(chain_id: ChainId) -> Self {
        Chain {
            chain_id,
            status: ChainStatus::Active,
            group: None,
            strategy: None,
            comment: None,
            pop: None,
            target: None,
            pnl_win: None,
            pnl_loss: None,
            ids: Vec::new(),
            auto_ids: Vec::new(),
        }
    }

    /// All transaction ids bound to this chain, user-owned first.
    pub fn all_ids(&self) -> impl Iterator<Item = &TransactionId> {
        self.ids.iter().chain(self.auto_ids.iter())
    }
}

/// Ordered collection of chains, read from and written back to the
/// hand-maintained database file. Order is preserved so rewrites stay
/// diff-minimal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainsDb {
    #[serde(default)]
    pub chains: Vec<Chain>,
}

impl ChainsDb {
    pub fn new() -> Self {
        ChainsDb { chains: Vec::new() }
    }

    pub fn get(&self, chain_id: &ChainId) -> Option<&Chain> {
        self.chains.iter().find(|c| &c.chain_id == chain_id)
    }

    pub fn get_mut(&mut self, chain_id: &ChainId) -> Option<&mut Chain> {
        self.chains.iter_mut().find(|c| &c.chain_id == chain_id)
    }

    pub fn contains(&self, chain_id: &ChainId) -> bool {
        self.get(chain_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}
