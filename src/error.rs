//! Import error taxonomy and the non-fatal warning report.
//!
//! Fatal errors abort the run before any output is written. Non-fatal
//! conditions are collected into an [`ImportReport`] and surfaced to the
//! caller after the run completes; they are never silently dropped.

use crate::config::ConfigError;
use crate::domain::{AccountId, ChainId, Decimal, TransactionId};
use crate::source::SourceError;
use thiserror::Error;

/// Fatal import failures.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("duplicate transaction id {transaction_id} in account {account}")]
    DuplicateTransaction {
        account: AccountId,
        transaction_id: TransactionId,
    },
    #[error("FINAL chain {chain_id} has nonzero open quantity {quantity} in {symbol}")]
    InvariantViolation {
        chain_id: ChainId,
        symbol: String,
        quantity: Decimal,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("chains database error: {0}")]
    Db(#[from] serde_yaml::Error),
    #[error("artifact write failed: {0}")]
    Artifact(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Non-fatal conditions observed during an import.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ImportWarning {
    #[error("transaction {transaction_id} could not be placed in any chain: {reason}")]
    OrphanTransaction {
        transaction_id: TransactionId,
        reason: String,
    },
    #[error("no price for open position {symbol} in account {account}")]
    PricingGap { account: AccountId, symbol: String },
    #[error("chain {chain_id} references transaction {transaction_id} absent from this window")]
    ReferenceMismatch {
        chain_id: ChainId,
        transaction_id: TransactionId,
    },
    #[error("dropped duplicate transaction id {transaction_id} in account {account}")]
    DroppedDuplicate {
        account: AccountId,
        transaction_id: TransactionId,
    },
    #[error("chain {chain_id} has degenerate pop {pop}; targets left unset")]
    DegenerateProbability { chain_id: ChainId, pop: Decimal },
}

/// Accumulated warnings from one import run.
#[derive(Debug, Default, Clone)]
pub struct ImportReport {
    pub warnings: Vec<ImportWarning>,
}

impl ImportReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning; logged immediately, surfaced again at the end.
    pub fn warn(&mut self, warning: ImportWarning) {
        tracing::warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_collects_warnings() {
        let mut report = ImportReport::new();
        assert!(report.is_clean());

        report.warn(ImportWarning::PricingGap {
            account: AccountId::new("main"),
            symbol: "SPY".to_string(),
        });
        assert!(!report.is_clean());
        assert_eq!(report.len(), 1);
    }

    #[test]
    fn test_warning_messages_name_the_subject() {
        let warning = ImportWarning::ReferenceMismatch {
            chain_id: ChainId::new("main.210601_100000.SPY"),
            transaction_id: TransactionId::new("t42"),
        };
        let message = warning.to_string();
        assert!(message.contains("main.210601_100000.SPY"));
        assert!(message.contains("t42"));
    }

    #[test]
    fn test_fatal_error_display() {
        let err = ImportError::DuplicateTransaction {
            account: AccountId::new("main"),
            transaction_id: TransactionId::new("t1"),
        };
        assert!(err.to_string().contains("duplicate transaction id t1"));
    }
}
