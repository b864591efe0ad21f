//! Win/loss profit target derivation.
//!
//! Targets come from a Kelly-criterion-derived sizing: the win target is
//! the win fraction applied to the chain's accumulated net credit, and
//! the loss target is scaled by pop / (1 - pop) so the expected value
//! over repeated trades at the estimated probability of profit is
//! non-negative. Explicit overrides in the database always win and are
//! never written back.

use crate::domain::{Chain, Decimal, Transaction, TransactionId};
use crate::error::{ImportReport, ImportWarning};
use std::collections::HashMap;

/// Derived (or passed-through) targets for one chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainTargets {
    pub pnl_win: Option<Decimal>,
    pub pnl_loss: Option<Decimal>,
}

/// Derives per-chain win/loss targets from pop and win-fraction inputs.
pub struct TargetCalculator {
    default_target: Decimal,
}

impl TargetCalculator {
    pub fn new(default_target: Decimal) -> Self {
        TargetCalculator { default_target }
    }

    /// Accumulated net credit of a chain: the sum of signed cost over its
    /// transactions present in the window.
    pub fn net_credit(chain: &Chain, transactions: &[Transaction]) -> Decimal {
        let by_id: HashMap<&TransactionId, &Transaction> = transactions
            .iter()
            .map(|t| (&t.transaction_id, t))
            .collect();
        chain
            .all_ids()
            .filter_map(|id| by_id.get(id))
            .fold(Decimal::zero(), |acc, txn| acc + txn.cost)
    }

    /// Compute targets for one chain. Pure over the chain and its net
    /// credit; explicit values pass through untouched.
    pub fn compute(
        &self,
        chain: &Chain,
        net_credit: Decimal,
        report: &mut ImportReport,
    ) -> ChainTargets {
        let mut targets = ChainTargets {
            pnl_win: chain.pnl_win,
            pnl_loss: chain.pnl_loss,
        };
        if targets.pnl_win.is_some() && targets.pnl_loss.is_some() {
            return targets;
        }

        let pop = match chain.pop {
            Some(pop) => pop,
            None => return targets,
        };
        if !pop.is_positive() || pop >= Decimal::one() {
            report.warn(ImportWarning::DegenerateProbability {
                chain_id: chain.chain_id.clone(),
                pop,
            });
            return targets;
        }

        let fraction = chain.target.unwrap_or(self.default_target);
        let win = fraction * net_credit.abs();
        let loss = -(win * pop / (Decimal::one() - pop));

        targets.pnl_win.get_or_insert(win);
        targets.pnl_loss.get_or_insert(loss);
        targets
    }
}
