//! Inventory matching: running per-(account, instrument) positions.
//!
//! The matcher consumes the full sorted transaction stream, validates
//! transaction-id uniqueness, synthesizes opening rows from configured
//! starting positions, and maintains the FIFO running inventory that
//! downstream closure checks observe. It performs no I/O.

use crate::domain::{
    sort_transactions, AccountId, Decimal, RowType, Side, Transaction, TransactionId,
};
use crate::error::{ImportError, ImportReport, ImportWarning};
use std::collections::{BTreeMap, HashSet, VecDeque};

/// A declared starting position from a per-account positions file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialPosition {
    pub account: AccountId,
    pub symbol: String,
    /// Signed quantity: positive long, negative short.
    pub quantity: Decimal,
    /// Total signed cash effect of having opened the position.
    pub cost: Decimal,
}

/// One FIFO lot of an open position.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Lot {
    /// Signed quantity; every lot in a position shares one sign.
    quantity: Decimal,
    /// Signed cash effect attributed to this lot.
    cost: Decimal,
}

/// Running position for one (account, instrument) pair.
///
/// Owned exclusively by the matcher during a single pass; rebuilt fresh
/// each run, never retained between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Position {
    lots: VecDeque<Lot>,
}

impl Position {
    /// Net signed quantity.
    pub fn quantity(&self) -> Decimal {
        self.lots
            .iter()
            .fold(Decimal::zero(), |acc, lot| acc + lot.quantity)
    }

    /// Cost basis of the remaining open lots.
    pub fn cost_basis(&self) -> Decimal {
        self.lots
            .iter()
            .fold(Decimal::zero(), |acc, lot| acc + lot.cost)
    }

    pub fn is_flat(&self) -> bool {
        self.quantity().is_zero()
    }

    /// Apply a signed quantity and its total cash effect in FIFO order.
    ///
    /// Opposite-sign quantity consumes the oldest lots first; anything
    /// left over after the position crosses zero opens a new lot carrying
    /// its proportional share of the incoming cost.
    fn apply(&mut self, quantity: Decimal, cost: Decimal) {
        if quantity.is_zero() {
            return;
        }
        let mut remaining = quantity;
        let mut remaining_cost = cost;
        while !remaining.is_zero() {
            match self.lots.front_mut() {
                Some(front) if front.quantity.is_positive() != remaining.is_positive() => {
                    if remaining.abs() >= front.quantity.abs() {
                        let consumed_cost =
                            remaining_cost * (front.quantity.abs() / remaining.abs());
                        remaining = remaining + front.quantity;
                        remaining_cost = remaining_cost - consumed_cost;
                        self.lots.pop_front();
                    } else {
                        let kept = Decimal::one() - remaining.abs() / front.quantity.abs();
                        front.cost = front.cost * kept;
                        front.quantity = front.quantity + remaining;
                        remaining = Decimal::zero();
                    }
                }
                _ => {
                    self.lots.push_back(Lot {
                        quantity: remaining,
                        cost: remaining_cost,
                    });
                    remaining = Decimal::zero();
                }
            }
        }
    }
}

/// All running positions of one matching pass, keyed by
/// (account, symbol). BTreeMap keeps iteration deterministic.
#[derive(Debug, Clone, Default)]
pub struct InventoryBook {
    positions: BTreeMap<(AccountId, String), Position>,
}

impl InventoryBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one transaction's position effect.
    pub fn apply(&mut self, txn: &Transaction) {
        self.positions
            .entry((txn.account.clone(), txn.symbol.clone()))
            .or_default()
            .apply(txn.signed_quantity(), txn.cost);
    }

    /// Net open quantity for an (account, instrument) pair.
    pub fn net_quantity(&self, account: &AccountId, symbol: &str) -> Decimal {
        self.positions
            .get(&(account.clone(), symbol.to_string()))
            .map(Position::quantity)
            .unwrap_or_else(Decimal::zero)
    }

    /// Cost basis of the open position for an (account, instrument) pair.
    pub fn cost_basis(&self, account: &AccountId, symbol: &str) -> Decimal {
        self.positions
            .get(&(account.clone(), symbol.to_string()))
            .map(Position::cost_basis)
            .unwrap_or_else(Decimal::zero)
    }

    /// All currently open (nonzero) positions in deterministic order.
    pub fn open_positions(&self) -> impl Iterator<Item = (&AccountId, &str, Decimal)> {
        self.positions.iter().filter_map(|((account, symbol), p)| {
            let quantity = p.quantity();
            (!quantity.is_zero()).then_some((account, symbol.as_str(), quantity))
        })
    }
}

/// The matcher's output: the enriched sorted stream plus the final book.
#[derive(Debug, Clone)]
pub struct MatchedLedger {
    pub transactions: Vec<Transaction>,
    pub book: InventoryBook,
}

/// Builds a validated, ordered inventory from a transaction stream.
pub struct InventoryMatcher {
    force: bool,
}

impl InventoryMatcher {
    /// `force` downgrades duplicate-id validation failures to warnings,
    /// discarding the offending record.
    pub fn new(force: bool) -> Self {
        InventoryMatcher { force }
    }

    /// Match a transaction stream, synthesizing opening rows for the
    /// supplied starting positions.
    ///
    /// # Errors
    /// `ImportError::DuplicateTransaction` when a transaction id repeats
    /// within an account, unless force mode is on.
    pub fn match_transactions(
        &self,
        mut transactions: Vec<Transaction>,
        initial_positions: &[InitialPosition],
        report: &mut ImportReport,
    ) -> Result<MatchedLedger, ImportError> {
        // Sorting is the pipeline precondition; enforce it here rather
        // than trusting sources.
        sort_transactions(&mut transactions);

        let opening_rows = synthesize_opening_rows(&transactions, initial_positions);
        let mut all = opening_rows;
        all.extend(transactions);
        sort_transactions(&mut all);

        let mut seen: HashSet<(AccountId, TransactionId)> = HashSet::new();
        let mut book = InventoryBook::new();
        let mut matched = Vec::with_capacity(all.len());

        for txn in all {
            let key = (txn.account.clone(), txn.transaction_id.clone());
            if !seen.insert(key) {
                if self.force {
                    report.warn(ImportWarning::DroppedDuplicate {
                        account: txn.account.clone(),
                        transaction_id: txn.transaction_id.clone(),
                    });
                    continue;
                }
                return Err(ImportError::DuplicateTransaction {
                    account: txn.account,
                    transaction_id: txn.transaction_id,
                });
            }
            book.apply(&txn);
            matched.push(txn);
        }

        tracing::debug!(
            transactions = matched.len(),
            "inventory matching complete"
        );
        Ok(MatchedLedger {
            transactions: matched,
            book,
        })
    }
}

/// Translate starting positions into synthetic BUY/SELL rows dated just
/// before the earliest real transaction.
fn synthesize_opening_rows(
    transactions: &[Transaction],
    initial_positions: &[InitialPosition],
) -> Vec<Transaction> {
    if initial_positions.is_empty() {
        return Vec::new();
    }
    let open_datetime = transactions
        .first()
        .map(|t| t.datetime - chrono::Duration::seconds(1))
        .unwrap_or(chrono::NaiveDateTime::UNIX_EPOCH);

    initial_positions
        .iter()
        .filter(|p| !p.quantity.is_zero())
        .map(|p| {
            let instruction = if p.quantity.is_positive() {
                Side::Buy
            } else {
                Side::Sell
            };
            let quantity = p.quantity.abs();
            let transaction_id = Transaction::synthetic_id(
                "open",
                &p.account,
                &p.symbol,
                open_datetime,
                instruction,
                &quantity,
                &p.cost,
            );
            Transaction {
                transaction_id,
                datetime: open_datetime,
                account: p.account.clone(),
                symbol: p.symbol.clone(),
                instruction,
                quantity,
                cost: p.cost,
                rowtype: RowType::Open,
                chain_id: None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_position_fifo_partial_close() {
        let mut position = Position::default();
        position.apply(d("10"), d("-1000"));
        position.apply(d("-4"), d("450"));
        assert_eq!(position.quantity(), d("6"));
        // 4 of the 10 units closed: basis keeps 6/10 of -1000.
        assert_eq!(position.cost_basis(), d("-600"));
    }

    #[test]
    fn test_position_fifo_crossing_zero() {
        let mut position = Position::default();
        position.apply(d("10"), d("-1000"));
        position.apply(d("-15"), d("1650"));
        assert_eq!(position.quantity(), d("-5"));
        // 10 units offset the long lot; 5 remain short with their share
        // of the incoming credit.
        assert_eq!(position.cost_basis(), d("550"));
    }

    #[test]
    fn test_position_flat_after_exact_close() {
        let mut position = Position::default();
        position.apply(d("3"), d("-300"));
        position.apply(d("-3"), d("330"));
        assert!(position.is_flat());
        assert_eq!(position.cost_basis(), Decimal::zero());
    }

    #[test]
    fn test_position_consumes_oldest_lot_first() {
        let mut position = Position::default();
        position.apply(d("2"), d("-200"));
        position.apply(d("2"), d("-300"));
        position.apply(d("-2"), d("260"));
        assert_eq!(position.quantity(), d("2"));
        // The first lot (cost -200) is consumed; the second remains.
        assert_eq!(position.cost_basis(), d("-300"));
    }
}
