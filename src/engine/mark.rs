//! Mark synthesis: unrealized value rows for open inventory.
//!
//! Given a point-in-time price map, every (account, instrument) with
//! nonzero open inventory gets a synthetic Mark row valuing the position
//! at the supplied price. Marks inherit the chain of the open position
//! they value and never feed back into matching.

use crate::domain::{Decimal, Instrument, RowType, Side, Transaction};
use crate::engine::inventory::InventoryBook;
use crate::error::{ImportReport, ImportWarning};
use chrono::NaiveDateTime;
use std::collections::HashMap;

/// Point-in-time quotes supplied by an external collaborator.
#[derive(Debug, Clone)]
pub struct PriceMap {
    prices: HashMap<String, Decimal>,
    asof: NaiveDateTime,
}

impl PriceMap {
    pub fn new(prices: HashMap<String, Decimal>, asof: NaiveDateTime) -> Self {
        PriceMap { prices, asof }
    }

    pub fn from_pairs(pairs: Vec<(String, Decimal)>, asof: NaiveDateTime) -> Self {
        Self::new(pairs.into_iter().collect(), asof)
    }

    pub fn get(&self, symbol: &str) -> Option<Decimal> {
        self.prices.get(symbol).copied()
    }

    pub fn asof(&self) -> NaiveDateTime {
        self.asof
    }
}

/// Emits Mark rows for currently open inventory.
pub struct MarkEngine<'a> {
    futures_multipliers: &'a HashMap<String, Decimal>,
}

impl<'a> MarkEngine<'a> {
    pub fn new(futures_multipliers: &'a HashMap<String, Decimal>) -> Self {
        MarkEngine {
            futures_multipliers,
        }
    }

    /// Produce one Mark row per open position with an available price.
    ///
    /// `transactions` must already be chain-annotated; a mark inherits
    /// the chain of the last annotated transaction on its position.
    /// Missing prices are reported as pricing gaps, not fatal.
    pub fn mark_positions(
        &self,
        book: &InventoryBook,
        transactions: &[Transaction],
        prices: &PriceMap,
        report: &mut ImportReport,
    ) -> Vec<Transaction> {
        let mut marks = Vec::new();
        for (account, symbol, net_quantity) in book.open_positions() {
            let price = match prices.get(symbol) {
                Some(price) => price,
                None => {
                    report.warn(ImportWarning::PricingGap {
                        account: account.clone(),
                        symbol: symbol.to_string(),
                    });
                    continue;
                }
            };

            let multiplier = Instrument::parse(symbol)
                .map(|inst| inst.multiplier(self.futures_multipliers))
                .unwrap_or_else(|_| Decimal::one());

            // The flattening instruction: sell a long, buy back a short.
            let instruction = if net_quantity.is_positive() {
                Side::Sell
            } else {
                Side::Buy
            };
            let quantity = net_quantity.abs();
            let cost = net_quantity * price * multiplier;

            let chain_id = transactions
                .iter()
                .rev()
                .find(|t| t.account == *account && t.symbol == symbol && t.chain_id.is_some())
                .and_then(|t| t.chain_id.clone());

            let transaction_id = Transaction::synthetic_id(
                "mark",
                account,
                symbol,
                prices.asof(),
                instruction,
                &quantity,
                &cost,
            );
            marks.push(Transaction {
                transaction_id,
                datetime: prices.asof(),
                account: account.clone(),
                symbol: symbol.to_string(),
                instruction,
                quantity,
                cost,
                rowtype: RowType::Mark,
                chain_id,
            });
        }
        marks
    }
}
