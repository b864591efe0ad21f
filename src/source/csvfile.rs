//! Normalized CSV source and the auxiliary CSV readers.
//!
//! The `norm_csv` source reads the normalized transaction shape emitted
//! by the upstream converters: `transaction_id, datetime, account,
//! symbol, instruction, quantity, cost, rowtype` with `account` and
//! `rowtype` optional.

use crate::domain::{AccountId, Decimal, Instrument, RowType, Side, Transaction, TransactionId};
use crate::engine::inventory::InitialPosition;
use crate::source::{SourceError, TransactionSource};
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::path::Path;

/// Source for files already in the normalized transaction shape.
pub struct NormCsvSource;

#[derive(Debug, Deserialize)]
struct NormRow {
    transaction_id: String,
    datetime: String,
    #[serde(default)]
    account: Option<String>,
    symbol: String,
    instruction: Side,
    quantity: Decimal,
    cost: Decimal,
    #[serde(default)]
    rowtype: Option<RowType>,
}

impl TransactionSource for NormCsvSource {
    fn tag(&self) -> &'static str {
        "norm_csv"
    }

    fn fetch(&self, account: &AccountId, path: &Path) -> Result<Vec<Transaction>, SourceError> {
        let mut reader = csv::Reader::from_path(path).map_err(|e| csv_error(path, e))?;
        let mut transactions = Vec::new();
        for row in reader.deserialize::<NormRow>() {
            let row = row.map_err(|e| csv_error(path, e))?;
            // Reject malformed symbols before they reach the matcher.
            Instrument::parse(&row.symbol)?;
            transactions.push(Transaction {
                transaction_id: TransactionId::new(row.transaction_id),
                datetime: parse_datetime(path, &row.datetime)?,
                account: row
                    .account
                    .map(AccountId::new)
                    .unwrap_or_else(|| account.clone()),
                symbol: row.symbol,
                instruction: row.instruction,
                quantity: row.quantity.abs(),
                cost: row.cost,
                rowtype: row.rowtype.unwrap_or_default(),
                chain_id: None,
            });
        }
        Ok(transactions)
    }
}

/// Starting-position file shape: `account, group, symbol, quantity,
/// price, mark, cost, net_liq`. Only the columns the matcher needs are
/// kept.
#[derive(Debug, Deserialize)]
struct PositionRow {
    #[serde(default)]
    account: Option<String>,
    symbol: String,
    quantity: Decimal,
    cost: Decimal,
}

/// Read an initial-positions file for one account.
pub fn read_initial_positions(
    account: &AccountId,
    path: &Path,
) -> Result<Vec<InitialPosition>, SourceError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| csv_error(path, e))?;
    let mut positions = Vec::new();
    for row in reader.deserialize::<PositionRow>() {
        let row = row.map_err(|e| csv_error(path, e))?;
        Instrument::parse(&row.symbol)?;
        positions.push(InitialPosition {
            account: row
                .account
                .map(AccountId::new)
                .unwrap_or_else(|| account.clone()),
            symbol: row.symbol,
            quantity: row.quantity,
            cost: row.cost,
        });
    }
    Ok(positions)
}

#[derive(Debug, Deserialize)]
struct PriceRow {
    symbol: String,
    price: Decimal,
}

/// Read a quotes file of (symbol, price) pairs for the mark engine.
pub fn read_price_csv(path: &Path) -> Result<Vec<(String, Decimal)>, SourceError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| csv_error(path, e))?;
    let mut prices = Vec::new();
    for row in reader.deserialize::<PriceRow>() {
        let row = row.map_err(|e| csv_error(path, e))?;
        prices.push((row.symbol, row.price));
    }
    Ok(prices)
}

fn parse_datetime(path: &Path, value: &str) -> Result<NaiveDateTime, SourceError> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|_| SourceError::Datetime {
            path: path.to_path_buf(),
            value: value.to_string(),
        })
}

fn csv_error(path: &Path, source: csv::Error) -> SourceError {
    SourceError::Csv {
        path: path.to_path_buf(),
        source,
    }
}
