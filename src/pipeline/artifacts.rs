//! Tabular output artifacts: the matched transactions table and the
//! one-row-per-chain summary.

use crate::domain::{Chain, ChainStatus, Decimal, Transaction};
use crate::error::ImportError;
use serde::Serialize;
use std::path::Path;

/// One row of the transactions artifact.
#[derive(Debug, Serialize)]
struct TransactionRow<'a> {
    transaction_id: &'a str,
    datetime: String,
    account: &'a str,
    symbol: &'a str,
    instruction: String,
    quantity: String,
    cost: String,
    rowtype: String,
    chain_id: &'a str,
}

impl<'a> TransactionRow<'a> {
    fn from_transaction(txn: &'a Transaction) -> Self {
        TransactionRow {
            transaction_id: txn.transaction_id.as_str(),
            datetime: txn.datetime.format("%Y-%m-%d %H:%M:%S").to_string(),
            account: txn.account.as_str(),
            symbol: &txn.symbol,
            instruction: txn.instruction.to_string(),
            quantity: txn.quantity.to_canonical_string(),
            cost: txn.cost.to_canonical_string(),
            rowtype: txn.rowtype.to_string(),
            chain_id: txn.chain_id.as_ref().map(|c| c.as_str()).unwrap_or(""),
        }
    }
}

/// Aggregated one-row-per-chain summary for downstream consumption.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChainSummaryRow {
    pub chain_id: String,
    pub account: String,
    pub underlying: String,
    pub asset_class: String,
    pub status: ChainStatus,
    pub first_datetime: String,
    pub last_datetime: String,
    pub txn_count: usize,
    pub net_credit: Decimal,
    pub pop: Option<Decimal>,
    pub target: Option<Decimal>,
    pub pnl_win: Option<Decimal>,
    pub pnl_loss: Option<Decimal>,
    pub group: Option<String>,
    pub strategy: Option<String>,
}

impl ChainSummaryRow {
    /// Build a summary row from a chain and its window transactions
    /// (already filtered to ids ∪ auto_ids, in stream order).
    pub fn build(
        chain: &Chain,
        transactions: &[&Transaction],
        asset_class: Option<&str>,
        net_credit: Decimal,
        pnl_win: Option<Decimal>,
        pnl_loss: Option<Decimal>,
    ) -> Self {
        let underlying = transactions
            .first()
            .and_then(|t| crate::domain::Instrument::parse(&t.symbol).ok())
            .map(|inst| inst.underlying)
            .unwrap_or_default();
        ChainSummaryRow {
            chain_id: chain.chain_id.as_str().to_string(),
            account: transactions
                .first()
                .map(|t| t.account.as_str().to_string())
                .unwrap_or_default(),
            underlying,
            asset_class: asset_class.unwrap_or("").to_string(),
            status: chain.status,
            first_datetime: transactions
                .first()
                .map(|t| t.datetime.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default(),
            last_datetime: transactions
                .last()
                .map(|t| t.datetime.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default(),
            txn_count: transactions.len(),
            net_credit,
            pop: chain.pop,
            target: chain.target,
            pnl_win,
            pnl_loss,
            group: chain.group.clone(),
            strategy: chain.strategy.clone(),
        }
    }
}

/// Write the transactions artifact (matched rows followed by marks).
pub fn write_transactions_csv(
    path: &Path,
    transactions: &[Transaction],
    marks: &[Transaction],
) -> Result<(), ImportError> {
    let mut writer = csv::Writer::from_path(path)?;
    for txn in transactions.iter().chain(marks.iter()) {
        writer.serialize(TransactionRow::from_transaction(txn))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the chains summary artifact.
pub fn write_chains_csv(path: &Path, rows: &[ChainSummaryRow]) -> Result<(), ImportError> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccountId, ChainId, RowType, Side, TransactionId};
    use chrono::NaiveDate;

    fn txn(id: &str) -> Transaction {
        Transaction {
            transaction_id: TransactionId::new(id),
            datetime: NaiveDate::from_ymd_opt(2021, 6, 1)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            account: AccountId::new("main"),
            symbol: "SPY".to_string(),
            instruction: Side::Buy,
            quantity: Decimal::from_i64(10),
            cost: Decimal::from_i64(-4200),
            rowtype: RowType::Transaction,
            chain_id: Some(ChainId::new("main.210601_100000.SPY")),
        }
    }

    #[test]
    fn test_transactions_csv_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transactions.csv");
        write_transactions_csv(&path, &[txn("t1")], &[]).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "transaction_id,datetime,account,symbol,instruction,quantity,cost,rowtype,chain_id"
        );
        assert_eq!(
            lines.next().unwrap(),
            "t1,2021-06-01 10:00:00,main,SPY,BUY,10,-4200,Transaction,main.210601_100000.SPY"
        );
    }

    #[test]
    fn test_summary_row_from_chain() {
        let mut chain = Chain::new(ChainId::new("c1"));
        chain.group = Some("earnings".to_string());
        let t = txn("t1");
        let row = ChainSummaryRow::build(
            &chain,
            &[&t],
            Some("EquityIndex"),
            Decimal::from_i64(-4200),
            Some(Decimal::from_i64(100)),
            Some(Decimal::from_i64(-50)),
        );
        assert_eq!(row.underlying, "SPY");
        assert_eq!(row.account, "main");
        assert_eq!(row.asset_class, "EquityIndex");
        assert_eq!(row.txn_count, 1);
        assert_eq!(row.group.as_deref(), Some("earnings"));
    }
}
