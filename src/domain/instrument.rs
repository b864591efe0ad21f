//! Normalized instrument symbol parsing.
//!
//! The engine consumes symbols already normalized by the upstream broker
//! converters. Four shapes exist:
//!
//! - Equity:            `SPY`
//! - Future:            `/CLK21`
//! - Equity option:     `SPY_063021C420`
//! - Future option:     `/CLK21_CLM21P65`
//!
//! The part before the underscore is the underlying, which also serves as
//! the instrument-family key for chain grouping: an option always belongs
//! to the same family as its underlying equity or future.

use crate::domain::Decimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Contract size for listed equity options.
const EQUITY_OPTION_MULTIPLIER: i64 = 100;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid instrument symbol: {0}")]
pub struct InstrumentError(pub String);

/// Kind of instrument encoded in a normalized symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstrumentKind {
    Equity,
    Future,
    EquityOption,
    FutureOption,
}

/// Put or call flag on an option symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PutCall {
    Put,
    Call,
}

/// A parsed normalized instrument symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instrument {
    pub symbol: String,
    pub underlying: String,
    pub kind: InstrumentKind,
    /// Expiration date, equity options only.
    pub expiration: Option<NaiveDate>,
    /// Option expiration code, future options only (e.g. `CLM21`).
    pub expcode: Option<String>,
    pub put_call: Option<PutCall>,
    pub strike: Option<Decimal>,
}

impl Instrument {
    /// Parse a normalized symbol into its components.
    pub fn parse(symbol: &str) -> Result<Instrument, InstrumentError> {
        if symbol.is_empty() {
            return Err(InstrumentError(symbol.to_string()));
        }

        let (underlying, suffix) = match symbol.split_once('_') {
            Some((u, s)) => (u, Some(s)),
            None => (symbol, None),
        };
        if underlying.is_empty() {
            return Err(InstrumentError(symbol.to_string()));
        }

        let is_future = underlying.starts_with('/');
        match suffix {
            None => Ok(Instrument {
                symbol: symbol.to_string(),
                underlying: underlying.to_string(),
                kind: if is_future {
                    InstrumentKind::Future
                } else {
                    InstrumentKind::Equity
                },
                expiration: None,
                expcode: None,
                put_call: None,
                strike: None,
            }),
            Some(opt) if is_future => {
                // Future option: <expcode><P|C><strike>
                let (head, put_call, strike) = split_option_tail(symbol, opt)?;
                if head.is_empty() {
                    return Err(InstrumentError(symbol.to_string()));
                }
                Ok(Instrument {
                    symbol: symbol.to_string(),
                    underlying: underlying.to_string(),
                    kind: InstrumentKind::FutureOption,
                    expiration: None,
                    expcode: Some(head.to_string()),
                    put_call: Some(put_call),
                    strike: Some(strike),
                })
            }
            Some(opt) => {
                // Equity option: <MMDDYY><P|C><strike>
                let (head, put_call, strike) = split_option_tail(symbol, opt)?;
                let expiration = NaiveDate::parse_from_str(head, "%m%d%y")
                    .map_err(|_| InstrumentError(symbol.to_string()))?;
                Ok(Instrument {
                    symbol: symbol.to_string(),
                    underlying: underlying.to_string(),
                    kind: InstrumentKind::EquityOption,
                    expiration: Some(expiration),
                    expcode: None,
                    put_call: Some(put_call),
                    strike: Some(strike),
                })
            }
        }
    }

    /// The family key used for automatic chain grouping.
    ///
    /// Equities group with their options via the shared underlying. For
    /// futures, option roots that expire into a differently-named future
    /// (e.g. `/OZC` options on `/ZC`) are unified through the configured
    /// month mapping of option root to future root.
    pub fn family_key(&self, futures_roots: &HashMap<String, String>) -> String {
        if !self.underlying.starts_with('/') {
            return self.underlying.clone();
        }
        let body = &self.underlying[1..];
        let split = body
            .find(|c: char| c.is_ascii_digit())
            .map(|i| i.saturating_sub(1))
            .unwrap_or(body.len());
        let (root, monthyear) = body.split_at(split);
        match futures_roots.get(root) {
            Some(mapped) => format!("/{}{}", mapped, monthyear),
            None => self.underlying.clone(),
        }
    }

    /// Contract multiplier used to turn quantity * price into cash value.
    ///
    /// Equity 1, equity options 100, futures and their options from the
    /// configured per-root multiplier table (1 when unlisted).
    pub fn multiplier(&self, futures_multipliers: &HashMap<String, Decimal>) -> Decimal {
        match self.kind {
            InstrumentKind::Equity => Decimal::one(),
            InstrumentKind::EquityOption => Decimal::from_i64(EQUITY_OPTION_MULTIPLIER),
            InstrumentKind::Future | InstrumentKind::FutureOption => {
                let body = &self.underlying[1..];
                let split = body
                    .find(|c: char| c.is_ascii_digit())
                    .map(|i| i.saturating_sub(1))
                    .unwrap_or(body.len());
                futures_multipliers
                    .get(&body[..split])
                    .copied()
                    .unwrap_or_else(Decimal::one)
            }
        }
    }

    /// Whether this instrument is an option leg.
    pub fn is_option(&self) -> bool {
        matches!(
            self.kind,
            InstrumentKind::EquityOption | InstrumentKind::FutureOption
        )
    }
}

/// Split an option suffix into (head, put/call, strike).
///
/// The strike is the trailing run of digits and dots; the character just
/// before it must be `P` or `C`.
fn split_option_tail<'a>(
    symbol: &str,
    opt: &'a str,
) -> Result<(&'a str, PutCall, Decimal), InstrumentError> {
    // Normalized symbols are ASCII; anything else is malformed, and the
    // byte slicing below requires it.
    if !opt.is_ascii() {
        return Err(InstrumentError(symbol.to_string()));
    }
    let strike_start = opt
        .rfind(|c: char| !c.is_ascii_digit() && c != '.')
        .ok_or_else(|| InstrumentError(symbol.to_string()))?;
    let strike_str = &opt[strike_start + 1..];
    if strike_str.is_empty() {
        return Err(InstrumentError(symbol.to_string()));
    }
    let strike = Decimal::from_str_canonical(strike_str)
        .map_err(|_| InstrumentError(symbol.to_string()))?;
    let put_call = match &opt[strike_start..strike_start + 1] {
        "P" => PutCall::Put,
        "C" => PutCall::Call,
        _ => return Err(InstrumentError(symbol.to_string())),
    };
    Ok((&opt[..strike_start], put_call, strike))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_roots() -> HashMap<String, String> {
        HashMap::new()
    }

    #[test]
    fn test_parse_equity() {
        let inst = Instrument::parse("SPY").unwrap();
        assert_eq!(inst.kind, InstrumentKind::Equity);
        assert_eq!(inst.underlying, "SPY");
        assert!(inst.strike.is_none());
        assert!(!inst.is_option());
    }

    #[test]
    fn test_parse_future() {
        let inst = Instrument::parse("/CLK21").unwrap();
        assert_eq!(inst.kind, InstrumentKind::Future);
        assert_eq!(inst.underlying, "/CLK21");
    }

    #[test]
    fn test_parse_equity_option() {
        let inst = Instrument::parse("SPY_063021C420").unwrap();
        assert_eq!(inst.kind, InstrumentKind::EquityOption);
        assert_eq!(inst.underlying, "SPY");
        assert_eq!(
            inst.expiration,
            Some(NaiveDate::from_ymd_opt(2021, 6, 30).unwrap())
        );
        assert_eq!(inst.put_call, Some(PutCall::Call));
        assert_eq!(inst.strike, Some(Decimal::from_i64(420)));
        assert!(inst.is_option());
    }

    #[test]
    fn test_parse_equity_option_fractional_strike() {
        let inst = Instrument::parse("XYZ_011522P12.5").unwrap();
        assert_eq!(inst.put_call, Some(PutCall::Put));
        assert_eq!(
            inst.strike,
            Some(Decimal::from_str_canonical("12.5").unwrap())
        );
    }

    #[test]
    fn test_parse_future_option() {
        let inst = Instrument::parse("/CLK21_CLM21P65").unwrap();
        assert_eq!(inst.kind, InstrumentKind::FutureOption);
        assert_eq!(inst.underlying, "/CLK21");
        assert_eq!(inst.expcode, Some("CLM21".to_string()));
        assert_eq!(inst.put_call, Some(PutCall::Put));
        assert_eq!(inst.strike, Some(Decimal::from_i64(65)));
    }

    #[test]
    fn test_parse_invalid_symbols() {
        assert!(Instrument::parse("").is_err());
        assert!(Instrument::parse("SPY_garbage").is_err());
        assert!(Instrument::parse("SPY_063021X420").is_err());
        assert!(Instrument::parse("_063021C420").is_err());
    }

    #[test]
    fn test_parse_rejects_non_ascii_option_suffix() {
        // Multibyte characters must fail cleanly, not split mid-char.
        assert!(Instrument::parse("SPY_é5").is_err());
        assert!(Instrument::parse("SPY_063021Ç420").is_err());
        assert!(Instrument::parse("/CLK21_CLM21P6·5").is_err());
    }

    #[test]
    fn test_family_key_equity_and_option_agree() {
        let roots = no_roots();
        let equity = Instrument::parse("SPY").unwrap();
        let option = Instrument::parse("SPY_063021C420").unwrap();
        assert_eq!(equity.family_key(&roots), option.family_key(&roots));
    }

    #[test]
    fn test_family_key_futures_root_mapping() {
        let mut roots = HashMap::new();
        roots.insert("OZC".to_string(), "ZC".to_string());
        let option_under = Instrument::parse("/OZCN21_OZCN21C550").unwrap();
        let future = Instrument::parse("/ZCN21").unwrap();
        assert_eq!(option_under.family_key(&roots), future.family_key(&roots));
    }

    #[test]
    fn test_multiplier_defaults() {
        let table = HashMap::new();
        assert_eq!(
            Instrument::parse("SPY").unwrap().multiplier(&table),
            Decimal::one()
        );
        assert_eq!(
            Instrument::parse("SPY_063021C420")
                .unwrap()
                .multiplier(&table),
            Decimal::from_i64(100)
        );
    }

    #[test]
    fn test_multiplier_futures_table() {
        let mut table = HashMap::new();
        table.insert("CL".to_string(), Decimal::from_i64(1000));
        assert_eq!(
            Instrument::parse("/CLK21").unwrap().multiplier(&table),
            Decimal::from_i64(1000)
        );
        assert_eq!(
            Instrument::parse("/CLK21_CLM21P65")
                .unwrap()
                .multiplier(&table),
            Decimal::from_i64(1000)
        );
    }
}
