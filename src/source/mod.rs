//! Transaction sources: the parser seam between broker exports and the
//! matching engine.
//!
//! Broker-specific parsing lives behind the [`TransactionSource`] trait.
//! Accounts name a source by its registry tag; the engine itself only
//! ever sees the normalized [`Transaction`] shape.

use crate::domain::{AccountId, InstrumentError, Transaction};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod csvfile;

pub use csvfile::{read_initial_positions, read_price_csv, NormCsvSource};

/// Error type for source operations.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed record in {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
    #[error("bad datetime {value:?} in {path}")]
    Datetime { path: PathBuf, value: String },
    #[error(transparent)]
    Symbol(#[from] InstrumentError),
    #[error("no source registered for module tag {0:?}")]
    UnknownModule(String),
}

/// A parser producing normalized transactions from one exported file.
pub trait TransactionSource {
    /// Registry tag this source answers to.
    fn tag(&self) -> &'static str;

    /// Read and normalize the file at `path` for `account`.
    ///
    /// Returned transactions need not be sorted; the pipeline sorts the
    /// combined stream before matching.
    fn fetch(&self, account: &AccountId, path: &Path) -> Result<Vec<Transaction>, SourceError>;
}

/// Registry mapping a capability tag to a concrete source implementation,
/// selected at configuration-load time.
pub struct SourceRegistry {
    sources: BTreeMap<String, Box<dyn TransactionSource>>,
}

impl SourceRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        SourceRegistry {
            sources: BTreeMap::new(),
        }
    }

    /// The registry with the built-in sources registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(NormCsvSource));
        registry
    }

    /// Register a source under its own tag, replacing any previous one.
    pub fn register(&mut self, source: Box<dyn TransactionSource>) {
        self.sources.insert(source.tag().to_string(), source);
    }

    /// Look up a source by tag.
    pub fn get(&self, tag: &str) -> Result<&dyn TransactionSource, SourceError> {
        self.sources
            .get(tag)
            .map(|s| s.as_ref())
            .ok_or_else(|| SourceError::UnknownModule(tag.to_string()))
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_default_has_norm_csv() {
        let registry = SourceRegistry::with_defaults();
        assert_eq!(registry.get("norm_csv").unwrap().tag(), "norm_csv");
    }

    #[test]
    fn test_registry_unknown_tag() {
        let registry = SourceRegistry::with_defaults();
        let err = registry.get("thinkorswim").err().unwrap();
        assert!(matches!(err, SourceError::UnknownModule(tag) if tag == "thinkorswim"));
    }

    struct FakeSource;

    impl TransactionSource for FakeSource {
        fn tag(&self) -> &'static str {
            "fake"
        }

        fn fetch(
            &self,
            _account: &AccountId,
            _path: &Path,
        ) -> Result<Vec<Transaction>, SourceError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_registry_accepts_custom_sources() {
        let mut registry = SourceRegistry::new();
        registry.register(Box::new(FakeSource));
        assert!(registry.get("fake").is_ok());
        assert!(registry.get("norm_csv").is_err());
    }
}
