//! ChainsDatabase file I/O.
//!
//! The database is a YAML document holding the ordered chain list. It is
//! read once at the start of a run; a complete new version is written at
//! the end via a sibling temp file and an atomic rename, so a failed run
//! never leaves a partially written database behind.

use crate::domain::ChainsDb;
use crate::error::ImportError;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Load a chains database. A missing file is an empty database: the
/// first ever import starts from nothing.
pub fn load_chains_db(path: &Path) -> Result<ChainsDb, ImportError> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "no prior chains database, starting empty");
        return Ok(ChainsDb::new());
    }
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(ChainsDb::new());
    }
    let db = serde_yaml::from_str(&content)?;
    Ok(db)
}

/// Write a chains database atomically, replacing any existing file.
pub fn store_chains_db(path: &Path, db: &ChainsDb) -> Result<(), ImportError> {
    let content = serde_yaml::to_string(db)?;
    let tmp_path = path.with_extension("yaml.tmp");
    {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Chain, ChainId, ChainStatus, TransactionId};

    #[test]
    fn test_missing_file_is_empty_db() {
        let dir = tempfile::tempdir().unwrap();
        let db = load_chains_db(&dir.path().join("chains.yaml")).unwrap();
        assert!(db.is_empty());
    }

    #[test]
    fn test_store_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chains.yaml");

        let mut db = ChainsDb::new();
        let mut chain = Chain::new(ChainId::new("main.210601_100000.SPY"));
        chain.status = ChainStatus::Final;
        chain.comment = Some("good trade".to_string());
        chain.ids.push(TransactionId::new("t1"));
        db.chains.push(chain);

        store_chains_db(&path, &db).unwrap();
        let loaded = load_chains_db(&path).unwrap();
        assert_eq!(loaded, db);
    }

    #[test]
    fn test_store_is_stable_for_unchanged_db() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chains.yaml");

        let mut db = ChainsDb::new();
        db.chains.push(Chain::new(ChainId::new("a")));
        db.chains.push(Chain::new(ChainId::new("b")));

        store_chains_db(&path, &db).unwrap();
        let first = fs::read_to_string(&path).unwrap();
        store_chains_db(&path, &db).unwrap();
        let second = fs::read_to_string(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chains.yaml");
        store_chains_db(&path, &ChainsDb::new()).unwrap();
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["chains.yaml"]);
    }
}
