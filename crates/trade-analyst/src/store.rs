//! Trade Store
//!
//! The trader's history, loaded once at startup and read-only afterwards.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::DataLoadError;
use crate::model::Trade;
use crate::schema::TableSchema;

/// In-memory, immutable trade table
#[derive(Clone, Debug)]
pub struct TradeStore {
    trades: Vec<Trade>,
    schema: TableSchema,
    source: Option<PathBuf>,
}

impl TradeStore {
    /// Load a JSON array of trades from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DataLoadError> {
        let path = path.as_ref();

        let raw = std::fs::read_to_string(path).map_err(|source| DataLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let trades: Vec<Trade> =
            serde_json::from_str(&raw).map_err(|source| DataLoadError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let mut store = Self::from_trades(trades)?;
        store.source = Some(path.to_path_buf());

        tracing::info!(path = %path.display(), trades = store.len(), "Loaded trade history");
        Ok(store)
    }

    /// Build a store from records already in memory
    pub fn from_trades(trades: Vec<Trade>) -> Result<Self, DataLoadError> {
        {
            let mut seen = HashSet::with_capacity(trades.len());
            for trade in &trades {
                if !seen.insert(trade.id.as_str()) {
                    return Err(DataLoadError::DuplicateId(trade.id.clone()));
                }
            }
        }

        Ok(Self {
            schema: TableSchema::from_trades(&trades),
            trades,
            source: None,
        })
    }

    /// All trades in file order
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// File the trades were loaded from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TWO_TRADES: &str = r#"[
        {"Trade ID": "T1", "Asset": "BTC", "Buy/Sell": "Buy", "Price": 42000, "Volume": 0.5,
         "Date": "2024-01-10T00:00:00Z", "Outcome": "Profit", "Tags": ["breakout", "Technical"]},
        {"Trade ID": "T2", "Asset": "ETH", "Buy/Sell": "Sell", "Price": 2500, "Volume": 2,
         "Date": "2024-01-12T00:00:00Z", "Outcome": "Loss", "Tags": ["fomo", "Sentiment"]}
    ]"#;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_preserves_order() {
        let file = write_temp(TWO_TRADES);
        let store = TradeStore::load(file.path()).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.trades()[0].id, "T1");
        assert_eq!(store.trades()[1].id, "T2");
        assert_eq!(store.source(), Some(file.path()));
        assert_eq!(
            store.schema().assets(),
            ["BTC".to_string(), "ETH".to_string()]
        );
    }

    #[test]
    fn test_missing_file() {
        let err = TradeStore::load("/definitely/not/here/trades.json").unwrap_err();
        assert!(matches!(err, DataLoadError::Io { .. }));
    }

    #[test]
    fn test_malformed_file() {
        let file = write_temp(r#"{"not": "a list"}"#);
        let err = TradeStore::load(file.path()).unwrap_err();
        assert!(matches!(err, DataLoadError::Parse { .. }));
    }

    #[test]
    fn test_wrong_record_shape() {
        let file = write_temp(r#"[{"Trade ID": "T1", "Asset": "BTC"}]"#);
        let err = TradeStore::load(file.path()).unwrap_err();
        assert!(matches!(err, DataLoadError::Parse { .. }));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let file = write_temp(&TWO_TRADES.replace("\"T2\"", "\"T1\""));
        let err = TradeStore::load(file.path()).unwrap_err();
        assert!(matches!(err, DataLoadError::DuplicateId(id) if id == "T1"));
    }

    #[test]
    fn test_empty_list_is_valid() {
        let file = write_temp("[]");
        let store = TradeStore::load(file.path()).unwrap();
        assert!(store.is_empty());
    }
}
