//! Symbol list loading.

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::info;

/// Reads one symbol per line. Blank lines are ignored; the result is
/// de-duplicated and sorted.
pub fn load_symbols(path: &Path) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)
        .context(format!("Failed to read symbol list {}", path.display()))?;

    let symbols: Vec<String> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    info!("Loaded {} symbols from {}", symbols.len(), path.display());
    Ok(symbols)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_symbols_dedupes_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stocks.txt");
        std::fs::write(&path, "MSFT\nAAPL\r\n\n  TSLA \nAAPL\n").unwrap();

        let symbols = load_symbols(&path).unwrap();
        assert_eq!(symbols, vec!["AAPL", "MSFT", "TSLA"]);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_symbols(&dir.path().join("absent.txt")).is_err());
    }
}
