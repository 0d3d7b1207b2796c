use crate::domain::Symbol;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Symbols whose funding is shown even without a position.
///
/// Append-only; a refresh cycle reads it once at its start, so a symbol
/// added mid-cycle shows up from the next cycle on.
#[derive(Debug, Clone, Default)]
pub struct WatchList {
    symbols: Arc<RwLock<BTreeSet<Symbol>>>,
}

impl WatchList {
    pub fn new(seed: impl IntoIterator<Item = Symbol>) -> Self {
        Self {
            symbols: Arc::new(RwLock::new(seed.into_iter().collect())),
        }
    }

    /// Add a symbol. Returns false when it was already watched.
    pub async fn add(&self, symbol: Symbol) -> bool {
        self.symbols.write().await.insert(symbol)
    }

    pub async fn contains(&self, symbol: &Symbol) -> bool {
        self.symbols.read().await.contains(symbol)
    }

    /// Sorted copy of the current symbols.
    pub async fn snapshot(&self) -> Vec<Symbol> {
        self.symbols.read().await.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(s: &str) -> Symbol {
        Symbol::new(s.to_string())
    }

    #[tokio::test]
    async fn test_add_reports_new_symbols_only() {
        let list = WatchList::new(vec![sym("ETH")]);
        assert!(list.add(sym("BTC")).await);
        assert!(!list.add(sym("BTC")).await);
        assert!(!list.add(sym("ETH")).await);
        assert_eq!(list.snapshot().await, vec![sym("BTC"), sym("ETH")]);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let list = WatchList::default();
        let other = list.clone();
        other.add(sym("SOL")).await;
        assert!(list.contains(&sym("SOL")).await);
    }
}
