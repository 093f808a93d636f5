use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;

use crate::domain::quote::{Distribution, DistributionId, Quote, QuoteId};
use crate::errors::ApplicationError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("snapshot store unavailable: {0}")]
    Unavailable(String),
}

impl From<ProviderError> for ApplicationError {
    fn from(value: ProviderError) -> Self {
        Self::DataProvider(value.to_string())
    }
}

/// Loads already-consistent quote snapshots for the engine and stores the values
/// callers decide to persist.
pub trait QuoteDataProvider: Send + Sync {
    fn find_quote(&self, id: &QuoteId) -> Result<Option<Quote>, ProviderError>;

    fn find_distribution(
        &self,
        id: &DistributionId,
    ) -> Result<Option<Distribution>, ProviderError>;

    fn save_quote(&self, quote: Quote) -> Result<(), ProviderError>;
}

#[derive(Default)]
pub struct InMemoryQuoteDataProvider {
    quotes: RwLock<HashMap<String, Quote>>,
}

impl InMemoryQuoteDataProvider {
    pub fn with_quotes(quotes: impl IntoIterator<Item = Quote>) -> Self {
        let quotes = quotes.into_iter().map(|quote| (quote.id.0.clone(), quote)).collect();
        Self { quotes: RwLock::new(quotes) }
    }
}

impl QuoteDataProvider for InMemoryQuoteDataProvider {
    fn find_quote(&self, id: &QuoteId) -> Result<Option<Quote>, ProviderError> {
        let quotes = self.quotes.read().map_err(|_| poisoned())?;
        Ok(quotes.get(&id.0).cloned())
    }

    fn find_distribution(
        &self,
        id: &DistributionId,
    ) -> Result<Option<Distribution>, ProviderError> {
        let quotes = self.quotes.read().map_err(|_| poisoned())?;
        Ok(quotes.values().find_map(|quote| quote.distribution(id).cloned()))
    }

    fn save_quote(&self, quote: Quote) -> Result<(), ProviderError> {
        let mut quotes = self.quotes.write().map_err(|_| poisoned())?;
        quotes.insert(quote.id.0.clone(), quote);
        Ok(())
    }
}

fn poisoned() -> ProviderError {
    ProviderError::Unavailable("quote snapshot lock is poisoned".to_owned())
}
