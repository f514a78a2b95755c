use crate::schema::{CurrencyCode, ExchangeRate};
use crate::traits::QuoteSource;
use log::{debug, warn};

/// Looks up one exchange rate per run. Every failure degrades to `None`.
pub struct RateProvider<'a> {
    source: &'a dyn QuoteSource,
}

impl<'a> RateProvider<'a> {
    pub fn new(source: &'a dyn QuoteSource) -> Self {
        Self { source }
    }

    /// Units of `quote` per unit of `base`, or `None` when the lookup fails.
    pub async fn get_rate(&self, base: &CurrencyCode, quote: &CurrencyCode) -> Option<ExchangeRate> {
        let quotes = match self.source.latest(base, std::slice::from_ref(quote)).await {
            Ok(quotes) => quotes,
            Err(e) => {
                warn!("Error fetching {}/{} exchange rate: {}", base, quote, e);
                return None;
            }
        };

        let Some(value) = quotes.get(quote).copied() else {
            warn!("Quote response has no {} rate against {}", quote, base);
            return None;
        };

        match ExchangeRate::new(value) {
            Some(rate) => {
                debug!("{}/{} rate: {}", base, quote, value);
                Some(rate)
            }
            None => {
                warn!("Ignoring non-positive {}/{} rate {}", base, quote, value);
                None
            }
        }
    }
}
