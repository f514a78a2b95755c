use crate::clients::types::LatestRatesResponse;
use crate::clients::REQUEST_TIMEOUT;
use crate::error::{ReportError, Result};
use crate::schema::CurrencyCode;
use crate::traits::QuoteSource;
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use std::collections::HashMap;

const CURRENCY_API_BASE_URL: &str = "https://api.currencyapi.com";
const SOURCE_NAME: &str = "currencyapi";

/// currencyapi.com latest-rates endpoint.
#[derive(Clone)]
pub struct CurrencyApiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl CurrencyApiClient {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key,
            base_url: CURRENCY_API_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

fn rates_from_response(body: LatestRatesResponse) -> HashMap<CurrencyCode, Decimal> {
    body.data
        .into_iter()
        .map(|(code, quote)| (CurrencyCode::new(code), quote.value))
        .collect()
}

#[async_trait]
impl QuoteSource for CurrencyApiClient {
    async fn latest(
        &self,
        base: &CurrencyCode,
        quotes: &[CurrencyCode],
    ) -> Result<HashMap<CurrencyCode, Decimal>> {
        let url = format!("{}/v3/latest", self.base_url);
        let currencies = quotes
            .iter()
            .map(CurrencyCode::as_str)
            .collect::<Vec<_>>()
            .join(",");

        let res = self
            .client
            .get(&url)
            .header("apikey", &self.api_key)
            .query(&[("base_currency", base.as_str()), ("currencies", currencies.as_str())])
            .send()
            .await?;
        let status = res.status();

        if !status.is_success() {
            let err_text = res.text().await.unwrap_or_default();
            return Err(ReportError::transient(
                SOURCE_NAME,
                format!("status {}: {}", status, err_text),
            ));
        }

        let body: LatestRatesResponse = res
            .json()
            .await
            .map_err(|e| ReportError::transient(SOURCE_NAME, format!("bad response body: {}", e)))?;
        Ok(rates_from_response(body))
    }
}
