//! Seams to the outside world. The HTTP implementations live in `clients`;
//! tests substitute in-memory ones.

use crate::error::Result;
use crate::schema::{CellRef, CurrencyCode, DealFilter, PageRequest, RawDeal};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// CRM deal search. May return fewer records than exist.
#[async_trait]
pub trait DealSource: Send + Sync {
    fn name(&self) -> &str;

    async fn search(&self, filter: &DealFilter, page: PageRequest) -> Result<Vec<RawDeal>>;
}

/// Latest currency quotes against a base currency.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn latest(
        &self,
        base: &CurrencyCode,
        quotes: &[CurrencyCode],
    ) -> Result<HashMap<CurrencyCode, Decimal>>;
}

/// A single worksheet addressed by A1 coordinates.
#[async_trait]
pub trait SheetSink: Send + Sync {
    async fn write_cell(&self, cell: &CellRef, value: &str) -> Result<()>;

    /// `None` for an empty cell.
    async fn read_cell(&self, cell: &CellRef) -> Result<Option<String>>;

    async fn row_count(&self) -> Result<u32>;
}

/// A durable integer that survives process restarts.
pub trait CounterStore {
    fn read(&self) -> Result<u32>;

    fn write(&self, value: u32) -> Result<()>;
}
