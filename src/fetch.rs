use crate::error::Result;
use crate::schema::{DealFilter, PageRequest, RawDeal};
use crate::traits::DealSource;
use log::{debug, warn};

pub const DEFAULT_PAGE_SIZE: u32 = 100;

pub struct DealFetcher<'a> {
    source: &'a dyn DealSource,
    page_size: u32,
}

impl<'a> DealFetcher<'a> {
    pub fn new(source: &'a dyn DealSource, page_size: u32) -> Self {
        Self { source, page_size }
    }

    /// The first page plus the page after it, concatenated as returned.
    ///
    /// Nothing is deduplicated: if the source hands back overlapping records
    /// for the two requests, those deals are counted twice downstream.
    pub async fn fetch_both_strategies(&self, filter: &DealFilter) -> Result<Vec<RawDeal>> {
        let mut deals = self
            .source
            .search(filter, PageRequest::Limit(self.page_size))
            .await?;
        let after = self
            .source
            .search(
                filter,
                PageRequest::After {
                    offset: self.page_size,
                    limit: self.page_size,
                },
            )
            .await?;

        debug!(
            "{}: {} deals on the first page, {} after",
            self.source.name(),
            deals.len(),
            after.len()
        );
        deals.extend(after);
        Ok(deals)
    }

    /// Keeps requesting the next page while the running total is a whole
    /// number of pages, up to `max_pages` requests.
    pub async fn fetch_all(&self, filter: &DealFilter, max_pages: u32) -> Result<Vec<RawDeal>> {
        let mut deals = self
            .source
            .search(filter, PageRequest::Limit(self.page_size))
            .await?;
        let mut pages = 1;

        while self.page_size > 0 && !deals.is_empty() && deals.len() as u32 % self.page_size == 0 {
            if pages >= max_pages {
                warn!(
                    "{}: stopping after {} pages with {} deals",
                    self.source.name(),
                    pages,
                    deals.len()
                );
                break;
            }

            let next = self
                .source
                .search(
                    filter,
                    PageRequest::After {
                        offset: deals.len() as u32,
                        limit: self.page_size,
                    },
                )
                .await?;
            pages += 1;
            if next.is_empty() {
                break;
            }
            deals.extend(next);
        }

        debug!(
            "{}: fetched {} deals in {} pages",
            self.source.name(),
            deals.len(),
            pages
        );
        Ok(deals)
    }
}
