//! Paged fetch loop
//!
//! Drives a [`Paginator`] against a [`PageFetcher`] until the server reports
//! no more pages.

use super::paginator::Paginator;
use super::types::PageResponse;
use crate::error::{Error, Result};
use crate::types::StringMap;
use async_trait::async_trait;
use futures::Stream;
use serde_json::Value;
use tracing::debug;

/// Source of pages: one GET against a fixed resource with the given query.
///
/// Implementations must fail on non-2xx responses instead of returning a
/// partial body.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch one page and return its parsed JSON body
    async fn fetch_page(&self, query: &StringMap) -> Result<Value>;
}

#[async_trait]
impl<T: PageFetcher + ?Sized> PageFetcher for &T {
    async fn fetch_page(&self, query: &StringMap) -> Result<Value> {
        (**self).fetch_page(query).await
    }
}

/// Merge caller parameters with page parameters. Page parameters win.
pub fn merge_params(base: &StringMap, page: StringMap) -> StringMap {
    let mut merged = base.clone();
    merged.extend(page);
    merged
}

/// Fetch every page and return all records in page order.
///
/// The first page is always requested. A response without page metadata ends
/// the loop after that single page. The first failing fetch aborts the whole
/// call; records gathered so far are dropped.
pub async fn fetch_all_pages<F>(
    fetcher: &F,
    base_params: &StringMap,
    page_size: i64,
) -> Result<Vec<Value>>
where
    F: PageFetcher + ?Sized,
{
    let mut paginator = Paginator::new(page_size);
    let mut records = Vec::new();
    let mut page_count = 0usize;

    while paginator.has_more_pages() {
        let query = merge_params(base_params, paginator.page_request_parameters());
        let body = fetcher.fetch_page(&query).await?;
        page_count += 1;

        let page = PageResponse::from_body(body)?;
        paginator.apply(page.pages.as_ref());

        let items = page.into_records();
        debug!(
            page = page_count,
            records = items.len(),
            next_page = paginator.current_page(),
            total_pages = paginator.total_pages(),
            "Fetched page"
        );
        records.extend(items);
    }

    debug!(pages = page_count, records = records.len(), "Paged fetch complete");
    Ok(records)
}

/// Stream records page by page.
///
/// Follows the same paging rules as [`fetch_all_pages`] but yields each page
/// as soon as it arrives. The stream ends after the first error, so pages
/// already yielded stay with the consumer.
pub fn page_stream<'a, F>(
    fetcher: F,
    base_params: StringMap,
    page_size: i64,
) -> impl Stream<Item = Result<Vec<Value>>> + 'a
where
    F: PageFetcher + 'a,
{
    let state = (fetcher, Paginator::new(page_size));
    futures::stream::try_unfold(state, move |(fetcher, mut paginator)| {
        let query = merge_params(&base_params, paginator.page_request_parameters());
        async move {
            if !paginator.has_more_pages() {
                return Ok(None);
            }
            let body = fetcher.fetch_page(&query).await?;
            let page = PageResponse::from_body(body)?;
            paginator.apply(page.pages.as_ref());
            Ok::<_, Error>(Some((page.into_records(), (fetcher, paginator))))
        }
    })
}
