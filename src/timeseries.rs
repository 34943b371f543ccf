/// Paginated time-series fetch-and-merge.
///
/// Walks an upstream result set page by page (offset = page index times
/// `MAX_PAGE_SIZE`), normalizes each page, and concatenates them in fetch
/// order until the running row count reaches the total the server reported.
///
/// Fail-closed: any upstream failure, at any page, discards everything
/// fetched so far and yields an empty `MergedResult` marked `Failed`. The
/// cause is logged, never returned.

use log::{error, info};
use thiserror::Error;

use crate::ingest::eia::{PageRequest, Upstream};
use crate::ingest::normalize::normalize;
use crate::model::{FetchError, FetchOutcome, MergedResult};
use crate::query::TimeSeriesQuery;

/// Rows per upstream call; the API's documented per-call cap.
pub const MAX_PAGE_SIZE: u64 = 5000;

/// Why a fetch was abandoned.
#[derive(Debug, Error)]
enum PaginationError {
    #[error("page {page_index}: {source}")]
    Fetch { page_index: u64, source: FetchError },
    #[error("page {page_index} returned no rows with {fetched} of {total} fetched")]
    Stalled { page_index: u64, fetched: u64, total: u64 },
    #[error("page {page_index} brought the row count to {fetched}, past the reported {total}")]
    Overshoot { page_index: u64, fetched: u64, total: u64 },
    #[error("page {page_index} held {page_len} rows with {fetched} of {total} fetched")]
    ShortPage { page_index: u64, page_len: u64, fetched: u64, total: u64 },
    #[error("reported total of {total} should fit in {page_limit} pages; refusing page {page_index}")]
    TooManyPages { page_index: u64, page_limit: u64, total: u64 },
}

/// Number of pages needed to cover `total` rows.
pub fn page_count(total: u64) -> u64 {
    total.div_ceil(MAX_PAGE_SIZE)
}

fn try_fetch_all(
    upstream: &dyn Upstream,
    query: &TimeSeriesQuery,
) -> Result<MergedResult, PaginationError> {
    let mut rows = Vec::new();
    let mut rejected_rows = 0u64;
    let mut pages = 0u64;
    let mut page_index = query.page_index();

    // Raw records accounted for so far, counting the rows before the start
    // page as already seen.
    let mut fetched = page_index.saturating_mul(MAX_PAGE_SIZE);

    loop {
        let offset = page_index.saturating_mul(MAX_PAGE_SIZE);
        let request = PageRequest {
            url_segment: query.url_segment(),
            facets: query.facets(),
            start_date: query.start_date(),
            end_date: query.end_date(),
            offset,
            length: MAX_PAGE_SIZE,
        };

        let page = upstream
            .fetch_page(&request)
            .map_err(|source| PaginationError::Fetch { page_index, source })?;
        pages += 1;

        let total = page.total_row_count;
        let page_len = page.records.len() as u64;
        let normalized = normalize(&page.records, query.value_column_name());
        rejected_rows += normalized.rejected.len() as u64;
        rows.extend(normalized.rows);

        // Completion counts raw records so rejected rows don't force extra pages.
        fetched = fetched.saturating_add(page_len);
        if fetched == total {
            return Ok(MergedResult::complete(rows, pages, rejected_rows));
        }
        if page_len == 0 {
            return Err(PaginationError::Stalled { page_index, fetched, total });
        }
        if fetched > total {
            return Err(PaginationError::Overshoot { page_index, fetched, total });
        }
        // The next offset would skip whatever this page left out.
        if page_len < MAX_PAGE_SIZE {
            return Err(PaginationError::ShortPage { page_index, page_len, fetched, total });
        }

        let page_limit = page_count(total);
        page_index = page_index.saturating_add(1);
        if page_index >= page_limit {
            return Err(PaginationError::TooManyPages { page_index, page_limit, total });
        }
    }
}

/// Fetches every page of `query` and merges them, most recent rows first.
///
/// Never fails outward: on any error the result is empty and its outcome is
/// `FetchOutcome::Failed`. A query that legitimately matches nothing returns
/// an empty `Complete` result instead.
pub fn fetch_all(upstream: &dyn Upstream, query: &TimeSeriesQuery) -> MergedResult {
    match try_fetch_all(upstream, query) {
        Ok(result) => {
            info!(
                "Fetched {} rows across {} page(s) from {} ({:?})",
                result.len(),
                result_pages(&result),
                query.url_segment(),
                query.facets()
            );
            result
        }
        Err(e) => {
            error!(
                "Error fetching data from EIA API for {} ({:?}): {}; returning empty result",
                query.url_segment(),
                query.facets(),
                e
            );
            MergedResult::failed()
        }
    }
}

fn result_pages(result: &MergedResult) -> u64 {
    match result.outcome {
        FetchOutcome::Complete { pages, .. } => pages,
        FetchOutcome::Failed => 0,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
