use crate::api::{Error, Result};
use crate::retry::{retry, RetryPolicy};
use derive_more::Constructor;
use log::{debug, warn};
use std::future::Future;
use tokio_util::sync::CancellationToken;

pub const FIRST_PAGE_NUMBER: u32 = 1;
pub const DEFAULT_PER_PAGE: u32 = 100;
/// Bounds latency and rate limit spending of a single listing.
pub const DEFAULT_MAX_PAGES: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Constructor)]
pub struct PageLimits {
    pub per_page: u32,
    pub max_pages: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        PageLimits::new(DEFAULT_PER_PAGE, DEFAULT_MAX_PAGES)
    }
}

/// Items gathered by [`collect_pages`].
#[derive(Debug)]
pub struct Collected<T> {
    pub items: Vec<T>,
    /// Number of non-empty pages appended to `items`.
    pub pages: u32,
    /// Failure which ended the collection before an empty page or the page ceiling.
    pub interrupted: Option<Error>,
}

#[derive(Debug, PartialEq, Constructor)]
struct Page {
    page_no: u32,
    page_size: u32,
}

struct Paginator {
    /// `None` once the page numbers are used up.
    page_no: Option<u32>,
    page_size: u32,
    last_page_no: u32,
}

impl Paginator {
    fn new(limits: &PageLimits) -> Self {
        Paginator {
            page_no: Some(FIRST_PAGE_NUMBER),
            page_size: limits.per_page,
            last_page_no: FIRST_PAGE_NUMBER.saturating_add(limits.max_pages).saturating_sub(1),
        }
    }

    fn next_page(&mut self) -> Option<Page> {
        let page_no = self.page_no.filter(|page_no| *page_no <= self.last_page_no)?;
        self.page_no = page_no.checked_add(1);
        Some(Page::new(page_no, self.page_size))
    }
}

/// Fetches pages `1, 2, ...` until one comes back empty or `limits.max_pages` were read.
///
/// Every page goes through [`retry`]. When a page still fails, the items of the preceding pages
/// are returned together with the failure instead of an error.
pub async fn collect_pages<T, F, FUT>(
    policy: &RetryPolicy,
    limits: &PageLimits,
    cancel: &CancellationToken,
    mut fetch_page: F,
) -> Collected<T>
where
    F: FnMut(u32, u32) -> FUT,
    FUT: Future<Output = Result<Vec<T>>>,
{
    let mut paginator = Paginator::new(limits);
    let mut collected = Collected {
        items: Vec::new(),
        pages: 0,
        interrupted: None,
    };
    while let Some(page) = paginator.next_page() {
        match retry(policy, cancel, || fetch_page(page.page_no, page.page_size)).await {
            Ok(items) if items.is_empty() => {
                debug!("Page {} is empty, collected {} items", page.page_no, collected.items.len());
                return collected;
            }
            Ok(mut items) => {
                debug!("Page {} returned {} items", page.page_no, items.len());
                collected.items.append(&mut items);
                collected.pages += 1;
            }
            Err(err) => {
                warn!(
                    "Page {} failed, keeping {} items from earlier pages: {}",
                    page.page_no,
                    collected.items.len(),
                    err
                );
                collected.interrupted = Some(err);
                return collected;
            }
        }
    }
    debug!(
        "Page ceiling of {} reached, collected {} items",
        limits.max_pages,
        collected.items.len()
    );
    collected
}
