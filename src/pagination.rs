use crate::errors::{AppError, AppResult};
use serde::Serialize;

pub const PAGE_SIZE_OPTIONS: [usize; 3] = [10, 25, 50];
pub const DEFAULT_PAGE_SIZE: usize = 25;
const MAX_VISIBLE_PAGES: usize = 5;

pub fn validate_page_size(page_size: usize) -> AppResult<()> {
    if PAGE_SIZE_OPTIONS.contains(&page_size) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "Page size must be one of {:?} (got {})",
            PAGE_SIZE_OPTIONS, page_size
        )))
    }
}

pub fn total_pages(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    len.div_ceil(page_size)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
    pub has_next_page: bool,
    pub has_prev_page: bool,
    /// 1-based positions of the first and last item on the page, both 0 when it is empty.
    pub start_item: usize,
    pub end_item: usize,
    pub visible_pages: Vec<usize>,
}

pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Page<T> {
    let page = page.max(1);
    let total = items.len();
    let total_pages = total_pages(total, page_size);
    let start = page.saturating_sub(1).saturating_mul(page_size).min(total);
    let end = start.saturating_add(page_size).min(total);

    Page {
        items: items[start..end].to_vec(),
        page,
        page_size,
        total,
        total_pages,
        has_next_page: page < total_pages,
        has_prev_page: page > 1,
        start_item: if start < end { start + 1 } else { 0 },
        end_item: if start < end { end } else { 0 },
        visible_pages: visible_pages(page, total_pages),
    }
}

fn visible_pages(page: usize, total_pages: usize) -> Vec<usize> {
    if total_pages == 0 {
        return Vec::new();
    }
    let page = page.clamp(1, total_pages);
    let mut first = page.saturating_sub(MAX_VISIBLE_PAGES / 2).max(1);
    let last = first.saturating_add(MAX_VISIBLE_PAGES - 1).min(total_pages);
    if last - first + 1 < MAX_VISIBLE_PAGES {
        first = last.saturating_sub(MAX_VISIBLE_PAGES - 1).max(1);
    }
    (first..=last).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    page: usize,
    page_size: usize,
}

impl Default for Paginator {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Paginator {
    pub fn new(page_size: usize) -> AppResult<Self> {
        validate_page_size(page_size)?;
        Ok(Self { page: 1, page_size })
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn view<T: Clone>(&self, items: &[T]) -> Page<T> {
        let last = total_pages(items.len(), self.page_size).max(1);
        paginate(items, self.page.min(last), self.page_size)
    }

    pub fn go_to_page(&mut self, page: usize, total_items: usize) -> usize {
        let last = total_pages(total_items, self.page_size).max(1);
        self.page = page.clamp(1, last);
        self.page
    }

    pub fn change_page_size(&mut self, page_size: usize) -> AppResult<()> {
        validate_page_size(page_size)?;
        self.page_size = page_size;
        self.page = 1;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.page = 1;
    }
}
