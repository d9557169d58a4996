//! Page arithmetic shared by the filtered and unfiltered listing paths.

use super::error::{PieceStoreError, PieceStoreResult};

/// Number of pages needed to show `count` rows, `page_size` at a time.
pub fn total_pages(count: usize, page_size: usize) -> usize {
    count.div_ceil(page_size)
}

/// The LIMIT/OFFSET window of a single page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageWindow {
    pub page: usize,
    pub offset: usize,
    pub limit: usize,
}

impl PageWindow {
    /// Clamps `page` into `[1, total_pages]` and computes its window. An empty
    /// result set still serves page 1.
    pub fn clamped(page: usize, page_size: usize, total_pages: usize) -> Self {
        let page = page.clamp(1, total_pages.max(1));
        PageWindow {
            page,
            offset: (page - 1) * page_size,
            limit: page_size,
        }
    }
}

/// Pagination parameters as they arrive from a request, already validated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl PageRequest {
    /// Parses the raw `page` and `size` query values.
    ///
    /// `page` must be a positive integer and defaults to 1. `size` must be an
    /// integer in `[1, max_page_size]` and defaults to `default_page_size`.
    pub fn parse(
        page: Option<&str>,
        size: Option<&str>,
        default_page_size: usize,
        max_page_size: usize,
    ) -> PieceStoreResult<Self> {
        let page = match page.map(str::trim) {
            None | Some("") => 1,
            Some(raw) => match raw.parse::<i64>() {
                Ok(p) if p >= 1 => p as usize,
                _ => {
                    return Err(PieceStoreError::InvalidPage(format!(
                        "{:?} is not a positive integer",
                        raw
                    )))
                }
            },
        };

        let page_size = match size.map(str::trim) {
            None | Some("") => default_page_size,
            Some(raw) => raw.parse::<usize>().map_err(|_| {
                PieceStoreError::InvalidPageSize(format!("{:?} is not an integer", raw))
            })?,
        };
        validate_page_size(page_size, max_page_size)?;

        Ok(PageRequest { page, page_size })
    }
}

pub fn validate_page_size(page_size: usize, max_page_size: usize) -> PieceStoreResult<()> {
    if page_size == 0 || page_size > max_page_size {
        return Err(PieceStoreError::InvalidPageSize(format!(
            "{} is outside [1, {}]",
            page_size, max_page_size
        )));
    }
    Ok(())
}
