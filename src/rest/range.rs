//! Item-range pagination headers
//!
//! Requests carry `Range: start-end` with `Range-Unit: items` and
//! `Prefer: count=exact`; responses answer with `Content-Range: start-end/total`.

/// Rows per page in every paginated listing view
pub const PAGE_SIZE: u32 = 10;

/// Inclusive item window for a 1-based page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub page: u32,
    pub page_size: u32,
}

impl PageRange {
    /// Page numbers below 1 are treated as page 1
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    pub fn start(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }

    pub fn end(&self) -> u64 {
        self.start() + u64::from(self.page_size) - 1
    }

    /// Value for the `Range` request header, e.g. `10-19`
    pub fn header_value(&self) -> String {
        format!("{}-{}", self.start(), self.end())
    }
}

/// Parsed `Content-Range` response header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    /// `None` for an empty window (`*/0`)
    pub window: Option<(u64, u64)>,
    /// `None` when the service did not count (`0-9/*`)
    pub total: Option<u64>,
}

impl ContentRange {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let raw = raw.strip_prefix("items ").unwrap_or(raw);
        let (window, total) = raw.split_once('/')?;

        let window = if window == "*" {
            None
        } else {
            let (start, end) = window.split_once('-')?;
            Some((start.trim().parse().ok()?, end.trim().parse().ok()?))
        };

        let total = if total == "*" {
            None
        } else {
            Some(total.trim().parse().ok()?)
        };

        Some(Self { window, total })
    }
}

/// `ceil(total / page_size)`
pub fn total_pages(total: u64, page_size: u32) -> u32 {
    let page_size = u64::from(page_size.max(1));
    u32::try_from(total.div_ceil(page_size)).unwrap_or(u32::MAX)
}
