// Next-page resolution: clamp the page size, consume the incoming token, walk
// the sequence, and mint a follow-up token only when records remain.
use serde::{Deserialize, Serialize};

use crate::core::collection::{Collection, Resource};
use crate::core::cursor::PageTokens;
use crate::core::error::{Error, ErrorKind};

pub const DEFAULT_MAX_PAGE_SIZE: u32 = 1000;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PageLimits {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl PageLimits {
    pub fn new(default_page_size: u32, max_page_size: u32) -> Result<Self, Error> {
        if max_page_size == 0 {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("max page size must be greater than zero")
                .with_hint(format!("Use a positive value like {DEFAULT_MAX_PAGE_SIZE}.")));
        }
        if default_page_size == 0 {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("default page size must be greater than zero"));
        }
        if default_page_size > max_page_size {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("default page size exceeds max page size")
                .with_hint(format!("Use a default page size <= {max_page_size}.")));
        }
        Ok(Self {
            default_page_size,
            max_page_size,
        })
    }

    /// Effective page size for a request. Missing or non-positive sizes fall
    /// back to the default; oversized requests are truncated, not rejected.
    pub fn clamp(&self, requested: Option<i32>) -> usize {
        let size = match requested {
            Some(size) if size > 0 => (size as u32).min(self.max_page_size),
            _ => self.default_page_size,
        };
        size as usize
    }
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_MAX_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct ListRequest {
    #[serde(default)]
    pub page_size: Option<i32>,
    #[serde(default)]
    pub page_token: String,
    #[serde(default)]
    pub show_deleted: bool,
}

impl ListRequest {
    pub fn first_page(page_size: i32) -> Self {
        Self {
            page_size: Some(page_size),
            ..Self::default()
        }
    }

    pub fn with_page_token(mut self, page_token: impl Into<String>) -> Self {
        self.page_token = page_token.into();
        self
    }

    pub fn with_show_deleted(mut self, show_deleted: bool) -> Self {
        self.show_deleted = show_deleted;
        self
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Page<R> {
    pub items: Vec<R>,
    /// Empty when the listing is complete.
    pub next_page_token: String,
}

impl<R> Page<R> {
    pub fn is_last(&self) -> bool {
        self.next_page_token.is_empty()
    }
}

/// Records of one collection together with the tokens paging over them.
#[derive(Debug)]
pub struct Table<R> {
    pub records: Collection<R>,
    pub tokens: PageTokens,
}

impl<R: Resource> Table<R> {
    pub fn new() -> Self {
        Self {
            records: Collection::new(),
            tokens: PageTokens::new(),
        }
    }

    pub fn list(&mut self, limits: &PageLimits, request: &ListRequest) -> Result<Page<R>, Error> {
        let page_size = limits.clamp(request.page_size);
        let resume_index = self
            .tokens
            .consume(&request.page_token, request.show_deleted)?;
        let visible = self
            .records
            .visible_from(resume_index, page_size, request.show_deleted);
        let next_page_token = match visible.last_index_seen {
            Some(last) if visible.more => self.tokens.mint(last + 1, request.show_deleted)?,
            _ => String::new(),
        };
        Ok(Page {
            items: visible.records,
            next_page_token,
        })
    }

    pub fn reset(&mut self) {
        self.records.reset();
        self.tokens.reset();
    }
}

impl<R: Resource> Default for Table<R> {
    fn default() -> Self {
        Self::new()
    }
}
