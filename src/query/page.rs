//! 分页参数

use crate::{Result, StoreError};

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 100;

/// 分页参数 (页码从 1 开始)
///
/// 只能通过 `Page::new` 构造, 保证 `page >= 1` 且 `1 <= page_size <= MAX_PAGE_SIZE`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    number: usize,
    size: usize,
}

impl Page {
    pub fn new(page: usize, page_size: usize) -> Result<Self> {
        if page < 1 {
            return Err(StoreError::CallerContract(format!(
                "page must be >= 1, got {}",
                page
            )));
        }
        if page_size < 1 || page_size > MAX_PAGE_SIZE {
            return Err(StoreError::CallerContract(format!(
                "page_size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, page_size
            )));
        }

        Ok(Self {
            number: page,
            size: page_size,
        })
    }

    pub fn number(&self) -> usize {
        self.number
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// 本页第一条的下标: `(page - 1) * page_size`
    pub fn offset(&self) -> usize {
        (self.number - 1).saturating_mul(self.size)
    }

    /// 截取本页: `[offset, offset + size)`, 越界时为空
    pub fn slice<T, I>(&self, items: I) -> Vec<T>
    where
        I: IntoIterator<Item = T>,
    {
        items.into_iter().skip(self.offset()).take(self.size).collect()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            number: 1,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}
