use thiserror::Error;

use crate::config::{FrameId, PageId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReplacerError {
    #[error("frame {frame_id} is pinned and cannot be removed")]
    NotEvictable { frame_id: FrameId },
}

#[derive(Debug, Error)]
pub enum DiskError {
    #[error("buffer for page {page_id} holds {actual} bytes, expected {expected}")]
    ShortBuffer {
        page_id: PageId,
        expected: usize,
        actual: usize,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
