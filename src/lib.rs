//! A clock-replacement buffer pool over page-oriented files.

pub mod storage;
