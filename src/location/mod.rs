//! Place-name resolution backed by a persisted location cache.

pub mod cache;
pub mod entry;
pub mod export;
pub mod matching;
pub mod resolver;
