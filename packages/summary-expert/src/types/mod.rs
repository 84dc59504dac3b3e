//! Data types for pages and summarization passes.

pub mod page;
pub mod pass;
