//! Trait seams between the summarization passes and the outside world.
//!
//! Applications implement these to swap in other model providers or page
//! sources.

pub mod model;
pub mod source;
