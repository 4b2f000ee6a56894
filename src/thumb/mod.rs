//! Lazy thumbnail cache.
//!
//! Produces and serves resized renditions of uploaded images on demand.
//! Renditions live in their own flat directory as
//! `<source-id>_<w>_<h>.jpg`; a single coordinator task owns the index and
//! coalesces concurrent requests for the same rendition into one
//! generation job.

pub mod cache;
pub mod codec;

pub use cache::{Dimensions, FileStore, ThumbCache};
pub use codec::{JpegEncoder, ThumbEncoder};
