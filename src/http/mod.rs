//! HTTP surface for airliftd.
//!
//! JSON API over axum: uploads in, short URLs out, plus retrieval,
//! deletion, thumbnails, history, and cache maintenance endpoints.

pub mod protocol;
pub mod server;

pub use server::{router, AppState};
