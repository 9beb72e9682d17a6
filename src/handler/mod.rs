//! Request handler module
//!
//! Routes requests to the embedded web UI, the listing/download endpoint and
//! the upload endpoint.

pub mod assets;
pub mod download;
pub mod list;
pub mod router;
pub mod upload;

// Re-export main entry point
pub use router::{handle_request, RequestContext};
