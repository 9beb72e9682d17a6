//! HTTP protocol layer module
//!
//! HTTP building blocks shared by the request handlers: body types, response
//! builders, conditional and Range requests, MIME types, Content-Disposition
//! and query string parsing.

pub mod body;
pub mod cache;
pub mod disposition;
pub mod mime;
pub mod query;
pub mod range;
pub mod response;

// Re-export commonly used types
pub use body::Body;
pub use range::parse_range_header;
pub use response::{
    build_304_response, build_404_response, build_405_response, build_416_response,
    build_error_response, build_json_response, build_ok_response,
};
