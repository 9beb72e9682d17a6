//! filedrop: browse, download and upload files under a single root directory
//! over HTTP.

pub mod config;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
pub mod storage;
