//! Embedded web UI module
//!
//! The browser front-end is compiled into the binary; nothing here reads the
//! served directory tree.

use std::borrow::Cow;

use hyper::body::Bytes;
use hyper::Response;
use rust_embed::RustEmbed;

use crate::handler::router::RequestContext;
use crate::http::{self, cache, mime, Body};

#[derive(RustEmbed)]
#[folder = "web/"]
struct WebAssets;

/// Serve an embedded asset; directory-style paths map to their `index.html`
pub fn serve_asset(ctx: &RequestContext) -> Response<Body> {
    let name = asset_name(&ctx.path);
    let Some(asset) = WebAssets::get(&name) else {
        return http::build_404_response();
    };

    let etag = cache::generate_etag(&asset.data);
    if cache::check_etag_match(ctx.if_none_match.as_deref(), &etag) {
        return http::build_304_response(&etag, None);
    }

    let data = match asset.data {
        Cow::Borrowed(bytes) => Bytes::from_static(bytes),
        Cow::Owned(bytes) => Bytes::from(bytes),
    };
    http::response::build_asset_response(data, mime::content_type_for(&name), &etag, ctx.is_head)
}

fn asset_name(path: &str) -> String {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() || trimmed.ends_with('/') {
        format!("{trimmed}index.html")
    } else {
        trimmed.to_string()
    }
}
