//! File download module
//!
//! Streams a validated file as an attachment, honoring conditional and Range
//! requests.

use std::io;

use hyper::{Response, StatusCode};
use tokio::fs::File;

use crate::handler::router::RequestContext;
use crate::http::range::RangeParseResult;
use crate::http::{self, body, cache, disposition, Body};
use crate::logger;
use crate::storage::{StorageError, ValidatedPath};

/// Serve `target` as a download, answering 400 if it can no longer be read
pub async fn serve_download(ctx: &RequestContext, target: &ValidatedPath) -> Response<Body> {
    match build_download(ctx, target).await {
        Ok(response) => response,
        Err(e) => {
            let message = StorageError::from(e).to_string();
            logger::log_request_failed(&ctx.method, &ctx.path, &message);
            http::build_error_response(&message)
        }
    }
}

async fn build_download(ctx: &RequestContext, target: &ValidatedPath) -> io::Result<Response<Body>> {
    let file = File::open(target.as_path()).await?;
    let metadata = file.metadata().await?;
    // The entry may have been swapped for a directory since validation
    if metadata.is_dir() {
        return Err(io::Error::other("is a directory"));
    }

    let size = metadata.len();
    let modified = metadata.modified().ok();
    let etag = cache::file_etag(size, modified);
    let last_modified = modified.map(cache::http_date);

    // If-None-Match takes precedence over If-Modified-Since
    let not_modified = if ctx.if_none_match.is_some() {
        cache::check_etag_match(ctx.if_none_match.as_deref(), &etag)
    } else {
        cache::not_modified_since(ctx.if_modified_since.as_deref(), modified)
    };
    if not_modified {
        return Ok(http::build_304_response(&etag, last_modified.as_deref()));
    }

    let range = if cache::if_range_matches(ctx.if_range.as_deref(), &etag, last_modified.as_deref()) {
        http::parse_range_header(ctx.range_header.as_deref(), size)
    } else {
        RangeParseResult::None
    };

    let (status, start, len, content_range) = match range {
        RangeParseResult::Valid(r) => (
            StatusCode::PARTIAL_CONTENT,
            r.start,
            r.len(),
            Some(r.content_range(size)),
        ),
        RangeParseResult::NotSatisfiable => return Ok(http::build_416_response(size)),
        RangeParseResult::None => (StatusCode::OK, 0, size, None),
    };

    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if !ctx.is_head {
        logger::log_download(target.as_path());
    }
    let body = if ctx.is_head {
        body::empty()
    } else {
        body::file_body(file, start, len).await?
    };

    let mut builder = Response::builder()
        .status(status)
        .header("Content-Type", "application/octet-stream")
        .header("Content-Disposition", disposition::attachment(&file_name))
        .header("Content-Length", len)
        .header("Accept-Ranges", "bytes")
        .header("ETag", &etag);
    if let Some(date) = &last_modified {
        builder = builder.header("Last-Modified", date);
    }
    if let Some(value) = content_range {
        builder = builder.header("Content-Range", value);
    }

    Ok(builder.body(body).unwrap_or_else(|e| {
        http::response::log_build_error("download", &e);
        Response::new(body::empty())
    }))
}
