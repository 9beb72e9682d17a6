//! Listing endpoint
//!
//! `GET /list?path=P` answers with the JSON listing of a directory, or hands a
//! file over to the download handler.

use hyper::Response;

use crate::config::AppState;
use crate::handler::download;
use crate::handler::router::RequestContext;
use crate::http::{self, Body};
use crate::logger;
use crate::storage::{self, EntryKind, StorageError};

pub async fn handle_list(ctx: &RequestContext, state: &AppState) -> Response<Body> {
    let storage_config = state.storage();

    // Disabled listing answers before any filesystem access, downloads included
    if storage_config.disable_directory_listing {
        return http::build_json_response(&Vec::<String>::new(), ctx.is_head);
    }

    let target = match storage::validate_path(&storage_config.base_path, &ctx.target).await {
        Ok(target) => target,
        Err(e) => return reject(ctx, &e),
    };

    match target.kind() {
        EntryKind::File => download::serve_download(ctx, &target).await,
        EntryKind::Directory => match storage::list_directory(&target, storage_config).await {
            Ok(entries) => {
                logger::log_debug(&format!("Listed {target} ({} entries)", entries.len()));
                http::build_json_response(&entries, ctx.is_head)
            }
            Err(e) => reject(ctx, &e),
        },
    }
}

fn reject(ctx: &RequestContext, err: &StorageError) -> Response<Body> {
    let message = err.to_string();
    logger::log_request_failed(&ctx.method, &ctx.path, &message);
    http::build_error_response(&message)
}
