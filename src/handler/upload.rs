//! Upload endpoint
//!
//! `POST /upload?path=P` stores the first `myFile` part of a multipart body in
//! directory `P`. Other parts are drained and ignored.

use std::error::Error as StdError;
use std::io;

use futures_util::TryStreamExt;
use http_body_util::BodyExt;
use hyper::body::Bytes;
use hyper::Response;

use crate::config::AppState;
use crate::handler::router::RequestContext;
use crate::http::{self, Body};
use crate::logger;
use crate::storage::{self, StorageError, UploadReceipt};

/// Form field carrying the uploaded file
const UPLOAD_FIELD: &str = "myFile";

#[derive(Debug, thiserror::Error)]
enum UploadFailure {
    /// Rejected before any byte was stored
    #[error(transparent)]
    Request(#[from] StorageError),
    #[error("upload failed: {0}")]
    Write(StorageError),
}

pub async fn handle_upload<B>(ctx: &RequestContext, body: B, state: &AppState) -> Response<Body>
where
    B: hyper::body::Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    match store_upload(ctx, body, state).await {
        Ok(receipt) => {
            logger::log_upload_stored(&receipt.path, receipt.bytes);
            http::build_ok_response()
        }
        Err(e) => {
            let message = e.to_string();
            logger::log_request_failed(&ctx.method, &ctx.path, &message);
            http::build_error_response(&message)
        }
    }
}

async fn store_upload<B>(
    ctx: &RequestContext,
    body: B,
    state: &AppState,
) -> Result<UploadReceipt, UploadFailure>
where
    B: hyper::body::Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let storage_config = state.storage();
    let dir = storage::validate_path(&storage_config.base_path, &ctx.target).await?;
    if !dir.is_dir() {
        return Err(StorageError::NotADirectory.into());
    }

    let boundary = multer::parse_boundary(ctx.content_type.as_deref().unwrap_or_default())
        .map_err(|e| StorageError::MalformedMultipart(e.to_string()))?;
    let mut multipart = multer::Multipart::new(body.into_data_stream(), boundary);

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| StorageError::MalformedMultipart(e.to_string()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            logger::log_debug(&format!(
                "Skipping form part '{}'",
                field.name().unwrap_or_default()
            ));
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let content = field.map_err(io::Error::other);
        return storage::upload_file(&dir, &file_name, content, storage_config)
            .await
            .map_err(UploadFailure::Write);
    }

    Err(StorageError::UnknownPayload.into())
}
