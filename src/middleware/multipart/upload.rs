//! The upload driver: wires the multipart parser to the request body stream
//! and the caller's callbacks.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::StreamExt;
use hyper::header::CONTENT_TYPE;
use hyper::{Body, StatusCode};
use log::trace;
use serde_json::Value;
use uuid::Uuid;

use crate::context::Context;
use crate::handler::{HandlerFuture, HandlerResult, Outcome, RouteHandler};
use crate::helpers::http::response::create_response;

use super::parser::{Event, Limits, MultipartError, MultipartParser};

/// The boxed future returned by most upload callbacks.
pub type CallbackFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// The boxed future returned by the file-start callback, optionally carrying
/// a [`FileDirective`].
pub type FileStartFuture = Pin<Box<dyn Future<Output = Option<FileDirective>> + Send>>;

/// Describes one file part of an upload. Threaded through every file
/// callback, including whatever the file-start callback customised.
#[derive(Clone, Debug)]
pub struct FileInfo {
    /// The form field the file arrived under.
    pub field: String,
    /// The filename announced by the client.
    pub filename: String,
    /// The filename assigned by the file-start callback, if any.
    pub custom_filename: Option<String>,
    /// The content type announced for the part.
    pub content_type: Option<String>,
    /// Metadata attached by the file-start callback, if any.
    pub metadata: Option<Value>,
}

/// Returned by the file-start callback to customise how a file is handled.
#[derive(Clone, Debug, Default)]
pub struct FileDirective {
    /// Overrides the stored filename.
    pub custom_filename: Option<String>,
    /// Attached to the file and threaded into later callbacks.
    pub metadata: Option<Value>,
}

/// One chunk of file bytes, in stream order.
#[derive(Clone, Debug)]
pub struct FileChunk {
    /// The bytes.
    pub data: Bytes,
    /// Offset of the first byte within the file.
    pub offset: u64,
    /// True on the final chunk of the file, determined when the parser sees
    /// the next boundary.
    pub is_last: bool,
}

/// The async callbacks invoked while an upload streams through.
///
/// All callbacks are optional. Each is awaited before the parser consumes
/// more of the body.
#[derive(Clone, Default)]
pub struct UploadCallbacks {
    /// Invoked once before the body is read.
    pub on_upload_start: Option<Arc<dyn Fn(&str) -> CallbackFuture + Send + Sync>>,
    /// Invoked once at the end; `true` when the upload succeeded.
    pub on_upload_complete: Option<Arc<dyn Fn(&str, bool) -> CallbackFuture + Send + Sync>>,
    /// Invoked when a file part begins; may rename it or attach metadata.
    pub on_file_start: Option<Arc<dyn Fn(&str, &FileInfo) -> FileStartFuture + Send + Sync>>,
    /// Invoked for each chunk of file bytes.
    pub on_file_chunk: Option<Arc<dyn Fn(&str, &FileInfo, FileChunk) -> CallbackFuture + Send + Sync>>,
    /// Invoked when a file part completes, with its final size.
    pub on_file_complete: Option<Arc<dyn Fn(&str, &FileInfo, u64) -> CallbackFuture + Send + Sync>>,
    /// Invoked when parsing fails while a file is in flight.
    pub on_file_error: Option<Arc<dyn Fn(&str, &FileInfo, &str) -> CallbackFuture + Send + Sync>>,
    /// Invoked for each non-file form field, with its name and value.
    pub on_field: Option<Arc<dyn Fn(&str, &str, &str) -> CallbackFuture + Send + Sync>>,
    /// Invoked for any parse or stream failure.
    pub on_error: Option<Arc<dyn Fn(&str, &str) -> CallbackFuture + Send + Sync>>,
}

/// Configuration for [`Multipart`].
#[derive(Clone)]
pub struct MultipartSettings {
    /// Upper bound on the whole body. Defaults to 100 MiB.
    pub max_total_size: u64,
    /// Upper bound per file. Defaults to 20 MiB.
    pub max_file_size: u64,
    /// Upper bound on file parts. Defaults to 50.
    pub max_files: u32,
    /// Upper bound on non-file fields. Defaults to 1000.
    pub max_fields: u32,
    /// Accepted file content types; entries may be exact (`text/plain`) or a
    /// type family (`image/*`). `None` accepts everything.
    pub allowed_types: Option<Vec<String>>,
    /// Generates upload ids; defaults to UUID v4.
    pub upload_id: Option<Arc<dyn Fn() -> String + Send + Sync>>,
    /// The streaming callbacks.
    pub callbacks: UploadCallbacks,
}

impl Default for MultipartSettings {
    fn default() -> Self {
        MultipartSettings {
            max_total_size: 100 * 1024 * 1024,
            max_file_size: 20 * 1024 * 1024,
            max_files: 50,
            max_fields: 1000,
            allowed_types: None,
            upload_id: None,
            callbacks: UploadCallbacks::default(),
        }
    }
}

/// A file that finished streaming, as recorded in the [`Upload`] summary.
#[derive(Clone, Debug)]
pub struct CompletedFile {
    /// The file's descriptor, including callback customisations.
    pub info: FileInfo,
    /// Total size in bytes.
    pub size: u64,
}

/// The summary published into the context after a successful upload.
#[derive(Clone, Debug)]
pub struct Upload {
    /// The upload id handed to every callback.
    pub id: String,
    /// The non-file fields, in stream order.
    pub fields: Vec<(String, String)>,
    /// The completed files, in stream order.
    pub files: Vec<CompletedFile>,
}

/// The streaming upload middleware. Register it as a filter on the routes
/// that accept uploads; downstream handlers read the [`Upload`] summary from
/// the context.
pub struct Multipart {
    settings: Arc<MultipartSettings>,
}

impl Multipart {
    /// Builds the middleware.
    pub fn new(settings: MultipartSettings) -> Self {
        Multipart {
            settings: Arc::new(settings),
        }
    }
}

impl RouteHandler for Multipart {
    fn call(&self, ctx: Context) -> Pin<Box<HandlerFuture>> {
        let settings = self.settings.clone();
        Box::pin(drive(settings, ctx))
    }
}

async fn drive(settings: Arc<MultipartSettings>, mut ctx: Context) -> HandlerResult {
    let boundary = ctx
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(boundary_from);
    let boundary = match boundary {
        Some(boundary) => boundary,
        None => {
            let response = create_response(
                &ctx,
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                mime::TEXT_PLAIN,
                "expected multipart/form-data with a boundary",
            );
            return Ok((ctx, Outcome::Respond(response)));
        }
    };

    let body = match ctx.take_body() {
        Some(body) => body,
        None => {
            let response = create_response(
                &ctx,
                StatusCode::BAD_REQUEST,
                mime::TEXT_PLAIN,
                "request body unavailable",
            );
            return Ok((ctx, Outcome::Respond(response)));
        }
    };

    let id = match &settings.upload_id {
        Some(generate) => generate(),
        None => Uuid::new_v4().to_string(),
    };
    trace!("[{}] upload {} started", ctx.request_id(), id);

    if let Some(cb) = &settings.callbacks.on_upload_start {
        cb(&id).await;
    }

    match pump(&settings, &id, &boundary, body).await {
        Ok((fields, files)) => {
            trace!("[{}] upload {} complete", ctx.request_id(), id);
            if let Some(cb) = &settings.callbacks.on_upload_complete {
                cb(&id, true).await;
            }
            ctx.put(Upload { id, fields, files });
            Ok((ctx, Outcome::Continue))
        }
        Err((status, message)) => {
            // The body was dropped inside `pump`, cancelling the stream
            // before the error response goes out.
            if let Some(cb) = &settings.callbacks.on_upload_complete {
                cb(&id, false).await;
            }
            let response = create_response(&ctx, status, mime::TEXT_PLAIN, message);
            Ok((ctx, Outcome::Respond(response)))
        }
    }
}

type PumpOutput = (Vec<(String, String)>, Vec<CompletedFile>);

async fn pump(
    settings: &MultipartSettings,
    id: &str,
    boundary: &str,
    mut body: Body,
) -> Result<PumpOutput, (StatusCode, String)> {
    let limits = Limits {
        max_total_size: settings.max_total_size,
        max_file_size: settings.max_file_size,
        max_files: settings.max_files,
        max_fields: settings.max_fields,
        allowed_types: settings.allowed_types.clone(),
    };
    let callbacks = &settings.callbacks;

    let mut parser = MultipartParser::new(boundary, limits);
    let mut events = Vec::new();
    let mut current: Option<FileInfo> = None;
    let mut fields = Vec::new();
    let mut files = Vec::new();

    while let Some(next) = body.next().await {
        let chunk = match next {
            Ok(chunk) => chunk,
            Err(e) => {
                let message = format!("error reading request body: {}", e);
                if let (Some(cb), Some(info)) = (&callbacks.on_file_error, &current) {
                    cb(id, info, &message).await;
                }
                if let Some(cb) = &callbacks.on_error {
                    cb(id, &message).await;
                }
                return Err((StatusCode::BAD_REQUEST, message));
            }
        };

        let fed = parser.feed(&chunk, &mut events);
        dispatch(callbacks, id, &mut events, &mut current, &mut fields, &mut files).await;
        if let Err(e) = fed {
            return Err(fail(callbacks, id, &current, e).await);
        }
    }

    if let Err(e) = parser.finish() {
        return Err(fail(callbacks, id, &current, e).await);
    }

    Ok((fields, files))
}

async fn dispatch(
    callbacks: &UploadCallbacks,
    id: &str,
    events: &mut Vec<Event>,
    current: &mut Option<FileInfo>,
    fields: &mut Vec<(String, String)>,
    files: &mut Vec<CompletedFile>,
) {
    for event in events.drain(..) {
        match event {
            Event::Field { name, value } => {
                if let Some(cb) = &callbacks.on_field {
                    cb(id, &name, &value).await;
                }
                fields.push((name, value));
            }
            Event::FileStart {
                field,
                filename,
                content_type,
            } => {
                let mut info = FileInfo {
                    field,
                    filename,
                    custom_filename: None,
                    content_type,
                    metadata: None,
                };
                if let Some(cb) = &callbacks.on_file_start {
                    if let Some(directive) = cb(id, &info).await {
                        info.custom_filename = directive.custom_filename;
                        info.metadata = directive.metadata;
                    }
                }
                *current = Some(info);
            }
            Event::FileChunk {
                data,
                offset,
                is_last,
            } => {
                if let (Some(cb), Some(info)) = (&callbacks.on_file_chunk, current.as_ref()) {
                    cb(
                        id,
                        info,
                        FileChunk {
                            data,
                            offset,
                            is_last,
                        },
                    )
                    .await;
                }
            }
            Event::FileEnd { size } => {
                if let Some(info) = current.take() {
                    if let Some(cb) = &callbacks.on_file_complete {
                        cb(id, &info, size).await;
                    }
                    files.push(CompletedFile { info, size });
                }
            }
        }
    }
}

async fn fail(
    callbacks: &UploadCallbacks,
    id: &str,
    current: &Option<FileInfo>,
    e: MultipartError,
) -> (StatusCode, String) {
    let message = e.to_string();
    if let (Some(cb), Some(info)) = (&callbacks.on_file_error, current) {
        cb(id, info, &message).await;
    }
    if let Some(cb) = &callbacks.on_error {
        cb(id, &message).await;
    }
    (status_for(&e), message)
}

fn status_for(e: &MultipartError) -> StatusCode {
    match e {
        MultipartError::Malformed(_) => StatusCode::BAD_REQUEST,
        MultipartError::UnsupportedType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        MultipartError::TotalSizeExceeded
        | MultipartError::FileSizeExceeded { .. }
        | MultipartError::TooManyFiles
        | MultipartError::TooManyFields => StatusCode::PAYLOAD_TOO_LARGE,
    }
}

fn boundary_from(content_type: &str) -> Option<String> {
    let mut parts = content_type.split(';');
    if parts.next()?.trim() != "multipart/form-data" {
        return None;
    }
    for param in parts {
        if let Some((key, value)) = param.trim().split_once('=') {
            if key.trim().eq_ignore_ascii_case("boundary") {
                return Some(value.trim().trim_matches('"').to_string());
            }
        }
    }
    None
}
