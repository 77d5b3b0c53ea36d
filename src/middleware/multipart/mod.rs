//! Streaming `multipart/form-data` upload middleware.
//!
//! [`Multipart`] drives a hand-rolled byte state machine over the request
//! body stream, delivering file chunks to caller-supplied async callbacks as
//! they arrive. Callbacks are awaited before more bytes are consumed, so a
//! slow consumer naturally backpressures the upload.

mod parser;
mod upload;

pub use self::parser::MultipartError;
pub use self::upload::{
    CallbackFuture, CompletedFile, FileChunk, FileDirective, FileInfo, FileStartFuture, Multipart,
    MultipartSettings, Upload, UploadCallbacks,
};
