//! The boundary-driven byte state machine behind the upload middleware.
//!
//! The parser is fed raw body chunks and emits events; it holds back at most
//! one boundary-length window of file bytes, so bodies stream through
//! without ever being buffered whole.

use bytes::{Buf, Bytes, BytesMut};
use thiserror::Error;

// A part's header block must fit in this window.
const MAX_HEADER_BLOCK: usize = 8 * 1024;

/// Failures recognised while parsing a multipart body. The upload middleware
/// maps these onto 400/413/415 responses.
#[derive(Debug, Error)]
pub enum MultipartError {
    /// The byte stream violated the multipart grammar.
    #[error("malformed multipart body: {0}")]
    Malformed(String),

    /// The body exceeded the total upload limit.
    #[error("request body exceeds the total upload limit")]
    TotalSizeExceeded,

    /// A single file exceeded the per-file limit.
    #[error("file in field `{field}` exceeds the per-file size limit")]
    FileSizeExceeded {
        /// The form field carrying the oversize file.
        field: String,
    },

    /// The upload carried more files than permitted.
    #[error("upload exceeds the file count limit")]
    TooManyFiles,

    /// The upload carried more non-file fields than permitted.
    #[error("upload exceeds the field count limit")]
    TooManyFields,

    /// A file part announced a content type outside the allowed list.
    #[error("unsupported content type `{content_type}`")]
    UnsupportedType {
        /// The rejected content type.
        content_type: String,
    },
}

/// Size and count limits enforced while parsing.
#[derive(Clone, Debug)]
pub(crate) struct Limits {
    pub(crate) max_total_size: u64,
    pub(crate) max_file_size: u64,
    pub(crate) max_files: u32,
    pub(crate) max_fields: u32,
    pub(crate) allowed_types: Option<Vec<String>>,
}

/// Parser output, in stream order.
#[derive(Debug)]
pub(crate) enum Event {
    Field {
        name: String,
        value: String,
    },
    FileStart {
        field: String,
        filename: String,
        content_type: Option<String>,
    },
    FileChunk {
        data: Bytes,
        offset: u64,
        is_last: bool,
    },
    FileEnd {
        size: u64,
    },
}

enum State {
    Preamble,
    Boundary,
    PartHeaders,
    FieldBody { name: String },
    FileBody { field: String, written: u64 },
    Epilogue,
}

pub(crate) struct MultipartParser {
    delimiter: Vec<u8>,
    state: State,
    buf: BytesMut,
    limits: Limits,
    total: u64,
    files: u32,
    fields: u32,
}

impl MultipartParser {
    pub(crate) fn new(boundary: &str, limits: Limits) -> Self {
        let mut delimiter = Vec::with_capacity(boundary.len() + 4);
        delimiter.extend_from_slice(b"\r\n--");
        delimiter.extend_from_slice(boundary.as_bytes());

        // Seeding the buffer with CRLF lets the first `--boundary`, which
        // has no preceding line break on the wire, match the delimiter.
        let mut buf = BytesMut::new();
        buf.extend_from_slice(b"\r\n");

        MultipartParser {
            delimiter,
            state: State::Preamble,
            buf,
            limits,
            total: 0,
            files: 0,
            fields: 0,
        }
    }

    /// Consumes one body chunk, appending any completed events.
    pub(crate) fn feed(
        &mut self,
        chunk: &[u8],
        events: &mut Vec<Event>,
    ) -> Result<(), MultipartError> {
        self.total += chunk.len() as u64;
        if self.total > self.limits.max_total_size {
            return Err(MultipartError::TotalSizeExceeded);
        }
        self.buf.extend_from_slice(chunk);
        self.process(events)
    }

    /// Verifies the stream ended after the closing boundary.
    pub(crate) fn finish(&self) -> Result<(), MultipartError> {
        match self.state {
            State::Epilogue => Ok(()),
            _ => Err(MultipartError::Malformed(
                "body ended before the closing boundary".to_string(),
            )),
        }
    }

    fn process(&mut self, events: &mut Vec<Event>) -> Result<(), MultipartError> {
        loop {
            match &mut self.state {
                State::Preamble => match find(&self.buf, &self.delimiter) {
                    Some(pos) => {
                        self.buf.advance(pos + self.delimiter.len());
                        self.state = State::Boundary;
                    }
                    None => {
                        let keep = (self.delimiter.len() - 1).min(self.buf.len());
                        let discard = self.buf.len() - keep;
                        self.buf.advance(discard);
                        return Ok(());
                    }
                },

                State::Boundary => {
                    if self.buf.len() < 2 {
                        return Ok(());
                    }
                    if &self.buf[..2] == b"--" {
                        self.buf.advance(2);
                        self.state = State::Epilogue;
                    } else if &self.buf[..2] == b"\r\n" {
                        self.buf.advance(2);
                        self.state = State::PartHeaders;
                    } else {
                        return Err(MultipartError::Malformed(
                            "boundary not followed by CRLF or `--`".to_string(),
                        ));
                    }
                }

                State::PartHeaders => match find(&self.buf, b"\r\n\r\n") {
                    None => {
                        if self.buf.len() > MAX_HEADER_BLOCK {
                            return Err(MultipartError::Malformed(
                                "part header block too large".to_string(),
                            ));
                        }
                        return Ok(());
                    }
                    Some(pos) => {
                        let head = self.buf.split_to(pos + 4);
                        let part = parse_part_headers(&head[..pos])?;

                        if let Some(filename) = part.filename {
                            self.files += 1;
                            if self.files > self.limits.max_files {
                                return Err(MultipartError::TooManyFiles);
                            }
                            if let Some(allowed) = &self.limits.allowed_types {
                                let content_type = part
                                    .content_type
                                    .clone()
                                    .unwrap_or_else(|| "application/octet-stream".to_string());
                                if !type_allowed(allowed, &content_type) {
                                    return Err(MultipartError::UnsupportedType { content_type });
                                }
                            }
                            events.push(Event::FileStart {
                                field: part.name.clone(),
                                filename,
                                content_type: part.content_type,
                            });
                            self.state = State::FileBody {
                                field: part.name,
                                written: 0,
                            };
                        } else {
                            self.fields += 1;
                            if self.fields > self.limits.max_fields {
                                return Err(MultipartError::TooManyFields);
                            }
                            self.state = State::FieldBody { name: part.name };
                        }
                    }
                },

                State::FieldBody { name } => match find(&self.buf, &self.delimiter) {
                    None => return Ok(()),
                    Some(pos) => {
                        let name = name.clone();
                        let raw = self.buf.split_to(pos);
                        self.buf.advance(self.delimiter.len());
                        events.push(Event::Field {
                            name,
                            value: String::from_utf8_lossy(&raw).into_owned(),
                        });
                        self.state = State::Boundary;
                    }
                },

                State::FileBody { field, written } => match find(&self.buf, &self.delimiter) {
                    Some(pos) => {
                        let size = *written + pos as u64;
                        if size > self.limits.max_file_size {
                            return Err(MultipartError::FileSizeExceeded {
                                field: field.clone(),
                            });
                        }
                        let offset = *written;
                        let data = self.buf.split_to(pos).freeze();
                        self.buf.advance(self.delimiter.len());
                        events.push(Event::FileChunk {
                            data,
                            offset,
                            is_last: true,
                        });
                        events.push(Event::FileEnd { size });
                        self.state = State::Boundary;
                    }
                    None => {
                        // Everything except a potential partial delimiter at
                        // the tail is safe to release downstream.
                        let safe = self.buf.len().saturating_sub(self.delimiter.len() - 1);
                        if safe > 0 {
                            let size = *written + safe as u64;
                            if size > self.limits.max_file_size {
                                return Err(MultipartError::FileSizeExceeded {
                                    field: field.clone(),
                                });
                            }
                            let offset = *written;
                            *written = size;
                            let data = self.buf.split_to(safe).freeze();
                            events.push(Event::FileChunk {
                                data,
                                offset,
                                is_last: false,
                            });
                        }
                        return Ok(());
                    }
                },

                State::Epilogue => {
                    self.buf.clear();
                    return Ok(());
                }
            }
        }
    }
}

struct PartHeaders {
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
}

fn parse_part_headers(raw: &[u8]) -> Result<PartHeaders, MultipartError> {
    let text = std::str::from_utf8(raw)
        .map_err(|_| MultipartError::Malformed("part headers are not valid UTF-8".to_string()))?;

    let mut name = None;
    let mut filename = None;
    let mut content_type = None;

    for line in text.split("\r\n") {
        if line.is_empty() {
            continue;
        }
        let (key, value) = line.split_once(':').ok_or_else(|| {
            MultipartError::Malformed(format!("part header line `{}` has no colon", line))
        })?;

        match key.trim().to_ascii_lowercase().as_str() {
            "content-disposition" => {
                for param in value.split(';').skip(1) {
                    if let Some((k, v)) = param.trim().split_once('=') {
                        let v = v.trim().trim_matches('"').to_string();
                        match k.trim() {
                            "name" => name = Some(v),
                            "filename" => filename = Some(v),
                            _ => {}
                        }
                    }
                }
            }
            "content-type" => content_type = Some(value.trim().to_string()),
            _ => {}
        }
    }

    let name = name.ok_or_else(|| {
        MultipartError::Malformed("part is missing a content-disposition name".to_string())
    })?;

    Ok(PartHeaders {
        name,
        filename,
        content_type,
    })
}

fn type_allowed(allowed: &[String], content_type: &str) -> bool {
    allowed.iter().any(|entry| {
        if let Some(prefix) = entry.strip_suffix("/*") {
            content_type
                .strip_prefix(prefix)
                .map(|rest| rest.starts_with('/'))
                .unwrap_or(false)
        } else {
            entry == content_type
        }
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
