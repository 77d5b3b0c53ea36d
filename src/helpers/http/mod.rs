//! Helpers for HTTP request handling and response generation.

pub mod header;
pub mod request;
pub mod response;

use log::trace;
use percent_encoding::percent_decode_str;

/// Represents data that has been successfully percent decoded and is valid
/// UTF-8.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PercentDecoded {
    val: String,
}

impl PercentDecoded {
    /// Attempt to decode data that has been provided in a percent encoded
    /// format and ensure that the result is valid UTF-8.
    ///
    /// On success, the decoded data is returned as a `PercentDecoded` value,
    /// which allows a compile-time check that the decode has occurred in
    /// places where it's assumed to have occurred.
    pub(crate) fn new(raw: &str) -> Option<Self> {
        match percent_decode_str(raw).decode_utf8() {
            Ok(pd) => {
                trace!(" percent_decode: {}, src: {}", pd, raw);
                Some(PercentDecoded {
                    val: pd.into_owned(),
                })
            }
            Err(_) => {
                trace!(" percent_decode: error, src: {}", raw);
                None
            }
        }
    }
}

impl AsRef<str> for PercentDecoded {
    fn as_ref(&self) -> &str {
        &self.val
    }
}
