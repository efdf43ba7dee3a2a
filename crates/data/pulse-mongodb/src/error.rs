//! Driver error mapping.

use mongodb::error::{ErrorKind, WriteFailure};
use pulse_core::Error;

const DUPLICATE_KEY: i32 = 11000;

pub(crate) fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY,
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY,
        _ => false,
    }
}

/// Anything the driver reports becomes `DependencyUnavailable`.
pub(crate) fn store_err(err: mongodb::error::Error) -> Error {
    Error::unavailable(format!("mongodb: {err}"))
}

pub(crate) fn decode_err(err: bson::de::Error) -> Error {
    Error::unavailable(format!("bson decode: {err}"))
}

/// Stored ids are always object ids, so a parse failure here means the
/// collection holds foreign data.
pub(crate) fn corrupt(what: &str) -> Error {
    Error::unavailable(format!("corrupt document: {what}"))
}
