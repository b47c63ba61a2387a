use revm::{bytecode::BytecodeDecodeError, primitives::Address};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading a fixture or preparing it for execution.
#[derive(Debug, Error)]
pub enum FixtureError {
    /// Fixture file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path of the fixture file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Fixture content is not valid JSON for the state test schema.
    #[error(transparent)]
    SerdeDeserialize(#[from] serde_json::Error),
    /// Sender is missing and can't be recovered from the secret key.
    #[error("transaction has no sender and no usable secret key")]
    UnknownSender,
    /// One of the transaction part indices points past its list.
    #[error("{part} index {index} out of range, {len} entries available")]
    IndexOutOfRange {
        /// Name of the transaction part (`data`, `gasLimit` or `value`).
        part: &'static str,
        /// Requested index.
        index: usize,
        /// Number of entries in the list.
        len: usize,
    },
    /// Blob and set-code transactions can't create contracts.
    #[error("blob and set-code transactions need a `to` address")]
    MissingTarget,
    /// Transaction field doesn't fit the width the EVM expects.
    #[error("transaction field `{0}` overflows")]
    FieldOverflow(&'static str),
    /// Authorization list entry is malformed.
    #[error("invalid authorization for {address}: {reason}")]
    InvalidAuthorization {
        /// Delegate address of the entry.
        address: Address,
        /// What is wrong with it.
        reason: &'static str,
    },
    /// Pre-state code can't be decoded.
    #[error("invalid code for account {address}: {source}")]
    InvalidCode {
        /// Account that owns the code.
        address: Address,
        /// Decoding error.
        source: BytecodeDecodeError,
    },
}
