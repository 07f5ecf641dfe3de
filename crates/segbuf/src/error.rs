// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{self, Display};
use std::io;

/// An error signaled by buffer, byte string and stream operations.
///
/// The [`kind()`][Self::kind] identifies the category of failure. Additional details
/// (e.g. how many bytes were required versus available) are attached as the error source
/// and are visible when the error is displayed.
///
/// Operations that return this error leave the object they were called on unchanged,
/// unless documented otherwise.
#[ohno::error]
#[display("{kind}")]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    /// The category of the failure.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// An [`ErrorKind::InsufficientData`] error recording how many bytes a read needed and how
    /// many were available.
    #[must_use]
    pub fn insufficient_data(required: usize, available: usize) -> Self {
        Self::caused_by(
            ErrorKind::InsufficientData,
            format!("{required} bytes required but only {available} bytes available"),
        )
    }

    pub(crate) fn out_of_bounds(detail: impl Into<String>) -> Self {
        Self::caused_by(ErrorKind::OutOfBounds, detail.into())
    }

    pub(crate) fn invalid_format(detail: impl Into<String>) -> Self {
        Self::caused_by(ErrorKind::InvalidFormat, detail.into())
    }

    pub(crate) fn closed() -> Self {
        Self::new(ErrorKind::Closed)
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

/// The category of an [`Error`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A read required more bytes than were available (or than the stream could produce).
    InsufficientData,

    /// An index, offset or range fell outside the valid bounds of the object.
    OutOfBounds,

    /// Encoded input (hex, base64) was malformed.
    InvalidFormat,

    /// The object was used after it was closed.
    Closed,

    /// An operation was started while a previous one was still in flight.
    OperationInFlight,

    /// An operation was interrupted by an abort request.
    Aborted,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::InsufficientData => "insufficient data",
            Self::OutOfBounds => "out of bounds",
            Self::InvalidFormat => "invalid format",
            Self::Closed => "closed",
            Self::OperationInFlight => "operation already in flight",
            Self::Aborted => "aborted",
        };

        f.write_str(message)
    }
}

/// A `Result` that may contain an [`Error`] from this crate.
pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for io::Error {
    fn from(value: Error) -> Self {
        let kind = match value.kind() {
            ErrorKind::InsufficientData => io::ErrorKind::UnexpectedEof,
            ErrorKind::OutOfBounds => io::ErrorKind::InvalidInput,
            ErrorKind::InvalidFormat => io::ErrorKind::InvalidData,
            ErrorKind::Closed | ErrorKind::OperationInFlight | ErrorKind::Aborted => io::ErrorKind::Other,
        };

        Self::new(kind, value)
    }
}
