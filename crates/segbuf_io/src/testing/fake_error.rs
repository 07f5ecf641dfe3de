// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::error::Error as _;

use segbuf::ErrorKind;

/// The error type of the fakes in this module.
///
/// Either wraps a [`segbuf::Error`] (e.g. when a fake is used after being closed) or reports a
/// failure injected via the builder of a fake.
#[ohno::error]
#[from(segbuf::Error)]
pub struct FakeError;

impl FakeError {
    pub(crate) fn injected(operation: &'static str) -> Self {
        Self::caused_by(format!("injected {operation} failure"))
    }

    /// The kind of the wrapped [`segbuf::Error`], or `None` for an injected failure.
    #[must_use]
    pub fn segbuf_kind(&self) -> Option<ErrorKind> {
        self.source()
            .and_then(|source| source.downcast_ref::<segbuf::Error>())
            .map(segbuf::Error::kind)
    }

    /// Whether this reports a failure injected via the builder of a fake.
    #[must_use]
    pub fn is_injected(&self) -> bool {
        self.segbuf_kind().is_none()
    }
}
