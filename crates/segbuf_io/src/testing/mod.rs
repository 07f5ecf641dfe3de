// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! In-memory raw sources and sinks for testing code built on `segbuf_io`.

mod fake_error;
mod fake_sink;
mod fake_source;
mod pending;

pub use fake_error::*;
pub use fake_sink::*;
pub use fake_source::*;
pub use pending::*;
