// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// The order in which the bytes of a multi-byte number are written or read.
///
/// There is no default - every numeric write or read states its byte order explicitly.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ByteOrder {
    /// Most significant byte first ("network byte order").
    BigEndian,

    /// Least significant byte first.
    LittleEndian,
}
