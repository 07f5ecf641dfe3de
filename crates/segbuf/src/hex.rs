// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;

use crate::{Error, Result};

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// At most this many bytes are rendered by `Debug` and `Display` implementations.
pub(crate) const PREVIEW_BYTES: usize = 64;

pub(crate) fn encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(char::from(HEX_DIGITS[usize::from(byte >> 4)]));
        out.push(char::from(HEX_DIGITS[usize::from(byte & 0x0f)]));
    }
    out
}

pub(crate) fn decode(text: &str) -> Result<Vec<u8>> {
    let digits = text.as_bytes();
    if digits.len() % 2 != 0 {
        return Err(Error::invalid_format(format!(
            "hex string has odd length {}",
            digits.len()
        )));
    }

    digits
        .chunks_exact(2)
        .map(|pair| Ok((decode_digit(pair[0])? << 4) | decode_digit(pair[1])?))
        .collect()
}

fn decode_digit(digit: u8) -> Result<u8> {
    match digit {
        b'0'..=b'9' => Ok(digit - b'0'),
        b'a'..=b'f' => Ok(digit - b'a' + 10),
        b'A'..=b'F' => Ok(digit - b'A' + 10),
        _ => Err(Error::invalid_format(format!(
            "unexpected hex digit {:?}",
            char::from(digit)
        ))),
    }
}

/// Writes the first [`PREVIEW_BYTES`] of `bytes` as lowercase hex, followed by an ellipsis if
/// `len` is larger.
pub(crate) fn write_hex_preview(
    f: &mut fmt::Formatter<'_>,
    bytes: impl Iterator<Item = u8>,
    len: usize,
) -> fmt::Result {
    for byte in bytes.take(PREVIEW_BYTES) {
        write!(f, "{byte:02x}")?;
    }

    if len > PREVIEW_BYTES {
        f.write_str("…")?;
    }

    Ok(())
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn encode_is_lowercase() {
        assert_eq!(encode(&[0x00, 0x0f, 0xab, 0xff]), "000fabff");
        assert_eq!(encode(&[]), "");
    }

    #[test]
    fn decode_accepts_both_cases() {
        assert_eq!(decode("00ABcdEf").unwrap(), [0x00, 0xab, 0xcd, 0xef]);
        assert_eq!(decode("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn decode_rejects_malformed() {
        assert_eq!(decode("abc").unwrap_err().kind(), ErrorKind::InvalidFormat);
        assert_eq!(decode("zz").unwrap_err().kind(), ErrorKind::InvalidFormat);
        assert_eq!(decode("0 ").unwrap_err().kind(), ErrorKind::InvalidFormat);
    }
}
