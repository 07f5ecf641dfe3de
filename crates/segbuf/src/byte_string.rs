// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::cmp::Ordering;
use std::fmt::{self, Debug, Display};
use std::hash::{Hash, Hasher};
use std::iter::Copied;
use std::ops::Range;
use std::slice;
use std::sync::{Arc, OnceLock};

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use xxhash_rust::xxh3::xxh3_64;

use crate::hex::write_hex_preview;
use crate::{Error, Result, hex};

/// An immutable sequence of bytes with value semantics.
///
/// Two byte strings are equal if they contain the same bytes. The hash of the contents is
/// calculated on first use and remembered, so repeated hashing (e.g. when used as a map key)
/// and comparisons of unequal values with already calculated hashes are cheap.
///
/// Cloning and [taking substrings][Self::substring] share the underlying storage.
///
/// # Example
///
/// ```
/// use segbuf::ByteString;
///
/// let greeting = ByteString::from("hello, world");
///
/// assert_eq!(greeting.substring(0..5).unwrap(), ByteString::from("hello"));
/// assert_eq!(greeting.to_hex_string(), "68656c6c6f2c20776f726c64");
/// assert_eq!(greeting.encode_base64(), "aGVsbG8sIHdvcmxk");
/// ```
#[derive(Clone)]
pub struct ByteString {
    data: Arc<Vec<u8>>,
    range: Range<usize>,
    hash: OnceLock<u64>,
}

impl ByteString {
    /// Creates an empty byte string.
    #[must_use]
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    /// Creates a byte string holding a copy of `bytes`.
    #[must_use]
    pub fn copy_from_slice(bytes: &[u8]) -> Self {
        Self::from_vec(bytes.to_vec())
    }

    /// Creates a byte string that takes ownership of `bytes` without copying them.
    #[must_use]
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        let range = 0..bytes.len();
        Self::from_shared(Arc::new(bytes), range)
    }

    /// Creates a byte string over a range of storage that is no longer written to.
    pub(crate) fn from_shared(data: Arc<Vec<u8>>, range: Range<usize>) -> Self {
        debug_assert!(range.end <= data.len());

        Self {
            data,
            range,
            hash: OnceLock::new(),
        }
    }

    /// The number of bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.range.len()
    }

    /// Whether the byte string has no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// The byte at `index`, if there is one.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<u8> {
        self.as_slice().get(index).copied()
    }

    /// The contents as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[self.range.clone()]
    }

    /// Copies the contents into a new vector.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        self.as_slice().to_vec()
    }

    /// Iterates over the bytes.
    pub fn iter(&self) -> Copied<slice::Iter<'_, u8>> {
        self.as_slice().iter().copied()
    }

    /// Whether the contents start with `prefix`.
    #[must_use]
    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.as_slice().starts_with(prefix)
    }

    /// Whether the contents end with `suffix`.
    #[must_use]
    pub fn ends_with(&self, suffix: &[u8]) -> bool {
        self.as_slice().ends_with(suffix)
    }

    /// The index of the first occurrence of `pattern` at or after `start`.
    ///
    /// An empty pattern matches at `start` if `start` is not beyond the end.
    #[must_use]
    pub fn index_of(&self, pattern: &[u8], start: usize) -> Option<usize> {
        let haystack = self.as_slice().get(start..)?;

        if pattern.is_empty() {
            return Some(start);
        }

        haystack
            .windows(pattern.len())
            .position(|window| window == pattern)
            .map(|found| start + found)
    }

    /// The index of the last occurrence of `pattern`.
    ///
    /// An empty pattern matches at the end.
    #[must_use]
    pub fn last_index_of(&self, pattern: &[u8]) -> Option<usize> {
        if pattern.is_empty() {
            return Some(self.len());
        }

        self.as_slice().windows(pattern.len()).rposition(|window| window == pattern)
    }

    /// A byte string covering `range` of this one.
    ///
    /// The substring shares storage with this byte string - no bytes are copied.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::OutOfBounds`][crate::ErrorKind::OutOfBounds] if the range is
    /// reversed or extends beyond the end.
    pub fn substring(&self, range: Range<usize>) -> Result<Self> {
        if range.start > range.end || range.end > self.len() {
            return Err(Error::out_of_bounds(format!(
                "range {range:?} is out of bounds for a byte string of {} bytes",
                self.len()
            )));
        }

        let start = self.range.start + range.start;
        Ok(Self::from_shared(Arc::clone(&self.data), start..start + range.len()))
    }

    /// The hash of the contents.
    ///
    /// Calculated on the first call and remembered afterwards.
    #[must_use]
    pub fn hash_code(&self) -> u64 {
        *self.hash.get_or_init(|| xxh3_64(self.as_slice()))
    }

    /// The contents as lowercase hexadecimal digits, two per byte.
    #[must_use]
    pub fn to_hex_string(&self) -> String {
        hex::encode(self.as_slice())
    }

    /// Parses a string of hexadecimal digits, two per byte. Either case is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidFormat`][crate::ErrorKind::InvalidFormat] if the length
    /// is odd or if there are characters other than hexadecimal digits.
    pub fn from_hex_string(text: &str) -> Result<Self> {
        hex::decode(text).map(Self::from_vec)
    }

    /// The contents encoded as padded base64 with the standard alphabet.
    #[must_use]
    pub fn encode_base64(&self) -> String {
        STANDARD.encode(self.as_slice())
    }

    /// Decodes padded base64 with the standard alphabet.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidFormat`][crate::ErrorKind::InvalidFormat] if the input
    /// contains characters outside of the alphabet or is not correctly padded.
    pub fn decode_base64(text: &str) -> Result<Self> {
        STANDARD
            .decode(text)
            .map(Self::from_vec)
            .map_err(|e| Error::invalid_format(e.to_string()))
    }

    /// The contents encoded as padded base64 with the URL-safe alphabet.
    #[must_use]
    pub fn encode_base64_url(&self) -> String {
        URL_SAFE.encode(self.as_slice())
    }

    /// Decodes padded base64 with the URL-safe alphabet.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidFormat`][crate::ErrorKind::InvalidFormat] if the input
    /// contains characters outside of the alphabet or is not correctly padded.
    pub fn decode_base64_url(text: &str) -> Result<Self> {
        URL_SAFE
            .decode(text)
            .map(Self::from_vec)
            .map_err(|e| Error::invalid_format(e.to_string()))
    }
}

impl Default for ByteString {
    fn default() -> Self {
        Self::new()
    }
}

impl AsRef<[u8]> for ByteString {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl<'a> IntoIterator for &'a ByteString {
    type Item = u8;
    type IntoIter = Copied<slice::Iter<'a, u8>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl From<Vec<u8>> for ByteString {
    fn from(value: Vec<u8>) -> Self {
        Self::from_vec(value)
    }
}

impl From<&[u8]> for ByteString {
    fn from(value: &[u8]) -> Self {
        Self::copy_from_slice(value)
    }
}

impl From<&str> for ByteString {
    fn from(value: &str) -> Self {
        Self::copy_from_slice(value.as_bytes())
    }
}

impl PartialEq for ByteString {
    fn eq(&self, other: &Self) -> bool {
        if let (Some(a), Some(b)) = (self.hash.get(), other.hash.get())
            && a != b
        {
            return false;
        }

        self.as_slice() == other.as_slice()
    }
}

impl Eq for ByteString {}

impl PartialEq<[u8]> for ByteString {
    fn eq(&self, other: &[u8]) -> bool {
        self.as_slice() == other
    }
}

impl PartialEq<&[u8]> for ByteString {
    fn eq(&self, other: &&[u8]) -> bool {
        self.as_slice() == *other
    }
}

impl PartialOrd for ByteString {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ByteString {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_slice().cmp(other.as_slice())
    }
}

impl Hash for ByteString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash_code());
    }
}

impl Display for ByteString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteString(size={} hex=", self.len())?;
        write_hex_preview(f, self.iter(), self.len())?;
        f.write_str(")")
    }
}

impl Debug for ByteString {
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashSet};

    use static_assertions::assert_impl_all;
    use testing_aids::repeating_incrementing_bytes;

    use super::*;
    use crate::ErrorKind;

    assert_impl_all!(ByteString: Send, Sync, Clone, Eq, Ord, Hash, Default);

    #[test]
    fn copies_are_equal_with_equal_hashes() {
        let bytes = repeating_incrementing_bytes().take(300).collect::<Vec<_>>();

        let a = ByteString::copy_from_slice(&bytes);
        let b = ByteString::copy_from_slice(&bytes.clone());

        assert_eq!(a, b);
        assert_eq!(a.hash_code(), b.hash_code());
        assert_eq!(a.hash_code(), a.hash_code());
    }

    #[test]
    fn equality_after_hashing() {
        let a = ByteString::from("abc");
        let b = ByteString::from("abd");
        let c = ByteString::from("abc");

        _ = a.hash_code();
        _ = b.hash_code();

        assert_ne!(a, b);
        assert_eq!(a, c);
        assert_eq!(c, a);
    }

    #[test]
    fn works_as_set_key() {
        let mut set = HashSet::new();
        set.insert(ByteString::from("one"));
        set.insert(ByteString::from("two"));

        assert!(set.contains(&ByteString::from("one")));
        assert!(!set.contains(&ByteString::from("three")));

        let ordered = ["b", "a", "ab"].into_iter().map(ByteString::from).collect::<BTreeSet<_>>();
        let ordered = ordered.iter().map(ByteString::to_vec).collect::<Vec<_>>();
        assert_eq!(ordered, [b"a".to_vec(), b"ab".to_vec(), b"b".to_vec()]);
    }

    #[test]
    fn ordering_is_unsigned() {
        assert!(ByteString::from(&[0x7f_u8][..]) < ByteString::from(&[0x80_u8][..]));
    }

    #[test]
    fn single_byte() {
        let value = ByteString::copy_from_slice(&[0x42]);

        assert_eq!(value.len(), 1);
        assert_eq!(value.get(0), Some(0x42));
        assert_eq!(value.get(1), None);
        assert_eq!(value, [0x42_u8][..]);
    }

    #[test]
    fn from_vec_takes_ownership_without_copy() {
        let bytes = vec![1, 2, 3];
        let ptr = bytes.as_ptr();

        let value = ByteString::from_vec(bytes);

        assert_eq!(value.as_slice().as_ptr(), ptr);
    }

    #[test]
    fn substring_shares_storage() {
        let value = ByteString::from("hello, world");

        let world = value.substring(7..12).unwrap();
        assert_eq!(world, ByteString::from("world"));
        assert_eq!(world.as_slice().as_ptr(), value.as_slice()[7..].as_ptr());

        let nested = world.substring(1..3).unwrap();
        assert_eq!(nested.as_slice(), b"or");

        assert!(value.substring(12..12).unwrap().is_empty());
        assert_eq!(value.substring(0..13).unwrap_err().kind(), ErrorKind::OutOfBounds);

        #[expect(clippy::reversed_empty_ranges, reason = "testing rejection of reversed ranges")]
        let reversed = 5..1;
        assert_eq!(value.substring(reversed).unwrap_err().kind(), ErrorKind::OutOfBounds);
    }

    #[test]
    fn searching() {
        let value = ByteString::from("abcabc");

        assert!(value.starts_with(b"abc"));
        assert!(value.ends_with(b"bc"));
        assert!(!value.starts_with(b"bc"));

        assert_eq!(value.index_of(b"bc", 0), Some(1));
        assert_eq!(value.index_of(b"bc", 2), Some(4));
        assert_eq!(value.index_of(b"bc", 5), None);
        assert_eq!(value.index_of(b"", 6), Some(6));
        assert_eq!(value.index_of(b"", 7), None);
        assert_eq!(value.last_index_of(b"abc"), Some(3));
        assert_eq!(value.last_index_of(b"x"), None);
        assert_eq!(value.last_index_of(b""), Some(6));
    }

    #[test]
    fn hex() {
        let value = ByteString::copy_from_slice(&[0xde, 0xad, 0x00, 0x42]);

        assert_eq!(value.to_hex_string(), "dead0042");
        assert_eq!(ByteString::from_hex_string("DEAD0042").unwrap(), value);
        assert_eq!(
            ByteString::from_hex_string("dead004").unwrap_err().kind(),
            ErrorKind::InvalidFormat
        );
        assert_eq!(
            ByteString::from_hex_string("deag").unwrap_err().kind(),
            ErrorKind::InvalidFormat
        );
    }

    #[test]
    fn base64() {
        let value = ByteString::from("any carnal pleas");

        assert_eq!(value.encode_base64(), "YW55IGNhcm5hbCBwbGVhcw==");
        assert_eq!(ByteString::decode_base64("YW55IGNhcm5hbCBwbGVhcw==").unwrap(), value);

        // Missing padding, bad characters.
        assert_eq!(
            ByteString::decode_base64("YW55IGNhcm5hbCBwbGVhcw").unwrap_err().kind(),
            ErrorKind::InvalidFormat
        );
        assert_eq!(
            ByteString::decode_base64("YW55*GNh").unwrap_err().kind(),
            ErrorKind::InvalidFormat
        );
    }

    #[test]
    fn base64_url() {
        let value = ByteString::copy_from_slice(&[0xfb, 0xff, 0xbf]);

        assert_eq!(value.encode_base64(), "+/+/");
        assert_eq!(value.encode_base64_url(), "-_-_");
        assert_eq!(ByteString::decode_base64_url("-_-_").unwrap(), value);
        assert_eq!(
            ByteString::decode_base64_url("+/+/").unwrap_err().kind(),
            ErrorKind::InvalidFormat
        );
    }

    #[test]
    fn display_truncates_long_values() {
        assert_eq!(ByteString::from("AB").to_string(), "ByteString(size=2 hex=4142)");
        assert_eq!(format!("{:?}", ByteString::new()), "ByteString(size=0 hex=)");

        let long = ByteString::from_vec(vec![0xff; 65]);
        let text = long.to_string();
        assert!(text.starts_with("ByteString(size=65 hex=ffff"));
        assert!(text.ends_with("ff…)"));
        assert_eq!(text.matches("ff").count(), 64);
    }
}
