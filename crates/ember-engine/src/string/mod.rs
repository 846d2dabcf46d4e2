// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! String values.
//!
//! A [`JsString`] is either stored inline (up to [`SHORT_MAX`] bytes) or in a
//! shared heap allocation. Independently of storage, a string is one of:
//!
//! - a *byte string*: raw bytes with no character length (unset length)
//! - an *ASCII string*: length equals size
//! - a *UTF-8 string*: length counts code points
//!
//! The character length of a byte string is computed on demand by
//! [`JsString::validate`] and cached. Long UTF-8 strings build a sparse
//! offset map, one entry per [`MAP_STRIDE`] characters, the first time a
//! character position is looked up.

pub mod codec;
mod ops;
pub mod uri;
pub mod utf8;

pub use codec::{atob, btoa};
pub use ops::{StringProp, TrimMode};
pub use uri::{decode_uri, decode_uri_component, encode_uri, encode_uri_component};

use crate::{Error, Result};
use std::cell::OnceCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Largest size stored inline.
pub const SHORT_MAX: usize = 14;

/// Largest string size in bytes.
pub const MAX_LENGTH: usize = 0x7fff_ffff;

/// Characters between two offset map entries.
pub const MAP_STRIDE: usize = 32;

/// Character model of a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringKind {
    /// Raw bytes, no character length
    Byte,
    /// Every byte is one character
    Ascii,
    /// UTF-8 code points
    Utf8,
}

/// Character length of `bytes` under `kind`.
///
/// Byte strings report 0, matching the stored representation.
pub fn calc_length(kind: StringKind, bytes: &[u8]) -> Result<usize> {
    match kind {
        StringKind::Byte => Ok(0),
        StringKind::Ascii => Ok(bytes.len()),
        StringKind::Utf8 => utf8::length(bytes).ok_or_else(invalid_utf8),
    }
}

fn invalid_utf8() -> Error {
    Error::Decode("invalid UTF-8 string".to_string())
}

pub(crate) fn invalid_length() -> Error {
    Error::range("invalid string length")
}

/// Inline string storage.
#[derive(Debug, Clone)]
pub struct ShortString {
    bytes: [u8; SHORT_MAX],
    size: u8,
    length: OnceCell<usize>,
}

/// Heap string storage.
#[derive(Debug)]
pub struct LongString {
    bytes: Box<[u8]>,
    length: OnceCell<usize>,
    map: OnceCell<Box<[u32]>>,
}

/// An immutable string value.
#[derive(Clone)]
pub enum JsString {
    /// Inline storage
    Short(ShortString),
    /// Shared heap storage
    Long(Rc<LongString>),
}

impl JsString {
    /// The empty string.
    pub fn empty() -> Self {
        Self::Short(ShortString {
            bytes: [0; SHORT_MAX],
            size: 0,
            length: OnceCell::from(0),
        })
    }

    /// Creates a string from raw parts.
    ///
    /// A zero `length` with non-empty `bytes` makes a byte string.
    pub fn new(bytes: &[u8], length: usize) -> Result<Self> {
        if bytes.len() > MAX_LENGTH {
            return Err(invalid_length());
        }

        if bytes.len() <= SHORT_MAX {
            return Ok(Self::short(bytes, length));
        }

        let mut owned = Vec::new();
        owned.try_reserve_exact(bytes.len())?;
        owned.extend_from_slice(bytes);

        Self::from_vec(owned, length)
    }

    /// Creates a UTF-8 string from Rust text.
    pub fn text(s: &str) -> Result<Self> {
        Self::new(s.as_bytes(), s.chars().count())
    }

    /// Creates a byte string. Its length is unknown until validated.
    pub fn bytes(bytes: &[u8]) -> Result<Self> {
        Self::new(bytes, 0)
    }

    /// Creates a string from UTF-16 code units.
    ///
    /// Surrogate pairs are combined; lone surrogates are kept as 3-byte
    /// sequences.
    pub fn from_utf16(units: &[u16]) -> Result<Self> {
        let mut out = Vec::new();
        out.try_reserve(units.len())?;

        let mut length = 0;
        let mut i = 0;

        while i < units.len() {
            let mut cp = u32::from(units[i]);
            i += 1;

            if utf8::is_leading_surrogate(cp) {
                if let Some(&unit) = units.get(i) {
                    if utf8::is_trailing_surrogate(u32::from(unit)) {
                        cp = utf8::surrogate_pair(cp, u32::from(unit));
                        i += 1;
                    }
                }
            }

            utf8::push(&mut out, cp);
            length += 1;
        }

        Self::from_vec(out, length)
    }

    /// Takes ownership of an already built buffer.
    pub(crate) fn from_vec(bytes: Vec<u8>, length: usize) -> Result<Self> {
        if bytes.len() > MAX_LENGTH {
            return Err(invalid_length());
        }

        if bytes.len() <= SHORT_MAX {
            return Ok(Self::short(&bytes, length));
        }

        let cell = OnceCell::new();
        if length != 0 {
            let _ = cell.set(length);
        }

        Ok(Self::Long(Rc::new(LongString {
            bytes: bytes.into_boxed_slice(),
            length: cell,
            map: OnceCell::new(),
        })))
    }

    fn short(bytes: &[u8], length: usize) -> Self {
        let mut buf = [0; SHORT_MAX];
        buf[..bytes.len()].copy_from_slice(bytes);

        let cell = OnceCell::new();
        if length != 0 || bytes.is_empty() {
            let _ = cell.set(length);
        }

        Self::Short(ShortString {
            bytes: buf,
            size: bytes.len() as u8,
            length: cell,
        })
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Short(s) => &s.bytes[..usize::from(s.size)],
            Self::Long(l) => &l.bytes,
        }
    }

    /// Size in bytes.
    pub fn size(&self) -> usize {
        self.as_bytes().len()
    }

    fn length_cell(&self) -> &OnceCell<usize> {
        match self {
            Self::Short(s) => &s.length,
            Self::Long(l) => &l.length,
        }
    }

    /// Character length if known; `None` for a byte string.
    pub fn cached_length(&self) -> Option<usize> {
        self.length_cell().get().copied()
    }

    /// Number of characters, counting each byte of a byte string.
    pub fn length(&self) -> usize {
        self.cached_length().unwrap_or_else(|| self.size())
    }

    /// Returns true if the string has no bytes.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Character model of this string.
    pub fn kind(&self) -> StringKind {
        match self.cached_length() {
            None => StringKind::Byte,
            Some(n) if n == self.size() => StringKind::Ascii,
            Some(_) => StringKind::Utf8,
        }
    }

    /// Returns true when the string is stored inline.
    pub fn is_short(&self) -> bool {
        matches!(self, Self::Short(_))
    }

    /// Computes and caches the character length of a byte string.
    ///
    /// Fails if the bytes are not valid UTF-8.
    pub fn validate(&self) -> Result<usize> {
        let cell = self.length_cell();

        if let Some(length) = cell.get() {
            return Ok(*length);
        }

        let length = utf8::length(self.as_bytes()).ok_or_else(invalid_utf8)?;
        let _ = cell.set(length);

        Ok(length)
    }

    /// A view over the string used by trimming.
    pub fn prop(&self) -> StringProp<'_> {
        StringProp::new(self.as_bytes(), self.cached_length().unwrap_or(0))
    }

    fn offset_map(&self) -> Option<&[u32]> {
        let Self::Long(long) = self else {
            return None;
        };

        let length = *long.length.get()?;

        if length <= MAP_STRIDE || length == long.bytes.len() {
            return None;
        }

        Some(long.map.get_or_init(|| build_offset_map(&long.bytes, length)))
    }

    /// Forces the offset map of a long UTF-8 string.
    ///
    /// Returns false when the string does not use one.
    pub fn build_offset_map(&self) -> bool {
        self.offset_map().is_some()
    }

    /// Byte offset of the character at `index`.
    pub fn offset(&self, index: usize) -> usize {
        let bytes = self.as_bytes();

        if self.kind() != StringKind::Utf8 {
            return index.min(bytes.len());
        }

        let (mut pos, skip) = match self.offset_map() {
            Some(map) => {
                let k = (index / MAP_STRIDE).min(map.len());
                let start = if k == 0 { 0 } else { map[k - 1] as usize };
                (start, index - k * MAP_STRIDE)
            }
            None => (0, index),
        };

        for _ in 0..skip {
            if pos >= bytes.len() {
                break;
            }
            pos = utf8::next(bytes, pos);
        }

        pos
    }

    /// Character index of the byte offset `offset`.
    pub fn index(&self, offset: usize) -> usize {
        if self.kind() != StringKind::Utf8 {
            return offset;
        }

        let bytes = self.as_bytes();
        let mut index = 0;
        let mut pos = 0;

        if let Some(map) = self.offset_map() {
            for &entry in map {
                if entry as usize > offset {
                    break;
                }
                index += MAP_STRIDE;
                pos = entry as usize;
            }
        }

        while pos < offset && pos < bytes.len() {
            pos = utf8::next(bytes, pos);
            index += 1;
        }

        index
    }

    /// Characters in `start..end`, clamped to the string.
    pub fn substring(&self, start: usize, end: usize) -> Result<Self> {
        let length = self.length();
        let end = end.min(length);
        let start = start.min(end);

        if start == 0 && end == length {
            return Ok(self.clone());
        }

        let from = self.offset(start);
        let to = self.offset(end);
        let slice = &self.as_bytes()[from..to];

        match self.kind() {
            StringKind::Byte => Self::new(slice, 0),
            _ => Self::new(slice, end - start),
        }
    }

    /// UTF-16 code units. Byte strings map each byte to one unit.
    pub fn to_utf16(&self) -> Vec<u16> {
        let bytes = self.as_bytes();

        if self.kind() == StringKind::Byte {
            return bytes.iter().map(|&b| u16::from(b)).collect();
        }

        let mut out = Vec::with_capacity(bytes.len());
        let mut pos = 0;

        while pos < bytes.len() {
            let cp = utf8::decode(bytes, &mut pos).unwrap_or(0xFFFD);

            if cp > 0xFFFF {
                let v = cp - 0x10000;
                out.push(0xD800 | (v >> 10) as u16);
                out.push(0xDC00 | (v & 0x3FF) as u16);
            } else {
                out.push(cp as u16);
            }
        }

        out
    }
}

fn build_offset_map(bytes: &[u8], length: usize) -> Box<[u32]> {
    let entries = (length - 1) / MAP_STRIDE;
    let mut map = Vec::with_capacity(entries);
    let mut pos = 0;
    let mut count = 0;

    while map.len() < entries && pos < bytes.len() {
        pos = utf8::next(bytes, pos);
        count += 1;

        if count % MAP_STRIDE == 0 {
            map.push(pos as u32);
        }
    }

    map.into_boxed_slice()
}

impl Default for JsString {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for JsString {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for JsString {}

impl Hash for JsString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_bytes().hash(state);
    }
}

impl fmt::Debug for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JsString({:?})", String::from_utf8_lossy(self.as_bytes()))
    }
}

impl fmt::Display for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_and_long_storage() {
        let short = JsString::text("hello").unwrap();
        assert!(short.is_short());
        assert_eq!(short.kind(), StringKind::Ascii);

        let long = JsString::text("a string longer than fourteen bytes").unwrap();
        assert!(!long.is_short());
        assert_eq!(long.length(), 35);
    }

    #[test]
    fn test_empty_string() {
        let empty = JsString::empty();
        assert_eq!(empty.size(), 0);
        assert_eq!(empty.cached_length(), Some(0));
        assert_eq!(JsString::bytes(b"").unwrap().kind(), StringKind::Ascii);
    }

    #[test]
    fn test_byte_string_validate() {
        let s = JsString::bytes("héllo".as_bytes()).unwrap();
        assert_eq!(s.kind(), StringKind::Byte);
        assert_eq!(s.validate().unwrap(), 5);
        assert_eq!(s.kind(), StringKind::Utf8);
        assert_eq!(s.cached_length(), Some(5));
    }

    #[test]
    fn test_validate_rejects_invalid() {
        let s = JsString::bytes(&[0x61, 0xFF, 0x62]).unwrap();
        assert!(matches!(s.validate(), Err(Error::Decode(_))));
        assert_eq!(s.kind(), StringKind::Byte);
    }

    #[test]
    fn test_validate_shared_clone() {
        let s = JsString::bytes("ünïcödé text that is long".as_bytes()).unwrap();
        let copy = s.clone();
        s.validate().unwrap();
        assert_eq!(copy.kind(), StringKind::Utf8);
    }

    #[test]
    fn test_calc_length() {
        assert_eq!(calc_length(StringKind::Byte, b"abc").unwrap(), 0);
        assert_eq!(calc_length(StringKind::Ascii, b"abc").unwrap(), 3);
        assert_eq!(calc_length(StringKind::Utf8, "€€".as_bytes()).unwrap(), 2);
        assert!(calc_length(StringKind::Utf8, &[0xC0]).is_err());
    }

    #[test]
    fn test_offset_ascii() {
        let s = JsString::text("abcdef").unwrap();
        assert_eq!(s.offset(3), 3);
        assert_eq!(s.index(3), 3);
    }

    #[test]
    fn test_offset_with_map() {
        let text: String = "é".repeat(100);
        let s = JsString::text(&text).unwrap();

        for i in 0..=100 {
            assert_eq!(s.offset(i), i * 2);
            assert_eq!(s.index(i * 2), i);
        }
    }

    #[test]
    fn test_offset_map_size() {
        let s = JsString::text(&"é".repeat(65)).unwrap();
        assert!(s.build_offset_map());
        let Some(map) = s.offset_map() else {
            panic!("expected map");
        };
        assert_eq!(map, &[64, 128]);

        assert!(!JsString::text(&"a".repeat(100)).unwrap().build_offset_map());
        assert!(!JsString::text(&"é".repeat(32)).unwrap().build_offset_map());
    }

    #[test]
    fn test_substring() {
        let s = JsString::text("añb€c").unwrap();
        assert_eq!(s.substring(1, 4).unwrap().to_string(), "ñb€");
        assert_eq!(s.substring(3, 100).unwrap().to_string(), "€c");
        assert_eq!(s.substring(4, 2).unwrap().to_string(), "");
        assert_eq!(s.substring(1, 4).unwrap().length(), 3);
    }

    #[test]
    fn test_from_utf16() {
        let s = JsString::from_utf16(&[0x0061, 0xD83D, 0xDE00, 0x0062]).unwrap();
        assert_eq!(s.to_string(), "a😀b");
        assert_eq!(s.length(), 3);
        assert_eq!(s.to_utf16(), vec![0x0061, 0xD83D, 0xDE00, 0x0062]);
    }

    #[test]
    fn test_from_utf16_lone_surrogate() {
        let s = JsString::from_utf16(&[0xD800, 0x0041]).unwrap();
        assert_eq!(s.as_bytes(), &[0xED, 0xA0, 0x80, 0x41]);
        assert_eq!(s.to_utf16(), vec![0xD800, 0x0041]);
    }

    #[test]
    fn test_equality_ignores_storage() {
        let a = JsString::text("abc").unwrap();
        let b = JsString::bytes(b"abc").unwrap();
        assert_eq!(a, b);
    }
}
