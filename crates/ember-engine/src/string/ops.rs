// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Trimming, padding, repetition and case mapping.

use super::{JsString, MAX_LENGTH, StringKind, invalid_length, utf8};
use crate::{Error, Result};

/// Which ends `trim` strips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimMode {
    /// Leading white space only
    Start,
    /// Trailing white space only
    End,
    /// Both ends
    Both,
}

impl TrimMode {
    fn start(self) -> bool {
        matches!(self, Self::Start | Self::Both)
    }

    fn end(self) -> bool {
        matches!(self, Self::End | Self::Both)
    }
}

/// A borrowed `(start, size, length)` view of a string.
///
/// `length` is 0 for a byte string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringProp<'a> {
    bytes: &'a [u8],
    length: usize,
}

impl<'a> StringProp<'a> {
    pub(crate) fn new(bytes: &'a [u8], length: usize) -> Self {
        Self { bytes, length }
    }

    /// Bytes in view.
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Size of the view in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Character length, 0 for byte strings.
    pub fn length(&self) -> usize {
        self.length
    }

    /// True when each byte is one character.
    pub fn is_byte_or_ascii(&self) -> bool {
        self.length == 0 || self.length == self.bytes.len()
    }

    /// Strips white space, narrowing the view. Returns the number of
    /// characters removed.
    pub fn trim(&mut self, mode: TrimMode) -> usize {
        let bytes = self.bytes;
        let mut start = 0;
        let mut end = bytes.len();
        let mut trim = 0;

        if self.is_byte_or_ascii() {
            if mode.start() {
                while start < end && utf8::is_byte_whitespace(bytes[start]) {
                    start += 1;
                    trim += 1;
                }
            }

            if mode.end() {
                while end > start && utf8::is_byte_whitespace(bytes[end - 1]) {
                    end -= 1;
                    trim += 1;
                }
            }
        } else {
            if mode.start() {
                while start < end {
                    let mut pos = start;
                    match utf8::decode(bytes, &mut pos) {
                        Some(cp) if utf8::is_whitespace(cp) => {
                            start = pos;
                            trim += 1;
                        }
                        _ => break,
                    }
                }
            }

            if mode.end() {
                while end > start {
                    let prev = utf8::prev(bytes, end);
                    let mut pos = prev;
                    match utf8::decode(bytes, &mut pos) {
                        Some(cp) if utf8::is_whitespace(cp) => {
                            end = prev;
                            trim += 1;
                        }
                        _ => break,
                    }
                }
            }
        }

        self.bytes = &bytes[start..end];

        if start == end {
            self.length = 0;
        } else if self.length != 0 {
            self.length -= trim;
        }

        trim
    }
}

impl JsString {
    /// Strips white space from the ends selected by `mode`.
    pub fn trim_with(&self, mode: TrimMode) -> Result<JsString> {
        let mut prop = self.prop();

        if prop.trim(mode) == 0 {
            return Ok(self.clone());
        }

        if prop.size() == 0 {
            return Ok(JsString::empty());
        }

        JsString::new(prop.bytes(), prop.length())
    }

    /// `String.prototype.trim`.
    pub fn trim(&self) -> Result<JsString> {
        self.trim_with(TrimMode::Both)
    }

    /// `String.prototype.trimStart`.
    pub fn trim_start(&self) -> Result<JsString> {
        self.trim_with(TrimMode::Start)
    }

    /// `String.prototype.trimEnd`.
    pub fn trim_end(&self) -> Result<JsString> {
        self.trim_with(TrimMode::End)
    }

    /// `String.prototype.repeat`.
    pub fn repeat(&self, n: i64) -> Result<JsString> {
        if n < 0 || n == i64::MAX {
            return Err(Error::range("invalid count value"));
        }

        let size = self.size();

        if n == 0 || size == 0 {
            return Ok(JsString::empty());
        }

        let n = n as usize;

        if n >= MAX_LENGTH / size {
            return Err(invalid_length());
        }

        let mut out = Vec::new();
        out.try_reserve_exact(size * n)?;
        for _ in 0..n {
            out.extend_from_slice(self.as_bytes());
        }

        let length = self.cached_length().map_or(0, |length| length * n);
        JsString::from_vec(out, length)
    }

    /// `String.prototype.padStart`.
    pub fn pad_start(&self, target: i64, pad: Option<&JsString>) -> Result<JsString> {
        self.pad(target, pad, true)
    }

    /// `String.prototype.padEnd`.
    pub fn pad_end(&self, target: i64, pad: Option<&JsString>) -> Result<JsString> {
        self.pad(target, pad, false)
    }

    fn pad(&self, target: i64, pad: Option<&JsString>, at_start: bool) -> Result<JsString> {
        let length = self.length();

        if target <= length as i64 {
            return Ok(self.clone());
        }

        if target >= MAX_LENGTH as i64 {
            return Err(invalid_length());
        }

        let target = target as usize;
        let space;
        let pad = match pad {
            Some(pad) => pad,
            None => {
                space = JsString::text(" ")?;
                &space
            }
        };

        if pad.is_empty() {
            return Ok(self.clone());
        }

        let pad_length = pad.length();
        let padding = target - length;
        let whole = padding / pad_length;
        let trunc = pad.offset(padding % pad_length);
        let fill_size = pad.size() * whole + trunc;

        let mut out = Vec::new();
        out.try_reserve_exact(self.size() + fill_size)?;

        if !at_start {
            out.extend_from_slice(self.as_bytes());
        }

        for _ in 0..whole {
            out.extend_from_slice(pad.as_bytes());
        }
        out.extend_from_slice(&pad.as_bytes()[..trunc]);

        if at_start {
            out.extend_from_slice(self.as_bytes());
        }

        let new_length = if self.kind() == StringKind::Byte || pad.kind() == StringKind::Byte {
            0
        } else {
            target
        };

        JsString::from_vec(out, new_length)
    }

    /// `String.prototype.toLowerCase`.
    pub fn to_lower_case(&self) -> Result<JsString> {
        self.map_case(u8::to_ascii_lowercase, lower_case)
    }

    /// `String.prototype.toUpperCase`.
    pub fn to_upper_case(&self) -> Result<JsString> {
        self.map_case(u8::to_ascii_uppercase, upper_case)
    }

    fn map_case(&self, byte: fn(&u8) -> u8, code_point: fn(u32) -> u32) -> Result<JsString> {
        let bytes = self.as_bytes();
        let mut out = Vec::new();
        out.try_reserve(bytes.len())?;

        if self.kind() != StringKind::Utf8 {
            out.extend(bytes.iter().map(byte));
            return JsString::from_vec(out, self.cached_length().unwrap_or(0));
        }

        let mut pos = 0;
        let mut length = 0;

        while pos < bytes.len() {
            let start = pos;
            match utf8::decode(bytes, &mut pos) {
                Some(cp) => utf8::push(&mut out, code_point(cp)),
                None => out.extend_from_slice(&bytes[start..pos]),
            }
            length += 1;
        }

        JsString::from_vec(out, length)
    }
}

/// Applies a mapping only when it yields exactly one character.
fn single(cp: u32, map: impl Fn(char) -> Option<char>) -> u32 {
    char::from_u32(cp).and_then(map).map_or(cp, u32::from)
}

fn lower_case(cp: u32) -> u32 {
    single(cp, |c| {
        let mut it = c.to_lowercase();
        match (it.next(), it.next()) {
            (Some(l), None) => Some(l),
            _ => None,
        }
    })
}

fn upper_case(cp: u32) -> u32 {
    single(cp, |c| {
        let mut it = c.to_uppercase();
        match (it.next(), it.next()) {
            (Some(u), None) => Some(u),
            _ => None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn js(s: &str) -> JsString {
        JsString::text(s).unwrap()
    }

    #[test]
    fn test_trim_ascii() {
        let s = js("  \t hello \n");
        assert_eq!(s.trim().unwrap().to_string(), "hello");
        assert_eq!(s.trim_start().unwrap().to_string(), "hello \n");
        assert_eq!(s.trim_end().unwrap().to_string(), "  \t hello");
    }

    #[test]
    fn test_trim_unicode_whitespace() {
        let s = js("\u{3000}\u{A0}héllo\u{2028}\u{FEFF}");
        let trimmed = s.trim().unwrap();
        assert_eq!(trimmed.to_string(), "héllo");
        assert_eq!(trimmed.length(), 5);
    }

    #[test]
    fn test_trim_prop_count() {
        let s = js("\u{2003} ab ");
        let mut prop = s.prop();
        assert_eq!(prop.trim(TrimMode::Both), 3);
        assert_eq!(prop.bytes(), b"ab");
        assert_eq!(prop.length(), 2);
    }

    #[test]
    fn test_trim_all_whitespace() {
        let s = js(" \u{A0} ");
        let mut prop = s.prop();
        assert_eq!(prop.trim(TrimMode::Both), 3);
        assert_eq!(prop.size(), 0);
        assert_eq!(prop.length(), 0);
        assert!(s.trim().unwrap().is_empty());
    }

    #[test]
    fn test_trim_nothing_returns_same() {
        let s = js("abc");
        assert_eq!(s.trim().unwrap(), s);
    }

    #[test]
    fn test_trim_byte_string_ignores_nbsp() {
        let s = JsString::bytes(&[0xA0, b'a', b' ']).unwrap();
        assert_eq!(s.trim().unwrap().as_bytes(), &[0xA0, b'a']);
    }

    #[test]
    fn test_repeat() {
        assert_eq!(js("ab").repeat(3).unwrap().to_string(), "ababab");
        assert_eq!(js("é").repeat(4).unwrap().length(), 4);
        assert!(js("ab").repeat(0).unwrap().is_empty());
        assert!(JsString::empty().repeat(10).unwrap().is_empty());
    }

    #[test]
    fn test_repeat_errors() {
        assert!(matches!(js("a").repeat(-1), Err(Error::Range(_))));
        assert!(matches!(js("a").repeat(i64::MAX), Err(Error::Range(_))));
        assert!(matches!(js("ab").repeat(1 << 30), Err(Error::Range(_))));
    }

    #[test]
    fn test_pad() {
        assert_eq!(js("5").pad_start(3, Some(&js("0"))).unwrap().to_string(), "005");
        assert_eq!(js("abc").pad_end(10, Some(&js("123"))).unwrap().to_string(), "abc1231231");
        assert_eq!(js("x").pad_start(3, None).unwrap().to_string(), "  x");
        assert_eq!(js("abc").pad_start(2, None).unwrap().to_string(), "abc");
        assert_eq!(js("abc").pad_start(6, Some(&JsString::empty())).unwrap().to_string(), "abc");
    }

    #[test]
    fn test_pad_truncates_by_character() {
        let padded = js("x").pad_start(5, Some(&js("éü"))).unwrap();
        assert_eq!(padded.to_string(), "éüéüx");
        let odd = js("x").pad_end(4, Some(&js("éü"))).unwrap();
        assert_eq!(odd.to_string(), "xéüé");
        assert_eq!(odd.length(), 4);
    }

    #[test]
    fn test_pad_range_error() {
        assert!(matches!(
            js("a").pad_start(MAX_LENGTH as i64, None),
            Err(Error::Range(_))
        ));
    }

    #[test]
    fn test_case_ascii() {
        assert_eq!(js("Hello World").to_upper_case().unwrap().to_string(), "HELLO WORLD");
        assert_eq!(js("Hello World").to_lower_case().unwrap().to_string(), "hello world");
    }

    #[test]
    fn test_case_unicode_simple() {
        assert_eq!(js("ÀÉÎ").to_lower_case().unwrap().to_string(), "àéî");
        assert_eq!(js("straße").to_upper_case().unwrap().to_string(), "STRAßE");
        assert_eq!(js("İ").to_lower_case().unwrap().to_string(), "İ");
        assert_eq!(js("σ").to_upper_case().unwrap().to_string(), "Σ");
    }
}
