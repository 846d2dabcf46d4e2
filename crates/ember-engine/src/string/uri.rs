// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! `encodeURI`, `encodeURIComponent` and their decoders.

use super::{JsString, StringKind, utf8};
use crate::{Error, Result};

/// Bytes escaped by `encodeURI`, one bit per byte value.
static ESCAPE_URI: [u32; 8] = [
    0xffff_ffff,
    // ?>=< ;:98 7654 3210  /.-, +*)( '&%$ #"!
    0x5000_0025,
    // _^]\ [ZYX WVUT SRQP  ONML KJIH GFED CBA@
    0x7800_0000,
    //  ~}| {zyx wvut srqp  onml kjih gfed cba`
    0xb800_0001,
    0xffff_ffff,
    0xffff_ffff,
    0xffff_ffff,
    0xffff_ffff,
];

/// Bytes escaped by `encodeURIComponent`.
static ESCAPE_URI_COMPONENT: [u32; 8] = [
    0xffff_ffff,
    0xfc00_987d,
    0x7800_0001,
    0xb800_0001,
    0xffff_ffff,
    0xffff_ffff,
    0xffff_ffff,
    0xffff_ffff,
];

/// Characters `decodeURI` leaves escaped: `#$&+,/:;=?@`.
static RESERVE_URI: [u32; 8] = [
    0x0000_0000,
    0xac00_9858,
    0x0000_0001,
    0x0000_0000,
    0x0000_0000,
    0x0000_0000,
    0x0000_0000,
    0x0000_0000,
];

static RESERVE_URI_COMPONENT: [u32; 8] = [0; 8];

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

#[inline]
fn in_set(set: &[u32; 8], byte: u32) -> bool {
    set[(byte >> 5) as usize] & (1 << (byte & 0x1f)) != 0
}

fn malformed() -> Error {
    Error::uri("malformed URI")
}

fn push_encoded(out: &mut Vec<u8>, escape: &[u32; 8], bytes: &[u8]) {
    for &byte in bytes {
        if in_set(escape, u32::from(byte)) {
            out.push(b'%');
            out.push(HEX_UPPER[usize::from(byte >> 4)]);
            out.push(HEX_UPPER[usize::from(byte & 0x0F)]);
        } else {
            out.push(byte);
        }
    }
}

fn encode(s: &JsString, escape: &[u32; 8]) -> Result<JsString> {
    let bytes = s.as_bytes();

    if bytes.is_empty() {
        return Ok(s.clone());
    }

    let mut out = Vec::new();
    out.try_reserve(bytes.len())?;

    if s.kind() != StringKind::Utf8 {
        push_encoded(&mut out, escape, bytes);
    } else {
        let mut pos = 0;

        while pos < bytes.len() {
            let mut cp = utf8::decode(bytes, &mut pos).ok_or_else(malformed)?;

            if cp < 0x80 && !in_set(escape, cp) {
                out.push(cp as u8);
                continue;
            }

            if utf8::is_surrogate(cp) {
                if pos == bytes.len() || !utf8::is_leading_surrogate(cp) {
                    return Err(malformed());
                }

                let low = utf8::decode(bytes, &mut pos).ok_or_else(malformed)?;

                if !utf8::is_trailing_surrogate(low) {
                    return Err(malformed());
                }

                cp = utf8::surrogate_pair(cp, low);
            }

            let mut buf = [0u8; 4];
            let n = utf8::encode(cp, &mut buf);
            push_encoded(&mut out, escape, &buf[..n]);
        }
    }

    let length = out.len();
    JsString::from_vec(out, length)
}

/// `encodeURI`.
pub fn encode_uri(s: &JsString) -> Result<JsString> {
    encode(s, &ESCAPE_URI)
}

/// `encodeURIComponent`.
pub fn encode_uri_component(s: &JsString) -> Result<JsString> {
    encode(s, &ESCAPE_URI_COMPONENT)
}

fn hex_digit(byte: u8) -> Option<u32> {
    char::from(byte).to_digit(16)
}

/// Reads one character, or one `%XX` escape as its byte value.
fn decode_cp(bytes: &[u8], pos: &mut usize, expect_percent: bool) -> Option<(u32, bool)> {
    let cp = utf8::decode_strict(bytes, pos)?;

    if cp != u32::from(b'%') {
        return (!expect_percent).then_some((cp, false));
    }

    let p = *pos;

    if p + 1 >= bytes.len() {
        return None;
    }

    let d0 = hex_digit(bytes[p])?;
    let d1 = hex_digit(bytes[p + 1])?;
    *pos += 2;

    Some(((d0 << 4) | d1, true))
}

fn decode(s: &JsString, reserve: &[u32; 8]) -> Result<JsString> {
    let bytes = s.as_bytes();
    let mut out = Vec::new();
    out.try_reserve(bytes.len())?;

    let mut length = 0;
    let mut pos = 0;

    while pos < bytes.len() {
        let (cp, percent) = decode_cp(bytes, &mut pos, false).ok_or_else(malformed)?;

        if !percent {
            utf8::push(&mut out, cp);
            length += 1;
            continue;
        }

        if cp < 0x80 {
            if in_set(reserve, cp) {
                out.extend_from_slice(&bytes[pos - 3..pos]);
                length += 3;
            } else {
                out.push(cp as u8);
                length += 1;
            }
            continue;
        }

        // Leading one bits give the sequence length.
        let mut n = 1;
        loop {
            n += 1;
            if (cp << n) & 0x80 == 0 || n > 4 {
                break;
            }
        }

        if n > 4 {
            return Err(malformed());
        }

        let mut encoded = [0u8; 4];
        encoded[0] = cp as u8;

        for slot in encoded.iter_mut().take(n).skip(1) {
            let (byte, _) = decode_cp(bytes, &mut pos, true).ok_or_else(malformed)?;
            *slot = byte as u8;
        }

        let mut p = 0;
        let cp = utf8::decode_strict(&encoded[..n], &mut p).ok_or_else(malformed)?;

        utf8::push(&mut out, cp);
        length += 1;
    }

    if out.is_empty() {
        return Ok(s.clone());
    }

    JsString::from_vec(out, length)
}

/// `decodeURI`.
pub fn decode_uri(s: &JsString) -> Result<JsString> {
    decode(s, &RESERVE_URI)
}

/// `decodeURIComponent`.
pub fn decode_uri_component(s: &JsString) -> Result<JsString> {
    decode(s, &RESERVE_URI_COMPONENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn js(s: &str) -> JsString {
        JsString::text(s).unwrap()
    }

    #[test]
    fn test_encode_uri_preserves_reserved() {
        let s = encode_uri(&js("http://x.org/a b?q=1&r=ü#f")).unwrap();
        assert_eq!(s.to_string(), "http://x.org/a%20b?q=1&r=%C3%BC#f");
    }

    #[test]
    fn test_encode_uri_component_escapes_reserved() {
        let s = encode_uri_component(&js("a/b?c=d&e")).unwrap();
        assert_eq!(s.to_string(), "a%2Fb%3Fc%3Dd%26e");
        assert_eq!(encode_uri_component(&js("-_.!~*'()")).unwrap().to_string(), "-_.!~*'()");
    }

    #[test]
    fn test_encode_surrogate_pair() {
        let s = JsString::from_utf16(&[0xD83D, 0xDE00]).unwrap();
        assert_eq!(encode_uri_component(&s).unwrap().to_string(), "%F0%9F%98%80");
    }

    #[test]
    fn test_encode_lone_surrogate() {
        let lone = JsString::from_utf16(&[0x61, 0xD800]).unwrap();
        assert_eq!(encode_uri(&lone).unwrap_err(), Error::uri("malformed URI"));

        let trailing = JsString::from_utf16(&[0xDC00, 0x61]).unwrap();
        assert!(encode_uri(&trailing).is_err());
    }

    #[test]
    fn test_encode_byte_string() {
        let s = JsString::bytes(&[0x61, 0xFF, 0x20]).unwrap();
        assert_eq!(encode_uri(&s).unwrap().to_string(), "a%FF%20");
    }

    #[test]
    fn test_decode_euro() {
        let s = decode_uri(&js("%E2%82%AC")).unwrap();
        assert_eq!(s.to_string(), "€");
        assert_eq!(s.length(), 1);
        assert_eq!(encode_uri_component(&s).unwrap().to_string(), "%E2%82%AC");
    }

    #[test]
    fn test_decode_uri_keeps_reserved() {
        assert_eq!(decode_uri(&js("a%2fb%20c")).unwrap().to_string(), "a%2fb c");
        assert_eq!(decode_uri_component(&js("a%2fb%20c")).unwrap().to_string(), "a/b c");
    }

    #[test]
    fn test_decode_errors() {
        let err = Error::uri("malformed URI");
        assert_eq!(decode_uri(&js("%")).unwrap_err(), err);
        assert_eq!(decode_uri(&js("%E2%82")).unwrap_err(), err);
        assert_eq!(decode_uri(&js("%E2%82x")).unwrap_err(), err);
        assert_eq!(decode_uri(&js("%ED%A0%80")).unwrap_err(), err);
        assert_eq!(decode_uri(&js("%FF")).unwrap_err(), err);
        assert_eq!(decode_uri(&js("%G0")).unwrap_err(), err);
    }

    #[test]
    fn test_empty_returns_input() {
        let empty = JsString::empty();
        assert_eq!(encode_uri(&empty).unwrap(), empty);
        assert_eq!(decode_uri(&empty).unwrap(), empty);
    }
}
