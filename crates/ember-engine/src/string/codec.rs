// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Hex and base64 encoders.
//!
//! Decoders are permissive: they stop at the first byte outside the
//! alphabet and decode what came before it.

use super::{JsString, StringKind, utf8};
use crate::{Error, Result};

const BASIS64_ENC: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
const BASIS64URL_ENC: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

const HEX_LOWER: &[u8; 16] = b"0123456789abcdef";

/// Marks a byte outside a decode alphabet.
const INVALID: u8 = 77;

const fn decode_table(enc: &[u8; 64]) -> [u8; 256] {
    let mut table = [INVALID; 256];
    let mut i = 0;

    while i < 64 {
        table[enc[i] as usize] = i as u8;
        i += 1;
    }

    table
}

static BASIS64: [u8; 256] = decode_table(BASIS64_ENC);
static BASIS64URL: [u8; 256] = decode_table(BASIS64URL_ENC);

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

// ============================================================================
// Hex
// ============================================================================

/// Lowercase hex encoding of `src`.
pub fn encode_hex(src: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(src.len() * 2);

    for &b in src {
        out.push(HEX_LOWER[usize::from(b >> 4)]);
        out.push(HEX_LOWER[usize::from(b & 0x0F)]);
    }

    out
}

/// Decodes hex digits up to the first invalid one. An odd final digit is
/// dropped.
pub fn decode_hex(src: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(src.len() / 2);
    let mut high: Option<u8> = None;

    for &c in src {
        let Some(nibble) = hex_value(c) else {
            break;
        };

        match high.take() {
            Some(h) => out.push((h << 4) | nibble),
            None => high = Some(nibble),
        }
    }

    out
}

// ============================================================================
// Base64
// ============================================================================

/// Size of the padded base64 encoding of `len` bytes.
pub fn encoded_base64_len(len: usize) -> usize {
    len.div_ceil(3) * 4
}

/// Size of the unpadded base64url encoding of `len` bytes.
pub fn encoded_base64url_len(len: usize) -> usize {
    encoded_base64_len(len) - ((4 >> (len % 3)) & 3)
}

fn encode_base64_core(src: &[u8], basis: &[u8; 64], padding: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(encoded_base64_len(src.len()));
    let mut chunks = src.chunks_exact(3);

    for chunk in &mut chunks {
        let (c0, c1, c2) = (chunk[0], chunk[1], chunk[2]);

        out.push(basis[usize::from(c0 >> 2)]);
        out.push(basis[usize::from(((c0 & 0x03) << 4) | (c1 >> 4))]);
        out.push(basis[usize::from(((c1 & 0x0F) << 2) | (c2 >> 6))]);
        out.push(basis[usize::from(c2 & 0x3F)]);
    }

    match *chunks.remainder() {
        [c0] => {
            out.push(basis[usize::from(c0 >> 2)]);
            out.push(basis[usize::from((c0 & 0x03) << 4)]);
            if padding {
                out.extend_from_slice(b"==");
            }
        }
        [c0, c1] => {
            out.push(basis[usize::from(c0 >> 2)]);
            out.push(basis[usize::from(((c0 & 0x03) << 4) | (c1 >> 4))]);
            out.push(basis[usize::from((c1 & 0x0F) << 2)]);
            if padding {
                out.push(b'=');
            }
        }
        _ => {}
    }

    out
}

/// Standard base64 with `=` padding.
pub fn encode_base64(src: &[u8]) -> Vec<u8> {
    encode_base64_core(src, BASIS64_ENC, true)
}

/// URL-safe base64 without padding.
pub fn encode_base64url(src: &[u8]) -> Vec<u8> {
    encode_base64_core(src, BASIS64URL_ENC, false)
}

fn decoded_len_core(src: &[u8], basis: &[u8; 256]) -> usize {
    let mut len = src
        .iter()
        .position(|&c| basis[usize::from(c)] == INVALID)
        .unwrap_or(src.len());

    let mut pad = 0;

    if len % 4 != 0 {
        pad = 4 - len % 4;
        len += pad;
    }

    (len / 4) * 3 - pad
}

/// Number of bytes [`decode_base64`] produces for `src`.
pub fn decoded_base64_len(src: &[u8]) -> usize {
    decoded_len_core(src, &BASIS64)
}

/// Number of bytes [`decode_base64url`] produces for `src`.
pub fn decoded_base64url_len(src: &[u8]) -> usize {
    decoded_len_core(src, &BASIS64URL)
}

fn decode_base64_core(src: &[u8], basis: &[u8; 256], size: usize) -> Vec<u8> {
    let b = |i: usize| basis[usize::from(src[i])];
    let mut out = Vec::with_capacity(size);
    let mut len = size;
    let mut s = 0;

    while len >= 3 {
        out.push((b(s) << 2) | (b(s + 1) >> 4));
        out.push((b(s + 1) << 4) | (b(s + 2) >> 2));
        out.push((b(s + 2) << 6) | b(s + 3));
        s += 4;
        len -= 3;
    }

    if len >= 1 {
        out.push((b(s) << 2) | (b(s + 1) >> 4));
    }

    if len >= 2 {
        out.push((b(s + 1) << 4) | (b(s + 2) >> 2));
    }

    out
}

/// Decodes standard base64 up to the first byte outside the alphabet.
pub fn decode_base64(src: &[u8]) -> Vec<u8> {
    decode_base64_core(src, &BASIS64, decoded_base64_len(src))
}

/// Decodes URL-safe base64 up to the first byte outside the alphabet.
pub fn decode_base64url(src: &[u8]) -> Vec<u8> {
    decode_base64_core(src, &BASIS64URL, decoded_base64url_len(src))
}

// ============================================================================
// String wrappers
// ============================================================================

fn ascii(bytes: Vec<u8>) -> Result<JsString> {
    let length = bytes.len();
    JsString::from_vec(bytes, length)
}

impl JsString {
    /// Lowercase hex of the string's bytes.
    pub fn to_hex(&self) -> Result<JsString> {
        ascii(encode_hex(self.as_bytes()))
    }

    /// Base64 of the string's bytes.
    pub fn to_base64(&self) -> Result<JsString> {
        ascii(encode_base64(self.as_bytes()))
    }

    /// Base64url of the string's bytes.
    pub fn to_base64url(&self) -> Result<JsString> {
        ascii(encode_base64url(self.as_bytes()))
    }

    /// Byte string decoded from hex.
    pub fn decode_hex(&self) -> Result<JsString> {
        JsString::from_vec(decode_hex(self.as_bytes()), 0)
    }

    /// Byte string decoded from base64.
    pub fn decode_base64(&self) -> Result<JsString> {
        JsString::from_vec(decode_base64(self.as_bytes()), 0)
    }

    /// Byte string decoded from base64url.
    pub fn decode_base64url(&self) -> Result<JsString> {
        JsString::from_vec(decode_base64url(self.as_bytes()), 0)
    }
}

/// `btoa`: base64 of a string whose characters are all Latin-1.
pub fn btoa(s: &JsString) -> Result<JsString> {
    let bytes = s.as_bytes();
    let mut latin1 = Vec::new();
    latin1.try_reserve(s.length())?;

    if s.kind() == StringKind::Utf8 {
        let mut pos = 0;

        while pos < bytes.len() {
            let cp = utf8::decode(bytes, &mut pos)
                .ok_or_else(|| Error::type_error("invalid character (>= U+00FF)"))?;

            if cp > 0xFF {
                return Err(Error::type_error("invalid character (>= U+00FF)"));
            }

            latin1.push(cp as u8);
        }
    } else {
        latin1.extend_from_slice(bytes);
    }

    ascii(encode_base64(&latin1))
}

/// `atob`: decodes base64 into Latin-1 characters.
pub fn atob(s: &JsString) -> Result<JsString> {
    let not_encoded = || Error::type_error("the string to be decoded is not correctly encoded");

    let src: Vec<u8> = s.as_bytes().iter().copied().filter(|&c| c != b' ').collect();
    let mut len = src.len();
    let mut pad = 0;

    if len % 4 == 0 && len > 0 {
        if src[len - 1] == b'=' {
            pad += 1;
        }
        if src[len - 2] == b'=' {
            pad += 1;
        }
    }

    if len % 4 == 1 {
        return Err(not_encoded());
    }

    if src[..len - pad]
        .iter()
        .any(|&c| BASIS64[usize::from(c)] == INVALID)
    {
        return Err(not_encoded());
    }

    // Only whole groups are decoded.
    len = (len / 4) * 3 - pad;

    if len == 0 {
        return Ok(JsString::empty());
    }

    let decoded = decode_base64_core(&src, &BASIS64, len);

    let mut out = Vec::new();
    out.try_reserve(decoded.len() * 2)?;
    for &b in &decoded {
        utf8::push(&mut out, u32::from(b));
    }

    JsString::from_vec(out, decoded.len())
}
