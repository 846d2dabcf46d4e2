// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! UTF-8 helpers.
//!
//! Stored text is WTF-8: a lone UTF-16 surrogate is kept as its 3-byte
//! generalized UTF-8 form. [`decode`] accepts those sequences, while
//! [`decode_strict`] rejects them.

/// Largest Unicode scalar value.
pub const MAX_CODEPOINT: u32 = 0x10FFFF;

/// Returns true for a leading (high) surrogate.
#[inline]
pub fn is_leading_surrogate(cp: u32) -> bool {
    (0xD800..=0xDBFF).contains(&cp)
}

/// Returns true for a trailing (low) surrogate.
#[inline]
pub fn is_trailing_surrogate(cp: u32) -> bool {
    (0xDC00..=0xDFFF).contains(&cp)
}

/// Returns true for any surrogate code point.
#[inline]
pub fn is_surrogate(cp: u32) -> bool {
    (0xD800..=0xDFFF).contains(&cp)
}

/// Combines a surrogate pair into a supplementary code point.
#[inline]
pub fn surrogate_pair(high: u32, low: u32) -> u32 {
    0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
}

/// Number of bytes needed to encode `cp`.
#[inline]
pub fn size(cp: u32) -> usize {
    match cp {
        0..=0x7F => 1,
        0x80..=0x7FF => 2,
        0x800..=0xFFFF => 3,
        _ => 4,
    }
}

/// Encodes `cp` into `buf`, returning the number of bytes written.
///
/// Values above [`MAX_CODEPOINT`] write nothing.
pub fn encode(cp: u32, buf: &mut [u8; 4]) -> usize {
    match cp {
        0..=0x7F => {
            buf[0] = cp as u8;
            1
        }
        0x80..=0x7FF => {
            buf[0] = ((cp >> 6) | 0xC0) as u8;
            buf[1] = ((cp & 0x3F) | 0x80) as u8;
            2
        }
        0x800..=0xFFFF => {
            buf[0] = ((cp >> 12) | 0xE0) as u8;
            buf[1] = (((cp >> 6) & 0x3F) | 0x80) as u8;
            buf[2] = ((cp & 0x3F) | 0x80) as u8;
            3
        }
        0x10000..=MAX_CODEPOINT => {
            buf[0] = ((cp >> 18) | 0xF0) as u8;
            buf[1] = (((cp >> 12) & 0x3F) | 0x80) as u8;
            buf[2] = (((cp >> 6) & 0x3F) | 0x80) as u8;
            buf[3] = ((cp & 0x3F) | 0x80) as u8;
            4
        }
        _ => 0,
    }
}

/// Appends the encoding of `cp` to `out`.
pub fn push(out: &mut Vec<u8>, cp: u32) {
    let mut buf = [0u8; 4];
    let n = encode(cp, &mut buf);
    out.extend_from_slice(&buf[..n]);
}

/// Decodes the code point at `*pos`, accepting encoded surrogates.
///
/// On success `*pos` is advanced past the sequence. On failure `*pos` stops
/// at the first byte that could not be consumed.
#[inline]
pub fn decode(bytes: &[u8], pos: &mut usize) -> Option<u32> {
    decode_with(bytes, pos, true)
}

/// Decodes the code point at `*pos`, rejecting encoded surrogates.
#[inline]
pub fn decode_strict(bytes: &[u8], pos: &mut usize) -> Option<u32> {
    decode_with(bytes, pos, false)
}

fn decode_with(bytes: &[u8], pos: &mut usize, surrogates: bool) -> Option<u32> {
    let c = *bytes.get(*pos)?;
    *pos += 1;

    if c < 0x80 {
        return Some(u32::from(c));
    }

    let (mut cp, need, lower, upper) = match c {
        0xC2..=0xDF => (u32::from(c & 0x1F), 1, 0x80, 0xBF),
        0xE0 => (u32::from(c & 0x0F), 2, 0xA0, 0xBF),
        0xED if !surrogates => (u32::from(c & 0x0F), 2, 0x80, 0x9F),
        0xE1..=0xEF => (u32::from(c & 0x0F), 2, 0x80, 0xBF),
        0xF0 => (u32::from(c & 0x07), 3, 0x90, 0xBF),
        0xF1..=0xF3 => (u32::from(c & 0x07), 3, 0x80, 0xBF),
        0xF4 => (u32::from(c & 0x07), 3, 0x80, 0x8F),
        _ => return None,
    };

    for i in 0..need {
        let b = *bytes.get(*pos)?;
        let (lo, hi) = if i == 0 { (lower, upper) } else { (0x80, 0xBF) };

        if b < lo || b > hi {
            return None;
        }

        cp = (cp << 6) | u32::from(b & 0x3F);
        *pos += 1;
    }

    Some(cp)
}

/// Counts code points, or returns `None` if `bytes` is not valid WTF-8.
pub fn length(bytes: &[u8]) -> Option<usize> {
    let mut pos = 0;
    let mut length = 0;

    while pos < bytes.len() {
        if bytes[pos] < 0x80 {
            pos += 1;
        } else {
            decode(bytes, &mut pos)?;
        }
        length += 1;
    }

    Some(length)
}

/// Offset of the character following the one starting at `pos`.
#[inline]
pub fn next(bytes: &[u8], pos: usize) -> usize {
    let mut p = pos + 1;

    while p < bytes.len() && (bytes[p] & 0xC0) == 0x80 {
        p += 1;
    }

    p
}

/// Offset of the character preceding `pos`.
#[inline]
pub fn prev(bytes: &[u8], pos: usize) -> usize {
    let mut p = pos.saturating_sub(1);

    while p > 0 && (bytes[p] & 0xC0) == 0x80 {
        p -= 1;
    }

    p
}

/// Unicode white space and line terminators recognised by `trim`.
pub fn is_whitespace(cp: u32) -> bool {
    matches!(
        cp,
        0x09..=0x0D
            | 0x20
            | 0xA0
            | 0x1680
            | 0x2000..=0x200A
            | 0x2028
            | 0x2029
            | 0x202F
            | 0x205F
            | 0x3000
            | 0xFEFF
    )
}

/// ASCII subset of [`is_whitespace`] used for byte strings.
#[inline]
pub fn is_byte_whitespace(byte: u8) -> bool {
    matches!(byte, 0x09..=0x0D | 0x20)
}
