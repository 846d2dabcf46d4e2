// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! String layer integration tests.
//!
//! The codecs are checked against the `base64` and `hex` crates.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use ember_engine::string::codec::{decode_base64, decode_base64url, encode_base64, encode_base64url};
use ember_engine::string::{
    MAP_STRIDE, StringKind, atob, btoa, decode_uri, decode_uri_component, encode_uri,
    encode_uri_component,
};
use ember_engine::{Error, JsString};
use pretty_assertions::assert_eq;

fn sample(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 + 7) as u8).collect()
}

fn text(s: &str) -> JsString {
    JsString::text(s).unwrap()
}

// ============================================================================
// base64 / hex
// ============================================================================

#[test]
fn test_base64_matches_reference() {
    for len in 0..=10000 {
        let src = sample(len);
        let encoded = encode_base64(&src);

        assert_eq!(encoded, STANDARD.encode(&src).into_bytes(), "length {len}");
        assert_eq!(encoded.len(), len.div_ceil(3) * 4);
        assert_eq!(encoded.ends_with(b"="), len % 3 != 0);
        assert_eq!(decode_base64(&encoded), src);
        assert_eq!(decode_base64(&encoded), STANDARD.decode(&encoded).unwrap());
    }
}

#[test]
fn test_base64url_matches_reference() {
    for len in 0..=10000 {
        let src = sample(len);
        let encoded = encode_base64url(&src);

        assert_eq!(encoded, URL_SAFE_NO_PAD.encode(&src).into_bytes(), "length {len}");
        assert!(!encoded.iter().any(|&c| matches!(c, b'=' | b'+' | b'/')));
        assert_eq!(decode_base64url(&encoded), src);
        assert_eq!(decode_base64url(&encoded), URL_SAFE_NO_PAD.decode(&encoded).unwrap());
    }
}

#[test]
fn test_base64url_without_padding() {
    let s = JsString::bytes(&[0xFB, 0xFF, 0xFF]).unwrap();
    assert_eq!(s.to_base64url().unwrap().to_string(), "-___");
    assert_eq!(s.to_base64().unwrap().to_string(), "+///");
}

#[test]
fn test_hex_matches_reference() {
    let src = sample(64);
    let s = JsString::bytes(&src).unwrap();

    let encoded = s.to_hex().unwrap();
    assert_eq!(encoded.to_string(), hex::encode(&src));
    assert_eq!(encoded.decode_hex().unwrap().as_bytes(), &src[..]);
}

#[test]
fn test_btoa_atob() {
    assert_eq!(btoa(&text("hello")).unwrap().to_string(), "aGVsbG8=");
    assert_eq!(atob(&text("aGVsbG8=")).unwrap().to_string(), "hello");

    // Latin-1 characters round-trip as code points, not as UTF-8 bytes.
    let latin = text("caf\u{e9}");
    let encoded = btoa(&latin).unwrap();
    assert_eq!(encoded.to_string(), STANDARD.encode([b'c', b'a', b'f', 0xE9]));
    assert_eq!(atob(&encoded).unwrap(), latin);

    assert!(matches!(btoa(&text("\u{20ac}")), Err(Error::Type(_))));
    assert!(matches!(atob(&text("a")), Err(Error::Type(_))));
}

// ============================================================================
// URI
// ============================================================================

#[test]
fn test_uri_euro_sign() {
    let decoded = decode_uri_component(&text("%E2%82%AC")).unwrap();
    assert_eq!(decoded.to_string(), "\u{20ac}");
    assert_eq!(decoded.length(), 1);

    assert_eq!(encode_uri_component(&decoded).unwrap().to_string(), "%E2%82%AC");
}

#[test]
fn test_uri_component_round_trip() {
    for s in [
        "",
        "plain",
        "a b&c=d/e?f#g",
        "\u{e9}t\u{e9} \u{4e2d}\u{6587} \u{1f600}",
        "100% \u{20ac}",
    ] {
        let encoded = encode_uri_component(&text(s)).unwrap();
        assert!(encoded.as_bytes().is_ascii());
        assert_eq!(decode_uri_component(&encoded).unwrap().to_string(), s);
    }
}

#[test]
fn test_uri_keeps_reserved_characters() {
    let uri = text("http://x.org/a b?q=\u{e9}#f");
    let encoded = encode_uri(&uri).unwrap();
    assert_eq!(encoded.to_string(), "http://x.org/a%20b?q=%C3%A9#f");

    // Escaped reserved characters stay escaped.
    assert_eq!(decode_uri(&text("%2F%20")).unwrap().to_string(), "%2F ");
    assert_eq!(decode_uri_component(&text("%2F%20")).unwrap().to_string(), "/ ");
}

#[test]
fn test_uri_errors() {
    assert!(matches!(decode_uri_component(&text("%E2%82")), Err(Error::Uri(_))));
    assert!(matches!(decode_uri_component(&text("%zz")), Err(Error::Uri(_))));

    let lone = JsString::from_utf16(&[0xD800]).unwrap();
    assert!(matches!(encode_uri_component(&lone), Err(Error::Uri(_))));
}

// ============================================================================
// Offset map
// ============================================================================

#[test]
fn test_offset_map_matches_char_indices() {
    let source: String = (0..MAP_STRIDE * 5 + 3)
        .map(|i| match i % 4 {
            0 => 'a',
            1 => '\u{e9}',
            2 => '\u{20ac}',
            _ => '\u{1f600}',
        })
        .collect();
    let expected: Vec<usize> = source.char_indices().map(|(pos, _)| pos).collect();

    let lazy = text(&source);
    let eager = text(&source);
    assert!(eager.build_offset_map());

    for (i, &pos) in expected.iter().enumerate() {
        assert_eq!(lazy.offset(i), pos, "character {i}");
        assert_eq!(eager.offset(i), pos, "character {i}");
        assert_eq!(eager.index(pos), i);
    }

    assert_eq!(lazy.offset(expected.len()), source.len());
}

#[test]
fn test_short_and_ascii_strings_have_no_map() {
    assert!(!text("h\u{e9}llo").build_offset_map());
    assert!(!text(&"a".repeat(100)).build_offset_map());
}

#[test]
fn test_byte_string_length_is_lazy() {
    let s = JsString::bytes("\u{e9}t\u{e9}".as_bytes()).unwrap();
    assert_eq!(s.kind(), StringKind::Byte);
    assert_eq!(s.cached_length(), None);

    assert_eq!(s.validate().unwrap(), 3);
    assert_eq!(s.cached_length(), Some(3));

    let invalid = JsString::bytes(&[0xFF, 0xFE]).unwrap();
    assert!(invalid.validate().is_err());
}

// ============================================================================
// Operations
// ============================================================================

#[test]
fn test_utf16_round_trip() {
    let units: Vec<u16> = "a\u{e9}\u{1f600}".encode_utf16().collect();
    let s = JsString::from_utf16(&units).unwrap();

    assert_eq!(s.to_string(), "a\u{e9}\u{1f600}");
    assert_eq!(s.length(), 3);
    assert_eq!(s.to_utf16(), units);
}

#[test]
fn test_case_mapping_subset() {
    assert_eq!(text("\u{391}\u{392}c").to_lower_case().unwrap().to_string(), "\u{3b1}\u{3b2}c");
    assert_eq!(text("stra\u{df}e").to_upper_case().unwrap().to_string(), "STRA\u{df}E");
}

#[test]
fn test_trim_pad_repeat() {
    let s = text("\u{a0} x\u{e9} \n");
    assert_eq!(s.trim().unwrap().to_string(), "x\u{e9}");
    assert_eq!(s.trim_start().unwrap().to_string(), "x\u{e9} \n");

    let abc = text("abc");
    assert_eq!(abc.pad_start(7, Some(&text("\u{e9}-"))).unwrap().to_string(), "\u{e9}-\u{e9}-abc");
    assert_eq!(abc.pad_end(5, None).unwrap().to_string(), "abc  ");
    assert_eq!(abc.repeat(3).unwrap().to_string(), "abcabcabc");
    assert!(matches!(abc.repeat(-1), Err(Error::Range(_))));

    let long = text(&"\u{e9}".repeat(40));
    assert_eq!(long.substring(38, 100).unwrap().to_string(), "\u{e9}\u{e9}");
}
