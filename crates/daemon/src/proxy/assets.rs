// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Editor branding asset interception.
//!
//! A handful of editor-internal static URLs are answered locally with an
//! embedded icon instead of being proxied: the PNG variants as raw bytes,
//! the SVG variants as a trivial wrapper around the PNG as a data URI.
//! Matching is by exact path suffix; everything else proxies through.

use axum::http::header;
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

const PNG_SUFFIXES: [&str; 3] = ["/favicon.ico", "/pwa-icon-192.png", "/pwa-icon-512.png"];
const SVG_SUFFIXES: [&str; 2] = ["/favicon.svg", "/favicon-dark-support.svg"];

/// Embedded branding icon (PNG).
const ICON_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

/// Answer an intercepted asset path, or `None` to proxy through.
pub(crate) fn intercept(path: &str) -> Option<Response> {
    if PNG_SUFFIXES.iter().any(|suffix| path.ends_with(suffix)) {
        return Some(([(header::CONTENT_TYPE, "image/png")], icon_png()).into_response());
    }
    if SVG_SUFFIXES.iter().any(|suffix| path.ends_with(suffix)) {
        return Some(([(header::CONTENT_TYPE, "image/svg+xml")], icon_svg()).into_response());
    }
    None
}

fn icon_png() -> Vec<u8> {
    BASE64.decode(ICON_PNG_BASE64).unwrap_or_default()
}

fn icon_svg() -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="32" height="32"><image width="32" height="32" href="data:image/png;base64,{}"/></svg>"#,
        ICON_PNG_BASE64
    )
}

#[cfg(test)]
#[path = "assets_tests.rs"]
mod tests;
