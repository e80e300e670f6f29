/*
 * negotiate.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Ruscello, a streaming HTTP client.
 *
 * Ruscello is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Ruscello is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Ruscello.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Decide how a 200 response body is framed and decoded before any body byte is read.

use crate::config::ClientConfig;
use crate::error::Error;
use crate::protocol::http::h1::ResponseHead;

/// How the body ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    Chunked,
    Length(u64),
    UntilClose,
}

/// Body codec, resolved once from `Content-Encoding`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncoding {
    Identity,
    Gzip,
    Deflate,
    Bzip2,
}

impl ContentEncoding {
    /// Unrecognized values pass the body through unchanged.
    pub fn from_header(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("gzip") | Some("x-gzip") => ContentEncoding::Gzip,
            Some("deflate") => ContentEncoding::Deflate,
            Some("bzip2") => ContentEncoding::Bzip2,
            _ => ContentEncoding::Identity,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentEncoding::Identity => "identity",
            ContentEncoding::Gzip => "gzip",
            ContentEncoding::Deflate => "deflate",
            ContentEncoding::Bzip2 => "bzip2",
        }
    }

    /// Whether this build carries the codec.
    pub fn is_available(&self) -> bool {
        match self {
            ContentEncoding::Identity => true,
            ContentEncoding::Gzip => cfg!(feature = "gzip"),
            ContentEncoding::Deflate => cfg!(feature = "deflate"),
            ContentEncoding::Bzip2 => cfg!(feature = "bzip2"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodePlan {
    pub framing: Framing,
    pub encoding: ContentEncoding,
}

/// Check the media type against the allow-list, then resolve framing and encoding.
/// A chunked body with no per-value callback is a configuration error.
pub fn negotiate(head: &ResponseHead, config: &ClientConfig, has_callback: bool) -> Result<DecodePlan, Error> {
    let media_type = head.media_type().unwrap_or("");
    if !config.allows(media_type) {
        return Err(Error::InvalidContentType(media_type.to_string()));
    }
    let framing = if head.is_chunked() {
        if !has_callback {
            return Err(Error::Configuration(
                "chunked response requires a per-value callback".to_string(),
            ));
        }
        Framing::Chunked
    } else {
        match head.content_length() {
            Some(len) => Framing::Length(len),
            None => Framing::UntilClose,
        }
    };
    let encoding = ContentEncoding::from_header(head.headers.get("Content-Encoding"));
    if !encoding.is_available() {
        return Err(Error::UnsupportedEncoding(encoding.as_str().to_string()));
    }
    let plan = DecodePlan { framing, encoding };
    log::debug!("decode plan {:?}", plan);
    Ok(plan)
}
