/*
 * error.rs
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

//! Errors surfaced by request operations.

use std::io;

use crate::protocol::http::HeaderMap;

/// Error returned by `HttpClient` and `Session` request operations.
///
/// Nothing is retried internally; the socket has already been closed by the
/// time the caller sees any of these.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Connect, read or write failure at the socket or TLS layer.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    /// The server answered with a status other than 200. The body is never parsed.
    #[error("Code 200 expected got {code}")]
    HttpStatus {
        code: u16,
        reason: String,
        headers: HeaderMap,
    },

    /// Content-Type (first `;` segment) is not in the configured allow-list.
    #[error("The response MIME type {0} is not supported")]
    InvalidContentType(String),

    /// The response cannot be consumed the way the caller set up the request,
    /// e.g. a chunked body with no per-value callback.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid URI: {0}")]
    InvalidUri(String),

    /// The server declared a Content-Encoding this build was compiled without.
    #[error("content encoding {0} is not available in this build")]
    UnsupportedEncoding(String),

    /// The body could not be decompressed.
    #[error("decode error: {0}")]
    Decode(#[source] io::Error),

    /// The incremental parser rejected the body.
    #[error("parse error: {0}")]
    Parse(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// True for socket/TLS failures. Only these can be the result of an
    /// intentional session termination.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }

    /// Status code carried by an `HttpStatus` error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::HttpStatus { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::InvalidUri(e.to_string())
    }
}
