/*
 * stream.rs
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

//! Incremental parser interface consumed by the request engine.
//!
//! The engine only pushes bytes; the parser decides where values begin and end and
//! hands each complete value to `emit` synchronously, on the task driving the feed.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::Error;

/// A parser that consumes a byte stream in pieces and emits complete values.
pub trait StreamParser {
    type Value;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Push the next bytes of the stream. Every value completed by these bytes is
    /// passed to `emit`, in stream order, before this returns.
    fn feed(&mut self, data: &[u8], emit: &mut dyn FnMut(Self::Value)) -> Result<(), Self::Error>;

    /// End of stream. Emits a value still pending (e.g. a bare number at the end)
    /// and fails if the stream stopped inside a value.
    fn finish(&mut self, emit: &mut dyn FnMut(Self::Value)) -> Result<(), Self::Error>;
}

pub(crate) fn parse_error<E: std::error::Error + Send + Sync + 'static>(e: E) -> Error {
    Error::Parse(Box::new(e))
}

/// Pull-style entry point: read `reader` to end of stream, feeding the parser as data arrives.
pub async fn feed_reader<P, R, F>(parser: &mut P, reader: &mut R, mut emit: F) -> Result<(), Error>
where
    P: StreamParser,
    R: AsyncRead + Unpin,
    F: FnMut(P::Value),
{
    let mut buf = vec![0u8; 8192];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        parser.feed(&buf[..n], &mut emit).map_err(parse_error)?;
    }
    parser.finish(&mut emit).map_err(parse_error)
}
