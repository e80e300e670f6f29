/*
 * codec.rs
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

//! Streaming body decompression: one variant per supported `Content-Encoding`.
//!
//! Each codec is a push decoder; after every input slice the produced bytes are
//! passed on, so decoded data reaches the parser as soon as the codec yields it.
//! Raw deflate and bzip2 are driven through their low-level `Decompress` state so
//! that the end-of-stream marker is observed; a body that stops before it is a
//! decode error rather than a shortened payload.

#[cfg(any(feature = "deflate", feature = "bzip2"))]
use std::io;
#[cfg(feature = "gzip")]
use std::io::Write;

use crate::error::Error;
use crate::protocol::http::negotiate::ContentEncoding;

/// Output buffer handed to a low-level decompressor per step.
#[cfg(any(feature = "deflate", feature = "bzip2"))]
const OUT_CHUNK: usize = 8 * 1024;

pub enum BodyDecoder {
    Identity,
    #[cfg(feature = "gzip")]
    Gzip(flate2::write::GzDecoder<Vec<u8>>),
    /// Raw deflate (no zlib header).
    #[cfg(feature = "deflate")]
    Deflate { inner: flate2::Decompress, done: bool },
    #[cfg(feature = "bzip2")]
    Bzip2 { inner: bzip2::Decompress, done: bool },
}

impl BodyDecoder {
    pub fn new(encoding: ContentEncoding) -> Result<Self, Error> {
        match encoding {
            ContentEncoding::Identity => Ok(BodyDecoder::Identity),
            #[cfg(feature = "gzip")]
            ContentEncoding::Gzip => Ok(BodyDecoder::Gzip(flate2::write::GzDecoder::new(Vec::new()))),
            #[cfg(feature = "deflate")]
            ContentEncoding::Deflate => Ok(BodyDecoder::Deflate {
                inner: flate2::Decompress::new(false),
                done: false,
            }),
            #[cfg(feature = "bzip2")]
            ContentEncoding::Bzip2 => Ok(BodyDecoder::Bzip2 {
                inner: bzip2::Decompress::new(false),
                done: false,
            }),
            #[allow(unreachable_patterns)]
            other => Err(Error::UnsupportedEncoding(other.as_str().to_string())),
        }
    }

    /// Decode `input` and pass whatever output it produced to `sink`.
    pub fn decode<F>(&mut self, input: &[u8], sink: &mut F) -> Result<(), Error>
    where
        F: FnMut(&[u8]) -> Result<(), Error>,
    {
        match self {
            BodyDecoder::Identity => sink(input),
            #[cfg(feature = "gzip")]
            BodyDecoder::Gzip(d) => {
                d.write_all(input).map_err(Error::Decode)?;
                drain(d.get_mut(), sink)
            }
            #[cfg(feature = "deflate")]
            BodyDecoder::Deflate { inner, done } => pump(input, done, sink, |input, out| {
                let before = inner.total_in();
                let status = inner
                    .decompress_vec(input, out, flate2::FlushDecompress::None)
                    .map_err(corrupt)?;
                Ok((
                    (inner.total_in() - before) as usize,
                    matches!(status, flate2::Status::StreamEnd),
                ))
            }),
            #[cfg(feature = "bzip2")]
            BodyDecoder::Bzip2 { inner, done } => pump(input, done, sink, |input, out| {
                let before = inner.total_in();
                let status = inner.decompress_vec(input, out).map_err(corrupt)?;
                Ok((
                    (inner.total_in() - before) as usize,
                    matches!(status, bzip2::Status::StreamEnd),
                ))
            }),
        }
    }

    /// End of body: flush the codec and fail if the compressed stream was cut short.
    pub fn finish<F>(&mut self, sink: &mut F) -> Result<(), Error>
    where
        F: FnMut(&[u8]) -> Result<(), Error>,
    {
        match self {
            BodyDecoder::Identity => Ok(()),
            #[cfg(feature = "gzip")]
            BodyDecoder::Gzip(d) => {
                d.try_finish().map_err(Error::Decode)?;
                drain(d.get_mut(), sink)
            }
            #[cfg(feature = "deflate")]
            BodyDecoder::Deflate { done, .. } => ended(*done),
            #[cfg(feature = "bzip2")]
            BodyDecoder::Bzip2 { done, .. } => ended(*done),
        }
    }
}

#[cfg(feature = "gzip")]
fn drain<F>(out: &mut Vec<u8>, sink: &mut F) -> Result<(), Error>
where
    F: FnMut(&[u8]) -> Result<(), Error>,
{
    if out.is_empty() {
        return Ok(());
    }
    let decoded = std::mem::take(out);
    sink(&decoded)
}

#[cfg(any(feature = "deflate", feature = "bzip2"))]
fn corrupt<E>(e: E) -> Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    Error::Decode(io::Error::new(io::ErrorKind::InvalidData, e))
}

#[cfg(any(feature = "deflate", feature = "bzip2"))]
fn ended(done: bool) -> Result<(), Error> {
    if done {
        Ok(())
    } else {
        Err(Error::Decode(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "compressed body ended before end of stream",
        )))
    }
}

/// Run `step` over `input` until it is consumed and the codec has nothing left to
/// emit, or the stream ends. `step` decompresses into the spare capacity of its
/// output vector and reports the input bytes it consumed and whether the stream ended.
#[cfg(any(feature = "deflate", feature = "bzip2"))]
fn pump<F, D>(mut input: &[u8], done: &mut bool, sink: &mut F, mut step: D) -> Result<(), Error>
where
    F: FnMut(&[u8]) -> Result<(), Error>,
    D: FnMut(&[u8], &mut Vec<u8>) -> Result<(usize, bool), Error>,
{
    while !*done {
        let mut out = Vec::with_capacity(OUT_CHUNK);
        let (consumed, stream_end) = step(input, &mut out)?;
        input = &input[consumed..];
        let full = out.len() == out.capacity();
        let produced = out.len();
        if produced > 0 {
            sink(&out)?;
        }
        if stream_end {
            *done = true;
            if !input.is_empty() {
                log::debug!("ignoring {} bytes after end of compressed stream", input.len());
            }
            break;
        }
        if input.is_empty() && !full {
            break;
        }
        if consumed == 0 && produced == 0 {
            return Err(Error::Decode(io::Error::new(
                io::ErrorKind::InvalidData,
                "compressed stream stalled",
            )));
        }
    }
    Ok(())
}
