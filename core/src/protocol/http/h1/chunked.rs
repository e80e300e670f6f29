/*
 * chunked.rs
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

//! Chunked transfer decoding (RFC 9112 section 7.1) driven from a `Socket`.

use std::io;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::Error;
use crate::protocol::http::socket::Socket;

/// Largest chunk accepted in one piece.
pub const MAX_CHUNK_SIZE: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    AwaitingSizeLine,
    ReadingChunkBody(usize),
    Done,
}

/// What a chunk-size line says.
#[derive(Debug, PartialEq, Eq)]
enum SizeLine {
    /// Separator left over from the previous chunk.
    Blank,
    Size(usize),
}

fn parse_size_line(line: &[u8]) -> io::Result<SizeLine> {
    let line = std::str::from_utf8(line)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "invalid chunk size"))?;
    let hex = line.split(';').next().unwrap_or("").trim();
    if hex.is_empty() {
        return Ok(SizeLine::Blank);
    }
    let size = usize::from_str_radix(hex, 16).map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidData, format!("invalid chunk size: {}", hex))
    })?;
    if size > MAX_CHUNK_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("chunk of {} bytes exceeds limit", size),
        ));
    }
    Ok(SizeLine::Size(size))
}

pub struct ChunkDecoder {
    state: ChunkState,
}

impl ChunkDecoder {
    pub fn new() -> Self {
        Self {
            state: ChunkState::AwaitingSizeLine,
        }
    }

    pub fn state(&self) -> ChunkState {
        self.state
    }

    /// Read chunks until the zero-size chunk, handing each chunk body to `sink` as one slice.
    /// End of stream before the zero-size chunk is `UnexpectedEof`.
    pub async fn run<S, F>(&mut self, socket: &mut Socket<S>, mut sink: F) -> Result<(), Error>
    where
        S: AsyncRead + AsyncWrite + Unpin,
        F: FnMut(&[u8]) -> Result<(), Error>,
    {
        let eof = || {
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed before terminal chunk",
            )
        };
        loop {
            match self.state {
                ChunkState::AwaitingSizeLine => {
                    let line = socket.read_line().await?.ok_or_else(eof)?;
                    if !line.ends_with(b"\n") {
                        return Err(eof().into());
                    }
                    match parse_size_line(&line)? {
                        SizeLine::Blank => {}
                        SizeLine::Size(0) => {
                            log::trace!("terminal chunk");
                            self.state = ChunkState::Done;
                        }
                        SizeLine::Size(n) => {
                            log::trace!("chunk size {}", n);
                            self.state = ChunkState::ReadingChunkBody(n);
                        }
                    }
                }
                ChunkState::ReadingChunkBody(n) => {
                    let data = socket.read_exact(n).await?.ok_or_else(eof)?;
                    sink(&data)?;
                    self.state = ChunkState::AwaitingSizeLine;
                }
                ChunkState::Done => return Ok(()),
            }
        }
    }
}

impl Default for ChunkDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode one chunked body from `socket` into `sink`.
pub async fn decode_chunked<S, F>(socket: &mut Socket<S>, sink: F) -> Result<(), Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
    F: FnMut(&[u8]) -> Result<(), Error>,
{
    ChunkDecoder::new().run(socket, sink).await
}
