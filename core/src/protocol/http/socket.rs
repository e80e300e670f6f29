/*
 * socket.rs
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

//! Buffered request socket: line reads, fixed-length reads, end-of-stream tracking,
//! idempotent close, and an optional close signal from another task.
//!
//! The close signal is how a `Session` interrupts a blocked read: every read and
//! write races the signal, and once it is raised the pending operation fails with
//! `ConnectionAborted` exactly as if the descriptor had been closed underneath it.

use bytes::BytesMut;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;

const READ_SIZE: usize = 8192;

/// Longest wait for an orderly shutdown (TLS close_notify, FIN) before the stream is dropped.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest header or chunk-size line accepted.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::ConnectionAborted, "socket closed")
}

pub struct Socket<S> {
    stream: S,
    buf: BytesMut,
    eof: bool,
    closed: bool,
    close_signal: Option<watch::Receiver<bool>>,
}

impl<S> Socket<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buf: BytesMut::with_capacity(READ_SIZE),
            eof: false,
            closed: false,
            close_signal: None,
        }
    }

    /// Socket whose pending reads and writes fail once `signal` becomes true.
    pub fn with_close_signal(stream: S, signal: watch::Receiver<bool>) -> Self {
        Self {
            close_signal: Some(signal),
            ..Self::new(stream)
        }
    }

    /// True when the peer has closed and every buffered byte has been consumed.
    pub fn is_eof(&self) -> bool {
        self.eof && self.buf.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// One read from the stream into the buffer. Returns bytes read; 0 means end of stream.
    async fn fill(&mut self) -> io::Result<usize> {
        if self.closed {
            return Err(closed_error());
        }
        let mut tmp = [0u8; READ_SIZE];
        let n = match self.close_signal.as_mut() {
            Some(signal) => tokio::select! {
                biased;
                Ok(_) = signal.wait_for(|closed| *closed) => return Err(closed_error()),
                r = self.stream.read(&mut tmp) => r?,
            },
            None => self.stream.read(&mut tmp).await?,
        };
        log::trace!("read {} bytes", n);
        if n == 0 {
            self.eof = true;
        } else {
            self.buf.extend_from_slice(&tmp[..n]);
        }
        Ok(n)
    }

    /// Read one line including its terminator. At end of stream returns the unterminated
    /// remainder, or None when nothing is left.
    pub async fn read_line(&mut self) -> io::Result<Option<BytesMut>> {
        let mut scanned = 0;
        loop {
            if let Some(pos) = self.buf[scanned..].iter().position(|b| *b == b'\n') {
                return Ok(Some(self.buf.split_to(scanned + pos + 1)));
            }
            scanned = self.buf.len();
            if scanned > MAX_LINE_LENGTH {
                return Err(io::Error::new(io::ErrorKind::InvalidData, "line too long"));
            }
            if self.eof {
                return Ok(if self.buf.is_empty() {
                    None
                } else {
                    Some(self.buf.split())
                });
            }
            self.fill().await?;
        }
    }

    /// Read exactly `len` bytes. Clean end of stream before any byte returns None;
    /// end of stream part-way through is `UnexpectedEof`.
    pub async fn read_exact(&mut self, len: usize) -> io::Result<Option<BytesMut>> {
        while self.buf.len() < len {
            if self.eof || self.fill().await? == 0 {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("expected {} bytes, stream ended after {}", len, self.buf.len()),
                ));
            }
        }
        Ok(Some(self.buf.split_to(len)))
    }

    /// Whatever is buffered (up to `limit` bytes), reading once if the buffer is empty.
    /// None at end of stream.
    pub async fn read_some(&mut self, limit: usize) -> io::Result<Option<BytesMut>> {
        if self.buf.is_empty() && !self.eof {
            self.fill().await?;
        }
        if self.buf.is_empty() {
            return Ok(None);
        }
        let n = limit.min(self.buf.len());
        Ok(Some(self.buf.split_to(n)))
    }

    /// Write all of `data` and flush, as one logical write.
    pub async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        if self.closed {
            return Err(closed_error());
        }
        let stream = &mut self.stream;
        let write = async move {
            stream.write_all(data).await?;
            stream.flush().await
        };
        match self.close_signal.as_mut() {
            Some(signal) => tokio::select! {
                biased;
                Ok(_) = signal.wait_for(|closed| *closed) => Err(closed_error()),
                r = write => r,
            },
            None => write.await,
        }
    }

    /// Shut the stream down. Closing an already-closed socket does nothing. The shutdown
    /// is abandoned when the close signal is raised or after `CLOSE_TIMEOUT`, so a peer
    /// that has stopped reading cannot hold the close open.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.buf.clear();
        let shutdown = tokio::time::timeout(CLOSE_TIMEOUT, self.stream.shutdown());
        let orderly = match self.close_signal.as_mut() {
            Some(signal) => tokio::select! {
                biased;
                Ok(_) = signal.wait_for(|closed| *closed) => false,
                r = shutdown => matches!(r, Ok(Ok(()))),
            },
            None => matches!(shutdown.await, Ok(Ok(()))),
        };
        if orderly {
            log::debug!("socket closed");
        } else {
            log::debug!("socket closed without orderly shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{duplex, DuplexStream, ReadBuf};

    /// Stream whose shutdown never completes, like a TLS peer that stopped reading.
    struct StuckShutdown(DuplexStream);

    impl AsyncRead for StuckShutdown {
        fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
            Pin::new(&mut self.0).poll_read(cx, buf)
        }
    }

    impl AsyncWrite for StuckShutdown {
        fn poll_write(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
            Pin::new(&mut self.0).poll_write(cx, buf)
        }

        fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Pin::new(&mut self.0).poll_flush(cx)
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Pending
        }
    }

    #[tokio::test]
    async fn close_signal_unblocks_stuck_shutdown() {
        let (client, _server) = duplex(64);
        let (tx, rx) = watch::channel(false);
        let mut s = Socket::with_close_signal(StuckShutdown(client), rx);
        let closer = tokio::spawn(async move {
            s.close().await;
            s.is_closed()
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!closer.is_finished());
        tx.send_replace(true);
        let closed = tokio::time::timeout(Duration::from_secs(1), closer)
            .await
            .expect("close still blocked after signal")
            .unwrap();
        assert!(closed);
    }

    #[tokio::test]
    async fn raised_signal_skips_shutdown() {
        let (client, _server) = duplex(64);
        let (tx, rx) = watch::channel(false);
        tx.send_replace(true);
        let mut s = Socket::with_close_signal(StuckShutdown(client), rx);
        tokio::time::timeout(Duration::from_secs(1), s.close())
            .await
            .expect("close waited on shutdown");
        assert!(s.is_closed());
    }

    #[tokio::test]
    async fn lines_and_exact_reads() {
        let (client, mut server) = duplex(1024);
        server.write_all(b"HTTP/1.1 200 OK\r\nab").await.unwrap();
        server.write_all(b"cdef").await.unwrap();
        drop(server);
        let mut s = Socket::new(client);
        assert_eq!(&s.read_line().await.unwrap().unwrap()[..], b"HTTP/1.1 200 OK\r\n");
        assert_eq!(&s.read_exact(4).await.unwrap().unwrap()[..], b"abcd");
        assert_eq!(&s.read_some(100).await.unwrap().unwrap()[..], b"ef");
        assert!(s.read_some(100).await.unwrap().is_none());
        assert!(s.is_eof());
    }

    #[tokio::test]
    async fn short_exact_read_is_unexpected_eof() {
        let (client, mut server) = duplex(64);
        server.write_all(b"abc").await.unwrap();
        drop(server);
        let mut s = Socket::new(client);
        let err = s.read_exact(5).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn clean_eof_exact_read_is_none() {
        let (client, server) = duplex(64);
        drop(server);
        let mut s = Socket::new(client);
        assert!(s.read_exact(5).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (client, _server) = duplex(64);
        let mut s = Socket::new(client);
        s.close().await;
        s.close().await;
        assert!(s.is_closed());
        assert!(s.read_line().await.is_err());
    }

    #[tokio::test]
    async fn close_signal_unblocks_pending_read() {
        let (client, _server) = duplex(64);
        let (tx, rx) = watch::channel(false);
        let mut s = Socket::with_close_signal(client, rx);
        let reader = tokio::spawn(async move { s.read_line().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send_replace(true);
        let err = reader.await.unwrap().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionAborted);
    }

    #[tokio::test]
    async fn overlong_line_rejected() {
        let (client, mut server) = duplex(MAX_LINE_LENGTH * 2);
        let writer = tokio::spawn(async move {
            let junk = vec![b'a'; MAX_LINE_LENGTH + READ_SIZE * 2];
            let _ = server.write_all(&junk).await;
            server
        });
        let mut s = Socket::new(client);
        let err = s.read_line().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        drop(writer);
    }
}
