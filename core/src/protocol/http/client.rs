/*
 * client.rs
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

//! HTTP client: connect per request, write the request, check the head, then stream
//! the body through the codec into the incremental parser.
//!
//! `HttpClient` and `Session` share one request path (`run`); the session only adds
//! a close signal and the intentional-termination flag around it.

use std::io;
use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::watch;

use crate::config::ClientConfig;
use crate::error::Error;
use crate::json::JsonStreamParser;
use crate::net::{self, HttpStream};
use crate::protocol::http::codec::BodyDecoder;
use crate::protocol::http::dispatch::Dispatch;
use crate::protocol::http::h1::{decode_chunked, read_response_head};
use crate::protocol::http::negotiate::{negotiate, Framing};
use crate::protocol::http::request::{Body, Method, Request};
use crate::protocol::http::socket::Socket;
use crate::stream::StreamParser;
use crate::uri::Target;

const BODY_READ_SIZE: usize = 8192;

/// One-shot streaming client. Every request opens its own connection and closes it
/// when the request returns.
#[derive(Debug, Clone, Default)]
pub struct HttpClient {
    config: Arc<ClientConfig>,
}

impl HttpClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// GET `uri`, calling `on_value` once per JSON value in the body as it completes.
    pub async fn get<F>(&self, uri: &str, on_value: F) -> Result<(), Error>
    where
        F: FnMut(Value),
    {
        self.send(Request::new(Method::Get, uri)?, on_value).await
    }

    pub async fn post<F>(&self, uri: &str, body: impl Into<Body>, on_value: F) -> Result<(), Error>
    where
        F: FnMut(Value),
    {
        self.send(Request::post(uri, body)?, on_value).await
    }

    pub async fn put<F>(&self, uri: &str, body: impl Into<Body>, on_value: F) -> Result<(), Error>
    where
        F: FnMut(Value),
    {
        self.send(Request::put(uri, body)?, on_value).await
    }

    pub async fn delete<F>(&self, uri: &str, on_value: F) -> Result<(), Error>
    where
        F: FnMut(Value),
    {
        self.send(Request::new(Method::Delete, uri)?, on_value).await
    }

    /// Send `request`, streaming JSON values to `on_value`.
    pub async fn send<F>(&self, request: Request, on_value: F) -> Result<(), Error>
    where
        F: FnMut(Value),
    {
        let mut parser = JsonStreamParser::new(&self.config.parser);
        self.send_with_parser(request, &mut parser, on_value).await
    }

    /// Send `request` with a caller-supplied incremental parser.
    pub async fn send_with_parser<P, F>(&self, request: Request, parser: &mut P, mut on_value: F) -> Result<(), Error>
    where
        P: StreamParser,
        F: FnMut(P::Value),
    {
        run(&self.config, &request, None, parser, &mut on_value, true).await
    }

    /// Send `request` without a callback and return every value in the body.
    /// A chunked response is a `Configuration` error, raised before any body byte is read.
    pub async fn fetch(&self, request: Request) -> Result<Vec<Value>, Error> {
        let mut parser = JsonStreamParser::new(&self.config.parser);
        let mut values: Vec<Value> = Vec::new();
        let mut collect = |v| values.push(v);
        run(&self.config, &request, None, &mut parser, &mut collect, false).await?;
        Ok(values)
    }
}

fn aborted() -> io::Error {
    io::Error::new(io::ErrorKind::ConnectionAborted, "request terminated")
}

/// Connect to the request target. With a close signal, the connect itself is abandoned
/// once the signal is raised and the returned socket honours it on every read and write.
pub(crate) async fn open(
    target: &Target,
    config: &ClientConfig,
    mut signal: Option<watch::Receiver<bool>>,
) -> Result<Socket<HttpStream>, Error> {
    let connect = net::connect(target.host(), target.port(), target.use_tls(), config.connect_timeout);
    let stream = match signal.as_mut() {
        Some(rx) => tokio::select! {
            biased;
            Ok(_) = rx.wait_for(|closed| *closed) => return Err(aborted().into()),
            r = connect => r?,
        },
        None => connect.await?,
    };
    Ok(match signal {
        Some(rx) => Socket::with_close_signal(stream, rx),
        None => Socket::new(stream),
    })
}

/// The single request path: connect, exchange, close.
pub(crate) async fn run<P, F>(
    config: &ClientConfig,
    request: &Request,
    signal: Option<watch::Receiver<bool>>,
    parser: &mut P,
    on_value: &mut F,
    streaming: bool,
) -> Result<(), Error>
where
    P: StreamParser,
    F: FnMut(P::Value),
{
    let mut socket = open(request.target(), config, signal).await?;
    perform(&mut socket, request, config, parser, on_value, streaming).await
}

/// Run one exchange on an already-connected socket. The socket is closed on every
/// exit path.
pub async fn perform<S, P, F>(
    socket: &mut Socket<S>,
    request: &Request,
    config: &ClientConfig,
    parser: &mut P,
    on_value: &mut F,
    streaming: bool,
) -> Result<(), Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
    P: StreamParser,
    F: FnMut(P::Value),
{
    let result = exchange(socket, request, config, parser, on_value, streaming).await;
    socket.close().await;
    result
}

async fn exchange<S, P, F>(
    socket: &mut Socket<S>,
    request: &Request,
    config: &ClientConfig,
    parser: &mut P,
    on_value: &mut F,
    streaming: bool,
) -> Result<(), Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
    P: StreamParser,
    F: FnMut(P::Value),
{
    log::debug!(
        "{} {} HTTP/1.1",
        request.method().as_str(),
        request.target().request_uri()
    );
    let encoded = request.encode(config)?;
    socket.write_all(&encoded).await?;

    let head = read_response_head(socket).await?;
    if head.status != 200 {
        return Err(Error::HttpStatus {
            code: head.status,
            reason: head.reason,
            headers: head.headers,
        });
    }
    let plan = negotiate(&head, config, streaming)?;
    let mut dispatch = Dispatch::new(parser, BodyDecoder::new(plan.encoding)?, on_value);

    match plan.framing {
        Framing::Chunked => {
            decode_chunked(socket, |data| dispatch.feed(data)).await?;
        }
        Framing::Length(len) => {
            let mut remaining = len;
            while remaining > 0 {
                let limit = remaining.min(BODY_READ_SIZE as u64) as usize;
                let data = socket.read_some(limit).await?.ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("connection closed with {} body bytes outstanding", remaining),
                    )
                })?;
                log::trace!("body read {}", data.len());
                remaining -= data.len() as u64;
                dispatch.feed(&data)?;
            }
        }
        Framing::UntilClose => {
            while let Some(data) = socket.read_some(BODY_READ_SIZE).await? {
                log::trace!("body read {}", data.len());
                dispatch.feed(&data)?;
            }
        }
    }
    let decoded = dispatch.finish()?;
    log::debug!("response body complete ({} bytes decoded)", decoded);
    Ok(())
}
