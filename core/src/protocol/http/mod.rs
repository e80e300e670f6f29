/*
 * mod.rs
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

//! Streaming HTTP/1.1 client.
//!
//! - `request`: byte-exact request encoding with a fixed header order.
//! - `socket`: buffered reads over the transport, with a close signal for termination.
//! - `h1`: response head and chunked transfer decoding.
//! - `negotiate`: content-type check and the framing/encoding plan for the body.
//! - `codec`: gzip, raw deflate and bzip2 decompression (per Cargo feature).
//! - `dispatch`: decoded bytes into the incremental parser, values out to the caller.
//! - `client` / `session`: the one-shot and cancellable entry points over one request path.

pub mod client;
pub mod codec;
pub mod dispatch;
pub mod h1;
pub mod negotiate;
pub mod request;
pub mod session;
pub mod socket;

pub use client::{perform, HttpClient};
pub use codec::BodyDecoder;
pub use dispatch::Dispatch;
pub use h1::{decode_chunked, read_response_head, HeaderMap, ResponseHead};
pub use negotiate::{negotiate, ContentEncoding, DecodePlan, Framing};
pub use request::{Body, Method, Request};
pub use session::{Session, TerminateHandle};
pub use socket::Socket;
