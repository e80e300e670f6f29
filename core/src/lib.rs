/*
 * lib.rs
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

//! Ruscello core: a streaming HTTP/1.1 client.
//!
//! Response bodies are de-chunked, decompressed and fed to an incremental parser as
//! they arrive; each completed value is handed to the caller's callback immediately.
//! A `Session` can be terminated from another task while a read is blocked.

pub mod config;
pub mod error;
pub mod json;
pub mod net;
pub mod protocol;
pub mod stream;
pub mod uri;

pub use config::{ClientConfig, ParserOptions};
pub use error::Error;
pub use json::JsonStreamParser;
pub use protocol::http::{
    Body, HeaderMap, HttpClient, Method, Request, ResponseHead, Session, TerminateHandle,
};
pub use stream::{feed_reader, StreamParser};
pub use uri::Target;
