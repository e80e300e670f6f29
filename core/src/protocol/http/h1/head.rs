/*
 * head.rs
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

//! HTTP/1.1 response head: status line and headers up to the blank line.

use std::collections::HashMap;
use std::io;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::protocol::http::socket::Socket;

/// Response headers in arrival order. Names compare case-insensitively; inserting a
/// name that is already present replaces its value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: Vec<(String, String)>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(&name))
        {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<HeaderMap> for HashMap<String, String> {
    fn from(headers: HeaderMap) -> Self {
        headers.entries.into_iter().collect()
    }
}

/// Parsed status line and headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub version: String,
    pub status: u16,
    pub reason: String,
    pub headers: HeaderMap,
}

impl ResponseHead {
    /// Media type without parameters, e.g. `application/json` for `application/json; charset=utf-8`.
    pub fn media_type(&self) -> Option<&str> {
        self.headers
            .get("Content-Type")
            .map(|ct| ct.split(';').next().unwrap_or("").trim())
    }

    pub fn is_chunked(&self) -> bool {
        self.headers
            .get("Transfer-Encoding")
            .map(|te| te.trim().eq_ignore_ascii_case("chunked"))
            .unwrap_or(false)
    }

    /// Declared body length; None when absent or unparseable.
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get("Content-Length")
            .and_then(|cl| cl.trim().parse().ok())
    }
}

fn invalid(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

fn line_str(line: &[u8]) -> io::Result<&str> {
    let s = std::str::from_utf8(line).map_err(|_| invalid("invalid header UTF-8"))?;
    Ok(s.trim_end_matches(['\r', '\n']))
}

/// `HTTP/1.1 200 OK` or `HTTP/1.1 200`.
fn parse_status_line(line: &str) -> io::Result<(String, u16, String)> {
    let mut parts = line.splitn(3, ' ');
    let version = parts.next().unwrap_or("");
    if !version.starts_with("HTTP/") {
        return Err(invalid(format!("invalid status line: {}", line)));
    }
    let status = parts
        .next()
        .and_then(|s| s.parse::<u16>().ok())
        .ok_or_else(|| invalid(format!("invalid status code: {}", line)))?;
    let reason = parts.next().unwrap_or("").trim().to_string();
    Ok((version.to_string(), status, reason))
}

/// Read the status line and headers. The first non-blank line is always the status
/// line; every following line up to the blank line is a header, split at its first `:`.
pub async fn read_response_head<S>(socket: &mut Socket<S>) -> io::Result<ResponseHead>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let eof = || io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed before response head");
    let (version, status, reason) = loop {
        let line = socket.read_line().await?.ok_or_else(eof)?;
        let line = line_str(&line)?;
        if !line.is_empty() {
            break parse_status_line(line)?;
        }
    };
    log::debug!("status {} {}", status, reason);
    let mut headers = HeaderMap::new();
    loop {
        let raw = socket.read_line().await?.ok_or_else(eof)?;
        if !raw.ends_with(b"\n") {
            return Err(eof());
        }
        let line = line_str(&raw)?;
        if line.is_empty() {
            break;
        }
        match line.find(':') {
            Some(colon) => headers.insert(line[..colon].trim(), line[colon + 1..].trim()),
            None => log::debug!("ignoring malformed header line: {}", line),
        }
    }
    Ok(ResponseHead {
        version,
        status,
        reason,
        headers,
    })
}
