/*
 * request.rs
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

//! HTTP request: method, target, header overrides, optional body, and the exact
//! bytes written to the socket.
//!
//! Header order is fixed (Host, Authorization, User-Agent, Accept, Content-Length,
//! Content-Type, Accept-Encoding, Accept-Charset, then caller extras) because
//! signature-based auth schemes depend on byte-exact requests.

use std::collections::BTreeMap;

use crate::config::{available_encodings, ClientConfig};
use crate::error::Error;
use crate::uri::{form_encode, Target};

/// Content-Type sent with POST/PUT unless overridden.
pub const DEFAULT_FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Overrides that replace a default header in place. Names compare case-insensitively.
const REPLACEABLE: [&str; 3] = ["User-Agent", "Accept", "Content-Type"];

/// Headers the encoder computes itself; overrides for these are dropped.
const RESERVED: [&str; 5] = [
    "Host",
    "Authorization",
    "Content-Length",
    "Accept-Encoding",
    "Accept-Charset",
];

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }

    /// POST and PUT carry a body together with Content-Length and Content-Type.
    pub fn sends_body(&self) -> bool {
        matches!(self, Method::Post | Method::Put)
    }
}

/// Request body: raw bytes sent verbatim, or pairs to form-encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Bytes(Vec<u8>),
    Form(Vec<(String, String)>),
}

impl Body {
    pub fn form<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Body::Form(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Serialized body bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Body::Bytes(b) => b.clone(),
            Body::Form(pairs) => form_encode(pairs).into_bytes(),
        }
    }
}

impl From<Vec<u8>> for Body {
    fn from(b: Vec<u8>) -> Self {
        Body::Bytes(b)
    }
}

impl From<&[u8]> for Body {
    fn from(b: &[u8]) -> Self {
        Body::Bytes(b.to_vec())
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::Bytes(s.into_bytes())
    }
}

impl From<&str> for Body {
    fn from(s: &str) -> Self {
        Body::Bytes(s.as_bytes().to_vec())
    }
}

/// A request built once, encoded once, then discarded.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    target: Target,
    /// Caller overrides, at most one per name ignoring case; sent with the name as supplied.
    headers: BTreeMap<String, String>,
    body: Option<Body>,
}

impl Request {
    pub fn new(method: Method, uri: &str) -> Result<Self, Error> {
        Ok(Self::with_target(method, Target::parse(uri)?))
    }

    pub fn with_target(method: Method, target: Target) -> Self {
        Self {
            method,
            target,
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn get(uri: &str) -> Result<Self, Error> {
        Self::new(Method::Get, uri)
    }

    pub fn post(uri: &str, body: impl Into<Body>) -> Result<Self, Error> {
        Ok(Self::new(Method::Post, uri)?.body(body))
    }

    pub fn put(uri: &str, body: impl Into<Body>) -> Result<Self, Error> {
        Ok(Self::new(Method::Put, uri)?.body(body))
    }

    pub fn delete(uri: &str) -> Result<Self, Error> {
        Self::new(Method::Delete, uri)
    }

    /// Add or replace a header override. A name that differs only in case replaces the
    /// earlier override. Names and values are checked when the request is encoded.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|n, _| !n.eq_ignore_ascii_case(&name));
        self.headers.insert(name, value.into());
        self
    }

    /// Set the body. Only POST and PUT send it.
    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set a form body from key/value pairs.
    pub fn form<I, K, V>(self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.body(Body::form(pairs))
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    fn header_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .unwrap_or(default)
    }

    /// Serialize to the bytes written to the socket. An override whose name is not an
    /// HTTP token, or whose value (or the configured user agent) contains CR, LF or NUL,
    /// is a `Configuration` error and nothing is encoded.
    pub fn encode(&self, config: &ClientConfig) -> Result<Vec<u8>, Error> {
        for (name, value) in &self.headers {
            check_header(name, value)?;
        }
        check_header("User-Agent", &config.user_agent)?;
        let body = match (&self.body, self.method.sends_body()) {
            (Some(body), true) => body.to_bytes(),
            (Some(_), false) => {
                log::debug!("{} does not send a body; ignoring it", self.method.as_str());
                Vec::new()
            }
            (None, _) => Vec::new(),
        };
        let mut req = format!(
            "{} {} HTTP/1.1\r\n",
            self.method.as_str(),
            self.target.request_uri()
        );
        push_header(&mut req, "Host", &self.target.host_header());
        if let Some(credentials) = self.target.basic_credentials() {
            push_header(&mut req, "Authorization", &format!("Basic {}", credentials));
        }
        push_header(&mut req, "User-Agent", self.header_or("User-Agent", &config.user_agent));
        push_header(&mut req, "Accept", self.header_or("Accept", "*/*"));
        if self.method.sends_body() {
            push_header(&mut req, "Content-Length", &body.len().to_string());
            push_header(
                &mut req,
                "Content-Type",
                self.header_or("Content-Type", DEFAULT_FORM_CONTENT_TYPE),
            );
        }
        let encodings = available_encodings();
        if !encodings.is_empty() {
            push_header(&mut req, "Accept-Encoding", &encodings.join(","));
        }
        push_header(&mut req, "Accept-Charset", "utf-8");
        for (name, value) in &self.headers {
            if is_one_of(&REPLACEABLE, name) {
                continue;
            }
            if is_one_of(&RESERVED, name) {
                log::warn!("ignoring override of computed header {}", name);
                continue;
            }
            push_header(&mut req, name, value);
        }
        req.push_str("\r\n");
        let mut out = req.into_bytes();
        out.extend_from_slice(&body);
        Ok(out)
    }
}

fn is_one_of(names: &[&str], name: &str) -> bool {
    names.iter().any(|n| n.eq_ignore_ascii_case(name))
}

/// RFC 9110 token characters.
fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

fn check_header(name: &str, value: &str) -> Result<(), Error> {
    if name.is_empty() || !name.bytes().all(is_token_byte) {
        return Err(Error::Configuration(format!("invalid header name {:?}", name)));
    }
    if value.bytes().any(|b| matches!(b, b'\r' | b'\n' | 0)) {
        return Err(Error::Configuration(format!("invalid value for header {}", name)));
    }
    Ok(())
}

fn push_header(req: &mut String, name: &str, value: &str) {
    req.push_str(name);
    req.push_str(": ");
    req.push_str(value);
    req.push_str("\r\n");
}
