/*
 * config.rs
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

//! Client configuration: immutable values handed to `HttpClient` and `Session`.
//! Nothing here is global, so tests can substitute their own allow-list or user agent.

use std::time::Duration;

/// Media types accepted when no allow-list is configured.
pub const DEFAULT_MIME_TYPES: [&str; 2] = ["application/json", "text/plain"];

/// User-Agent sent unless the request overrides it.
pub const DEFAULT_USER_AGENT: &str = concat!("ruscello/", env!("CARGO_PKG_VERSION"));

/// TCP connect timeout applied by default.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Options passed through untouched to the incremental parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserOptions {
    /// Accept several concatenated root values (event feeds). When false, anything
    /// after the first root value is a parse error.
    pub allow_multiple_values: bool,
    /// Maximum nesting of objects and arrays.
    pub max_depth: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            allow_multiple_values: true,
            max_depth: 512,
        }
    }
}

/// Per-client settings. Build with `ClientConfig::default()` and the `with_*` methods.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub allowed_mime_types: Vec<String>,
    pub user_agent: String,
    /// `None` leaves the platform as the only timeout authority.
    pub connect_timeout: Option<Duration>,
    pub parser: ParserOptions,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            allowed_mime_types: DEFAULT_MIME_TYPES.iter().map(|s| s.to_string()).collect(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
            parser: ParserOptions::default(),
        }
    }
}

impl ClientConfig {
    pub fn with_allowed_mime_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_mime_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_parser_options(mut self, options: ParserOptions) -> Self {
        self.parser = options;
        self
    }

    /// True if `media_type` (already stripped of parameters) is in the allow-list.
    /// Media types compare case-insensitively.
    pub fn allows(&self, media_type: &str) -> bool {
        self.allowed_mime_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(media_type))
    }
}

/// Compression codecs compiled into this build, in the order advertised in Accept-Encoding.
pub fn available_encodings() -> Vec<&'static str> {
    let mut encodings = Vec::new();
    if cfg!(feature = "bzip2") {
        encodings.push("bzip2");
    }
    if cfg!(feature = "gzip") {
        encodings.push("gzip");
    }
    if cfg!(feature = "deflate") {
        encodings.push("deflate");
    }
    encodings
}
