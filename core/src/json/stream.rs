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

//! `StreamParser` over the push tokenizer: bytes in, one `serde_json::Value` out per root value.

use bytes::BytesMut;
use serde_json::Value;

use crate::config::ParserOptions;
use crate::json::error::JsonError;
use crate::json::parser::JsonParser;
use crate::json::value::ValueBuilder;
use crate::stream::StreamParser;

pub struct JsonStreamParser {
    parser: JsonParser,
    builder: ValueBuilder,
    /// Bytes of a token that has not completed yet.
    pending: BytesMut,
}

impl JsonStreamParser {
    pub fn new(options: &ParserOptions) -> Self {
        Self {
            parser: JsonParser::with_options(options),
            builder: ValueBuilder::new(),
            pending: BytesMut::with_capacity(8192),
        }
    }

    /// Values completed before an error are still delivered.
    fn deliver(&mut self, result: Result<(), JsonError>, emit: &mut dyn FnMut(Value)) -> Result<(), JsonError> {
        for value in self.builder.drain() {
            emit(value);
        }
        result
    }
}

impl Default for JsonStreamParser {
    fn default() -> Self {
        Self::new(&ParserOptions::default())
    }
}

impl StreamParser for JsonStreamParser {
    type Value = Value;
    type Error = JsonError;

    fn feed(&mut self, data: &[u8], emit: &mut dyn FnMut(Value)) -> Result<(), JsonError> {
        self.pending.extend_from_slice(data);
        let result = self.parser.receive(&mut self.pending, &mut self.builder);
        self.deliver(result, emit)
    }

    fn finish(&mut self, emit: &mut dyn FnMut(Value)) -> Result<(), JsonError> {
        let result = self.parser.close(&mut self.pending, &mut self.builder);
        self.deliver(result, emit)
    }
}
