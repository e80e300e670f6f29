/*
 * dispatch.rs
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

//! Body bytes to values: undo the content encoding, push into the parser, and let the
//! parser call back once per completed value. Nothing is buffered here.

use crate::error::Error;
use crate::protocol::http::codec::BodyDecoder;
use crate::stream::{parse_error, StreamParser};

pub struct Dispatch<'a, P, F>
where
    P: StreamParser,
    F: FnMut(P::Value),
{
    parser: &'a mut P,
    decoder: BodyDecoder,
    on_value: &'a mut F,
    fed: u64,
}

impl<'a, P, F> Dispatch<'a, P, F>
where
    P: StreamParser,
    F: FnMut(P::Value),
{
    pub fn new(parser: &'a mut P, decoder: BodyDecoder, on_value: &'a mut F) -> Self {
        Self {
            parser,
            decoder,
            on_value,
            fed: 0,
        }
    }

    /// Raw (still encoded) body bytes, in wire order.
    pub fn feed(&mut self, raw: &[u8]) -> Result<(), Error> {
        let parser = &mut *self.parser;
        let on_value = &mut *self.on_value;
        let fed = &mut self.fed;
        self.decoder.decode(raw, &mut |decoded: &[u8]| {
            *fed += decoded.len() as u64;
            parser.feed(decoded, &mut *on_value).map_err(parse_error)
        })
    }

    /// End of body: flush the codec, then let the parser emit any trailing value.
    pub fn finish(mut self) -> Result<u64, Error> {
        let parser = &mut *self.parser;
        let on_value = &mut *self.on_value;
        let fed = &mut self.fed;
        self.decoder.finish(&mut |decoded: &[u8]| {
            *fed += decoded.len() as u64;
            parser.feed(decoded, &mut *on_value).map_err(parse_error)
        })?;
        self.parser.finish(&mut *self.on_value).map_err(parse_error)?;
        Ok(self.fed)
    }
}
