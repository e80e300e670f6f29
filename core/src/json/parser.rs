/*
 * parser.rs
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

//! Push-model JSON parser: feed bytes via `receive()`, get events on a handler.
//!
//! # Buffer management contract
//!
//! The parser consumes only **complete** tokens from the buffer. Incomplete tokens
//! (e.g. a string whose closing `"` has not yet arrived, or a partial number) are
//! **left in the buffer**; the parser advances zero bytes and returns.
//!
//! The caller must keep unconsumed bytes at the front of the buffer and append new
//! data after them before the next `receive()`. `BytesMut` does this naturally:
//! `receive()` advances past what it consumed, so `extend_from_slice` is enough.
//!
//! A long string is the one token that may stay incomplete across many calls. Its
//! decoded prefix is kept in the parser, so the next `receive()` resumes where the
//! previous one stopped instead of decoding the whole string again.
//!
//! Several root values may follow each other in one stream (`{..} {..} [..]`),
//! which is how event feeds are delivered. `end_value()` fires after each one.

use bytes::Buf;
use bytes::BytesMut;

use crate::config::ParserOptions;
use crate::json::error::JsonError;
use crate::json::handler::JsonContentHandler;
use crate::json::number::JsonNumber;

/// Context for the parser (inside object vs array).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Object,
    Array,
}

/// What we expect next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Value,
    Key,
    Colon,
    AfterValue,
}

/// Decoded prefix of a string whose closing quote has not arrived.
#[derive(Debug, Default)]
struct PartialString {
    /// Bytes from the opening quote already decoded into `text`.
    scanned: usize,
    text: String,
    /// Decode steps taken over the parser's lifetime.
    #[cfg(test)]
    steps: usize,
}

impl PartialString {
    fn clear(&mut self) {
        self.scanned = 0;
        self.text.clear();
    }
}

/// Push-model JSON parser. Push bytes with `receive()`; call `close()` at end of input.
pub struct JsonParser {
    bom_checked: bool,
    closed: bool,
    context_stack: Vec<Context>,
    expect: Expect,
    after_comma: bool,
    allow_multiple_values: bool,
    max_depth: usize,
    /// String token at the front of the buffer, when it was left incomplete.
    string: PartialString,
    /// Bytes consumed since construction or reset.
    offset: u64,
}

impl JsonParser {
    pub fn new() -> Self {
        Self::with_options(&ParserOptions::default())
    }

    pub fn with_options(options: &ParserOptions) -> Self {
        Self {
            bom_checked: false,
            closed: false,
            context_stack: Vec::new(),
            expect: Expect::Value,
            after_comma: false,
            allow_multiple_values: options.allow_multiple_values,
            max_depth: options.max_depth,
            string: PartialString::default(),
            offset: 0,
        }
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Push bytes into the parser. Events are delivered to the handler as complete
    /// tokens are recognized. Incomplete tokens are left in the buffer.
    pub fn receive<H: JsonContentHandler + ?Sized>(
        &mut self,
        buf: &mut BytesMut,
        handler: &mut H,
    ) -> Result<(), JsonError> {
        if self.closed {
            return Err(JsonError::new("cannot receive after close"));
        }
        self.drain(buf, handler)
    }

    /// Signal end of input: parse whatever is left in `buf` as final and check that
    /// no structure is left open. Empty input is valid and yields no values.
    pub fn close<H: JsonContentHandler + ?Sized>(
        &mut self,
        buf: &mut BytesMut,
        handler: &mut H,
    ) -> Result<(), JsonError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.drain(buf, handler)?;
        if !buf.is_empty() {
            return Err(JsonError::new("incomplete token at end of input").at(self.offset));
        }
        if !self.context_stack.is_empty() || self.expect == Expect::Colon {
            return Err(JsonError::new("unclosed structure").at(self.offset));
        }
        Ok(())
    }

    /// Reset for parsing a new stream. Options are kept.
    pub fn reset(&mut self) {
        self.bom_checked = false;
        self.closed = false;
        self.context_stack.clear();
        self.expect = Expect::Value;
        self.after_comma = false;
        self.string.clear();
        self.offset = 0;
    }

    fn drain<H: JsonContentHandler + ?Sized>(
        &mut self,
        buf: &mut BytesMut,
        handler: &mut H,
    ) -> Result<(), JsonError> {
        if buf.is_empty() {
            return Ok(());
        }
        if !self.bom_checked {
            if buf.len() >= 3 && buf[..3] == [0xef, 0xbb, 0xbf] {
                buf.advance(3);
                self.offset += 3;
            } else if buf[0] == 0xef && buf.len() < 3 && !self.closed {
                // Might be a partial BOM; wait for more data
                return Ok(());
            }
            self.bom_checked = true;
        }
        while !buf.is_empty() {
            let offset = self.offset;
            let consumed = match self.parse_one(buf, handler).map_err(|e| e.at(offset))? {
                Some(n) => n,
                None => return Ok(()),
            };
            buf.advance(consumed);
            self.offset += consumed as u64;
        }
        Ok(())
    }

    /// A value (scalar or closed container) just completed.
    fn value_done<H: JsonContentHandler + ?Sized>(&mut self, handler: &mut H) {
        self.expect = Expect::AfterValue;
        self.after_comma = false;
        if self.context_stack.is_empty() {
            handler.end_value();
        }
    }

    fn open<H: JsonContentHandler + ?Sized>(
        &mut self,
        context: Context,
        handler: &mut H,
    ) -> Result<Option<usize>, JsonError> {
        if self.expect != Expect::Value {
            return Err(JsonError::new(match context {
                Context::Object => "unexpected '{'",
                Context::Array => "unexpected '['",
            }));
        }
        if self.context_stack.len() >= self.max_depth {
            return Err(JsonError::new("maximum nesting depth exceeded"));
        }
        match context {
            Context::Object => {
                handler.start_object();
                self.expect = Expect::Key;
            }
            Context::Array => {
                handler.start_array();
                self.expect = Expect::Value;
            }
        }
        self.context_stack.push(context);
        self.after_comma = false;
        Ok(Some(1))
    }

    /// Parse one token from the front of `data`. Returns bytes consumed, or None if need more data.
    fn parse_one<H: JsonContentHandler + ?Sized>(
        &mut self,
        data: &[u8],
        handler: &mut H,
    ) -> Result<Option<usize>, JsonError> {
        let b = data[0];
        if self.context_stack.is_empty() && self.expect == Expect::AfterValue && !is_whitespace(b)
        {
            if !self.allow_multiple_values {
                return Err(JsonError::new("trailing data after root value"));
            }
            self.expect = Expect::Value;
        }
        match b {
            b'{' => self.open(Context::Object, handler),
            b'[' => self.open(Context::Array, handler),
            b'}' => {
                if self.context_stack.last() != Some(&Context::Object)
                    || (self.expect != Expect::Key && self.expect != Expect::AfterValue)
                {
                    return Err(JsonError::new("unexpected '}'"));
                }
                if self.after_comma {
                    return Err(JsonError::new("trailing comma before '}'"));
                }
                handler.end_object();
                self.context_stack.pop();
                self.value_done(handler);
                Ok(Some(1))
            }
            b']' => {
                if self.context_stack.last() != Some(&Context::Array)
                    || (self.expect != Expect::Value && self.expect != Expect::AfterValue)
                {
                    return Err(JsonError::new("unexpected ']'"));
                }
                if self.after_comma {
                    return Err(JsonError::new("trailing comma before ']'"));
                }
                handler.end_array();
                self.context_stack.pop();
                self.value_done(handler);
                Ok(Some(1))
            }
            b',' => {
                if self.expect != Expect::AfterValue || self.context_stack.is_empty() {
                    return Err(JsonError::new("unexpected ','"));
                }
                self.after_comma = true;
                self.expect = if self.context_stack.last() == Some(&Context::Object) {
                    Expect::Key
                } else {
                    Expect::Value
                };
                Ok(Some(1))
            }
            b':' => {
                if self.expect != Expect::Colon {
                    return Err(JsonError::new("unexpected ':'"));
                }
                self.expect = Expect::Value;
                Ok(Some(1))
            }
            b' ' | b'\t' | b'\n' | b'\r' => Ok(Some(skip_whitespace(data))),
            b'"' => {
                if self.expect == Expect::Colon || self.expect == Expect::AfterValue {
                    return Err(JsonError::new("unexpected string"));
                }
                let is_key = self.expect == Expect::Key;
                let (consumed, s) = match parse_string(data, self.closed, &mut self.string)? {
                    Some(parsed) => parsed,
                    None => return Ok(None),
                };
                if is_key {
                    handler.key(&s);
                    self.expect = Expect::Colon;
                    self.after_comma = false;
                } else {
                    handler.string_value(&s);
                    self.value_done(handler);
                }
                Ok(Some(consumed))
            }
            b't' | b'f' | b'n' => {
                if self.expect != Expect::Value {
                    return Err(JsonError::new("unexpected literal"));
                }
                let literal: &[u8] = match b {
                    b't' => b"true",
                    b'f' => b"false",
                    _ => b"null",
                };
                let n = match parse_literal(data, literal, self.closed)? {
                    Some(n) => n,
                    None => return Ok(None),
                };
                match b {
                    b't' => handler.boolean_value(true),
                    b'f' => handler.boolean_value(false),
                    _ => handler.null_value(),
                }
                self.value_done(handler);
                Ok(Some(n))
            }
            b'-' | b'0'..=b'9' => {
                if self.expect != Expect::Value {
                    return Err(JsonError::new("unexpected number"));
                }
                let (n, num) = match parse_number(data, self.closed)? {
                    Some(parsed) => parsed,
                    None => return Ok(None),
                };
                handler.number_value(num);
                self.value_done(handler);
                Ok(Some(n))
            }
            _ => Err(JsonError::new(format!("unexpected character: {}", b as char))),
        }
    }
}

impl Default for JsonParser {
    fn default() -> Self {
        Self::new()
    }
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

fn skip_whitespace(data: &[u8]) -> usize {
    data.iter().take_while(|b| is_whitespace(**b)).count()
}

/// Parse a JSON string starting at data[0] (opening quote), resuming after the prefix
/// already decoded into `partial`. Returns Some((consumed, unescaped string)), or None
/// when more data is needed; `partial` then holds everything decoded so far. An escape
/// or multi-byte character cut off at the end of `data` is decoded again next time.
fn parse_string(
    data: &[u8],
    closed: bool,
    partial: &mut PartialString,
) -> Result<Option<(usize, String)>, JsonError> {
    match scan_string(data, closed, partial) {
        Ok(Some(i)) => {
            partial.scanned = 0;
            Ok(Some((i, std::mem::take(&mut partial.text))))
        }
        Ok(None) if !closed => Ok(None),
        Ok(None) => {
            partial.clear();
            Err(JsonError::new("unclosed string"))
        }
        Err(e) => {
            partial.clear();
            Err(e)
        }
    }
}

/// Decode from `partial.scanned` towards the closing quote. Some(consumed) when the
/// string is complete; None when `data` ends first.
fn scan_string(data: &[u8], closed: bool, partial: &mut PartialString) -> Result<Option<usize>, JsonError> {
    let mut i = partial.scanned.max(1);
    while i < data.len() {
        #[cfg(test)]
        {
            partial.steps += 1;
        }
        let b = data[i];
        if b == b'"' {
            return Ok(Some(i + 1));
        }
        if b == b'\\' {
            let (adv, ch) = match parse_escape(&data[i + 1..], closed)? {
                Some(escaped) => escaped,
                None => break,
            };
            partial.text.push(ch);
            i += 1 + adv;
            continue;
        }
        if b < 0x20 {
            return Err(JsonError::new("unescaped control character in string"));
        }
        if b < 0x80 {
            partial.text.push(b as char);
            i += 1;
            continue;
        }
        let len = match b {
            0xc0..=0xdf => 2,
            0xe0..=0xef => 3,
            0xf0..=0xf7 => 4,
            _ => return Err(JsonError::new("invalid UTF-8 in string")),
        };
        if i + len > data.len() {
            break;
        }
        let s = std::str::from_utf8(&data[i..i + len])
            .map_err(|e| JsonError::with_source("invalid UTF-8 in string", e))?;
        partial.text.push_str(s);
        i += len;
    }
    partial.scanned = i;
    Ok(None)
}

fn parse_hex4(data: &[u8]) -> Result<u32, JsonError> {
    let hex = std::str::from_utf8(data).map_err(|_| JsonError::new("invalid \\u escape"))?;
    u32::from_str_radix(hex, 16).map_err(|e| JsonError::with_source("invalid \\u hex", e))
}

/// Parse escape sequence after `\`. Returns Some((bytes consumed, char)), None = need more data.
/// A high surrogate must be followed by `\u` and a low surrogate.
fn parse_escape(data: &[u8], closed: bool) -> Result<Option<(usize, char)>, JsonError> {
    let Some(&c) = data.first() else {
        return Ok(None);
    };
    let ch = match c {
        b'"' => '"',
        b'\\' => '\\',
        b'/' => '/',
        b'b' => '\u{8}',
        b'f' => '\u{c}',
        b'n' => '\n',
        b'r' => '\r',
        b't' => '\t',
        b'u' => {
            if data.len() < 5 {
                return if closed {
                    Err(JsonError::new("incomplete \\u escape"))
                } else {
                    Ok(None)
                };
            }
            let u = parse_hex4(&data[1..5])?;
            if !(0xd800..=0xdbff).contains(&u) {
                let ch = char::from_u32(u)
                    .ok_or_else(|| JsonError::new("invalid Unicode code point"))?;
                return Ok(Some((5, ch)));
            }
            if data.len() < 11 {
                return if closed {
                    Err(JsonError::new("unpaired surrogate"))
                } else {
                    Ok(None)
                };
            }
            if data[5] != b'\\' || data[6] != b'u' {
                return Err(JsonError::new("unpaired surrogate"));
            }
            let low = parse_hex4(&data[7..11])?;
            if !(0xdc00..=0xdfff).contains(&low) {
                return Err(JsonError::new("invalid low surrogate"));
            }
            let code = 0x10000 + ((u - 0xd800) << 10) + (low - 0xdc00);
            let ch = char::from_u32(code)
                .ok_or_else(|| JsonError::new("invalid Unicode code point"))?;
            return Ok(Some((11, ch)));
        }
        _ => return Err(JsonError::new(format!("invalid escape: \\{}", c as char))),
    };
    Ok(Some((1, ch)))
}

/// Check a literal (`true`, `false`, `null`) at the front of data. Returns Some(consumed) when complete.
fn parse_literal(data: &[u8], literal: &[u8], closed: bool) -> Result<Option<usize>, JsonError> {
    let available = data.len().min(literal.len());
    if data[..available] != literal[..available] {
        return Err(JsonError::new("invalid literal"));
    }
    if available < literal.len() {
        if closed {
            return Err(JsonError::new("incomplete literal"));
        }
        return Ok(None);
    }
    Ok(Some(literal.len()))
}

/// Parse number. Returns Some((consumed, JsonNumber)) when complete. A number touching the
/// end of the buffer is incomplete unless the input is closed.
fn parse_number(data: &[u8], closed: bool) -> Result<Option<(usize, JsonNumber)>, JsonError> {
    let digits = |from: usize| from + data[from..].iter().take_while(|b| b.is_ascii_digit()).count();
    let need_more = || {
        if closed {
            Err(JsonError::new("incomplete number"))
        } else {
            Ok(None)
        }
    };
    let mut i = 0;
    if data[i] == b'-' {
        i += 1;
        if i >= data.len() {
            return need_more();
        }
    }
    match data[i] {
        b'0' => {
            i += 1;
            if i < data.len() && data[i].is_ascii_digit() {
                return Err(JsonError::new("numbers cannot have leading zeros"));
            }
        }
        b'1'..=b'9' => i = digits(i),
        _ => return Err(JsonError::new("invalid number")),
    }
    let mut is_float = false;
    if i < data.len() && data[i] == b'.' {
        is_float = true;
        i += 1;
        if i >= data.len() {
            return need_more();
        }
        if !data[i].is_ascii_digit() {
            return Err(JsonError::new("decimal point must be followed by digit"));
        }
        i = digits(i);
    }
    if i < data.len() && (data[i] == b'e' || data[i] == b'E') {
        is_float = true;
        i += 1;
        if i < data.len() && (data[i] == b'+' || data[i] == b'-') {
            i += 1;
        }
        if i >= data.len() {
            return need_more();
        }
        if !data[i].is_ascii_digit() {
            return Err(JsonError::new("exponent must have digit"));
        }
        i = digits(i);
    }
    if i >= data.len() && !closed {
        return Ok(None);
    }
    let s = std::str::from_utf8(&data[..i]).map_err(|_| JsonError::new("invalid UTF-8 in number"))?;
    let num = if is_float {
        let f: f64 = s.parse().map_err(|e| JsonError::with_source("invalid number", e))?;
        if !f.is_finite() {
            return Err(JsonError::new("number out of range"));
        }
        JsonNumber::F64(f)
    } else if let Ok(n) = s.parse::<i64>() {
        JsonNumber::I64(n)
    } else if let Ok(n) = s.parse::<u64>() {
        JsonNumber::U64(n)
    } else {
        let f: f64 = s.parse().map_err(|e| JsonError::with_source("invalid number", e))?;
        JsonNumber::F64(f)
    };
    Ok(Some((i, num)))
}
