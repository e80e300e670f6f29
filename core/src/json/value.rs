/*
 * value.rs
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

//! Builds `serde_json::Value` trees from parser events, one per root value.

use std::collections::VecDeque;

use serde_json::{Map, Value};

use crate::json::handler::JsonContentHandler;
use crate::json::number::JsonNumber;

enum Frame {
    Object(Map<String, Value>, Option<String>),
    Array(Vec<Value>),
}

/// JsonContentHandler that assembles values and queues each completed root value.
#[derive(Default)]
pub struct ValueBuilder {
    stack: Vec<Frame>,
    /// Root value being assembled (scalars land here directly).
    root: Option<Value>,
    completed: VecDeque<Value>,
}

impl ValueBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pop the oldest completed root value.
    pub fn next_value(&mut self) -> Option<Value> {
        self.completed.pop_front()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = Value> + '_ {
        self.completed.drain(..)
    }

    fn push_value(&mut self, value: Value) {
        match self.stack.last_mut() {
            Some(Frame::Object(map, key)) => {
                // The parser guarantees a key precedes every object member.
                if let Some(k) = key.take() {
                    map.insert(k, value);
                }
            }
            Some(Frame::Array(items)) => items.push(value),
            None => self.root = Some(value),
        }
    }
}

impl JsonContentHandler for ValueBuilder {
    fn start_object(&mut self) {
        self.stack.push(Frame::Object(Map::new(), None));
    }

    fn end_object(&mut self) {
        if let Some(Frame::Object(map, _)) = self.stack.pop() {
            self.push_value(Value::Object(map));
        }
    }

    fn start_array(&mut self) {
        self.stack.push(Frame::Array(Vec::new()));
    }

    fn end_array(&mut self) {
        if let Some(Frame::Array(items)) = self.stack.pop() {
            self.push_value(Value::Array(items));
        }
    }

    fn key(&mut self, key: &str) {
        if let Some(Frame::Object(_, pending)) = self.stack.last_mut() {
            *pending = Some(key.to_string());
        }
    }

    fn number_value(&mut self, number: JsonNumber) {
        self.push_value(number.into());
    }

    fn string_value(&mut self, value: &str) {
        self.push_value(Value::String(value.to_string()));
    }

    fn boolean_value(&mut self, value: bool) {
        self.push_value(Value::Bool(value));
    }

    fn null_value(&mut self) {
        self.push_value(Value::Null);
    }

    fn end_value(&mut self) {
        if let Some(v) = self.root.take() {
            self.completed.push_back(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::parser::JsonParser;
    use bytes::BytesMut;
    use serde_json::json;

    #[test]
    fn builds_nested_values_in_order() {
        let mut p = JsonParser::new();
        let mut b = ValueBuilder::new();
        let mut buf = BytesMut::from(&br#"{"a":{"b":[1,2.5,"x"]},"c":null} [true] "s""#[..]);
        p.receive(&mut buf, &mut b).unwrap();
        p.close(&mut buf, &mut b).unwrap();
        let values: Vec<Value> = b.drain().collect();
        assert_eq!(
            values,
            vec![json!({"a": {"b": [1, 2.5, "x"]}, "c": null}), json!([true]), json!("s")]
        );
    }

    #[test]
    fn value_not_released_until_complete() {
        let mut p = JsonParser::new();
        let mut b = ValueBuilder::new();
        let mut buf = BytesMut::from(&br#"{"a":[1,"#[..]);
        p.receive(&mut buf, &mut b).unwrap();
        assert!(b.next_value().is_none());
        buf.extend_from_slice(b"2]}");
        p.receive(&mut buf, &mut b).unwrap();
        assert_eq!(b.next_value(), Some(json!({"a": [1, 2]})));
    }
}
