/*
 * number.rs
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

//! JSON number value as recognized by the tokenizer.

/// A JSON number: signed integer, unsigned integer too large for `i64`, or float.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JsonNumber {
    I64(i64),
    U64(u64),
    F64(f64),
}

impl JsonNumber {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            JsonNumber::I64(n) => Some(*n),
            JsonNumber::U64(n) => i64::try_from(*n).ok(),
            JsonNumber::F64(f) => {
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                    Some(*f as i64)
                } else {
                    None
                }
            }
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            JsonNumber::I64(n) => *n as f64,
            JsonNumber::U64(n) => *n as f64,
            JsonNumber::F64(f) => *f,
        }
    }
}

impl From<JsonNumber> for serde_json::Value {
    /// The tokenizer never produces non-finite floats, so no number is lost here;
    /// a non-finite value would map to `Null` the same way serde_json does.
    fn from(n: JsonNumber) -> Self {
        match n {
            JsonNumber::I64(i) => serde_json::Value::from(i),
            JsonNumber::U64(u) => serde_json::Value::from(u),
            JsonNumber::F64(f) => serde_json::Value::from(f),
        }
    }
}
