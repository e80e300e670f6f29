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

//! Incremental JSON: push tokenizer, event handler, value builder and the
//! `StreamParser` implementation the HTTP engine feeds.

pub mod error;
pub mod handler;
pub mod number;
pub mod parser;
pub mod stream;
pub mod value;

pub use error::JsonError;
pub use handler::JsonContentHandler;
pub use number::JsonNumber;
pub use parser::JsonParser;
pub use stream::JsonStreamParser;
pub use value::ValueBuilder;
