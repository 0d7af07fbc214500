/*
 * mod.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Tagliacarte, a cross-platform email client.
 *
 * Tagliacarte is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Tagliacarte is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Tagliacarte.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Hand-rolled JSON: a push-model tokenizing parser, an incremental writer, and a
//! small DOM (`JsonValue`) built on both for handlers that want to index by key.

mod error;
mod handler;
mod indent;
mod number;
mod parser;
mod value;
mod writer;

pub use error::JsonError;
pub use handler::JsonContentHandler;
pub use indent::IndentConfig;
pub use number::JsonNumber;
pub use parser::JsonParser;
pub use value::JsonValue;
pub use writer::JsonWriter;
