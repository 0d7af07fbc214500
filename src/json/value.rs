/*
 * value.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Tagliacarte.
 *
 * Tagliacarte is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This file is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this file.  If not, see <http://www.gnu.org/licenses/>.
 */

//! A DOM-style value tree built on top of the push parser/writer, for handlers
//! that want `value["key"].as_str()` rather than driving `JsonContentHandler` by hand.

use std::collections::BTreeMap;

use bytes::BytesMut;

use crate::json::error::JsonError;
use crate::json::handler::JsonContentHandler;
use crate::json::number::JsonNumber;
use crate::json::parser::JsonParser;
use crate::json::writer::JsonWriter;

#[derive(Debug, Clone, PartialEq)]
pub enum JsonValue {
    Null,
    Bool(bool),
    Number(JsonNumber),
    String(String),
    Array(Vec<JsonValue>),
    Object(BTreeMap<String, JsonValue>),
}

impl JsonValue {
    pub fn object() -> Self {
        JsonValue::Object(BTreeMap::new())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            JsonValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            JsonValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            JsonValue::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[JsonValue]> {
        match self {
            JsonValue::Array(a) => Some(a.as_slice()),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        match self {
            JsonValue::Object(m) => m.get(key),
            _ => None,
        }
    }

    /// Field lookup with a fallback when absent or JSON null, matching the reference
    /// parser's treatment of an omitted field and an explicit `null` as the same thing.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(JsonValue::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key) {
            Some(JsonValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: JsonValue) {
        if let JsonValue::Object(m) = self {
            m.insert(key.into(), value);
        }
    }

    pub fn from_str(s: impl Into<String>) -> Self {
        JsonValue::String(s.into())
    }

    pub fn from_i64(n: i64) -> Self {
        JsonValue::Number(JsonNumber::I64(n))
    }

    /// Parse a complete JSON document from a byte slice (the body has already been
    /// fully buffered by the HTTP codec, so no incremental feed is needed here).
    pub fn parse(bytes: &[u8]) -> Result<JsonValue, JsonError> {
        let mut parser = JsonParser::new();
        let mut builder = TreeBuilder::default();
        let mut buf = BytesMut::from(bytes);
        parser.receive(&mut buf, &mut builder)?;
        parser.close(&mut builder)?;
        builder.finish()
    }

    /// Serialize to a compact JSON byte string.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = JsonWriter::new();
        write_value(&mut w, self);
        w.take_buffer().to_vec()
    }
}

fn write_value(w: &mut JsonWriter, v: &JsonValue) {
    match v {
        JsonValue::Null => w.write_null(),
        JsonValue::Bool(b) => w.write_bool(*b),
        JsonValue::Number(n) => w.write_number(*n),
        JsonValue::String(s) => w.write_string(s),
        JsonValue::Array(items) => {
            w.write_start_array();
            for item in items {
                write_value(w, item);
            }
            w.write_end_array();
        }
        JsonValue::Object(map) => {
            w.write_start_object();
            for (k, val) in map {
                w.write_key(k);
                write_value(w, val);
            }
            w.write_end_object();
        }
    }
}

/// Builds a `JsonValue` tree from parser events.
#[derive(Default)]
struct TreeBuilder {
    /// Stack of (pending key, in-progress container).
    stack: Vec<(Option<String>, JsonValue)>,
    pending_key: Option<String>,
    root: Option<JsonValue>,
    error: Option<String>,
}

impl TreeBuilder {
    fn finish(mut self) -> Result<JsonValue, JsonError> {
        if let Some(e) = self.error.take() {
            return Err(JsonError::new(e));
        }
        self.root.ok_or_else(|| JsonError::new("empty document"))
    }

    /// Place a freshly-completed value into whatever container is on top of
    /// the stack (or set it as the document root). `assoc_key` is the key
    /// this value was parsed under, if its parent is an object.
    fn place(&mut self, value: JsonValue, assoc_key: Option<String>) {
        if let Some((_, parent)) = self.stack.last_mut() {
            match parent {
                JsonValue::Array(items) => items.push(value),
                JsonValue::Object(map) => {
                    if let Some(key) = assoc_key {
                        map.insert(key, value);
                    } else {
                        self.error = Some("object value without key".to_string());
                    }
                }
                _ => unreachable!("container stack entries are always array/object"),
            }
        } else {
            self.root = Some(value);
        }
    }
}

impl JsonContentHandler for TreeBuilder {
    fn start_object(&mut self) {
        let key = self.pending_key.take();
        self.stack.push((key, JsonValue::Object(BTreeMap::new())));
    }

    fn end_object(&mut self) {
        if let Some((key, v)) = self.stack.pop() {
            self.place(v, key);
        }
    }

    fn start_array(&mut self) {
        let key = self.pending_key.take();
        self.stack.push((key, JsonValue::Array(Vec::new())));
    }

    fn end_array(&mut self) {
        if let Some((key, v)) = self.stack.pop() {
            self.place(v, key);
        }
    }

    fn number_value(&mut self, number: JsonNumber) {
        let key = self.pending_key.take();
        self.place(JsonValue::Number(number), key);
    }

    fn string_value(&mut self, value: &str) {
        let key = self.pending_key.take();
        self.place(JsonValue::String(value.to_string()), key);
    }

    fn boolean_value(&mut self, value: bool) {
        let key = self.pending_key.take();
        self.place(JsonValue::Bool(value), key);
    }

    fn null_value(&mut self) {
        let key = self.pending_key.take();
        self.place(JsonValue::Null, key);
    }

    fn key(&mut self, key: &str) {
        self.pending_key = Some(key.to_string());
    }
}
