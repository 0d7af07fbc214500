/*
 * response.rs
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

//! HTTP response, and the framing of it into wire bytes.

use bytes::{BufMut, BytesMut};

fn reason_phrase(code: u16) -> &'static str {
    match code {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    pub code: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(code: u16) -> Self {
        Self { code, headers: Vec::new(), body: Vec::new() }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn json(code: u16, body: Vec<u8>) -> Self {
        Self::new(code).with_header("Content-Type", "application/json").with_body(body)
    }

    pub fn with_cors(self) -> Self {
        self.with_header("Access-Control-Allow-Origin", "*")
            .with_header("Access-Control-Allow-Headers", "Authorization, Content-Type")
            .with_header("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS")
    }

    /// Frame this response as HTTP/1.1 wire bytes. `keep_alive` decides the
    /// `Connection:` header written; `Content-Length` is always synthesized
    /// from the body regardless of whatever caller-supplied headers exist.
    pub fn frame(&self, keep_alive: bool) -> BytesMut {
        let mut out = BytesMut::new();
        out.put_slice(format!("HTTP/1.1 {} {}\r\n", self.code, reason_phrase(self.code)).as_bytes());
        for (name, value) in &self.headers {
            out.put_slice(format!("{}: {}\r\n", name, value).as_bytes());
        }
        out.put_slice(format!("Content-Length: {}\r\n", self.body.len()).as_bytes());
        out.put_slice(format!("Connection: {}\r\n", if keep_alive { "keep-alive" } else { "close" }).as_bytes());
        out.put_slice(b"\r\n");
        out.put_slice(&self.body);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_includes_synthesized_content_length() {
        let resp = Response::json(200, b"{\"ok\":true}".to_vec());
        let framed = resp.frame(true);
        let text = String::from_utf8_lossy(&framed);
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Length: 11\r\n"));
        assert!(text.contains("Connection: keep-alive\r\n"));
        assert!(text.ends_with("{\"ok\":true}"));
    }

    #[test]
    fn frame_reports_close_when_requested() {
        let resp = Response::new(204);
        let framed = resp.frame(false);
        assert!(String::from_utf8_lossy(&framed).contains("Connection: close\r\n"));
    }
}
