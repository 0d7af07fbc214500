/*
 * parser.rs
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

//! Streaming HTTP/1.1 request parser: tolerant of the request arriving in
//! arbitrary chunks across multiple `receive` calls. `BytesMut`'s amortized
//! growth plays the role of the reference's resizable byte buffer that
//! doubles capacity on overflow.

use bytes::BytesMut;

use crate::error::HttpParseError;
use crate::http::request::{Method, ParsedRequest, MAX_HEADERS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Headers,
    Body,
}

pub struct RequestParser {
    state: ParseState,
    method: Method,
    path: String,
    query: String,
    headers: Vec<(String, String)>,
    content_length: usize,
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestParser {
    pub fn new() -> Self {
        Self {
            state: ParseState::Headers,
            method: Method::Unknown,
            path: String::new(),
            query: String::new(),
            headers: Vec::new(),
            content_length: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn find_header_terminator(buf: &[u8]) -> Option<usize> {
        buf.windows(4).position(|w| w == b"\r\n\r\n")
    }

    fn parse_request_line(line: &str) -> Result<(Method, String, String), HttpParseError> {
        let mut parts = line.splitn(3, ' ');
        let method_s = parts.next().ok_or(HttpParseError::BadRequestLine)?;
        let target = parts.next().ok_or(HttpParseError::BadRequestLine)?;
        let _version = parts.next().ok_or(HttpParseError::BadRequestLine)?;
        let method = Method::parse(method_s);
        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p.to_string(), q.to_string()),
            None => (target.to_string(), String::new()),
        };
        Ok((method, path, query))
    }

    fn parse_headers(&mut self, text: &str) -> Result<(), HttpParseError> {
        let mut lines = text.split("\r\n");
        let request_line = lines.next().ok_or(HttpParseError::BadRequestLine)?;
        let (method, path, query) = Self::parse_request_line(request_line)?;
        self.method = method;
        self.path = path;
        self.query = query;

        for line in lines {
            if line.is_empty() {
                continue;
            }
            if self.headers.len() >= MAX_HEADERS {
                continue;
            }
            if let Some((name, value)) = line.split_once(':') {
                self.headers.push((name.trim().to_string(), value.trim().to_string()));
            }
        }

        self.content_length = self
            .headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, v)| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        Ok(())
    }

    /// Feed newly-read bytes. Returns a complete request once the full body
    /// (if any) has accumulated; otherwise `None`, with `buf` left holding
    /// whatever wasn't yet consumed for the next call.
    pub fn receive(&mut self, buf: &mut BytesMut) -> Result<Option<ParsedRequest>, HttpParseError> {
        loop {
            match self.state {
                ParseState::Headers => {
                    let Some(term) = Self::find_header_terminator(buf) else {
                        if buf.len() > 64 * 1024 {
                            return Err(HttpParseError::HeaderTooLong);
                        }
                        return Ok(None);
                    };
                    let header_bytes = buf.split_to(term + 4);
                    let text = String::from_utf8_lossy(&header_bytes[..term]).into_owned();
                    self.parse_headers(&text)?;
                    self.state = ParseState::Body;
                }
                ParseState::Body => {
                    if buf.len() < self.content_length {
                        return Ok(None);
                    }
                    let body = buf.split_to(self.content_length).to_vec();
                    let keep_alive = !self
                        .headers
                        .iter()
                        .any(|(k, v)| k.eq_ignore_ascii_case("connection") && v.eq_ignore_ascii_case("close"));
                    let request = ParsedRequest {
                        method: self.method,
                        path: std::mem::take(&mut self.path),
                        query: std::mem::take(&mut self.query),
                        headers: std::mem::take(&mut self.headers),
                        body,
                        keep_alive,
                    };
                    self.reset();
                    return Ok(Some(request));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(chunks: &[&[u8]]) -> ParsedRequest {
        let mut parser = RequestParser::new();
        let mut buf = BytesMut::new();
        let mut result = None;
        for chunk in chunks {
            buf.extend_from_slice(chunk);
            if let Some(req) = parser.receive(&mut buf).unwrap() {
                result = Some(req);
                break;
            }
        }
        result.expect("request should be complete")
    }

    #[test]
    fn parses_a_request_with_no_body() {
        let req = feed(&[b"GET /api/session HTTP/1.1\r\nHost: x\r\n\r\n"]);
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.path, "/api/session");
        assert!(req.body.is_empty());
    }

    #[test]
    fn splits_across_arbitrary_chunk_boundaries() {
        let whole = b"POST /api/login HTTP/1.1\r\nContent-Length: 12\r\n\r\n{\"a\":\"bbbb\"}";
        for split in 1..whole.len() {
            let req = feed(&[&whole[..split], &whole[split..]]);
            assert_eq!(req.method, Method::Post);
            assert_eq!(req.path, "/api/login");
            assert_eq!(req.body, b"{\"a\":\"bbbb\"}");
        }
    }

    #[test]
    fn strips_query_string_from_path() {
        let req = feed(&[b"GET /api/messages?folder=inbox&custom=x HTTP/1.1\r\n\r\n"]);
        assert_eq!(req.path, "/api/messages");
        assert_eq!(req.query, "folder=inbox&custom=x");
    }

    #[test]
    fn malformed_content_length_is_treated_as_absent() {
        let req = feed(&[b"GET / HTTP/1.1\r\nContent-Length: garbage\r\n\r\n"]);
        assert!(req.body.is_empty());
    }

    #[test]
    fn connection_close_disables_keep_alive() {
        let req = feed(&[b"GET / HTTP/1.1\r\nConnection: close\r\n\r\n"]);
        assert!(!req.keep_alive);
    }

    #[test]
    fn excess_headers_beyond_the_cap_are_ignored() {
        let mut text = String::from("GET / HTTP/1.1\r\n");
        for i in 0..40 {
            text.push_str(&format!("X-Header-{}: v\r\n", i));
        }
        text.push_str("\r\n");
        let req = feed(&[text.as_bytes()]);
        assert_eq!(req.headers.len(), MAX_HEADERS);
    }
}
