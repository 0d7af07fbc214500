/*
 * request.rs
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

//! A fully parsed HTTP request: method, path, query string, headers, body.
//! Owned and moved onto a worker task once the codec has a complete request.

/// HTTP request method, mapped from the request line's method token. Anything
/// outside the supported set maps to `Unknown` rather than failing the parse
/// (the router is free to answer 405 for it).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Options,
    Unknown,
}

impl Method {
    pub fn parse(s: &str) -> Self {
        match s {
            "GET" => Method::Get,
            "HEAD" => Method::Head,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            "OPTIONS" => Method::Options,
            _ => Method::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Unknown => "UNKNOWN",
        }
    }
}

pub const MAX_HEADERS: usize = 32;

#[derive(Debug, Clone)]
pub struct ParsedRequest {
    pub method: Method,
    /// Request-URI with any query string stripped off.
    pub path: String,
    /// Raw query string (without the leading '?'), empty if absent.
    pub query: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub keep_alive: bool,
}

impl ParsedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }

    /// `Authorization: Bearer <token>`, accepted bare without the scheme prefix too.
    pub fn bearer_token(&self) -> Option<&str> {
        let raw = self.header("authorization")?;
        let trimmed = raw.trim();
        if let Some(rest) = trimmed.strip_prefix("Bearer ") {
            Some(rest.trim())
        } else if let Some(rest) = trimmed.strip_prefix("bearer ") {
            Some(rest.trim())
        } else {
            Some(trimmed)
        }
    }

    /// Query parameter by name, from the raw query string (`a=b&c=d`).
    pub fn query_param(&self, name: &str) -> Option<String> {
        for pair in self.query.split('&') {
            let mut it = pair.splitn(2, '=');
            let k = it.next().unwrap_or("");
            let v = it.next().unwrap_or("");
            if k == name {
                return Some(percent_encoding::percent_decode_str(v).decode_utf8_lossy().into_owned());
            }
        }
        None
    }
}
