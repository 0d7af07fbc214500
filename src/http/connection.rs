/*
 * connection.rs
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

//! Per-connection state machine: Reading -> Processing -> Writing -> (Reading | Closing).
//! Owned exclusively by the event loop; a worker only ever sees a moved-out
//! `ParsedRequest` and hands back a `Response` by value.

use bytes::BytesMut;
use mio::net::TcpStream;

use crate::http::parser::RequestParser;
use crate::http::request::ParsedRequest;
use crate::http::response::Response;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Reading,
    Processing,
    Writing,
    Closing,
}

pub struct Connection {
    pub stream: TcpStream,
    pub state: ConnState,
    pub read_buf: BytesMut,
    pub write_buf: BytesMut,
    parser: RequestParser,
    pub keep_alive: bool,
    pub last_activity_ms: i64,
}

impl Connection {
    pub fn new(stream: TcpStream, now_ms: i64) -> Self {
        Self {
            stream,
            state: ConnState::Reading,
            read_buf: BytesMut::with_capacity(4096),
            write_buf: BytesMut::new(),
            parser: RequestParser::new(),
            keep_alive: true,
            last_activity_ms: now_ms,
        }
    }

    /// Step the parser over whatever has accumulated in `read_buf`. On a
    /// complete request, transitions to `Processing` and returns it;
    /// otherwise stays in `Reading` for more bytes.
    pub fn try_parse(&mut self) -> Result<Option<ParsedRequest>, crate::error::HttpParseError> {
        match self.parser.receive(&mut self.read_buf)? {
            Some(req) => {
                self.keep_alive = req.keep_alive;
                self.state = ConnState::Processing;
                Ok(Some(req))
            }
            None => Ok(None),
        }
    }

    /// Frame a response into the write buffer and arm for writing.
    pub fn queue_response(&mut self, response: &Response) {
        let framed = response.frame(self.keep_alive);
        self.write_buf.extend_from_slice(&framed);
        self.state = ConnState::Writing;
    }

    /// Reset for the next request on a keep-alive connection.
    pub fn reset_for_next_request(&mut self) {
        self.parser.reset();
        self.state = ConnState::Reading;
    }
}
