/*
 * mod.rs
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

//! The event loop: a single cooperative thread driving non-blocking I/O on
//! the listener, the wakeup channel, and every connection, with a
//! capacity-bounded connection population evicted by LRU (see the admission
//! heap). Request handlers run on a bounded worker pool; responses come back
//! through the cross-thread queue in `handoff`.

pub mod handoff;
pub mod pool;

use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use mio::net::TcpListener;
use mio::{Events, Interest, Poll, Token, Waker};

use crate::clock::now_ms;
use crate::config::Config;
use crate::heap::AdmissionHeap;
use crate::http::connection::{ConnState, Connection};
use crate::http::request::ParsedRequest;
use crate::http::response::Response;
use crate::server::handoff::ResponseQueue;
use crate::server::pool::{Task, WorkerPool, WorkerResponse};

const LISTENER: Token = Token(0);
const WAKER: Token = Token(1);
const FIRST_CONN_TOKEN: i32 = 2;

pub struct Server {
    poll: Poll,
    listener: TcpListener,
    connections: HashMap<i32, Connection>,
    heap: AdmissionHeap,
    next_token: AtomicI32,
    max_connections: usize,
    pool: WorkerPool,
    responses: Arc<ResponseQueue>,
}

impl Server {
    pub fn bind(config: &Config, router: impl Fn(&ParsedRequest) -> Response + Send + Sync + 'static) -> io::Result<Self> {
        let addr: SocketAddr = format!("{}:{}", config.listen_address, config.port).parse().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let mut listener = TcpListener::bind(addr)?;

        let poll = Poll::new()?;
        poll.registry().register(&mut listener, LISTENER, Interest::READABLE)?;

        let waker = Arc::new(Waker::new(poll.registry(), WAKER)?);
        let responses = Arc::new(ResponseQueue::new(waker));
        let responses_for_pool = Arc::clone(&responses);
        let pool = WorkerPool::new(config.thread_pool_size, router, move |resp: WorkerResponse| {
            responses_for_pool.push(resp);
        });

        Ok(Self {
            poll,
            listener,
            connections: HashMap::new(),
            heap: AdmissionHeap::new(),
            next_token: AtomicI32::new(FIRST_CONN_TOKEN),
            max_connections: config.max_connections,
            pool,
            responses,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the loop until `should_continue` returns false (primarily a test
    /// hook; production use just loops forever).
    pub fn run(&mut self, mut should_continue: impl FnMut() -> bool) -> io::Result<()> {
        let mut events = Events::with_capacity(1024);
        while should_continue() {
            self.poll.poll(&mut events, Some(std::time::Duration::from_millis(200)))?;
            for event in events.iter() {
                match event.token() {
                    LISTENER => self.drain_acceptor()?,
                    WAKER => self.drain_responses(),
                    Token(t) => {
                        let token = t as i32;
                        if event.is_read_closed() || event.is_write_closed() || event.is_error() {
                            self.drop_connection(token);
                            continue;
                        }
                        if event.is_readable() {
                            self.step_readable(token);
                        }
                        if event.is_writable() {
                            self.step_writable(token);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn drain_acceptor(&mut self) -> io::Result<()> {
        loop {
            match self.listener.accept() {
                Ok((mut stream, _addr)) => {
                    stream.set_nodelay(true).ok();
                    let token = self.next_token.fetch_add(1, Ordering::SeqCst);
                    self.poll.registry().register(&mut stream, Token(token as usize), Interest::READABLE)?;
                    let conn = Connection::new(stream, now_ms());
                    self.connections.insert(token, conn);
                    self.heap.push(token, now_ms());
                    self.enforce_admission_control(token);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(_) => return Ok(()),
            }
        }
    }

    /// Evict the least-recently-active connection if the population now
    /// exceeds `max_connections`, unless that connection is the one we just
    /// accepted (it is never its own eviction victim).
    fn enforce_admission_control(&mut self, just_accepted: i32) {
        if self.connections.len() <= self.max_connections {
            return;
        }
        if let Some(victim) = self.heap.peek_max() {
            if victim == just_accepted {
                return;
            }
            self.heap.pop_max();
            self.close_connection(victim);
        }
    }

    fn close_connection(&mut self, token: i32) {
        if let Some(mut conn) = self.connections.remove(&token) {
            let _ = self.poll.registry().deregister(&mut conn.stream);
        }
        self.heap.remove(token);
    }

    fn drop_connection(&mut self, token: i32) {
        self.close_connection(token);
    }

    fn step_readable(&mut self, token: i32) {
        let mut request = None;
        let mut should_drop = false;
        if let Some(conn) = self.connections.get_mut(&token) {
            let mut tmp = [0u8; 8192];
            loop {
                match conn.stream.read(&mut tmp) {
                    Ok(0) => {
                        should_drop = true;
                        break;
                    }
                    Ok(n) => {
                        conn.read_buf.extend_from_slice(&tmp[..n]);
                    }
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                    Err(_) => {
                        should_drop = true;
                        break;
                    }
                }
            }
            conn.last_activity_ms = now_ms();
            self.heap.touch(token, conn.last_activity_ms);

            if !should_drop {
                match conn.try_parse() {
                    Ok(Some(req)) => request = Some(req),
                    Ok(None) => {}
                    Err(_) => {
                        let resp = Response::json(400, br#"{"error":{"code":"bad_request","message":"malformed request"}}"#.to_vec());
                        conn.keep_alive = false;
                        conn.queue_response(&resp);
                        self.arm_writable(token);
                        return;
                    }
                }
            }
        }

        if should_drop {
            self.drop_connection(token);
            return;
        }

        if let Some(req) = request {
            // Processing: deregistered from poll entirely while the worker runs, so the
            // worker owns the socket exclusively and a pipelined byte or a half-close
            // can't trigger a second `step_readable` (and a second `Task`) for this
            // token before the first response has gone out.
            if let Some(conn) = self.connections.get_mut(&token) {
                conn.state = ConnState::Processing;
                let _ = self.poll.registry().deregister(&mut conn.stream);
            }
            if self.pool.submit(Task { token, request: req }).is_err() {
                if let Some(conn) = self.connections.get_mut(&token) {
                    let resp = Response::json(500, br#"{"error":{"code":"oom","message":"server busy"}}"#.to_vec());
                    conn.keep_alive = false;
                    conn.queue_response(&resp);
                }
                self.register_writable(token);
            }
        }
    }

    /// Arm WRITABLE on a connection that is still currently registered
    /// (e.g. came straight from `Reading`).
    fn arm_writable(&mut self, token: i32) {
        if let Some(conn) = self.connections.get_mut(&token) {
            let _ = self.poll.registry().reregister(&mut conn.stream, Token(token as usize), Interest::WRITABLE);
        }
    }

    /// Arm WRITABLE on a connection that was deregistered while `Processing`
    /// (submit failure, or the worker's response arriving via `drain_responses`).
    fn register_writable(&mut self, token: i32) {
        if let Some(conn) = self.connections.get_mut(&token) {
            let _ = self.poll.registry().register(&mut conn.stream, Token(token as usize), Interest::WRITABLE);
        }
    }

    fn step_writable(&mut self, token: i32) {
        let mut should_drop = false;
        let mut should_reset = false;
        if let Some(conn) = self.connections.get_mut(&token) {
            loop {
                if conn.write_buf.is_empty() {
                    break;
                }
                match conn.stream.write(&conn.write_buf) {
                    Ok(0) => {
                        should_drop = true;
                        break;
                    }
                    Ok(n) => {
                        let _ = conn.write_buf.split_to(n);
                    }
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                    Err(_) => {
                        should_drop = true;
                        break;
                    }
                }
            }
            if conn.write_buf.is_empty() {
                conn.last_activity_ms = now_ms();
                self.heap.touch(token, conn.last_activity_ms);
                if conn.keep_alive {
                    should_reset = true;
                } else {
                    should_drop = true;
                }
            }
        }

        if should_drop {
            self.drop_connection(token);
            return;
        }
        if should_reset {
            if let Some(conn) = self.connections.get_mut(&token) {
                conn.reset_for_next_request();
                let _ = self.poll.registry().reregister(&mut conn.stream, Token(token as usize), Interest::READABLE);
            }
        }
    }

    fn drain_responses(&mut self) {
        for worker_response in self.responses.drain() {
            let token = worker_response.token;
            let present = if let Some(conn) = self.connections.get_mut(&token) {
                conn.queue_response(&worker_response.response);
                true
            } else {
                false
            };
            if present {
                self.register_writable(token);
            }
            // Absent: the connection closed before the response arrived; discard.
        }
    }
}
