/*
 * pool.rs
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

//! Fixed-size worker pool with a bounded job queue. `submit` blocks on a
//! condvar while the queue is full; workers block on a second condvar while
//! it's empty. Shutdown broadcasts both and joins every thread after the
//! queue has drained.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use crate::http::request::ParsedRequest;
use crate::http::response::Response;

pub struct Task {
    pub token: i32,
    pub request: ParsedRequest,
}

pub struct WorkerResponse {
    pub token: i32,
    pub response: Response,
}

struct Shared {
    queue: Mutex<VecDeque<Task>>,
    not_full: Condvar,
    not_empty: Condvar,
    capacity: usize,
    shutting_down: Mutex<bool>,
}

pub struct SubmitError;

pub struct WorkerPool {
    shared: Arc<Shared>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// `handler` runs the router on a worker thread for each task and
    /// returns the response; `on_complete` is then called with the
    /// `WorkerResponse` (pushing it onto the cross-thread queue and signaling
    /// the wakeup channel is the caller's job, so this stays decoupled from
    /// the event loop's types).
    pub fn new<F, C>(thread_count: usize, handler: F, on_complete: C) -> Self
    where
        F: Fn(&ParsedRequest) -> Response + Send + Sync + 'static,
        C: Fn(WorkerResponse) + Send + Sync + 'static,
    {
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            capacity: 4 * thread_count.max(1),
            shutting_down: Mutex::new(false),
        });
        let handler = Arc::new(handler);
        let on_complete = Arc::new(on_complete);
        let mut handles = Vec::with_capacity(thread_count);
        for _ in 0..thread_count {
            let shared = Arc::clone(&shared);
            let handler = Arc::clone(&handler);
            let on_complete = Arc::clone(&on_complete);
            handles.push(std::thread::spawn(move || worker_loop(shared, handler, on_complete)));
        }
        Self { shared, handles }
    }

    /// Submit a task; blocks while the queue is full. Fails once shutdown has
    /// begun.
    pub fn submit(&self, task: Task) -> Result<(), SubmitError> {
        let mut queue = self.shared.queue.lock().unwrap();
        loop {
            if *self.shared.shutting_down.lock().unwrap() {
                return Err(SubmitError);
            }
            if queue.len() < self.shared.capacity {
                queue.push_back(task);
                self.shared.not_empty.notify_one();
                return Ok(());
            }
            queue = self.shared.not_full.wait(queue).unwrap();
        }
    }

    pub fn shutdown(self) {
        *self.shared.shutting_down.lock().unwrap() = true;
        self.shared.not_empty.notify_all();
        self.shared.not_full.notify_all();
        for handle in self.handles {
            let _ = handle.join();
        }
    }
}

fn worker_loop<F, C>(shared: Arc<Shared>, handler: Arc<F>, on_complete: Arc<C>)
where
    F: Fn(&ParsedRequest) -> Response + Send + Sync + ?Sized,
    C: Fn(WorkerResponse) + Send + Sync + ?Sized,
{
    loop {
        let task = {
            let mut queue = shared.queue.lock().unwrap();
            loop {
                if let Some(task) = queue.pop_front() {
                    shared.not_full.notify_one();
                    break Some(task);
                }
                if *shared.shutting_down.lock().unwrap() {
                    break None;
                }
                queue = shared.not_empty.wait(queue).unwrap();
            }
        };
        let Some(task) = task else { break };

        let token = task.token;
        // A panicking handler is fatal to that task only, not the worker thread.
        let result = panic::catch_unwind(AssertUnwindSafe(|| handler(&task.request)));
        let response = result.unwrap_or_else(|_| {
            tracing::error!(token, "router handler panicked; responding 500");
            Response::new(500)
                .with_header("Content-Type", "application/json")
                .with_body(br#"{"error":{"code":"internal_error","message":"internal error"}}"#.to_vec())
        });
        on_complete(WorkerResponse { token, response });
    }
}
