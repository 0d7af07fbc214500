/*
 * handoff.rs
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

//! Cross-thread response queue: workers push completed responses here and
//! signal the event loop's `mio::Waker` so it returns from its readiness
//! wait; the loop drains the queue on wakeup and discards anything whose
//! connection has already gone away.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use mio::Waker;

use crate::server::pool::WorkerResponse;

pub struct ResponseQueue {
    queue: Mutex<VecDeque<WorkerResponse>>,
    waker: Arc<Waker>,
}

impl ResponseQueue {
    pub fn new(waker: Arc<Waker>) -> Self {
        Self { queue: Mutex::new(VecDeque::new()), waker }
    }

    pub fn push(&self, response: WorkerResponse) {
        self.queue.lock().unwrap().push_back(response);
        let _ = self.waker.wake();
    }

    /// Drain everything currently queued, in push order.
    pub fn drain(&self) -> Vec<WorkerResponse> {
        let mut queue = self.queue.lock().unwrap();
        queue.drain(..).collect()
    }
}
