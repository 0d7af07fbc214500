/*
 * session.rs
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

//! Session manager: a mutex-guarded table of opaque bearer tokens with
//! sliding 12-hour expiry. Pruning is O(n) compaction run at the start of
//! every mutating operation, matching the reference's `prune`-then-act shape.

use std::sync::Mutex;

use rand::RngCore;

use crate::clock::now_ms;
use crate::error::SessionError;
use crate::store::{StorageBackend, User};

const SESSION_LIFETIME_MS: i64 = 12 * 60 * 60 * 1000;

struct SessionRecord {
    token: String,
    user_id: i64,
    expires_at: i64,
}

pub struct SessionManager {
    sessions: Mutex<Vec<SessionRecord>>,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager {
    pub fn new() -> Self {
        Self { sessions: Mutex::new(Vec::new()) }
    }

    fn generate_token() -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    fn prune(sessions: &mut Vec<SessionRecord>) {
        let now = now_ms();
        sessions.retain(|s| s.expires_at > now);
    }

    pub fn login(&self, backend: &dyn StorageBackend, username: &str, password: &str) -> Result<(String, User), SessionError> {
        let user = backend.authenticate(username, password).map_err(|_| SessionError::InvalidCredentials)?;
        let token = Self::generate_token();
        let mut sessions = self.sessions.lock().unwrap();
        Self::prune(&mut sessions);
        sessions.push(SessionRecord { token: token.clone(), user_id: user.id, expires_at: now_ms() + SESSION_LIFETIME_MS });
        Ok((token, user))
    }

    pub fn register(&self, backend: &dyn StorageBackend, username: &str, email: &str, password: &str) -> Result<(String, User), SessionError> {
        backend.create_user(username, email, password)?;
        self.login(backend, username, password)
    }

    pub fn validate(&self, backend: &dyn StorageBackend, token: &str) -> Result<User, SessionError> {
        let mut sessions = self.sessions.lock().unwrap();
        Self::prune(&mut sessions);
        let record = sessions.iter_mut().find(|s| s.token == token).ok_or(SessionError::Unauthorized)?;
        record.expires_at = now_ms() + SESSION_LIFETIME_MS;
        let user_id = record.user_id;
        drop(sessions);
        backend.get_user_by_id(user_id).map_err(|_| SessionError::Unauthorized)
    }

    pub fn logout(&self, token: &str) {
        let mut sessions = self.sessions.lock().unwrap();
        Self::prune(&mut sessions);
        sessions.retain(|s| s.token != token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryBackend;

    #[test]
    fn login_then_validate_succeeds() {
        let backend = MemoryBackend::new();
        let manager = SessionManager::new();
        let (token, user) = manager.login(&backend, "alice", "password1").unwrap();
        let validated = manager.validate(&backend, &token).unwrap();
        assert_eq!(validated.id, user.id);
    }

    #[test]
    fn register_then_login_returns_distinct_tokens() {
        let backend = MemoryBackend::new();
        let manager = SessionManager::new();
        let (token1, _) = manager.register(&backend, "erin", "erin@example.com", "secret1").unwrap();
        let (token2, _) = manager.login(&backend, "erin", "secret1").unwrap();
        assert_ne!(token1, token2);
    }

    #[test]
    fn expired_token_is_rejected() {
        let backend = MemoryBackend::new();
        let manager = SessionManager::new();
        let (token, _) = manager.login(&backend, "alice", "password1").unwrap();
        {
            let mut sessions = manager.sessions.lock().unwrap();
            sessions.iter_mut().find(|s| s.token == token).unwrap().expires_at = now_ms() - 1;
        }
        assert!(manager.validate(&backend, &token).is_err());
    }

    #[test]
    fn validation_slides_the_expiry_window() {
        let backend = MemoryBackend::new();
        let manager = SessionManager::new();
        let (token, _) = manager.login(&backend, "alice", "password1").unwrap();
        let before = {
            let sessions = manager.sessions.lock().unwrap();
            sessions.iter().find(|s| s.token == token).unwrap().expires_at
        };
        {
            let mut sessions = manager.sessions.lock().unwrap();
            sessions.iter_mut().find(|s| s.token == token).unwrap().expires_at = now_ms() + 1000;
        }
        manager.validate(&backend, &token).unwrap();
        let after = {
            let sessions = manager.sessions.lock().unwrap();
            sessions.iter().find(|s| s.token == token).unwrap().expires_at
        };
        assert!(after > before - SESSION_LIFETIME_MS);
        assert!(after >= now_ms() + SESSION_LIFETIME_MS - 1000);
    }

    #[test]
    fn logout_invalidates_the_token() {
        let backend = MemoryBackend::new();
        let manager = SessionManager::new();
        let (token, _) = manager.login(&backend, "alice", "password1").unwrap();
        manager.logout(&token);
        assert!(manager.validate(&backend, &token).is_err());
    }
}
