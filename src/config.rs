/*
 * config.rs
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

//! Server configuration: a populated record read from a JSON file, with
//! defaults for anything the file omits or gets wrong. A missing or malformed
//! config file is not a startup failure; it is logged and the defaults stand.

use std::fs;
use std::path::Path;

use crate::json::JsonValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Memory,
    Relational,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_address: String,
    pub port: u16,
    pub max_connections: usize,
    pub thread_pool_size: usize,
    pub static_dir: String,
    pub template_dir: String,
    pub data_dir: String,
    pub log_target: String,
    pub backend: Backend,
    pub relational_path: String,
    pub session_secret: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0".to_string(),
            port: 8085,
            max_connections: 64,
            thread_pool_size: 8,
            static_dir: "static".to_string(),
            template_dir: "templates".to_string(),
            data_dir: "data".to_string(),
            log_target: "-".to_string(),
            backend: Backend::Memory,
            relational_path: "data/postino.db".to_string(),
            session_secret: String::new(),
        }
    }
}

impl Config {
    /// Load from `path`, falling back to defaults (with a logged warning) for
    /// a missing file, unparseable JSON, or any field it doesn't set.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let text = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "config file unreadable, using defaults");
                return Self::default();
            }
        };
        let value = match JsonValue::parse(&text) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "config file malformed, using defaults");
                return Self::default();
            }
        };
        Self::from_json(&value)
    }

    fn from_json(value: &JsonValue) -> Self {
        let defaults = Self::default();
        let backend = match value.get_str("backend") {
            Some(s) if s.eq_ignore_ascii_case("relational") => Backend::Relational,
            _ => defaults.backend,
        };
        Self {
            listen_address: value.get_str("listen_address").map(str::to_string).unwrap_or(defaults.listen_address),
            port: value.get("port").and_then(JsonValue::as_i64).map(|n| n as u16).unwrap_or(defaults.port),
            max_connections: value
                .get("max_connections")
                .and_then(JsonValue::as_i64)
                .map(|n| n as usize)
                .unwrap_or(defaults.max_connections),
            thread_pool_size: value
                .get("thread_pool_size")
                .and_then(JsonValue::as_i64)
                .map(|n| n as usize)
                .unwrap_or(defaults.thread_pool_size),
            static_dir: value.get_str("static_dir").map(str::to_string).unwrap_or(defaults.static_dir),
            template_dir: value.get_str("template_dir").map(str::to_string).unwrap_or(defaults.template_dir),
            data_dir: value.get_str("data_dir").map(str::to_string).unwrap_or(defaults.data_dir),
            log_target: value.get_str("log_target").map(str::to_string).unwrap_or(defaults.log_target),
            backend,
            relational_path: value.get_str("relational_path").map(str::to_string).unwrap_or(defaults.relational_path),
            session_secret: value.get_str("session_secret").map(str::to_string).unwrap_or(defaults.session_secret),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = Config::load("/nonexistent/path/config.json");
        assert_eq!(cfg.port, 8085);
        assert_eq!(cfg.backend, Backend::Memory);
    }

    #[test]
    fn partial_config_fills_gaps_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, br#"{"port": 9090, "backend": "relational"}"#).unwrap();
        let cfg = Config::load(&path);
        assert_eq!(cfg.port, 9090);
        assert_eq!(cfg.backend, Backend::Relational);
        assert_eq!(cfg.max_connections, 64);
    }
}
