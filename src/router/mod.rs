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

//! URL dispatch on `(method, path)`. `OPTIONS` always answers 204 with
//! permissive CORS; every other JSON response carries the same CORS headers.
//! `/api/*` routes other than register/login require a valid bearer token.

pub mod handlers;

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ErrorCode, RouterError};
use crate::http::request::{Method, ParsedRequest};
use crate::http::response::Response;
use crate::json::JsonValue;
use crate::mail::MailService;
use crate::session::SessionManager;
use crate::static_files;
use crate::store::{StorageBackend, User};

pub struct AppState {
    pub backend: Arc<dyn StorageBackend>,
    pub sessions: SessionManager,
    pub static_dir: String,
    pub template_dir: String,
    pub data_dir: String,
}

impl AppState {
    pub fn new(backend: Arc<dyn StorageBackend>, static_dir: String, template_dir: String, data_dir: String) -> Self {
        Self { backend, sessions: SessionManager::new(), static_dir, template_dir, data_dir }
    }

    fn mail(&self) -> MailService<'_> {
        MailService::new(self.backend.as_ref(), self.data_dir.clone())
    }

    fn authenticate(&self, req: &ParsedRequest) -> Result<User, RouterError> {
        let token = req.bearer_token().ok_or_else(|| RouterError::new(ErrorCode::Unauthorized, "missing bearer token"))?;
        Ok(self.sessions.validate(self.backend.as_ref(), token)?)
    }
}

fn error_response(e: &RouterError) -> Response {
    let mut err = JsonValue::object();
    err.insert("code", JsonValue::from_str(e.code.as_str()));
    err.insert("message", JsonValue::from_str(e.message.clone()));
    let mut body = JsonValue::object();
    body.insert("error", err);
    let resp = Response::json(e.status(), body.to_bytes());
    if e.code == ErrorCode::Unauthorized {
        resp.with_header("WWW-Authenticate", "Bearer realm=\"mail\"")
    } else {
        resp
    }
}

/// Strip the `/api/messages/` prefix and return the remaining segments, if any.
fn messages_subpath(path: &str) -> Option<Vec<&str>> {
    let rest = path.strip_prefix("/api/messages/")?;
    if rest.is_empty() {
        return None;
    }
    Some(rest.split('/').filter(|s| !s.is_empty()).collect())
}

fn dispatch_api(state: &AppState, req: &ParsedRequest) -> Result<Response, RouterError> {
    match (req.method, req.path.as_str()) {
        (Method::Post, "/api/register") => handlers::register(state, req),
        (Method::Post, "/api/login") => handlers::login(state, req),
        (Method::Post, "/api/logout") => handlers::logout(state, req),
        (Method::Get, "/api/session") => handlers::session(state, req),
        (Method::Get, "/api/mailboxes") => handlers::mailboxes(state, req),
        (Method::Get, "/api/messages") => handlers::list_messages(state, req),
        (Method::Post, "/api/messages") => handlers::compose_message(state, req),
        (Method::Post, "/api/folders") => handlers::create_folder(state, req),
        (Method::Get, "/api/contacts") => handlers::list_contacts(state, req),
        (Method::Post, "/api/contacts") => handlers::add_contact(state, req),
        (method, path) if path.starts_with("/api/messages/") => {
            let segments = messages_subpath(path).ok_or_else(|| RouterError::new(ErrorCode::NotFound, "not found"))?;
            let id: i64 = segments[0].parse().map_err(|_| RouterError::new(ErrorCode::NotFound, "not found"))?;
            match (method, segments.as_slice()) {
                (Method::Get, [_]) => handlers::get_message(state, req, id),
                (Method::Post, [_, "star"]) => handlers::star_message(state, req, id),
                (Method::Post, [_, "archive"]) => handlers::archive_message(state, req, id),
                _ => Err(RouterError::new(ErrorCode::MethodNotAllowed, "method not allowed")),
            }
        }
        _ => Err(RouterError::new(ErrorCode::NotFound, "not found")),
    }
}

fn render(state: &AppState, name: &str) -> Response {
    let vars = HashMap::new();
    match static_files::render_template(&state.template_dir, name, &vars) {
        Some(html) => Response::new(200).with_header("Content-Type", "text/html; charset=utf-8").with_body(html.into_bytes()),
        None => Response::new(404).with_body(b"not found".to_vec()),
    }
}

pub fn route(state: &AppState, req: &ParsedRequest) -> Response {
    if req.method == Method::Options {
        return Response::new(204).with_cors();
    }

    if req.path.starts_with("/api/") {
        return match dispatch_api(state, req) {
            Ok(resp) => resp.with_cors(),
            Err(e) => error_response(&e).with_cors(),
        };
    }

    if let Some(rest) = req.path.strip_prefix("/static/") {
        return match static_files::read_static(&state.static_dir, rest) {
            Some(bytes) => Response::new(200).with_body(bytes),
            None if !static_files::is_safe_path(rest) => {
                error_response(&RouterError::new(ErrorCode::BadPath, "unsafe path"))
            }
            None => Response::new(404).with_body(b"not found".to_vec()),
        };
    }

    match req.path.as_str() {
        "/" | "/learn.html" => render(state, "learn.html"),
        "/mail" | "/mail/" => render(state, "login.html"),
        "/mail/app" | "/mail/app/" | "/app" => render(state, "app.html"),
        _ => Response::new(404).with_body(b"not found".to_vec()),
    }
}
