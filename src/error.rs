/*
 * error.rs
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

//! Typed error hierarchy. Each layer owns an error enum; lower layers convert
//! into higher layers via `From` so handler code can use `?` throughout. The
//! router is the only place that downgrades a `RouterError` into the
//! `(status, code, message)` triple framed onto the wire.

use thiserror::Error;

/// Errors raised by a storage backend (memory or relational).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("username already taken")]
    UsernameTaken,
    #[error("email already taken")]
    EmailTaken,
    #[error("not found")]
    NotFound,
    #[error("database error: {0}")]
    Backend(String),
}

/// Errors raised by the session manager.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("unauthorized")]
    Unauthorized,
}

/// Errors raised while parsing an HTTP request off the wire.
#[derive(Debug, Error)]
pub enum HttpParseError {
    #[error("malformed request line")]
    BadRequestLine,
    #[error("too many headers")]
    TooManyHeaders,
    #[error("header line too long")]
    HeaderTooLong,
}

/// Errors raised while loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(String),
}

/// The stable error code returned in a JSON error body, and the HTTP status it maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidUsername,
    InvalidEmail,
    InvalidPassword,
    BadJson,
    BadRequest,
    BadPath,
    Unauthorized,
    InvalidCredentials,
    UsernameTaken,
    EmailTaken,
    NotFound,
    MethodNotAllowed,
    DbError,
    ComposeFailed,
    TemplateError,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidUsername => "invalid_username",
            ErrorCode::InvalidEmail => "invalid_email",
            ErrorCode::InvalidPassword => "invalid_password",
            ErrorCode::BadJson => "bad_json",
            ErrorCode::BadRequest => "bad_request",
            ErrorCode::BadPath => "bad_path",
            ErrorCode::Unauthorized => "unauthorized",
            ErrorCode::InvalidCredentials => "invalid_credentials",
            ErrorCode::UsernameTaken => "username_taken",
            ErrorCode::EmailTaken => "email_taken",
            ErrorCode::NotFound => "not_found",
            ErrorCode::MethodNotAllowed => "method_not_allowed",
            ErrorCode::DbError => "db_error",
            ErrorCode::ComposeFailed => "compose_failed",
            ErrorCode::TemplateError => "template_error",
            ErrorCode::InternalError => "internal_error",
        }
    }

    pub fn status(self) -> u16 {
        match self {
            ErrorCode::InvalidUsername
            | ErrorCode::InvalidEmail
            | ErrorCode::InvalidPassword
            | ErrorCode::BadJson
            | ErrorCode::BadRequest
            | ErrorCode::BadPath => 400,
            ErrorCode::Unauthorized | ErrorCode::InvalidCredentials => 401,
            ErrorCode::UsernameTaken | ErrorCode::EmailTaken => 409,
            ErrorCode::NotFound => 404,
            ErrorCode::MethodNotAllowed => 405,
            ErrorCode::DbError | ErrorCode::ComposeFailed | ErrorCode::TemplateError | ErrorCode::InternalError => 500,
        }
    }
}

/// Router-facing error: the triple handlers hand back to the dispatcher, which
/// frames it as `{"error":{"code":..,"message":..}}`.
#[derive(Debug, Error)]
#[error("{code:?}: {message}")]
pub struct RouterError {
    pub code: ErrorCode,
    pub message: String,
}

impl RouterError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn status(&self) -> u16 {
        self.code.status()
    }
}

impl From<StoreError> for RouterError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UsernameTaken => RouterError::new(ErrorCode::UsernameTaken, "username already taken"),
            StoreError::EmailTaken => RouterError::new(ErrorCode::EmailTaken, "email already taken"),
            StoreError::NotFound => RouterError::new(ErrorCode::NotFound, "not found"),
            StoreError::Backend(msg) => RouterError::new(ErrorCode::DbError, msg),
        }
    }
}

impl From<SessionError> for RouterError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::InvalidCredentials => RouterError::new(ErrorCode::InvalidCredentials, "invalid credentials"),
            SessionError::Unauthorized => RouterError::new(ErrorCode::Unauthorized, "unauthorized"),
            SessionError::Store(inner) => inner.into(),
        }
    }
}
