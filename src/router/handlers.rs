/*
 * handlers.rs
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

//! JSON request handlers for the `/api/*` surface. Each returns a framed
//! `Response` on success or a `RouterError` the dispatcher downgrades to the
//! wire error triple.

use crate::error::{ErrorCode, RouterError};
use crate::http::request::ParsedRequest;
use crate::http::response::Response;
use crate::json::JsonValue;
use crate::mail::{ComposeAttachment, ComposeOutcome, ComposeRequest};
use crate::router::AppState;
use crate::store::{Attachment, Contact, Folder, FolderKind, Message, User};

fn body_json(req: &ParsedRequest) -> Result<JsonValue, RouterError> {
    if req.body.is_empty() {
        return Ok(JsonValue::object());
    }
    JsonValue::parse(&req.body).map_err(|_| RouterError::new(ErrorCode::BadJson, "malformed JSON body"))
}

fn validate_username(raw: &str) -> Result<String, RouterError> {
    let s = raw.trim();
    let ok = (3..=63).contains(&s.len()) && s.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if ok {
        Ok(s.to_string())
    } else {
        Err(RouterError::new(ErrorCode::InvalidUsername, "invalid username"))
    }
}

fn validate_email(raw: &str) -> Result<String, RouterError> {
    let s = raw.trim();
    let valid = match s.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.'),
        None => false,
    };
    if valid {
        Ok(s.to_string())
    } else {
        Err(RouterError::new(ErrorCode::InvalidEmail, "invalid email"))
    }
}

fn validate_password(raw: &str) -> Result<(), RouterError> {
    if raw.len() >= 6 {
        Ok(())
    } else {
        Err(RouterError::new(ErrorCode::InvalidPassword, "password too short"))
    }
}

fn user_json(user: &User) -> JsonValue {
    let mut v = JsonValue::object();
    v.insert("id", JsonValue::from_i64(user.id));
    v.insert("username", JsonValue::from_str(user.username.clone()));
    v.insert("email", JsonValue::from_str(user.email.clone()));
    v
}

fn folder_json(folder: &Folder) -> JsonValue {
    let mut v = JsonValue::object();
    v.insert("id", JsonValue::from_i64(folder.id));
    v.insert("kind", JsonValue::from_str(folder.kind.as_str()));
    v.insert("name", JsonValue::from_str(folder.name.clone()));
    v
}

fn attachment_json(a: &Attachment) -> JsonValue {
    let mut v = JsonValue::object();
    v.insert("id", JsonValue::from_i64(a.id));
    v.insert("filename", JsonValue::from_str(a.filename.clone()));
    v.insert("mimeType", JsonValue::from_str(a.mime_type.clone()));
    v.insert("relativePath", JsonValue::from_str(a.relative_path.clone()));
    v.insert("sizeBytes", JsonValue::from_i64(a.size_bytes as i64));
    v
}

fn message_json(m: &Message) -> JsonValue {
    let mut v = JsonValue::object();
    v.insert("id", JsonValue::from_i64(m.id));
    v.insert("folder", JsonValue::from_str(m.folder.as_str()));
    v.insert("customFolder", JsonValue::from_str(m.custom_folder.clone()));
    v.insert("archiveGroup", match &m.archive_group {
        Some(g) => JsonValue::from_str(g.clone()),
        None => JsonValue::Null,
    });
    v.insert("subject", JsonValue::from_str(m.subject.clone()));
    v.insert("body", JsonValue::from_str(m.body.clone()));
    v.insert("recipients", JsonValue::from_str(m.recipients.clone()));
    v.insert("isStarred", JsonValue::Bool(m.is_starred));
    v.insert("isDraft", JsonValue::Bool(m.is_draft));
    v.insert("isArchived", JsonValue::Bool(m.is_archived));
    v.insert("createdAt", JsonValue::from_i64(m.created_at));
    v.insert("updatedAt", JsonValue::from_i64(m.updated_at));
    v
}

fn contact_json(c: &Contact) -> JsonValue {
    let mut v = JsonValue::object();
    v.insert("id", JsonValue::from_i64(c.id));
    v.insert("contactUserId", JsonValue::from_i64(c.contact_user_id));
    v.insert("alias", JsonValue::from_str(c.alias.clone()));
    v.insert("groupName", JsonValue::from_str(c.group_name.clone()));
    v
}

fn success_body() -> Vec<u8> {
    let mut v = JsonValue::object();
    v.insert("success", JsonValue::Bool(true));
    v.to_bytes()
}

pub fn register(state: &AppState, req: &ParsedRequest) -> Result<Response, RouterError> {
    let body = body_json(req)?;
    let username = validate_username(body.get_str("username").unwrap_or(""))?;
    let email = validate_email(body.get_str("email").unwrap_or(""))?;
    validate_password(body.get_str("password").unwrap_or(""))?;

    let (token, user) = state.sessions.register(state.backend.as_ref(), &username, &email, body.get_str("password").unwrap_or(""))?;
    let mut out = JsonValue::object();
    out.insert("token", JsonValue::from_str(token));
    out.insert("user", user_json(&user));
    Ok(Response::json(201, out.to_bytes()))
}

pub fn login(state: &AppState, req: &ParsedRequest) -> Result<Response, RouterError> {
    let body = body_json(req)?;
    let username = body.get_str("username").unwrap_or("");
    let password = body.get_str("password").unwrap_or("");
    let (token, user) = state.sessions.login(state.backend.as_ref(), username, password)?;
    let mut out = JsonValue::object();
    out.insert("token", JsonValue::from_str(token));
    out.insert("user", user_json(&user));
    Ok(Response::json(200, out.to_bytes()))
}

pub fn logout(state: &AppState, req: &ParsedRequest) -> Result<Response, RouterError> {
    if let Some(token) = req.bearer_token() {
        state.sessions.logout(token);
    }
    Ok(Response::json(200, success_body()))
}

pub fn session(state: &AppState, req: &ParsedRequest) -> Result<Response, RouterError> {
    let user = state.authenticate(req)?;
    let mut out = JsonValue::object();
    out.insert("user", user_json(&user));
    Ok(Response::json(200, out.to_bytes()))
}

pub fn mailboxes(state: &AppState, req: &ParsedRequest) -> Result<Response, RouterError> {
    let user = state.authenticate(req)?;
    let folders = state.backend.list_folders(user.id)?;
    let mut out = JsonValue::object();
    out.insert("folders", JsonValue::Array(folders.iter().map(folder_json).collect()));
    Ok(Response::json(200, out.to_bytes()))
}

pub fn list_messages(state: &AppState, req: &ParsedRequest) -> Result<Response, RouterError> {
    let user = state.authenticate(req)?;
    let folder_name = req.query_param("folder").unwrap_or_else(|| "inbox".to_string());
    let kind = FolderKind::parse(&folder_name).ok_or_else(|| RouterError::new(ErrorCode::BadRequest, "unknown folder"))?;
    let custom = req.query_param("custom");
    if kind == FolderKind::Custom && custom.is_none() {
        return Err(RouterError::new(ErrorCode::BadRequest, "custom folder name required"));
    }
    let messages = state.backend.list_messages(user.id, kind, custom.as_deref())?;
    let mut out = JsonValue::object();
    out.insert("messages", JsonValue::Array(messages.iter().map(message_json).collect()));
    Ok(Response::json(200, out.to_bytes()))
}

pub fn compose_message(state: &AppState, req: &ParsedRequest) -> Result<Response, RouterError> {
    let user = state.authenticate(req)?;
    let body = body_json(req)?;

    let attachments = body
        .get("attachments")
        .and_then(JsonValue::as_array)
        .map(|items| {
            items
                .iter()
                .map(|a| ComposeAttachment {
                    filename: a.get_str("filename").unwrap_or("").to_string(),
                    mime_type: a.get_str("mimeType").unwrap_or("application/octet-stream").to_string(),
                    relative_path: a.get_str("relativePath").unwrap_or("").to_string(),
                    base64_data: a.get_str("data").unwrap_or("").to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    let compose = ComposeRequest {
        subject: body.get_str("subject").unwrap_or("").to_string(),
        body: body.get_str("body").unwrap_or("").to_string(),
        recipients: body.get_str("recipients").unwrap_or("").to_string(),
        save_as_draft: body.get_bool("saveAsDraft").unwrap_or(false),
        starred: body.get_bool("starred").unwrap_or(false),
        archived: body.get_bool("archived").unwrap_or(false),
        custom_folder: body.get_str("customFolder").map(str::to_string),
        archive_group: body.get_str("archiveGroup").map(str::to_string),
        attachments,
    };

    let outcome = state
        .mail()
        .compose(user.id, compose)
        .map_err(|e| RouterError::new(ErrorCode::ComposeFailed, e.to_string()))?;

    let mut out = JsonValue::object();
    out.insert("success", JsonValue::Bool(true));
    if let ComposeOutcome::Drafted(id) = outcome {
        out.insert("draftId", JsonValue::from_i64(id));
    }
    Ok(Response::json(200, out.to_bytes()))
}

pub fn get_message(state: &AppState, req: &ParsedRequest, msg_id: i64) -> Result<Response, RouterError> {
    let user = state.authenticate(req)?;
    let (message, attachments) = state.backend.get_message(user.id, msg_id)?;
    let mut out = JsonValue::object();
    out.insert("message", message_json(&message));
    out.insert("attachments", JsonValue::Array(attachments.iter().map(attachment_json).collect()));
    Ok(Response::json(200, out.to_bytes()))
}

pub fn star_message(state: &AppState, req: &ParsedRequest, msg_id: i64) -> Result<Response, RouterError> {
    let user = state.authenticate(req)?;
    let body = body_json(req)?;
    let starred = body.get_bool("starred").ok_or_else(|| RouterError::new(ErrorCode::BadRequest, "starred is required"))?;
    state.backend.star_message(user.id, msg_id, starred)?;
    let mut out = JsonValue::object();
    out.insert("success", JsonValue::Bool(true));
    out.insert("starred", JsonValue::Bool(starred));
    Ok(Response::json(200, out.to_bytes()))
}

pub fn archive_message(state: &AppState, req: &ParsedRequest, msg_id: i64) -> Result<Response, RouterError> {
    let user = state.authenticate(req)?;
    let body = body_json(req)?;
    let archived = body.get_bool("archived").ok_or_else(|| RouterError::new(ErrorCode::BadRequest, "archived is required"))?;
    let group = body.get_str("archiveGroup");
    state.backend.archive_message(user.id, msg_id, archived, group)?;
    Ok(Response::json(200, success_body()))
}

pub fn create_folder(state: &AppState, req: &ParsedRequest) -> Result<Response, RouterError> {
    let user = state.authenticate(req)?;
    let body = body_json(req)?;
    let name = body.get_str("name").ok_or_else(|| RouterError::new(ErrorCode::BadRequest, "name is required"))?;
    let kind = body.get_str("kind").and_then(FolderKind::parse).unwrap_or(FolderKind::Custom);
    let folder = state.backend.create_folder(user.id, name, kind)?;
    let mut out = JsonValue::object();
    out.insert("folder", folder_json(&folder));
    Ok(Response::json(201, out.to_bytes()))
}

pub fn list_contacts(state: &AppState, req: &ParsedRequest) -> Result<Response, RouterError> {
    let user = state.authenticate(req)?;
    let contacts = state.backend.list_contacts(user.id)?;
    let mut out = JsonValue::object();
    out.insert("contacts", JsonValue::Array(contacts.iter().map(contact_json).collect()));
    Ok(Response::json(200, out.to_bytes()))
}

pub fn add_contact(state: &AppState, req: &ParsedRequest) -> Result<Response, RouterError> {
    let user = state.authenticate(req)?;
    let body = body_json(req)?;

    let contact_user = if let Some(username) = body.get_str("username") {
        state.backend.get_user_by_username(username)?
    } else if let Some(id) = body.get("contactUserId").and_then(JsonValue::as_i64) {
        state.backend.get_user_by_id(id)?
    } else {
        return Err(RouterError::new(ErrorCode::BadRequest, "username or contactUserId is required"));
    };

    let alias = body.get_str("alias").unwrap_or(&contact_user.username);
    let group_name = body.get_str("groupName").unwrap_or("");
    let contact = state.backend.add_contact(user.id, contact_user.id, alias, group_name)?;
    let mut out = JsonValue::object();
    out.insert("contact", contact_json(&contact));
    Ok(Response::json(201, out.to_bytes()))
}
