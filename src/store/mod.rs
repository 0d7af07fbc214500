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

//! Storage backend capability: a single trait implemented by the in-memory
//! and relational backends. All operations are synchronous and safe to call
//! concurrently from multiple worker threads; a backend is free to serialize
//! everything under one lock or multiplex a connection pool, as long as
//! single-row mutations observe linearizable-per-op semantics.

pub mod memory;
pub mod sqlite;

use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FolderKind {
    Inbox,
    Sent,
    Drafts,
    Starred,
    Archive,
    Custom,
}

impl FolderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FolderKind::Inbox => "inbox",
            FolderKind::Sent => "sent",
            FolderKind::Drafts => "drafts",
            FolderKind::Starred => "starred",
            FolderKind::Archive => "archive",
            FolderKind::Custom => "custom",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "inbox" => Some(FolderKind::Inbox),
            "sent" => Some(FolderKind::Sent),
            "drafts" => Some(FolderKind::Drafts),
            "starred" => Some(FolderKind::Starred),
            "archive" => Some(FolderKind::Archive),
            "custom" => Some(FolderKind::Custom),
            _ => None,
        }
    }

    /// The five built-in kinds materialized for every user; `Custom` is
    /// created on demand and is not one of them.
    pub const BUILTIN: [FolderKind; 5] = [
        FolderKind::Inbox,
        FolderKind::Sent,
        FolderKind::Drafts,
        FolderKind::Starred,
        FolderKind::Archive,
    ];
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct Folder {
    pub id: i64,
    pub owner_id: i64,
    pub kind: FolderKind,
    pub name: String,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub id: i64,
    pub owner_id: i64,
    pub folder: FolderKind,
    pub custom_folder: String,
    pub archive_group: Option<String>,
    pub subject: String,
    pub body: String,
    pub recipients: String,
    pub is_starred: bool,
    pub is_draft: bool,
    pub is_archived: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone)]
pub struct Attachment {
    pub id: i64,
    pub message_id: i64,
    pub filename: String,
    pub storage_path: String,
    pub relative_path: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

/// An attachment as given by the caller before it has a row id or storage path.
#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub filename: String,
    pub storage_path: String,
    pub relative_path: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

/// A message as given by the caller before it has an id or timestamps.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub folder: FolderKind,
    pub custom_folder: String,
    pub archive_group: Option<String>,
    pub subject: String,
    pub body: String,
    pub recipients: String,
    pub is_starred: bool,
    pub is_draft: bool,
    pub is_archived: bool,
}

#[derive(Debug, Clone)]
pub struct Contact {
    pub id: i64,
    pub user_id: i64,
    pub contact_user_id: i64,
    pub alias: String,
    pub group_name: String,
    pub created_at: i64,
}

/// Storage backend contract: §4.9 of the design. Implementors must be usable
/// concurrently from any worker thread.
pub trait StorageBackend: Send + Sync {
    fn authenticate(&self, username: &str, password: &str) -> Result<User, StoreError>;
    fn get_user_by_id(&self, id: i64) -> Result<User, StoreError>;
    fn get_user_by_username(&self, username: &str) -> Result<User, StoreError>;
    fn create_user(&self, username: &str, email: &str, password: &str) -> Result<User, StoreError>;

    fn list_folders(&self, user_id: i64) -> Result<Vec<Folder>, StoreError>;
    fn create_folder(&self, user_id: i64, name: &str, kind: FolderKind) -> Result<Folder, StoreError>;

    fn list_messages(&self, user_id: i64, folder: FolderKind, custom: Option<&str>) -> Result<Vec<Message>, StoreError>;
    fn get_message(&self, user_id: i64, msg_id: i64) -> Result<(Message, Vec<Attachment>), StoreError>;

    fn save_draft(&self, user_id: i64, msg: NewMessage, attachments: Vec<NewAttachment>) -> Result<i64, StoreError>;
    fn send_message(&self, user_id: i64, msg: NewMessage, attachments: Vec<NewAttachment>, recipients: &[String]) -> Result<(), StoreError>;

    fn star_message(&self, user_id: i64, msg_id: i64, starred: bool) -> Result<(), StoreError>;
    fn archive_message(&self, user_id: i64, msg_id: i64, archived: bool, group: Option<&str>) -> Result<(), StoreError>;

    fn list_contacts(&self, user_id: i64) -> Result<Vec<Contact>, StoreError>;
    fn add_contact(&self, user_id: i64, contact_user_id: i64, alias: &str, group_name: &str) -> Result<Contact, StoreError>;
}
