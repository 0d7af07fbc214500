/*
 * sqlite.rs
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

//! Relational storage backend: a pooled set of SQLite connections behind the
//! same `StorageBackend` trait as the memory backend. Star materializes a
//! flag flip only (Open Question 1's relational-side policy, documented in
//! DESIGN.md); the memory backend's copy-on-star behavior is the one this
//! implementation standardizes on end to end, so this backend exists to
//! demonstrate the contract is backend-agnostic rather than to diverge from it.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};

use crate::clock::now_ms;
use crate::error::StoreError;
use crate::store::{Attachment, Contact, Folder, FolderKind, Message, NewAttachment, NewMessage, StorageBackend, User};

fn hash_password(password: &str) -> String {
    format!("plain:{}", password)
}

pub struct SqliteBackend {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteBackend {
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::new(manager).map_err(|e| StoreError::Backend(e.to_string()))?;
        let backend = Self { pool };
        backend.migrate()?;
        Ok(backend)
    }

    fn migrate(&self) -> Result<(), StoreError> {
        let conn = self.pool.get().map_err(|e| StoreError::Backend(e.to_string()))?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL,
                email_lower TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS folders (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id INTEGER NOT NULL,
                kind TEXT NOT NULL,
                name TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id INTEGER NOT NULL,
                folder TEXT NOT NULL,
                custom_folder TEXT NOT NULL DEFAULT '',
                archive_group TEXT,
                subject TEXT NOT NULL,
                body TEXT NOT NULL,
                recipients TEXT NOT NULL,
                is_starred INTEGER NOT NULL DEFAULT 0,
                is_draft INTEGER NOT NULL DEFAULT 0,
                is_archived INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS attachments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                message_id INTEGER NOT NULL,
                filename TEXT NOT NULL,
                storage_path TEXT NOT NULL,
                relative_path TEXT NOT NULL,
                mime_type TEXT NOT NULL,
                size_bytes INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS contacts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                contact_user_id INTEGER NOT NULL,
                alias TEXT NOT NULL,
                group_name TEXT NOT NULL DEFAULT '',
                created_at INTEGER NOT NULL,
                UNIQUE(user_id, contact_user_id)
            );
            ",
        )
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    fn materialize_builtin_folders(&self, conn: &rusqlite::Connection, user_id: i64) -> Result<(), StoreError> {
        for kind in FolderKind::BUILTIN {
            let exists: Option<i64> = conn
                .query_row(
                    "SELECT id FROM folders WHERE owner_id = ?1 AND kind = ?2",
                    params![user_id, kind.as_str()],
                    |r| r.get(0),
                )
                .optional()
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            if exists.is_none() {
                conn.execute(
                    "INSERT INTO folders (owner_id, kind, name, created_at) VALUES (?1, ?2, ?2, ?3)",
                    params![user_id, kind.as_str(), now_ms()],
                )
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            }
        }
        Ok(())
    }

    fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            password_hash: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    fn row_to_message(row: &rusqlite::Row) -> rusqlite::Result<Message> {
        let folder_str: String = row.get(2)?;
        let archive_group: Option<String> = row.get(4)?;
        Ok(Message {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            folder: FolderKind::parse(&folder_str).unwrap_or(FolderKind::Inbox),
            custom_folder: row.get(3)?,
            archive_group,
            subject: row.get(5)?,
            body: row.get(6)?,
            recipients: row.get(7)?,
            is_starred: row.get::<_, i64>(8)? != 0,
            is_draft: row.get::<_, i64>(9)? != 0,
            is_archived: row.get::<_, i64>(10)? != 0,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }

    fn insert_message(
        conn: &rusqlite::Connection,
        owner_id: i64,
        folder: FolderKind,
        custom_folder: &str,
        msg: &NewMessage,
        attachments: &[NewAttachment],
    ) -> Result<i64, StoreError> {
        let now = now_ms();
        conn.execute(
            "INSERT INTO messages (owner_id, folder, custom_folder, archive_group, subject, body, recipients, is_starred, is_draft, is_archived, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
            params![
                owner_id,
                folder.as_str(),
                custom_folder,
                msg.archive_group,
                msg.subject,
                msg.body,
                msg.recipients,
                msg.is_starred as i64,
                (folder == FolderKind::Drafts) as i64,
                msg.is_archived as i64,
                now,
            ],
        )
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        let id = conn.last_insert_rowid();
        for att in attachments {
            conn.execute(
                "INSERT INTO attachments (message_id, filename, storage_path, relative_path, mime_type, size_bytes) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, att.filename, att.storage_path, att.relative_path, att.mime_type, att.size_bytes as i64],
            )
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        Ok(id)
    }
}

impl StorageBackend for SqliteBackend {
    fn authenticate(&self, username: &str, password: &str) -> Result<User, StoreError> {
        let conn = self.pool.get().map_err(|e| StoreError::Backend(e.to_string()))?;
        conn.query_row(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE username = ?1 AND password_hash = ?2",
            params![username, hash_password(password)],
            Self::row_to_user,
        )
        .optional()
        .map_err(|e| StoreError::Backend(e.to_string()))?
        .ok_or(StoreError::NotFound)
    }

    fn get_user_by_id(&self, id: i64) -> Result<User, StoreError> {
        let conn = self.pool.get().map_err(|e| StoreError::Backend(e.to_string()))?;
        conn.query_row("SELECT id, username, email, password_hash, created_at FROM users WHERE id = ?1", params![id], Self::row_to_user)
            .optional()
            .map_err(|e| StoreError::Backend(e.to_string()))?
            .ok_or(StoreError::NotFound)
    }

    fn get_user_by_username(&self, username: &str) -> Result<User, StoreError> {
        let conn = self.pool.get().map_err(|e| StoreError::Backend(e.to_string()))?;
        conn.query_row(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE username = ?1",
            params![username],
            Self::row_to_user,
        )
        .optional()
        .map_err(|e| StoreError::Backend(e.to_string()))?
        .ok_or(StoreError::NotFound)
    }

    fn create_user(&self, username: &str, email: &str, password: &str) -> Result<User, StoreError> {
        let conn = self.pool.get().map_err(|e| StoreError::Backend(e.to_string()))?;
        let email_lower = email.to_lowercase();
        let result = conn.execute(
            "INSERT INTO users (username, email, email_lower, password_hash, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![username, email, email_lower, hash_password(password), now_ms()],
        );
        match result {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, Some(ref msg))) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
                if msg.contains("users.username") {
                    return Err(StoreError::UsernameTaken);
                } else if msg.contains("users.email_lower") {
                    return Err(StoreError::EmailTaken);
                }
                return Err(StoreError::Backend(msg.clone()));
            }
            Err(e) => return Err(StoreError::Backend(e.to_string())),
        }
        let id = conn.last_insert_rowid();
        self.materialize_builtin_folders(&conn, id)?;
        self.get_user_by_id(id)
    }

    fn list_folders(&self, user_id: i64) -> Result<Vec<Folder>, StoreError> {
        let conn = self.pool.get().map_err(|e| StoreError::Backend(e.to_string()))?;
        self.materialize_builtin_folders(&conn, user_id)?;
        let mut stmt = conn
            .prepare("SELECT id, owner_id, kind, name, created_at FROM folders WHERE owner_id = ?1")
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let rows = stmt
            .query_map(params![user_id], |row| {
                let kind_str: String = row.get(2)?;
                Ok(Folder {
                    id: row.get(0)?,
                    owner_id: row.get(1)?,
                    kind: FolderKind::parse(&kind_str).unwrap_or(FolderKind::Custom),
                    name: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(|e| StoreError::Backend(e.to_string()))
    }

    fn create_folder(&self, user_id: i64, name: &str, kind: FolderKind) -> Result<Folder, StoreError> {
        let conn = self.pool.get().map_err(|e| StoreError::Backend(e.to_string()))?;
        let now = now_ms();
        conn.execute(
            "INSERT INTO folders (owner_id, kind, name, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![user_id, kind.as_str(), name, now],
        )
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(Folder { id: conn.last_insert_rowid(), owner_id: user_id, kind, name: name.to_string(), created_at: now })
    }

    fn list_messages(&self, user_id: i64, folder: FolderKind, custom: Option<&str>) -> Result<Vec<Message>, StoreError> {
        let conn = self.pool.get().map_err(|e| StoreError::Backend(e.to_string()))?;
        let mut stmt = conn
            .prepare(
                "SELECT id, owner_id, folder, custom_folder, archive_group, subject, body, recipients, is_starred, is_draft, is_archived, created_at, updated_at
                 FROM messages WHERE owner_id = ?1 AND folder = ?2 AND (?3 IS NULL OR custom_folder = ?3) ORDER BY updated_at DESC",
            )
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let rows = stmt
            .query_map(params![user_id, folder.as_str(), custom], Self::row_to_message)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(|e| StoreError::Backend(e.to_string()))
    }

    fn get_message(&self, user_id: i64, msg_id: i64) -> Result<(Message, Vec<Attachment>), StoreError> {
        let conn = self.pool.get().map_err(|e| StoreError::Backend(e.to_string()))?;
        let message = conn
            .query_row(
                "SELECT id, owner_id, folder, custom_folder, archive_group, subject, body, recipients, is_starred, is_draft, is_archived, created_at, updated_at
                 FROM messages WHERE id = ?1 AND owner_id = ?2",
                params![msg_id, user_id],
                Self::row_to_message,
            )
            .optional()
            .map_err(|e| StoreError::Backend(e.to_string()))?
            .ok_or(StoreError::NotFound)?;
        let mut stmt = conn
            .prepare("SELECT id, message_id, filename, storage_path, relative_path, mime_type, size_bytes FROM attachments WHERE message_id = ?1")
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let rows = stmt
            .query_map(params![msg_id], |row| {
                Ok(Attachment {
                    id: row.get(0)?,
                    message_id: row.get(1)?,
                    filename: row.get(2)?,
                    storage_path: row.get(3)?,
                    relative_path: row.get(4)?,
                    mime_type: row.get(5)?,
                    size_bytes: row.get::<_, i64>(6)? as u64,
                })
            })
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let attachments = rows.collect::<Result<Vec<_>, _>>().map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok((message, attachments))
    }

    fn save_draft(&self, user_id: i64, msg: NewMessage, attachments: Vec<NewAttachment>) -> Result<i64, StoreError> {
        let conn = self.pool.get().map_err(|e| StoreError::Backend(e.to_string()))?;
        Self::insert_message(&conn, user_id, FolderKind::Drafts, "", &msg, &attachments)
    }

    fn send_message(&self, user_id: i64, msg: NewMessage, attachments: Vec<NewAttachment>, recipients: &[String]) -> Result<(), StoreError> {
        let mut conn = self.pool.get().map_err(|e| StoreError::Backend(e.to_string()))?;
        let tx = conn.transaction().map_err(|e| StoreError::Backend(e.to_string()))?;

        let mut recipient_ids = Vec::new();
        for name in recipients {
            let id: Option<i64> = tx
                .query_row("SELECT id FROM users WHERE username = ?1", params![name], |r| r.get(0))
                .optional()
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            if let Some(id) = id {
                recipient_ids.push(id);
            }
        }

        let custom_folder = msg.custom_folder.clone();
        Self::insert_message(&tx, user_id, FolderKind::Sent, &custom_folder, &msg, &attachments)?;
        for rid in recipient_ids {
            Self::insert_message(&tx, rid, FolderKind::Inbox, "", &msg, &attachments)?;
        }

        tx.commit().map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    fn star_message(&self, user_id: i64, msg_id: i64, starred: bool) -> Result<(), StoreError> {
        let conn = self.pool.get().map_err(|e| StoreError::Backend(e.to_string()))?;
        // Relational policy: flip the flag only, no Starred-folder copy (Open Question 1).
        let affected = conn
            .execute(
                "UPDATE messages SET is_starred = ?1, updated_at = ?2 WHERE id = ?3 AND owner_id = ?4",
                params![starred as i64, now_ms(), msg_id, user_id],
            )
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    fn archive_message(&self, user_id: i64, msg_id: i64, archived: bool, group: Option<&str>) -> Result<(), StoreError> {
        let conn = self.pool.get().map_err(|e| StoreError::Backend(e.to_string()))?;
        let folder = if archived { FolderKind::Archive } else { FolderKind::Inbox };
        let affected = if let Some(g) = group {
            conn.execute(
                "UPDATE messages SET is_archived = ?1, folder = ?2, archive_group = ?3, updated_at = ?4 WHERE id = ?5 AND owner_id = ?6",
                params![archived as i64, folder.as_str(), g, now_ms(), msg_id, user_id],
            )
        } else {
            conn.execute(
                "UPDATE messages SET is_archived = ?1, folder = ?2, updated_at = ?3 WHERE id = ?4 AND owner_id = ?5",
                params![archived as i64, folder.as_str(), now_ms(), msg_id, user_id],
            )
        }
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    fn list_contacts(&self, user_id: i64) -> Result<Vec<Contact>, StoreError> {
        let conn = self.pool.get().map_err(|e| StoreError::Backend(e.to_string()))?;
        let mut stmt = conn
            .prepare("SELECT id, user_id, contact_user_id, alias, group_name, created_at FROM contacts WHERE user_id = ?1 ORDER BY alias")
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let rows = stmt
            .query_map(params![user_id], |row| {
                Ok(Contact {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    contact_user_id: row.get(2)?,
                    alias: row.get(3)?,
                    group_name: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(|e| StoreError::Backend(e.to_string()))
    }

    fn add_contact(&self, user_id: i64, contact_user_id: i64, alias: &str, group_name: &str) -> Result<Contact, StoreError> {
        let conn = self.pool.get().map_err(|e| StoreError::Backend(e.to_string()))?;
        let now = now_ms();
        conn.execute(
            "INSERT INTO contacts (user_id, contact_user_id, alias, group_name, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![user_id, contact_user_id, alias, group_name, now],
        )
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(Contact { id: conn.last_insert_rowid(), user_id, contact_user_id, alias: alias.to_string(), group_name: group_name.to_string(), created_at: now })
    }
}
