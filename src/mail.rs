/*
 * mail.rs
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

//! Mail service: compose orchestration on top of the storage backend.
//! Decodes and persists attachments to disk, then dispatches to either
//! `save_draft` or `send_message` depending on the compose payload.

use std::fs;
use std::path::PathBuf;

use base64::Engine;
use rand::RngCore;

use crate::clock::now_ms;
use crate::error::StoreError;
use crate::store::{FolderKind, NewAttachment, NewMessage, StorageBackend};

#[derive(Debug, Clone)]
pub struct ComposeAttachment {
    pub filename: String,
    pub mime_type: String,
    pub relative_path: String,
    pub base64_data: String,
}

#[derive(Debug, Clone)]
pub struct ComposeRequest {
    pub subject: String,
    pub body: String,
    pub recipients: String,
    pub save_as_draft: bool,
    pub starred: bool,
    pub archived: bool,
    pub custom_folder: Option<String>,
    pub archive_group: Option<String>,
    pub attachments: Vec<ComposeAttachment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeOutcome {
    Sent,
    Drafted(i64),
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("malformed attachment data")]
    BadAttachment,
    #[error("failed to persist attachment: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct MailService<'a> {
    backend: &'a dyn StorageBackend,
    data_dir: PathBuf,
}

fn rand_token() -> u64 {
    rand::thread_rng().next_u64()
}

impl<'a> MailService<'a> {
    pub fn new(backend: &'a dyn StorageBackend, data_dir: impl Into<PathBuf>) -> Self {
        Self { backend, data_dir: data_dir.into() }
    }

    fn persist_attachment(&self, user_id: i64, now_ms: i64, attachment: &ComposeAttachment) -> Result<NewAttachment, MailError> {
        if attachment.base64_data.is_empty() {
            return Ok(NewAttachment {
                filename: attachment.filename.clone(),
                storage_path: String::new(),
                relative_path: attachment.relative_path.clone(),
                mime_type: attachment.mime_type.clone(),
                size_bytes: 0,
            });
        }
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(attachment.base64_data.as_bytes())
            .map_err(|_| MailError::BadAttachment)?;

        let dir = self.data_dir.join("uploads").join(user_id.to_string());
        fs::create_dir_all(&dir)?;
        let disk_name = format!("{}-{}-{}", now_ms, rand_token(), attachment.filename);
        let path = dir.join(&disk_name);
        fs::write(&path, &bytes)?;

        Ok(NewAttachment {
            filename: attachment.filename.clone(),
            storage_path: path.to_string_lossy().into_owned(),
            relative_path: attachment.relative_path.clone(),
            mime_type: attachment.mime_type.clone(),
            size_bytes: bytes.len() as u64,
        })
    }

    /// Decode and persist every attachment; aborts (no partial writes left
    /// referenced) the whole compose if any payload is malformed base64.
    fn persist_attachments(&self, user_id: i64, now_ms: i64, attachments: &[ComposeAttachment]) -> Result<Vec<NewAttachment>, MailError> {
        attachments.iter().map(|a| self.persist_attachment(user_id, now_ms, a)).collect()
    }

    pub fn compose(&self, user_id: i64, req: ComposeRequest) -> Result<ComposeOutcome, MailError> {
        let now = now_ms();
        let attachments = self.persist_attachments(user_id, now, &req.attachments)?;

        let folder = if req.custom_folder.is_some() { FolderKind::Custom } else if req.save_as_draft { FolderKind::Drafts } else { FolderKind::Sent };
        let new_msg = NewMessage {
            folder,
            custom_folder: req.custom_folder.clone().unwrap_or_default(),
            archive_group: req.archive_group.clone(),
            subject: req.subject,
            body: req.body,
            recipients: req.recipients.clone(),
            is_starred: req.starred,
            is_draft: req.save_as_draft,
            is_archived: req.archived,
        };

        if req.save_as_draft {
            let id = self.backend.save_draft(user_id, new_msg, attachments)?;
            Ok(ComposeOutcome::Drafted(id))
        } else {
            let recipients: Vec<String> = req.recipients.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
            self.backend.send_message(user_id, new_msg, attachments, &recipients)?;
            Ok(ComposeOutcome::Sent)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryBackend;

    #[test]
    fn send_with_no_attachments_reaches_recipient_inbox() {
        let backend = MemoryBackend::new();
        let alice = backend.get_user_by_username("alice").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let mail = MailService::new(&backend, dir.path());
        let outcome = mail
            .compose(
                alice.id,
                ComposeRequest {
                    subject: "hi".into(),
                    body: "hello".into(),
                    recipients: "bob".into(),
                    save_as_draft: false,
                    starred: false,
                    archived: false,
                    custom_folder: None,
                    archive_group: None,
                    attachments: vec![],
                },
            )
            .unwrap();
        assert_eq!(outcome, ComposeOutcome::Sent);
        let bob = backend.get_user_by_username("bob").unwrap();
        let inbox = backend.list_messages(bob.id, FolderKind::Inbox, None).unwrap();
        assert_eq!(inbox.len(), 1);
    }

    #[test]
    fn malformed_attachment_base64_aborts_the_whole_compose() {
        let backend = MemoryBackend::new();
        let alice = backend.get_user_by_username("alice").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let mail = MailService::new(&backend, dir.path());
        let result = mail.compose(
            alice.id,
            ComposeRequest {
                subject: "hi".into(),
                body: "hello".into(),
                recipients: "bob".into(),
                save_as_draft: false,
                starred: false,
                archived: false,
                custom_folder: None,
                archive_group: None,
                attachments: vec![ComposeAttachment {
                    filename: "a.txt".into(),
                    mime_type: "text/plain".into(),
                    relative_path: "a.txt".into(),
                    base64_data: "not valid base64!!".into(),
                }],
            },
        );
        assert!(matches!(result, Err(MailError::BadAttachment)));
        let sent = backend.list_messages(alice.id, FolderKind::Sent, None).unwrap();
        assert!(sent.is_empty());
    }

    #[test]
    fn save_as_draft_stores_in_drafts_folder() {
        let backend = MemoryBackend::new();
        let alice = backend.get_user_by_username("alice").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let mail = MailService::new(&backend, dir.path());
        let outcome = mail
            .compose(
                alice.id,
                ComposeRequest {
                    subject: "draft".into(),
                    body: "wip".into(),
                    recipients: String::new(),
                    save_as_draft: true,
                    starred: false,
                    archived: false,
                    custom_folder: None,
                    archive_group: None,
                    attachments: vec![],
                },
            )
            .unwrap();
        assert!(matches!(outcome, ComposeOutcome::Drafted(_)));
        let drafts = backend.list_messages(alice.id, FolderKind::Drafts, None).unwrap();
        assert_eq!(drafts.len(), 1);
    }
}
