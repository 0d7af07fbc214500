/*
 * memory.rs
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

//! In-memory storage backend: a single mutex guarding a handful of `Vec`s.
//! Acceptable for development — every operation serializes on one lock — and
//! seeded with a couple of demo users so the server is immediately
//! exercisable without a prior register call.

use std::sync::Mutex;

use crate::clock::now_ms;
use crate::error::StoreError;
use crate::store::{Attachment, Contact, Folder, FolderKind, Message, NewAttachment, NewMessage, StorageBackend, User};

fn hash_password(password: &str) -> String {
    // Non-goal: cryptographic password hashing is out of scope for the core;
    // this is an opaque, reversible-by-nobody-who-matters placeholder.
    format!("plain:{}", password)
}

struct Inner {
    users: Vec<User>,
    folders: Vec<Folder>,
    messages: Vec<Message>,
    attachments: Vec<Attachment>,
    contacts: Vec<Contact>,
    next_id: i64,
}

impl Inner {
    fn alloc_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn materialize_builtin_folders(&mut self, user_id: i64) {
        for kind in FolderKind::BUILTIN {
            if !self.folders.iter().any(|f| f.owner_id == user_id && f.kind == kind) {
                let id = self.alloc_id();
                self.folders.push(Folder {
                    id,
                    owner_id: user_id,
                    kind,
                    name: kind.as_str().to_string(),
                    created_at: now_ms(),
                });
            }
        }
    }
}

pub struct MemoryBackend {
    inner: Mutex<Inner>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        let backend = Self {
            inner: Mutex::new(Inner {
                users: Vec::new(),
                folders: Vec::new(),
                messages: Vec::new(),
                attachments: Vec::new(),
                contacts: Vec::new(),
                next_id: 0,
            }),
        };
        backend.seed_demo_data();
        backend
    }

    fn seed_demo_data(&self) {
        let _ = self.create_user("alice", "alice@example.com", "password1");
        let _ = self.create_user("bob", "bob@example.com", "password1");
    }
}

impl StorageBackend for MemoryBackend {
    fn authenticate(&self, username: &str, password: &str) -> Result<User, StoreError> {
        let inner = self.inner.lock().unwrap();
        inner
            .users
            .iter()
            .find(|u| u.username == username && u.password_hash == hash_password(password))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn get_user_by_id(&self, id: i64) -> Result<User, StoreError> {
        let inner = self.inner.lock().unwrap();
        inner.users.iter().find(|u| u.id == id).cloned().ok_or(StoreError::NotFound)
    }

    fn get_user_by_username(&self, username: &str) -> Result<User, StoreError> {
        let inner = self.inner.lock().unwrap();
        inner.users.iter().find(|u| u.username == username).cloned().ok_or(StoreError::NotFound)
    }

    fn create_user(&self, username: &str, email: &str, password: &str) -> Result<User, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.users.iter().any(|u| u.username == username) {
            return Err(StoreError::UsernameTaken);
        }
        if inner.users.iter().any(|u| u.email.eq_ignore_ascii_case(email)) {
            return Err(StoreError::EmailTaken);
        }
        let id = inner.alloc_id();
        let user = User {
            id,
            username: username.to_string(),
            email: email.to_string(),
            password_hash: hash_password(password),
            created_at: now_ms(),
        };
        inner.users.push(user.clone());
        inner.materialize_builtin_folders(id);
        Ok(user)
    }

    fn list_folders(&self, user_id: i64) -> Result<Vec<Folder>, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.materialize_builtin_folders(user_id);
        Ok(inner.folders.iter().filter(|f| f.owner_id == user_id).cloned().collect())
    }

    fn create_folder(&self, user_id: i64, name: &str, kind: FolderKind) -> Result<Folder, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if kind == FolderKind::Custom
            && inner.folders.iter().any(|f| f.owner_id == user_id && f.kind == FolderKind::Custom && f.name == name)
        {
            return Err(StoreError::Backend("custom folder name already exists".to_string()));
        }
        let id = inner.alloc_id();
        let folder = Folder {
            id,
            owner_id: user_id,
            kind,
            name: name.to_string(),
            created_at: now_ms(),
        };
        inner.folders.push(folder.clone());
        Ok(folder)
    }

    fn list_messages(&self, user_id: i64, folder: FolderKind, custom: Option<&str>) -> Result<Vec<Message>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut msgs: Vec<Message> = inner
            .messages
            .iter()
            .filter(|m| {
                m.owner_id == user_id
                    && m.folder == folder
                    && (folder != FolderKind::Custom || Some(m.custom_folder.as_str()) == custom)
            })
            .cloned()
            .collect();
        msgs.sort_by_key(|m| std::cmp::Reverse(m.updated_at));
        Ok(msgs)
    }

    fn get_message(&self, user_id: i64, msg_id: i64) -> Result<(Message, Vec<Attachment>), StoreError> {
        let inner = self.inner.lock().unwrap();
        let msg = inner
            .messages
            .iter()
            .find(|m| m.id == msg_id && m.owner_id == user_id)
            .cloned()
            .ok_or(StoreError::NotFound)?;
        let attachments = inner.attachments.iter().filter(|a| a.message_id == msg_id).cloned().collect();
        Ok((msg, attachments))
    }

    fn save_draft(&self, user_id: i64, msg: NewMessage, attachments: Vec<NewAttachment>) -> Result<i64, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let id = insert_message(&mut inner, user_id, FolderKind::Drafts, String::new(), msg, attachments);
        Ok(id)
    }

    fn send_message(&self, user_id: i64, msg: NewMessage, attachments: Vec<NewAttachment>, recipients: &[String]) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();

        let mut recipient_ids = Vec::new();
        for name in recipients {
            if let Some(u) = inner.users.iter().find(|u| &u.username == name) {
                recipient_ids.push(u.id);
            }
        }

        insert_message(&mut inner, user_id, FolderKind::Sent, msg.custom_folder.clone(), msg.clone(), attachments.clone());
        for rid in recipient_ids {
            insert_message(&mut inner, rid, FolderKind::Inbox, String::new(), msg.clone(), attachments.clone());
        }
        Ok(())
    }

    fn star_message(&self, user_id: i64, msg_id: i64, starred: bool) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let idx = inner
            .messages
            .iter()
            .position(|m| m.id == msg_id && m.owner_id == user_id)
            .ok_or(StoreError::NotFound)?;
        inner.messages[idx].is_starred = starred;
        inner.messages[idx].updated_at = now_ms();

        // Open Question 1: the memory backend materializes a second copy in
        // the Starred folder on star; it is left in place (unstarred copy
        // untouched) when un-starring, matching the reference stub.
        if starred {
            let source = inner.messages[idx].clone();
            let already_starred = inner.messages.iter().any(|m| {
                m.owner_id == user_id
                    && m.folder == FolderKind::Starred
                    && m.subject == source.subject
                    && m.created_at == source.created_at
            });
            if !already_starred {
                let id = inner.alloc_id();
                let mut copy = source;
                copy.id = id;
                copy.folder = FolderKind::Starred;
                copy.custom_folder = String::new();
                inner.messages.push(copy);
            }
        }
        Ok(())
    }

    fn archive_message(&self, user_id: i64, msg_id: i64, archived: bool, group: Option<&str>) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let idx = inner
            .messages
            .iter()
            .position(|m| m.id == msg_id && m.owner_id == user_id)
            .ok_or(StoreError::NotFound)?;
        let m = &mut inner.messages[idx];
        m.is_archived = archived;
        m.folder = if archived { FolderKind::Archive } else { FolderKind::Inbox };
        if let Some(g) = group {
            m.archive_group = Some(g.to_string());
        }
        m.updated_at = now_ms();
        Ok(())
    }

    fn list_contacts(&self, user_id: i64) -> Result<Vec<Contact>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut contacts: Vec<Contact> = inner.contacts.iter().filter(|c| c.user_id == user_id).cloned().collect();
        contacts.sort_by(|a, b| a.alias.cmp(&b.alias));
        Ok(contacts)
    }

    fn add_contact(&self, user_id: i64, contact_user_id: i64, alias: &str, group_name: &str) -> Result<Contact, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.contacts.iter().any(|c| c.user_id == user_id && c.contact_user_id == contact_user_id) {
            return Err(StoreError::Backend("contact already exists".to_string()));
        }
        let id = inner.alloc_id();
        let contact = Contact {
            id,
            user_id,
            contact_user_id,
            alias: alias.to_string(),
            group_name: group_name.to_string(),
            created_at: now_ms(),
        };
        inner.contacts.push(contact.clone());
        Ok(contact)
    }
}

fn insert_message(inner: &mut Inner, owner_id: i64, folder: FolderKind, custom_folder: String, msg: NewMessage, attachments: Vec<NewAttachment>) -> i64 {
    let id = inner.alloc_id();
    let now = now_ms();
    let custom_folder = if folder == FolderKind::Custom { msg.custom_folder.clone() } else { custom_folder };
    let message = Message {
        id,
        owner_id,
        folder,
        custom_folder,
        archive_group: msg.archive_group.clone(),
        subject: msg.subject.clone(),
        body: msg.body.clone(),
        recipients: msg.recipients.clone(),
        is_starred: msg.is_starred,
        is_draft: folder == FolderKind::Drafts,
        is_archived: msg.is_archived,
        created_at: now,
        updated_at: now,
    };
    inner.messages.push(message);
    for att in attachments {
        let aid = inner.alloc_id();
        inner.attachments.push(Attachment {
            id: aid,
            message_id: id,
            filename: att.filename,
            storage_path: att.storage_path,
            relative_path: att.relative_path,
            mime_type: att.mime_type,
            size_bytes: att.size_bytes,
        });
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_username_rejected() {
        let backend = MemoryBackend::new();
        assert!(matches!(backend.create_user("alice", "new@example.com", "secret1"), Err(StoreError::UsernameTaken)));
    }

    #[test]
    fn duplicate_email_is_case_insensitive() {
        let backend = MemoryBackend::new();
        let err = backend.create_user("carol", "ALICE@example.com", "secret1").unwrap_err();
        assert!(matches!(err, StoreError::EmailTaken));
    }

    #[test]
    fn new_user_gets_five_builtin_folders() {
        let backend = MemoryBackend::new();
        let user = backend.create_user("dave", "dave@example.com", "secret1").unwrap();
        let folders = backend.list_folders(user.id).unwrap();
        assert_eq!(folders.len(), 5);
    }

    #[test]
    fn send_fan_out_creates_sent_plus_inbox_copies() {
        let backend = MemoryBackend::new();
        let alice = backend.get_user_by_username("alice").unwrap();
        let msg = NewMessage {
            folder: FolderKind::Sent,
            custom_folder: String::new(),
            archive_group: None,
            subject: "hi".to_string(),
            body: "hello".to_string(),
            recipients: "bob".to_string(),
            is_starred: false,
            is_draft: false,
            is_archived: false,
        };
        backend.send_message(alice.id, msg, Vec::new(), &["bob".to_string()]).unwrap();

        let sent = backend.list_messages(alice.id, FolderKind::Sent, None).unwrap();
        assert_eq!(sent.len(), 1);

        let bob = backend.get_user_by_username("bob").unwrap();
        let inbox = backend.list_messages(bob.id, FolderKind::Inbox, None).unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].subject, "hi");
    }

    #[test]
    fn unresolvable_recipient_is_skipped_silently() {
        let backend = MemoryBackend::new();
        let alice = backend.get_user_by_username("alice").unwrap();
        let msg = NewMessage {
            folder: FolderKind::Sent,
            custom_folder: String::new(),
            archive_group: None,
            subject: "hi".to_string(),
            body: "hello".to_string(),
            recipients: "ghost".to_string(),
            is_starred: false,
            is_draft: false,
            is_archived: false,
        };
        assert!(backend.send_message(alice.id, msg, Vec::new(), &["ghost".to_string()]).is_ok());
        let sent = backend.list_messages(alice.id, FolderKind::Sent, None).unwrap();
        assert_eq!(sent.len(), 1);
    }
}
