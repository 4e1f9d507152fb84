//-
// Copyright (c) 2024, Jason Lingle
//
// This file is part of Tinmail.
//
// Tinmail is free software: you can  redistribute it and/or modify it under
// the terms of  the GNU General Public License as  published by the Free
// Software Foundation, either version 3 of  the License, or (at your option)
// any later version.
//
// Tinmail is distributed  in the hope that  it will be useful,  but WITHOUT
// ANY WARRANTY; without even  the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for
// more details.
//
// You should have received a copy of the GNU General Public License along
// with Tinmail. If not, see <http://www.gnu.org/licenses/>.

//! The mailbox store.
//!
//! A mailbox is a directory under the spool root named after its user,
//! created lazily on first delivery and never deleted. Each message is one
//! file inside it whose first line is the subject and whose remaining lines
//! are the body. Message files are named after their arrival identity (see
//! `arrival`), so the lexicographic order of file names is arrival order;
//! `list`, `fetch`, and `delete` all address messages through that ordering,
//! recomputed from the directory on every call. A 1-based index is therefore
//! only meaningful relative to the mailbox's state at the time of the call —
//! an index obtained from one enumeration can go stale if a delivery or
//! deletion lands before it is used.

use std::collections::HashMap;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Local;
use log::warn;

use super::arrival::{ArrivalId, MESSAGE_EXTENSION};
use crate::support::error::Error;

/// Subject reported for a message file with no readable first line.
const NO_SUBJECT: &str = "(No Subject)";

/// The spool: every mailbox on this host, rooted at one directory.
///
/// User names are used verbatim as path components; callers are responsible
/// for validating them first (see `support::user_name`). All operations take
/// a per-mailbox lock, so concurrent sessions touching the same mailbox
/// serialise against each other and each call observes a consistent
/// snapshot.
pub struct Spool {
    root: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Spool {
    pub fn new(root: PathBuf) -> Self {
        Spool {
            root,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Persist a new message in `user`'s mailbox.
    ///
    /// The mailbox directory is created if it does not yet exist. The
    /// message is staged in a temporary file and moved to its final name
    /// with a no-clobber rename, retrying with the next sequence number
    /// while the name is taken, so a half-written message is never visible
    /// and two deliveries can never claim the same name. On failure nothing
    /// is retained.
    pub fn deliver(
        &self,
        user: &str,
        subject: &str,
        body: &[String],
    ) -> Result<(), Error> {
        let lock = self.mailbox_lock(user);
        let _lock = lock.lock().unwrap();

        let mailbox = self.root.join(user);
        fs::create_dir_all(&mailbox)?;

        let mut staged = tempfile::NamedTempFile::new_in(&mailbox)?;
        {
            let file = staged.as_file_mut();
            writeln!(file, "{}", subject)?;
            for line in body {
                writeln!(file, "{}", line)?;
            }
            file.sync_all()?;
        }

        let mut id = ArrivalId::first(Local::now());
        loop {
            match staged.persist_noclobber(mailbox.join(id.file_name())) {
                Ok(_) => return Ok(()),
                Err(e) if io::ErrorKind::AlreadyExists == e.error.kind() => {
                    staged = e.file;
                    id = id.next();
                },
                Err(e) => return Err(e.error.into()),
            }
        }
    }

    /// Return the subjects of `user`'s messages, in arrival order.
    ///
    /// A nonexistent mailbox is an empty one. This operation has no failure
    /// mode: trouble reading the directory yields whatever could be read,
    /// and a message whose subject line cannot be read is reported with a
    /// placeholder.
    pub fn list(&self, user: &str) -> Vec<String> {
        let lock = self.mailbox_lock(user);
        let _lock = lock.lock().unwrap();

        self.message_files(user)
            .iter()
            .map(|path| read_subject(path))
            .collect()
    }

    /// Return every stored line of the message at 1-based `index` in
    /// `user`'s mailbox, subject line first.
    pub fn fetch(&self, user: &str, index: usize) -> Result<Vec<String>, Error> {
        let lock = self.mailbox_lock(user);
        let _lock = lock.lock().unwrap();

        let path = self.message_at(user, index)?;
        let reader = io::BufReader::new(fs::File::open(&path)?);
        let mut lines = Vec::new();
        for line in reader.lines() {
            lines.push(line?);
        }
        Ok(lines)
    }

    /// Permanently remove the message at 1-based `index` in `user`'s
    /// mailbox.
    pub fn delete(&self, user: &str, index: usize) -> Result<(), Error> {
        let lock = self.mailbox_lock(user);
        let _lock = lock.lock().unwrap();

        let path = self.message_at(user, index)?;
        fs::remove_file(&path)?;
        Ok(())
    }

    fn mailbox_lock(&self, user: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        Arc::clone(locks.entry(user.to_owned()).or_default())
    }

    /// Resolve a 1-based index against the mailbox's current ordering.
    fn message_at(&self, user: &str, index: usize) -> Result<PathBuf, Error> {
        let mut files = self.message_files(user);
        if 0 == index || index > files.len() {
            return Err(Error::NxMessage);
        }
        Ok(files.swap_remove(index - 1))
    }

    /// Enumerate the message files of `user`'s mailbox, sorted by file
    /// name.
    ///
    /// File names embed the arrival identity, so the sort yields arrival
    /// order; raw directory iteration order is unspecified and never used.
    fn message_files(&self, user: &str) -> Vec<PathBuf> {
        let mailbox = self.root.join(user);
        let entries = match fs::read_dir(&mailbox) {
            Ok(entries) => entries,
            Err(ref e) if io::ErrorKind::NotFound == e.kind() => {
                return Vec::new()
            },
            Err(e) => {
                warn!("Unable to list '{}': {}", mailbox.display(), e);
                return Vec::new();
            },
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Error listing '{}': {}", mailbox.display(), e);
                    continue;
                },
            };

            let path = entry.path();
            let is_message = entry
                .file_type()
                .map(|ty| ty.is_file())
                .unwrap_or(false)
                && Some(MESSAGE_EXTENSION)
                    == path.extension().and_then(|e| e.to_str());
            if is_message {
                files.push(path);
            }
        }

        files.sort();
        files
    }
}

fn read_subject(path: &Path) -> String {
    let mut subject = String::new();
    let status = fs::File::open(path)
        .map(io::BufReader::new)
        .and_then(|mut reader| reader.read_line(&mut subject));
    match status {
        Ok(n) if n > 0 => {
            while subject.ends_with('\n') || subject.ends_with('\r') {
                subject.pop();
            }
            subject
        },
        Ok(_) => NO_SUBJECT.to_owned(),
        Err(e) => {
            warn!("Unable to read '{}': {}", path.display(), e);
            NO_SUBJECT.to_owned()
        },
    }
}
