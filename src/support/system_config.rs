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

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The system-wide configuration for Tinmail.
///
/// This is stored in a file conventionally named `tinmail.toml` and passed
/// to `tinmail serve` with `--config`. Every value has a default, so the
/// file (and every key in it) is optional. Command-line options override
/// values from the file.
#[derive(Clone, Debug, Deserialize, Serialize, Default)]
pub struct SystemConfig {
    /// Options for the mail server itself.
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// The address and port to listen on.
    pub listen: String,

    /// The directory under which mailboxes are kept, one subdirectory per
    /// user. Created (with ancestors) at startup if missing.
    pub spool: PathBuf,

    /// Read/write timeout applied to each connection, in seconds.
    ///
    /// A connection which neither produces nor accepts a byte for this long
    /// is dropped. This bounds the resources a dead peer can pin; it does
    /// not change the protocol a live peer observes.
    pub io_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            listen: "0.0.0.0:2525".to_owned(),
            spool: PathBuf::from("spool"),
            io_timeout_secs: 1800,
        }
    }
}
