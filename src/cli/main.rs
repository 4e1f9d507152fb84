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

use std::fs;
use std::io::Read;
use std::path::PathBuf;

use structopt::clap;
use structopt::StructOpt;

use crate::support::sysexits::*;
use crate::support::system_config::SystemConfig;

#[derive(StructOpt)]
#[structopt(max_term_width = 80)]
enum Command {
    /// Run the mail server.
    ///
    /// The server listens for TCP connections and services each one on its
    /// own thread until the client sends QUIT or disconnects. The spool
    /// root is created (ancestors included) before the listener binds.
    Serve(ServeSubcommand),
    /// Connect to a Tinmail server interactively.
    ///
    /// Commands are read from standard input. Verbs are upper-cased before
    /// being sent, and user names and subjects are validated locally before
    /// anything goes on the wire.
    Client(ClientSubcommand),
}

#[derive(StructOpt)]
pub(super) struct ServeSubcommand {
    /// The file to load configuration from. Values given on the command
    /// line override values from the file.
    #[structopt(long, parse(from_os_str))]
    config: Option<PathBuf>,

    /// The address to listen on [default: 0.0.0.0:2525]
    #[structopt(long)]
    listen: Option<String>,

    /// The directory under which mailboxes are kept [default: spool]
    #[structopt(long, parse(from_os_str))]
    spool: Option<PathBuf>,
}

#[derive(StructOpt)]
pub(super) struct ClientSubcommand {
    /// The host to connect to.
    pub(super) host: String,

    /// The port to connect to.
    pub(super) port: u16,
}

pub fn main() {
    // Clap exits with status 1 instead of EX_USAGE if we use the more
    // concise API
    let cmd = Command::from_clap(&match Command::clap().get_matches_safe() {
        Ok(matches) => matches,
        Err(
            e @ clap::Error {
                kind: clap::ErrorKind::HelpDisplayed,
                ..
            },
        )
        | Err(
            e @ clap::Error {
                kind: clap::ErrorKind::VersionDisplayed,
                ..
            },
        ) => {
            println!("{}", e.message);
            return;
        },
        Err(e) => {
            eprintln!("{}", e.message);
            EX_USAGE.exit()
        },
    });

    match cmd {
        Command::Serve(cmd) => super::serve::serve(load_config(cmd)),
        Command::Client(cmd) => super::client::client(cmd),
    }
}

fn load_config(mut cmd: ServeSubcommand) -> SystemConfig {
    let mut config = match cmd.config {
        None => SystemConfig::default(),
        Some(ref path) => {
            let mut config_toml = Vec::new();
            if let Err(e) = fs::File::open(path)
                .and_then(|mut f| f.read_to_end(&mut config_toml))
            {
                eprintln!("Error reading '{}': {}", path.display(), e);
                EX_CONFIG.exit();
            }

            match toml::from_slice(&config_toml) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!(
                        "Error in config file at '{}': {}",
                        path.display(),
                        e
                    );
                    EX_CONFIG.exit()
                },
            }
        },
    };

    if let Some(listen) = cmd.listen.take() {
        config.server.listen = listen;
    }
    if let Some(spool) = cmd.spool.take() {
        config.server.spool = spool;
    }

    config
}
