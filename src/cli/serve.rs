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
use std::io;
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};

use crate::protocol::server::Server;
use crate::spool::store::Spool;
use crate::support::system_config::SystemConfig;

// Need to use this and not die! so that errors go through the logger
macro_rules! fatal {
    ($ex:ident, $($stuff:tt)*) => {{
        error!($($stuff)*);
        crate::support::sysexits::$ex.exit()
    }}
}

pub(super) fn serve(config: SystemConfig) -> ! {
    crate::init_simple_log();

    if let Err(e) = fs::create_dir_all(&config.server.spool) {
        fatal!(
            EX_CANTCREAT,
            "Unable to create spool root '{}': {}",
            config.server.spool.display(),
            e
        );
    }

    let listener = match TcpListener::bind(&config.server.listen) {
        Ok(listener) => listener,
        Err(e) => fatal!(
            EX_UNAVAILABLE,
            "Unable to bind '{}': {}",
            config.server.listen,
            e
        ),
    };

    info!(
        "Listening on {}, spooling to '{}'",
        config.server.listen,
        config.server.spool.display()
    );

    let spool = Arc::new(Spool::new(config.server.spool.clone()));
    let io_timeout = Duration::from_secs(config.server.io_timeout_secs);

    loop {
        let (stream, origin) = match listener.accept() {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("Failed to accept connection: {}", e);
                continue;
            },
        };

        if let Err(e) = stream
            .set_read_timeout(Some(io_timeout))
            .and_then(|_| stream.set_write_timeout(Some(io_timeout)))
        {
            warn!("{} Unable to configure timeouts: {}", origin, e);
        }

        let stream_out = match stream.try_clone() {
            Ok(stream_out) => stream_out,
            Err(e) => {
                warn!("{} Failed to duplicate socket handle: {}", origin, e);
                continue;
            },
        };

        let spool = Arc::clone(&spool);
        std::thread::spawn(move || {
            info!("{} Connection established", origin);

            let mut server = Server::new(
                Box::new(io::BufReader::new(stream)),
                Box::new(io::BufWriter::new(stream_out)),
                spool,
                origin.to_string(),
            );

            match server.run() {
                Ok(()) => info!("{} Normal client disconnect", origin),
                Err(e) => warn!("{} Abnormal client disconnect: {}", origin, e),
            }
        });
    }
}
