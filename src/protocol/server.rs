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

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use log::{info, warn};

use super::syntax::{Verb, BODY_TERMINATOR, RESP_ERR, RESP_OK};
use super::transport::{read_line, send_line};
use crate::spool::store::Spool;
use crate::support::error::Error;
use crate::support::user_name::is_valid_user_name;

/// One connection's command loop.
///
/// The session awaits a command verb, runs that command's fixed exchange of
/// request and response lines, and returns to awaiting the next verb; no
/// state survives from one command to the next. The session ends on QUIT,
/// on an empty or absent command line, or on a transport fault.
///
/// Errors a command can recover from — an unknown verb, a malformed or
/// out-of-range index, a rejected delivery — are answered with a single
/// `ERR` line and the loop continues. Transport faults (including EOF in
/// the middle of a command's exchange) propagate out of `run` and end the
/// session without telling the peer, who has already lost the channel.
pub struct Server {
    read: Box<dyn BufRead + Send>,
    write: Box<dyn Write + Send>,
    spool: Arc<Spool>,
    log_prefix: String,
}

impl Server {
    pub fn new(
        read: Box<dyn BufRead + Send>,
        write: Box<dyn Write + Send>,
        spool: Arc<Spool>,
        log_prefix: String,
    ) -> Self {
        Server {
            read,
            write,
            spool,
            log_prefix,
        }
    }

    /// Run the session to completion.
    ///
    /// Blocks on the connection between commands.
    pub fn run(&mut self) -> Result<(), Error> {
        loop {
            let command = match read_line(&mut self.read)? {
                Some(line) => line,
                // Peer disconnected between commands
                None => break,
            };
            if command.is_empty() {
                break;
            }

            match command.parse::<Verb>() {
                Ok(Verb::Send) => self.cmd_send()?,
                Ok(Verb::List) => self.cmd_list()?,
                Ok(Verb::Read) => self.cmd_read()?,
                Ok(Verb::Del) => self.cmd_del()?,
                Ok(Verb::Quit) => break,
                Err(()) => {
                    warn!(
                        "{} Unrecognised command {:?}",
                        self.log_prefix,
                        truncated(&command)
                    );
                    self.respond(RESP_ERR)?;
                },
            }

            self.write.flush()?;
        }

        Ok(())
    }

    fn cmd_send(&mut self) -> Result<(), Error> {
        let sender = self.expect_line()?;
        let receiver = self.expect_line()?;
        let subject = self.expect_line()?;

        // The body must be consumed whether or not the envelope is
        // acceptable, or the remaining body lines would be parsed as
        // commands.
        let mut body = Vec::new();
        loop {
            let line = self.expect_line()?;
            if BODY_TERMINATOR == line {
                break;
            }
            body.push(line);
        }

        if sender.is_empty() || subject.is_empty() {
            return self.respond(RESP_ERR);
        }
        if !is_valid_user_name(&receiver) {
            warn!(
                "{} Rejected delivery to {:?}",
                self.log_prefix,
                truncated(&receiver)
            );
            return self.respond(RESP_ERR);
        }

        match self.spool.deliver(&receiver, &subject, &body) {
            Ok(()) => {
                info!(
                    "{} Delivered message from {} to {}",
                    self.log_prefix,
                    truncated(&sender),
                    receiver
                );
                self.respond(RESP_OK)
            },
            Err(e) => {
                warn!(
                    "{} Delivery to {} failed: {}",
                    self.log_prefix, receiver, e
                );
                self.respond(RESP_ERR)
            },
        }
    }

    fn cmd_list(&mut self) -> Result<(), Error> {
        let user = self.expect_line()?;

        // LIST has no failure response; a name which cannot denote a
        // mailbox is indistinguishable from an empty mailbox.
        let subjects = if is_valid_user_name(&user) {
            self.spool.list(&user)
        } else {
            Vec::new()
        };

        send_line(&mut self.write, &subjects.len().to_string())?;
        for subject in &subjects {
            send_line(&mut self.write, subject)?;
        }
        Ok(())
    }

    fn cmd_read(&mut self) -> Result<(), Error> {
        let (user, index) = match self.message_reference()? {
            Some(reference) => reference,
            None => return self.respond(RESP_ERR),
        };

        match self.spool.fetch(&user, index) {
            Ok(lines) => {
                self.respond(RESP_OK)?;
                for line in &lines {
                    send_line(&mut self.write, line)?;
                }
                send_line(&mut self.write, BODY_TERMINATOR)?;
                Ok(())
            },
            Err(Error::NxMessage) => self.respond(RESP_ERR),
            Err(e) => {
                warn!(
                    "{} READ {} {} failed: {}",
                    self.log_prefix, user, index, e
                );
                self.respond(RESP_ERR)
            },
        }
    }

    fn cmd_del(&mut self) -> Result<(), Error> {
        let (user, index) = match self.message_reference()? {
            Some(reference) => reference,
            None => return self.respond(RESP_ERR),
        };

        match self.spool.delete(&user, index) {
            Ok(()) => {
                info!(
                    "{} Deleted message {} of {}",
                    self.log_prefix, index, user
                );
                self.respond(RESP_OK)
            },
            Err(Error::NxMessage) => self.respond(RESP_ERR),
            Err(e) => {
                warn!(
                    "{} DEL {} {} failed: {}",
                    self.log_prefix, user, index, e
                );
                self.respond(RESP_ERR)
            },
        }
    }

    /// Read and vet the user-name and index argument lines shared by READ
    /// and DEL.
    ///
    /// Both lines are always consumed; `None` means they did not survive
    /// validation.
    fn message_reference(&mut self) -> Result<Option<(String, usize)>, Error> {
        let user = self.expect_line()?;
        let index = self.expect_line()?;

        let index = match index.parse::<usize>() {
            Ok(index) => index,
            Err(_) => return Ok(None),
        };
        if !is_valid_user_name(&user) {
            return Ok(None);
        }

        Ok(Some((user, index)))
    }

    /// Read the next line of the current command's exchange.
    ///
    /// Between commands EOF is a normal disconnect, but mid-exchange it is
    /// a transport fault.
    fn expect_line(&mut self) -> Result<String, Error> {
        match read_line(&mut self.read)? {
            Some(line) => Ok(line),
            None => Err(Error::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "EOF reached mid-command",
            ))),
        }
    }

    fn respond(&mut self, response: &str) -> Result<(), Error> {
        send_line(&mut self.write, response)?;
        Ok(())
    }
}

fn truncated(s: &str) -> &str {
    match s.char_indices().nth(64) {
        Some((ix, _)) => &s[..ix],
        None => s,
    }
}
