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
use std::net::{self, ToSocketAddrs};

use super::main::ClientSubcommand;
use crate::protocol::syntax::{Verb, BODY_TERMINATOR, RESP_OK};
use crate::protocol::transport::{read_line, send_line};
use crate::support::user_name::{is_valid_user_name, MAX_SUBJECT_LEN};

pub(super) fn client(cmd: ClientSubcommand) {
    if let Err(e) = client_impl(cmd) {
        die!(EX_SOFTWARE, "Error: {}", e);
    }
}

fn client_impl(cmd: ClientSubcommand) -> io::Result<()> {
    let mut addresses = (&cmd.host as &str, cmd.port).to_socket_addrs()?;
    let address = addresses.next().ok_or_else(|| {
        io::Error::new(io::ErrorKind::Other, "Host not found")
    })?;

    let stream = net::TcpStream::connect(address)?;
    let mut session = Session {
        read: io::BufReader::new(stream.try_clone()?),
        write: stream,
        last_listed_user: None,
    };

    println!("Connected. Commands: SEND, LIST, READ, DEL, QUIT");
    session.run()?;
    println!("Disconnected.");
    Ok(())
}

/// The interactive side of one client connection.
struct Session {
    read: io::BufReader<net::TcpStream>,
    write: net::TcpStream,
    /// The user most recently LISTed. READ and DEL offer this as the
    /// default when their user-name prompt is left empty.
    last_listed_user: Option<String>,
}

impl Session {
    fn run(&mut self) -> io::Result<()> {
        loop {
            let command = match prompt("> ")? {
                Some(command) => command.to_uppercase(),
                None => break,
            };
            if command.is_empty() {
                continue;
            }

            match command.parse::<Verb>() {
                Ok(Verb::Send) => self.cmd_send()?,
                Ok(Verb::List) => self.cmd_list()?,
                Ok(Verb::Read) => self.cmd_read()?,
                Ok(Verb::Del) => self.cmd_del()?,
                Ok(Verb::Quit) => {
                    send_line(&mut self.write, Verb::Quit.name())?;
                    break;
                },
                Err(()) => println!("Unknown command"),
            }
        }

        Ok(())
    }

    fn cmd_send(&mut self) -> io::Result<()> {
        let sender = match prompt("Sender: ")? {
            Some(sender) => sender,
            None => return Ok(()),
        };
        let receiver = match prompt("Receiver: ")? {
            Some(receiver) => receiver,
            None => return Ok(()),
        };
        let subject = match prompt("Subject: ")? {
            Some(subject) => subject,
            None => return Ok(()),
        };

        if !is_valid_user_name(&sender) || !is_valid_user_name(&receiver) {
            println!("Invalid username");
            return Ok(());
        }
        if subject.is_empty() || subject.len() > MAX_SUBJECT_LEN {
            println!("Invalid subject");
            return Ok(());
        }

        send_line(&mut self.write, Verb::Send.name())?;
        send_line(&mut self.write, &sender)?;
        send_line(&mut self.write, &receiver)?;
        send_line(&mut self.write, &subject)?;

        println!("Message (end with '.'):");
        loop {
            let line = match prompt("")? {
                Some(line) => line,
                // End of input terminates the body like a bare dot does
                None => {
                    send_line(&mut self.write, BODY_TERMINATOR)?;
                    break;
                },
            };
            send_line(&mut self.write, &line)?;
            if BODY_TERMINATOR == line {
                break;
            }
        }

        println!("{}", self.server_line()?);
        Ok(())
    }

    fn cmd_list(&mut self) -> io::Result<()> {
        let user = match prompt("Username: ")? {
            Some(user) => user,
            None => return Ok(()),
        };
        if !is_valid_user_name(&user) {
            println!("Invalid username");
            return Ok(());
        }

        send_line(&mut self.write, Verb::List.name())?;
        send_line(&mut self.write, &user)?;

        let count = self
            .server_line()?
            .parse::<usize>()
            .map_err(|_| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    "Malformed message count from server",
                )
            })?;

        println!("Messages: {}", count);
        for index in 1..=count {
            println!("{}) {}", index, self.server_line()?);
        }

        self.last_listed_user = Some(user);
        Ok(())
    }

    fn cmd_read(&mut self) -> io::Result<()> {
        let (user, number) = match self.prompt_message_reference()? {
            Some(reference) => reference,
            None => return Ok(()),
        };

        send_line(&mut self.write, Verb::Read.name())?;
        send_line(&mut self.write, &user)?;
        send_line(&mut self.write, &number)?;

        if RESP_OK == self.server_line()? {
            loop {
                let line = self.server_line()?;
                if BODY_TERMINATOR == line {
                    break;
                }
                println!("{}", line);
            }
            println!("{}", BODY_TERMINATOR);
        } else {
            println!("ERR");
        }

        Ok(())
    }

    fn cmd_del(&mut self) -> io::Result<()> {
        let (user, number) = match self.prompt_message_reference()? {
            Some(reference) => reference,
            None => return Ok(()),
        };

        send_line(&mut self.write, Verb::Del.name())?;
        send_line(&mut self.write, &user)?;
        send_line(&mut self.write, &number)?;

        println!("{}", self.server_line()?);
        Ok(())
    }

    /// Prompt for the user name and message number READ and DEL both take.
    ///
    /// An empty user name falls back to the most recently listed user, if
    /// any. `None` means the command was abandoned.
    fn prompt_message_reference(
        &mut self,
    ) -> io::Result<Option<(String, String)>> {
        let prompt_text = match self.last_listed_user {
            Some(ref user) => format!("Username [{}]: ", user),
            None => "Username: ".to_owned(),
        };

        let mut user = match prompt(&prompt_text)? {
            Some(user) => user,
            None => return Ok(None),
        };
        if user.is_empty() {
            if let Some(ref last) = self.last_listed_user {
                user = last.clone();
            }
        }
        if !is_valid_user_name(&user) {
            println!("Invalid username");
            return Ok(None);
        }

        let number = match prompt("Message#: ")? {
            Some(number) => number,
            None => return Ok(None),
        };

        Ok(Some((user, number)))
    }

    fn server_line(&mut self) -> io::Result<String> {
        read_line(&mut self.read)?.ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "Server closed the connection",
            )
        })
    }
}

/// Display `text` and read one line from standard input.
///
/// `None` on end of input.
fn prompt(text: &str) -> io::Result<Option<String>> {
    let mut stdout = io::stdout();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()?;

    let mut line = String::new();
    if 0 == io::stdin().lock().read_line(&mut line)? {
        return Ok(None);
    }

    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(Some(line))
}
