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

use std::str::FromStr;

/// Affirmative response token.
pub const RESP_OK: &str = "OK";
/// Negative response token. The protocol carries no error codes or
/// messages; every failure a session survives looks exactly like this.
pub const RESP_ERR: &str = "ERR";

/// The line which terminates a message body in SEND, and which the server
/// appends after the last line of a READ response.
///
/// The comparison is against the whole line, not a prefix, so a body line
/// consisting of a single dot is indistinguishable from the terminator.
/// This is a known limitation of the wire format, not something to repair
/// here.
pub const BODY_TERMINATOR: &str = ".";

/// A command verb, as sent on the first line of an exchange.
///
/// Verbs are case-sensitive; a well-behaved client upper-cases what the
/// user typed before sending it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verb {
    /// `SEND`, followed by sender, receiver, and subject lines, then body
    /// lines terminated by a line equal to `.`.
    Send,
    /// `LIST`, followed by the user name.
    List,
    /// `READ`, followed by the user name and a 1-based message index.
    Read,
    /// `DEL`, followed by the user name and a 1-based message index.
    Del,
    /// `QUIT`.
    Quit,
}

impl Verb {
    /// The exact token this verb is sent as.
    pub fn name(self) -> &'static str {
        match self {
            Verb::Send => "SEND",
            Verb::List => "LIST",
            Verb::Read => "READ",
            Verb::Del => "DEL",
            Verb::Quit => "QUIT",
        }
    }
}

impl FromStr for Verb {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "SEND" => Ok(Verb::Send),
            "LIST" => Ok(Verb::List),
            "READ" => Ok(Verb::Read),
            "DEL" => Ok(Verb::Del),
            "QUIT" => Ok(Verb::Quit),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn verb_parsing() {
        assert_eq!(Ok(Verb::Send), "SEND".parse());
        assert_eq!(Ok(Verb::List), "LIST".parse());
        assert_eq!(Ok(Verb::Read), "READ".parse());
        assert_eq!(Ok(Verb::Del), "DEL".parse());
        assert_eq!(Ok(Verb::Quit), "QUIT".parse());

        assert_eq!(Err(()), "send".parse::<Verb>());
        assert_eq!(Err(()), "Send".parse::<Verb>());
        assert_eq!(Err(()), "SEND ".parse::<Verb>());
        assert_eq!(Err(()), " SEND".parse::<Verb>());
        assert_eq!(Err(()), "DELETE".parse::<Verb>());
        assert_eq!(Err(()), "".parse::<Verb>());
    }

    #[test]
    fn verb_names_round_trip() {
        for &verb in
            &[Verb::Send, Verb::List, Verb::Read, Verb::Del, Verb::Quit]
        {
            assert_eq!(Ok(verb), verb.name().parse());
        }
    }
}
