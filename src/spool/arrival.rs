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

use chrono::prelude::*;

/// The extension borne by message files in a mailbox.
///
/// Enumeration only considers files with this extension, which keeps staged
/// temporary files and stray droppings out of the mailbox ordering.
pub const MESSAGE_EXTENSION: &str = "txt";

/// The identity assigned to a message when it arrives.
///
/// An identity is a wall-clock timestamp at second resolution plus a
/// sequence number disambiguating messages which arrive within the same
/// second. The derived file name, `YYYYMMDD_HHMMSS_SEQ.txt` with `SEQ`
/// zero-padded to three digits, sorts lexicographically in arrival order,
/// which is the total order every mailbox enumeration is built on.
#[derive(Debug, Clone)]
pub struct ArrivalId {
    stamp: String,
    seq: u32,
}

impl ArrivalId {
    /// Return the first candidate identity for a message arriving at
    /// `time`.
    pub fn first(time: DateTime<Local>) -> Self {
        ArrivalId {
            stamp: time.format("%Y%m%d_%H%M%S").to_string(),
            seq: 1,
        }
    }

    /// Return the identity to try after `self` was found to be taken.
    pub fn next(&self) -> Self {
        ArrivalId {
            stamp: self.stamp.clone(),
            seq: self.seq + 1,
        }
    }

    /// The file name a message with this identity is stored under.
    pub fn file_name(&self) -> String {
        format!("{}_{:03}.{}", self.stamp, self.seq, MESSAGE_EXTENSION)
    }
}
