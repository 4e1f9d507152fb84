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

/// The maximum length of a user name, in bytes.
pub const MAX_USER_LEN: usize = 8;

/// The maximum length of a message subject accepted by the client, in bytes.
///
/// This is advisory only; the server stores whatever single line it is
/// given.
pub const MAX_SUBJECT_LEN: usize = 80;

/// Determine whether the given name is a valid user name.
///
/// User names double as file system elements under the spool root, so this
/// is also the input-sanitisation boundary: anything which passes is safe to
/// use as a single path component. The grammar is deliberately narrow — 1 to
/// 8 characters, each an ASCII lowercase letter or decimal digit — which
/// excludes directory traversal, path separators, hidden files, and control
/// characters without needing to enumerate them.
pub fn is_valid_user_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_USER_LEN
        && name
            .bytes()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_is_valid_user_name() {
        assert!(is_valid_user_name("a"));
        assert!(is_valid_user_name("zim"));
        assert!(is_valid_user_name("user42"));
        assert!(is_valid_user_name("12345678"));
        assert!(!is_valid_user_name(""));
        assert!(!is_valid_user_name("ninechars"));
        assert!(!is_valid_user_name("Dib"));
        assert!(!is_valid_user_name("foo bar"));
        assert!(!is_valid_user_name("foo.bar"));
        assert!(!is_valid_user_name("foo/bar"));
        assert!(!is_valid_user_name("foo\\bar"));
        assert!(!is_valid_user_name("."));
        assert!(!is_valid_user_name(".."));
        assert!(!is_valid_user_name(".hidden"));
        assert!(!is_valid_user_name("gäz"));
        assert!(!is_valid_user_name("foo\0"));
        assert!(!is_valid_user_name("foo\r"));
    }

    proptest! {
        #[test]
        fn short_lowercase_alnum_accepted(name in "[a-z0-9]{1,8}") {
            prop_assert!(is_valid_user_name(&name));
        }

        #[test]
        fn oversized_names_rejected(name in "[a-z0-9]{9,32}") {
            prop_assert!(!is_valid_user_name(&name));
        }
    }
}
