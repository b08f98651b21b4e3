// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Random suffix generation shared by session, queue, and blob IDs.

/// Alphabet for hexadecimal ID suffixes.
const HEX_ALPHABET: [char; 16] =
    ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f'];

/// Generate an 8-character lowercase hex suffix.
pub fn hex8() -> String {
    nanoid::nanoid!(8, &HEX_ALPHABET)
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
