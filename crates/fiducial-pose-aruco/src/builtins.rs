//! Built-in dictionaries.
//!
//! `ARUCO_ORIGINAL` is the 5×5 pattern of the first ArUco release: every row
//! is one of four 5-bit words, and the two information bits of each row
//! (columns 1 and 3, white = 1) concatenate into a 10-bit id.

use std::sync::OnceLock;

use crate::Dictionary;

/// Name of the original 1024-marker ArUco dictionary.
pub const ARUCO_ORIGINAL: &str = "ARUCO_ORIGINAL";

/// Names accepted by [`builtin_dictionary`].
pub const BUILTIN_NAMES: &[&str] = &[ARUCO_ORIGINAL];

/// Row words indexed by the row's 2-bit payload, MSB = column 0, white = 1.
const ROW_WORDS: [u8; 4] = [0b10000, 0b10111, 0b01001, 0b01110];

const ARUCO_ORIGINAL_SIZE: usize = 5;
const ARUCO_ORIGINAL_COUNT: u32 = 1024;

static ARUCO_ORIGINAL_CODES: OnceLock<Vec<u64>> = OnceLock::new();

/// Look up a built-in dictionary by name.
pub fn builtin_dictionary(name: &str) -> Option<Dictionary> {
    match name {
        ARUCO_ORIGINAL => Some(aruco_original()),
        _ => None,
    }
}

/// The original ArUco dictionary (ids `0..1024`).
pub fn aruco_original() -> Dictionary {
    let codes = ARUCO_ORIGINAL_CODES
        .get_or_init(|| (0..ARUCO_ORIGINAL_COUNT).map(aruco_original_code).collect());
    Dictionary {
        name: ARUCO_ORIGINAL,
        marker_size: ARUCO_ORIGINAL_SIZE,
        codes: codes.as_slice(),
    }
}

/// Packed code (black = 1) of an original-ArUco id.
pub fn aruco_original_code(id: u32) -> u64 {
    let n = ARUCO_ORIGINAL_SIZE;
    let mut code = 0u64;
    for row in 0..n {
        let payload = (id >> (2 * (n - 1 - row))) & 0b11;
        let word = ROW_WORDS[payload as usize];
        for col in 0..n {
            let white = (word >> (n - 1 - col)) & 1 == 1;
            if !white {
                code |= 1u64 << (row * n + col);
            }
        }
    }
    code
}
