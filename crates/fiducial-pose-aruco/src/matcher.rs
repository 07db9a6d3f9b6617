//! Dictionary matching and rotation helpers.

use crate::Dictionary;

/// A dictionary match for an observed marker code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Match {
    /// Marker id in the dictionary.
    pub id: u32,
    /// Quarter turns such that `observed == rotate_code(dict_code, rotation)`.
    pub rotation: u8,
    /// Hamming distance between observed and (rotated) dictionary code.
    pub hamming: u8,
}

impl Match {
    /// Reorder corners sampled as `observed` (TL, TR, BR, BL of the sampled
    /// grid) so that index 0 is the dictionary pattern's top-left.
    pub fn canonical_corners<T: Copy>(&self, observed: &[T; 4]) -> [T; 4] {
        let r = self.rotation as usize;
        std::array::from_fn(|k| observed[(k + r) % 4])
    }
}

/// Brute-force matcher over all ids and the four rotations of each code.
#[derive(Clone, Debug)]
pub struct Matcher {
    dict: Dictionary,
    max_hamming: u8,
    rotated: Vec<[u64; 4]>,
}

impl Matcher {
    /// Build a matcher; `max_hamming` is capped at 64.
    pub fn new(dict: Dictionary, max_hamming: u8) -> Self {
        let n = dict.marker_size;
        let rotated = dict
            .codes
            .iter()
            .map(|&base| std::array::from_fn(|rot| rotate_code(base, n, rot as u8)))
            .collect();

        Self {
            dict,
            max_hamming: max_hamming.min(64),
            rotated,
        }
    }

    #[inline]
    pub fn dictionary(&self) -> Dictionary {
        self.dict
    }

    #[inline]
    pub fn max_hamming(&self) -> u8 {
        self.max_hamming
    }

    /// Best match within `max_hamming`; ties keep the lowest id and rotation.
    pub fn match_code(&self, observed: u64) -> Option<Match> {
        let mut best: Option<Match> = None;

        for (id, rots) in self.rotated.iter().enumerate() {
            for (rot, &cand) in rots.iter().enumerate() {
                let hamming = (observed ^ cand).count_ones() as u8;
                if hamming > self.max_hamming {
                    continue;
                }
                if best.is_some_and(|b| b.hamming <= hamming) {
                    continue;
                }
                best = Some(Match {
                    id: id as u32,
                    rotation: rot as u8,
                    hamming,
                });
                if hamming == 0 {
                    return best;
                }
            }
        }

        best
    }
}

/// Rotate a row-major `n × n` code (`idx = y * n + x`) by `rot` quarter turns.
pub fn rotate_code(code: u64, n: usize, rot: u8) -> u64 {
    let rot = rot & 3;
    if rot == 0 {
        return code;
    }

    let mut out = 0u64;
    for y in 0..n {
        for x in 0..n {
            let (sx, sy) = match rot {
                1 => (y, n - 1 - x),
                2 => (n - 1 - x, n - 1 - y),
                _ => (n - 1 - y, x),
            };
            let bit = (code >> (sy * n + sx)) & 1;
            out |= bit << (y * n + x);
        }
    }
    out
}
