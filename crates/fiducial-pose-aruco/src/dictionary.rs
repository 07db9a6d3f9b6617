//! Dictionary metadata and packed marker codes.

/// A fixed marker dictionary.
#[derive(Clone, Copy, Debug)]
pub struct Dictionary {
    /// Human-readable name (for logging).
    pub name: &'static str,
    /// Number of inner bits per marker side.
    pub marker_size: usize,
    /// One `u64` per marker id, encoding the inner `marker_size × marker_size` bits.
    ///
    /// Bits are stored row-major (`idx = y * marker_size + x`) with **black = 1**.
    pub codes: &'static [u64],
}

impl Dictionary {
    /// Build a dictionary, rejecting markers with more than 64 inner bits.
    pub const fn new(
        name: &'static str,
        marker_size: usize,
        codes: &'static [u64],
    ) -> Option<Self> {
        if marker_size == 0 || marker_size * marker_size > 64 {
            return None;
        }
        Some(Self {
            name,
            marker_size,
            codes,
        })
    }

    /// Total number of inner bits per marker.
    #[inline]
    pub fn bit_count(&self) -> usize {
        self.marker_size * self.marker_size
    }

    /// Number of marker ids.
    #[inline]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static CODES: [u64; 2] = [0b1010, 0b0101];

    #[test]
    fn oversized_markers_are_rejected() {
        assert!(Dictionary::new("big", 9, &CODES).is_none());
        assert!(Dictionary::new("empty", 0, &CODES).is_none());
        let d = Dictionary::new("tiny", 2, &CODES).unwrap();
        assert_eq!(d.bit_count(), 4);
        assert_eq!(d.len(), 2);
    }
}
