//! Supersampled scanline mask.
//!
//! A `BitLigne` covers the pixels `[st, en)` of one sub-row, each pixel
//! split into `bits_per_pixel` sub-columns stored as one bit each. Bits are
//! only ever set, so `reset` clears the range touched since the last reset.

/// Bits per storage word.
const WORD_BITS: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitLigne {
    st: i32,
    en: i32,
    bits_per_pixel: u32,
    full_b: Vec<u32>,
    /// Dirty bit range, empty when `cur_min >= cur_max`.
    cur_min: usize,
    cur_max: usize,
}

impl BitLigne {
    /// Mask over pixels `[st, en)` with `bits_per_pixel` sub-columns each
    /// (at least one).
    pub fn new(st: i32, en: i32, bits_per_pixel: u32) -> Self {
        let en = en.max(st);
        let bits_per_pixel = bits_per_pixel.max(1);
        let nb_bit = (en - st) as usize * bits_per_pixel as usize;
        Self {
            st,
            en,
            bits_per_pixel,
            full_b: vec![0; (nb_bit + WORD_BITS - 1) / WORD_BITS],
            cur_min: nb_bit,
            cur_max: 0,
        }
    }

    pub fn st(&self) -> i32 {
        self.st
    }

    pub fn en(&self) -> i32 {
        self.en
    }

    pub fn bits_per_pixel(&self) -> u32 {
        self.bits_per_pixel
    }

    fn nb_bit(&self) -> usize {
        (self.en - self.st) as usize * self.bits_per_pixel as usize
    }

    /// Clear every bit set since the last reset.
    pub fn reset(&mut self) {
        if self.cur_min < self.cur_max {
            let (w0, w1) = (self.cur_min / WORD_BITS, (self.cur_max - 1) / WORD_BITS);
            for w in &mut self.full_b[w0..=w1] {
                *w = 0;
            }
        }
        self.cur_min = self.nb_bit();
        self.cur_max = 0;
    }

    /// Set the sub-columns whose centers fall in `[spos, epos)`.
    pub fn add_bord(&mut self, spos: f64, epos: f64) {
        if !(epos > spos) {
            return;
        }
        let scale = self.bits_per_pixel as f64;
        let nb = self.nb_bit() as f64;
        let first = ((spos - self.st as f64) * scale - 0.5).ceil().clamp(0.0, nb) as usize;
        let last = ((epos - self.st as f64) * scale - 0.5).ceil().clamp(0.0, nb) as usize;
        if first >= last {
            return;
        }
        self.set_range(first, last);
        self.cur_min = self.cur_min.min(first);
        self.cur_max = self.cur_max.max(last);
    }

    fn set_range(&mut self, first: usize, last: usize) {
        let mut k = first;
        while k < last {
            let w = k / WORD_BITS;
            let b = k % WORD_BITS;
            let n = (WORD_BITS - b).min(last - k);
            let mask = if n == WORD_BITS { u32::MAX } else { ((1u32 << n) - 1) << b };
            self.full_b[w] |= mask;
            k += n;
        }
    }

    /// State of sub-column `bit`, counted from the left end of the line.
    pub fn is_set(&self, bit: usize) -> bool {
        if bit >= self.nb_bit() {
            return false;
        }
        self.full_b[bit / WORD_BITS] & (1 << (bit % WORD_BITS)) != 0
    }

    /// Number of set sub-columns in pixel `x`.
    pub fn count_in_pixel(&self, x: i32) -> u32 {
        if x < self.st || x >= self.en {
            return 0;
        }
        let bpp = self.bits_per_pixel as usize;
        let first = (x - self.st) as usize * bpp;
        (first..first + bpp).filter(|&k| self.is_set(k)).count() as u32
    }

    /// Pixels touched since the last reset, as a half-open range.
    pub fn dirty_pixels(&self) -> Option<(i32, i32)> {
        if self.cur_min >= self.cur_max {
            return None;
        }
        let bpp = self.bits_per_pixel as usize;
        Some((
            self.st + (self.cur_min / bpp) as i32,
            self.st + ((self.cur_max + bpp - 1) / bpp) as i32,
        ))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_bord_by_centers() {
        let mut l = BitLigne::new(0, 4, 4);
        // Sub-column centers sit at 0.125, 0.375, ...
        l.add_bord(0.3, 1.5);
        assert!(!l.is_set(0));
        assert!(l.is_set(1));
        assert!(l.is_set(5));
        assert!(!l.is_set(6));
        assert_eq!(l.count_in_pixel(0), 3);
        assert_eq!(l.count_in_pixel(1), 2);
        assert_eq!(l.count_in_pixel(2), 0);
        assert_eq!(l.dirty_pixels(), Some((0, 2)));
    }

    #[test]
    fn test_clamps_and_spans_words() {
        let mut l = BitLigne::new(-2, 10, 8);
        l.add_bord(-100.0, 100.0);
        for x in -2..10 {
            assert_eq!(l.count_in_pixel(x), 8);
        }
        assert_eq!(l.count_in_pixel(10), 0);
        l.reset();
        assert!((0..96).all(|k| !l.is_set(k)));
        assert_eq!(l.dirty_pixels(), None);
    }

    #[test]
    fn test_empty_range() {
        let mut l = BitLigne::new(0, 2, 4);
        l.add_bord(1.0, 1.0);
        l.add_bord(1.5, 1.0);
        assert_eq!(l.count_in_pixel(1), 0);
        assert_eq!(l.dirty_pixels(), None);
    }
}
