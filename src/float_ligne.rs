//! Scanline coverage with floating-point boundaries.
//!
//! A `FloatLigne` collects boundary pairs ("bords"): each pair describes a
//! coverage value varying linearly between two x positions. `flatten` sums
//! every pair that is active at a given x and produces non-overlapping
//! runs, each linear between its ends.

use core::cmp::Ordering;

/// One end of a linear coverage piece.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatLigneBord {
    pub pos: f64,
    /// `true` for the left end of the piece.
    pub start: bool,
    /// Coverage at `pos`.
    pub val: f64,
    /// Coverage change per unit of x.
    pub pente: f64,
    /// Index of the other end of the piece.
    pub other: usize,
}

/// Coverage varying linearly from `vst` at `st` to `ven` at `en`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatLigneRun {
    pub st: f64,
    pub en: f64,
    pub vst: f64,
    pub ven: f64,
    pub pente: f64,
}

impl FloatLigneRun {
    /// Coverage at `x`, interpolated along the run.
    pub fn value_at(&self, x: f64) -> f64 {
        self.vst + (x - self.st) * self.pente
    }

    /// Integral of the coverage over the run.
    pub fn area(&self) -> f64 {
        (self.en - self.st) * (self.vst + self.ven) * 0.5
    }
}

/// Runs whose coverage stays under this are dropped by `flatten`.
const COVERAGE_EPSILON: f64 = 1e-9;

// ============================================================================
// FloatLigne
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct FloatLigne {
    bords: Vec<FloatLigneBord>,
    runs: Vec<FloatLigneRun>,
}

impl FloatLigne {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every bord and run, keeping the allocations.
    pub fn reset(&mut self) {
        self.bords.clear();
        self.runs.clear();
    }

    pub fn bords(&self) -> &[FloatLigneBord] {
        &self.bords
    }

    pub fn runs(&self) -> &[FloatLigneRun] {
        &self.runs
    }

    /// Add a coverage piece going from `sval` at `spos` to `eval` at
    /// `epos`. Returns the index of its start bord, or `None` for an empty
    /// piece.
    pub fn add_bord(&mut self, spos: f64, sval: f64, epos: f64, eval: f64) -> Option<usize> {
        if !(epos > spos) {
            return None;
        }
        let pente = (eval - sval) / (epos - spos);
        let s = self.bords.len();
        self.bords.push(FloatLigneBord {
            pos: spos,
            start: true,
            val: sval,
            pente,
            other: s + 1,
        });
        self.bords.push(FloatLigneBord {
            pos: epos,
            start: false,
            val: eval,
            pente,
            other: s,
        });
        Some(s)
    }

    /// Append a run directly. Runs added this way must not overlap the
    /// existing ones.
    pub fn add_run(&mut self, st: f64, en: f64, vst: f64, ven: f64) -> Option<usize> {
        if !(en > st) {
            return None;
        }
        self.runs.push(FloatLigneRun {
            st,
            en,
            vst,
            ven,
            pente: (ven - vst) / (en - st),
        });
        Some(self.runs.len() - 1)
    }

    /// Ordering of bords: by position, ends before starts at equal
    /// positions.
    pub fn cmp_bord(a: &FloatLigneBord, b: &FloatLigneBord) -> Ordering {
        a.pos.total_cmp(&b.pos).then_with(|| a.start.cmp(&b.start))
    }

    /// Replace the runs with the sum of every bord pair, as
    /// non-overlapping runs sorted by position. Coverage is clamped to
    /// `[0, 1]`.
    pub fn flatten(&mut self) {
        self.runs.clear();
        if self.bords.is_empty() {
            return;
        }
        let mut order: Vec<usize> = (0..self.bords.len()).collect();
        order.sort_by(|&a, &b| Self::cmp_bord(&self.bords[a], &self.bords[b]));

        let mut val = 0.0;
        let mut pente = 0.0;
        let mut active = 0usize;
        let mut last = self.bords[order[0]].pos;
        for &i in &order {
            let b = self.bords[i];
            if b.pos > last {
                let ven = val + pente * (b.pos - last);
                if active > 0 && (val.abs() > COVERAGE_EPSILON || ven.abs() > COVERAGE_EPSILON) {
                    let (vs, ve) = (val.clamp(0.0, 1.0), ven.clamp(0.0, 1.0));
                    self.runs.push(FloatLigneRun {
                        st: last,
                        en: b.pos,
                        vst: vs,
                        ven: ve,
                        pente: (ve - vs) / (b.pos - last),
                    });
                }
                val = ven;
                last = b.pos;
            }
            if b.start {
                val += b.val;
                pente += b.pente;
                active += 1;
            } else {
                val -= b.val;
                pente -= b.pente;
                active -= 1;
            }
        }
    }

    /// Total covered length, each run weighted by its coverage.
    pub fn coverage_length(&self) -> f64 {
        self.runs.iter().map(|r| r.area()).sum()
    }

    /// Extent of the runs.
    pub fn span(&self) -> Option<(f64, f64)> {
        Some((self.runs.first()?.st, self.runs.last()?.en))
    }
}

// ============================================================================
// Tests
// ============================================================================
