//! Scanline coverage with integer pixel boundaries.
//!
//! `IntLigne` is where boundary events turn into per-pixel alpha. Its runs
//! cover whole pixels `[st, en)`; pixel `i` of a run gets
//! `val_at(i, st, en, vst, ven)`. Runs come from integer bords resolved by
//! `flatten`, or are copied from a [`FloatLigne`] (exact pixel averages)
//! or from supersampled [`BitLigne`]s.

use core::cmp::Ordering;

use crate::basics::{ifloor, iround, BooleanOp, CoverType, COVER_FULL};
use crate::bit_ligne::BitLigne;
use crate::float_ligne::{FloatLigne, FloatLigneRun};

/// One end of a linear coverage piece with integer position. Start bords
/// also sit in a doubly-linked active list while `flatten` sweeps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntLigneBord {
    pub pos: i32,
    pub start: bool,
    pub val: f32,
    pub other: usize,
    pub prev: Option<usize>,
    pub next: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntLigneRun {
    pub st: i32,
    pub en: i32,
    pub vst: f32,
    pub ven: f32,
}

impl IntLigneRun {
    /// Coverage of pixel `x`.
    #[inline]
    pub fn value_at(&self, x: i32) -> f32 {
        IntLigne::val_at(x, self.st, self.en, self.vst, self.ven)
    }

    fn is_constant(&self) -> bool {
        self.vst == self.ven || self.en - self.st == 1
    }

    /// Sum of the pixel coverages.
    pub fn total(&self) -> f64 {
        let n = (self.en - self.st) as f64;
        n * self.vst as f64 + (self.ven - self.vst) as f64 * (n - 1.0) * 0.5
    }
}

// ============================================================================
// Coverage algebra
// ============================================================================

#[inline]
fn intersect_covers(a: f32, b: f32) -> f32 {
    a * b
}

#[inline]
fn unite_covers(a: f32, b: f32) -> f32 {
    1.0 - (1.0 - a) * (1.0 - b)
}

#[inline]
fn subtract_covers(a: f32, b: f32) -> f32 {
    a * (1.0 - b)
}

#[inline]
fn xor_covers(a: f32, b: f32) -> f32 {
    let c = a + b;
    if c > 1.0 {
        2.0 - c
    } else {
        c
    }
}

fn combine_covers(op: BooleanOp, a: f32, b: f32) -> f32 {
    match op {
        BooleanOp::Union => unite_covers(a, b),
        BooleanOp::Intersection => intersect_covers(a, b),
        BooleanOp::Difference => subtract_covers(a, b),
        BooleanOp::SymmetricDifference => xor_covers(a, b),
    }
}

// ============================================================================
// IntLigne
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct IntLigne {
    bords: Vec<IntLigneBord>,
    runs: Vec<IntLigneRun>,
    first_ac: Option<usize>,
    last_ac: Option<usize>,
}

impl IntLigne {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.bords.clear();
        self.runs.clear();
        self.first_ac = None;
        self.last_ac = None;
    }

    pub fn bords(&self) -> &[IntLigneBord] {
        &self.bords
    }

    pub fn runs(&self) -> &[IntLigneRun] {
        &self.runs
    }

    /// Linear interpolation of a run's coverage at pixel `at`.
    #[inline]
    pub fn val_at(at: i32, ps: i32, pe: i32, vs: f32, ve: f32) -> f32 {
        ((at - ps) as f32 * ve + (pe - at) as f32 * vs) / (pe - ps) as f32
    }

    /// Ordering of bords: by position, ends before starts at equal
    /// positions.
    pub fn cmp_bord(a: &IntLigneBord, b: &IntLigneBord) -> Ordering {
        a.pos.cmp(&b.pos).then_with(|| a.start.cmp(&b.start))
    }

    /// Add a coverage piece from `sval` at `spos` to `eval` at `epos`.
    /// Returns the index of its start bord, or `None` when empty.
    pub fn add_bord(&mut self, spos: i32, sval: f32, epos: i32, eval: f32) -> Option<usize> {
        if epos <= spos {
            return None;
        }
        let s = self.bords.len();
        self.bords.push(IntLigneBord {
            pos: spos,
            start: true,
            val: sval,
            other: s + 1,
            prev: None,
            next: None,
        });
        self.bords.push(IntLigneBord {
            pos: epos,
            start: false,
            val: eval,
            other: s,
            prev: None,
            next: None,
        });
        Some(s)
    }

    /// Append a run. Runs must be added left to right without overlap.
    pub fn add_run(&mut self, st: i32, en: i32, vst: f32, ven: f32) -> Option<usize> {
        if en <= st {
            return None;
        }
        self.runs.push(IntLigneRun { st, en, vst, ven });
        Some(self.runs.len() - 1)
    }

    // ---------------------------------------------------------------
    // Active list
    // ---------------------------------------------------------------

    /// Append bord `no` to the active list.
    pub fn enqueue(&mut self, no: usize) {
        self.bords[no].prev = self.last_ac;
        self.bords[no].next = None;
        match self.last_ac {
            Some(l) => self.bords[l].next = Some(no),
            None => self.first_ac = Some(no),
        }
        self.last_ac = Some(no);
    }

    /// Unlink bord `no` from the active list.
    pub fn dequeue(&mut self, no: usize) {
        let (prev, next) = (self.bords[no].prev, self.bords[no].next);
        match prev {
            Some(p) => self.bords[p].next = next,
            None => self.first_ac = next,
        }
        match next {
            Some(n) => self.bords[n].prev = prev,
            None => self.last_ac = prev,
        }
        self.bords[no].prev = None;
        self.bords[no].next = None;
    }

    /// Summed coverage of the active pieces at `at`.
    pub fn remaining_val_at(&self, at: i32) -> f32 {
        let mut sum = 0.0;
        let mut cur = self.first_ac;
        while let Some(i) = cur {
            let s = &self.bords[i];
            let e = &self.bords[s.other];
            sum += Self::val_at(at, s.pos, e.pos, s.val, e.val);
            cur = s.next;
        }
        sum
    }

    /// Resolve the bords into non-overlapping runs.
    pub fn flatten(&mut self) {
        self.runs.clear();
        self.first_ac = None;
        self.last_ac = None;
        if self.bords.is_empty() {
            return;
        }
        let mut order: Vec<usize> = (0..self.bords.len()).collect();
        order.sort_by(|&a, &b| Self::cmp_bord(&self.bords[a], &self.bords[b]));

        let mut last = self.bords[order[0]].pos;
        for &i in &order {
            let pos = self.bords[i].pos;
            if pos > last && self.first_ac.is_some() {
                let vst = self.remaining_val_at(last);
                // Value the active pieces reach at `pos` from the left.
                let ven = self.remaining_val_at(pos);
                if vst != 0.0 || ven != 0.0 {
                    self.runs.push(IntLigneRun {
                        st: last,
                        en: pos,
                        vst,
                        ven,
                    });
                }
            }
            last = pos;
            if self.bords[i].start {
                self.enqueue(i);
            } else {
                self.dequeue(self.bords[i].other);
            }
        }
    }

    // ---------------------------------------------------------------
    // Copies
    // ---------------------------------------------------------------

    pub fn copy_int(&mut self, a: &IntLigne) {
        self.reset();
        self.runs.extend_from_slice(&a.runs);
    }

    /// Exact per-pixel averages of the flattened runs of `a`. Pixels fully
    /// inside one float run form linear runs; pixels holding a run
    /// boundary get single-pixel runs with the summed partial areas.
    pub fn copy_float(&mut self, a: &FloatLigne) {
        self.reset();
        let mut partial: Vec<(i32, f64)> = Vec::new();
        let mut runs: Vec<IntLigneRun> = Vec::new();
        for r in a.runs() {
            let full_st = r.st.ceil();
            let full_en = r.en.floor();
            if full_en < full_st {
                partial.push((ifloor(r.st), r.area()));
                continue;
            }
            if r.st < full_st {
                partial.push((ifloor(r.st), integral(r, r.st, full_st)));
            }
            if r.en > full_en {
                partial.push((full_en as i32, integral(r, full_en, r.en)));
            }
            if full_en > full_st {
                runs.push(IntLigneRun {
                    st: full_st as i32,
                    en: full_en as i32,
                    vst: r.value_at(full_st + 0.5) as f32,
                    ven: r.value_at(full_en + 0.5) as f32,
                });
            }
        }
        partial.sort_by_key(|&(x, _)| x);
        let mut k = 0;
        while k < partial.len() {
            let x = partial[k].0;
            let mut v = 0.0;
            while k < partial.len() && partial[k].0 == x {
                v += partial[k].1;
                k += 1;
            }
            let v = v.clamp(0.0, 1.0) as f32;
            if v > 0.0 {
                runs.push(IntLigneRun {
                    st: x,
                    en: x + 1,
                    vst: v,
                    ven: v,
                });
            }
        }
        runs.sort_by_key(|r| r.st);
        self.runs = runs;
    }

    /// Coverage of one supersampled line: set sub-columns over sub-columns
    /// per pixel.
    pub fn copy_bits(&mut self, a: &BitLigne) {
        self.copy_bit_lines(core::slice::from_ref(a));
    }

    /// Coverage of a pixel row sampled by `lines.len()` sub-rows.
    pub fn copy_bit_lines(&mut self, lines: &[BitLigne]) {
        self.reset();
        let (st, en, bpp) = match (
            lines.iter().map(|l| l.st()).min(),
            lines.iter().map(|l| l.en()).max(),
            lines.first(),
        ) {
            (Some(st), Some(en), Some(l)) => (st, en, l.bits_per_pixel()),
            _ => return,
        };
        let scale = 1.0 / (bpp as f32 * lines.len() as f32);
        let mut cur: Option<(i32, f32)> = None;
        for x in st..en {
            let count: u32 = lines.iter().map(|l| l.count_in_pixel(x)).sum();
            let v = (count as f32 * scale).min(1.0);
            match cur {
                Some((_, cv)) if cv == v => {}
                Some((cs, cv)) => {
                    self.add_run(cs, x, cv, cv);
                    cur = if v > 0.0 { Some((x, v)) } else { None };
                }
                None if v > 0.0 => cur = Some((x, v)),
                None => {}
            }
        }
        if let Some((cs, cv)) = cur {
            self.add_run(cs, en, cv, cv);
        }
    }

    // ---------------------------------------------------------------
    // Boolean combination
    // ---------------------------------------------------------------

    /// Replace the runs with `op` applied to the coverages of `a` and `b`
    /// pixel by pixel. Stretches where both operands vary are evaluated
    /// per pixel; everything else keeps its run structure.
    pub fn booleen(&mut self, a: &IntLigne, b: &IntLigne, op: BooleanOp) {
        self.reset();
        let mut xs: Vec<i32> = a
            .runs
            .iter()
            .chain(b.runs.iter())
            .flat_map(|r| [r.st, r.en])
            .collect();
        xs.sort_unstable();
        xs.dedup();

        let (mut ia, mut ib) = (0, 0);
        for w in xs.windows(2) {
            let (x0, x1) = (w[0], w[1]);
            while ia < a.runs.len() && a.runs[ia].en <= x0 {
                ia += 1;
            }
            while ib < b.runs.len() && b.runs[ib].en <= x0 {
                ib += 1;
            }
            let ra = a.runs.get(ia).filter(|r| r.st <= x0);
            let rb = b.runs.get(ib).filter(|r| r.st <= x0);
            match (ra, rb) {
                (None, None) => {}
                (Some(r), None) | (None, Some(r)) => {
                    let alone_a = ra.is_some();
                    let keeps = if alone_a {
                        combine_covers(op, 1.0, 0.0) > 0.0
                    } else {
                        combine_covers(op, 0.0, 1.0) > 0.0
                    };
                    if keeps {
                        self.add_run(x0, x1, r.value_at(x0), r.value_at(x1));
                    }
                }
                (Some(ra), Some(rb)) => {
                    if ra.is_constant() && rb.is_constant() {
                        let v = combine_covers(op, ra.value_at(x0), rb.value_at(x0));
                        if v > 0.0 {
                            self.add_run(x0, x1, v, v);
                        }
                    } else {
                        for x in x0..x1 {
                            let v = combine_covers(op, ra.value_at(x), rb.value_at(x));
                            if v > 0.0 {
                                self.add_run(x, x + 1, v, v);
                            }
                        }
                    }
                }
            }
        }
    }

    // ---------------------------------------------------------------
    // Output
    // ---------------------------------------------------------------

    /// Sum of every pixel's coverage.
    pub fn total_coverage(&self) -> f64 {
        self.runs.iter().map(|r| r.total()).sum()
    }

    /// Write coverages into `dest`, whose first element is pixel `x0`.
    /// Pixels outside the runs are left untouched.
    pub fn raster(&self, dest: &mut [f32], x0: i32) {
        self.for_each_pixel(x0, dest.len(), |i, v| dest[i] = v);
    }

    /// Same as `raster` with coverages scaled to `0..=COVER_FULL`.
    pub fn raster_u8(&self, dest: &mut [CoverType], x0: i32) {
        let full = COVER_FULL as f64;
        self.for_each_pixel(x0, dest.len(), |i, v| dest[i] = iround(v as f64 * full) as CoverType);
    }

    fn for_each_pixel(&self, x0: i32, len: usize, mut f: impl FnMut(usize, f32)) {
        let x_end = x0.saturating_add(len.min(i32::MAX as usize) as i32);
        for r in &self.runs {
            for x in r.st.max(x0)..r.en.min(x_end) {
                f((x - x0) as usize, r.value_at(x).clamp(0.0, 1.0));
            }
        }
    }
}

fn integral(r: &FloatLigneRun, x0: f64, x1: f64) -> f64 {
    (x1 - x0) * (r.value_at(x0) + r.value_at(x1)) * 0.5
}

// ============================================================================
// Tests
// ============================================================================
