//! Path: the command list at the top of the pipeline.
//!
//! A `Path` is an append-only list of drawing commands (move-to, line-to,
//! Hermite cubics, quadratic B-splines, SVG arcs, close, forced points)
//! built through an explicit state machine, plus the [`Polyline`] produced
//! by the last conversion. Stroking, outlining, dashing and refitting live
//! in their own modules as further `impl Path` blocks.

use log::trace;

use crate::arc::SvgArc;
use crate::basics::{rad2deg, PointD};
use crate::curves::{CurvePiece, CurveSampler};
use crate::error::{PathError, Result};
use crate::math::VERTEX_DIST_EPSILON;
use crate::polyline::{BackData, Polyline, PolylinePointKind};
use crate::shape::{EdgeBackData, Shape};
use crate::trans_affine::TransAffine;

// ============================================================================
// Commands
// ============================================================================

/// One drawing command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    MoveTo {
        p: PointD,
    },
    LineTo {
        p: PointD,
    },
    /// Hermite cubic from the current point to `p`.
    CubicTo {
        p: PointD,
        start_tangent: PointD,
        end_tangent: PointD,
    },
    /// Quadratic B-spline ending at `p`, with `nb` control points stored
    /// in the `IntermBezierTo` commands that follow.
    BezierTo {
        p: PointD,
        nb: usize,
    },
    IntermBezierTo {
        p: PointD,
    },
    /// SVG endpoint arc; `angle` is the x-axis rotation in degrees.
    ArcTo {
        p: PointD,
        rx: f64,
        ry: f64,
        angle: f64,
        large: bool,
        sweep: bool,
    },
    Close,
    /// Marks the current point as a mandatory cut for refitting.
    Forced,
}

impl PathCommand {
    /// Explicit point carried by the command, if any.
    pub fn point(&self) -> Option<PointD> {
        match *self {
            PathCommand::MoveTo { p }
            | PathCommand::LineTo { p }
            | PathCommand::CubicTo { p, .. }
            | PathCommand::BezierTo { p, .. }
            | PathCommand::IntermBezierTo { p }
            | PathCommand::ArcTo { p, .. } => Some(p),
            PathCommand::Close | PathCommand::Forced => None,
        }
    }
}

/// A command plus the bookkeeping conversion attaches to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathDescr {
    pub cmd: PathCommand,
    /// Index of the last polyline point produced for this command.
    pub associated: Option<usize>,
    /// Parameter range on the source piece when the command was re-derived
    /// from a polyline.
    pub t_start: f64,
    pub t_end: f64,
}

impl PathDescr {
    fn new(cmd: PathCommand) -> Self {
        Self {
            cmd,
            associated: None,
            t_start: 0.0,
            t_end: 1.0,
        }
    }
}

/// Construction state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildState {
    /// No open subpath.
    #[default]
    Ready,
    BuildingSubpath,
    /// A spline whose endpoint is known is collecting control points.
    BuildingBezier,
    /// A spline started by `temp_bezier_to`, waiting for its endpoint.
    BuildingDelayedBezier,
}

/// One subpath as a list of parametric pieces, each tagged with the index
/// of the command that draws it.
#[derive(Debug, Clone, Default)]
pub struct SubpathPieces {
    pub start: PointD,
    pub pieces: Vec<(usize, CurvePiece)>,
    pub closed: bool,
}

// ============================================================================
// Path
// ============================================================================

/// Vector path: command list plus its most recent flattening.
#[derive(Debug, Clone, Default)]
pub struct Path {
    descr: Vec<PathDescr>,
    state: BuildState,
    pending_moveto: Option<usize>,
    pending_bezier: Option<usize>,
    polyline: Polyline,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove all commands and the polyline (keeps allocated memory).
    pub fn reset(&mut self) {
        self.descr.clear();
        self.state = BuildState::Ready;
        self.pending_moveto = None;
        self.pending_bezier = None;
        self.polyline.reset(false);
    }

    /// Replace this path's commands with a copy of `other`'s.
    pub fn copy_from(&mut self, other: &Path) {
        self.reset();
        self.descr.extend_from_slice(&other.descr);
        for d in &mut self.descr {
            d.associated = None;
        }
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    pub fn descr_count(&self) -> usize {
        self.descr.len()
    }

    pub fn commands(&self) -> &[PathDescr] {
        &self.descr
    }

    pub fn command(&self, i: usize) -> Result<&PathDescr> {
        self.descr.get(i).ok_or(PathError::CommandOutOfRange {
            index: i,
            len: self.descr.len(),
        })
    }

    /// The polyline of the last conversion.
    pub fn polyline(&self) -> &Polyline {
        &self.polyline
    }

    pub(crate) fn polyline_mut(&mut self) -> &mut Polyline {
        &mut self.polyline
    }

    #[inline]
    fn has_subpath(&self) -> bool {
        self.state != BuildState::Ready
    }

    #[inline]
    fn has_bezier(&self) -> bool {
        matches!(
            self.state,
            BuildState::BuildingBezier | BuildState::BuildingDelayedBezier
        )
    }

    fn push(&mut self, cmd: PathCommand) -> usize {
        self.descr.push(PathDescr::new(cmd));
        self.descr.len() - 1
    }

    fn close_subpath(&mut self) {
        self.state = BuildState::Ready;
        self.pending_moveto = None;
    }

    // ---------------------------------------------------------------
    // Construction
    // ---------------------------------------------------------------

    /// Start a new subpath at `p`. A pending spline ends first (a delayed
    /// spline takes `p` as its endpoint).
    pub fn move_to(&mut self, p: PointD) -> usize {
        if self.has_bezier() {
            self.finish_bezier_at(p);
        }
        if self.has_subpath() {
            self.close_subpath();
        }
        let idx = self.push(PathCommand::MoveTo { p });
        self.pending_moveto = Some(idx);
        self.state = BuildState::BuildingSubpath;
        idx
    }

    /// Straight line to `p`. Without an open subpath this becomes a move-to.
    pub fn line_to(&mut self, p: PointD) -> usize {
        if self.has_bezier() {
            self.finish_bezier_at(p);
        }
        if !self.has_subpath() {
            return self.move_to(p);
        }
        self.push(PathCommand::LineTo { p })
    }

    /// Hermite cubic to `p` with the given start and end tangents.
    pub fn cubic_to(&mut self, p: PointD, start_tangent: PointD, end_tangent: PointD) -> usize {
        if self.has_bezier() {
            self.finish_bezier_at(p);
        }
        if !self.has_subpath() {
            return self.move_to(p);
        }
        self.push(PathCommand::CubicTo {
            p,
            start_tangent,
            end_tangent,
        })
    }

    /// SVG elliptical arc to `p`; `angle` is the x-axis rotation in degrees.
    #[allow(clippy::too_many_arguments)]
    pub fn arc_to(&mut self, p: PointD, rx: f64, ry: f64, angle: f64, large: bool, sweep: bool) -> usize {
        if self.has_bezier() {
            self.finish_bezier_at(p);
        }
        if !self.has_subpath() {
            return self.move_to(p);
        }
        self.push(PathCommand::ArcTo {
            p,
            rx,
            ry,
            angle,
            large,
            sweep,
        })
    }

    /// Start a quadratic spline ending at `p`; control points follow with
    /// `interm_bezier_to`.
    pub fn bezier_to(&mut self, p: PointD) -> usize {
        if self.has_bezier() {
            self.finish_bezier_at(p);
        }
        if !self.has_subpath() {
            return self.move_to(p);
        }
        let idx = self.push(PathCommand::BezierTo { p, nb: 0 });
        self.pending_bezier = Some(idx);
        self.state = BuildState::BuildingBezier;
        idx
    }

    /// Start a quadratic spline whose endpoint is given later by
    /// `end_bezier_to_point`.
    pub fn temp_bezier_to(&mut self) -> Result<usize> {
        if self.has_bezier() {
            self.cancel_bezier();
        }
        if !self.has_subpath() {
            return Err(PathError::NoSubpath);
        }
        let idx = self.push(PathCommand::BezierTo {
            p: PointD::ZERO,
            nb: 0,
        });
        self.pending_bezier = Some(idx);
        self.state = BuildState::BuildingDelayedBezier;
        Ok(idx)
    }

    /// Add a control point to the pending spline.
    pub fn interm_bezier_to(&mut self, p: PointD) -> Result<usize> {
        let b = match (self.has_bezier(), self.pending_bezier) {
            (true, Some(b)) => b,
            _ => return Err(PathError::NoPendingBezier),
        };
        let idx = self.push(PathCommand::IntermBezierTo { p });
        if let PathCommand::BezierTo { ref mut nb, .. } = self.descr[b].cmd {
            *nb += 1;
        }
        Ok(idx)
    }

    /// Finish the pending spline. A delayed spline has no endpoint yet, so
    /// it is dropped and `DelayedBezierPending` is returned.
    pub fn end_bezier_to(&mut self) -> Result<usize> {
        match (self.state, self.pending_bezier) {
            (BuildState::BuildingBezier, Some(b)) => {
                self.pending_bezier = None;
                self.state = BuildState::BuildingSubpath;
                Ok(b)
            }
            (BuildState::BuildingDelayedBezier, Some(_)) => {
                self.cancel_bezier();
                Err(PathError::DelayedBezierPending)
            }
            _ => Err(PathError::NoPendingBezier),
        }
    }

    /// Finish the pending spline at `p`. Only a delayed spline takes `p`;
    /// a regular spline already has its endpoint and ignores it.
    pub fn end_bezier_to_point(&mut self, p: PointD) -> Result<usize> {
        match (self.state, self.pending_bezier) {
            (BuildState::BuildingBezier, Some(_)) => self.end_bezier_to(),
            (BuildState::BuildingDelayedBezier, Some(b)) => {
                if let PathCommand::BezierTo { p: ref mut end, .. } = self.descr[b].cmd {
                    *end = p;
                }
                self.pending_bezier = None;
                self.state = BuildState::BuildingSubpath;
                Ok(b)
            }
            _ => Err(PathError::NoPendingBezier),
        }
    }

    fn finish_bezier_at(&mut self, p: PointD) {
        if self.state == BuildState::BuildingDelayedBezier {
            let _ = self.end_bezier_to_point(p);
        } else {
            let _ = self.end_bezier_to();
        }
    }

    /// Drop the pending spline and its control points.
    pub fn cancel_bezier(&mut self) {
        if let Some(b) = self.pending_bezier.take() {
            self.descr.truncate(b);
        }
        if self.has_bezier() {
            self.state = BuildState::BuildingSubpath;
        }
    }

    /// Close the current subpath. A pending spline is dropped.
    pub fn close(&mut self) -> Result<usize> {
        if self.has_bezier() {
            self.cancel_bezier();
        }
        if !self.has_subpath() {
            return Err(PathError::NoSubpath);
        }
        let idx = self.push(PathCommand::Close);
        self.close_subpath();
        Ok(idx)
    }

    /// Mark the current point as a forced breakpoint.
    pub fn force_point(&mut self) -> Result<usize> {
        if self.has_bezier() {
            // A delayed spline cannot be finished here and is dropped.
            let _ = self.end_bezier_to();
        }
        if !self.has_subpath() {
            return Err(PathError::NoSubpath);
        }
        Ok(self.push(PathCommand::Forced))
    }

    // ---------------------------------------------------------------
    // Geometry queries
    // ---------------------------------------------------------------

    /// Start of the subpath containing command `i`.
    fn subpath_start(&self, i: usize) -> Option<PointD> {
        self.descr[..=i.min(self.descr.len().saturating_sub(1))]
            .iter()
            .rev()
            .find_map(|d| match d.cmd {
                PathCommand::MoveTo { p } => Some(p),
                _ => None,
            })
    }

    /// The current point right before command `i` executes.
    pub fn prev_point(&self, i: usize) -> Option<PointD> {
        let mut j = i.min(self.descr.len());
        while j > 0 {
            j -= 1;
            match self.descr[j].cmd {
                PathCommand::MoveTo { p }
                | PathCommand::LineTo { p }
                | PathCommand::CubicTo { p, .. }
                | PathCommand::BezierTo { p, .. }
                | PathCommand::ArcTo { p, .. } => return Some(p),
                PathCommand::Close => return self.subpath_start(j),
                PathCommand::IntermBezierTo { .. } | PathCommand::Forced => {}
            }
        }
        None
    }

    /// Parametric pieces drawn by command `i`, tagged with the index used as
    /// back-data piece (spline chunks use their control point's index).
    pub fn command_pieces(&self, i: usize) -> Result<Vec<(usize, CurvePiece)>> {
        let cmd = self.command(i)?.cmd;
        Ok(self.pieces_of(i, cmd))
    }

    /// `command_pieces` for a command known to sit at index `i`.
    fn pieces_of(&self, i: usize, cmd: PathCommand) -> Vec<(usize, CurvePiece)> {
        let start = match self.prev_point(i) {
            Some(s) => s,
            None => return Vec::new(),
        };
        match cmd {
            PathCommand::LineTo { p } => vec![(i, CurvePiece::Line { s: start, e: p })],
            PathCommand::CubicTo {
                p,
                start_tangent,
                end_tangent,
            } => vec![(
                i,
                CurvePiece::Cubic {
                    s: start,
                    sd: start_tangent,
                    e: p,
                    ed: end_tangent,
                },
            )],
            PathCommand::ArcTo {
                p,
                rx,
                ry,
                angle,
                large,
                sweep,
            } => vec![(
                i,
                CurvePiece::Arc(SvgArc::new(start, p, rx, ry, angle, large, sweep)),
            )],
            PathCommand::BezierTo { p, nb } => self.spline_chunks(i, start, p, nb),
            PathCommand::Close => match self.subpath_start(i) {
                Some(first) => vec![(i, CurvePiece::Line { s: start, e: first })],
                None => Vec::new(),
            },
            _ => Vec::new(),
        }
    }

    fn spline_chunks(&self, i: usize, start: PointD, end: PointD, nb: usize) -> Vec<(usize, CurvePiece)> {
        if nb == 0 {
            return vec![(i, CurvePiece::Line { s: start, e: end })];
        }
        let ctrl: Vec<PointD> = self.descr[i + 1..]
            .iter()
            .take(nb)
            .filter_map(|d| match d.cmd {
                PathCommand::IntermBezierTo { p } => Some(p),
                _ => None,
            })
            .collect();
        let mut out = Vec::with_capacity(ctrl.len());
        let mut s = start;
        for (k, &c) in ctrl.iter().enumerate() {
            let e = if k + 1 < ctrl.len() {
                c.lerp(ctrl[k + 1], 0.5)
            } else {
                end
            };
            out.push((i + 1 + k, CurvePiece::Quadratic { s, c, e }));
            s = e;
        }
        out
    }

    /// The parametric piece tagged `piece` (see `command_pieces`).
    pub fn piece(&self, piece: usize) -> Option<CurvePiece> {
        if piece >= self.descr.len() {
            return None;
        }
        let owner = match self.descr[piece].cmd {
            PathCommand::IntermBezierTo { .. } => self.descr[..piece]
                .iter()
                .rposition(|d| matches!(d.cmd, PathCommand::BezierTo { .. }))?,
            _ => piece,
        };
        self.command_pieces(owner)
            .ok()?
            .into_iter()
            .find(|(k, _)| *k == piece)
            .map(|(_, c)| c)
    }

    /// Point at parameter `t` of piece `piece`.
    pub fn point_at(&self, piece: usize, t: f64) -> Option<PointD> {
        if let Some(PathDescr {
            cmd: PathCommand::MoveTo { p },
            ..
        }) = self.descr.get(piece)
        {
            return Some(*p);
        }
        self.piece(piece).map(|c| c.point_at(t))
    }

    /// Point and unit tangent at parameter `t` of piece `piece`.
    pub fn point_and_tangent_at(&self, piece: usize, t: f64) -> Option<(PointD, PointD)> {
        self.piece(piece).map(|c| (c.point_at(t), c.unit_tangent_at(t)))
    }

    /// Every subpath as a list of pieces. Zero-length pieces are skipped.
    pub fn subpath_pieces(&self) -> Vec<SubpathPieces> {
        let mut out: Vec<SubpathPieces> = Vec::new();
        let mut cur: Option<SubpathPieces> = None;
        for (i, d) in self.descr.iter().enumerate() {
            match d.cmd {
                PathCommand::MoveTo { p } => {
                    if let Some(sp) = cur.take() {
                        out.push(sp);
                    }
                    cur = Some(SubpathPieces {
                        start: p,
                        pieces: Vec::new(),
                        closed: false,
                    });
                }
                PathCommand::IntermBezierTo { .. } | PathCommand::Forced => {}
                _ => {
                    let closing = d.cmd == PathCommand::Close;
                    if let Some(sp) = cur.as_mut() {
                        for (k, piece) in self.pieces_of(i, d.cmd) {
                            if !is_zero_length(&piece) {
                                sp.pieces.push((k, piece));
                            }
                        }
                        if closing {
                            sp.closed = true;
                        }
                    }
                    if closing {
                        if let Some(sp) = cur.take() {
                            out.push(sp);
                        }
                    }
                }
            }
        }
        if let Some(sp) = cur {
            out.push(sp);
        }
        out
    }

    // ---------------------------------------------------------------
    // Conversion
    // ---------------------------------------------------------------

    /// Flatten into the polyline with the given tolerance.
    pub fn convert(&mut self, tolerance: f64) {
        self.convert_with(CurveSampler::new(tolerance), false);
    }

    /// Flatten and record `(piece, t)` for every polyline point.
    pub fn convert_with_back_data(&mut self, tolerance: f64) {
        self.convert_with(CurveSampler::new(tolerance), true);
    }

    /// Flatten with back data, also splitting any chord longer than
    /// `max_length` (straight lines included).
    pub fn convert_even_lines(&mut self, tolerance: f64, max_length: f64) {
        let mut sampler = CurveSampler::new(tolerance);
        sampler.set_max_length(max_length);
        self.convert_with(sampler, true);
    }

    /// Flatten the curve displaced by `offset` along its left normal, tagging
    /// each point with `(piece, t, offset)`. Gaps between the offset ends of
    /// consecutive pieces are bridged by straight lines.
    pub fn convert_for_offset(&mut self, tolerance: f64, offset: f64) {
        let mut sampler = CurveSampler::new(tolerance);
        sampler.set_offset(offset);
        self.convert_with(sampler, true);
    }

    fn convert_with(&mut self, sampler: CurveSampler, back: bool) {
        let mut polyline = std::mem::take(&mut self.polyline);
        polyline.reset(back);
        for d in &mut self.descr {
            d.associated = None;
        }
        let offset = sampler.offset();
        let mut open_move: Option<(usize, PointD)> = None;

        for i in 0..self.descr.len() {
            match self.descr[i].cmd {
                PathCommand::MoveTo { p } => {
                    if let Some((mi, mp)) = open_move.take() {
                        // Lone move-to in offset mode.
                        polyline.start_subpath();
                        let idx = polyline.add_point(mp, PolylinePointKind::MoveTo, Some(back_at(mi, 0.0, offset)));
                        self.descr[mi].associated = Some(idx);
                    }
                    if offset != 0.0 {
                        open_move = Some((i, p));
                        continue;
                    }
                    polyline.start_subpath();
                    let idx = polyline.add_point(p, PolylinePointKind::MoveTo, Some(back_at(i, 0.0, 0.0)));
                    self.descr[i].associated = Some(idx);
                }
                PathCommand::Forced => polyline.force_last(),
                PathCommand::IntermBezierTo { .. } => {}
                _ => {
                    let pieces = self.pieces_of(i, self.descr[i].cmd);
                    for (k, piece) in pieces {
                        if offset != 0.0 {
                            let n = piece.unit_tangent_at(0.0).perp() * offset;
                            let s = piece.start() + n;
                            if let Some((mi, _)) = open_move.take() {
                                polyline.start_subpath();
                                let idx = polyline.add_point(s, PolylinePointKind::MoveTo, Some(back_at(mi, 0.0, offset)));
                                self.descr[mi].associated = Some(idx);
                            } else if polyline
                                .last_point()
                                .map_or(true, |l| l.distance(s) > VERTEX_DIST_EPSILON)
                            {
                                polyline.add_point(s, PolylinePointKind::LineTo, Some(back_at(k, 0.0, offset)));
                            }
                        }
                        piece.sample(&sampler, &mut polyline, Some(k));
                        let e = if offset != 0.0 {
                            piece.end() + piece.unit_tangent_at(1.0).perp() * offset
                        } else {
                            piece.end()
                        };
                        let closing_duplicate = self.descr[i].cmd == PathCommand::Close
                            && offset == 0.0
                            && piece.start().distance(piece.end()) <= VERTEX_DIST_EPSILON;
                        if !closing_duplicate {
                            let idx = polyline.add_point(e, PolylinePointKind::LineTo, Some(back_at(k, 1.0, offset)));
                            self.descr[k].associated = Some(idx);
                            self.descr[i].associated = Some(idx);
                        }
                    }
                }
            }
        }
        if let Some((mi, mp)) = open_move.take() {
            polyline.start_subpath();
            let idx = polyline.add_point(mp, PolylinePointKind::MoveTo, Some(back_at(mi, 0.0, offset)));
            self.descr[mi].associated = Some(idx);
        }
        trace!(
            "converted {} commands into {} polyline points",
            self.descr.len(),
            polyline.len()
        );
        self.polyline = polyline;
    }

    // ---------------------------------------------------------------
    // Transformation
    // ---------------------------------------------------------------

    /// Apply an affine transform to every command. Arcs are exact under
    /// similarity transforms; their radii are scaled by the average scale
    /// otherwise. The polyline is invalidated.
    pub fn transform(&mut self, m: &TransAffine) {
        let flip = m.determinant() < 0.0;
        let scale = m.get_scale();
        let rot = rad2deg(m.rotation());
        for d in &mut self.descr {
            d.associated = None;
            d.cmd = match d.cmd {
                PathCommand::MoveTo { p } => PathCommand::MoveTo { p: m.transform(p) },
                PathCommand::LineTo { p } => PathCommand::LineTo { p: m.transform(p) },
                PathCommand::CubicTo {
                    p,
                    start_tangent,
                    end_tangent,
                } => PathCommand::CubicTo {
                    p: m.transform(p),
                    start_tangent: m.transform_vector(start_tangent),
                    end_tangent: m.transform_vector(end_tangent),
                },
                PathCommand::BezierTo { p, nb } => PathCommand::BezierTo {
                    p: m.transform(p),
                    nb,
                },
                PathCommand::IntermBezierTo { p } => PathCommand::IntermBezierTo { p: m.transform(p) },
                PathCommand::ArcTo {
                    p,
                    rx,
                    ry,
                    angle,
                    large,
                    sweep,
                } => PathCommand::ArcTo {
                    p: m.transform(p),
                    rx: rx * scale,
                    ry: ry * scale,
                    angle: if flip { -angle + rot } else { angle + rot },
                    large,
                    sweep: sweep != flip,
                },
                c @ (PathCommand::Close | PathCommand::Forced) => c,
            };
        }
        self.polyline.reset(false);
    }

    // ---------------------------------------------------------------
    // Fill
    // ---------------------------------------------------------------

    /// Add the polyline's segments to `dest` as directed edges.
    ///
    /// * `path_id`: when set and the polyline carries back data, edges
    ///   record their origin for later curve reconstruction.
    /// * `just_add`: keep `dest`'s existing content.
    /// * `close_if_needed`: add a closing edge to open subpaths.
    /// * `invert`: reverse every edge.
    pub fn fill(
        &self,
        dest: &mut Shape,
        path_id: Option<usize>,
        just_add: bool,
        close_if_needed: bool,
        invert: bool,
    ) {
        if !just_add {
            dest.reset();
        }
        let pts = self.polyline.points();
        for (s, e) in self.polyline.subpaths() {
            if e - s < 2 {
                continue;
            }
            let first = pts[s].p;
            let closed = pts[e - 1].p.distance(first) <= VERTEX_DIST_EPSILON;
            let last = if closed { e - 1 } else { e };
            let first_vertex = dest.add_point(first);
            let mut prev_vertex = first_vertex;
            let mut prev_point = s;
            for k in s + 1..e {
                let closing = closed && k == e - 1;
                let pt = pts[k].p;
                if !closing && pt.distance(pts[prev_point].p) <= VERTEX_DIST_EPSILON {
                    continue;
                }
                let v = if closing { first_vertex } else { dest.add_point(pt) };
                let back = path_id.and_then(|id| edge_back(id, &pts[prev_point].back, &pts[k].back));
                add_directed(dest, prev_vertex, v, back, invert);
                prev_vertex = v;
                prev_point = k;
                if closing {
                    break;
                }
            }
            if !closed && close_if_needed && last > s + 1 && prev_vertex != first_vertex {
                add_directed(dest, prev_vertex, first_vertex, None, invert);
            }
        }
    }
}

fn back_at(piece: usize, t: f64, offset: f64) -> BackData {
    BackData { piece, t, offset }
}

fn is_zero_length(piece: &CurvePiece) -> bool {
    match *piece {
        CurvePiece::Cubic { s, sd, e, ed } => {
            s.distance(e) <= VERTEX_DIST_EPSILON
                && sd.length() <= VERTEX_DIST_EPSILON
                && ed.length() <= VERTEX_DIST_EPSILON
        }
        _ => piece.start().distance(piece.end()) <= VERTEX_DIST_EPSILON,
    }
}

fn edge_back(path_id: usize, a: &Option<BackData>, b: &Option<BackData>) -> Option<EdgeBackData> {
    let b = (*b)?;
    let t_st = match a {
        Some(a) if a.piece == b.piece => a.t,
        _ => 0.0,
    };
    Some(EdgeBackData {
        path_id,
        piece: b.piece,
        t_st,
        t_en: b.t,
        offset: b.offset,
    })
}

fn add_directed(dest: &mut Shape, a: usize, b: usize, back: Option<EdgeBackData>, invert: bool) {
    if invert {
        let back = back.map(|mut bd| {
            std::mem::swap(&mut bd.t_st, &mut bd.t_en);
            bd
        });
        dest.add_edge_with_back(b, a, back);
    } else {
        dest.add_edge_with_back(a, b, back);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::calc_segment_point_sq_distance;

    fn p(x: f64, y: f64) -> PointD {
        PointD::new(x, y)
    }

    fn square(path: &mut Path, x: f64, y: f64, size: f64) {
        path.move_to(p(x, y));
        path.line_to(p(x + size, y));
        path.line_to(p(x + size, y + size));
        path.line_to(p(x, y + size));
        path.close().unwrap();
    }

    #[test]
    fn test_implicit_move_to() {
        let mut path = Path::new();
        let i = path.line_to(p(1.0, 2.0));
        assert_eq!(i, 0);
        assert_eq!(path.commands()[0].cmd, PathCommand::MoveTo { p: p(1.0, 2.0) });
        assert_eq!(path.state(), BuildState::BuildingSubpath);
    }

    #[test]
    fn test_close_without_subpath_is_error() {
        let mut path = Path::new();
        assert_eq!(path.close(), Err(PathError::NoSubpath));
        path.move_to(p(0.0, 0.0));
        path.line_to(p(1.0, 0.0));
        assert!(path.close().is_ok());
        assert_eq!(path.close(), Err(PathError::NoSubpath));
        assert_eq!(path.force_point(), Err(PathError::NoSubpath));
        assert_eq!(path.temp_bezier_to(), Err(PathError::NoSubpath));
    }

    #[test]
    fn test_interm_without_bezier_is_error() {
        let mut path = Path::new();
        path.move_to(p(0.0, 0.0));
        assert_eq!(path.interm_bezier_to(p(1.0, 1.0)), Err(PathError::NoPendingBezier));
        assert_eq!(path.end_bezier_to(), Err(PathError::NoPendingBezier));
        assert_eq!(path.end_bezier_to_point(p(1.0, 1.0)), Err(PathError::NoPendingBezier));
    }

    #[test]
    fn test_bezier_counts_controls() {
        let mut path = Path::new();
        path.move_to(p(0.0, 0.0));
        let b = path.bezier_to(p(10.0, 0.0));
        path.interm_bezier_to(p(2.0, 5.0)).unwrap();
        path.interm_bezier_to(p(8.0, 5.0)).unwrap();
        assert_eq!(path.end_bezier_to(), Ok(b));
        assert_eq!(
            path.commands()[b].cmd,
            PathCommand::BezierTo {
                p: p(10.0, 0.0),
                nb: 2
            }
        );
        assert_eq!(path.state(), BuildState::BuildingSubpath);
    }

    #[test]
    fn test_delayed_bezier() {
        let mut path = Path::new();
        path.move_to(p(0.0, 0.0));
        let b = path.temp_bezier_to().unwrap();
        path.interm_bezier_to(p(5.0, 5.0)).unwrap();
        assert_eq!(path.state(), BuildState::BuildingDelayedBezier);
        assert_eq!(path.end_bezier_to_point(p(10.0, 0.0)), Ok(b));
        assert_eq!(path.commands()[b].cmd, PathCommand::BezierTo { p: p(10.0, 0.0), nb: 1 });

        // Without an endpoint the delayed spline is dropped.
        let before = path.descr_count();
        path.temp_bezier_to().unwrap();
        path.interm_bezier_to(p(12.0, 3.0)).unwrap();
        assert_eq!(path.end_bezier_to(), Err(PathError::DelayedBezierPending));
        assert_eq!(path.descr_count(), before);
    }

    #[test]
    fn test_line_to_finishes_pending_bezier() {
        let mut path = Path::new();
        path.move_to(p(0.0, 0.0));
        path.bezier_to(p(10.0, 0.0));
        path.interm_bezier_to(p(5.0, 5.0)).unwrap();
        let l = path.line_to(p(20.0, 0.0));
        assert_eq!(l, 3);
        assert_eq!(path.state(), BuildState::BuildingSubpath);
        assert_eq!(path.prev_point(l), Some(p(10.0, 0.0)));
    }

    #[test]
    fn test_close_cancels_bezier() {
        let mut path = Path::new();
        path.move_to(p(0.0, 0.0));
        path.line_to(p(5.0, 0.0));
        path.bezier_to(p(10.0, 0.0));
        path.interm_bezier_to(p(5.0, 5.0)).unwrap();
        let c = path.close().unwrap();
        assert_eq!(c, 2);
        assert_eq!(path.commands()[c].cmd, PathCommand::Close);
    }

    #[test]
    fn test_reset_and_copy() {
        let mut a = Path::new();
        square(&mut a, 0.0, 0.0, 1.0);
        let mut b = Path::new();
        b.copy_from(&a);
        assert_eq!(b.descr_count(), 5);
        a.reset();
        assert_eq!(a.descr_count(), 0);
        assert_eq!(a.state(), BuildState::Ready);
        assert!(a.command(0).is_err());
    }

    #[test]
    fn test_prev_point_after_close() {
        let mut path = Path::new();
        square(&mut path, 2.0, 3.0, 1.0);
        path.line_to(p(9.0, 9.0));
        // The line after a close starts a new subpath.
        assert_eq!(path.commands()[5].cmd, PathCommand::MoveTo { p: p(9.0, 9.0) });
        assert_eq!(path.prev_point(5), Some(p(2.0, 3.0)));
    }

    #[test]
    fn test_convert_lines_exact() {
        let mut path = Path::new();
        square(&mut path, 0.0, 0.0, 10.0);
        path.convert(0.1);
        let pts: Vec<PointD> = path.polyline().points().iter().map(|q| q.p).collect();
        assert_eq!(
            pts,
            vec![p(0.0, 0.0), p(10.0, 0.0), p(10.0, 10.0), p(0.0, 10.0), p(0.0, 0.0)]
        );
        assert_eq!(path.polyline().points()[0].kind, PolylinePointKind::MoveTo);
        assert_eq!(path.commands()[2].associated, Some(2));
    }

    #[test]
    fn test_convert_idempotent() {
        let mut path = Path::new();
        path.move_to(p(0.0, 0.0));
        path.cubic_to(p(10.0, 0.0), p(0.0, 20.0), p(0.0, -20.0));
        path.arc_to(p(20.0, 0.0), 5.0, 5.0, 0.0, false, true);
        path.close().unwrap();
        path.convert(0.05);
        let first = path.polyline().clone();
        path.convert(0.05);
        assert_eq!(&first, path.polyline());
    }

    #[test]
    fn test_convert_back_data_resolves() {
        let mut path = Path::new();
        path.move_to(p(0.0, 0.0));
        path.cubic_to(p(10.0, 0.0), p(0.0, 20.0), p(0.0, -20.0));
        path.bezier_to(p(20.0, 0.0));
        path.interm_bezier_to(p(12.0, 6.0)).unwrap();
        path.interm_bezier_to(p(18.0, -6.0)).unwrap();
        path.end_bezier_to().unwrap();
        path.arc_to(p(30.0, 0.0), 5.0, 5.0, 0.0, false, false);
        path.convert_with_back_data(0.05);
        for pt in path.polyline().points() {
            let back = pt.back.unwrap();
            let q = path.point_at(back.piece, back.t).unwrap();
            assert!(q.distance(pt.p) < 1e-9, "{:?} vs {:?}", q, pt.p);
        }
    }

    #[test]
    fn test_spline_chunks_use_midpoints() {
        let mut path = Path::new();
        path.move_to(p(0.0, 0.0));
        path.bezier_to(p(20.0, 0.0));
        path.interm_bezier_to(p(5.0, 10.0)).unwrap();
        path.interm_bezier_to(p(15.0, 10.0)).unwrap();
        path.end_bezier_to().unwrap();
        let chunks = path.command_pieces(1).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].0, 2);
        assert_eq!(chunks[1].0, 3);
        assert_eq!(chunks[0].1.end(), p(10.0, 10.0));
        assert_eq!(chunks[1].1.start(), p(10.0, 10.0));
        assert_eq!(chunks[1].1.end(), p(20.0, 0.0));
    }

    #[test]
    fn test_command_pieces_out_of_range() {
        let mut path = Path::new();
        path.move_to(p(0.0, 0.0));
        path.line_to(p(1.0, 0.0));
        assert_eq!(path.command_pieces(1).unwrap().len(), 1);
        assert!(path.command_pieces(0).unwrap().is_empty());
        assert_eq!(
            path.command_pieces(2),
            Err(PathError::CommandOutOfRange { index: 2, len: 2 })
        );
        assert!(path.piece(7).is_none());
    }

    #[test]
    fn test_reconvert_clears_skipped_associations() {
        let mut path = Path::new();
        path.move_to(p(0.0, 0.0));
        path.line_to(p(10.0, 0.0));
        path.line_to(p(10.0, 10.0));
        path.line_to(p(0.0, 0.0));
        path.close().unwrap();
        path.convert_for_offset(0.1, 1.0);
        assert!(path.commands()[4].associated.is_some());

        // The close lands on its own start and adds no point here.
        path.convert(0.1);
        assert_eq!(path.commands()[4].associated, None);
        let n = path.polyline().len();
        assert!(path.commands().iter().filter_map(|d| d.associated).all(|idx| idx < n));
    }

    #[test]
    fn test_zero_control_spline_is_line() {
        let mut path = Path::new();
        path.move_to(p(0.0, 0.0));
        path.bezier_to(p(10.0, 0.0));
        path.end_bezier_to().unwrap();
        path.convert(0.01);
        assert_eq!(path.polyline().len(), 2);
    }

    #[test]
    fn test_convert_flatness() {
        let mut path = Path::new();
        path.move_to(p(0.0, 0.0));
        path.cubic_to(p(100.0, 0.0), p(0.0, 200.0), p(50.0, -200.0));
        path.convert(0.1);
        let pts: Vec<PointD> = path.polyline().points().iter().map(|q| q.p).collect();
        let piece = path.piece(1).unwrap();
        for i in 0..=500 {
            let q = piece.point_at(i as f64 / 500.0);
            let d = pts
                .windows(2)
                .map(|w| calc_segment_point_sq_distance(w[0], w[1], q))
                .fold(f64::MAX, f64::min)
                .sqrt();
            assert!(d <= 0.1 + 1e-9);
        }
    }

    #[test]
    fn test_forced_point_marks_polyline() {
        let mut path = Path::new();
        path.move_to(p(0.0, 0.0));
        path.line_to(p(10.0, 0.0));
        path.force_point().unwrap();
        path.line_to(p(10.0, 10.0));
        path.convert(0.1);
        assert_eq!(path.polyline().points()[1].kind, PolylinePointKind::Forced);
    }

    #[test]
    fn test_even_lines() {
        let mut path = Path::new();
        path.move_to(p(0.0, 0.0));
        path.line_to(p(10.0, 0.0));
        path.convert_even_lines(0.1, 1.0);
        assert_eq!(path.polyline().len(), 11);
        let back = path.polyline().points()[5].back.unwrap();
        assert_eq!(back.piece, 1);
        assert!((back.t - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_convert_for_offset() {
        let mut path = Path::new();
        path.move_to(p(0.0, 0.0));
        path.line_to(p(10.0, 0.0));
        path.convert_for_offset(0.1, 2.0);
        let pts = path.polyline().points();
        assert_eq!(pts.len(), 2);
        assert_eq!(pts[0].p, p(0.0, 2.0));
        assert_eq!(pts[1].p, p(10.0, 2.0));
        assert!((pts[1].back.unwrap().offset - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_transform() {
        let mut path = Path::new();
        path.move_to(p(1.0, 0.0));
        path.cubic_to(p(2.0, 0.0), p(1.0, 1.0), p(1.0, -1.0));
        path.transform(&TransAffine::new_translation(5.0, 5.0));
        assert_eq!(path.commands()[0].cmd, PathCommand::MoveTo { p: p(6.0, 5.0) });
        assert_eq!(
            path.commands()[1].cmd,
            PathCommand::CubicTo {
                p: p(7.0, 5.0),
                start_tangent: p(1.0, 1.0),
                end_tangent: p(1.0, -1.0)
            }
        );
    }

    #[test]
    fn test_fill_square() {
        let mut path = Path::new();
        square(&mut path, 0.0, 0.0, 2.0);
        path.convert(0.1);
        let mut shape = Shape::new();
        path.fill(&mut shape, None, false, true, false);
        assert_eq!(shape.number_of_points(), 4);
        assert_eq!(shape.number_of_edges(), 4);
        assert!((shape.area() - 4.0).abs() < 1e-12);

        path.fill(&mut shape, None, false, true, true);
        assert!((shape.area() + 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_fill_closes_open_subpath() {
        let mut path = Path::new();
        path.move_to(p(0.0, 0.0));
        path.line_to(p(3.0, 0.0));
        path.line_to(p(0.0, 3.0));
        path.convert(0.1);
        let mut shape = Shape::new();
        path.fill(&mut shape, None, false, false, false);
        assert_eq!(shape.number_of_edges(), 2);
        path.fill(&mut shape, None, false, true, false);
        assert_eq!(shape.number_of_edges(), 3);
        assert!((shape.area() - 4.5).abs() < 1e-12);
    }

    #[test]
    fn test_fill_back_data() {
        let mut path = Path::new();
        path.move_to(p(0.0, 0.0));
        path.cubic_to(p(10.0, 0.0), p(0.0, 10.0), p(0.0, -10.0));
        path.close().unwrap();
        path.convert_with_back_data(0.05);
        let mut shape = Shape::new();
        path.fill(&mut shape, Some(7), false, true, false);
        for e in shape.edges() {
            let back = e.back.unwrap();
            assert_eq!(back.path_id, 7);
            assert!(back.piece == 1 || back.piece == 2);
            assert!(back.t_en > back.t_st);
        }
    }
}
