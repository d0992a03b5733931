//! Track reconstruction inside a single drift chamber.
//!
//! Each wire gives a drift distance but not the side of the wire the particle passed
//! on, so every selection of one time per wire is fitted with all sign combinations
//! and the straight line with the smallest squared deviation wins. The winning points
//! are then corrected for the systematic error of measuring the drift distance
//! perpendicular to the wire plane instead of to the track, and refitted.
use super::chamber::Chamber;
use super::constants::*;
use super::event::ChamberTimes;
use super::line::Line2;
use super::vector::Vec2;

/// A reconstructed chamber track in the chamber frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackDesc {
    pub line: Line2,
    /// The points the line was fitted through, one per wire
    pub points: [Vec2; N_WIRES],
    /// The times the points were built from
    pub times: [u32; N_WIRES],
    /// Sum of squared residuals of the fit
    pub deviation: f64,
}

impl TrackDesc {
    /// Track angle in degrees
    pub fn angle(&self) -> f64 {
        self.line.k().atan().to_degrees()
    }
}

/// Least squares fit of `y = kx + b`, returning the line and the sum of squared residuals.
///
/// None for fewer than two points or when all points share one x.
pub fn least_squares(points: &[Vec2]) -> Option<(Line2, f64)> {
    if points.len() < 2 {
        return None;
    }
    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_xx) = (0.0, 0.0, 0.0, 0.0);
    for p in points.iter() {
        sum_x += p.x;
        sum_y += p.y;
        sum_xy += p.x * p.y;
        sum_xx += p.x * p.x;
    }
    let n = points.len() as f64;
    let det = n * sum_xx - sum_x * sum_x;
    if det.abs() <= FIT_DETERMINANT_EPSILON {
        return None;
    }
    let k = (n * sum_xy - sum_x * sum_y) / det;
    let b = (sum_y - k * sum_x) / n;
    let deviation = points.iter().map(|p| (k * p.x + b - p.y).powi(2)).sum();
    Some((Line2::from_kb(k, b), deviation))
}

/// Iterates over every selection of one index per wire, like nested loops with the
/// last wire innermost. Empty when any wire has no candidates.
#[derive(Debug, Clone)]
pub struct IndexProduct {
    lens: [usize; N_WIRES],
    next: Option<[usize; N_WIRES]>,
}

impl IndexProduct {
    pub fn new(lens: [usize; N_WIRES]) -> Self {
        let next = lens.iter().all(|l| *l > 0).then_some([0; N_WIRES]);
        Self { lens, next }
    }
}

impl Iterator for IndexProduct {
    type Item = [usize; N_WIRES];

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        let mut following = current;
        self.next = None;
        for wire in (0..N_WIRES).rev() {
            following[wire] += 1;
            if following[wire] < self.lens[wire] {
                self.next = Some(following);
                break;
            }
            following[wire] = 0;
        }
        Some(current)
    }
}

fn sign(value: f64) -> i8 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}

/// Keep the candidate with the strictly smaller deviation, the earlier one on ties
fn better(best: Option<TrackDesc>, candidate: Option<TrackDesc>) -> Option<TrackDesc> {
    match (best, candidate) {
        (Some(b), Some(c)) if c.deviation < b.deviation => Some(c),
        (None, c) => c,
        (b, _) => b,
    }
}

impl Chamber {
    /// Best fit over the 16 side assignments of four drift distances
    pub fn fit_signs(&self, dists: &[f64; N_WIRES]) -> Option<([Vec2; N_WIRES], Line2, f64)> {
        let mut best: Option<([Vec2; N_WIRES], Line2, f64)> = None;
        for mask in 0..(1u32 << N_WIRES) {
            let mut points = *self.wires();
            for (wire, point) in points.iter_mut().enumerate() {
                let dist = if mask & (1 << wire) != 0 {
                    -dists[wire]
                } else {
                    dists[wire]
                };
                point.y += dist;
            }
            if let Some((line, deviation)) = least_squares(&points) {
                if best.map_or(true, |(_, _, d)| deviation < d) {
                    best = Some((points, line, deviation));
                }
            }
        }
        best
    }

    /// Best uncorrected fit over every selection of one usable time per wire
    pub fn fit_best(&self, times: &ChamberTimes) -> Option<TrackDesc> {
        let good = self.good_times(times);
        let dists = self.chamber_dists(times);
        IndexProduct::new(good.each_ref().map(Vec::len))
            .map(|idx| {
                let selected: [f64; N_WIRES] = std::array::from_fn(|w| dists[w][idx[w]]);
                self.fit_signs(&selected).map(|(points, line, deviation)| TrackDesc {
                    line,
                    points,
                    times: std::array::from_fn(|w| good[w][idx[w]]),
                    deviation,
                })
            })
            .fold(None, better)
    }

    /// Reconstruct the track of a single muon crossing the chamber.
    ///
    /// None unless every wire has exactly one usable time, when no fit exists, or
    /// when a fitted point sits exactly on the wire plane.
    pub fn create_track(&self, times: &ChamberTimes) -> Option<TrackDesc> {
        let good = self.good_times(times);
        if good.iter().any(|t| t.len() != 1) {
            return None;
        }
        self.fit_best(times)
            .and_then(|track| self.correct_systematic(track))
    }

    /// Shift every point by the error of an inclined track and refit
    fn correct_systematic(&self, mut track: TrackDesc) -> Option<TrackDesc> {
        let factor = 1.0 / track.line.k().atan().cos() - 1.0;
        for (point, wire) in track.points.iter_mut().zip(self.wires().iter()) {
            let side = sign(point.y);
            let cap = match side * sign(wire.y) {
                1 => SAME_SIDE_CAP,
                -1 => OPPOSITE_SIDE_CAP,
                _ => return None,
            };
            let r = if point.y.abs() > cap { cap } else { point.y };
            point.y += side as f64 * r * factor;
        }
        let (line, deviation) = least_squares(&track.points)?;
        track.line = line;
        track.deviation = deviation;
        Some(track)
    }
}
