// src/nav/route.rs
//! Ordered waypoint route with turn detection and cursor selection
//!
//! The route is a sequence of waypoints plus a cursor naming the one
//! currently navigated to. The cursor is an explicit `Option<usize>`:
//! `None` means navigation is inactive, and index 0 is an ordinary,
//! selectable answer. Every mutation remaps the cursor deterministically so
//! it is never left dangling.

use super::geo::{wrap_180, wrap_360, Geodesy};
use crate::error::{NavError, Result};
use serde::{Deserialize, Serialize};

/// A named position. Immutable once created; routes replace, not edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Waypoint {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
        }
    }
}

/// Signed turn produced by a cursor advance: positive is a right turn, and
/// the distance is the folded straight-line run up to the new target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurnAdvance {
    pub turn_degrees: f64,
    pub run_distance: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Route {
    waypoints: Vec<Waypoint>,
    current: Option<usize>,
}

impl Route {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a route from an ordered list; navigation starts inactive.
    pub fn from_waypoints(waypoints: Vec<Waypoint>) -> Self {
        Self {
            waypoints,
            current: None,
        }
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn target(&self) -> Option<&Waypoint> {
        self.current.and_then(|i| self.waypoints.get(i))
    }

    /// True when the cursor names the last waypoint of the route.
    pub fn at_final_waypoint(&self) -> bool {
        matches!(self.current, Some(i) if i + 1 == self.waypoints.len())
    }

    pub fn set_current(&mut self, index: usize) -> Result<()> {
        if index >= self.waypoints.len() {
            return Err(NavError::RouteCursorInvalid);
        }
        self.current = Some(index);
        Ok(())
    }

    pub fn deactivate(&mut self) {
        self.current = None;
    }

    /// Defensive check of the cursor invariant. A cursor outside the
    /// sequence is reset to `None` and reported.
    pub fn ensure_cursor(&mut self) -> Result<()> {
        match self.current {
            Some(i) if i >= self.waypoints.len() => {
                self.current = None;
                Err(NavError::RouteCursorInvalid)
            }
            _ => Ok(()),
        }
    }

    pub fn push(&mut self, waypoint: Waypoint) {
        self.waypoints.push(waypoint);
    }

    pub fn insert(&mut self, index: usize, waypoint: Waypoint) {
        let index = index.min(self.waypoints.len());
        self.waypoints.insert(index, waypoint);
        if let Some(cur) = self.current {
            if index <= cur {
                self.current = Some(cur + 1);
            }
        }
    }

    /// Remove a waypoint, remapping the cursor: targets behind the removal
    /// shift down; removing the target itself re-targets the waypoint now
    /// occupying that index (the new tail when the target was last), and an
    /// emptied route deactivates navigation.
    pub fn remove(&mut self, index: usize) -> Option<Waypoint> {
        if index >= self.waypoints.len() {
            return None;
        }
        let waypoint = self.waypoints.remove(index);
        self.current = match self.current {
            None => None,
            Some(cur) if index < cur => Some(cur - 1),
            Some(cur) if index == cur => {
                if self.waypoints.is_empty() {
                    None
                } else {
                    Some(cur.min(self.waypoints.len() - 1))
                }
            }
            keep => keep,
        };
        Some(waypoint)
    }

    /// Reverse the travel direction; cursor index `i` maps to `len-1-i`.
    pub fn reverse(&mut self) {
        self.waypoints.reverse();
        if let Some(cur) = self.current {
            self.current = Some(self.waypoints.len() - 1 - cur);
        }
    }

    /// Point the cursor at the waypoint closest to the given position.
    /// Ties go to the first-scanned waypoint.
    pub fn select_closest(&mut self, latitude: f64, longitude: f64, geo: &dyn Geodesy) -> Result<usize> {
        if self.waypoints.is_empty() {
            return Err(NavError::EmptyRoute);
        }
        let mut best = 0;
        let mut best_distance = f64::INFINITY;
        for (i, wp) in self.waypoints.iter().enumerate() {
            let (distance, _) = geo.distance_and_bearing(latitude, longitude, wp.latitude, wp.longitude);
            if distance < best_distance {
                best_distance = distance;
                best = i;
            }
        }
        self.current = Some(best);
        Ok(best)
    }

    /// Advance the cursor along the longest near-straight run of waypoints.
    ///
    /// Consecutive leg bearings within `threshold` degrees of the running
    /// mean fold into one leg; the run ends at the first deviating waypoint
    /// or at the end of the route (the final waypoint is always selected
    /// when the walk reaches it). If no run forms, the cursor advances by
    /// exactly one. Returns the signed turn from the inbound direction onto
    /// the run — `heading` when known, otherwise the bearing of the leg
    /// into the current waypoint — or `None` when direction data is
    /// missing or the turn is below `threshold`.
    pub fn select_next(
        &mut self,
        heading: Option<f64>,
        threshold: f64,
        geo: &dyn Geodesy,
    ) -> Option<TurnAdvance> {
        let cur = self.current?;
        if cur >= self.waypoints.len() {
            self.current = None;
            return None;
        }
        let old_direction =
            heading.or_else(|| (cur > 0).then(|| self.leg(cur - 1, cur, geo).1));

        let last = self.waypoints.len() - 1;
        if cur >= last {
            return None;
        }

        let mut mean_direction: Option<f64> = None;
        let mut run_distance = 0.0;
        let mut selection: Option<usize> = None;

        for w in (cur + 1)..=last {
            let (distance, direction) = self.leg(w - 1, w, geo);
            if w == last {
                selection = Some(w);
                break;
            }
            match mean_direction {
                None => {
                    mean_direction = Some(direction);
                    run_distance = distance;
                }
                Some(mean) => {
                    let deviation = wrap_180(direction - mean);
                    if deviation.abs() < threshold {
                        mean_direction = Some(wrap_360(mean + deviation / 2.0));
                        run_distance += distance;
                    } else {
                        selection = Some(w - 1);
                        break;
                    }
                }
            }
        }

        self.current = Some(selection.unwrap_or(cur + 1));

        let turn = wrap_180(mean_direction? - old_direction?);
        if turn.abs() > threshold {
            Some(TurnAdvance {
                turn_degrees: turn,
                run_distance,
            })
        } else {
            None
        }
    }

    /// Walk the cursor backward using the same collinearity folding,
    /// terminating at index 0 when no break is found.
    pub fn select_prev(&mut self, threshold: f64, geo: &dyn Geodesy) {
        let Some(cur) = self.current else { return };
        if cur == 0 || cur >= self.waypoints.len() {
            return;
        }

        let mut mean_direction: Option<f64> = None;
        let mut selection: Option<usize> = None;

        for w in (0..cur).rev() {
            let (_, direction) = self.leg(w + 1, w, geo);
            if w == 0 {
                selection = Some(0);
                break;
            }
            match mean_direction {
                None => mean_direction = Some(direction),
                Some(mean) => {
                    let deviation = wrap_180(direction - mean);
                    if deviation.abs() < threshold {
                        mean_direction = Some(wrap_360(mean + deviation / 2.0));
                    } else {
                        selection = Some(w + 1);
                        break;
                    }
                }
            }
        }

        self.current = Some(selection.unwrap_or(cur - 1));
    }

    /// Non-mutating preview of the turn at the current waypoint: inbound
    /// direction (travel heading, or the incoming leg when
    /// `assume_on_track`) against the leg out to the next waypoint.
    /// Returns the signed angle only when it exceeds `threshold`.
    pub fn peek_next_turn(
        &self,
        assume_on_track: bool,
        heading: Option<f64>,
        threshold: f64,
        geo: &dyn Geodesy,
    ) -> Option<f64> {
        let cur = self.current?;
        if cur >= self.waypoints.len() {
            return None;
        }
        let old_direction = if !assume_on_track && heading.is_some() {
            heading
        } else if cur > 0 {
            Some(self.leg(cur - 1, cur, geo).1)
        } else {
            None
        };
        let new_direction =
            (cur + 1 < self.waypoints.len()).then(|| self.leg(cur, cur + 1, geo).1);

        let turn = wrap_180(new_direction? - old_direction?);
        (turn.abs() > threshold).then_some(turn)
    }

    fn leg(&self, from: usize, to: usize, geo: &dyn Geodesy) -> (f64, f64) {
        let a = &self.waypoints[from];
        let b = &self.waypoints[to];
        geo.distance_and_bearing(a.latitude, a.longitude, b.latitude, b.longitude)
    }
}
