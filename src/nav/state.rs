// src/nav/state.rs
//! The canonical navigation snapshot shared by the ingest and alert loops
//!
//! One `NavigationState` instance owns everything both loops touch: the
//! latest fix, motion and satellite data, the route, and the derived
//! navigation figures. Derived fields are recomputed from scratch every
//! cycle; only the smoothing filters and the alert/travel bookkeeping carry
//! history across cycles. Callers hold the surrounding lock for the whole
//! apply-and-recompute step, so observers never see a half-updated cycle.

use super::filter::MovingAverage;
use super::geo::{wrap_180, wrap_360, Geodesy};
use super::route::Route;
use crate::config::NavSettings;
use crate::error::{NavError, Result};
use crate::gps::data::{Fix, IngestStats, Motion, ParsedSentence, Satellites};
use chrono::{DateTime, Utc};
use std::time::Instant;

/// Samples kept for position smoothing.
const POSITION_WINDOW: usize = 5;
/// Samples kept for speed smoothing.
const SPEED_WINDOW: usize = 20;

#[derive(Debug, Clone)]
pub struct NavigationState {
    pub fix: Option<Fix>,
    pub motion: Motion,
    pub satellites: Satellites,
    pub route: Route,
    pub received_at: Option<DateTime<Utc>>,

    // Derived per cycle.
    pub distance: Option<f64>,
    pub bearing: Option<f64>,
    pub avg_heading: Option<f64>,
    pub avg_position: Option<(f64, f64)>,
    pub last_avg_position: Option<(f64, f64)>,
    /// Deviation between the travel heading and the bearing to the target,
    /// normalized into [0, 360).
    pub proposed_direction: Option<f64>,

    // History carried across cycles.
    pub travel_heading: Option<f64>,
    travel_anchor: Option<(f64, f64)>,
    lat_avg: MovingAverage,
    lon_avg: MovingAverage,
    speed_avg: MovingAverage,

    // Alert suppression bookkeeping, written by the scheduler.
    pub last_alert_at: Option<Instant>,
    pub last_alert_position: Option<(f64, f64)>,
    pub approach_warned: Option<usize>,

    pub stats: IngestStats,
}

impl NavigationState {
    pub fn new(route: Route) -> Self {
        Self {
            fix: None,
            motion: Motion::default(),
            satellites: Satellites::default(),
            route,
            received_at: None,
            distance: None,
            bearing: None,
            avg_heading: None,
            avg_position: None,
            last_avg_position: None,
            proposed_direction: None,
            travel_heading: None,
            travel_anchor: None,
            lat_avg: MovingAverage::new(POSITION_WINDOW),
            lon_avg: MovingAverage::new(POSITION_WINDOW),
            speed_avg: MovingAverage::new(SPEED_WINDOW),
            last_alert_at: None,
            last_alert_position: None,
            approach_warned: None,
            stats: IngestStats::default(),
        }
    }

    /// Commit one decoded sentence and rebuild the derived fields.
    ///
    /// The sentence was fully parsed before this point, so each category is
    /// updated atomically; a later valid sentence simply overwrites it.
    pub fn apply(&mut self, sentence: ParsedSentence, settings: &NavSettings, geo: &dyn Geodesy) {
        match sentence {
            ParsedSentence::Position(update) => {
                let prev = self.fix.take();
                let carried_valid = prev.as_ref().map_or(true, |f| f.valid);
                self.fix = Some(Fix {
                    latitude: update.latitude,
                    longitude: update.longitude,
                    altitude: update.altitude.or(prev.as_ref().and_then(|f| f.altitude)),
                    time: update.time.or(prev.as_ref().and_then(|f| f.time)),
                    valid: update.validity.unwrap_or(carried_valid),
                    kind: update.kind,
                });
            }
            ParsedSentence::View(view) => self.satellites.apply_view(view),
            ParsedSentence::Usage(usage) => self.satellites.apply_usage(usage),
            ParsedSentence::Motion(motion) => self.motion = motion,
        }
        self.received_at = Some(Utc::now());
        self.recompute(settings, geo);
    }

    /// Rebuild distance, bearing, smoothed position/heading and the
    /// proposed travel correction.
    ///
    /// An explicitly invalid fix freezes every derived value: stale but
    /// consistent beats corrupt. With no fix at all, the motion-side
    /// smoothing still runs.
    pub fn recompute(&mut self, settings: &NavSettings, geo: &dyn Geodesy) {
        let _ = self.route.ensure_cursor();

        if self.fix.as_ref().is_some_and(|f| !f.valid) {
            return;
        }

        if let Some(fix) = self.fix.clone() {
            if let Some(target) = self.route.target() {
                let (distance, bearing) = geo.distance_and_bearing(
                    fix.latitude,
                    fix.longitude,
                    target.latitude,
                    target.longitude,
                );
                self.distance = Some(distance);
                self.bearing = Some(wrap_360(bearing));

                self.last_avg_position = self.mean_position();
                self.lat_avg.push(fix.latitude);
                self.lon_avg.push(fix.longitude);
                self.avg_position = self.mean_position();

                // The first smoothed point seeds the alert anchor.
                if self.last_alert_position.is_none() {
                    self.last_alert_position = self.avg_position;
                }

                match self.travel_anchor {
                    None => self.travel_anchor = self.avg_position,
                    Some((anchor_lat, anchor_lon)) => {
                        let (moved, direction) = geo.distance_and_bearing(
                            anchor_lat,
                            anchor_lon,
                            fix.latitude,
                            fix.longitude,
                        );
                        // Only a decent baseline gives a trustworthy
                        // travel direction.
                        if moved > 2.0 * settings.minimum_warning_distance {
                            self.travel_heading = Some(direction);
                            self.travel_anchor = self.avg_position;
                            if let Some(bearing) = self.bearing {
                                self.proposed_direction =
                                    Some(wrap_360(direction - bearing));
                            }
                        }
                    }
                }
            }
        }

        self.speed_avg.push(self.motion.speed_mps.unwrap_or(0.0));

        let moving = self
            .speed_avg
            .mean()
            .is_some_and(|v| v > settings.minimum_speed_mps);
        self.avg_heading = match (self.motion.true_heading, self.travel_heading) {
            (Some(measured), _) if moving => Some(measured),
            (Some(measured), Some(travel)) => {
                Some(wrap_360(travel + wrap_180(measured - travel) / 6.0))
            }
            (None, Some(travel)) => Some(travel),
            _ => None,
        };
    }

    /// Smoothed mean speed in m/s, when any samples exist.
    pub fn speed_mean(&self) -> Option<f64> {
        self.speed_avg.mean()
    }

    /// Best position available: the valid fix, falling back to the last
    /// smoothed position.
    pub fn usable_position(&self) -> Option<(f64, f64)> {
        if let Some(fix) = self.fix.as_ref().filter(|f| f.valid) {
            return Some((fix.latitude, fix.longitude));
        }
        self.avg_position.or(self.last_avg_position)
    }

    /// Point the route cursor at the closest waypoint.
    pub fn select_closest_waypoint(&mut self, geo: &dyn Geodesy) -> Result<usize> {
        let (lat, lon) = self.usable_position().ok_or(NavError::NoValidPosition)?;
        self.route.select_closest(lat, lon, geo)
    }

    /// Record that an alert was emitted now, anchoring follow-up distance
    /// checks at the current smoothed position.
    pub fn note_alert(&mut self, now: Instant) {
        self.last_alert_at = Some(now);
        if self.avg_position.is_some() {
            self.last_alert_position = self.avg_position;
        }
    }

    fn mean_position(&self) -> Option<(f64, f64)> {
        match (self.lat_avg.mean(), self.lon_avg.mean()) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gps::data::{FixKind, PositionUpdate};
    use crate::nav::geo::Haversine;
    use crate::nav::route::Waypoint;

    fn settings() -> NavSettings {
        NavSettings::default()
    }

    fn position(lat: f64, lon: f64, valid: Option<bool>) -> ParsedSentence {
        ParsedSentence::Position(PositionUpdate {
            latitude: lat,
            longitude: lon,
            altitude: None,
            time: None,
            validity: valid,
            kind: FixKind::Gga,
        })
    }

    fn state_with_target(lat: f64, lon: f64) -> NavigationState {
        let mut route = Route::from_waypoints(vec![Waypoint::new("Target", lat, lon)]);
        route.set_current(0).unwrap();
        NavigationState::new(route)
    }

    #[test]
    fn recompute_yields_distance_and_bearing() {
        // Berlin: Alexanderplatz toward a point to the northeast.
        let mut state = state_with_target(52.530, 13.420);
        state.apply(
            position(52.520727, 13.409586, Some(true)),
            &settings(),
            &Haversine,
        );

        let distance = state.distance.expect("distance");
        let bearing = state.bearing.expect("bearing");
        assert!(
            (1000.0..1500.0).contains(&distance),
            "expected a roughly 1.2 km leg, got {}",
            distance
        );
        assert!(
            (20.0..60.0).contains(&bearing),
            "expected a northeasterly bearing, got {}",
            bearing
        );
    }

    #[test]
    fn invalid_fix_freezes_derived_values() {
        let mut state = state_with_target(52.530, 13.420);
        state.apply(
            position(52.520727, 13.409586, Some(true)),
            &settings(),
            &Haversine,
        );
        let before = state.distance;

        state.apply(position(0.0, 0.0, Some(false)), &settings(), &Haversine);
        assert_eq!(state.distance, before, "invalid fix must not move the distance");
        assert_eq!(state.avg_position, Some((52.520727, 13.409586)));
    }

    #[test]
    fn rmc_carries_validity_over() {
        let mut state = state_with_target(52.530, 13.420);
        state.apply(position(52.52, 13.40, Some(false)), &settings(), &Haversine);
        // RMC reports no validity of its own.
        state.apply(position(52.521, 13.41, None), &settings(), &Haversine);
        assert!(!state.fix.as_ref().unwrap().valid);

        state.apply(position(52.522, 13.41, Some(true)), &settings(), &Haversine);
        state.apply(position(52.523, 13.41, None), &settings(), &Haversine);
        assert!(state.fix.as_ref().unwrap().valid);
    }

    #[test]
    fn altitude_survives_sentences_without_one() {
        let mut state = state_with_target(52.530, 13.420);
        state.apply(
            ParsedSentence::Position(PositionUpdate {
                latitude: 52.52,
                longitude: 13.40,
                altitude: Some(34.0),
                time: None,
                validity: Some(true),
                kind: FixKind::Gga,
            }),
            &settings(),
            &Haversine,
        );
        state.apply(position(52.521, 13.401, Some(true)), &settings(), &Haversine);
        assert_eq!(state.fix.as_ref().unwrap().altitude, Some(34.0));
    }

    #[test]
    fn travel_heading_and_proposed_direction() {
        // Target due east; travel due north: proposed correction ~270.
        let mut state = state_with_target(52.0, 13.05);
        state.apply(position(52.0, 13.0, Some(true)), &settings(), &Haversine);
        assert!(state.travel_heading.is_none());

        // ~111 m north of the anchor, beyond 2x the warning distance.
        state.apply(position(52.001, 13.0, Some(true)), &settings(), &Haversine);
        let travel = state.travel_heading.expect("travel heading");
        assert!(travel < 1.0 || travel > 359.0, "got {}", travel);
        let proposed = state.proposed_direction.expect("proposed direction");
        assert!((255.0..285.0).contains(&proposed), "got {}", proposed);
    }

    #[test]
    fn measured_heading_wins_while_moving() {
        let mut state = NavigationState::new(Route::new());
        state.apply(
            ParsedSentence::Motion(Motion {
                speed_mps: Some(5.0),
                speed_kmh: Some(18.0),
                speed_mph: Some(11.2),
                true_heading: Some(45.0),
                mag_heading: None,
            }),
            &settings(),
            &Haversine,
        );
        assert_eq!(state.avg_heading, Some(45.0));
        assert_eq!(state.speed_mean(), Some(5.0));
    }

    #[test]
    fn no_heading_without_motion_or_travel_history() {
        let mut state = NavigationState::new(Route::new());
        state.apply(
            ParsedSentence::Motion(Motion {
                speed_mps: Some(0.0),
                speed_kmh: Some(0.0),
                speed_mph: Some(0.0),
                true_heading: Some(45.0),
                mag_heading: None,
            }),
            &settings(),
            &Haversine,
        );
        // Standing still with no travel history: the measured heading
        // alone is not trusted.
        assert_eq!(state.avg_heading, None);
    }

    #[test]
    fn usable_position_falls_back_to_smoothed() {
        let mut state = state_with_target(52.530, 13.420);
        state.apply(position(52.52, 13.40, Some(true)), &settings(), &Haversine);
        state.apply(position(0.0, 0.0, Some(false)), &settings(), &Haversine);
        let (lat, lon) = state.usable_position().expect("fallback position");
        assert!((lat - 52.52).abs() < 1e-9);
        assert!((lon - 13.40).abs() < 1e-9);
    }

    #[test]
    fn select_closest_without_any_position() {
        let mut route = Route::from_waypoints(vec![Waypoint::new("A", 52.0, 13.0)]);
        route.set_current(0).unwrap();
        let mut state = NavigationState::new(route);
        assert!(matches!(
            state.select_closest_waypoint(&Haversine),
            Err(NavError::NoValidPosition)
        ));
    }
}
