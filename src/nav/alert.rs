// src/nav/alert.rs
//! Alert scheduling: approach, arrival, off-course and periodic status
//!
//! The scheduler is polled once per second. Each tick classifies the shared
//! state into at most one alert category; the categories are checked in
//! priority order and are mutually exclusive per tick. The scheduler emits
//! structured events only — wording is the output collaborator's problem.

use super::geo::Geodesy;
use super::state::NavigationState;
use crate::config::NavSettings;
use std::time::Instant;

/// Turn side for spoken directions. Zero counts as right, matching the
/// sign convention of the route advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnDirection {
    Left,
    Right,
}

impl TurnDirection {
    pub fn from_angle(turn_degrees: f64) -> Self {
        if turn_degrees < 0.0 {
            TurnDirection::Left
        } else {
            TurnDirection::Right
        }
    }
}

/// Steering correction derived from the proposed-direction deviation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SteeringHint {
    StraightAhead,
    SlightLeft,
    KeepLeft,
    TurnAround,
    KeepRight,
    SlightRight,
}

impl SteeringHint {
    /// Map a deviation in [0, 360) onto a correction band.
    pub fn from_deviation(deviation: f64) -> Self {
        if deviation > 25.0 && deviation <= 55.0 {
            SteeringHint::SlightLeft
        } else if deviation > 55.0 && deviation <= 135.0 {
            SteeringHint::KeepLeft
        } else if deviation > 135.0 && deviation < 225.0 {
            SteeringHint::TurnAround
        } else if (225.0..305.0).contains(&deviation) {
            SteeringHint::KeepRight
        } else if (305.0..335.0).contains(&deviation) {
            SteeringHint::SlightRight
        } else {
            SteeringHint::StraightAhead
        }
    }
}

/// Eight-way compass rose sector for status summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompassSector {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl CompassSector {
    pub fn from_bearing(bearing: f64) -> Self {
        match bearing {
            b if !(22.5..337.5).contains(&b) => CompassSector::North,
            b if b < 67.5 => CompassSector::NorthEast,
            b if b < 112.5 => CompassSector::East,
            b if b < 157.5 => CompassSector::SouthEast,
            b if b < 202.5 => CompassSector::South,
            b if b < 247.5 => CompassSector::SouthWest,
            b if b < 292.5 => CompassSector::West,
            _ => CompassSector::NorthWest,
        }
    }
}

/// The short second leg announced together with an approach warning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FollowingTurn {
    pub distance_m: f64,
    pub direction: TurnDirection,
}

/// One discrete alert, consumed by the output collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertEvent {
    /// Closing in on a turn waypoint: distance now, which way to turn, and
    /// optionally the turn right after it.
    Approach {
        distance_m: f64,
        direction: TurnDirection,
        following: Option<FollowingTurn>,
    },
    /// The final waypoint has been reached; navigation is now inactive.
    Arrival,
    /// Moving well off the proposed direction.
    OffCourse { hint: SteeringHint },
    /// Periodic full summary.
    Status {
        fix_valid: bool,
        distance_m: Option<f64>,
        compass: Option<CompassSector>,
        hint: Option<SteeringHint>,
    },
}

pub struct AlertScheduler {
    settings: NavSettings,
}

impl AlertScheduler {
    pub fn new(settings: NavSettings) -> Self {
        Self { settings }
    }

    /// Classify the current state into at most one alert.
    ///
    /// Inactive navigation (no cursor) never alerts, which also makes
    /// arrival idempotent: the arrival tick deactivates the cursor.
    pub fn tick(
        &self,
        state: &mut NavigationState,
        geo: &dyn Geodesy,
        now: Instant,
    ) -> Option<AlertEvent> {
        let cur = state.route.current()?;
        let s = &self.settings;

        // 1. Approaching a waypoint with more route behind it. The warned
        // marker is set before the advance so the waypoint can never warn
        // twice, even if the distance oscillates around the threshold.
        let approaching = state
            .distance
            .is_some_and(|d| d < s.approach_distance)
            && cur + 1 < state.route.len()
            && state.approach_warned != Some(cur);
        if approaching {
            let distance_m = state.distance.unwrap_or(0.0);
            state.approach_warned = Some(cur);
            let heading = state.avg_heading;
            let advance = state
                .route
                .select_next(heading, s.min_direction_difference, geo);
            state.recompute(s, geo);

            if let Some(advance) = advance {
                let following = if advance.run_distance < s.approach_distance {
                    state
                        .route
                        .peek_next_turn(true, None, s.min_direction_difference, geo)
                        .map(|turn| FollowingTurn {
                            distance_m: advance.run_distance,
                            direction: TurnDirection::from_angle(turn),
                        })
                } else {
                    None
                };
                state.note_alert(now);
                return Some(AlertEvent::Approach {
                    distance_m,
                    direction: TurnDirection::from_angle(advance.turn_degrees),
                    following,
                });
            }
            // Straight through: the cursor moved on, nothing to announce.
            return None;
        }

        // 2. Arrival at the final waypoint.
        if state.distance.is_some_and(|d| d <= s.arrival_distance)
            && state.route.at_final_waypoint()
        {
            state.route.deactivate();
            state.distance = None;
            state.note_alert(now);
            return Some(AlertEvent::Arrival);
        }

        // 3. Moving in a clearly wrong direction, rate- and
        // distance-limited against nagging.
        let alert_due = state.last_alert_at.map_or(true, |t| {
            now.duration_since(t).as_secs_f64() >= s.audio_alert_interval
        });
        let moving = state
            .speed_mean()
            .is_some_and(|v| v > s.minimum_speed_mps);
        if moving && alert_due {
            if let (Some(deviation), Some(fix), Some((anchor_lat, anchor_lon))) = (
                state.proposed_direction,
                state.fix.clone().filter(|f| f.valid),
                state.last_alert_position,
            ) {
                let (traveled, _) = geo.distance_and_bearing(
                    anchor_lat,
                    anchor_lon,
                    fix.latitude,
                    fix.longitude,
                );
                if traveled >= s.minimum_warning_distance
                    && deviation > 40.0
                    && deviation < 320.0
                {
                    state.note_alert(now);
                    return Some(AlertEvent::OffCourse {
                        hint: SteeringHint::from_deviation(deviation),
                    });
                }
            }
        }

        // 4. Periodic status summary.
        let info_due = state.last_alert_at.map_or(true, |t| {
            now.duration_since(t).as_secs_f64() > s.audio_info_interval
        });
        if info_due {
            let fix_valid = state.fix.as_ref().is_some_and(|f| f.valid);
            let hint = if fix_valid && moving {
                state.proposed_direction.map(SteeringHint::from_deviation)
            } else {
                None
            };
            let event = AlertEvent::Status {
                fix_valid,
                distance_m: state.distance,
                compass: state.bearing.map(CompassSector::from_bearing),
                hint,
            };
            state.note_alert(now);
            return Some(event);
        }

        None
    }
}
