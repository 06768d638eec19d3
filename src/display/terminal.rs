// src/display/terminal.rs
//! Terminal display: state snapshot rendering and alert phrasing
//!
//! This is the output collaborator: it turns structured alert events into
//! text and repaints a snapshot of the navigation state once per second.

use crate::{
    error::Result,
    nav::alert::{AlertEvent, CompassSector, SteeringHint, TurnDirection},
    nav::state::NavigationState,
};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType, DisableLineWrap, EnableLineWrap},
};
use std::{
    collections::VecDeque,
    io::{self, Write},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, RwLock,
    },
    time::Duration,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::sleep;

/// How many announced phrases stay on screen.
const PHRASE_HISTORY: usize = 6;

pub struct TerminalDisplay;

impl TerminalDisplay {
    pub fn new() -> Self {
        Self
    }

    /// Repaint loop; exits when the running flag clears.
    pub async fn run(
        &self,
        state: Arc<RwLock<NavigationState>>,
        running: Arc<AtomicBool>,
        mut alerts: UnboundedReceiver<AlertEvent>,
    ) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(stdout, Hide, DisableLineWrap)?;

        // Set up Ctrl+C handler
        let running_clone = Arc::clone(&running);
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            running_clone.store(false, Ordering::Relaxed);
        });

        let mut phrases: VecDeque<String> = VecDeque::new();
        while running.load(Ordering::Relaxed) {
            while let Ok(event) = alerts.try_recv() {
                phrases.push_back(phrase(&event));
                if phrases.len() > PHRASE_HISTORY {
                    phrases.pop_front();
                }
            }

            execute!(stdout, Clear(ClearType::All), MoveTo(0, 0))?;
            let snapshot = state.read().unwrap().clone();
            self.render(&mut stdout, &snapshot, &phrases)?;
            stdout.flush()?;
            sleep(Duration::from_secs(1)).await;
        }

        execute!(stdout, Show, EnableLineWrap)?;
        println!("\nShutting down...");
        Ok(())
    }

    fn render(
        &self,
        stdout: &mut impl Write,
        state: &NavigationState,
        phrases: &VecDeque<String>,
    ) -> Result<()> {
        execute!(
            stdout,
            SetForegroundColor(Color::Green),
            Print("=".repeat(60)),
            Print("\n"),
            Print("GPS Navigator - NMEA Waypoint Navigation"),
            Print("\n"),
            Print("=".repeat(60)),
            Print("\n"),
            ResetColor
        )?;

        let stamp = match state.received_at {
            Some(ts) => ts.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            None => "No data received".to_string(),
        };
        execute!(stdout, Print(format!("Last Update: {}\n\n", stamp)))?;

        self.render_position(stdout, state)?;
        self.render_motion(stdout, state)?;
        self.render_navigation(stdout, state)?;
        self.render_satellites(stdout, state)?;
        self.render_stream(stdout, state)?;
        self.render_phrases(stdout, phrases)?;
        Ok(())
    }

    fn render_position(&self, stdout: &mut impl Write, state: &NavigationState) -> Result<()> {
        execute!(stdout, SetForegroundColor(Color::Cyan), Print("Position\n"), ResetColor)?;
        match &state.fix {
            Some(fix) => {
                let validity = if fix.valid { "valid" } else { "INVALID" };
                execute!(
                    stdout,
                    Print(format!(
                        "  Lat: {:>12.6}  Lon: {:>12.6}  ({})\n",
                        fix.latitude, fix.longitude, validity
                    ))
                )?;
                let alt = fix
                    .altitude
                    .map_or("unknown".to_string(), |a| format!("{:.1} m", a));
                let time = fix
                    .time
                    .map_or("--:--:--".to_string(), |t| t.format("%H:%M:%S").to_string());
                execute!(stdout, Print(format!("  Alt: {}  Time: {} UTC\n", alt, time)))?;
            }
            None => {
                execute!(stdout, Print("  No fix\n"))?;
            }
        }
        execute!(stdout, Print("\n"))?;
        Ok(())
    }

    fn render_motion(&self, stdout: &mut impl Write, state: &NavigationState) -> Result<()> {
        execute!(stdout, SetForegroundColor(Color::Cyan), Print("Motion\n"), ResetColor)?;
        let speed = match (state.motion.speed_kmh, state.motion.speed_mph) {
            (Some(kmh), Some(mph)) => format!("{:.1} km/h ({:.1} mph)", kmh, mph),
            _ => "unknown".to_string(),
        };
        let heading = state
            .motion
            .true_heading
            .map_or("---".to_string(), |h| format!("{:.0}°", h));
        let smoothed = state
            .avg_heading
            .map_or("---".to_string(), |h| format!("{:.0}°", h));
        execute!(
            stdout,
            Print(format!(
                "  Speed: {}  Heading: {} (smoothed {})\n\n",
                speed, heading, smoothed
            ))
        )?;
        Ok(())
    }

    fn render_navigation(&self, stdout: &mut impl Write, state: &NavigationState) -> Result<()> {
        execute!(stdout, SetForegroundColor(Color::Cyan), Print("Navigation\n"), ResetColor)?;
        match state.route.target() {
            Some(target) => {
                execute!(
                    stdout,
                    Print(format!(
                        "  Target: {} ({} of {})\n",
                        target.name,
                        state.route.current().map_or(0, |i| i + 1),
                        state.route.len()
                    ))
                )?;
                let distance = state
                    .distance
                    .map_or("---".to_string(), format_distance);
                let bearing = state.bearing.map_or("---".to_string(), |b| {
                    format!("{:.0}° ({})", b, sector_name(CompassSector::from_bearing(b)))
                });
                execute!(stdout, Print(format!("  Distance: {}  Bearing: {}\n", distance, bearing)))?;
                if let Some(deviation) = state.proposed_direction {
                    execute!(stdout, Print(format!("  Course deviation: {:.0}°\n", deviation)))?;
                }
            }
            None => {
                execute!(
                    stdout,
                    Print(format!(
                        "  Inactive ({} waypoints loaded)\n",
                        state.route.len()
                    ))
                )?;
            }
        }
        execute!(stdout, Print("\n"))?;
        Ok(())
    }

    fn render_satellites(&self, stdout: &mut impl Write, state: &NavigationState) -> Result<()> {
        execute!(stdout, SetForegroundColor(Color::Cyan), Print("Satellites\n"), ResetColor)?;
        let sats = &state.satellites;
        execute!(
            stdout,
            Print(format!(
                "  In view: {}  In use: {}\n",
                sats.in_view.len(),
                sats.in_use.len()
            ))
        )?;
        let dop = |v: Option<f64>| v.map_or("-".to_string(), |d| format!("{:.1}", d));
        execute!(
            stdout,
            Print(format!(
                "  DOP: {} overall, {} horizontal, {} vertical\n\n",
                dop(sats.pdop),
                dop(sats.hdop),
                dop(sats.vdop)
            ))
        )?;
        Ok(())
    }

    fn render_stream(&self, stdout: &mut impl Write, state: &NavigationState) -> Result<()> {
        execute!(
            stdout,
            Print(format!(
                "Sentences: {} accepted, {} ignored, {} rejected\n\n",
                state.stats.accepted,
                state.stats.ignored,
                state.stats.rejected()
            ))
        )?;
        Ok(())
    }

    fn render_phrases(&self, stdout: &mut impl Write, phrases: &VecDeque<String>) -> Result<()> {
        execute!(stdout, SetForegroundColor(Color::Yellow), Print("Announcements\n"), ResetColor)?;
        if phrases.is_empty() {
            execute!(stdout, Print("  (none yet)\n"))?;
        }
        for phrase in phrases {
            execute!(stdout, Print(format!("  {}\n", phrase)))?;
        }
        Ok(())
    }
}

impl Default for TerminalDisplay {
    fn default() -> Self {
        Self::new()
    }
}

/// Human distance: meters up to 2 km, kilometers beyond.
pub fn format_distance(meters: f64) -> String {
    if meters > 100_000.0 {
        format!("{:.0} km", meters / 1000.0)
    } else if meters < 2000.0 {
        format!("{:.0} m", meters)
    } else {
        format!("{:.2} km", meters / 1000.0)
    }
}

fn direction_word(direction: TurnDirection) -> &'static str {
    match direction {
        TurnDirection::Left => "left",
        TurnDirection::Right => "right",
    }
}

fn hint_phrase(hint: SteeringHint) -> &'static str {
    match hint {
        SteeringHint::StraightAhead => "Keep straight ahead.",
        SteeringHint::SlightLeft => "Keep slightly left.",
        SteeringHint::KeepLeft => "Keep left.",
        SteeringHint::TurnAround => "Turn around.",
        SteeringHint::KeepRight => "Keep right.",
        SteeringHint::SlightRight => "Keep slightly right.",
    }
}

fn sector_name(sector: CompassSector) -> &'static str {
    match sector {
        CompassSector::North => "north",
        CompassSector::NorthEast => "north-east",
        CompassSector::East => "east",
        CompassSector::SouthEast => "south-east",
        CompassSector::South => "south",
        CompassSector::SouthWest => "south-west",
        CompassSector::West => "west",
        CompassSector::NorthWest => "north-west",
    }
}

/// Render one alert event as an announcement.
pub fn phrase(event: &AlertEvent) -> String {
    match event {
        AlertEvent::Approach {
            distance_m,
            direction,
            following,
        } => {
            let mut text = format!(
                "Turn {} in {:.0} meters.",
                direction_word(*direction),
                distance_m
            );
            if let Some(next) = following {
                text.push_str(&format!(
                    " Then {} after {:.0} meters.",
                    direction_word(next.direction),
                    next.distance_m
                ));
            }
            text
        }
        AlertEvent::Arrival => "You have arrived at your destination.".to_string(),
        AlertEvent::OffCourse { hint } => hint_phrase(*hint).to_string(),
        AlertEvent::Status {
            fix_valid,
            distance_m,
            compass,
            hint,
        } => {
            let mut parts: Vec<String> = Vec::new();
            if !fix_valid {
                parts.push("No valid GPS signal.".to_string());
            }
            if let Some(distance) = distance_m {
                parts.push(format!("{} remaining.", format_distance(*distance)));
            }
            if let Some(sector) = compass {
                parts.push(format!("The target is to the {}.", sector_name(*sector)));
            }
            if let Some(hint) = hint {
                parts.push(hint_phrase(*hint).to_string());
            }
            if parts.is_empty() {
                parts.push("Navigation is idle.".to_string());
            }
            parts.join(" ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nav::alert::FollowingTurn;

    #[test]
    fn distance_formatting_bands() {
        assert_eq!(format_distance(35.0), "35 m");
        assert_eq!(format_distance(1999.0), "1999 m");
        assert_eq!(format_distance(2500.0), "2.50 km");
        assert_eq!(format_distance(150_000.0), "150 km");
    }

    #[test]
    fn approach_phrase_includes_following_turn() {
        let event = AlertEvent::Approach {
            distance_m: 90.0,
            direction: TurnDirection::Right,
            following: Some(FollowingTurn {
                distance_m: 50.0,
                direction: TurnDirection::Left,
            }),
        };
        assert_eq!(
            phrase(&event),
            "Turn right in 90 meters. Then left after 50 meters."
        );
    }

    #[test]
    fn status_phrase_composes_parts() {
        let event = AlertEvent::Status {
            fix_valid: true,
            distance_m: Some(1250.0),
            compass: Some(CompassSector::NorthEast),
            hint: Some(SteeringHint::SlightRight),
        };
        assert_eq!(
            phrase(&event),
            "1250 m remaining. The target is to the north-east. Keep slightly right."
        );
    }

    #[test]
    fn invalid_fix_status_mentions_signal() {
        let event = AlertEvent::Status {
            fix_valid: false,
            distance_m: None,
            compass: None,
            hint: None,
        };
        assert_eq!(phrase(&event), "No valid GPS signal.");
    }
}
