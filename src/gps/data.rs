// src/gps/data.rs
//! GPS data structures: fix, motion and satellite constellation state

use chrono::NaiveTime;

/// Which sentence kind produced the current fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixKind {
    Gga,
    Gll,
    Rmc,
}

/// A single resolved position sample.
///
/// `valid == false` means the receiver reported the solution as unusable;
/// such a fix must never feed distance/bearing computations.
#[derive(Debug, Clone, PartialEq)]
pub struct Fix {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>, // meters
    pub time: Option<NaiveTime>,
    pub valid: bool,
    pub kind: FixKind,
}

/// Current motion as reported by VTG sentences.
///
/// A missing heading is a distinct state from heading 0 (due north), hence
/// the options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Motion {
    pub speed_mps: Option<f64>,
    pub speed_kmh: Option<f64>,
    pub speed_mph: Option<f64>,
    pub true_heading: Option<f64>,
    pub mag_heading: Option<f64>,
}

/// One satellite from a GSV burst.
#[derive(Debug, Clone, PartialEq)]
pub struct SatelliteInfo {
    pub id: u16,
    pub elevation: Option<f64>, // degrees above horizon
    pub azimuth: Option<f64>,   // degrees
    pub snr: Option<f64>,       // dB
}

/// Satellite visibility and usage, plus dilution-of-precision figures.
///
/// GSV bursts arrive as several sentences; satellites accumulate in
/// `building` and are committed to `in_view` only once the sentence
/// carrying the declared total arrives. A torn burst therefore never
/// replaces a previously complete view.
#[derive(Debug, Clone, Default)]
pub struct Satellites {
    pub in_view: Vec<SatelliteInfo>,
    building: Vec<SatelliteInfo>,
    pub in_use: Vec<u16>,
    pub pdop: Option<f64>,
    pub hdop: Option<f64>,
    pub vdop: Option<f64>,
}

impl Satellites {
    /// Fold one GSV sentence into the accumulating view.
    pub fn apply_view(&mut self, update: SatellitesInView) {
        if update.sequence == 1 {
            self.building.clear();
        }
        for sat in update.satellites {
            if let Some(existing) = self.building.iter_mut().find(|s| s.id == sat.id) {
                *existing = sat;
            } else {
                self.building.push(sat);
            }
        }
        if update.sequence == update.total {
            self.in_view = std::mem::take(&mut self.building);
            self.in_view.sort_by_key(|s| s.id);
        }
    }

    /// Replace the in-use set and DOP figures from a GSA sentence.
    pub fn apply_usage(&mut self, update: SatellitesInUse) {
        self.in_use = update.ids;
        self.in_use.sort_unstable();
        self.pdop = update.pdop;
        self.hdop = update.hdop;
        self.vdop = update.vdop;
    }
}

/// Decoded position sentence (GGA/GLL/RMC).
///
/// `validity: None` means the sentence carries no validity flag of its own
/// (RMC); the previous GGA/GLL verdict is carried over on apply.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionUpdate {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
    pub time: Option<NaiveTime>,
    pub validity: Option<bool>,
    pub kind: FixKind,
}

/// Decoded GSV sentence: one slice of an in-view burst.
#[derive(Debug, Clone, PartialEq)]
pub struct SatellitesInView {
    pub total: u32,
    pub sequence: u32,
    pub satellites: Vec<SatelliteInfo>,
}

/// Decoded GSA sentence.
#[derive(Debug, Clone, PartialEq)]
pub struct SatellitesInUse {
    pub ids: Vec<u16>,
    pub pdop: Option<f64>,
    pub hdop: Option<f64>,
    pub vdop: Option<f64>,
}

/// One fully decoded sentence, ready to be committed in a single step.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedSentence {
    Position(PositionUpdate),
    View(SatellitesInView),
    Usage(SatellitesInUse),
    Motion(Motion),
}

/// Ingest counters, surfaced on the display instead of crashing the stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestStats {
    pub accepted: u64,
    pub ignored: u64,
    pub malformed: u64,
    pub checksum_failures: u64,
    pub field_errors: u64,
}

impl IngestStats {
    pub fn rejected(&self) -> u64 {
        self.malformed + self.checksum_failures + self.field_errors
    }
}
