// src/track.rs
//! Periodic track log of the smoothed position

use crate::error::Result;
use chrono::{DateTime, Utc};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Appends `timestamp,lat,lon` CSV lines, at most one per interval.
pub struct TrackLogger {
    file: File,
    interval_secs: u64,
    last_logged: Option<DateTime<Utc>>,
}

impl TrackLogger {
    pub fn create(path: &Path, interval_secs: u64) -> Result<Self> {
        let new_file = !path.exists();
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        if new_file {
            writeln!(file, "time,latitude,longitude")?;
        }
        Ok(Self {
            file,
            interval_secs,
            last_logged: None,
        })
    }

    /// Log the position if the interval has elapsed since the last entry.
    pub fn maybe_log(&mut self, latitude: f64, longitude: f64) -> Result<bool> {
        let now = Utc::now();
        let due = self.last_logged.map_or(true, |last| {
            (now - last).num_seconds() >= self.interval_secs as i64
        });
        if !due {
            return Ok(false);
        }
        writeln!(
            self.file,
            "{},{:.6},{:.6}",
            now.format("%Y-%m-%dT%H:%M:%SZ"),
            latitude,
            longitude
        )?;
        self.last_logged = Some(now);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_point_is_logged_and_interval_suppresses_the_next() {
        let dir = std::env::temp_dir().join("gps-navigator-track-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("track.csv");
        let _ = std::fs::remove_file(&path);

        let mut logger = TrackLogger::create(&path, 60).unwrap();
        assert!(logger.maybe_log(52.0, 13.0).unwrap());
        assert!(!logger.maybe_log(52.1, 13.1).unwrap(), "inside the interval");

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("time,latitude,longitude"));
        assert!(contents.contains("52.000000,13.000000"));
        assert!(!contents.contains("52.100000"));

        let _ = std::fs::remove_file(&path);
    }
}
