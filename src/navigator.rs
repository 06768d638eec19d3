// src/navigator.rs
/// Main navigator coordination: ingest loop and alert scheduler

use crate::{
    config::NavSettings,
    error::{NavError, Result},
    gps::sentence,
    gps::source::GpsSource,
    nav::alert::{AlertEvent, AlertScheduler},
    nav::geo::{Geodesy, Haversine},
    nav::route::Route,
    nav::state::NavigationState,
    track::TrackLogger,
};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, RwLock,
    },
    time::{Duration, Instant},
};
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc::UnboundedSender;

/// Owns the shared navigation state and the two loops working on it.
///
/// The ingest loop parses sentences fully outside the lock, then applies
/// and recomputes inside one critical section; the scheduler ticks under
/// the same lock. Either loop therefore always sees complete cycles.
pub struct Navigator {
    state: Arc<RwLock<NavigationState>>,
    settings: NavSettings,
    geo: Arc<dyn Geodesy + Send + Sync>,
    running: Arc<AtomicBool>,
}

impl Navigator {
    pub fn new(route: Route, settings: NavSettings) -> Self {
        Self {
            state: Arc::new(RwLock::new(NavigationState::new(route))),
            settings,
            geo: Arc::new(Haversine),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn with_geodesy(mut self, geo: Arc<dyn Geodesy + Send + Sync>) -> Self {
        self.geo = geo;
        self
    }

    pub fn state(&self) -> Arc<RwLock<NavigationState>> {
        Arc::clone(&self.state)
    }

    pub fn running(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Connect the source and spawn the ingest loop.
    pub async fn start(&self, source: GpsSource, mut track: Option<TrackLogger>) -> Result<()> {
        println!("Connecting to GPS source ({})...", source.describe());
        let mut reader = source.connect().await?;
        println!("Connected successfully!");

        let state = Arc::clone(&self.state);
        let running = Arc::clone(&self.running);
        let settings = self.settings.clone();
        let geo = Arc::clone(&self.geo);

        tokio::spawn(async move {
            let mut line = String::new();

            while running.load(Ordering::Relaxed) {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => break, // EOF
                    Ok(_) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        ingest_line(&state, &settings, geo.as_ref(), &line);
                        if let Some(logger) = track.as_mut() {
                            let position = state.read().unwrap().avg_position;
                            if let Some((lat, lon)) = position {
                                if let Err(e) = logger.maybe_log(lat, lon) {
                                    eprintln!("Track log write failed: {}", e);
                                }
                            }
                        }
                    }
                    Err(e) => {
                        eprintln!("Error reading from GPS source: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(())
    }

    /// Spawn the 1 Hz alert scheduler; events go to the output collaborator.
    pub fn start_alerts(&self, tx: UnboundedSender<AlertEvent>) {
        let state = Arc::clone(&self.state);
        let running = Arc::clone(&self.running);
        let geo = Arc::clone(&self.geo);
        let scheduler = AlertScheduler::new(self.settings.clone());

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            while running.load(Ordering::Relaxed) {
                interval.tick().await;
                let event = {
                    let mut guard = state.write().unwrap();
                    scheduler.tick(&mut guard, geo.as_ref(), Instant::now())
                };
                if let Some(event) = event {
                    if tx.send(event).is_err() {
                        break;
                    }
                }
            }
        });
    }

    /// Push a single raw line through validation, parsing and state update.
    pub fn feed_line(&self, line: &str) {
        ingest_line(&self.state, &self.settings, self.geo.as_ref(), line);
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Get a clone of the current navigation state.
    pub fn snapshot(&self) -> NavigationState {
        self.state.read().unwrap().clone()
    }
}

/// Validate, parse and commit one line. Rejections are absorbed here: they
/// bump a counter and never abort the stream.
fn ingest_line(
    state: &RwLock<NavigationState>,
    settings: &NavSettings,
    geo: &dyn Geodesy,
    line: &str,
) {
    match sentence::parse_line(line.trim()) {
        Ok(Some(parsed)) => {
            let mut guard = state.write().unwrap();
            guard.stats.accepted += 1;
            guard.apply(parsed, settings, geo);
        }
        Ok(None) => {
            state.write().unwrap().stats.ignored += 1;
        }
        Err(e) if e.is_sentence_error() => {
            {
                let mut guard = state.write().unwrap();
                match &e {
                    NavError::MalformedSentence(_) => guard.stats.malformed += 1,
                    NavError::ChecksumMismatch { .. } => guard.stats.checksum_failures += 1,
                    _ => guard.stats.field_errors += 1,
                }
            }
            eprintln!("Dropped sentence: {}", e);
        }
        Err(e) => eprintln!("GPS stream error: {}", e),
    }
}
