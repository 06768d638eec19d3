// src/lib.rs
//! GPS Navigator Library
//!
//! Ingests an NMEA-0183 sentence stream and maintains a navigation state:
//! current fix, motion, satellite visibility, and progress along an ordered
//! waypoint route with turn detection and alert scheduling.

pub mod config;
pub mod display;
pub mod error;
pub mod gps;
pub mod nav;
pub mod navigator;
pub mod route_store;
pub mod track;

// Re-export main types for convenience
pub use config::{NavConfig, NavSettings};
pub use error::{NavError, Result};
pub use gps::data::{Fix, Motion, ParsedSentence};
pub use gps::source::GpsSource;
pub use nav::alert::AlertEvent;
pub use nav::route::{Route, Waypoint};
pub use nav::state::NavigationState;
pub use navigator::Navigator;
