// src/gps/mod.rs
//! GPS data handling and NMEA parsing

pub mod data;
pub mod sentence;
pub mod source;

pub use data::{Fix, Motion, ParsedSentence, Satellites};
pub use source::GpsSource;
