// src/nav/mod.rs
//! Navigation: smoothing, geodesy, route model, state and alerts

pub mod alert;
pub mod filter;
pub mod geo;
pub mod route;
pub mod state;

pub use alert::{AlertEvent, AlertScheduler};
pub use filter::MovingAverage;
pub use geo::{Geodesy, Haversine};
pub use route::{Route, Waypoint};
pub use state::NavigationState;
