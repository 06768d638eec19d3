// src/route_store.rs
//! Route import and export: GPX, CSV and JSON
//!
//! A route file is an ordered list of `(name, lat, lon)`; loading replaces
//! the whole list, saving writes the whole list. Track points without names
//! get generated ones.

use crate::error::{NavError, Result};
use crate::nav::route::Waypoint;
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RouteFormat {
    Gpx,
    Csv,
    Json,
}

impl RouteFormat {
    pub fn extension(&self) -> &str {
        match self {
            RouteFormat::Gpx => "gpx",
            RouteFormat::Csv => "csv",
            RouteFormat::Json => "json",
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("gpx") => Ok(RouteFormat::Gpx),
            Some("csv") => Ok(RouteFormat::Csv),
            Some("json") => Ok(RouteFormat::Json),
            other => Err(NavError::Other(format!(
                "Unsupported route file extension: {:?}",
                other
            ))),
        }
    }
}

/// Load an ordered waypoint list, detecting the format from the extension.
pub fn load_route(path: &Path) -> Result<Vec<Waypoint>> {
    let format = RouteFormat::from_path(path)?;
    let contents = std::fs::read_to_string(path)?;
    match format {
        RouteFormat::Gpx => Ok(parse_gpx(&contents)),
        RouteFormat::Csv => parse_csv(&contents),
        RouteFormat::Json => Ok(serde_json::from_str(&contents)?),
    }
}

/// Write the whole waypoint list in the format matching the extension.
pub fn save_route(path: &Path, waypoints: &[Waypoint]) -> Result<()> {
    let format = RouteFormat::from_path(path)?;
    let content = match format {
        RouteFormat::Gpx => to_gpx(waypoints),
        RouteFormat::Csv => to_csv(waypoints),
        RouteFormat::Json => serde_json::to_string_pretty(waypoints)?,
    };
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

/// Scan GPX text for `<trkpt>`/`<wpt>` points.
///
/// Deliberately not a full XML parser: track files from mapping tools keep
/// one point per element, and the lat/lon attributes are all we need. A
/// `<name>` element following a point names it; everything else gets a
/// generated `(Waypoint N)` name.
fn parse_gpx(contents: &str) -> Vec<Waypoint> {
    let mut waypoints: Vec<Waypoint> = Vec::new();
    let mut counter = 0;

    for line in contents.lines() {
        let line = line.trim();
        if line.starts_with("<trkpt") || line.starts_with("<wpt") || line.starts_with("<rtept") {
            let lat = xml_attribute(line, "lat").and_then(|v| v.parse::<f64>().ok());
            let lon = xml_attribute(line, "lon").and_then(|v| v.parse::<f64>().ok());
            if let (Some(lat), Some(lon)) = (lat, lon) {
                counter += 1;
                waypoints.push(Waypoint::new(format!("(Waypoint {})", counter), lat, lon));
            }
        } else if let Some(name) = xml_element_text(line, "name") {
            if let Some(last) = waypoints.last_mut() {
                last.name = unescape_xml(name);
            }
        }
    }

    waypoints
}

fn xml_attribute<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let marker = format!("{}=\"", name);
    let start = line.find(&marker)? + marker.len();
    let end = line[start..].find('"')? + start;
    Some(&line[start..end])
}

fn xml_element_text<'a>(line: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = line.find(&open)? + open.len();
    let end = line.find(&close)?;
    (end >= start).then(|| &line[start..end])
}

fn parse_csv(contents: &str) -> Result<Vec<Waypoint>> {
    let mut waypoints = Vec::new();
    for (lineno, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || (lineno == 0 && line.starts_with("name")) {
            continue;
        }
        // Latitude and longitude are the last two fields; the name may
        // contain commas.
        let mut fields = line.rsplitn(3, ',');
        let lon = fields.next().unwrap_or("");
        let lat = fields.next().unwrap_or("");
        let name = fields.next().unwrap_or("").trim().trim_matches('"');
        let lat: f64 = lat.trim().parse().map_err(|_| {
            NavError::Other(format!("Bad latitude on route line {}", lineno + 1))
        })?;
        let lon: f64 = lon.trim().parse().map_err(|_| {
            NavError::Other(format!("Bad longitude on route line {}", lineno + 1))
        })?;
        waypoints.push(Waypoint::new(name.replace("\"\"", "\""), lat, lon));
    }
    Ok(waypoints)
}

fn to_gpx(waypoints: &[Waypoint]) -> String {
    let mut gpx = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="gps-navigator" xmlns="http://www.topografix.com/GPX/1/1">
"#,
    );
    for waypoint in waypoints {
        gpx.push_str(&format!(
            "  <wpt lat=\"{}\" lon=\"{}\">\n    <name>{}</name>\n  </wpt>\n",
            waypoint.latitude,
            waypoint.longitude,
            escape_xml(&waypoint.name)
        ));
    }
    gpx.push_str("</gpx>\n");
    gpx
}

fn to_csv(waypoints: &[Waypoint]) -> String {
    let mut csv = String::from("name,latitude,longitude\n");
    for waypoint in waypoints {
        csv.push_str(&format!(
            "{},{},{}\n",
            escape_csv(&waypoint.name),
            waypoint.latitude,
            waypoint.longitude
        ));
    }
    csv
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn unescape_xml(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
