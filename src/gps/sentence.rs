// src/gps/sentence.rs
//! NMEA-0183 frame validation and sentence parsing
//!
//! The stream side of a serial or Bluetooth GPS is noisy: reads can start
//! mid-sentence, glue two sentences together, or deliver corrupted bytes.
//! `validate_frame` recovers the last complete frame from a line and checks
//! its checksum; `parse_sentence` decodes the field body into a typed
//! record. A sentence either decodes completely or is rejected whole.

use super::data::{
    FixKind, Motion, ParsedSentence, PositionUpdate, SatelliteInfo, SatellitesInUse,
    SatellitesInView,
};
use crate::error::{NavError, Result};
use chrono::NaiveTime;

const KM_PER_MILE: f64 = 1.609344;

/// A validated frame, split into talker, sentence type and field body.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSentence<'a> {
    pub talker: &'a str,
    pub kind: &'a str,
    pub body: &'a str,
}

/// Locate, prefix-check and checksum-validate one frame within a raw line.
///
/// Everything before the last `$` is discarded, which recovers the tail
/// sentence from fragmentary or concatenated reads. Any alphabetic talker
/// code is accepted, not just `GP`. Sentences without a trailing `*XX`
/// checksum are accepted as-is.
pub fn validate_frame(line: &str) -> Result<RawSentence<'_>> {
    let trimmed = line.trim();
    let start = trimmed
        .rfind('$')
        .ok_or_else(|| NavError::MalformedSentence(trimmed.to_string()))?;
    let mut data = &trimmed[start..];

    let bytes = data.as_bytes();
    if bytes.len() < 6 || !bytes[1..6].iter().all(|b| b.is_ascii_alphabetic()) {
        return Err(NavError::MalformedSentence(data.to_string()));
    }

    // Checksum follows `*` and is the XOR of everything between `$` and
    // `*`, exclusive, as two uppercase hex digits.
    if data.len() >= 9 && data.as_bytes()[data.len() - 3] == b'*' {
        let expected = checksum(&data[1..data.len() - 3]);
        let found = &data[data.len() - 2..];
        if expected != found {
            return Err(NavError::ChecksumMismatch {
                expected,
                found: found.to_string(),
            });
        }
        data = &data[..data.len() - 3];
    }

    let body = if data.len() == 6 {
        ""
    } else if data.as_bytes()[6] == b',' {
        &data[7..]
    } else {
        return Err(NavError::MalformedSentence(data.to_string()));
    };

    Ok(RawSentence {
        talker: &data[1..3],
        kind: &data[3..6],
        body,
    })
}

/// XOR checksum over the sentence payload, rendered as two hex digits.
pub fn checksum(payload: &str) -> String {
    let csum = payload.bytes().fold(0u8, |acc, b| acc ^ b);
    format!("{:02X}", csum)
}

/// Decode a validated frame into a typed record.
///
/// Unknown sentence types return `Ok(None)`: the protocol is extensible and
/// unsupported sentences are not an error. Field problems reject only this
/// sentence.
pub fn parse_sentence(raw: &RawSentence<'_>) -> Result<Option<ParsedSentence>> {
    let parts: Vec<&str> = raw.body.split(',').collect();
    match raw.kind {
        "GGA" => parse_gga(&parts).map(|p| Some(ParsedSentence::Position(p))),
        "GLL" => parse_gll(&parts).map(|p| Some(ParsedSentence::Position(p))),
        "RMC" => parse_rmc(&parts).map(|p| Some(ParsedSentence::Position(p))),
        "GSV" => parse_gsv(&parts).map(|v| Some(ParsedSentence::View(v))),
        "GSA" => parse_gsa(&parts).map(|u| Some(ParsedSentence::Usage(u))),
        "VTG" => parse_vtg(&parts).map(|m| Some(ParsedSentence::Motion(m))),
        _ => Ok(None),
    }
}

/// Validate and decode one raw line in a single step.
pub fn parse_line(line: &str) -> Result<Option<ParsedSentence>> {
    let raw = validate_frame(line)?;
    parse_sentence(&raw)
}

fn require_fields(parts: &[&str], n: usize, kind: &str) -> Result<()> {
    if parts.len() < n {
        Err(NavError::FieldParse(format!(
            "{}: expected at least {} fields, got {}",
            kind,
            n,
            parts.len()
        )))
    } else {
        Ok(())
    }
}

fn parse_f64_opt(value: &str, what: &str) -> Result<Option<f64>> {
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<f64>()
        .map(Some)
        .map_err(|_| NavError::FieldParse(format!("{}: {:?}", what, value)))
}

/// Convert an NMEA degrees-minutes field plus hemisphere letter into signed
/// decimal degrees.
///
/// The integer-degree prefix is 1, 2 or 3 digits wide depending on the
/// sentence; the width is detected from the decimal point, never assumed.
/// The result is fixed to 6 decimal places; `S` and `W` negate.
pub fn parse_coordinate(value: &str, hemisphere: &str) -> Result<f64> {
    if value.is_empty() {
        return Err(NavError::FieldParse("empty coordinate".to_string()));
    }
    let dot = value.find('.').unwrap_or(value.len());
    if dot < 3 {
        return Err(NavError::FieldParse(format!("coordinate too short: {:?}", value)));
    }
    let deg_width = dot - 2;
    let degrees: f64 = value[..deg_width]
        .parse()
        .map_err(|_| NavError::FieldParse(format!("coordinate degrees: {:?}", value)))?;
    let minutes: f64 = value[deg_width..]
        .parse()
        .map_err(|_| NavError::FieldParse(format!("coordinate minutes: {:?}", value)))?;

    let decimal = degrees + minutes / 60.0;
    let decimal = (decimal * 1e6).round() / 1e6;

    match hemisphere {
        "N" | "E" => Ok(decimal),
        "S" | "W" => Ok(-decimal),
        other => Err(NavError::FieldParse(format!("hemisphere: {:?}", other))),
    }
}

/// Best-effort `hhmmss[.sss]` decode; a bad time is absence, not rejection.
fn parse_utc_time(value: &str) -> Option<NaiveTime> {
    if value.len() < 6 {
        return None;
    }
    let hh: u32 = value[0..2].parse().ok()?;
    let mm: u32 = value[2..4].parse().ok()?;
    let secs: f64 = value[4..].parse().ok()?;
    let whole = secs as u32;
    let milli = ((secs - whole as f64) * 1000.0).round() as u32;
    NaiveTime::from_hms_milli_opt(hh, mm, whole, milli)
}

/// GGA: fix data. Field 5 is the fix quality; `0` means no usable fix.
fn parse_gga(parts: &[&str]) -> Result<PositionUpdate> {
    require_fields(parts, 10, "GGA")?;
    Ok(PositionUpdate {
        latitude: parse_coordinate(parts[1], parts[2])?,
        longitude: parse_coordinate(parts[3], parts[4])?,
        altitude: parse_f64_opt(parts[8], "GGA altitude")?,
        time: parse_utc_time(parts[0]),
        validity: Some(parts[5] != "0"),
        kind: FixKind::Gga,
    })
}

/// GLL: geographic position. `A` = valid, `V` = void; anything else leaves
/// the previous verdict untouched.
fn parse_gll(parts: &[&str]) -> Result<PositionUpdate> {
    require_fields(parts, 6, "GLL")?;
    let validity = match parts[5] {
        "A" => Some(true),
        "V" => Some(false),
        _ => None,
    };
    Ok(PositionUpdate {
        latitude: parse_coordinate(parts[0], parts[1])?,
        longitude: parse_coordinate(parts[2], parts[3])?,
        altitude: None,
        time: parse_utc_time(parts[4]),
        validity,
        kind: FixKind::Gll,
    })
}

/// RMC: recommended minimum. Validity is carried over from the last
/// GGA/GLL, so none is reported here.
fn parse_rmc(parts: &[&str]) -> Result<PositionUpdate> {
    require_fields(parts, 6, "RMC")?;
    Ok(PositionUpdate {
        latitude: parse_coordinate(parts[2], parts[3])?,
        longitude: parse_coordinate(parts[4], parts[5])?,
        altitude: None,
        time: parse_utc_time(parts[0]),
        validity: None,
        kind: FixKind::Rmc,
    })
}

/// GSV: satellites in view, up to 4 per sentence.
fn parse_gsv(parts: &[&str]) -> Result<SatellitesInView> {
    require_fields(parts, 3, "GSV")?;
    let total: u32 = parts[0]
        .parse()
        .map_err(|_| NavError::FieldParse(format!("GSV total: {:?}", parts[0])))?;
    let sequence: u32 = parts[1]
        .parse()
        .map_err(|_| NavError::FieldParse(format!("GSV sequence: {:?}", parts[1])))?;

    let mut satellites = Vec::new();
    for chunk in parts[3..].chunks(4) {
        if chunk.len() < 4 || chunk[0].is_empty() {
            break;
        }
        let id: u16 = chunk[0]
            .parse()
            .map_err(|_| NavError::FieldParse(format!("GSV satellite id: {:?}", chunk[0])))?;
        satellites.push(SatelliteInfo {
            id,
            elevation: parse_f64_opt(chunk[1], "GSV elevation")?,
            azimuth: parse_f64_opt(chunk[2], "GSV azimuth")?,
            snr: parse_f64_opt(chunk[3], "GSV snr")?,
        });
    }

    Ok(SatellitesInView {
        total,
        sequence,
        satellites,
    })
}

/// GSA: satellites used in the solution (12 PRN slots) plus DOPs.
fn parse_gsa(parts: &[&str]) -> Result<SatellitesInUse> {
    require_fields(parts, 17, "GSA")?;
    let mut slots: Vec<&str> = parts[2..14].to_vec();
    while slots.last().is_some_and(|s| s.is_empty()) {
        slots.pop();
    }
    let mut ids = Vec::new();
    for slot in slots {
        if slot.is_empty() {
            continue;
        }
        let id: u16 = slot
            .parse()
            .map_err(|_| NavError::FieldParse(format!("GSA satellite id: {:?}", slot)))?;
        ids.push(id);
    }
    Ok(SatellitesInUse {
        ids,
        pdop: parse_f64_opt(parts[14], "GSA pdop")?,
        hdop: parse_f64_opt(parts[15], "GSA hdop")?,
        vdop: parse_f64_opt(parts[16], "GSA vdop")?,
    })
}

/// VTG: course and ground speed. The magnetic heading is recorded only when
/// present and non-zero.
fn parse_vtg(parts: &[&str]) -> Result<Motion> {
    require_fields(parts, 7, "VTG")?;
    let kmh = parse_f64_opt(parts[6], "VTG speed")?.unwrap_or(0.0);
    let mag = parse_f64_opt(parts[2], "VTG magnetic heading")?.filter(|&v| v > 0.0);
    Ok(Motion {
        speed_mps: Some(kmh / 3.6),
        speed_kmh: Some(kmh),
        speed_mph: Some(kmh / KM_PER_MILE),
        true_heading: parse_f64_opt(parts[0], "VTG true heading")?,
        mag_heading: mag,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const GGA: &str = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";
    const RMC: &str = "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A";
    const GSV: &str = "$GPGSV,3,1,12,01,40,083,46,02,17,308,41,12,07,344,39,14,22,228,45*7F";
    const GSA: &str = "$GPGSA,A,3,04,05,,09,12,,,24,,,,,2.5,1.3,2.1*39";
    const VTG: &str = "$GPVTG,054.7,T,034.4,M,005.5,N,010.2,K*48";

    fn position(line: &str) -> PositionUpdate {
        match parse_line(line).unwrap().unwrap() {
            ParsedSentence::Position(p) => p,
            other => panic!("expected position, got {:?}", other),
        }
    }

    #[test]
    fn frame_strips_prefix_and_checksum() {
        let raw = validate_frame(GGA).unwrap();
        assert_eq!(raw.talker, "GP");
        assert_eq!(raw.kind, "GGA");
        assert!(raw.body.starts_with("123519,4807.038,N"));
        assert!(!raw.body.contains('*'));
    }

    #[test]
    fn frame_recovers_from_leading_noise() {
        let line = format!("31.000,E,1,08\r\n{}", GGA);
        let raw = validate_frame(&line).unwrap();
        assert_eq!(raw.kind, "GGA");
    }

    #[test]
    fn frame_keeps_last_of_concatenated_sentences() {
        let line = "$GPGGA,123519,4807.$GPGLL,4916.45,N,12311.12,W,225444,A";
        let raw = validate_frame(line).unwrap();
        assert_eq!(raw.kind, "GLL");
    }

    #[test]
    fn frame_rejects_missing_dollar() {
        assert!(matches!(
            validate_frame("GPGGA,123519,4807.038,N"),
            Err(NavError::MalformedSentence(_))
        ));
    }

    #[test]
    fn frame_rejects_broken_prefix() {
        assert!(matches!(
            validate_frame("$G1GGA,123519"),
            Err(NavError::MalformedSentence(_))
        ));
    }

    #[test]
    fn frame_accepts_any_talker() {
        let raw = validate_frame("$GNGLL,4916.45,N,12311.12,W,225444,A").unwrap();
        assert_eq!(raw.talker, "GN");
    }

    #[test]
    fn frame_rejects_flipped_checksum() {
        // Single corrupted byte in the body: checksum no longer matches.
        let corrupted = GGA.replace("4807.038", "4807.039");
        match validate_frame(&corrupted) {
            Err(NavError::ChecksumMismatch { found, .. }) => assert_eq!(found, "47"),
            other => panic!("expected checksum mismatch, got {:?}", other),
        }
    }

    #[test]
    fn frame_accepts_sentence_without_checksum() {
        let raw = validate_frame("$GPGLL,4916.45,N,12311.12,W,225444,A").unwrap();
        assert_eq!(raw.kind, "GLL");
    }

    #[test]
    fn coordinate_two_digit_degrees() {
        let lat = parse_coordinate("4807.038", "N").unwrap();
        assert!((lat - 48.1173).abs() < 1e-5, "got {}", lat);
    }

    #[test]
    fn coordinate_three_digit_degrees() {
        let lon = parse_coordinate("01131.000", "E").unwrap();
        assert!((lon - 11.516667).abs() < 1e-5, "got {}", lon);
    }

    #[test]
    fn coordinate_one_digit_degrees() {
        let lat = parse_coordinate("934.500", "N").unwrap();
        assert!((lat - 9.575).abs() < 1e-5, "got {}", lat);
    }

    #[test]
    fn coordinate_southern_and_western_are_negative() {
        assert!(parse_coordinate("4807.038", "S").unwrap() < 0.0);
        assert!(parse_coordinate("01131.000", "W").unwrap() < 0.0);
    }

    #[test]
    fn gga_full_decode() {
        let p = position(GGA);
        assert!((p.latitude - 48.1173).abs() < 1e-5);
        assert!((p.longitude - 11.516667).abs() < 1e-5);
        assert_eq!(p.altitude, Some(545.4));
        assert!(p.validity.unwrap());
        assert_eq!(p.kind, FixKind::Gga);
        assert_eq!(p.time, NaiveTime::from_hms_opt(12, 35, 19));
    }

    #[test]
    fn gga_quality_zero_is_invalid() {
        let p = position("$GPGGA,123519,4807.038,N,01131.000,E,0,03,0.9,545.4,M,46.9,M,,");
        assert_eq!(p.validity, Some(false));
    }

    #[test]
    fn gll_validity_flags() {
        let valid = position("$GPGLL,4916.45,N,12311.12,W,225444,A");
        assert_eq!(valid.validity, Some(true));
        assert!((valid.latitude - 49.274167).abs() < 1e-5);
        assert!((valid.longitude + 123.185333).abs() < 1e-5);

        let void = position("$GPGLL,4916.45,N,12311.12,W,225444,V");
        assert_eq!(void.validity, Some(false));
    }

    #[test]
    fn rmc_carries_no_validity() {
        let p = position(RMC);
        assert_eq!(p.validity, None);
        assert!((p.latitude - 48.1173).abs() < 1e-5);
        assert_eq!(p.kind, FixKind::Rmc);
    }

    #[test]
    fn gsv_decodes_four_satellites() {
        let v = match parse_line(GSV).unwrap().unwrap() {
            ParsedSentence::View(v) => v,
            other => panic!("expected view, got {:?}", other),
        };
        assert_eq!(v.total, 3);
        assert_eq!(v.sequence, 1);
        assert_eq!(v.satellites.len(), 4);
        assert_eq!(v.satellites[0].id, 1);
        assert_eq!(v.satellites[0].elevation, Some(40.0));
        assert_eq!(v.satellites[0].azimuth, Some(83.0));
        assert_eq!(v.satellites[0].snr, Some(46.0));
    }

    #[test]
    fn gsa_trims_empty_slots() {
        let u = match parse_line(GSA).unwrap().unwrap() {
            ParsedSentence::Usage(u) => u,
            other => panic!("expected usage, got {:?}", other),
        };
        assert_eq!(u.ids, vec![4, 5, 9, 12, 24]);
        assert_eq!(u.pdop, Some(2.5));
        assert_eq!(u.hdop, Some(1.3));
        assert_eq!(u.vdop, Some(2.1));
    }

    #[test]
    fn vtg_speed_conversions() {
        let m = match parse_line(VTG).unwrap().unwrap() {
            ParsedSentence::Motion(m) => m,
            other => panic!("expected motion, got {:?}", other),
        };
        assert_eq!(m.speed_kmh, Some(10.2));
        assert!((m.speed_mph.unwrap() - 10.2 / 1.609344).abs() < 1e-9);
        assert!((m.speed_mps.unwrap() - 10.2 / 3.6).abs() < 1e-9);
        assert_eq!(m.true_heading, Some(54.7));
        assert_eq!(m.mag_heading, Some(34.4));
    }

    #[test]
    fn vtg_empty_magnetic_heading_is_absent() {
        let m = match parse_line("$GPVTG,054.7,T,,M,005.5,N,010.2,K").unwrap().unwrap() {
            ParsedSentence::Motion(m) => m,
            other => panic!("expected motion, got {:?}", other),
        };
        assert_eq!(m.mag_heading, None);
        assert_eq!(m.true_heading, Some(54.7));
    }

    #[test]
    fn unknown_sentence_type_is_ignored() {
        assert_eq!(parse_line("$GPZDA,160012.71,11,03,2004,-1,00").unwrap(), None);
    }

    #[test]
    fn short_sentence_is_a_field_error() {
        assert!(matches!(
            parse_line("$GPGGA,123519,4807.038"),
            Err(NavError::FieldParse(_))
        ));
    }

    #[test]
    fn garbage_numeric_field_is_a_field_error() {
        assert!(matches!(
            parse_line("$GPGSA,A,3,xx,05,,09,12,,,24,,,,,2.5,1.3,2.1"),
            Err(NavError::FieldParse(_))
        ));
    }
}
