//! Conversions between degrees and the firmware's sexagesimal text.
//!
//! Angles are `sDD°MM` or `sDD°MM:SS`, right ascension is `HH:MM.T` or
//! `HH:MM:SS`. The degree glyph is the LX200 character 0xDF, kept here as the
//! Latin-1 `char` [`DEGREE`] so it frames to the same byte.

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

pub const DEGREE: char = '\u{df}';

#[derive(Error, Debug, PartialEq)]
pub enum CoordError {
    #[error("invalid coordinate '{0}'")]
    BadCoordinate(String),
}

/// Reads base-60 text with any separators: `"-27°55:54"` is -27.93166…
///
/// Fields may carry a decimal fraction, so `"12:34.5"` is 12.575.
pub fn parse_sexagesimal(text: &str) -> Result<f64, CoordError> {
    lazy_static! {
        static ref SEPARATOR: Regex = Regex::new(r"[^0-9.+-]+").unwrap();
    }

    let text = text.trim();
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };

    let mut total = 0.0;
    let mut scale = 1.0;
    for part in SEPARATOR.split(body).filter(|part| !part.is_empty()) {
        let value: f64 = part
            .parse()
            .map_err(|_| CoordError::BadCoordinate(text.to_string()))?;
        total += value / scale;
        scale *= 60.0;
    }

    if scale == 1.0 {
        return Err(CoordError::BadCoordinate(text.to_string()));
    }
    Ok(if negative { -total } else { total })
}

/// Right ascension text (hours) to degrees.
pub fn parse_right_ascension(text: &str) -> Result<f64, CoordError> {
    parse_sexagesimal(text).map(|hours| hours * 15.0)
}

fn split_sign(angle: f64) -> (char, f64) {
    if angle < 0.0 {
        ('-', -angle)
    } else {
        ('+', angle)
    }
}

/// `sDD°MM`, rounded to the minute.
pub fn format_angle_short(angle: f64) -> String {
    let (sign, magnitude) = split_sign(angle);
    let minutes = (magnitude * 60.0).round() as u64;
    format!("{}{:02}{}{:02}", sign, minutes / 60, DEGREE, minutes % 60)
}

/// `sDD°MM:SS`, rounded to the second.
pub fn format_angle_long(angle: f64) -> String {
    let (sign, magnitude) = split_sign(angle);
    let seconds = (magnitude * 3600.0).round() as u64;
    format!(
        "{}{:02}{}{:02}:{:02}",
        sign,
        seconds / 3600,
        DEGREE,
        (seconds / 60) % 60,
        seconds % 60
    )
}

/// `DDD°MM` over [0, 360), as site longitudes are sent.
pub fn format_longitude(angle: f64) -> String {
    let minutes = (angle.rem_euclid(360.0) * 60.0).round() as u64 % (360 * 60);
    format!("{:03}{}{:02}", minutes / 60, DEGREE, minutes % 60)
}

/// `HH:MM.T` from degrees, minutes to one decimal.
pub fn format_right_ascension(angle: f64) -> String {
    let hours = angle.rem_euclid(360.0) / 15.0;
    let tenths = (hours * 600.0).round() as u64 % (24 * 600);
    format!(
        "{:02}:{:02}.{}",
        tenths / 600,
        (tenths % 600) / 10,
        tenths % 10
    )
}

/// `HH:MM:SS` from degrees.
pub fn format_right_ascension_long(angle: f64) -> String {
    let hours = angle.rem_euclid(360.0) / 15.0;
    let seconds = (hours * 3600.0).round() as u64 % (24 * 3600);
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds / 60) % 60,
        seconds % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, tolerance: f64) {
        assert!((a - b).abs() <= tolerance, "{} vs {}", a, b);
    }

    #[test]
    fn parse_any_separator() {
        assert_close(parse_sexagesimal("+45*30").unwrap(), 45.5, 1e-12);
        assert_close(parse_sexagesimal("45\u{df}30:36").unwrap(), 45.51, 1e-12);
        assert_close(parse_sexagesimal("-27\u{df}55:54").unwrap(), -27.931666, 1e-6);
        assert_close(parse_sexagesimal("117 15' 19\"").unwrap(), 117.255277, 1e-6);
        assert_close(parse_sexagesimal("12:34.5").unwrap(), 12.575, 1e-12);
        assert_close(parse_sexagesimal("08:15:00#").unwrap(), 8.25, 1e-12);
    }

    #[test]
    fn parse_rejects_garbage() {
        for text in ["", "-", "::", "12:3-4", "1.2.3"] {
            assert!(parse_sexagesimal(text).is_err(), "{:?}", text);
        }
    }

    #[test]
    fn short_angle() {
        assert_eq!(format_angle_short(-27.9319), "-27\u{df}56");
        assert_eq!(format_angle_short(45.5), "+45\u{df}30");
        assert_eq!(format_angle_short(9.999), "+10\u{df}00");
    }

    #[test]
    fn long_angle() {
        assert_eq!(format_angle_long(-27.9319), "-27\u{df}55:55");
        assert_eq!(format_angle_long(0.0), "+00\u{df}00:00");
        assert_eq!(format_angle_long(89.99999), "+90\u{df}00:00");
    }

    #[test]
    fn long_angle_round_trip() {
        let angle = -27.9319;
        assert_close(parse_sexagesimal(&format_angle_long(angle)).unwrap(), angle, 1e-4);

        let mut angle = -90.0;
        while angle <= 90.0 {
            let back = parse_sexagesimal(&format_angle_long(angle)).unwrap();
            assert_close(back, angle, 0.5 / 3600.0 + 1e-9);
            angle += 0.3771;
        }
    }

    #[test]
    fn right_ascension() {
        assert_eq!(format_right_ascension(0.0), "00:00.0");
        assert_eq!(format_right_ascension(188.625), "12:34.5");
        assert_eq!(format_right_ascension(359.9999), "00:00.0");
        assert_eq!(format_right_ascension(-15.0), "23:00.0");
        assert_eq!(format_right_ascension_long(188.625), "12:34:30");
    }

    #[test]
    fn right_ascension_round_trip() {
        let mut angle = 0.0;
        while angle < 360.0 {
            let back = parse_right_ascension(&format_right_ascension(angle)).unwrap();
            let error = (back - angle).abs();
            let error = error.min(360.0 - error);
            assert!(error <= 0.0125 + 1e-9, "{} -> {}", angle, back);

            let back = parse_right_ascension(&format_right_ascension_long(angle)).unwrap();
            let error = (back - angle).abs();
            let error = error.min(360.0 - error);
            assert!(error <= 7.5 / 3600.0 + 1e-9, "{} -> {}", angle, back);

            angle += 0.731;
        }
    }

    #[test]
    fn longitude() {
        assert_eq!(format_longitude(117.2553), "117\u{df}15");
        assert_eq!(format_longitude(-122.5), "237\u{df}30");
        assert_eq!(format_longitude(359.999), "000\u{df}00");
    }
}
