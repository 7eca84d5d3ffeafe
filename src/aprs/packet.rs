//! APRS packet encoding.
//!
//! Two report formats are produced:
//!
//! ```text
//! CALLSIGN>PATH:=DDMM.mmN/DDDMM.mmE>comment   (position, no timestamp, messaging capable)
//! CALLSIGN>PATH:>status text                  (status)
//! ```
//!
//! Coordinates use degrees and decimal minutes with two fractional digits, which
//! gives a resolution of roughly 18 metres.

/// Build an uncompressed position report.
///
/// `symbol` is the two-character table/code pair (e.g. `/>`). A symbol shorter than
/// two characters leaves the missing part empty; callers validate it beforehand.
pub fn build_position_packet(
    callsign: &str,
    lat: f64,
    lng: f64,
    comment: &str,
    symbol: &str,
    path: &str,
) -> String {
    let mut sym = symbol.chars();
    let table = sym.next().map(String::from).unwrap_or_default();
    let code = sym.next().map(String::from).unwrap_or_default();
    format!(
        "{}>{}:={}{}{}{}{}",
        callsign,
        path,
        format_latitude(lat),
        table,
        format_longitude(lng),
        code,
        comment
    )
}

/// Build a status report. The text is passed through untouched.
pub fn build_status_packet(callsign: &str, status: &str, path: &str) -> String {
    format!("{}>{}:>{}", callsign, path, status)
}

/// Encode a latitude as `DDMM.mm{N|S}`. Zero encodes as north.
pub fn format_latitude(lat: f64) -> String {
    let (deg, hundredths) = split_degrees(lat);
    let dir = if lat >= 0.0 { 'N' } else { 'S' };
    format!("{:02}{:02}.{:02}{}", deg, hundredths / 100, hundredths % 100, dir)
}

/// Encode a longitude as `DDDMM.mm{E|W}`. Zero encodes as east.
pub fn format_longitude(lng: f64) -> String {
    let (deg, hundredths) = split_degrees(lng);
    let dir = if lng >= 0.0 { 'E' } else { 'W' };
    format!("{:03}{:02}.{:02}{}", deg, hundredths / 100, hundredths % 100, dir)
}

/// Whole degrees and minutes in hundredths for |value|, carrying 60.00' into the degree.
fn split_degrees(value: f64) -> (u32, u32) {
    let abs = value.abs();
    let mut deg = abs.floor() as u32;
    let mut hundredths = round_hundredths((abs - abs.floor()) * 60.0);
    if hundredths >= 6000 {
        deg += 1;
        hundredths = 0;
    }
    (deg, hundredths)
}

/// Round `minutes` to the nearest hundredth, ties away from zero.
///
/// Decided on the exact binary value of `minutes`, not on `minutes * 100.0`, whose
/// own rounding can turn 0.01499.. into a tie at 1.5. `mul_add` evaluates
/// `minutes * 100 - k` with a single rounding, so its sign is exact.
fn round_hundredths(minutes: f64) -> u32 {
    let mut n = (minutes * 100.0).floor();
    if minutes.mul_add(100.0, -n) < 0.0 {
        n -= 1.0;
    } else if minutes.mul_add(100.0, -(n + 1.0)) >= 0.0 {
        n += 1.0;
    }
    if minutes.mul_add(100.0, -(n + 0.5)) >= 0.0 {
        n += 1.0;
    }
    n as u32
}

/// Decode `DDMM.mm{N|S}` back to signed decimal degrees.
pub fn parse_latitude(s: &str) -> Option<f64> {
    parse_coordinate(s, 2, 'N', 'S')
}

/// Decode `DDDMM.mm{E|W}` back to signed decimal degrees.
pub fn parse_longitude(s: &str) -> Option<f64> {
    parse_coordinate(s, 3, 'E', 'W')
}

fn parse_coordinate(s: &str, deg_width: usize, pos: char, neg: char) -> Option<f64> {
    if !s.is_ascii() || s.len() != deg_width + 6 {
        return None;
    }
    let (body, dir) = s.split_at(s.len() - 1);
    let sign = match dir.chars().next()? {
        c if c == pos => 1.0,
        c if c == neg => -1.0,
        _ => return None,
    };
    let (deg, min) = body.split_at(deg_width);
    if min.as_bytes()[2] != b'.' {
        return None;
    }
    let deg: u32 = deg.parse().ok()?;
    let min: f64 = min.parse().ok()?;
    if !(0.0..60.0).contains(&min) {
        return None;
    }
    Some(sign * (deg as f64 + min / 60.0))
}
