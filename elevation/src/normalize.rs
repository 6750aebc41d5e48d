use serde_json::Value;

/// A validated latitude/longitude pair.
///
/// The canonical text form is fixed to 6 decimal places, so two coordinates
/// that round identically produce identical canonical strings (and therefore
/// identical cache keys downstream).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    /// Parse a raw `"lat,lon"` string. Whitespace around each field is
    /// allowed; standard float literals including sign and decimal point are
    /// accepted. Extra comma-separated fields beyond the first two are
    /// ignored. Non-finite values are rejected since their canonical form
    /// would be meaningless as a cache key.
    pub fn parse(raw: &str) -> Option<Coordinate> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }
        let mut fields = s.split(',');
        let lat: f64 = fields.next()?.trim().parse().ok()?;
        let lon: f64 = fields.next()?.trim().parse().ok()?;
        if !lat.is_finite() || !lon.is_finite() {
            return None;
        }
        Some(Coordinate { lat, lon })
    }

    /// Canonical `"lat,lon"` form, clamped to 6 decimals.
    pub fn canonical(&self) -> String {
        format!("{:.6},{:.6}", self.lat, self.lon)
    }
}

/// Normalize a raw `locations` array into validated coordinates.
///
/// Invalid entries are dropped, not rejected: non-strings, entries that are
/// empty after trimming, entries with fewer than two comma-separated fields,
/// and entries whose lat or lon is not a number. The output preserves the
/// order of surviving entries and no error is raised for dropped ones. This
/// leniency is a documented contract, and callers that need strict
/// validation must compare output length against input length.
pub fn normalize_locations(raw: &[Value]) -> Vec<Coordinate> {
    raw.iter()
        .filter_map(|item| item.as_str())
        .filter_map(Coordinate::parse)
        .collect()
}
