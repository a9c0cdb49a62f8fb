use serde::{Deserialize, Deserializer};

/// One row of an exported trips file. Columns not listed here are ignored.
#[derive(Deserialize, Debug, Clone)]
pub struct TripRow {
    pub bike_number: String,
    pub start_latitude: Option<f64>,
    pub start_longitude: Option<f64>,
    pub start_time: String,
    pub end_latitude: Option<f64>,
    pub end_longitude: Option<f64>,
    pub end_time: String,
    /// Seconds.
    pub duration: Option<f64>,
    pub distance: Option<f64>,
    /// List literal of `[lat, lon, timestamp]` triples, quoted either way.
    pub segments: Option<String>,
}

/// One row of an exported stations file. Columns not listed here are ignored.
#[derive(Deserialize, Debug, Clone)]
pub struct StationRow {
    pub minute: String,
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "python_bool")]
    pub spot: bool,
    pub station_number: Option<String>,
    pub terminal_type: Option<String>,
    pub bike_count: String,
}

/// Accepts `True`/`False` as written by pandas, plus the usual lowercase and numeric forms.
fn python_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    Ok(matches!(value.trim(), "True" | "true" | "TRUE" | "1"))
}

/// Parses a non-negative integer, tolerating a float rendering such as `3.0`.
pub(crate) fn parse_count(value: &str) -> Option<u32> {
    let value = value.trim();
    value.parse::<u32>().ok().or_else(|| {
        let float: f64 = value.parse().ok()?;
        (float.is_finite() && float >= 0.0 && float.fract() == 0.0 && float <= u32::MAX as f64)
            .then_some(float as u32)
    })
}

#[test]
fn parse_count_test() {
    assert_eq!(parse_count("3"), Some(3));
    assert_eq!(parse_count(" 12.0 "), Some(12));
    assert_eq!(parse_count("-1"), None);
    assert_eq!(parse_count("2.5"), None);
    assert_eq!(parse_count(""), None);
}
