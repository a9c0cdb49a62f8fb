use chrono::NaiveDate;

const CITY: &str = "{city}";
const DATE: &str = "{date}";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// File naming of the exported days. `{city}` must come before `{date}`.
/// A `.gz` template also matches the uncompressed file.
pub struct Config {
    pub trips_file_name: String,
    pub stations_file_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            trips_file_name: "{city}_trips_{date}.csv.gz".into(),
            stations_file_name: "{city}_stations_{date}.csv.gz".into(),
        }
    }
}

impl Config {
    pub fn trips_files(&self, city_id: u32, date: NaiveDate) -> Vec<String> {
        candidates(&render(&self.trips_file_name, city_id, date))
    }

    pub fn stations_files(&self, city_id: u32, date: NaiveDate) -> Vec<String> {
        candidates(&render(&self.stations_file_name, city_id, date))
    }

    /// City and date of a station file name, if it follows the template.
    pub fn parse_stations_file(&self, name: &str) -> Option<(u32, NaiveDate)> {
        let (prefix, rest) = self.stations_file_name.split_once(CITY)?;
        let (middle, suffix) = rest.split_once(DATE)?;
        let name = name.strip_prefix(prefix)?;
        let name = name
            .strip_suffix(suffix)
            .or_else(|| name.strip_suffix(suffix.strip_suffix(".gz")?))?;
        let (city, date) = name.split_once(middle)?;
        let city_id = city.parse().ok()?;
        let date = NaiveDate::parse_from_str(date, DATE_FORMAT).ok()?;
        Some((city_id, date))
    }
}

fn render(template: &str, city_id: u32, date: NaiveDate) -> String {
    template
        .replace(CITY, &city_id.to_string())
        .replace(DATE, &date.format(DATE_FORMAT).to_string())
}

fn candidates(name: &str) -> Vec<String> {
    match name.strip_suffix(".gz") {
        Some(plain) => vec![name.to_string(), plain.to_string()],
        None => vec![name.to_string()],
    }
}

#[test]
fn render_file_names() {
    let config = Config::default();
    let date = NaiveDate::from_ymd_opt(2024, 11, 19).unwrap();
    assert_eq!(
        config.trips_files(467, date),
        vec!["467_trips_2024-11-19.csv.gz", "467_trips_2024-11-19.csv"]
    );
}

#[test]
fn parse_file_names() {
    let config = Config::default();
    let date = NaiveDate::from_ymd_opt(2024, 11, 19).unwrap();
    assert_eq!(
        config.parse_stations_file("467_stations_2024-11-19.csv.gz"),
        Some((467, date))
    );
    assert_eq!(
        config.parse_stations_file("467_stations_2024-11-19.csv"),
        Some((467, date))
    );
    assert_eq!(config.parse_stations_file("467_trips_2024-11-19.csv.gz"), None);
    assert_eq!(config.parse_stations_file("manifest.json"), None);
}
