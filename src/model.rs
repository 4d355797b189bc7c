use std::fmt;
use std::str::FromStr;

/// Map center used for the worldwide scope (lat, long)
pub const WORLDWIDE_CENTER: (f64, f64) = (29.0, 40.0);
/// Zoom used for the worldwide scope
pub const WORLDWIDE_ZOOM: f64 = 1.8;
/// Zoom used when a single region is focused
pub const REGION_ZOOM: f64 = 4.2;

/// Counters for exactly one scope (global or one region) as of the last fetch
#[derive(Debug, Clone, PartialEq)]
pub struct CounterSnapshot {
    pub today_cases: i64,
    pub cases: u64,
    pub today_recovered: i64,
    pub recovered: u64,
    pub today_deaths: i64,
    pub deaths: u64,
    /// (lat, long), only present for region-scoped snapshots
    pub coordinates: Option<(f64, f64)>,
}

impl CounterSnapshot {
    /// Cumulative total for a metric
    pub fn total(&self, metric: Metric) -> u64 {
        match metric {
            Metric::Cases => self.cases,
            Metric::Recovered => self.recovered,
            Metric::Deaths => self.deaths,
        }
    }

    /// Today's change for a metric; negative when the service corrected a count
    pub fn today(&self, metric: Metric) -> i64 {
        match metric {
            Metric::Cases => self.today_cases,
            Metric::Recovered => self.today_recovered,
            Metric::Deaths => self.today_deaths,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CountryInfo {
    pub lat: f64,
    pub long: f64,
    pub flag_url: String,
}

/// One entry of the all-regions snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct RegionRecord {
    pub country: String,
    pub iso_code: String,
    pub country_info: CountryInfo,
    pub cases: u64,
    pub today_cases: i64,
    pub recovered: u64,
    pub today_recovered: i64,
    pub deaths: u64,
    pub today_deaths: i64,
}

impl RegionRecord {
    /// Cumulative total for a metric
    pub fn value(&self, metric: Metric) -> u64 {
        match metric {
            Metric::Cases => self.cases,
            Metric::Recovered => self.recovered,
            Metric::Deaths => self.deaths,
        }
    }
}

/// Entry of the region selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionOption {
    pub display_name: String,
    pub selection_value: String,
}

/// Counter family shown by the map and chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Metric {
    #[default]
    Cases,
    Recovered,
    Deaths,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Cases, Metric::Recovered, Metric::Deaths];

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Cases => "cases",
            Metric::Recovered => "recovered",
            Metric::Deaths => "deaths",
        }
    }

    /// Next metric in display order, wrapping around
    pub fn next(self) -> Self {
        match self {
            Metric::Cases => Metric::Recovered,
            Metric::Recovered => Metric::Deaths,
            Metric::Deaths => Metric::Cases,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown metric `{0}` (expected cases, recovered or deaths)")]
pub struct UnknownMetric(pub String);

impl FromStr for Metric {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cases" => Ok(Metric::Cases),
            "recovered" => Ok(Metric::Recovered),
            "deaths" => Ok(Metric::Deaths),
            other => Err(UnknownMetric(other.to_owned())),
        }
    }
}

/// Selected scope: the whole world or one region by iso code
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RegionSelection {
    #[default]
    Worldwide,
    Region(String),
}

impl RegionSelection {
    pub const WORLDWIDE: &'static str = "worldwide";

    /// Parse a selection value as produced by the region selector
    pub fn from_value(value: &str) -> Self {
        if value == Self::WORLDWIDE {
            RegionSelection::Worldwide
        } else {
            RegionSelection::Region(value.to_owned())
        }
    }

    pub fn as_value(&self) -> &str {
        match self {
            RegionSelection::Worldwide => Self::WORLDWIDE,
            RegionSelection::Region(code) => code,
        }
    }
}

impl fmt::Display for RegionSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_value())
    }
}

/// Where the map is centered and how far it is zoomed (Leaflet-style zoom)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapFocus {
    /// (lat, long)
    pub center: (f64, f64),
    pub zoom: f64,
}

impl MapFocus {
    pub fn worldwide() -> Self {
        Self {
            center: WORLDWIDE_CENTER,
            zoom: WORLDWIDE_ZOOM,
        }
    }

    pub fn region(lat: f64, long: f64) -> Self {
        Self {
            center: (lat, long),
            zoom: REGION_ZOOM,
        }
    }

    /// Viewport scale where the worldwide zoom shows the world once across
    pub fn viewport_scale(&self) -> f64 {
        (self.zoom - WORLDWIDE_ZOOM).exp2()
    }
}

/// Cumulative per-day counters for the worldwide time series
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Timeline {
    pub cases: Vec<(chrono::NaiveDate, u64)>,
    pub recovered: Vec<(chrono::NaiveDate, u64)>,
    pub deaths: Vec<(chrono::NaiveDate, u64)>,
}

impl Timeline {
    pub fn series(&self, metric: Metric) -> &[(chrono::NaiveDate, u64)] {
        match metric {
            Metric::Cases => &self.cases,
            Metric::Recovered => &self.recovered,
            Metric::Deaths => &self.deaths,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_parse_and_display() {
        for metric in Metric::ALL {
            assert_eq!(metric.as_str().parse::<Metric>(), Ok(metric));
        }
        assert!("active".parse::<Metric>().is_err());
        assert_eq!(Metric::default(), Metric::Cases);
    }

    #[test]
    fn test_metric_cycle() {
        assert_eq!(Metric::Cases.next(), Metric::Recovered);
        assert_eq!(Metric::Deaths.next(), Metric::Cases);
    }

    #[test]
    fn test_selection_value_round_trip() {
        assert_eq!(RegionSelection::from_value("worldwide"), RegionSelection::Worldwide);
        let region = RegionSelection::from_value("VN");
        assert_eq!(region, RegionSelection::Region("VN".to_owned()));
        assert_eq!(region.as_value(), "VN");
    }

    #[test]
    fn test_viewport_scale() {
        assert_eq!(MapFocus::worldwide().viewport_scale(), 1.0);
        let region = MapFocus::region(10.0, 20.0).viewport_scale();
        assert!(region > 5.0 && region < 5.5);
    }
}
