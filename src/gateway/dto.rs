//! Wire shapes of the counter service.
//!
//! Every field is optional on the wire; required-ness is enforced when mapping
//! into domain records so the error names the missing field.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Deserialize;

use super::GatewayError;
use crate::model::{CounterSnapshot, CountryInfo, RegionRecord, Timeline};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SnapshotDto {
    pub(super) country: Option<String>,
    pub(super) country_info: Option<CountryInfoDto>,
    pub(super) cases: Option<u64>,
    pub(super) today_cases: Option<i64>,
    pub(super) recovered: Option<u64>,
    pub(super) today_recovered: Option<i64>,
    pub(super) deaths: Option<u64>,
    pub(super) today_deaths: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct CountryInfoDto {
    pub(super) iso2: Option<String>,
    pub(super) lat: Option<f64>,
    pub(super) long: Option<f64>,
    pub(super) flag: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct HistoryDto {
    #[serde(default)]
    pub(super) cases: HashMap<String, u64>,
    #[serde(default)]
    pub(super) recovered: HashMap<String, u64>,
    #[serde(default)]
    pub(super) deaths: HashMap<String, u64>,
}

fn require<T>(value: Option<T>, field: &str, scope: &str) -> Result<T, GatewayError> {
    value.ok_or_else(|| GatewayError::malformed(format!("{scope}: missing field `{field}`")))
}

/// A present, finite coordinate
fn coordinate(value: Option<f64>, field: &str, scope: &str) -> Result<f64, GatewayError> {
    let value = require(value, field, scope)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(GatewayError::malformed(format!("{scope}: non-finite `{field}`")))
    }
}

impl SnapshotDto {
    /// True when the payload carries none of the counter fields (`{}` or a
    /// bare error message), which the service uses for unmatched regions.
    pub(super) fn is_empty(&self) -> bool {
        self.country.is_none()
            && self.cases.is_none()
            && self.recovered.is_none()
            && self.deaths.is_none()
    }

    pub(super) fn into_global_snapshot(self) -> Result<CounterSnapshot, GatewayError> {
        self.counters("global snapshot", None)
    }

    /// Region-scoped snapshot; coordinates are required.
    pub(super) fn into_region_snapshot(self, code: &str) -> Result<CounterSnapshot, GatewayError> {
        let scope = format!("region {code}");
        let info = require(self.country_info.as_ref(), "countryInfo", &scope)?;
        let lat = coordinate(info.lat, "countryInfo.lat", &scope)?;
        let long = coordinate(info.long, "countryInfo.long", &scope)?;
        self.counters(&scope, Some((lat, long)))
    }

    /// One row of the all-regions payload. Rows without an iso code yield
    /// `Ok(None)`; any other missing field is an error.
    pub(super) fn into_region_record(
        self,
        index: usize,
    ) -> Result<Option<RegionRecord>, GatewayError> {
        let scope = format!("regions[{index}]");
        let country = require(self.country.clone(), "country", &scope)?;
        let info = require(self.country_info.as_ref(), "countryInfo", &scope)?;
        let Some(iso_code) = info.iso2.clone() else {
            return Ok(None);
        };
        let country_info = CountryInfo {
            lat: coordinate(info.lat, "countryInfo.lat", &scope)?,
            long: coordinate(info.long, "countryInfo.long", &scope)?,
            flag_url: require(info.flag.clone(), "countryInfo.flag", &scope)?,
        };
        let counters = self.counters(&scope, None)?;

        Ok(Some(RegionRecord {
            country,
            iso_code,
            country_info,
            cases: counters.cases,
            today_cases: counters.today_cases,
            recovered: counters.recovered,
            today_recovered: counters.today_recovered,
            deaths: counters.deaths,
            today_deaths: counters.today_deaths,
        }))
    }

    fn counters(
        &self,
        scope: &str,
        coordinates: Option<(f64, f64)>,
    ) -> Result<CounterSnapshot, GatewayError> {
        Ok(CounterSnapshot {
            today_cases: require(self.today_cases, "todayCases", scope)?,
            cases: require(self.cases, "cases", scope)?,
            today_recovered: require(self.today_recovered, "todayRecovered", scope)?,
            recovered: require(self.recovered, "recovered", scope)?,
            today_deaths: require(self.today_deaths, "todayDeaths", scope)?,
            deaths: require(self.deaths, "deaths", scope)?,
            coordinates,
        })
    }
}

impl HistoryDto {
    pub(super) fn into_timeline(self) -> Result<Timeline, GatewayError> {
        Ok(Timeline {
            cases: dated_series(self.cases, "cases")?,
            recovered: dated_series(self.recovered, "recovered")?,
            deaths: dated_series(self.deaths, "deaths")?,
        })
    }
}

/// Keys look like "1/22/20" (month/day/two-digit year).
fn dated_series(
    raw: HashMap<String, u64>,
    field: &str,
) -> Result<Vec<(NaiveDate, u64)>, GatewayError> {
    let mut series = raw
        .into_iter()
        .map(|(key, value)| {
            NaiveDate::parse_from_str(&key, "%m/%d/%y")
                .map(|date| (date, value))
                .map_err(|e| {
                    GatewayError::malformed(format!("history {field}: bad date `{key}`: {e}"))
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    series.sort_by_key(|(date, _)| *date);
    Ok(series)
}
