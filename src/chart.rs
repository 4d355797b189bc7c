use chrono::NaiveDate;

use crate::model::{Metric, Timeline};

/// Daily new values for one metric, ready for plotting
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChartSeries {
    pub metric: Metric,
    pub points: Vec<(NaiveDate, u64)>,
}

impl ChartSeries {
    /// Derive per-day increments from the cumulative series of `metric`.
    ///
    /// The first day only seeds the running total. Downward corrections in
    /// the cumulative data are reported as zero.
    pub fn daily_new(timeline: &Timeline, metric: Metric) -> Self {
        let points = timeline
            .series(metric)
            .windows(2)
            .map(|pair| (pair[1].0, pair[1].1.saturating_sub(pair[0].1)))
            .collect();
        Self { metric, points }
    }

    pub fn max(&self) -> u64 {
        self.points.iter().map(|(_, v)| *v).max().unwrap_or(0)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|(d, _)| *d)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|(d, _)| *d)
    }

    /// (x, y) pairs with x as the day index
    pub fn plot_points(&self) -> Vec<(f64, f64)> {
        self.points
            .iter()
            .enumerate()
            .map(|(i, (_, v))| (i as f64, *v as f64))
            .collect()
    }
}
