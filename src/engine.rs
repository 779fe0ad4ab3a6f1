use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::{Indicator, Progress, TimeSeriesEntry};
use crate::period::{Period, Quarter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusTier {
    Critical,
    Poor,
    Fair,
    Good,
    Excellent,
}

impl StatusTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusTier::Excellent => "excellent",
            StatusTier::Good => "good",
            StatusTier::Fair => "fair",
            StatusTier::Poor => "poor",
            StatusTier::Critical => "critical",
        }
    }

    /// Five-point rating shown next to the tier label.
    pub fn rating(&self) -> u8 {
        match self {
            StatusTier::Excellent => 5,
            StatusTier::Good => 4,
            StatusTier::Fair => 3,
            StatusTier::Poor => 2,
            StatusTier::Critical => 1,
        }
    }

    pub fn label(&self) -> String {
        let name = self.as_str();
        let mut chars = name.chars();
        let capitalized = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
            None => String::new(),
        };
        format!("{capitalized} ({})", self.rating())
    }
}

impl fmt::Display for StatusTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn sum_approved_in_period<F>(series: &[TimeSeriesEntry], predicate: F) -> f64
where
    F: Fn(&Period) -> bool,
{
    series
        .iter()
        .filter(|entry| entry.approved && predicate(&entry.period))
        .map(|entry| entry.value)
        .sum()
}

pub fn in_quarter(quarter: Quarter, year: i32) -> impl Fn(&Period) -> bool {
    let months = quarter.months();
    move |period| period.year() == year && months.contains(&period.month())
}

pub fn in_year(year: i32) -> impl Fn(&Period) -> bool {
    move |period| period.year() == year
}

/// Rounded percentage of target. A non-positive target yields 0. Not clamped.
pub fn percentage_of(actual: f64, target: f64) -> i64 {
    if target > 0.0 {
        (100.0 * actual / target).round() as i64
    } else {
        0
    }
}

pub fn classify(percentage: f64) -> StatusTier {
    if percentage >= 90.0 {
        StatusTier::Excellent
    } else if percentage >= 70.0 {
        StatusTier::Good
    } else if percentage >= 50.0 {
        StatusTier::Fair
    } else if percentage >= 30.0 {
        StatusTier::Poor
    } else {
        StatusTier::Critical
    }
}

pub fn current_period_entry<'a>(
    series: &'a [TimeSeriesEntry],
    reference: &Period,
) -> Option<&'a TimeSeriesEntry> {
    series.iter().find(|entry| entry.period == *reference)
}

pub fn is_pending_approval(series: &[TimeSeriesEntry], reference: &Period) -> bool {
    current_period_entry(series, reference).is_some_and(|entry| !entry.approved)
}

/// Every unapproved entry in the series, oldest period first.
pub fn pending_entries(series: &[TimeSeriesEntry]) -> Vec<&TimeSeriesEntry> {
    let mut pending: Vec<&TimeSeriesEntry> = series.iter().filter(|entry| !entry.approved).collect();
    pending.sort_by_key(|entry| entry.period);
    pending
}

pub fn quarterly_progress(indicator: &Indicator, quarter: Quarter, year: i32) -> Progress {
    let actual = sum_approved_in_period(&indicator.series, in_quarter(quarter, year));
    let target = indicator
        .quarterly_targets
        .map(|targets| targets.get(quarter))
        .unwrap_or(0.0);
    Progress {
        actual,
        target,
        percentage: percentage_of(actual, target),
    }
}

pub fn annual_progress(indicator: &Indicator, year: i32) -> Progress {
    let actual = sum_approved_in_period(&indicator.series, in_year(year));
    let target = indicator.effective_annual_target();
    Progress {
        actual,
        target,
        percentage: percentage_of(actual, target),
    }
}

pub fn indicator_percentage(indicator: &Indicator) -> i64 {
    percentage_of(indicator.current_value, indicator.target_value)
}

pub fn indicator_status(indicator: &Indicator) -> StatusTier {
    classify(indicator_percentage(indicator) as f64)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::models::{MetricType, QuarterlyTargets, ReportingFrequency};

    fn entry(period: &str, value: f64, approved: bool) -> TimeSeriesEntry {
        TimeSeriesEntry {
            period: Period::parse(period).unwrap(),
            value,
            approved,
            submitted_by: "john.doe".to_string(),
            submitted_at: Utc.with_ymd_and_hms(2024, 1, 31, 10, 0, 0).unwrap(),
            approved_by: approved.then(|| "jane.director".to_string()),
            approved_at: None,
            comment: None,
            evidence: Vec::new(),
        }
    }

    fn enrollment_series() -> Vec<TimeSeriesEntry> {
        vec![
            entry("2024-01", 8500.0, true),
            entry("2024-02", 9200.0, true),
            entry("2024-03", 7300.0, true),
            entry("2024-09", 5800.0, false),
        ]
    }

    fn enrollment_indicator() -> Indicator {
        Indicator {
            id: "kpi-1".to_string(),
            pillar_id: Some("pillar-1".to_string()),
            name: "3MTT Program Enrollment".to_string(),
            description: "Citizens enrolled".to_string(),
            unit: "citizens".to_string(),
            department: "DED".to_string(),
            current_value: 53000.0,
            target_value: 100000.0,
            quarterly_targets: Some(QuarterlyTargets {
                q1: 25000.0,
                q2: 50000.0,
                q3: 75000.0,
                q4: 100000.0,
            }),
            annual_target: Some(100000.0),
            yearly_targets: BTreeMap::new(),
            metric_type: MetricType::Count,
            reporting_frequency: ReportingFrequency::Monthly,
            data_source: None,
            is_locked: false,
            is_custom: false,
            series: enrollment_series(),
        }
    }

    #[test]
    fn quarter_and_year_sums_skip_unapproved_entries() {
        let series = enrollment_series();
        assert_eq!(sum_approved_in_period(&series, in_quarter(Quarter::Q1, 2024)), 25000.0);
        assert_eq!(sum_approved_in_period(&series, in_year(2024)), 25000.0);
        assert_eq!(sum_approved_in_period(&series, in_quarter(Quarter::Q3, 2024)), 0.0);
    }

    #[test]
    fn year_must_match_not_just_month() {
        let mut series = enrollment_series();
        series.push(entry("2025-01", 1000.0, true));
        assert_eq!(sum_approved_in_period(&series, in_quarter(Quarter::Q1, 2025)), 1000.0);
        assert_eq!(sum_approved_in_period(&series, in_quarter(Quarter::Q1, 2024)), 25000.0);
        assert_eq!(sum_approved_in_period(&series, in_year(2023)), 0.0);
    }

    #[test]
    fn summing_does_not_mutate_series() {
        let series = enrollment_series();
        let before = series.clone();
        let first = sum_approved_in_period(&series, in_year(2024));
        let second = sum_approved_in_period(&series, in_year(2024));
        assert_eq!(first, second);
        assert_eq!(series, before);
    }

    #[test]
    fn non_positive_targets_give_zero_percent() {
        assert_eq!(percentage_of(53000.0, 0.0), 0);
        assert_eq!(percentage_of(53000.0, -10.0), 0);
        assert_eq!(classify(percentage_of(42.0, 0.0) as f64), StatusTier::Critical);
    }

    #[test]
    fn percentage_rounds_and_is_not_clamped() {
        assert_eq!(percentage_of(53000.0, 100000.0), 53);
        assert_eq!(percentage_of(2.0, 3.0), 67);
        assert_eq!(percentage_of(78.0, 45.0), 173);
    }

    #[test]
    fn classification_boundaries() {
        let cases = [
            (90.0, StatusTier::Excellent),
            (89.999, StatusTier::Good),
            (70.0, StatusTier::Good),
            (69.999, StatusTier::Fair),
            (50.0, StatusTier::Fair),
            (49.999, StatusTier::Poor),
            (30.0, StatusTier::Poor),
            (29.999, StatusTier::Critical),
        ];
        for (percentage, tier) in cases {
            assert_eq!(classify(percentage), tier, "{percentage}");
        }
        assert_eq!(classify(250.0), StatusTier::Excellent);
        assert_eq!(classify(-5.0), StatusTier::Critical);
    }

    #[test]
    fn enrollment_scenario_is_fair() {
        let indicator = enrollment_indicator();
        assert_eq!(indicator_percentage(&indicator), 53);
        assert_eq!(indicator_status(&indicator), StatusTier::Fair);
        assert_eq!(indicator_status(&indicator).label(), "Fair (3)");
    }

    #[test]
    fn pending_only_when_current_entry_unapproved() {
        let series = enrollment_series();
        let september = Period::parse("2024-09").unwrap();
        let january = Period::parse("2024-01").unwrap();
        let october = Period::parse("2024-10").unwrap();

        assert_eq!(current_period_entry(&series, &september).map(|e| e.value), Some(5800.0));
        assert!(is_pending_approval(&series, &september));
        assert!(!is_pending_approval(&series, &january));
        assert!(current_period_entry(&series, &october).is_none());
        assert!(!is_pending_approval(&series, &october));
    }

    #[test]
    fn pending_entries_include_earlier_periods() {
        let mut series = enrollment_series();
        series.push(entry("2024-11", 6400.0, false));
        series.push(entry("2024-10", 6000.0, true));

        let pending: Vec<String> = pending_entries(&series)
            .iter()
            .map(|e| e.period.to_string())
            .collect();
        assert_eq!(pending, vec!["2024-09", "2024-11"]);

        let december = Period::parse("2024-12").unwrap();
        assert!(!is_pending_approval(&series, &december));
        assert!(pending_entries(&series[..3]).is_empty());
    }

    #[test]
    fn quarterly_progress_uses_quarter_target() {
        let indicator = enrollment_indicator();
        let q1 = quarterly_progress(&indicator, Quarter::Q1, 2024);
        assert_eq!(q1.actual, 25000.0);
        assert_eq!(q1.target, 25000.0);
        assert_eq!(q1.percentage, 100);

        let q3 = quarterly_progress(&indicator, Quarter::Q3, 2024);
        assert_eq!(q3.actual, 0.0);
        assert_eq!(q3.percentage, 0);
    }

    #[test]
    fn missing_quarter_targets_give_zero_percent() {
        let mut indicator = enrollment_indicator();
        indicator.quarterly_targets = None;
        let q1 = quarterly_progress(&indicator, Quarter::Q1, 2024);
        assert_eq!(q1.actual, 25000.0);
        assert_eq!(q1.target, 0.0);
        assert_eq!(q1.percentage, 0);
    }

    #[test]
    fn annual_target_falls_back_to_target_value() {
        let mut indicator = enrollment_indicator();
        indicator.annual_target = None;
        indicator.target_value = 50000.0;
        let progress = annual_progress(&indicator, 2024);
        assert_eq!(progress.target, 50000.0);
        assert_eq!(progress.percentage, 50);
    }
}
