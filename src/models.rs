use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::period::{Period, Quarter};

/// One monthly submission for one indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesEntry {
    pub period: Period,
    pub value: f64,
    pub approved: bool,
    pub submitted_by: String,
    pub submitted_at: DateTime<Utc>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub comment: Option<String>,
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuarterlyTargets {
    pub q1: f64,
    pub q2: f64,
    pub q3: f64,
    pub q4: f64,
}

impl QuarterlyTargets {
    pub fn get(&self, quarter: Quarter) -> f64 {
        match quarter {
            Quarter::Q1 => self.q1,
            Quarter::Q2 => self.q2,
            Quarter::Q3 => self.q3,
            Quarter::Q4 => self.q4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricType {
    #[serde(rename = "%")]
    Percent,
    #[serde(rename = "#")]
    Count,
    #[serde(rename = "$")]
    Currency,
    #[serde(rename = "days")]
    Days,
    #[serde(rename = "ratio")]
    Ratio,
}

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Percent => "%",
            MetricType::Count => "#",
            MetricType::Currency => "$",
            MetricType::Days => "days",
            MetricType::Ratio => "ratio",
        }
    }
}

impl FromStr for MetricType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "%" | "percent" => Ok(MetricType::Percent),
            "#" | "count" => Ok(MetricType::Count),
            "$" | "currency" => Ok(MetricType::Currency),
            "days" => Ok(MetricType::Days),
            "ratio" => Ok(MetricType::Ratio),
            other => Err(anyhow::anyhow!("unknown metric type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportingFrequency {
    Monthly,
    Quarterly,
}

impl ReportingFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportingFrequency::Monthly => "monthly",
            ReportingFrequency::Quarterly => "quarterly",
        }
    }
}

impl FromStr for ReportingFrequency {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(ReportingFrequency::Monthly),
            "quarterly" => Ok(ReportingFrequency::Quarterly),
            other => Err(anyhow::anyhow!("unknown reporting frequency: {other}")),
        }
    }
}

/// A tracked metric. There is no stored status; see [`crate::engine::indicator_status`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    pub id: String,
    pub pillar_id: Option<String>,
    pub name: String,
    pub description: String,
    pub unit: String,
    pub department: String,
    pub current_value: f64,
    pub target_value: f64,
    pub quarterly_targets: Option<QuarterlyTargets>,
    pub annual_target: Option<f64>,
    pub yearly_targets: BTreeMap<i32, f64>,
    pub metric_type: MetricType,
    pub reporting_frequency: ReportingFrequency,
    pub data_source: Option<String>,
    pub is_locked: bool,
    pub is_custom: bool,
    pub series: Vec<TimeSeriesEntry>,
}

impl Indicator {
    pub fn effective_annual_target(&self) -> f64 {
        self.annual_target.unwrap_or(self.target_value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pillar {
    pub id: String,
    pub name: String,
    pub description: String,
    pub objectives: Vec<String>,
    pub overall_score: f64,
    pub display_order: i32,
    pub is_custom: bool,
}

/// Unsaved submission fields for one indicator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DraftInput {
    pub value: Option<f64>,
    pub comment: Option<String>,
    pub evidence: Option<Vec<String>>,
}

/// Drafts keyed by indicator id, filled in before a batch submit.
#[derive(Debug, Clone, Default)]
pub struct DraftBook {
    drafts: BTreeMap<String, DraftInput>,
}

impl DraftBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_value(&mut self, indicator_id: &str, value: f64) {
        self.entry(indicator_id).value = Some(value);
    }

    pub fn set_comment(&mut self, indicator_id: &str, comment: impl Into<String>) {
        self.entry(indicator_id).comment = Some(comment.into());
    }

    pub fn add_evidence(&mut self, indicator_id: &str, evidence: impl Into<String>) {
        self.entry(indicator_id)
            .evidence
            .get_or_insert_with(Vec::new)
            .push(evidence.into());
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }

    /// All drafts ordered by indicator id.
    pub fn into_drafts(self) -> Vec<(String, DraftInput)> {
        self.drafts.into_iter().collect()
    }

    fn entry(&mut self, indicator_id: &str) -> &mut DraftInput {
        self.drafts.entry(indicator_id.to_string()).or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Progress {
    pub actual: f64,
    pub target: f64,
    pub percentage: i64,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} ({}%)", self.actual, self.target, self.percentage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarterly_targets_index_by_quarter() {
        let targets = QuarterlyTargets {
            q1: 25000.0,
            q2: 50000.0,
            q3: 75000.0,
            q4: 100000.0,
        };
        assert_eq!(targets.get(Quarter::Q1), 25000.0);
        assert_eq!(targets.get(Quarter::Q4), 100000.0);
    }

    #[test]
    fn metric_type_round_trips_through_symbol() {
        for metric in [
            MetricType::Percent,
            MetricType::Count,
            MetricType::Currency,
            MetricType::Days,
            MetricType::Ratio,
        ] {
            assert_eq!(metric.as_str().parse::<MetricType>().unwrap(), metric);
        }
        assert!("furlongs".parse::<MetricType>().is_err());
    }

    #[test]
    fn drafts_are_kept_per_indicator() {
        let mut book = DraftBook::new();
        book.set_value("kpi-1", 5800.0);
        book.set_comment("kpi-1", "late registrations");
        book.add_evidence("kpi-5", "attendance.pdf");

        let drafts: BTreeMap<String, DraftInput> = book.into_drafts().into_iter().collect();
        let enrollment = &drafts["kpi-1"];
        assert_eq!(enrollment.value, Some(5800.0));
        assert_eq!(enrollment.comment.as_deref(), Some("late registrations"));
        assert_eq!(enrollment.evidence, None);

        let training = &drafts["kpi-5"];
        assert_eq!(training.value, None);
        assert_eq!(training.evidence, Some(vec!["attendance.pdf".to_string()]));
    }

    #[test]
    fn batch_drafts_come_out_in_indicator_order() {
        let mut book = DraftBook::new();
        assert!(book.is_empty());
        book.set_value("kpi-5", 102.0);
        book.set_value("kpi-1", 6100.0);
        book.add_evidence("kpi-1", "lms-export.csv");
        book.add_evidence("kpi-1", "regional-breakdown.xlsx");

        let drafts = book.into_drafts();
        let ids: Vec<&str> = drafts.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["kpi-1", "kpi-5"]);
        assert_eq!(
            drafts[0].1.evidence,
            Some(vec![
                "lms-export.csv".to_string(),
                "regional-breakdown.xlsx".to_string()
            ])
        );
        assert_eq!(drafts[1].1.value, Some(102.0));
    }
}
