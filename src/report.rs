use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::engine::{self, StatusTier};
use crate::models::{Indicator, Pillar};
use crate::period::{Period, Quarter};

#[derive(Debug, Clone, PartialEq)]
pub struct TierSummary {
    pub tier: StatusTier,
    pub count: usize,
}

/// Indicator counts per derived tier, best tier first. Empty tiers are kept.
pub fn summarize_by_tier(indicators: &[Indicator]) -> Vec<TierSummary> {
    let mut counts = std::collections::BTreeMap::new();
    for tier in [
        StatusTier::Critical,
        StatusTier::Poor,
        StatusTier::Fair,
        StatusTier::Good,
        StatusTier::Excellent,
    ] {
        counts.insert(tier, 0usize);
    }

    for indicator in indicators {
        *counts.entry(engine::indicator_status(indicator)).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .rev()
        .map(|(tier, count)| TierSummary { tier, count })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingApproval {
    pub indicator_id: String,
    pub indicator_name: String,
    pub department: String,
    pub period: Period,
    pub value: f64,
    pub submitted_by: String,
    pub submitted_at: DateTime<Utc>,
}

/// Every unapproved (indicator, period) pair, oldest period first.
pub fn approval_queue(indicators: &[Indicator]) -> Vec<PendingApproval> {
    let mut queue: Vec<PendingApproval> = indicators
        .iter()
        .flat_map(|indicator| {
            engine::pending_entries(&indicator.series)
                .into_iter()
                .map(move |entry| PendingApproval {
                    indicator_id: indicator.id.clone(),
                    indicator_name: indicator.name.clone(),
                    department: indicator.department.clone(),
                    period: entry.period,
                    value: entry.value,
                    submitted_by: entry.submitted_by.clone(),
                    submitted_at: entry.submitted_at,
                })
        })
        .collect();
    queue.sort_by(|a, b| {
        a.period
            .cmp(&b.period)
            .then_with(|| a.indicator_id.cmp(&b.indicator_id))
    });
    queue
}

pub fn build_report(
    year: i32,
    reference: &Period,
    pillars: &[Pillar],
    indicators: &[Indicator],
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# KPI Performance Report");
    let _ = writeln!(
        output,
        "Reporting year {} (current period {}, {})",
        year,
        reference,
        reference.quarter()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Pillars");

    if pillars.is_empty() {
        let _ = writeln!(output, "No pillars configured.");
    } else {
        for pillar in pillars {
            let tier = engine::classify(pillar.overall_score);
            let members = indicators
                .iter()
                .filter(|i| i.pillar_id.as_deref() == Some(pillar.id.as_str()))
                .count();
            let _ = writeln!(
                output,
                "- {}: score {:.0} ({}) across {} KPIs",
                pillar.name,
                pillar.overall_score,
                tier.label(),
                members
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Status Mix");
    let total = indicators.len();
    let on_track = indicators
        .iter()
        .filter(|i| engine::indicator_status(i) >= StatusTier::Good)
        .count();
    let _ = writeln!(output, "{on_track} of {total} KPIs are good or excellent.");
    for summary in summarize_by_tier(indicators) {
        let _ = writeln!(output, "- {}: {}", summary.tier.label(), summary.count);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Indicators");

    if indicators.is_empty() {
        let _ = writeln!(output, "No indicators recorded.");
    } else {
        let _ = writeln!(output, "| KPI | Department | Current | Target | Progress | Status |");
        let _ = writeln!(output, "|---|---|---|---|---|---|");
        for indicator in indicators {
            let _ = writeln!(
                output,
                "| {} | {} | {} {} | {} | {}% | {} |",
                indicator.name,
                indicator.department,
                indicator.current_value,
                indicator.unit,
                indicator.target_value,
                engine::indicator_percentage(indicator),
                engine::indicator_status(indicator).label()
            );
        }
    }

    let tracked: Vec<&Indicator> = indicators.iter().filter(|i| !i.series.is_empty()).collect();
    let _ = writeln!(output);
    let _ = writeln!(output, "## Monthly Rollups");

    if tracked.is_empty() {
        let _ = writeln!(output, "No monthly submissions recorded.");
    } else {
        for indicator in tracked.iter() {
            let _ = writeln!(output, "### {}", indicator.name);
            for quarter in Quarter::ALL {
                let progress = engine::quarterly_progress(indicator, quarter, year);
                let _ = writeln!(output, "- {} {}: {}", quarter, year, progress);
            }
            let annual = engine::annual_progress(indicator, year);
            let _ = writeln!(output, "- Annual {}: {}", year, annual);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Pending Approvals");

    let queue = approval_queue(indicators);

    if queue.is_empty() {
        let _ = writeln!(output, "Nothing awaiting approval.");
    } else {
        for item in queue.iter() {
            let overdue = if item.period < *reference {
                " (earlier period)"
            } else {
                ""
            };
            let _ = writeln!(
                output,
                "- {} ({}) {}: {} submitted by {} on {}{}",
                item.indicator_name,
                item.indicator_id,
                item.period,
                item.value,
                item.submitted_by,
                item.submitted_at.format("%Y-%m-%d"),
                overdue
            );
        }
    }

    output
}
