use std::collections::BTreeMap;
use std::str::FromStr;

use thiserror::Error;

use crate::models::{MetricType, ReportingFrequency};

/// Definition of an indicator that has not been created yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewIndicator {
    pub id: String,
    pub pillar_id: Option<String>,
    pub name: String,
    pub description: String,
    pub unit: String,
    pub department: String,
    pub metric_type: MetricType,
    pub reporting_frequency: ReportingFrequency,
    pub yearly_targets: BTreeMap<i32, f64>,
    pub data_source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid indicator definition: {}", .0.join("; "))]
pub struct ValidationErrors(pub Vec<String>);

impl NewIndicator {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("KPI name is required".to_string());
        }
        if self.description.trim().is_empty() {
            errors.push("Description is required".to_string());
        }
        if self.department.trim().is_empty() {
            errors.push("Responsible department is required".to_string());
        }
        if self.yearly_targets.is_empty() {
            errors.push("At least one yearly target is required".to_string());
        }
        if self.metric_type == MetricType::Percent
            && self.yearly_targets.values().any(|target| *target > 100.0)
        {
            errors.push("Percentage targets cannot exceed 100%".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors(errors))
        }
    }

    /// Target used as the headline target: the latest yearly target.
    pub fn headline_target(&self) -> f64 {
        self.yearly_targets
            .values()
            .next_back()
            .copied()
            .unwrap_or(0.0)
    }
}

/// Definition of a pillar that has not been created yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPillar {
    pub id: String,
    pub name: String,
    pub description: String,
    pub objectives: Vec<String>,
}

impl NewPillar {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("Pillar name is required".to_string());
        }
        if self.description.trim().is_empty() {
            errors.push("Description is required".to_string());
        }
        if self.cleaned_objectives().is_empty() {
            errors.push("At least one objective is required".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors(errors))
        }
    }

    /// Objectives with blank entries dropped and whitespace trimmed.
    pub fn cleaned_objectives(&self) -> Vec<String> {
        self.objectives
            .iter()
            .map(|objective| objective.trim())
            .filter(|objective| !objective.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// A pillar can only be removed once every KPI has been moved out of it.
pub fn ensure_pillar_empty(pillar_id: &str, indicator_count: i64) -> anyhow::Result<()> {
    if indicator_count > 0 {
        anyhow::bail!(
            "pillar {pillar_id} still has {indicator_count} KPIs; remove them before deleting it"
        );
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

impl FromStr for MoveDirection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(MoveDirection::Up),
            "down" => Ok(MoveDirection::Down),
            other => Err(anyhow::anyhow!("unknown direction: {other}, expected up or down")),
        }
    }
}

/// Swaps `pillar_id` with its neighbour in `order`. Moving past either end
/// leaves the order unchanged.
pub fn reorder(
    order: &[String],
    pillar_id: &str,
    direction: MoveDirection,
) -> anyhow::Result<Vec<String>> {
    let index = order
        .iter()
        .position(|id| id == pillar_id)
        .ok_or_else(|| anyhow::anyhow!("pillar {pillar_id} not found"))?;

    let mut reordered = order.to_vec();
    let target = match direction {
        MoveDirection::Up => index.checked_sub(1),
        MoveDirection::Down => Some(index + 1).filter(|t| *t < order.len()),
    };
    if let Some(target) = target {
        reordered.swap(index, target);
    }
    Ok(reordered)
}

/// Parses `kpi-1=5800` pairs from the command line.
pub fn parse_keyed_value(raw: &str) -> anyhow::Result<(String, f64)> {
    let (key, value) = parse_keyed_text(raw)?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid value in '{raw}': {e}"))?;
    Ok((key, value))
}

/// Parses `kpi-1=some text` pairs from the command line.
pub fn parse_keyed_text(raw: &str) -> anyhow::Result<(String, String)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("expected KPI=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("missing KPI id in '{raw}'");
    }
    Ok((key.to_string(), value.to_string()))
}

/// Parses `2025=120000` pairs from the command line.
pub fn parse_yearly_target(raw: &str) -> anyhow::Result<(i32, f64)> {
    let (year, target) = raw
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("expected YEAR=TARGET, got '{raw}'"))?;
    let year: i32 = year
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid year in '{raw}': {e}"))?;
    let target: f64 = target
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid target in '{raw}': {e}"))?;
    Ok((year, target))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NewIndicator {
        NewIndicator {
            id: "kpi-10".to_string(),
            pillar_id: Some("pillar-9".to_string()),
            name: "Smart Traffic Coverage".to_string(),
            description: "Share of junctions with adaptive signals".to_string(),
            unit: "%".to_string(),
            department: "ITIS".to_string(),
            metric_type: MetricType::Percent,
            reporting_frequency: ReportingFrequency::Quarterly,
            yearly_targets: BTreeMap::from([(2025, 20.0), (2026, 35.0)]),
            data_source: None,
        }
    }

    #[test]
    fn accepts_complete_definition() {
        assert!(sample().validate().is_ok());
        assert_eq!(sample().headline_target(), 35.0);
    }

    #[test]
    fn collects_every_violation() {
        let mut indicator = sample();
        indicator.name = "  ".to_string();
        indicator.department = String::new();
        indicator.yearly_targets.clear();

        let errors = indicator.validate().unwrap_err();
        assert_eq!(
            errors.0,
            vec![
                "KPI name is required".to_string(),
                "Responsible department is required".to_string(),
                "At least one yearly target is required".to_string(),
            ]
        );
    }

    #[test]
    fn percentage_targets_capped_at_100() {
        let mut indicator = sample();
        indicator.yearly_targets.insert(2027, 120.0);
        assert!(indicator.validate().is_err());

        indicator.metric_type = MetricType::Count;
        assert!(indicator.validate().is_ok());
    }

    #[test]
    fn parses_yearly_target_pairs() {
        assert_eq!(parse_yearly_target("2025=120000").unwrap(), (2025, 120000.0));
        assert!(parse_yearly_target("2025").is_err());
        assert!(parse_yearly_target("next=5").is_err());
    }

    fn smart_cities() -> NewPillar {
        NewPillar {
            id: "pillar-10".to_string(),
            name: "Smart Cities Initiative".to_string(),
            description: "Urban digital transformation projects".to_string(),
            objectives: vec![
                " Deploy IoT sensors in major cities ".to_string(),
                "".to_string(),
                "Implement smart traffic management systems".to_string(),
            ],
        }
    }

    #[test]
    fn pillar_objectives_are_cleaned() {
        let pillar = smart_cities();
        assert!(pillar.validate().is_ok());
        assert_eq!(
            pillar.cleaned_objectives(),
            vec![
                "Deploy IoT sensors in major cities".to_string(),
                "Implement smart traffic management systems".to_string(),
            ]
        );
    }

    #[test]
    fn pillar_validation_collects_every_violation() {
        let pillar = NewPillar {
            id: "pillar-10".to_string(),
            name: String::new(),
            description: " ".to_string(),
            objectives: vec!["  ".to_string(), String::new()],
        };

        let errors = pillar.validate().unwrap_err();
        assert_eq!(
            errors.0,
            vec![
                "Pillar name is required".to_string(),
                "Description is required".to_string(),
                "At least one objective is required".to_string(),
            ]
        );
    }

    #[test]
    fn pillar_with_kpis_cannot_be_deleted() {
        assert!(ensure_pillar_empty("pillar-7", 0).is_ok());
        let err = ensure_pillar_empty("pillar-1", 3).unwrap_err();
        assert!(err.to_string().contains("still has 3 KPIs"));
    }

    #[test]
    fn reorder_swaps_with_neighbour() {
        let order: Vec<String> = ["pillar-1", "pillar-2", "pillar-3"]
            .iter()
            .map(|id| id.to_string())
            .collect();

        let up = reorder(&order, "pillar-2", MoveDirection::Up).unwrap();
        assert_eq!(up, vec!["pillar-2", "pillar-1", "pillar-3"]);

        let down = reorder(&order, "pillar-2", MoveDirection::Down).unwrap();
        assert_eq!(down, vec!["pillar-1", "pillar-3", "pillar-2"]);
    }

    #[test]
    fn reorder_at_edges_is_a_no_op() {
        let order = vec!["pillar-1".to_string(), "pillar-2".to_string()];
        assert_eq!(reorder(&order, "pillar-1", MoveDirection::Up).unwrap(), order);
        assert_eq!(reorder(&order, "pillar-2", MoveDirection::Down).unwrap(), order);
        assert!(reorder(&order, "pillar-9", MoveDirection::Up).is_err());
        assert!("sideways".parse::<MoveDirection>().is_err());
    }

    #[test]
    fn parses_keyed_pairs() {
        assert_eq!(
            parse_keyed_value("kpi-1=5800").unwrap(),
            ("kpi-1".to_string(), 5800.0)
        );
        assert_eq!(
            parse_keyed_text("kpi-1=late=registrations").unwrap(),
            ("kpi-1".to_string(), "late=registrations".to_string())
        );
        assert!(parse_keyed_value("kpi-1=lots").is_err());
        assert!(parse_keyed_text("=5").is_err());
    }
}
