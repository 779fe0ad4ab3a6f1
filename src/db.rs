use std::collections::{BTreeMap, HashMap};

use anyhow::Context;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::catalog::{self, MoveDirection, NewIndicator, NewPillar};
use crate::models::{DraftInput, Indicator, Pillar, QuarterlyTargets, TimeSeriesEntry};
use crate::period::Period;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("migrations applied");
    Ok(())
}

struct SeedIndicator {
    id: &'static str,
    pillar_id: &'static str,
    name: &'static str,
    description: &'static str,
    unit: &'static str,
    department: &'static str,
    current_value: f64,
    target_value: f64,
    quarterly_targets: Option<[f64; 4]>,
    annual_target: Option<f64>,
    yearly_targets: &'static [(i32, f64)],
    metric_type: &'static str,
    reporting_frequency: &'static str,
    data_source: &'static str,
    is_locked: bool,
    is_custom: bool,
}

fn seed_pillars() -> Vec<(&'static str, &'static str, &'static str, f64, bool, Vec<&'static str>)> {
    vec![
        (
            "pillar-1",
            "Digital Literacy & Skills",
            "Building digital capabilities across citizens and government workforce",
            49.0,
            false,
            vec![
                "Achieve 75% digital literacy rate among adults",
                "Train 3 million technical talents by 2027",
                "Equip all government staff with digital skills",
            ],
        ),
        (
            "pillar-2",
            "Digital Infrastructure",
            "Expanding reliable digital infrastructure nationwide",
            54.0,
            false,
            vec![
                "Achieve 70% broadband penetration by 2027",
                "Ensure rural-urban connectivity parity",
            ],
        ),
        (
            "pillar-3",
            "Digital Government",
            "Transforming government services through digitalization",
            78.0,
            false,
            vec![
                "Digitize all eligible government services",
                "Establish interoperable government systems",
            ],
        ),
        (
            "pillar-4",
            "Digital Innovation & Entrepreneurship",
            "Fostering digital innovation and startup ecosystem",
            32.0,
            false,
            vec![
                "Establish innovation hubs in all geopolitical zones",
                "Support 10,000 tech startups by 2027",
            ],
        ),
        (
            "pillar-5",
            "Cybersecurity & Privacy",
            "Ensuring secure and trusted digital environment",
            41.0,
            false,
            vec![
                "Establish national cybersecurity framework",
                "Create incident response capabilities",
            ],
        ),
        (
            "pillar-6",
            "Digital Economy",
            "Growing the digital economy contribution to GDP",
            65.0,
            false,
            vec![
                "Establish digital payment infrastructure",
                "Promote e-commerce adoption",
            ],
        ),
        (
            "pillar-7",
            "Emerging Technologies",
            "Leveraging AI, IoT, and other emerging technologies",
            28.0,
            false,
            vec!["Develop national AI strategy and framework"],
        ),
        (
            "pillar-8",
            "Digital Inclusion",
            "Ensuring equitable access to digital opportunities",
            45.0,
            false,
            vec![
                "Bridge rural-urban digital divide",
                "Ensure gender parity in digital access",
            ],
        ),
        (
            "pillar-9",
            "Smart Cities Initiative",
            "Custom pillar for urban digital transformation projects",
            38.0,
            true,
            vec![
                "Deploy IoT sensors in major cities",
                "Implement smart traffic management systems",
            ],
        ),
    ]
}

fn seed_indicators() -> Vec<SeedIndicator> {
    vec![
        SeedIndicator {
            id: "kpi-1",
            pillar_id: "pillar-1",
            name: "3MTT Program Enrollment",
            description: "Number of citizens enrolled in 3 Million Technical Talents program",
            unit: "citizens",
            department: "DED",
            current_value: 53000.0,
            target_value: 100000.0,
            quarterly_targets: Some([25000.0, 50000.0, 75000.0, 100000.0]),
            annual_target: Some(100000.0),
            yearly_targets: &[(2024, 100000.0), (2025, 120000.0), (2026, 150000.0)],
            metric_type: "#",
            reporting_frequency: "monthly",
            data_source: "LMS enrollment system",
            is_locked: false,
            is_custom: false,
        },
        SeedIndicator {
            id: "kpi-2",
            pillar_id: "pillar-1",
            name: "Digital Literacy Rate",
            description: "Percentage of adults with basic digital skills",
            unit: "%",
            department: "DLCB",
            current_value: 41.0,
            target_value: 75.0,
            quarterly_targets: None,
            annual_target: None,
            yearly_targets: &[(2024, 45.0), (2025, 55.0), (2026, 65.0), (2027, 75.0)],
            metric_type: "%",
            reporting_frequency: "quarterly",
            data_source: "National Bureau of Statistics digital literacy surveys",
            is_locked: false,
            is_custom: false,
        },
        SeedIndicator {
            id: "kpi-3",
            pillar_id: "pillar-2",
            name: "Broadband Penetration",
            description: "Percentage of households with broadband internet access",
            unit: "%",
            department: "ITIS",
            current_value: 38.0,
            target_value: 70.0,
            quarterly_targets: None,
            annual_target: None,
            yearly_targets: &[(2024, 40.0), (2025, 50.0), (2026, 60.0), (2027, 70.0)],
            metric_type: "%",
            reporting_frequency: "monthly",
            data_source: "NCC telecom infrastructure monitoring",
            is_locked: true,
            is_custom: false,
        },
        SeedIndicator {
            id: "kpi-4",
            pillar_id: "pillar-3",
            name: "Government Digital Services",
            description: "Number of government services available online",
            unit: "services",
            department: "EGDR",
            current_value: 156.0,
            target_value: 200.0,
            quarterly_targets: None,
            annual_target: None,
            yearly_targets: &[(2024, 180.0), (2025, 200.0), (2026, 220.0), (2027, 250.0)],
            metric_type: "#",
            reporting_frequency: "monthly",
            data_source: "Government services portal analytics",
            is_locked: false,
            is_custom: false,
        },
        SeedIndicator {
            id: "kpi-5",
            pillar_id: "pillar-1",
            name: "Staff Digital Training",
            description: "Number of government staff trained on digital tools monthly",
            unit: "staff",
            department: "HR",
            current_value: 856.0,
            target_value: 1200.0,
            quarterly_targets: Some([300.0, 600.0, 900.0, 1200.0]),
            annual_target: Some(1200.0),
            yearly_targets: &[(2024, 1200.0), (2025, 1500.0), (2026, 1800.0)],
            metric_type: "#",
            reporting_frequency: "monthly",
            data_source: "HR training management system",
            is_locked: false,
            is_custom: false,
        },
        SeedIndicator {
            id: "kpi-6",
            pillar_id: "pillar-4",
            name: "Digital Innovation Index",
            description: "Global ranking in digital innovation metrics",
            unit: "rank",
            department: "R&D",
            current_value: 78.0,
            target_value: 45.0,
            quarterly_targets: None,
            annual_target: None,
            yearly_targets: &[(2024, 70.0), (2025, 60.0), (2026, 50.0), (2027, 45.0)],
            metric_type: "#",
            reporting_frequency: "quarterly",
            data_source: "International innovation ranking reports",
            is_locked: false,
            is_custom: false,
        },
        SeedIndicator {
            id: "kpi-7",
            pillar_id: "pillar-5",
            name: "Cybersecurity Incidents",
            description: "Number of major cybersecurity incidents reported monthly",
            unit: "incidents",
            department: "CS",
            current_value: 12.0,
            target_value: 5.0,
            quarterly_targets: None,
            annual_target: None,
            yearly_targets: &[(2024, 60.0), (2025, 50.0), (2026, 40.0), (2027, 30.0)],
            metric_type: "#",
            reporting_frequency: "monthly",
            data_source: "NITDA cybersecurity monitoring system",
            is_locked: false,
            is_custom: false,
        },
        SeedIndicator {
            id: "kpi-8",
            pillar_id: "pillar-4",
            name: "AI Adoption Rate",
            description: "Percentage of organizations implementing AI solutions",
            unit: "%",
            department: "R&D",
            current_value: 8.0,
            target_value: 15.0,
            quarterly_targets: None,
            annual_target: None,
            yearly_targets: &[(2024, 10.0), (2025, 15.0), (2026, 25.0), (2027, 35.0)],
            metric_type: "%",
            reporting_frequency: "quarterly",
            data_source: "National AI adoption survey",
            is_locked: false,
            is_custom: true,
        },
        SeedIndicator {
            id: "kpi-9",
            pillar_id: "pillar-6",
            name: "Digital Payment Transaction Volume",
            description: "Monthly volume of digital payment transactions (in billions)",
            unit: "billion NGN",
            department: "SGF",
            current_value: 32.0,
            target_value: 50.0,
            quarterly_targets: None,
            annual_target: None,
            yearly_targets: &[(2024, 40.0), (2025, 50.0), (2026, 65.0), (2027, 80.0)],
            metric_type: "$",
            reporting_frequency: "monthly",
            data_source: "Central Bank digital payment statistics",
            is_locked: false,
            is_custom: true,
        },
    ]
}

#[allow(clippy::type_complexity)]
fn seed_submissions() -> anyhow::Result<
    Vec<(
        &'static str,
        &'static str,
        f64,
        &'static str,
        DateTime<Utc>,
        Option<(&'static str, DateTime<Utc>)>,
        Option<&'static str>,
    )>,
> {
    let at = |y, m, d, h, min| {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0)
            .single()
            .context("invalid seed timestamp")
    };

    Ok(vec![
        (
            "kpi-1",
            "2024-01",
            8500.0,
            "john.doe",
            at(2024, 1, 31, 10, 0)?,
            Some(("jane.director", at(2024, 2, 1, 9, 0)?)),
            Some("Strong start to the year"),
        ),
        (
            "kpi-1",
            "2024-02",
            9200.0,
            "john.doe",
            at(2024, 2, 29, 10, 0)?,
            Some(("jane.director", at(2024, 3, 1, 9, 0)?)),
            None,
        ),
        (
            "kpi-1",
            "2024-03",
            7300.0,
            "john.doe",
            at(2024, 3, 31, 10, 0)?,
            Some(("jane.director", at(2024, 4, 1, 8, 30)?)),
            None,
        ),
        (
            "kpi-1",
            "2024-09",
            5800.0,
            "john.doe",
            at(2024, 9, 30, 17, 0)?,
            None,
            Some("Pending director approval"),
        ),
        (
            "kpi-5",
            "2024-01",
            98.0,
            "hr.admin",
            at(2024, 1, 31, 16, 0)?,
            Some(("hr.director", at(2024, 2, 1, 10, 0)?)),
            None,
        ),
        (
            "kpi-5",
            "2024-02",
            105.0,
            "hr.admin",
            at(2024, 2, 29, 16, 0)?,
            Some(("hr.director", at(2024, 3, 1, 10, 0)?)),
            None,
        ),
        (
            "kpi-5",
            "2024-03",
            97.0,
            "hr.admin",
            at(2024, 3, 31, 16, 0)?,
            Some(("hr.director", at(2024, 4, 1, 10, 0)?)),
            None,
        ),
    ])
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;

    for (order, (id, name, description, score, is_custom, objectives)) in
        seed_pillars().into_iter().enumerate()
    {
        sqlx::query(
            r#"
            INSERT INTO kpi_tracking.pillars
            (id, name, description, overall_score, display_order, is_custom)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name,
                description = EXCLUDED.description,
                overall_score = EXCLUDED.overall_score,
                display_order = EXCLUDED.display_order
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(score)
        .bind(order as i32 + 1)
        .bind(is_custom)
        .execute(&mut *tx)
        .await?;

        for (position, objective) in objectives.into_iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO kpi_tracking.pillar_objectives (pillar_id, position, objective)
                VALUES ($1, $2, $3)
                ON CONFLICT (pillar_id, position) DO UPDATE SET objective = EXCLUDED.objective
                "#,
            )
            .bind(id)
            .bind(position as i32)
            .bind(objective)
            .execute(&mut *tx)
            .await?;
        }
    }

    for indicator in seed_indicators() {
        let quarters = indicator.quarterly_targets;
        sqlx::query(
            r#"
            INSERT INTO kpi_tracking.indicators
            (id, pillar_id, name, description, unit, department, current_value, target_value,
             q1_target, q2_target, q3_target, q4_target, annual_target,
             metric_type, reporting_frequency, data_source, is_locked, is_custom)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            ON CONFLICT (id) DO UPDATE
            SET current_value = EXCLUDED.current_value, target_value = EXCLUDED.target_value
            "#,
        )
        .bind(indicator.id)
        .bind(indicator.pillar_id)
        .bind(indicator.name)
        .bind(indicator.description)
        .bind(indicator.unit)
        .bind(indicator.department)
        .bind(indicator.current_value)
        .bind(indicator.target_value)
        .bind(quarters.map(|q| q[0]))
        .bind(quarters.map(|q| q[1]))
        .bind(quarters.map(|q| q[2]))
        .bind(quarters.map(|q| q[3]))
        .bind(indicator.annual_target)
        .bind(indicator.metric_type)
        .bind(indicator.reporting_frequency)
        .bind(indicator.data_source)
        .bind(indicator.is_locked)
        .bind(indicator.is_custom)
        .execute(&mut *tx)
        .await?;

        for (year, target) in indicator.yearly_targets {
            upsert_yearly_target(&mut tx, indicator.id, *year, *target).await?;
        }
    }

    for (indicator_id, period, value, submitted_by, submitted_at, approval, comment) in
        seed_submissions()?
    {
        sqlx::query(
            r#"
            INSERT INTO kpi_tracking.submissions
            (id, indicator_id, period, value, approved, submitted_by, submitted_at,
             approved_by, approved_at, comment)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (indicator_id, period) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(indicator_id)
        .bind(period)
        .bind(value)
        .bind(approval.is_some())
        .bind(submitted_by)
        .bind(submitted_at)
        .bind(approval.map(|(by, _)| by))
        .bind(approval.map(|(_, at)| at))
        .bind(comment)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    info!("seed data loaded");
    Ok(())
}

async fn upsert_yearly_target(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    indicator_id: &str,
    year: i32,
    target: f64,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO kpi_tracking.indicator_yearly_targets (indicator_id, year, target)
        VALUES ($1, $2, $3)
        ON CONFLICT (indicator_id, year) DO UPDATE SET target = EXCLUDED.target
        "#,
    )
    .bind(indicator_id)
    .bind(year)
    .bind(target)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn fetch_pillars(pool: &PgPool) -> anyhow::Result<Vec<Pillar>> {
    let rows = sqlx::query(
        "SELECT id, name, description, overall_score, display_order, is_custom \
         FROM kpi_tracking.pillars ORDER BY display_order, id",
    )
    .fetch_all(pool)
    .await?;

    let objective_rows = sqlx::query(
        "SELECT pillar_id, objective FROM kpi_tracking.pillar_objectives \
         ORDER BY pillar_id, position",
    )
    .fetch_all(pool)
    .await?;

    let mut objectives: HashMap<String, Vec<String>> = HashMap::new();
    for row in objective_rows {
        objectives
            .entry(row.get("pillar_id"))
            .or_default()
            .push(row.get("objective"));
    }

    let mut pillars = Vec::new();
    for row in rows {
        let id: String = row.get("id");
        pillars.push(Pillar {
            objectives: objectives.remove(&id).unwrap_or_default(),
            id,
            name: row.get("name"),
            description: row.get("description"),
            overall_score: row.get("overall_score"),
            display_order: row.get("display_order"),
            is_custom: row.get("is_custom"),
        });
    }

    Ok(pillars)
}

pub async fn fetch_indicators(
    pool: &PgPool,
    pillar_id: Option<&str>,
    department: Option<&str>,
) -> anyhow::Result<Vec<Indicator>> {
    let rows = sqlx::query(
        r#"
        SELECT id, pillar_id, name, description, unit, department, current_value, target_value,
               q1_target, q2_target, q3_target, q4_target, annual_target,
               metric_type, reporting_frequency, data_source, is_locked, is_custom
        FROM kpi_tracking.indicators
        WHERE ($1::text IS NULL OR pillar_id = $1)
          AND ($2::text IS NULL OR UPPER(department) = UPPER($2))
        ORDER BY id
        "#,
    )
    .bind(pillar_id)
    .bind(department)
    .fetch_all(pool)
    .await?;

    let mut indicators = rows
        .iter()
        .map(indicator_from_row)
        .collect::<anyhow::Result<Vec<_>>>()?;
    let ids: Vec<String> = indicators.iter().map(|i| i.id.clone()).collect();
    debug!(count = ids.len(), "loaded indicators");

    let mut targets = fetch_yearly_targets(pool, &ids).await?;
    let mut series = fetch_series(pool, &ids).await?;
    for indicator in indicators.iter_mut() {
        indicator.yearly_targets = targets.remove(&indicator.id).unwrap_or_default();
        indicator.series = series.remove(&indicator.id).unwrap_or_default();
    }

    Ok(indicators)
}

pub async fn fetch_indicator(pool: &PgPool, indicator_id: &str) -> anyhow::Result<Indicator> {
    let row = sqlx::query(
        r#"
        SELECT id, pillar_id, name, description, unit, department, current_value, target_value,
               q1_target, q2_target, q3_target, q4_target, annual_target,
               metric_type, reporting_frequency, data_source, is_locked, is_custom
        FROM kpi_tracking.indicators
        WHERE id = $1
        "#,
    )
    .bind(indicator_id)
    .fetch_optional(pool)
    .await?
    .with_context(|| format!("indicator {indicator_id} not found"))?;

    let mut indicator = indicator_from_row(&row)?;
    let ids = vec![indicator.id.clone()];
    indicator.yearly_targets = fetch_yearly_targets(pool, &ids)
        .await?
        .remove(&indicator.id)
        .unwrap_or_default();
    indicator.series = fetch_series(pool, &ids)
        .await?
        .remove(&indicator.id)
        .unwrap_or_default();
    Ok(indicator)
}

fn indicator_from_row(row: &PgRow) -> anyhow::Result<Indicator> {
    let quarters: [Option<f64>; 4] = [
        row.get("q1_target"),
        row.get("q2_target"),
        row.get("q3_target"),
        row.get("q4_target"),
    ];
    let quarterly_targets = match quarters {
        [Some(q1), Some(q2), Some(q3), Some(q4)] => Some(QuarterlyTargets { q1, q2, q3, q4 }),
        _ => None,
    };
    let metric_type: String = row.get("metric_type");
    let reporting_frequency: String = row.get("reporting_frequency");

    Ok(Indicator {
        id: row.get("id"),
        pillar_id: row.get("pillar_id"),
        name: row.get("name"),
        description: row.get("description"),
        unit: row.get("unit"),
        department: row.get("department"),
        current_value: row.get("current_value"),
        target_value: row.get("target_value"),
        quarterly_targets,
        annual_target: row.get("annual_target"),
        yearly_targets: BTreeMap::new(),
        metric_type: metric_type.parse()?,
        reporting_frequency: reporting_frequency.parse()?,
        data_source: row.get("data_source"),
        is_locked: row.get("is_locked"),
        is_custom: row.get("is_custom"),
        series: Vec::new(),
    })
}

async fn fetch_yearly_targets(
    pool: &PgPool,
    ids: &[String],
) -> anyhow::Result<HashMap<String, BTreeMap<i32, f64>>> {
    let rows = sqlx::query(
        "SELECT indicator_id, year, target FROM kpi_tracking.indicator_yearly_targets \
         WHERE indicator_id = ANY($1)",
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;

    let mut targets: HashMap<String, BTreeMap<i32, f64>> = HashMap::new();
    for row in rows {
        targets
            .entry(row.get("indicator_id"))
            .or_default()
            .insert(row.get("year"), row.get("target"));
    }
    Ok(targets)
}

async fn fetch_series(
    pool: &PgPool,
    ids: &[String],
) -> anyhow::Result<HashMap<String, Vec<TimeSeriesEntry>>> {
    let rows = sqlx::query(
        r#"
        SELECT indicator_id, period, value, approved, submitted_by, submitted_at,
               approved_by, approved_at, comment, evidence
        FROM kpi_tracking.submissions
        WHERE indicator_id = ANY($1)
        ORDER BY indicator_id, period
        "#,
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;

    let mut series: HashMap<String, Vec<TimeSeriesEntry>> = HashMap::new();
    for row in rows {
        let period: String = row.get("period");
        let entry = TimeSeriesEntry {
            period: Period::parse(&period)?,
            value: row.get("value"),
            approved: row.get("approved"),
            submitted_by: row.get("submitted_by"),
            submitted_at: row.get("submitted_at"),
            approved_by: row.get("approved_by"),
            approved_at: row.get("approved_at"),
            comment: row.get("comment"),
            evidence: row.get("evidence"),
        };
        series.entry(row.get("indicator_id")).or_default().push(entry);
    }
    Ok(series)
}

#[derive(Debug, Clone)]
pub struct Submission {
    pub indicator_id: String,
    pub period: Period,
    pub value: f64,
    pub submitted_by: String,
    pub comment: Option<String>,
    pub evidence: Vec<String>,
}

impl Submission {
    pub fn from_draft(
        indicator_id: &str,
        period: Period,
        submitted_by: &str,
        draft: DraftInput,
    ) -> anyhow::Result<Self> {
        let value = draft
            .value
            .with_context(|| format!("a value is required to submit {indicator_id}"))?;
        if !value.is_finite() {
            anyhow::bail!("value for {indicator_id} must be a finite number");
        }
        if value < 0.0 {
            anyhow::bail!("value for {indicator_id} cannot be negative, got {value}");
        }
        if submitted_by.trim().is_empty() {
            anyhow::bail!("submitter is required");
        }

        Ok(Self {
            indicator_id: indicator_id.to_string(),
            period,
            value,
            submitted_by: submitted_by.trim().to_string(),
            comment: draft.comment.filter(|c| !c.trim().is_empty()),
            evidence: draft.evidence.unwrap_or_default(),
        })
    }
}

/// Records a pending submission. A pending value for the same period is
/// replaced; an approved one is left untouched and the call fails.
pub async fn submit(pool: &PgPool, submission: &Submission) -> anyhow::Result<()> {
    let locked: bool = sqlx::query("SELECT is_locked FROM kpi_tracking.indicators WHERE id = $1")
        .bind(&submission.indicator_id)
        .fetch_optional(pool)
        .await?
        .with_context(|| format!("indicator {} not found", submission.indicator_id))?
        .get("is_locked");

    if locked {
        anyhow::bail!("indicator {} is locked for data entry", submission.indicator_id);
    }

    let result = sqlx::query(
        r#"
        INSERT INTO kpi_tracking.submissions
        (id, indicator_id, period, value, approved, submitted_by, submitted_at, comment, evidence)
        VALUES ($1, $2, $3, $4, FALSE, $5, NOW(), $6, $7)
        ON CONFLICT (indicator_id, period) DO UPDATE
        SET value = EXCLUDED.value,
            submitted_by = EXCLUDED.submitted_by,
            submitted_at = EXCLUDED.submitted_at,
            comment = EXCLUDED.comment,
            evidence = EXCLUDED.evidence
        WHERE NOT kpi_tracking.submissions.approved
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&submission.indicator_id)
    .bind(submission.period.to_string())
    .bind(submission.value)
    .bind(&submission.submitted_by)
    .bind(&submission.comment)
    .bind(&submission.evidence)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        anyhow::bail!(
            "{} for {} is already approved",
            submission.period,
            submission.indicator_id
        );
    }

    info!(
        indicator = %submission.indicator_id,
        period = %submission.period,
        value = submission.value,
        "submission recorded"
    );
    Ok(())
}

pub async fn approve(
    pool: &PgPool,
    indicator_id: &str,
    period: &Period,
    approved_by: &str,
) -> anyhow::Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE kpi_tracking.submissions
        SET approved = TRUE, approved_by = $3, approved_at = NOW()
        WHERE indicator_id = $1 AND period = $2 AND NOT approved
        "#,
    )
    .bind(indicator_id)
    .bind(period.to_string())
    .bind(approved_by)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        anyhow::bail!("no pending submission for {indicator_id} in {period}");
    }

    info!(indicator = %indicator_id, %period, approved_by, "submission approved");
    Ok(())
}

pub async fn create_indicator(
    pool: &PgPool,
    indicator: &NewIndicator,
    created_by: &str,
) -> anyhow::Result<()> {
    indicator.validate()?;

    let mut tx = pool.begin().await?;
    let result = sqlx::query(
        r#"
        INSERT INTO kpi_tracking.indicators
        (id, pillar_id, name, description, unit, department, current_value, target_value,
         metric_type, reporting_frequency, data_source, is_custom, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, 0, $7, $8, $9, $10, TRUE, $11)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(&indicator.id)
    .bind(&indicator.pillar_id)
    .bind(indicator.name.trim())
    .bind(indicator.description.trim())
    .bind(&indicator.unit)
    .bind(indicator.department.trim())
    .bind(indicator.headline_target())
    .bind(indicator.metric_type.as_str())
    .bind(indicator.reporting_frequency.as_str())
    .bind(&indicator.data_source)
    .bind(created_by)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        anyhow::bail!("indicator {} already exists", indicator.id);
    }

    for (year, target) in &indicator.yearly_targets {
        upsert_yearly_target(&mut tx, &indicator.id, *year, *target).await?;
    }

    tx.commit().await?;
    info!(indicator = %indicator.id, created_by, "indicator created");
    Ok(())
}

/// Only custom indicators without any submissions can be removed.
pub async fn delete_indicator(pool: &PgPool, indicator_id: &str) -> anyhow::Result<()> {
    let row = sqlx::query(
        r#"
        SELECT i.is_custom,
               (SELECT COUNT(*) FROM kpi_tracking.submissions s WHERE s.indicator_id = i.id) AS submissions
        FROM kpi_tracking.indicators i
        WHERE i.id = $1
        "#,
    )
    .bind(indicator_id)
    .fetch_optional(pool)
    .await?
    .with_context(|| format!("indicator {indicator_id} not found"))?;

    let is_custom: bool = row.get("is_custom");
    let submissions: i64 = row.get("submissions");

    if !is_custom {
        anyhow::bail!("indicator {indicator_id} is part of the baseline plan and cannot be deleted");
    }
    if submissions > 0 {
        anyhow::bail!("indicator {indicator_id} has {submissions} submissions and cannot be deleted");
    }

    sqlx::query("DELETE FROM kpi_tracking.indicators WHERE id = $1")
        .bind(indicator_id)
        .execute(pool)
        .await?;

    info!(indicator = %indicator_id, "indicator deleted");
    Ok(())
}

pub async fn create_pillar(
    pool: &PgPool,
    pillar: &NewPillar,
    created_by: &str,
) -> anyhow::Result<()> {
    pillar.validate()?;

    let mut tx = pool.begin().await?;
    let next_order: i32 = sqlx::query(
        "SELECT COALESCE(MAX(display_order), 0) + 1 AS next_order FROM kpi_tracking.pillars",
    )
    .fetch_one(&mut *tx)
    .await?
    .get("next_order");

    let result = sqlx::query(
        r#"
        INSERT INTO kpi_tracking.pillars
        (id, name, description, overall_score, display_order, is_custom, created_by)
        VALUES ($1, $2, $3, 0, $4, TRUE, $5)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(&pillar.id)
    .bind(pillar.name.trim())
    .bind(pillar.description.trim())
    .bind(next_order)
    .bind(created_by)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        anyhow::bail!("pillar {} already exists", pillar.id);
    }

    for (position, objective) in pillar.cleaned_objectives().iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO kpi_tracking.pillar_objectives (pillar_id, position, objective)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(&pillar.id)
        .bind(position as i32)
        .bind(objective)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    info!(pillar = %pillar.id, display_order = next_order, created_by, "pillar created");
    Ok(())
}

/// Refuses to delete a pillar that still owns KPIs.
pub async fn delete_pillar(pool: &PgPool, pillar_id: &str) -> anyhow::Result<()> {
    let row = sqlx::query(
        r#"
        SELECT (SELECT COUNT(*) FROM kpi_tracking.indicators i WHERE i.pillar_id = p.id) AS indicators
        FROM kpi_tracking.pillars p
        WHERE p.id = $1
        "#,
    )
    .bind(pillar_id)
    .fetch_optional(pool)
    .await?
    .with_context(|| format!("pillar {pillar_id} not found"))?;

    catalog::ensure_pillar_empty(pillar_id, row.get("indicators"))?;

    sqlx::query("DELETE FROM kpi_tracking.pillars WHERE id = $1")
        .bind(pillar_id)
        .execute(pool)
        .await?;

    info!(pillar = %pillar_id, "pillar deleted");
    Ok(())
}

/// Swaps a pillar with its neighbour and renumbers the display order.
pub async fn move_pillar(
    pool: &PgPool,
    pillar_id: &str,
    direction: MoveDirection,
) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;
    let order: Vec<String> = sqlx::query(
        "SELECT id FROM kpi_tracking.pillars ORDER BY display_order, id FOR UPDATE",
    )
    .fetch_all(&mut *tx)
    .await?
    .iter()
    .map(|row| row.get("id"))
    .collect();

    let reordered = catalog::reorder(&order, pillar_id, direction)?;
    if reordered == order {
        debug!(pillar = %pillar_id, "pillar already at the edge");
    }

    for (index, id) in reordered.iter().enumerate() {
        sqlx::query("UPDATE kpi_tracking.pillars SET display_order = $2 WHERE id = $1")
            .bind(id)
            .bind(index as i32 + 1)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    info!(pillar = %pillar_id, ?direction, "pillar order updated");
    Ok(())
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        indicator_id: String,
        period: String,
        value: f64,
        approved: bool,
        submitted_by: String,
        submitted_at: DateTime<Utc>,
        approved_by: Option<String>,
        approved_at: Option<DateTime<Utc>>,
        comment: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result?;
        let period = Period::parse(&row.period)
            .with_context(|| format!("row {} of {}", line + 1, csv_path.display()))?;

        if !row.value.is_finite() || row.value < 0.0 {
            anyhow::bail!(
                "row {} of {}: value {} must be a non-negative number",
                line + 1,
                csv_path.display(),
                row.value
            );
        }

        if row.approved && row.approved_by.is_none() {
            warn!(indicator = %row.indicator_id, %period, "approved row without approver");
        }

        let result = sqlx::query(
            r#"
            INSERT INTO kpi_tracking.submissions
            (id, indicator_id, period, value, approved, submitted_by, submitted_at,
             approved_by, approved_at, comment)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (indicator_id, period) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&row.indicator_id)
        .bind(period.to_string())
        .bind(row.value)
        .bind(row.approved)
        .bind(&row.submitted_by)
        .bind(row.submitted_at)
        .bind(&row.approved_by)
        .bind(row.approved_at)
        .bind(&row.comment)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        } else {
            debug!(indicator = %row.indicator_id, %period, "duplicate period skipped");
        }
    }

    Ok(inserted)
}
