use chrono::NaiveDateTime;
use sqlx::{PgPool, Row};
use tracing::debug;

use crate::error::ReportError;
use crate::models::{Agent, AgentActivity, Call, SurveyedCall};
use crate::window::TimeWindow;

/// Optional narrowing for call fetches. An absent `agent_id` means all
/// agents; an absent `window` means all time.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallFilter {
    pub agent_id: Option<i64>,
    pub window: Option<TimeWindow>,
}

pub async fn init_db(pool: &PgPool) -> Result<(), ReportError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|err| ReportError::DataAccess {
            stage: "migrate",
            source: err.into(),
        })?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> Result<(), ReportError> {
    let agents = vec![
        (1i64, "Ana", "Torres"),
        (2i64, "Luis", "Mendoza"),
        (3i64, "Carla", "Reyes"),
    ];

    for (id, name, surname) in agents {
        sqlx::query(
            r#"
            INSERT INTO call_reports.agents (id, name, surname)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name, surname = EXCLUDED.surname
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(surname)
        .execute(pool)
        .await?;
    }

    // (id, agent, started_at, duration, active, sentiment, rating)
    let calls: Vec<(i64, i64, &str, i32, bool, Option<&str>, Option<i32>)> = vec![
        (1, 1, "2023-05-21 09:15:00", 240, false, Some("positive"), Some(4)),
        (2, 1, "2023-05-21 11:40:00", 180, false, Some("positive"), Some(5)),
        (3, 2, "2023-05-21 10:05:00", 300, false, Some("neutral"), Some(3)),
        (4, 2, "2023-05-20 16:30:00", 150, false, Some("negative"), Some(2)),
        (5, 3, "2023-05-19 14:00:00", 420, true, Some("neutral"), None),
        (6, 1, "2023-04-28 12:20:00", 200, false, Some("positive"), Some(5)),
        (7, 3, "2023-04-15 09:45:00", 90, false, None, Some(4)),
    ];

    for (id, agent_id, started_at, duration_secs, active, sentiment, rating) in calls {
        let started_at = NaiveDateTime::parse_from_str(started_at, "%Y-%m-%d %H:%M:%S")
            .map_err(|_| ReportError::invalid_input(format!("bad seed timestamp '{started_at}'")))?;

        sqlx::query(
            r#"
            INSERT INTO call_reports.calls
            (id, agent_id, started_at, duration_secs, active, sentiment, customer_phone)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(agent_id)
        .bind(started_at)
        .bind(duration_secs)
        .bind(active)
        .bind(sentiment)
        .bind("5512345678")
        .execute(pool)
        .await?;

        if let Some(rating) = rating {
            sqlx::query(
                r#"
                INSERT INTO call_reports.surveys (id, call_id, rating)
                VALUES ($1, $2, $3)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(id)
            .bind(id)
            .bind(rating)
            .execute(pool)
            .await?;
        }
    }

    for table in ["agents", "calls", "surveys"] {
        sqlx::query(&format!(
            "SELECT setval(pg_get_serial_sequence('call_reports.{table}', 'id'), \
             (SELECT COALESCE(MAX(id), 1) FROM call_reports.{table}))"
        ))
        .fetch_one(pool)
        .await?;
    }

    Ok(())
}

pub async fn create_agent(pool: &PgPool, name: &str, surname: &str) -> Result<Agent, ReportError> {
    let row = sqlx::query(
        "INSERT INTO call_reports.agents (name, surname) VALUES ($1, $2) RETURNING id",
    )
    .bind(name)
    .bind(surname)
    .fetch_one(pool)
    .await?;

    Ok(Agent {
        id: row.get("id"),
        name: name.to_string(),
        surname: surname.to_string(),
    })
}

pub async fn get_agent(pool: &PgPool, id: i64) -> Result<Option<Agent>, ReportError> {
    let row = sqlx::query("SELECT id, name, surname FROM call_reports.agents WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|row| Agent {
        id: row.get("id"),
        name: row.get("name"),
        surname: row.get("surname"),
    }))
}

pub async fn list_agents(pool: &PgPool) -> Result<Vec<Agent>, ReportError> {
    let rows = sqlx::query("SELECT id, name, surname FROM call_reports.agents ORDER BY id")
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| Agent {
            id: row.get("id"),
            name: row.get("name"),
            surname: row.get("surname"),
        })
        .collect())
}

pub async fn list_calls(pool: &PgPool, filter: CallFilter) -> Result<Vec<Call>, ReportError> {
    let mut query = String::from(
        "SELECT id, agent_id, started_at, duration_secs, active, sentiment \
         FROM call_reports.calls WHERE TRUE",
    );

    let mut placeholder = 0;
    if filter.agent_id.is_some() {
        placeholder += 1;
        query.push_str(&format!(" AND agent_id = ${placeholder}"));
    }
    if filter.window.is_some() {
        query.push_str(&format!(
            " AND started_at >= ${} AND started_at < ${}",
            placeholder + 1,
            placeholder + 2
        ));
    }
    query.push_str(" ORDER BY started_at, id");

    let mut rows = sqlx::query(&query);
    if let Some(agent_id) = filter.agent_id {
        rows = rows.bind(agent_id);
    }
    if let Some(window) = filter.window {
        rows = rows.bind(window.start).bind(window.end);
    }

    let records = rows.fetch_all(pool).await?;
    debug!(calls = records.len(), "fetched call records");

    Ok(records
        .into_iter()
        .map(|row| Call {
            id: row.get("id"),
            agent_id: row.get("agent_id"),
            started_at: row.get("started_at"),
            duration_secs: row.get("duration_secs"),
            active: row.get("active"),
            sentiment: row.get("sentiment"),
        })
        .collect())
}

/// Calls joined with their survey rating and the agent's display fields in
/// one round trip, so rating aggregations never re-query per call.
pub async fn list_calls_with_survey(
    pool: &PgPool,
    filter: CallFilter,
) -> Result<Vec<SurveyedCall>, ReportError> {
    let mut query = String::from(
        "SELECT c.id, c.agent_id, c.started_at, c.duration_secs, s.rating, \
         a.name, a.surname \
         FROM call_reports.calls c \
         JOIN call_reports.agents a ON a.id = c.agent_id \
         LEFT JOIN call_reports.surveys s ON s.call_id = c.id \
         WHERE TRUE",
    );

    let mut placeholder = 0;
    if filter.agent_id.is_some() {
        placeholder += 1;
        query.push_str(&format!(" AND c.agent_id = ${placeholder}"));
    }
    if filter.window.is_some() {
        query.push_str(&format!(
            " AND c.started_at >= ${} AND c.started_at < ${}",
            placeholder + 1,
            placeholder + 2
        ));
    }
    query.push_str(" ORDER BY c.started_at, c.id");

    let mut rows = sqlx::query(&query);
    if let Some(agent_id) = filter.agent_id {
        rows = rows.bind(agent_id);
    }
    if let Some(window) = filter.window {
        rows = rows.bind(window.start).bind(window.end);
    }

    let records = rows.fetch_all(pool).await?;
    debug!(calls = records.len(), "fetched call/survey records");

    Ok(records
        .into_iter()
        .map(|row| SurveyedCall {
            call_id: row.get("id"),
            agent_id: row.get("agent_id"),
            started_at: row.get("started_at"),
            duration_secs: row.get("duration_secs"),
            rating: row.get("rating"),
            agent_name: row.get("name"),
            agent_surname: row.get("surname"),
        })
        .collect())
}

/// Active/inactive counts over each agent's most recent call.
pub async fn agent_activity(pool: &PgPool) -> Result<AgentActivity, ReportError> {
    let row = sqlx::query(
        r#"
        SELECT COUNT(*) FILTER (WHERE latest.active) AS active,
               COUNT(*) FILTER (WHERE NOT latest.active) AS inactive
        FROM (
            SELECT DISTINCT ON (agent_id) agent_id, active
            FROM call_reports.calls
            ORDER BY agent_id, started_at DESC
        ) AS latest
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(AgentActivity {
        active: row.get("active"),
        inactive: row.get("inactive"),
    })
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> Result<usize, ReportError> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        agent_id: i64,
        started_at: NaiveDateTime,
        duration_secs: i32,
        active: bool,
        sentiment: Option<String>,
        customer_phone: Option<String>,
        rating: Option<i32>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .map_err(|err| ReportError::invalid_input(format!("cannot read csv: {err}")))?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row =
            result.map_err(|err| ReportError::invalid_input(format!("bad csv row: {err}")))?;

        let call_id: i64 = sqlx::query(
            r#"
            INSERT INTO call_reports.calls
            (agent_id, started_at, duration_secs, active, sentiment, customer_phone)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(row.agent_id)
        .bind(row.started_at)
        .bind(row.duration_secs)
        .bind(row.active)
        .bind(&row.sentiment)
        .bind(&row.customer_phone)
        .fetch_one(pool)
        .await?
        .get("id");

        if let Some(rating) = row.rating {
            sqlx::query("INSERT INTO call_reports.surveys (call_id, rating) VALUES ($1, $2)")
                .bind(call_id)
                .bind(rating)
                .execute(pool)
                .await?;
        }

        inserted += 1;
    }

    Ok(inserted)
}
