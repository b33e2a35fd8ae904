use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Agent {
    pub id: i64,
    pub name: String,
    pub surname: String,
}

impl Agent {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.name, self.surname)
    }
}

#[derive(Debug, Clone)]
pub struct Call {
    pub id: i64,
    pub agent_id: i64,
    pub started_at: NaiveDateTime,
    pub duration_secs: i32,
    pub active: bool,
    pub sentiment: Option<String>,
}

/// One row of the batched call/survey/agent join: a call plus its survey
/// rating (if any) and the agent's display fields.
#[derive(Debug, Clone)]
pub struct SurveyedCall {
    pub call_id: i64,
    pub agent_id: i64,
    pub started_at: NaiveDateTime,
    pub duration_secs: i32,
    pub rating: Option<i32>,
    pub agent_name: String,
    pub agent_surname: String,
}

impl SurveyedCall {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.agent_name, self.agent_surname)
    }
}

/// Per-key accumulation produced by a single grouping pass. The label is the
/// display name observed on the key's first occurrence.
#[derive(Debug, Clone)]
pub struct GroupAggregate {
    pub key: String,
    pub label: String,
    pub sum: f64,
    pub count: u64,
}

impl GroupAggregate {
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub key: String,
    pub label: String,
    pub value: f64,
    pub rank: u32,
}

/// Display-ready per-agent rating average (2-decimal value).
#[derive(Debug, Clone, Serialize)]
pub struct RatingAverage {
    pub agent: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyDuration {
    pub year: i32,
    pub month: u32,
    pub month_name: &'static str,
    pub avg_duration_secs: f64,
}

/// Active/inactive split of agents by the state of their most recent call.
#[derive(Debug, Clone, Serialize)]
pub struct AgentActivity {
    pub active: i64,
    pub inactive: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmergencyAlert {
    pub topic: &'static str,
    pub id: i64,
    pub name: String,
    pub surname: String,
}

impl EmergencyAlert {
    pub fn new(id: i64, name: String, surname: String) -> Self {
        EmergencyAlert {
            topic: "EMERGENCIA",
            id,
            name,
            surname,
        }
    }
}
