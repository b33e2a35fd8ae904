use sqlx::PgPool;

use crate::db::{self, CallFilter};
use crate::error::ReportError;
use crate::leaderboard::{build_leaderboard, rank_of};
use crate::models::{
    Agent, GroupAggregate, LeaderboardEntry, MonthlyDuration, RatingAverage, SurveyedCall,
};
use crate::stats;
use crate::window;

/// Every agent-scoped query resolves the agent before touching call data,
/// so a bad id is reported as `NotFound` rather than an empty aggregate.
async fn require_agent(pool: &PgPool, id: i64) -> Result<Agent, ReportError> {
    resolve_agent(db::get_agent(pool, id).await?, id)
}

fn resolve_agent(agent: Option<Agent>, id: i64) -> Result<Agent, ReportError> {
    agent.ok_or_else(|| ReportError::not_found(format!("agent {id} does not exist")))
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// Pure row-to-metric helpers. The async queries below only fetch and
// delegate here, which keeps the interesting logic testable without a
// database.

/// Average rating per agent, keyed by agent id. Calls without a survey do
/// not contribute.
pub fn rating_leaderboard(rows: &[SurveyedCall]) -> Vec<LeaderboardEntry> {
    let groups = stats::group_by(
        rows,
        |call| (call.agent_id.to_string(), call.display_name()),
        |call| call.rating.map(f64::from),
    );
    build_leaderboard(groups, GroupAggregate::average)
}

/// Call volume per agent, keyed by agent id; every call counts.
pub fn call_count_leaderboard(rows: &[SurveyedCall]) -> Vec<LeaderboardEntry> {
    let groups = stats::group_by(
        rows,
        |call| (call.agent_id.to_string(), call.display_name()),
        |_| Some(1.0),
    );
    build_leaderboard(groups, |group| group.count as f64)
}

/// Call volume keyed by display name, for the rank-by-name query.
pub fn call_count_leaderboard_by_name(rows: &[SurveyedCall]) -> Vec<LeaderboardEntry> {
    let groups = stats::group_by(
        rows,
        |call| (call.display_name(), call.display_name()),
        |_| Some(1.0),
    );
    build_leaderboard(groups, |group| group.count as f64)
}

/// Per-agent average ratings in grouping order, rounded for display.
/// A window with no calls at all is `NotFound`, not an empty list.
pub fn rating_averages(
    rows: &[SurveyedCall],
    missing: impl Into<String>,
) -> Result<Vec<RatingAverage>, ReportError> {
    if rows.is_empty() {
        return Err(ReportError::not_found(missing));
    }
    Ok(stats::group_by(
        rows,
        |call| (call.agent_id.to_string(), call.display_name()),
        |call| call.rating.map(f64::from),
    )
    .into_iter()
    .map(|group| RatingAverage {
        value: round2(group.average()),
        agent: group.label,
    })
    .collect())
}

fn ratings(rows: &[SurveyedCall]) -> Vec<f64> {
    rows.iter().filter_map(|call| call.rating.map(f64::from)).collect()
}

// The empty-window and not-ranked decisions live here, on plain rows and
// boards, so the `NotFound` paths are exercised without a database.

/// Mean rating over a window's calls; a window with no calls is `NotFound`.
pub fn average_rating(
    rows: &[SurveyedCall],
    missing: impl Into<String>,
) -> Result<f64, ReportError> {
    if rows.is_empty() {
        return Err(ReportError::not_found(missing));
    }
    Ok(stats::average(&ratings(rows)))
}

/// Daily rating leaderboard over a non-empty window.
pub fn ranked_by_rating(
    rows: &[SurveyedCall],
    missing: impl Into<String>,
) -> Result<Vec<LeaderboardEntry>, ReportError> {
    if rows.is_empty() {
        return Err(ReportError::not_found(missing));
    }
    Ok(rating_leaderboard(rows))
}

/// Daily call-volume leaderboard (keyed by display name) over a non-empty
/// window.
pub fn ranked_by_call_volume(
    rows: &[SurveyedCall],
    missing: impl Into<String>,
) -> Result<Vec<LeaderboardEntry>, ReportError> {
    if rows.is_empty() {
        return Err(ReportError::not_found(missing));
    }
    Ok(call_count_leaderboard_by_name(rows))
}

/// The board's rank-1 entry; an empty board (no records, or no surveyed
/// records when the metric needs surveys) is `NotFound`.
pub fn top_entry(
    board: Vec<LeaderboardEntry>,
    missing: impl Into<String>,
) -> Result<LeaderboardEntry, ReportError> {
    board
        .into_iter()
        .next()
        .ok_or_else(|| ReportError::not_found(missing.into()))
}

/// 1-based rank for a key, distinguishing "not ranked in this window" from
/// the empty-window case handled upstream.
pub fn rank_on(
    board: &[LeaderboardEntry],
    key: &str,
    missing: impl Into<String>,
) -> Result<u32, ReportError> {
    rank_of(board, key).ok_or_else(|| ReportError::not_found(missing.into()))
}

// Facade queries.

/// Average survey rating for one agent on one calendar day.
pub async fn daily_rating_average(
    pool: &PgPool,
    agent_id: i64,
    date: &str,
) -> Result<f64, ReportError> {
    require_agent(pool, agent_id).await?;
    let win = window::single_day(date)?;
    let rows = db::list_calls_with_survey(
        pool,
        CallFilter {
            agent_id: Some(agent_id),
            window: Some(win),
        },
    )
    .await?;

    average_rating(&rows, format!("no calls for agent {agent_id} on {date}"))
}

/// All-time average rating for one agent, across every surveyed call.
pub async fn overall_rating_average(pool: &PgPool, agent_id: i64) -> Result<f64, ReportError> {
    require_agent(pool, agent_id).await?;
    let rows = db::list_calls_with_survey(
        pool,
        CallFilter {
            agent_id: Some(agent_id),
            window: None,
        },
    )
    .await?;

    average_rating(&rows, format!("no calls recorded for agent {agent_id}"))
}

/// Best-rated agent over the trailing month ending at `date`.
pub async fn best_rated_agent_of_month(
    pool: &PgPool,
    date: &str,
) -> Result<LeaderboardEntry, ReportError> {
    let win = window::trailing_month(date)?;
    let rows = db::list_calls_with_survey(
        pool,
        CallFilter {
            agent_id: None,
            window: Some(win),
        },
    )
    .await?;

    top_entry(
        rating_leaderboard(&rows),
        format!("no surveyed calls in the month before {date}"),
    )
}

/// Agent with the most calls on one calendar day.
pub async fn busiest_agent_of_day(
    pool: &PgPool,
    date: &str,
) -> Result<LeaderboardEntry, ReportError> {
    let win = window::single_day(date)?;
    let rows = db::list_calls_with_survey(
        pool,
        CallFilter {
            agent_id: None,
            window: Some(win),
        },
    )
    .await?;

    top_entry(call_count_leaderboard(&rows), format!("no calls on {date}"))
}

/// Full ranked list of agents by average rating on one day.
pub async fn daily_rating_leaderboard(
    pool: &PgPool,
    date: &str,
) -> Result<Vec<LeaderboardEntry>, ReportError> {
    let win = window::single_day(date)?;
    let rows = db::list_calls_with_survey(
        pool,
        CallFilter {
            agent_id: None,
            window: Some(win),
        },
    )
    .await?;

    ranked_by_rating(&rows, format!("no calls on {date}"))
}

/// One agent's 1-based position on the daily rating leaderboard.
pub async fn daily_rating_rank(
    pool: &PgPool,
    date: &str,
    agent_id: i64,
) -> Result<u32, ReportError> {
    let board = daily_rating_leaderboard(pool, date).await?;
    rank_on(
        &board,
        &agent_id.to_string(),
        format!("agent {agent_id} is not ranked on {date}"),
    )
}

/// Ranked call volume per display name on one day.
pub async fn daily_call_leaderboard(
    pool: &PgPool,
    date: &str,
) -> Result<Vec<LeaderboardEntry>, ReportError> {
    let win = window::single_day(date)?;
    let rows = db::list_calls_with_survey(
        pool,
        CallFilter {
            agent_id: None,
            window: Some(win),
        },
    )
    .await?;

    ranked_by_call_volume(&rows, format!("no calls on {date}"))
}

/// One display name's position on the daily call-volume leaderboard.
pub async fn daily_call_rank(pool: &PgPool, date: &str, name: &str) -> Result<u32, ReportError> {
    let board = daily_call_leaderboard(pool, date).await?;
    rank_on(&board, name, format!("'{name}' is not ranked on {date}"))
}

/// Per-agent average ratings over the trailing month ending at `date`.
pub async fn monthly_rating_averages(
    pool: &PgPool,
    date: &str,
) -> Result<Vec<RatingAverage>, ReportError> {
    let win = window::trailing_month(date)?;
    let rows = db::list_calls_with_survey(
        pool,
        CallFilter {
            agent_id: None,
            window: Some(win),
        },
    )
    .await?;

    rating_averages(&rows, format!("no calls in the month before {date}"))
}

/// Most frequent sentiment label across all of an agent's calls.
pub async fn sentiment_mode(pool: &PgPool, agent_id: i64) -> Result<Option<String>, ReportError> {
    require_agent(pool, agent_id).await?;
    let calls = db::list_calls(
        pool,
        CallFilter {
            agent_id: Some(agent_id),
            window: None,
        },
    )
    .await?;

    let labels: Vec<String> = calls.into_iter().filter_map(|call| call.sentiment).collect();
    Ok(stats::mode(&labels))
}

/// All-time average call duration for one agent, formatted "MM:SS";
/// "00:00" when the agent has no calls.
pub async fn average_call_duration(pool: &PgPool, agent_id: i64) -> Result<String, ReportError> {
    require_agent(pool, agent_id).await?;
    let calls = db::list_calls(
        pool,
        CallFilter {
            agent_id: Some(agent_id),
            window: None,
        },
    )
    .await?;

    if calls.is_empty() {
        return Ok("00:00".to_string());
    }
    let durations: Vec<f64> = calls.iter().map(|call| call.duration_secs as f64).collect();
    Ok(stats::format_duration(stats::average(&durations)))
}

/// Average call duration per calendar month over the trailing five months.
pub async fn monthly_average_durations(
    pool: &PgPool,
    agent_id: i64,
) -> Result<Vec<MonthlyDuration>, ReportError> {
    require_agent(pool, agent_id).await?;
    let win = window::trailing_five_months()?;
    let rows = db::list_calls_with_survey(
        pool,
        CallFilter {
            agent_id: Some(agent_id),
            window: Some(win),
        },
    )
    .await?;

    Ok(stats::group_durations_by_month(&rows))
}

/// Number of calls an agent handled on one calendar day.
pub async fn daily_call_count(
    pool: &PgPool,
    agent_id: i64,
    date: &str,
) -> Result<usize, ReportError> {
    require_agent(pool, agent_id).await?;
    let win = window::single_day(date)?;
    let calls = db::list_calls(
        pool,
        CallFilter {
            agent_id: Some(agent_id),
            window: Some(win),
        },
    )
    .await?;
    Ok(calls.len())
}

/// All-time call count for one agent.
pub async fn total_call_count(pool: &PgPool, agent_id: i64) -> Result<usize, ReportError> {
    require_agent(pool, agent_id).await?;
    let calls = db::list_calls(
        pool,
        CallFilter {
            agent_id: Some(agent_id),
            window: None,
        },
    )
    .await?;
    Ok(calls.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn row(agent_id: i64, name: &str, started_at: &str, rating: Option<i32>) -> SurveyedCall {
        SurveyedCall {
            call_id: 0,
            agent_id,
            started_at: NaiveDateTime::parse_from_str(started_at, "%Y-%m-%d %H:%M:%S").unwrap(),
            duration_secs: 120,
            rating,
            agent_name: name.to_string(),
            agent_surname: "García".to_string(),
        }
    }

    #[test]
    fn two_rated_calls_average_to_four_point_five() {
        let rows = vec![
            row(1, "Ana", "2023-05-21 09:00:00", Some(4)),
            row(1, "Ana", "2023-05-21 11:00:00", Some(5)),
        ];
        assert_eq!(stats::average(&ratings(&rows)), 4.5);
    }

    #[test]
    fn call_count_leaderboard_ranks_busier_agent_first() {
        let rows = vec![
            row(2, "Luis", "2023-05-21 10:00:00", None),
            row(1, "Ana", "2023-05-21 09:00:00", Some(4)),
            row(1, "Ana", "2023-05-21 11:00:00", Some(5)),
        ];
        let board = call_count_leaderboard(&rows);
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].key, "1");
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[0].value, 2.0);
        assert_eq!(board[1].key, "2");
        assert_eq!(board[1].rank, 2);
        assert_eq!(board[1].value, 1.0);
    }

    #[test]
    fn rating_leaderboard_skips_unrated_calls() {
        let rows = vec![
            row(1, "Ana", "2023-05-21 09:00:00", Some(3)),
            row(1, "Ana", "2023-05-21 10:00:00", None),
            row(2, "Luis", "2023-05-21 11:00:00", Some(5)),
        ];
        let board = rating_leaderboard(&rows);
        assert_eq!(board[0].key, "2");
        assert_eq!(board[0].value, 5.0);
        assert_eq!(board[1].key, "1");
        assert_eq!(board[1].value, 3.0);
    }

    #[test]
    fn rating_leaderboard_omits_agents_with_no_surveys() {
        let rows = vec![
            row(1, "Ana", "2023-05-21 09:00:00", Some(3)),
            row(2, "Luis", "2023-05-21 11:00:00", None),
        ];
        let board = rating_leaderboard(&rows);
        assert_eq!(board.len(), 1);
        assert_eq!(rank_of(&board, "2"), None);
    }

    #[test]
    fn name_keyed_board_ranks_by_display_name() {
        let rows = vec![
            row(1, "Ana", "2023-05-21 09:00:00", None),
            row(1, "Ana", "2023-05-21 10:00:00", None),
            row(2, "Luis", "2023-05-21 11:00:00", None),
        ];
        let board = call_count_leaderboard_by_name(&rows);
        assert_eq!(board[0].key, "Ana García");
        assert_eq!(rank_of(&board, "Luis García"), Some(2));
    }

    #[test]
    fn rating_averages_round_to_two_decimals() {
        let rows = vec![
            row(1, "Ana", "2023-05-21 09:00:00", Some(4)),
            row(1, "Ana", "2023-05-21 10:00:00", Some(4)),
            row(1, "Ana", "2023-05-21 11:00:00", Some(5)),
        ];
        let averages = rating_averages(&rows, "no calls").unwrap();
        assert_eq!(averages.len(), 1);
        assert_eq!(averages[0].agent, "Ana García");
        assert_eq!(averages[0].value, 4.33);
    }

    #[test]
    fn unknown_agent_resolves_to_not_found() {
        let err = resolve_agent(None, 99).unwrap_err();
        assert!(matches!(err, ReportError::NotFound(_)));

        let agent = Agent {
            id: 1,
            name: "Ana".to_string(),
            surname: "García".to_string(),
        };
        assert_eq!(resolve_agent(Some(agent), 1).unwrap().id, 1);
    }

    #[test]
    fn empty_window_is_not_found_before_ranking() {
        assert!(matches!(
            ranked_by_rating(&[], "no calls on 2023-05-21").unwrap_err(),
            ReportError::NotFound(_)
        ));
        assert!(matches!(
            ranked_by_call_volume(&[], "no calls on 2023-05-21").unwrap_err(),
            ReportError::NotFound(_)
        ));
        assert!(matches!(
            average_rating(&[], "no calls on 2023-05-21").unwrap_err(),
            ReportError::NotFound(_)
        ));
        assert!(matches!(
            rating_averages(&[], "no calls on 2023-05-21").unwrap_err(),
            ReportError::NotFound(_)
        ));
    }

    #[test]
    fn month_without_surveys_has_no_best_agent() {
        let rows = vec![
            row(1, "Ana", "2023-05-10 09:00:00", None),
            row(2, "Luis", "2023-05-12 11:00:00", None),
        ];
        let err = top_entry(rating_leaderboard(&rows), "no surveyed calls").unwrap_err();
        assert!(matches!(err, ReportError::NotFound(_)));
    }

    #[test]
    fn rank_lookup_distinguishes_unranked_from_empty() {
        let rows = vec![
            row(1, "Ana", "2023-05-21 09:00:00", Some(4)),
            row(2, "Luis", "2023-05-21 10:00:00", Some(5)),
        ];
        let board = ranked_by_rating(&rows, "no calls").unwrap();
        assert_eq!(rank_on(&board, "2", "not ranked").unwrap(), 1);
        assert!(matches!(
            rank_on(&board, "3", "agent 3 is not ranked").unwrap_err(),
            ReportError::NotFound(_)
        ));
    }

    #[test]
    fn day_with_only_unrated_calls_averages_to_zero() {
        let rows = vec![row(1, "Ana", "2023-05-21 09:00:00", None)];
        assert_eq!(average_rating(&rows, "no calls").unwrap(), 0.0);
    }
}
