use std::collections::HashMap;

use chrono::Datelike;

use crate::models::{GroupAggregate, MonthlyDuration, SurveyedCall};

/// Arithmetic mean, with 0.0 standing in for "no data" on empty input.
pub fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Most frequent label. Ties go to the label encountered first in input
/// order; empty input has no mode.
pub fn mode<T: Eq + std::hash::Hash + Clone>(labels: &[T]) -> Option<T> {
    let mut counts: HashMap<&T, usize> = HashMap::new();
    for label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }

    let mut best: Option<(&T, usize)> = None;
    for label in labels {
        let count = counts[label];
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((label, count));
        }
    }
    best.map(|(label, _)| label.clone())
}

/// "MM:SS" with both fields zero-padded; input is rounded to the nearest
/// whole second first. Minutes run past 59 rather than rolling into hours.
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.round().max(0.0) as i64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Single-pass grouping: accumulates sum and count per key, remembering the
/// label seen on the key's first occurrence. Group order is the order keys
/// first appear in the input, which keeps downstream tie-breaks stable.
///
/// Records for which `value` returns `None` (e.g. a call without a survey
/// when aggregating ratings) are skipped entirely.
pub fn group_by<R>(
    records: &[R],
    key: impl Fn(&R) -> (String, String),
    value: impl Fn(&R) -> Option<f64>,
) -> Vec<GroupAggregate> {
    let mut groups: Vec<GroupAggregate> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        let Some(v) = value(record) else {
            continue;
        };
        let (k, label) = key(record);
        let slot = *index.entry(k.clone()).or_insert_with(|| {
            groups.push(GroupAggregate {
                key: k,
                label,
                sum: 0.0,
                count: 0,
            });
            groups.len() - 1
        });
        groups[slot].sum += v;
        groups[slot].count += 1;
    }

    groups
}

/// Average call duration per calendar month, in chronological order.
pub fn group_durations_by_month(calls: &[SurveyedCall]) -> Vec<MonthlyDuration> {
    let mut totals: HashMap<(i32, u32), (f64, u64)> = HashMap::new();
    for call in calls {
        let entry = totals
            .entry((call.started_at.year(), call.started_at.month()))
            .or_insert((0.0, 0));
        entry.0 += call.duration_secs as f64;
        entry.1 += 1;
    }

    let mut months: Vec<MonthlyDuration> = totals
        .into_iter()
        .map(|((year, month), (sum, count))| MonthlyDuration {
            year,
            month,
            month_name: month_name(month),
            avg_duration_secs: sum / count as f64,
        })
        .collect();

    months.sort_by_key(|m| (m.year, m.month));
    months
}

fn month_name(month: u32) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        _ => "December",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn call(agent_id: i64, started_at: &str, duration_secs: i32) -> SurveyedCall {
        SurveyedCall {
            call_id: 0,
            agent_id,
            started_at: NaiveDateTime::parse_from_str(started_at, "%Y-%m-%d %H:%M:%S").unwrap(),
            duration_secs,
            rating: None,
            agent_name: "Ana".to_string(),
            agent_surname: "Torres".to_string(),
        }
    }

    #[test]
    fn average_of_empty_is_zero() {
        assert_eq!(average(&[]), 0.0);
    }

    #[test]
    fn average_matches_arithmetic_mean() {
        assert_eq!(average(&[4.0, 5.0]), 4.5);
        assert!((average(&[1.0, 2.0, 4.0]) - 7.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn mode_picks_most_frequent() {
        assert_eq!(mode(&[1, 2, 2, 3, 3, 3]), Some(3));
    }

    #[test]
    fn mode_of_empty_is_none() {
        assert_eq!(mode::<i32>(&[]), None);
    }

    #[test]
    fn mode_tie_goes_to_first_encountered() {
        assert_eq!(mode(&[1, 2, 1, 2]), Some(1));
        assert_eq!(mode(&["neutral", "positive", "positive", "neutral"]), Some("neutral"));
    }

    #[test]
    fn format_duration_pads_minutes_and_seconds() {
        assert_eq!(format_duration(125.0), "02:05");
        assert_eq!(format_duration(0.0), "00:00");
    }

    #[test]
    fn format_duration_rounds_to_nearest_second() {
        assert_eq!(format_duration(59.6), "01:00");
        assert_eq!(format_duration(59.4), "00:59");
    }

    #[test]
    fn group_by_accumulates_in_encounter_order() {
        let rows = [(2, 4.0), (1, 3.0), (2, 5.0)];
        let groups = group_by(
            &rows,
            |(id, _)| (id.to_string(), format!("agent {id}")),
            |(_, v)| Some(*v),
        );
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key, "2");
        assert_eq!(groups[0].sum, 9.0);
        assert_eq!(groups[0].count, 2);
        assert_eq!(groups[1].key, "1");
        assert_eq!(groups[1].average(), 3.0);
    }

    #[test]
    fn group_by_skips_records_without_a_value() {
        let rows = [(1, Some(4.0)), (1, None), (2, None)];
        let groups = group_by(
            &rows,
            |(id, _)| (id.to_string(), id.to_string()),
            |(_, v)| *v,
        );
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].count, 1);
    }

    #[test]
    fn monthly_durations_are_chronological_across_years() {
        let calls = vec![
            call(1, "2024-01-10 10:00:00", 120),
            call(1, "2023-11-05 09:00:00", 60),
            call(1, "2024-01-20 15:00:00", 180),
            call(1, "2023-12-01 08:00:00", 90),
        ];
        let months = group_durations_by_month(&calls);
        assert_eq!(months.len(), 3);
        assert_eq!((months[0].year, months[0].month), (2023, 11));
        assert_eq!((months[1].year, months[1].month), (2023, 12));
        assert_eq!((months[2].year, months[2].month), (2024, 1));
        assert_eq!(months[2].avg_duration_secs, 150.0);
        assert_eq!(months[0].month_name, "November");
    }
}
