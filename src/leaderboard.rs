use crate::models::{GroupAggregate, LeaderboardEntry};

/// Ranks groups descending by the chosen metric. The sort is stable, so
/// groups with equal metric values keep their encounter order from the
/// grouping pass, and ranks are 1-based positions in the sorted sequence.
pub fn build_leaderboard(
    groups: Vec<GroupAggregate>,
    metric: impl Fn(&GroupAggregate) -> f64,
) -> Vec<LeaderboardEntry> {
    let mut scored: Vec<(GroupAggregate, f64)> = groups
        .into_iter()
        .map(|group| {
            let value = metric(&group);
            (group, value)
        })
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    scored
        .into_iter()
        .enumerate()
        .map(|(position, (group, value))| LeaderboardEntry {
            key: group.key,
            label: group.label,
            value,
            rank: position as u32 + 1,
        })
        .collect()
}

/// 1-based rank of the entry with the given key, if it is on the board.
pub fn rank_of(board: &[LeaderboardEntry], key: &str) -> Option<u32> {
    board.iter().find(|entry| entry.key == key).map(|entry| entry.rank)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(key: &str, sum: f64, count: u64) -> GroupAggregate {
        GroupAggregate {
            key: key.to_string(),
            label: format!("Agent {key}"),
            sum,
            count,
        }
    }

    #[test]
    fn ranks_descend_by_metric() {
        let board = build_leaderboard(
            vec![group("1", 6.0, 2), group("2", 9.0, 2), group("3", 4.0, 1)],
            GroupAggregate::average,
        );
        assert_eq!(board.len(), 3);
        assert_eq!(board[0].key, "2");
        assert_eq!(board[0].value, 4.5);
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[1].key, "3");
        assert_eq!(board[1].rank, 2);
        assert_eq!(board[2].key, "1");
        assert_eq!(board[2].rank, 3);
    }

    #[test]
    fn equal_metrics_keep_encounter_order() {
        let board = build_leaderboard(
            vec![group("a", 3.0, 1), group("b", 3.0, 1)],
            GroupAggregate::average,
        );
        assert_eq!(board[0].key, "a");
        assert_eq!(board[1].key, "b");
    }

    #[test]
    fn count_metric_ranks_by_volume() {
        let board = build_leaderboard(
            vec![group("1", 2.0, 2), group("2", 1.0, 1)],
            |g| g.count as f64,
        );
        assert_eq!(board[0].key, "1");
        assert_eq!(board[1].key, "2");
        assert_eq!(board[1].value, 1.0);
    }

    #[test]
    fn rank_of_finds_one_based_position() {
        let board = build_leaderboard(
            vec![group("1", 6.0, 2), group("2", 9.0, 2)],
            GroupAggregate::average,
        );
        assert_eq!(rank_of(&board, "2"), Some(1));
        assert_eq!(rank_of(&board, "1"), Some(2));
    }

    #[test]
    fn rank_of_missing_key_is_none() {
        let board = build_leaderboard(vec![group("1", 6.0, 2)], GroupAggregate::average);
        assert_eq!(rank_of(&board, "99"), None);
    }

    #[test]
    fn empty_input_yields_empty_board() {
        let board = build_leaderboard(Vec::new(), GroupAggregate::average);
        assert!(board.is_empty());
    }
}
