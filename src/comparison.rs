use serde::Serialize;

use crate::{
    forest::{Forest, ForestId, ForestTrend},
    score::{Grade, StatusColor},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Flat,
}

impl TrendDirection {
    pub fn from_delta(delta: i64) -> Self {
        match delta {
            d if d > 0 => TrendDirection::Up,
            d if d < 0 => TrendDirection::Down,
            _ => TrendDirection::Flat,
        }
    }
}

/// Score change between the two most recent observations, 0 with fewer than two.
pub fn trend_delta(trends: &[ForestTrend]) -> i64 {
    match trends {
        [.., previous, last] => last.score - previous.score,
        _ => 0,
    }
}

/// Score change across the whole history, 0 with fewer than two observations.
pub fn overall_change(trends: &[ForestTrend]) -> i64 {
    match (trends.first(), trends.last()) {
        (Some(first), Some(last)) if trends.len() >= 2 => last.score - first.score,
        _ => 0,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedForest {
    pub rank: usize,
    pub id: ForestId,
    pub name: String,
    pub score: i64,
    pub grade: Grade,
    pub status_color: StatusColor,
    pub ndvi: f64,
    pub trend_delta: i64,
    pub trend: TrendDirection,
}

/// Ranks forests by current score, best first. Ties keep input order.
pub fn rank_forests<'a>(forests: impl IntoIterator<Item = &'a Forest>) -> Vec<RankedForest> {
    let mut scored: Vec<_> = forests
        .into_iter()
        .map(|forest| (forest, forest.score()))
        .collect();
    scored.sort_by(|(_, a), (_, b)| b.score.cmp(&a.score));

    scored
        .into_iter()
        .enumerate()
        .map(|(index, (forest, result))| {
            let delta = trend_delta(&forest.trends);
            RankedForest {
                rank: index + 1,
                id: forest.id.clone(),
                name: forest.name.clone(),
                score: result.score,
                grade: result.grade,
                status_color: result.status_color,
                ndvi: forest.current_metrics.ndvi,
                trend_delta: delta,
                trend: TrendDirection::from_delta(delta),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trend(score: i64) -> ForestTrend {
        ForestTrend {
            month: "Jan".into(),
            score,
            ndvi: 0.5,
            rainfall: 100.0,
        }
    }

    #[test]
    fn trend_delta_uses_last_two_points() {
        assert_eq!(trend_delta(&[trend(70), trend(80), trend(77)]), -3);
        assert_eq!(trend_delta(&[trend(70), trend(72)]), 2);
        assert_eq!(trend_delta(&[trend(70)]), 0);
        assert_eq!(trend_delta(&[]), 0);
    }

    #[test]
    fn overall_change_spans_the_history() {
        assert_eq!(overall_change(&[trend(60), trend(50), trend(66)]), 6);
        assert_eq!(overall_change(&[trend(60)]), 0);
    }

    #[test]
    fn direction_follows_sign() {
        assert_eq!(TrendDirection::from_delta(4), TrendDirection::Up);
        assert_eq!(TrendDirection::from_delta(-1), TrendDirection::Down);
        assert_eq!(TrendDirection::from_delta(0), TrendDirection::Flat);
    }
}
