use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::CheckpointError;
use crate::palette::Color;

/// Summary of every accepted placement
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasStats {
    pub total_placements: u64,
    pub color_counts: BTreeMap<Color, u64>,
    pub user_counts: BTreeMap<String, u64>,
    pub last_updated_at: Option<DateTime<Utc>>,
}

impl CanvasStats {
    /// Number of distinct users that have placed at least once
    pub fn unique_users(&self) -> usize {
        self.user_counts.len()
    }

    /// Check that the total agrees with both breakdowns
    pub fn check_consistency(&self) -> Result<(), CheckpointError> {
        let color_sum: u64 = self.color_counts.values().sum();
        let user_sum: u64 = self.user_counts.values().sum();
        if color_sum == self.total_placements && user_sum == self.total_placements {
            Ok(())
        } else {
            Err(CheckpointError::InconsistentStats {
                total: self.total_placements,
                color_sum,
                user_sum,
            })
        }
    }
}

/// Incrementally maintained [`CanvasStats`].
///
/// All counters sit behind one lock so a snapshot never sees a placement
/// counted in the total but not yet in a breakdown.
#[derive(Debug, Default)]
pub struct StatsAggregator {
    inner: Mutex<CanvasStats>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume counting from checkpointed stats
    pub fn from_stats(stats: CanvasStats) -> Result<Self, CheckpointError> {
        stats.check_consistency()?;
        Ok(Self {
            inner: Mutex::new(stats),
        })
    }

    /// Count one accepted placement
    pub fn record(&self, color: Color, user_id: &str, now: DateTime<Utc>) {
        let mut guard = self.inner.lock();
        let stats = &mut *guard;
        stats.total_placements += 1;
        *stats.color_counts.entry(color).or_insert(0) += 1;
        // Avoid allocating a key for returning users
        match stats.user_counts.get_mut(user_id) {
            Some(count) => *count += 1,
            None => {
                stats.user_counts.insert(user_id.to_string(), 1);
            }
        }
        stats.last_updated_at = Some(now);
    }

    pub fn snapshot(&self) -> CanvasStats {
        self.inner.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn test_record_updates_every_counter() {
        let stats = StatsAggregator::new();
        assert_eq!(stats.snapshot(), CanvasStats::default());

        stats.record(Color::RED, "alice", at(1));
        stats.record(Color::RED, "bob", at(2));
        stats.record(Color::BLUE, "alice", at(3));

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_placements, 3);
        assert_eq!(snapshot.color_counts[&Color::RED], 2);
        assert_eq!(snapshot.color_counts[&Color::BLUE], 1);
        assert_eq!(snapshot.user_counts["alice"], 2);
        assert_eq!(snapshot.user_counts["bob"], 1);
        assert_eq!(snapshot.unique_users(), 2);
        assert_eq!(snapshot.last_updated_at, Some(at(3)));
        assert!(snapshot.check_consistency().is_ok());
    }

    #[test]
    fn test_concurrent_records_are_not_lost() {
        let stats = StatsAggregator::new();
        let colors = [Color::RED, Color::GREEN, Color::BLUE];

        thread::scope(|scope| {
            for worker in 0..8 {
                let stats = &stats;
                scope.spawn(move || {
                    let user = format!("user-{worker}");
                    for i in 0..500 {
                        stats.record(colors[i % colors.len()], &user, at(i as i64));
                    }
                });
            }
        });

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_placements, 4000);
        assert_eq!(snapshot.unique_users(), 8);
        assert!(snapshot.user_counts.values().all(|&n| n == 500));
        assert!(snapshot.check_consistency().is_ok());
    }

    #[test]
    fn test_stats_json_uses_hex_keys() {
        let stats = StatsAggregator::new();
        stats.record(Color::RED, "alice", at(0));

        let json = serde_json::to_value(stats.snapshot()).unwrap();
        assert_eq!(json["totalPlacements"], 1);
        assert_eq!(json["colorCounts"]["#FF0000"], 1);
        assert_eq!(json["userCounts"]["alice"], 1);
    }

    #[test]
    fn test_inconsistent_stats_are_refused() {
        let mut stats = CanvasStats {
            total_placements: 2,
            ..CanvasStats::default()
        };
        stats.color_counts.insert(Color::RED, 2);
        stats.user_counts.insert("alice".to_string(), 1);

        assert_eq!(
            StatsAggregator::from_stats(stats).err(),
            Some(CheckpointError::InconsistentStats {
                total: 2,
                color_sum: 2,
                user_sum: 1,
            })
        );
    }
}
