//! Backlog classification over an owned-game batch.
//!
//! Every game falls into exactly one playtime bucket. Independently, games
//! with no playtime in the last two weeks are "cold", and cold games with
//! between half an hour and five hours in total are "abandoned" starts.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::models::OwnedGameRecord;

/// Upper bound (exclusive) of the sampled bucket, in minutes.
pub const SAMPLED_MAX_MINUTES: u64 = 120;
/// Lower bound (inclusive) of an abandoned start, in minutes.
pub const ABANDONED_MIN_MINUTES: u64 = 30;
/// Upper bound (inclusive) of an abandoned start, in minutes.
pub const ABANDONED_MAX_MINUTES: u64 = 300;
/// Lower bound (inclusive) of the committed bucket, in minutes.
pub const COMMITTED_MIN_MINUTES: u64 = 600;

/// Mutually exclusive lifetime-playtime buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaytimeBucket {
    /// Zero minutes.
    Never,
    /// Under two hours.
    Sampled,
    /// Two to ten hours.
    Mid,
    /// Ten hours or more.
    Committed,
}

impl PlaytimeBucket {
    /// All buckets in ascending playtime order.
    pub const ALL: [PlaytimeBucket; 4] = [
        PlaytimeBucket::Never,
        PlaytimeBucket::Sampled,
        PlaytimeBucket::Mid,
        PlaytimeBucket::Committed,
    ];

    /// Bucket for a lifetime playtime in minutes.
    pub fn classify(total_minutes: u64) -> Self {
        if total_minutes == 0 {
            PlaytimeBucket::Never
        } else if total_minutes < SAMPLED_MAX_MINUTES {
            PlaytimeBucket::Sampled
        } else if total_minutes >= COMMITTED_MIN_MINUTES {
            PlaytimeBucket::Committed
        } else {
            PlaytimeBucket::Mid
        }
    }

    /// Dashboard label.
    pub fn label(self) -> &'static str {
        match self {
            PlaytimeBucket::Never => "Never played",
            PlaytimeBucket::Sampled => "< 2h sampled",
            PlaytimeBucket::Mid => "2–10h mid",
            PlaytimeBucket::Committed => "10h+ committed",
        }
    }
}

/// Aggregate counts and shares over a batch.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacklogTotals {
    /// Games in the batch.
    pub total_games: usize,
    /// Lifetime playtime across the batch, in hours.
    pub total_hours: f64,
    /// Games never launched.
    pub never: usize,
    /// Games played under two hours.
    pub sampled: usize,
    /// Games played two to ten hours.
    pub mid: usize,
    /// Games played ten hours or more.
    pub committed: usize,
    /// Share of never-launched games, in percent.
    pub never_pct: f64,
    /// Share of sampled games, in percent.
    pub sampled_pct: f64,
    /// Share of mid games, in percent.
    pub mid_pct: f64,
    /// Share of committed games, in percent.
    pub committed_pct: f64,
    /// Share of games played at least two hours, in percent.
    pub meaningful_played_pct: f64,
}

impl BacklogTotals {
    /// Count for one bucket.
    pub fn count(&self, bucket: PlaytimeBucket) -> usize {
        match bucket {
            PlaytimeBucket::Never => self.never,
            PlaytimeBucket::Sampled => self.sampled,
            PlaytimeBucket::Mid => self.mid,
            PlaytimeBucket::Committed => self.committed,
        }
    }

    /// Percentage for one bucket.
    pub fn pct(&self, bucket: PlaytimeBucket) -> f64 {
        match bucket {
            PlaytimeBucket::Never => self.never_pct,
            PlaytimeBucket::Sampled => self.sampled_pct,
            PlaytimeBucket::Mid => self.mid_pct,
            PlaytimeBucket::Committed => self.committed_pct,
        }
    }
}

/// Result of [`analyze_library`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacklogAnalysis {
    /// Bucket counts and shares.
    pub totals: BacklogTotals,
    /// Games with no recent playtime, most-played first.
    pub cold: Vec<OwnedGameRecord>,
    /// Cold games with 30 to 300 minutes in total, most-played first.
    pub abandoned: Vec<OwnedGameRecord>,
}

/// Classify a batch into buckets plus cold and abandoned lists.
pub fn analyze_library(games: &[OwnedGameRecord]) -> BacklogAnalysis {
    let mut totals = BacklogTotals::default();
    let mut total_minutes: u64 = 0;
    let mut cold = Vec::new();
    let mut abandoned = Vec::new();

    for game in games {
        let total = game.total_playtime_minutes;
        total_minutes = total_minutes.saturating_add(total);

        match PlaytimeBucket::classify(total) {
            PlaytimeBucket::Never => totals.never += 1,
            PlaytimeBucket::Sampled => totals.sampled += 1,
            PlaytimeBucket::Mid => totals.mid += 1,
            PlaytimeBucket::Committed => totals.committed += 1,
        }

        if is_cold(game) {
            cold.push(game.clone());
            if is_abandoned(game) {
                abandoned.push(game.clone());
            }
        }
    }

    sort_by_playtime_desc(&mut cold);
    sort_by_playtime_desc(&mut abandoned);

    let count = games.len();
    totals.total_games = count;
    totals.total_hours = total_minutes as f64 / 60.0;
    totals.never_pct = pct(totals.never, count);
    totals.sampled_pct = pct(totals.sampled, count);
    totals.mid_pct = pct(totals.mid, count);
    totals.committed_pct = pct(totals.committed, count);
    totals.meaningful_played_pct = pct(count - totals.never - totals.sampled, count);

    BacklogAnalysis {
        totals,
        cold,
        abandoned,
    }
}

/// No playtime in the last two weeks.
pub fn is_cold(game: &OwnedGameRecord) -> bool {
    game.recent_playtime_minutes == 0
}

/// Cold, started for at least half an hour, never past five hours.
pub fn is_abandoned(game: &OwnedGameRecord) -> bool {
    is_cold(game)
        && (ABANDONED_MIN_MINUTES..=ABANDONED_MAX_MINUTES).contains(&game.total_playtime_minutes)
}

fn pct(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

fn sort_by_playtime_desc(games: &mut [OwnedGameRecord]) {
    games.sort_by(|a, b| b.total_playtime_minutes.cmp(&a.total_playtime_minutes));
}

/// Compact hours label: whole hours from ten up, one decimal below.
pub fn format_hours_from_minutes(minutes: u64) -> String {
    let hours = minutes as f64 / 60.0;
    if hours >= 10.0 {
        format!("{hours:.0}h")
    } else {
        format!("{hours:.1}h")
    }
}

/// Orderings offered by the cold-library table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColdSort {
    /// Most lifetime playtime first.
    #[default]
    MostHours,
    /// Least lifetime playtime first.
    LeastHours,
    /// Case-insensitive by name.
    Name,
}

impl ColdSort {
    /// Next ordering in the cycle.
    pub fn next(self) -> Self {
        match self {
            ColdSort::MostHours => ColdSort::LeastHours,
            ColdSort::LeastHours => ColdSort::Name,
            ColdSort::Name => ColdSort::MostHours,
        }
    }

    /// Menu label.
    pub fn label(self) -> &'static str {
        match self {
            ColdSort::MostHours => "Most hours",
            ColdSort::LeastHours => "Least hours",
            ColdSort::Name => "Name",
        }
    }
}

/// Rows for the cold-library table, optionally limited to cold games.
pub fn cold_library(
    games: &[OwnedGameRecord],
    only_cold: bool,
    sort: ColdSort,
) -> Vec<OwnedGameRecord> {
    let mut rows: Vec<OwnedGameRecord> = games
        .iter()
        .filter(|game| !only_cold || is_cold(game))
        .cloned()
        .collect();

    rows.sort_by(|a, b| match sort {
        ColdSort::MostHours => b.total_playtime_minutes.cmp(&a.total_playtime_minutes),
        ColdSort::LeastHours => a.total_playtime_minutes.cmp(&b.total_playtime_minutes),
        ColdSort::Name => compare_names(&a.name, &b.name),
    });
    rows
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app_ids(games: &[OwnedGameRecord]) -> Vec<u32> {
        games.iter().filter_map(|game| game.app_id).collect()
    }

    fn demo_batch() -> Vec<OwnedGameRecord> {
        vec![
            OwnedGameRecord::new(1, "Main", 24_000, 900),
            OwnedGameRecord::new(2, "Unplayed", 0, 0),
            OwnedGameRecord::new(3, "Sampler", 90, 0),
        ]
    }

    #[test]
    fn end_to_end_example() {
        let analysis = analyze_library(&demo_batch());
        let totals = &analysis.totals;
        assert_eq!(totals.total_games, 3);
        assert_eq!(totals.never, 1);
        assert_eq!(totals.sampled, 1);
        assert_eq!(totals.mid, 0);
        assert_eq!(totals.committed, 1);
        assert_eq!(app_ids(&analysis.cold), vec![3, 2]);
        assert_eq!(app_ids(&analysis.abandoned), vec![3]);
        assert!((totals.meaningful_played_pct - 100.0 / 3.0).abs() < 1e-9);
        assert!((totals.total_hours - 24_090.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn thresholds_are_exact() {
        let cases = [
            (0, PlaytimeBucket::Never),
            (1, PlaytimeBucket::Sampled),
            (119, PlaytimeBucket::Sampled),
            (120, PlaytimeBucket::Mid),
            (599, PlaytimeBucket::Mid),
            (600, PlaytimeBucket::Committed),
            (u64::MAX, PlaytimeBucket::Committed),
        ];
        for (minutes, bucket) in cases {
            assert_eq!(PlaytimeBucket::classify(minutes), bucket, "{minutes} minutes");
        }
    }

    #[test]
    fn abandoned_bounds_are_inclusive() {
        let games = vec![
            OwnedGameRecord::new(1, "a", 29, 0),
            OwnedGameRecord::new(2, "b", 30, 0),
            OwnedGameRecord::new(3, "c", 300, 0),
            OwnedGameRecord::new(4, "d", 301, 0),
            OwnedGameRecord::new(5, "e", 150, 10),
        ];
        let analysis = analyze_library(&games);
        assert_eq!(app_ids(&analysis.abandoned), vec![3, 2]);
        assert_eq!(app_ids(&analysis.cold), vec![4, 3, 2, 1]);
    }

    #[test]
    fn buckets_partition_and_abandoned_is_within_cold() {
        let games: Vec<OwnedGameRecord> = (0..200u32)
            .map(|i| {
                let total = u64::from(i * 37 % 800);
                let recent = if i % 3 == 0 { 0 } else { u64::from(i % 50) };
                OwnedGameRecord::new(i, format!("game {i}"), total, recent)
            })
            .collect();

        let analysis = analyze_library(&games);
        let totals = &analysis.totals;
        assert_eq!(
            totals.never + totals.sampled + totals.mid + totals.committed,
            totals.total_games
        );
        let pct_sum = totals.never_pct + totals.sampled_pct + totals.mid_pct + totals.committed_pct;
        assert!((pct_sum - 100.0).abs() < 1e-9);
        assert!(
            (totals.meaningful_played_pct - (100.0 - totals.never_pct - totals.sampled_pct)).abs()
                < 1e-9
        );

        for game in &analysis.abandoned {
            assert!(analysis.cold.contains(game));
            assert!((30..=300).contains(&game.total_playtime_minutes));
        }
        assert!(analysis
            .cold
            .windows(2)
            .all(|pair| pair[0].total_playtime_minutes >= pair[1].total_playtime_minutes));
    }

    #[test]
    fn cold_sort_is_stable_on_ties() {
        let games = vec![
            OwnedGameRecord::new(1, "a", 60, 0),
            OwnedGameRecord::new(2, "b", 200, 0),
            OwnedGameRecord::new(3, "c", 60, 0),
        ];
        let analysis = analyze_library(&games);
        assert_eq!(app_ids(&analysis.cold), vec![2, 1, 3]);
    }

    #[test]
    fn empty_batch_has_zero_totals() {
        let analysis = analyze_library(&[]);
        assert_eq!(analysis.totals, BacklogTotals::default());
        assert!(analysis.cold.is_empty());
        assert!(analysis.abandoned.is_empty());
        for bucket in PlaytimeBucket::ALL {
            assert_eq!(analysis.totals.pct(bucket), 0.0);
        }
        assert_eq!(analysis.totals.meaningful_played_pct, 0.0);
    }

    #[test]
    fn records_without_app_id_still_count() {
        let mut games = demo_batch();
        games.push(OwnedGameRecord {
            total_playtime_minutes: 700,
            ..OwnedGameRecord::default()
        });
        assert_eq!(analyze_library(&games).totals.committed, 2);
    }

    #[test]
    fn hours_format_switches_precision_at_ten() {
        assert_eq!(format_hours_from_minutes(0), "0.0h");
        assert_eq!(format_hours_from_minutes(90), "1.5h");
        assert_eq!(format_hours_from_minutes(599), "10.0h");
        assert_eq!(format_hours_from_minutes(600), "10h");
        assert_eq!(format_hours_from_minutes(24_000), "400h");
    }

    #[test]
    fn cold_table_filters_and_sorts() {
        let games = vec![
            OwnedGameRecord::new(1, "beta", 500, 0),
            OwnedGameRecord::new(2, "Alpha", 40, 0),
            OwnedGameRecord::new(3, "gamma", 900, 30),
        ];
        assert_eq!(app_ids(&cold_library(&games, true, ColdSort::MostHours)), vec![1, 2]);
        assert_eq!(app_ids(&cold_library(&games, true, ColdSort::LeastHours)), vec![2, 1]);
        assert_eq!(app_ids(&cold_library(&games, false, ColdSort::Name)), vec![2, 1, 3]);
        assert_eq!(ColdSort::Name.next(), ColdSort::MostHours);
    }
}
