use chrono::{DateTime, SecondsFormat, Utc};
use tracing::debug;

use crate::{
    config::DEFAULT_ICON_BASE_URL,
    models::{AchievementSummary, GraphNode, OwnedGameRecord, RarityIndex},
};

use super::color::color_from_app_id;

const NEVER_PLAYED: &str = "Never";
const UNKNOWN_GENRE: &str = "Unknown";

/// Builds graph nodes from a user's owned-game records.
///
/// Synthesis is pure: the same records produce the same nodes, so callers
/// can rebuild on every request instead of caching.
#[derive(Debug, Clone)]
pub struct GraphSynthesizer {
    icon_base_url: String,
}

impl Default for GraphSynthesizer {
    fn default() -> Self {
        Self::new(DEFAULT_ICON_BASE_URL)
    }
}

impl GraphSynthesizer {
    /// Create a synthesizer that builds icon links under `icon_base_url`.
    pub fn new(icon_base_url: impl Into<String>) -> Self {
        Self {
            icon_base_url: icon_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build one node per identifiable record, most-played first.
    ///
    /// Records without an app id are dropped. Ranks are relative to the
    /// most-played game of this batch, so they shift between snapshots.
    pub fn build(&self, records: &[OwnedGameRecord], rarity: &RarityIndex) -> Vec<GraphNode> {
        let mut placed: Vec<(u32, &OwnedGameRecord)> = records
            .iter()
            .filter_map(|record| record.app_id.map(|id| (id, record)))
            .collect();

        let dropped = records.len() - placed.len();
        if dropped > 0 {
            debug!(dropped, "skipping owned-game records without an app id");
        }

        // stable: equal playtimes keep input order
        placed.sort_by(|(_, a), (_, b)| b.total_playtime_minutes.cmp(&a.total_playtime_minutes));

        let max_playtime = placed
            .iter()
            .map(|(_, record)| record.total_playtime_minutes)
            .max()
            .unwrap_or(0)
            .max(1);

        placed
            .into_iter()
            .map(|(id, record)| self.node(id, record, max_playtime, rarity))
            .collect()
    }

    fn node(
        &self,
        id: u32,
        record: &OwnedGameRecord,
        max_playtime: u64,
        rarity: &RarityIndex,
    ) -> GraphNode {
        GraphNode {
            id,
            name: record.name.clone(),
            playtime_hours: record.total_hours(),
            recent_hours: record.recent_hours(),
            genre: record
                .genre
                .as_deref()
                .map(str::trim)
                .filter(|genre| !genre.is_empty())
                .unwrap_or(UNKNOWN_GENRE)
                .to_string(),
            last_played_label: last_played_label(record.last_played_epoch_seconds),
            achievements: AchievementSummary {
                unlocked: record.achievements_unlocked.unwrap_or(0),
                total: record.achievements_total.unwrap_or(0),
                rarest: rarity.get(&id).cloned().unwrap_or_default(),
            },
            top_percentile_rank: top_percentile_rank(record.total_playtime_minutes, max_playtime),
            color: color_from_app_id(id),
            icon_url: self.icon_url(id, record.icon_id.as_deref()),
        }
    }

    fn icon_url(&self, app_id: u32, icon_id: Option<&str>) -> String {
        match icon_id.map(str::trim).filter(|icon| !icon.is_empty()) {
            Some(icon) => format!("{}/{}/{}.jpg", self.icon_base_url, app_id, icon),
            None => String::new(),
        }
    }
}

/// Build nodes with the default icon host and no rarity data.
pub fn build_game_graph(records: &[OwnedGameRecord]) -> Vec<GraphNode> {
    GraphSynthesizer::default().build(records, &RarityIndex::new())
}

/// Build nodes with the default icon host, attaching known rarest achievements.
pub fn build_game_graph_with_rarity(
    records: &[OwnedGameRecord],
    rarity: &RarityIndex,
) -> Vec<GraphNode> {
    GraphSynthesizer::default().build(records, rarity)
}

fn top_percentile_rank(total_minutes: u64, max_playtime: u64) -> u8 {
    let share = total_minutes as f64 / max_playtime.max(1) as f64;
    (100.0 - share * 100.0).round().clamp(0.0, 100.0) as u8
}

fn last_played_label(epoch_seconds: Option<i64>) -> String {
    epoch_seconds
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| NEVER_PLAYED.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RarestAchievement;

    fn batch() -> Vec<OwnedGameRecord> {
        vec![
            OwnedGameRecord::new(3, "Sampler", 90, 0),
            OwnedGameRecord::new(1, "Main", 24_000, 900),
            OwnedGameRecord::new(2, "Unplayed", 0, 0),
        ]
    }

    #[test]
    fn nodes_are_ordered_by_playtime_and_ranked_against_the_max() {
        let nodes = build_game_graph(&batch());
        let ids: Vec<u32> = nodes.iter().map(|node| node.id).collect();
        assert_eq!(ids, vec![1, 3, 2]);

        assert_eq!(nodes[0].top_percentile_rank, 0);
        // 90 / 24000 = 0.375% of the max
        assert_eq!(nodes[1].top_percentile_rank, 100);
        assert_eq!(nodes[2].top_percentile_rank, 100);
        assert_eq!(nodes[0].playtime_hours, 400.0);
        assert_eq!(nodes[0].recent_hours, 15.0);
    }

    #[test]
    fn rank_rounds_to_the_nearest_integer() {
        let records = vec![
            OwnedGameRecord::new(10, "Top", 1_000, 0),
            OwnedGameRecord::new(11, "Half", 500, 0),
            OwnedGameRecord::new(12, "Quarter", 254, 0),
        ];
        let nodes = build_game_graph(&records);
        assert_eq!(nodes[1].top_percentile_rank, 50);
        // 100 - 25.4 = 74.6
        assert_eq!(nodes[2].top_percentile_rank, 75);
    }

    #[test]
    fn ties_keep_input_order() {
        let records = vec![
            OwnedGameRecord::new(7, "First", 300, 0),
            OwnedGameRecord::new(5, "Second", 300, 0),
            OwnedGameRecord::new(9, "Top", 900, 0),
            OwnedGameRecord::new(6, "Third", 300, 0),
        ];
        let ids: Vec<u32> = build_game_graph(&records).iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![9, 7, 5, 6]);
    }

    #[test]
    fn records_without_app_id_are_dropped() {
        let mut records = batch();
        records.push(OwnedGameRecord {
            name: "Ghost".to_string(),
            total_playtime_minutes: 99_999,
            ..OwnedGameRecord::default()
        });
        let nodes = build_game_graph(&records);
        assert_eq!(nodes.len(), 3);
        // the dropped record must not influence the max either
        assert_eq!(nodes[0].id, 1);
        assert_eq!(nodes[0].top_percentile_rank, 0);
    }

    #[test]
    fn all_zero_batch_does_not_divide_by_zero() {
        let records = vec![
            OwnedGameRecord::new(1, "A", 0, 0),
            OwnedGameRecord::new(2, "B", 0, 0),
        ];
        let nodes = build_game_graph(&records);
        assert!(nodes.iter().all(|node| node.top_percentile_rank == 100));
    }

    #[test]
    fn empty_batch_yields_no_nodes() {
        assert!(build_game_graph(&[]).is_empty());
    }

    #[test]
    fn optional_fields_fall_back_to_defaults() {
        let nodes = build_game_graph(&[OwnedGameRecord::new(620, "Portal 2", 95, 0)]);
        let node = &nodes[0];
        assert_eq!(node.genre, "Unknown");
        assert_eq!(node.last_played_label, "Never");
        assert_eq!(node.icon_url, "");
        assert_eq!(node.achievements.unlocked, 0);
        assert_eq!(node.achievements.total, 0);
        assert_eq!(node.achievements.rarest, RarestAchievement::default());
        assert_eq!(node.color, color_from_app_id(620));
    }

    #[test]
    fn present_fields_are_carried_through() {
        let record = OwnedGameRecord {
            icon_id: Some("abc123".to_string()),
            last_played_epoch_seconds: Some(1_706_661_200),
            achievements_unlocked: Some(4),
            achievements_total: Some(10),
            genre: Some("Puzzle".to_string()),
            ..OwnedGameRecord::new(620, "Portal 2", 95, 0)
        };
        let mut rarity = RarityIndex::new();
        rarity.insert(
            620,
            RarestAchievement {
                name: "Still Alive".to_string(),
                percent: 3.5,
            },
        );

        let nodes = GraphSynthesizer::new("https://cdn.example/apps/").build(&[record], &rarity);
        let node = &nodes[0];
        assert_eq!(node.icon_url, "https://cdn.example/apps/620/abc123.jpg");
        assert_eq!(node.last_played_label, "2024-01-31T00:33:20Z");
        assert_eq!(node.genre, "Puzzle");
        assert_eq!(node.achievements.unlocked, 4);
        assert_eq!(node.achievements.total, 10);
        assert_eq!(node.achievements.rarest.name, "Still Alive");
    }

    #[test]
    fn synthesis_is_repeatable() {
        assert_eq!(build_game_graph(&batch()), build_game_graph(&batch()));
    }
}
