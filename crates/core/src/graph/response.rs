use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    models::{GraphNode, OwnedGameRecord, RarityIndex},
    store::{sanitize_component, LibraryStore},
};

use super::synthesizer::GraphSynthesizer;

/// Body of the graph endpoint: `{ "nodes": [...] }`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphResponse {
    /// Nodes in descending playtime order.
    pub nodes: Vec<GraphNode>,
}

impl GraphResponse {
    /// Synthesize a response from an in-memory batch.
    pub fn from_records(
        synthesizer: &GraphSynthesizer,
        records: &[OwnedGameRecord],
        rarity: &RarityIndex,
    ) -> Self {
        Self {
            nodes: synthesizer.build(records, rarity),
        }
    }

    /// Read a user's cached library and synthesize its graph.
    pub fn for_user(
        store: &LibraryStore,
        synthesizer: &GraphSynthesizer,
        steam_id: &str,
    ) -> Result<Self> {
        let library = store.library(steam_id)?;
        Ok(Self::from_records(
            synthesizer,
            &library.games,
            &library.rarity,
        ))
    }

    /// Write the response as pretty JSON into `dir`, returning the file path.
    pub fn export(&self, dir: impl AsRef<Path>, steam_id: &str) -> Result<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
        let path = dir.join(format!("{}-graph.json", sanitize_component(steam_id)));
        let serialized =
            serde_json::to_vec_pretty(self).context("failed to serialize graph response")?;
        fs::write(&path, serialized)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), nodes = self.nodes.len(), "exported graph");
        Ok(path)
    }
}
