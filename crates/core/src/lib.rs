#![warn(clippy::all, missing_docs)]

//! Core domain logic for steamscape.
//!
//! This crate hosts the library data models, configuration handling,
//! the Steam Web API gateway, the cached record store and sync, and the
//! pure pipeline that turns an owned-game list into graph nodes and
//! backlog analytics.

pub mod backlog;
pub mod config;
pub mod demo;
pub mod graph;
pub mod models;
pub mod steam;
pub mod store;
pub mod sync;

pub use backlog::{analyze_library, BacklogAnalysis, BacklogTotals, PlaytimeBucket};
pub use config::AppConfig;
pub use graph::{
    build_game_graph, build_game_graph_with_rarity, calculate_node_properties, place_nodes,
    GraphResponse, NodeLayout, NodePlacement, NodeProperties,
};
pub use models::{GraphNode, OwnedGameRecord, PlayerProfile, RarityIndex, UserLibrary};
pub use steam::{SteamClient, SteamError};
pub use store::LibraryStore;
pub use sync::{LibrarySync, SyncEvent};
