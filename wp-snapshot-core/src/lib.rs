#![doc = "wp-snapshot-core: core logic library for wp-snapshot."]

//! Harvests every published post from a WordPress REST API, normalizes the
//! posts into flat records and publishes the result as a snapshot file in a
//! remote repository.
//!
//! Data flows `harvest` → [`contract::PageFetcher`] → [`normalize`] →
//! [`snapshot::Snapshot`] → [`publish`] → [`contract::SnapshotStore`].
//! The concrete remote store lives in the CLI crate.

pub mod config;
pub mod contract;
pub mod fetch;
pub mod harvest;
pub mod identity;
pub mod normalize;
pub mod pacing;
pub mod publish;
pub mod snapshot;
