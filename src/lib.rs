//! KvK Branch Scan
//!
//! This library provides the core functionality for the kvk-branch-scan
//! pipeline, which determines for a list of Dutch companies (identified by
//! KvK registry number) whether each one has branches or subsidiaries, by
//! scraping the public company registry aggregator. Runs are idempotent and
//! resumable: results are committed to a local SQLite database as they are
//! resolved, and already-resolved companies are skipped on re-runs.

pub mod config;
pub mod db;
pub mod input;
pub mod models;
pub mod pipeline;
pub mod services;
