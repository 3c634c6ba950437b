//! # Gallery Tree
//!
//! The engine behind a folder-based photo gallery. Any folder in a storage
//! tree is an album: it shows a few of its own pictures, samples its
//! sub-albums, and takes its presentation settings from small YAML files
//! that cascade down from parent folders.
//!
//! # Architecture
//!
//! Every request goes through the same three steps:
//!
//! ```text
//! 1. Resolve   album folder  →  effective config   (upward walk, privacy check)
//! 2. Discover  album folder  →  files + albums     (bounded breadth-first sample)
//! 3. Render    picture id    →  preview bytes      (generate, fit, encode, or fallback icon)
//! ```
//!
//! All three work against the [`storage::Storage`] trait, so the engine runs
//! the same over a local directory ([`storage::LocalStorage`]) and over the
//! in-memory tree ([`storage::MemoryStorage`]) used by the tests.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`storage`] | Node model, the `Storage` trait and its local/in-memory backends |
//! | [`settings`] | `gallery.toml` loading, stock defaults, validation |
//! | [`album_config`] | Per-album YAML parsing, upward resolution, privacy sentinel |
//! | [`discovery`] | Overview sampling and full listing of media below an album |
//! | [`imaging`] | Preview generation, exact-size fitting, encoding, fallback icons |
//! | [`cache`] | Owner-partitioned on-disk preview cache |
//! | [`gallery`] | Request-level operations: list, config, previews, thumbnails |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Nearest Wins, Inheritance Opt-In
//!
//! Configuration is collected by walking from the album up towards the
//! viewer's root. For each topic the closest folder that defines it wins,
//! but a parent folder only contributes a topic it marks `inherit: yes`.
//! The root's `features` apply everywhere below it.
//!
//! ```text
//! photos/gallery.cnf               ← level 2
//! photos/Travel/gallery.cnf        ← level 1
//! photos/Travel/Japan/gallery.cnf  ← level 0 (the album itself)
//! ```
//!
//! ## Privacy Sentinel
//!
//! A folder containing the sentinel file (`.nomedia` by default) is hidden
//! together with everything below it. The check runs during the same upward
//! walk, and a sentinel found anywhere on the path discards whatever config
//! was collected below it.
//!
//! ## Sampling, Not Crawling
//!
//! An overview listing takes at most four pictures per album and stops
//! descending once a level has produced results. Large trees therefore cost
//! a handful of directory reads per request. The full listing is available
//! when a client really needs everything.
//!
//! ## Exact Square Thumbnails
//!
//! Album tiles assume square thumbnails of exactly the configured size. When
//! a generator returns something else (small sources, odd decoders), the
//! image is resized and centered onto a transparent canvas, and the fixed
//! version is written back to the cache.

pub mod album_config;
pub mod cache;
pub mod discovery;
pub mod gallery;
pub mod imaging;
pub mod output;
pub mod settings;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_helpers;
