//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Listings lead with album structure: each album is a numbered header with
//! its own picture count, its files indented below it, sub-albums indented
//! one level deeper. Configuration follows as `topic (level N): key=value`
//! lines, so it is visible at a glance which folder each topic came from.
//!
//! # Output Format
//!
//! ## List
//!
//! ```text
//! Travel
//! 001 Travel (2 photos)
//!     001 001-dawn.jpg
//!     002 002-dusk.jpg
//!     002 Japan (1 photo)
//!         001 001-tokyo.jpg
//!
//! Config
//!     sorting (level 0): order=asc, type=date
//!     features (level 2): native_svg=yes
//! ```
//!
//! ## Warm
//!
//! ```text
//! Warmed 12 thumbnails (11 ok, 1 failed)
//! Cache: 3 cached, 9 rendered (12 total)
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::album_config::EffectiveAlbumConfig;
use crate::cache::CacheStats;
use crate::gallery::{ListResponse, PreviewResult, PreviewStatus};
use crate::storage::path_depth;
use serde_yaml::Value;
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Album header: positional index + name + picture count.
///
/// ```text
/// 001 Landscapes (5 photos)
/// 002 Japan (1 photo)
/// ```
fn album_header(index: usize, name: &str, count: usize) -> String {
    let noun = if count == 1 { "photo" } else { "photos" };
    format!("{} {} ({} {})", format_index(index), name, count, noun)
}

/// Last path segment, or `/` for the root.
fn display_name(path: &str) -> &str {
    if path.is_empty() {
        "/"
    } else {
        path.rsplit('/').next().unwrap_or(path)
    }
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        None => text.to_string(),
        Some((cut, _)) => format!("{}...", &text[..cut]),
    }
}

/// Render a config value compactly.
fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "~".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => truncate(s, 60),
        other => serde_yaml::to_string(other)
            .map(|s| truncate(s.trim(), 60))
            .unwrap_or_default(),
    }
}

// ============================================================================
// List
// ============================================================================

/// Format an album listing as an indented tree.
pub fn format_listing(path: &str, response: &ListResponse) -> Vec<String> {
    let mut lines = vec![display_name(path).to_string()];

    if response.unchanged {
        lines.push(format!("    unchanged (etag {})", response.etag));
    } else {
        let base = response
            .albums
            .first()
            .map(|a| path_depth(&a.path))
            .unwrap_or(0);
        let mut positions: Vec<usize> = Vec::new();

        for album in &response.albums {
            let depth = path_depth(&album.path).saturating_sub(base);
            positions.truncate(depth + 1);
            positions.resize(depth + 1, 0);
            positions[depth] += 1;

            let files: Vec<&str> = response
                .files
                .iter()
                .filter(|f| parent_of(&f.path) == album.path)
                .map(|f| display_name(&f.path))
                .collect();
            lines.push(format!(
                "{}{}",
                indent(depth),
                album_header(positions[depth], display_name(&album.path), files.len())
            ));
            for (i, name) in files.iter().enumerate() {
                lines.push(format!("{}{} {}", indent(depth + 1), format_index(i + 1), name));
            }
        }
    }

    lines.push(String::new());
    lines.extend(format_config(&response.config));
    lines
}

fn parent_of(path: &str) -> &str {
    path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
}

/// Print a listing to stdout.
pub fn print_listing(path: &str, response: &ListResponse) {
    for line in format_listing(path, response) {
        println!("{}", line);
    }
}

// ============================================================================
// Config
// ============================================================================

/// Format the resolved configuration, one line per topic.
pub fn format_config(config: &EffectiveAlbumConfig) -> Vec<String> {
    let mut lines = vec!["Config".to_string()];
    if config.topics.is_empty() {
        lines.push("    (defaults)".to_string());
    }
    for (topic, fragment) in &config.topics {
        let fields: Vec<String> = fragment
            .fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, display_value(v)))
            .collect();
        lines.push(format!(
            "    {} (level {}): {}",
            topic.as_str(),
            fragment.level,
            fields.join(", ")
        ));
    }
    if let Some(issue) = &config.error {
        lines.push(format!("    Error: {}", issue.message));
        lines.push(format!(
            "        Source: {} (level {})",
            issue.path, issue.level
        ));
    }
    lines
}

pub fn print_config(config: &EffectiveAlbumConfig) {
    for line in format_config(config) {
        println!("{}", line);
    }
}

// ============================================================================
// Previews
// ============================================================================

fn status_label(status: PreviewStatus) -> &'static str {
    match status {
        PreviewStatus::Ok => "ok",
        PreviewStatus::Unsupported => "unsupported, fallback icon",
        PreviewStatus::Failed => "failed, fallback icon",
        PreviewStatus::NotFound => "not found",
        PreviewStatus::Forbidden => "forbidden",
    }
}

/// One line describing a preview result and where it was written.
pub fn format_preview(result: &PreviewResult, written_to: Option<&Path>) -> String {
    let mut line = format!("{}: {}", result.id, status_label(result.status));
    if !result.bytes.is_empty() {
        line.push_str(&format!(
            " ({}, {} bytes)",
            result.media_type,
            result.bytes.len()
        ));
    }
    if let Some(path) = written_to {
        line.push_str(&format!(" → {}", path.display()));
    }
    line
}

// ============================================================================
// Warm
// ============================================================================

/// Summary of a warm run.
pub fn format_warm_summary(results: &[PreviewResult], stats: CacheStats) -> Vec<String> {
    let ok = results.iter().filter(|r| r.status.is_ok()).count();
    let failed = results.len() - ok;
    let mut lines = vec![if failed > 0 {
        format!(
            "Warmed {} thumbnails ({} ok, {} failed)",
            results.len(),
            ok,
            failed
        )
    } else {
        format!("Warmed {} thumbnails", results.len())
    }];
    for result in results.iter().filter(|r| !r.status.is_ok()) {
        lines.push(format!("    {}", format_preview(result, None)));
    }
    lines.push(format!("Cache: {}", stats));
    lines
}

pub fn print_warm_summary(results: &[PreviewResult], stats: CacheStats) {
    for line in format_warm_summary(results, stats) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::album_config::{AlbumInfo, ConfigIssue, Fragment, Topic};
    use crate::discovery::{DiscoveredAlbum, DiscoveredMedia};
    use crate::storage::{NodeId, Permissions};
    use std::collections::BTreeMap;

    fn config(topics: &[(Topic, &str, usize)]) -> EffectiveAlbumConfig {
        EffectiveAlbumConfig {
            album: AlbumInfo {
                id: NodeId::from("n1"),
                path: "Travel".into(),
                permissions: Permissions::all(),
                etag: "e1".into(),
                mtime: 0,
            },
            topics: topics
                .iter()
                .map(|(topic, yaml, level)| {
                    (
                        *topic,
                        Fragment {
                            fields: serde_yaml::from_str(yaml).unwrap(),
                            level: *level,
                        },
                    )
                })
                .collect::<BTreeMap<_, _>>(),
            error: None,
        }
    }

    fn album(path: &str) -> DiscoveredAlbum {
        DiscoveredAlbum {
            id: NodeId::from(path),
            path: path.into(),
            mtime: 0,
        }
    }

    fn media(path: &str) -> DiscoveredMedia {
        DiscoveredMedia {
            id: NodeId::from(path),
            path: path.into(),
            media_type: "image/jpeg".into(),
            mtime: 0,
            etag: String::new(),
            size: 0,
        }
    }

    fn preview(id: &str, status: PreviewStatus, bytes: usize) -> PreviewResult {
        PreviewResult {
            id: NodeId::from(id),
            bytes: vec![0; bytes],
            media_type: "image/png".into(),
            status,
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1000), "1000");
    }

    #[test]
    fn indent_levels() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(2), "        ");
    }

    #[test]
    fn album_header_pluralizes() {
        assert_eq!(album_header(1, "Japan", 1), "001 Japan (1 photo)");
        assert_eq!(album_header(2, "Italy", 0), "002 Italy (0 photos)");
    }

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééééé", 3), "ééé...");
    }

    #[test]
    fn display_values() {
        assert_eq!(display_value(&Value::Null), "~");
        assert_eq!(display_value(&Value::Bool(true)), "true");
        assert_eq!(display_value(&Value::String("date".into())), "date");
    }

    #[test]
    fn display_name_of_root() {
        assert_eq!(display_name(""), "/");
        assert_eq!(display_name("a/b"), "b");
    }

    // =========================================================================
    // Listing
    // =========================================================================

    #[test]
    fn listing_nests_albums_and_files() {
        let response = ListResponse {
            files: vec![
                media("Travel/001-dawn.jpg"),
                media("Travel/Japan/001-tokyo.jpg"),
            ],
            albums: vec![album("Travel"), album("Travel/Japan"), album("Travel/Italy")],
            config: config(&[]),
            etag: "e1".into(),
            unchanged: false,
        };
        assert_eq!(
            format_listing("Travel", &response),
            vec![
                "Travel",
                "001 Travel (1 photo)",
                "    001 001-dawn.jpg",
                "    001 Japan (1 photo)",
                "        001 001-tokyo.jpg",
                "    002 Italy (0 photos)",
                "",
                "Config",
                "    (defaults)",
            ]
        );
    }

    #[test]
    fn unchanged_listing_shows_etag() {
        let response = ListResponse {
            files: Vec::new(),
            albums: Vec::new(),
            config: config(&[]),
            etag: "e9".into(),
            unchanged: true,
        };
        let lines = format_listing("", &response);
        assert_eq!(lines[0], "/");
        assert_eq!(lines[1], "    unchanged (etag e9)");
    }

    // =========================================================================
    // Config
    // =========================================================================

    #[test]
    fn config_lines_show_levels() {
        let lines = format_config(&config(&[
            (Topic::Sorting, "type: date\norder: asc", 0),
            (Topic::Features, "native_svg: yes", 2),
        ]));
        assert_eq!(
            lines,
            vec![
                "Config",
                "    sorting (level 0): order=asc, type=date",
                "    features (level 2): native_svg=yes",
            ]
        );
    }

    #[test]
    fn config_error_is_shown_with_source() {
        let mut cfg = config(&[]);
        cfg.error = Some(ConfigIssue {
            message: "YAML error".into(),
            path: "Travel/gallery.cnf".into(),
            level: 1,
        });
        let lines = format_config(&cfg);
        assert!(lines.contains(&"    Error: YAML error".to_string()));
        assert!(lines.contains(&"        Source: Travel/gallery.cnf (level 1)".to_string()));
    }

    // =========================================================================
    // Previews and warm
    // =========================================================================

    #[test]
    fn preview_line_with_destination() {
        let line = format_preview(
            &preview("n5", PreviewStatus::Ok, 1234),
            Some(Path::new("thumb.png")),
        );
        assert_eq!(line, "n5: ok (image/png, 1234 bytes) → thumb.png");
    }

    #[test]
    fn preview_line_for_lookup_failure() {
        let line = format_preview(&preview("n6", PreviewStatus::NotFound, 0), None);
        assert_eq!(line, "n6: not found");
    }

    #[test]
    fn warm_summary_lists_failures() {
        let results = vec![
            preview("n1", PreviewStatus::Ok, 10),
            preview("n2", PreviewStatus::Failed, 10),
        ];
        let lines = format_warm_summary(&results, CacheStats { hits: 1, misses: 1 });
        assert_eq!(
            lines,
            vec![
                "Warmed 2 thumbnails (1 ok, 1 failed)",
                "    n2: failed, fallback icon (image/png, 10 bytes)",
                "Cache: 1 cached, 1 rendered (2 total)",
            ]
        );
    }

    #[test]
    fn warm_summary_all_ok() {
        let results = vec![preview("n1", PreviewStatus::Ok, 10)];
        let lines = format_warm_summary(&results, CacheStats { hits: 0, misses: 1 });
        assert_eq!(lines, vec!["Warmed 1 thumbnails", "Cache: 1 rendered"]);
    }
}
