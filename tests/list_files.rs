//! End-to-end listing and config resolution over a real directory tree.
//!
//! Run with: cargo test --test list_files

use gallery_tree::album_config::Topic;
use gallery_tree::cache::PreviewCache;
use gallery_tree::discovery::ListMode;
use gallery_tree::gallery::{Gallery, GalleryError, ListRequest, ListResponse, Viewer};
use gallery_tree::imaging::RustGenerator;
use gallery_tree::settings::Settings;
use gallery_tree::storage::LocalStorage;
use serde_yaml::Value;
use std::fs;
use tempfile::TempDir;

struct Fixture {
    content: TempDir,
    _cache: TempDir,
    storage: LocalStorage,
    generator: RustGenerator,
    settings: Settings,
}

impl Fixture {
    fn new() -> Self {
        let content = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        let storage = LocalStorage::new(content.path()).unwrap();
        let generator = RustGenerator::new(PreviewCache::new(cache.path()));
        Self {
            content,
            _cache: cache,
            storage,
            generator,
            settings: Settings::default(),
        }
    }

    fn write(&self, rel: &str, bytes: impl AsRef<[u8]>) -> &Self {
        let path = self.content.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, bytes).unwrap();
        self
    }

    fn dir(&self, rel: &str) -> &Self {
        fs::create_dir_all(self.content.path().join(rel)).unwrap();
        self
    }

    /// `count` placeholder JPEGs named `001.jpg`, `002.jpg`, … under `dir`.
    fn jpegs(&self, dir: &str, count: usize) -> &Self {
        for i in 1..=count {
            self.write(&format!("{dir}/{i:03}.jpg"), b"jpeg");
        }
        self
    }

    fn gallery(&self) -> Gallery<'_, LocalStorage, RustGenerator> {
        Gallery::new(&self.storage, &self.generator, &self.settings)
    }

    fn list(&self, path: &str) -> ListResponse {
        self.gallery()
            .list_files(&Viewer::owner("alice"), &ListRequest::new(path))
            .unwrap()
    }
}

fn paths(response: &ListResponse) -> Vec<&str> {
    response.files.iter().map(|f| f.path.as_str()).collect()
}

fn albums(response: &ListResponse) -> Vec<&str> {
    response.albums.iter().map(|a| a.path.as_str()).collect()
}

// =========================================================================
// Configuration
// =========================================================================

#[test]
fn sorting_without_type_is_skipped_for_the_root_fragment() {
    let fx = Fixture::new();
    fx.write(
        "gallery.cnf",
        "sorting:\n  type: date\n  order: asc\n  inherit: yes\n",
    )
    .write("p/gallery.cnf", "sorting:\n  order: asc\n  inherit: yes\n")
    .dir("p/q");

    let config = fx
        .gallery()
        .album_config(&Viewer::owner("alice"), "p/q")
        .unwrap();
    let sorting = config.topic(Topic::Sorting).unwrap();
    assert_eq!(sorting.level, 2);
    assert_eq!(sorting.get_str("type"), Some("date"));
    assert_eq!(sorting.get_str("order"), Some("asc"));
    assert_eq!(config.album.path, "p/q");
    assert!(config.error.is_none());
}

#[test]
fn byte_order_mark_does_not_change_the_result() {
    let fx = Fixture::new();
    fx.write("plain/gallery.cnf", "design:\n  background: '#112233'\n")
        .write(
            "marked/gallery.cnf",
            "\u{feff}design:\n  background: '#112233'\n",
        );

    let viewer = Viewer::owner("alice");
    let plain = fx.gallery().album_config(&viewer, "plain").unwrap();
    let marked = fx.gallery().album_config(&viewer, "marked").unwrap();
    assert_eq!(plain.topics, marked.topics);
    assert!(marked.error.is_none());
    assert_eq!(
        marked.topic(Topic::Design).unwrap().get_str("background"),
        Some("#112233")
    );
}

#[test]
fn broken_config_is_reported_and_listing_continues() {
    let fx = Fixture::new();
    fx.write("bad/gallery.cnf", "sorting: [unclosed\n").jpegs("bad", 2);

    let response = fx.list("bad");
    let issue = response.config.error.as_ref().unwrap();
    assert_eq!(issue.path, "bad/gallery.cnf");
    assert_eq!(issue.level, 0);
    assert_eq!(paths(&response), vec!["bad/001.jpg", "bad/002.jpg"]);
}

#[test]
fn sentinel_above_album_blocks_it() {
    let fx = Fixture::new();
    fx.write("Private/.nomedia", "").jpegs("Private/Deep", 3);

    let result = fx
        .gallery()
        .list_files(&Viewer::owner("alice"), &ListRequest::new("Private/Deep"));
    assert!(matches!(result, Err(GalleryError::Forbidden(_))));

    let result = fx
        .gallery()
        .album_config(&Viewer::owner("alice"), "Private");
    assert!(matches!(result, Err(GalleryError::Forbidden(_))));
}

#[test]
fn missing_album_is_not_found() {
    let fx = Fixture::new();
    let result = fx
        .gallery()
        .list_files(&Viewer::owner("alice"), &ListRequest::new("Nowhere"));
    assert!(matches!(result, Err(GalleryError::NotFound(_))));
}

// =========================================================================
// Discovery
// =========================================================================

#[test]
fn quota_and_sentinel_bound_the_overview() {
    let fx = Fixture::new();
    fx.jpegs("top", 5)
        .jpegs("top/hidden", 10)
        .write("top/hidden/.nomedia", "");

    let response = fx.list("top");
    assert_eq!(
        paths(&response),
        vec!["top/001.jpg", "top/002.jpg", "top/003.jpg", "top/004.jpg"]
    );
    assert_eq!(albums(&response), vec!["top"]);
}

#[test]
fn overview_samples_sub_albums_and_full_mode_lists_everything() {
    let fx = Fixture::new();
    fx.jpegs("a", 6).jpegs("a/b", 6);

    let overview = fx.list("a");
    assert_eq!(overview.files.len(), 8);
    assert_eq!(albums(&overview), vec!["a", "a/b"]);

    let request = ListRequest {
        mode: ListMode::Full,
        ..ListRequest::new("a")
    };
    let full = fx
        .gallery()
        .list_files(&Viewer::owner("alice"), &request)
        .unwrap();
    assert_eq!(full.files.len(), 12);
}

#[test]
fn requested_types_narrow_the_listing() {
    let fx = Fixture::new();
    fx.write("mix/a.jpg", "j")
        .write("mix/b.png", "p")
        .write("mix/c.mp4", "v");

    let request = ListRequest {
        media_types: vec!["image/png".into(), "video/mp4".into()],
        ..ListRequest::new("mix")
    };
    let response = fx
        .gallery()
        .list_files(&Viewer::owner("alice"), &request)
        .unwrap();
    assert_eq!(paths(&response), vec!["mix/b.png"]);
}

#[test]
fn svg_is_listed_only_with_native_svg() {
    let fx = Fixture::new();
    fx.write("art/logo.svg", "<svg/>").write("art/a.jpg", "j");
    assert_eq!(paths(&fx.list("art")), vec!["art/a.jpg"]);

    fx.write("gallery.cnf", "features:\n  native_svg: yes\n");
    assert_eq!(paths(&fx.list("art")), vec!["art/a.jpg", "art/logo.svg"]);
}

#[test]
fn matching_etag_short_circuits() {
    let fx = Fixture::new();
    fx.jpegs("e", 2);

    let first = fx.list("e");
    assert!(!first.unchanged);

    let request = ListRequest {
        etag: Some(first.etag.clone()),
        ..ListRequest::new("e")
    };
    let second = fx
        .gallery()
        .list_files(&Viewer::owner("alice"), &request)
        .unwrap();
    assert!(second.unchanged);
    assert!(second.files.is_empty());
    assert_eq!(second.etag, first.etag);
}

#[cfg(unix)]
#[test]
fn symlinked_folders_need_external_shares() {
    let fx = Fixture::new();
    let outside = TempDir::new().unwrap();
    fs::write(outside.path().join("far.jpg"), b"jpeg").unwrap();
    fx.jpegs("home", 1);
    std::os::unix::fs::symlink(outside.path(), fx.content.path().join("home/Linked")).unwrap();

    assert_eq!(paths(&fx.list("home")), vec!["home/001.jpg"]);

    fx.write("gallery.cnf", "features:\n  external_shares: yes\n");
    assert_eq!(
        paths(&fx.list("home")),
        vec!["home/001.jpg", "home/Linked/far.jpg"]
    );
}

// =========================================================================
// Shares
// =========================================================================

#[test]
fn share_sees_relative_paths_without_outside_links() {
    let fx = Fixture::new();
    fx.write(
        "gallery.cnf",
        "information:\n  description: Trips\n  description_link: https://example.com\n  inherit: yes\n",
    )
    .jpegs("Travel", 1);

    let share = Viewer::share("alice", "Travel").unwrap();
    let shared = fx
        .gallery()
        .list_files(&share, &ListRequest::new(""))
        .unwrap();
    assert_eq!(paths(&shared), vec!["001.jpg"]);
    assert_eq!(shared.config.album.path, "");
    let info = shared.config.topic(Topic::Information).unwrap();
    assert_eq!(info.get_str("description"), Some("Trips"));
    assert_eq!(info.fields.get("description_link"), Some(&Value::Null));

    let owned = fx.list("Travel");
    let info = owned.config.topic(Topic::Information).unwrap();
    assert_eq!(info.get_str("description_link"), Some("https://example.com"));
}

#[test]
fn share_cannot_climb_out() {
    let fx = Fixture::new();
    fx.jpegs("Travel", 1).jpegs("Secret", 1);

    let share = Viewer::share("alice", "Travel").unwrap();
    let result = fx
        .gallery()
        .list_files(&share, &ListRequest::new("../Secret"));
    assert!(matches!(result, Err(GalleryError::Forbidden(_))));
}
