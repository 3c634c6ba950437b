use clap::{Parser, Subcommand};
use gallery_tree::discovery::{DiscoveredMedia, ListMode};
use gallery_tree::gallery::{Gallery, ListRequest, PreviewResult, Viewer};
use gallery_tree::imaging::{PreviewGenerator, RustGenerator, ThumbnailShape};
use gallery_tree::settings::{self, ProcessingSettings};
use gallery_tree::storage::{LocalStorage, NodeId};
use gallery_tree::{cache::PreviewCache, output};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "gallery-tree")]
#[command(about = "Browse a folder tree as a photo gallery")]
#[command(long_about = "\
Browse a folder tree as a photo gallery

Folders are albums. Each album shows up to four of its own pictures plus the
first pictures found below it. Album settings come from YAML files that
cascade from parent folders; a privacy sentinel hides a folder and
everything below it.

Content structure:

  photos/
  ├── gallery.toml                 # Engine settings (optional)
  ├── gallery.cnf                  # Album config (YAML, optional)
  ├── Travel/
  │   ├── gallery.cnf              # sorting / design / information / features
  │   ├── 001-dawn.jpg
  │   └── Japan/
  │       └── 001-tokyo.jpg
  └── Private/
      └── .nomedia                 # Hidden, with everything below it

Album config topics (parents apply only with `inherit: yes`):
  sorting:      type, order
  design:       visual settings
  information:  description_link (dropped above a share root)
  features:     native_svg, external_shares

Run 'gallery-tree gen-config' to print a documented gallery.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Content directory
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Settings file (default: <root>/gallery.toml)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Owner name used to partition the preview cache
    #[arg(long, default_value = "local", global = true)]
    owner: String,

    /// View the tree through a share rooted at this folder
    #[arg(long, global = true)]
    share: Option<String>,

    /// Print JSON instead of the text view where supported
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the pictures and sub-albums of an album
    List {
        /// Album path relative to the viewer's root
        #[arg(default_value = "")]
        path: String,
        /// Walk every sub-album instead of sampling four pictures each
        #[arg(long)]
        full: bool,
        /// Etag from a previous listing; prints "unchanged" if it still matches
        #[arg(long)]
        etag: Option<String>,
        /// Restrict to these media types (comma separated)
        #[arg(long, value_delimiter = ',')]
        types: Vec<String>,
    },
    /// Show the effective album config
    Config {
        #[arg(default_value = "")]
        path: String,
    },
    /// Render a bounded preview of one picture
    Preview {
        id: String,
        width: u32,
        height: u32,
        /// Write the encoded preview here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Render a thumbnail of one picture
    Thumbnail {
        id: String,
        /// Row thumbnail (2:1 box) instead of a square
        #[arg(long)]
        row: bool,
        /// Size multiplier
        #[arg(long, default_value_t = 1.0)]
        scale: f32,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Pre-render square thumbnails for every picture below an album
    Warm {
        #[arg(default_value = "")]
        path: String,
        /// Drop this owner's cached previews first
        #[arg(long)]
        fresh: bool,
    },
    /// Print a stock gallery.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Command::GenConfig = cli.command {
        print!("{}", settings::stock_settings_toml());
        return Ok(());
    }

    let settings_path = cli
        .settings
        .clone()
        .unwrap_or_else(|| cli.root.join(settings::SETTINGS_FILENAME));
    let settings = settings::load_settings(&settings_path)?;
    debug!(path = %settings_path.display(), "settings loaded");

    let storage = LocalStorage::new(&cli.root)?;
    let cache_dir = settings.previews.cache_path(&cli.root);
    hide_cache_dir(&cache_dir, &settings.files.privacy_sentinel)?;
    let generator = RustGenerator::new(PreviewCache::new(cache_dir));
    let gallery = Gallery::new(&storage, &generator, &settings);
    let viewer = match &cli.share {
        Some(root) => Viewer::share(cli.owner.clone(), root)?,
        None => Viewer::owner(cli.owner.clone()),
    };

    match cli.command {
        Command::List {
            path,
            full,
            etag,
            types,
        } => {
            let request = ListRequest {
                path: path.clone(),
                media_types: types,
                etag,
                mode: if full { ListMode::Full } else { ListMode::Overview },
            };
            let response = gallery.list_files(&viewer, &request)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                output::print_listing(&path, &response);
            }
        }
        Command::Config { path } => {
            let config = gallery.album_config(&viewer, &path)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                output::print_config(&config);
            }
        }
        Command::Preview {
            id,
            width,
            height,
            output,
        } => {
            let result = gallery.get_preview(&viewer, &NodeId::from(id.as_str()), width, height)?;
            emit_preview(&result, output.as_deref())?;
        }
        Command::Thumbnail {
            id,
            row,
            scale,
            output,
        } => {
            let shape = if row {
                ThumbnailShape::row(scale)
            } else {
                ThumbnailShape {
                    scale,
                    ..ThumbnailShape::square()
                }
            };
            let result = gallery.get_thumbnail(&viewer, &NodeId::from(id.as_str()), shape)?;
            emit_preview(&result, output.as_deref())?;
        }
        Command::Warm { path, fresh } => {
            if fresh {
                generator.cache().clear(&viewer.owner)?;
            }
            init_thread_pool(&settings.processing);
            let request = ListRequest {
                mode: ListMode::Full,
                ..ListRequest::new(path)
            };
            let listing = gallery.list_files(&viewer, &request)?;
            info!(files = listing.files.len(), "warming thumbnails");
            let results = warm(&gallery, &viewer, &listing.files);
            output::print_warm_summary(&results, generator.stats());
        }
        // Printed before settings are loaded.
        Command::GenConfig => {}
    }

    Ok(())
}

/// Render square thumbnails for `files` across the rayon pool.
fn warm<G: PreviewGenerator>(
    gallery: &Gallery<'_, LocalStorage, G>,
    viewer: &Viewer,
    files: &[DiscoveredMedia],
) -> Vec<PreviewResult> {
    let ids: Vec<NodeId> = files.iter().map(|f| f.id.clone()).collect();
    ids.par_chunks(16)
        .flat_map_iter(|chunk| gallery.get_thumbnails(viewer, chunk, ThumbnailShape::square()))
        .collect()
}

/// The default cache dir sits inside the content tree; the sentinel keeps it
/// out of listings.
fn hide_cache_dir(dir: &Path, sentinel: &str) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    let marker = dir.join(sentinel);
    if !marker.exists() {
        std::fs::write(marker, b"")?;
    }
    Ok(())
}

fn emit_preview(result: &PreviewResult, dest: Option<&Path>) -> std::io::Result<()> {
    if let Some(path) = dest {
        std::fs::write(path, &result.bytes)?;
    }
    println!("{}", output::format_preview(result, dest));
    Ok(())
}

/// Logs go to stderr so `--json` output stays parseable.
fn init_tracing(verbose: bool) {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if verbose {
            "gallery_tree=debug".into()
        } else {
            "gallery_tree=warn".into()
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing settings.
///
/// Caps at the number of available CPU cores: user can constrain down, not up.
fn init_thread_pool(processing: &ProcessingSettings) {
    let threads = settings::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
