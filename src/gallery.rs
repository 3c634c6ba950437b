//! Request-level operations.
//!
//! [`Gallery`] ties the pieces together the way a front end uses them:
//!
//! - **List files**: resolve the album's configuration upward, then discover
//!   media downward with the filters that configuration switches on.
//! - **Previews**: render through the [`PreviewGenerator`]; square
//!   thumbnails are additionally fitted to an exact canvas and written back
//!   to the generator's cache.
//!
//! Every call is independent. Lookups are made fresh from the storage per
//! request, and no state survives between calls, so one `Gallery` can serve
//! many threads at once.
//!
//! ## Failure model
//!
//! Unknown ids/paths and privacy violations are returned as
//! [`GalleryError`]. A broken album config or a failed preview is not an
//! error: the former shows up in [`EffectiveAlbumConfig::error`], the latter
//! as a fallback icon with a non-`Ok` [`PreviewStatus`].

use crate::album_config::{ConfigResolver, EffectiveAlbumConfig, Resolution, ResolveScope, Topic};
use crate::discovery::{DiscoveredAlbum, DiscoveredMedia, ListMode, MediaDiscoverer, MediaTypes};
use crate::imaging::{
    PreviewGenerator, PreviewSpec, Quality, ThumbnailShape, encode_preview, fallback_icon, fit,
    needs_fit, repair_cache,
};
use crate::settings::Settings;
use crate::storage::{Node, NodeId, Storage, StorageError, is_within, normalize_path};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

/// Media type admitted by `features.native_svg`.
const SVG_MEDIA_TYPE: &str = "image/svg+xml";

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Storage error: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for GalleryError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(what) | StorageError::NotAContainer(what) => {
                GalleryError::NotFound(what)
            }
            StorageError::InvalidPath(path) => GalleryError::Forbidden(path),
            other => GalleryError::Storage(other),
        }
    }
}

/// Who is asking, and how much of the tree they may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    /// Name used for per-user preview caching.
    pub owner: String,
    /// Highest container visible to this viewer; request paths are relative
    /// to it.
    pub virtual_root: String,
    /// Whether the virtual root is a share entry point rather than the
    /// viewer's own root.
    pub shared: bool,
}

impl Viewer {
    /// A logged-in user seeing the whole store.
    pub fn owner(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            virtual_root: String::new(),
            shared: false,
        }
    }

    /// A visitor of the share rooted at `root`, owned by `owner`.
    pub fn share(owner: impl Into<String>, root: &str) -> Result<Self, GalleryError> {
        Ok(Self {
            owner: owner.into(),
            virtual_root: normalize_path(root)?,
            shared: true,
        })
    }
}

/// Input of [`Gallery::list_files`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRequest {
    /// Album path relative to the viewer's virtual root.
    pub path: String,
    /// Media types the client can show; empty means the configured defaults.
    pub media_types: Vec<String>,
    /// Version tag from the client's previous listing.
    pub etag: Option<String>,
    pub mode: ListMode,
}

impl ListRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListResponse {
    pub files: Vec<DiscoveredMedia>,
    pub albums: Vec<DiscoveredAlbum>,
    pub config: EffectiveAlbumConfig,
    /// Version tag of this listing.
    pub etag: String,
    /// The client's tag was current; `files` and `albums` are left empty.
    pub unchanged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewStatus {
    Ok,
    /// No generator handles this media type.
    Unsupported,
    /// The generator failed for this resource.
    Failed,
    NotFound,
    Forbidden,
}

impl PreviewStatus {
    pub fn is_ok(self) -> bool {
        self == PreviewStatus::Ok
    }
}

/// Bytes to send for one preview request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewResult {
    pub id: NodeId,
    pub bytes: Vec<u8>,
    pub media_type: String,
    pub status: PreviewStatus,
}

/// Gallery operations over one storage and preview generator.
pub struct Gallery<'a, S: Storage + ?Sized, G: PreviewGenerator> {
    storage: &'a S,
    generator: &'a G,
    settings: &'a Settings,
}

impl<'a, S: Storage + ?Sized, G: PreviewGenerator> Gallery<'a, S, G> {
    pub fn new(storage: &'a S, generator: &'a G, settings: &'a Settings) -> Self {
        Self {
            storage,
            generator,
            settings,
        }
    }

    fn resolver(&self) -> ConfigResolver<'_, S> {
        ConfigResolver::new(self.storage, &self.settings.files, &self.settings.walk)
    }

    fn virtual_root(&self, viewer: &Viewer) -> Result<Node, GalleryError> {
        let root = self.storage.node_at(&viewer.virtual_root)?;
        if !root.is_container() {
            return Err(GalleryError::NotFound(viewer.virtual_root.clone()));
        }
        Ok(root)
    }

    /// Album container at a viewer-relative path.
    fn locate_album(&self, viewer: &Viewer, path: &str) -> Result<(Node, Node), GalleryError> {
        let root = self.virtual_root(viewer)?;
        let relative = normalize_path(path)?;
        let full = match (root.path.is_empty(), relative.is_empty()) {
            (_, true) => root.path.clone(),
            (true, false) => relative,
            (false, false) => format!("{}/{}", root.path, relative),
        };
        let album = self.storage.node_at(&full)?;
        if !album.is_container() {
            return Err(GalleryError::NotFound(path.to_string()));
        }
        if !album.readable {
            return Err(GalleryError::Forbidden(path.to_string()));
        }
        Ok((root, album))
    }

    /// Owners walk up to their virtual root. Share visitors walk up to the
    /// owner's root like the owner would, but see no links from above the
    /// share.
    fn scope(
        &self,
        viewer: &Viewer,
        root: &Node,
        album: &Node,
    ) -> Result<ResolveScope, GalleryError> {
        if viewer.shared {
            let owner_root = self.storage.root()?;
            Ok(ResolveScope::new(owner_root.id)
                .with_share_boundary(album.depth() - root.depth()))
        } else {
            Ok(ResolveScope::new(root.id.clone()))
        }
    }

    fn resolve(
        &self,
        viewer: &Viewer,
        root: &Node,
        album: &Node,
        topics: &[Topic],
    ) -> Result<EffectiveAlbumConfig, GalleryError> {
        let scope = self.scope(viewer, root, album)?;
        match self.resolver().resolve(album, &scope, topics)? {
            Resolution::Album(config) => Ok(config),
            Resolution::Blocked => Err(GalleryError::Forbidden(album.path.clone())),
        }
    }

    /// Effective configuration of the album at `path`.
    pub fn album_config(
        &self,
        viewer: &Viewer,
        path: &str,
    ) -> Result<EffectiveAlbumConfig, GalleryError> {
        let (root, album) = self.locate_album(viewer, path)?;
        let mut config = self.resolve(viewer, &root, &album, &Topic::ALL)?;
        relativize_config(&mut config, &root.path);
        Ok(config)
    }

    /// Media types a listing may return for this request and configuration.
    fn media_filter(&self, requested: &[String], config: &EffectiveAlbumConfig) -> MediaTypes {
        let wanted: Vec<&str> = if requested.is_empty() {
            self.settings.media.types.iter().map(String::as_str).collect()
        } else {
            requested.iter().map(String::as_str).collect()
        };
        let mut types = MediaTypes::new(
            wanted
                .into_iter()
                .filter(|t| self.generator.is_mime_supported(t)),
        );
        // SVG is passed through to the browser rather than rendered.
        if config.feature_enabled("native_svg")
            && (requested.is_empty() || requested.iter().any(|t| t == SVG_MEDIA_TYPE))
        {
            types.insert(SVG_MEDIA_TYPE);
        }
        types
    }

    /// List an album: its configuration plus the media below it.
    pub fn list_files(
        &self,
        viewer: &Viewer,
        request: &ListRequest,
    ) -> Result<ListResponse, GalleryError> {
        let (root, album) = self.locate_album(viewer, &request.path)?;
        let mut config = self.resolve(viewer, &root, &album, &Topic::ALL)?;
        let etag = album.etag.clone();

        if request.etag.as_deref() == Some(etag.as_str()) {
            debug!(path = %album.path, "listing unchanged");
            relativize_config(&mut config, &root.path);
            return Ok(ListResponse {
                files: Vec::new(),
                albums: Vec::new(),
                config,
                etag,
                unchanged: true,
            });
        }

        let media_types = self.media_filter(&request.media_types, &config);
        let discoverer = MediaDiscoverer::new(
            self.storage,
            &self.settings.files,
            &self.settings.walk,
            &media_types,
        )
        .allow_external_mounts(config.feature_enabled("external_shares"));
        let found = discoverer.run(&album, request.mode)?;

        relativize_config(&mut config, &root.path);
        Ok(ListResponse {
            files: found
                .files
                .into_iter()
                .map(|mut f| {
                    f.path = relative_to(&f.path, &root.path);
                    f
                })
                .collect(),
            albums: found
                .albums
                .into_iter()
                .map(|mut a| {
                    a.path = relative_to(&a.path, &root.path);
                    a
                })
                .collect(),
            config,
            etag,
            unchanged: false,
        })
    }

    /// A resource the viewer may see a preview of.
    fn locate_resource(&self, viewer: &Viewer, id: &NodeId) -> Result<Node, GalleryError> {
        let root = self.virtual_root(viewer)?;
        let node = self.storage.node_by_id(id)?;
        if !node.is_resource() {
            return Err(GalleryError::NotFound(id.to_string()));
        }
        if !is_within(&node.path, &root.path) || !node.readable {
            return Err(GalleryError::Forbidden(id.to_string()));
        }
        let top = if viewer.shared {
            self.storage.root()?.id
        } else {
            root.id
        };
        if self.resolver().is_hidden(&node, &top)? {
            return Err(GalleryError::Forbidden(id.to_string()));
        }
        Ok(node)
    }

    /// Preview bounded by `width × height`, as the generator renders it.
    pub fn get_preview(
        &self,
        viewer: &Viewer,
        id: &NodeId,
        width: u32,
        height: u32,
    ) -> Result<PreviewResult, GalleryError> {
        let node = self.locate_resource(viewer, id)?;
        Ok(self.render(viewer, &node, &PreviewSpec::bounded(width, height), false))
    }

    /// Thumbnail of the given shape. Square thumbnails are exact.
    pub fn get_thumbnail(
        &self,
        viewer: &Viewer,
        id: &NodeId,
        shape: ThumbnailShape,
    ) -> Result<PreviewResult, GalleryError> {
        let node = self.locate_resource(viewer, id)?;
        let spec = shape.spec(self.settings.previews.square_size);
        Ok(self.render(viewer, &node, &spec, shape.square))
    }

    /// One thumbnail per id, in order. Lookup failures become results with
    /// a `NotFound`/`Forbidden` status instead of failing the batch.
    pub fn get_thumbnails(
        &self,
        viewer: &Viewer,
        ids: &[NodeId],
        shape: ThumbnailShape,
    ) -> Vec<PreviewResult> {
        ids.iter()
            .map(|id| match self.get_thumbnail(viewer, id, shape) {
                Ok(result) => result,
                Err(e) => {
                    let status = match e {
                        GalleryError::Forbidden(_) => PreviewStatus::Forbidden,
                        GalleryError::NotFound(_) => PreviewStatus::NotFound,
                        GalleryError::Storage(_) => PreviewStatus::Failed,
                    };
                    debug!(id = %id, error = %e, "thumbnail lookup failed");
                    PreviewResult {
                        id: id.clone(),
                        bytes: Vec::new(),
                        media_type: String::new(),
                        status,
                    }
                }
            })
            .collect()
    }

    fn render(
        &self,
        viewer: &Viewer,
        node: &Node,
        spec: &PreviewSpec,
        exact: bool,
    ) -> PreviewResult {
        if !self.generator.is_mime_supported(&node.media_type) {
            return self.fallback(node, spec, PreviewStatus::Unsupported);
        }

        let raw = match self
            .generator
            .generate(self.storage, node, &viewer.owner, spec)
        {
            Ok(img) => img,
            Err(e) => {
                warn!(path = %node.path, error = %e, "preview generation failed");
                return self.fallback(node, spec, PreviewStatus::Failed);
            }
        };

        let image = if exact && needs_fit((raw.width(), raw.height()), (spec.width, spec.height))
        {
            let fitted = fit(raw, spec.width, spec.height);
            repair_cache(self.generator, node, &viewer.owner, spec, &fitted);
            fitted
        } else {
            raw
        };

        match encode_preview(&image, Quality::new(self.settings.previews.quality)) {
            Ok(encoded) => PreviewResult {
                id: node.id.clone(),
                bytes: encoded.bytes,
                media_type: encoded.media_type.to_string(),
                status: PreviewStatus::Ok,
            },
            Err(e) => {
                warn!(path = %node.path, error = %e, "preview encoding failed");
                self.fallback(node, spec, PreviewStatus::Failed)
            }
        }
    }

    fn fallback(&self, node: &Node, spec: &PreviewSpec, status: PreviewStatus) -> PreviewResult {
        let size = spec.width.min(spec.height);
        match fallback_icon(&node.media_type, size) {
            Ok(icon) => PreviewResult {
                id: node.id.clone(),
                bytes: icon.bytes,
                media_type: icon.media_type.to_string(),
                status,
            },
            Err(e) => {
                warn!(error = %e, "fallback icon failed");
                PreviewResult {
                    id: node.id.clone(),
                    bytes: Vec::new(),
                    media_type: String::new(),
                    status,
                }
            }
        }
    }
}

/// `path` as seen from below `root`.
fn relative_to(path: &str, root: &str) -> String {
    if root.is_empty() || !is_within(path, root) {
        return path.to_string();
    }
    match path.strip_prefix(root) {
        Some("") => String::new(),
        Some(rest) => rest.strip_prefix('/').unwrap_or(rest).to_string(),
        None => path.to_string(),
    }
}

fn relativize_config(config: &mut EffectiveAlbumConfig, root: &str) {
    config.album.path = relative_to(&config.album.path, root);
    if let Some(issue) = config.error.as_mut() {
        issue.path = relative_to(&issue.path, root);
    }
}
