//! Per-album configuration.
//!
//! Albums are configured by a YAML file (`gallery.cnf` by default) placed in
//! any folder. Each top-level key is a *topic*:
//!
//! ```yaml
//! sorting:
//!   type: date        # date | name
//!   order: des        # asc | des
//!   inherit: yes
//! design:
//!   background: "#1a1a1a"
//! information:
//!   description_link: readme.md
//!   copyright_link: copyright.md
//! features:
//!   external_shares: yes
//!   native_svg: no
//! ```
//!
//! Configuration is resolved *upward*: starting at the album folder, the
//! [`ConfigResolver`] climbs toward the declared root and takes, per topic,
//! the nearest usable fragment. A fragment found above the start folder is
//! only usable when it says `inherit: yes` (or, for `features`, when it sits
//! in the root). A privacy sentinel anywhere on the way discards the whole
//! result.
//!
//! | Module | Role |
//! |--------|------|
//! | [`parser`] | BOM stripping and YAML parsing into topic sections |
//! | [`validator`] | Rejects fragments with values the front end cannot use |
//! | [`resolver`] | The upward walk and merge |

pub mod parser;
pub mod resolver;
pub mod validator;

pub use parser::{ParseError, Sections, parse_album_config};
pub use resolver::{ConfigResolver, Resolution, ResolveScope};
pub use validator::is_safe;

use crate::storage::{Node, NodeId, Permissions};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;

/// Field name → value for one topic.
pub type FieldMap = BTreeMap<String, Value>;

/// Configuration topics understood by the gallery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Sorting,
    Design,
    Information,
    Features,
}

impl Topic {
    pub const ALL: [Topic; 4] = [
        Topic::Sorting,
        Topic::Design,
        Topic::Information,
        Topic::Features,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Topic::Sorting => "sorting",
            Topic::Design => "design",
            Topic::Information => "information",
            Topic::Features => "features",
        }
    }
}

/// One topic's data from one folder, tagged with how far above the start
/// folder it was found.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fragment {
    #[serde(flatten)]
    pub fields: FieldMap,
    pub level: usize,
}

impl Fragment {
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Whether the fragment opts into inheritance (`inherit: yes`).
    pub fn inherits(&self) -> bool {
        self.fields.get("inherit").is_some_and(is_yes)
    }
}

/// YAML truthiness as written by album authors: `yes` or `true`.
pub fn is_yes(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.eq_ignore_ascii_case("yes") || s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// Identity of the folder a configuration was resolved for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlbumInfo {
    pub id: NodeId,
    pub path: String,
    pub permissions: Permissions,
    pub etag: String,
    pub mtime: u64,
}

impl From<&Node> for AlbumInfo {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id.clone(),
            path: node.path.clone(),
            permissions: node.permissions,
            etag: node.etag.clone(),
            mtime: node.mtime,
        }
    }
}

/// A configuration file that could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigIssue {
    pub message: String,
    /// Path of the offending file.
    pub path: String,
    pub level: usize,
}

/// Merged configuration for one album.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectiveAlbumConfig {
    pub album: AlbumInfo,
    #[serde(flatten)]
    pub topics: BTreeMap<Topic, Fragment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ConfigIssue>,
}

impl EffectiveAlbumConfig {
    pub fn topic(&self, topic: Topic) -> Option<&Fragment> {
        self.topics.get(&topic)
    }

    /// Whether `features.<name>` is switched on.
    pub fn feature_enabled(&self, name: &str) -> bool {
        self.topic(Topic::Features)
            .and_then(|f| f.fields.get(name))
            .is_some_and(is_yes)
    }
}
