//! Streaming reader settings.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::archive::ArchiveOptions;
use crate::util::{Error, Result};

/// Which dependency groups `read_group(.., true)` decodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubgroupPolicy {
    /// Only the groups listed by the requested group.
    Direct,
    /// Everything reachable through subgroup lists, each group once.
    #[default]
    Transitive,
}

/// Settings for a [`StreamingObjectReader`](super::StreamingObjectReader).
///
/// ```json
/// {
///   "mounts": { "cache": "/data/game/LocalCacheWinGame/package" },
///   "use_mmap": true,
///   "subgroups": "transitive",
///   "cache_last_chunk": true
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Device name to filesystem root.
    pub mounts: BTreeMap<String, PathBuf>,
    pub use_mmap: bool,
    pub subgroups: SubgroupPolicy,
    pub cache_last_chunk: bool,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            mounts: BTreeMap::new(),
            use_mmap: true,
            subgroups: SubgroupPolicy::default(),
            cache_last_chunk: true,
        }
    }
}

impl StreamingConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    /// Mount `root` under `device`.
    pub fn with_mount(mut self, device: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        self.mounts.insert(device.into(), root.into());
        self
    }

    pub fn with_subgroups(mut self, policy: SubgroupPolicy) -> Self {
        self.subgroups = policy;
        self
    }

    pub fn archive_options(&self) -> ArchiveOptions {
        ArchiveOptions { use_mmap: self.use_mmap, cache_last_chunk: self.cache_last_chunk }
    }
}
