//! Store configuration: file naming conventions and recovery policy.
use std::env;
use std::path::{Path, PathBuf};

use crate::error::Rejected;

/// What to do with a manifest that exists but cannot be read or parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CorruptManifestPolicy {
    /// Replace it with a fresh, empty manifest.
    #[default]
    Recreate,
    /// Rename it aside (`<manifest>.corrupt`) before writing a fresh one.
    Backup,
}

impl std::str::FromStr for CorruptManifestPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "recreate" => Ok(Self::Recreate),
            "backup" => Ok(Self::Backup),
            other => Err(format!("unknown corrupt manifest policy: {other}")),
        }
    }
}

/// Naming conventions shared by every store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Extension of recorded clips, without the dot.
    pub audio_extension: String,
    /// Manifest file name inside a story directory.
    pub manifest_file: String,
    /// Reserved track name of the in-progress recording.
    pub wip_name: String,
    pub corrupt_manifest: CorruptManifestPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            audio_extension: "3gp".to_string(),
            manifest_file: "story.json".to_string(),
            wip_name: "_new_recording".to_string(),
            corrupt_manifest: CorruptManifestPolicy::default(),
        }
    }
}

impl StoreConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `STORYTAP_AUDIO_EXT` - Clip file extension (default: 3gp)
    /// - `STORYTAP_MANIFEST` - Manifest file name (default: story.json)
    /// - `STORYTAP_WIP_NAME` - Reserved recording name (default: _new_recording)
    /// - `STORYTAP_CORRUPT_MANIFEST` - `recreate` or `backup` (default: recreate)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(ext) = env::var("STORYTAP_AUDIO_EXT")
            && !ext.trim().is_empty()
        {
            config.audio_extension = ext.trim().trim_start_matches('.').to_string();
        }

        if let Ok(name) = env::var("STORYTAP_MANIFEST")
            && !name.trim().is_empty()
        {
            config.manifest_file = name.trim().to_string();
        }

        if let Ok(name) = env::var("STORYTAP_WIP_NAME")
            && !name.trim().is_empty()
        {
            config.wip_name = name.trim().to_string();
        }

        if let Some(policy) = read_env::<CorruptManifestPolicy>("STORYTAP_CORRUPT_MANIFEST") {
            config.corrupt_manifest = policy;
        }

        config
    }

    pub fn manifest_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.manifest_file)
    }

    pub fn track_path(&self, dir: &Path, name: &str) -> PathBuf {
        dir.join(format!("{}.{}", name, self.audio_extension))
    }

    pub fn wip_path(&self, dir: &Path) -> PathBuf {
        self.track_path(dir, &self.wip_name)
    }

    /// Extracts the track name from a directory entry, if it is a clip.
    ///
    /// Only names accepted by [`validate_name`](Self::validate_name) count,
    /// so the WIP recording and hidden files are not tracks.
    pub fn track_name<'a>(&self, file_name: &'a str) -> Option<&'a str> {
        let name = file_name
            .strip_suffix(self.audio_extension.as_str())?
            .strip_suffix('.')?;
        self.validate_name(name).is_ok().then_some(name)
    }

    /// Checks that `name` can be used as a track or story name.
    pub fn validate_name(&self, name: &str) -> Result<(), Rejected> {
        let invalid = name.trim().is_empty()
            || name == "."
            || name == ".."
            || name.starts_with('.')
            || name.contains(['/', '\\', '\0'])
            || name == self.wip_name;
        if invalid {
            return Err(Rejected::InvalidName(name.to_string()));
        }
        Ok(())
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}
