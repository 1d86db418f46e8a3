//! Filesystem configuration source backed by capability-scoped directories.

use crate::tool_registry::{
    domain::{ConsumerConfig, ConsumerConfigLookup, ConsumerName, GlobalConfig},
    ports::{ConfigSource, ConfigSourceError, ConfigSourceResult},
};
use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use serde::de::DeserializeOwned;

/// Default global configuration file name.
pub const DEFAULT_GLOBAL_FILE: &str = "mcp_config.json";
/// Default directory holding per-consumer files.
pub const DEFAULT_CONSUMER_DIR: &str = "consumers";
/// Default per-consumer file suffix.
pub const DEFAULT_CONSUMER_SUFFIX: &str = ".json";

/// Location of configuration files relative to a root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLayout {
    root: Utf8PathBuf,
    global_file: Utf8PathBuf,
    consumer_dir: Utf8PathBuf,
    consumer_suffix: String,
}

impl ConfigLayout {
    /// Creates the default layout rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            global_file: Utf8PathBuf::from(DEFAULT_GLOBAL_FILE),
            consumer_dir: Utf8PathBuf::from(DEFAULT_CONSUMER_DIR),
            consumer_suffix: DEFAULT_CONSUMER_SUFFIX.to_owned(),
        }
    }

    /// Replaces the root directory.
    #[must_use]
    pub fn with_root(mut self, root: impl Into<Utf8PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Replaces the global file path, relative to the root.
    #[must_use]
    pub fn with_global_file(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.global_file = path.into();
        self
    }

    /// Replaces the consumer directory, relative to the root.
    #[must_use]
    pub fn with_consumer_dir(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.consumer_dir = path.into();
        self
    }

    /// Replaces the consumer file suffix.
    #[must_use]
    pub fn with_consumer_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.consumer_suffix = suffix.into();
        self
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Returns the global file path relative to the root.
    #[must_use]
    pub fn global_file(&self) -> &Utf8Path {
        &self.global_file
    }

    /// Returns the primary file path of `consumer` relative to the root.
    #[must_use]
    pub fn consumer_file(&self, consumer: &ConsumerName) -> Utf8PathBuf {
        self.consumer_dir
            .join(format!("{consumer}{}", self.consumer_suffix))
    }
}

impl Default for ConfigLayout {
    fn default() -> Self {
        Self::new(".")
    }
}

/// Configuration source reading JSON files below a root directory.
///
/// Every access goes through a [`Dir`] handle opened on the root, so relative
/// paths cannot escape it.
#[derive(Debug, Clone, Default)]
pub struct FsConfigSource {
    layout: ConfigLayout,
}

impl FsConfigSource {
    /// Creates a source for `layout`.
    #[must_use]
    pub const fn new(layout: ConfigLayout) -> Self {
        Self { layout }
    }

    /// Returns the file layout.
    #[must_use]
    pub const fn layout(&self) -> &ConfigLayout {
        &self.layout
    }

    fn display_path(&self, relative: &Utf8Path) -> String {
        self.layout.root.join(relative).into_string()
    }

    fn open_root(&self) -> ConfigSourceResult<Option<Dir>> {
        match Dir::open_ambient_dir(&self.layout.root, ambient_authority()) {
            Ok(dir) => Ok(Some(dir)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(ConfigSourceError::read(self.layout.root.as_str(), err)),
        }
    }

    fn read_json<T: DeserializeOwned>(
        &self,
        dir: &Dir,
        relative: &Utf8Path,
    ) -> ConfigSourceResult<Option<T>> {
        let exists = dir
            .try_exists(relative)
            .map_err(|err| ConfigSourceError::read(self.display_path(relative), err))?;
        if !exists {
            return Ok(None);
        }

        let contents = dir
            .read_to_string(relative)
            .map_err(|err| ConfigSourceError::read(self.display_path(relative), err))?;
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|err| ConfigSourceError::Parse {
                path: self.display_path(relative),
                reason: err.to_string(),
            })
    }
}

#[async_trait]
impl ConfigSource for FsConfigSource {
    async fn load_global(&self) -> ConfigSourceResult<GlobalConfig> {
        let Some(dir) = self.open_root()? else {
            return Ok(GlobalConfig::default());
        };
        Ok(self
            .read_json(&dir, self.layout.global_file())?
            .unwrap_or_default())
    }

    async fn load_consumer(
        &self,
        consumer: &ConsumerName,
        fallback: Option<&ConsumerName>,
    ) -> ConfigSourceResult<ConsumerConfigLookup> {
        let Some(dir) = self.open_root()? else {
            return Ok(ConsumerConfigLookup::absent());
        };

        if let Some(config) = self.read_json(&dir, &self.layout.consumer_file(consumer))? {
            return Ok(ConsumerConfigLookup::primary(config));
        }

        if let Some(name) = fallback
            && let Some(config) = self.read_json(&dir, &self.layout.consumer_file(name))?
        {
            return Ok(ConsumerConfigLookup::fallback(config, name.clone()));
        }

        Ok(ConsumerConfigLookup::absent())
    }

    async fn save_consumer(
        &self,
        consumer: &ConsumerName,
        config: &ConsumerConfig,
    ) -> ConfigSourceResult<()> {
        let root = self.layout.root.as_str();
        Dir::create_ambient_dir_all(root, ambient_authority())
            .map_err(|err| ConfigSourceError::write(root, err))?;
        let dir = Dir::open_ambient_dir(root, ambient_authority())
            .map_err(|err| ConfigSourceError::write(root, err))?;

        let relative = self.layout.consumer_file(consumer);
        if let Some(parent) = relative.parent()
            && !parent.as_str().is_empty()
        {
            dir.create_dir_all(parent)
                .map_err(|err| ConfigSourceError::write(self.display_path(parent), err))?;
        }

        let mut payload = serde_json::to_string_pretty(config)
            .map_err(|err| ConfigSourceError::Serialize(err.to_string()))?;
        payload.push('\n');
        dir.write(&relative, payload)
            .map_err(|err| ConfigSourceError::write(self.display_path(&relative), err))
    }
}
