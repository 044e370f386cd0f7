use crate::{
	catalog::Platform,
	util::{path_from_root, resolve_path},
};
use anyhow::Context;
use log::debug;
use serde::Deserialize;
use std::{
	fs,
	path::{Path, PathBuf},
};

/// Configuration file looked up in the repository root if none is given explicitly
pub const DEFAULT_CONFIG_FILE: &str = "npm-stage.toml";

/// Where the package sources live and where staged packages go
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
	/// Directory holding one template directory per platform
	pub platforms_dir: PathBuf,
	/// Source tree of the main package
	pub main_dir: PathBuf,
	/// Staging area the publish step picks the packages up from
	pub output_dir: PathBuf,
	/// File name of the manifest in every package directory
	pub manifest: String,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			platforms_dir: PathBuf::from("npm/platforms"),
			main_dir: PathBuf::from("npm/main"),
			output_dir: PathBuf::from("npm-publish"),
			manifest: "package.json".to_owned(),
		}
	}
}

impl Config {
	/// Load the configuration, `explicit` must exist if given, the default file may be absent
	pub fn load(root: &Path, explicit: Option<&Path>) -> anyhow::Result<Self> {
		let path = match explicit {
			Some(path) => path_from_root(root, path),
			None => {
				let path = root.join(DEFAULT_CONFIG_FILE);
				if !path.exists() {
					debug!("No {} found in {}, using defaults", DEFAULT_CONFIG_FILE, root.display());
					return Ok(Config::default());
				}
				path
			},
		};

		let content = fs::read_to_string(&path)
			.with_context(|| format!("Failed to read configuration {}", path.display()))?;
		let config: Config = toml::from_str(&content)
			.with_context(|| format!("Failed to parse configuration {}", path.display()))?;
		debug!("Loaded configuration from {}: {:?}", path.display(), config);
		Ok(config)
	}

	/// Resolve all directories against `root`, `output` replacing the configured staging area.
	///
	/// Symlinks and `..` are resolved, so the overlap checks see where files actually go.
	pub fn layout(self, root: &Path, output: Option<&Path>) -> anyhow::Result<Layout> {
		let layout = Layout {
			platforms_dir: resolve_path(&path_from_root(root, &self.platforms_dir))?,
			main_dir: resolve_path(&path_from_root(root, &self.main_dir))?,
			output_dir: resolve_path(&path_from_root(root, output.unwrap_or(&self.output_dir)))?,
			manifest: self.manifest,
		};
		layout.check()?;
		Ok(layout)
	}
}

/// The resolved directory layout of a staging run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
	pub platforms_dir: PathBuf,
	pub main_dir: PathBuf,
	pub output_dir: PathBuf,
	pub manifest: String,
}

fn overlaps(a: &Path, b: &Path) -> bool {
	a.starts_with(b) || b.starts_with(a)
}

impl Layout {
	pub fn platform_template(&self, platform: Platform) -> PathBuf {
		self.platforms_dir.join(platform.id()).join(&self.manifest)
	}

	pub fn platform_output_dir(&self, platform: Platform) -> PathBuf {
		self.output_dir.join(platform.id())
	}

	pub fn main_output_dir(&self) -> PathBuf {
		self.output_dir.join("main")
	}

	/// Staging must never write into the trees it reads from
	fn check(&self) -> anyhow::Result<()> {
		if self.manifest.is_empty() || self.manifest.contains(['/', '\\']) {
			anyhow::bail!("The manifest must be a plain file name, not {:?}", self.manifest);
		}
		// a symlink below the staging area may still lead back into the sources
		let main_output_dir = resolve_path(&self.main_output_dir())?;
		if self.output_dir.starts_with(&self.main_dir) || overlaps(&main_output_dir, &self.main_dir) {
			anyhow::bail!(
				"The staging area {} overlaps the main package source {}",
				self.output_dir.display(),
				self.main_dir.display()
			);
		}
		if self.output_dir == self.platforms_dir {
			anyhow::bail!(
				"The staging area {} is the platform template directory",
				self.output_dir.display()
			);
		}
		for platform in Platform::ALL {
			let out_dir = resolve_path(&self.platform_output_dir(platform))?;
			if out_dir == self.platforms_dir.join(platform.id()) {
				anyhow::bail!(
					"Staging {} would overwrite its template in {}",
					platform,
					self.platforms_dir.display()
				);
			}
		}
		Ok(())
	}
}
