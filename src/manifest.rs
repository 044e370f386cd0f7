use crate::{
	catalog::{is_platform_package, platform_for_package, Platform},
	error::{ReadFailure, StageError},
	version::ResolvedVersion,
};
use log::trace;
use serde_json::{Map, Value};
use std::{
	fs, io,
	path::{Path, PathBuf},
};

/// A `package.json`, kept as an ordered JSON object so everything we don't touch is written
/// back in the order and shape we found it.
#[derive(Debug, Clone)]
pub struct Manifest {
	path: PathBuf,
	fields: Map<String, Value>,
}

impl Manifest {
	/// Read and parse the manifest at `path`
	pub fn load(path: &Path) -> Result<Self, StageError> {
		let read_failure =
			|source: ReadFailure| StageError::ManifestRead { path: path.to_owned(), source };
		let content = fs::read_to_string(path).map_err(|e| read_failure(e.into()))?;
		let value: Value = serde_json::from_str(&content).map_err(|e| read_failure(e.into()))?;
		match value {
			Value::Object(fields) => Ok(Manifest { path: path.to_owned(), fields }),
			_ => Err(StageError::ManifestShape {
				path: path.to_owned(),
				reason: "top level must be a JSON object".to_owned(),
			}),
		}
	}

	/// Like [`Manifest::load`], failing to read is reported as a broken template
	pub fn load_template(path: &Path) -> Result<Self, StageError> {
		Self::load(path).map_err(|e| match e {
			StageError::ManifestRead { path, source } => StageError::TemplateRead { path, source },
			e => e,
		})
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn name(&self) -> Option<&str> {
		self.fields.get("name").and_then(Value::as_str)
	}

	pub fn version(&self) -> Option<&str> {
		self.fields.get("version").and_then(Value::as_str)
	}

	pub fn set_version(&mut self, version: &ResolvedVersion) {
		self.fields.insert("version".to_owned(), Value::from(version.as_str()));
	}

	/// The `optionalDependencies` table, `None` if the manifest has none
	pub fn optional_dependencies(&self) -> Result<Option<&Map<String, Value>>, StageError> {
		match self.fields.get("optionalDependencies") {
			None => Ok(None),
			Some(Value::Object(deps)) => Ok(Some(deps)),
			Some(_) => Err(self.shape_error("optionalDependencies must be an object")),
		}
	}

	/// The `optionalDependencies` table, added empty if the manifest has none yet
	fn optional_dependencies_mut(&mut self) -> Result<&mut Map<String, Value>, StageError> {
		let shape_error = self.shape_error("optionalDependencies must be an object");
		self.fields
			.entry("optionalDependencies")
			.or_insert_with(|| Value::Object(Map::new()))
			.as_object_mut()
			.ok_or(shape_error)
	}

	fn shape_error(&self, reason: &str) -> StageError {
		StageError::ManifestShape { path: self.path.clone(), reason: reason.to_owned() }
	}

	/// Serialize the way `JSON.stringify(manifest, null, 2)` plus a final newline would
	pub fn render(&self) -> Result<String, io::Error> {
		let mut out = serde_json::to_string_pretty(&self.fields)?;
		out.push('\n');
		Ok(out)
	}

	/// Write the manifest to `path`, replacing what's there
	pub fn write_to(&self, path: &Path) -> Result<(), StageError> {
		let content = self.render().map_err(StageError::fs("serialize", path))?;
		fs::write(path, content).map_err(StageError::fs("write", path))
	}
}

#[derive(Debug, PartialEq, Eq)]
/// The action taken on a dependency entry
pub enum DependencyAction {
	/// Ignored, we didn't touch
	Untouched,
	/// Entry was changed, needs to be saved
	Mutated,
}

/// Hand every dependency entry of `deps` to `f`, return how many `f` mutated
pub fn edit_each_dep<F>(deps: &mut Map<String, Value>, mut f: F) -> u32
where
	F: FnMut(&str, &mut Value) -> DependencyAction,
{
	let mut counter = 0;
	for (name, value) in deps.iter_mut() {
		if f(name, value) == DependencyAction::Mutated {
			counter += 1;
		}
	}
	counter
}

/// What synchronizing the main manifest's platform dependencies did
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DependencySync {
	/// Number of platform entries whose version had to change
	pub updated: u32,
	/// Catalog platforms that had no entry yet and were added
	pub added: Vec<Platform>,
	/// Entries matching the platform prefix without being in the catalog, rewritten regardless
	pub unknown: Vec<String>,
}

/// Point every platform package reference of the main manifest at `version`.
///
/// Every prefixed key is rewritten, then the catalog is walked to make sure each platform has
/// exactly one entry.
pub fn sync_platform_dependencies(
	manifest: &mut Manifest,
	version: &ResolvedVersion,
) -> Result<DependencySync, StageError> {
	let mut sync = DependencySync::default();
	let deps = manifest.optional_dependencies_mut()?;

	sync.updated = edit_each_dep(deps, |name, value| {
		if !is_platform_package(name) {
			return DependencyAction::Untouched;
		}
		if platform_for_package(name).is_none() {
			sync.unknown.push(name.to_owned());
		}
		if value.as_str() == Some(version.as_str()) {
			return DependencyAction::Untouched;
		}
		trace!("Changing optional dependency {} from {} to {}", name, value, version);
		*value = Value::from(version.as_str());
		DependencyAction::Mutated
	});

	for platform in Platform::ALL {
		let name = platform.package_name();
		if !deps.contains_key(&name) {
			deps.insert(name, Value::from(version.as_str()));
			sync.added.push(platform);
		}
	}

	Ok(sync)
}
