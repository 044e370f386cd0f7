use crate::{
	catalog::{is_platform_package, platform_for_package, Platform},
	config::Layout,
	error::StageError,
	manifest::Manifest,
	shell::Shell,
	util::diff_tree,
	version::ResolvedVersion,
};
use serde_json::{Map, Value};
use std::path::Path;

/// Load a staged manifest, a problem description if it's not there or not readable
fn load_staged(path: &Path) -> Result<Manifest, String> {
	Manifest::load(path).map_err(|e| match e {
		StageError::ManifestRead { source, .. } => {
			format!("{}: not staged or unreadable, {}", path.display(), source)
		},
		e => e.to_string(),
	})
}

fn check_version(manifest: &Manifest, version: &ResolvedVersion, problems: &mut Vec<String>) {
	match manifest.version() {
		Some(found) if found == version.as_str() => {},
		found => problems.push(format!(
			"{}: version is {}, expected {}",
			manifest.path().display(),
			found.unwrap_or("missing"),
			version
		)),
	}
}

fn check_platform(layout: &Layout, platform: Platform, version: &ResolvedVersion) -> Vec<String> {
	let mut problems = Vec::new();
	let path = layout.platform_output_dir(platform).join(&layout.manifest);
	let manifest = match load_staged(&path) {
		Ok(m) => m,
		Err(problem) => return vec![problem],
	};

	check_version(&manifest, version, &mut problems);
	let expected = platform.package_name();
	if manifest.name() != Some(expected.as_str()) {
		problems.push(format!(
			"{}: name is {}, expected {}",
			path.display(),
			manifest.name().unwrap_or("missing"),
			expected
		));
	}
	problems
}

fn check_dependencies(
	path: &Path,
	deps: Option<&Map<String, Value>>,
	version: &ResolvedVersion,
	problems: &mut Vec<String>,
) {
	let empty = Map::new();
	let deps = deps.unwrap_or(&empty);
	for platform in Platform::ALL {
		let name = platform.package_name();
		match deps.get(&name).map(|v| v.as_str()) {
			Some(Some(found)) if found == version.as_str() => {},
			Some(found) => problems.push(format!(
				"{}: optionalDependencies.{} is {}, expected {}",
				path.display(),
				name,
				found.unwrap_or("not a string"),
				version
			)),
			None => problems.push(format!(
				"{}: optionalDependencies has no entry for {}",
				path.display(),
				name
			)),
		}
	}
	for name in deps.keys().filter(|k| is_platform_package(k)) {
		if platform_for_package(name).is_none() {
			problems.push(format!(
				"{}: optionalDependencies.{} matches no known platform",
				path.display(),
				name
			));
		}
	}
}

fn check_main(layout: &Layout, version: &ResolvedVersion) -> Result<Vec<String>, anyhow::Error> {
	let mut problems = Vec::new();
	let out_dir = layout.main_output_dir();
	let path = out_dir.join(&layout.manifest);
	let manifest = match load_staged(&path) {
		Ok(m) => m,
		Err(problem) => return Ok(vec![problem]),
	};

	check_version(&manifest, version, &mut problems);

	match manifest.optional_dependencies() {
		Ok(deps) => check_dependencies(&path, deps, version, &mut problems),
		Err(e) => problems.push(e.to_string()),
	}

	let differing = diff_tree(&layout.main_dir, &out_dir, &[Path::new(&layout.manifest)])?;
	problems.extend(differing.into_iter().map(|rel| {
		format!("{}: missing or differs from {}", out_dir.join(&rel).display(), layout.main_dir.join(&rel).display())
	}));

	Ok(problems)
}

/// Check a staged tree is complete and every cross reference agrees on `version`.
///
/// Reports every problem found rather than stopping at the first one.
pub fn verify(
	shell: &mut Shell,
	layout: &Layout,
	version: &ResolvedVersion,
) -> Result<(), anyhow::Error> {
	let mut problems = Vec::from_iter(
		Platform::ALL.into_iter().flat_map(|platform| check_platform(layout, platform, version)),
	);
	problems.extend(check_main(layout, version)?);

	if !problems.is_empty() {
		for problem in &problems {
			shell.note("Mismatch", problem)?;
		}
		anyhow::bail!(
			"Staged packages in {} are inconsistent, {} problem(s) found",
			layout.output_dir.display(),
			problems.len()
		);
	}

	shell.status(
		"Verified",
		format!(
			"{} platform packages and the main package at {}",
			Platform::ALL.len(),
			version
		),
	)?;
	Ok(())
}
