use crate::error::StageError;
use log::{trace, warn};
use std::{
	fs, io,
	path::{Component, Path, PathBuf},
};
use walkdir::WalkDir;

/// Make `path` absolute against `root`, unless it already is
pub fn path_from_root(root: &Path, raw: &Path) -> PathBuf {
	if raw.is_absolute() {
		raw.to_path_buf()
	} else {
		root.join(raw)
	}
}

/// Resolve symlinks and `..` in `path`, even if it doesn't exist (yet).
///
/// Every existing prefix is canonicalized, the part below the deepest existing directory is
/// applied lexically.
pub fn resolve_path(path: &Path) -> Result<PathBuf, StageError> {
	let mut resolved = PathBuf::new();
	for component in path.components() {
		match component {
			Component::CurDir => {},
			Component::ParentDir => {
				resolved.pop();
			},
			Component::Normal(_) => {
				resolved.push(component);
				if resolved.exists() {
					resolved = fs::canonicalize(&resolved).map_err(StageError::fs("resolve", &resolved))?;
				}
			},
			Component::Prefix(_) | Component::RootDir => resolved.push(component),
		}
	}
	Ok(resolved)
}

fn is_same_file(a: &Path, b: &Path) -> bool {
	match (fs::canonicalize(a), fs::canonicalize(b)) {
		(Ok(a), Ok(b)) => a == b,
		_ => false,
	}
}

/// Create `dir` and any missing parent, fine if it already exists
pub fn ensure_dir(dir: &Path) -> Result<(), StageError> {
	fs::create_dir_all(dir).map_err(StageError::fs("create directory", dir))
}

fn walk(src: &Path) -> impl Iterator<Item = Result<walkdir::DirEntry, StageError>> + '_ {
	WalkDir::new(src).follow_links(true).sort_by_file_name().into_iter().map(move |entry| {
		entry.map_err(|e| {
			let path = e.path().unwrap_or(src).to_path_buf();
			StageError::Filesystem { action: "read", path, source: io::Error::from(e) }
		})
	})
}

fn relative<'a>(entry: &'a walkdir::DirEntry, src: &Path) -> &'a Path {
	// every entry of the walk is below `src`
	entry.path().strip_prefix(src).unwrap_or(entry.path())
}

/// Copy the whole tree below `src` into `dst`, overwriting what's there already.
/// Returns how many files were copied.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<u32, StageError> {
	if !src.is_dir() {
		return Err(StageError::Filesystem {
			action: "copy",
			path: src.to_path_buf(),
			source: io::Error::new(io::ErrorKind::NotFound, "source directory not found"),
		});
	}

	let mut copied = 0;
	for entry in walk(src) {
		let entry = entry?;
		let target = dst.join(relative(&entry, src));
		if entry.file_type().is_dir() {
			ensure_dir(&target)?;
		} else if is_same_file(entry.path(), &target) {
			// copying a file onto itself truncates it
			warn!("Not copying {} onto itself", entry.path().display());
		} else {
			trace!("Copying {} to {}", entry.path().display(), target.display());
			fs::copy(entry.path(), &target).map_err(StageError::fs("copy", entry.path()))?;
			copied += 1;
		}
	}
	Ok(copied)
}

/// Files below `src` that are missing in `dst` or differ in content, relative to `src`.
/// Paths in `skip` (relative as well) are not compared.
pub fn diff_tree(src: &Path, dst: &Path, skip: &[&Path]) -> Result<Vec<PathBuf>, StageError> {
	let mut differing = Vec::new();
	for entry in walk(src) {
		let entry = entry?;
		let rel = relative(&entry, src);
		if entry.file_type().is_dir() || skip.contains(&rel) {
			continue;
		}
		let expected = fs::read(entry.path()).map_err(StageError::fs("read", entry.path()))?;
		match fs::read(dst.join(rel)) {
			Ok(found) if found == expected => {},
			Ok(_) => differing.push(rel.to_path_buf()),
			Err(e) if e.kind() == io::ErrorKind::NotFound => differing.push(rel.to_path_buf()),
			Err(e) => return Err(StageError::fs("read", dst.join(rel))(e)),
		}
	}
	Ok(differing)
}
