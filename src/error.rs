use std::{io, path::PathBuf};

/// How the tool may be invoked to obtain a version, shown whenever none could be found
pub const VERSION_USAGE: &str = "\
Usage: GITHUB_REF=refs/tags/v1.0.0 npm-stage prepare
   or: npm-stage prepare 1.0.0";

#[derive(Debug, thiserror::Error)]
pub enum StageError {
	/// Neither a tag reference nor an explicit version was given
	#[error("No release version provided\n\n{}", VERSION_USAGE)]
	MissingVersion,

	/// A template manifest is missing or isn't valid JSON
	#[error("Failed to read template manifest {}", .path.display())]
	TemplateRead {
		path: PathBuf,
		#[source]
		source: ReadFailure,
	},

	/// Any other manifest is missing or isn't valid JSON
	#[error("Failed to read manifest {}", .path.display())]
	ManifestRead {
		path: PathBuf,
		#[source]
		source: ReadFailure,
	},

	/// Valid JSON, but not the shape a package manifest must have
	#[error("Malformed manifest {}: {reason}", .path.display())]
	ManifestShape { path: PathBuf, reason: String },

	#[error("Failed to {action} {}", .path.display())]
	Filesystem {
		action: &'static str,
		path: PathBuf,
		#[source]
		source: io::Error,
	},
}

#[derive(Debug, thiserror::Error)]
pub enum ReadFailure {
	#[error(transparent)]
	Io(#[from] io::Error),
	#[error("Not valid JSON")]
	Json(#[from] serde_json::Error),
}

impl StageError {
	pub fn fs(action: &'static str, path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
		let path = path.into();
		move |source| StageError::Filesystem { action, path, source }
	}
}
