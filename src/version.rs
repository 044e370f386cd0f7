use crate::error::StageError;
use log::{info, warn};
use std::fmt;

/// Tag reference prefix a CI run triggered by a version tag carries
pub const TAG_REF_PREFIX: &str = "refs/tags/v";

/// Qualifiers used only to tell parallel release branches apart. They never end up in a
/// published version.
pub const BRANCH_SUFFIXES: [&str; 2] = ["88code", "yescode"];

/// The version every manifest of this release is stamped with.
///
/// Only obtainable through [`resolve`], never empty and not mutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion(String);

impl ResolvedVersion {
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for ResolvedVersion {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Extract the version from a tag reference, `None` if it isn't one
fn from_tag_ref(tag_ref: &str) -> Option<&str> {
	match tag_ref.trim().strip_prefix(TAG_REF_PREFIX) {
		Some(version) if !version.is_empty() => Some(version),
		Some(_) => None,
		None => {
			warn!("Ignoring tag reference {:?}, it isn't of the form {}<version>", tag_ref, TAG_REF_PREFIX);
			None
		},
	}
}

/// Strip a trailing `-<branch suffix>`, leaving any other qualifier alone
pub fn normalize(raw: &str) -> &str {
	for suffix in BRANCH_SUFFIXES {
		let Some(base) = raw.strip_suffix(suffix).and_then(|b| b.strip_suffix('-')) else {
			continue;
		};
		if !base.is_empty() {
			return base;
		}
	}
	raw
}

/// Pick the release version: the tag reference wins over the explicit argument.
pub fn resolve(
	tag_ref: Option<&str>,
	argument: Option<&str>,
) -> Result<ResolvedVersion, StageError> {
	let raw = tag_ref
		.filter(|t| !t.trim().is_empty())
		.and_then(from_tag_ref)
		.or_else(|| argument.map(str::trim).filter(|a| !a.is_empty()))
		.ok_or(StageError::MissingVersion)?;

	let version = normalize(raw);
	if version != raw {
		info!("Normalized version {} -> {}", raw, version);
	}
	if let Err(e) = semver::Version::parse(version) {
		warn!("{} isn't a valid semantic version ({}), npm may refuse to publish it", version, e);
	}

	Ok(ResolvedVersion(version.to_owned()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use assert_matches::assert_matches;

	fn resolved(tag_ref: Option<&str>, argument: Option<&str>) -> String {
		resolve(tag_ref, argument).unwrap().to_string()
	}

	#[test]
	fn strips_branch_suffixes() {
		assert_eq!(normalize("1.0.0-88code"), "1.0.0");
		assert_eq!(normalize("1.0.0-yescode"), "1.0.0");
		assert_eq!(normalize("2.3.4-beta.1-88code"), "2.3.4-beta.1");
	}

	#[test]
	fn keeps_prerelease_qualifiers() {
		assert_eq!(normalize("1.0.0-beta"), "1.0.0-beta");
		assert_eq!(normalize("1.0.0-rc.1"), "1.0.0-rc.1");
		assert_eq!(normalize("1.0.0"), "1.0.0");
	}

	#[test]
	fn suffix_must_be_trailing_and_hyphenated() {
		assert_eq!(normalize("1.0.0-88codefoo"), "1.0.0-88codefoo");
		assert_eq!(normalize("1.0.088code"), "1.0.088code");
		assert_eq!(normalize("1.0.0-x88code"), "1.0.0-x88code");
		assert_eq!(normalize("1.0.0-yescode.1"), "1.0.0-yescode.1");
		assert_eq!(normalize("-88code"), "-88code");
	}

	#[test]
	fn tag_ref_takes_priority() {
		assert_eq!(resolved(Some("refs/tags/v1.2.3"), Some("9.9.9")), "1.2.3");
		assert_eq!(resolved(Some("refs/tags/v1.2.3-yescode"), None), "1.2.3");
		assert_eq!(resolved(Some("refs/tags/v1.0.0-rc.1"), None), "1.0.0-rc.1");
	}

	#[test]
	fn falls_back_to_argument() {
		assert_eq!(resolved(None, Some("1.0.0-88code")), "1.0.0");
		assert_eq!(resolved(Some(""), Some("1.0.0")), "1.0.0");
		assert_eq!(resolved(Some("refs/heads/main"), Some("1.0.0")), "1.0.0");
		assert_eq!(resolved(Some("refs/tags/v"), Some("1.0.0")), "1.0.0");
	}

	#[test]
	fn missing_version() {
		assert_matches!(resolve(None, None), Err(StageError::MissingVersion));
		assert_matches!(resolve(Some(""), Some("  ")), Err(StageError::MissingVersion));
		assert_matches!(resolve(Some("refs/heads/main"), None), Err(StageError::MissingVersion));
	}
}
