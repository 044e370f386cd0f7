use assert_cmd::Command;
use assert_fs::{prelude::*, TempDir};
use predicates::prelude::*;
use serde_json::Value;
use std::{collections::BTreeMap, fs, path::Path};

const PLATFORMS: [&str; 7] = [
	"darwin-x64",
	"darwin-arm64",
	"linux-x64",
	"linux-x64-musl",
	"linux-arm64",
	"linux-arm64-musl",
	"win32-x64",
];

const MAIN_FILES: [&str; 4] = ["bin/ccline.js", "scripts/postinstall.js", "LICENSE", "README.md"];

fn fixture() -> TempDir {
	let root = TempDir::new().unwrap();
	root.copy_from("tests/fixtures/npm-release", &["**"]).unwrap();
	root
}

fn npm_stage(root: &TempDir) -> Command {
	let mut cmd = Command::cargo_bin("npm-stage").unwrap();
	cmd.env_remove("GITHUB_REF").env_remove("RUST_LOG").arg("--root").arg(root.path());
	cmd
}

fn read_json(path: impl AsRef<Path>) -> Value {
	serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

/// Every file below `dir` and its content
fn snapshot(dir: impl AsRef<Path>) -> BTreeMap<String, Vec<u8>> {
	let dir = dir.as_ref();
	BTreeMap::from_iter(walkdir::WalkDir::new(dir).into_iter().map(Result::unwrap).filter_map(|e| {
		e.file_type().is_file().then(|| {
			let rel = e.path().strip_prefix(dir).unwrap().to_string_lossy().into_owned();
			(rel, fs::read(e.path()).unwrap())
		})
	}))
}

#[test]
fn prepare_stamps_every_manifest() {
	let root = fixture();
	npm_stage(&root)
		.args(["prepare", "1.2.3"])
		.assert()
		.success()
		.stderr(predicate::str::contains("Prepared @cometix/ccline-linux-x64-musl v1.2.3"))
		.stderr(predicate::str::contains("Prepared @cometix/ccline v1.2.3"))
		.stdout(predicate::str::contains("Next steps"));

	let out = root.child("npm-publish");
	for platform in PLATFORMS {
		let manifest = read_json(&out.child(platform).child("package.json"));
		assert_eq!(manifest["version"], "1.2.3");
		assert_eq!(manifest["name"], format!("@cometix/ccline-{platform}"));
	}

	let main = read_json(&out.child("main/package.json"));
	assert_eq!(main["version"], "1.2.3");
	let deps = main["optionalDependencies"].as_object().unwrap();
	assert_eq!(deps.len(), PLATFORMS.len());
	for platform in PLATFORMS {
		assert_eq!(deps[&format!("@cometix/ccline-{platform}")], "1.2.3");
	}

	for file in MAIN_FILES {
		let original = root.child("npm/main").child(file);
		out.child("main").child(file).assert(predicate::path::eq_file(original.path()));
	}
}

#[test]
fn platform_templates_pass_through() {
	let root = fixture();
	npm_stage(&root).args(["prepare", "3.1.4"]).assert().success();

	for platform in PLATFORMS {
		let template = root.child("npm/platforms").child(platform).child("package.json");
		let expected = fs::read_to_string(template.path())
			.unwrap()
			.replace("\"version\": \"0.0.0\"", "\"version\": \"3.1.4\"");
		let staged = root.child("npm-publish").child(platform).child("package.json");
		assert_eq!(fs::read_to_string(staged.path()).unwrap(), expected);
		// the template itself is left alone
		assert!(fs::read_to_string(template.path()).unwrap().contains("\"version\": \"0.0.0\""));
	}
}

#[test]
fn branch_suffix_is_stripped() {
	let root = fixture();
	npm_stage(&root)
		.args(["prepare", "1.2.3-88code"])
		.assert()
		.success()
		.stderr(predicate::str::contains("1.2.3-88code -> 1.2.3"));

	let main = read_json(&root.child("npm-publish/main/package.json"));
	assert_eq!(main["version"], "1.2.3");
	assert_eq!(main["optionalDependencies"]["@cometix/ccline-win32-x64"], "1.2.3");
}

#[test]
fn prerelease_is_kept() {
	let root = fixture();
	npm_stage(&root).args(["prepare", "1.0.0-rc.1"]).assert().success();

	let manifest = read_json(&root.child("npm-publish/darwin-arm64/package.json"));
	assert_eq!(manifest["version"], "1.0.0-rc.1");
}

#[test]
fn tag_ref_wins_over_argument() {
	let root = fixture();
	npm_stage(&root)
		.env("GITHUB_REF", "refs/tags/v2.0.0-yescode")
		.args(["prepare", "9.9.9"])
		.assert()
		.success();

	let main = read_json(&root.child("npm-publish/main/package.json"));
	assert_eq!(main["version"], "2.0.0");
}

#[test]
fn missing_version_fails_without_output() {
	let root = fixture();
	npm_stage(&root)
		.arg("prepare")
		.assert()
		.failure()
		.stderr(predicate::str::contains("No release version provided"))
		.stderr(predicate::str::contains("GITHUB_REF=refs/tags/v1.0.0 npm-stage prepare"))
		.stderr(predicate::str::contains("npm-stage prepare 1.0.0"));

	root.child("npm-publish").assert(predicate::path::missing());
}

#[test]
fn missing_template_aborts_before_writing() {
	let root = fixture();
	fs::remove_file(root.child("npm/platforms/linux-arm64/package.json").path()).unwrap();

	npm_stage(&root)
		.args(["prepare", "1.2.3"])
		.assert()
		.failure()
		.stderr(predicate::str::contains("Failed to read template manifest"))
		.stderr(predicate::str::contains("linux-arm64"));

	root.child("npm-publish").assert(predicate::path::missing());
}

#[test]
fn broken_template_aborts() {
	let root = fixture();
	root.child("npm/platforms/darwin-x64/package.json").write_str("{ \"name\": ").unwrap();

	npm_stage(&root)
		.args(["prepare", "1.2.3"])
		.assert()
		.failure()
		.stderr(predicate::str::contains("Failed to read template manifest"))
		.stderr(predicate::str::contains("Not valid JSON"));
}

#[test]
fn rerun_is_idempotent() {
	let root = fixture();
	npm_stage(&root).args(["prepare", "1.2.3"]).assert().success();
	let first = snapshot(&root.child("npm-publish"));

	npm_stage(&root).args(["prepare", "1.2.3"]).assert().success();
	assert_eq!(first, snapshot(&root.child("npm-publish")));
	assert_eq!(first.len(), PLATFORMS.len() + MAIN_FILES.len() + 1);
}

#[test]
fn unrelated_optional_dependencies_are_untouched() {
	let root = fixture();
	let main = root.child("npm/main/package.json");
	let mut manifest = read_json(&main);
	manifest["optionalDependencies"]["fsevents"] = Value::from("^2.3.3");
	manifest["optionalDependencies"]
		.as_object_mut()
		.unwrap()
		.remove("@cometix/ccline-linux-arm64-musl");
	main.write_str(&serde_json::to_string_pretty(&manifest).unwrap()).unwrap();

	npm_stage(&root).args(["prepare", "1.2.3"]).assert().success();

	let staged = read_json(&root.child("npm-publish/main/package.json"));
	let deps = &staged["optionalDependencies"];
	assert_eq!(deps["fsevents"], "^2.3.3");
	assert_eq!(deps["@cometix/ccline-linux-arm64-musl"], "1.2.3");
}

#[test]
fn verify_accepts_prepared_tree() {
	let root = fixture();
	npm_stage(&root).args(["prepare", "1.2.3"]).assert().success();
	npm_stage(&root)
		.args(["verify", "1.2.3"])
		.assert()
		.success()
		.stderr(predicate::str::contains("Verified"));
}

#[test]
fn verify_reports_every_mismatch() {
	let root = fixture();
	npm_stage(&root).args(["prepare", "1.2.3"]).assert().success();
	root.child("npm-publish/main/README.md").write_str("changed").unwrap();
	fs::remove_file(root.child("npm-publish/win32-x64/package.json").path()).unwrap();

	npm_stage(&root)
		.args(["verify", "1.2.3"])
		.assert()
		.failure()
		.stderr(predicate::str::contains("README.md: missing or differs"))
		.stderr(predicate::str::contains("win32-x64"))
		.stderr(predicate::str::contains("2 problem(s) found"));
}

#[test]
fn verify_rejects_other_version() {
	let root = fixture();
	npm_stage(&root).args(["prepare", "1.2.3"]).assert().success();
	npm_stage(&root)
		.args(["verify", "1.2.4"])
		.assert()
		.failure()
		.stderr(predicate::str::contains("version is 1.2.3, expected 1.2.4"));
}

#[test]
fn config_moves_staging_area() {
	let root = fixture();
	root.child("npm-stage.toml").write_str("output_dir = \"dist/npm\"\n").unwrap();

	npm_stage(&root).args(["prepare", "1.2.3"]).assert().success();
	root.child("dist/npm/main/package.json").assert(predicate::path::is_file());
	root.child("npm-publish").assert(predicate::path::missing());

	npm_stage(&root).args(["prepare", "1.2.3", "--output", "staged"]).assert().success();
	root.child("staged/linux-x64/package.json").assert(predicate::path::is_file());
}

#[test]
fn staging_into_main_source_is_rejected() {
	let root = fixture();
	npm_stage(&root)
		.args(["prepare", "1.2.3", "--output", "npm"])
		.assert()
		.failure()
		.stderr(predicate::str::contains("overlaps the main package source"));
}

#[test]
fn staging_through_parent_dir_is_rejected() {
	let root = fixture();
	root.child("x").create_dir_all().unwrap();
	let sources = snapshot(&root.child("npm"));

	npm_stage(&root)
		.args(["prepare", "1.2.3", "--output", "x/../npm"])
		.assert()
		.failure()
		.stderr(predicate::str::contains("overlaps the main package source"));

	assert_eq!(sources, snapshot(&root.child("npm")));
}

#[cfg(unix)]
#[test]
fn symlinked_staging_area_is_rejected() {
	let root = fixture();
	std::os::unix::fs::symlink(root.child("npm").path(), root.child("staged").path()).unwrap();
	let sources = snapshot(&root.child("npm"));

	npm_stage(&root)
		.args(["prepare", "1.2.3", "--output", "staged"])
		.assert()
		.failure()
		.stderr(predicate::str::contains("overlaps the main package source"));

	assert_eq!(sources, snapshot(&root.child("npm")));
}

#[test]
fn missing_main_manifest_is_not_called_a_template() {
	let root = fixture();
	fs::remove_file(root.child("npm/main/package.json").path()).unwrap();

	npm_stage(&root)
		.args(["prepare", "1.2.3"])
		.assert()
		.failure()
		.stderr(predicate::str::contains("Failed to read manifest"))
		.stderr(predicate::str::contains("template").not());
}

#[test]
fn verify_reports_malformed_dependencies_with_the_rest() {
	let root = fixture();
	npm_stage(&root).args(["prepare", "1.2.3"]).assert().success();
	let main = root.child("npm-publish/main/package.json");
	let mut manifest = read_json(&main);
	manifest["optionalDependencies"] = Value::from(vec!["@cometix/ccline-linux-x64"]);
	main.write_str(&serde_json::to_string_pretty(&manifest).unwrap()).unwrap();
	fs::remove_file(root.child("npm-publish/darwin-x64/package.json").path()).unwrap();

	npm_stage(&root)
		.args(["verify", "1.2.3"])
		.assert()
		.failure()
		.stderr(predicate::str::contains("optionalDependencies must be an object"))
		.stderr(predicate::str::contains("darwin-x64"))
		.stderr(predicate::str::contains("2 problem(s) found"));
}

#[test]
fn platforms_lists_catalog() {
	let root = fixture();
	let assert = npm_stage(&root).arg("platforms").assert().success();
	let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
	let lines = Vec::from_iter(stdout.lines());
	assert_eq!(lines.len(), PLATFORMS.len());
	for platform in PLATFORMS {
		assert!(lines.contains(&format!("{platform}\t@cometix/ccline-{platform}").as_str()));
	}
}
