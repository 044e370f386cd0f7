use crate::{
	catalog::Platform,
	config::Layout,
	error::StageError,
	manifest::{sync_platform_dependencies, Manifest},
	shell::Shell,
	util::{copy_tree, ensure_dir},
	version::ResolvedVersion,
};
use log::{debug, warn};
use std::io::{self, Write};

/// Stamp the version onto every platform template and write it into the platform's staging
/// directory.
///
/// All templates are read before anything is written, a missing one aborts the run without
/// touching the staging area.
pub fn stage_platforms(
	shell: &mut Shell,
	layout: &Layout,
	version: &ResolvedVersion,
) -> Result<(), anyhow::Error> {
	let templates = Platform::ALL
		.into_iter()
		.map(|platform| {
			Manifest::load_template(&layout.platform_template(platform)).map(|m| (platform, m))
		})
		.collect::<Result<Vec<_>, StageError>>()?;

	for (platform, mut manifest) in templates {
		let expected = platform.package_name();
		let name = manifest.name().unwrap_or(&expected).to_owned();
		if name != expected {
			warn!(
				"{} is named {}, but the main package refers to it as {}",
				manifest.path().display(),
				name,
				expected
			);
		}

		let out_dir = layout.platform_output_dir(platform);
		ensure_dir(&out_dir)?;
		manifest.set_version(version);
		manifest.write_to(&out_dir.join(&layout.manifest))?;
		shell.status("Prepared", format!("{} v{}", name, version))?;
	}
	Ok(())
}

/// Copy the main package into the staging area and rewrite its version and the versions of
/// the platform packages it depends on.
pub fn stage_main(
	shell: &mut Shell,
	layout: &Layout,
	version: &ResolvedVersion,
) -> Result<(), anyhow::Error> {
	let out_dir = layout.main_output_dir();
	let copied = copy_tree(&layout.main_dir, &out_dir)?;
	debug!("Copied {} files from {} to {}", copied, layout.main_dir.display(), out_dir.display());

	let manifest_path = out_dir.join(&layout.manifest);
	let mut manifest = Manifest::load(&manifest_path)?;
	manifest.set_version(version);

	let sync = sync_platform_dependencies(&mut manifest, version)?;
	debug!("{} platform dependencies updated", sync.updated);
	for platform in &sync.added {
		warn!(
			"{} had no optional dependency on {}, added it",
			layout.main_dir.join(&layout.manifest).display(),
			platform.package_name()
		);
	}
	for name in &sync.unknown {
		warn!(
			"Optional dependency {} looks like a platform package but no such platform is known, \
			 its version was set to {} nonetheless",
			name, version
		);
	}

	manifest.write_to(&manifest_path)?;
	let name = manifest.name().unwrap_or("main package");
	shell.status("Prepared", format!("{} v{}", name, version))?;
	Ok(())
}

/// Stage every platform package followed by the main package
pub fn prepare(
	shell: &mut Shell,
	layout: &Layout,
	version: &ResolvedVersion,
) -> Result<(), anyhow::Error> {
	shell.status(
		"Staging",
		format!("packages for version {} into {}", version, layout.output_dir.display()),
	)?;

	stage_platforms(shell, layout, version)?;
	stage_main(shell, layout, version)?;

	shell.status(
		"Finished",
		format!("{} platform packages and the main package at {}", Platform::ALL.len(), version),
	)?;

	next_steps(&mut io::stdout().lock(), layout)?;
	Ok(())
}

fn next_steps(out: &mut impl Write, layout: &Layout) -> io::Result<()> {
	writeln!(out)?;
	writeln!(out, "Next steps:")?;
	writeln!(
		out,
		"  1. Copy the binaries into the platform directories below {}",
		layout.output_dir.display()
	)?;
	writeln!(out, "  2. Publish the platform packages first")?;
	writeln!(out, "  3. Publish {} last", layout.main_output_dir().display())?;
	out.flush()
}
