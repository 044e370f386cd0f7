use anyhow::Context;
use std::{
	fs,
	io::{self, Write},
	path::PathBuf,
	str::FromStr,
};

use crate::{
	catalog::Platform,
	commands,
	config::{Config, Layout},
	shell::Shell,
	version::{self, ResolvedVersion},
};

#[derive(clap::Parser, Debug)]
pub struct VersionOptions {
	/// The version to stage
	///
	/// Only used when no tag reference is available. Branch qualifiers such as `-88code` are
	/// stripped, pre-release qualifiers are kept.
	pub version: Option<String>,

	/// The tag reference that triggered the release, `refs/tags/v<version>`
	///
	/// Takes precedence over the VERSION argument. Read from `GITHUB_REF` on CI.
	#[arg(long = "tag-ref", env = "GITHUB_REF", hide_env_values = true)]
	pub tag_ref: Option<String>,

	/// The staging area, overriding `output_dir` of the configuration
	#[arg(short, long, value_hint = clap::ValueHint::DirPath)]
	pub output: Option<PathBuf>,
}

impl VersionOptions {
	fn resolve(&self) -> Result<ResolvedVersion, anyhow::Error> {
		Ok(version::resolve(self.tag_ref.as_deref(), self.version.as_deref())?)
	}
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
	/// Generate the clap completions
	Completions {
		#[arg(short, long, default_value = "zsh")]
		shell: clap_complete::Shell,
	},
	/// Stage all packages for a release
	///
	/// Stamp the version onto every platform package template and write it into the staging
	/// area, then copy the main package there and point its version and its optional
	/// dependencies on the platform packages at the same version.
	Prepare {
		#[command(flatten)]
		opts: VersionOptions,
	},
	/// Check a staged release is consistent
	///
	/// Make sure every platform package and the main package are staged with the given version
	/// and the main package depends on exactly the known platform packages at that version.
	/// Nothing is written.
	Verify {
		#[command(flatten)]
		opts: VersionOptions,
	},
	/// List the platforms packages are staged for
	Platforms,
}

#[derive(Debug, clap::Parser)]
#[command(version, about = "Stage the npm packages of a native CLI release")]
pub struct Args {
	/// The repository root
	///
	/// All relative paths, from the command line and the configuration, are resolved against
	/// it.
	#[arg(short, long, value_parser = PathBuf::from_str, default_value = ".", value_hint = clap::ValueHint::DirPath)]
	#[clap(global(true))]
	pub root: PathBuf,

	/// The configuration file
	///
	/// Defaults to `npm-stage.toml` in the repository root, if present.
	#[arg(short, long, value_hint = clap::ValueHint::FilePath)]
	#[clap(global(true))]
	pub config: Option<PathBuf>,

	#[command(flatten)]
	pub verbosity: clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>,

	#[command(subcommand)]
	pub cmd: Command,
}

fn layout(args: &Args, output: Option<&PathBuf>) -> Result<Layout, anyhow::Error> {
	let root = fs::canonicalize(&args.root)
		.with_context(|| format!("Repository root {} not found", args.root.display()))?;
	Config::load(&root, args.config.as_deref())?.layout(&root, output.map(PathBuf::as_path))
}

pub fn run(args: Args) -> Result<(), anyhow::Error> {
	pretty_env_logger::formatted_builder()
		.filter_level(args.verbosity.log_level_filter())
		.parse_default_env()
		.try_init()?;

	let mut shell = Shell::new();

	match &args.cmd {
		Command::Completions { shell: target } => {
			let sink = &mut std::io::stdout();
			let mut app = <Args as clap::CommandFactory>::command();
			let app = &mut app;
			clap_complete::generate(*target, app, app.get_name().to_string(), sink);
			Ok(())
		},
		Command::Platforms => {
			let mut out = io::stdout().lock();
			for platform in Platform::ALL {
				writeln!(out, "{}\t{}", platform, platform.package_name())?;
			}
			Ok(())
		},
		Command::Prepare { opts } => {
			// resolve first, nothing is read or written without a version
			let version = opts.resolve()?;
			let layout = layout(&args, opts.output.as_ref())?;
			commands::prepare(&mut shell, &layout, &version)
		},
		Command::Verify { opts } => {
			let version = opts.resolve()?;
			let layout = layout(&args, opts.output.as_ref())?;
			commands::verify(&mut shell, &layout, &version)
		},
	}
}
