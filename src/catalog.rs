use std::{fmt, str::FromStr};

/// Name prefix shared by every platform package, also the key prefix the main package's
/// `optionalDependencies` uses to refer to them.
pub const PLATFORM_PACKAGE_PREFIX: &str = "@cometix/ccline-";

/// One native build target that gets its own npm package.
///
/// `Platform::ALL` is the catalog: the platform staging loop and the main manifest's
/// dependency synchronization are both driven from it, never from what happens to be on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
	DarwinX64,
	DarwinArm64,
	LinuxX64,
	LinuxX64Musl,
	LinuxArm64,
	LinuxArm64Musl,
	Win32X64,
}

impl Platform {
	pub const ALL: [Platform; 7] = [
		Platform::DarwinX64,
		Platform::DarwinArm64,
		Platform::LinuxX64,
		Platform::LinuxX64Musl,
		Platform::LinuxArm64,
		Platform::LinuxArm64Musl,
		Platform::Win32X64,
	];

	/// The identifier as used for directory names and the package name suffix,
	/// in node's `process.platform`-`process.arch`[-libc] form.
	pub fn id(&self) -> &'static str {
		match self {
			Platform::DarwinX64 => "darwin-x64",
			Platform::DarwinArm64 => "darwin-arm64",
			Platform::LinuxX64 => "linux-x64",
			Platform::LinuxX64Musl => "linux-x64-musl",
			Platform::LinuxArm64 => "linux-arm64",
			Platform::LinuxArm64Musl => "linux-arm64-musl",
			Platform::Win32X64 => "win32-x64",
		}
	}

	/// Name of the npm package carrying this platform's binary
	pub fn package_name(&self) -> String {
		format!("{}{}", PLATFORM_PACKAGE_PREFIX, self)
	}
}

impl fmt::Display for Platform {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.id())
	}
}

impl FromStr for Platform {
	type Err = anyhow::Error;
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Platform::ALL
			.into_iter()
			.find(|p| p.id() == s)
			.ok_or_else(|| anyhow::anyhow!("Unknown platform: {}", s))
	}
}

/// Whether an `optionalDependencies` key follows the platform package naming convention.
///
/// This is a pure prefix match; an unrelated package sharing the prefix is indistinguishable
/// here, callers flag keys that aren't in the catalog.
pub fn is_platform_package(name: &str) -> bool {
	name.starts_with(PLATFORM_PACKAGE_PREFIX)
}

/// Look up the catalog entry a platform package name refers to, if any
pub fn platform_for_package(name: &str) -> Option<Platform> {
	name.strip_prefix(PLATFORM_PACKAGE_PREFIX).and_then(|id| id.parse().ok())
}
