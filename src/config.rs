use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use serde::Deserialize;

pub const CONFIG_FILE: &str = "extpack.toml";

/// Shared command-line arguments of both pipelines.
#[derive(clap::Args, Clone, Debug)]
pub struct CommonArgs {
	/// Extension project directory that configured paths are relative to
	#[arg(short, long, default_value = ".")]
	pub root: PathBuf,

	/// Config file to use instead of `<root>/extpack.toml`
	#[arg(short, long)]
	pub config: Option<PathBuf>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
	#[serde(skip)]
	pub root: PathBuf,
	/// Directory receiving timestamped copies of every file before it is overwritten.
	pub backup_dir: PathBuf,
	pub minify: MinifyTargets,
	pub obfuscate: ObfuscateTargets,
	pub obfuscator: ObfuscatorSettings,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct MinifyTargets {
	pub target: PathBuf,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ObfuscateTargets {
	pub script: PathBuf,
	pub html: Vec<PathBuf>,
	/// Inline scripts whose trimmed text is not longer than this are left as-is.
	pub min_inline_script_len: usize,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ObfuscatorSettings {
	pub command: Option<PathBuf>,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			root: PathBuf::from("."),
			backup_dir: PathBuf::from("backup"),
			minify: MinifyTargets::default(),
			obfuscate: ObfuscateTargets::default(),
			obfuscator: ObfuscatorSettings::default(),
		}
	}
}

impl Default for MinifyTargets {
	fn default() -> Self {
		Self {
			target: PathBuf::from("out/extension.js"),
		}
	}
}

impl Default for ObfuscateTargets {
	fn default() -> Self {
		Self {
			script: PathBuf::from("out/extension.js"),
			html: vec![
				PathBuf::from("out/custom-panel.html"),
				PathBuf::from("common-webviews/custom-panel.html"),
			],
			min_inline_script_len: 50,
		}
	}
}

impl Config {
	/// Loads the config for `args.root`. An explicit `--config` must exist;
	/// the default `extpack.toml` is optional.
	pub async fn load(args: &CommonArgs) -> Result<Self> {
		let (path, required) = match &args.config {
			Some(path) => (path.clone(), true),
			None => (args.root.join(CONFIG_FILE), false),
		};

		let mut config = match tokio::fs::read_to_string(&path).await {
			Ok(content) => Self::parse(&content)
				.with_context(|| format!("Invalid config file {}", path.display()))?,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound && !required => Self::default(),
			Err(err) => return Err(err).with_context(|| format!("Cannot read config file {}", path.display())),
		};

		config.root = args.root.clone();

		Ok(config)
	}

	pub fn parse(content: &str) -> Result<Self> {
		Ok(toml::from_str(content)?)
	}

	/// Joins a configured path onto the project root. Absolute paths pass through.
	pub fn resolve(&self, path: &Path) -> PathBuf {
		self.root.join(path)
	}

	pub fn backup_dir(&self) -> PathBuf {
		self.resolve(&self.backup_dir)
	}

	/// Explicit command if configured, else the project-local install, else `$PATH`.
	/// A configured command with a directory part is relative to the root.
	pub fn obfuscator_command(&self) -> PathBuf {
		if let Some(command) = &self.obfuscator.command {
			return if command.components().count() > 1 {
				self.resolve(command)
			} else {
				command.clone()
			};
		}

		let local = self.root.join("node_modules").join(".bin").join("javascript-obfuscator");

		if local.exists() {
			local
		} else {
			PathBuf::from("javascript-obfuscator")
		}
	}
}
