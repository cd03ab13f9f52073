use std::io::ErrorKind;
use std::path::PathBuf;
use anyhow::{bail, Context, Result};
use serde::{Serialize, Serializer};
use tokio::process::Command;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentifierNamesGenerator {
	Hexadecimal,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StringArrayEncoding {
	Base64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StringArrayWrappersType {
	Function,
}

/// Options understood by `javascript-obfuscator`, serialized as its JSON config file.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObfuscatorOptions {
	pub compact: bool,
	pub control_flow_flattening: bool,
	pub control_flow_flattening_threshold: f64,
	pub dead_code_injection: bool,
	pub dead_code_injection_threshold: f64,
	pub debug_protection: bool,
	pub disable_console_output: bool,
	pub identifier_names_generator: IdentifierNamesGenerator,
	pub log: bool,
	pub numbers_to_expressions: bool,
	pub rename_globals: bool,
	pub self_defending: bool,
	pub simplify: bool,
	pub split_strings: bool,
	pub split_strings_chunk_length: u32,
	pub string_array: bool,
	pub string_array_calls_transform: bool,
	pub string_array_encoding: Vec<StringArrayEncoding>,
	pub string_array_index_shift: bool,
	pub string_array_rotate: bool,
	pub string_array_shuffle: bool,
	pub string_array_wrappers_count: u32,
	pub string_array_wrappers_chained_calls: bool,
	pub string_array_wrappers_parameters_max_count: u32,
	pub string_array_wrappers_type: StringArrayWrappersType,
	pub string_array_threshold: f64,
	pub transform_object_keys: bool,
	pub unicode_escape_sequence: bool,
	/// Exact identifier names that are never renamed.
	#[serde(serialize_with = "serialize_exact_names")]
	pub reserved_names: Vec<String>,
}

impl ObfuscatorOptions {
	/// High-strength profile for the extension script.
	///
	/// Globals keep their names and neither self-defending nor debug protection
	/// is enabled: the host resolves its API by name and attaches a debugger.
	pub fn strong() -> Self {
		Self {
			compact: true,
			control_flow_flattening: true,
			control_flow_flattening_threshold: 0.75,
			dead_code_injection: true,
			dead_code_injection_threshold: 0.4,
			debug_protection: false,
			disable_console_output: false,
			identifier_names_generator: IdentifierNamesGenerator::Hexadecimal,
			log: false,
			numbers_to_expressions: true,
			rename_globals: false,
			self_defending: false,
			simplify: true,
			split_strings: true,
			split_strings_chunk_length: 10,
			string_array: true,
			string_array_calls_transform: true,
			string_array_encoding: vec![StringArrayEncoding::Base64],
			string_array_index_shift: true,
			string_array_rotate: true,
			string_array_shuffle: true,
			string_array_wrappers_count: 2,
			string_array_wrappers_chained_calls: true,
			string_array_wrappers_parameters_max_count: 4,
			string_array_wrappers_type: StringArrayWrappersType::Function,
			string_array_threshold: 0.75,
			transform_object_keys: true,
			unicode_escape_sequence: false,
			reserved_names: ["vscode", "acquireVsCodeApi", "exports", "module", "require"]
				.map(String::from)
				.to_vec(),
		}
	}

	/// Lighter profile for small scripts embedded in HTML, where the heavy
	/// transforms tend to break event handlers.
	pub fn light() -> Self {
		Self {
			control_flow_flattening: false,
			dead_code_injection: false,
			split_strings: false,
			string_array_threshold: 0.5,
			reserved_names: ["vscode", "acquireVsCodeApi", "postMessage", "addEventListener"]
				.map(String::from)
				.to_vec(),
			..Self::strong()
		}
	}
}

// the obfuscator treats reserved names as regular expressions
fn serialize_exact_names<S: Serializer>(names: &[String], serializer: S) -> Result<S::Ok, S::Error> {
	serializer.collect_seq(names.iter().map(|name| format!("^{}$", regex::escape(name))))
}

#[allow(async_fn_in_trait)]
pub trait Obfuscate {
	async fn obfuscate(&self, code: &str, options: &ObfuscatorOptions) -> Result<String>;
}

/// Runs the `javascript-obfuscator` command line tool.
pub struct NodeObfuscator {
	command: PathBuf,
}

impl NodeObfuscator {
	pub fn new(command: impl Into<PathBuf>) -> Self {
		Self {
			command: command.into(),
		}
	}
}

impl Obfuscate for NodeObfuscator {
	async fn obfuscate(&self, code: &str, options: &ObfuscatorOptions) -> Result<String> {
		let dir = tempfile::tempdir().context("Cannot create obfuscator work directory")?;
		let input = dir.path().join("input.js");
		let output = dir.path().join("output.js");
		let config = dir.path().join("config.json");

		tokio::fs::write(&input, code).await?;
		tokio::fs::write(&config, serde_json::to_vec_pretty(options)?).await?;

		let result = Command::new(&self.command)
			.arg(&input)
			.arg("--output")
			.arg(&output)
			.arg("--config")
			.arg(&config)
			.kill_on_drop(true)
			.output()
			.await;

		let result = match result {
			Ok(result) => result,
			Err(err) if err.kind() == ErrorKind::NotFound => {
				bail!("Obfuscator \"{}\" not found. Install it with \"npm install --save-dev javascript-obfuscator\".", self.command.display());
			}
			Err(err) => {
				return Err(err).with_context(|| format!("Failed to run obfuscator \"{}\"", self.command.display()));
			}
		};

		if !result.status.success() {
			bail!("Obfuscator {}: {}", result.status, String::from_utf8_lossy(&result.stderr).trim());
		}

		let obfuscated = tokio::fs::read_to_string(&output).await
			.context("Obfuscator did not write its output")?;

		if obfuscated.trim().is_empty() {
			bail!("Obfuscator produced no output");
		}

		Ok(obfuscated)
	}
}
