use crate::config::{self, Config};
use crate::files::{backup, replace};
use crate::transform::*;
use crate::types::*;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use color_print::*;

#[derive(clap::Args, Clone, Debug)]
pub struct Args {
	#[clap(flatten)]
	common: config::CommonArgs,
}

pub async fn run(args: Args) -> Result<()> {
	let config = Config::load(&args.common).await?;
	let backup_dir = config.backup_dir();

	tokio::fs::create_dir_all(&backup_dir).await
		.with_context(|| format!("Cannot create backup directory {}", backup_dir.display()))?;

	cprintln!("<b!>🔐 Obfuscating and minifying...\n");

	let pipeline = Obfuscation::new(&config, SwcMinifier, NodeObfuscator::new(config.obfuscator_command()));
	let results = pipeline.run(&config).await;

	print_summary(&results);

	let processed = results.iter().filter(|(_, outcome)| outcome.is_processed()).count();
	cprintln!("\n<g!>✅ Obfuscation and minification finished</> ({} of {} files processed).", processed, results.len());
	cprintln!("📁 Originals backed up to {}", backup_dir.display());

	Ok(())
}

/// Minify-then-obfuscate over a script file and the inline scripts of HTML files.
///
/// Every file and every inline script is processed in isolation: a failure is
/// reported and the remaining items are still processed.
pub struct Obfuscation<M, O> {
	minifier: M,
	obfuscator: O,
	backup_dir: PathBuf,
	min_inline_script_len: usize,
	html_options: HtmlMinifyOptions,
}

impl<M: Minify, O: Obfuscate> Obfuscation<M, O> {
	pub fn new(config: &Config, minifier: M, obfuscator: O) -> Self {
		Self {
			minifier,
			obfuscator,
			backup_dir: config.backup_dir(),
			min_inline_script_len: config.obfuscate.min_inline_script_len,
			html_options: HtmlMinifyOptions::default(),
		}
	}

	/// Processes the configured script, then each configured HTML file, in order.
	pub async fn run(&self, config: &Config) -> Vec<(PathBuf, FileOutcome)> {
		let mut results = Vec::new();

		let script = config.resolve(&config.obfuscate.script);
		let outcome = self.process_script(&script).await;
		results.push((script, outcome));

		for html in &config.obfuscate.html {
			let path = config.resolve(html);
			let outcome = self.process_html(&path).await;
			results.push((path, outcome));
		}

		results
	}

	pub async fn process_script(&self, path: &Path) -> FileOutcome {
		self.try_process_script(path).await.unwrap_or_else(failed)
	}

	async fn try_process_script(&self, path: &Path) -> Result<FileOutcome> {
		let Some(file) = read(path).await? else {
			return Ok(FileOutcome::Skipped);
		};

		cprintln!("📄 Processing <s>{}</>...", file.file_name());

		let backup_path = backup(&file, &self.backup_dir, &file.file_name()).await?;
		cprintln!("   💾 Backed up to {}", backup_path.display());

		cprintln!("   🗜️ Minifying...");
		let minified = self.minifier.minify(&file.content, &MinifyOptions::pre_obfuscate())
			.context("Minification failed")?;

		cprintln!("   🔒 Obfuscating...");
		let obfuscated = self.obfuscator.obfuscate(&minified, &ObfuscatorOptions::strong()).await
			.context("Obfuscation failed")?;

		replace(&file.path, &obfuscated).await?;

		Ok(done(SizeReport::new(file.size(), obfuscated.len())))
	}

	pub async fn process_html(&self, path: &Path) -> FileOutcome {
		self.try_process_html(path).await.unwrap_or_else(failed)
	}

	async fn try_process_html(&self, path: &Path) -> Result<FileOutcome> {
		let Some(file) = read(path).await? else {
			return Ok(FileOutcome::Skipped);
		};

		cprintln!("📄 Processing <s>{}</>...", file.display_name());

		// both HTML targets are called custom-panel.html, keep their directory in the name
		let backup_name = match parent_name(&file.path) {
			Some(dir) => format!("{}-{}", dir, file.file_name()),
			None => file.file_name(),
		};
		let backup_path = backup(&file, &self.backup_dir, &backup_name).await?;
		cprintln!("   💾 Backed up to {}", backup_path.display());

		let mut document = Document::parse(&file.content)?;
		let outcomes = self.transform_inline_scripts(&mut document).await;
		let transformed = outcomes.iter().filter(|outcome| **outcome == ScriptOutcome::Transformed).count();

		if !outcomes.is_empty() {
			cprintln!("   🔒 Obfuscated {} of {} inline scripts", transformed, outcomes.len());
		}

		let html = minify_html(&document.to_html(), &self.html_options)
			.context("HTML minification failed")?;

		replace(&file.path, &html).await?;

		Ok(done(SizeReport::new(file.size(), html.len())))
	}

	/// Minifies and obfuscates every inline script longer than the threshold.
	/// A script that fails keeps its original content.
	pub async fn transform_inline_scripts(&self, document: &mut Document) -> Vec<ScriptOutcome> {
		let scripts = document.inline_scripts();
		cprintln!("   📝 Found {} inline scripts", scripts.len());

		let minify_options = MinifyOptions::inline_script();
		let obfuscator_options = ObfuscatorOptions::light();
		let mut outcomes = Vec::with_capacity(scripts.len());

		for (index, id) in scripts.into_iter().enumerate() {
			let Some(code) = document.script_text(id).map(str::to_owned) else {
				continue;
			};

			if code.trim().chars().count() <= self.min_inline_script_len {
				outcomes.push(ScriptOutcome::Untouched);
				continue;
			}

			match protect(&code, &self.minifier, &minify_options, &self.obfuscator, &obfuscator_options).await {
				Ok(protected) => {
					document.set_script_text(id, escape_script_end(&protected));
					outcomes.push(ScriptOutcome::Transformed);
				}
				Err(err) => {
					cprintln!("   <y!>⚠️ Script {} could not be obfuscated, keeping it as-is:</> {:#}", index + 1, err);
					outcomes.push(ScriptOutcome::Failed(format!("{:#}", err)));
				}
			}
		}

		outcomes
	}
}

async fn read(path: &Path) -> Result<Option<SourceFile>> {
	let file = SourceFile::read(path).await?;

	if file.is_none() {
		cprintln!("<y!>⚠️ File not found: {}", path.display());
	}

	Ok(file)
}

fn done(report: SizeReport) -> FileOutcome {
	cprintln!("   <g!>✅ Done!</> {}", report);
	FileOutcome::Processed(report)
}

fn failed(err: anyhow::Error) -> FileOutcome {
	ceprintln!("   <r!>❌ Processing failed:</> {:#}", err);
	FileOutcome::failed(err)
}
