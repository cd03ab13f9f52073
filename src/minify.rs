use crate::config::{self, Config};
use crate::files::{backup, replace};
use crate::transform::{fallback, Minify, MinifyOptions, SwcMinifier};
use crate::types::*;
use std::path::Path;
use anyhow::Result;
use color_print::*;

#[derive(clap::Args, Clone, Debug)]
pub struct Args {
	#[clap(flatten)]
	common: config::CommonArgs,
}

pub async fn run(args: Args) -> Result<()> {
	let config = Config::load(&args.common).await?;
	let target = config.resolve(&config.minify.target);

	minify_file(&target, &config.backup_dir(), &SwcMinifier, &MinifyOptions::bundle()).await;

	Ok(())
}

/// Minifies `path` in place, falling back to [`fallback::strip`] if the minifier fails.
///
/// The file is backed up first and only overwritten once a transform has fully
/// succeeded. If both transforms fail the file is left untouched.
pub async fn minify_file(path: &Path, backup_dir: &Path, minifier: &impl Minify, options: &MinifyOptions) -> FileOutcome {
	let file = match SourceFile::read(path).await {
		Ok(Some(file)) => file,
		Ok(None) => {
			cprintln!("<y!>⚠️ {} not found, nothing to minify", path.display());
			return FileOutcome::Skipped;
		}
		Err(err) => return failed(err),
	};

	cprintln!("<b!>🗜️ Minifying <s>{}</>...\n", file.display_name());

	match backup(&file, backup_dir, &file.file_name()).await {
		Ok(backup_path) => cprintln!("💾 Backed up to {}", backup_path.display()),
		Err(err) => return failed(err),
	}

	let minified = match minifier.minify(&file.content, options) {
		Ok(code) => code,
		Err(err) => {
			ceprintln!("<r!>❌ Minification failed:</> {:#}", err);
			cprintln!("\n<y!>🔄 Trying simple minification...");

			match fallback::strip(&file.content) {
				Ok(code) => code,
				Err(err) => {
					ceprintln!("<r!>❌ Simple minification failed too:</> {:#}", err);
					return FileOutcome::failed(err);
				}
			}
		}
	};

	if let Err(err) = replace(&file.path, &minified).await {
		return failed(err);
	}

	let report = SizeReport::new(file.size(), minified.len());

	cprintln!("\n<g!>✅ Minification complete!");
	cprintln!("   Original: {}", format_size(report.original));
	cprintln!("   Minified: {}", format_size(report.r#final));
	cprintln!("   Saved:    {:.1}%", report.reduction());

	FileOutcome::Processed(report)
}

fn failed(err: anyhow::Error) -> FileOutcome {
	ceprintln!("<r!>❌ {:#}", err);
	FileOutcome::failed(err)
}
