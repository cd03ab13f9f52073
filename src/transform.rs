pub mod minifier;
pub mod fallback;
pub mod obfuscator;
pub mod html;

pub use minifier::{Minify, MinifyOptions, SwcMinifier};
pub use obfuscator::{NodeObfuscator, Obfuscate, ObfuscatorOptions};
pub use html::{escape_script_end, minify_html, Document, HtmlMinifyOptions};

use anyhow::Result;

/// Minify-then-obfuscate, the two-stage transform applied to every script in the obfuscate pipeline.
pub async fn protect(
	code: &str,
	minifier: &impl Minify,
	minify_options: &MinifyOptions,
	obfuscator: &impl Obfuscate,
	obfuscator_options: &ObfuscatorOptions,
) -> Result<String> {
	let minified = minifier.minify(code, minify_options)?;
	obfuscator.obfuscate(&minified, obfuscator_options).await
}
