use anyhow::{anyhow, bail, Result};
use serde::Serialize;
use swc_common::{sync::Lrc, FileName, FilePathMapping, Globals, Mark, SourceMap, GLOBALS};
use swc_ecma_ast::{EsVersion, Program};
use swc_ecma_codegen::{text_writer::{omit_trailing_semi, JsWriter}, Emitter};
use swc_ecma_minifier::option::{terser::TerserCompressorOptions, CompressOptions, ExtraOptions, MangleOptions};
use swc_ecma_parser::{parse_file_as_program, EsSyntax, Syntax};
use swc_ecma_transforms_base::{fixer::fixer, resolver};
use swc_ecma_visit::VisitMutWith;

/// Names bound by the host runtime that must survive renaming.
const HOST_NAMES: &[&str] = &["vscode", "acquireVsCodeApi"];

/// Compression knobs, named as the terser-compatible compressor expects them.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CompressSettings {
	pub drop_console: bool,
	pub drop_debugger: bool,
	pub passes: usize,
	pub dead_code: bool,
	pub unused: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MinifyOptions {
	pub compress: CompressSettings,
	/// Identifiers that are never renamed.
	pub reserved: Vec<String>,
	pub keep_fn_names: bool,
	pub keep_class_names: bool,
	/// Escape every non-ASCII character in the output.
	pub ascii_only: bool,
	/// Escape `</script` so the output can be embedded in an HTML script element.
	pub inline_script: bool,
}

impl MinifyOptions {
	/// Profile for the already-bundled extension script.
	pub fn bundle() -> Self {
		Self {
			compress: CompressSettings {
				drop_console: false,
				drop_debugger: true,
				passes: 2,
				dead_code: true,
				unused: true,
			},
			reserved: reserved(&["exports", "module", "require", "global", "process"]),
			keep_fn_names: false,
			keep_class_names: false,
			ascii_only: true,
			inline_script: false,
		}
	}

	/// Profile for the minify stage ahead of obfuscation.
	pub fn pre_obfuscate() -> Self {
		Self {
			reserved: reserved(&["exports", "module", "require"]),
			ascii_only: false,
			..Self::bundle()
		}
	}

	/// Profile for scripts embedded in HTML documents.
	pub fn inline_script() -> Self {
		Self {
			reserved: reserved(&["postMessage", "addEventListener"]),
			inline_script: true,
			..Self::pre_obfuscate()
		}
	}

	fn compress_options(&self, cm: &Lrc<SourceMap>) -> Result<CompressOptions> {
		let terser: TerserCompressorOptions = serde_json::from_value(serde_json::to_value(&self.compress)?)?;
		Ok(terser.into_config(cm.clone()))
	}

	fn mangle_options(&self) -> MangleOptions {
		MangleOptions {
			top_level: Some(false),
			keep_fn_names: self.keep_fn_names,
			keep_class_names: self.keep_class_names,
			reserved: self.reserved.iter().map(|name| name.as_str().into()).collect(),
			..Default::default()
		}
	}
}

fn reserved(extra: &[&str]) -> Vec<String> {
	HOST_NAMES.iter()
		.chain(extra)
		.map(|name| name.to_string())
		.collect()
}

pub trait Minify {
	fn minify(&self, code: &str, options: &MinifyOptions) -> Result<String>;
}

/// JavaScript minifier backed by `swc_ecma_minifier`.
pub struct SwcMinifier;

impl Minify for SwcMinifier {
	fn minify(&self, code: &str, options: &MinifyOptions) -> Result<String> {
		let cm = Lrc::new(SourceMap::new(FilePathMapping::empty()));
		let output = GLOBALS.set(&Globals::new(), || minify_program(&cm, code, options))?;

		if output.trim().is_empty() && !code.is_empty() {
			bail!("Minifier produced no output");
		}

		Ok(output)
	}
}

fn minify_program(cm: &Lrc<SourceMap>, code: &str, options: &MinifyOptions) -> Result<String> {
	let fm = cm.new_source_file(FileName::Anon.into(), code.to_string());
	let mut errors = Vec::new();

	// scripts and modules both occur in the wild, let the parser decide
	let program = parse_file_as_program(&fm, Syntax::Es(EsSyntax::default()), EsVersion::latest(), None, &mut errors)
		.map_err(|err| anyhow!("Parse error: {:?}", err.kind()))?;

	if let Some(err) = errors.first() {
		bail!("Parse error: {:?}", err.kind());
	}

	let unresolved_mark = Mark::new();
	let top_level_mark = Mark::new();

	let mut program = program;
	program.visit_mut_with(&mut resolver(unresolved_mark, top_level_mark, false));

	let mut program = swc_ecma_minifier::optimize(
		program,
		cm.clone(),
		None,
		None,
		&swc_ecma_minifier::option::MinifyOptions {
			compress: Some(options.compress_options(cm)?),
			mangle: Some(options.mangle_options()),
			..Default::default()
		},
		&ExtraOptions {
			unresolved_mark,
			top_level_mark,
			mangle_name_cache: None,
		},
	);
	program.visit_mut_with(&mut fixer(None));

	emit(cm, &program, options)
}

fn emit(cm: &Lrc<SourceMap>, program: &Program, options: &MinifyOptions) -> Result<String> {
	let mut buf = vec![];

	{
		let wr = JsWriter::new(cm.clone(), "\n", &mut buf, None);
		let mut emitter = Emitter {
			cfg: swc_ecma_codegen::Config::default()
				.with_minify(true)
				.with_ascii_only(options.ascii_only)
				.with_inline_script(options.inline_script),
			cm: cm.clone(),
			comments: None,
			wr: omit_trailing_semi(wr),
		};

		emitter.emit_program(program)?;
	}

	Ok(String::from_utf8(buf)?)
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	fn minify(code: &str, options: &MinifyOptions) -> Result<String> {
		SwcMinifier.minify(code, options)
	}

	#[test]
	fn minifies_and_keeps_behaviour_visible() {
		let code = "function foo(){ console.log('hi'); return 1+1; }";
		let output = minify(code, &MinifyOptions::bundle()).unwrap();

		assert!(output.len() < code.len(), "{}", output);
		assert!(output.contains("function foo("), "{}", output);
		assert!(output.contains("console.log("), "{}", output);
		assert!(output.contains("hi"), "{}", output);
	}

	#[test]
	fn drops_debugger_statements() {
		let output = minify("function f(a){ debugger; return a * 3; }", &MinifyOptions::bundle()).unwrap();
		assert!(!output.contains("debugger"), "{}", output);
	}

	#[test]
	fn preserves_reserved_names_only() {
		let code = "function f(acquireVsCodeApi, someVeryLongLocalName) { return acquireVsCodeApi(someVeryLongLocalName); }";
		let output = minify(code, &MinifyOptions::bundle()).unwrap();

		assert!(output.contains("acquireVsCodeApi"), "{}", output);
		assert!(!output.contains("someVeryLongLocalName"), "{}", output);
	}

	#[test]
	fn never_renames_top_level_bindings() {
		let output = minify("var handlerRegistry = {}; function registerHandler(name) { handlerRegistry[name] = 1; }", &MinifyOptions::pre_obfuscate()).unwrap();

		assert!(output.contains("handlerRegistry"), "{}", output);
		assert!(output.contains("registerHandler"), "{}", output);
	}

	#[test]
	fn ascii_only_output() {
		let output = minify("var greeting = 'héllo wörld';", &MinifyOptions::bundle()).unwrap();
		assert!(output.is_ascii(), "{}", output);
	}

	#[test]
	fn escapes_closing_script_tag_for_inline_scripts() {
		let output = minify("var markup = '</script>';", &MinifyOptions::inline_script()).unwrap();
		assert!(!output.to_lowercase().contains("</script"), "{}", output);
	}

	#[test]
	fn fails_on_syntax_error() {
		assert!(minify("function (", &MinifyOptions::bundle()).is_err());
	}

	#[test]
	fn fails_when_nothing_is_left() {
		let err = minify("/* only a comment */", &MinifyOptions::bundle()).unwrap_err();
		assert_eq!(err.to_string(), "Minifier produced no output");
	}

	#[test]
	fn whitespace_only_input_fails() {
		assert!(minify("  \n\t\n", &MinifyOptions::bundle()).is_err());
		assert_eq!(minify("", &MinifyOptions::bundle()).unwrap(), "");
	}

	#[test]
	fn profiles_reserve_host_names() {
		assert_eq!(MinifyOptions::bundle().reserved, vec!["vscode", "acquireVsCodeApi", "exports", "module", "require", "global", "process"]);
		assert_eq!(MinifyOptions::pre_obfuscate().reserved, vec!["vscode", "acquireVsCodeApi", "exports", "module", "require"]);
		assert_eq!(MinifyOptions::inline_script().reserved, vec!["vscode", "acquireVsCodeApi", "postMessage", "addEventListener"]);
		assert!(MinifyOptions::inline_script().inline_script);
		assert!(!MinifyOptions::pre_obfuscate().compress.drop_console);
	}
}
