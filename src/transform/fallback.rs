//! Crude textual minification, used only when the real minifier gives up.
//!
//! This is not syntax-aware: comment markers and whitespace inside string
//! literals are rewritten just like code.

use std::sync::LazyLock;
use anyhow::{bail, Result};
use regex::Regex;

static BLOCK_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());
static LINE_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)//.*$").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static PUNCTUATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*([{};,:])\s*").unwrap());

pub fn strip(code: &str) -> Result<String> {
	let stripped = BLOCK_COMMENT.replace_all(code, "");
	let stripped = LINE_COMMENT.replace_all(&stripped, "");
	let stripped = WHITESPACE.replace_all(&stripped, " ");
	let stripped = PUNCTUATION.replace_all(&stripped, "$1");

	if stripped.trim().is_empty() && !code.is_empty() {
		bail!("Nothing left after stripping comments and whitespace");
	}

	Ok(stripped.into_owned())
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn strips_comments_and_whitespace() {
		let code = "/* header\n * license */\nfunction foo ( a , b ) {\n  // add them\n  return a + b ;\n}\n";
		assert_eq!(strip(code).unwrap(), " function foo ( a,b ){return a + b;}");
	}

	#[test]
	fn collapses_object_literals() {
		assert_eq!(strip("var o = {\n\ta : 1,\n\tb : 2\n};").unwrap(), "var o ={a:1,b:2};");
	}

	#[test]
	fn refuses_to_empty_a_file() {
		assert!(strip("// just a comment\n/* and another */").is_err());
	}

	#[test]
	fn empty_input_stays_empty() {
		assert_eq!(strip("").unwrap(), "");
	}
}
