use std::borrow::Cow;
use std::ops::Range;
use std::sync::LazyLock;
use anyhow::{anyhow, Result};
use regex::Regex;
use tl::{HTMLTag, Node, Parser, ParserOptions};

static SCRIPT_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</(script)").unwrap());

#[derive(Clone, Debug, PartialEq)]
struct Script {
	/// Byte range of the element's text in the source document.
	content: Range<usize>,
	external: bool,
	replacement: Option<String>,
}

/// An HTML document with its script elements located by byte offset.
///
/// Only replaced script text differs from the source on serialization, every
/// other byte is reproduced exactly.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
	source: String,
	scripts: Vec<Script>,
}

impl Document {
	pub fn parse(html: &str) -> Result<Self> {
		let dom = tl::parse(html, ParserOptions::new())
			.map_err(|err| anyhow!("Cannot parse HTML: {:?}", err))?;
		let parser = dom.parser();

		let mut scripts: Vec<Script> = dom.nodes()
			.iter()
			.filter_map(Node::as_tag)
			.filter(|tag| tag.name().as_utf8_str().eq_ignore_ascii_case("script"))
			.filter_map(|tag| locate_script(html, tag, parser))
			.collect();

		scripts.sort_by_key(|script| script.content.start);

		// markup inside script text is not an element
		let mut end = 0;
		scripts.retain(|script| {
			let outer = script.content.start >= end;
			if outer {
				end = script.content.end;
			}
			outer
		});

		Ok(Self {
			source: html.to_string(),
			scripts,
		})
	}

	/// Ids of script elements without a `src` attribute, in document order.
	pub fn inline_scripts(&self) -> Vec<usize> {
		self.scripts.iter()
			.enumerate()
			.filter(|(_, script)| !script.external)
			.map(|(id, _)| id)
			.collect()
	}

	pub fn script_text(&self, id: usize) -> Option<&str> {
		let script = self.scripts.get(id)?;

		match &script.replacement {
			Some(text) => Some(text),
			None => self.source.get(script.content.clone()),
		}
	}

	pub fn set_script_text(&mut self, id: usize, text: impl Into<String>) -> bool {
		match self.scripts.get_mut(id) {
			Some(script) => {
				script.replacement = Some(text.into());
				true
			}
			None => false,
		}
	}

	pub fn to_html(&self) -> String {
		let mut html = String::with_capacity(self.source.len());
		let mut last = 0;

		for script in &self.scripts {
			let Some(text) = &script.replacement else {
				continue;
			};

			html.push_str(&self.source[last..script.content.start]);
			html.push_str(text);
			last = script.content.end;
		}

		html.push_str(&self.source[last..]);
		html
	}
}

fn locate_script<'a>(html: &str, tag: &HTMLTag<'a>, parser: &Parser<'a>) -> Option<Script> {
	let (start, _) = tag.boundaries(parser);
	let end = start + tag.raw().as_bytes().len();
	let element = html.get(start..end)?;

	let open_end = start + open_tag_len(element)?;
	let close_start = match element.to_ascii_lowercase().rfind("</script") {
		Some(offset) => (start + offset).max(open_end),
		None => end,
	};

	Some(Script {
		content: open_end..close_start,
		external: tag.attributes().iter().any(|(name, _)| name.eq_ignore_ascii_case("src")),
		replacement: None,
	})
}

/// Length of the start tag at the beginning of `element`, up to its `>`.
fn open_tag_len(element: &str) -> Option<usize> {
	let mut quote = None;

	for (offset, byte) in element.bytes().enumerate() {
		match (quote, byte) {
			(Some(open), _) if byte == open => quote = None,
			(Some(_), _) => {}
			(None, b'"' | b'\'') => quote = Some(byte),
			(None, b'>') => return Some(offset + 1),
			_ => {}
		}
	}

	None
}

/// Rewrites `</script` as `<\/script`, which means the same inside JS strings
/// and regexes but no longer ends the enclosing script element.
pub fn escape_script_end(code: &str) -> Cow<'_, str> {
	SCRIPT_END.replace_all(code, r"<\/$1")
}

#[derive(Clone, Debug, PartialEq)]
pub struct HtmlMinifyOptions {
	pub remove_comments: bool,
	pub use_short_doctype: bool,
	pub minify_css: bool,
	/// Off by default: scripts are minified and obfuscated one by one beforehand.
	pub minify_js: bool,
	pub keep_closing_tags: bool,
}

impl Default for HtmlMinifyOptions {
	fn default() -> Self {
		Self {
			remove_comments: true,
			use_short_doctype: true,
			minify_css: true,
			minify_js: false,
			keep_closing_tags: true,
		}
	}
}

impl HtmlMinifyOptions {
	fn cfg(&self) -> minify_html::Cfg {
		minify_html::Cfg {
			keep_comments: !self.remove_comments,
			do_not_minify_doctype: !self.use_short_doctype,
			minify_css: self.minify_css,
			minify_js: self.minify_js,
			keep_closing_tags: self.keep_closing_tags,
			keep_html_and_head_opening_tags: self.keep_closing_tags,
			..minify_html::Cfg::default()
		}
	}
}

/// Collapses whitespace, strips comments and redundant attributes.
pub fn minify_html(html: &str, options: &HtmlMinifyOptions) -> Result<String> {
	let minified = minify_html::minify(html.as_bytes(), &options.cfg());
	Ok(String::from_utf8(minified)?)
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
	<script src="vendor.js"></script>
	<script type="text/javascript">const vscode = acquireVsCodeApi();</script>
	<!-- <script>notAScript()</script> -->
</head>
<body data-src="x">
	<img src="logo.png">
	<script data-src="lazy.js">
		document.body.innerHTML = '<div>hello</div>';
	</script>
	<SCRIPT>alert(1)</SCRIPT>
</body>
</html>
"#;

	#[test]
	fn serializes_untouched_document_verbatim() {
		assert_eq!(Document::parse(PAGE).unwrap().to_html(), PAGE);
		assert_eq!(Document::parse("").unwrap().to_html(), "");
		assert_eq!(Document::parse("<p>no scripts</p>").unwrap().to_html(), "<p>no scripts</p>");
	}

	#[test]
	fn finds_inline_scripts_only() {
		let doc = Document::parse(PAGE).unwrap();
		let texts: Vec<&str> = doc.inline_scripts()
			.into_iter()
			.map(|id| doc.script_text(id).unwrap().trim())
			.collect();

		assert_eq!(texts, vec![
			"const vscode = acquireVsCodeApi();",
			"document.body.innerHTML = '<div>hello</div>';",
			"alert(1)",
		]);
	}

	#[test]
	fn replaces_one_script_without_touching_the_rest() {
		let mut doc = Document::parse(PAGE).unwrap();
		let ids = doc.inline_scripts();
		let replaced_len = doc.script_text(ids[1]).unwrap().len();

		assert!(doc.set_script_text(ids[1], "x()"));

		let html = doc.to_html();
		assert!(html.contains(r#"<script data-src="lazy.js">x()</script>"#));
		assert!(html.contains("const vscode = acquireVsCodeApi();"));
		assert!(html.contains("<!-- <script>notAScript()</script> -->"));
		assert_eq!(html.len(), PAGE.len() - replaced_len + 3);
	}

	#[test]
	fn rejects_unknown_ids() {
		let mut doc = Document::parse("<p>a</p><script>b()</script>").unwrap();
		assert_eq!(doc.script_text(0), Some("b()"));
		assert_eq!(doc.script_text(1), None);
		assert!(!doc.set_script_text(7, "x"));
		assert_eq!(doc.to_html(), "<p>a</p><script>b()</script>");
	}

	#[test]
	fn judges_scripts_by_parsed_attributes() {
		let html = r#"<script data-note="loaded from src folder">run()</script><div title="<script>x()</script>"></div><script SRC="app.js"></script>"#;
		let doc = Document::parse(html).unwrap();
		let texts: Vec<&str> = doc.inline_scripts()
			.into_iter()
			.map(|id| doc.script_text(id).unwrap())
			.collect();

		assert_eq!(texts, vec!["run()"]);
	}

	#[test]
	fn attribute_text_survives_script_replacement() {
		let html = r#"<div title="<script>x()</script>"></div><script data-when="a>b">run()</script>"#;
		let mut doc = Document::parse(html).unwrap();
		let ids = doc.inline_scripts();

		assert_eq!(ids.len(), 1);
		assert!(doc.set_script_text(ids[0], "go()"));
		assert_eq!(doc.to_html(), r#"<div title="<script>x()</script>"></div><script data-when="a>b">go()</script>"#);
	}

	#[test]
	fn escapes_script_end_in_code() {
		assert_eq!(escape_script_end("var s = '</SCRIPT>' + '</script>';"), r"var s = '<\/SCRIPT>' + '<\/script>';");
		assert!(matches!(escape_script_end("var a = 1 < 2;"), Cow::Borrowed(_)));
	}

	#[test]
	fn minifies_html_but_not_scripts() {
		let html = "<!DOCTYPE html>\n<html>\n  <body>\n    <!-- note -->\n    <p>  hello   world  </p>\n    <script>var   spaced   =   1;</script>\n  </body>\n</html>\n";
		let minified = minify_html(html, &HtmlMinifyOptions::default()).unwrap();

		assert!(minified.len() < html.len());
		assert!(!minified.contains("note"));
		assert!(minified.contains("var   spaced   =   1;"));
	}
}
