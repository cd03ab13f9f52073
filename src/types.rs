use std::fmt::{self, Display};
use std::path::{Path, PathBuf};
use color_print::*;

/// Original and final byte lengths of a processed file.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SizeReport {
	pub original: usize,
	pub r#final: usize,
}

impl SizeReport {
	pub fn new(original: usize, r#final: usize) -> Self {
		Self { original, r#final }
	}

	/// Percentage of bytes removed. Negative when the output grew.
	pub fn reduction(&self) -> f64 {
		if self.original == 0 {
			return 0.0;
		}

		(1.0 - self.r#final as f64 / self.original as f64) * 100.0
	}
}

impl Display for SizeReport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} → {} ({:.1}% reduction)", format_size(self.original), format_size(self.r#final), self.reduction())
	}
}

pub fn format_size(bytes: usize) -> String {
	if bytes < 1024 {
		format!("{} B", bytes)
	} else if bytes < 1024 * 1024 {
		format!("{:.2} KB", bytes as f64 / 1024.0)
	} else {
		format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
	}
}

/// Result of running a pipeline over a single target file.
#[derive(Clone, Debug, PartialEq)]
pub enum FileOutcome {
	Processed(SizeReport),
	Skipped,
	Failed(String),
}

impl Display for FileOutcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Processed(report) => write!(f, "processed ({})", report),
			Self::Skipped => write!(f, "skipped (not found)"),
			Self::Failed(reason) => write!(f, "failed ({})", reason),
		}
	}
}

impl FileOutcome {
	pub fn failed(err: anyhow::Error) -> Self {
		Self::Failed(format!("{:#}", err))
	}

	pub fn is_processed(&self) -> bool {
		matches!(self, Self::Processed(_))
	}
}

/// Result of transforming one inline script block of an HTML document.
#[derive(Clone, Debug, PartialEq)]
pub enum ScriptOutcome {
	Transformed,
	Untouched,
	Failed(String),
}

impl Display for ScriptOutcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Transformed => write!(f, "transformed"),
			Self::Untouched => write!(f, "untouched"),
			Self::Failed(reason) => write!(f, "failed ({})", reason),
		}
	}
}

/// A target file read once at the start of processing.
#[derive(Clone, Debug)]
pub struct SourceFile {
	pub path: PathBuf,
	pub content: String,
}

impl SourceFile {
	pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
		Self {
			path: path.into(),
			content: content.into(),
		}
	}

	pub fn size(&self) -> usize {
		self.content.len()
	}

	pub fn file_name(&self) -> String {
		self.path.file_name()
			.map(|name| name.to_string_lossy().into_owned())
			.unwrap_or_default()
	}

	/// `<parent-dir>/<file-name>`, used to tell apart targets sharing a file name.
	pub fn display_name(&self) -> String {
		match parent_name(&self.path) {
			Some(dir) => format!("{}/{}", dir, self.file_name()),
			None => self.file_name(),
		}
	}
}

pub fn parent_name(path: &Path) -> Option<String> {
	path.parent()
		.and_then(Path::file_name)
		.map(|name| name.to_string_lossy().into_owned())
}

pub fn print_summary(results: &[(PathBuf, FileOutcome)]) {
	cprintln!("\n<b!>Summary:");

	for (path, outcome) in results {
		match outcome {
			FileOutcome::Processed(_) => cprintln!("   <g!>✔</> {} <k!>{}", path.display(), outcome),
			FileOutcome::Skipped => cprintln!("   <y!>-</> {} <k!>{}", path.display(), outcome),
			FileOutcome::Failed(_) => cprintln!("   <r!>✘</> {} <k!>{}", path.display(), outcome),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn formats_sizes_like_the_status_lines() {
		assert_eq!(format_size(0), "0 B");
		assert_eq!(format_size(1023), "1023 B");
		assert_eq!(format_size(1024), "1.00 KB");
		assert_eq!(format_size(1536), "1.50 KB");
		assert_eq!(format_size(3 * 1024 * 1024 / 2), "1.50 MB");
	}

	#[test]
	fn computes_reduction() {
		assert_eq!(SizeReport::new(200, 50).reduction(), 75.0);
		assert_eq!(SizeReport::new(0, 0).reduction(), 0.0);
		assert!(SizeReport::new(100, 150).reduction() < 0.0);
	}

	#[test]
	fn displays_size_report() {
		assert_eq!(SizeReport::new(2048, 1024).to_string(), "2.00 KB → 1.00 KB (50.0% reduction)");
	}

	#[test]
	fn displays_outcomes() {
		assert_eq!(FileOutcome::Skipped.to_string(), "skipped (not found)");
		assert_eq!(FileOutcome::Failed("boom".into()).to_string(), "failed (boom)");
		assert_eq!(ScriptOutcome::Failed("bad".into()).to_string(), "failed (bad)");
	}

	#[test]
	fn names_files_by_parent_directory() {
		let file = SourceFile::new("/proj/common-webviews/custom-panel.html", "");
		assert_eq!(file.file_name(), "custom-panel.html");
		assert_eq!(file.display_name(), "common-webviews/custom-panel.html");
	}
}
