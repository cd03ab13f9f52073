use crate::types::*;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

impl SourceFile {
	/// Reads a target file as UTF-8. `Ok(None)` means the file does not exist.
	pub async fn read(path: &Path) -> Result<Option<Self>> {
		match fs::read_to_string(path).await {
			Ok(content) => Ok(Some(Self::new(path, content))),
			Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
			Err(err) => Err(err).with_context(|| format!("Cannot read {}", path.display())),
		}
	}
}

/// Durably writes `file`'s pristine content to `<backup_dir>/<name>.<millis>.bak`.
///
/// The token is the current unix time in milliseconds, bumped until the name
/// is unused, so two backups never overwrite each other. The backup is synced
/// to disk before this returns; callers must not transform the file if it fails.
pub async fn backup(file: &SourceFile, backup_dir: &Path, name: &str) -> Result<PathBuf> {
	fs::create_dir_all(backup_dir).await
		.with_context(|| format!("Cannot create backup directory {}", backup_dir.display()))?;

	let mut token = chrono::Utc::now().timestamp_millis();

	loop {
		let path = backup_dir.join(format!("{}.{}.bak", name, token));

		let mut backup = match OpenOptions::new().write(true).create_new(true).open(&path).await {
			Ok(backup) => backup,
			Err(err) if err.kind() == ErrorKind::AlreadyExists => {
				token += 1;
				continue;
			}
			Err(err) => return Err(err).with_context(|| format!("Cannot create backup {}", path.display())),
		};

		let written = async {
			backup.write_all(file.content.as_bytes()).await?;
			backup.sync_all().await
		}.await;

		written.with_context(|| format!("Cannot write backup {}", path.display()))?;

		return Ok(path);
	}
}

/// Replaces `path` with `contents` via a synced sibling temp file and a rename,
/// so the target holds either the old or the complete new content.
///
/// Symlinks are followed and the file they point to is replaced. The existing
/// file's permissions carry over to the new content.
pub async fn replace(path: &Path, contents: &str) -> Result<()> {
	let target = fs::canonicalize(path).await.unwrap_or_else(|_| path.to_path_buf());
	let permissions = fs::metadata(&target).await.ok().map(|meta| meta.permissions());

	let file_name = target.file_name()
		.map(|name| name.to_string_lossy().into_owned())
		.unwrap_or_default();
	let tmp_path = target.with_file_name(format!(".{}.extpack-tmp", file_name));

	let result = async {
		let mut tmp = fs::File::create(&tmp_path).await?;
		tmp.write_all(contents.as_bytes()).await?;
		tmp.sync_all().await?;

		if let Some(permissions) = permissions {
			fs::set_permissions(&tmp_path, permissions).await?;
		}

		fs::rename(&tmp_path, &target).await
	}.await;

	if result.is_err() {
		let _ = fs::remove_file(&tmp_path).await;
	}

	result.with_context(|| format!("Cannot write {}", path.display()))
}
