//! Full-file replace through a sibling temp file.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Prefix of in-flight temp files. A crash leaves one behind at most per file,
/// and the next prune phase deletes it like any other stray replica file.
pub const TEMP_PREFIX: &str = ".mirrorsync-";

/// Copies `src` over `dst`, replacing any previous content atomically.
///
/// Content is streamed into a temp file in `dst`'s directory, flushed to disk,
/// then renamed over `dst`. Readers of `dst` see either the old or the new
/// content, never a partial write. Returns the number of bytes copied.
///
/// # Errors
///
/// Returns an error if the source cannot be read, the temp file cannot be
/// created or written, or the rename fails. On error `dst` is untouched and
/// the temp file is removed.
pub fn replace_file(src: &Path, dst: &Path) -> Result<u64> {
    let parent = dst
        .parent()
        .with_context(|| format!("{} has no parent directory", dst.display()))?;

    let source =
        File::open(src).with_context(|| format!("Failed to open {}", src.display()))?;
    let mut reader = BufReader::new(source);

    let temp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .tempfile_in(parent)
        .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;

    let mut writer = BufWriter::new(temp);
    let bytes = std::io::copy(&mut reader, &mut writer)
        .with_context(|| format!("Failed to copy {} to {}", src.display(), dst.display()))?;

    let temp = writer
        .into_inner()
        .map_err(|e| e.into_error())
        .with_context(|| format!("Failed to flush temp file for {}", dst.display()))?;
    temp.as_file()
        .sync_all()
        .with_context(|| format!("Failed to sync temp file for {}", dst.display()))?;

    temp.persist(dst)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to move temp file over {}", dst.display()))?;

    Ok(bytes)
}
