//! Gzip-compressed tar expansion with entry exclusion.

use std::fs;
use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use log::debug;
use tar::Archive;

use crate::error::Result;
use crate::path::ExcludeSet;

/// True if `name` looks like a `.tar.gz` payload.
pub fn is_tar_gz(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".tar.gz") || lower.ends_with(".tgz")
}

/// Expand a `.tar.gz` stream into `dest`, skipping entries matched by `exclude`.
///
/// Entries that would land outside `dest` are skipped. Returns the number of
/// entries written.
pub fn expand_tar_gz<R: Read>(reader: R, dest: &Path, exclude: &ExcludeSet) -> Result<usize> {
    fs::create_dir_all(dest)?;
    let mut archive = Archive::new(GzDecoder::new(reader));
    archive.set_preserve_permissions(true);

    let mut written = 0;
    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();
        if exclude.excludes(&path) {
            debug!("Skipping excluded archive entry {}", path.display());
            continue;
        }
        if entry.unpack_in(dest)? {
            written += 1;
        } else {
            debug!("Skipping archive entry outside destination: {}", path.display());
        }
    }
    Ok(written)
}
