//! Filesystem-safe names

use std::path::{Path, PathBuf};

/// Characters rejected by at least one common filesystem
const ILLEGAL: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Strip characters that cannot appear in a file name.
///
/// Removes `< > : " / \ | ? *` and ASCII control characters 0x00-0x1F.
/// Everything else, including non-ASCII text, is kept as is.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|c| !ILLEGAL.contains(c) && !('\u{0}'..='\u{1f}').contains(c))
        .collect()
}

/// Build `<sanitized stem>.<ext>`
pub fn target_file_name(stem: &str, ext: &str) -> String {
    format!("{}.{}", sanitize_filename(stem), ext)
}

/// Sibling path a transfer streams into before it is renamed to `target`
pub fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}
