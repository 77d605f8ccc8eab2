use std::path::{Path, PathBuf};

pub const DESCRIPTOR_FILE_NAME: &str = "pom.xml";

/// Nearest `pom.xml` at or above `start` (a source file or directory).
pub fn find_descriptor(start: &Path) -> Option<PathBuf> {
    let first = if start.is_file() { start.parent()? } else { start };
    first
        .ancestors()
        .map(|dir| dir.join(DESCRIPTOR_FILE_NAME))
        .find(|candidate| candidate.is_file())
}
