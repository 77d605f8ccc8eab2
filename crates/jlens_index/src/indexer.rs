use std::ffi::OsStr;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use indexmap::IndexSet;
use jlens_maven::ModuleContext;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinSet;
use walkdir::WalkDir;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::index::ClassIndex;

pub const DEFAULT_MAX_CONCURRENT_ARCHIVES: usize = 8;

const CLASS_SUFFIX: &str = ".class";
const SOURCE_SUFFIX: &str = ".java";

/// Per-archive failure. Logged and counted, never returned to callers of
/// [`ClasspathIndexer::build_index`].
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("IO error while scanning {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("ZIP error while scanning {path}: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: ZipError,
    },
    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Outcome of one indexing pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexSummary {
    pub binary_archives: usize,
    pub directories: usize,
    pub source_archives: usize,
    pub failed: usize,
    pub entries: usize,
    pub elapsed_ms: u64,
}

impl IndexSummary {
    fn record(&mut self, kind: ScanKind, outcome: Result<usize, IndexError>) {
        match outcome {
            Ok(entries) => {
                self.entries += entries;
                match kind {
                    ScanKind::Archive => self.binary_archives += 1,
                    ScanKind::Directory => self.directories += 1,
                    ScanKind::Sources => self.source_archives += 1,
                }
            }
            Err(error) => {
                tracing::warn!(error = %error, "skipping unreadable classpath entry");
                self.failed += 1;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanKind {
    Archive,
    Directory,
    Sources,
}

/// Populates a shared [`ClassIndex`] from a module's classpath.
#[derive(Debug, Clone)]
pub struct ClasspathIndexer {
    index: Arc<ClassIndex>,
    max_concurrent_archives: usize,
}

impl ClasspathIndexer {
    pub fn new(index: Arc<ClassIndex>) -> Self {
        Self {
            index,
            max_concurrent_archives: DEFAULT_MAX_CONCURRENT_ARCHIVES,
        }
    }

    pub fn with_max_concurrent_archives(mut self, limit: usize) -> Self {
        self.max_concurrent_archives = limit.max(1);
        self
    }

    pub fn index(&self) -> &Arc<ClassIndex> {
        &self.index
    }

    /// Indexes every binary archive and class directory on the context's
    /// classpath, then its source archives.
    ///
    /// Returns once every scan has finished, so the index is complete when
    /// the future resolves. Unreadable entries are logged and skipped.
    pub async fn build_index(&self, context: &ModuleContext) -> IndexSummary {
        let mut archives: IndexSet<PathBuf> = context.classpath_jars().iter().cloned().collect();
        let mut directories = Vec::new();
        for entry in context.classpath() {
            if entry.is_dir() {
                directories.push(entry.clone());
            } else if is_archive(entry) {
                archives.insert(entry.clone());
            }
        }
        let archives: Vec<PathBuf> = archives.into_iter().collect();

        tracing::debug!(
            module = %context.coordinates(),
            archives = archives.len(),
            directories = directories.len(),
            sources = context.source_jars().len(),
            "building class index"
        );
        self.index_paths(&archives, &directories, context.source_jars())
            .await
    }

    pub async fn index_paths(
        &self,
        archives: &[PathBuf],
        directories: &[PathBuf],
        source_archives: &[PathBuf],
    ) -> IndexSummary {
        let started = Instant::now();
        let mut summary = IndexSummary::default();
        let mut join_set = JoinSet::new();

        let jobs = archives
            .iter()
            .map(|path| (ScanKind::Archive, path))
            .chain(directories.iter().map(|path| (ScanKind::Directory, path)));
        for (kind, path) in jobs {
            let index = Arc::clone(&self.index);
            let path = path.clone();
            join_set.spawn_blocking(move || {
                let outcome = match kind {
                    ScanKind::Directory => scan_class_directory(&index, &path),
                    _ => scan_binary_archive(&index, &path),
                };
                (kind, outcome)
            });

            if join_set.len() >= self.max_concurrent_archives {
                if let Some(joined) = join_set.join_next().await {
                    record_joined(&mut summary, joined);
                }
            }
        }
        while let Some(joined) = join_set.join_next().await {
            record_joined(&mut summary, joined);
        }

        // Source archives only add package hints, one at a time after the
        // binary pass.
        for path in source_archives {
            let index = Arc::clone(&self.index);
            let path = path.clone();
            let joined = tokio::task::spawn_blocking(move || scan_source_archive(&index, &path))
                .await
                .map(|outcome| (ScanKind::Sources, outcome));
            record_joined(&mut summary, joined);
        }

        summary.elapsed_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            archives = summary.binary_archives,
            directories = summary.directories,
            sources = summary.source_archives,
            failed = summary.failed,
            entries = summary.entries,
            elapsed_ms = summary.elapsed_ms,
            "class index built"
        );
        summary
    }
}

fn record_joined(
    summary: &mut IndexSummary,
    joined: Result<(ScanKind, Result<usize, IndexError>), tokio::task::JoinError>,
) {
    match joined {
        Ok((kind, outcome)) => summary.record(kind, outcome),
        Err(error) => {
            tracing::warn!(error = %error, "indexing task aborted");
            summary.failed += 1;
        }
    }
}

fn scan_binary_archive(index: &ClassIndex, path: &Path) -> Result<usize, IndexError> {
    let owner = dependency_name(path);
    scan_archive(path, CLASS_SUFFIX, |package, simple_name| {
        index.insert_class(package, simple_name);
        if let Some(owner) = &owner {
            index.record_owner(package, owner);
        }
    })
}

fn scan_source_archive(index: &ClassIndex, path: &Path) -> Result<usize, IndexError> {
    scan_archive(path, SOURCE_SUFFIX, |package, simple_name| {
        index.insert_class(package, simple_name);
    })
}

fn scan_archive<F>(path: &Path, suffix: &str, mut visit: F) -> Result<usize, IndexError>
where
    F: FnMut(&str, &str),
{
    let file = File::open(path).map_err(|source| IndexError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let archive = ZipArchive::new(BufReader::new(file)).map_err(|source| IndexError::Zip {
        path: path.to_path_buf(),
        source,
    })?;

    let mut count = 0;
    for name in archive.file_names() {
        if name.ends_with('/') {
            continue;
        }
        if let Some((package, simple_name)) = split_entry_name(name, suffix) {
            visit(&package, simple_name);
            count += 1;
        }
    }
    Ok(count)
}

fn scan_class_directory(index: &ClassIndex, root: &Path) -> Result<usize, IndexError> {
    let mut count = 0;
    for entry in WalkDir::new(root).into_iter() {
        let entry = entry.map_err(|source| IndexError::Walk {
            path: root.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let name = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if let Some((package, simple_name)) = split_entry_name(&name, CLASS_SUFFIX) {
            index.insert_class(&package, simple_name);
            count += 1;
        }
    }
    Ok(count)
}

/// Splits an archive entry such as `com/example/Foo.class` into
/// (`com.example`, `Foo`).
///
/// Metadata entries, `module-info`/`package-info`, anonymous classes and
/// classes in the default package yield `None`.
pub(crate) fn split_entry_name<'a>(name: &'a str, suffix: &str) -> Option<(String, &'a str)> {
    let mut name = name.trim_start_matches('/');
    if name.starts_with("META-INF/") {
        return None;
    }
    for prefix in ["BOOT-INF/classes/", "WEB-INF/classes/", "classes/"] {
        if let Some(stripped) = name.strip_prefix(prefix) {
            name = stripped;
            break;
        }
    }

    let stem = name.strip_suffix(suffix)?;
    let (directory, simple_name) = stem.rsplit_once('/')?;
    if directory.is_empty() || simple_name.is_empty() {
        return None;
    }
    if simple_name == "module-info" || simple_name == "package-info" {
        return None;
    }
    let anonymous = simple_name
        .split('$')
        .skip(1)
        .any(|part| part.is_empty() || part.chars().all(|ch| ch.is_ascii_digit()));
    if anonymous {
        return None;
    }
    Some((directory.replace('/', "."), simple_name))
}

static VERSION_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+)-\d+(?:\.\d+)*(?:[-.][\w.]+)?$").expect("version suffix regex"));

/// Best-effort dependency name for an archive: the file name without its
/// extension and trailing `-<version>` part.
pub fn dependency_name(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_string_lossy();
    let name = VERSION_SUFFIX
        .captures(&stem)
        .map(|captures| captures[1].to_string())
        .unwrap_or_else(|| stem.to_string());
    Some(name)
}

fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|ext| ext.eq_ignore_ascii_case("jar") || ext.eq_ignore_ascii_case("zip"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_entry_names() {
        assert_eq!(
            split_entry_name("com/example/Foo.class", CLASS_SUFFIX),
            Some(("com.example".to_string(), "Foo"))
        );
        assert_eq!(
            split_entry_name("org/a/Outer$Inner.class", CLASS_SUFFIX),
            Some(("org.a".to_string(), "Outer$Inner"))
        );
        assert_eq!(
            split_entry_name("BOOT-INF/classes/com/app/Main.class", CLASS_SUFFIX),
            Some(("com.app".to_string(), "Main"))
        );
        assert_eq!(
            split_entry_name("com/example/Foo.java", SOURCE_SUFFIX),
            Some(("com.example".to_string(), "Foo"))
        );
    }

    #[test]
    fn skips_metadata_and_synthetic_entries() {
        for name in [
            "META-INF/versions/11/com/a/B.class",
            "module-info.class",
            "com/a/package-info.class",
            "com/a/Outer$1.class",
            "Toplevel.class",
            "com/a/readme.txt",
        ] {
            assert_eq!(split_entry_name(name, CLASS_SUFFIX), None, "{name}");
        }
    }

    #[test]
    fn dependency_name_strips_version_suffix() {
        let cases = [
            ("/r/jackson-databind-2.15.2.jar", "jackson-databind"),
            ("/r/guava-32.1.2-jre.jar", "guava"),
            ("/r/commons-lang3-3.12.0.jar", "commons-lang3"),
            ("/r/app-1.0-SNAPSHOT.jar", "app"),
            ("/r/log4j-1.2-api-2.17.1.jar", "log4j-1.2-api"),
            ("/r/tools.jar", "tools"),
        ];
        for (path, expected) in cases {
            assert_eq!(
                dependency_name(Path::new(path)).as_deref(),
                Some(expected),
                "{path}"
            );
        }
    }
}
