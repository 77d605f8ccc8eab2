use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::tempdir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use jlens_index::{resolve_class_name, ClassIndex, ClasspathIndexer, ResolutionKind};
use jlens_maven::{DependencyInfo, LocalRepository, ModuleContext, Scope};

fn write_jar(path: &Path, entries: &[&str]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create jar dir");
    }
    let file = File::create(path).expect("create jar");
    let mut writer = ZipWriter::new(file);
    for entry in entries {
        if entry.ends_with('/') {
            writer
                .add_directory(entry.trim_end_matches('/'), FileOptions::default())
                .expect("add directory");
        } else {
            writer
                .start_file(*entry, FileOptions::default())
                .expect("start entry");
            writer.write_all(b"\xCA\xFE\xBA\xBE").expect("write entry");
        }
    }
    writer.finish().expect("finish jar");
}

fn indexer() -> ClasspathIndexer {
    ClasspathIndexer::new(Arc::new(ClassIndex::new()))
}

#[tokio::test]
async fn same_simple_name_in_two_packages_is_ambiguous() {
    let temp = tempdir().expect("temp dir");
    let jar = temp.path().join("mixed-1.0.jar");
    write_jar(
        &jar,
        &[
            "META-INF/MANIFEST.MF",
            "com/",
            "com/example/",
            "com/example/Foo.class",
            "org/other/Foo.class",
        ],
    );

    let indexer = indexer();
    let summary = indexer.index_paths(&[jar], &[], &[]).await;
    assert_eq!(summary.binary_archives, 1);
    assert_eq!(summary.entries, 2);
    assert_eq!(summary.failed, 0);

    let result = resolve_class_name("Foo", &[], None, indexer.index());
    assert_eq!(result.kind, ResolutionKind::Ambiguous);
    assert_eq!(result.possible_packages, vec!["com.example", "org.other"]);
    assert_eq!(result.resolved_name.as_deref(), Some("com.example.Foo"));
    assert_eq!(
        indexer.index().dependency_for_package("org.other").as_deref(),
        Some("mixed")
    );
}

#[tokio::test]
async fn unreadable_archives_are_skipped() {
    let temp = tempdir().expect("temp dir");
    let good = temp.path().join("good-2.1.jar");
    write_jar(&good, &["org/good/Thing.class"]);
    let corrupt = temp.path().join("corrupt-1.0.jar");
    fs::write(&corrupt, b"this is not a zip archive").expect("write corrupt jar");
    let missing = temp.path().join("missing-1.0.jar");

    let indexer = indexer().with_max_concurrent_archives(1);
    let summary = indexer
        .index_paths(&[corrupt, good, missing], &[], &[])
        .await;

    assert_eq!(summary.binary_archives, 1);
    assert_eq!(summary.failed, 2);
    assert_eq!(indexer.index().packages_for("Thing"), vec!["org.good"]);
}

#[tokio::test]
async fn source_archives_add_package_hints() {
    let temp = tempdir().expect("temp dir");
    let binary = temp.path().join("lib-1.0.jar");
    write_jar(&binary, &["org/lib/Api.class"]);
    let sources = temp.path().join("lib-1.0-sources.jar");
    write_jar(&sources, &["org/lib/Api.java", "org/lib/internal/Hidden.java"]);

    let indexer = indexer();
    let summary = indexer.index_paths(&[binary], &[], &[sources]).await;

    assert_eq!(summary.source_archives, 1);
    assert_eq!(indexer.index().packages_for("Api"), vec!["org.lib"]);
    assert_eq!(indexer.index().packages_for("Hidden"), vec!["org.lib.internal"]);
    // Source archives never claim package ownership.
    assert_eq!(indexer.index().dependency_for_package("org.lib.internal"), None);
}

#[tokio::test]
async fn class_directories_are_walked() {
    let temp = tempdir().expect("temp dir");
    let classes = temp.path().join("target").join("classes");
    let package_dir = classes.join("com").join("app").join("web");
    fs::create_dir_all(&package_dir).expect("create package dir");
    fs::write(package_dir.join("Controller.class"), b"").expect("write class");
    fs::write(package_dir.join("Controller$1.class"), b"").expect("write anonymous class");
    fs::write(classes.join("Toplevel.class"), b"").expect("write default package class");

    let indexer = indexer();
    let summary = indexer.index_paths(&[], &[classes], &[]).await;

    assert_eq!(summary.directories, 1);
    assert_eq!(summary.entries, 1);
    assert_eq!(indexer.index().packages_for("Controller"), vec!["com.app.web"]);
    assert!(indexer.index().packages_for("Toplevel").is_empty());
}

#[tokio::test]
async fn missing_class_directory_is_counted_as_failed() {
    let temp = tempdir().expect("temp dir");
    let present = temp.path().join("classes");
    fs::create_dir_all(present.join("org").join("app")).expect("create package dir");
    fs::write(present.join("org").join("app").join("Main.class"), b"").expect("write class");
    let absent = temp.path().join("gone");

    let indexer = indexer();
    let summary = indexer.index_paths(&[], &[present, absent], &[]).await;

    assert_eq!(summary.directories, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(indexer.index().packages_for("Main"), vec!["org.app"]);
}

/// Rewrites the compression method of every entry, leaving the data as is.
fn set_compression_method(path: &Path, method: u16) {
    let mut bytes = fs::read(path).expect("read jar");
    let method = method.to_le_bytes();
    let mut offset = 0;
    while offset + 12 <= bytes.len() {
        let signature = [
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ];
        match &signature {
            b"PK\x03\x04" => bytes[offset + 8..offset + 10].copy_from_slice(&method),
            b"PK\x01\x02" => bytes[offset + 10..offset + 12].copy_from_slice(&method),
            _ => {}
        }
        offset += 1;
    }
    fs::write(path, bytes).expect("write jar");
}

#[tokio::test]
async fn entries_with_unsupported_compression_are_still_listed() {
    let temp = tempdir().expect("temp dir");
    let jar = temp.path().join("packed-1.0.jar");
    let file = File::create(&jar).expect("create jar");
    let mut writer = ZipWriter::new(file);
    let stored = FileOptions::default().compression_method(CompressionMethod::Stored);
    for entry in ["org/packed/Alpha.class", "org/packed/Beta.class"] {
        writer.start_file(entry, stored).expect("start entry");
        writer.write_all(b"\xCA\xFE\xBA\xBE").expect("write entry");
    }
    writer.finish().expect("finish jar");
    // 12 is bzip2, which this build cannot decompress.
    set_compression_method(&jar, 12);

    let indexer = indexer();
    let summary = indexer.index_paths(&[jar], &[], &[]).await;

    assert_eq!(summary.failed, 0);
    assert_eq!(summary.entries, 2);
    assert_eq!(indexer.index().packages_for("Beta"), vec!["org.packed"]);
}

fn install(repository: &Path, dependency: &DependencyInfo, entries: &[&str]) -> PathBuf {
    let path = LocalRepository::new(repository).artifact_path(dependency);
    write_jar(&path, entries);
    path
}

#[tokio::test]
async fn build_index_reads_a_hydrated_module() {
    let temp = tempdir().expect("temp dir");
    let repository = temp.path().join("repository");
    let module_dir = temp.path().join("module");
    let output = module_dir.join("target").join("classes").join("com").join("acme");
    fs::create_dir_all(&output).expect("create output dir");
    fs::write(output.join("App.class"), b"").expect("write app class");

    let compile = DependencyInfo::new("org.slf4j", "slf4j-api", "2.0.9");
    let test = DependencyInfo::new("org.junit", "junit", "5.10.0").with_scope(Scope::Test);
    install(&repository, &compile, &["org/slf4j/Logger.class"]);
    install(&repository, &test, &["org/junit/Test.class"]);

    let context = ModuleContext::builder(module_dir.join("pom.xml"))
        .group_id("com.acme")
        .artifact_id("app")
        .version("1.0.0")
        .dependencies(vec![compile, test])
        .classpath(vec![module_dir.join("target").join("classes")])
        .build();
    let context = LocalRepository::new(&repository).hydrate(&context);
    assert_eq!(context.classpath_jars().len(), 1);

    let indexer = indexer();
    let summary = indexer.build_index(&context).await;

    assert_eq!(summary.binary_archives, 1);
    assert_eq!(summary.directories, 1);
    let index = indexer.index();
    assert_eq!(index.packages_for("Logger"), vec!["org.slf4j"]);
    assert_eq!(index.packages_for("App"), vec!["com.acme"]);
    assert!(index.packages_for("Test").is_empty());
    assert_eq!(
        index.dependency_for_package("org.slf4j").as_deref(),
        Some("slf4j-api")
    );

    let imports = vec!["org.slf4j.*".to_string()];
    let result = resolve_class_name("Logger", &imports, Some("com.acme"), index);
    assert_eq!(result.kind, ResolutionKind::WildcardImport);
    assert_eq!(result.resolved_name.as_deref(), Some("org.slf4j.Logger"));
}
