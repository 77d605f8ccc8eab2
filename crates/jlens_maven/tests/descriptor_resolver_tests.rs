use std::fs;
use std::path::{Path, PathBuf};

use tempfile::tempdir;

use jlens_maven::{
    DescriptorResolver, ModuleResolver, ResolveError, ResolverFactory, MavenConfig, Scope,
};

fn write_pom(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("pom.xml");
    fs::write(&path, body).expect("write pom");
    path
}

const WIDGET_POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <modelVersion>4.0.0</modelVersion>
  <groupId>com.example</groupId>
  <artifactId>widget</artifactId>
  <version>1.0.0</version>
  <dependencies>
    <dependency>
      <groupId>org.example</groupId>
      <artifactId>lib</artifactId>
      <version>2.0.0</version>
      <scope>test</scope>
    </dependency>
  </dependencies>
</project>
"#;

#[tokio::test]
async fn widget_descriptor_resolves_coordinates_and_test_dependency() {
    let temp = tempdir().expect("temp dir");
    let pom = write_pom(temp.path(), WIDGET_POM);

    let context = DescriptorResolver::new()
        .resolve(&pom, Scope::Compile, &[])
        .await
        .expect("resolve widget");

    assert_eq!(context.coordinates(), "com.example:widget:1.0.0");
    assert_eq!(context.dependencies().len(), 1);
    let dependency = &context.dependencies()[0];
    assert_eq!(dependency.coordinates(), "org.example:lib:jar:2.0.0");
    assert_eq!(dependency.scope, Scope::Test);
}

#[tokio::test]
async fn resolution_is_idempotent() {
    let temp = tempdir().expect("temp dir");
    let pom = write_pom(temp.path(), WIDGET_POM);
    let resolver = ResolverFactory::new(MavenConfig::default()).create_resolver();

    let first = resolver
        .resolve(&pom, Scope::Compile, &[])
        .await
        .expect("first");
    let second = resolver
        .resolve(&pom, Scope::Compile, &[])
        .await
        .expect("second");

    assert_eq!(first, second);
    assert_eq!(first.dependencies(), second.dependencies());
}

#[tokio::test]
async fn missing_descriptor_is_reported_with_path() {
    let temp = tempdir().expect("temp dir");
    let missing = temp.path().join("nope").join("pom.xml");

    let error = DescriptorResolver::new()
        .resolve(&missing, Scope::Compile, &[])
        .await
        .expect_err("missing descriptor");
    match &error {
        ResolveError::DescriptorNotFound { path } => assert_eq!(path, &missing),
        other => panic!("unexpected error: {other}"),
    }
    assert!(error.to_string().contains("nope"));
}

#[tokio::test]
async fn descriptor_without_identity_is_invalid() {
    let temp = tempdir().expect("temp dir");
    let pom = write_pom(
        temp.path(),
        "<project><version>1.0</version><dependencies/></project>",
    );

    let error = DescriptorResolver::new()
        .resolve(&pom, Scope::Compile, &[])
        .await
        .expect_err("invalid descriptor");
    assert!(matches!(error, ResolveError::InvalidDescriptor { .. }));
}

#[tokio::test]
async fn transitive_properties_and_parent_identity_resolve() {
    let temp = tempdir().expect("temp dir");
    let pom = write_pom(
        temp.path(),
        r#"<project>
  <parent>
    <groupId>org.acme</groupId>
    <artifactId>acme-parent</artifactId>
    <version>5.2.1</version>
  </parent>
  <artifactId>acme-web</artifactId>
  <properties>
    <base.version>6.1.0</base.version>
    <spring.version>${base.version}</spring.version>
    <loop>${loop}</loop>
  </properties>
  <dependencies>
    <dependency>
      <groupId>org.springframework</groupId>
      <artifactId>spring-web</artifactId>
      <version>${spring.version}</version>
    </dependency>
    <dependency>
      <groupId>${project.parent.groupId}</groupId>
      <artifactId>acme-core</artifactId>
      <version>${project.version}</version>
      <classifier>all</classifier>
      <optional>true</optional>
    </dependency>
    <dependency>
      <groupId>org.acme</groupId>
      <artifactId>looping</artifactId>
      <version>${loop}</version>
    </dependency>
  </dependencies>
</project>"#,
    );

    let context = DescriptorResolver::new()
        .resolve(&pom, Scope::Compile, &[])
        .await
        .expect("resolve");

    assert_eq!(context.coordinates(), "org.acme:acme-web:5.2.1");
    let deps = context.dependencies();
    assert_eq!(deps[0].version, "6.1.0");
    assert_eq!(deps[1].coordinates(), "org.acme:acme-core:all:jar:5.2.1");
    assert!(deps[1].optional);
    assert_eq!(deps[2].version, "${loop}");
}
