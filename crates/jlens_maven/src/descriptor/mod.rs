//! Built-in descriptor parser strategy.
//!
//! Reads `pom.xml` structurally, falls back to pattern extraction for
//! documents that are not well-formed, and interpolates `${...}` property
//! references before producing a [`ModuleContext`].

mod interpolate;
mod pom;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::error::ResolveError;
use crate::model::{DependencyInfo, ModuleContext, Scope, UNKNOWN_VERSION};
use crate::resolver::ModuleResolver;

pub(crate) use interpolate::Interpolator;
pub(crate) use pom::{ParseMode, RawDescriptor};

pub const DIRECT_RESOLVER_NAME: &str = "DirectResolver";

/// Identity fields recovered from a descriptor after interpolation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DescriptorIdentity {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub packaging: Option<String>,
}

/// Resolves a module by reading its descriptor directly. Always available.
#[derive(Debug, Clone, Default)]
pub struct DescriptorResolver {
    local_repository: Option<PathBuf>,
}

impl DescriptorResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the local repository root on produced contexts.
    pub fn with_local_repository(mut self, local_repository: Option<PathBuf>) -> Self {
        self.local_repository = local_repository;
        self
    }

    /// Synchronous form of [`ModuleResolver::resolve`].
    pub fn resolve_blocking(
        &self,
        pom_file: &Path,
        scope: Scope,
        profiles: &[String],
    ) -> Result<ModuleContext, ResolveError> {
        if !pom_file.exists() {
            return Err(ResolveError::DescriptorNotFound {
                path: pom_file.to_path_buf(),
            });
        }
        let text =
            std::fs::read_to_string(pom_file).map_err(|source| ResolveError::io(pom_file, source))?;
        self.resolve_text(pom_file, &text, scope, profiles)
    }

    pub(crate) fn resolve_text(
        &self,
        pom_file: &Path,
        text: &str,
        scope: Scope,
        profiles: &[String],
    ) -> Result<ModuleContext, ResolveError> {
        let (raw, mode) = RawDescriptor::read(text);
        if mode == ParseMode::Scraped {
            tracing::warn!(
                path = %pom_file.display(),
                "descriptor is not well-formed XML, extracted fields by pattern"
            );
        }

        let properties = seed_properties(&raw);
        let identity = interpolate_identity(&raw, &properties);

        let (group_id, artifact_id) = match (identity.group_id, identity.artifact_id) {
            (Some(group_id), Some(artifact_id)) => (group_id, artifact_id),
            (group_id, artifact_id) => {
                let missing = [
                    group_id.is_none().then_some("groupId"),
                    artifact_id.is_none().then_some("artifactId"),
                ]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" and ");
                return Err(ResolveError::InvalidDescriptor {
                    path: pom_file.to_path_buf(),
                    reason: format!("missing {missing}"),
                });
            }
        };

        let interpolator = Interpolator::new(&properties);
        let dependencies = raw
            .dependencies
            .iter()
            .filter_map(|dependency| {
                let group = interpolator.expand_opt(dependency.group_id.as_deref())?;
                let artifact = interpolator.expand_opt(dependency.artifact_id.as_deref())?;
                let version = interpolator
                    .expand_opt(dependency.version.as_deref())
                    .unwrap_or_else(|| UNKNOWN_VERSION.to_string());
                let scope = Scope::from_maven(
                    interpolator.expand_opt(dependency.scope.as_deref()).as_deref(),
                );

                let mut info = DependencyInfo::new(group, artifact, version)
                    .with_scope(scope)
                    .with_optional(dependency.optional);
                if let Some(classifier) = interpolator.expand_opt(dependency.classifier.as_deref()) {
                    info = info.with_classifier(classifier);
                }
                if let Some(dep_type) = interpolator.expand_opt(dependency.dep_type.as_deref()) {
                    info = info.with_type(dep_type);
                }
                if let Some(system_path) =
                    interpolator.expand_opt(dependency.system_path.as_deref())
                {
                    info = info.with_system_path(system_path);
                }
                Some(info)
            })
            .collect::<Vec<_>>();

        let base_directory = base_directory_of(pom_file);
        let output_directory = base_directory.join("target").join("classes");
        let test_output_directory = base_directory.join("target").join("test-classes");

        tracing::debug!(
            path = %pom_file.display(),
            dependencies = dependencies.len(),
            "resolved descriptor"
        );

        let mut builder = ModuleContext::builder(pom_file)
            .base_directory(&base_directory)
            .group_id(group_id)
            .artifact_id(artifact_id)
            .local_repository(self.local_repository.clone())
            .scope(scope)
            .active_profiles(profiles.iter().cloned())
            .modules(raw.modules.iter().cloned())
            .dependencies(dependencies)
            .classpath(vec![output_directory.clone()])
            .output_directory(output_directory)
            .test_output_directory(test_output_directory);
        if let Some(version) = identity.version {
            builder = builder.version(version);
        }
        if let Some(packaging) = identity.packaging {
            builder = builder.packaging(packaging);
        }
        Ok(builder.build())
    }
}

#[async_trait]
impl ModuleResolver for DescriptorResolver {
    fn name(&self) -> &'static str {
        DIRECT_RESOLVER_NAME
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn resolve(
        &self,
        pom_file: &Path,
        scope: Scope,
        profiles: &[String],
    ) -> Result<ModuleContext, ResolveError> {
        if !tokio::fs::try_exists(pom_file).await.unwrap_or(false) {
            return Err(ResolveError::DescriptorNotFound {
                path: pom_file.to_path_buf(),
            });
        }
        let text = tokio::fs::read_to_string(pom_file)
            .await
            .map_err(|source| ResolveError::io(pom_file, source))?;
        self.resolve_text(pom_file, &text, scope, profiles)
    }
}

/// Reads identity fields from raw descriptor text, used to fill gaps left
/// by external tool output.
pub(crate) fn scan_identity(text: &str) -> DescriptorIdentity {
    let (raw, _) = RawDescriptor::read(text);
    let properties = seed_properties(&raw);
    interpolate_identity(&raw, &properties)
}

/// Declared properties plus the built-in `project.*`, `pom.*` and
/// `project.parent.*` aliases.
fn seed_properties(raw: &RawDescriptor) -> IndexMap<String, String> {
    let mut properties = raw.properties.clone();
    let mut alias = |key: &str, value: Option<&str>| {
        if let Some(value) = value {
            properties.insert(key.to_string(), value.to_string());
        }
    };

    alias("project.groupId", raw.effective_group_id());
    alias("project.artifactId", raw.artifact_id.as_deref());
    alias("project.version", raw.effective_version());
    alias("pom.groupId", raw.effective_group_id());
    alias("pom.artifactId", raw.artifact_id.as_deref());
    alias("pom.version", raw.effective_version());
    alias("groupId", raw.effective_group_id());
    alias("artifactId", raw.artifact_id.as_deref());
    alias("version", raw.effective_version());
    if let Some(parent) = &raw.parent {
        alias("project.parent.groupId", parent.group_id.as_deref());
        alias("project.parent.artifactId", parent.artifact_id.as_deref());
        alias("project.parent.version", parent.version.as_deref());
    }
    properties
}

fn interpolate_identity(
    raw: &RawDescriptor,
    properties: &IndexMap<String, String>,
) -> DescriptorIdentity {
    let interpolator = Interpolator::new(properties);
    DescriptorIdentity {
        group_id: interpolator.expand_opt(raw.effective_group_id()),
        artifact_id: interpolator.expand_opt(raw.artifact_id.as_deref()),
        version: interpolator.expand_opt(raw.effective_version()),
        packaging: interpolator.expand_opt(raw.packaging.as_deref()),
    }
}

pub(crate) fn base_directory_of(pom_file: &Path) -> PathBuf {
    match pom_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir()
            .map(|cwd| cwd.join(pom_file).parent().map(Path::to_path_buf).unwrap_or(cwd))
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_pom(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("pom.xml");
        fs::write(&path, body).expect("write pom");
        path
    }

    #[test]
    fn interpolates_project_version_into_dependencies() {
        let temp = tempdir().expect("temp dir");
        let pom = write_pom(
            temp.path(),
            r#"<project>
  <groupId>com.example</groupId>
  <artifactId>app</artifactId>
  <version>1.4.0</version>
  <dependencies>
    <dependency>
      <groupId>${project.groupId}</groupId>
      <artifactId>app-core</artifactId>
      <version>${project.version}</version>
    </dependency>
  </dependencies>
</project>"#,
        );

        let context = DescriptorResolver::new()
            .resolve_blocking(&pom, Scope::Compile, &[])
            .expect("resolve");
        assert_eq!(context.coordinates(), "com.example:app:1.4.0");
        let dependency = &context.dependencies()[0];
        assert_eq!(dependency.group_id, "com.example");
        assert_eq!(dependency.version, "1.4.0");
        assert_eq!(dependency.scope, Scope::Compile);
    }

    #[test]
    fn seeds_classpath_with_output_directory_only() {
        let temp = tempdir().expect("temp dir");
        let pom = write_pom(
            temp.path(),
            "<project><groupId>g</groupId><artifactId>a</artifactId></project>",
        );

        let context = DescriptorResolver::new()
            .resolve_blocking(&pom, Scope::Test, &["ci".to_string()])
            .expect("resolve");
        assert_eq!(context.version(), UNKNOWN_VERSION);
        assert_eq!(context.scope(), Scope::Test);
        assert_eq!(context.active_profiles(), ["ci".to_string()]);
        assert_eq!(context.classpath(), [temp.path().join("target/classes")]);
        assert_eq!(
            context.test_output_directory(),
            temp.path().join("target/test-classes")
        );
        assert!(context.classpath_jars().is_empty());
    }

    #[test]
    fn aggregator_lists_child_modules() {
        let temp = tempdir().expect("temp dir");
        let pom = write_pom(
            temp.path(),
            r#"<project>
  <groupId>com.example</groupId>
  <artifactId>parent</artifactId>
  <version>2.0</version>
  <packaging>pom</packaging>
  <modules>
    <module>core</module>
    <module>web</module>
  </modules>
</project>"#,
        );

        let context = DescriptorResolver::new()
            .resolve_blocking(&pom, Scope::Compile, &[])
            .expect("resolve");
        assert_eq!(context.packaging(), "pom");
        assert_eq!(context.modules(), ["core".to_string(), "web".to_string()]);
        assert_eq!(context.to_builder().build().modules(), context.modules());
    }

    #[test]
    fn missing_artifact_is_invalid() {
        let temp = tempdir().expect("temp dir");
        let pom = write_pom(temp.path(), "<project><groupId>g</groupId></project>");

        let error = DescriptorResolver::new()
            .resolve_blocking(&pom, Scope::Compile, &[])
            .expect_err("invalid descriptor");
        match error {
            ResolveError::InvalidDescriptor { path, reason } => {
                assert_eq!(path, pom);
                assert!(reason.contains("artifactId"), "reason: {reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn identity_scan_uses_parent_fallbacks() {
        let identity = scan_identity(
            r#"<project>
  <parent><groupId>org.parent</groupId><artifactId>p</artifactId><version>9</version></parent>
  <artifactId>child</artifactId>
</project>"#,
        );
        assert_eq!(identity.group_id.as_deref(), Some("org.parent"));
        assert_eq!(identity.artifact_id.as_deref(), Some("child"));
        assert_eq!(identity.version.as_deref(), Some("9"));
    }
}
