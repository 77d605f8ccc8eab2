//! Lookup of dependency archives in a local Maven repository.

use std::path::{Path, PathBuf};

use indexmap::IndexSet;

use crate::config::MavenConfig;
use crate::model::{DependencyInfo, ModuleContext, Scope, UNKNOWN_VERSION};

/// Archive types that carry classes on a classpath.
const ARCHIVE_TYPES: &[&str] = &["jar", "test-jar", "bundle", "ejb", "maven-plugin"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRepository {
    root: PathBuf,
}

impl LocalRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Configured repository, else `~/.m2/repository`.
    pub fn from_config(config: &MavenConfig) -> Option<Self> {
        config.effective_local_repository().map(Self::new)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn version_dir(&self, dependency: &DependencyInfo) -> PathBuf {
        self.root
            .join(dependency.group_path())
            .join(&dependency.artifact_id)
            .join(&dependency.version)
    }

    pub fn artifact_path(&self, dependency: &DependencyInfo) -> PathBuf {
        self.version_dir(dependency)
            .join(dependency.archive_file_name())
    }

    pub fn sources_path(&self, dependency: &DependencyInfo) -> PathBuf {
        self.version_dir(dependency)
            .join(dependency.sources_file_name())
    }

    /// Existing binary archive for a dependency. System-scoped dependencies
    /// use their declared `systemPath`.
    pub fn locate(&self, dependency: &DependencyInfo) -> Option<PathBuf> {
        if dependency.scope == Scope::System {
            return dependency
                .system_path
                .as_ref()
                .map(PathBuf::from)
                .filter(|path| path.is_file());
        }
        if !carries_classes(dependency) {
            return None;
        }
        let path = self.artifact_path(dependency);
        path.is_file().then_some(path)
    }

    pub fn locate_sources(&self, dependency: &DependencyInfo) -> Option<PathBuf> {
        if !carries_classes(dependency) || dependency.scope == Scope::System {
            return None;
        }
        let path = self.sources_path(dependency);
        path.is_file().then_some(path)
    }

    /// Returns a new context whose dependencies carry resolved archive paths
    /// and whose archive classpath views list every archive found for the
    /// dependencies visible in the context's scope.
    pub fn hydrate(&self, context: &ModuleContext) -> ModuleContext {
        let scope = context.scope();
        let mut jars = IndexSet::new();
        let mut sources = IndexSet::new();

        let dependencies: Vec<DependencyInfo> = context
            .dependencies()
            .iter()
            .map(|dependency| {
                let Some(path) = self.locate(dependency) else {
                    return dependency.clone();
                };
                if dependency.scope.is_visible_in(scope) {
                    jars.insert(path.clone());
                    if let Some(source) = self.locate_sources(dependency) {
                        sources.insert(source);
                    }
                }
                dependency.clone().with_jar_path(path)
            })
            .collect();

        let mut classpath: IndexSet<PathBuf> = context.classpath().iter().cloned().collect();
        if scope == Scope::Test {
            classpath.insert(context.test_output_directory().to_path_buf());
        }
        classpath.extend(jars.iter().cloned());

        tracing::debug!(
            module = %context.coordinates(),
            jars = jars.len(),
            sources = sources.len(),
            "hydrated classpath from local repository"
        );

        context
            .to_builder()
            .local_repository(Some(self.root.clone()))
            .dependencies(dependencies)
            .classpath(classpath.into_iter().collect())
            .classpath_jars(jars.into_iter().collect())
            .source_jars(sources.into_iter().collect())
            .build()
    }

    /// Dependencies visible in the context's scope whose archive is absent.
    pub fn missing_dependencies(&self, context: &ModuleContext) -> Vec<DependencyInfo> {
        context
            .dependencies()
            .iter()
            .filter(|dependency| dependency.scope.is_visible_in(context.scope()))
            .filter(|dependency| carries_classes(dependency) || dependency.scope == Scope::System)
            .filter(|dependency| self.locate(dependency).is_none())
            .cloned()
            .collect()
    }
}

fn carries_classes(dependency: &DependencyInfo) -> bool {
    dependency.version != UNKNOWN_VERSION && ARCHIVE_TYPES.contains(&dependency.dep_type.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_fake_jar(repo: &Path, dependency: &DependencyInfo, sources: bool) -> PathBuf {
        let repository = LocalRepository::new(repo);
        let jar = repository.artifact_path(dependency);
        fs::create_dir_all(jar.parent().expect("parent")).expect("create dirs");
        fs::write(&jar, b"jar-bytes").expect("write jar");
        if sources {
            fs::write(repository.sources_path(dependency), b"src").expect("write sources");
        }
        jar
    }

    #[test]
    fn artifact_path_follows_repository_layout() {
        let repository = LocalRepository::new("/repo");
        let dependency = DependencyInfo::new("org.apache.commons", "commons-lang3", "3.12.0");
        assert_eq!(
            repository.artifact_path(&dependency),
            Path::new("/repo/org/apache/commons/commons-lang3/3.12.0/commons-lang3-3.12.0.jar")
        );
        assert_eq!(
            repository.sources_path(&dependency),
            Path::new(
                "/repo/org/apache/commons/commons-lang3/3.12.0/commons-lang3-3.12.0-sources.jar"
            )
        );
    }

    #[test]
    fn hydrate_populates_archive_views_for_visible_scopes() {
        let temp = tempdir().expect("temp dir");
        let repo = temp.path().join("repository");
        let compile = DependencyInfo::new("org.example", "core", "1.0");
        let test = DependencyInfo::new("org.example", "testkit", "1.0").with_scope(Scope::Test);
        let absent = DependencyInfo::new("org.example", "absent", "1.0");
        let compile_jar = write_fake_jar(&repo, &compile, true);
        let test_jar = write_fake_jar(&repo, &test, false);

        let context = ModuleContext::builder(temp.path().join("pom.xml"))
            .group_id("com.example")
            .artifact_id("app")
            .dependencies(vec![compile.clone(), test.clone(), absent.clone()])
            .classpath(vec![temp.path().join("target/classes")])
            .build();

        let repository = LocalRepository::new(&repo);
        let hydrated = repository.hydrate(&context);

        assert_eq!(hydrated.classpath_jars(), [compile_jar.clone()]);
        assert_eq!(hydrated.source_jars().len(), 1);
        assert_eq!(
            hydrated.dependencies()[1].jar_path.as_deref(),
            Some(test_jar.as_path())
        );
        assert!(hydrated.classpath().contains(&compile_jar));
        assert_eq!(hydrated.local_repository(), Some(repo.as_path()));
        assert_eq!(repository.missing_dependencies(&context), vec![absent]);

        let test_context = context.to_builder().scope(Scope::Test).build();
        let hydrated = repository.hydrate(&test_context);
        assert_eq!(hydrated.classpath_jars(), [compile_jar, test_jar]);
        assert!(hydrated
            .classpath()
            .contains(&temp.path().join("target").join("test-classes")));
    }

    #[test]
    fn pom_typed_dependencies_are_not_archives() {
        let repository = LocalRepository::new("/repo");
        let bom = DependencyInfo::new("org.example", "bom", "1.0").with_type("pom");
        assert!(repository.locate(&bom).is_none());
        let context = ModuleContext::builder("/work/pom.xml")
            .dependencies(vec![bom])
            .build();
        assert!(repository.missing_dependencies(&context).is_empty());
    }
}
