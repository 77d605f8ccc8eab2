use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sentinel used when a descriptor does not declare a version.
pub const UNKNOWN_VERSION: &str = "unknown";

pub const DEFAULT_PACKAGING: &str = "jar";
pub const DEFAULT_DEPENDENCY_TYPE: &str = "jar";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown dependency scope '{invalid}'. Available: {choices}", choices = Scope::variants().join(", "))]
pub struct UnknownScope {
    pub invalid: String,
}

/// Maven dependency scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Compile,
    Provided,
    Runtime,
    Test,
    System,
    Import,
}

impl Scope {
    pub const fn as_str(self) -> &'static str {
        match self {
            Scope::Compile => "compile",
            Scope::Provided => "provided",
            Scope::Runtime => "runtime",
            Scope::Test => "test",
            Scope::System => "system",
            Scope::Import => "import",
        }
    }

    pub const fn variants() -> &'static [&'static str] {
        &["compile", "provided", "runtime", "test", "system", "import"]
    }

    /// Lenient conversion used for descriptor and tool output. Absent or
    /// unrecognised values fall back to [`Scope::Compile`].
    pub fn from_maven(value: Option<&str>) -> Self {
        value
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default()
    }

    /// Whether a dependency declared with `self` is visible when a module is
    /// resolved for `requested`.
    pub fn is_visible_in(self, requested: Scope) -> bool {
        match requested {
            Scope::Compile => matches!(self, Scope::Compile | Scope::Provided | Scope::System),
            Scope::Runtime => matches!(self, Scope::Compile | Scope::Runtime),
            Scope::Test => !matches!(self, Scope::Import),
            Scope::Provided => matches!(self, Scope::Compile | Scope::Provided),
            Scope::System => self == Scope::System,
            Scope::Import => self == Scope::Import,
        }
    }
}

impl Default for Scope {
    fn default() -> Self {
        Scope::Compile
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = UnknownScope;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compile" => Ok(Scope::Compile),
            "provided" => Ok(Scope::Provided),
            "runtime" => Ok(Scope::Runtime),
            "test" => Ok(Scope::Test),
            "system" => Ok(Scope::System),
            "import" => Ok(Scope::Import),
            other => Err(UnknownScope {
                invalid: other.to_string(),
            }),
        }
    }
}

/// A single declared or resolved dependency.
///
/// Two dependencies are equal when group, artifact, version, classifier and
/// type match; scope, optionality and resolved paths are not part of identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyInfo {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier: Option<String>,
    #[serde(rename = "type")]
    pub dep_type: String,
    pub scope: Scope,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jar_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_path: Option<String>,
}

impl DependencyInfo {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        let version = version.into();
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: if version.trim().is_empty() {
                UNKNOWN_VERSION.to_string()
            } else {
                version
            },
            classifier: None,
            dep_type: DEFAULT_DEPENDENCY_TYPE.to_string(),
            scope: Scope::Compile,
            optional: false,
            jar_path: None,
            system_path: None,
        }
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        let classifier = classifier.into();
        self.classifier = if classifier.trim().is_empty() {
            None
        } else {
            Some(classifier)
        };
        self
    }

    pub fn with_type(mut self, dep_type: impl Into<String>) -> Self {
        let dep_type = dep_type.into();
        if !dep_type.trim().is_empty() {
            self.dep_type = dep_type;
        }
        self
    }

    pub fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn with_jar_path(mut self, jar_path: impl Into<PathBuf>) -> Self {
        self.jar_path = Some(jar_path.into());
        self
    }

    pub fn with_system_path(mut self, system_path: impl Into<String>) -> Self {
        self.system_path = Some(system_path.into());
        self
    }

    /// `group:artifact[:classifier]:type:version`
    pub fn coordinates(&self) -> String {
        match &self.classifier {
            Some(classifier) => format!(
                "{}:{}:{}:{}:{}",
                self.group_id, self.artifact_id, classifier, self.dep_type, self.version
            ),
            None => format!(
                "{}:{}:{}:{}",
                self.group_id, self.artifact_id, self.dep_type, self.version
            ),
        }
    }

    /// Maven repository layout path of the group, e.g. `org/slf4j`.
    pub fn group_path(&self) -> PathBuf {
        self.group_id.split('.').collect()
    }

    /// `<artifact>-<version>[-<classifier>].<type>`
    pub fn archive_file_name(&self) -> String {
        let extension = match self.dep_type.as_str() {
            "" | "bundle" | "maven-plugin" | "ejb" | "test-jar" => "jar",
            other => other,
        };
        match &self.classifier {
            Some(classifier) => format!(
                "{}-{}-{}.{}",
                self.artifact_id, self.version, classifier, extension
            ),
            None => format!("{}-{}.{}", self.artifact_id, self.version, extension),
        }
    }

    pub fn sources_file_name(&self) -> String {
        format!("{}-{}-sources.jar", self.artifact_id, self.version)
    }

    fn identity(&self) -> (&str, &str, &str, Option<&str>, &str) {
        (
            &self.group_id,
            &self.artifact_id,
            &self.version,
            self.classifier.as_deref(),
            &self.dep_type,
        )
    }
}

impl PartialEq for DependencyInfo {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for DependencyInfo {}

impl Hash for DependencyInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Display for DependencyInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.coordinates(), self.scope)
    }
}

/// Normalized, immutable view of a resolved module.
///
/// Instances are created through [`ModuleContextBuilder`]; re-resolving a
/// descriptor yields a new value rather than mutating an existing one.
/// Equality and hashing consider the descriptor path only.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleContext {
    pom_file: PathBuf,
    base_directory: PathBuf,
    project_root: PathBuf,
    group_id: String,
    artifact_id: String,
    version: String,
    packaging: String,
    local_repository: Option<PathBuf>,
    scope: Scope,
    active_profiles: Vec<String>,
    modules: Vec<String>,
    dependencies: Vec<DependencyInfo>,
    classpath: Vec<PathBuf>,
    classpath_jars: Vec<PathBuf>,
    source_jars: Vec<PathBuf>,
    output_directory: PathBuf,
    test_output_directory: PathBuf,
}

impl ModuleContext {
    pub fn builder(pom_file: impl Into<PathBuf>) -> ModuleContextBuilder {
        ModuleContextBuilder::new(pom_file)
    }

    /// Starts a builder pre-populated with this context's values.
    pub fn to_builder(&self) -> ModuleContextBuilder {
        ModuleContextBuilder {
            pom_file: self.pom_file.clone(),
            base_directory: Some(self.base_directory.clone()),
            project_root: Some(self.project_root.clone()),
            group_id: self.group_id.clone(),
            artifact_id: self.artifact_id.clone(),
            version: Some(self.version.clone()),
            packaging: Some(self.packaging.clone()),
            local_repository: self.local_repository.clone(),
            scope: self.scope,
            active_profiles: self.active_profiles.clone(),
            modules: self.modules.clone(),
            dependencies: self.dependencies.clone(),
            classpath: self.classpath.clone(),
            classpath_jars: self.classpath_jars.clone(),
            source_jars: self.source_jars.clone(),
            output_directory: Some(self.output_directory.clone()),
            test_output_directory: Some(self.test_output_directory.clone()),
        }
    }

    pub fn pom_file(&self) -> &Path {
        &self.pom_file
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn packaging(&self) -> &str {
        &self.packaging
    }

    pub fn local_repository(&self) -> Option<&Path> {
        self.local_repository.as_deref()
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn active_profiles(&self) -> &[String] {
        &self.active_profiles
    }

    /// Child module directories listed by an aggregator descriptor.
    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    pub fn dependencies(&self) -> &[DependencyInfo] {
        &self.dependencies
    }

    pub fn classpath(&self) -> &[PathBuf] {
        &self.classpath
    }

    pub fn classpath_jars(&self) -> &[PathBuf] {
        &self.classpath_jars
    }

    pub fn source_jars(&self) -> &[PathBuf] {
        &self.source_jars
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    pub fn test_output_directory(&self) -> &Path {
        &self.test_output_directory
    }

    /// `group:artifact:version`
    pub fn coordinates(&self) -> String {
        format!("{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }

    pub fn dependencies_by_scope(&self, scope: Scope) -> Vec<&DependencyInfo> {
        self.dependencies
            .iter()
            .filter(|dependency| dependency.scope == scope)
            .collect()
    }
}

impl PartialEq for ModuleContext {
    fn eq(&self, other: &Self) -> bool {
        self.pom_file == other.pom_file
    }
}

impl Eq for ModuleContext {}

impl Hash for ModuleContext {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.pom_file.hash(state);
    }
}

#[derive(Debug, Clone)]
pub struct ModuleContextBuilder {
    pom_file: PathBuf,
    base_directory: Option<PathBuf>,
    project_root: Option<PathBuf>,
    group_id: String,
    artifact_id: String,
    version: Option<String>,
    packaging: Option<String>,
    local_repository: Option<PathBuf>,
    scope: Scope,
    active_profiles: Vec<String>,
    modules: Vec<String>,
    dependencies: Vec<DependencyInfo>,
    classpath: Vec<PathBuf>,
    classpath_jars: Vec<PathBuf>,
    source_jars: Vec<PathBuf>,
    output_directory: Option<PathBuf>,
    test_output_directory: Option<PathBuf>,
}

impl ModuleContextBuilder {
    pub fn new(pom_file: impl Into<PathBuf>) -> Self {
        Self {
            pom_file: pom_file.into(),
            base_directory: None,
            project_root: None,
            group_id: String::new(),
            artifact_id: String::new(),
            version: None,
            packaging: None,
            local_repository: None,
            scope: Scope::Compile,
            active_profiles: Vec::new(),
            modules: Vec::new(),
            dependencies: Vec::new(),
            classpath: Vec::new(),
            classpath_jars: Vec::new(),
            source_jars: Vec::new(),
            output_directory: None,
            test_output_directory: None,
        }
    }

    pub fn base_directory(mut self, base_directory: impl Into<PathBuf>) -> Self {
        self.base_directory = Some(base_directory.into());
        self
    }

    pub fn project_root(mut self, project_root: impl Into<PathBuf>) -> Self {
        self.project_root = Some(project_root.into());
        self
    }

    pub fn group_id(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = group_id.into();
        self
    }

    pub fn artifact_id(mut self, artifact_id: impl Into<String>) -> Self {
        self.artifact_id = artifact_id.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn packaging(mut self, packaging: impl Into<String>) -> Self {
        self.packaging = Some(packaging.into());
        self
    }

    pub fn local_repository(mut self, local_repository: Option<PathBuf>) -> Self {
        self.local_repository = local_repository;
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn active_profiles<I, S>(mut self, profiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.active_profiles = profiles.into_iter().map(Into::into).collect();
        self
    }

    pub fn modules<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.modules = modules.into_iter().map(Into::into).collect();
        self
    }

    pub fn dependencies(mut self, dependencies: Vec<DependencyInfo>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn classpath(mut self, classpath: Vec<PathBuf>) -> Self {
        self.classpath = classpath;
        self
    }

    pub fn classpath_jars(mut self, classpath_jars: Vec<PathBuf>) -> Self {
        self.classpath_jars = classpath_jars;
        self
    }

    pub fn source_jars(mut self, source_jars: Vec<PathBuf>) -> Self {
        self.source_jars = source_jars;
        self
    }

    pub fn output_directory(mut self, output_directory: impl Into<PathBuf>) -> Self {
        self.output_directory = Some(output_directory.into());
        self
    }

    pub fn test_output_directory(mut self, test_output_directory: impl Into<PathBuf>) -> Self {
        self.test_output_directory = Some(test_output_directory.into());
        self
    }

    pub fn build(self) -> ModuleContext {
        let base_directory = self
            .base_directory
            .or_else(|| self.pom_file.parent().map(Path::to_path_buf))
            .unwrap_or_default();
        let project_root = self
            .project_root
            .unwrap_or_else(|| base_directory.clone());
        let output_directory = self
            .output_directory
            .unwrap_or_else(|| base_directory.join("target").join("classes"));
        let test_output_directory = self
            .test_output_directory
            .unwrap_or_else(|| base_directory.join("target").join("test-classes"));

        ModuleContext {
            pom_file: self.pom_file,
            base_directory,
            project_root,
            group_id: self.group_id,
            artifact_id: self.artifact_id,
            version: self
                .version
                .filter(|version| !version.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_VERSION.to_string()),
            packaging: self
                .packaging
                .filter(|packaging| !packaging.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_PACKAGING.to_string()),
            local_repository: self.local_repository,
            scope: self.scope,
            active_profiles: self.active_profiles,
            modules: self.modules,
            dependencies: self.dependencies,
            classpath: self.classpath,
            classpath_jars: self.classpath_jars,
            source_jars: self.source_jars,
            output_directory,
            test_output_directory,
        }
    }
}
