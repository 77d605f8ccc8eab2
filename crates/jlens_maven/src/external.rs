//! Resolution by delegating to `mvn dependency:list`.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::process::Command;

use crate::config::MavenConfig;
use crate::descriptor::{base_directory_of, scan_identity};
use crate::error::ResolveError;
use crate::model::{DependencyInfo, ModuleContext, Scope, UNKNOWN_VERSION};
use crate::resolver::ModuleResolver;

pub const INVOKER_RESOLVER_NAME: &str = "InvokerResolver";

const DEFAULT_EXECUTABLE: &str = "mvn";
const AVAILABILITY_TIMEOUT: Duration = Duration::from_secs(10);
const FAILURE_TAIL_LINES: usize = 20;

/// Raw result of a `dependency:list` run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyListReport {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub dependencies: Vec<DependencyInfo>,
}

#[derive(Debug, Clone)]
pub struct ExternalToolResolver {
    config: MavenConfig,
}

impl ExternalToolResolver {
    pub fn new(config: MavenConfig) -> Self {
        Self { config }
    }

    pub fn executable(&self) -> PathBuf {
        self.config
            .executable
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_EXECUTABLE))
    }

    /// Arguments passed to the build tool for one resolution.
    pub fn command_args(&self, scope: Scope, profiles: &[String]) -> Vec<String> {
        let mut args = vec![
            "dependency:list".to_string(),
            format!("-DincludeScope={}", scope.as_str()),
            // Batch mode keeps the output free of progress bars.
            "-B".to_string(),
        ];
        if !profiles.is_empty() {
            args.push(format!("-P{}", profiles.join(",")));
        }
        if let Some(settings) = &self.config.settings_file {
            args.push("-s".to_string());
            args.push(settings.display().to_string());
        }
        if let Some(repository) = &self.config.local_repository {
            args.push(format!("-Dmaven.repo.local={}", repository.display()));
        }
        if self.config.offline {
            args.push("-o".to_string());
        }
        if self.config.update_snapshots {
            args.push("-U".to_string());
        }
        if self.config.fail_fast {
            args.push("-ff".to_string());
        }
        args
    }

    async fn run(&self, pom_file: &Path, args: &[String]) -> Result<String, ResolveError> {
        let executable = self.executable();
        let working_dir = base_directory_of(pom_file);
        let started = Instant::now();

        let mut command = Command::new(&executable);
        command
            .args(args)
            .current_dir(&working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(
            executable = %executable.display(),
            args = ?args,
            cwd = %working_dir.display(),
            "invoking build tool"
        );

        // `output()` drains both pipes while waiting, so a chatty build cannot
        // block on a full pipe. Dropping the future on timeout kills the child.
        let output = match tokio::time::timeout(self.config.timeout(), command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(error)) if error.kind() == io::ErrorKind::NotFound => {
                return Err(ResolveError::ExternalToolFailure {
                    path: pom_file.to_path_buf(),
                    reason: format!("executable not found: {}", executable.display()),
                });
            }
            Ok(Err(error)) => {
                return Err(ResolveError::ExternalToolFailure {
                    path: pom_file.to_path_buf(),
                    reason: format!("failed to start {}: {error}", executable.display()),
                });
            }
            Err(_) => {
                tracing::warn!(
                    path = %pom_file.display(),
                    seconds = self.config.timeout_seconds,
                    "build tool timed out, process killed"
                );
                return Err(ResolveError::Timeout {
                    path: pom_file.to_path_buf(),
                    seconds: self.config.timeout_seconds,
                });
            }
        };

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        tracing::debug!(
            status = ?output.status.code(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "build tool finished"
        );

        if !output.status.success() {
            let code = output
                .status
                .code()
                .map(|code| code.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(ResolveError::ExternalToolFailure {
                path: pom_file.to_path_buf(),
                reason: format!("exit status {code}\n{}", output_tail(&combined)),
            });
        }

        Ok(combined)
    }
}

#[async_trait]
impl ModuleResolver for ExternalToolResolver {
    fn name(&self) -> &'static str {
        INVOKER_RESOLVER_NAME
    }

    async fn is_available(&self) -> bool {
        if let Some(executable) = &self.config.executable {
            return tokio::fs::try_exists(executable).await.unwrap_or(false);
        }

        let probe = Command::new(DEFAULT_EXECUTABLE)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();
        matches!(
            tokio::time::timeout(AVAILABILITY_TIMEOUT, probe).await,
            Ok(Ok(status)) if status.success()
        )
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

        let args = self.command_args(scope, profiles);
        let output = self.run(pom_file, &args).await?;
        let mut report = parse_dependency_list(&output);

        if report.group_id.is_none() || report.artifact_id.is_none() || report.version.is_none() {
            let text = tokio::fs::read_to_string(pom_file)
                .await
                .map_err(|source| ResolveError::io(pom_file, source))?;
            let identity = scan_identity(&text);
            report.group_id = report.group_id.or(identity.group_id);
            report.artifact_id = report.artifact_id.or(identity.artifact_id);
            report.version = report.version.or(identity.version);
        }

        let base_directory = base_directory_of(pom_file);
        let output_directory = base_directory.join("target").join("classes");
        let test_output_directory = base_directory.join("target").join("test-classes");

        Ok(ModuleContext::builder(pom_file)
            .base_directory(&base_directory)
            .group_id(report.group_id.unwrap_or_else(|| UNKNOWN_VERSION.to_string()))
            .artifact_id(report.artifact_id.unwrap_or_else(|| UNKNOWN_VERSION.to_string()))
            .version(report.version.unwrap_or_else(|| UNKNOWN_VERSION.to_string()))
            .local_repository(self.config.effective_local_repository())
            .scope(scope)
            .active_profiles(profiles.iter().cloned())
            .dependencies(report.dependencies)
            .classpath(vec![output_directory.clone()])
            .output_directory(output_directory)
            .test_output_directory(test_output_directory)
            .build())
    }
}

static ANSI_ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").expect("ansi regex"));
static INFO_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[INFO\]\s+(\S+)(.*)$").expect("info token regex"));
static COORDINATE_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-+]+$").expect("coordinate field regex"));
static MODULE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[INFO\]\s+-*<\s*([^\s:<>]+):([^\s:<>]+)\s*>-*\s*$").expect("module marker regex")
});
static BUILDING_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[INFO\]\s+Building\s+(.+?)\s+(\S+?)(?:\s+\[\d+/\d+\])?\s*$")
        .expect("building marker regex")
});
static GOAL_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[INFO\]\s+---\s+.*\s@\s+(\S+)\s+---\s*$").expect("goal marker regex")
});

/// Parses `mvn dependency:list` console output.
///
/// Dependency records are `group:artifact:type:version:scope` or, with a
/// classifier, `group:artifact:type:classifier:version:scope`. The first
/// module marker seen supplies the identity fields.
pub fn parse_dependency_list(output: &str) -> DependencyListReport {
    let mut report = DependencyListReport::default();

    for raw_line in output.lines() {
        let line = ANSI_ESCAPE.replace_all(raw_line, "");
        let line = line.trim_end();

        if let Some(captures) = MODULE_MARKER.captures(line) {
            if report.group_id.is_none() {
                report.group_id = Some(captures[1].to_string());
                report.artifact_id = Some(captures[2].to_string());
            }
            continue;
        }

        if let Some(captures) = BUILDING_MARKER.captures(line) {
            if !captures[1].ends_with(':') && report.version.is_none() {
                report.version = Some(captures[2].to_string());
            }
            continue;
        }

        if let Some(captures) = GOAL_MARKER.captures(line) {
            if report.artifact_id.is_none() {
                report.artifact_id = Some(captures[1].to_string());
            }
            continue;
        }

        if let Some(dependency) = parse_dependency_line(line) {
            report.dependencies.push(dependency);
        }
    }

    report
}

fn parse_dependency_line(line: &str) -> Option<DependencyInfo> {
    let captures = INFO_TOKEN.captures(line)?;
    let fields: Vec<&str> = captures[1].split(':').collect();
    if !fields.iter().all(|field| COORDINATE_FIELD.is_match(field)) {
        return None;
    }

    let (group, artifact, dep_type, classifier, version, scope) = match fields.as_slice() {
        [group, artifact, dep_type, version, scope] => {
            (*group, *artifact, *dep_type, None, *version, *scope)
        }
        [group, artifact, dep_type, classifier, version, scope] => {
            (*group, *artifact, *dep_type, Some(*classifier), *version, *scope)
        }
        _ => return None,
    };
    let scope: Scope = scope.parse().ok()?;
    let optional = captures[2].contains("(optional)");

    let mut dependency = DependencyInfo::new(group, artifact, version)
        .with_type(dep_type)
        .with_scope(scope)
        .with_optional(optional);
    if let Some(classifier) = classifier {
        dependency = dependency.with_classifier(classifier);
    }
    Some(dependency)
}

fn output_tail(output: &str) -> String {
    let lines: Vec<&str> = output.lines().collect();
    let start = lines.len().saturating_sub(FAILURE_TAIL_LINES);
    lines[start..].join("\n")
}
