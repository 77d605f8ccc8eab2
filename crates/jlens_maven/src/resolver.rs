use std::fmt;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::MavenConfig;
use crate::descriptor::DescriptorResolver;
use crate::error::ResolveError;
use crate::external::ExternalToolResolver;
use crate::model::{ModuleContext, Scope};

/// Capability shared by every module resolution strategy.
#[async_trait]
pub trait ModuleResolver: Send + Sync {
    /// Stable strategy name used in logs and diagnostics.
    fn name(&self) -> &'static str;

    async fn is_available(&self) -> bool;

    async fn resolve(
        &self,
        pom_file: &Path,
        scope: Scope,
        profiles: &[String],
    ) -> Result<ModuleContext, ResolveError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolverKind {
    Descriptor,
    ExternalTool,
}

impl fmt::Display for ResolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolverKind::Descriptor => f.write_str("descriptor"),
            ResolverKind::ExternalTool => f.write_str("external_tool"),
        }
    }
}

/// Picks a resolution strategy from configuration. Selection is recomputed
/// on every call.
#[derive(Debug, Clone, Default)]
pub struct ResolverFactory {
    config: MavenConfig,
}

impl ResolverFactory {
    pub fn new(config: MavenConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MavenConfig {
        &self.config
    }

    pub fn selected_kind(&self) -> ResolverKind {
        if self.config.executable.is_some() {
            ResolverKind::ExternalTool
        } else {
            ResolverKind::Descriptor
        }
    }

    pub fn create_resolver(&self) -> Arc<dyn ModuleResolver> {
        match self.selected_kind() {
            ResolverKind::ExternalTool => {
                tracing::debug!(
                    executable = ?self.config.executable,
                    "selected external tool resolver"
                );
                Arc::new(ExternalToolResolver::new(self.config.clone()))
            }
            ResolverKind::Descriptor => self.create_direct_resolver(),
        }
    }

    /// The descriptor parser, used directly or as a caller-chosen fallback.
    pub fn create_direct_resolver(&self) -> Arc<dyn ModuleResolver> {
        Arc::new(
            DescriptorResolver::new()
                .with_local_repository(self.config.effective_local_repository()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::DIRECT_RESOLVER_NAME;
    use crate::external::INVOKER_RESOLVER_NAME;

    #[test]
    fn selects_descriptor_without_executable() {
        let factory = ResolverFactory::new(MavenConfig::default());
        assert_eq!(factory.selected_kind(), ResolverKind::Descriptor);
        assert_eq!(factory.create_resolver().name(), DIRECT_RESOLVER_NAME);
    }

    #[test]
    fn selects_external_tool_when_executable_configured() {
        let factory = ResolverFactory::new(MavenConfig::default().with_executable("/opt/mvn"));
        assert_eq!(factory.selected_kind(), ResolverKind::ExternalTool);
        assert_eq!(factory.create_resolver().name(), INVOKER_RESOLVER_NAME);
        assert_eq!(factory.create_direct_resolver().name(), DIRECT_RESOLVER_NAME);
    }

    #[tokio::test]
    async fn configured_executable_must_exist_to_be_available() {
        let factory = ResolverFactory::new(
            MavenConfig::default().with_executable("/nonexistent/jlens/mvn"),
        );
        assert!(!factory.create_resolver().is_available().await);
        assert!(factory.create_direct_resolver().is_available().await);
    }
}
