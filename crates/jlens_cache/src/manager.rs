use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use jlens_maven::ModuleContext;

use crate::bounded::{BoundedCache, CacheStatsSnapshot};
use crate::config::CacheConfig;

/// Key of the class metadata cache.
///
/// Renders as `gav:<group>:<artifact>:<version>:<class>` when the owning
/// module is known, otherwise `cp:<classpath-key>:<class>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClassMetadataKey {
    Gav {
        group_id: String,
        artifact_id: String,
        version: String,
        class_name: String,
    },
    Classpath {
        classpath_key: String,
        class_name: String,
    },
}

impl ClassMetadataKey {
    pub fn gav(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
        class_name: impl Into<String>,
    ) -> Self {
        ClassMetadataKey::Gav {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
            class_name: class_name.into(),
        }
    }

    pub fn classpath(classpath_key: impl Into<String>, class_name: impl Into<String>) -> Self {
        ClassMetadataKey::Classpath {
            classpath_key: classpath_key.into(),
            class_name: class_name.into(),
        }
    }

    pub fn for_module(context: &ModuleContext, class_name: impl Into<String>) -> Self {
        Self::gav(
            context.group_id(),
            context.artifact_id(),
            context.version(),
            class_name,
        )
    }

    pub fn class_name(&self) -> &str {
        match self {
            ClassMetadataKey::Gav { class_name, .. }
            | ClassMetadataKey::Classpath { class_name, .. } => class_name,
        }
    }
}

impl fmt::Display for ClassMetadataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassMetadataKey::Gav {
                group_id,
                artifact_id,
                version,
                class_name,
            } => write!(f, "gav:{group_id}:{artifact_id}:{version}:{class_name}"),
            ClassMetadataKey::Classpath {
                classpath_key,
                class_name,
            } => write!(f, "cp:{classpath_key}:{class_name}"),
        }
    }
}

/// Owns the process-wide caches. Nothing here watches the file system;
/// callers invalidate explicitly.
#[derive(Debug)]
pub struct CacheManager<M> {
    modules: BoundedCache<PathBuf, Arc<ModuleContext>>,
    class_metadata: BoundedCache<ClassMetadataKey, M>,
    decompiled: BoundedCache<String, String>,
}

impl<M: Clone> CacheManager<M> {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            modules: BoundedCache::from_settings("modules", &config.modules),
            class_metadata: BoundedCache::from_settings("class_metadata", &config.class_metadata),
            decompiled: BoundedCache::from_settings("decompiler", &config.decompiler),
        }
    }

    /// Module contexts keyed by descriptor path.
    pub fn modules(&self) -> &BoundedCache<PathBuf, Arc<ModuleContext>> {
        &self.modules
    }

    pub fn class_metadata(&self) -> &BoundedCache<ClassMetadataKey, M> {
        &self.class_metadata
    }

    /// Decompiled sources keyed by class name. Nothing in this workspace
    /// fills it.
    pub fn decompiled(&self) -> &BoundedCache<String, String> {
        &self.decompiled
    }

    pub fn invalidate_all(&self) {
        self.modules.invalidate_all();
        self.class_metadata.invalidate_all();
        self.decompiled.invalidate_all();
    }

    pub fn cleanup(&self) -> usize {
        self.modules.cleanup() + self.class_metadata.cleanup() + self.decompiled.cleanup()
    }

    pub fn stats(&self) -> Vec<(&'static str, CacheStatsSnapshot)> {
        vec![
            (self.modules.name(), self.modules.stats()),
            (self.class_metadata.name(), self.class_metadata.stats()),
            (self.decompiled.name(), self.decompiled.stats()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheSettings;

    #[test]
    fn keys_render_like_their_scheme() {
        let gav = ClassMetadataKey::gav("org.slf4j", "slf4j-api", "2.0.9", "org.slf4j.Logger");
        assert_eq!(gav.to_string(), "gav:org.slf4j:slf4j-api:2.0.9:org.slf4j.Logger");
        let cp = ClassMetadataKey::classpath("default", "java.util.List");
        assert_eq!(cp.to_string(), "cp:default:java.util.List");
        assert_eq!(cp.class_name(), "java.util.List");
    }

    #[test]
    fn module_key_uses_context_coordinates() {
        let context = ModuleContext::builder("/work/app/pom.xml")
            .group_id("com.example")
            .artifact_id("app")
            .version("1.2.3")
            .build();
        let key = ClassMetadataKey::for_module(&context, "com.example.Main");
        assert_eq!(key.to_string(), "gav:com.example:app:1.2.3:com.example.Main");
    }

    #[tokio::test]
    async fn caches_are_configured_independently() {
        let config = CacheConfig {
            modules: CacheSettings::new(1, 60),
            class_metadata: CacheSettings::new(5, 60),
            decompiler: CacheSettings::default(),
        };
        let manager: CacheManager<String> = CacheManager::new(&config);
        assert_eq!(manager.modules().max_entries(), 1);
        assert_eq!(manager.class_metadata().max_entries(), 5);

        let key = ClassMetadataKey::classpath("cp", "a.B");
        let value = manager
            .class_metadata()
            .get_with(key.clone(), async { "meta".to_string() })
            .await;
        assert_eq!(value, "meta");
        assert_eq!(manager.class_metadata().len(), 1);

        manager.invalidate_all();
        assert!(manager.class_metadata().get_if_present(&key).is_none());
        assert_eq!(manager.stats().len(), 3);
    }
}
