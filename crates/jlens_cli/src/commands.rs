use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use jlens_cache::{CacheManager, ClassMetadataKey};
use jlens_index::{
    resolve_class_name, ClassIndex, ClasspathIndexer, IndexSummary, ResolutionResult,
    SourceContext,
};
use jlens_maven::{
    find_descriptor, DependencyInfo, LocalRepository, ModuleContext, ModuleResolver,
    ResolverFactory, DESCRIPTOR_FILE_NAME,
};
use serde::Serialize;

use crate::config::JlensConfig;
use crate::render;
use crate::{Commands, ModuleArgs};

pub(crate) async fn run(command: Commands, config: JlensConfig, working_dir: PathBuf) -> Result<()> {
    let session = Session::new(config, working_dir);

    match command {
        Commands::Module { module, json } => {
            let context = session.resolve(&module).await?;
            if json {
                return print_json(&*context);
            }
            println!("{}", render::module_details(&context));
        }
        Commands::Deps {
            module,
            only,
            missing,
            json,
        } => {
            let context = session.resolve(&module).await?;
            let mut dependencies: Vec<DependencyInfo> = if missing {
                let repository = session
                    .local_repository()
                    .ok_or_else(|| anyhow!("no local repository configured"))?;
                repository.missing_dependencies(&context)
            } else {
                context.dependencies().to_vec()
            };
            if let Some(scope) = only {
                dependencies.retain(|dependency| dependency.scope == scope);
            }
            if json {
                return print_json(&dependencies);
            }
            print!("{}", render::dependency_table(&dependencies));
        }
        Commands::Index { module, json } => {
            let context = session.resolve(&module).await?;
            let (index, summary) = session.build_index(&context).await;
            if json {
                return print_json(&IndexReport::new(&context, &index, summary));
            }
            print!("{}", render::index_summary(&context, &index, &summary));
        }
        Commands::Search {
            module,
            pattern,
            search_type,
            limit,
            json,
        } => {
            let context = session.resolve(&module).await?;
            let (index, _) = session.build_index(&context).await;
            let hits = index.search(&pattern, search_type, limit)?;
            if json {
                return print_json(&hits);
            }
            if hits.is_empty() {
                println!("No classes match '{pattern}' ({search_type}).");
            } else {
                print!("{}", render::search_table(&hits));
            }
        }
        Commands::ResolveClass {
            module,
            names,
            mut imports,
            mut package,
            source,
            json,
        } => {
            if let Some(source) = source {
                let path = session.absolute(&source);
                let scanned = SourceContext::read(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                imports.extend(scanned.imports);
                if package.is_none() {
                    package = scanned.package;
                }
            }

            let context = session.resolve(&module).await?;
            let (index, _) = session.build_index(&context).await;
            let mut results = Vec::with_capacity(names.len());
            for name in &names {
                let key = ClassMetadataKey::for_module(&context, name.as_str());
                let result = session
                    .cache
                    .class_metadata()
                    .get_with(key, async {
                        resolve_class_name(name, &imports, package.as_deref(), &index)
                    })
                    .await;
                results.push(result);
            }
            if json {
                return print_json(&results);
            }
            print!("{}", render::resolutions(&results));
        }
    }
    Ok(())
}

/// State shared by the steps of one command.
struct Session {
    config: JlensConfig,
    working_dir: PathBuf,
    cache: CacheManager<ResolutionResult>,
}

impl Session {
    fn new(config: JlensConfig, working_dir: PathBuf) -> Self {
        let cache = CacheManager::new(&config.cache);
        Self {
            config,
            working_dir,
            cache,
        }
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }

    fn local_repository(&self) -> Option<LocalRepository> {
        LocalRepository::from_config(&self.config.maven)
    }

    fn descriptor_path(&self, args: &ModuleArgs) -> Result<PathBuf> {
        match &args.pom {
            Some(pom) => {
                let pom = self.absolute(pom);
                Ok(if pom.is_dir() {
                    pom.join(DESCRIPTOR_FILE_NAME)
                } else {
                    pom
                })
            }
            None => find_descriptor(&self.working_dir).ok_or_else(|| {
                anyhow!(
                    "no {DESCRIPTOR_FILE_NAME} found in {} or its parents",
                    self.working_dir.display()
                )
            }),
        }
    }

    async fn resolve(&self, args: &ModuleArgs) -> Result<Arc<ModuleContext>> {
        let pom = self.descriptor_path(args)?;
        self.cache
            .modules()
            .try_get_with(pom.clone(), self.load_module(&pom, args))
            .await
    }

    async fn load_module(&self, pom: &Path, args: &ModuleArgs) -> Result<Arc<ModuleContext>> {
        let factory = ResolverFactory::new(self.config.maven.clone());
        let resolver = if args.direct {
            factory.create_direct_resolver()
        } else {
            factory.create_resolver()
        };

        let context = match resolver.resolve(pom, args.scope, &args.profiles).await {
            Ok(context) => context,
            Err(error) if error.is_tool_failure() => {
                tracing::warn!(
                    resolver = resolver.name(),
                    error = %error,
                    "external resolution failed, reading the descriptor directly"
                );
                factory
                    .create_direct_resolver()
                    .resolve(pom, args.scope, &args.profiles)
                    .await
                    .with_context(|| format!("failed to resolve {}", pom.display()))?
            }
            Err(error) => {
                return Err(error).with_context(|| format!("failed to resolve {}", pom.display()))
            }
        };
        tracing::info!(
            resolver = resolver.name(),
            module = %context.coordinates(),
            dependencies = context.dependencies().len(),
            "module resolved"
        );

        let context = match self.local_repository() {
            Some(repository) => repository.hydrate(&context),
            None => context,
        };
        Ok(Arc::new(context))
    }

    async fn build_index(&self, context: &ModuleContext) -> (Arc<ClassIndex>, IndexSummary) {
        let indexer = ClasspathIndexer::new(Arc::new(ClassIndex::new()))
            .with_max_concurrent_archives(self.config.index.max_concurrent_archives);
        let summary = indexer.build_index(context).await;
        if summary.entries == 0 {
            tracing::warn!(
                module = %context.coordinates(),
                "class index is empty; are the dependency archives downloaded?"
            );
        }
        (Arc::clone(indexer.index()), summary)
    }
}

#[derive(Debug, Serialize)]
struct IndexReport {
    module: String,
    simple_names: usize,
    classes: usize,
    owned_packages: usize,
    #[serde(flatten)]
    summary: IndexSummary,
}

impl IndexReport {
    fn new(context: &ModuleContext, index: &ClassIndex, summary: IndexSummary) -> Self {
        Self {
            module: context.coordinates(),
            simple_names: index.simple_name_count(),
            classes: index.class_count(),
            owned_packages: index.package_owner_count(),
            summary,
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{payload}");
    Ok(())
}
