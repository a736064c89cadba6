// depres-core/src/resolver.rs
// Concurrent transitive resolution of a root dependency.
//
// Every node is handled by its own task. A node first loads its scope: the POM
// is located (strict repository order, cache first), parsed, and its parent
// chain is loaded before anything else so that inherited properties and
// managed versions are known. Children are then spawned into a JoinSet and
// joined, so the root's task returns only after the whole graph is settled.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_recursion::async_recursion;
use depres_common::cache::Cache;
use depres_common::config::Config;
use depres_common::error::Result;
use depres_common::model::dependency::{DEFAULT_SCOPE, DEFAULT_TYPE};
use depres_common::model::{Coordinate, Dependency, ProjectProperty, Repository, RepositoryList};
use depres_common::pipeline::{PipelineEvent, ResolveOutcome};
use depres_net::http::FetchMiss;
use reqwest::Client;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

use crate::events::EventSink;
use crate::join_error_message;
use crate::metadata::MetadataFetcher;
use crate::pom::{PomDocument, RawDependency};
use crate::registry::{Claim, NodeRole, ResolutionRegistry};
use crate::version::{substitute_properties, VersionResolver};

/// Everything known about a located and parsed POM.
#[derive(Debug)]
pub struct NodeScope {
    /// The node with a concrete version, its packaging and serving repository.
    pub dependency: Dependency,
    pub repository: Repository,
    pub pom_url: String,
    /// Own properties (declared, then implicit) followed by the parent chain's.
    pub properties: Vec<ProjectProperty>,
    /// The node followed by its parent chain, nearest first.
    pub lineage: Vec<Dependency>,
    pub parent: Option<Dependency>,
    pub declared: Vec<RawDependency>,
}

enum ScopeLookup {
    Found(Arc<NodeScope>),
    Missing(FetchMiss),
}

struct Located {
    dependency: Dependency,
    repository: Repository,
    url: String,
    /// `None` for denylisted nodes, which are never fetched.
    pom: Option<PathBuf>,
}

/// Collaborators shared by every run of one resolver.
struct Shared {
    fetcher: Arc<MetadataFetcher>,
    versions: VersionResolver,
    config: Config,
    events: EventSink,
}

/// State of a single resolution run. Independent runs never share one.
struct ResolutionContext {
    shared: Arc<Shared>,
    registry: ResolutionRegistry,
    scopes: Mutex<HashMap<Dependency, Arc<NodeScope>>>,
    done: AtomicBool,
}

impl ResolutionContext {
    fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            registry: ResolutionRegistry::new(),
            scopes: Mutex::new(HashMap::new()),
            done: AtomicBool::new(false),
        }
    }

    fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Marks the run complete. Anything still running becomes a no-op.
    fn finish(&self) {
        self.done.store(true, Ordering::Release);
        self.registry.close();
    }

    fn emit(&self, event: PipelineEvent) {
        if !self.is_done() {
            self.shared.events.send(event);
        }
    }

    fn cached_scope(&self, dependency: &Dependency) -> Option<Arc<NodeScope>> {
        self.scopes
            .lock()
            .ok()
            .and_then(|scopes| scopes.get(dependency).cloned())
    }

    fn remember_scope(&self, requested: &Dependency, scope: &Arc<NodeScope>) {
        if let Ok(mut scopes) = self.scopes.lock() {
            scopes.insert(requested.clone(), scope.clone());
            scopes.insert(scope.dependency.clone(), scope.clone());
        }
    }
}

/// Resolves the transitive dependency graph of a root artifact.
pub struct GraphResolver {
    shared: Arc<Shared>,
}

impl GraphResolver {
    pub fn new(
        config: &Config,
        client: Client,
        repositories: RepositoryList,
        events: EventSink,
    ) -> Result<Self> {
        let cache = Cache::new(config)?;
        let io_permits = Arc::new(Semaphore::new(config.max_concurrency.max(1)));
        let fetcher = Arc::new(MetadataFetcher::new(
            client,
            cache,
            repositories,
            config.metadata_ttl,
            io_permits,
            events.clone(),
        ));
        let versions = VersionResolver::new(fetcher.clone(), config.range_policy);
        Ok(Self {
            shared: Arc::new(Shared {
                fetcher,
                versions,
                config: config.clone(),
                events,
            }),
        })
    }

    pub fn repositories(&self) -> &RepositoryList {
        self.shared.fetcher.repositories()
    }

    /// Resolves `root` and everything it transitively needs.
    ///
    /// Returns once every node task has finished. When the root POM is not in
    /// any repository the outcome is not found and lists every URL tried.
    #[instrument(skip_all, fields(root = %root))]
    pub async fn resolve(&self, root: Dependency) -> ResolveOutcome {
        let ctx = Arc::new(ResolutionContext::new(self.shared.clone()));
        ctx.emit(PipelineEvent::ResolutionStarted {
            root: root.to_string(),
            repositories: self.repositories().len(),
        });

        let outcome = match load_scope(ctx.clone(), root.clone(), None, Vec::new()).await {
            ScopeLookup::Missing(miss) => {
                ctx.finish();
                error!("Could not find {} in any repository", root);
                for url in &miss.attempted_urls {
                    self.shared
                        .events
                        .send(PipelineEvent::error(format!("Not found: {url}")));
                }
                ResolveOutcome {
                    found: false,
                    pom_url: miss.attempted_urls.last().cloned().unwrap_or_default(),
                    repository: None,
                    dependencies: Vec::new(),
                    root,
                    attempted_urls: miss.attempted_urls,
                }
            }
            ScopeLookup::Found(scope) => {
                let resolved_root = scope.dependency.clone();
                // Claimed up front so cycles back to the root stop here.
                ctx.registry.claim(&resolved_root, NodeRole::Dependency);
                ctx.registry
                    .record(resolved_root.clone(), None, NodeRole::Root);
                expand_scope(ctx.clone(), scope.clone()).await;
                ctx.finish();

                let dependencies = ctx.registry.reconciled(&resolved_root);
                info!(
                    "Resolved {} with {} dependencies",
                    resolved_root,
                    dependencies.len()
                );
                ResolveOutcome {
                    found: true,
                    pom_url: scope.pom_url.clone(),
                    repository: Some(scope.repository.clone()),
                    dependencies,
                    root: resolved_root,
                    attempted_urls: Vec::new(),
                }
            }
        };

        self.shared.events.send(PipelineEvent::ResolutionFinished {
            found: outcome.found,
            dependency_count: outcome.dependencies.len(),
        });
        outcome
    }
}

/// Claims and resolves one node, then its subtree.
#[async_recursion]
async fn expand_node(
    ctx: Arc<ResolutionContext>,
    dependency: Dependency,
    owner: Dependency,
    role: NodeRole,
) {
    if ctx.is_done() {
        return;
    }
    ctx.registry.request(&owner, &dependency, role);
    if ctx.registry.claim(&dependency, role) != Claim::Claimed {
        return;
    }

    let scope = match load_scope(ctx.clone(), dependency.clone(), Some(owner.clone()), Vec::new()).await
    {
        ScopeLookup::Found(scope) => scope,
        ScopeLookup::Missing(miss) => {
            warn!(
                "{} (needed by {}) not found after {} attempts",
                dependency,
                owner,
                miss.attempted_urls.len()
            );
            ctx.emit(PipelineEvent::warn(format!(
                "Could not find {dependency}, required by {owner}"
            )));
            return;
        }
    };

    if ctx.is_done() {
        return;
    }
    ctx.registry
        .record(scope.dependency.clone(), Some(owner), role);
    expand_scope(ctx, scope).await;
}

/// Spawns the node's parent and declared dependencies and waits for all of them.
async fn expand_scope(ctx: Arc<ResolutionContext>, scope: Arc<NodeScope>) {
    let mut tasks = JoinSet::new();

    if let Some(parent) = scope.parent.clone() {
        let ctx = ctx.clone();
        let owner = scope.dependency.clone();
        tasks.spawn(async move { expand_node(ctx, parent, owner, NodeRole::Parent).await });
    }

    for raw in scope.declared.iter().cloned() {
        let ctx = ctx.clone();
        let scope = scope.clone();
        tasks.spawn(async move {
            if ctx.is_done() {
                return;
            }
            let Some(child) = build_dependency(&ctx, &raw, &scope, true).await else {
                return;
            };
            expand_node(ctx, child, scope.dependency.clone(), NodeRole::Dependency).await
        });
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            error!(
                "Resolution task under {} failed: {}",
                scope.dependency,
                join_error_message(e)
            );
        }
    }
}

/// Locates and parses `requested`, loading its parent chain first.
#[async_recursion]
async fn load_scope(
    ctx: Arc<ResolutionContext>,
    requested: Dependency,
    owner: Option<Dependency>,
    ancestors: Vec<Dependency>,
) -> ScopeLookup {
    if let Some(known) = ctx.cached_scope(&requested) {
        return ScopeLookup::Found(known);
    }

    let Located {
        dependency,
        repository,
        url,
        pom,
    } = match locate(&ctx, &requested).await {
        Ok(located) => located,
        Err(miss) => return ScopeLookup::Missing(miss),
    };

    let document = match pom {
        None => PomDocument::default(),
        Some(path) => {
            ctx.emit(PipelineEvent::PomParsing { url: url.clone() });
            match PomDocument::parse_file(&path) {
                Ok(document) => {
                    ctx.emit(PipelineEvent::PomParsed { url: url.clone() });
                    document
                }
                Err(e) => {
                    warn!("{}; treating {} as having no dependencies", e, dependency);
                    ctx.emit(PipelineEvent::warn(format!("Malformed POM at {url}")));
                    PomDocument::default()
                }
            }
        }
    };

    let mut resolved = dependency;
    if let Some(packaging) = document.packaging.as_deref() {
        if matches!(packaging, "aar" | "pom") {
            resolved.dep_type = packaging.to_string();
        }
    }
    resolved.resolved_repository = Some(repository.clone());

    let mut properties = document.properties_for(&resolved);
    let mut lineage = vec![resolved.clone()];
    let mut parent = None;

    if let Some(raw_parent) = &document.parent {
        match parent_dependency(&ctx, raw_parent, &properties, &repository).await {
            Some(candidate) if candidate == resolved || ancestors.contains(&candidate) => {
                warn!("Parent cycle at {} -> {}", resolved, candidate);
            }
            Some(candidate) => {
                let mut chain = ancestors;
                chain.push(resolved.clone());
                match load_scope(ctx.clone(), candidate.clone(), Some(resolved.clone()), chain).await
                {
                    ScopeLookup::Found(parent_scope) => {
                        ctx.registry.record(
                            parent_scope.dependency.clone(),
                            Some(resolved.clone()),
                            NodeRole::Parent,
                        );
                        properties.extend(parent_scope.properties.iter().cloned());
                        lineage.extend(parent_scope.lineage.iter().cloned());
                        parent = Some(parent_scope.dependency.clone());
                    }
                    ScopeLookup::Missing(_) => {
                        warn!("Parent POM {} of {} not found", candidate, resolved);
                    }
                }
            }
            None => debug!("Incomplete <parent> in {}", url),
        }
    }

    let mut scope = NodeScope {
        dependency: resolved,
        repository,
        pom_url: url,
        properties,
        lineage,
        parent,
        declared: Vec::new(),
    };

    for raw in &document.managed {
        if let Some(pin) = build_dependency(&ctx, raw, &scope, false).await {
            ctx.registry
                .record(pin, Some(scope.dependency.clone()), NodeRole::Managed);
        }
    }

    if let Some(owner) = owner {
        debug!("Loaded {} (declared by {})", scope.dependency, owner);
    }
    scope.declared = document.dependencies;
    let scope = Arc::new(scope);
    ctx.remember_scope(&requested, &scope);
    ScopeLookup::Found(scope)
}

/// Finds the first repository with the node's POM, filling in the version
/// from metadata when the caller gave none.
async fn locate(
    ctx: &ResolutionContext,
    requested: &Dependency,
) -> std::result::Result<Located, FetchMiss> {
    let shared = &ctx.shared;
    let repositories = shared.fetcher.repositories();
    let mut miss = FetchMiss::default();
    if ctx.is_done() {
        return Err(miss);
    }

    let mut candidate = requested.clone();
    if !candidate.has_version() {
        let coordinate = candidate.coordinate();
        match shared.fetcher.versions(&coordinate, None).await {
            Some(versions) => {
                debug!("Latest {} is {}", coordinate, versions.latest_version);
                candidate.version = versions.latest_version;
            }
            None => {
                miss.attempted_urls = repositories
                    .iter()
                    .map(|r| r.join(&coordinate.metadata_path()))
                    .collect();
                return Err(miss);
            }
        }
    }

    let denylisted = shared.config.is_denylisted(&candidate.group_id);
    for repository in repositories {
        let url = repository.join(&candidate.pom_path());
        if denylisted {
            debug!("{} is denylisted; not fetching its POM", candidate);
            return Ok(Located {
                dependency: candidate,
                repository: repository.clone(),
                url,
                pom: None,
            });
        }
        match shared.fetcher.fetch_pom(&candidate, repository).await {
            Ok(Some(path)) => {
                return Ok(Located {
                    dependency: candidate,
                    repository: repository.clone(),
                    url,
                    pom: Some(path),
                });
            }
            Ok(None) => debug!("No POM at {}", url),
            Err(e) => warn!("Fetching {} failed: {}", url, e),
        }
        miss.attempted_urls.push(url);
    }
    Err(miss)
}

fn substitute_or_literal(value: &str, properties: &[ProjectProperty]) -> String {
    substitute_properties(value, properties).unwrap_or_else(|| value.to_string())
}

async fn parent_dependency(
    ctx: &ResolutionContext,
    raw: &RawDependency,
    properties: &[ProjectProperty],
    repository: &Repository,
) -> Option<Dependency> {
    let group_id = substitute_or_literal(raw.group_id.as_deref()?, properties);
    let artifact_id = substitute_or_literal(raw.artifact_id.as_deref()?, properties);
    let coordinate = Coordinate::new(&group_id, &artifact_id);
    let version = ctx
        .shared
        .versions
        .resolve(raw.version.as_deref()?, properties, &coordinate, Some(repository))
        .await;
    Some(Dependency::new(group_id, artifact_id, version).with_type("pom"))
}

/// Turns a declared `<dependency>` into a concrete one.
///
/// Test-scoped entries are dropped. A missing version is looked up in the
/// managed pins of the node's lineage when `inherit` is set; without a pin
/// the entry is dropped.
async fn build_dependency(
    ctx: &ResolutionContext,
    raw: &RawDependency,
    scope: &NodeScope,
    inherit: bool,
) -> Option<Dependency> {
    let Some(group_id) = raw.group_id.as_deref() else {
        ctx.emit(PipelineEvent::error(format!(
            "No groupId found for a dependency in {}",
            scope.pom_url
        )));
        return None;
    };
    let Some(artifact_id) = raw.artifact_id.as_deref() else {
        ctx.emit(PipelineEvent::error(format!(
            "No artifactId found for a dependency of {group_id} in {}",
            scope.pom_url
        )));
        return None;
    };
    let group_id = substitute_or_literal(group_id, &scope.properties);
    let artifact_id = substitute_or_literal(artifact_id, &scope.properties);

    let dep_scope = raw
        .scope
        .clone()
        .unwrap_or_else(|| DEFAULT_SCOPE.to_string());
    if dep_scope == "test" {
        return None;
    }

    let coordinate = Coordinate::new(&group_id, &artifact_id);
    let version = match raw.version.as_deref() {
        Some(expr) => {
            ctx.shared
                .versions
                .resolve(expr, &scope.properties, &coordinate, Some(&scope.repository))
                .await
        }
        None if inherit => match ctx.registry.managed_version(&coordinate, &scope.lineage) {
            Some(version) => version,
            None => {
                debug!(
                    "No version for {} in {} or its parents; dropping it",
                    coordinate, scope.dependency
                );
                return None;
            }
        },
        None => return None,
    };

    let mut dependency = Dependency::new(group_id, artifact_id, version)
        .with_type(raw.dep_type.as_deref().unwrap_or(DEFAULT_TYPE))
        .with_scope(dep_scope);
    dependency.optional = raw.optional;
    Some(dependency)
}
