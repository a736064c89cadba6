// depres-core/src/registry.rs
// Shared bookkeeping for one resolution run: which nodes were claimed, which
// POMs were found, who requested what, and the managed version pins.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use depres_common::model::{Coordinate, Dependency};
use tracing::debug;

use crate::version::compare_release_versions;

/// Upper bound on agreement passes in [`ResolutionRegistry::reconciled`].
const MAX_RECONCILE_PASSES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRole {
    Root,
    /// Reached only through a `<parent>` element.
    Parent,
    Dependency,
    /// A `<dependencyManagement>` pin; never fetched on its own.
    Managed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    /// The caller owns this node and must resolve it.
    Claimed,
    /// Someone else already claimed or resolved it.
    AlreadyClaimed,
    /// The run is over.
    Closed,
}

#[derive(Debug, Default)]
struct RegistryState {
    claims: HashSet<(Dependency, NodeRole)>,
    /// Requests per owner POM, in arrival order.
    edges: HashMap<Dependency, Vec<(Dependency, NodeRole)>>,
    requested: HashSet<(Dependency, Dependency, NodeRole)>,
    /// POMs found in dependency role, keyed by GAV.
    found: HashSet<Dependency>,
    parents: HashSet<Dependency>,
    /// Managed pins by the POM that declares them.
    pins: HashMap<Dependency, Vec<Dependency>>,
    closed: bool,
}

/// Registry owned by a single resolution run. All methods take `&self`; the
/// state sits behind one mutex and no lock is held across an await.
#[derive(Debug, Default)]
pub struct ResolutionRegistry {
    state: Mutex<RegistryState>,
}

impl ResolutionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Atomically checks and marks `dependency` as being resolved in `role`.
    /// Every requested GAV is claimed once per role, whatever other versions
    /// of its coordinate are in flight.
    pub fn claim(&self, dependency: &Dependency, role: NodeRole) -> Claim {
        let mut state = self.state();
        if state.closed {
            return Claim::Closed;
        }
        if state.claims.insert((dependency.clone(), role)) {
            Claim::Claimed
        } else {
            Claim::AlreadyClaimed
        }
    }

    /// Notes that `owner` asked for `dependency` in `role`, found or not.
    pub fn request(&self, owner: &Dependency, dependency: &Dependency, role: NodeRole) {
        let mut state = self.state();
        if state.closed {
            return;
        }
        if state
            .requested
            .insert((owner.clone(), dependency.clone(), role))
        {
            state
                .edges
                .entry(owner.clone())
                .or_default()
                .push((dependency.clone(), role));
        }
    }

    /// Records a located POM, or a managed pin declared by `owner`. Returns
    /// `false` if it was already recorded or the run is closed.
    pub fn record(&self, dependency: Dependency, owner: Option<Dependency>, role: NodeRole) -> bool {
        let mut state = self.state();
        if state.closed {
            return false;
        }
        match role {
            NodeRole::Root => true,
            NodeRole::Dependency => state.found.insert(dependency),
            NodeRole::Parent => state.parents.insert(dependency),
            NodeRole::Managed => {
                let Some(owner) = owner else {
                    return false;
                };
                let pins = state.pins.entry(owner).or_default();
                if pins
                    .iter()
                    .any(|pin| pin.coordinate() == dependency.coordinate())
                {
                    return false;
                }
                pins.push(dependency);
                true
            }
        }
    }

    /// Version pinned for `coordinate` by the first POM in `lineage` (the
    /// node itself, then its parent chain) that manages it.
    pub fn managed_version(&self, coordinate: &Coordinate, lineage: &[Dependency]) -> Option<String> {
        let state = self.state();
        lineage.iter().find_map(|owner| {
            state
                .pins
                .get(owner)?
                .iter()
                .find(|pin| &pin.coordinate() == coordinate)
                .map(|pin| pin.version.clone())
        })
    }

    /// Stops accepting claims, requests and records.
    pub fn close(&self) {
        self.state().closed = true;
    }

    /// The resolved dependency set, sorted by coordinate.
    ///
    /// Each coordinate gets one agreed version: the highest found version
    /// among those requested by nodes reachable from `root`. A request edge
    /// is followed through the agreed version of its coordinate, so subtrees
    /// that only a losing version brought in are left out. A version whose
    /// POM was not found never wins. The root's own coordinate is excluded.
    pub fn reconciled(&self, root: &Dependency) -> Vec<Dependency> {
        let state = self.state();
        let root_coordinate = root.coordinate();

        let mut agreed = HashMap::new();
        for found in &state.found {
            if found.coordinate() != root_coordinate {
                offer(&mut agreed, found.coordinate(), &found.version);
            }
        }

        let mut walk = state.walk(root, &agreed);
        for pass in 1..MAX_RECONCILE_PASSES {
            if walk.requested == agreed {
                break;
            }
            debug!("Reconciling versions, pass {}", pass + 1);
            agreed = std::mem::take(&mut walk.requested);
            walk = state.walk(root, &agreed);
        }
        walk.resolved.into_values().collect()
    }
}

#[derive(Debug, Default)]
struct Walk {
    resolved: BTreeMap<Coordinate, Dependency>,
    /// Highest found version requested per coordinate by visited nodes.
    requested: HashMap<Coordinate, String>,
}

impl RegistryState {
    fn walk(&self, root: &Dependency, agreed: &HashMap<Coordinate, String>) -> Walk {
        let root_coordinate = root.coordinate();
        let mut walk = Walk::default();
        let mut seen = HashSet::from([root.clone()]);
        let mut pending = vec![root.clone()];

        while let Some(owner) = pending.pop() {
            for (child, role) in self.edges.get(&owner).into_iter().flatten() {
                let next = match role {
                    NodeRole::Parent => self.parents.get(child),
                    NodeRole::Dependency => {
                        let coordinate = child.coordinate();
                        if coordinate == root_coordinate {
                            continue;
                        }
                        if self.found.contains(child) {
                            offer(&mut walk.requested, coordinate.clone(), &child.version);
                        }
                        let chosen = agreed.get(&coordinate).and_then(|version| {
                            self.found.get(&Dependency::new(
                                &coordinate.group_id,
                                &coordinate.artifact_id,
                                version.as_str(),
                            ))
                        });
                        if let Some(found) = chosen {
                            walk.resolved.insert(coordinate, found.clone());
                        }
                        chosen
                    }
                    NodeRole::Root | NodeRole::Managed => None,
                };
                if let Some(next) = next {
                    if seen.insert(next.clone()) {
                        pending.push(next.clone());
                    }
                }
            }
        }
        walk
    }
}

/// Keeps the higher of `version` and the current entry for `coordinate`.
fn offer(versions: &mut HashMap<Coordinate, String>, coordinate: Coordinate, version: &str) {
    let higher = versions.get(&coordinate).map_or(true, |current| {
        compare_release_versions(version, current)
            .then_with(|| version.cmp(current.as_str()))
            == Ordering::Greater
    });
    if higher {
        versions.insert(coordinate, version.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dep(g: &str, a: &str, v: &str) -> Dependency {
        Dependency::new(g, a, v)
    }

    /// Requests `child` from `owner` and, when `found`, records it.
    fn link(registry: &ResolutionRegistry, owner: &Dependency, child: &Dependency, found: bool) {
        registry.request(owner, child, NodeRole::Dependency);
        if found {
            registry.record(child.clone(), Some(owner.clone()), NodeRole::Dependency);
        }
    }

    #[test]
    fn claims_are_exclusive_per_role() {
        let registry = ResolutionRegistry::new();
        let d = dep("g", "a", "1.0");
        assert_eq!(registry.claim(&d, NodeRole::Dependency), Claim::Claimed);
        assert_eq!(registry.claim(&d, NodeRole::Dependency), Claim::AlreadyClaimed);
        assert_eq!(registry.claim(&d, NodeRole::Parent), Claim::Claimed);
        assert_eq!(
            registry.claim(&dep("g", "a", "0.5"), NodeRole::Dependency),
            Claim::Claimed
        );
    }

    #[test]
    fn reconciled_keeps_one_version_per_coordinate() {
        let registry = ResolutionRegistry::new();
        let root = dep("r", "root", "1");
        registry.record(root.clone(), None, NodeRole::Root);
        link(&registry, &root, &dep("g", "a", "1.0"), true);
        link(&registry, &root, &dep("g", "a", "2.0"), true);
        link(&registry, &root, &dep("g", "b", "1.0"), true);
        link(&registry, &root, &dep("r", "root", "2"), true);
        let parent = dep("p", "parent", "5");
        registry.request(&root, &parent, NodeRole::Parent);
        registry.record(parent, Some(root.clone()), NodeRole::Parent);

        let resolved = registry.reconciled(&root);
        assert_eq!(resolved, vec![dep("g", "a", "2.0"), dep("g", "b", "1.0")]);
    }

    #[test]
    fn conflicts_compare_versions_segment_wise() {
        let registry = ResolutionRegistry::new();
        let root = dep("r", "root", "1");
        link(&registry, &root, &dep("g", "a", "2.9.0"), true);
        link(&registry, &root, &dep("g", "a", "2.10.0"), true);
        assert_eq!(registry.reconciled(&root), vec![dep("g", "a", "2.10.0")]);
    }

    #[test]
    fn unfound_higher_version_keeps_found_lower_one() {
        let registry = ResolutionRegistry::new();
        let root = dep("r", "root", "1");
        let (left, right) = (dep("g", "left", "1"), dep("g", "right", "1"));
        link(&registry, &root, &left, true);
        link(&registry, &root, &right, true);
        link(&registry, &left, &dep("g", "shared", "1.0"), true);
        link(&registry, &right, &dep("g", "shared", "2.0"), false);

        assert_eq!(
            registry.reconciled(&root),
            vec![left, right, dep("g", "shared", "1.0")]
        );
    }

    #[test]
    fn children_of_losing_versions_are_left_out() {
        let registry = ResolutionRegistry::new();
        let root = dep("r", "root", "1");
        let (left, right) = (dep("g", "left", "1"), dep("g", "right", "1"));
        let (old, new) = (dep("g", "shared", "1.0"), dep("g", "shared", "2.0"));
        link(&registry, &root, &left, true);
        link(&registry, &left, &old, true);
        link(&registry, &old, &dep("g", "orphan", "1"), true);
        link(&registry, &root, &right, true);
        link(&registry, &right, &new, true);

        assert_eq!(registry.reconciled(&root), vec![left, right, new]);
    }

    #[test]
    fn dependencies_declared_by_parents_are_reached() {
        let registry = ResolutionRegistry::new();
        let root = dep("r", "root", "1");
        let parent = dep("r", "parent", "1");
        registry.request(&root, &parent, NodeRole::Parent);
        registry.record(parent.clone(), Some(root.clone()), NodeRole::Parent);
        link(&registry, &parent, &dep("g", "inherited", "3"), true);

        assert_eq!(registry.reconciled(&root), vec![dep("g", "inherited", "3")]);
    }

    #[test]
    fn managed_version_walks_lineage_in_order() {
        let registry = ResolutionRegistry::new();
        let child = dep("g", "child", "1");
        let parent = dep("g", "parent", "1");
        registry.record(dep("x", "y", "2.0"), Some(parent.clone()), NodeRole::Managed);
        let coordinate = Coordinate::new("x", "y");
        assert_eq!(
            registry.managed_version(&coordinate, &[child.clone(), parent.clone()]).as_deref(),
            Some("2.0")
        );
        registry.record(dep("x", "y", "3.0"), Some(child.clone()), NodeRole::Managed);
        assert_eq!(
            registry.managed_version(&coordinate, &[child, parent]).as_deref(),
            Some("3.0")
        );
        assert_eq!(registry.managed_version(&coordinate, &[]), None);
    }

    #[test]
    fn closed_registry_ignores_late_results() {
        let registry = ResolutionRegistry::new();
        let root = dep("r", "root", "1");
        registry.close();
        assert_eq!(registry.claim(&dep("g", "a", "1"), NodeRole::Dependency), Claim::Closed);
        registry.request(&root, &dep("g", "a", "1"), NodeRole::Dependency);
        assert!(!registry.record(dep("g", "a", "1"), Some(root.clone()), NodeRole::Dependency));
        assert!(registry.reconciled(&root).is_empty());
    }
}
