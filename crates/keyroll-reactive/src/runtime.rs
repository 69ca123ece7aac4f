use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::rc::{Rc, Weak};

use smallvec::SmallVec;
use tracing::{error, trace};

use crate::error::StoreError;

pub(crate) type NodeId = u64;

/// Upper bound on reaction rounds within one flush.
pub const MAX_FLUSH_ROUNDS: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Observable,
    Computed,
    Reaction,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum NodeState {
    Clean,
    /// A dependency may have changed; versions must be compared before use.
    Check,
}

#[derive(Clone, Copy, Debug)]
struct Edge {
    id: NodeId,
    version: u64,
}

#[derive(Debug)]
struct Node {
    kind: NodeKind,
    version: u64,
    state: NodeState,
    sources: SmallVec<[Edge; 4]>,
    observers: SmallVec<[NodeId; 4]>,
}

/// A computed node that can bring its cached value up to date.
pub(crate) trait Refresh {
    fn refresh(&self);
}

/// A subscription body scheduled by the runtime.
pub(crate) trait Reaction {
    fn run(&self);
    fn mark_disposed(&self);
    fn is_disposed(&self) -> bool;
}

type Frame = Option<SmallVec<[NodeId; 8]>>;

/// Dependency graph shared by every handle of a [`crate::Store`].
///
/// Nodes are observables, computed values and reactions; edges are the reads
/// recorded while a computed value or a selector evaluates. Writes push a
/// `Check` mark through the observers and queue the reactions reached;
/// computed values are pulled and verified against source versions on read.
#[derive(Default)]
pub(crate) struct Runtime {
    nodes: RefCell<HashMap<NodeId, Node>>,
    next_id: Cell<NodeId>,
    computeds: RefCell<HashMap<NodeId, Weak<dyn Refresh>>>,
    reactions: RefCell<BTreeMap<NodeId, Rc<dyn Reaction>>>,
    tracking: RefCell<Vec<Frame>>,
    batch_depth: Cell<u32>,
    pending: RefCell<BTreeSet<NodeId>>,
    flushing: Cell<bool>,
    failed_flush: RefCell<Option<StoreError>>,
}

struct BatchGuard<'a>(&'a Cell<u32>);

impl<'a> BatchGuard<'a> {
    fn enter(depth: &'a Cell<u32>) -> Self {
        depth.set(depth.get() + 1);
        Self(depth)
    }
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

impl Runtime {
    pub(crate) fn register(&self, kind: NodeKind) -> NodeId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let state = match kind {
            NodeKind::Computed => NodeState::Check,
            NodeKind::Observable | NodeKind::Reaction => NodeState::Clean,
        };
        self.nodes.borrow_mut().insert(
            id,
            Node {
                kind,
                version: 0,
                state,
                sources: SmallVec::new(),
                observers: SmallVec::new(),
            },
        );
        id
    }

    pub(crate) fn register_computed(&self, id: NodeId, computed: Weak<dyn Refresh>) {
        self.computeds.borrow_mut().insert(id, computed);
    }

    pub(crate) fn register_reaction(&self, id: NodeId, reaction: Rc<dyn Reaction>) {
        self.reactions.borrow_mut().insert(id, reaction);
    }

    pub(crate) fn reaction_count(&self) -> usize {
        self.reactions.borrow().len()
    }

    /// Removes a node and every edge touching it.
    pub(crate) fn release(&self, id: NodeId) {
        self.pending.borrow_mut().remove(&id);
        self.computeds.borrow_mut().remove(&id);
        let reaction = self.reactions.borrow_mut().remove(&id);
        {
            let mut nodes = self.nodes.borrow_mut();
            if let Some(node) = nodes.remove(&id) {
                for edge in &node.sources {
                    if let Some(source) = nodes.get_mut(&edge.id) {
                        source.observers.retain(|observer| *observer != id);
                    }
                }
                for observer in &node.observers {
                    if let Some(observer) = nodes.get_mut(observer) {
                        observer.sources.retain(|edge| edge.id != id);
                    }
                }
            }
        }
        // Dropping the body may release handles it captured.
        drop(reaction);
    }

    pub(crate) fn dispose_reactions(&self) {
        let reactions = std::mem::take(&mut *self.reactions.borrow_mut());
        for (id, reaction) in &reactions {
            reaction.mark_disposed();
            self.release(*id);
        }
        trace!(released = reactions.len(), "disposed store subscriptions");
        drop(reactions);
    }

    /// Records a read of `id` in the innermost tracking frame.
    pub(crate) fn track(&self, id: NodeId) {
        if let Some(Some(frame)) = self.tracking.borrow_mut().last_mut() {
            if !frame.contains(&id) {
                frame.push(id);
            }
        }
    }

    pub(crate) fn untracked<R>(&self, f: impl FnOnce() -> R) -> R {
        self.tracking.borrow_mut().push(None);
        let value = f();
        self.tracking.borrow_mut().pop();
        value
    }

    /// Evaluates `f` for node `id`, replacing its sources with the reads made.
    pub(crate) fn evaluate<R>(&self, id: NodeId, f: impl FnOnce() -> R) -> R {
        self.tracking.borrow_mut().push(Some(SmallVec::new()));
        let value = f();
        let reads = self
            .tracking
            .borrow_mut()
            .pop()
            .flatten()
            .unwrap_or_default();
        self.set_sources(id, &reads);
        value
    }

    fn set_sources(&self, id: NodeId, reads: &[NodeId]) {
        let mut nodes = self.nodes.borrow_mut();
        let previous = match nodes.get_mut(&id) {
            Some(node) => std::mem::take(&mut node.sources),
            None => return,
        };
        for edge in &previous {
            if let Some(source) = nodes.get_mut(&edge.id) {
                source.observers.retain(|observer| *observer != id);
            }
        }
        let mut sources = SmallVec::new();
        for read in reads {
            if let Some(source) = nodes.get_mut(read) {
                source.observers.push(id);
                sources.push(Edge {
                    id: *read,
                    version: source.version,
                });
            }
        }
        if let Some(node) = nodes.get_mut(&id) {
            node.sources = sources;
            node.state = NodeState::Clean;
        }
    }

    pub(crate) fn is_clean(&self, id: NodeId) -> bool {
        self.nodes
            .borrow()
            .get(&id)
            .map(|node| node.state == NodeState::Clean)
            .unwrap_or(false)
    }

    pub(crate) fn mark_clean(&self, id: NodeId) {
        if let Some(node) = self.nodes.borrow_mut().get_mut(&id) {
            node.state = NodeState::Clean;
        }
    }

    fn version(&self, id: NodeId) -> Option<u64> {
        self.nodes.borrow().get(&id).map(|node| node.version)
    }

    /// Records that a computed value produced a different result.
    pub(crate) fn bump(&self, id: NodeId) {
        if let Some(node) = self.nodes.borrow_mut().get_mut(&id) {
            node.version += 1;
        }
    }

    /// Refreshes computed sources of `id` and reports whether any of them
    /// moved past the version seen at the last evaluation.
    pub(crate) fn sources_changed(&self, id: NodeId) -> bool {
        let sources = match self.nodes.borrow().get(&id) {
            Some(node) => node.sources.clone(),
            None => return true,
        };
        for edge in sources {
            let computed = self.computeds.borrow().get(&edge.id).and_then(Weak::upgrade);
            if let Some(computed) = computed {
                computed.refresh();
            }
            if self.version(edge.id) != Some(edge.version) {
                return true;
            }
        }
        false
    }

    /// Bumps an observable and schedules everything downstream of it.
    pub(crate) fn mark_changed(&self, id: NodeId) -> Result<(), StoreError> {
        {
            let mut nodes = self.nodes.borrow_mut();
            let mut stack: SmallVec<[NodeId; 16]> = match nodes.get_mut(&id) {
                Some(node) => {
                    node.version += 1;
                    node.observers.iter().copied().collect()
                }
                None => SmallVec::new(),
            };
            let mut pending = self.pending.borrow_mut();
            while let Some(next) = stack.pop() {
                let Some(node) = nodes.get_mut(&next) else {
                    continue;
                };
                match node.kind {
                    NodeKind::Reaction => {
                        pending.insert(next);
                    }
                    NodeKind::Computed => {
                        // A computed already in `Check` has marked its observers.
                        if node.state == NodeState::Clean {
                            node.state = NodeState::Check;
                            stack.extend(node.observers.iter().copied());
                        }
                    }
                    NodeKind::Observable => {}
                }
            }
        }
        if self.batch_depth.get() == 0 {
            self.flush()
        } else {
            Ok(())
        }
    }

    pub(crate) fn batch<R>(&self, f: impl FnOnce() -> R) -> (R, Result<(), StoreError>) {
        let value = {
            let _guard = BatchGuard::enter(&self.batch_depth);
            f()
        };
        let flushed = if self.batch_depth.get() == 0 {
            self.flush()
        } else {
            Ok(())
        };
        (value, flushed)
    }

    /// Runs queued reactions until no more are scheduled.
    ///
    /// Re-entrant calls return immediately; writes made by callbacks are
    /// picked up by the next round of the flush already in progress.
    pub(crate) fn flush(&self) -> Result<(), StoreError> {
        if self.flushing.replace(true) {
            return Ok(());
        }
        let result = self.drain();
        self.flushing.set(false);
        if let Err(err) = &result {
            self.failed_flush.replace(Some(err.clone()));
        }
        result
    }

    pub(crate) fn take_failed_flush(&self) -> Option<StoreError> {
        self.failed_flush.take()
    }

    fn drain(&self) -> Result<(), StoreError> {
        let mut rounds = 0;
        loop {
            let queue = std::mem::take(&mut *self.pending.borrow_mut());
            if queue.is_empty() {
                return Ok(());
            }
            if rounds == MAX_FLUSH_ROUNDS {
                error!(
                    rounds,
                    scheduled = queue.len(),
                    "reactions did not settle, aborting flush"
                );
                return Err(StoreError::ReactionLoop { rounds });
            }
            rounds += 1;
            trace!(round = rounds, scheduled = queue.len(), "running reactions");
            for id in queue {
                let reaction = self.reactions.borrow().get(&id).cloned();
                if let Some(reaction) = reaction {
                    if !reaction.is_disposed() {
                        reaction.run();
                    }
                }
            }
        }
    }
}
