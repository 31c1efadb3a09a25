//! # Change Notifier
//!
//! Typed listeners that observe every state change of a [`KmerStore`].
//!
//! Listeners are dispatched synchronously, in registration order, right
//! after the mutation took effect (right before it, for removals). They get
//! a shared borrow of the store, so they may read any key but cannot mutate
//! the store from inside a callback.

use crate::extension::KmerData;
use crate::kmer::Kmer;
use crate::store::KmerStore;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

// =============================================================================
// EVENTS
// =============================================================================

/// What happened to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    /// Created, or multiplicity incremented.
    Added,
    /// About to be deleted.
    Removed,
    /// Extension bits changed.
    ExtensionChanged,
    /// Flag bits changed.
    FlagChanged,
}

/// A single state change, borrowed from the store.
#[derive(Debug, Clone, Copy)]
pub struct Mutation<'a> {
    pub kind: MutationKind,
    pub kmer: &'a Kmer,
    /// State after the change; for `Removed`, the state being deleted.
    pub data: &'a KmerData,
}

// =============================================================================
// LISTENER TRAIT
// =============================================================================

/// Receives change notifications from a store.
///
/// Implementations must handle their own failures; nothing propagates back
/// into the mutation that triggered the call.
pub trait MutationListener: Send + Sync {
    fn on_mutation(&self, store: &KmerStore, mutation: &Mutation<'_>);
}

impl<F> MutationListener for F
where
    F: Fn(&KmerStore, &Mutation<'_>) + Send + Sync,
{
    fn on_mutation(&self, store: &KmerStore, mutation: &Mutation<'_>) {
        self(store, mutation);
    }
}

/// Wrap a closure as a shareable listener.
pub fn from_fn<F>(f: F) -> Arc<dyn MutationListener>
where
    F: Fn(&KmerStore, &Mutation<'_>) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Handle returned by `attach`, used to detach later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

// =============================================================================
// REGISTRY
// =============================================================================

/// Ordered set of attached listeners.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: Vec<(ListenerId, Arc<dyn MutationListener>)>,
    next_id: u64,
}

impl ListenerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener; it fires after all previously attached ones.
    pub fn attach(&mut self, listener: Arc<dyn MutationListener>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.listeners.push((id, listener));
        id
    }

    /// Remove a listener. Returns false if `id` was not attached.
    pub fn detach(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Invoke every listener in registration order.
    pub fn dispatch(&self, store: &KmerStore, mutation: &Mutation<'_>) {
        for (_, listener) in &self.listeners {
            listener.on_mutation(store, mutation);
        }
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

// =============================================================================
// BUILT-IN LISTENERS
// =============================================================================

/// Counts notifications by kind.
#[derive(Debug, Default)]
pub struct MutationTally {
    added: AtomicU64,
    removed: AtomicU64,
    extension_changed: AtomicU64,
    flag_changed: AtomicU64,
}

impl MutationTally {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn count(&self, kind: MutationKind) -> u64 {
        self.counter(kind).load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        [
            MutationKind::Added,
            MutationKind::Removed,
            MutationKind::ExtensionChanged,
            MutationKind::FlagChanged,
        ]
        .iter()
        .map(|kind| self.count(*kind))
        .fold(0u64, u64::saturating_add)
    }

    fn counter(&self, kind: MutationKind) -> &AtomicU64 {
        match kind {
            MutationKind::Added => &self.added,
            MutationKind::Removed => &self.removed,
            MutationKind::ExtensionChanged => &self.extension_changed,
            MutationKind::FlagChanged => &self.flag_changed,
        }
    }
}

impl MutationListener for MutationTally {
    fn on_mutation(&self, _store: &KmerStore, mutation: &Mutation<'_>) {
        self.counter(mutation.kind).fetch_add(1, Ordering::Relaxed);
    }
}

// =============================================================================
// TESTS
// =============================================================================
