use std::{
    any::TypeId,
    cell::RefCell,
    collections::HashMap,
    sync::{Arc, Condvar, Mutex},
    thread::{self, ThreadId},
};

use crate::{
    errors::ResolveError,
    slot::{Materialized, SlotId},
};

/// One-shot constructor for a slot.
///
/// Invoked with a reference to storage so it can hand its factory a fresh
/// capability view; removed from the table once invoked.
pub(crate) struct FactoryEntry {
    pub(crate) id: SlotId,
    pub(crate) construct: Box<dyn FnOnce(&Arc<Storage>) -> Materialized + Send>,
}

/// Per-slot lifecycle.
///
/// `Constructing` records the building thread so a same-stack re-entry
/// (a true value cycle) is distinguishable from another thread's in-flight
/// construction.
pub(crate) enum Slot {
    Pending(FactoryEntry),
    Constructing { id: SlotId, thread: ThreadId },
    Ready(Materialized),
}

/// Sole mutable owner of the members record and the factory table.
///
/// One mutex guards every slot. The factory table shrinks monotonically,
/// the set of materialized values grows monotonically, and a materialized
/// slot is write-once. The condvar wakes resolvers blocked on a
/// construction running on another thread.
pub(crate) struct Storage {
    slots: Mutex<HashMap<TypeId, Slot>>,
    materialized: Condvar,
}

thread_local! {
    /// Slots currently being constructed on this thread, outermost first.
    static CHAIN: RefCell<Vec<SlotId>> = const { RefCell::new(Vec::new()) };
}

fn construction_chain() -> Vec<SlotId> {
    CHAIN.with(|chain| chain.borrow().clone())
}

impl Storage {
    pub(crate) fn new() -> Self {
        Storage {
            slots: Mutex::new(HashMap::new()),
            materialized: Condvar::new(),
        }
    }

    /// Merges staged registrations into the slot table.
    ///
    /// A pending entry may be replaced (last registration wins); a
    /// materialized slot is write-once and keeps its value.
    pub(crate) fn merge(&self, staged: HashMap<TypeId, Slot>) {
        let mut slots = self.slots.lock().unwrap();
        for (type_id, slot) in staged {
            match slots.get(&type_id) {
                Some(Slot::Ready(existing)) => {
                    tracing::warn!(
                        slot = existing.id.type_name,
                        "ignoring re-registration of a materialized slot"
                    );
                }
                Some(Slot::Constructing { id, .. }) => {
                    tracing::warn!(
                        slot = id.type_name,
                        "ignoring re-registration of a slot under construction"
                    );
                }
                Some(Slot::Pending(existing)) => {
                    tracing::debug!(
                        slot = existing.id.type_name,
                        "replacing pending registration"
                    );
                    slots.insert(type_id, slot);
                }
                None => {
                    slots.insert(type_id, slot);
                }
            }
        }
    }

    /// Check-construct-cache resolution for one slot.
    ///
    /// A hit holds the lock only for the map lookup. A miss claims the
    /// slot, releases the lock and runs the factory, so a factory that
    /// reads a not-yet-materialized sibling recursively constructs it
    /// instead of deadlocking. Concurrent resolvers of a claimed slot
    /// block until it materializes; at most one factory invocation ever
    /// happens per slot. A same-thread re-entry fails fast with
    /// [`ResolveError::CyclicConstruction`].
    pub(crate) fn resolve(
        self: &Arc<Self>,
        want: SlotId,
    ) -> Result<Option<Materialized>, ResolveError> {
        let mut slots = self.slots.lock().unwrap();
        let entry = loop {
            match slots.get(&want.type_id) {
                None => return Ok(None),
                Some(Slot::Ready(value)) => return Ok(Some(value.clone())),
                Some(Slot::Constructing { thread, .. })
                    if *thread == thread::current().id() =>
                {
                    let chain = construction_chain();
                    tracing::error!(slot = want.type_name, "cyclic construction detected");
                    return Err(ResolveError::CyclicConstruction { slot: want, chain });
                }
                Some(Slot::Constructing { .. }) => {
                    slots = self.materialized.wait(slots).unwrap();
                }
                Some(Slot::Pending(_)) => {
                    let claimed = slots.insert(
                        want.type_id,
                        Slot::Constructing {
                            id: want,
                            thread: thread::current().id(),
                        },
                    );
                    match claimed {
                        Some(Slot::Pending(entry)) => break entry,
                        _ => unreachable!("slot state changed while the table lock was held"),
                    }
                }
            }
        };
        drop(slots);

        let value = self.run_factory(entry);

        let mut slots = self.slots.lock().unwrap();
        slots.insert(want.type_id, Slot::Ready(value.clone()));
        self.materialized.notify_all();
        Ok(Some(value))
    }

    fn run_factory(self: &Arc<Self>, entry: FactoryEntry) -> Materialized {
        let FactoryEntry { id, construct } = entry;
        tracing::debug!(slot = id.type_name, "constructing");
        CHAIN.with(|chain| chain.borrow_mut().push(id));

        let mut guard = ConstructionGuard {
            storage: self,
            id,
            completed: false,
        };
        let value = construct(self);
        guard.completed = true;
        drop(guard);

        tracing::debug!(slot = id.type_name, "materialized");
        value
    }

    /// Slot states for the container's `Debug` output.
    pub(crate) fn snapshot(&self) -> Vec<(SlotId, &'static str)> {
        let slots = self.slots.lock().unwrap();
        slots
            .values()
            .map(|slot| match slot {
                Slot::Pending(entry) => (entry.id, "pending"),
                Slot::Constructing { id, .. } => (*id, "constructing"),
                Slot::Ready(value) => (value.id, "ready"),
            })
            .collect()
    }
}

/// Restores slot and chain state when a factory unwinds, so a panicking
/// constructor does not strand resolvers blocked on the condvar. They wake
/// and observe the slot as missing; the factory is already consumed.
struct ConstructionGuard<'a> {
    storage: &'a Storage,
    id: SlotId,
    completed: bool,
}

impl Drop for ConstructionGuard<'_> {
    fn drop(&mut self) {
        CHAIN.with(|chain| {
            chain.borrow_mut().pop();
        });
        if !self.completed {
            let mut slots = match self.storage.slots.lock() {
                Ok(slots) => slots,
                Err(poisoned) => poisoned.into_inner(),
            };
            slots.remove(&self.id.type_id);
            self.storage.materialized.notify_all();
        }
    }
}
