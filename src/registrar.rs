use std::{any::TypeId, collections::HashMap, sync::Arc};

use crate::{
    deps::{DepList, Deps},
    slot::{Materialized, Service, SlotId},
    storage::{FactoryEntry, Slot, Storage},
};

/// Write-once configuration surface for the factory table.
///
/// A registrar only ever exists borrowed inside the callback passed to
/// [`Container::setup`](crate::Container::setup), so it cannot be stored
/// or used after setup completes. Registrations are staged here and merged
/// into shared storage when the callback returns.
pub struct Registrar {
    staged: HashMap<TypeId, Slot>,
}

impl Registrar {
    pub(crate) fn new() -> Self {
        Registrar {
            staged: HashMap::new(),
        }
    }

    /// Registers a factory for the slot `T`, deferred until first access.
    ///
    /// The tuple annotated on the factory's view parameter is its declared
    /// dependency list; the factory can read nothing else.
    ///
    /// ```
    /// use slotgraph::{Container, Deps};
    ///
    /// struct Limit(u32);
    /// struct Doubled(u32);
    ///
    /// let container = Container::new();
    /// container.setup(|r| {
    ///     r.insert(Limit(21));
    ///     r.provide(|deps: Deps<(Limit,)>| {
    ///         Doubled(deps.get::<Limit, _>().map_or(0, |limit| limit.0 * 2))
    ///     });
    /// });
    ///
    /// assert_eq!(container.get::<Doubled>().map(|d| d.0), Some(42));
    /// ```
    ///
    /// Registering the same slot twice keeps the later factory; that usage
    /// is unsupported and will not be detected. A factory whose value sits
    /// in a reference cycle should only capture its view and read from it
    /// after construction; an eager read around a true cycle fails at
    /// first access with a cyclic-construction error.
    pub fn provide<T, L, F>(&mut self, factory: F) -> &mut Self
    where
        T: Service,
        L: DepList,
        F: FnOnce(Deps<L>) -> T + Send + 'static,
    {
        let id = SlotId::of::<T>();
        tracing::debug!(slot = id.type_name, deps = ?L::slots(), "registered factory");

        let construct = Box::new(move |storage: &Arc<Storage>| {
            let view = Deps::<L>::new(Arc::downgrade(storage));
            Materialized::new(factory(view))
        });
        self.staged
            .insert(id.type_id, Slot::Pending(FactoryEntry { id, construct }));
        self
    }

    /// Seeds an already-constructed value for the slot `T`.
    ///
    /// The slot materializes immediately; no factory is involved.
    pub fn insert<T: Service>(&mut self, value: T) -> &mut Self {
        let materialized = Materialized::new(value);
        tracing::debug!(slot = materialized.id.type_name, "registered instance");
        self.staged
            .insert(materialized.id.type_id, Slot::Ready(materialized));
        self
    }

    pub(crate) fn into_staged(self) -> HashMap<TypeId, Slot> {
        self.staged
    }
}
