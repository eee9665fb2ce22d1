use std::{fmt::Debug, sync::Arc};

use crate::{
    errors::ResolveError,
    registrar::Registrar,
    slot::{Service, SlotId},
    storage::Storage,
};

/// Facade over shared storage: typed member access with just-in-time
/// construction.
///
/// Cloning is shallow; all clones share one slot table and may resolve
/// concurrently.
#[derive(Clone)]
pub struct Container {
    storage: Arc<Storage>,
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_struct("Container");
        for (id, state) in self.storage.snapshot() {
            map.field(id.type_name, &state);
        }
        map.finish()
    }
}

impl Container {
    /// Creates a container with an empty slot table.
    pub fn new() -> Self {
        Container {
            storage: Arc::new(Storage::new()),
        }
    }

    /// Runs the single setup callback.
    ///
    /// The [`Registrar`] is only reachable inside `f`; staged
    /// registrations land in storage when `f` returns. Expected to run
    /// once, before the first production access.
    pub fn setup<F>(&self, f: F)
    where
        F: FnOnce(&mut Registrar),
    {
        let mut registrar = Registrar::new();
        f(&mut registrar);
        self.storage.merge(registrar.into_staged());
    }

    /// Reads the slot `T`, constructing it on first access.
    ///
    /// `None` means the slot was never registered, which is valid state,
    /// not an error. Repeated reads return the same cached `Arc` and never
    /// re-invoke the factory.
    ///
    /// # Panics
    ///
    /// On a detected construction cycle, which is a fatal
    /// misconfiguration of the graph.
    pub fn get<T: Service>(&self) -> Option<Arc<T>> {
        match self.try_get::<T>() {
            Ok(value) => value,
            Err(err) => panic!(
                "failed to resolve '{}': {err}",
                std::any::type_name::<T>()
            ),
        }
    }

    /// Non-panicking variant of [`Container::get`].
    pub fn try_get<T: Service>(&self) -> Result<Option<Arc<T>>, ResolveError> {
        let value = self.storage.resolve(SlotId::of::<T>())?;
        Ok(value.map(|materialized| materialized.downcast::<T>()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps::Deps;

    struct Port(u16);

    #[test]
    fn debug_lists_slot_states() {
        let container = Container::new();
        container.setup(|r| {
            r.provide(|_: Deps<()>| Port(80));
        });

        let rendered = format!("{container:?}");
        assert!(rendered.contains("pending"));

        container.get::<Port>();
        let rendered = format!("{container:?}");
        assert!(rendered.contains("ready"));
    }
}
