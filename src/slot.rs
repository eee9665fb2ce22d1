use std::{
    any::{Any, TypeId},
    sync::Arc,
};

/// We assume the container is shared across threads,
/// so anything stored in a slot needs to be Send + Sync + 'static.
pub trait Service: Send + Sync + 'static {}
impl<T: Send + Sync + 'static> Service for T {}

/// Identifies one slot of the graph: the interface type stored there.
///
/// One slot per type; the name is carried for diagnostics only, identity
/// is the [`TypeId`].
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct SlotId {
    pub type_id: TypeId,
    pub type_name: &'static str,
}

impl SlotId {
    pub fn of<T: 'static + ?Sized>() -> SlotId {
        SlotId {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }
}

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name)
    }
}

/// A materialized slot value, type-erased for storage.
#[derive(Clone)]
pub(crate) struct Materialized {
    pub(crate) id: SlotId,
    value: Arc<dyn Any + Send + Sync>,
}

impl Materialized {
    pub(crate) fn new<T: Service>(value: T) -> Self {
        Materialized {
            id: SlotId::of::<T>(),
            value: Arc::new(value),
        }
    }

    /// Recovers the typed value.
    ///
    /// The typed registration API keys every value by its own type, so a
    /// mismatch here means the container configuration itself is broken.
    /// There is no safe fallback for that; abort loudly.
    ///
    /// # Panics
    ///
    /// If the erased value does not satisfy the requested interface.
    pub(crate) fn downcast<T: Service>(&self) -> Arc<T> {
        match Arc::downcast::<T>(self.value.clone()) {
            Ok(value) => value,
            Err(_) => panic!(
                "slot for '{}' holds a value of '{}'",
                std::any::type_name::<T>(),
                self.id.type_name
            ),
        }
    }
}
