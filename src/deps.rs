use std::{
    marker::PhantomData,
    sync::{Arc, Weak},
};

use crate::{
    errors::ResolveError,
    slot::{Service, SlotId},
    storage::Storage,
};

/// Position of a dependency within its declared tuple.
///
/// Only steers trait selection for [`In`]; never constructed, and usually
/// inferred (`deps.get::<T, _>()`).
pub struct At<const N: usize>;

/// A finite, statically known dependency list: a tuple of slot interface
/// types, e.g. `(Config, Clock)`.
pub trait DepList: 'static {
    /// Identifiers of the listed slots, in declaration order.
    fn slots() -> Vec<SlotId>;
}

/// Type-level membership proof: `T` appears in the list `L` at position
/// `I`.
///
/// Implemented only for tuples up to arity 8 by the macros below; there is
/// no runtime counterpart and no escape hatch.
pub trait In<T: Service, I>: DepList {}

/// Capability view handed to one factory: read access to exactly the slots
/// in `L`, nothing else.
///
/// Reading a dependency forwards to the shared storage's resolution
/// algorithm, so it can recursively trigger that dependency's own lazy
/// construction. A factory that participates in a reference cycle should
/// capture its view in the constructed value and read from it only after
/// construction completes.
///
/// Reading a slot outside `L` fails to compile:
///
/// ```compile_fail
/// use slotgraph::{Container, Deps};
///
/// struct Cache(u32);
/// struct Index(u32);
/// struct Store(u32);
///
/// let container = Container::new();
/// container.setup(|r| {
///     // `Index` is not in this factory's declared list.
///     r.provide(|deps: Deps<(Store,)>| {
///         Cache(deps.get::<Index, _>().map_or(0, |i| i.0))
///     });
/// });
/// ```
pub struct Deps<L: DepList> {
    storage: Weak<Storage>,
    allowed: PhantomData<fn(L)>,
}

impl<L: DepList> Clone for Deps<L> {
    fn clone(&self) -> Self {
        Deps {
            storage: self.storage.clone(),
            allowed: PhantomData,
        }
    }
}

impl<L: DepList> std::fmt::Debug for Deps<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Deps").field(&L::slots()).finish()
    }
}

impl<L: DepList> Deps<L> {
    pub(crate) fn new(storage: Weak<Storage>) -> Self {
        Deps {
            storage,
            allowed: PhantomData,
        }
    }

    /// Reads one declared dependency, materializing it on first access.
    ///
    /// `None` means the slot was never registered, which callers must
    /// tolerate as valid state.
    ///
    /// # Panics
    ///
    /// On a detected construction cycle or when the container has been
    /// dropped; see [`Deps::try_get`] for the non-panicking variant.
    pub fn get<T: Service, I>(&self) -> Option<Arc<T>>
    where
        L: In<T, I>,
    {
        match self.try_get::<T, I>() {
            Ok(value) => value,
            Err(err) => panic!(
                "failed to resolve '{}': {err}",
                std::any::type_name::<T>()
            ),
        }
    }

    /// Reads one declared dependency, surfacing resolution failures.
    pub fn try_get<T: Service, I>(&self) -> Result<Option<Arc<T>>, ResolveError>
    where
        L: In<T, I>,
    {
        let storage = self.storage.upgrade().ok_or(ResolveError::ContainerGone)?;
        let value = storage.resolve(SlotId::of::<T>())?;
        Ok(value.map(|materialized| materialized.downcast::<T>()))
    }
}

// Bounded-arity generation of the list and membership impls. A dependency
// type may appear only once per list; a duplicate would make the position
// index ambiguous and adds nothing, since slots are keyed by type.

macro_rules! dep_list {
    ($($ty:ident),*) => {
        impl<$($ty: Service),*> DepList for ($($ty,)*) {
            fn slots() -> Vec<SlotId> {
                vec![$(SlotId::of::<$ty>()),*]
            }
        }
    };
}

macro_rules! dep_member {
    (($($ty:ident),+): $t:ident @ $i:literal) => {
        impl<$($ty: Service),+> In<$t, At<$i>> for ($($ty,)+) {}
    };
}

dep_list!();

dep_list!(D0);
dep_member!((D0): D0 @ 0);

dep_list!(D0, D1);
dep_member!((D0, D1): D0 @ 0);
dep_member!((D0, D1): D1 @ 1);

dep_list!(D0, D1, D2);
dep_member!((D0, D1, D2): D0 @ 0);
dep_member!((D0, D1, D2): D1 @ 1);
dep_member!((D0, D1, D2): D2 @ 2);

dep_list!(D0, D1, D2, D3);
dep_member!((D0, D1, D2, D3): D0 @ 0);
dep_member!((D0, D1, D2, D3): D1 @ 1);
dep_member!((D0, D1, D2, D3): D2 @ 2);
dep_member!((D0, D1, D2, D3): D3 @ 3);

dep_list!(D0, D1, D2, D3, D4);
dep_member!((D0, D1, D2, D3, D4): D0 @ 0);
dep_member!((D0, D1, D2, D3, D4): D1 @ 1);
dep_member!((D0, D1, D2, D3, D4): D2 @ 2);
dep_member!((D0, D1, D2, D3, D4): D3 @ 3);
dep_member!((D0, D1, D2, D3, D4): D4 @ 4);

dep_list!(D0, D1, D2, D3, D4, D5);
dep_member!((D0, D1, D2, D3, D4, D5): D0 @ 0);
dep_member!((D0, D1, D2, D3, D4, D5): D1 @ 1);
dep_member!((D0, D1, D2, D3, D4, D5): D2 @ 2);
dep_member!((D0, D1, D2, D3, D4, D5): D3 @ 3);
dep_member!((D0, D1, D2, D3, D4, D5): D4 @ 4);
dep_member!((D0, D1, D2, D3, D4, D5): D5 @ 5);

dep_list!(D0, D1, D2, D3, D4, D5, D6);
dep_member!((D0, D1, D2, D3, D4, D5, D6): D0 @ 0);
dep_member!((D0, D1, D2, D3, D4, D5, D6): D1 @ 1);
dep_member!((D0, D1, D2, D3, D4, D5, D6): D2 @ 2);
dep_member!((D0, D1, D2, D3, D4, D5, D6): D3 @ 3);
dep_member!((D0, D1, D2, D3, D4, D5, D6): D4 @ 4);
dep_member!((D0, D1, D2, D3, D4, D5, D6): D5 @ 5);
dep_member!((D0, D1, D2, D3, D4, D5, D6): D6 @ 6);

dep_list!(D0, D1, D2, D3, D4, D5, D6, D7);
dep_member!((D0, D1, D2, D3, D4, D5, D6, D7): D0 @ 0);
dep_member!((D0, D1, D2, D3, D4, D5, D6, D7): D1 @ 1);
dep_member!((D0, D1, D2, D3, D4, D5, D6, D7): D2 @ 2);
dep_member!((D0, D1, D2, D3, D4, D5, D6, D7): D3 @ 3);
dep_member!((D0, D1, D2, D3, D4, D5, D6, D7): D4 @ 4);
dep_member!((D0, D1, D2, D3, D4, D5, D6, D7): D5 @ 5);
dep_member!((D0, D1, D2, D3, D4, D5, D6, D7): D6 @ 6);
dep_member!((D0, D1, D2, D3, D4, D5, D6, D7): D7 @ 7);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dep_list_reports_slots_in_declaration_order() {
        let slots = <(u8, u16, u32) as DepList>::slots();
        assert_eq!(
            slots,
            vec![SlotId::of::<u8>(), SlotId::of::<u16>(), SlotId::of::<u32>()]
        );
    }

    #[test]
    fn empty_dep_list_has_no_slots() {
        assert!(<() as DepList>::slots().is_empty());
    }
}
