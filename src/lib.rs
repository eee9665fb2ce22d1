//! Lazy, type-safe object-graph container.
//!
//! A [`Container`] holds a fixed set of typed slots, one per interface
//! type. Each slot's value is produced by a registered factory on first
//! access and cached for the container's lifetime; under concurrent access
//! the factory runs exactly once. A factory sees its siblings only through
//! a capability view ([`Deps`]) scoped to the tuple of slot types declared
//! on its parameter, so "only declared dependencies are visible" is a
//! compile-time guarantee with no runtime check and no escape hatch.
//!
//! Reference cycles are supported by deferring reads: a factory captures
//! its view in the constructed value and reads dependencies after its own
//! construction completes. A constructor body that eagerly reads around a
//! true value cycle does not deadlock; it fails fast with
//! [`ResolveError::CyclicConstruction`].
//!
//! ```
//! use slotgraph::{Container, Deps};
//!
//! struct Tuning {
//!     base: u32,
//! }
//!
//! // Holds its view and reads `Tuning` on demand, so it could sit in a
//! // reference cycle without forcing construction order.
//! struct Scaler {
//!     deps: Deps<(Tuning,)>,
//! }
//!
//! impl Scaler {
//!     fn scaled(&self, by: u32) -> u32 {
//!         self.deps.get::<Tuning, _>().map_or(0, |tuning| tuning.base * by)
//!     }
//! }
//!
//! let container = Container::new();
//! container.setup(|r| {
//!     r.provide(|_: Deps<()>| Tuning { base: 21 });
//!     r.provide(|deps: Deps<(Tuning,)>| Scaler { deps });
//! });
//!
//! // Nothing is constructed until first read.
//! let scaler = container.get::<Scaler>().unwrap();
//! assert_eq!(scaler.scaled(2), 42);
//! ```

mod container;
mod deps;
mod errors;
mod registrar;
mod slot;
mod storage;

pub use container::Container;
pub use deps::{At, DepList, Deps, In};
pub use errors::ResolveError;
pub use registrar::Registrar;
pub use slot::{Service, SlotId};
