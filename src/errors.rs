use thiserror::Error;

use crate::slot::SlotId;

/// Failures surfaced by the non-panicking resolution API.
///
/// Absence of a registration is not an error: it is the `None` case of
/// [`Container::try_get`](crate::Container::try_get).
#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    /// A constructor body read a slot whose own construction is still in
    /// progress on the same call stack: a true value cycle.
    ///
    /// Break the cycle by capturing the capability view in the constructed
    /// value and reading the dependency after construction completes.
    #[error("cyclic construction of '{}': {}", .slot, chain_display(.chain, .slot))]
    CyclicConstruction {
        /// The slot whose construction was re-entered.
        slot: SlotId,
        /// Constructions in flight on this thread, outermost first.
        chain: Vec<SlotId>,
    },

    /// The container behind a capability view has been dropped.
    #[error("container was dropped while a view was still in use")]
    ContainerGone,
}

fn chain_display(chain: &[SlotId], slot: &SlotId) -> String {
    let mut names: Vec<&str> = chain.iter().map(|id| id.type_name).collect();
    names.push(slot.type_name);
    names.join(" -> ")
}
