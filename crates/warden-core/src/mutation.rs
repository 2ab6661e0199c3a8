//! Applying a boolean mutation to a resolved target set.
//!
//! The applier is idempotent: a target already in the desired state is
//! counted, never rewritten. A target that lacks the capability (or whose
//! write fails) is skipped and counted, and the batch carries on.

use tracing::{debug, warn};
use warden_types::{DefTrait, EntityId, MutationOutcome};
use warden_world::{EntityStore, WorldError};

/// Most example labels carried in a [`MutationOutcome`].
pub const MAX_EXAMPLES: usize = 20;

/// A boolean property that can be read and written per entity.
pub trait Mutation {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Current value of the property, or `None` when the entity does not
    /// support it (or is not live).
    fn state(&self, store: &dyn EntityStore, id: EntityId) -> Option<bool>;

    /// Write the property.
    ///
    /// # Errors
    ///
    /// Propagates the store's rejection of the write.
    fn set(&self, store: &mut dyn EntityStore, id: EntityId, value: bool) -> Result<(), WorldError>;
}

/// The allowed/forbidden toggle. `true` means haulers may use the item.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowedMutation;

impl Mutation for AllowedMutation {
    fn name(&self) -> &'static str {
        "allowed"
    }

    fn state(&self, store: &dyn EntityStore, id: EntityId) -> Option<bool> {
        let thing = store.thing(id).filter(|thing| thing.spawned)?;
        store
            .def_of(thing)
            .filter(|def| def.has(DefTrait::Forbiddable))
            .map(|_| !thing.forbidden)
    }

    fn set(&self, store: &mut dyn EntityStore, id: EntityId, value: bool) -> Result<(), WorldError> {
        store.set_forbidden(id, !value)
    }
}

/// Drive every target toward `desired`.
///
/// `total_matched` is the number of targets, and every target lands in
/// exactly one of `changed`, `already_correct`, or `not_applicable`.
pub fn apply(
    store: &mut dyn EntityStore,
    targets: &[EntityId],
    desired: bool,
    mutation: &dyn Mutation,
) -> MutationOutcome {
    let mut outcome = MutationOutcome {
        total_matched: u32::try_from(targets.len()).unwrap_or(u32::MAX),
        ..MutationOutcome::default()
    };

    for &id in targets {
        match mutation.state(store, id) {
            None => outcome.not_applicable = outcome.not_applicable.saturating_add(1),
            Some(current) if current == desired => {
                outcome.already_correct = outcome.already_correct.saturating_add(1);
            }
            Some(_) => match mutation.set(store, id, desired) {
                Ok(()) => {
                    outcome.changed = outcome.changed.saturating_add(1);
                    if outcome.examples.len() < MAX_EXAMPLES
                        && let Some(thing) = store.thing(id)
                    {
                        outcome.examples.push(store.label_of(thing));
                    }
                }
                Err(e) => {
                    warn!(entity = %id, mutation = mutation.name(), error = %e, "Mutation skipped");
                    outcome.not_applicable = outcome.not_applicable.saturating_add(1);
                }
            },
        }
    }

    debug!(
        mutation = mutation.name(),
        desired,
        changed = outcome.changed,
        already_correct = outcome.already_correct,
        not_applicable = outcome.not_applicable,
        "mutation applied"
    );
    outcome
}
