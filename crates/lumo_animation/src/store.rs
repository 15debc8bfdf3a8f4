//! Animated value store
//!
//! Owns every animated value of a scheduler: its current reading, a version
//! counter bumped on each change, at most one active transition, an optional
//! settle completion and a listener list.
//!
//! The store is plain single-owner state; threading lives in
//! [`AnimationScheduler`](crate::scheduler::AnimationScheduler). Settle
//! completions are never run here: [`AnimationStore::tick`] hands them back
//! in the [`TickReport`] so the caller can dispatch them outside the tick.

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

use crate::error::{AnimationError, Result};
use crate::transition::{ActiveTransition, Transition, TransitionStatus};
use crate::values::AnimValue;

new_key_type! {
    /// Handle to an animated value
    pub struct ValueId;
    /// Handle to a value listener
    pub struct ListenerId;
}

/// Observer called with the new reading whenever a value changes
pub type Listener = Box<dyn FnMut(ValueId, AnimValue) + Send>;

/// Side effect to run once when a transition settles
pub type Completion = Box<dyn FnOnce() + Send>;

struct ValueSlot {
    value: AnimValue,
    version: u64,
    transition: Option<ActiveTransition>,
    on_settle: Option<Completion>,
    listeners: SmallVec<[(ListenerId, Listener); 2]>,
}

impl ValueSlot {
    fn write(&mut self, id: ValueId, value: AnimValue) {
        if value == self.value {
            return;
        }
        self.value = value;
        self.version += 1;
        for (_, listener) in self.listeners.iter_mut() {
            listener(id, value);
        }
    }

    /// Drop the active transition without running its completion
    fn cancel(&mut self) -> bool {
        self.on_settle = None;
        match self.transition.take() {
            Some(mut active) => {
                active.cancel();
                true
            }
            None => false,
        }
    }
}

/// What happened during one [`AnimationStore::tick`]
#[derive(Default)]
pub struct TickReport {
    /// Values whose transition settled this tick (each reported once)
    pub settled: SmallVec<[ValueId; 4]>,
    /// Completions of the settled transitions, in settle order
    pub completions: Vec<Completion>,
    /// Transitions still running after this tick
    pub active: usize,
}

impl TickReport {
    pub fn has_active(&self) -> bool {
        self.active > 0
    }
}

/// Storage for all animated values of one scheduler
#[derive(Default)]
pub struct AnimationStore {
    values: SlotMap<ValueId, ValueSlot>,
    listener_owners: SlotMap<ListenerId, ValueId>,
}

impl AnimationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a value at rest
    pub fn create(&mut self, initial: impl Into<AnimValue>) -> ValueId {
        let id = self.values.insert(ValueSlot {
            value: initial.into(),
            version: 0,
            transition: None,
            on_settle: None,
            listeners: SmallVec::new(),
        });
        tracing::trace!("AnimationStore: created {:?}", id);
        id
    }

    pub fn contains(&self, id: ValueId) -> bool {
        self.values.contains_key(id)
    }

    /// Current reading, or `None` for an unknown handle
    pub fn get(&self, id: ValueId) -> Option<AnimValue> {
        self.values.get(id).map(|slot| slot.value)
    }

    pub fn try_read(&self, id: ValueId) -> Result<AnimValue> {
        self.get(id).ok_or(AnimationError::UnknownValue(id))
    }

    /// Current reading
    ///
    /// # Panics
    ///
    /// Panics if `id` was destroyed or never created.
    pub fn read(&self, id: ValueId) -> AnimValue {
        fail_fast(self.try_read(id))
    }

    /// Change counter, bumped on every write that changes the reading
    pub fn version(&self, id: ValueId) -> Option<u64> {
        self.values.get(id).map(|slot| slot.version)
    }

    /// Whether `id` has a running transition
    pub fn is_animating(&self, id: ValueId) -> bool {
        self.values
            .get(id)
            .is_some_and(|slot| slot.transition.is_some())
    }

    /// Status of the transition currently attached to `id`
    pub fn transition_status(&self, id: ValueId) -> Option<TransitionStatus> {
        self.values
            .get(id)
            .and_then(|slot| slot.transition.as_ref())
            .map(ActiveTransition::status)
    }

    pub fn try_retarget(&mut self, id: ValueId, transition: Transition) -> Result<()> {
        self.install(id, transition, None)
    }

    /// Install `transition`, canceling any transition already driving `id`
    ///
    /// The new transition starts from the current reading. A replaced
    /// transition's completion is dropped without running.
    ///
    /// # Panics
    ///
    /// Panics if `id` was destroyed or never created.
    pub fn retarget(&mut self, id: ValueId, transition: Transition) {
        fail_fast(self.try_retarget(id, transition))
    }

    pub fn try_retarget_with(
        &mut self,
        id: ValueId,
        transition: Transition,
        on_settle: Completion,
    ) -> Result<()> {
        self.install(id, transition, Some(on_settle))
    }

    /// Like [`retarget`](Self::retarget), with a completion run once when the
    /// transition settles (never if it is canceled first)
    pub fn retarget_with<F>(&mut self, id: ValueId, transition: Transition, on_settle: F)
    where
        F: FnOnce() + Send + 'static,
    {
        fail_fast(self.try_retarget_with(id, transition, Box::new(on_settle)))
    }

    fn install(
        &mut self,
        id: ValueId,
        transition: Transition,
        on_settle: Option<Completion>,
    ) -> Result<()> {
        let slot = self
            .values
            .get_mut(id)
            .ok_or(AnimationError::UnknownValue(id))?;

        slot.on_settle = None;
        let active = match slot.transition.take() {
            Some(mut previous) => {
                previous.cancel();
                tracing::trace!("AnimationStore: {:?} retargeted mid-flight", id);
                ActiveTransition::interrupting(transition, slot.value, &previous)
            }
            None => ActiveTransition::start(transition, slot.value),
        };
        slot.transition = Some(active);
        slot.on_settle = on_settle;
        Ok(())
    }

    pub fn try_set_immediate(&mut self, id: ValueId, value: impl Into<AnimValue>) -> Result<()> {
        let slot = self
            .values
            .get_mut(id)
            .ok_or(AnimationError::UnknownValue(id))?;
        slot.cancel();
        slot.write(id, value.into());
        Ok(())
    }

    /// Cancel any transition and jump straight to `value`
    pub fn set_immediate(&mut self, id: ValueId, value: impl Into<AnimValue>) {
        fail_fast(self.try_set_immediate(id, value))
    }

    /// Cancel the running transition, leaving the value where it is
    ///
    /// Returns whether a transition was running.
    pub fn try_stop(&mut self, id: ValueId) -> Result<bool> {
        self.values
            .get_mut(id)
            .map(ValueSlot::cancel)
            .ok_or(AnimationError::UnknownValue(id))
    }

    pub fn try_destroy(&mut self, id: ValueId) -> Result<()> {
        let mut slot = self
            .values
            .remove(id)
            .ok_or(AnimationError::UnknownValue(id))?;
        let canceled = slot.cancel();
        for (listener, _) in slot.listeners.iter() {
            self.listener_owners.remove(*listener);
        }
        tracing::trace!(
            "AnimationStore: destroyed {:?} (canceled transition: {})",
            id,
            canceled
        );
        Ok(())
    }

    /// Cancel any transition and release the value
    ///
    /// # Panics
    ///
    /// Panics on an unknown or already destroyed handle.
    pub fn destroy(&mut self, id: ValueId) {
        fail_fast(self.try_destroy(id))
    }

    /// Register an observer for changes to `id`
    pub fn subscribe<F>(&mut self, id: ValueId, listener: F) -> Result<ListenerId>
    where
        F: FnMut(ValueId, AnimValue) + Send + 'static,
    {
        let slot = self
            .values
            .get_mut(id)
            .ok_or(AnimationError::UnknownValue(id))?;
        let listener_id = self.listener_owners.insert(id);
        slot.listeners.push((listener_id, Box::new(listener)));
        Ok(listener_id)
    }

    pub fn unsubscribe(&mut self, listener: ListenerId) -> Result<()> {
        let owner = self
            .listener_owners
            .remove(listener)
            .ok_or(AnimationError::UnknownListener(listener))?;
        if let Some(slot) = self.values.get_mut(owner) {
            slot.listeners.retain(|(id, _)| *id != listener);
        }
        Ok(())
    }

    /// Advance every running transition by `dt_ms` milliseconds
    pub fn tick(&mut self, dt_ms: f32) -> TickReport {
        let mut report = TickReport::default();

        for (id, slot) in self.values.iter_mut() {
            let Some(active) = slot.transition.as_mut() else {
                continue;
            };
            let value = active.step(dt_ms);
            let settled = active.status() == TransitionStatus::Settled;

            slot.write(id, value);

            if settled {
                slot.transition = None;
                report.settled.push(id);
                if let Some(done) = slot.on_settle.take() {
                    report.completions.push(done);
                }
                tracing::trace!("AnimationStore: {:?} settled at {:?}", id, value);
            } else {
                report.active += 1;
            }
        }

        report
    }

    pub fn has_active_transitions(&self) -> bool {
        self.values.values().any(|slot| slot.transition.is_some())
    }

    /// Number of live values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn fail_fast<T>(result: Result<T>) -> T {
    result.unwrap_or_else(|err| panic!("{err}"))
}
