//! Derived styles
//!
//! A derived style is a pure function of one or more animated values.
//! [`DerivedStyle`] remembers the versions of its inputs and reuses the last
//! snapshot until one of them changes. Evaluation only ever borrows the
//! store immutably, so computing a style can't write values or fire
//! completions, and it is safe to evaluate as often as the painter likes.

use smallvec::SmallVec;

use crate::store::{AnimationStore, ValueId};
use crate::values::AnimValue;

type Inputs = SmallVec<[ValueId; 4]>;
type Readings = SmallVec<[AnimValue; 4]>;

/// Compute a style snapshot from the current readings of `inputs`
///
/// Returns `None` if any input no longer exists.
pub fn derive_style<S, F>(store: &AnimationStore, inputs: &[ValueId], compute: F) -> Option<S>
where
    F: Fn(&[AnimValue]) -> S,
{
    let readings = read_all(store, inputs)?;
    Some(compute(&readings))
}

fn read_all(store: &AnimationStore, inputs: &[ValueId]) -> Option<Readings> {
    inputs.iter().map(|id| store.get(*id)).collect()
}

/// A cached derived style over a fixed set of inputs
pub struct DerivedStyle<S> {
    inputs: Inputs,
    compute: Box<dyn Fn(&[AnimValue]) -> S + Send>,
    cache: Option<(SmallVec<[u64; 4]>, S)>,
    recomputes: u64,
}

impl<S: Clone> DerivedStyle<S> {
    pub fn new<F>(inputs: impl IntoIterator<Item = ValueId>, compute: F) -> Self
    where
        F: Fn(&[AnimValue]) -> S + Send + 'static,
    {
        Self {
            inputs: inputs.into_iter().collect(),
            compute: Box::new(compute),
            cache: None,
            recomputes: 0,
        }
    }

    pub fn inputs(&self) -> &[ValueId] {
        &self.inputs
    }

    /// Latest snapshot, recomputed only if an input changed since the last call
    ///
    /// Returns `None` once any input has been destroyed.
    pub fn evaluate(&mut self, store: &AnimationStore) -> Option<S> {
        let versions: Option<SmallVec<[u64; 4]>> =
            self.inputs.iter().map(|id| store.version(*id)).collect();
        let versions = versions?;

        if let Some((cached_versions, snapshot)) = &self.cache {
            if *cached_versions == versions {
                return Some(snapshot.clone());
            }
        }

        let readings = read_all(store, &self.inputs)?;
        let snapshot = (self.compute)(&readings);
        self.recomputes += 1;
        self.cache = Some((versions, snapshot.clone()));
        Some(snapshot)
    }

    /// How many times the compute function has run
    pub fn recompute_count(&self) -> u64 {
        self.recomputes
    }

    /// Forget the cached snapshot
    pub fn invalidate(&mut self) {
        self.cache = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::easing::Easing;
    use crate::transition::Transition;

    #[derive(Clone, Debug, PartialEq)]
    struct Style {
        scale: f32,
        opacity: f32,
    }

    fn style(readings: &[AnimValue]) -> Style {
        Style {
            scale: readings[0].as_scalar(),
            opacity: readings[1].as_scalar(),
        }
    }

    #[test]
    fn test_derive_style_is_pure() {
        let mut store = AnimationStore::new();
        let scale = store.create(0.5);
        let opacity = store.create(0.25);

        let a = derive_style(&store, &[scale, opacity], style).unwrap();
        let b = derive_style(&store, &[scale, opacity], style).unwrap();

        assert_eq!(a.scale.to_bits(), b.scale.to_bits());
        assert_eq!(a.opacity.to_bits(), b.opacity.to_bits());
        assert_eq!(store.version(scale), Some(0));
        assert_eq!(store.version(opacity), Some(0));
    }

    #[test]
    fn test_recomputes_only_when_inputs_change() {
        let mut store = AnimationStore::new();
        let scale = store.create(1.0);
        let opacity = store.create(1.0);
        let mut derived = DerivedStyle::new([scale, opacity], style);

        let first = derived.evaluate(&store).unwrap();
        let again = derived.evaluate(&store).unwrap();
        assert_eq!(first, again);
        assert_eq!(derived.recompute_count(), 1);

        store.retarget(opacity, Transition::timing(0.0, 100.0, Easing::Linear));
        store.tick(50.0);
        let moving = derived.evaluate(&store).unwrap();
        assert_eq!(moving.opacity, 0.5);
        assert_eq!(derived.recompute_count(), 2);

        // Settled values stop bumping versions, so the cache holds
        store.tick(50.0);
        store.tick(50.0);
        derived.evaluate(&store);
        derived.evaluate(&store);
        assert_eq!(derived.recompute_count(), 3);
    }

    #[test]
    fn test_destroyed_input_yields_none() {
        let mut store = AnimationStore::new();
        let scale = store.create(1.0);
        let opacity = store.create(1.0);
        let mut derived = DerivedStyle::new([scale, opacity], style);

        store.destroy(opacity);
        assert!(derived.evaluate(&store).is_none());
        assert!(derive_style(&store, &[scale, opacity], style).is_none());
    }
}
