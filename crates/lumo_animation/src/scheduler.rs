//! Animation scheduler
//!
//! Owns the [`AnimationStore`] and advances it once per rendering tick,
//! either driven manually ([`AnimationScheduler::tick`]) or from a dedicated
//! background thread ([`AnimationScheduler::start_background`]).
//!
//! Components never hold the store directly. They get a weak
//! [`SchedulerHandle`] and create [`AnimatedValue`]s through it; dropping an
//! `AnimatedValue` (component unmount) destroys the value and cancels its
//! transition before the next tick.
//!
//! Settle completions are never run on the tick thread. After each tick they
//! are posted through the scheduler's [`Dispatcher`] and run when the logic
//! context drains its [`CallbackQueue`](lumo_core::CallbackQueue). Listeners
//! registered through [`SchedulerHandle::subscribe`] are delivered the same
//! way, so they are free to call back into the handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use lumo_core::Dispatcher;

use crate::derived::DerivedStyle;
use crate::error::{AnimationError, Result};
use crate::spring::SpringConfig;
use crate::store::{AnimationStore, Completion, ListenerId, ValueId};
use crate::transition::Transition;
use crate::values::AnimValue;

/// Default background tick rate
pub const DEFAULT_FPS: u32 = 120;

/// Longest frame delta fed to transitions; a stalled frame is treated as this long
pub const MAX_FRAME_DT: Duration = Duration::from_millis(64);

// ============================================================================
// Global Animation Scheduler State
// ============================================================================

static GLOBAL_SCHEDULER: OnceLock<SchedulerHandle> = OnceLock::new();

/// Install the application-wide scheduler handle
///
/// # Panics
///
/// Panics if called more than once.
pub fn set_global_scheduler(handle: SchedulerHandle) {
    if GLOBAL_SCHEDULER.set(handle).is_err() {
        panic!("set_global_scheduler() called more than once");
    }
}

/// Get the application-wide scheduler handle
///
/// # Panics
///
/// Panics if `set_global_scheduler()` has not been called.
pub fn get_scheduler() -> SchedulerHandle {
    match GLOBAL_SCHEDULER.get() {
        Some(handle) => handle.clone(),
        None => panic!(
            "Animation scheduler not initialized. Call set_global_scheduler() at app startup."
        ),
    }
}

pub fn try_get_scheduler() -> Option<SchedulerHandle> {
    GLOBAL_SCHEDULER.get().cloned()
}

pub fn is_scheduler_initialized() -> bool {
    GLOBAL_SCHEDULER.get().is_some()
}

struct SchedulerInner {
    store: AnimationStore,
    last_frame: Instant,
    target_fps: u32,
    frames: u64,
    /// Shared with handles so listener notifications can be posted
    dispatcher: Option<Dispatcher>,
}

fn lock(inner: &Mutex<SchedulerInner>) -> MutexGuard<'_, SchedulerInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Callback used to wake the presentation event loop from the tick thread
pub type WakeCallback = Arc<dyn Fn() + Send + Sync>;

/// Advance the store by `dt` and hand completions to the dispatcher
///
/// Completions are forwarded after the lock is released.
fn advance(inner: &Mutex<SchedulerInner>, dt: Duration, dispatcher: Option<&Dispatcher>) -> bool {
    let dt = dt.min(MAX_FRAME_DT);
    let report = {
        let mut guard = lock(inner);
        guard.frames += 1;
        guard.store.tick(dt.as_secs_f32() * 1000.0)
    };

    let has_active = report.has_active();
    if !report.completions.is_empty() {
        forward_completions(report.completions, dispatcher);
    }
    has_active
}

fn forward_completions(completions: Vec<Completion>, dispatcher: Option<&Dispatcher>) {
    match dispatcher {
        Some(dispatcher) => {
            for done in completions {
                dispatcher.dispatch_boxed(done);
            }
        }
        None => tracing::warn!(
            "AnimationScheduler: dropping {} settle completion(s), no dispatcher configured",
            completions.len()
        ),
    }
}

/// The scheduler that ticks every animated value
///
/// ```ignore
/// let queue = CallbackQueue::new();
/// let mut scheduler = AnimationScheduler::new();
/// scheduler.set_dispatcher(queue.dispatcher());
/// scheduler.start_background();
///
/// // logic thread, once per event-loop turn
/// queue.drain();
/// ```
pub struct AnimationScheduler {
    inner: Arc<Mutex<SchedulerInner>>,
    dispatcher: Option<Dispatcher>,
    stop_flag: Arc<AtomicBool>,
    /// Set by the tick thread while transitions are running
    needs_redraw: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
    wake_callback: Option<WakeCallback>,
}

impl AnimationScheduler {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SchedulerInner {
                store: AnimationStore::new(),
                last_frame: Instant::now(),
                target_fps: DEFAULT_FPS,
                frames: 0,
                dispatcher: None,
            })),
            dispatcher: None,
            stop_flag: Arc::new(AtomicBool::new(false)),
            needs_redraw: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
            wake_callback: None,
        }
    }

    /// Route settle completions to the logic context through `dispatcher`
    ///
    /// Must be set before [`start_background`](Self::start_background).
    pub fn set_dispatcher(&mut self, dispatcher: Dispatcher) {
        lock(&self.inner).dispatcher = Some(dispatcher.clone());
        self.dispatcher = Some(dispatcher);
    }

    pub fn with_dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.set_dispatcher(dispatcher);
        self
    }

    /// Called from the tick thread whenever transitions are running
    pub fn set_wake_callback<F>(&mut self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.wake_callback = Some(Arc::new(callback));
    }

    pub fn set_target_fps(&mut self, fps: u32) {
        lock(&self.inner).target_fps = fps.max(1);
    }

    pub fn target_fps(&self) -> u32 {
        lock(&self.inner).target_fps
    }

    /// Run the tick loop on a dedicated thread at the target FPS
    pub fn start_background(&mut self) {
        if self.thread_handle.is_some() {
            return;
        }

        let inner = Arc::clone(&self.inner);
        let stop_flag = Arc::clone(&self.stop_flag);
        let needs_redraw = Arc::clone(&self.needs_redraw);
        let wake_callback = self.wake_callback.clone();
        let dispatcher = self.dispatcher.clone();
        let fps = self.target_fps();

        tracing::debug!("AnimationScheduler: starting background thread at {}fps", fps);

        self.thread_handle = Some(thread::spawn(move || {
            let frame_duration = Duration::from_micros(1_000_000 / fps as u64);

            while !stop_flag.load(Ordering::Relaxed) {
                let start = Instant::now();

                let dt = {
                    let mut guard = lock(&inner);
                    let dt = start - guard.last_frame;
                    guard.last_frame = start;
                    dt
                };
                let has_active = advance(&inner, dt, dispatcher.as_ref());

                if has_active {
                    needs_redraw.store(true, Ordering::Release);
                    if let Some(ref callback) = wake_callback {
                        callback();
                    }
                }

                let elapsed = start.elapsed();
                if elapsed < frame_duration {
                    thread::sleep(frame_duration - elapsed);
                }
            }
        }));
    }

    pub fn stop_background(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                tracing::error!("AnimationScheduler: background thread panicked");
            }
            tracing::debug!("AnimationScheduler: background thread stopped");
        }
        self.stop_flag.store(false, Ordering::Relaxed);
    }

    pub fn is_background_running(&self) -> bool {
        self.thread_handle.is_some()
    }

    /// Check and clear the redraw flag set by the tick thread
    pub fn take_needs_redraw(&self) -> bool {
        self.needs_redraw.swap(false, Ordering::Acquire)
    }

    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Advance by the wall-clock time since the previous tick
    ///
    /// Returns true if transitions are still running.
    pub fn tick(&self) -> bool {
        let dt = {
            let mut guard = lock(&self.inner);
            let now = Instant::now();
            let dt = now - guard.last_frame;
            guard.last_frame = now;
            dt
        };
        advance(&self.inner, dt, self.dispatcher.as_ref())
    }

    /// Advance by a fixed `dt`, independent of the wall clock
    pub fn tick_by(&self, dt: Duration) -> bool {
        advance(&self.inner, dt, self.dispatcher.as_ref())
    }

    pub fn has_active_animations(&self) -> bool {
        lock(&self.inner).store.has_active_transitions()
    }

    /// Number of live animated values
    pub fn value_count(&self) -> usize {
        lock(&self.inner).store.len()
    }

    /// Number of ticks processed so far
    pub fn frame_count(&self) -> u64 {
        lock(&self.inner).frames
    }

    /// Read-only access to the store (diagnostics, headless previews)
    pub fn with_store<R>(&self, f: impl FnOnce(&AnimationStore) -> R) -> R {
        f(&lock(&self.inner).store)
    }
}

impl Default for AnimationScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AnimationScheduler {
    fn drop(&mut self) {
        self.stop_background();
    }
}

/// A weak handle to the animation scheduler
///
/// Held by components. It won't keep the scheduler alive; once the
/// scheduler is gone, operations become no-ops and reads return `None`.
/// Operations on a destroyed value, however, are lifecycle bugs and panic.
#[derive(Clone)]
pub struct SchedulerHandle {
    inner: Weak<Mutex<SchedulerInner>>,
}

impl SchedulerHandle {
    fn upgrade(&self) -> Result<Arc<Mutex<SchedulerInner>>> {
        self.inner.upgrade().ok_or(AnimationError::SchedulerGone)
    }

    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    /// Create a value at rest
    pub fn create(&self, initial: impl Into<AnimValue>) -> Option<ValueId> {
        let inner = self.inner.upgrade()?;
        let id = lock(&inner).store.create(initial);
        Some(id)
    }

    pub fn get(&self, id: ValueId) -> Option<AnimValue> {
        let inner = self.inner.upgrade()?;
        let value = lock(&inner).store.get(id);
        value
    }

    pub fn is_animating(&self, id: ValueId) -> bool {
        let Some(inner) = self.inner.upgrade() else {
            return false;
        };
        let animating = lock(&inner).store.is_animating(id);
        animating
    }

    pub fn try_retarget(
        &self,
        id: ValueId,
        transition: Transition,
        on_settle: Option<Completion>,
    ) -> Result<()> {
        let inner = self.upgrade()?;
        let mut guard = lock(&inner);
        if !guard.store.has_active_transitions() {
            // Nothing was animating: don't let the idle gap become the first dt
            guard.last_frame = Instant::now();
        }
        match on_settle {
            Some(done) => guard.store.try_retarget_with(id, transition, done),
            None => guard.store.try_retarget(id, transition),
        }
    }

    /// Install a transition on `id`, canceling the previous one
    ///
    /// # Panics
    ///
    /// Panics if `id` was destroyed. No-op if the scheduler is gone.
    pub fn retarget(&self, id: ValueId, transition: Transition) {
        self.retarget_inner(id, transition, None);
    }

    /// Like [`retarget`](Self::retarget), posting `on_settle` to the logic
    /// context when the transition settles
    pub fn retarget_with<F>(&self, id: ValueId, transition: Transition, on_settle: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.retarget_inner(id, transition, Some(Box::new(on_settle)));
    }

    fn retarget_inner(&self, id: ValueId, transition: Transition, on_settle: Option<Completion>) {
        match self.try_retarget(id, transition, on_settle) {
            Ok(()) | Err(AnimationError::SchedulerGone) => {}
            Err(err) => panic!("{err}"),
        }
    }

    pub fn set_immediate(&self, id: ValueId, value: impl Into<AnimValue>) {
        if let Some(inner) = self.inner.upgrade() {
            lock(&inner).store.set_immediate(id, value);
        }
    }

    /// Cancel the running transition, leaving the value where it is
    pub fn stop(&self, id: ValueId) -> bool {
        let Some(inner) = self.inner.upgrade() else {
            return false;
        };
        let stopped = lock(&inner).store.try_stop(id).unwrap_or(false);
        stopped
    }

    pub fn try_destroy(&self, id: ValueId) -> Result<()> {
        let inner = self.upgrade()?;
        let result = lock(&inner).store.try_destroy(id);
        result
    }

    /// Observe changes to `id` from the logic context
    ///
    /// Each change is posted through the scheduler's dispatcher and the
    /// listener runs when the queue is drained, never while the store is
    /// locked. Fails with [`AnimationError::NoDispatcher`] if the scheduler
    /// has no dispatcher.
    pub fn subscribe<F>(&self, id: ValueId, listener: F) -> Result<ListenerId>
    where
        F: FnMut(ValueId, AnimValue) + Send + 'static,
    {
        let inner = self.upgrade()?;
        let mut guard = lock(&inner);
        let dispatcher = guard.dispatcher.clone().ok_or(AnimationError::NoDispatcher)?;
        let listener = Arc::new(Mutex::new(listener));
        guard.store.subscribe(id, move |id, value| {
            let listener = Arc::clone(&listener);
            dispatcher.dispatch(move || {
                let mut listener = listener.lock().unwrap_or_else(PoisonError::into_inner);
                (*listener)(id, value);
            });
        })
    }

    pub fn unsubscribe(&self, listener: ListenerId) -> Result<()> {
        let inner = self.upgrade()?;
        let result = lock(&inner).store.unsubscribe(listener);
        result
    }

    /// Evaluate a derived style against the current readings
    pub fn derive<S: Clone>(&self, style: &mut DerivedStyle<S>) -> Option<S> {
        let inner = self.inner.upgrade()?;
        let guard = lock(&inner);
        style.evaluate(&guard.store)
    }
}

// ============================================================================
// Animated Value
// ============================================================================

/// An animated value owned by one component instance
///
/// Created at mount, retargeted on prop changes and gestures, destroyed on
/// drop. Dropping cancels any in-flight transition, so nothing ticks against
/// an unmounted component.
///
/// ```ignore
/// let mut scale = AnimatedValue::new(handle.clone(), 1.0);
/// scale.spring_to(0.95, SpringConfig::stiff());
/// let current = scale.get();
/// ```
pub struct AnimatedValue {
    handle: SchedulerHandle,
    id: Option<ValueId>,
    /// Reading used once the scheduler is gone
    last: AnimValue,
}

impl AnimatedValue {
    pub fn new(handle: SchedulerHandle, initial: impl Into<AnimValue>) -> Self {
        let initial = initial.into();
        let id = handle.create(initial);
        if id.is_none() {
            tracing::debug!("AnimatedValue: scheduler gone, value stays static");
        }
        Self {
            handle,
            id,
            last: initial,
        }
    }

    pub fn id(&self) -> Option<ValueId> {
        self.id
    }

    pub fn handle(&self) -> &SchedulerHandle {
        &self.handle
    }

    /// Current reading
    pub fn get(&self) -> AnimValue {
        self.id
            .and_then(|id| self.handle.get(id))
            .unwrap_or(self.last)
    }

    pub fn get_scalar(&self) -> f32 {
        self.get().as_scalar()
    }

    /// Replace the running transition
    pub fn animate(&mut self, transition: Transition) {
        if let Some(id) = self.id {
            self.handle.retarget(id, transition);
        } else {
            self.last = transition.final_target(self.last);
        }
    }

    /// Replace the running transition; `on_settle` is posted to the logic
    /// context once it settles (never if it is replaced or dropped first)
    pub fn animate_with<F>(&mut self, transition: Transition, on_settle: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if let Some(id) = self.id {
            self.handle.retarget_with(id, transition, on_settle);
        } else {
            self.last = transition.final_target(self.last);
        }
    }

    pub fn spring_to(&mut self, target: impl Into<AnimValue>, config: SpringConfig) {
        self.animate(Transition::spring(target, config));
    }

    /// Jump to `value`, canceling any transition
    pub fn set_immediate(&mut self, value: impl Into<AnimValue>) {
        let value = value.into();
        self.last = value;
        if let Some(id) = self.id {
            self.handle.set_immediate(id, value);
        }
    }

    /// Cancel the running transition where it is
    pub fn stop(&mut self) {
        if let Some(id) = self.id {
            self.handle.stop(id);
        }
    }

    pub fn is_animating(&self) -> bool {
        self.id.is_some_and(|id| self.handle.is_animating(id))
    }
}

impl Drop for AnimatedValue {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            match self.handle.try_destroy(id) {
                Ok(()) | Err(AnimationError::SchedulerGone) => {}
                Err(err) => tracing::error!("AnimatedValue: {}", err),
            }
        }
    }
}
