//! Enter/exit lifecycle for pooled visual elements.
//!
//! Each element moves through `Waiting -> Entering -> Visible` on
//! [`AnimationPool::show`] and `Visible -> Exiting -> (destroyed)` on
//! [`AnimationPool::hide`]. Every started transition gets a
//! [`TransitionToken`]. A transition settles as [`Settlement::Completed`]
//! once its duration has elapsed in [`AnimationPool::advance`], or as
//! [`Settlement::Superseded`] as soon as a later transition on the same
//! element replaces it.

use std::hash::Hash;

use rustc_hash::FxHashMap;

/// Lifecycle state of a pooled element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolState {
    /// Created, never shown.
    Waiting,
    /// Show animation in flight.
    Entering,
    /// Fully shown.
    Visible,
    /// Hide animation in flight; destroyed when it completes.
    Exiting,
}

/// Identifies one requested transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransitionToken(u64);

/// How a transition ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// The transition ran to completion.
    Completed,
    /// A later show/hide on the same element replaced it.
    Superseded,
}

/// A settled transition reported by [`AnimationPool::advance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settled<K> {
    /// Element key.
    pub key: K,
    /// Token returned when the transition was requested.
    pub token: TransitionToken,
    /// Outcome.
    pub outcome: Settlement,
}

/// How a pool creates, animates, and destroys its elements.
///
/// `Context` is whatever the elements live in (e.g. a
/// [`MarkSet`](crate::marks::MarkSet)); it is passed to every callback.
pub trait PoolCallbacks {
    /// Element key.
    type Key: Clone + Eq + Hash;
    /// Creation payload.
    type Info;
    /// Pooled element.
    type Element;
    /// Shared state the elements are drawn in.
    type Context: ?Sized;

    /// Build the element for `key`.
    fn create(
        &mut self,
        ctx: &mut Self::Context,
        key: &Self::Key,
        info: Option<&Self::Info>,
    ) -> Self::Element;

    /// Start the show animation; returns its duration in milliseconds.
    fn show(&mut self, ctx: &mut Self::Context, element: &mut Self::Element) -> f64;

    /// Start the hide animation; returns its duration in milliseconds.
    fn hide(&mut self, ctx: &mut Self::Context, element: &mut Self::Element) -> f64;

    /// Tear the element down.
    fn destroy(&mut self, ctx: &mut Self::Context, element: Self::Element);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Show,
    Hide,
}

#[derive(Debug)]
struct Pending {
    token: TransitionToken,
    action: Action,
    remaining_ms: f64,
}

/// A pooled element and its lifecycle bookkeeping.
#[derive(Debug)]
pub struct PoolEntry<E, I> {
    element: E,
    info: Option<I>,
    /// Most recently requested state.
    state: PoolState,
    /// State whose animation was actually started.
    performed: PoolState,
    pending: Option<Pending>,
}

impl<E, I> PoolEntry<E, I> {
    /// The element.
    pub fn element(&self) -> &E {
        &self.element
    }

    /// Creation payload.
    pub fn info(&self) -> Option<&I> {
        self.info.as_ref()
    }

    /// Most recently requested state.
    pub fn state(&self) -> PoolState {
        self.state
    }
}

/// Pool of elements with animated show/hide.
///
/// In deferred mode requests are queued and only the latest request per
/// element is performed at the next [`flush`](Self::flush) or
/// [`advance`](Self::advance), so callers may toggle freely within a frame.
pub struct AnimationPool<C: PoolCallbacks> {
    callbacks: C,
    defer: bool,
    entries: FxHashMap<C::Key, PoolEntry<C::Element, C::Info>>,
    queued: Vec<(C::Key, Action, TransitionToken)>,
    settled: Vec<Settled<C::Key>>,
    next_token: u64,
}

impl<C: PoolCallbacks> AnimationPool<C> {
    /// Pool performing requests immediately.
    pub fn new(callbacks: C) -> Self {
        Self {
            callbacks,
            defer: false,
            entries: FxHashMap::default(),
            queued: Vec::new(),
            settled: Vec::new(),
            next_token: 0,
        }
    }

    /// Pool queueing requests until the next flush.
    pub fn deferred(callbacks: C) -> Self {
        Self {
            defer: true,
            ..Self::new(callbacks)
        }
    }

    /// The callbacks object.
    pub fn callbacks(&self) -> &C {
        &self.callbacks
    }

    /// Show `key`, creating it from `info` first if needed.
    ///
    /// Returns `None` when the element is already entering or visible.
    pub fn show(
        &mut self,
        ctx: &mut C::Context,
        key: C::Key,
        info: Option<C::Info>,
    ) -> Option<TransitionToken> {
        if !self.entries.contains_key(&key) {
            let element = self.callbacks.create(ctx, &key, info.as_ref());
            let _ = self.entries.insert(
                key.clone(),
                PoolEntry {
                    element,
                    info,
                    state: PoolState::Waiting,
                    performed: PoolState::Waiting,
                    pending: None,
                },
            );
        }
        self.enqueue(ctx, key, Action::Show)
    }

    /// Hide `key`. Returns `None` for unknown or already exiting elements.
    pub fn hide(&mut self, ctx: &mut C::Context, key: C::Key) -> Option<TransitionToken> {
        if !self.entries.contains_key(&key) {
            return None;
        }
        self.enqueue(ctx, key, Action::Hide)
    }

    /// Perform queued requests.
    pub fn flush(&mut self, ctx: &mut C::Context) {
        for (key, action, token) in std::mem::take(&mut self.queued) {
            self.perform(ctx, &key, action, token);
        }
    }

    /// Flush, then let in-flight transitions run for `dt` milliseconds.
    ///
    /// Returns every transition that settled since the previous call.
    pub fn advance(&mut self, ctx: &mut C::Context, dt: f64) -> Vec<Settled<C::Key>> {
        self.flush(ctx);

        let mut done: Vec<(C::Key, Pending)> = Vec::new();
        for (key, entry) in &mut self.entries {
            let Some(pending) = &mut entry.pending else {
                continue;
            };
            pending.remaining_ms -= dt;
            if pending.remaining_ms <= 0.0 {
                if let Some(pending) = entry.pending.take() {
                    done.push((key.clone(), pending));
                }
            }
        }

        for (key, pending) in done {
            self.complete(ctx, key, pending);
        }
        std::mem::take(&mut self.settled)
    }

    /// Requested state of `key`.
    pub fn state(&self, key: &C::Key) -> Option<PoolState> {
        self.entries.get(key).map(|entry| entry.state)
    }

    /// Creation payload of `key`.
    pub fn info(&self, key: &C::Key) -> Option<&C::Info> {
        self.entries.get(key).and_then(|entry| entry.info.as_ref())
    }

    /// Element for `key`.
    pub fn element(&self, key: &C::Key) -> Option<&C::Element> {
        self.entries.get(key).map(|entry| &entry.element)
    }

    /// Every pooled element.
    pub fn all(&self) -> impl Iterator<Item = (&C::Key, &PoolEntry<C::Element, C::Info>)> {
        self.entries.iter()
    }

    /// Elements that are entering or visible.
    pub fn all_visible(
        &self,
    ) -> impl Iterator<Item = (&C::Key, &PoolEntry<C::Element, C::Info>)> {
        self.entries.iter().filter(|(_, entry)| {
            matches!(entry.state, PoolState::Entering | PoolState::Visible)
        })
    }

    /// Number of pooled elements.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn next_token(&mut self) -> TransitionToken {
        let token = TransitionToken(self.next_token);
        self.next_token += 1;
        token
    }

    fn enqueue(
        &mut self,
        ctx: &mut C::Context,
        key: C::Key,
        action: Action,
    ) -> Option<TransitionToken> {
        let entry = self.entries.get_mut(&key)?;
        match action {
            Action::Show => {
                if matches!(entry.state, PoolState::Entering | PoolState::Visible) {
                    return None;
                }
                entry.state = PoolState::Entering;
            }
            Action::Hide => {
                if entry.state == PoolState::Exiting {
                    return None;
                }
                entry.state = PoolState::Exiting;
            }
        }

        let token = self.next_token();
        if self.defer {
            if let Some(slot) = self.queued.iter_mut().find(|(k, _, _)| *k == key) {
                self.settled.push(Settled {
                    key: key.clone(),
                    token: slot.2,
                    outcome: Settlement::Superseded,
                });
                *slot = (key, action, token);
            } else {
                self.queued.push((key, action, token));
            }
        } else {
            self.perform(ctx, &key, action, token);
        }
        Some(token)
    }

    fn perform(
        &mut self,
        ctx: &mut C::Context,
        key: &C::Key,
        action: Action,
        token: TransitionToken,
    ) {
        let Some(entry) = self.entries.get_mut(key) else {
            return;
        };

        let duration = match action {
            Action::Show => {
                if entry.performed == PoolState::Visible {
                    self.settled.push(Settled {
                        key: key.clone(),
                        token,
                        outcome: Settlement::Completed,
                    });
                    return;
                }
                entry.performed = PoolState::Entering;
                self.callbacks.show(ctx, &mut entry.element)
            }
            Action::Hide => {
                if entry.performed == PoolState::Waiting {
                    // Never shown: nothing to animate out.
                    if let Some(entry) = self.entries.remove(key) {
                        self.callbacks.destroy(ctx, entry.element);
                    }
                    self.settled.push(Settled {
                        key: key.clone(),
                        token,
                        outcome: Settlement::Completed,
                    });
                    return;
                }
                if entry.performed == PoolState::Exiting {
                    return;
                }
                entry.performed = PoolState::Exiting;
                self.callbacks.hide(ctx, &mut entry.element)
            }
        };

        if let Some(previous) = entry.pending.replace(Pending {
            token,
            action,
            remaining_ms: duration.max(0.0),
        }) {
            self.settled.push(Settled {
                key: key.clone(),
                token: previous.token,
                outcome: Settlement::Superseded,
            });
        }
    }

    fn complete(&mut self, ctx: &mut C::Context, key: C::Key, pending: Pending) {
        match pending.action {
            Action::Show => {
                if let Some(entry) = self.entries.get_mut(&key) {
                    if entry.state == PoolState::Entering {
                        entry.state = PoolState::Visible;
                        entry.performed = PoolState::Visible;
                    }
                }
            }
            Action::Hide => {
                let exiting = self
                    .entries
                    .get(&key)
                    .is_some_and(|entry| entry.performed == PoolState::Exiting);
                if exiting {
                    if let Some(entry) = self.entries.remove(&key) {
                        self.callbacks.destroy(ctx, entry.element);
                    }
                }
            }
        }
        self.settled.push(Settled {
            key,
            token: pending.token,
            outcome: Settlement::Completed,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records callback calls into the context.
    struct Recorder {
        duration: f64,
    }

    impl PoolCallbacks for Recorder {
        type Key = u32;
        type Info = &'static str;
        type Element = String;
        type Context = Vec<String>;

        fn create(
            &mut self,
            log: &mut Vec<String>,
            key: &u32,
            info: Option<&&'static str>,
        ) -> String {
            log.push(format!("create {key}"));
            format!("{key}:{}", info.copied().unwrap_or("-"))
        }

        fn show(&mut self, log: &mut Vec<String>, element: &mut String) -> f64 {
            log.push(format!("show {element}"));
            self.duration
        }

        fn hide(&mut self, log: &mut Vec<String>, element: &mut String) -> f64 {
            log.push(format!("hide {element}"));
            self.duration
        }

        fn destroy(&mut self, log: &mut Vec<String>, element: String) {
            log.push(format!("destroy {element}"));
        }
    }

    #[test]
    fn show_then_settle_visible() {
        let mut log = Vec::new();
        let mut pool = AnimationPool::new(Recorder { duration: 100.0 });
        let token = pool.show(&mut log, 1, Some("a"));
        assert!(token.is_some());
        assert_eq!(pool.state(&1), Some(PoolState::Entering));
        assert_eq!(pool.info(&1), Some(&"a"));
        assert!(pool.show(&mut log, 1, None).is_none());

        assert!(pool.advance(&mut log, 50.0).is_empty());
        let settled = pool.advance(&mut log, 60.0);
        assert_eq!(settled.len(), 1);
        assert_eq!(settled[0].outcome, Settlement::Completed);
        assert_eq!(Some(settled[0].token), token);
        assert_eq!(pool.state(&1), Some(PoolState::Visible));
        assert_eq!(log, vec!["create 1", "show 1:a"]);
    }

    #[test]
    fn hide_supersedes_show_and_destroys() {
        let mut log = Vec::new();
        let mut pool = AnimationPool::new(Recorder { duration: 100.0 });
        let shown = pool.show(&mut log, 7, None);
        let hidden = pool.hide(&mut log, 7);

        let settled = pool.advance(&mut log, 0.0);
        assert_eq!(settled.len(), 1);
        assert_eq!(Some(settled[0].token), shown);
        assert_eq!(settled[0].outcome, Settlement::Superseded);

        let settled = pool.advance(&mut log, 100.0);
        assert_eq!(Some(settled[0].token), hidden);
        assert_eq!(settled[0].outcome, Settlement::Completed);
        assert!(pool.is_empty());
        assert_eq!(log.last().map(String::as_str), Some("destroy 7:-"));
    }

    #[test]
    fn deferred_pool_performs_latest_request() {
        let mut log = Vec::new();
        let mut pool = AnimationPool::deferred(Recorder { duration: 10.0 });
        let first = pool.show(&mut log, 2, None);
        let _ = pool.hide(&mut log, 2);
        let again = pool.show(&mut log, 2, None);
        assert_eq!(log, vec!["create 2"]);

        let settled = pool.advance(&mut log, 0.0);
        assert_eq!(log, vec!["create 2", "show 2:-"]);
        assert_eq!(
            settled.iter().filter(|s| s.outcome == Settlement::Superseded).count(),
            2
        );
        assert!(settled.iter().any(|s| Some(s.token) == first));
        let settled = pool.advance(&mut log, 10.0);
        assert_eq!(Some(settled[0].token), again);
        assert_eq!(pool.all_visible().count(), 1);
    }

    #[test]
    fn hiding_unshown_element_destroys_it() {
        let mut log = Vec::new();
        let mut pool = AnimationPool::deferred(Recorder { duration: 10.0 });
        let _ = pool.show(&mut log, 3, None);
        let _ = pool.hide(&mut log, 3);
        let settled = pool.advance(&mut log, 0.0);
        assert!(pool.is_empty());
        assert_eq!(settled.len(), 2);
        assert!(pool.hide(&mut log, 3).is_none());
    }
}
