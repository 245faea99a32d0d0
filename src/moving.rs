//! Sleep aggregation: which bodies are in motion and when they may
//! stop being simulated.
//!
//! [`MovingManager`] owns the set of awake bodies. Anything that moves
//! calls [`MovingManager::notify_moved`]; once per tick the owner runs
//! [`MovingManager::heartbeat`], which counts every member down and
//! drops it from the set when the countdown expires. The owner
//! participates through the [`MovingObserver`] callbacks — it can veto
//! a body's sleep for a step and is told when a body's aggregation
//! eligibility changes.

use hashbrown::HashMap;

/// Heartbeats a body stays in the moving set after its last reported
/// motion.
pub const MAX_STEPS_TO_SLEEP: u32 = 4;

/// Identifier of a body tracked by the [`MovingManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MovingId(pub u64);

impl MovingId {
    /// Create an id from a raw value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw id value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for MovingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "moving#{}", self.0)
    }
}

/// Heartbeat callbacks from the [`MovingManager`] to the body owner.
pub trait MovingObserver {
    /// May this body be counted toward sleep this heartbeat? Returning
    /// `false` resets its countdown instead.
    fn on_sleep_check(&mut self, id: MovingId) -> bool {
        let _ = id;
        true
    }

    /// A body's aggregation eligibility changed.
    fn on_can_aggregate_changed(&mut self, id: MovingId, can_aggregate: bool) {
        let _ = (id, can_aggregate);
    }
}

/// The set of bodies currently in motion, with per-body sleep
/// countdowns.
///
/// Membership invariant: a body is in the set exactly while its
/// countdown since the last [`notify_moved`](Self::notify_moved) is
/// nonzero. Iteration order is insertion order, and removal during a
/// heartbeat keeps the pass exact: every surviving member is visited
/// once, none twice.
#[derive(Debug, Default)]
pub struct MovingManager {
    order: Vec<MovingId>,
    countdown: HashMap<MovingId, u32>,
    aggregation: HashMap<MovingId, bool>,
    // Index of the next member the active heartbeat will visit; None
    // outside a heartbeat. remove() shifts it left when it takes out a
    // member the pass already visited.
    cursor: Option<usize>,
}

impl MovingManager {
    /// Create an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bodies currently in motion.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether nothing is in motion.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Whether a body is currently in the moving set.
    #[must_use]
    pub fn is_moving(&self, id: MovingId) -> bool {
        self.countdown.contains_key(&id)
    }

    /// Remaining heartbeats before the body may sleep, if it is moving.
    #[must_use]
    pub fn steps_to_sleep(&self, id: MovingId) -> Option<u32> {
        self.countdown.get(&id).copied()
    }

    /// Record that a body moved: restart its countdown, adding it to
    /// the moving set if it was asleep.
    pub fn notify_moved(&mut self, id: MovingId) {
        if self
            .countdown
            .insert(id, MAX_STEPS_TO_SLEEP)
            .is_none()
        {
            self.order.push(id);
        }
    }

    /// Take a body out of the moving set immediately. Safe to call
    /// while a heartbeat is in progress; the current pass neither skips
    /// nor revisits any member.
    pub fn remove(&mut self, id: MovingId) {
        if let Some(pos) = self.order.iter().position(|&member| member == id) {
            self.order.remove(pos);
            self.countdown.remove(&id);
            if let Some(cursor) = self.cursor.as_mut() {
                if pos < *cursor {
                    *cursor -= 1;
                }
            }
        }
    }

    /// Whether a body is eligible for aggregation. Bodies default to
    /// eligible; the flag is independent of the sleep state.
    #[must_use]
    pub fn can_aggregate(&self, id: MovingId) -> bool {
        self.aggregation.get(&id).copied().unwrap_or(true)
    }

    /// Change a body's aggregation eligibility, notifying the observer
    /// only on an actual change.
    pub fn set_can_aggregate(
        &mut self,
        id: MovingId,
        can_aggregate: bool,
        observer: &mut dyn MovingObserver,
    ) {
        if self.can_aggregate(id) != can_aggregate {
            self.aggregation.insert(id, can_aggregate);
            observer.on_can_aggregate_changed(id, can_aggregate);
        }
    }

    /// Run one sleep pass over the moving set.
    ///
    /// Each member is offered to the observer once: a veto restarts its
    /// countdown, otherwise the countdown decrements, and a member
    /// reaching zero leaves the set in place.
    pub fn heartbeat(&mut self, observer: &mut dyn MovingObserver) {
        self.cursor = Some(0);
        while let Some(index) = self.cursor {
            let Some(&id) = self.order.get(index) else {
                break;
            };
            // Advance before any removal so remove() can re-aim us.
            self.cursor = Some(index + 1);

            let expired = match self.countdown.get_mut(&id) {
                Some(steps) => {
                    if observer.on_sleep_check(id) {
                        *steps = steps.saturating_sub(1);
                    } else {
                        *steps = MAX_STEPS_TO_SLEEP;
                    }
                    *steps == 0
                }
                None => true,
            };
            if expired {
                self.remove(id);
            }
        }
        self.cursor = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Observer that records every sleep-check and vetoes a chosen set.
    #[derive(Default)]
    struct Recorder {
        checks: Vec<MovingId>,
        vetoed: Vec<MovingId>,
        aggregate_events: Vec<(MovingId, bool)>,
    }

    impl MovingObserver for Recorder {
        fn on_sleep_check(&mut self, id: MovingId) -> bool {
            self.checks.push(id);
            !self.vetoed.contains(&id)
        }

        fn on_can_aggregate_changed(&mut self, id: MovingId, can_aggregate: bool) {
            self.aggregate_events.push((id, can_aggregate));
        }
    }

    struct Quiet;
    impl MovingObserver for Quiet {}

    #[test]
    fn test_sleeps_after_countdown() {
        let mut manager = MovingManager::new();
        let id = MovingId::new(1);
        manager.notify_moved(id);
        assert!(manager.is_moving(id));
        assert_eq!(manager.steps_to_sleep(id), Some(MAX_STEPS_TO_SLEEP));

        let mut observer = Quiet;
        for step in 1..MAX_STEPS_TO_SLEEP {
            manager.heartbeat(&mut observer);
            assert!(manager.is_moving(id), "awake after step {step}");
        }
        manager.heartbeat(&mut observer);
        assert!(!manager.is_moving(id));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_notify_moved_restarts_countdown() {
        let mut manager = MovingManager::new();
        let id = MovingId::new(7);
        let mut observer = Quiet;

        manager.notify_moved(id);
        manager.heartbeat(&mut observer);
        manager.heartbeat(&mut observer);
        assert_eq!(manager.steps_to_sleep(id), Some(MAX_STEPS_TO_SLEEP - 2));

        manager.notify_moved(id);
        assert_eq!(manager.steps_to_sleep(id), Some(MAX_STEPS_TO_SLEEP));
        // Re-notification must not duplicate the membership.
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_veto_keeps_body_awake() {
        let mut manager = MovingManager::new();
        let id = MovingId::new(3);
        manager.notify_moved(id);

        let mut observer = Recorder {
            vetoed: vec![id],
            ..Recorder::default()
        };
        for _ in 0..10 {
            manager.heartbeat(&mut observer);
        }
        assert!(manager.is_moving(id));
        assert_eq!(manager.steps_to_sleep(id), Some(MAX_STEPS_TO_SLEEP));

        // Lift the veto: the full countdown runs from the top.
        observer.vetoed.clear();
        for _ in 0..MAX_STEPS_TO_SLEEP {
            manager.heartbeat(&mut observer);
        }
        assert!(!manager.is_moving(id));
    }

    #[test]
    fn test_mass_sleep_single_pass() {
        let mut manager = MovingManager::new();
        let ids: Vec<MovingId> = (0..5).map(MovingId::new).collect();
        for &id in &ids {
            manager.notify_moved(id);
        }

        let mut observer = Recorder::default();
        for _ in 0..MAX_STEPS_TO_SLEEP {
            observer.checks.clear();
            manager.heartbeat(&mut observer);
            // Every surviving member is visited exactly once per pass.
            assert_eq!(observer.checks, ids);
        }
        // All five expired during the same pass, with removals
        // interleaved into the iteration.
        assert!(manager.is_empty());
    }

    #[test]
    fn test_staggered_removal_keeps_survivors() {
        let mut manager = MovingManager::new();
        let early = MovingId::new(1);
        let late = MovingId::new(2);
        let mut observer = Quiet;

        manager.notify_moved(early);
        manager.heartbeat(&mut observer);
        manager.heartbeat(&mut observer);
        manager.notify_moved(late);

        // `early` expires two passes before `late`.
        manager.heartbeat(&mut observer);
        manager.heartbeat(&mut observer);
        assert!(!manager.is_moving(early));
        assert!(manager.is_moving(late));

        manager.heartbeat(&mut observer);
        manager.heartbeat(&mut observer);
        assert!(!manager.is_moving(late));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut manager = MovingManager::new();
        let id = MovingId::new(11);
        manager.notify_moved(id);
        manager.remove(id);
        manager.remove(id);
        assert!(!manager.is_moving(id));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_can_aggregate_notifies_on_change_only() {
        let mut manager = MovingManager::new();
        let id = MovingId::new(5);
        let mut observer = Recorder::default();

        assert!(manager.can_aggregate(id));
        manager.set_can_aggregate(id, true, &mut observer);
        assert!(observer.aggregate_events.is_empty());

        manager.set_can_aggregate(id, false, &mut observer);
        manager.set_can_aggregate(id, false, &mut observer);
        assert_eq!(observer.aggregate_events, vec![(id, false)]);
        assert!(!manager.can_aggregate(id));

        manager.set_can_aggregate(id, true, &mut observer);
        assert_eq!(
            observer.aggregate_events,
            vec![(id, false), (id, true)]
        );
    }

    #[test]
    fn test_aggregation_flag_survives_sleep() {
        let mut manager = MovingManager::new();
        let id = MovingId::new(9);
        let mut observer = Recorder::default();

        manager.set_can_aggregate(id, false, &mut observer);
        manager.notify_moved(id);
        for _ in 0..MAX_STEPS_TO_SLEEP {
            manager.heartbeat(&mut observer);
        }
        assert!(!manager.is_moving(id));
        assert!(!manager.can_aggregate(id));
    }
}
