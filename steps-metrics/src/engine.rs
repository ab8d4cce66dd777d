//! The metrics graph.

use crate::config::MetricsConfig;
use std::sync::{Arc, Mutex, MutexGuard};
use steps_types::Observable;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Last-seen inputs of the graph. Guarded by one mutex so an update of one
/// input is never combined with a stale value of the other.
#[derive(Default)]
struct Inputs {
    steps_generation: u64,
    goal_generation: u64,
    calories_today: Option<i64>,
    calorie_goal: Option<u32>,
}

struct Shared {
    config: MetricsConfig,
    inputs: Mutex<Inputs>,
    steps_today: Observable<i64>,
    calories_today: Observable<i64>,
    calories_remaining: Observable<i64>,
}

/// Turns step totals and the calorie goal into derived values.
#[derive(Clone)]
pub struct MetricsEngine {
    shared: Arc<Shared>,
}

impl MetricsEngine {
    pub fn new(config: MetricsConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                inputs: Mutex::new(Inputs::default()),
                steps_today: Observable::new(),
                calories_today: Observable::new(),
                calories_remaining: Observable::new(),
            }),
        }
    }

    /// Steps walked today.
    pub fn steps_today(&self) -> &Observable<i64> {
        &self.shared.steps_today
    }

    /// Calories burnt today.
    pub fn calories_today(&self) -> &Observable<i64> {
        &self.shared.calories_today
    }

    /// Calories left until the goal, never negative.
    pub fn calories_remaining(&self) -> &Observable<i64> {
        &self.shared.calories_remaining
    }

    /// Current calorie goal, if one was ever fed in.
    pub fn calorie_goal(&self) -> Option<u32> {
        self.lock().calorie_goal
    }

    /// Feeds a new "steps today" value observed at `generation`.
    ///
    /// Generations not newer than the last applied one are dropped, as are
    /// absent values (one of the two ledger rows is missing). Returns whether
    /// the value was applied.
    pub fn apply_steps(&self, generation: u64, steps: Option<i64>) -> bool {
        let mut inputs = self.lock();
        if generation <= inputs.steps_generation {
            debug!(
                "ignoring stale steps value (generation {generation} <= {})",
                inputs.steps_generation
            );
            return false;
        }
        inputs.steps_generation = generation;

        let Some(raw) = steps else {
            return true;
        };
        let steps = if raw < 0 {
            warn!("negative step count {raw} (sensor reset?), clamping to 0");
            0
        } else {
            raw
        };

        let calories = self.shared.config.calories_for(steps);
        inputs.calories_today = Some(calories);

        self.shared.steps_today.publish(steps);
        self.shared.calories_today.publish(calories);
        self.update_calories_remaining(&inputs);
        true
    }

    /// Feeds the calorie goal from the most recent booking.
    pub fn set_calorie_goal(&self, goal: u32) {
        let mut inputs = self.lock();
        inputs.goal_generation += 1;
        inputs.calorie_goal = Some(goal);
        debug!(
            "calorie goal set to {goal} (generation {})",
            inputs.goal_generation
        );
        self.update_calories_remaining(&inputs);
    }

    /// Forwards every emission of the ledger's live view into the graph.
    ///
    /// Must be called from within a tokio runtime. The task ends when the
    /// view is dropped.
    pub fn attach(&self, view: &Observable<Option<i64>>) -> JoinHandle<()> {
        let mut subscription = view.subscribe();
        let engine = self.clone();
        tokio::spawn(async move {
            while let Some(update) = subscription.next_versioned().await {
                engine.apply_steps(update.generation, update.value);
            }
            debug!("ledger view closed, metrics pump stopped");
        })
    }

    fn update_calories_remaining(&self, inputs: &Inputs) {
        if let (Some(calories), Some(goal)) = (inputs.calories_today, inputs.calorie_goal) {
            let remaining = (i64::from(goal) - calories).max(0);
            self.shared.calories_remaining.publish(remaining);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inputs> {
        self.shared.inputs.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl Default for MetricsEngine {
    fn default() -> Self {
        Self::new(MetricsConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goal_alone_does_not_emit_remaining() {
        let engine = MetricsEngine::default();
        engine.set_calorie_goal(600);
        assert_eq!(engine.calories_remaining().latest(), None);
        assert_eq!(engine.calorie_goal(), Some(600));
    }

    #[test]
    fn absent_steps_emit_nothing() {
        let engine = MetricsEngine::default();
        assert!(engine.apply_steps(1, None));
        assert_eq!(engine.steps_today().latest(), None);
        assert_eq!(engine.calories_today().latest(), None);
    }

    #[test]
    fn negative_steps_clamp_to_zero() {
        let engine = MetricsEngine::default();
        engine.apply_steps(1, Some(-250));
        assert_eq!(engine.steps_today().latest(), Some(0));
        assert_eq!(engine.calories_today().latest(), Some(0));
    }
}
