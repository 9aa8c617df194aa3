use std::rc::Rc;

/// Predicate over states: goal tests, terminal functions, option
/// initiation and termination sets.
pub trait StateCondition<S> {
    fn satisfies(&self, s: &S) -> bool;
}

impl<S, F: Fn(&S) -> bool> StateCondition<S> for F {
    fn satisfies(&self, s: &S) -> bool {
        self(s)
    }
}

/// Reward received for reaching `next` after applying `a` in `s`.
pub trait RewardFunction<S, A> {
    fn reward(&self, s: &S, a: &A, next: &S) -> f64;
}

impl<S, A, F: Fn(&S, &A, &S) -> f64> RewardFunction<S, A> for F {
    fn reward(&self, s: &S, a: &A, next: &S) -> f64 {
        self(s, a, next)
    }
}

/// -1 for every transition.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformCostRf;

impl<S, A> RewardFunction<S, A> for UniformCostRf {
    fn reward(&self, _s: &S, _a: &A, _next: &S) -> f64 {
        -1.0
    }
}

/// `goal_reward` when the next state satisfies the goal, `default_reward` otherwise.
#[derive(Clone)]
pub struct GoalBasedRf<S> {
    goal: Rc<dyn StateCondition<S>>,
    goal_reward: f64,
    default_reward: f64,
}

impl<S> GoalBasedRf<S> {
    pub fn new(goal: Rc<dyn StateCondition<S>>, goal_reward: f64, default_reward: f64) -> Self {
        Self {
            goal,
            goal_reward,
            default_reward,
        }
    }
}

impl<S, A> RewardFunction<S, A> for GoalBasedRf<S> {
    fn reward(&self, _s: &S, _a: &A, next: &S) -> f64 {
        if self.goal.satisfies(next) {
            self.goal_reward
        } else {
            self.default_reward
        }
    }
}
