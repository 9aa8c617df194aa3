use enum_dispatch::enum_dispatch;
use ndarray::{Array1, Array2};

/// Joint Q-values of one state, one matrix per agent indexed by
/// `[action of agent 0, action of agent 1]`.
pub type JointQ = [Array2<f64>; 2];

/// Solves the stage game of a state: the value each agent gets from the
/// joint Q-values. Multi-agent value iteration backs these values up.
#[enum_dispatch]
pub trait JointBackup {
    fn stage_values(&self, q: &JointQ) -> [f64; 2];
}

#[derive(Debug, Clone)]
#[enum_dispatch(JointBackup)]
pub enum EnumJointBackup {
    MaxWelfare(MaxWelfare),
    CocoQ(CocoQ),
}

/// Joint action with the highest summed value; ties go to the first in
/// row-major order.
pub fn max_welfare_joint_action(q: &JointQ) -> (usize, usize) {
    let welfare = &q[0] + &q[1];
    let mut best = (0, 0);
    let mut best_value = f64::NEG_INFINITY;
    for ((i, j), v) in welfare.indexed_iter() {
        if *v > best_value {
            best = (i, j);
            best_value = *v;
        }
    }
    best
}

/// Both agents follow the utilitarian joint action.
#[derive(Debug, Clone, Default)]
pub struct MaxWelfare;

impl JointBackup for MaxWelfare {
    fn stage_values(&self, q: &JointQ) -> [f64; 2] {
        if q[0].is_empty() {
            return [0.0, 0.0];
        }
        let (i, j) = max_welfare_joint_action(q);
        [q[0][[i, j]], q[1][[i, j]]]
    }
}

/// Cooperative-competitive values: the best average payoff plus the
/// minimax value of the zero-sum game over half the difference, which acts
/// as a side payment between the agents.
#[derive(Debug, Clone)]
pub struct CocoQ {
    iterations: usize,
}

impl CocoQ {
    /// `iterations` of regret matching solve each zero-sum stage game.
    pub fn new(iterations: usize) -> Self {
        Self {
            iterations: iterations.max(1),
        }
    }
}

impl Default for CocoQ {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl JointBackup for CocoQ {
    fn stage_values(&self, q: &JointQ) -> [f64; 2] {
        if q[0].is_empty() {
            return [0.0, 0.0];
        }
        let cooperative = ((&q[0] + &q[1]) / 2.0)
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let competitive = zero_sum_value(&((&q[0] - &q[1]) / 2.0), self.iterations);
        [cooperative + competitive, cooperative - competitive]
    }
}

fn regret_matching_strategy(regrets: &Array1<f64>) -> Array1<f64> {
    let total: f64 = regrets.sum();
    if total > 0.0 {
        regrets / total
    } else {
        Array1::from_elem(regrets.len(), 1.0 / regrets.len() as f64)
    }
}

/// Value to the row player of the zero-sum matrix game `payoff`, from the
/// linearly averaged strategies of regret matching+ self play.
pub fn zero_sum_value(payoff: &Array2<f64>, iterations: usize) -> f64 {
    let (rows, cols) = payoff.dim();
    if rows == 0 || cols == 0 {
        return 0.0;
    }
    let mut row_regrets = Array1::<f64>::zeros(rows);
    let mut col_regrets = Array1::<f64>::zeros(cols);
    let mut row_average = Array1::<f64>::zeros(rows);
    let mut col_average = Array1::<f64>::zeros(cols);
    for t in 1..=iterations {
        let x = regret_matching_strategy(&row_regrets);
        let y = regret_matching_strategy(&col_regrets);
        let row_payoffs = payoff.dot(&y);
        let col_payoffs = -x.dot(payoff);
        let value = x.dot(&row_payoffs);
        row_regrets = (row_regrets + &row_payoffs - value).mapv(|r| r.max(0.0));
        col_regrets = (col_regrets + &col_payoffs + value).mapv(|r| r.max(0.0));
        row_average.scaled_add(t as f64, &x);
        col_average.scaled_add(t as f64, &y);
    }
    row_average /= row_average.sum();
    col_average /= col_average.sum();
    row_average.dot(&payoff.dot(&col_average))
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn zero_sum_values_of_classic_games() {
        // saddle point in pure strategies
        assert!((zero_sum_value(&array![[3.0, 1.0], [4.0, 2.0]], 1000) - 2.0).abs() < 1e-2);
        // matching pennies and rock paper scissors
        assert!(zero_sum_value(&array![[1.0, -1.0], [-1.0, 1.0]], 1000).abs() < 1e-2);
        let rps = array![[0.0, -1.0, 1.0], [1.0, 0.0, -1.0], [-1.0, 1.0, 0.0]];
        assert!(zero_sum_value(&rps, 1000).abs() < 1e-2);
        // mixed equilibrium worth 1/7
        assert!((zero_sum_value(&array![[3.0, -1.0], [-2.0, 1.0]], 1000) - 1.0 / 7.0).abs() < 1e-2);
    }

    #[test]
    fn max_welfare_takes_the_first_best_joint_action() {
        let q = [array![[1.0, 0.0], [0.0, 3.0]], array![[1.0, 0.0], [4.0, 0.0]]];
        assert_eq!(max_welfare_joint_action(&q), (1, 0));
        assert_eq!(MaxWelfare.stage_values(&q), [0.0, 4.0]);
        let tied = [array![[1.0, 1.0]], array![[1.0, 1.0]]];
        assert_eq!(max_welfare_joint_action(&tied), (0, 0));
    }

    #[test]
    fn coco_values_share_the_surplus() {
        let common = array![[1.0, 0.0], [0.0, 3.0]];
        let values = CocoQ::default().stage_values(&[common.clone(), common]);
        assert!((values[0] - 3.0).abs() < 1e-2);
        assert!((values[1] - 3.0).abs() < 1e-2);

        // only agent 0 profits, and agent 1 can hold its edge to zero
        let backup = EnumJointBackup::from(CocoQ::default());
        let values = backup.stage_values(&[array![[2.0, 0.0], [0.0, 0.0]], Array2::zeros((2, 2))]);
        assert!((values[0] - 1.0).abs() < 1e-2);
        assert!((values[1] - 1.0).abs() < 1e-2);

        let pennies = array![[1.0, -1.0], [-1.0, 1.0]];
        let values = CocoQ::default().stage_values(&[pennies.clone(), -pennies]);
        assert!(values[0].abs() < 1e-2 && values[1].abs() < 1e-2);
    }
}
