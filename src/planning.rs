mod deterministic;
mod joint_backup;
mod multi_agent_vi;
mod reachability;
mod sparse_sampling;
mod value_iteration;

pub use deterministic::{DeterministicPlanner, SearchStrategy};
pub use joint_backup::{
    max_welfare_joint_action, zero_sum_value, CocoQ, EnumJointBackup, JointBackup, JointQ,
    MaxWelfare,
};
pub use multi_agent_vi::{GameRecord, MultiAgentValueIteration};
pub use reachability::reachable_states;
pub use sparse_sampling::SparseSampling;
pub use value_iteration::ValueIteration;
