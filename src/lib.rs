pub mod action_selection;
pub mod agent;
pub mod env;
pub mod episode;
pub mod error;
pub mod experiment;
pub mod explorer;
pub mod features;
pub mod irl;
pub mod model;
pub mod options;
pub mod planning;
pub mod policy;
pub mod utils;
pub mod value_function;

pub use error::{Result, RlError};
