//! Decision trees: representation, growth and SHAP attribution.

mod grower;
mod node;
mod shap;

pub use grower::{GainParams, GrowerParams, TreeGrower};
pub use node::{Node, Split, Tree};
pub use shap::add_tree_contributions;
