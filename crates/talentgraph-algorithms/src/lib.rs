pub mod common;
pub mod ancestry;
pub mod closure;
pub mod topology;
pub mod contingency;
pub mod chi_square;
pub mod effect;

pub use common::{HierarchyView, NodeId};
pub use ancestry::{ancestor_path, AncestorPath};
pub use closure::{descendants, transitive_closure, Closure};
pub use topology::find_parent_cycles;
pub use contingency::ContingencyTable;
pub use chi_square::{
    chi_square_goodness_of_fit, chi_square_independence, chi_square_survival, ChiSquareResult,
};
pub use effect::cramers_v;
