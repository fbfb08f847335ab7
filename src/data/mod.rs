//! Data structures for the two-condition analysis

mod count_matrix;
mod design;
mod phenotype;
mod subset;

pub use count_matrix::CountMatrix;
pub use design::{Condition, ConditionLabels, DesignCounts, DesignTable};
pub use phenotype::PhenotypeTable;
pub use subset::build_subset;
