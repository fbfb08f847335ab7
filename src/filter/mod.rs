//! Gene filtering: the groupwise informative-gene filter applied before
//! fitting, and the engine-side Cook's and independent filters

mod cooks;
mod independent;
mod informative;

pub use cooks::{cooks_distance, default_cooks_cutoff, flag_cooks_outliers, MIN_REPLICATES_FOR_COOKS};
pub use independent::{independent_filtering, IndependentFilter};
pub use informative::{filter_informative, FilterThresholds};
