pub mod distribution;
pub mod regression;
pub mod summary;

pub use distribution::{students_t_sf, two_sided_p_value};
pub use regression::{linregress, LinearFit};
pub use summary::{mean_sd, nan_mean, nan_median};
