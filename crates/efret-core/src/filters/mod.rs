pub mod background;
pub mod gaussian_blur;

pub use background::{correct_background, percentile, subtract_background};
pub use gaussian_blur::gaussian_blur_array;
