/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Minimum frame count to use frame-level Rayon parallelism.
pub const PARALLEL_FRAME_THRESHOLD: usize = 4;

/// Number of fluorescence channels in a 3-cube registration (DD, DA, AD, AA).
pub const CHANNEL_COUNT: usize = 4;

/// Percentile (0..100) subtracted from every frame as its background level.
pub const BACKGROUND_PERCENTILE: f64 = 1.0;

/// Number of histogram bins for Otsu's thresholding.
pub const OTSU_HISTOGRAM_BINS: usize = 256;

/// Disk radius of the closing applied to calibration masks.
pub const DEFAULT_CLOSING_RADIUS: usize = 10;

/// Disk radius of the erosion that follows closing (calibration) or opening (bleach pairs).
pub const DEFAULT_EROSION_RADIUS: usize = 10;

/// Disk radius of the first opening of the narrow bleach-pair mask.
pub const DEFAULT_OPENING_RADIUS: usize = 10;

/// Disk radius of the final opening of the narrow bleach-pair mask.
pub const DEFAULT_FINAL_OPENING_RADIUS: usize = 5;

/// Dilation radius used to build the wide (background-exclusion) mask.
pub const DEFAULT_EXTENSION_RADIUS: usize = 30;

/// Gaussian sigma applied before thresholding in mask refinement.
pub const DEFAULT_REFINE_BLUR_SIGMA: f32 = 1.0;

/// Components smaller than this (pixels) are dropped by mask refinement.
pub const DEFAULT_MIN_REGION_AREA: usize = 64;

/// Minimum number of paired samples for a linear fit with a t-test (df >= 1).
pub const MIN_FIT_SAMPLES: usize = 3;

/// Maximum continued-fraction iterations for the incomplete beta function.
pub const BETA_CF_MAX_ITER: usize = 300;

/// Convergence tolerance for the incomplete beta continued fraction.
pub const BETA_CF_EPSILON: f64 = 3.0e-16;

/// Decoder buffer limit for large multi-page TIFF stacks (2 GiB).
pub const TIFF_DECODING_LIMIT_BYTES: usize = 2 * 1024 * 1024 * 1024;

/// File extension appended to registration stems in set configurations.
pub const DEFAULT_STACK_EXTENSION: &str = "tif";
