pub mod bleach;
pub mod images;
pub mod set;

pub use bleach::{
    analyze_pair, BleachAnalysis, BleachPair, CorrectedBleachPair, FcBleachPair, GRegionProfile,
    ImageKind, SegmentedBleachPair,
};
pub use images::{fc_image, g_image};
pub use set::{process_bleach, BleachSet, GEstimate, GReport};
