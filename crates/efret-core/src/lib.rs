pub mod consts;
pub mod crosstalk;
pub mod error;
pub mod filters;
pub mod frame;
pub mod fret;
pub mod io;
pub mod pipeline;
pub mod regions;
pub mod segmentation;
pub mod stats;
