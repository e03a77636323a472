pub mod export;
pub mod image_io;
pub mod tiff_stack;

pub use export::{export_bleach, export_calibration};
pub use image_io::{save_image, save_labels, save_mask};
pub use tiff_stack::{load_stack, load_stack_limited, load_stack_with_info, stack_info, StackInfo};
