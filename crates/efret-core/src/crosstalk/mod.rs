pub mod coefficients;
pub mod registration;
pub mod set;

pub use coefficients::{
    CalibrationKind, Coefficient, CoefficientEstimate, CoefficientSample, CrosstalkCoefficients,
    CrosstalkEstimate,
};
pub use registration::{
    CalibrationRegistration, CorrectedCalibration, RegistrationMeta, SegmentedCalibration,
};
pub use set::{
    process_calibration, process_stacks, CrosstalkReport, CrosstalkSet, RegistrationFailure,
};
