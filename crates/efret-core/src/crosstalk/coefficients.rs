use serde::{Deserialize, Serialize};

use crate::error::{FretError, Result};
use crate::frame::Channel;
use crate::stats::mean_sd;

use super::registration::RegistrationMeta;

/// Which fluorophore a calibration registration contains.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CalibrationKind {
    /// Donor-only sample; yields coefficients c and d.
    #[serde(rename = "D")]
    Donor,
    /// Acceptor-only sample; yields coefficients a and b.
    #[serde(rename = "A")]
    Acceptor,
}

impl CalibrationKind {
    /// Coefficients this kind of registration can estimate.
    pub fn coefficients(self) -> [Coefficient; 2] {
        match self {
            Self::Acceptor => [Coefficient::A, Coefficient::B],
            Self::Donor => [Coefficient::C, Coefficient::D],
        }
    }

    /// Channel whose time-mean is thresholded to find cells.
    pub fn reference_channel(self) -> Channel {
        match self {
            Self::Acceptor => Channel::AA,
            Self::Donor => Channel::DD,
        }
    }
}

impl std::fmt::Display for CalibrationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Donor => write!(f, "donor-only"),
            Self::Acceptor => write!(f, "acceptor-only"),
        }
    }
}

/// Spectral crosstalk coefficient.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Coefficient {
    /// DA / AA, acceptor bleed-through into the FRET channel.
    A,
    /// AD / AA, acceptor signal under acceptor excitation in the donor channel.
    B,
    /// AA / DD, donor signal in the acceptor channel.
    C,
    /// DA / DD, donor bleed-through into the FRET channel.
    D,
}

impl Coefficient {
    pub const ALL: [Coefficient; 4] = [Coefficient::A, Coefficient::B, Coefficient::C, Coefficient::D];

    pub fn kind(self) -> CalibrationKind {
        match self {
            Self::A | Self::B => CalibrationKind::Acceptor,
            Self::C | Self::D => CalibrationKind::Donor,
        }
    }

    /// (numerator, denominator) of the ratio image. The denominator is the
    /// pure channel, the numerator the crosstalk channel.
    pub fn ratio_channels(self) -> (Channel, Channel) {
        match self {
            Self::A => (Channel::DA, Channel::AA),
            Self::B => (Channel::AD, Channel::AA),
            Self::C => (Channel::AA, Channel::DD),
            Self::D => (Channel::DA, Channel::DD),
        }
    }
}

impl std::fmt::Display for Coefficient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A => write!(f, "a"),
            Self::B => write!(f, "b"),
            Self::C => write!(f, "c"),
            Self::D => write!(f, "d"),
        }
    }
}

/// One frame of a coefficient profile (tidy raw row).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoefficientSample {
    #[serde(flatten)]
    pub meta: RegistrationMeta,
    pub frame: usize,
    pub coefficient: Coefficient,
    pub value: f64,
}

/// Coefficient estimated from one registration: the mean of its per-frame
/// profile, with the standard deviation across frames as uncertainty.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoefficientEstimate {
    #[serde(flatten)]
    pub meta: RegistrationMeta,
    pub coefficient: Coefficient,
    pub profile: Vec<f64>,
    pub value: f64,
    pub sd: f64,
}

impl CoefficientEstimate {
    pub fn from_profile(meta: RegistrationMeta, coefficient: Coefficient, profile: Vec<f64>) -> Self {
        let (value, sd) = mean_sd(&profile);
        Self {
            meta,
            coefficient,
            profile,
            value,
            sd,
        }
    }

    pub fn samples(&self) -> Vec<CoefficientSample> {
        self.profile
            .iter()
            .enumerate()
            .map(|(frame, &value)| CoefficientSample {
                meta: self.meta.clone(),
                frame,
                coefficient: self.coefficient,
                value,
            })
            .collect()
    }
}

/// Coefficients produced by one calibration registration. The payload shape
/// follows the registration kind.
#[derive(Clone, Debug, PartialEq)]
pub enum CrosstalkEstimate {
    Acceptor {
        a: CoefficientEstimate,
        b: CoefficientEstimate,
    },
    Donor {
        c: CoefficientEstimate,
        d: CoefficientEstimate,
    },
}

impl CrosstalkEstimate {
    pub fn kind(&self) -> CalibrationKind {
        match self {
            Self::Acceptor { .. } => CalibrationKind::Acceptor,
            Self::Donor { .. } => CalibrationKind::Donor,
        }
    }

    pub fn estimates(&self) -> [&CoefficientEstimate; 2] {
        match self {
            Self::Acceptor { a, b } => [a, b],
            Self::Donor { c, d } => [c, d],
        }
    }

    pub fn get(&self, coefficient: Coefficient) -> Option<&CoefficientEstimate> {
        self.estimates()
            .into_iter()
            .find(|e| e.coefficient == coefficient)
    }

    /// One row per coefficient per frame.
    pub fn raw_samples(&self) -> Vec<CoefficientSample> {
        self.estimates()
            .iter()
            .flat_map(|e| e.samples())
            .collect()
    }

    /// One row per coefficient.
    pub fn summary(&self) -> Vec<CoefficientEstimate> {
        self.estimates().into_iter().cloned().collect()
    }
}

/// The four crosstalk coefficients used by the Fc correction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CrosstalkCoefficients {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl CrosstalkCoefficients {
    pub fn new(a: f64, b: f64, c: f64, d: f64) -> Self {
        Self { a, b, c, d }
    }

    pub fn get(&self, coefficient: Coefficient) -> f64 {
        match coefficient {
            Coefficient::A => self.a,
            Coefficient::B => self.b,
            Coefficient::C => self.c,
            Coefficient::D => self.d,
        }
    }

    /// Average every coefficient over the registrations that estimated it.
    pub fn from_estimates(estimates: &[CoefficientEstimate]) -> Result<Self> {
        let average = |coefficient: Coefficient| -> Result<f64> {
            let values: Vec<f64> = estimates
                .iter()
                .filter(|e| e.coefficient == coefficient)
                .map(|e| e.value)
                .collect();
            if values.is_empty() {
                return Err(FretError::MissingCoefficient(coefficient));
            }
            Ok(values.iter().sum::<f64>() / values.len() as f64)
        };
        Ok(Self {
            a: average(Coefficient::A)?,
            b: average(Coefficient::B)?,
            c: average(Coefficient::C)?,
            d: average(Coefficient::D)?,
        })
    }
}

impl std::fmt::Display for CrosstalkCoefficients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "a={:.4}, b={:.4}, c={:.4}, d={:.4}",
            self.a, self.b, self.c, self.d
        )
    }
}
