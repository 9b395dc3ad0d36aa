//! Landsat Collection-2 Level-2 band set and the band stack container

use crate::error::{Error, Result};
use crate::raster::{Mask, Raster};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The fixed set of bands consumed by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Band {
    /// Blue
    #[serde(rename = "SR_B2")]
    SrB2,
    /// Green
    #[serde(rename = "SR_B3")]
    SrB3,
    /// Red
    #[serde(rename = "SR_B4")]
    SrB4,
    /// Near infrared
    #[serde(rename = "SR_B5")]
    SrB5,
    /// Shortwave infrared 1
    #[serde(rename = "SR_B6")]
    SrB6,
    /// Shortwave infrared 2
    #[serde(rename = "SR_B7")]
    SrB7,
    /// Thermal infrared (surface temperature product)
    #[serde(rename = "ST_B10")]
    StB10,
    /// Pixel quality flags
    #[serde(rename = "QA_PIXEL")]
    QaPixel,
}

/// How a band's digital numbers map to physical units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandGroup {
    /// Surface reflectance
    Optical,
    /// Brightness temperature in kelvin
    Thermal,
    /// Bit-packed flags, never scaled
    Quality,
}

impl Band {
    pub const ALL: [Band; 8] = [
        Band::SrB2,
        Band::SrB3,
        Band::SrB4,
        Band::SrB5,
        Band::SrB6,
        Band::SrB7,
        Band::StB10,
        Band::QaPixel,
    ];

    /// The six reflective bands used by the albedo proxy, blue to SWIR2
    pub const OPTICAL: [Band; 6] = [
        Band::SrB2,
        Band::SrB3,
        Band::SrB4,
        Band::SrB5,
        Band::SrB6,
        Band::SrB7,
    ];

    pub const BLUE: Band = Band::SrB2;
    pub const GREEN: Band = Band::SrB3;
    pub const RED: Band = Band::SrB4;
    pub const NIR: Band = Band::SrB5;
    pub const THERMAL: Band = Band::StB10;
    pub const QA: Band = Band::QaPixel;

    /// Product band name
    pub fn name(&self) -> &'static str {
        match self {
            Band::SrB2 => "SR_B2",
            Band::SrB3 => "SR_B3",
            Band::SrB4 => "SR_B4",
            Band::SrB5 => "SR_B5",
            Band::SrB6 => "SR_B6",
            Band::SrB7 => "SR_B7",
            Band::StB10 => "ST_B10",
            Band::QaPixel => "QA_PIXEL",
        }
    }

    pub fn group(&self) -> BandGroup {
        match self {
            Band::StB10 => BandGroup::Thermal,
            Band::QaPixel => BandGroup::Quality,
            _ => BandGroup::Optical,
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Band {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Band::ALL
            .iter()
            .copied()
            .find(|b| b.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidParameter {
                name: "band",
                value: s.to_string(),
                reason: "expected one of SR_B2..SR_B7, ST_B10, QA_PIXEL".into(),
            })
    }
}

/// Ordered mapping from band to raster, plus a stack-level validity mask.
///
/// All bands share one grid (shape, transform, CRS). Operations return a
/// new stack; a stack is never mutated once built.
#[derive(Debug, Clone)]
pub struct BandStack {
    bands: BTreeMap<Band, Raster<f64>>,
    mask: Mask,
}

impl BandStack {
    /// Build a stack from its bands. The stack mask starts as the AND of
    /// every band's mask.
    pub fn new(bands: BTreeMap<Band, Raster<f64>>) -> Result<Self> {
        let mut iter = bands.values();
        let first = iter
            .next()
            .ok_or_else(|| Error::Other("band stack needs at least one band".into()))?;
        let mut mask = first.mask().clone();
        for raster in iter {
            first.check_aligned(raster)?;
            mask.and_assign(raster.mask())?;
        }
        Ok(Self { bands, mask })
    }

    /// Build a stack from `(band, raster)` pairs
    pub fn from_bands<I>(bands: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Band, Raster<f64>)>,
    {
        Self::new(bands.into_iter().collect())
    }

    pub fn band(&self, band: Band) -> Result<&Raster<f64>> {
        self.bands
            .get(&band)
            .ok_or_else(|| Error::MissingBand(band.name().to_string()))
    }

    pub fn contains(&self, band: Band) -> bool {
        self.bands.contains_key(&band)
    }

    /// Band names in stack order
    pub fn band_names(&self) -> Vec<Band> {
        self.bands.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Band, &Raster<f64>)> {
        self.bands.iter().map(|(b, r)| (*b, r))
    }

    pub fn mask(&self) -> &Mask {
        &self.mask
    }

    pub fn shape(&self) -> (usize, usize) {
        self.mask.shape()
    }

    /// Any band, used as the grid template
    pub fn template(&self) -> &Raster<f64> {
        // `new` rejects empty stacks
        self.bands
            .values()
            .next()
            .unwrap_or_else(|| unreachable!("band stack is never empty"))
    }

    /// Return a new stack with `mask` ANDed into the stack mask and into
    /// every band's own mask.
    pub fn with_mask(&self, mask: &Mask) -> Result<Self> {
        let bands = self
            .bands
            .iter()
            .map(|(b, r)| Ok((*b, r.masked(mask)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        Ok(Self {
            bands,
            mask: self.mask.and(mask)?,
        })
    }

    /// Return a new stack with each band replaced by `f(band, raster)`
    pub fn map_bands<F>(&self, mut f: F) -> Result<Self>
    where
        F: FnMut(Band, &Raster<f64>) -> Result<Raster<f64>>,
    {
        let bands = self
            .bands
            .iter()
            .map(|(b, r)| Ok((*b, f(*b, r)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        let mut stack = Self::new(bands)?;
        stack.mask.and_assign(&self.mask)?;
        Ok(stack)
    }
}
