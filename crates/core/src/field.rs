//! Derived single-band fields and their presentation metadata

use crate::raster::Raster;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Every field the pipeline derives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    Ndvi,
    Albedo,
    SolarRadiation,
    /// Land surface temperature, °C
    Lst,
    /// Evapotranspiration downscaled to the fine grid
    Et30m,
    /// Urban heat island z-score
    Uhi,
    /// Urban thermal field variance index
    Utfvi,
}

/// Range and colour ramp a renderer should use for a field.
///
/// Purely cosmetic; never feeds back into computed values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayParams {
    pub min: f64,
    pub max: f64,
    pub palette: &'static [&'static str],
}

impl FieldKind {
    pub const ALL: [FieldKind; 7] = [
        FieldKind::Ndvi,
        FieldKind::Albedo,
        FieldKind::SolarRadiation,
        FieldKind::Lst,
        FieldKind::Et30m,
        FieldKind::Uhi,
        FieldKind::Utfvi,
    ];

    /// Band name of the single-band output
    pub fn band_name(&self) -> &'static str {
        match self {
            FieldKind::Ndvi => "NDVI",
            FieldKind::Albedo => "Albedo",
            FieldKind::SolarRadiation => "SolarRadiation",
            FieldKind::Lst => "LST",
            FieldKind::Et30m => "ET_30m",
            FieldKind::Uhi => "UHI",
            FieldKind::Utfvi => "UTFVI",
        }
    }

    /// Name used when the field is handed to the export sink, for the five
    /// exported outputs.
    pub fn export_name(&self) -> Option<&'static str> {
        match self {
            FieldKind::Lst => Some("Land_Surface_Temperature"),
            FieldKind::Et30m => Some("Evapotranspiration_30m"),
            FieldKind::SolarRadiation => Some("Solar_Radiation"),
            FieldKind::Uhi => Some("Urban_Heat_Island"),
            FieldKind::Utfvi => Some("Urban_Thermal_Field_Variance_Index"),
            FieldKind::Ndvi | FieldKind::Albedo => None,
        }
    }

    /// Declared valid range, `None` bound meaning open-ended
    pub fn valid_range(&self) -> (Option<f64>, Option<f64>) {
        match self {
            FieldKind::Ndvi => (Some(-1.0), Some(1.0)),
            FieldKind::Albedo => (Some(0.0), Some(1.0)),
            FieldKind::SolarRadiation => (Some(0.0), Some(1367.0)),
            FieldKind::Et30m => (Some(0.0), None),
            FieldKind::Lst | FieldKind::Uhi | FieldKind::Utfvi => (None, None),
        }
    }

    pub fn display(&self) -> DisplayParams {
        match self {
            FieldKind::Ndvi => DisplayParams {
                min: -1.0,
                max: 1.0,
                palette: &["white", "green"],
            },
            FieldKind::Albedo => DisplayParams {
                min: 0.0,
                max: 1.0,
                palette: &["blue", "white", "yellow"],
            },
            FieldKind::SolarRadiation => DisplayParams {
                min: 0.0,
                max: 1500.0,
                palette: &["blue", "yellow", "red"],
            },
            FieldKind::Lst => DisplayParams {
                min: 25.0,
                max: 45.0,
                palette: &["blue", "yellow", "red"],
            },
            FieldKind::Et30m => DisplayParams {
                min: 0.0,
                max: 5.0,
                palette: &["blue", "white", "green"],
            },
            FieldKind::Uhi => DisplayParams {
                min: -2.0,
                max: 2.0,
                palette: &["blue", "white", "red"],
            },
            FieldKind::Utfvi => DisplayParams {
                min: 0.0,
                max: 0.02,
                palette: &["#ffeda0", "#feb24c", "#f03b20"],
            },
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.band_name())
    }
}

/// A single-band result raster tagged with what it represents.
///
/// Resolution and CRS travel with the raster's transform and CRS.
#[derive(Debug, Clone)]
pub struct DerivedField {
    pub kind: FieldKind,
    pub raster: Raster<f64>,
}

impl DerivedField {
    pub fn new(kind: FieldKind, raster: Raster<f64>) -> Self {
        Self { kind, raster }
    }

    pub fn name(&self) -> &'static str {
        self.kind.band_name()
    }

    /// Valid cells whose value falls outside the declared range
    pub fn out_of_range_count(&self) -> usize {
        let (lo, hi) = self.kind.valid_range();
        let (rows, cols) = self.raster.shape();
        (0..rows)
            .flat_map(|r| (0..cols).map(move |c| (r, c)))
            .filter_map(|(r, c)| self.raster.value(r, c))
            .filter(|&v| lo.is_some_and(|l| v < l) || hi.is_some_and(|h| v > h))
            .count()
    }
}
