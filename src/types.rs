//! Shared types and enums used across MODPRO.
//! Includes the supported `Product` set, the `BandSubset` selector parsed
//! from the classic 0/1 bit-string, and the quality-code width marker.
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The universal missing-data sentinel every product's fill value is
/// normalised to before anything leaves the matrix builder.
pub const SENTINEL: f64 = 9999.0;

/// MODIS Terra land products the pipeline knows how to process.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Debug, Serialize, Deserialize)]
pub enum Product {
    /// Surface reflectance, 8-day
    #[value(name = "mod09a1")]
    Mod09A1,
    /// Land surface temperature, 8-day
    #[value(name = "mod11a2")]
    Mod11A2,
    /// Vegetation indices (NDVI/EVI), 16-day
    #[value(name = "mod13q1")]
    Mod13Q1,
    /// LAI/FPAR, 8-day
    #[value(name = "mod15a2")]
    Mod15A2,
    /// Gross primary productivity, 8-day
    #[value(name = "mod17a2")]
    Mod17A2,
}

impl Product {
    /// Archive dataset id, collection included (directory name on LP DAAC).
    pub fn dataset_id(&self) -> &'static str {
        match self {
            Product::Mod09A1 => "MOD09A1.005",
            Product::Mod11A2 => "MOD11A2.005",
            Product::Mod13Q1 => "MOD13Q1.005",
            Product::Mod15A2 => "MOD15A2.005",
            Product::Mod17A2 => "MOD17A2.005",
        }
    }

    /// Native temporal cadence in days.
    pub fn cadence_days(&self) -> u32 {
        match self {
            Product::Mod13Q1 => 16,
            _ => 8,
        }
    }
}

impl std::fmt::Display for Product {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dataset_id())
    }
}

/// Integer width of a product's bit-packed quality codes. Decides the cast
/// applied before the reliability bit is tested.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum QualityBits {
    U8,
    U16,
}

/// Which of a product's fixed bands to pull out of each granule, parsed
/// from the archive-order bit-string (e.g. `"1 1 1 0 0 0 0 0 0 0 0 1"`).
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct BandSubset {
    flags: Vec<bool>,
}

impl BandSubset {
    /// Parse a selector string of 0s and 1s, whitespace optional.
    pub fn parse(s: &str) -> Result<Self> {
        let mut flags = Vec::new();
        for c in s.chars() {
            match c {
                '1' => flags.push(true),
                '0' => flags.push(false),
                c if c.is_whitespace() => {}
                _ => {
                    return Err(Error::InvalidArgument {
                        arg: "subset",
                        value: s.to_string(),
                    });
                }
            }
        }
        if flags.is_empty() {
            return Err(Error::InvalidArgument {
                arg: "subset",
                value: s.to_string(),
            });
        }
        Ok(BandSubset { flags })
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Number of selected bands.
    pub fn selected_count(&self) -> usize {
        self.flags.iter().filter(|&&f| f).count()
    }

    /// Archive-order indices of the selected bands.
    pub fn selected_indices(&self) -> Vec<usize> {
        self.flags
            .iter()
            .enumerate()
            .filter_map(|(i, &f)| f.then_some(i))
            .collect()
    }

    pub fn is_selected(&self, band: usize) -> bool {
        self.flags.get(band).copied().unwrap_or(false)
    }

    /// The selector in the `0 1`-string form GDAL mosaicking tools expect.
    pub fn as_bit_string(&self) -> String {
        self.flags
            .iter()
            .map(|&f| if f { "1" } else { "0" })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl std::fmt::Display for BandSubset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_bit_string())
    }
}
