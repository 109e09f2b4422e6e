//! Band catalog — the label → band-mask mapping for this device family.
//!
//! Built once before the run from configuration and read-only afterwards.

use std::collections::HashSet;

use thiserror::Error;

use crate::models::BandDefinition;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("duplicate band label: {0}")]
    DuplicateLabel(String),
    #[error("band {label}: mask {mask:?} is not a hex value")]
    BadMask { label: String, mask: String },
    #[error("catalog has no bands")]
    Empty,
}

/// Ordered, label-unique set of band definitions.
#[derive(Debug, Clone)]
pub struct BandCatalog {
    bands: Vec<BandDefinition>,
}

impl BandCatalog {
    /// Validate and build a catalog. Labels must be unique and every mask
    /// must be a hex value the device will accept.
    pub fn new(bands: Vec<BandDefinition>) -> Result<Self, CatalogError> {
        if bands.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut seen = HashSet::new();
        for band in &bands {
            if !seen.insert(band.label.as_str()) {
                return Err(CatalogError::DuplicateLabel(band.label.clone()));
            }
            if band.mask.is_empty() || !band.mask.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(CatalogError::BadMask {
                    label: band.label.clone(),
                    mask: band.mask.clone(),
                });
            }
        }
        Ok(Self { bands })
    }

    /// Look up a band by its label.
    pub fn get(&self, label: &str) -> Option<&BandDefinition> {
        self.bands.iter().find(|b| b.label == label)
    }

    pub fn bands(&self) -> &[BandDefinition] {
        &self.bands
    }

    /// The known single-band masks for Huawei portable routers.
    ///
    /// Masks differ between models and firmware revisions; if a switch is
    /// rejected for one of these, confirm the mask with a capture.
    pub fn huawei_defaults() -> Self {
        Self::new(default_bands()).expect("default catalog is valid")
    }
}

/// Default Huawei band set: FDD bands plus the common TDD bands, and the
/// all-bands `Auto` mask used to restore normal operation.
pub fn default_bands() -> Vec<BandDefinition> {
    [
        ("Auto", "3FFFFFFF"),
        ("B1", "1"),
        ("B3", "4"),
        ("B5", "10"),
        ("B7", "40"),
        ("B8", "80"),
        ("B34", "200000000"),
        ("B38", "4000000000"),
        ("B39", "8000000000"),
        ("B40", "10000000000"),
        ("B41", "20000000000"),
    ]
    .into_iter()
    .map(|(label, mask)| BandDefinition {
        label: label.to_string(),
        mask: mask.to_string(),
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn band(label: &str, mask: &str) -> BandDefinition {
        BandDefinition {
            label: label.to_string(),
            mask: mask.to_string(),
        }
    }

    #[test]
    fn lookup_by_label() {
        let catalog = BandCatalog::huawei_defaults();
        assert_eq!(catalog.get("B3").unwrap().mask, "4");
        assert_eq!(catalog.get("Auto").unwrap().mask, "3FFFFFFF");
        assert!(catalog.get("B999").is_none());
    }

    #[test]
    fn duplicate_labels_rejected() {
        let result = BandCatalog::new(vec![band("B1", "1"), band("B1", "4")]);
        assert!(matches!(result, Err(CatalogError::DuplicateLabel(l)) if l == "B1"));
    }

    #[test]
    fn non_hex_mask_rejected() {
        let result = BandCatalog::new(vec![band("B1", "0xZZ")]);
        assert!(matches!(result, Err(CatalogError::BadMask { .. })));
    }

    #[test]
    fn empty_catalog_rejected() {
        assert!(matches!(BandCatalog::new(Vec::new()), Err(CatalogError::Empty)));
    }
}
