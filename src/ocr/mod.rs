//! Slot OCR: screenshot region → raw rally record.
//!
//! Each slot region is cropped, binarized and read with Tesseract, then the
//! recognized lines are classified into player, target and status text.

pub mod engine;
pub mod extract;
pub mod preprocess;
pub mod setup;

pub use engine::Tesseract;
pub use extract::RallyTextParser;
pub use setup::ensure_tesseract;

use image::RgbaImage;
use log::debug;
use thiserror::Error;

use crate::config::RelativeRect;
use crate::rally::RawSlotRecord;
use preprocess::{binarize_otsu, crop_region};

/// Extraction of a single slot failed. Never escapes the extractor.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("slot {0} is not configured")]
    UnknownSlot(usize),

    #[error("slot region is empty at this resolution")]
    EmptyRegion,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to write OCR input: {0}")]
    Image(#[from] image::ImageError),

    #[error("Tesseract failed: {0}")]
    Tesseract(String),
}

/// Reads one slot of a captured frame.
pub trait RegionExtractor {
    /// Returns the raw record for `slot_index`, or None if nothing could be read.
    fn extract(&self, img: &RgbaImage, slot_index: usize) -> Option<RawSlotRecord>;

    fn slot_count(&self) -> usize;

    /// Extracts every configured slot. Failed slots are simply absent.
    fn extract_all(&self, img: &RgbaImage) -> Vec<RawSlotRecord> {
        (0..self.slot_count())
            .filter_map(|slot| self.extract(img, slot))
            .collect()
    }
}

/// Tesseract-backed extractor over fixed slot regions.
#[derive(Debug, Clone)]
pub struct SlotExtractor {
    regions: Vec<RelativeRect>,
    tesseract: Tesseract,
    parser: RallyTextParser,
}

impl SlotExtractor {
    pub fn new(regions: Vec<RelativeRect>, tesseract: Tesseract, parser: RallyTextParser) -> Self {
        Self {
            regions,
            tesseract,
            parser,
        }
    }

    fn try_extract(
        &self,
        img: &RgbaImage,
        slot_index: usize,
    ) -> Result<Option<RawSlotRecord>, ExtractError> {
        let region = self
            .regions
            .get(slot_index)
            .ok_or(ExtractError::UnknownSlot(slot_index))?;

        let cropped = crop_region(img, region);
        if cropped.width() == 0 || cropped.height() == 0 {
            return Err(ExtractError::EmptyRegion);
        }

        let binary = binarize_otsu(&cropped);
        let lines = self.tesseract.recognize(&binary)?;
        Ok(self.parser.parse_lines(slot_index, &lines))
    }
}

impl RegionExtractor for SlotExtractor {
    fn extract(&self, img: &RgbaImage, slot_index: usize) -> Option<RawSlotRecord> {
        match self.try_extract(img, slot_index) {
            Ok(Some(record)) => {
                debug!(
                    "Slot {}: player={:?} target={:?} status={:?}",
                    slot_index + 1,
                    record.player_text,
                    record.target_text,
                    record.status_text
                );
                Some(record)
            }
            Ok(None) => None,
            Err(e) => {
                debug!("Slot {}: extraction failed: {}", slot_index + 1, e);
                None
            }
        }
    }

    fn slot_count(&self) -> usize {
        self.regions.len()
    }
}
