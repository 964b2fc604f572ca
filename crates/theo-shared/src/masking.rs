//! Result of one masking pass.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::entity::DetectedEntities;
use crate::mapping::MaskMapping;

/// Confidence assigned to each placeholder recovered without its original
pub const RECOVERED_ENTITY_CONFIDENCE: f32 = 0.8;

/// Overall confidence of a salvaged result
pub const RECOVERED_OVERALL_CONFIDENCE: f32 = 0.7;

/// Entity confidence when the model omits one
pub const DEFAULT_ENTITY_CONFIDENCE: f32 = 0.9;

/// Inputs longer than this with zero detections need a manual look
pub const REVIEW_THRESHOLD_CHARS: usize = 500;

/// Which path produced a masking result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recovery {
    /// Structured response parsed and validated
    Parsed,
    /// Masked text salvaged from a malformed response
    Salvaged,
    /// Nothing usable came back; the input is returned unmasked
    Passthrough,
}

impl fmt::Display for Recovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parsed => write!(f, "parsed"),
            Self::Salvaged => write!(f, "salvaged"),
            Self::Passthrough => write!(f, "passthrough"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MaskingResult {
    pub original_text: String,
    pub masked_text: String,
    pub detected_entities: DetectedEntities,
    pub mask_mapping: MaskMapping,
    pub confidence: f32,
    pub recovery: Recovery,
    /// Detected originals that could not be located verbatim in the text.
    /// Those values are still in `masked_text`.
    pub dropped_entities: usize,
}

impl MaskingResult {
    /// Unmasked passthrough with zero confidence
    pub fn passthrough(text: &str) -> Self {
        Self {
            original_text: text.to_string(),
            masked_text: text.to_string(),
            detected_entities: DetectedEntities::new(),
            mask_mapping: MaskMapping::new(),
            confidence: 0.0,
            recovery: Recovery::Passthrough,
            dropped_entities: 0,
        }
    }

    pub fn entity_count(&self) -> usize {
        self.detected_entities.len()
    }

    pub fn has_detections(&self) -> bool {
        !self.detected_entities.is_empty()
    }

    /// The result came from a degraded path
    pub fn is_degraded(&self) -> bool {
        self.recovery != Recovery::Parsed
    }

    /// Zero detections on a long input is suspicious
    pub fn is_suspiciously_clean(&self, threshold_chars: usize) -> bool {
        !self.has_detections() && self.original_text.chars().count() > threshold_chars
    }

    /// Whether a human should look before the text leaves
    pub fn needs_manual_review(&self, threshold_chars: usize) -> bool {
        self.recovery == Recovery::Passthrough
            || self.dropped_entities > 0
            || self.is_suspiciously_clean(threshold_chars)
    }
}
