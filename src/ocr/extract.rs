use log::debug;
use regex::Regex;

use super::engine::OcrLine;
use crate::rally::{RallyStatus, RawSlotRecord, StatusVocabulary};

/// Clan tag in front of a player name, e.g. `[D08K]`
const PLAYER_PATTERN: &str = r"\[[^\[\]]{1,8}\]";

/// Words that only appear in the rally target line
const TARGET_PATTERN: &str = r"(?i)\b(lvl|level|barbarian|fort)\b";

/// Lines below this confidence are treated as unread
const MIN_CONFIDENCE: f32 = 40.0;

/// Text shorter than this cannot hold a rally entry
const MIN_TEXT_LEN: usize = 5;

/// Classifies the OCR text of a rally slot into player, target and status.
#[derive(Debug, Clone)]
pub struct RallyTextParser {
    player: Regex,
    target: Regex,
    vocabulary: StatusVocabulary,
}

impl RallyTextParser {
    pub fn new(vocabulary: StatusVocabulary) -> Result<Self, regex::Error> {
        Ok(Self {
            player: Regex::new(PLAYER_PATTERN)?,
            target: Regex::new(TARGET_PATTERN)?,
            vocabulary,
        })
    }

    /// Parses the OCR text of one slot into a raw record.
    ///
    /// Each non-empty line is classified: a line with a bracketed clan tag is the
    /// player, a line mentioning a level or fort is the target, and a line that
    /// starts with a known status word is the status. The first line of each kind
    /// wins. Fields that were not found are left empty for the normalizer.
    ///
    /// Returns None if the text is too short to be a rally or nothing was classified.
    pub fn parse(&self, slot_index: usize, text: &str) -> Option<RawSlotRecord> {
        if text.trim().len() < MIN_TEXT_LEN {
            return None;
        }

        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        if lines.len() < 2 {
            return None;
        }

        let mut record = RawSlotRecord {
            slot_index,
            ..Default::default()
        };

        for line in lines {
            if record.player_text.is_empty() && self.player.is_match(line) {
                record.player_text = line.to_string();
            } else if record.target_text.is_empty() && self.target.is_match(line) {
                record.target_text = line.to_string();
            } else if record.status_text.is_empty()
                && self.vocabulary.match_status(line) != RallyStatus::Unknown
            {
                record.status_text = line.to_string();
            }
        }

        if record.player_text.is_empty()
            && record.target_text.is_empty()
            && record.status_text.is_empty()
        {
            debug!("Slot {}: no rally fields in OCR text", slot_index + 1);
            return None;
        }

        Some(record)
    }

    /// Parses recognized lines, dropping low-confidence ones first.
    pub fn parse_lines(&self, slot_index: usize, lines: &[OcrLine]) -> Option<RawSlotRecord> {
        let text = lines
            .iter()
            .filter(|line| {
                if line.confidence < MIN_CONFIDENCE {
                    debug!(
                        "Slot {}: dropping low-confidence line {:?} ({:.0}%)",
                        slot_index + 1,
                        line.text,
                        line.confidence
                    );
                    return false;
                }
                true
            })
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        self.parse(slot_index, &text)
    }
}
