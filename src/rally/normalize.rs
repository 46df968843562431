//! Cleans raw OCR records into canonical records.
//!
//! OCR output of the rally list is noisy: stray control characters, trailing
//! ellipses, doubled separators and bars picked up from the panel borders.
//! Normalization removes those artifacts and maps status text onto the
//! closed `RallyStatus` set.

use super::record::{Field, NormalizedRecord, RallyStatus, RawSlotRecord};

/// Characters trimmed from either end of a field after cleaning.
const EDGE_ARTIFACTS: &[char] = &['|', '~', '_', '`', '\'', '"', ',', ';', ':'];

/// Ordered list of statuses recognized in status text.
///
/// Matching is by case-insensitive prefix and the first entry that matches
/// wins, so more specific labels should come first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusVocabulary {
    statuses: Vec<RallyStatus>,
}

impl StatusVocabulary {
    /// Builds a vocabulary, dropping `Unknown` and duplicate entries.
    pub fn new(statuses: &[RallyStatus]) -> Self {
        let mut deduped: Vec<RallyStatus> = Vec::with_capacity(statuses.len());
        for status in statuses {
            if status.is_known() && !deduped.contains(status) {
                deduped.push(*status);
            }
        }
        Self { statuses: deduped }
    }

    pub fn statuses(&self) -> &[RallyStatus] {
        &self.statuses
    }

    /// Maps status text onto a known status, or `Unknown` when nothing matches.
    pub fn match_status(&self, text: &str) -> RallyStatus {
        let lowered = text.to_lowercase();
        let word = lowered.trim_start_matches(|c: char| !c.is_alphabetic());
        if word.is_empty() {
            return RallyStatus::Unknown;
        }

        self.statuses
            .iter()
            .copied()
            .find(|status| word.starts_with(status.label()))
            .unwrap_or(RallyStatus::Unknown)
    }
}

impl Default for StatusVocabulary {
    fn default() -> Self {
        Self::new(&[
            RallyStatus::Preparing,
            RallyStatus::Marching,
            RallyStatus::Battling,
            RallyStatus::Returning,
        ])
    }
}

/// Normalizes one raw record.
///
/// Returns `None` when both player and target are empty after cleaning,
/// which is what an unoccupied slot looks like. An unrecognized status
/// never causes rejection.
pub fn normalize(raw: &RawSlotRecord, vocabulary: &StatusVocabulary) -> Option<NormalizedRecord> {
    let player = clean_text(&raw.player_text);
    let target = clean_text(&raw.target_text);

    if player.is_empty() && target.is_empty() {
        return None;
    }

    let status = vocabulary.match_status(&clean_text(&raw.status_text));

    Some(NormalizedRecord {
        slot_index: raw.slot_index,
        player: Field::from_cleaned(player),
        target: Field::from_cleaned(target),
        status,
    })
}

/// Strips OCR artifacts from a single field.
pub fn clean_text(text: &str) -> String {
    // Control and zero-width characters become separators
    let printable: String = text
        .chars()
        .map(|c| if is_non_printable(c) { ' ' } else { c })
        .collect();

    let stripped = strip_punctuation_runs(&printable);

    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

    collapsed
        .trim_matches(|c: char| EDGE_ARTIFACTS.contains(&c) || c.is_whitespace())
        .to_string()
}

fn is_non_printable(c: char) -> bool {
    c.is_control() || matches!(c, '\u{200B}'..='\u{200D}' | '\u{2060}' | '\u{FEFF}')
}

fn is_bracket(c: char) -> bool {
    matches!(c, '[' | ']' | '(' | ')' | '{' | '}')
}

/// Removes runs of two or more identical punctuation characters.
///
/// Bracket runs collapse to a single bracket so clan tags survive a doubled read.
fn strip_punctuation_runs(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let mut run_end = i + 1;
        if c.is_ascii_punctuation() {
            while run_end < chars.len() && chars[run_end] == c {
                run_end += 1;
            }
        }

        let run_len = run_end - i;
        if run_len == 1 || is_bracket(c) {
            out.push(c);
        }
        i = run_end;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(player: &str, target: &str, status: &str) -> RawSlotRecord {
        RawSlotRecord::new(0, player, target, status)
    }

    #[test]
    fn test_clean_text_keeps_clan_tag() {
        assert_eq!(clean_text("  [D08K]DKGoku F2P \n"), "[D08K]DKGoku F2P");
    }

    #[test]
    fn test_clean_text_strips_artifacts() {
        assert_eq!(clean_text("Preparing..."), "Preparing");
        assert_eq!(clean_text("| Lvl 3  Barbarian\tFort ~"), "Lvl 3 Barbarian Fort");
        assert_eq!(clean_text("Bat\u{0007}tling"), "Bat tling");
        assert_eq!(clean_text("\u{FEFF}Alice"), "Alice");
        assert_eq!(clean_text("[[XYZ]]Player"), "[XYZ]Player");
        assert_eq!(clean_text("--"), "");
        assert_eq!(clean_text("   "), "");
    }

    #[test]
    fn test_clean_text_keeps_single_punctuation() {
        assert_eq!(clean_text("Lvl. 5 Fort"), "Lvl. 5 Fort");
    }

    #[test]
    fn test_match_status_prefix_case_insensitive() {
        let vocab = StatusVocabulary::default();
        assert_eq!(vocab.match_status("Preparing"), RallyStatus::Preparing);
        assert_eq!(vocab.match_status("BATTLING"), RallyStatus::Battling);
        assert_eq!(vocab.match_status("> marching 00:41"), RallyStatus::Marching);
        assert_eq!(vocab.match_status("Returning"), RallyStatus::Returning);
    }

    #[test]
    fn test_match_status_unknown() {
        let vocab = StatusVocabulary::default();
        assert_eq!(vocab.match_status(""), RallyStatus::Unknown);
        assert_eq!(vocab.match_status("Prep4ring"), RallyStatus::Unknown);
        assert_eq!(vocab.match_status("Waiting"), RallyStatus::Unknown);
    }

    #[test]
    fn test_vocabulary_restricts_matches() {
        let vocab = StatusVocabulary::new(&[RallyStatus::Battling, RallyStatus::Unknown]);
        assert_eq!(vocab.statuses(), &[RallyStatus::Battling]);
        assert_eq!(vocab.match_status("Preparing"), RallyStatus::Unknown);
        assert_eq!(vocab.match_status("Battling"), RallyStatus::Battling);
    }

    #[test]
    fn test_normalize_full_record() {
        let vocab = StatusVocabulary::default();
        let record = normalize(
            &raw("[D08K]DKGoku F2P", "Lvl 3 Barbarian Fort", "Preparing..."),
            &vocab,
        )
        .unwrap();

        assert_eq!(record.player, Field::Known("[D08K]DKGoku F2P".to_string()));
        assert_eq!(record.target, Field::Known("Lvl 3 Barbarian Fort".to_string()));
        assert_eq!(record.status, RallyStatus::Preparing);
    }

    #[test]
    fn test_normalize_rejects_empty_slot() {
        let vocab = StatusVocabulary::default();
        assert!(normalize(&raw("", "", "Battling"), &vocab).is_none());
        assert!(normalize(&raw(" .. ", "\n", ""), &vocab).is_none());
    }

    #[test]
    fn test_normalize_missing_player_is_explicit_unknown() {
        let vocab = StatusVocabulary::default();
        let record = normalize(&raw("", "Lvl 5 Barbarian Fort", "garbled"), &vocab).unwrap();
        assert_eq!(record.player, Field::Unknown);
        assert_eq!(record.status, RallyStatus::Unknown);
    }
}
