use image::GrayImage;
use log::trace;
use std::process::Command;
use tempfile::NamedTempFile;

use super::setup::TesseractPaths;
use super::ExtractError;

/// Represents a line of OCR text with confidence score
#[derive(Debug, Clone, PartialEq)]
pub struct OcrLine {
    pub text: String,
    pub words: Vec<OcrWord>,
    pub confidence: f32,
}

/// Represents a single word from OCR with confidence score
#[derive(Debug, Clone, PartialEq)]
pub struct OcrWord {
    pub text: String,
    pub confidence: f32,
}

/// Runs the tesseract executable on preprocessed slot images.
#[derive(Debug, Clone)]
pub struct Tesseract {
    paths: TesseractPaths,
    language: String,
}

impl Tesseract {
    pub fn new(paths: TesseractPaths, language: impl Into<String>) -> Self {
        Self {
            paths,
            language: language.into(),
        }
    }

    /// Runs Tesseract on a preprocessed grayscale image.
    /// Returns structured output with lines and confidence scores.
    pub fn recognize(&self, img: &GrayImage) -> Result<Vec<OcrLine>, ExtractError> {
        // Save image to temporary file
        let temp_input = NamedTempFile::with_suffix(".png")?;
        img.save(temp_input.path())?;

        let mut cmd = Command::new(&self.paths.executable);
        cmd.arg(temp_input.path()).arg("stdout");
        if let Some(tessdata) = &self.paths.tessdata {
            cmd.arg("--tessdata-dir").arg(tessdata);
        }
        let output = cmd
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg("6") // Assume single uniform block of text
            .arg("tsv")
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::Tesseract(stderr.trim().to_string()));
        }

        let tsv = String::from_utf8_lossy(&output.stdout);
        trace!("Tesseract TSV output:\n{}", tsv);
        Ok(parse_tsv_output(&tsv))
    }
}

/// Parses Tesseract TSV output into structured OcrLine data.
///
/// Words are grouped by (block, paragraph, line) since line numbers restart
/// in every paragraph.
pub fn parse_tsv_output(tsv: &str) -> Vec<OcrLine> {
    let mut lines: Vec<OcrLine> = Vec::new();
    let mut current_id: Option<(i32, i32, i32)> = None;
    let mut current_words: Vec<OcrWord> = Vec::new();

    // Skip header
    for row in tsv.lines().skip(1) {
        // TSV fields: level, page_num, block_num, par_num, line_num, word_num,
        //             left, top, width, height, conf, text
        let fields: Vec<&str> = row.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }

        let level: i32 = fields[0].parse().unwrap_or(-1);
        // Level 5 = word
        if level != 5 {
            continue;
        }

        let text = fields[11].trim();
        let conf: f32 = fields[10].parse().unwrap_or(-1.0);
        if text.is_empty() || conf < 0.0 {
            continue;
        }

        let id = (
            fields[2].parse().unwrap_or(-1),
            fields[3].parse().unwrap_or(-1),
            fields[4].parse().unwrap_or(-1),
        );
        if current_id.is_some_and(|current| current != id) {
            push_line(&mut lines, std::mem::take(&mut current_words));
        }
        current_id = Some(id);

        current_words.push(OcrWord {
            text: text.to_string(),
            confidence: conf,
        });
    }

    // Don't forget the last line
    push_line(&mut lines, current_words);

    lines
}

fn push_line(lines: &mut Vec<OcrLine>, words: Vec<OcrWord>) {
    if words.is_empty() {
        return;
    }
    let confidence = words.iter().map(|w| w.confidence).sum::<f32>() / words.len() as f32;
    let text = words
        .iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    lines.push(OcrLine {
        text,
        words,
        confidence,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn word(block: i32, par: i32, line: i32, conf: f32, text: &str) -> String {
        format!("5\t1\t{}\t{}\t{}\t1\t0\t0\t10\t10\t{}\t{}", block, par, line, conf, text)
    }

    #[test]
    fn test_parse_tsv_groups_lines() {
        let tsv = [
            HEADER.to_string(),
            "1\t1\t0\t0\t0\t0\t0\t0\t100\t100\t-1\t".to_string(),
            word(1, 1, 1, 91.0, "[D08K]DKGoku"),
            word(1, 1, 1, 89.0, "F2P"),
            word(1, 1, 2, 95.0, "Lvl"),
            word(1, 1, 2, 95.0, "3"),
            word(1, 2, 1, 80.0, "Preparing..."),
        ]
        .join("\n");

        let lines = parse_tsv_output(&tsv);

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].text, "[D08K]DKGoku F2P");
        assert!((lines[0].confidence - 90.0).abs() < 0.01);
        assert_eq!(lines[1].text, "Lvl 3");
        // Line number restarts in a new paragraph
        assert_eq!(lines[2].text, "Preparing...");
    }

    #[test]
    fn test_parse_tsv_skips_empty_and_negative_confidence() {
        let tsv = [
            HEADER.to_string(),
            word(1, 1, 1, -1.0, "ghost"),
            word(1, 1, 1, 70.0, " "),
            "garbage row".to_string(),
        ]
        .join("\n");

        assert!(parse_tsv_output(&tsv).is_empty());
    }
}
