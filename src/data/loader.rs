// ============================================================
// Layer 4: TSV Loader
// ============================================================
// Reads labelled examples from a tab-separated text file:
//
//   # comment lines and blank lines are ignored
//   pos<TAB>a warm and funny film
//   neg<TAB>two hours i will never get back
//
// Only the first tab splits label from text, so the text
// itself may contain further tabs.

use anyhow::{bail, Context, Result};
use std::{fs, path::PathBuf};

use crate::domain::sample::LabeledText;
use crate::domain::traits::TextSource;

/// Loads `label<TAB>text` lines from one file.
/// Implements the TextSource trait from Layer 3.
pub struct TsvLoader {
    path: PathBuf,
}

impl TsvLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TextSource for TsvLoader {
    fn load_all(&self) -> Result<Vec<LabeledText>> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read '{}'", self.path.display()))?;

        let samples = parse_tsv(&content)
            .with_context(|| format!("Malformed data file '{}'", self.path.display()))?;

        tracing::info!(
            "Loaded {} labelled examples from '{}'",
            samples.len(),
            self.path.display()
        );
        Ok(samples)
    }
}

/// Parse TSV content. Line numbers in errors are 1-based.
pub fn parse_tsv(content: &str) -> Result<Vec<LabeledText>> {
    let mut samples = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim_end_matches('\r');

        if trimmed.trim().is_empty() || trimmed.trim_start().starts_with('#') {
            continue;
        }

        let Some((label, text)) = trimmed.split_once('\t') else {
            bail!("line {line_no}: expected '<label>\\t<text>', found no tab");
        };

        let label = label.trim();
        if label.is_empty() {
            bail!("line {line_no}: empty label");
        }
        if text.trim().is_empty() {
            tracing::warn!("line {}: empty text for label '{}', skipping", line_no, label);
            continue;
        }

        samples.push(LabeledText::new(label, text));
    }

    Ok(samples)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parses_lines() {
        let samples = parse_tsv("pos\tgood film\nneg\tbad\tfilm\n").unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0], LabeledText::new("pos", "good film"));
        // only the first tab separates label from text
        assert_eq!(samples[1].text, "bad\tfilm");
    }

    #[test]
    fn test_skips_comments_and_blank_lines() {
        let samples = parse_tsv("# header\n\npos\tok\r\n   \n").unwrap();
        assert_eq!(samples, vec![LabeledText::new("pos", "ok")]);
    }

    #[test]
    fn test_skips_empty_text() {
        let samples = parse_tsv("pos\t   \nneg\tfine\n").unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].label, "neg");
    }

    #[test]
    fn test_missing_tab_reports_line() {
        let err = parse_tsv("pos\tok\nno tab here\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_empty_label() {
        assert!(parse_tsv(" \ttext\n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "a\tfirst").unwrap();
        writeln!(file, "b\tsecond").unwrap();

        let samples = TsvLoader::new(file.path()).load_all().unwrap();
        assert_eq!(samples.len(), 2);
    }

    #[test]
    fn test_missing_file() {
        let loader = TsvLoader::new("/definitely/not/here.tsv");
        assert!(loader.load_all().is_err());
    }
}
