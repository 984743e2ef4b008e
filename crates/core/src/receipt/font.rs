//! Script detection for mixed-language documents.

use serde::{Deserialize, Serialize};

/// The three embedded fonts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Font {
    /// Thai script.
    Thai,
    /// CJK ideographs.
    Cjk,
    /// Latin / Helvetica fallback.
    Latin,
}

/// Picks the font for a string by the first non-Latin script it contains.
///
/// Thai wins over CJK when both appear, matching the regulator forms where
/// Thai labels dominate mixed strings.
#[must_use]
pub fn detect_script(text: &str) -> Font {
    let mut saw_cjk = false;
    for c in text.chars() {
        let code = c as u32;
        if (0x0E00..=0x0E7F).contains(&code) {
            return Font::Thai;
        }
        if (0x4E00..=0x9FFF).contains(&code)
            || (0x3400..=0x4DBF).contains(&code)
            || (0x3000..=0x30FF).contains(&code)
        {
            saw_cjk = true;
        }
    }
    if saw_cjk {
        Font::Cjk
    } else {
        Font::Latin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latin() {
        assert_eq!(detect_script("John Smith"), Font::Latin);
        assert_eq!(detect_script("700-012-69-5"), Font::Latin);
        assert_eq!(detect_script(""), Font::Latin);
    }

    #[test]
    fn test_thai() {
        assert_eq!(detect_script("สมชาย"), Font::Thai);
        assert_eq!(detect_script("Somchai สมชาย"), Font::Thai);
    }

    #[test]
    fn test_cjk() {
        assert_eq!(detect_script("王小明"), Font::Cjk);
    }

    #[test]
    fn test_thai_wins_over_cjk() {
        assert_eq!(detect_script("王 สมชาย"), Font::Thai);
    }
}
