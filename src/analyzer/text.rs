//! Assembling block text from recognized lines.

use std::borrow::Cow;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use super::LogicalizerConfig;

/// Joins line texts into the text of a logical block.
#[derive(Debug, Clone)]
pub struct TextAssembler {
    dehyphenate: bool,
    normalize_unicode: bool,
    hyphen_break: Regex,
    compound_break: Regex,
}

impl TextAssembler {
    /// Create an assembler following the logicalizer options.
    pub fn new(config: &LogicalizerConfig) -> Self {
        Self {
            dehyphenate: config.dehyphenate,
            normalize_unicode: config.normalize_unicode,
            // "infor-\nmation" -> "information"
            hyphen_break: Regex::new(r"(\p{L})-\n(\p{Ll})").unwrap(),
            // "Franco-\nPrussian" -> "Franco-Prussian"
            compound_break: Regex::new(r"(\p{L})-\n").unwrap(),
        }
    }

    /// Join lines in reading order.
    ///
    /// Lines are trimmed and empty ones dropped. Words hyphenated across a
    /// line break are rejoined (a capitalized continuation keeps its
    /// hyphen), every other break becomes a single space.
    pub fn assemble<'a>(&self, lines: impl IntoIterator<Item = &'a str>) -> String {
        let joined = lines
            .into_iter()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        let text = if self.dehyphenate {
            self.dehyphenated(joined).replace('\n', " ")
        } else {
            joined.replace('\n', " ")
        };

        if self.normalize_unicode {
            text.nfc().collect()
        } else {
            text
        }
    }

    /// Repair hyphenated breaks in newline-joined text.
    ///
    /// A match consumes the letter the next break may need ("a-\nb-\nc"),
    /// so the lowercase rule repeats until nothing changes. Only a hyphen
    /// after a letter counts; a lone "-" bullet keeps its break.
    fn dehyphenated(&self, mut text: String) -> String {
        loop {
            let next = match self.hyphen_break.replace_all(&text, "$1$2") {
                Cow::Owned(next) => next,
                Cow::Borrowed(_) => break,
            };
            text = next;
        }
        self.compound_break.replace_all(&text, "$1-").into_owned()
    }
}

impl Default for TextAssembler {
    fn default() -> Self {
        Self::new(&LogicalizerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_with_spaces() {
        let assembler = TextAssembler::default();
        assert_eq!(assembler.assemble(["Hello,", "world!"]), "Hello, world!");
        assert_eq!(assembler.assemble(["  a ", "", "b"]), "a b");
        assert_eq!(assembler.assemble(Vec::<&str>::new()), "");
    }

    #[test]
    fn test_hyphenation_fix() {
        let assembler = TextAssembler::default();
        assert_eq!(
            assembler.assemble(["the infor-", "mation age"]),
            "the information age"
        );
        assert_eq!(assembler.assemble(["Franco-", "Prussian"]), "Franco-Prussian");

        assert_eq!(assembler.assemble(["a-", "b-", "c"]), "abc");
        assert_eq!(assembler.assemble(["pre-", "Post-", "war"]), "pre-Postwar");

        let keep = TextAssembler::new(&LogicalizerConfig::new().with_dehyphenate(false));
        assert_eq!(keep.assemble(["infor-", "mation"]), "infor- mation");
    }

    #[test]
    fn test_bullet_dash_keeps_its_space() {
        let assembler = TextAssembler::default();
        assert_eq!(assembler.assemble(["-", "item"]), "- item");
        assert_eq!(assembler.assemble(["costs 5 -", "10"]), "costs 5 - 10");
    }

    #[test]
    fn test_unicode_normalization() {
        let assembler = TextAssembler::default();
        // "e" + combining acute accent -> precomposed "é"
        assert_eq!(assembler.assemble(["cafe\u{0301}"]), "caf\u{00e9}");
    }
}
