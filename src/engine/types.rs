//! Text map data types

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::geometry::BoundingBox;

/// Finest addressable text unit, associated to a block geometrically
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    /// `<block_id>-word-<n>`
    pub id: String,
    pub text: String,
    pub bbox: BoundingBox,
    /// Owning block
    pub block_id: String,
}

/// Outcome of associating page words with one block
///
/// Word data is an enrichment of the text map: a failure here never fails
/// the block, but it stays distinguishable from "nothing matched".
#[derive(Debug, Clone, PartialEq, Default)]
pub enum WordExtraction {
    Found(Vec<Word>),
    #[default]
    Empty,
    Failed(String),
}

impl WordExtraction {
    pub fn from_words(words: Vec<Word>) -> Self {
        if words.is_empty() {
            Self::Empty
        } else {
            Self::Found(words)
        }
    }

    /// Words to expose, empty for `Empty` and `Failed`
    pub fn words(&self) -> &[Word] {
        match self {
            Self::Found(words) => words,
            Self::Empty | Self::Failed(_) => &[],
        }
    }

    pub fn is_absent(&self) -> bool {
        self.words().is_empty()
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

fn serialize_words<S>(words: &WordExtraction, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    words.words().serialize(serializer)
}

fn deserialize_words<'de, D>(deserializer: D) -> Result<WordExtraction, D::Error>
where
    D: Deserializer<'de>,
{
    let words = Option::<Vec<Word>>::deserialize(deserializer)?;
    Ok(WordExtraction::from_words(words.unwrap_or_default()))
}

/// Contiguous region of page text as segmented by the PDF library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    /// `page-<page_number>-block-<n>`
    pub id: String,
    pub page_number: usize,
    pub bbox: BoundingBox,
    /// Raw block text, trailing whitespace stripped
    pub text: String,
    #[serde(
        default,
        skip_serializing_if = "WordExtraction::is_absent",
        serialize_with = "serialize_words",
        deserialize_with = "deserialize_words"
    )]
    pub words: WordExtraction,
}

/// Per-page structured description handed to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextMap {
    pub document_id: String,
    pub page_number: usize,
    pub page_width: f32,
    pub page_height: f32,
    pub blocks: Vec<TextBlock>,
}

impl TextMap {
    pub fn find_block(&self, block_id: &str) -> Option<&TextBlock> {
        self.blocks.iter().find(|b| b.id == block_id)
    }

    /// Exact id match first, then the `page-P-block-B-word-W` ordinal fallback.
    pub fn find_word(&self, word_id: &str) -> Option<&Word> {
        let exact = self
            .blocks
            .iter()
            .flat_map(|b| b.words.words())
            .find(|w| w.id == word_id);
        if exact.is_some() {
            return exact;
        }

        let (block_ordinal, word_ordinal) = parse_word_ordinals(word_id)?;
        self.blocks
            .get(block_ordinal.checked_sub(1)?)?
            .words
            .words()
            .get(word_ordinal.checked_sub(1)?)
    }

    /// A few word ids to help callers recover from a bad lookup
    pub fn sample_word_ids(&self, limit: usize) -> Vec<String> {
        self.blocks
            .iter()
            .take(3)
            .flat_map(|b| b.words.words().iter().take(3))
            .take(limit)
            .map(|w| w.id.clone())
            .collect()
    }
}

/// Parse `page-P-block-B-word-W` into `(B, W)`.
fn parse_word_ordinals(word_id: &str) -> Option<(usize, usize)> {
    let parts: Vec<&str> = word_id.split('-').collect();
    match parts.as_slice() {
        ["page", _, "block", block, "word", word, ..] => {
            Some((block.parse().ok()?, word.parse().ok()?))
        }
        _ => None,
    }
}
