use serde::Serialize;
use std::sync::Arc;

use crate::models::{IdGenerator, ParagraphId, RemarkId, SentenceId};

/// Opaque color token a rendering layer maps to a highlight color
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ColorToken(pub String);

impl From<&str> for ColorToken {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

/// An annotation attached to a sentence.
///
/// `sentence_id` is a back-reference only; the owning sentence holds the
/// remark in its `remarks` list. `rejoined` only ever goes from false to true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Remark {
    pub id: RemarkId,
    pub text: String,
    pub sentence_id: SentenceId,
    pub rejoined: bool,
}

impl Remark {
    pub fn is_open(&self) -> bool {
        !self.rejoined
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sentence {
    pub id: SentenceId,
    pub text: String,
    pub remarks: Vec<Remark>,
    pub remark_color: Option<ColorToken>,
}

impl Sentence {
    pub fn new(id: SentenceId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            remarks: Vec::new(),
            remark_color: None,
        }
    }

    /// Remarks that have not been rejoined, in list order
    pub fn open_remarks(&self) -> impl Iterator<Item = &Remark> {
        self.remarks.iter().filter(|r| r.is_open())
    }

    pub fn has_open_remarks(&self) -> bool {
        self.remarks.iter().any(Remark::is_open)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paragraph {
    pub id: ParagraphId,
    pub sentences: Vec<Sentence>,
}

impl Paragraph {
    pub fn new(id: ParagraphId, sentences: Vec<Sentence>) -> Self {
        Self { id, sentences }
    }

    pub fn sentence_index(&self, sentence_id: &SentenceId) -> Option<usize> {
        self.sentences.iter().position(|s| &s.id == sentence_id)
    }
}

/// Where a sentence lives inside the paragraph sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentenceLocation {
    pub paragraph_index: usize,
    pub sentence_index: usize,
}

/// The paragraph/sentence/remark tree.
///
/// The paragraph sequence is shared behind an `Arc` and replaced wholesale on
/// every structural change (see `editing::commands`). A view taken before an
/// edit keeps the sequence it was built from, and readers never see a
/// half-applied splice.
#[derive(Debug, Clone)]
pub struct Document {
    pub(crate) title: String,
    pub(crate) paragraphs: Arc<Vec<Paragraph>>,
    pub(crate) ids: IdGenerator,
    pub(crate) version: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new("")
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        // Id generator state is bookkeeping, not content
        self.title == other.title
            && self.paragraphs == other.paragraphs
            && self.version == other.version
    }
}

impl Document {
    pub fn new(title: impl Into<String>) -> Self {
        Self::from_paragraphs(title, Vec::new())
    }

    pub fn from_paragraphs(title: impl Into<String>, paragraphs: Vec<Paragraph>) -> Self {
        Self {
            title: title.into(),
            paragraphs: Arc::new(paragraphs),
            ids: IdGenerator::default(),
            version: 0,
        }
    }

    /// Swap the id source, e.g. for predictable ids in tests
    pub fn with_id_generator(mut self, ids: IdGenerator) -> Self {
        self.ids = ids;
        self
    }

    /// The two-paragraph document a fresh session starts with
    pub fn sample() -> Self {
        let paragraph = |id: &str, sentences: &[(&str, &str)]| {
            Paragraph::new(
                ParagraphId::from(id),
                sentences
                    .iter()
                    .map(|(id, text)| Sentence::new(SentenceId::from(*id), *text))
                    .collect(),
            )
        };

        Self::from_paragraphs(
            "Document Title",
            vec![
                paragraph(
                    "p1",
                    &[
                        ("s1", "This is the first sentence of the first paragraph."),
                        ("s2", "Here is the second sentence."),
                        ("s3", "The third sentence follows."),
                        (
                            "s4",
                            "This is the fourth and final sentence of the first paragraph.",
                        ),
                    ],
                ),
                paragraph(
                    "p2",
                    &[
                        ("s5", "The second paragraph begins with this sentence."),
                        ("s6", "Here is the second sentence of the second paragraph."),
                        ("s7", "The third sentence continues the thought."),
                        ("s8", "This final sentence concludes the second paragraph."),
                    ],
                ),
            ],
        )
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn paragraphs(&self) -> &[Paragraph] {
        &self.paragraphs
    }

    /// Shared handle to the current paragraph sequence
    pub fn shared_paragraphs(&self) -> Arc<Vec<Paragraph>> {
        Arc::clone(&self.paragraphs)
    }

    /// Version counter incremented on each successful edit
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }

    pub fn sentence_count(&self) -> usize {
        self.paragraphs.iter().map(|p| p.sentences.len()).sum()
    }

    pub fn sentences(&self) -> impl Iterator<Item = &Sentence> {
        self.paragraphs.iter().flat_map(|p| p.sentences.iter())
    }

    pub fn paragraph(&self, paragraph_id: &ParagraphId) -> Option<&Paragraph> {
        self.paragraphs.iter().find(|p| &p.id == paragraph_id)
    }

    pub fn paragraph_index(&self, paragraph_id: &ParagraphId) -> Option<usize> {
        self.paragraphs.iter().position(|p| &p.id == paragraph_id)
    }

    pub fn locate_sentence(&self, sentence_id: &SentenceId) -> Option<SentenceLocation> {
        locate_sentence(&self.paragraphs, sentence_id)
    }

    pub fn sentence(&self, sentence_id: &SentenceId) -> Option<&Sentence> {
        let loc = self.locate_sentence(sentence_id)?;
        Some(&self.paragraphs[loc.paragraph_index].sentences[loc.sentence_index])
    }

    /// The paragraph currently holding a sentence
    pub fn paragraph_of(&self, sentence_id: &SentenceId) -> Option<&Paragraph> {
        let loc = self.locate_sentence(sentence_id)?;
        Some(&self.paragraphs[loc.paragraph_index])
    }

    pub fn remark(&self, remark_id: &RemarkId) -> Option<&Remark> {
        self.sentences()
            .flat_map(|s| s.remarks.iter())
            .find(|r| &r.id == remark_id)
    }

    /// Whether any paragraph, sentence or remark already uses this id
    pub fn contains_id(&self, id: &str) -> bool {
        contains_id(&self.paragraphs, id)
    }

    pub(crate) fn fresh_paragraph_id(&mut self, paragraphs: &[Paragraph]) -> ParagraphId {
        loop {
            let id = self.ids.paragraph_id();
            if !contains_id(paragraphs, id.as_str()) {
                return id;
            }
        }
    }

    pub(crate) fn fresh_sentence_id(&mut self, paragraphs: &[Paragraph]) -> SentenceId {
        loop {
            let id = self.ids.sentence_id();
            if !contains_id(paragraphs, id.as_str()) {
                return id;
            }
        }
    }

    pub(crate) fn fresh_remark_id(&mut self, paragraphs: &[Paragraph]) -> RemarkId {
        loop {
            let id = self.ids.remark_id();
            if !contains_id(paragraphs, id.as_str()) {
                return id;
            }
        }
    }
}

pub(crate) fn locate_sentence(
    paragraphs: &[Paragraph],
    sentence_id: &SentenceId,
) -> Option<SentenceLocation> {
    paragraphs
        .iter()
        .enumerate()
        .find_map(|(paragraph_index, p)| {
            p.sentence_index(sentence_id)
                .map(|sentence_index| SentenceLocation {
                    paragraph_index,
                    sentence_index,
                })
        })
}

pub(crate) fn contains_id(paragraphs: &[Paragraph], id: &str) -> bool {
    paragraphs.iter().any(|p| {
        p.id.as_str() == id
            || p.sentences.iter().any(|s| {
                s.id.as_str() == id || s.remarks.iter().any(|r| r.id.as_str() == id)
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_document_shape() {
        let doc = Document::sample();

        assert_eq!(doc.title(), "Document Title");
        assert_eq!(doc.paragraphs().len(), 2);
        assert_eq!(doc.sentence_count(), 8);
        assert_eq!(doc.version(), 0);
    }

    #[test]
    fn test_locate_sentence() {
        let doc = Document::sample();

        let loc = doc.locate_sentence(&SentenceId::from("s6")).unwrap();
        assert_eq!(
            loc,
            SentenceLocation {
                paragraph_index: 1,
                sentence_index: 1
            }
        );
        assert!(doc.locate_sentence(&SentenceId::from("missing")).is_none());
    }

    #[test]
    fn test_paragraph_of_sentence() {
        let doc = Document::sample();
        let paragraph = doc.paragraph_of(&SentenceId::from("s3")).unwrap();
        assert_eq!(paragraph.id, ParagraphId::from("p1"));
    }

    #[test]
    fn test_fresh_ids_skip_ids_already_in_use() {
        let mut doc = Document::sample().with_id_generator(IdGenerator::sequential());
        let paragraphs = doc.shared_paragraphs();

        // s1..s8 and p1, p2 are taken by the sample content
        let sentence_id = doc.fresh_sentence_id(&paragraphs);
        assert!(!doc.contains_id(sentence_id.as_str()));

        let paragraph_id = doc.fresh_paragraph_id(&paragraphs);
        assert_ne!(paragraph_id, ParagraphId::from("p1"));
        assert_ne!(paragraph_id, ParagraphId::from("p2"));
    }

    #[test]
    fn test_open_remarks_skip_rejoined() {
        let mut sentence = Sentence::new(SentenceId::from("s1"), "Hello.");
        sentence.remarks = vec![
            Remark {
                id: RemarkId::from("r1"),
                text: "one".to_string(),
                sentence_id: SentenceId::from("s1"),
                rejoined: true,
            },
            Remark {
                id: RemarkId::from("r2"),
                text: "two".to_string(),
                sentence_id: SentenceId::from("s1"),
                rejoined: false,
            },
        ];

        let open: Vec<_> = sentence.open_remarks().map(|r| r.id.as_str()).collect();
        assert_eq!(open, vec!["r2"]);
        assert!(sentence.has_open_remarks());
    }
}
