use std::fmt::Write;

use serde::Serialize;

use crate::editing::{InsertionPointId, InsertionPoints};
use crate::emphasis::EmphasisState;
use crate::models::{ColorToken, Document, Paragraph, ParagraphId, Sentence, SentenceId};

/// Immutable render view of the document plus caret and highlight state.
///
/// The rendering surface draws from snapshots and never touches the
/// document directly. Per paragraph the order is: separator before, start
/// slot, then each sentence followed by the slot after it, then separator
/// after.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// Document version for change detection
    pub version: u64,
    pub title: String,
    pub paragraphs: Vec<ParagraphView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParagraphView {
    pub id: ParagraphId,
    pub separator_before: InsertionPointView,
    pub start: InsertionPointView,
    pub sentences: Vec<SentenceSlot>,
    pub separator_after: InsertionPointView,
}

/// A sentence and the insertion point directly after it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentenceSlot {
    pub sentence: SentenceView,
    pub after: InsertionPointView,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsertionPointView {
    pub id: InsertionPointId,
    pub content: String,
    pub is_focused: bool,
    pub show_solid_cursor: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentenceView {
    pub id: SentenceId,
    pub text: String,
    pub remark_count: usize,
    pub open_remark_count: usize,
    /// Shown while any remark on the sentence is still open
    pub show_remark_marker: bool,
    pub remark_color: Option<ColorToken>,
    pub is_editing: bool,
    pub is_emphasized: bool,
    /// The hovered remark marker belongs to this sentence
    pub is_hovered_remark_owner: bool,
}

impl Snapshot {
    /// Every insertion point in reading order
    pub fn insertion_points(&self) -> Vec<&InsertionPointView> {
        self.paragraphs
            .iter()
            .flat_map(|p| {
                [&p.separator_before, &p.start]
                    .into_iter()
                    .chain(p.sentences.iter().map(|s| &s.after))
                    .chain(std::iter::once(&p.separator_after))
            })
            .collect()
    }

    pub fn sentences(&self) -> impl Iterator<Item = &SentenceView> {
        self.paragraphs
            .iter()
            .flat_map(|p| p.sentences.iter().map(|s| &s.sentence))
    }

    pub fn sentence(&self, id: &SentenceId) -> Option<&SentenceView> {
        self.sentences().find(|s| &s.id == id)
    }
}

pub fn create_snapshot(
    doc: &Document,
    points: &InsertionPoints,
    emphasis: &EmphasisState,
    editing: Option<&SentenceId>,
) -> Snapshot {
    let point = |id: InsertionPointId| InsertionPointView {
        content: points.content(&id).to_string(),
        is_focused: points.is_focused(&id),
        show_solid_cursor: points.shows_solid_cursor(&id),
        id,
    };

    let paragraph_view = |paragraph: &Paragraph| ParagraphView {
        id: paragraph.id.clone(),
        separator_before: point(InsertionPointId::separator_before(&paragraph.id)),
        start: point(InsertionPointId::start(&paragraph.id)),
        sentences: paragraph
            .sentences
            .iter()
            .enumerate()
            .map(|(index, sentence)| SentenceSlot {
                sentence: sentence_view(sentence, emphasis, editing),
                after: point(InsertionPointId::after_sentence(&paragraph.id, index)),
            })
            .collect(),
        separator_after: point(InsertionPointId::separator_after(&paragraph.id)),
    };

    Snapshot {
        version: doc.version(),
        title: doc.title().to_string(),
        paragraphs: doc.paragraphs().iter().map(paragraph_view).collect(),
    }
}

fn sentence_view(
    sentence: &Sentence,
    emphasis: &EmphasisState,
    editing: Option<&SentenceId>,
) -> SentenceView {
    let open_remark_count = sentence.open_remarks().count();
    let is_hovered_remark_owner = emphasis
        .hovered_remark_id
        .as_ref()
        .is_some_and(|hovered| sentence.remarks.iter().any(|r| &r.id == hovered));

    SentenceView {
        id: sentence.id.clone(),
        text: sentence.text.clone(),
        remark_count: sentence.remarks.len(),
        open_remark_count,
        show_remark_marker: open_remark_count > 0,
        remark_color: sentence.remark_color.clone(),
        is_editing: editing == Some(&sentence.id),
        is_emphasized: emphasis.is_sentence_emphasized(&sentence.id),
        is_hovered_remark_owner,
    }
}

/// Compact textual outline of a snapshot
pub fn format_snapshot(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {} (v{})", snapshot.title, snapshot.version);

    for paragraph in &snapshot.paragraphs {
        let _ = writeln!(out, "{}", paragraph.id);
        format_point(&mut out, &paragraph.separator_before);
        format_point(&mut out, &paragraph.start);
        for slot in &paragraph.sentences {
            format_sentence(&mut out, &slot.sentence);
            format_point(&mut out, &slot.after);
        }
        format_point(&mut out, &paragraph.separator_after);
    }

    out
}

fn format_point(out: &mut String, point: &InsertionPointView) {
    let _ = write!(out, "  | {}", point.id);
    if !point.content.is_empty() {
        let _ = write!(out, " {:?}", point.content);
    }
    if point.is_focused {
        out.push_str(" <focused>");
    }
    if point.show_solid_cursor {
        out.push_str(" <hint>");
    }
    out.push('\n');
}

fn format_sentence(out: &mut String, sentence: &SentenceView) {
    let _ = write!(out, "  {} {:?}", sentence.id, sentence.text);
    if sentence.remark_count > 0 {
        let _ = write!(
            out,
            " remarks={}/{}",
            sentence.open_remark_count, sentence.remark_count
        );
    }
    if let Some(color) = &sentence.remark_color {
        let _ = write!(out, " color={}", color.0);
    }
    for (flag, label) in [
        (sentence.show_remark_marker, "marker"),
        (sentence.is_editing, "editing"),
        (sentence.is_emphasized, "emphasized"),
        (sentence.is_hovered_remark_owner, "hovered"),
    ] {
        if flag {
            let _ = write!(out, " <{label}>");
        }
    }
    out.push('\n');
}
