use std::sync::Arc;

use thiserror::Error;

use crate::editing::Patch;
use crate::models::document::{contains_id, locate_sentence};
use crate::models::{
    ColorToken, Document, Paragraph, ParagraphId, Remark, RemarkId, Sentence, SentenceId,
};

/// Structural edits to a [`Document`].
///
/// Every mutation of the paragraph tree goes through one of these, applied
/// with [`Document::apply`] or [`Document::try_apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cmd {
    SetTitle {
        title: String,
    },
    /// New paragraph holding one sentence; out-of-range indexes append
    InsertParagraph {
        index: usize,
        text: String,
    },
    /// Splice a sentence into an existing paragraph; out-of-range indexes append
    AddSentenceAt {
        paragraph_id: ParagraphId,
        index: usize,
        text: String,
    },
    AddSentenceAfter {
        anchor: SentenceId,
        text: String,
        new_id: Option<SentenceId>,
    },
    /// New paragraph after the anchor's paragraph, or at the end when there is
    /// no anchor. Optionally rejoins a remark in the same update.
    AddParagraphAfterSentence {
        anchor: Option<SentenceId>,
        text: String,
        rejoined_remark: Option<RemarkId>,
        new_id: Option<SentenceId>,
    },
    UpdateSentenceText {
        sentence_id: SentenceId,
        text: String,
    },
    MoveSentence {
        sentence_id: SentenceId,
        from: ParagraphId,
        to: ParagraphId,
        to_index: usize,
    },
    AppendRemark {
        sentence_id: SentenceId,
        text: String,
        color: Option<ColorToken>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("sentence {0} not found")]
    SentenceNotFound(SentenceId),
    #[error("paragraph {0} not found")]
    ParagraphNotFound(ParagraphId),
    #[error("remark {0} not found")]
    RemarkNotFound(RemarkId),
    #[error("sentence {sentence_id} is not in paragraph {paragraph_id}")]
    SentenceNotInParagraph {
        sentence_id: SentenceId,
        paragraph_id: ParagraphId,
    },
    #[error("id {0} is already in use")]
    DuplicateId(String),
    #[error("cannot create a sentence from empty text")]
    EmptyText,
}

impl Document {
    /// Apply a command, degrading failures to a logged no-op.
    ///
    /// The returned patch has `changed == false` when the command addressed
    /// content that no longer exists or was otherwise invalid.
    pub fn apply(&mut self, cmd: Cmd) -> Patch {
        match self.try_apply(cmd) {
            Ok(patch) => patch,
            Err(e) => {
                log::warn!("edit ignored: {e}");
                Patch::unchanged(self.version)
            }
        }
    }

    /// Apply a command atomically.
    ///
    /// The edit is built on a copy of the paragraph sequence which replaces
    /// the current one only on success, so an error leaves the document
    /// exactly as it was.
    pub fn try_apply(&mut self, cmd: Cmd) -> Result<Patch, EditError> {
        let mut next: Vec<Paragraph> = (*self.paragraphs).clone();
        let mut patch = Patch::default();

        match cmd {
            Cmd::SetTitle { title } => {
                self.title = title;
            }
            Cmd::InsertParagraph { index, text } => {
                self.insert_paragraph_into(&mut next, &mut patch, index, text, None)?;
            }
            Cmd::AddSentenceAt {
                paragraph_id,
                index,
                text,
            } => {
                self.add_sentence_at_into(&mut next, &mut patch, &paragraph_id, index, text)?;
            }
            Cmd::AddSentenceAfter {
                anchor,
                text,
                new_id,
            } => {
                require_text(&text)?;
                let loc = locate_sentence(&next, &anchor)
                    .ok_or_else(|| EditError::SentenceNotFound(anchor.clone()))?;
                let id = self.claim_sentence_id(&next, new_id)?;
                next[loc.paragraph_index]
                    .sentences
                    .insert(loc.sentence_index + 1, Sentence::new(id.clone(), text));
                patch.created_sentence = Some(id);
            }
            Cmd::AddParagraphAfterSentence {
                anchor,
                text,
                rejoined_remark,
                new_id,
            } => {
                let index = match &anchor {
                    Some(anchor) => {
                        locate_sentence(&next, anchor)
                            .ok_or_else(|| EditError::SentenceNotFound(anchor.clone()))?
                            .paragraph_index
                            + 1
                    }
                    None => next.len(),
                };
                if let Some(remark_id) = rejoined_remark {
                    rejoin(&mut next, &remark_id)?;
                    patch.rejoined_remark = Some(remark_id);
                }
                self.insert_paragraph_into(&mut next, &mut patch, index, text, new_id)?;
            }
            Cmd::UpdateSentenceText { sentence_id, text } => {
                let loc = locate_sentence(&next, &sentence_id)
                    .ok_or(EditError::SentenceNotFound(sentence_id))?;
                next[loc.paragraph_index].sentences[loc.sentence_index].text = text;
            }
            Cmd::MoveSentence {
                sentence_id,
                from,
                to,
                to_index,
            } => {
                move_sentence_within(&mut next, &mut patch, &sentence_id, &from, &to, to_index)?;
            }
            Cmd::AppendRemark {
                sentence_id,
                text,
                color,
            } => {
                let loc = locate_sentence(&next, &sentence_id)
                    .ok_or_else(|| EditError::SentenceNotFound(sentence_id.clone()))?;
                let id = self.fresh_remark_id(&next);
                let sentence = &mut next[loc.paragraph_index].sentences[loc.sentence_index];
                sentence.remarks.push(Remark {
                    id: id.clone(),
                    text,
                    sentence_id,
                    rejoined: false,
                });
                if sentence.remark_color.is_none() {
                    sentence.remark_color = color;
                }
                patch.created_remark = Some(id);
            }
        }

        self.paragraphs = Arc::new(next);
        self.version += 1;
        patch.changed = true;
        patch.version = self.version;
        Ok(patch)
    }

    /// Insert a paragraph with one sentence at `index` (clamped to append).
    pub fn insert_paragraph(
        &mut self,
        index: usize,
        text: impl Into<String>,
    ) -> Option<(ParagraphId, SentenceId)> {
        let patch = self.apply(Cmd::InsertParagraph {
            index,
            text: text.into(),
        });
        patch.created_paragraph.zip(patch.created_sentence)
    }

    /// Splice a sentence into a paragraph.
    ///
    /// When the sentence just before `index` still has an open remark, its
    /// whole remark list is cleared, rejoined remarks included: text typed
    /// into a remark slot consumes it. A list holding only rejoined remarks
    /// is left alone.
    pub fn add_sentence_at(
        &mut self,
        paragraph_id: &ParagraphId,
        index: usize,
        text: impl Into<String>,
    ) -> Option<SentenceId> {
        self.apply(Cmd::AddSentenceAt {
            paragraph_id: paragraph_id.clone(),
            index,
            text: text.into(),
        })
        .created_sentence
    }

    pub fn add_sentence_after(
        &mut self,
        anchor: &SentenceId,
        text: impl Into<String>,
        new_id: Option<SentenceId>,
    ) -> Option<SentenceId> {
        self.apply(Cmd::AddSentenceAfter {
            anchor: anchor.clone(),
            text: text.into(),
            new_id,
        })
        .created_sentence
    }

    pub fn add_paragraph_after_sentence(
        &mut self,
        anchor: Option<&SentenceId>,
        text: impl Into<String>,
        rejoined_remark: Option<&RemarkId>,
        new_id: Option<SentenceId>,
    ) -> Option<SentenceId> {
        self.apply(Cmd::AddParagraphAfterSentence {
            anchor: anchor.cloned(),
            text: text.into(),
            rejoined_remark: rejoined_remark.cloned(),
            new_id,
        })
        .created_sentence
    }

    pub fn update_sentence_text(
        &mut self,
        sentence_id: &SentenceId,
        text: impl Into<String>,
    ) -> bool {
        self.apply(Cmd::UpdateSentenceText {
            sentence_id: sentence_id.clone(),
            text: text.into(),
        })
        .changed
    }

    pub fn move_sentence(
        &mut self,
        sentence_id: &SentenceId,
        from: &ParagraphId,
        to: &ParagraphId,
        to_index: usize,
    ) -> Patch {
        self.apply(Cmd::MoveSentence {
            sentence_id: sentence_id.clone(),
            from: from.clone(),
            to: to.clone(),
            to_index,
        })
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.apply(Cmd::SetTitle {
            title: title.into(),
        });
    }

    fn insert_paragraph_into(
        &mut self,
        next: &mut Vec<Paragraph>,
        patch: &mut Patch,
        index: usize,
        text: String,
        new_id: Option<SentenceId>,
    ) -> Result<(), EditError> {
        require_text(&text)?;
        let sentence_id = self.claim_sentence_id(next, new_id)?;
        let paragraph_id = self.fresh_paragraph_id(next);
        let index = index.min(next.len());
        next.insert(
            index,
            Paragraph::new(
                paragraph_id.clone(),
                vec![Sentence::new(sentence_id.clone(), text)],
            ),
        );
        patch.created_paragraph = Some(paragraph_id);
        patch.created_sentence = Some(sentence_id);
        Ok(())
    }

    fn add_sentence_at_into(
        &mut self,
        next: &mut [Paragraph],
        patch: &mut Patch,
        paragraph_id: &ParagraphId,
        index: usize,
        text: String,
    ) -> Result<(), EditError> {
        require_text(&text)?;
        let paragraph_index = next
            .iter()
            .position(|p| &p.id == paragraph_id)
            .ok_or_else(|| EditError::ParagraphNotFound(paragraph_id.clone()))?;
        let sentence_id = self.fresh_sentence_id(next);

        let paragraph = &mut next[paragraph_index];
        let index = index.min(paragraph.sentences.len());
        if index > 0 {
            let preceding = &mut paragraph.sentences[index - 1];
            if preceding.has_open_remarks() {
                patch
                    .cleared_remarks
                    .extend(preceding.remarks.drain(..).map(|r| r.id));
            }
        }
        paragraph
            .sentences
            .insert(index, Sentence::new(sentence_id.clone(), text));
        patch.created_sentence = Some(sentence_id);
        Ok(())
    }

    fn claim_sentence_id(
        &mut self,
        paragraphs: &[Paragraph],
        requested: Option<SentenceId>,
    ) -> Result<SentenceId, EditError> {
        match requested {
            Some(id) if contains_id(paragraphs, id.as_str()) => {
                Err(EditError::DuplicateId(id.to_string()))
            }
            Some(id) => Ok(id),
            None => Ok(self.fresh_sentence_id(paragraphs)),
        }
    }
}

fn require_text(text: &str) -> Result<(), EditError> {
    if text.trim().is_empty() {
        Err(EditError::EmptyText)
    } else {
        Ok(())
    }
}

/// Mark a remark rejoined. Rejoining twice leaves it rejoined.
fn rejoin(paragraphs: &mut [Paragraph], remark_id: &RemarkId) -> Result<(), EditError> {
    let remark = paragraphs
        .iter_mut()
        .flat_map(|p| p.sentences.iter_mut())
        .flat_map(|s| s.remarks.iter_mut())
        .find(|r| &r.id == remark_id)
        .ok_or_else(|| EditError::RemarkNotFound(remark_id.clone()))?;
    remark.rejoined = true;
    Ok(())
}

fn move_sentence_within(
    paragraphs: &mut Vec<Paragraph>,
    patch: &mut Patch,
    sentence_id: &SentenceId,
    from: &ParagraphId,
    to: &ParagraphId,
    to_index: usize,
) -> Result<(), EditError> {
    let from_index = paragraphs
        .iter()
        .position(|p| &p.id == from)
        .ok_or_else(|| EditError::ParagraphNotFound(from.clone()))?;
    if !paragraphs.iter().any(|p| &p.id == to) {
        return Err(EditError::ParagraphNotFound(to.clone()));
    }
    let sentence_index = paragraphs[from_index]
        .sentence_index(sentence_id)
        .ok_or_else(|| EditError::SentenceNotInParagraph {
            sentence_id: sentence_id.clone(),
            paragraph_id: from.clone(),
        })?;

    let sentence = paragraphs[from_index].sentences.remove(sentence_index);

    // Looked up again: the source may sit before or after the target
    let target = paragraphs
        .iter_mut()
        .find(|p| &p.id == to)
        .ok_or_else(|| EditError::ParagraphNotFound(to.clone()))?;
    let index = to_index.min(target.sentences.len());
    target.sentences.insert(index, sentence);

    if paragraphs[from_index].sentences.is_empty() {
        let removed = paragraphs.remove(from_index);
        patch.removed_paragraphs.push(removed.id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IdGenerator;
    use crate::tests::{document_with_remarks, open_remark, sentence_texts};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn empty_doc() -> Document {
        Document::new("Untitled").with_id_generator(IdGenerator::sequential())
    }

    #[test]
    fn test_insert_paragraph_into_empty_document() {
        let mut doc = empty_doc();

        let (paragraph_id, sentence_id) = doc.insert_paragraph(0, "Hello.").unwrap();

        assert_eq!(doc.paragraphs().len(), 1);
        assert_eq!(doc.paragraphs()[0].id, paragraph_id);
        assert_eq!(doc.sentence(&sentence_id).unwrap().text, "Hello.");
        assert_eq!(doc.version(), 1);
    }

    #[rstest]
    #[case(0, vec!["New.", "A.", "B."])]
    #[case(1, vec!["A.", "New.", "B."])]
    #[case(2, vec!["A.", "B.", "New."])]
    #[case(99, vec!["A.", "B.", "New."])]
    fn test_insert_paragraph_index_is_clamped(
        #[case] index: usize,
        #[case] expected: Vec<&str>,
    ) {
        let mut doc = empty_doc();
        doc.insert_paragraph(0, "A.");
        doc.insert_paragraph(1, "B.");

        doc.insert_paragraph(index, "New.");

        let firsts: Vec<_> = doc
            .paragraphs()
            .iter()
            .map(|p| p.sentences[0].text.as_str())
            .collect();
        assert_eq!(firsts, expected);
    }

    #[test]
    fn test_add_sentence_at_splices_into_paragraph() {
        let mut doc = Document::sample();
        let p1 = ParagraphId::from("p1");

        let id = doc.add_sentence_at(&p1, 1, "Inserted.").unwrap();

        let paragraph = doc.paragraph(&p1).unwrap();
        assert_eq!(paragraph.sentences.len(), 5);
        assert_eq!(paragraph.sentences[1].id, id);
    }

    #[test]
    fn test_add_sentence_at_clears_open_remarks_of_preceding_sentence() {
        let mut doc = document_with_remarks();
        let p1 = ParagraphId::from("p1");

        let patch = doc.apply(Cmd::AddSentenceAt {
            paragraph_id: p1.clone(),
            index: 1,
            text: "Reply.".to_string(),
        });

        assert_eq!(
            patch.cleared_remarks,
            vec![RemarkId::from("r1"), RemarkId::from("r2")]
        );
        assert!(doc.sentence(&SentenceId::from("s1")).unwrap().remarks.is_empty());
    }

    #[test]
    fn test_add_sentence_at_clears_rejoined_remarks_alongside_open_ones() {
        let mut doc = document_with_remarks();
        doc.apply(Cmd::AddParagraphAfterSentence {
            anchor: Some(SentenceId::from("s1")),
            text: "My reply.".to_string(),
            rejoined_remark: Some(RemarkId::from("r1")),
            new_id: None,
        });
        assert!(doc.remark(&RemarkId::from("r1")).unwrap().rejoined);

        let patch = doc.apply(Cmd::AddSentenceAt {
            paragraph_id: ParagraphId::from("p1"),
            index: 1,
            text: "Reply.".to_string(),
        });

        assert_eq!(
            patch.cleared_remarks,
            vec![RemarkId::from("r1"), RemarkId::from("r2")]
        );
        assert!(doc.sentence(&SentenceId::from("s1")).unwrap().remarks.is_empty());
        assert!(doc.remark(&RemarkId::from("r1")).is_none());
    }

    #[test]
    fn test_add_sentence_at_keeps_fully_rejoined_remarks() {
        let mut s1 = Sentence::new(SentenceId::from("s1"), "The cat sat.");
        s1.remarks = vec![Remark {
            rejoined: true,
            ..open_remark("r1", "s1", "Which cat?")
        }];
        let mut doc = Document::from_paragraphs(
            "Remarks",
            vec![Paragraph::new(ParagraphId::from("p1"), vec![s1])],
        )
        .with_id_generator(IdGenerator::sequential());

        let patch = doc.apply(Cmd::AddSentenceAt {
            paragraph_id: ParagraphId::from("p1"),
            index: 1,
            text: "Reply.".to_string(),
        });

        assert!(patch.changed);
        assert!(patch.cleared_remarks.is_empty());
        assert_eq!(doc.sentence(&SentenceId::from("s1")).unwrap().remarks.len(), 1);
    }

    #[test]
    fn test_add_sentence_at_start_keeps_remarks() {
        let mut doc = document_with_remarks();

        doc.add_sentence_at(&ParagraphId::from("p1"), 0, "Opening.");

        assert_eq!(doc.sentence(&SentenceId::from("s1")).unwrap().remarks.len(), 2);
    }

    #[test]
    fn test_add_sentence_at_unknown_paragraph_is_noop() {
        let mut doc = Document::sample();
        let before = doc.clone();

        let result = doc.try_apply(Cmd::AddSentenceAt {
            paragraph_id: ParagraphId::from("nope"),
            index: 0,
            text: "Lost.".to_string(),
        });

        assert_eq!(
            result,
            Err(EditError::ParagraphNotFound(ParagraphId::from("nope")))
        );
        assert_eq!(doc, before);
    }

    #[test]
    fn test_add_sentence_after_anchor() {
        let mut doc = Document::sample();

        let id = doc
            .add_sentence_after(&SentenceId::from("s2"), "After two.", Some(SentenceId::from("x")))
            .unwrap();

        assert_eq!(id, SentenceId::from("x"));
        assert_eq!(
            sentence_texts(&doc, "p1")[..3],
            [
                "This is the first sentence of the first paragraph.",
                "Here is the second sentence.",
                "After two."
            ]
        );
    }

    #[test]
    fn test_add_sentence_after_missing_anchor_leaves_document_unchanged() {
        let mut doc = Document::sample();
        let before = doc.clone();

        let id = doc.add_sentence_after(&SentenceId::from("ghost"), "Nope.", None);

        assert_eq!(id, None);
        assert_eq!(doc, before);
    }

    #[test]
    fn test_add_sentence_after_rejects_duplicate_id() {
        let mut doc = Document::sample();

        let result = doc.try_apply(Cmd::AddSentenceAfter {
            anchor: SentenceId::from("s1"),
            text: "Dup.".to_string(),
            new_id: Some(SentenceId::from("s5")),
        });

        assert_eq!(result, Err(EditError::DuplicateId("s5".to_string())));
    }

    #[test]
    fn test_add_paragraph_after_sentence_without_anchor_appends() {
        let mut doc = Document::sample();

        let id = doc
            .add_paragraph_after_sentence(None, "The end.", None, None)
            .unwrap();

        let last = doc.paragraphs().last().unwrap();
        assert_eq!(last.sentences.len(), 1);
        assert_eq!(last.sentences[0].id, id);
    }

    #[test]
    fn test_add_paragraph_after_sentence_rejoins_remark_atomically() {
        let mut doc = document_with_remarks();

        let patch = doc.apply(Cmd::AddParagraphAfterSentence {
            anchor: Some(SentenceId::from("s1")),
            text: "My reply.".to_string(),
            rejoined_remark: Some(RemarkId::from("r1")),
            new_id: None,
        });

        assert!(patch.changed);
        assert_eq!(patch.rejoined_remark, Some(RemarkId::from("r1")));
        assert_eq!(doc.paragraphs().len(), 3);
        assert_eq!(doc.paragraphs()[1].sentences[0].text, "My reply.");
        assert!(doc.remark(&RemarkId::from("r1")).unwrap().rejoined);
        assert!(!doc.remark(&RemarkId::from("r2")).unwrap().rejoined);
    }

    #[test]
    fn test_add_paragraph_with_unknown_remark_changes_nothing() {
        let mut doc = document_with_remarks();
        let before = doc.clone();

        let result = doc.try_apply(Cmd::AddParagraphAfterSentence {
            anchor: Some(SentenceId::from("s1")),
            text: "Reply.".to_string(),
            rejoined_remark: Some(RemarkId::from("r404")),
            new_id: None,
        });

        assert_eq!(result, Err(EditError::RemarkNotFound(RemarkId::from("r404"))));
        assert_eq!(doc, before);
    }

    #[test]
    fn test_rejoining_twice_is_not_an_error() {
        let mut doc = document_with_remarks();
        let r1 = RemarkId::from("r1");
        let s1 = SentenceId::from("s1");

        doc.add_paragraph_after_sentence(Some(&s1), "First reply.", Some(&r1), None);
        let second = doc.add_paragraph_after_sentence(Some(&s1), "Second reply.", Some(&r1), None);

        assert!(second.is_some());
        assert!(doc.remark(&r1).unwrap().rejoined);
    }

    #[test]
    fn test_update_sentence_text_has_no_remark_side_effects() {
        let mut doc = document_with_remarks();
        let s1 = SentenceId::from("s1");

        assert!(doc.update_sentence_text(&s1, "Rewritten."));

        let sentence = doc.sentence(&s1).unwrap();
        assert_eq!(sentence.text, "Rewritten.");
        assert_eq!(sentence.remarks.len(), 2);
    }

    #[test]
    fn test_empty_text_is_rejected_for_new_sentences() {
        let mut doc = Document::sample();
        let result = doc.try_apply(Cmd::InsertParagraph {
            index: 0,
            text: "   ".to_string(),
        });
        assert_eq!(result, Err(EditError::EmptyText));
        assert_eq!(doc.version(), 0);
    }

    #[test]
    fn test_move_within_paragraph() {
        let mut doc = Document::sample();
        let p1 = ParagraphId::from("p1");

        doc.move_sentence(&SentenceId::from("s1"), &p1, &p1, 2);

        let ids: Vec<_> = doc
            .paragraph(&p1)
            .unwrap()
            .sentences
            .iter()
            .map(|s| s.id.to_string())
            .collect();
        assert_eq!(ids, vec!["s2", "s3", "s1", "s4"]);
    }

    #[test]
    fn test_move_across_paragraphs_prunes_emptied_source() {
        let mut doc = empty_doc();
        let (source, only) = doc.insert_paragraph(0, "Lonely.").unwrap();
        let (target, _) = doc.insert_paragraph(1, "Company.").unwrap();

        let patch = doc.move_sentence(&only, &source, &target, 0);

        assert_eq!(patch.removed_paragraphs, vec![source.clone()]);
        assert!(doc.paragraph(&source).is_none());
        assert_eq!(doc.paragraph(&target).unwrap().sentences[0].id, only);
    }

    #[test]
    fn test_move_from_wrong_paragraph_is_rejected() {
        let mut doc = Document::sample();

        let result = doc.try_apply(Cmd::MoveSentence {
            sentence_id: SentenceId::from("s1"),
            from: ParagraphId::from("p2"),
            to: ParagraphId::from("p1"),
            to_index: 0,
        });

        assert!(matches!(
            result,
            Err(EditError::SentenceNotInParagraph { .. })
        ));
        assert_eq!(doc.sentence_count(), 8);
    }

    #[test]
    fn test_append_remark_assigns_color_once() {
        let mut doc = Document::sample().with_id_generator(IdGenerator::sequential());
        let s1 = SentenceId::from("s1");

        doc.apply(Cmd::AppendRemark {
            sentence_id: s1.clone(),
            text: "Too long.".to_string(),
            color: Some(ColorToken::from("amber")),
        });
        doc.apply(Cmd::AppendRemark {
            sentence_id: s1.clone(),
            text: "Vague.".to_string(),
            color: Some(ColorToken::from("teal")),
        });

        let sentence = doc.sentence(&s1).unwrap();
        assert_eq!(sentence.remarks.len(), 2);
        assert_eq!(sentence.remark_color, Some(ColorToken::from("amber")));
        assert!(sentence.remarks.iter().all(|r| r.sentence_id == s1));
    }

    #[test]
    fn test_snapshot_taken_before_edit_is_untouched() {
        let mut doc = Document::sample();
        let before = doc.shared_paragraphs();

        doc.insert_paragraph(0, "Fresh.");

        assert_eq!(before.len(), 2);
        assert_eq!(doc.paragraphs().len(), 3);
    }
}
