use std::time::Duration;

use crate::editing::{
    Cmd, CommitOutcome, DragCoordinator, DragSource, HoverTarget, InsertionPointId,
    InsertionPoints, Patch, Snapshot, create_snapshot,
};
use crate::emphasis::{EmphasisEvent, EmphasisState, EmphasisSync, SubmitTarget};
use crate::messages::{ContentKind, NewContent, Sender};
use crate::models::{Document, RemarkId, SentenceId};
use crate::remarks::{InlineService, RemarkManager, RemarkProducer, RemarkService};
use crate::session::{Effect, FocusTarget, Settings};

/// A sentence in editing mode and the text it had when editing began
#[derive(Debug, Clone, PartialEq, Eq)]
struct SentenceEdit {
    sentence_id: SentenceId,
    original_text: String,
}

/// One editing session: the document and every state machine around it.
///
/// Nothing here reads a clock or touches a screen. Time-dependent calls take
/// `now` as time since the session started, and requests for the rendering
/// surface and the message panel are queued as [`Effect`]s to be drained by
/// the front end. Remark text comes from a [`RemarkService`], which may
/// answer on a later tick than the one that asked.
pub struct Editor<S> {
    document: Document,
    insertion: InsertionPoints,
    remarks: RemarkManager<S>,
    emphasis: EmphasisSync,
    drag: DragCoordinator,
    editing: Option<SentenceEdit>,
    last_click: Option<(SentenceId, Duration)>,
    double_click: Duration,
    effects: Vec<Effect>,
}

impl<P: RemarkProducer> Editor<InlineService<P>> {
    /// Session whose producer answers within the tick that asks
    pub fn new(document: Document, producer: P, settings: Settings) -> Self {
        Self::with_service(document, InlineService::new(producer), settings)
    }

    /// Session seeded with the two-paragraph sample document
    pub fn with_sample_document(producer: P, settings: Settings) -> Self {
        Self::new(Document::sample(), producer, settings)
    }
}

impl<S: RemarkService> Editor<S> {
    pub fn with_service(document: Document, service: S, settings: Settings) -> Self {
        Self {
            document,
            insertion: InsertionPoints::new(settings.commit_debounce),
            remarks: RemarkManager::with_service(
                service,
                settings.remark_delays,
                settings.remark_colors,
            ),
            emphasis: EmphasisSync::new(),
            drag: DragCoordinator::new(),
            editing: None,
            last_click: None,
            double_click: settings.double_click,
            effects: Vec::new(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn insertion_points(&self) -> &InsertionPoints {
        &self.insertion
    }

    pub fn remarks(&self) -> &RemarkManager<S> {
        &self.remarks
    }

    pub fn emphasis(&self) -> &EmphasisState {
        self.emphasis.state()
    }

    pub fn drag(&self) -> &DragCoordinator {
        &self.drag
    }

    pub fn editing_sentence(&self) -> Option<&SentenceId> {
        self.editing.as_ref().map(|e| &e.sentence_id)
    }

    pub fn snapshot(&self) -> Snapshot {
        create_snapshot(
            &self.document,
            &self.insertion,
            self.emphasis.state(),
            self.editing_sentence(),
        )
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.document.set_title(title);
    }

    // Insertion points

    pub fn focus_insertion_point(&mut self, id: InsertionPointId) {
        self.insertion.focus(id.clone());
        self.effects
            .push(Effect::Focus(FocusTarget::InsertionPoint(id)));
    }

    pub fn hover_insertion_point(&mut self, id: InsertionPointId) {
        self.insertion.show_solid_cursor(id);
    }

    pub fn leave_insertion_point(&mut self) {
        self.insertion.hide_solid_cursor();
    }

    pub fn input(&mut self, id: InsertionPointId, text: impl Into<String>) {
        self.insertion.input(id, text);
    }

    /// Commit text at an insertion point and schedule remarks for the result
    pub fn commit(&mut self, id: &InsertionPointId, text: &str, now: Duration) -> CommitOutcome {
        let outcome = self.insertion.commit(&mut self.document, id, text, now);

        if let CommitOutcome::Committed(commit) = &outcome {
            self.forget_cleared_remarks(&commit.patch);
            self.remarks.schedule_remarks(&commit.sentence_id, now);
            self.effects.push(Effect::Focus(FocusTarget::InsertionPoint(
                commit.focus.clone(),
            )));
            self.announce_sentence(&commit.sentence_id);
        }

        outcome
    }

    pub fn reset_insertion_point(&mut self, id: &InsertionPointId) {
        self.insertion.reset(id);
    }

    // Sentences

    /// Click on a sentence.
    ///
    /// A single click puts the sentence into editing, focuses the insertion
    /// point after it and emphasizes it. A second click on the same sentence
    /// inside the double-click window moves the caret into the sentence text
    /// instead.
    pub fn click_sentence(&mut self, sentence_id: &SentenceId, now: Duration) {
        let Some(location) = self.document.locate_sentence(sentence_id) else {
            log::debug!("click on missing sentence {sentence_id} ignored");
            return;
        };
        let paragraph_id = self.document.paragraphs()[location.paragraph_index]
            .id
            .clone();

        let is_double = self.last_click.as_ref().is_some_and(|(last, at)| {
            last == sentence_id && now.saturating_sub(*at) <= self.double_click
        });
        self.begin_edit(sentence_id);

        if is_double {
            self.last_click = None;
            self.insertion.blur();
            let target = FocusTarget::Sentence(sentence_id.clone());
            self.effects.push(Effect::Focus(target.clone()));
            self.effects.push(Effect::PlaceCaretAtEnd(target));
            return;
        }

        self.last_click = Some((sentence_id.clone(), now));
        self.focus_insertion_point(InsertionPointId::after_sentence(
            &paragraph_id,
            location.sentence_index,
        ));
        self.emphasis
            .dispatch(EmphasisEvent::SelectSentence(sentence_id.clone()));
    }

    /// Live text update of the sentence being edited; schedules nothing
    pub fn sentence_input(&mut self, sentence_id: &SentenceId, text: impl Into<String>) {
        if self.editing_sentence() != Some(sentence_id) {
            log::debug!("input for {sentence_id} ignored: not in editing");
            return;
        }
        self.document.update_sentence_text(sentence_id, text);
    }

    /// Finish editing with `text` and schedule remarks. Returns false when
    /// the sentence no longer exists or the text is blank.
    pub fn submit_sentence_edit(
        &mut self,
        sentence_id: &SentenceId,
        text: &str,
        now: Duration,
    ) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        if !self.document.update_sentence_text(sentence_id, text) {
            return false;
        }
        if self.editing_sentence() == Some(sentence_id) {
            self.editing = None;
        }
        self.remarks.schedule_remarks(sentence_id, now);
        true
    }

    /// Leave editing, restoring the text the sentence had when editing began
    pub fn cancel_sentence_edit(&mut self) {
        let Some(edit) = self.editing.take() else {
            return;
        };
        let unchanged = self
            .document
            .sentence(&edit.sentence_id)
            .is_none_or(|s| s.text == edit.original_text);
        if !unchanged {
            self.document
                .update_sentence_text(&edit.sentence_id, edit.original_text);
        }
    }

    // Remarks

    /// Emphasize the next open remark on the sentence
    pub fn remark_marker_click(&mut self, sentence_id: &SentenceId) -> Option<RemarkId> {
        let current = self.emphasis.state().emphasized_remark();
        let next =
            self.remarks
                .cycle_emphasized_remark(&self.document, sentence_id, current.as_ref())?;

        self.emphasis.dispatch(EmphasisEvent::SelectRemark {
            remark_id: next.clone(),
            sentence_id: sentence_id.clone(),
        });
        self.effects
            .push(Effect::ScrollMessageIntoView(next.to_string()));
        Some(next)
    }

    /// Hover the sentence's remark marker: highlight the emphasized remark
    /// if it is open on this sentence, otherwise the first open one
    pub fn remark_marker_hover(&mut self, sentence_id: &SentenceId) -> Option<RemarkId> {
        let sentence = self.document.sentence(sentence_id)?;
        let emphasized = self.emphasis.state().emphasized_remark();
        let remark_id = sentence
            .open_remarks()
            .find(|r| Some(&r.id) == emphasized.as_ref())
            .or_else(|| sentence.open_remarks().next())
            .map(|r| r.id.clone())?;

        self.emphasis
            .dispatch(EmphasisEvent::HoverRemark(remark_id.clone()));
        self.effects
            .push(Effect::ScrollMessageIntoView(remark_id.to_string()));
        Some(remark_id)
    }

    pub fn remark_marker_leave(&mut self) {
        self.emphasis.dispatch(EmphasisEvent::LeaveRemark);
    }

    /// Reply to a remark: a new paragraph after its sentence, and the remark
    /// rejoined, in one update
    pub fn respond_to_remark(
        &mut self,
        remark_id: &RemarkId,
        text: &str,
        now: Duration,
    ) -> Option<SentenceId> {
        if text.trim().is_empty() {
            return None;
        }
        let Some(remark) = self.document.remark(remark_id) else {
            log::warn!("reply to missing remark {remark_id} ignored");
            return None;
        };
        let anchor = remark.sentence_id.clone();

        self.apply_new_sentence(
            Cmd::AddParagraphAfterSentence {
                anchor: Some(anchor),
                text: text.to_string(),
                rejoined_remark: Some(remark_id.clone()),
                new_id: None,
            },
            now,
        )
    }

    // Drag

    pub fn begin_drag(&mut self, sentence_id: &SentenceId) -> bool {
        let Some(location) = self.document.locate_sentence(sentence_id) else {
            return false;
        };
        self.drag.begin(DragSource {
            sentence_id: sentence_id.clone(),
            paragraph_id: self.document.paragraphs()[location.paragraph_index]
                .id
                .clone(),
            index: location.sentence_index,
        });
        true
    }

    pub fn drag_hover(&mut self, target: &HoverTarget) -> bool {
        self.drag.hover(target)
    }

    pub fn drop_drag(&mut self) -> Option<Patch> {
        let patch = self.drag.commit_move(&mut self.document)?;
        self.insertion.forget_missing(&self.document);
        Some(patch)
    }

    pub fn cancel_drag(&mut self) {
        self.drag.cancel();
    }

    // Message panel

    /// Text submitted from the message panel, placed according to the
    /// current emphasis
    pub fn new_message(&mut self, text: &str, now: Duration) -> Option<SentenceId> {
        if text.trim().is_empty() {
            return None;
        }

        match self.emphasis.state().submit_target() {
            SubmitTarget::AfterSentence(anchor) => self.apply_new_sentence(
                Cmd::AddSentenceAfter {
                    anchor,
                    text: text.to_string(),
                    new_id: None,
                },
                now,
            ),
            SubmitTarget::ReplyToRemark { remark_id, .. } => {
                self.respond_to_remark(&remark_id, text, now)
            }
            SubmitTarget::EndOfDocument => self.apply_new_sentence(
                Cmd::AddParagraphAfterSentence {
                    anchor: None,
                    text: text.to_string(),
                    rejoined_remark: None,
                    new_id: None,
                },
                now,
            ),
        }
    }

    pub fn message_click(&mut self, id: &str, kind: ContentKind) {
        let event = match kind {
            ContentKind::Sentence => {
                let sentence_id = SentenceId::from(id);
                if self.document.sentence(&sentence_id).is_none() {
                    log::debug!("message click on missing sentence {id} ignored");
                    return;
                }
                EmphasisEvent::SelectSentence(sentence_id)
            }
            ContentKind::Remark => {
                let remark_id = RemarkId::from(id);
                let Some(remark) = self.document.remark(&remark_id) else {
                    log::debug!("message click on missing remark {id} ignored");
                    return;
                };
                EmphasisEvent::SelectRemark {
                    sentence_id: remark.sentence_id.clone(),
                    remark_id,
                }
            }
        };
        self.emphasis.dispatch(event);
    }

    /// Clears emphasis, focus, every input buffer and any sentence edit
    pub fn click_empty_space(&mut self) {
        self.emphasis.dispatch(EmphasisEvent::Clear);
        self.insertion.blur();
        self.insertion.reset_all();
        self.insertion.hide_solid_cursor();
        self.cancel_sentence_edit();
        self.last_click = None;
    }

    // Time and effects

    /// Request remarks due at `now` and attach any replies that have come
    /// back. Returns how many remarks appeared.
    pub fn tick(&mut self, now: Duration) -> usize {
        let resolved = self.remarks.resolve_due(&mut self.document, now);
        let count = resolved.len();

        for remark in resolved {
            self.effects.push(Effect::NewContent(NewContent {
                text: remark.text,
                sender: Sender::Ai,
                kind: ContentKind::Remark,
                id: remark.remark_id.to_string(),
                sentence_id: Some(remark.sentence_id),
            }));
        }

        count
    }

    /// When the next scheduled remark comes due
    pub fn next_due(&self) -> Option<Duration> {
        self.remarks.queue().next_due()
    }

    pub fn drain_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    fn begin_edit(&mut self, sentence_id: &SentenceId) {
        if self.editing_sentence() == Some(sentence_id) {
            return;
        }
        // Switching sentences keeps whatever was typed into the previous one
        self.editing = self
            .document
            .sentence(sentence_id)
            .map(|s| SentenceEdit {
                sentence_id: sentence_id.clone(),
                original_text: s.text.clone(),
            });
    }

    /// Apply a sentence-creating command, then emphasize, announce and
    /// schedule remarks for the new sentence
    fn apply_new_sentence(&mut self, cmd: Cmd, now: Duration) -> Option<SentenceId> {
        let patch = self.document.apply(cmd);
        let sentence_id = patch.created_sentence?;

        self.remarks.schedule_remarks(&sentence_id, now);
        self.emphasis
            .dispatch(EmphasisEvent::SelectSentence(sentence_id.clone()));
        self.announce_sentence(&sentence_id);
        Some(sentence_id)
    }

    fn announce_sentence(&mut self, sentence_id: &SentenceId) {
        let Some(sentence) = self.document.sentence(sentence_id) else {
            return;
        };
        self.effects.push(Effect::NewContent(NewContent {
            text: sentence.text.clone(),
            sender: Sender::User,
            kind: ContentKind::Sentence,
            id: sentence_id.to_string(),
            sentence_id: None,
        }));
    }

    /// Emphasis must not point at remarks a commit just cleared
    fn forget_cleared_remarks(&mut self, patch: &Patch) {
        if patch.cleared_remarks.is_empty() {
            return;
        }
        let cleared =
            |id: Option<&RemarkId>| id.is_some_and(|id| patch.cleared_remarks.contains(id));
        let state = self.emphasis.state();
        let emphasized_gone = cleared(state.emphasized_remark().as_ref());
        let hovered_gone = cleared(state.hovered_remark_id.as_ref());

        if emphasized_gone {
            self.emphasis.dispatch(EmphasisEvent::Clear);
        } else if hovered_gone {
            self.emphasis.dispatch(EmphasisEvent::LeaveRemark);
        }
    }
}
