use std::collections::BTreeMap;
use std::time::Duration;

use crate::editing::Cmd;
use crate::models::{ColorToken, Document, RemarkId, Sentence, SentenceId};
use crate::remarks::{
    InlineService, ProducerError, RemarkProducer, RemarkQueue, RemarkReply, RemarkRequest,
    RemarkService, RequestId,
};

/// Where a remark is in its life
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemarkState {
    /// Scheduled or requested, not yet materialized
    Pending,
    Visible,
    /// Terminal
    Rejoined,
}

/// A remark that materialized when its reply was completed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRemark {
    pub remark_id: RemarkId,
    pub sentence_id: SentenceId,
    pub text: String,
}

pub fn error_remark_text(error: &ProducerError) -> String {
    format!("Error generating remark: {error}")
}

/// Schedules remarks after sentence edits and materializes them as their
/// replies come back.
///
/// A due task becomes a request to the [`RemarkService`] and stays in flight
/// until [`RemarkManager::complete`] sees its reply.
pub struct RemarkManager<S> {
    service: S,
    queue: RemarkQueue,
    in_flight: BTreeMap<RequestId, SentenceId>,
    next_request: u64,
    delays: Vec<Duration>,
    palette: Vec<ColorToken>,
    next_color: usize,
}

impl<P: RemarkProducer> RemarkManager<InlineService<P>> {
    /// Manager whose producer runs inside [`RemarkManager::resolve_due`]
    pub fn new(producer: P, delays: Vec<Duration>, palette: Vec<ColorToken>) -> Self {
        Self::with_service(InlineService::new(producer), delays, palette)
    }
}

impl<S: RemarkService> RemarkManager<S> {
    pub fn with_service(service: S, delays: Vec<Duration>, palette: Vec<ColorToken>) -> Self {
        Self {
            service,
            queue: RemarkQueue::new(),
            in_flight: BTreeMap::new(),
            next_request: 0,
            delays,
            palette,
            next_color: 0,
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn queue(&self) -> &RemarkQueue {
        &self.queue
    }

    /// Arm one task per configured delay for this sentence
    pub fn schedule_remarks(&mut self, sentence_id: &SentenceId, now: Duration) {
        for delay in &self.delays {
            self.queue.schedule(sentence_id.clone(), now + *delay);
        }
        log::debug!(
            "scheduled {} remarks for sentence {sentence_id}",
            self.delays.len()
        );
    }

    /// Scheduled plus requested remarks for the sentence
    pub fn pending_count(&self, sentence_id: &SentenceId) -> usize {
        let requested = self
            .in_flight
            .values()
            .filter(|id| *id == sentence_id)
            .count();
        self.queue.pending_for(sentence_id) + requested
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Pending tasks first, then the attached remarks in list order
    pub fn states_for(&self, doc: &Document, sentence_id: &SentenceId) -> Vec<RemarkState> {
        let pending = std::iter::repeat_n(RemarkState::Pending, self.pending_count(sentence_id));
        let attached = doc
            .sentence(sentence_id)
            .into_iter()
            .flat_map(|s| s.remarks.iter())
            .map(|r| {
                if r.rejoined {
                    RemarkState::Rejoined
                } else {
                    RemarkState::Visible
                }
            });
        pending.chain(attached).collect()
    }

    /// Submit a request for every task due at `now`.
    ///
    /// The request carries the sentence text as it is now, not as it was
    /// when the task was armed. Tasks whose sentence no longer exists are
    /// dropped without a request.
    pub fn dispatch_due(&mut self, doc: &Document, now: Duration) {
        for task in self.queue.take_due(now) {
            let Some(sentence) = doc.sentence(&task.sentence_id) else {
                log::debug!(
                    "dropping remark for missing sentence {}",
                    task.sentence_id
                );
                continue;
            };

            self.next_request += 1;
            let id = RequestId(self.next_request);
            self.in_flight.insert(id, task.sentence_id.clone());
            self.service.submit(RemarkRequest {
                id,
                sentence_id: task.sentence_id,
                sentence_text: sentence.text.clone(),
            });
        }
    }

    /// Attach one reply to its sentence.
    ///
    /// Replies for unknown or already completed requests are ignored. The
    /// sentence is looked up again here, wherever it now lives, and a reply
    /// whose sentence was deleted meanwhile is dropped.
    pub fn complete(&mut self, doc: &mut Document, reply: RemarkReply) -> Option<ResolvedRemark> {
        let Some(sentence_id) = self.in_flight.remove(&reply.id) else {
            log::debug!("ignoring reply for unknown request {}", reply.id);
            return None;
        };
        let Some(sentence) = doc.sentence(&sentence_id) else {
            log::debug!("dropping remark for missing sentence {sentence_id}");
            return None;
        };
        let needs_color = sentence.remark_color.is_none();

        let text = match reply.result {
            Ok(text) => text,
            Err(e) => {
                log::warn!("remark producer failed for {sentence_id}: {e}");
                error_remark_text(&e)
            }
        };
        let color = if needs_color { self.take_color() } else { None };

        let patch = doc.apply(Cmd::AppendRemark {
            sentence_id: sentence_id.clone(),
            text: text.clone(),
            color,
        });
        patch.created_remark.map(|remark_id| ResolvedRemark {
            remark_id,
            sentence_id,
            text,
        })
    }

    /// Complete every reply the service has ready, in arrival order
    pub fn collect_replies(&mut self, doc: &mut Document) -> Vec<ResolvedRemark> {
        self.service
            .poll()
            .into_iter()
            .filter_map(|reply| self.complete(doc, reply))
            .collect()
    }

    /// Dispatch what is due, then collect whatever replies have arrived
    pub fn resolve_due(&mut self, doc: &mut Document, now: Duration) -> Vec<ResolvedRemark> {
        self.dispatch_due(doc, now);
        self.collect_replies(doc)
    }

    /// Next open remark on the sentence after `current`, see [`next_open_remark`]
    pub fn cycle_emphasized_remark(
        &self,
        doc: &Document,
        sentence_id: &SentenceId,
        current: Option<&RemarkId>,
    ) -> Option<RemarkId> {
        next_open_remark(doc.sentence(sentence_id)?, current)
    }

    fn take_color(&mut self) -> Option<ColorToken> {
        if self.palette.is_empty() {
            return None;
        }
        let color = self.palette[self.next_color % self.palette.len()].clone();
        self.next_color += 1;
        Some(color)
    }
}

/// Page through a sentence's open remarks.
///
/// With no current remark, or one that is not on this sentence, returns the
/// first open remark. Otherwise walks forward from the current one, wrapping
/// around and skipping rejoined remarks. A single open remark cycles to
/// itself. `None` when nothing is open.
pub fn next_open_remark(sentence: &Sentence, current: Option<&RemarkId>) -> Option<RemarkId> {
    let remarks = &sentence.remarks;
    let first_open = || sentence.open_remarks().next().map(|r| r.id.clone());

    let Some(start) = current.and_then(|id| remarks.iter().position(|r| &r.id == id)) else {
        return first_open();
    };

    (1..=remarks.len())
        .map(|step| &remarks[(start + step) % remarks.len()])
        .find(|r| r.is_open())
        .map(|r| r.id.clone())
}
