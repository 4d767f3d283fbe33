use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::Duration;

use crate::models::SentenceId;

/// One armed remark timer
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RemarkTask {
    pub due: Duration,
    seq: u64,
    pub sentence_id: SentenceId,
}

/// Timer queue keyed by sentence id.
///
/// There is no cancellation: a task stays queued even if its sentence is
/// deleted, and whoever resolves it must check the sentence still exists.
/// Tasks come out in due order, ties in scheduling order.
#[derive(Debug, Clone, Default)]
pub struct RemarkQueue {
    tasks: BinaryHeap<Reverse<RemarkTask>>,
    next_seq: u64,
}

impl RemarkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, sentence_id: SentenceId, due: Duration) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.tasks.push(Reverse(RemarkTask {
            due,
            seq,
            sentence_id,
        }));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// When the earliest task comes due
    pub fn next_due(&self) -> Option<Duration> {
        self.tasks.peek().map(|Reverse(task)| task.due)
    }

    /// Tasks for this sentence that have not fired yet
    pub fn pending_for(&self, sentence_id: &SentenceId) -> usize {
        self.tasks
            .iter()
            .filter(|Reverse(task)| &task.sentence_id == sentence_id)
            .count()
    }

    /// Remove and return every task due at or before `now`
    pub fn take_due(&mut self, now: Duration) -> Vec<RemarkTask> {
        let mut due = Vec::new();
        while self.tasks.peek().is_some_and(|Reverse(task)| task.due <= now) {
            if let Some(Reverse(task)) = self.tasks.pop() {
                due.push(task);
            }
        }
        due
    }
}
