//! Request/reply plumbing between the remark manager and a producer.
//!
//! The manager submits one [`RemarkRequest`] per due task and later polls for
//! [`RemarkReply`]s. Replies carry the request id, not a position, so they may
//! arrive in any order and any number of ticks later.

use std::fmt;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::models::SentenceId;
use crate::remarks::{ProducerError, RemarkProducer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Sentence text captured when the task came due
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemarkRequest {
    pub id: RequestId,
    pub sentence_id: SentenceId,
    pub sentence_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemarkReply {
    pub id: RequestId,
    pub result: Result<String, ProducerError>,
}

/// Transport for remark requests.
///
/// `submit` must return without waiting for the producer.
pub trait RemarkService {
    fn submit(&mut self, request: RemarkRequest);

    /// Replies that have arrived since the last poll
    fn poll(&mut self) -> Vec<RemarkReply>;
}

/// Runs the producer on the caller's thread during `submit` and hands the
/// reply back on the next `poll`.
pub struct InlineService<P> {
    producer: P,
    ready: Vec<RemarkReply>,
}

impl<P: RemarkProducer> InlineService<P> {
    pub fn new(producer: P) -> Self {
        Self {
            producer,
            ready: Vec::new(),
        }
    }

    pub fn producer(&self) -> &P {
        &self.producer
    }
}

impl<P: RemarkProducer> RemarkService for InlineService<P> {
    fn submit(&mut self, request: RemarkRequest) {
        let result = self.producer.generate(&request.sentence_text);
        self.ready.push(RemarkReply {
            id: request.id,
            result,
        });
    }

    fn poll(&mut self) -> Vec<RemarkReply> {
        std::mem::take(&mut self.ready)
    }
}

/// Runs the producer on a dedicated worker thread.
///
/// Requests and replies cross on unbounded channels, so neither side ever
/// waits on the other. Dropping the service closes the request channel and
/// the worker exits once it finishes the request in hand.
pub struct BackgroundService {
    requests: UnboundedSender<RemarkRequest>,
    replies: UnboundedReceiver<RemarkReply>,
    undelivered: Vec<RemarkReply>,
}

impl BackgroundService {
    pub fn spawn<P>(producer: P) -> std::io::Result<Self>
    where
        P: RemarkProducer + Send + 'static,
    {
        let (request_tx, request_rx) = unbounded_channel();
        let (reply_tx, reply_rx) = unbounded_channel();

        std::thread::Builder::new()
            .name("remark-producer".into())
            .spawn(move || producer_loop(producer, request_rx, reply_tx))?;

        Ok(Self {
            requests: request_tx,
            replies: reply_rx,
            undelivered: Vec::new(),
        })
    }
}

fn producer_loop<P: RemarkProducer>(
    mut producer: P,
    mut requests: UnboundedReceiver<RemarkRequest>,
    replies: UnboundedSender<RemarkReply>,
) {
    while let Some(request) = requests.blocking_recv() {
        let reply = RemarkReply {
            id: request.id,
            result: producer.generate(&request.sentence_text),
        };
        if replies.send(reply).is_err() {
            break;
        }
    }
    log::debug!("remark producer thread exiting");
}

impl RemarkService for BackgroundService {
    fn submit(&mut self, request: RemarkRequest) {
        let id = request.id;
        if self.requests.send(request).is_err() {
            log::warn!("remark request {id} not sent: producer thread stopped");
            self.undelivered.push(RemarkReply {
                id,
                result: Err(ProducerError::Unavailable(
                    "remark producer thread stopped".to_string(),
                )),
            });
        }
    }

    fn poll(&mut self) -> Vec<RemarkReply> {
        let mut replies = std::mem::take(&mut self.undelivered);
        while let Ok(reply) = self.replies.try_recv() {
            replies.push(reply);
        }
        replies
    }
}
