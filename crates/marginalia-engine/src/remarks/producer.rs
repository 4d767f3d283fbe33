use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProducerError {
    #[error("remark service unavailable: {0}")]
    Unavailable(String),
    #[error("remark request rejected: {0}")]
    Rejected(String),
    #[error("remark request timed out")]
    TimedOut,
}

/// External collaborator that turns sentence text into remark text.
///
/// Called when a scheduled remark comes due, with the sentence text as it
/// is at that moment. Failures are not retried.
pub trait RemarkProducer {
    fn generate(&mut self, sentence_text: &str) -> Result<String, ProducerError>;
}

impl<P: RemarkProducer + ?Sized> RemarkProducer for Box<P> {
    fn generate(&mut self, sentence_text: &str) -> Result<String, ProducerError> {
        (**self).generate(sentence_text)
    }
}

/// Adapter for closures
pub struct FnProducer<F>(F);

pub fn from_fn<F>(f: F) -> FnProducer<F>
where
    F: FnMut(&str) -> Result<String, ProducerError>,
{
    FnProducer(f)
}

impl<F> RemarkProducer for FnProducer<F>
where
    F: FnMut(&str) -> Result<String, ProducerError>,
{
    fn generate(&mut self, sentence_text: &str) -> Result<String, ProducerError> {
        (self.0)(sentence_text)
    }
}

const SUBJECTS: [&str; 5] = ["The cat", "A dog", "The bird", "An elephant", "The scientist"];
const VERBS: [&str; 5] = ["jumped", "ran", "flew", "studied", "observed"];
const OBJECTS: [&str; 5] = [
    "over the fence",
    "through the forest",
    "in the lab",
    "under the microscope",
    "across the field",
];

/// Sentences longer than this draw a length remark
const LONG_SENTENCE_WORDS: usize = 20;

/// Offline producer that writes canned critique.
///
/// Walks the subject/verb/object tables in a fixed rotation, so the same
/// sequence of calls always yields the same remarks.
#[derive(Debug, Clone, Default)]
pub struct SentenceGeneratorProducer {
    turn: usize,
}

impl SentenceGeneratorProducer {
    pub fn new() -> Self {
        Self::default()
    }

    fn example_sentence(&self) -> String {
        let subject = SUBJECTS[self.turn % SUBJECTS.len()];
        let verb = VERBS[(self.turn / SUBJECTS.len() + self.turn) % VERBS.len()];
        let object = OBJECTS[(self.turn * 2) % OBJECTS.len()];
        format!("{subject} {verb} {object}.")
    }
}

impl RemarkProducer for SentenceGeneratorProducer {
    fn generate(&mut self, sentence_text: &str) -> Result<String, ProducerError> {
        let sentence_text = sentence_text.trim();
        if sentence_text.is_empty() {
            return Err(ProducerError::Rejected("sentence is required".to_string()));
        }

        let example = self.example_sentence();
        self.turn += 1;

        let words = sentence_text.split_whitespace().count();
        if words > LONG_SENTENCE_WORDS {
            Ok(format!(
                "This runs to {words} words; consider splitting it. Something as direct as \"{example}\" reads faster."
            ))
        } else {
            Ok(format!(
                "Could this be more concrete? Compare: \"{example}\""
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_generator_is_deterministic() {
        let mut a = SentenceGeneratorProducer::new();
        let mut b = SentenceGeneratorProducer::new();

        for _ in 0..7 {
            assert_eq!(a.generate("Hello."), b.generate("Hello."));
        }
    }

    #[test]
    fn test_generator_rotates_examples() {
        let mut producer = SentenceGeneratorProducer::new();

        let first = producer.generate("Hello.").unwrap();
        let second = producer.generate("Hello.").unwrap();

        assert_eq!(
            first,
            "Could this be more concrete? Compare: \"The cat jumped over the fence.\""
        );
        assert_ne!(first, second);
    }

    #[test]
    fn test_generator_flags_long_sentences() {
        let mut producer = SentenceGeneratorProducer::new();
        let long = "word ".repeat(25);

        let remark = producer.generate(&long).unwrap();

        assert!(remark.starts_with("This runs to 25 words"));
    }

    #[test]
    fn test_generator_rejects_empty_sentence() {
        let mut producer = SentenceGeneratorProducer::new();
        assert_eq!(
            producer.generate("   "),
            Err(ProducerError::Rejected("sentence is required".to_string()))
        );
    }

    #[test]
    fn test_fn_producer_and_boxed_producer() {
        let mut calls = 0;
        let mut producer: Box<dyn RemarkProducer> = Box::new(from_fn(move |text: &str| {
            calls += 1;
            Ok(format!("{calls}: {text}"))
        }));

        assert_eq!(producer.generate("a").unwrap(), "1: a");
        assert_eq!(producer.generate("b").unwrap(), "2: b");
    }
}
