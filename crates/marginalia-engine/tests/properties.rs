use std::collections::HashSet;
use std::time::Duration;

use marginalia_engine::{
    Cmd, Document, IdGenerator, ParagraphId, ProducerError, RemarkId, RemarkManager, SentenceId,
    from_fn, next_open_remark,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

/// Small deterministic generator so the edit sequences are reproducible
struct Lcg(u64);

impl Lcg {
    fn below(&mut self, bound: usize) -> usize {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 33) as usize) % bound.max(1)
    }
}

fn all_ids(doc: &Document) -> Vec<String> {
    doc.paragraphs()
        .iter()
        .flat_map(|p| p.sentences.iter())
        .flat_map(|s| {
            std::iter::once(s.id.to_string()).chain(s.remarks.iter().map(|r| r.id.to_string()))
        })
        .collect()
}

fn random_sentence(doc: &Document, rng: &mut Lcg) -> Option<SentenceId> {
    let sentences: Vec<_> = doc.sentences().map(|s| s.id.clone()).collect();
    (!sentences.is_empty()).then(|| sentences[rng.below(sentences.len())].clone())
}

fn random_edits(doc: &mut Document, seed: u64, steps: usize) {
    let mut rng = Lcg(seed);
    doc.insert_paragraph(0, "Seed.");

    for step in 0..steps {
        let text = format!("Sentence {step}.");
        let Some(anchor) = random_sentence(doc, &mut rng) else {
            continue;
        };
        let cmd = match rng.below(5) {
            0 => {
                let paragraph = &doc.paragraphs()[rng.below(doc.paragraphs().len())];
                Cmd::AddSentenceAt {
                    paragraph_id: paragraph.id.clone(),
                    index: rng.below(paragraph.sentences.len() + 1),
                    text,
                }
            }
            1 => Cmd::AddSentenceAfter {
                anchor,
                text,
                new_id: None,
            },
            2 => Cmd::AddParagraphAfterSentence {
                anchor: Some(anchor),
                text,
                rejoined_remark: None,
                new_id: None,
            },
            3 => Cmd::AppendRemark {
                sentence_id: anchor,
                text,
                color: None,
            },
            _ => {
                let remark = doc.sentence(&anchor).and_then(|s| s.remarks.first());
                Cmd::AddParagraphAfterSentence {
                    anchor: Some(anchor.clone()),
                    text,
                    rejoined_remark: remark.map(|r| r.id.clone()),
                    new_id: None,
                }
            }
        };
        doc.apply(cmd);
    }
}

#[rstest]
#[case::sequential(IdGenerator::sequential())]
#[case::uuid(IdGenerator::default())]
fn ids_stay_unique_across_edit_sequences(#[case] ids: IdGenerator) {
    for seed in 0..20 {
        let mut doc = Document::new("Fuzz").with_id_generator(ids.clone());
        random_edits(&mut doc, seed, 60);

        let ids = all_ids(&doc);
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len(), "duplicate id for seed {seed}");
    }
}

#[test]
fn generated_ids_skip_ids_already_in_the_document() {
    // Hand-built content that collides with the sequential generator
    let mut doc = Document::new("Collide").with_id_generator(IdGenerator::sequential());
    doc.insert_paragraph(0, "First.");
    let taken = doc.paragraphs()[0].sentences[0].id.clone();
    doc.add_sentence_after(&taken, "Claimed.", Some(SentenceId::from("s3")));

    let next = doc.add_sentence_after(&taken, "Fresh.", None).unwrap();

    assert_ne!(next, SentenceId::from("s3"));
    let ids = all_ids(&doc);
    assert_eq!(ids.iter().collect::<HashSet<_>>().len(), ids.len());
}

#[rstest]
#[case::within_paragraph("s2", "p1", "p1", 3)]
#[case::across_paragraphs("s1", "p1", "p2", 0)]
#[case::to_end("s8", "p2", "p1", 99)]
fn move_preserves_sentence_count(
    #[case] sentence: &str,
    #[case] from: &str,
    #[case] to: &str,
    #[case] index: usize,
) {
    let mut doc = Document::sample();
    let before = doc.sentence_count();

    let patch = doc.move_sentence(
        &SentenceId::from(sentence),
        &ParagraphId::from(from),
        &ParagraphId::from(to),
        index,
    );

    assert!(patch.changed);
    assert_eq!(doc.sentence_count(), before);
    assert!(patch.removed_paragraphs.is_empty());
    assert!(doc.paragraphs().iter().all(|p| !p.sentences.is_empty()));
}

#[test]
fn move_removes_paragraph_iff_it_empties() {
    let mut doc = Document::sample();
    let (p1, p2) = (ParagraphId::from("p1"), ParagraphId::from("p2"));

    for (i, id) in ["s1", "s2", "s3", "s4"].iter().enumerate() {
        let patch = doc.move_sentence(&SentenceId::from(*id), &p1, &p2, 0);
        let emptied = i == 3;
        assert_eq!(patch.removed_paragraphs.contains(&p1), emptied);
        assert_eq!(doc.paragraph(&p1).is_some(), !emptied);
    }

    assert_eq!(doc.paragraphs().len(), 1);
    assert_eq!(doc.sentence_count(), 8);
}

#[test]
fn cycle_never_returns_a_rejoined_remark() {
    for seed in 0..10 {
        let mut doc = Document::new("Cycle").with_id_generator(IdGenerator::sequential());
        let (_, s) = doc.insert_paragraph(0, "Subject.").unwrap();
        for n in 0..5 {
            doc.apply(Cmd::AppendRemark {
                sentence_id: s.clone(),
                text: format!("Remark {n}."),
                color: None,
            });
        }

        let mut rng = Lcg(seed);
        let remark_ids: Vec<RemarkId> = doc
            .sentence(&s)
            .unwrap()
            .remarks
            .iter()
            .map(|r| r.id.clone())
            .collect();
        for _ in 0..rng.below(6) {
            let target = remark_ids[rng.below(remark_ids.len())].clone();
            doc.add_paragraph_after_sentence(Some(&s), "Reply.", Some(&target), None);
        }

        let sentence = doc.sentence(&s).unwrap();
        let mut current = None;
        for _ in 0..12 {
            current = next_open_remark(sentence, current.as_ref());
            if let Some(id) = &current {
                assert!(!doc.remark(id).unwrap().rejoined);
            }
        }
        assert_eq!(current.is_none(), !sentence.has_open_remarks());
    }
}

#[test]
fn cycle_is_none_when_everything_is_rejoined() {
    let mut doc = Document::new("Done").with_id_generator(IdGenerator::sequential());
    let (_, s) = doc.insert_paragraph(0, "Subject.").unwrap();
    assert_eq!(next_open_remark(doc.sentence(&s).unwrap(), None), None);

    let remark = doc
        .apply(Cmd::AppendRemark {
            sentence_id: s.clone(),
            text: "Only remark.".to_string(),
            color: None,
        })
        .created_remark
        .unwrap();
    doc.add_paragraph_after_sentence(Some(&s), "Reply.", Some(&remark), None);

    assert_eq!(next_open_remark(doc.sentence(&s).unwrap(), Some(&remark)), None);
}

#[test]
fn rejoin_is_idempotent() {
    let mut doc = Document::new("Twice").with_id_generator(IdGenerator::sequential());
    let (_, s) = doc.insert_paragraph(0, "Subject.").unwrap();
    let remark = doc
        .apply(Cmd::AppendRemark {
            sentence_id: s.clone(),
            text: "Hmm.".to_string(),
            color: None,
        })
        .created_remark
        .unwrap();

    let first = doc.try_apply(Cmd::AddParagraphAfterSentence {
        anchor: Some(s.clone()),
        text: "Reply one.".to_string(),
        rejoined_remark: Some(remark.clone()),
        new_id: None,
    });
    let second = doc.try_apply(Cmd::AddParagraphAfterSentence {
        anchor: Some(s.clone()),
        text: "Reply two.".to_string(),
        rejoined_remark: Some(remark.clone()),
        new_id: None,
    });

    assert!(first.is_ok());
    assert!(second.is_ok());
    assert!(doc.remark(&remark).unwrap().rejoined);
}

#[rstest]
#[case(ProducerError::TimedOut, "Error generating remark: remark request timed out")]
#[case(
    ProducerError::Unavailable("503".to_string()),
    "Error generating remark: remark service unavailable: 503"
)]
#[case(
    ProducerError::Rejected("sentence is required".to_string()),
    "Error generating remark: remark request rejected: sentence is required"
)]
fn producer_failure_surfaces_as_remark_text(#[case] error: ProducerError, #[case] expected: &str) {
    let mut doc = Document::new("Fail").with_id_generator(IdGenerator::sequential());
    let (_, s) = doc.insert_paragraph(0, "Subject.").unwrap();
    let mut manager = RemarkManager::new(
        from_fn(move |_: &str| Err(error.clone())),
        vec![Duration::from_millis(1)],
        vec![],
    );

    manager.schedule_remarks(&s, Duration::ZERO);
    let resolved = manager.resolve_due(&mut doc, Duration::from_millis(1));

    assert_eq!(resolved.len(), 1);
    assert_eq!(doc.sentence(&s).unwrap().remarks[0].text, expected);
}

#[test]
fn remark_for_deleted_sentence_is_dropped_silently() {
    let mut doc = Document::sample().with_id_generator(IdGenerator::sequential());
    let mut manager = RemarkManager::new(
        from_fn(|_: &str| Ok("late".to_string())),
        vec![Duration::from_secs(2), Duration::from_secs(5)],
        vec![],
    );
    let survivor = SentenceId::from("s5");
    let ghost = SentenceId::from("ghost");

    manager.schedule_remarks(&ghost, Duration::ZERO);
    manager.schedule_remarks(&survivor, Duration::ZERO);
    let resolved = manager.resolve_due(&mut doc, Duration::from_secs(5));

    assert_eq!(resolved.len(), 2);
    assert!(resolved.iter().all(|r| r.sentence_id == survivor));
    assert!(manager.queue().is_empty());
}

#[test]
fn remark_follows_a_moved_sentence() {
    let mut doc = Document::sample().with_id_generator(IdGenerator::sequential());
    let mut manager = RemarkManager::new(
        from_fn(|text: &str| Ok(format!("re: {text}"))),
        vec![Duration::from_secs(2)],
        vec![],
    );
    let s1 = SentenceId::from("s1");

    manager.schedule_remarks(&s1, Duration::ZERO);
    doc.move_sentence(&s1, &ParagraphId::from("p1"), &ParagraphId::from("p2"), 4);
    manager.resolve_due(&mut doc, Duration::from_secs(2));

    let location = doc.locate_sentence(&s1).unwrap();
    assert_eq!(location.paragraph_index, 1);
    assert_eq!(doc.sentence(&s1).unwrap().remarks.len(), 1);
}
