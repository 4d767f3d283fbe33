use crate::models::{
    Document, IdGenerator, Paragraph, ParagraphId, Remark, RemarkId, Sentence, SentenceId,
};

/// Build an open remark owned by `sentence_id`
pub fn open_remark(id: &str, sentence_id: &str, text: &str) -> Remark {
    Remark {
        id: RemarkId::from(id),
        text: text.to_string(),
        sentence_id: SentenceId::from(sentence_id),
        rejoined: false,
    }
}

/// Two paragraphs; `s1` carries the open remarks `r1` and `r2`.
///
/// ```text
/// p1: s1 [r1, r2]  s2
/// p2: s3
/// ```
pub fn document_with_remarks() -> Document {
    let mut s1 = Sentence::new(SentenceId::from("s1"), "The cat sat.");
    s1.remarks = vec![
        open_remark("r1", "s1", "Which cat?"),
        open_remark("r2", "s1", "Sat where?"),
    ];

    Document::from_paragraphs(
        "Remarks",
        vec![
            Paragraph::new(
                ParagraphId::from("p1"),
                vec![s1, Sentence::new(SentenceId::from("s2"), "It purred.")],
            ),
            Paragraph::new(
                ParagraphId::from("p2"),
                vec![Sentence::new(SentenceId::from("s3"), "Then it left.")],
            ),
        ],
    )
    .with_id_generator(IdGenerator::sequential())
}

/// Sentence texts of one paragraph, in order
pub fn sentence_texts(doc: &Document, paragraph_id: &str) -> Vec<String> {
    doc.paragraph(&ParagraphId::from(paragraph_id))
        .map(|p| p.sentences.iter().map(|s| s.text.clone()).collect())
        .unwrap_or_default()
}
