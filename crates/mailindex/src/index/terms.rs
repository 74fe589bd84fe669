//! Tokenization and posting-term generation

use tantivy::tokenizer::{
    AsciiFoldingFilter, LowerCaser, RemoveLongFilter, SimpleTokenizer, TextAnalyzer, TokenStream,
};

use super::parse::ParsedMessage;
use crate::storage::postings::TermPositions;

/// Term prefix for free text (body, subject, attachment names)
pub const TEXT: &str = "text:";
pub const FROM: &str = "from:";
pub const TO: &str = "to:";
pub const SUBJECT: &str = "subject:";
pub const ATTACHMENT: &str = "attachment:";

/// Gap inserted between fields sharing the free-text prefix so phrases
/// never match across them
const FIELD_GAP: u32 = 100;

/// Word tokenizer shared by indexing and query parsing
#[derive(Clone)]
pub struct Tokenizer {
    analyzer: TextAnalyzer,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer {
    pub fn new() -> Self {
        let analyzer = TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(RemoveLongFilter::limit(40))
            .filter(LowerCaser)
            .filter(AsciiFoldingFilter)
            .build();
        Self { analyzer }
    }

    /// Normalized tokens with their positions
    pub fn tokens(&mut self, text: &str) -> Vec<(String, u32)> {
        let mut out = Vec::new();
        let mut stream = self.analyzer.token_stream(text);
        while stream.advance() {
            let token = stream.token();
            out.push((token.text.clone(), token.position as u32));
        }
        out
    }

    /// Normalized tokens only
    pub fn words(&mut self, text: &str) -> Vec<String> {
        self.tokens(text).into_iter().map(|(word, _)| word).collect()
    }
}

/// Append the tokens of `text` under `prefix`, starting at `offset`.
/// Returns the next free position.
fn add_field(
    terms: &mut TermPositions,
    tokenizer: &mut Tokenizer,
    prefix: &str,
    text: &str,
    offset: u32,
) -> u32 {
    let mut next = offset;
    for (word, position) in tokenizer.tokens(text) {
        let position = offset + position;
        terms
            .entry(format!("{}{}", prefix, word))
            .or_default()
            .push(position);
        next = next.max(position + 1);
    }
    next
}

/// Every posting term for a message
pub fn build_terms(parsed: &ParsedMessage, tokenizer: &mut Tokenizer) -> TermPositions {
    let mut terms = TermPositions::new();

    add_field(&mut terms, tokenizer, FROM, &parsed.from, 0);
    add_field(&mut terms, tokenizer, TO, &parsed.to, 0);
    add_field(&mut terms, tokenizer, SUBJECT, &parsed.subject, 0);

    let mut offset = add_field(&mut terms, tokenizer, TEXT, &parsed.subject, 0) + FIELD_GAP;
    offset = add_field(&mut terms, tokenizer, TEXT, &parsed.body, offset) + FIELD_GAP;

    let mut attachment_offset = 0;
    for name in &parsed.attachments {
        attachment_offset =
            add_field(&mut terms, tokenizer, ATTACHMENT, name, attachment_offset) + FIELD_GAP;
        offset = add_field(&mut terms, tokenizer, TEXT, name, offset) + FIELD_GAP;
    }

    terms
}
