use super::language::contains_cjk;
use super::model::Chunk;
use once_cell::sync::Lazy;
use regex::Regex;

/// Default chunk limit for the voice-cloning backend, in characters
pub const DEFAULT_MAX_CHUNK_LENGTH: usize = 100;

static LATIN_TERMINATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]+").expect("latin sentence pattern is valid"));

static CJK_TERMINATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[。！？.!?]+").expect("cjk sentence pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Script {
    Latin,
    Cjk,
}

impl Script {
    fn detect(text: &str) -> Self {
        if contains_cjk(text) {
            Script::Cjk
        } else {
            Script::Latin
        }
    }

    fn terminators(&self) -> &'static Regex {
        match self {
            Script::Latin => &LATIN_TERMINATORS,
            Script::Cjk => &CJK_TERMINATORS,
        }
    }

    /// Glue placed between two sentences packed into the same chunk
    fn separator(&self) -> &'static str {
        match self {
            Script::Latin => " ",
            Script::Cjk => "",
        }
    }
}

/// Split text into ordered chunks of at most `max_length` characters.
///
/// Whole sentences are packed greedily. A sentence longer than the limit is
/// broken at whitespace; a single token longer than the limit is kept whole
/// as an oversized chunk. The result depends only on the input, so the chunk
/// texts are stable cache keys.
pub fn segment(text: &str, max_length: usize) -> Vec<Chunk> {
    let script = Script::detect(text);
    let separator = script.separator();
    let separator_len = separator.chars().count();

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    let pieces = split_sentences(text, script)
        .into_iter()
        .flat_map(|sentence| fit_sentence(sentence, max_length));

    for piece in pieces {
        let piece_len = piece.chars().count();

        if current.is_empty() {
            current = piece;
            current_len = piece_len;
        } else if current_len + separator_len + piece_len <= max_length {
            current.push_str(separator);
            current.push_str(&piece);
            current_len += separator_len + piece_len;
        } else {
            chunks.push(Chunk::new(chunks.len(), std::mem::take(&mut current)));
            current = piece;
            current_len = piece_len;
        }
    }

    if !current.is_empty() {
        chunks.push(Chunk::new(chunks.len(), current));
    }

    chunks
}

/// Sentences with their terminal punctuation, whitespace normalized
fn split_sentences(text: &str, script: Script) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut last_end = 0;

    for boundary in script.terminators().find_iter(text) {
        push_sentence(&mut sentences, &text[last_end..boundary.end()]);
        last_end = boundary.end();
    }
    push_sentence(&mut sentences, &text[last_end..]);

    sentences
}

fn push_sentence(sentences: &mut Vec<String>, raw: &str) {
    // Punctuation-only fragments ("...", "?!") carry nothing to narrate
    if !raw.chars().any(char::is_alphanumeric) {
        return;
    }
    sentences.push(raw.split_whitespace().collect::<Vec<_>>().join(" "));
}

fn fit_sentence(sentence: String, max_length: usize) -> Vec<String> {
    if sentence.chars().count() <= max_length {
        return vec![sentence];
    }

    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in sentence.split_whitespace() {
        let word_len = word.chars().count();

        if current.is_empty() {
            current.push_str(word);
            current_len = word_len;
        } else if current_len + 1 + word_len <= max_length {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
        } else {
            pieces.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        }
    }

    if !current.is_empty() {
        pieces.push(current);
    }

    pieces
}
