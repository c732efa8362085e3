//! Split text into ordered chunks under a per-request character limit.
//!
//! Boundaries are tried in order: sentence, then word, then character.
//! Whitespace is normalized to single spaces.

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Sentences are packed greedily. A sentence longer than the limit is
/// packed word by word, and a word longer than the limit is cut at
/// character boundaries. Returns no chunks for blank input.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();

    for sentence in sentences(text) {
        if char_len(&sentence) <= max_chars {
            pack(&mut chunks, &mut current, &sentence, max_chars);
            continue;
        }

        flush(&mut chunks, &mut current);
        for word in sentence.split(' ') {
            if char_len(word) <= max_chars {
                pack(&mut chunks, &mut current, word, max_chars);
                continue;
            }

            flush(&mut chunks, &mut current);
            let chars: Vec<char> = word.chars().collect();
            let mut pieces = chars.chunks(max_chars).map(|c| c.iter().collect::<String>());
            let mut last = pieces.next().unwrap_or_default();
            for piece in pieces {
                chunks.push(std::mem::replace(&mut last, piece));
            }
            current = last;
        }
        flush(&mut chunks, &mut current);
    }

    flush(&mut chunks, &mut current);
    chunks
}

/// Whitespace-normalized sentences in order.
fn sentences(text: &str) -> Vec<String> {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut out = Vec::new();
    let mut current = String::new();

    let mut chars = normalized.chars().peekable();
    while let Some(c) = chars.next() {
        current.push(c);
        let ends = match c {
            '。' | '！' | '？' => true,
            '.' | '!' | '?' | '…' => chars.peek().map_or(true, |next| *next == ' '),
            _ => false,
        };
        if ends {
            push_trimmed(&mut out, &mut current);
        }
    }
    push_trimmed(&mut out, &mut current);
    out
}

fn push_trimmed(out: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
    current.clear();
}

fn pack(chunks: &mut Vec<String>, current: &mut String, piece: &str, max_chars: usize) {
    if current.is_empty() {
        current.push_str(piece);
    } else if char_len(current) + 1 + char_len(piece) <= max_chars {
        current.push(' ');
        current.push_str(piece);
    } else {
        chunks.push(std::mem::take(current));
        current.push_str(piece);
    }
}

fn flush(chunks: &mut Vec<String>, current: &mut String) {
    if !current.is_empty() {
        chunks.push(std::mem::take(current));
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_within(chunks: &[String], max: usize) {
        for chunk in chunks {
            assert!(char_len(chunk) <= max, "chunk too long: {chunk:?}");
            assert!(!chunk.is_empty());
        }
    }

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(split_text("  Hola   mundo. ", 200), vec!["Hola mundo."]);
    }

    #[test]
    fn blank_text_has_no_chunks() {
        assert!(split_text(" \n\t ", 200).is_empty());
    }

    #[test]
    fn packs_whole_sentences() {
        let text = "One two. Three four! Five six? Seven.";
        let chunks = split_text(text, 20);
        assert_eq!(chunks, vec!["One two. Three four!", "Five six? Seven."]);
    }

    #[test]
    fn decimal_points_do_not_end_sentences() {
        assert_eq!(sentences("It costs 3.5 euros. Cheap."), vec!["It costs 3.5 euros.", "Cheap."]);
    }

    #[test]
    fn long_sentence_falls_back_to_words() {
        let text = "alpha beta gamma delta epsilon zeta eta theta";
        let chunks = split_text(text, 16);
        assert_within(&chunks, 16);
        assert_eq!(chunks.join(" "), text);
        assert_eq!(chunks[0], "alpha beta gamma");
    }

    #[test]
    fn long_word_falls_back_to_chars() {
        let word = "x".repeat(25);
        let chunks = split_text(&word, 10);
        assert_eq!(chunks.len(), 3);
        assert_within(&chunks, 10);
        assert_eq!(chunks.concat(), word);
    }

    #[test]
    fn counts_characters_not_bytes() {
        let text = "ñññññ ééééé";
        let chunks = split_text(text, 5);
        assert_eq!(chunks, vec!["ñññññ", "ééééé"]);
    }

    #[test]
    fn preserves_order_and_content_at_default_limit() {
        let sentence = "This sentence is used to build a long transcript for chunking.";
        let text = vec![sentence; 20].join("  ");
        let chunks = split_text(&text, 200);
        assert!(chunks.len() > 1);
        assert_within(&chunks, 200);
        assert_eq!(chunks.join(" "), vec![sentence; 20].join(" "));
    }

    #[test]
    fn full_width_stops_split_without_spaces() {
        let chunks = split_text("你好。再见。", 3);
        assert_eq!(chunks, vec!["你好。", "再见。"]);
    }
}
