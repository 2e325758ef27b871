//! Text helpers shared by ingestion and the weighting engine.

/// Identity key of a vocabulary term: trimmed, full-width spaces folded to
/// ASCII, whitespace runs collapsed, lowercased.
pub fn normalize_text(text: &str) -> String {
    text.replace('\u{3000}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub fn normalize_brackets(text: &str) -> String {
    text.replace('［', "[").replace('］', "]")
}

/// Lines holding more than one visible character, at least one per submission.
pub fn count_answer_lines(text: &str) -> u32 {
    let lines = text
        .lines()
        .filter(|line| line.chars().filter(|c| !c.is_whitespace()).count() > 1)
        .count();
    u32::try_from(lines).unwrap_or(u32::MAX).max(1)
}

/// First `max_chars` characters, never splitting a code point.
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  Taberu\u{3000}Mono "), "taberu mono");
        assert_eq!(normalize_text("a \t b"), "a b");
        assert_eq!(normalize_text("   "), "");
    }

    #[test]
    fn test_normalize_brackets() {
        assert_eq!(normalize_brackets("［LV］n3"), "[LV]n3");
    }

    #[test]
    fn test_count_answer_lines() {
        assert_eq!(count_answer_lines("1. 私は学生です\n2. 猫がいる\n\n3"), 2);
        assert_eq!(count_answer_lines("x"), 1);
        assert_eq!(count_answer_lines(""), 1);
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        assert_eq!(excerpt("日本語の勉強", 3), "日本語");
        assert_eq!(excerpt("short", 100), "short");
    }
}
