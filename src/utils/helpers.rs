use crate::llm::ChatMessage;

/// Returns the `window` most recent messages, oldest first
///
/// # Arguments
/// * `history` - Full conversation, oldest first
/// * `window` - Maximum number of messages to keep
pub fn recent_messages(history: &[ChatMessage], window: usize) -> Vec<ChatMessage> {
    let start = history.len().saturating_sub(window);
    history[start..].to_vec()
}

/// Shortens `text` to at most `max_chars` characters for log lines
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_the_last_ten_of_twelve() {
        let history: Vec<ChatMessage> = (0..12)
            .map(|i| ChatMessage::user(&format!("m{}", i)))
            .collect();
        let recent = recent_messages(&history, 10);
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].content, "m2");
        assert_eq!(recent[9].content, "m11");
    }

    #[test]
    fn short_history_is_sent_whole() {
        let history = vec![ChatMessage::user("a"), ChatMessage::assistant("b")];
        assert_eq!(recent_messages(&history, 10), history);
    }

    #[test]
    fn preview_truncates_on_char_boundaries() {
        assert_eq!(preview("héllo wörld", 5), "héllo...");
        assert_eq!(preview("short", 10), "short");
    }
}
