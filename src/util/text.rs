//! Display helpers for collection names and titles.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub const ELLIPSIS: char = '…';

/// Longest collection name shown in lists, in terminal columns
pub const MAX_NAME_COLUMNS: usize = 30;

/// Characters kept from a first message when it becomes the collection name
pub const AUTO_TITLE_CHARS: usize = 20;

/// Truncate `text` to fit in `max_columns`, ending with an ellipsis when
/// anything was cut. Wide characters count for their full width.
pub fn truncate_display(text: &str, max_columns: usize) -> String {
    if UnicodeWidthStr::width(text) <= max_columns {
        return text.to_string();
    }
    if max_columns == 0 {
        return String::new();
    }

    let budget = max_columns - 1;
    let mut width = 0;
    let mut out = String::new();
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if width + w > budget {
            break;
        }
        width += w;
        out.push(ch);
    }
    out.push(ELLIPSIS);
    out
}

/// Name given to a collection from its first message: the first
/// [`AUTO_TITLE_CHARS`] characters, plus an ellipsis if the message is longer.
pub fn auto_title(message: &str) -> String {
    let message = message.trim();
    if message.chars().count() <= AUTO_TITLE_CHARS {
        return message.to_string();
    }
    let mut title: String = message.chars().take(AUTO_TITLE_CHARS).collect();
    title.push(ELLIPSIS);
    title
}
