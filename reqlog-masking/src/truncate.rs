use std::borrow::Cow;

/// Logged in place of an empty or unparseable body.
pub const EMPTY_BODY: &str = "{}";

/// Cut `text` to at most `max_length` characters (Unicode scalar values,
/// never bytes). `max_length <= 0` disables truncation.
pub fn truncate(text: &str, max_length: i64) -> Cow<'_, str> {
    if max_length <= 0 {
        return Cow::Borrowed(text);
    }
    let Ok(limit) = usize::try_from(max_length) else {
        return Cow::Borrowed(text);
    };
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => Cow::Owned(text[..byte_idx].to_string()),
        None => Cow::Borrowed(text),
    }
}
