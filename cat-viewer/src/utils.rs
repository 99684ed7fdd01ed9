use crate::types::MediaRequest;

/// Build the alt text applied to the image once it loads
pub fn build_alt_text(request: &MediaRequest) -> String {
    let details: Vec<&str> = [request.tag(), request.caption()]
        .into_iter()
        .flatten()
        .collect();

    if details.is_empty() {
        "Animated cat".to_string()
    } else {
        format!("Animated cat ({})", details.join(" · "))
    }
}

/// Build the status line shown after a successful load
pub fn build_status_message(request: &MediaRequest) -> String {
    let mut pieces = Vec::new();
    if let Some(tag) = request.tag() {
        pieces.push(format!("#{}", tag));
    }
    if let Some(caption) = request.caption() {
        pieces.push(format!("“{}”", caption));
    }

    if pieces.is_empty() {
        return "Serving a fresh random cat GIF.".to_string();
    }

    format!("Serving a cat GIF with {}.", pieces.join(" and "))
}

/// Text processing utilities
pub mod text {
    use std::cmp::Ordering;

    /// Truncate to at most `max_chars` characters, never splitting a char
    pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
        match text.char_indices().nth(max_chars) {
            Some((idx, _)) => &text[..idx],
            None => text,
        }
    }

    /// Case-insensitive ordering, so "apple" sorts before "Banana". Words
    /// that differ only in case put lowercase first ("a" before "A"), and
    /// byte order breaks any remaining tie so the result is total.
    ///
    /// Accents are not folded: "émo" sorts after "zebra". Tag catalogs are
    /// plain ASCII in practice, so this stays free of collation tables.
    pub fn locale_cmp(a: &str, b: &str) -> Ordering {
        a.to_lowercase()
            .cmp(&b.to_lowercase())
            .then_with(|| {
                let upper = |s: &str| s.chars().map(char::is_uppercase).collect::<Vec<_>>();
                upper(a).cmp(&upper(b))
            })
            .then_with(|| a.cmp(b))
    }
}

/// Sort tags for stable presentation
pub fn sort_tags(tags: &mut [String]) {
    tags.sort_by(|a, b| text::locale_cmp(a, b));
}

