use crate::traits::RandomSource;

/// Captions used by the "surprise me" trigger. All fit the caption limit.
pub const SURPRISE_CAPTIONS: &[&str] = &[
    "I can haz GIF?",
    "Monday again",
    "Feed me now",
    "Zoomies engaged",
    "Nap time is sacred",
    "Not my fault",
    "Judging you",
    "Purr-fect",
    "Where is my snack?",
    "Ceiling cat sees all",
    "If I fits, I sits",
    "Do not disturb",
];

/// Pick a uniformly random element, or `None` for an empty slice.
pub fn pick<'a, T>(random: &dyn RandomSource, items: &'a [T]) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }
    let roll = random.next_f64().clamp(0.0, 1.0);
    let index = ((roll * items.len() as f64).floor() as usize).min(items.len() - 1);
    items.get(index)
}

pub fn pick_random_tag(random: &dyn RandomSource, tags: &[String]) -> String {
    pick(random, tags).cloned().unwrap_or_default()
}

pub fn pick_random_caption(random: &dyn RandomSource) -> String {
    pick(random, SURPRISE_CAPTIONS)
        .map(|caption| caption.to_string())
        .unwrap_or_default()
}
