use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

const LABEL_LIMIT: usize = 20;

/// Shortens a node label for drawing on the canvas.
pub fn truncate_label(label: &str) -> String {
    match label.char_indices().nth(LABEL_LIMIT) {
        Some((cut, _)) => format!("{}...", &label[..cut]),
        None => label.to_owned(),
    }
}

pub fn stable_pair(id: &str) -> (f32, f32) {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    let hash = hasher.finish();

    let x = ((hash & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    let y = (((hash >> 32) & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    ((x * 2.0) - 1.0, (y * 2.0) - 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_labels_are_untouched() {
        assert_eq!(truncate_label("report.csv"), "report.csv");
        assert_eq!(truncate_label("exactly-twenty-chars"), "exactly-twenty-chars");
    }

    #[test]
    fn long_labels_are_cut_at_twenty_characters() {
        assert_eq!(
            truncate_label("a very long invocation name"),
            "a very long invocati..."
        );
        assert_eq!(truncate_label("ééééééééééééééééééééé"), "éééééééééééééééééééé...");
    }

    #[test]
    fn stable_pair_is_deterministic_and_bounded() {
        let first = stable_pair("urn:uuid:1");
        assert_eq!(first, stable_pair("urn:uuid:1"));
        assert!((-1.0..=1.0).contains(&first.0));
        assert!((-1.0..=1.0).contains(&first.1));
    }
}
