//! Lane ordering and label display.

use std::cmp::Ordering;

use swimlane_core::SortMode;

/// Final bottom-up lane order for labels given in first-seen order.
///
/// Lanes are drawn from the bottom, so the unsorted order and the ascending
/// order are reversed. Sorting is stable.
pub fn order_lanes(labels: &[String], mode: SortMode) -> Vec<String> {
    let mut ordered = labels.to_vec();
    match mode {
        SortMode::None => ordered.reverse(),
        SortMode::Asc => {
            ordered.sort_by(|a, b| natural_cmp(a, b));
            ordered.reverse();
        }
        SortMode::Desc => ordered.sort_by(|a, b| natural_cmp(a, b)),
    }
    ordered
}

/// Numeric-aware comparison: digit runs compare by value, text ignores case.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = chunks(a);
    let mut right = chunks(b);

    loop {
        match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => match compare_chunks(x, y) {
                Ordering::Equal => continue,
                other => return other,
            },
        }
    }
}

/// Display form of a lane label, cropped past `max_chars`.
pub fn crop_label(label: &str, max_chars: usize) -> String {
    if label.chars().count() <= max_chars {
        return label.to_string();
    }
    let kept: String = label.chars().take(max_chars.saturating_sub(2)).collect();
    format!("{kept}...")
}

fn chunks(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        let digit = rest.chars().next()?.is_ascii_digit();
        let end = rest
            .find(|c: char| c.is_ascii_digit() != digit)
            .unwrap_or(rest.len());
        let (chunk, tail) = rest.split_at(end);
        rest = tail;
        Some(chunk)
    })
}

fn is_digits(chunk: &str) -> bool {
    chunk.starts_with(|c: char| c.is_ascii_digit())
}

fn compare_chunks(x: &str, y: &str) -> Ordering {
    match (is_digits(x), is_digits(y)) {
        (true, true) => {
            let x = x.trim_start_matches('0');
            let y = y.trim_start_matches('0');
            x.len().cmp(&y.len()).then_with(|| x.cmp(y))
        }
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => x
            .chars()
            .flat_map(char::to_lowercase)
            .cmp(y.chars().flat_map(char::to_lowercase)),
    }
}
