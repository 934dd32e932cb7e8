//! String ordering helpers
//!
//! Natural (numeric-aware) ordering is used only to present array variants
//! in index order. Identity is always a case-insensitive exact match.

use std::cmp::Ordering;

/// Case-insensitive name equality used for every node/option lookup
pub fn names_match(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/// Natural order comparison of two strings.
///
/// Wherever both strings have a digit at the current position, the maximal
/// digit run on each side is compared by length first (so `"9" < "10"`) and
/// then character by character. Anywhere else single characters are compared.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let a = a.as_bytes();
    let b = b.as_bytes();
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        if a[i].is_ascii_digit() && b[j].is_ascii_digit() {
            let run_a = digit_run(a, i);
            let run_b = digit_run(b, j);

            let ordering = (run_a - i)
                .cmp(&(run_b - j))
                .then_with(|| a[i..run_a].cmp(&b[j..run_b]));
            if ordering != Ordering::Equal {
                return ordering;
            }
            i = run_a;
            j = run_b;
        } else {
            match a[i].cmp(&b[j]) {
                Ordering::Equal => {
                    i += 1;
                    j += 1;
                }
                other => return other,
            }
        }
    }

    (a.len() - i).cmp(&(b.len() - j))
}

/// Natural order over optional strings; absent sorts before any string
pub fn natural_cmp_opt(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => natural_cmp(a, b),
    }
}

fn digit_run(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|b| !b.is_ascii_digit())
        .map_or(bytes.len(), |offset| start + offset)
}
