//! Fuzzy string matching utilities: Levenshtein distance and kebab-case validation.

/// Find the closest match using Levenshtein distance. Returns None if best
/// distance exceeds half the candidate length (too dissimilar).
pub(crate) fn fuzzy_match<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    let input_lower = input.to_lowercase();
    let mut best: Option<(&str, usize)> = None;

    for &candidate in candidates {
        let dist = levenshtein(&input_lower, &candidate.to_lowercase());
        match best {
            None => best = Some((candidate, dist)),
            Some((_, best_dist)) if dist < best_dist => best = Some((candidate, dist)),
            _ => {}
        }
    }

    best.and_then(|(name, dist)| {
        // Only suggest if edit distance is reasonable (≤ half the longer string)
        let max_len = input.len().max(name.len());
        if dist <= max_len / 2 {
            Some(name)
        } else {
            None
        }
    })
}

/// Levenshtein edit distance between two strings.
pub(crate) fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let m = a.len();
    let n = b.len();

    let mut prev = (0..=n).collect::<Vec<_>>();
    let mut curr = vec![0; n + 1];

    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1)
                .min(curr[j - 1] + 1)
                .min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

/// Check if a string is valid kebab-case: `^[a-z0-9]+(-[a-z0-9]+)*$`
pub(crate) fn is_kebab_case(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    let mut prev_was_hyphen = true; // treat start as "after separator" to require leading alnum
    for ch in s.chars() {
        if ch == '-' {
            if prev_was_hyphen {
                return false; // double hyphen or leading hyphen
            }
            prev_was_hyphen = true;
        } else if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            prev_was_hyphen = false;
        } else {
            return false; // uppercase, special chars, etc.
        }
    }
    !prev_was_hyphen // must not end with hyphen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::KNOWN_OPERATORS;

    #[test]
    fn levenshtein_basic() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", "abc"), 0);
    }

    #[test]
    fn fuzzy_match_finds_close_operator() {
        assert_eq!(fuzzy_match("gtee", KNOWN_OPERATORS), Some("gte"));
        assert_eq!(fuzzy_match("startswith", KNOWN_OPERATORS), Some("starts_with"));
        assert_eq!(fuzzy_match("NOT_IN", KNOWN_OPERATORS), Some("not_in"));
    }

    #[test]
    fn fuzzy_match_rejects_distant() {
        assert_eq!(fuzzy_match("greater_than_or_equal", KNOWN_OPERATORS), None);
        assert_eq!(fuzzy_match("zzzzzzzzzzzzz", KNOWN_OPERATORS), None);
    }

    #[test]
    fn kebab_case() {
        assert!(is_kebab_case("laptop-trade-in"));
        assert!(is_kebab_case("laptops2"));
        assert!(!is_kebab_case("Laptops"));
        assert!(!is_kebab_case("laptop--pricing"));
        assert!(!is_kebab_case("-laptops"));
    }
}
