/// Largest `n` in `[0, total]` with `fits(n)`, assuming `fits` is monotone
/// (true up to some point, false after). Returns 0 when nothing fits,
/// including the empty prefix. Issues O(log total) probes.
pub fn max_fitting_prefix(total: usize, mut fits: impl FnMut(usize) -> bool) -> usize {
    let mut lo = 0usize;
    let mut hi = total;
    let mut best = 0usize;
    while lo <= hi {
        let mid = lo + (hi - lo) / 2;
        if fits(mid) {
            best = mid;
            lo = mid + 1;
        } else {
            if mid == 0 {
                break;
            }
            hi = mid - 1;
        }
    }
    best
}

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte offset of the `chars`-th character boundary, clamped to the end.
pub fn char_boundary(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len())
}

pub fn prefix(text: &str, chars: usize) -> &str {
    &text[..char_boundary(text, chars)]
}

/// Splits after `chars` characters. `head + tail == text` always.
pub fn split_at_char(text: &str, chars: usize) -> (String, String) {
    let (head, tail) = text.split_at(char_boundary(text, chars));
    (head.to_string(), tail.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_the_last_fitting_length() {
        for limit in 0..=40 {
            assert_eq!(max_fitting_prefix(40, |n| n <= limit), limit);
        }
        assert_eq!(max_fitting_prefix(40, |n| n <= 100), 40);
        assert_eq!(max_fitting_prefix(0, |_| true), 0);
        assert_eq!(max_fitting_prefix(10, |_| false), 0);
    }

    #[test]
    fn probe_count_is_logarithmic() {
        let mut probes = 0;
        let found = max_fitting_prefix(1_000_000, |n| {
            probes += 1;
            n <= 654_321
        });
        assert_eq!(found, 654_321);
        assert!(probes <= 21, "took {probes} probes");
    }

    #[test]
    fn splitting_respects_char_boundaries() {
        let text = "黑水镇的雾";
        assert_eq!(char_len(text), 5);
        assert_eq!(prefix(text, 2), "黑水");
        let (head, tail) = split_at_char(text, 3);
        assert_eq!(head, "黑水镇");
        assert_eq!(tail, "的雾");
        assert_eq!(format!("{head}{tail}"), text);
        let (head, tail) = split_at_char(text, 99);
        assert_eq!(head, text);
        assert!(tail.is_empty());
    }
}
