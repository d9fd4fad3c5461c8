//! Natural ordering: digit runs compare by numeric value.

use std::cmp::Ordering;

/// Compare two strings so that `Test#9` sorts before `Test#10`.
///
/// Runs of ASCII digits are compared as numbers, everything else byte by
/// byte. Strings that only differ in leading zeros fall back to plain
/// ordering so the result stays total.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (mut x, mut y) = (a.as_bytes(), b.as_bytes());

    loop {
        match (x.first(), y.first()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(c), Some(d)) if c.is_ascii_digit() && d.is_ascii_digit() => {
                let (num_a, rest_a) = split_digits(x);
                let (num_b, rest_b) = split_digits(y);
                match cmp_numeric(num_a, num_b) {
                    Ordering::Equal => {}
                    ord => return ord,
                }
                x = rest_a;
                y = rest_b;
            }
            (Some(c), Some(d)) => {
                if c != d {
                    return c.cmp(d);
                }
                x = &x[1..];
                y = &y[1..];
            }
        }
    }
}

/// Whether `items` is already in natural order.
pub fn is_naturally_sorted<S: AsRef<str>>(items: &[S]) -> bool {
    items
        .windows(2)
        .all(|w| natural_cmp(w[0].as_ref(), w[1].as_ref()) != Ordering::Greater)
}

fn split_digits(s: &[u8]) -> (&[u8], &[u8]) {
    let end = s.iter().position(|b| !b.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(end)
}

fn cmp_numeric(a: &[u8], b: &[u8]) -> Ordering {
    let a = trim_zeros(a);
    let b = trim_zeros(b);
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn trim_zeros(s: &[u8]) -> &[u8] {
    let start = s.iter().position(|b| *b != b'0').unwrap_or(s.len());
    &s[start..]
}
