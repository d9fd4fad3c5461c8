//! Sequence matcher producing edit opcodes between two token sequences.
//!
//! The algorithm looks for the longest contiguous matching block between
//! the two sequences, then recurses on the pieces left and right of it.
//! This does not yield minimal edit scripts, but it does produce diffs that
//! line up the way people read them.
//!
//! Elements that occur very often in the second sequence ("popular"
//! elements, only considered once it has 200 or more items) are left out of
//! the primary search and re-absorbed at the edges of each match.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Default number of context lines around a change.
pub const DEFAULT_CONTEXT: usize = 3;

/// Sequences shorter than this never have popular elements.
const AUTOJUNK_MIN_LEN: usize = 200;

/// Kind of edit described by an [`OpCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// `a[i1..i2] == b[j1..j2]`
    Equal,
    /// `b[j1..j2]` is inserted at `a[i1..i1]`
    Insert,
    /// `a[i1..i2]` is deleted, `j1 == j2`
    Delete,
    /// `a[i1..i2]` is replaced by `b[j1..j2]`
    Replace,
}

/// One step of the edit script turning `a` into `b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpCode {
    pub tag: Tag,
    pub i1: usize,
    pub i2: usize,
    pub j1: usize,
    pub j2: usize,
}

impl OpCode {
    fn new(tag: Tag, i1: usize, i2: usize, j1: usize, j2: usize) -> Self {
        Self { tag, i1, i2, j1, j2 }
    }
}

/// A block `a[a..a + size] == b[b..b + size]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Match {
    pub a: usize,
    pub b: usize,
    pub size: usize,
}

/// Compares two sequences of hashable tokens.
pub struct SequenceMatcher<'a, T> {
    a: &'a [T],
    b: &'a [T],
    b2j: HashMap<&'a T, Vec<usize>>,
}

impl<'a, T: Hash + Eq> SequenceMatcher<'a, T> {
    pub fn new(a: &'a [T], b: &'a [T]) -> Self {
        let mut b2j: HashMap<&'a T, Vec<usize>> = HashMap::new();
        for (j, elt) in b.iter().enumerate() {
            b2j.entry(elt).or_default().push(j);
        }

        if b.len() >= AUTOJUNK_MIN_LEN {
            let threshold = b.len() / 100 + 1;
            let popular: HashSet<&'a T> = b2j
                .iter()
                .filter(|(_, indices)| indices.len() > threshold)
                .map(|(elt, _)| *elt)
                .collect();
            for elt in popular {
                b2j.remove(elt);
            }
        }

        Self { a, b, b2j }
    }

    /// Longest matching block in `a[alo..ahi]` and `b[blo..bhi]`.
    ///
    /// Of all maximal blocks, returns the one starting earliest in `a`, and of
    /// those the one starting earliest in `b`. Returns `(alo, blo, 0)` when
    /// nothing matches.
    pub fn find_longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> Match {
        let (mut besti, mut bestj, mut bestsize) = (alo, blo, 0);

        // j2len[j] = length of the longest match ending with a[i - 1] and b[j]
        let mut j2len: HashMap<usize, usize> = HashMap::new();
        for i in alo..ahi {
            let mut new_j2len = HashMap::new();
            if let Some(indices) = self.b2j.get(&self.a[i]) {
                for &j in indices {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let prev = if j > 0 {
                        j2len.get(&(j - 1)).copied().unwrap_or(0)
                    } else {
                        0
                    };
                    let k = prev + 1;
                    new_j2len.insert(j, k);
                    if k > bestsize {
                        besti = i + 1 - k;
                        bestj = j + 1 - k;
                        bestsize = k;
                    }
                }
            }
            j2len = new_j2len;
        }

        // Popular elements are not in b2j, pull them in at both ends.
        while besti > alo && bestj > blo && self.a[besti - 1] == self.b[bestj - 1] {
            besti -= 1;
            bestj -= 1;
            bestsize += 1;
        }
        while besti + bestsize < ahi
            && bestj + bestsize < bhi
            && self.a[besti + bestsize] == self.b[bestj + bestsize]
        {
            bestsize += 1;
        }

        Match {
            a: besti,
            b: bestj,
            size: bestsize,
        }
    }

    /// Matching blocks, increasing in both `a` and `b`, with adjacent blocks
    /// collapsed. The last block is the sentinel `(len(a), len(b), 0)`.
    pub fn matching_blocks(&self) -> Vec<Match> {
        let mut queue = vec![(0, self.a.len(), 0, self.b.len())];
        let mut blocks = Vec::new();

        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let m = self.find_longest_match(alo, ahi, blo, bhi);
            if m.size == 0 {
                continue;
            }
            if alo < m.a && blo < m.b {
                queue.push((alo, m.a, blo, m.b));
            }
            if m.a + m.size < ahi && m.b + m.size < bhi {
                queue.push((m.a + m.size, ahi, m.b + m.size, bhi));
            }
            blocks.push(m);
        }
        blocks.sort();

        let mut collapsed = Vec::with_capacity(blocks.len() + 1);
        let mut current = Match { a: 0, b: 0, size: 0 };
        for block in blocks {
            if current.a + current.size == block.a && current.b + current.size == block.b {
                current.size += block.size;
            } else {
                if current.size > 0 {
                    collapsed.push(current);
                }
                current = block;
            }
        }
        if current.size > 0 {
            collapsed.push(current);
        }

        collapsed.push(Match {
            a: self.a.len(),
            b: self.b.len(),
            size: 0,
        });
        collapsed
    }

    /// Edit script turning `a` into `b`.
    ///
    /// Opcodes cover both sequences contiguously: the first starts at
    /// `i1 == j1 == 0` and each starts where the previous one ended. Two empty
    /// sequences give a single empty `Equal`.
    pub fn opcodes(&self) -> Vec<OpCode> {
        let (mut i, mut j) = (0, 0);
        let blocks = self.matching_blocks();
        let mut codes = Vec::with_capacity(blocks.len() * 2);

        for m in blocks {
            let tag = match (i < m.a, j < m.b) {
                (true, true) => Some(Tag::Replace),
                (true, false) => Some(Tag::Delete),
                (false, true) => Some(Tag::Insert),
                (false, false) => None,
            };
            if let Some(tag) = tag {
                codes.push(OpCode::new(tag, i, m.a, j, m.b));
            }
            i = m.a + m.size;
            j = m.b + m.size;
            if m.size > 0 {
                codes.push(OpCode::new(Tag::Equal, m.a, i, m.b, j));
            }
        }

        if codes.is_empty() {
            codes.push(OpCode::new(Tag::Equal, 0, 0, 0, 0));
        }
        codes
    }

    /// Opcodes clustered into hunks with up to `n` items of context.
    ///
    /// Equal runs longer than `2n` split hunks and are trimmed to `n` items on
    /// each side. Returns no hunks when the sequences are equal.
    pub fn grouped_opcodes(&self, n: usize) -> Vec<Vec<OpCode>> {
        let mut codes = self.opcodes();

        if let Some(first) = codes.first_mut() {
            if first.tag == Tag::Equal {
                first.i1 = first.i1.max(first.i2.saturating_sub(n));
                first.j1 = first.j1.max(first.j2.saturating_sub(n));
            }
        }
        if let Some(last) = codes.last_mut() {
            if last.tag == Tag::Equal {
                last.i2 = last.i2.min(last.i1 + n);
                last.j2 = last.j2.min(last.j1 + n);
            }
        }

        let nn = n + n;
        let mut groups = Vec::new();
        let mut group = Vec::new();
        for code in codes {
            let OpCode {
                tag,
                mut i1,
                i2,
                mut j1,
                j2,
            } = code;
            if tag == Tag::Equal && i2 - i1 > nn {
                group.push(OpCode::new(tag, i1, i2.min(i1 + n), j1, j2.min(j1 + n)));
                groups.push(std::mem::take(&mut group));
                i1 = i1.max(i2.saturating_sub(n));
                j1 = j1.max(j2.saturating_sub(n));
            }
            group.push(OpCode::new(tag, i1, i2, j1, j2));
        }

        if !group.is_empty() && !(group.len() == 1 && group[0].tag == Tag::Equal) {
            groups.push(group);
        }
        groups
    }
}

/// Format a `start..stop` range the way unified diff headers do.
pub fn format_range_unified(start: usize, stop: usize) -> String {
    let mut beginning = start + 1;
    let length = stop - start;

    if length == 1 {
        return beginning.to_string();
    }
    if length == 0 {
        beginning -= 1;
    }

    format!("{},{}", beginning, length)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply<T: Clone>(codes: &[OpCode], a: &[T], b: &[T]) -> Vec<T> {
        let mut out = Vec::new();
        for code in codes {
            match code.tag {
                Tag::Equal => out.extend_from_slice(&a[code.i1..code.i2]),
                Tag::Insert | Tag::Replace => out.extend_from_slice(&b[code.j1..code.j2]),
                Tag::Delete => {}
            }
        }
        out
    }

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn assert_reconstructs(a: &[char], b: &[char]) {
        let codes = SequenceMatcher::new(a, b).opcodes();

        // contiguous coverage
        let (mut i, mut j) = (0, 0);
        for code in &codes {
            assert_eq!((code.i1, code.j1), (i, j), "gap before {:?}", code);
            i = code.i2;
            j = code.j2;
        }
        assert_eq!((i, j), (a.len(), b.len()));

        assert_eq!(apply(&codes, a, b), b.to_vec());
    }

    #[test]
    fn longest_match_prefers_earliest_block() {
        let a = chars(" abcd");
        let b = chars("abcd abcd");
        let m = SequenceMatcher::new(&a, &b).find_longest_match(0, 5, 0, 9);
        assert_eq!(m, Match { a: 0, b: 4, size: 5 });
    }

    #[test]
    fn matching_blocks_end_with_sentinel() {
        let a = chars("abxcd");
        let b = chars("abcd");
        let blocks = SequenceMatcher::new(&a, &b).matching_blocks();
        assert_eq!(
            blocks,
            vec![
                Match { a: 0, b: 0, size: 2 },
                Match { a: 3, b: 2, size: 2 },
                Match { a: 5, b: 4, size: 0 },
            ]
        );
    }

    #[test]
    fn opcodes_describe_edit() {
        let a = chars("qabxcd");
        let b = chars("abycdf");
        let codes = SequenceMatcher::new(&a, &b).opcodes();
        assert_eq!(
            codes,
            vec![
                OpCode::new(Tag::Delete, 0, 1, 0, 0),
                OpCode::new(Tag::Equal, 1, 3, 0, 2),
                OpCode::new(Tag::Replace, 3, 4, 2, 3),
                OpCode::new(Tag::Equal, 4, 6, 3, 5),
                OpCode::new(Tag::Insert, 6, 6, 5, 6),
            ]
        );
    }

    #[test]
    fn empty_inputs_give_trivial_equal() {
        let empty: Vec<char> = Vec::new();
        let codes = SequenceMatcher::new(&empty, &empty).opcodes();
        assert_eq!(codes, vec![OpCode::new(Tag::Equal, 0, 0, 0, 0)]);
        assert!(SequenceMatcher::new(&empty, &empty).grouped_opcodes(3).is_empty());
    }

    #[test]
    fn opcodes_reconstruct_target() {
        let cases = [
            ("", ""),
            ("", "abc"),
            ("abc", ""),
            ("abc", "abc"),
            ("ab", "acab"),
            ("private thread", "private volatile thread"),
            ("the quick brown fox", "the slow brown dog jumps"),
            ("aaaaaaaaab", "baaaaaaaaa"),
        ];
        for (a, b) in cases {
            assert_reconstructs(&chars(a), &chars(b));
        }
    }

    #[test]
    fn popular_elements_still_reconstruct() {
        // 300 items, "x" far above the popularity threshold
        let a: Vec<String> = (0..300)
            .map(|i| if i % 3 == 0 { format!("line {}", i) } else { "x".to_string() })
            .collect();
        let mut b = a.clone();
        b[150] = "changed".to_string();
        b.insert(10, "inserted".to_string());

        let codes = SequenceMatcher::new(&a, &b).opcodes();
        assert_eq!(apply(&codes, &a, &b), b);
    }

    #[test]
    fn grouped_opcodes_trim_context() {
        let a: Vec<String> = (1..=40).map(|i| i.to_string()).collect();
        let mut b = a.clone();
        b[7] = "8i".to_string();
        b[29] = "30i".to_string();

        let groups = SequenceMatcher::new(&a, &b).grouped_opcodes(3);
        assert_eq!(groups.len(), 2);
        assert_eq!(
            groups[0],
            vec![
                OpCode::new(Tag::Equal, 4, 7, 4, 7),
                OpCode::new(Tag::Replace, 7, 8, 7, 8),
                OpCode::new(Tag::Equal, 8, 11, 8, 11),
            ]
        );
        assert_eq!(
            groups[1],
            vec![
                OpCode::new(Tag::Equal, 26, 29, 26, 29),
                OpCode::new(Tag::Replace, 29, 30, 29, 30),
                OpCode::new(Tag::Equal, 30, 33, 30, 33),
            ]
        );
    }

    #[test]
    fn unified_ranges() {
        assert_eq!(format_range_unified(0, 1), "1");
        assert_eq!(format_range_unified(3, 7), "4,4");
        assert_eq!(format_range_unified(5, 5), "5,0");
    }
}
