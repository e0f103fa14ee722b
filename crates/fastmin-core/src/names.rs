//! Short-name allocation.
//!
//! Names are enumerated shortest-first from an alphabet whose first 54
//! characters may lead an identifier and whose last 10 are digits. The
//! enumeration is a bijection between indices and identifier-shaped strings,
//! so a cursor can resume from any index recorded by an earlier run.

use fastmin_syntax::is_reserved_word;

/// Canonical character order; ties in frequency sorting fall back to it.
pub const CANONICAL_ALPHABET: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ$_0123456789";

const LEADING: usize = 54;
const TOTAL: usize = 64;

/// Consecutive rejections after which a cursor gives up.
const MAX_REJECTIONS: usize = 1 << 20;

/// Position of `c` in the canonical alphabet.
fn canonical_index(c: char) -> Option<usize> {
    match c {
        'a'..='z' => Some(c as usize - 'a' as usize),
        'A'..='Z' => Some(26 + c as usize - 'A' as usize),
        '$' => Some(52),
        '_' => Some(53),
        '0'..='9' => Some(54 + c as usize - '0' as usize),
        _ => None,
    }
}

/// An ordering of the 64 identifier characters used to build names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    chars: Vec<char>,
}

impl Default for Alphabet {
    fn default() -> Self {
        Self::canonical()
    }
}

impl Alphabet {
    /// The fixed canonical order.
    #[must_use]
    pub fn canonical() -> Self {
        Self {
            chars: CANONICAL_ALPHABET.chars().collect(),
        }
    }

    /// The `n`-th name of the enumeration.
    ///
    /// Indices `0..54` are the single-character names, the next `54 * 64`
    /// are the two-character names, and so on.
    #[must_use]
    pub fn nth(&self, mut n: usize) -> String {
        let mut name = String::new();
        name.push(self.chars[n % LEADING]);
        n /= LEADING;
        while n > 0 {
            n -= 1;
            name.push(self.chars[n % TOTAL]);
            n /= TOTAL;
        }
        name
    }

    #[must_use]
    pub fn as_string(&self) -> String {
        self.chars.iter().collect()
    }
}

/// Character counts over the text that survives renaming.
#[derive(Debug, Clone)]
pub struct CharFrequency {
    counts: [u64; TOTAL],
}

impl Default for CharFrequency {
    fn default() -> Self {
        Self { counts: [0; TOTAL] }
    }
}

impl CharFrequency {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count every alphabet character in `text`.
    pub fn consider(&mut self, text: &str) {
        for c in text.chars() {
            if let Some(i) = canonical_index(c) {
                self.counts[i] += 1;
            }
        }
    }

    #[must_use]
    pub fn count(&self, c: char) -> u64 {
        canonical_index(c).map_or(0, |i| self.counts[i])
    }

    /// The alphabet ordered by descending count, digits always last.
    ///
    /// The sort is stable over the canonical order, so equal counts keep
    /// their canonical relative position.
    #[must_use]
    pub fn sorted(&self) -> Alphabet {
        let canonical: Vec<char> = CANONICAL_ALPHABET.chars().collect();
        let mut leading: Vec<usize> = (0..LEADING).collect();
        let mut digits: Vec<usize> = (LEADING..TOTAL).collect();
        leading.sort_by(|a, b| self.counts[*b].cmp(&self.counts[*a]));
        digits.sort_by(|a, b| self.counts[*b].cmp(&self.counts[*a]));
        Alphabet {
            chars: leading
                .into_iter()
                .chain(digits)
                .map(|i| canonical[i])
                .collect(),
        }
    }
}

/// Position in one naming space.
///
/// A cursor only moves forward. It starts before index 0, or resumes after
/// an index persisted by an earlier run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    last: i64,
}

impl Default for Cursor {
    fn default() -> Self {
        Self::new()
    }
}

impl Cursor {
    #[must_use]
    pub fn new() -> Self {
        Self { last: -1 }
    }

    /// Continue after index `last`.
    #[must_use]
    pub fn resume(last: i64) -> Self {
        Self { last: last.max(-1) }
    }

    /// The last index handed out, or -1.
    #[must_use]
    pub fn last(&self) -> i64 {
        self.last
    }

    /// Advance to the next name that is neither a reserved word nor `blocked`.
    ///
    /// Returns `None` when no acceptable name turns up within a bounded number
    /// of attempts.
    pub fn next(
        &mut self,
        alphabet: &Alphabet,
        mut blocked: impl FnMut(&str) -> bool,
    ) -> Option<String> {
        for _ in 0..MAX_REJECTIONS {
            self.last += 1;
            let index = usize::try_from(self.last).ok()?;
            let name = alphabet.nth(index);
            if !is_reserved_word(&name) && !blocked(&name) {
                return Some(name);
            }
        }
        None
    }
}
