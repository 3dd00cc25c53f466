//! # Hierarchical Keys
//!
//! An [`HKey`] identifies a row's position inside a group tree as an
//! ordered sequence of segments: table ordinals interleaved with key
//! values. Comparison is lexicographic over segments, so iterating a group
//! in hkey order visits every parent immediately before its descendants.
//!
//! The hkey-ordered operators lean on three primitives here: lexicographic
//! ordering, prefix testing (the ancestor relation) and the index of the
//! first differing segment between adjacent keys.

use smallvec::SmallVec;

/// One segment of a hierarchical key.
///
/// Ordinals mark table levels; the remaining variants carry key column
/// values. The derived `Ord` keeps `Null` below every concrete value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeySegment {
    Null,
    Ordinal(u16),
    Int(i64),
    Text(String),
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HKey {
    segments: SmallVec<[KeySegment; 8]>,
}

impl HKey {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_segments(segments: impl IntoIterator<Item = KeySegment>) -> Self {
        Self {
            segments: segments.into_iter().collect(),
        }
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segment(&self, index: usize) -> Option<&KeySegment> {
        self.segments.get(index)
    }

    pub fn segments(&self) -> &[KeySegment] {
        &self.segments
    }

    pub fn push(&mut self, segment: KeySegment) {
        self.segments.push(segment);
    }

    pub fn truncate(&mut self, segment_count: usize) {
        self.segments.truncate(segment_count);
    }

    /// A copy of this key keeping only the first `segment_count` segments.
    pub fn prefix(&self, segment_count: usize) -> HKey {
        HKey {
            segments: self.segments[..segment_count.min(self.segments.len())]
                .iter()
                .cloned()
                .collect(),
        }
    }

    /// Key of this key's child obtained by appending `segment`.
    pub fn child(&self, segment: KeySegment) -> HKey {
        let mut child = self.clone();
        child.push(segment);
        child
    }

    /// True when `other` lies in the subtree rooted at `self`. Every key is
    /// a prefix of itself.
    pub fn is_prefix_of(&self, other: &HKey) -> bool {
        other.segments.len() >= self.segments.len()
            && other.segments[..self.segments.len()] == self.segments[..]
    }

    /// Index of the first segment where the two keys differ; `None` when
    /// they are identical. A strict prefix differs at its own length.
    pub fn first_difference(&self, other: &HKey) -> Option<usize> {
        let shared = self.segments.len().min(other.segments.len());
        for i in 0..shared {
            if self.segments[i] != other.segments[i] {
                return Some(i);
            }
        }
        if self.segments.len() == other.segments.len() {
            None
        } else {
            Some(shared)
        }
    }
}

impl FromIterator<KeySegment> for HKey {
    fn from_iter<T: IntoIterator<Item = KeySegment>>(iter: T) -> Self {
        HKey::from_segments(iter)
    }
}
