//! Ordered union of feature labels across samples
//!
//! The union order is part of the output contract: row positions in the
//! merged matrices are observable, so the union preserves the order in
//! which labels are first seen while walking samples in input order.

use rustc_hash::FxHashMap;

/// Global feature space for one merge invocation, with an O(1)
/// label -> row-position lookup table reused for every layer and sample.
#[derive(Debug, Clone, Default)]
pub struct LabelUnion {
    labels: Vec<String>,
    index: FxHashMap<String, usize>,
}

impl LabelUnion {
    /// Build the union from each sample's label sequence, in sample order.
    pub fn from_samples<'a, I>(samples: I) -> Self
    where
        I: IntoIterator<Item = &'a [String]>,
    {
        let mut union = LabelUnion::default();
        for labels in samples {
            for label in labels {
                if !union.index.contains_key(label) {
                    union.index.insert(label.clone(), union.labels.len());
                    union.labels.push(label.clone());
                }
            }
        }
        union
    }

    /// Row position of a label in the global space.
    #[inline]
    pub fn position(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[inline]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn into_labels(self) -> Vec<String> {
        self.labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn union_keeps_first_seen_order() {
        let s1 = owned(&["A", "B"]);
        let s2 = owned(&["B", "C"]);
        let union = LabelUnion::from_samples([s1.as_slice(), s2.as_slice()]);
        assert_eq!(union.labels(), owned(&["A", "B", "C"]).as_slice());
        assert_eq!(union.position("A"), Some(0));
        assert_eq!(union.position("B"), Some(1));
        assert_eq!(union.position("C"), Some(2));
        assert_eq!(union.position("D"), None);
    }

    #[test]
    fn union_is_deterministic_across_invocations() {
        let s1 = owned(&["G2", "G1", "G3"]);
        let s2 = owned(&["G4", "G1"]);
        let a = LabelUnion::from_samples([s1.as_slice(), s2.as_slice()]);
        let b = LabelUnion::from_samples([s1.as_slice(), s2.as_slice()]);
        assert_eq!(a.labels(), b.labels());
    }

    #[test]
    fn every_input_label_appears_exactly_once() {
        let s1 = owned(&["A", "B", "A"]);
        let s2 = owned(&["B"]);
        let union = LabelUnion::from_samples([s1.as_slice(), s2.as_slice()]);
        assert_eq!(union.labels(), owned(&["A", "B"]).as_slice());
    }

    #[test]
    fn empty_samples_yield_empty_union() {
        let s1: Vec<String> = Vec::new();
        let union = LabelUnion::from_samples([s1.as_slice()]);
        assert!(union.is_empty());
        assert_eq!(union.len(), 0);
    }
}
