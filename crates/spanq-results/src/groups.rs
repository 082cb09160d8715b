//! Hits grouped by a property value.

use std::collections::{HashMap, HashSet};

use spanq_spans::Corpus;

use crate::{Hit, HitProperty, HitResults, MaxStats, PropertyValue, ResultsError};

/// Hits sharing one property value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitGroup {
    /// The shared value.
    identity: PropertyValue,
    /// Stored hits, at most the per-group cap.
    stored: Vec<Hit>,
    /// All hits in the group.
    total_hits: usize,
    /// Distinct documents in the group.
    total_docs: usize,
    /// Caps hit while reading the grouped hits.
    max_stats: MaxStats,
}

impl HitGroup {
    /// A group that keeps statistics but no hits.
    ///
    /// The flags are taken in declaration order: processed first, then counted.
    pub fn without_results(
        identity: PropertyValue,
        total_hits: usize,
        total_docs: usize,
        max_hits_processed: bool,
        max_hits_counted: bool,
    ) -> Self {
        Self {
            identity,
            stored: Vec::new(),
            total_hits,
            total_docs,
            max_stats: MaxStats {
                hits_processed_exceeded: max_hits_processed,
                hits_counted_exceeded: max_hits_counted,
            },
        }
    }

    /// The shared property value.
    pub fn identity(&self) -> &PropertyValue {
        &self.identity
    }

    /// Stored hits.
    pub fn stored_hits(&self) -> &[Hit] {
        &self.stored
    }

    /// All hits in the group.
    pub fn total_hits(&self) -> usize {
        self.total_hits
    }

    /// Distinct documents in the group.
    pub fn total_docs(&self) -> usize {
        self.total_docs
    }

    /// Caps hit while reading the grouped hits.
    pub fn max_stats(&self) -> MaxStats {
        self.max_stats
    }
}

/// Groups of hits in order of first appearance.
#[derive(Debug, Clone)]
pub struct HitGroups {
    /// What the hits were grouped by.
    property: HitProperty,
    /// Groups.
    groups: Vec<HitGroup>,
    /// Position of each identity in `groups`.
    index: HashMap<PropertyValue, usize>,
    /// Hits over all groups.
    total_hits: usize,
    /// Caps hit while reading the source.
    max_stats: MaxStats,
}

/// A group under construction.
struct GroupBuilder {
    /// Shared value.
    identity: PropertyValue,
    /// Stored hits.
    stored: Vec<Hit>,
    /// Hits seen.
    total_hits: usize,
    /// Documents seen.
    docs: HashSet<u32>,
}

impl HitGroups {
    /// Reads all of `results` and groups the hits by `property`.
    ///
    /// Each group stores at most `cap_per_group` hits. With a cap of zero the groups
    /// keep only their statistics.
    pub fn from_hits(
        results: &HitResults,
        property: &HitProperty,
        cap_per_group: usize,
        corpus: &dyn Corpus,
    ) -> Result<Self, ResultsError> {
        let hits = results.all_hits()?;
        let values = property.values(&hits, corpus)?;
        let max_stats = results.max_stats();

        let mut index: HashMap<PropertyValue, usize> = HashMap::new();
        let mut builders: Vec<GroupBuilder> = Vec::new();
        for (hit, value) in hits.iter().zip(values) {
            let slot = match index.get(&value) {
                Some(&slot) => slot,
                None => {
                    index.insert(value.clone(), builders.len());
                    builders.push(GroupBuilder {
                        identity: value,
                        stored: Vec::new(),
                        total_hits: 0,
                        docs: HashSet::new(),
                    });
                    builders.len() - 1
                }
            };
            let group = &mut builders[slot];
            group.total_hits += 1;
            group.docs.insert(hit.doc);
            if group.stored.len() < cap_per_group {
                group.stored.push(*hit);
            }
        }

        let groups = builders
            .into_iter()
            .map(|b| {
                if cap_per_group == 0 {
                    HitGroup::without_results(
                        b.identity,
                        b.total_hits,
                        b.docs.len(),
                        max_stats.hits_processed_exceeded,
                        max_stats.hits_counted_exceeded,
                    )
                } else {
                    HitGroup {
                        identity: b.identity,
                        stored: b.stored,
                        total_hits: b.total_hits,
                        total_docs: b.docs.len(),
                        max_stats,
                    }
                }
            })
            .collect();
        tracing::debug!(%property, groups = index.len(), hits = hits.len(), "grouped hits");

        Ok(Self {
            property: property.clone(),
            groups,
            index,
            total_hits: hits.len(),
            max_stats,
        })
    }

    /// What the hits were grouped by.
    pub fn property(&self) -> &HitProperty {
        &self.property
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// True if there are no groups.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Groups in order of first appearance.
    pub fn groups(&self) -> &[HitGroup] {
        &self.groups
    }

    /// The group with this identity.
    pub fn get(&self, identity: &PropertyValue) -> Option<&HitGroup> {
        self.index.get(identity).map(|&i| &self.groups[i])
    }

    /// Groups by descending size, ties by identity.
    pub fn largest_first(&self) -> Vec<&HitGroup> {
        let mut groups: Vec<&HitGroup> = self.groups.iter().collect();
        groups.sort_by(|a, b| {
            b.total_hits
                .cmp(&a.total_hits)
                .then_with(|| a.identity.cmp(&b.identity))
        });
        groups
    }

    /// Hits over all groups.
    pub fn total_hits(&self) -> usize {
        self.total_hits
    }

    /// Caps hit while reading the source.
    pub fn max_stats(&self) -> MaxStats {
        self.max_stats
    }
}
