//! Per-entity consistency state, folded once over the record sequence.
//!
//! Two distinct notions of inconsistency live here:
//! - *novelty* (spreadsheet pipeline): the first value per entity is the
//!   baseline, every later value not seen before for that entity is flagged
//!   once.
//! - *majority deviation* (order pipeline): after the fold, each record whose
//!   value differs from the entity's plurality value is flagged.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::model::{FieldBreakdown, FieldMap, ValueCount};

/// Result of offering a value to a seen-set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// First value ever seen for this entity.
    Baseline,
    /// Already seen for this entity.
    Repeat,
    /// Not seen before, and a baseline already exists.
    Novel,
}

/// One field value of one record, kept for the plurality pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub record_id: String,
    pub value: String,
}

#[derive(Debug, Default)]
pub struct EntityState {
    addresses: HashSet<String>,
    domains: HashSet<String>,
    fields: IndexMap<String, Vec<Sample>>,
    records: usize,
}

impl EntityState {
    pub fn observe_address(&mut self, address: &str) -> Observation {
        observe(&mut self.addresses, address)
    }

    pub fn observe_domain(&mut self, domain: &str) -> Observation {
        observe(&mut self.domains, domain)
    }

    /// Append every field of one record to the per-field value lists.
    pub fn record_fields(&mut self, record_id: &str, fields: &FieldMap) {
        self.records += 1;
        for (field, value) in fields {
            self.fields.entry(field.clone()).or_default().push(Sample {
                record_id: record_id.to_string(),
                value: value.clone(),
            });
        }
    }

    pub fn records(&self) -> usize {
        self.records
    }

    pub fn samples(&self, field: &str) -> &[Sample] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn observe(seen: &mut HashSet<String>, value: &str) -> Observation {
    if seen.contains(value) {
        return Observation::Repeat;
    }
    let first = seen.is_empty();
    seen.insert(value.to_string());
    if first {
        Observation::Baseline
    } else {
        Observation::Novel
    }
}

/// A record whose value departs from its entity's plurality value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deviation {
    pub entity: String,
    pub field: String,
    pub record_id: String,
    pub value: String,
    pub plurality: String,
}

/// All entity states of one run, in first-appearance order.
#[derive(Debug, Default)]
pub struct ConsistencyTracker {
    entities: IndexMap<String, EntityState>,
}

impl ConsistencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// State for `key`, created on first use.
    pub fn entity_mut(&mut self, key: &str) -> &mut EntityState {
        if !self.entities.contains_key(key) {
            self.entities.insert(key.to_string(), EntityState::default());
        }
        &mut self.entities[key]
    }

    pub fn entity(&self, key: &str) -> Option<&EntityState> {
        self.entities.get(key)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Every record value that differs from its entity's plurality value.
    ///
    /// Only entities with more than one record and fields with more than one
    /// distinct value are considered. Entities, fields and records are
    /// visited in first-appearance order.
    pub fn majority_deviations(&self) -> Vec<Deviation> {
        let mut out = Vec::new();
        for (entity, state) in self.contested_fields() {
            for (field, samples) in state {
                let Some(plurality) = plurality(samples.iter().map(|s| s.value.as_str())) else {
                    continue;
                };
                for sample in samples.iter().filter(|s| s.value != plurality) {
                    out.push(Deviation {
                        entity: entity.clone(),
                        field: field.clone(),
                        record_id: sample.record_id.clone(),
                        value: sample.value.clone(),
                        plurality: plurality.to_string(),
                    });
                }
            }
        }
        out
    }

    /// Value counts for every contested field, for the consistency report.
    pub fn breakdown(&self) -> Vec<FieldBreakdown> {
        let mut out = Vec::new();
        for (entity, state) in self.contested_fields() {
            for (field, samples) in state {
                out.push(FieldBreakdown {
                    entity: entity.clone(),
                    field: field.clone(),
                    counts: value_counts(samples.iter().map(|s| s.value.as_str()))
                        .into_iter()
                        .map(|(value, count)| ValueCount {
                            value: value.to_string(),
                            count,
                        })
                        .collect(),
                });
            }
        }
        out
    }

    fn contested_fields(&self) -> impl Iterator<Item = (&String, Vec<(&String, &Vec<Sample>)>)> {
        self.entities
            .iter()
            .filter(|(_, state)| state.records > 1)
            .map(|(entity, state)| {
                let fields = state
                    .fields
                    .iter()
                    .filter(|(_, samples)| value_counts(samples.iter().map(|s| s.value.as_str())).len() > 1)
                    .collect();
                (entity, fields)
            })
    }
}

/// Distinct values with their counts, in first-appearance order.
fn value_counts<'a>(values: impl Iterator<Item = &'a str>) -> IndexMap<&'a str, usize> {
    let mut counts: IndexMap<&str, usize> = IndexMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }
    counts
}

/// Most frequent value. On a tie the value that appeared first wins.
pub fn plurality<'a>(values: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let mut best: Option<(&str, usize)> = None;
    for (value, count) in value_counts(values) {
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value)
}
