//! Run-scoped in-memory store for parsed, annotated records.
//!
//! Holds the abstract records for the duration of one pipeline run and
//! attaches topic assignments once extraction has completed. The export and
//! visualization stages read from here; nothing retains a reference after
//! the run ends.

use crate::error::{PipelineError, Result};
use crate::parser::AbstractRecord;
use crate::topics::TopicAssignment;

/// A record together with its topic assignment, if one has been attached.
#[derive(Debug)]
pub struct AnnotatedRecord<'a> {
    pub record: &'a AbstractRecord,
    pub assignment: Option<&'a TopicAssignment>,
}

/// Collection of records for one run.
#[derive(Debug, Default)]
pub struct RecordStore {
    records: Vec<AbstractRecord>,
    assignments: Vec<TopicAssignment>,
}

impl RecordStore {
    pub fn new(records: Vec<AbstractRecord>) -> Self {
        Self {
            records,
            assignments: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[AbstractRecord] {
        &self.records
    }

    /// Attach topic assignments, one per record, created at most once per run.
    ///
    /// # Errors
    ///
    /// Fails when assignments were already attached or when the count does
    /// not match the record count.
    pub fn attach_assignments(&mut self, assignments: Vec<TopicAssignment>) -> Result<()> {
        if !self.assignments.is_empty() {
            return Err(PipelineError::Extraction(
                "topic assignments already attached".to_string(),
            ));
        }
        if assignments.len() != self.records.len() {
            return Err(PipelineError::Extraction(format!(
                "assignment count {} does not match record count {}",
                assignments.len(),
                self.records.len()
            )));
        }
        self.assignments = assignments;
        Ok(())
    }

    /// Iterate records paired with their assignments, in input order.
    pub fn iter(&self) -> impl Iterator<Item = AnnotatedRecord<'_>> {
        self.records
            .iter()
            .enumerate()
            .map(|(i, record)| AnnotatedRecord {
                record,
                assignment: self.assignments.get(i),
            })
    }

    pub fn by_ordinal(&self, ordinal: u32) -> Option<&AbstractRecord> {
        self.records.iter().find(|r| r.ordinal == ordinal)
    }

    pub fn records_in_year(&self, year: i32) -> Vec<&AbstractRecord> {
        self.records
            .iter()
            .filter(|r| r.year == Some(year))
            .collect()
    }

    pub fn records_for_topic(&self, topic_id: i32) -> Vec<&AbstractRecord> {
        self.iter()
            .filter(|a| a.assignment.map(|t| t.topic_id) == Some(topic_id))
            .map(|a| a.record)
            .collect()
    }

    /// Distinct publication years, ascending.
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.records.iter().filter_map(|r| r.year).collect();
        years.sort_unstable();
        years.dedup();
        years
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn record(ordinal: u32, year: i32) -> AbstractRecord {
        AbstractRecord {
            ordinal,
            title: format!("Title {}", ordinal),
            authors: vec!["Doe J".to_string()],
            year: Some(year),
            journal: None,
            identifiers: BTreeMap::new(),
            free_text: "Some abstract text.".to_string(),
        }
    }

    fn assignment(doc_index: usize, topic_id: i32) -> TopicAssignment {
        TopicAssignment {
            doc_index,
            topic_id,
            keywords: vec!["keyword".to_string()],
            score: 0.9,
        }
    }

    #[test]
    fn test_lookup_and_filters() {
        let mut store = RecordStore::new(vec![record(1, 2019), record(2, 2020), record(3, 2020)]);
        store
            .attach_assignments(vec![assignment(0, 0), assignment(1, 1), assignment(2, 0)])
            .expect("attach");

        assert_eq!(store.len(), 3);
        assert_eq!(store.by_ordinal(2).map(|r| r.ordinal), Some(2));
        assert!(store.by_ordinal(9).is_none());
        assert_eq!(store.records_in_year(2020).len(), 2);
        assert_eq!(store.years(), vec![2019, 2020]);

        let topic0: Vec<u32> = store.records_for_topic(0).iter().map(|r| r.ordinal).collect();
        assert_eq!(topic0, vec![1, 3]);
    }

    #[test]
    fn test_attach_rejects_length_mismatch() {
        let mut store = RecordStore::new(vec![record(1, 2019), record(2, 2020)]);
        let result = store.attach_assignments(vec![assignment(0, 0)]);
        assert!(matches!(result, Err(PipelineError::Extraction(_))));
    }

    #[test]
    fn test_attach_rejects_double_attachment() {
        let mut store = RecordStore::new(vec![record(1, 2019)]);
        store
            .attach_assignments(vec![assignment(0, 0)])
            .expect("first attach");
        let result = store.attach_assignments(vec![assignment(0, 1)]);
        assert!(matches!(result, Err(PipelineError::Extraction(_))));
    }

    #[test]
    fn test_iter_without_assignments() {
        let store = RecordStore::new(vec![record(1, 2019)]);
        let annotated: Vec<_> = store.iter().collect();
        assert_eq!(annotated.len(), 1);
        assert!(annotated[0].assignment.is_none());
    }
}
