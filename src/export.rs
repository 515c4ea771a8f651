//! Tabular CSV export.
//!
//! Writes two files per run: one row per abstract with its topic
//! assignment, and a topic summary table with keyword lists and document
//! counts.

use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::store::RecordStore;
use crate::topics::{TopicModel, OUTLIER_TOPIC};

/// File name for the per-abstract export.
pub const ABSTRACTS_CSV: &str = "abstracts_with_topics.csv";

/// File name for the topic summary export.
pub const TOPIC_SUMMARY_CSV: &str = "topic_summary.csv";

/// File name for the machine-readable model dump.
pub const MODEL_JSON: &str = "topic_model.json";

/// Label used in place of keywords for the outlier topic.
const OUTLIER_LABEL: &str = "Outliers/Noise";

#[derive(Debug, Serialize)]
struct AbstractRow {
    ordinal: u32,
    title: String,
    authors: String,
    year: Option<i32>,
    journal: String,
    doi: String,
    pmid: String,
    pmcid: String,
    topic_id: Option<i32>,
    topic_keywords: String,
}

#[derive(Debug, Serialize)]
struct TopicSummaryRow {
    topic_id: i32,
    document_count: usize,
    top_words: String,
    word_scores: String,
}

/// Write one row per stored record to `<dir>/abstracts_with_topics.csv`.
pub fn write_abstracts_csv(dir: &Path, store: &RecordStore) -> Result<std::path::PathBuf> {
    let path = dir.join(ABSTRACTS_CSV);
    let mut wtr = csv::Writer::from_path(&path)
        .map_err(|e| PipelineError::Export(format!("{}: {}", path.display(), e)))?;

    for annotated in store.iter() {
        let record = annotated.record;
        let row = AbstractRow {
            ordinal: record.ordinal,
            title: record.title.clone(),
            authors: record.authors.join(", "),
            year: record.year,
            journal: record.journal.clone().unwrap_or_default(),
            doi: record.doi().unwrap_or_default().to_string(),
            pmid: record.pmid().unwrap_or_default().to_string(),
            pmcid: record.pmcid().unwrap_or_default().to_string(),
            topic_id: annotated.assignment.map(|a| a.topic_id),
            topic_keywords: annotated
                .assignment
                .map(|a| {
                    if a.topic_id == OUTLIER_TOPIC {
                        OUTLIER_LABEL.to_string()
                    } else {
                        a.keywords.join("; ")
                    }
                })
                .unwrap_or_default(),
        };
        wtr.serialize(row)?;
    }
    wtr.flush()?;

    info!(path = %path.display(), rows = store.len(), "Wrote abstracts CSV");
    Ok(path)
}

/// Write the topic summary table to `<dir>/topic_summary.csv`.
///
/// The outlier topic appears as its own row when any document fell outside
/// the fitted topics.
pub fn write_topic_summary_csv(dir: &Path, model: &TopicModel) -> Result<std::path::PathBuf> {
    let path = dir.join(TOPIC_SUMMARY_CSV);
    let mut wtr = csv::Writer::from_path(&path)
        .map_err(|e| PipelineError::Export(format!("{}: {}", path.display(), e)))?;

    if model.outlier_count > 0 {
        wtr.serialize(TopicSummaryRow {
            topic_id: OUTLIER_TOPIC,
            document_count: model.outlier_count,
            top_words: OUTLIER_LABEL.to_string(),
            word_scores: String::new(),
        })?;
    }

    for topic in &model.topics {
        wtr.serialize(TopicSummaryRow {
            topic_id: topic.id,
            document_count: topic.doc_count,
            top_words: topic
                .keywords
                .iter()
                .map(|(word, _)| word.as_str())
                .collect::<Vec<_>>()
                .join("; "),
            word_scores: topic
                .keywords
                .iter()
                .map(|(word, score)| format!("{}:{:.4}", word, score))
                .collect::<Vec<_>>()
                .join("; "),
        })?;
    }
    wtr.flush()?;

    info!(path = %path.display(), topics = model.topics.len(), "Wrote topic summary CSV");
    Ok(path)
}

/// Dump the fitted model to `<dir>/topic_model.json` for downstream tooling.
pub fn write_model_json(dir: &Path, model: &TopicModel) -> Result<std::path::PathBuf> {
    let path = dir.join(MODEL_JSON);
    let file = std::fs::File::create(&path)
        .map_err(|e| PipelineError::Export(format!("{}: {}", path.display(), e)))?;
    serde_json::to_writer_pretty(file, model)?;

    info!(path = %path.display(), "Wrote topic model JSON");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{AbstractRecord, IdKind};
    use crate::topics::{TopicAssignment, TopicInfo};
    use std::collections::BTreeMap;

    fn sample_store() -> RecordStore {
        let mut identifiers = BTreeMap::new();
        identifiers.insert(IdKind::Doi, "10.7861/futurehosp.6-2-94".to_string());
        identifiers.insert(IdKind::Pmid, "31363513".to_string());

        let record = AbstractRecord {
            ordinal: 1,
            title: "The potential for artificial intelligence in healthcare.".to_string(),
            authors: vec!["Davenport T".to_string(), "Kalakota R".to_string()],
            year: Some(2019),
            journal: Some("Future Healthc J".to_string()),
            identifiers,
            free_text: "The complexity and rise of data in healthcare.".to_string(),
        };
        let mut store = RecordStore::new(vec![record]);
        store
            .attach_assignments(vec![TopicAssignment {
                doc_index: 0,
                topic_id: 0,
                keywords: vec!["intelligence".to_string(), "artificial".to_string()],
                score: 0.8,
            }])
            .expect("attach");
        store
    }

    fn sample_model() -> TopicModel {
        TopicModel {
            topics: vec![TopicInfo {
                id: 0,
                doc_count: 1,
                keywords: vec![
                    ("intelligence".to_string(), 0.5),
                    ("artificial".to_string(), 0.25),
                ],
                centroid: vec![1.0],
            }],
            outlier_count: 2,
            num_documents: 3,
        }
    }

    #[test]
    fn test_write_abstracts_csv() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_abstracts_csv(dir.path(), &sample_store()).expect("write");

        let contents = std::fs::read_to_string(&path).expect("read back");
        let mut lines = contents.lines();
        assert_eq!(
            lines.next(),
            Some("ordinal,title,authors,year,journal,doi,pmid,pmcid,topic_id,topic_keywords")
        );
        let row = lines.next().expect("data row");
        assert!(row.starts_with("1,"));
        assert!(row.contains("\"Davenport T, Kalakota R\""));
        assert!(row.contains("31363513"));
        assert!(row.contains("intelligence; artificial"));
    }

    #[test]
    fn test_write_topic_summary_includes_outlier_row() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_topic_summary_csv(dir.path(), &sample_model()).expect("write");

        let contents = std::fs::read_to_string(&path).expect("read back");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "topic_id,document_count,top_words,word_scores");
        assert!(lines[1].starts_with("-1,2,Outliers/Noise"));
        assert!(lines[2].starts_with("0,1,"));
        assert!(lines[2].contains("intelligence:0.5000"));
    }

    #[test]
    fn test_write_model_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_model_json(dir.path(), &sample_model()).expect("write");

        let contents = std::fs::read_to_string(&path).expect("read back");
        let value: serde_json::Value = serde_json::from_str(&contents).expect("valid json");
        assert_eq!(value["num_documents"], 3);
        assert_eq!(value["outlier_count"], 2);
        assert_eq!(value["topics"][0]["keywords"][0][0], "intelligence");
        // centroids are an implementation detail, not part of the dump
        assert!(value["topics"][0].get("centroid").is_none());
    }
}
