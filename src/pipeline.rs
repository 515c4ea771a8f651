//! Pipeline orchestrator.
//!
//! Drives the four stages of a run in order: fetch the corpus from the
//! object store, parse it into abstract records, extract topics, and export
//! CSVs plus visualizations. Stages are fail-fast: the first failure marks
//! its stage failed, the remaining stages are skipped, and the summary is
//! returned to the caller rather than an error, so the CLI can report which
//! stage broke.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::export;
use crate::object_store::{ObjectStoreClient, RawCorpus};
use crate::parser;
use crate::store::RecordStore;
use crate::topics::{self, TopicModel};
use crate::viz;

/// The stages of a run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Parse,
    ExtractTopics,
    Export,
}

impl Stage {
    const ALL: [Stage; 4] = [Stage::Fetch, Stage::Parse, Stage::ExtractTopics, Stage::Export];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::Parse => "parse",
            Stage::ExtractTopics => "extract-topics",
            Stage::Export => "export",
        };
        write!(f, "{}", name)
    }
}

/// Outcome of a single stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageStatus {
    Completed,
    Failed(String),
    Skipped,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageStatus::Completed => write!(f, "completed"),
            StageStatus::Failed(reason) => write!(f, "failed: {}", reason),
            StageStatus::Skipped => write!(f, "skipped"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StageReport {
    pub stage: Stage,
    pub status: StageStatus,
}

/// What a run produced, stage by stage.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub stages: Vec<StageReport>,
    pub records_parsed: usize,
    pub segments_skipped: usize,
    pub topics_found: usize,
    pub outlier_count: usize,
    pub files_written: Vec<PathBuf>,
}

impl RunSummary {
    pub fn succeeded(&self) -> bool {
        self.stages
            .iter()
            .all(|r| r.status == StageStatus::Completed)
    }

    /// The first failed stage and its reason, if any.
    pub fn failed_stage(&self) -> Option<(Stage, &str)> {
        self.stages.iter().find_map(|r| match &r.status {
            StageStatus::Failed(reason) => Some((r.stage, reason.as_str())),
            _ => None,
        })
    }

    fn complete_stage(&mut self, stage: Stage) {
        self.stages.push(StageReport {
            stage,
            status: StageStatus::Completed,
        });
    }

    /// Mark `stage` failed and every later stage skipped.
    fn fail_from(mut self, stage: Stage, err: PipelineError) -> Self {
        error!(stage = %stage, error = %err, "Pipeline stage failed");
        self.stages.push(StageReport {
            stage,
            status: StageStatus::Failed(err.to_string()),
        });
        let skip_from = Stage::ALL
            .iter()
            .position(|&s| s == stage)
            .map_or(Stage::ALL.len(), |i| i + 1);
        for &later in &Stage::ALL[skip_from..] {
            self.stages.push(StageReport {
                stage: later,
                status: StageStatus::Skipped,
            });
        }
        self
    }
}

/// One run of the gap-analysis pipeline.
pub struct Pipeline {
    config: PipelineConfig,
    client: ObjectStoreClient,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let client = ObjectStoreClient::new(&config)?;
        Ok(Self { config, client })
    }

    /// Execute the full pipeline and return the per-stage summary.
    pub async fn run(&self) -> RunSummary {
        info!(
            source = %self.config.source,
            output = %self.config.output_dir.display(),
            "Starting research gap pipeline"
        );
        let corpus = self
            .client
            .fetch(&self.config.source.bucket, &self.config.source.key)
            .await;
        self.complete(corpus)
    }

    /// Run the stages that follow the fetch.
    ///
    /// Split from [`Pipeline::run`] so the post-fetch stages stay
    /// independent of the network.
    pub fn complete(&self, corpus: Result<RawCorpus>) -> RunSummary {
        let mut summary = RunSummary::default();

        let corpus = match corpus {
            Ok(corpus) => {
                summary.complete_stage(Stage::Fetch);
                corpus
            }
            Err(e) => return summary.fail_from(Stage::Fetch, e),
        };

        let outcome = parser::parse_corpus(&corpus.text);
        summary.segments_skipped = outcome.skipped.len();
        for skip in &outcome.skipped {
            warn!(ordinal = skip.ordinal, reason = skip.reason, "Segment skipped");
        }
        if outcome.records.is_empty() {
            return summary.fail_from(
                Stage::Parse,
                PipelineError::Decode(format!(
                    "no parseable abstract records in {} ({} segments skipped)",
                    self.config.source,
                    outcome.skipped.len()
                )),
            );
        }
        summary.records_parsed = outcome.records.len();
        info!(
            records = outcome.records.len(),
            skipped = outcome.skipped.len(),
            "Parsed corpus"
        );
        summary.complete_stage(Stage::Parse);
        let mut store = RecordStore::new(outcome.records);

        let docs: Vec<String> = store.records().iter().map(|r| r.document_text()).collect();
        let (model, assignments) = match topics::extract_topics(&docs, &self.config.topics) {
            Ok(fitted) => fitted,
            Err(e) => return summary.fail_from(Stage::ExtractTopics, e),
        };
        if let Err(e) = store.attach_assignments(assignments) {
            return summary.fail_from(Stage::ExtractTopics, e);
        }
        summary.topics_found = model.topics.len();
        summary.outlier_count = model.outlier_count;
        info!(
            topics = model.topics.len(),
            outliers = model.outlier_count,
            "Extracted topics"
        );
        summary.complete_stage(Stage::ExtractTopics);

        match self.export(&store, &model) {
            Ok(files) => {
                summary.files_written = files;
                summary.complete_stage(Stage::Export);
            }
            Err(e) => return summary.fail_from(Stage::Export, e),
        }

        info!(files = summary.files_written.len(), "Pipeline run complete");
        summary
    }

    fn export(&self, store: &RecordStore, model: &TopicModel) -> Result<Vec<PathBuf>> {
        let dir = &self.config.output_dir;
        fs::create_dir_all(dir)
            .map_err(|e| PipelineError::Export(format!("{}: {}", dir.display(), e)))?;

        let mut files = vec![
            export::write_abstracts_csv(dir, store)?,
            export::write_topic_summary_csv(dir, model)?,
            export::write_model_json(dir, model)?,
        ];
        files.extend(viz::write_visualizations(dir, model)?);
        Ok(files)
    }
}
