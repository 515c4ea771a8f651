//! Topic extraction over parsed abstracts.
//!
//! Clusters document texts into themes and attaches a keyword set to each
//! theme. Documents are tokenized with an extended stop-word list (base
//! English plus medical/research boilerplate), vectorized with TF-IDF, and
//! clustered with cosine k-means using farthest-point seeding. Clusters
//! smaller than `min_topic_size` are folded into the outlier topic `-1`
//! rather than reported as themes of their own.
//!
//! The fitted [`TopicModel`] is the reusable handle the visualization
//! exporter consumes; per-document results come back as
//! [`TopicAssignment`]s, one per input document.

use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};

/// Topic id for documents that fit no cluster.
pub const OUTLIER_TOPIC: i32 = -1;

/// Keywords carried on each per-document assignment.
const ASSIGNMENT_KEYWORDS: usize = 5;

/// Maximum vocabulary size, highest-document-frequency terms win.
const MAX_FEATURES: usize = 1000;

/// k-means iteration cap; assignments converge far earlier in practice.
const MAX_ITERATIONS: usize = 20;

/// Base English stop words.
const BASE_STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "as", "is", "was", "are", "were", "been", "be", "being", "have", "has", "had", "do",
    "does", "did", "will", "would", "could", "should", "may", "might", "must", "shall", "can",
    "this", "that", "these", "those", "it", "its", "itself", "they", "their", "them", "we", "our",
    "you", "your", "he", "she", "him", "her", "his", "hers", "all", "each", "every", "both",
    "few", "more", "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same",
    "so", "than", "too", "very", "just", "also", "now", "here", "there", "then", "once", "when",
    "where", "why", "how", "what", "which", "who", "whom", "about", "after", "before", "between",
    "into", "through", "during", "above", "below", "up", "down", "out", "off", "over", "under",
    "again", "further", "while", "because", "until", "although", "however", "therefore", "thus",
    "hence", "within", "without", "among", "across", "towards", "toward", "via", "per", "upon",
];

/// Medical/research boilerplate that would otherwise dominate every topic.
const DOMAIN_STOP_WORDS: &[&str] = &[
    "study", "studies", "research", "paper", "review", "analysis", "method", "methods",
    "approach", "approaches", "result", "results", "finding", "findings", "conclusion",
    "conclusions", "background", "objective", "objectives", "aim", "aims", "goal", "goals",
    "purpose", "data", "dataset", "model", "models", "using", "use", "used", "show", "showed",
    "shown", "demonstrated", "indicated", "suggested", "revealed", "identified", "determined",
    "concluded", "observed", "found", "present", "presented", "propose", "proposed", "develop",
    "developed", "conducted", "performed", "implemented", "applied", "evaluated", "examined",
    "investigated", "assessed", "measured", "measurement", "patient", "patients", "clinical",
    "medical", "medicine", "healthcare", "health", "treatment", "therapy", "diagnosis",
    "disease", "condition", "outcome", "outcomes", "effectiveness", "efficacy", "significant",
    "significantly", "associated", "correlation", "relationship", "compared", "comparison",
    "group", "groups", "control", "trial", "trials", "randomized", "participants", "subjects",
    "population", "sample", "samples", "training", "testing", "validation", "accuracy",
    "precision", "recall", "performance", "evaluation", "experimental", "application",
    "applications", "system", "systems",
];

/// Topic-model parameters.
#[derive(Debug, Clone)]
pub struct TopicConfig {
    /// Number of topics; `None` chooses automatically from corpus size
    pub num_topics: Option<usize>,
    /// Clusters smaller than this are folded into the outlier topic
    pub min_topic_size: usize,
    /// Domain-specific stop words on top of the built-in lists
    pub extra_stop_words: Vec<String>,
    /// Keywords retained per topic in the fitted model
    pub top_keywords: usize,
    /// Seed for deterministic clustering
    pub seed: u64,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            num_topics: None,
            min_topic_size: 2,
            extra_stop_words: Vec::new(),
            top_keywords: 10,
            seed: 42,
        }
    }
}

/// One fitted topic.
#[derive(Debug, Clone, Serialize)]
pub struct TopicInfo {
    /// Topic id, 0-based by descending size
    pub id: i32,
    /// Number of documents assigned to this topic
    pub doc_count: usize,
    /// Keywords with relevance scores, best first
    pub keywords: Vec<(String, f64)>,
    /// L2-normalized TF-IDF centroid, reused for topic similarity
    #[serde(skip)]
    pub centroid: Vec<f64>,
}

impl TopicInfo {
    /// Keyword strings without scores.
    pub fn keyword_list(&self) -> Vec<String> {
        self.keywords.iter().map(|(w, _)| w.clone()).collect()
    }
}

/// Fitted model handle: topics plus the corpus-level bookkeeping needed by
/// the export and visualization stages.
#[derive(Debug, Serialize)]
pub struct TopicModel {
    /// Topics ordered by descending document count (outlier excluded)
    pub topics: Vec<TopicInfo>,
    /// Documents that fit no cluster
    pub outlier_count: usize,
    /// Total documents the model was fitted on
    pub num_documents: usize,
}

impl TopicModel {
    pub fn topic(&self, id: i32) -> Option<&TopicInfo> {
        self.topics.iter().find(|t| t.id == id)
    }

    /// Cosine similarity between all topic pairs, indexed by position in
    /// `topics`. Centroids are unit length so the dot product suffices.
    pub fn similarity_matrix(&self) -> Vec<Vec<f64>> {
        self.topics
            .iter()
            .map(|a| {
                self.topics
                    .iter()
                    .map(|b| dot(&a.centroid, &b.centroid))
                    .collect()
            })
            .collect()
    }
}

/// Topic assigned to one document.
#[derive(Debug, Clone, Serialize)]
pub struct TopicAssignment {
    /// Position of the document in the input collection
    pub doc_index: usize,
    /// Assigned topic id, `-1` for outliers
    pub topic_id: i32,
    /// Top keywords of the assigned topic (empty for outliers)
    pub keywords: Vec<String>,
    /// Cosine similarity to the topic centroid (0 for outliers)
    pub score: f64,
}

/// Cluster documents into topics.
///
/// Returns the fitted model and one assignment per input document, in input
/// order.
///
/// # Errors
///
/// Fails with [`PipelineError::Extraction`] when the document set is empty
/// or when stop-word filtering leaves no usable vocabulary.
pub fn extract_topics(
    docs: &[String],
    config: &TopicConfig,
) -> Result<(TopicModel, Vec<TopicAssignment>)> {
    if docs.is_empty() {
        return Err(PipelineError::Extraction(
            "no documents to extract topics from".to_string(),
        ));
    }

    info!(documents = docs.len(), "Starting topic extraction");

    let stop_words = build_stop_words(&config.extra_stop_words);
    let tokenized: Vec<Vec<String>> = docs.iter().map(|d| tokenize(d, &stop_words)).collect();

    let vocab = build_vocabulary(&tokenized);
    if vocab.terms.is_empty() {
        return Err(PipelineError::Extraction(
            "no usable vocabulary after stop-word filtering".to_string(),
        ));
    }
    debug!(terms = vocab.terms.len(), "Vocabulary built");

    let vectors: Vec<Vec<f64>> = tokenized.iter().map(|t| vocab.tfidf_vector(t)).collect();

    let k = effective_k(config.num_topics, docs.len());
    let clusters = kmeans(&vectors, k, config.seed);

    let (model, assignments) =
        build_model(&tokenized, &vectors, &vocab, &clusters, k, config);

    info!(
        topics = model.topics.len(),
        outliers = model.outlier_count,
        "Topic extraction complete"
    );
    Ok((model, assignments))
}

fn build_stop_words(extra: &[String]) -> HashSet<String> {
    BASE_STOP_WORDS
        .iter()
        .chain(DOMAIN_STOP_WORDS.iter())
        .map(|s| s.to_string())
        .chain(extra.iter().map(|s| s.to_lowercase()))
        .collect()
}

/// Lowercase alphabetic tokens of length >= 3, stop words removed.
fn tokenize(text: &str, stop_words: &HashSet<String>) -> Vec<String> {
    text.split(|c: char| !c.is_ascii_alphabetic())
        .map(|t| t.to_lowercase())
        .filter(|t| t.len() >= 3 && !stop_words.contains(t))
        .collect()
}

struct Vocabulary {
    /// Term -> column index
    index: HashMap<String, usize>,
    /// Column index -> term
    terms: Vec<String>,
    /// Per-term inverse document frequency
    idf: Vec<f64>,
}

impl Vocabulary {
    fn tfidf_vector(&self, tokens: &[String]) -> Vec<f64> {
        let mut vec = vec![0.0; self.terms.len()];
        for token in tokens {
            if let Some(&col) = self.index.get(token) {
                vec[col] += self.idf[col];
            }
        }
        l2_normalize(&mut vec);
        vec
    }
}

/// Build the pruned vocabulary: document-frequency bounds drop terms that
/// are too rare or too common (looser for very small corpora), capped at
/// [`MAX_FEATURES`] terms by descending document frequency.
fn build_vocabulary(tokenized: &[Vec<String>]) -> Vocabulary {
    let n = tokenized.len();
    let (min_df, max_df_frac) = if n >= 5 { (2, 0.85) } else { (1, 0.95) };
    let max_df = ((n as f64) * max_df_frac).ceil() as usize;

    let mut df: HashMap<&str, usize> = HashMap::new();
    for tokens in tokenized {
        let unique: HashSet<&str> = tokens.iter().map(String::as_str).collect();
        for term in unique {
            *df.entry(term).or_insert(0) += 1;
        }
    }

    let mut candidates: Vec<(&str, usize)> = df
        .into_iter()
        .filter(|&(_, count)| count >= min_df && count <= max_df.max(1))
        .collect();
    // Deterministic order: frequency first, then alphabetical
    candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    candidates.truncate(MAX_FEATURES);

    let terms: Vec<String> = candidates.iter().map(|(t, _)| t.to_string()).collect();
    let idf: Vec<f64> = candidates
        .iter()
        .map(|&(_, count)| ((n as f64) / (count as f64)).ln() + 1.0)
        .collect();
    let index = terms
        .iter()
        .enumerate()
        .map(|(i, t)| (t.clone(), i))
        .collect();

    Vocabulary { index, terms, idf }
}

fn effective_k(requested: Option<usize>, n: usize) -> usize {
    let k = requested.unwrap_or_else(|| {
        // Auto selection: roughly sqrt(n/2), bounded to a usable range
        (((n as f64) / 2.0).sqrt().round() as usize).clamp(2, 12)
    });
    k.clamp(1, n)
}

/// Cosine k-means over unit vectors with farthest-point seeding.
///
/// Seeding picks a random first centroid, then repeatedly takes the document
/// least similar to every chosen centroid. This keeps well-separated themes
/// from collapsing into one cluster regardless of the seed.
fn kmeans(vectors: &[Vec<f64>], k: usize, seed: u64) -> Vec<usize> {
    let n = vectors.len();
    let mut rng = StdRng::seed_from_u64(seed);

    let mut centroid_docs: Vec<usize> = vec![rng.gen_range(0..n)];
    while centroid_docs.len() < k {
        let next = (0..n)
            .filter(|i| !centroid_docs.contains(i))
            .min_by(|&a, &b| {
                let sim_a = max_similarity(&vectors[a], &centroid_docs, vectors);
                let sim_b = max_similarity(&vectors[b], &centroid_docs, vectors);
                sim_a.partial_cmp(&sim_b).unwrap_or(std::cmp::Ordering::Equal)
            });
        match next {
            Some(doc) => centroid_docs.push(doc),
            None => break,
        }
    }

    let mut centroids: Vec<Vec<f64>> = centroid_docs
        .iter()
        .map(|&doc| vectors[doc].clone())
        .collect();
    let mut assignments = vec![0usize; n];

    for _ in 0..MAX_ITERATIONS {
        let mut changed = false;
        for (doc, vector) in vectors.iter().enumerate() {
            let best = centroids
                .iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| {
                    dot(vector, a)
                        .partial_cmp(&dot(vector, b))
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .map(|(cluster, _)| cluster)
                .unwrap_or(0);
            if assignments[doc] != best {
                assignments[doc] = best;
                changed = true;
            }
        }
        if !changed {
            break;
        }

        for (cluster, centroid) in centroids.iter_mut().enumerate() {
            let members: Vec<&Vec<f64>> = vectors
                .iter()
                .zip(&assignments)
                .filter(|&(_, a)| *a == cluster)
                .map(|(v, _)| v)
                .collect();
            if members.is_empty() {
                continue; // keep previous centroid
            }
            let dims = centroid.len();
            let mut mean = vec![0.0; dims];
            for member in &members {
                for (slot, value) in mean.iter_mut().zip(member.iter()) {
                    *slot += value;
                }
            }
            for slot in mean.iter_mut() {
                *slot /= members.len() as f64;
            }
            l2_normalize(&mut mean);
            *centroid = mean;
        }
    }

    assignments
}

fn max_similarity(vector: &[f64], chosen: &[usize], vectors: &[Vec<f64>]) -> f64 {
    chosen
        .iter()
        .map(|&doc| dot(vector, &vectors[doc]))
        .fold(f64::MIN, f64::max)
}

/// Fold undersized clusters into the outlier topic, renumber survivors by
/// size, and score keywords c-TF-IDF style (class term frequency * idf).
fn build_model(
    tokenized: &[Vec<String>],
    vectors: &[Vec<f64>],
    vocab: &Vocabulary,
    clusters: &[usize],
    k: usize,
    config: &TopicConfig,
) -> (TopicModel, Vec<TopicAssignment>) {
    let mut sizes = vec![0usize; k];
    for &cluster in clusters {
        sizes[cluster] += 1;
    }

    let mut surviving: Vec<usize> = (0..k)
        .filter(|&c| sizes[c] >= config.min_topic_size)
        .collect();
    surviving.sort_by(|&a, &b| sizes[b].cmp(&sizes[a]).then_with(|| a.cmp(&b)));

    if surviving.is_empty() {
        warn!(
            min_topic_size = config.min_topic_size,
            "All clusters below minimum size, every document is an outlier"
        );
    }

    let topic_of_cluster: HashMap<usize, i32> = surviving
        .iter()
        .enumerate()
        .map(|(topic, &cluster)| (cluster, topic as i32))
        .collect();

    let mut topics = Vec::with_capacity(surviving.len());
    for (topic_idx, &cluster) in surviving.iter().enumerate() {
        let member_docs: Vec<usize> = clusters
            .iter()
            .enumerate()
            .filter(|&(_, c)| *c == cluster)
            .map(|(doc, _)| doc)
            .collect();

        let mut term_counts: HashMap<usize, usize> = HashMap::new();
        let mut total_terms = 0usize;
        for &doc in &member_docs {
            for token in &tokenized[doc] {
                if let Some(&col) = vocab.index.get(token) {
                    *term_counts.entry(col).or_insert(0) += 1;
                    total_terms += 1;
                }
            }
        }

        let mut scored: Vec<(String, f64)> = term_counts
            .into_iter()
            .map(|(col, count)| {
                let class_tf = (count as f64) / (total_terms.max(1) as f64);
                (vocab.terms[col].clone(), class_tf * vocab.idf[col])
            })
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(config.top_keywords);

        let mut centroid = vec![0.0; vocab.terms.len()];
        for &doc in &member_docs {
            for (slot, value) in centroid.iter_mut().zip(vectors[doc].iter()) {
                *slot += value;
            }
        }
        for slot in centroid.iter_mut() {
            *slot /= member_docs.len().max(1) as f64;
        }
        l2_normalize(&mut centroid);

        topics.push(TopicInfo {
            id: topic_idx as i32,
            doc_count: member_docs.len(),
            keywords: scored,
            centroid,
        });
    }

    let assignments: Vec<TopicAssignment> = clusters
        .iter()
        .enumerate()
        .map(|(doc, &cluster)| match topic_of_cluster.get(&cluster) {
            Some(&topic_id) => {
                let topic = &topics[topic_id as usize];
                TopicAssignment {
                    doc_index: doc,
                    topic_id,
                    keywords: topic
                        .keywords
                        .iter()
                        .take(ASSIGNMENT_KEYWORDS)
                        .map(|(w, _)| w.clone())
                        .collect(),
                    score: dot(&vectors[doc], &topic.centroid),
                }
            }
            None => TopicAssignment {
                doc_index: doc,
                topic_id: OUTLIER_TOPIC,
                keywords: Vec::new(),
                score: 0.0,
            },
        })
        .collect();

    let outlier_count = assignments
        .iter()
        .filter(|a| a.topic_id == OUTLIER_TOPIC)
        .count();

    (
        TopicModel {
            topics,
            outlier_count,
            num_documents: clusters.len(),
        },
        assignments,
    )
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn l2_normalize(vec: &mut [f64]) {
    let norm = vec.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm > 0.0 {
        for value in vec.iter_mut() {
            *value /= norm;
        }
    }
}
