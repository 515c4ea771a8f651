//! Abstract parser for PubMed-style citation dumps.
//!
//! The corpus is a single text blob containing many concatenated abstracts,
//! each introduced by an integer ordinal at the start of a line ("1.", "2.",
//! ...). Segmentation happens on those ordinal boundaries; within a segment
//! the fields are recovered from its blank-line-delimited paragraphs:
//!
//! ```text
//! 1. Future Healthc J. 2019 Jun;6(2):94-98. doi: 10.7861/futurehosp.6-2-94.
//!
//! The potential for artificial intelligence in healthcare.
//!
//! Davenport T(1), Kalakota R(2).
//!
//! Author information:
//! (1)Babson College, Wellesley, USA.
//!
//! The complexity and rise of data in healthcare means that ...
//!
//! DOI: 10.7861/futurehosp.6-2-94
//! PMCID: PMC6616181
//! PMID: 31363513
//! ```
//!
//! Each field-extraction rule lives in its own named function so that layout
//! variants can be added without touching the segment-boundary logic.
//!
//! A segment missing a required field (title or abstract text) is dropped
//! and logged with its ordinal, never raised: parsing always continues with
//! the remaining segments.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Ordinal boundary: an integer followed by a period at the start of a line.
static ORDINAL_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(\d+)\.\s").expect("valid boundary regex"));

/// Citation line: "N. <journal>. <year> ..." with the journal abbreviation
/// before the first period that precedes a four-digit year.
static CITATION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\s*(.+?)\.\s+((?:19|20)\d{2})\b").expect("valid citation regex"));

/// DOI embedded in a citation line ("doi: 10.xxxx/yyyy").
static CITATION_DOI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)doi:\s*(10\.\S+)").expect("valid doi regex"));

/// Author name with a numbered affiliation marker, e.g. "Davenport T(1)".
static AUTHOR_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z][A-Za-z'\-]*\s+[A-Z][A-Z\-]*\(\d+\)").expect("valid author regex")
});

/// Affiliation marker "(n)" to strip from author lists.
static AFFILIATION_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\d+\)").expect("valid affiliation regex"));

/// Identifier sentinel line: "DOI:", "PMID:" or "PMCID:" (case-insensitive).
static IDENTIFIER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(DOI|PMID|PMCID):\s*(\S+)").expect("valid identifier regex"));

/// Fallback year pattern for citation lines without the standard layout.
static ANY_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b((?:19|20)\d{2})\b").expect("valid year regex"));

/// Kind of publication identifier attached to a record.
///
/// Keys are normalized case-insensitively during parsing, so "doi:" and
/// "DOI:" both land on [`IdKind::Doi`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum IdKind {
    Doi,
    Pmid,
    Pmcid,
}

impl IdKind {
    /// Canonical uppercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            IdKind::Doi => "DOI",
            IdKind::Pmid => "PMID",
            IdKind::Pmcid => "PMCID",
        }
    }

    fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_uppercase().as_str() {
            "DOI" => Some(IdKind::Doi),
            "PMID" => Some(IdKind::Pmid),
            "PMCID" => Some(IdKind::Pmcid),
            _ => None,
        }
    }
}

/// Structured representation of one parsed abstract.
///
/// Never mutated after creation; the topic assignment produced later in the
/// run lives in the store alongside the record, not inside it.
#[derive(Debug, Clone, Serialize)]
pub struct AbstractRecord {
    /// Citation number as it appeared in the source (not renumbered)
    pub ordinal: u32,
    pub title: String,
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub journal: Option<String>,
    pub identifiers: BTreeMap<IdKind, String>,
    /// Main abstract content, paragraphs joined with single spaces
    pub free_text: String,
}

impl AbstractRecord {
    pub fn doi(&self) -> Option<&str> {
        self.identifiers.get(&IdKind::Doi).map(String::as_str)
    }

    pub fn pmid(&self) -> Option<&str> {
        self.identifiers.get(&IdKind::Pmid).map(String::as_str)
    }

    pub fn pmcid(&self) -> Option<&str> {
        self.identifiers.get(&IdKind::Pmcid).map(String::as_str)
    }

    /// Title and abstract text combined, the document form fed to the
    /// topic extractor.
    pub fn document_text(&self) -> String {
        format!("{} {}", self.title, self.free_text)
    }
}

/// A segment that could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSegment {
    pub ordinal: u32,
    pub reason: &'static str,
}

/// Result of parsing one corpus: surviving records plus dropped segments.
#[derive(Debug, Default)]
pub struct ParseOutcome {
    pub records: Vec<AbstractRecord>,
    pub skipped: Vec<SkippedSegment>,
}

impl ParseOutcome {
    /// Number of ordinal boundaries detected in the input.
    pub fn segments_detected(&self) -> usize {
        self.records.len() + self.skipped.len()
    }
}

/// Parse a raw corpus into abstract records.
///
/// Empty or whitespace-only input yields an empty outcome, as does input
/// without any ordinal boundary. Malformed ordinal sequences (gaps,
/// duplicates) are tolerated: ordinals are taken as parsed, and a warning
/// is emitted when duplicates are present.
pub fn parse_corpus(raw_text: &str) -> ParseOutcome {
    if raw_text.trim().is_empty() {
        warn!("Empty or whitespace-only corpus provided");
        return ParseOutcome::default();
    }

    let boundaries: Vec<(usize, u32)> = ORDINAL_BOUNDARY
        .captures_iter(raw_text)
        .filter_map(|caps| {
            let m = caps.get(0)?;
            let ordinal = caps.get(1)?.as_str().parse().ok()?;
            Some((m.start(), ordinal))
        })
        .collect();

    if boundaries.is_empty() {
        info!("No ordinal boundaries found in corpus");
        return ParseOutcome::default();
    }

    check_duplicate_ordinals(&boundaries);

    let mut outcome = ParseOutcome::default();
    for (idx, &(start, ordinal)) in boundaries.iter().enumerate() {
        let end = boundaries
            .get(idx + 1)
            .map(|&(next_start, _)| next_start)
            .unwrap_or(raw_text.len());
        let segment = &raw_text[start..end];

        match parse_segment(ordinal, segment) {
            Ok(record) => {
                debug!(ordinal, title = %record.title, "Parsed segment");
                outcome.records.push(record);
            }
            Err(reason) => {
                warn!(ordinal, reason, "Skipping segment");
                outcome.skipped.push(SkippedSegment { ordinal, reason });
            }
        }
    }

    info!(
        parsed = outcome.records.len(),
        skipped = outcome.skipped.len(),
        "Corpus parse complete"
    );
    outcome
}

fn check_duplicate_ordinals(boundaries: &[(usize, u32)]) {
    let mut seen = std::collections::HashSet::new();
    let duplicates: Vec<u32> = boundaries
        .iter()
        .map(|&(_, ordinal)| ordinal)
        .filter(|ordinal| !seen.insert(*ordinal))
        .collect();
    if !duplicates.is_empty() {
        warn!(?duplicates, "Duplicate ordinals in corpus");
    }
}

/// Parse one ordinal-delimited segment, or explain why it was dropped.
fn parse_segment(ordinal: u32, segment: &str) -> std::result::Result<AbstractRecord, &'static str> {
    let paragraphs = split_paragraphs(segment);
    let citation = paragraphs.first().ok_or("segment is blank")?;

    let (journal, year) = extract_journal_and_year(citation);
    let mut identifiers = BTreeMap::new();
    if let Some(doi) = extract_citation_doi(citation) {
        identifiers.insert(IdKind::Doi, doi);
    }

    let mut title: Option<String> = None;
    let mut authors: Vec<String> = Vec::new();
    let mut free_paragraphs: Vec<String> = Vec::new();
    let mut past_free_text = false;

    for para in &paragraphs[1..] {
        let first = para[0];
        if IDENTIFIER_LINE.is_match(first) {
            collect_identifiers(para, &mut identifiers);
            past_free_text = true;
        } else if first.starts_with("Author information:") {
            continue;
        } else if first.starts_with("Copyright") || first.starts_with('©') {
            past_free_text = true;
        } else if is_author_paragraph(para) {
            if authors.is_empty() {
                authors = extract_authors(para);
            }
        } else if title.is_none() {
            title = Some(para.join(" "));
        } else if !past_free_text {
            free_paragraphs.push(para.join(" "));
        }
    }

    let title = title.ok_or("missing title")?;
    let free_text = free_paragraphs.join(" ");
    if free_text.is_empty() {
        return Err("missing abstract text");
    }

    Ok(AbstractRecord {
        ordinal,
        title,
        authors,
        year,
        journal,
        identifiers,
        free_text,
    })
}

/// Split a segment into blank-line-delimited paragraphs of trimmed lines.
fn split_paragraphs(segment: &str) -> Vec<Vec<&str>> {
    let mut paragraphs = Vec::new();
    let mut current = Vec::new();
    for line in segment.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
        } else {
            current.push(trimmed);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }
    paragraphs
}

/// Pull the journal abbreviation and publication year off the citation block.
fn extract_journal_and_year(citation: &[&str]) -> (Option<String>, Option<i32>) {
    let joined = citation.join(" ");
    if let Some(caps) = CITATION_LINE.captures(&joined) {
        let journal = caps.get(1).map(|m| m.as_str().trim().to_string());
        let year = caps.get(2).and_then(|m| m.as_str().parse().ok());
        return (journal, year);
    }
    // Non-standard citation layout: best-effort year, no journal
    let year = ANY_YEAR
        .captures_iter(&joined)
        .filter_map(|caps| caps.get(1)?.as_str().parse::<i32>().ok())
        .find(|y| (1900..=2030).contains(y));
    (None, year)
}

/// DOI from the citation line itself, used when no trailing "DOI:" line exists.
fn extract_citation_doi(citation: &[&str]) -> Option<String> {
    let joined = citation.join(" ");
    CITATION_DOI
        .captures(&joined)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_end_matches('.').to_string())
}

/// A paragraph is the authors block when it carries "Name INITIALS(n)"
/// markers and is not the affiliation listing itself.
fn is_author_paragraph(para: &[&str]) -> bool {
    AUTHOR_MARKER.is_match(para[0]) && !para[0].starts_with("Author information:")
}

/// Split the authors block on commas, stripping affiliation markers.
fn extract_authors(para: &[&str]) -> Vec<String> {
    let joined = para.join(" ");
    let stripped = AFFILIATION_MARKER.replace_all(&joined, "");
    stripped
        .trim_end_matches('.')
        .split(',')
        .map(|name| name.trim())
        .filter(|name| {
            name.split_whitespace().count() >= 2 && !name.chars().any(|c| c.is_ascii_digit())
        })
        .map(|name| name.to_string())
        .collect()
}

/// Populate the identifier map from a "DOI:/PMID:/PMCID:" paragraph.
fn collect_identifiers(para: &[&str], identifiers: &mut BTreeMap<IdKind, String>) {
    for line in para {
        if let Some(caps) = IDENTIFIER_LINE.captures(line) {
            let kind = caps.get(1).and_then(|m| IdKind::from_label(m.as_str()));
            let value = caps.get(2).map(|m| m.as_str().trim_end_matches('.'));
            if let (Some(kind), Some(value)) = (kind, value) {
                identifiers.insert(kind, value.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_1: &str = "\
1. Future Healthc J. 2019 Jun;6(2):94-98. doi: 10.7861/futurehosp.6-2-94.

The potential for artificial intelligence in healthcare.

Davenport T(1), Kalakota R(2).

Author information:
(1)Babson College, Wellesley, USA.
(2)Deloitte Consulting, New York, USA.

The complexity and rise of data in healthcare means that artificial intelligence
(AI) will increasingly be applied within the field. Several types of AI are
already being employed by payers and providers of care, and life sciences
companies. Ethical issues in the application of AI to healthcare are also
discussed.

DOI: 10.7861/futurehosp.6-2-94
PMCID: PMC6616181
PMID: 31363513";

    const SAMPLE_2: &str = "\
2. Clin Microbiol Infect. 2020 May;26(5):584-595. doi: 10.1016/j.cmi.2019.09.009.
Epub 2019 Sep 17.

Machine learning for clinical decision support in infectious diseases: a
narrative review of current applications.

Peiffer-Smadja N(1), Rawson TM(2), Ahmad R(2), Buchard A(3), Georgiou P(4),
Lescure FX(5), Birgand G(2), Holmes AH(2).

Author information:
(1)National Institute for Health Research Health Protection Research Unit in
Healthcare Associated Infections and Antimicrobial Resistance, Imperial College
London, London, UK.

BACKGROUND: Machine learning (ML) is a growing field in medicine. This narrative
review describes the current body of literature on ML for clinical decision
support in infectious diseases (ID).
OBJECTIVES: We aim to inform clinicians about the use of ML for diagnosis,
classification, outcome prediction and antimicrobial management in ID.

DOI: 10.1016/j.cmi.2019.09.009
PMID: 31539636";

    fn two_sample_corpus() -> String {
        format!("{}\n\n\n{}", SAMPLE_1, SAMPLE_2)
    }

    #[test]
    fn test_parse_sample_corpus() {
        let outcome = parse_corpus(&two_sample_corpus());
        assert!(outcome.skipped.is_empty());
        assert_eq!(outcome.records.len(), 2);

        let first = &outcome.records[0];
        assert_eq!(first.ordinal, 1);
        assert_eq!(
            first.title,
            "The potential for artificial intelligence in healthcare."
        );
        assert_eq!(first.authors, vec!["Davenport T", "Kalakota R"]);
        assert_eq!(first.year, Some(2019));
        assert_eq!(first.journal.as_deref(), Some("Future Healthc J"));
        assert_eq!(first.pmid(), Some("31363513"));
        assert_eq!(first.doi(), Some("10.7861/futurehosp.6-2-94"));
        assert_eq!(first.pmcid(), Some("PMC6616181"));
        assert!(first.free_text.starts_with("The complexity and rise of data"));

        let second = &outcome.records[1];
        assert_eq!(second.ordinal, 2);
        assert_eq!(
            second.title,
            "Machine learning for clinical decision support in infectious diseases: a narrative review of current applications."
        );
        assert_eq!(second.year, Some(2020));
        assert_eq!(second.pmid(), Some("31539636"));
        assert_eq!(second.journal.as_deref(), Some("Clin Microbiol Infect"));
        assert!(second.authors.contains(&"Peiffer-Smadja N".to_string()));
        assert!(second.authors.contains(&"Holmes AH".to_string()));
    }

    #[test]
    fn test_ordinals_preserved_in_input_order() {
        // Gap in the numbering is tolerated, ordinals are not renumbered
        let corpus = format!("{}\n\n\n{}", SAMPLE_1, SAMPLE_2.replacen("2.", "7.", 1));
        let outcome = parse_corpus(&corpus);
        let ordinals: Vec<u32> = outcome.records.iter().map(|r| r.ordinal).collect();
        assert_eq!(ordinals, vec![1, 7]);
    }

    #[test]
    fn test_authors_round_trip() {
        let outcome = parse_corpus(SAMPLE_1);
        let rejoined = outcome.records[0].authors.join(", ");
        assert_eq!(rejoined, "Davenport T, Kalakota R");
    }

    #[test]
    fn test_empty_corpus_yields_empty_outcome() {
        assert!(parse_corpus("").records.is_empty());
        assert!(parse_corpus("   \n\n  ").records.is_empty());
    }

    #[test]
    fn test_no_boundaries_yields_empty_outcome() {
        let outcome = parse_corpus("Just some prose without any citation numbering.");
        assert!(outcome.records.is_empty());
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn test_segment_without_abstract_text_is_skipped() {
        let truncated = "\
1. Future Healthc J. 2019 Jun;6(2):94-98.

The potential for artificial intelligence in healthcare.

Davenport T(1), Kalakota R(2).

DOI: 10.7861/futurehosp.6-2-94";
        let corpus = format!("{}\n\n\n{}", truncated, SAMPLE_2);
        let outcome = parse_corpus(&corpus);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].ordinal, 2);
        assert_eq!(
            outcome.skipped,
            vec![SkippedSegment {
                ordinal: 1,
                reason: "missing abstract text"
            }]
        );
        assert_eq!(outcome.segments_detected(), 2);
    }

    #[test]
    fn test_duplicate_ordinals_emit_both_records() {
        let corpus = format!("{}\n\n\n{}", SAMPLE_1, SAMPLE_2.replacen("2.", "1.", 1));
        let outcome = parse_corpus(&corpus);
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.records[0].ordinal, 1);
        assert_eq!(outcome.records[1].ordinal, 1);
        assert_ne!(outcome.records[0].title, outcome.records[1].title);
    }

    #[test]
    fn test_extract_journal_and_year_fallback() {
        let citation = vec!["3. Published online 2021 without the usual layout"];
        let (journal, year) = extract_journal_and_year(&citation);
        assert!(journal.is_none());
        assert_eq!(year, Some(2021));
    }

    #[test]
    fn test_identifier_keys_case_insensitive() {
        let mut identifiers = BTreeMap::new();
        collect_identifiers(&["doi: 10.1000/xyz.", "pmid: 12345"], &mut identifiers);
        assert_eq!(identifiers.get(&IdKind::Doi).map(String::as_str), Some("10.1000/xyz"));
        assert_eq!(identifiers.get(&IdKind::Pmid).map(String::as_str), Some("12345"));
    }

    #[test]
    fn test_document_text_combines_title_and_abstract() {
        let outcome = parse_corpus(SAMPLE_1);
        let doc = outcome.records[0].document_text();
        assert!(doc.starts_with("The potential for artificial intelligence"));
        assert!(doc.contains("complexity and rise of data"));
    }
}
