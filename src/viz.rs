//! Interactive HTML visualizations of the fitted topic model.
//!
//! Every page is a single self-contained HTML document with inline SVG and
//! styling, so the files open from disk without network access. Hover
//! tooltips use native SVG `<title>` elements.
//!
//! Three reports are written per run, plus an index page linking them:
//! a topic overview bubble chart, per-topic keyword bar charts, and a
//! topic similarity heatmap (when at least two topics were fitted).

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::topics::TopicModel;

/// Subdirectory of the output directory that receives the HTML files.
pub const VIZ_DIR: &str = "visualizations";

const OVERVIEW_FILE: &str = "topics_overview.html";
const BARCHART_FILE: &str = "topics_barchart.html";
const HEATMAP_FILE: &str = "topics_heatmap.html";
const INDEX_FILE: &str = "index.html";

const PAGE_STYLE: &str = "\
body { font-family: Arial, sans-serif; margin: 40px; background-color: #f5f5f5; }\n\
.container { max-width: 900px; margin: 0 auto; background: white; padding: 30px; \
border-radius: 10px; box-shadow: 0 2px 10px rgba(0,0,0,0.1); }\n\
h1 { color: #333; text-align: center; }\n\
h2 { color: #2c3e50; }\n\
.description { background: #e8f4f8; padding: 15px; border-radius: 5px; margin-bottom: 20px; }\n\
svg text { font-family: Arial, sans-serif; }";

/// Fill colors cycled across topics.
const TOPIC_COLORS: [&str; 8] = [
    "#3498db", "#e74c3c", "#2ecc71", "#9b59b6", "#f39c12", "#1abc9c", "#e67e22", "#34495e",
];

/// Write all visualization pages under `<output_dir>/visualizations/`.
///
/// Returns the paths of the files written, index page last.
pub fn write_visualizations(output_dir: &Path, model: &TopicModel) -> Result<Vec<PathBuf>> {
    let dir = output_dir.join(VIZ_DIR);
    fs::create_dir_all(&dir)
        .map_err(|e| PipelineError::Export(format!("{}: {}", dir.display(), e)))?;

    let mut written = Vec::new();

    written.push(write_page(&dir, OVERVIEW_FILE, &overview_page(model))?);
    written.push(write_page(&dir, BARCHART_FILE, &barchart_page(model))?);
    if model.topics.len() >= 2 {
        written.push(write_page(&dir, HEATMAP_FILE, &heatmap_page(model))?);
    } else {
        warn!("Fewer than two topics fitted, skipping similarity heatmap");
    }
    written.push(write_page(&dir, INDEX_FILE, &index_page(&written))?);

    info!(dir = %dir.display(), files = written.len(), "Wrote visualizations");
    Ok(written)
}

fn write_page(dir: &Path, name: &str, html: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, html)
        .map_err(|e| PipelineError::Export(format!("{}: {}", path.display(), e)))?;
    Ok(path)
}

fn html_page(title: &str, description: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
         <style>\n{PAGE_STYLE}\n</style>\n</head>\n<body>\n<div class=\"container\">\n\
         <h1>{title}</h1>\n<div class=\"description\"><p>{description}</p></div>\n\
         {body}\n</div>\n</body>\n</html>\n",
        title = escape_html(title),
        description = escape_html(description),
        body = body,
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn topic_color(index: usize) -> &'static str {
    TOPIC_COLORS[index % TOPIC_COLORS.len()]
}

fn topic_label(model: &TopicModel, index: usize) -> String {
    let topic = &model.topics[index];
    let head: Vec<&str> = topic
        .keywords
        .iter()
        .take(3)
        .map(|(word, _)| word.as_str())
        .collect();
    format!("Topic {}: {}", topic.id, head.join(", "))
}

/// Bubble chart of the topics: one circle per topic, area scaled by
/// document count.
fn overview_page(model: &TopicModel) -> String {
    const COLS: usize = 3;
    const CELL: f64 = 250.0;

    let max_count = model
        .topics
        .iter()
        .map(|t| t.doc_count)
        .max()
        .unwrap_or(1)
        .max(1) as f64;
    let rows = model.topics.len().div_ceil(COLS).max(1);
    let width = COLS as f64 * CELL;
    let height = rows as f64 * CELL;

    let mut svg = format!(
        "<svg viewBox=\"0 0 {} {}\" width=\"100%\" xmlns=\"http://www.w3.org/2000/svg\">\n",
        width, height
    );
    for (i, topic) in model.topics.iter().enumerate() {
        let cx = (i % COLS) as f64 * CELL + CELL / 2.0;
        let cy = (i / COLS) as f64 * CELL + CELL / 2.0 - 15.0;
        let radius = 25.0 + 65.0 * (topic.doc_count as f64 / max_count).sqrt();
        let label = topic_label(model, i);
        let tooltip = format!(
            "{} ({} documents)\n{}",
            label,
            topic.doc_count,
            topic
                .keywords
                .iter()
                .map(|(word, score)| format!("{}: {:.4}", word, score))
                .collect::<Vec<_>>()
                .join("\n")
        );
        svg.push_str(&format!(
            "<circle cx=\"{:.1}\" cy=\"{:.1}\" r=\"{:.1}\" fill=\"{}\" fill-opacity=\"0.75\">\
             <title>{}</title></circle>\n",
            cx,
            cy,
            radius,
            topic_color(i),
            escape_html(&tooltip)
        ));
        svg.push_str(&format!(
            "<text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"middle\" font-size=\"13\">{}</text>\n",
            cx,
            cy + radius + 22.0,
            escape_html(&label)
        ));
    }
    svg.push_str("</svg>\n");

    html_page(
        "Topics Overview",
        &format!(
            "Each circle is a topic; its area reflects how many of the {} documents it \
             covers ({} outliers excluded). Hover over a circle for the full keyword list.",
            model.num_documents, model.outlier_count
        ),
        &svg,
    )
}

/// One horizontal bar chart per topic, bars scaled by keyword score.
fn barchart_page(model: &TopicModel) -> String {
    const BAR_HEIGHT: f64 = 24.0;
    const BAR_GAP: f64 = 8.0;
    const LABEL_WIDTH: f64 = 160.0;
    const MAX_BAR: f64 = 520.0;

    let mut body = String::new();
    for (i, topic) in model.topics.iter().enumerate() {
        let max_score = topic
            .keywords
            .iter()
            .map(|(_, score)| *score)
            .fold(0.0_f64, f64::max)
            .max(f64::EPSILON);
        let height = topic.keywords.len() as f64 * (BAR_HEIGHT + BAR_GAP);

        body.push_str(&format!(
            "<h2>{} ({} documents)</h2>\n",
            escape_html(&topic_label(model, i)),
            topic.doc_count
        ));
        body.push_str(&format!(
            "<svg viewBox=\"0 0 {} {}\" width=\"100%\" xmlns=\"http://www.w3.org/2000/svg\">\n",
            LABEL_WIDTH + MAX_BAR + 20.0,
            height
        ));
        for (j, (word, score)) in topic.keywords.iter().enumerate() {
            let y = j as f64 * (BAR_HEIGHT + BAR_GAP);
            let bar = MAX_BAR * (score / max_score);
            body.push_str(&format!(
                "<text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"end\" font-size=\"13\">{}</text>\n",
                LABEL_WIDTH - 8.0,
                y + BAR_HEIGHT * 0.7,
                escape_html(word)
            ));
            body.push_str(&format!(
                "<rect x=\"{:.1}\" y=\"{:.1}\" width=\"{:.1}\" height=\"{:.1}\" fill=\"{}\">\
                 <title>{}: {:.4}</title></rect>\n",
                LABEL_WIDTH,
                y,
                bar,
                BAR_HEIGHT,
                topic_color(i),
                escape_html(word),
                score
            ));
        }
        body.push_str("</svg>\n");
    }

    html_page(
        "Topic Keywords",
        "The most important keywords for each topic, scored by class-based term weighting. \
         Hover over a bar for the exact score.",
        &body,
    )
}

/// Heatmap of pairwise topic centroid similarity.
fn heatmap_page(model: &TopicModel) -> String {
    const CELL: f64 = 64.0;
    const MARGIN: f64 = 150.0;

    let matrix = model.similarity_matrix();
    let n = matrix.len();
    let size = MARGIN + n as f64 * CELL + 20.0;

    let mut svg = format!(
        "<svg viewBox=\"0 0 {} {}\" width=\"100%\" xmlns=\"http://www.w3.org/2000/svg\">\n",
        size, size
    );
    for (row, similarities) in matrix.iter().enumerate() {
        let label = topic_label(model, row);
        svg.push_str(&format!(
            "<text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"end\" font-size=\"12\">{}</text>\n",
            MARGIN - 8.0,
            MARGIN + row as f64 * CELL + CELL * 0.6,
            escape_html(&label)
        ));
        svg.push_str(&format!(
            "<text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"middle\" font-size=\"12\">Topic {}</text>\n",
            MARGIN + row as f64 * CELL + CELL / 2.0,
            MARGIN - 10.0,
            model.topics[row].id
        ));
        for (col, similarity) in similarities.iter().enumerate() {
            // Clamp: antipodal centroids can give slightly negative cosines
            let intensity = similarity.clamp(0.0, 1.0);
            let shade = 255.0 - intensity * 203.0;
            svg.push_str(&format!(
                "<rect x=\"{:.1}\" y=\"{:.1}\" width=\"{:.1}\" height=\"{:.1}\" \
                 fill=\"rgb({:.0},{:.0},255)\" stroke=\"#ddd\">\
                 <title>Topic {} vs Topic {}: {:.3}</title></rect>\n",
                MARGIN + col as f64 * CELL,
                MARGIN + row as f64 * CELL,
                CELL,
                CELL,
                shade,
                shade,
                model.topics[row].id,
                model.topics[col].id,
                similarity
            ));
        }
    }
    svg.push_str("</svg>\n");

    html_page(
        "Topic Similarity",
        "Cosine similarity between topic centroids; darker cells mean more related topics. \
         Hover over a cell for the exact value.",
        &svg,
    )
}

/// Index page with one card per written visualization.
fn index_page(written: &[PathBuf]) -> String {
    let descriptions = [
        (
            OVERVIEW_FILE,
            "Topics Overview",
            "Bubble chart of the fitted topics. Hover over a circle to see the full \
             keyword list and document count.",
        ),
        (
            BARCHART_FILE,
            "Topic Keywords",
            "Bar charts showing the most important keywords for each topic with their \
             relevance scores.",
        ),
        (
            HEATMAP_FILE,
            "Topic Similarity",
            "Heatmap showing similarity relationships between the fitted topics.",
        ),
    ];

    let mut cards = String::new();
    for (file, title, description) in descriptions {
        if !written.iter().any(|p| p.ends_with(file)) {
            continue;
        }
        cards.push_str(&format!(
            "<div class=\"viz-card\">\n<h3>{}</h3>\n<p>{}</p>\n\
             <a href=\"{}\" class=\"viz-link\">Open Visualization</a>\n</div>\n",
            escape_html(title),
            escape_html(description),
            file
        ));
    }

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Research Gap Analysis - Visualizations</title>\n<style>\n{PAGE_STYLE}\n\
         .viz-grid {{ display: grid; grid-template-columns: repeat(auto-fit, minmax(260px, 1fr)); gap: 20px; }}\n\
         .viz-card {{ border: 1px solid #ddd; border-radius: 8px; padding: 20px; background: #fafafa; }}\n\
         .viz-card h3 {{ color: #2c3e50; margin-top: 0; }}\n\
         .viz-link {{ display: inline-block; background: #3498db; color: white; padding: 10px 20px; \
         text-decoration: none; border-radius: 5px; }}\n\
         .viz-link:hover {{ background: #2980b9; }}\n</style>\n</head>\n<body>\n\
         <div class=\"container\">\n<h1>Research Gap Analysis</h1>\n\
         <div class=\"description\"><p>Interactive visualizations of topics extracted from \
         medical research abstracts. Click any card to explore the results.</p></div>\n\
         <div class=\"viz-grid\">\n{cards}</div>\n</div>\n</body>\n</html>\n",
        PAGE_STYLE = PAGE_STYLE,
        cards = cards,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topics::TopicInfo;

    fn sample_model() -> TopicModel {
        TopicModel {
            topics: vec![
                TopicInfo {
                    id: 0,
                    doc_count: 4,
                    keywords: vec![
                        ("cardiac".to_string(), 0.6),
                        ("arrhythmia".to_string(), 0.4),
                    ],
                    centroid: vec![1.0, 0.0],
                },
                TopicInfo {
                    id: 1,
                    doc_count: 3,
                    keywords: vec![("tumor".to_string(), 0.5), ("biopsy".to_string(), 0.3)],
                    centroid: vec![0.0, 1.0],
                },
            ],
            outlier_count: 1,
            num_documents: 8,
        }
    }

    #[test]
    fn test_writes_all_pages_and_index() {
        let dir = tempfile::tempdir().expect("tempdir");
        let written = write_visualizations(dir.path(), &sample_model()).expect("write");

        assert_eq!(written.len(), 4);
        let viz_dir = dir.path().join(VIZ_DIR);
        for file in [OVERVIEW_FILE, BARCHART_FILE, HEATMAP_FILE, INDEX_FILE] {
            assert!(viz_dir.join(file).is_file(), "missing {}", file);
        }

        let index = std::fs::read_to_string(viz_dir.join(INDEX_FILE)).expect("read index");
        assert!(index.contains("topics_overview.html"));
        assert!(index.contains("topics_heatmap.html"));
    }

    #[test]
    fn test_overview_embeds_topics_as_svg() {
        let page = overview_page(&sample_model());
        assert!(page.contains("<svg"));
        assert!(page.contains("Topic 0: cardiac, arrhythmia"));
        assert!(page.contains("<title>"));
        // self-contained: no external scripts or stylesheets
        assert!(!page.contains("<script"));
        assert!(!page.contains("<link"));
    }

    #[test]
    fn test_heatmap_skipped_for_single_topic() {
        let mut model = sample_model();
        model.topics.truncate(1);

        let dir = tempfile::tempdir().expect("tempdir");
        let written = write_visualizations(dir.path(), &model).expect("write");
        assert_eq!(written.len(), 3);
        assert!(!dir.path().join(VIZ_DIR).join(HEATMAP_FILE).exists());
    }

    #[test]
    fn test_html_is_escaped() {
        assert_eq!(escape_html("a <b> & \"c\""), "a &lt;b&gt; &amp; &quot;c&quot;");
    }
}
