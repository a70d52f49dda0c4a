use std::fmt::Write as FmtWrite;

use crate::models::{Chunk, OutputFormat, SearchResults};
use crate::services::{Answer, BuildReport};

const PREVIEW_CHARS: usize = 200;

pub trait Formatter {
    fn format_search_results(&self, results: &SearchResults) -> String;
    fn format_answer(&self, question: &str, answer: &Answer, show_context: bool) -> String;
    fn format_build_report(&self, report: &BuildReport, duration_ms: u64) -> String;
    fn format_file_list(&self, files: &[String]) -> String;
    fn format_status(&self, status: &StatusInfo) -> String;
    fn format_message(&self, message: &str) -> String;
    fn format_error(&self, error: &str) -> String;
}

#[derive(Debug, Clone)]
pub struct StatusInfo {
    pub embedding_url: String,
    pub embedding_healthy: bool,
    pub embedding_model: Option<String>,
    pub vector_store_driver: String,
    pub vector_store_url: String,
    pub vector_store_connected: bool,
    pub vector_store_points: u64,
    pub collection: String,
}

fn preview(text: &str) -> String {
    let head: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().count() > PREVIEW_CHARS {
        format!("{head}...")
    } else {
        head
    }
}

fn chunk_json(chunk: &Chunk) -> serde_json::Value {
    serde_json::json!({
        "path": chunk.path,
        "chunk_id": chunk.chunk_id,
        "start_line": chunk.start_line,
        "end_line": chunk.end_line,
        "kind": chunk.kind.as_str(),
        "text": chunk.text,
    })
}

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_search_results(&self, results: &SearchResults) -> String {
        if results.is_empty() {
            return format!("No results found for: {}\n", results.query);
        }

        let mut output = String::new();
        let _ = writeln!(output, "Search results for: \"{}\"", results.query);
        let _ = writeln!(
            output,
            "Found {} results in {}ms\n",
            results.len(),
            results.duration_ms
        );

        for (i, hit) in results.results.iter().enumerate() {
            let _ = writeln!(output, "{}. [Similarity: {:.3}]", i + 1, hit.similarity());
            let _ = writeln!(output, "   Location: {}", hit.chunk.location());
            let _ = writeln!(output, "   ---");
            for line in preview(&hit.chunk.text).lines() {
                let _ = writeln!(output, "   {line}");
            }
            let _ = writeln!(output);
        }

        output
    }

    fn format_answer(&self, question: &str, answer: &Answer, show_context: bool) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "Q: {}\n", question.trim());
        let _ = writeln!(output, "{}\n", answer.text().trim_end());

        if !answer.sources().is_empty() {
            let _ = writeln!(output, "Sources:");
            for chunk in answer.sources() {
                let _ = writeln!(output, "  - {}", chunk.location());
            }
        }

        if show_context {
            for chunk in answer.sources() {
                let _ = writeln!(output, "\n=== {} ===", chunk.location());
                let _ = writeln!(output, "{}", chunk.text);
            }
        }

        output
    }

    fn format_build_report(&self, report: &BuildReport, duration_ms: u64) -> String {
        let mut output = String::new();
        if report.cancelled {
            let _ = writeln!(output, "Indexing Cancelled");
            let _ = writeln!(output, "------------------");
        } else {
            let _ = writeln!(output, "Indexing Complete");
            let _ = writeln!(output, "-----------------");
        }
        let _ = writeln!(output, "Files indexed: {}", report.files);
        let _ = writeln!(output, "Chunks created: {}", report.chunks);
        let _ = writeln!(output, "Chunks embedded: {}", report.embedded);
        let _ = writeln!(output, "Chunks skipped: {}", report.skipped);
        let _ = writeln!(output, "Batches: {}", report.batches);
        let _ = writeln!(output, "Duration: {duration_ms}ms");
        output
    }

    fn format_file_list(&self, files: &[String]) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "Dry run: would index {} files", files.len());
        for file in files {
            let _ = writeln!(output, "  {file}");
        }
        output
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "Status");
        let _ = writeln!(output, "------");

        let embedding_status = if status.embedding_healthy {
            "[HEALTHY]"
        } else {
            "[UNREACHABLE]"
        };
        let _ = writeln!(output, "Embedding:     {embedding_status}");
        let _ = writeln!(output, "  URL:         {}", status.embedding_url);
        if let Some(ref model) = status.embedding_model {
            let _ = writeln!(output, "  Model:       {model}");
        }
        let _ = writeln!(output);

        let vector_status = if status.vector_store_connected {
            "[CONNECTED]"
        } else {
            "[DISCONNECTED]"
        };
        let _ = writeln!(
            output,
            "Vector Store:  {} ({})",
            status.vector_store_driver, vector_status
        );
        if status.vector_store_connected {
            let _ = writeln!(output, "  URL:         {}", status.vector_store_url);
            let _ = writeln!(output, "  Collection:  {}", status.collection);
            let _ = writeln!(output, "  Records:     {}", status.vector_store_points);
        }

        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("{message}\n")
    }

    fn format_error(&self, error: &str) -> String {
        format!("Error: {error}\n")
    }
}

pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render(&self, value: &serde_json::Value) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        match rendered {
            Ok(mut s) => {
                s.push('\n');
                s
            }
            Err(e) => format!("{{\"error\": \"{e}\"}}\n"),
        }
    }
}

impl Formatter for JsonFormatter {
    fn format_search_results(&self, results: &SearchResults) -> String {
        let hits: Vec<serde_json::Value> = results
            .results
            .iter()
            .map(|hit| {
                let mut value = chunk_json(&hit.chunk);
                value["similarity"] = serde_json::json!(hit.similarity());
                value["distance"] = serde_json::json!(hit.distance);
                value
            })
            .collect();

        self.render(&serde_json::json!({
            "query": results.query,
            "total": results.len(),
            "duration_ms": results.duration_ms,
            "results": hits,
        }))
    }

    fn format_answer(&self, question: &str, answer: &Answer, show_context: bool) -> String {
        let sources: Vec<serde_json::Value> = answer
            .sources()
            .iter()
            .map(|chunk| {
                let mut value = chunk_json(chunk);
                if !show_context && let Some(obj) = value.as_object_mut() {
                    obj.remove("text");
                }
                value
            })
            .collect();

        self.render(&serde_json::json!({
            "question": question.trim(),
            "answer": answer.text(),
            "found_context": matches!(answer, Answer::Answered { .. }),
            "sources": sources,
        }))
    }

    fn format_build_report(&self, report: &BuildReport, duration_ms: u64) -> String {
        let mut value = serde_json::to_value(report).unwrap_or_default();
        value["duration_ms"] = serde_json::json!(duration_ms);
        self.render(&value)
    }

    fn format_file_list(&self, files: &[String]) -> String {
        self.render(&serde_json::json!({
            "dry_run": true,
            "total": files.len(),
            "files": files,
        }))
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        self.render(&serde_json::json!({
            "embedding": {
                "url": status.embedding_url,
                "healthy": status.embedding_healthy,
                "model": status.embedding_model,
            },
            "vector_store": {
                "driver": status.vector_store_driver,
                "url": status.vector_store_url,
                "connected": status.vector_store_connected,
                "collection": status.collection,
                "records": status.vector_store_points,
            }
        }))
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", serde_json::json!({"message": message}))
    }

    fn format_error(&self, error: &str) -> String {
        format!("{}\n", serde_json::json!({"error": error}))
    }
}

pub struct MarkdownFormatter;

impl Formatter for MarkdownFormatter {
    fn format_search_results(&self, results: &SearchResults) -> String {
        if results.is_empty() {
            return format!("## No results found\n\nQuery: `{}`\n", results.query);
        }

        let mut output = String::new();
        let _ = writeln!(output, "## Search Results\n");
        let _ = writeln!(output, "**Query:** `{}`\n", results.query);
        let _ = writeln!(
            output,
            "Found {} results in {}ms\n",
            results.len(),
            results.duration_ms
        );

        for (i, hit) in results.results.iter().enumerate() {
            let _ = writeln!(
                output,
                "### {}. Similarity: {:.3}\n",
                i + 1,
                hit.similarity()
            );
            let _ = writeln!(output, "**Location:** `{}`\n", hit.chunk.location());
            let _ = writeln!(output, "```");
            let _ = writeln!(output, "{}", hit.chunk.text);
            let _ = writeln!(output, "```\n");
        }

        output
    }

    fn format_answer(&self, question: &str, answer: &Answer, show_context: bool) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "## {}\n", question.trim());
        let _ = writeln!(output, "{}\n", answer.text().trim_end());

        if !answer.sources().is_empty() {
            let _ = writeln!(output, "### Sources\n");
            for chunk in answer.sources() {
                let _ = writeln!(output, "- `{}`", chunk.location());
            }
            let _ = writeln!(output);
        }

        if show_context {
            for chunk in answer.sources() {
                let _ = writeln!(output, "#### `{}`\n", chunk.location());
                let _ = writeln!(output, "```\n{}\n```\n", chunk.text);
            }
        }

        output
    }

    fn format_build_report(&self, report: &BuildReport, duration_ms: u64) -> String {
        let mut output = String::new();
        let title = if report.cancelled {
            "Indexing Cancelled"
        } else {
            "Indexing Complete"
        };
        let _ = writeln!(output, "## {title}\n");
        let _ = writeln!(output, "| Metric | Value |");
        let _ = writeln!(output, "|--------|-------|");
        let _ = writeln!(output, "| Files indexed | {} |", report.files);
        let _ = writeln!(output, "| Chunks created | {} |", report.chunks);
        let _ = writeln!(output, "| Chunks embedded | {} |", report.embedded);
        let _ = writeln!(output, "| Chunks skipped | {} |", report.skipped);
        let _ = writeln!(output, "| Batches | {} |", report.batches);
        let _ = writeln!(output, "| Duration | {duration_ms}ms |");
        output
    }

    fn format_file_list(&self, files: &[String]) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "## Dry Run\n");
        let _ = writeln!(output, "Would index {} files:\n", files.len());
        for file in files {
            let _ = writeln!(output, "- `{file}`");
        }
        output
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "## Status\n");

        let embedding_status = if status.embedding_healthy { "✅" } else { "❌" };
        let _ = writeln!(output, "### Embedding Server {embedding_status}\n");
        let _ = writeln!(output, "- **URL:** `{}`", status.embedding_url);
        if let Some(ref model) = status.embedding_model {
            let _ = writeln!(output, "- **Model:** {model}");
        }
        let _ = writeln!(output);

        let vector_status = if status.vector_store_connected {
            "✅"
        } else {
            "❌"
        };
        let _ = writeln!(
            output,
            "### Vector Store ({}) {}\n",
            status.vector_store_driver, vector_status
        );
        let _ = writeln!(output, "- **URL:** `{}`", status.vector_store_url);
        let _ = writeln!(output, "- **Collection:** {}", status.collection);
        let _ = writeln!(output, "- **Records:** {}", status.vector_store_points);

        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("> {message}\n")
    }

    fn format_error(&self, error: &str) -> String {
        format!("> ⚠️ **Error:** {error}\n")
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
        OutputFormat::Markdown => Box::new(MarkdownFormatter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChunkKind, SearchHit};

    fn hit(path: &str, distance: f32) -> SearchHit {
        SearchHit {
            chunk: Chunk {
                path: path.to_string(),
                chunk_id: 1,
                text: "fn main() {}".to_string(),
                start_line: 3,
                end_line: 7,
                kind: ChunkKind::Logical,
            },
            distance,
        }
    }

    #[test]
    fn test_text_search_results() {
        let results = SearchResults::new("entry point".to_string(), vec![hit("src/main.rs", 0.25)], 12);
        let out = TextFormatter.format_search_results(&results);
        assert!(out.contains("1. [Similarity: 0.750]"));
        assert!(out.contains("Location: src/main.rs:3-7"));
    }

    #[test]
    fn test_json_search_results() {
        let results = SearchResults::new("q".to_string(), vec![hit("a.rs", 0.5)], 3);
        let out = JsonFormatter::new(false).format_search_results(&results);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["total"], 1);
        assert_eq!(value["results"][0]["path"], "a.rs");
        assert_eq!(value["results"][0]["kind"], "logical");
    }

    #[test]
    fn test_no_context_answer() {
        let out = TextFormatter.format_answer("why?", &Answer::NoRelevantContent, true);
        assert!(out.contains("could not find relevant code"));
        assert!(!out.contains("Sources:"));

        let json = JsonFormatter::new(false).format_answer("why?", &Answer::NoRelevantContent, false);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["found_context"], false);
    }

    #[test]
    fn test_json_answer_hides_text_without_context() {
        let answer = Answer::Answered {
            text: "see main".to_string(),
            sources: vec![hit("a.rs", 0.1).chunk],
        };
        let value: serde_json::Value =
            serde_json::from_str(&JsonFormatter::new(true).format_answer("q", &answer, false))
                .unwrap();
        assert!(value["sources"][0].get("text").is_none());
        assert_eq!(value["sources"][0]["start_line"], 3);
    }

    #[test]
    fn test_cancelled_build_report() {
        let report = BuildReport {
            files: 2,
            chunks: 10,
            embedded: 4,
            cancelled: true,
            ..Default::default()
        };
        let out = MarkdownFormatter.format_build_report(&report, 50);
        assert!(out.starts_with("## Indexing Cancelled"));
        assert!(out.contains("| Chunks embedded | 4 |"));
    }
}
