//! Document parsers.
//!
//! [`BuiltinStructuredParser`] handles text-like inputs and produces typed
//! blocks with heading detection. The naive MIME-specific parsers are the
//! fallback for binary inputs: they scrape printable runs out of the raw
//! bytes and return page HTML with no block structure.

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::common::{Block, PagesJson, ParsedDocument, ParserInfo};
use crate::kernel::traits::StructuredParser;

/// Structure-aware parser for text-like documents.
///
/// Pages split on form feeds, paragraphs on blank lines, headings by a
/// conservative heuristic. Binary inputs (real PDF/DOCX containers) are
/// rejected so the parse stage falls back to the naive parsers.
#[derive(Default)]
pub struct BuiltinStructuredParser;

#[async_trait]
impl StructuredParser for BuiltinStructuredParser {
    async fn parse(&self, bytes: &[u8]) -> Result<ParsedDocument> {
        if looks_binary(bytes) {
            return Err(anyhow!("input is not text; structured parse unavailable"));
        }
        let text = String::from_utf8_lossy(bytes);

        let mut blocks = Vec::new();
        let mut html_pages = Vec::new();
        let mut plain_parts = Vec::new();

        for (page_idx, page) in text.split('\u{0c}').enumerate() {
            let mut page_html = String::new();
            for para in split_paragraphs(page) {
                let kind = if is_heading(&para) { "heading" } else { "para" };
                let id = format!("b-{page_idx}-{}", blocks.len());
                if kind == "heading" {
                    page_html.push_str(&format!("<h2>{}</h2>", html_escape(&para)));
                } else {
                    page_html.push_str(&format!("<p>{}</p>", html_escape(&para)));
                }
                plain_parts.push(para.clone());
                blocks.push(Block {
                    id,
                    page: page_idx as i32,
                    kind: kind.to_string(),
                    text: Some(para),
                    bbox: None,
                });
            }
            html_pages.push(page_html);
        }

        if blocks.is_empty() {
            return Err(anyhow!("structured parse produced no blocks"));
        }

        Ok(ParsedDocument {
            pages: PagesJson {
                html_pages,
                blocks,
                tables: Vec::new(),
                parser: ParserInfo {
                    engine: "builtin".into(),
                    version: "1".into(),
                },
            },
            text_plain: plain_parts.join("\n\n"),
        })
    }
}

/// Naive PDF parser: scrape printable runs from the raw bytes.
pub fn parse_pdf_naive(bytes: &[u8]) -> ParsedDocument {
    naive_parse(bytes, "naive-pdf")
}

/// Naive DOCX parser: same scrape, tagged with its own engine.
pub fn parse_docx_naive(bytes: &[u8]) -> ParsedDocument {
    naive_parse(bytes, "naive-docx")
}

fn naive_parse(bytes: &[u8], engine: &str) -> ParsedDocument {
    let text_plain = scrape_printable(bytes);
    let page_html: String = text_plain
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| format!("<p>{}</p>", html_escape(l.trim())))
        .collect();

    ParsedDocument {
        pages: PagesJson {
            html_pages: vec![page_html],
            blocks: Vec::new(),
            tables: Vec::new(),
            parser: ParserInfo {
                engine: engine.into(),
                version: "1".into(),
            },
        },
        text_plain,
    }
}

/// Extract runs of printable text from arbitrary bytes, dropping runs too
/// short to be prose.
fn scrape_printable(bytes: &[u8]) -> String {
    const MIN_RUN: usize = 4;
    let mut out = String::new();
    let mut run = String::new();

    for &b in bytes {
        let c = b as char;
        if b == b'\n' || (b >= 0x20 && b < 0x7f) {
            run.push(c);
        } else if !run.is_empty() {
            if run.trim().len() >= MIN_RUN {
                out.push_str(run.trim_matches(|c: char| c != '\n' && c.is_whitespace()));
                out.push('\n');
            }
            run.clear();
        }
    }
    if run.trim().len() >= MIN_RUN {
        out.push_str(run.trim());
    }
    out.trim().to_string()
}

fn looks_binary(bytes: &[u8]) -> bool {
    if bytes.is_empty() {
        return true;
    }
    let suspicious = bytes
        .iter()
        .filter(|&&b| b == 0 || (b < 0x09) || (b > 0x0d && b < 0x20) || b == 0x7f)
        .count();
    suspicious * 20 > bytes.len()
}

fn split_paragraphs(page: &str) -> Vec<String> {
    let mut paras = Vec::new();
    let mut current = Vec::new();
    for line in page.lines() {
        if line.trim().is_empty() {
            flush_paragraph(&mut current, &mut paras);
        } else if is_heading(line.trim()) {
            // Headings stand alone even without surrounding blank lines.
            flush_paragraph(&mut current, &mut paras);
            paras.push(line.trim().to_string());
        } else {
            current.push(line.trim().to_string());
        }
    }
    flush_paragraph(&mut current, &mut paras);
    paras
}

fn flush_paragraph(current: &mut Vec<String>, paras: &mut Vec<String>) {
    if !current.is_empty() {
        paras.push(current.join(" "));
        current.clear();
    }
}

/// Heading heuristic: short, no sentence-final punctuation, and either
/// numbered, all-caps, or predominantly title-cased.
fn is_heading(line: &str) -> bool {
    let line = line.trim();
    if line.is_empty() || line.len() > 90 || line.ends_with(['.', ';', ',']) {
        return false;
    }
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.len() > 12 {
        return false;
    }

    let starts_numbered = {
        let first = words[0].trim_end_matches(['.', ':', ')']);
        !first.is_empty() && first.chars().all(|c| c.is_ascii_digit() || c == '.')
            || first.eq_ignore_ascii_case("section")
            || first.eq_ignore_ascii_case("article")
    };
    if starts_numbered {
        return true;
    }

    let alpha: Vec<char> = line.chars().filter(|c| c.is_alphabetic()).collect();
    if alpha.is_empty() {
        return false;
    }
    let all_caps = alpha.iter().all(|c| c.is_uppercase());
    if all_caps {
        return true;
    }

    // Title case with lowercase stopwords still counts ("Board of Directors").
    let capitalized = words
        .iter()
        .filter(|w| w.chars().next().is_some_and(|c| c.is_uppercase()))
        .count();
    capitalized * 10 >= words.len() * 6
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
