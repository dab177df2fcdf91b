//! Derive physical chunks from `pages_json`.
//!
//! Builds strictly from the stored page structure; never re-reads or
//! re-parses the original PDF/DOCX.

use scraper::{Html, Selector};
use serde_json::json;

use crate::common::PagesJson;
use crate::domains::documents::models::ChunkDraft;

/// One chunk per parser block when blocks exist; otherwise paragraph chunks
/// derived from the page HTML.
pub fn chunks_from_pages(pages: &PagesJson) -> Vec<ChunkDraft> {
    let mut chunks: Vec<ChunkDraft> = pages
        .blocks
        .iter()
        .map(|block| ChunkDraft {
            block_id: block.id.clone(),
            page: block.page,
            kind: if block.kind.is_empty() {
                "para".to_string()
            } else {
                block.kind.clone()
            },
            text: block.text.as_deref().unwrap_or("").trim().to_string(),
            meta: json!({"bbox": block.bbox, "source": "structured"}),
        })
        .collect();

    if !chunks.is_empty() {
        return chunks;
    }

    let selector = Selector::parse("p").expect("static selector");
    for (page_index, html) in pages.html_pages.iter().enumerate() {
        if html.is_empty() {
            continue;
        }
        let fragment = Html::parse_fragment(html);
        for (i, para) in fragment.select(&selector).enumerate() {
            let text = para.text().collect::<Vec<_>>().join(" ");
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if text.is_empty() {
                continue;
            }
            chunks.push(ChunkDraft {
                block_id: format!("p-{page_index}-{i}"),
                page: page_index as i32,
                kind: "para".to_string(),
                text,
                meta: json!({"source": "html_fallback"}),
            });
        }
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Block, ParserInfo};

    #[test]
    fn blocks_take_precedence_over_html() {
        let pages = PagesJson {
            html_pages: vec!["<p>ignored</p>".into()],
            blocks: vec![Block {
                id: "b-1".into(),
                page: 2,
                kind: "heading".into(),
                text: Some("  Drag-Along Rights  ".into()),
                bbox: None,
            }],
            tables: vec![],
            parser: ParserInfo::default(),
        };
        let chunks = chunks_from_pages(&pages);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].block_id, "b-1");
        assert_eq!(chunks[0].page, 2);
        assert_eq!(chunks[0].text, "Drag-Along Rights");
        assert_eq!(chunks[0].meta["source"], "structured");
    }

    #[test]
    fn html_fallback_splits_paragraphs() {
        let pages = PagesJson {
            html_pages: vec![
                "<p>First  paragraph</p><p>Second paragraph</p>".into(),
                "<p>Third</p>".into(),
            ],
            blocks: vec![],
            tables: vec![],
            parser: ParserInfo::default(),
        };
        let chunks = chunks_from_pages(&pages);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].block_id, "p-0-0");
        assert_eq!(chunks[0].text, "First paragraph");
        assert_eq!(chunks[2].block_id, "p-1-0");
        assert_eq!(chunks[2].page, 1);
        assert_eq!(chunks[0].meta["source"], "html_fallback");
    }

    #[test]
    fn empty_pages_yield_no_chunks() {
        assert!(chunks_from_pages(&PagesJson::default()).is_empty());
    }
}
