//! Group parser blocks into heading-delimited sections.

use crate::common::Block;

use super::numbering::strip_leading_numbering;

#[derive(Debug, Clone, Default)]
pub struct Section {
    pub title: String,
    pub page_start: Option<i32>,
    pub page_end: Option<i32>,
    pub block_ids: Vec<String>,
    pub text: String,
}

/// Walk blocks in order, starting a new section at each heading. Blocks
/// before the first heading form an untitled preamble section.
pub fn sectionize(blocks: &[Block]) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();
    let mut current: Option<SectionBuilder> = None;

    for block in blocks {
        let text = block.text.as_deref().unwrap_or("").trim().to_string();

        if block.kind == "heading" && !text.is_empty() {
            let (title, _numbering) = strip_leading_numbering(&text);
            if let Some(done) = current.take() {
                sections.push(done.finish());
            }
            current = Some(SectionBuilder {
                title: title.trim().to_string(),
                page_start: Some(block.page),
                page_end: Some(block.page),
                block_ids: vec![block.id.clone()],
                body: Vec::new(),
            });
        } else {
            let builder = current.get_or_insert_with(SectionBuilder::default);
            if builder.page_start.is_none() {
                builder.page_start = Some(block.page);
            }
            builder.page_end = Some(block.page);
            builder.block_ids.push(block.id.clone());
            if !text.is_empty() {
                builder.body.push(text);
            }
        }
    }

    if let Some(done) = current.take() {
        sections.push(done.finish());
    }
    sections
}

#[derive(Default)]
struct SectionBuilder {
    title: String,
    page_start: Option<i32>,
    page_end: Option<i32>,
    block_ids: Vec<String>,
    body: Vec<String>,
}

impl SectionBuilder {
    fn finish(self) -> Section {
        Section {
            title: self.title,
            page_start: self.page_start,
            page_end: self.page_end,
            block_ids: self.block_ids,
            text: self.body.join("\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(id: &str, page: i32, kind: &str, text: &str) -> Block {
        Block {
            id: id.into(),
            page,
            kind: kind.into(),
            text: Some(text.into()),
            bbox: None,
        }
    }

    #[test]
    fn headings_start_new_sections() {
        let blocks = vec![
            block("b-0", 0, "heading", "1. Board of Directors"),
            block("b-1", 0, "para", "The board shall consist of five members."),
            block("b-2", 1, "heading", "2. Liquidation Preference"),
            block("b-3", 1, "para", "One times, non-participating."),
        ];
        let sections = sectionize(&blocks);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].title, "Board of Directors");
        assert_eq!(sections[0].block_ids, vec!["b-0", "b-1"]);
        assert!(sections[0].text.contains("five members"));
        assert_eq!(sections[1].page_start, Some(1));
    }

    #[test]
    fn leading_paragraphs_form_untitled_preamble() {
        let blocks = vec![
            block("b-0", 0, "para", "This term sheet summarizes the terms."),
            block("b-1", 0, "heading", "Definitions"),
        ];
        let sections = sectionize(&blocks);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].title, "");
        assert_eq!(sections[1].title, "Definitions");
    }

    #[test]
    fn empty_input_yields_no_sections() {
        assert!(sectionize(&[]).is_empty());
    }
}
