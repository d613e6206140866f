//! PDF extraction backend built on lopdf.
//!
//! Walks each page's content stream, groups shown text into lines and
//! blocks, and classifies lines as headings from the font size and bold
//! flag of their first run. The output is heading-annotated plain text that
//! feeds straight into segmentation.

use std::collections::HashMap;
use std::path::Path;

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::ExtractError;
use crate::extract::{ExtractedDocument, ExtractionMetadata, TextExtractor};

/// Font-size cutoffs for heading detection. These are tuned empirically
/// against the extraction backend and may need recalibration if the backend
/// changes, so they are configuration rather than hard constants.
#[derive(Debug, Clone)]
pub struct HeadingThresholds {
    /// Size above which a line is a level-1 heading.
    pub h1_size: f64,
    /// Size above which a bold line is a level-1 heading.
    pub h1_bold_size: f64,
    /// Size above which a line is a level-2 heading.
    pub h2_size: f64,
    /// Size above which a bold line is a level-2 heading.
    pub h2_bold_size: f64,
    /// Size above which a line is a level-3 heading.
    pub h3_size: f64,
}

impl Default for HeadingThresholds {
    fn default() -> Self {
        Self {
            h1_size: 16.0,
            h1_bold_size: 14.0,
            h2_size: 13.0,
            h2_bold_size: 11.0,
            h3_size: 11.5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PdfConfig {
    pub headings: HeadingThresholds,
    /// A page drawing at least this many rectangle path ops is assumed to
    /// contain tables.
    pub table_rect_threshold: usize,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            headings: HeadingThresholds::default(),
            table_rect_threshold: 8,
        }
    }
}

pub struct PdfExtractor {
    config: PdfConfig,
}

impl PdfExtractor {
    pub fn new(config: PdfConfig) -> Self {
        Self { config }
    }

    fn heading_level(&self, size: f64, bold: bool) -> Option<usize> {
        let t = &self.config.headings;
        if size > t.h1_size || (size > t.h1_bold_size && bold) {
            Some(1)
        } else if size > t.h2_size || (size > t.h2_bold_size && bold) {
            Some(2)
        } else if size > t.h3_size {
            Some(3)
        } else {
            None
        }
    }

    /// Walks one page's content stream. Returns the assembled page text and
    /// the number of rectangle ops seen (the table hint).
    fn page_text(
        &self,
        doc: &Document,
        page_id: ObjectId,
        bold_fonts: &HashMap<Vec<u8>, bool>,
    ) -> (String, usize) {
        let data = match doc.get_page_content(page_id) {
            Ok(data) => data,
            Err(e) => {
                tracing::debug!("skipping unreadable page content: {}", e);
                return (String::new(), 0);
            }
        };
        let content = match Content::decode(&data) {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!("skipping undecodable page content: {}", e);
                return (String::new(), 0);
            }
        };

        let mut page_out = String::new();
        let mut block = String::new();
        let mut line = LineBuf::default();
        let mut cur_size = 0.0_f64;
        let mut cur_bold = false;
        let mut rect_ops = 0_usize;

        for op in &content.operations {
            match op.operator.as_str() {
                "Tf" => {
                    if let Some(Object::Name(name)) = op.operands.first() {
                        cur_bold = bold_fonts.get(name).copied().unwrap_or(false);
                    }
                    if let Some(size) = op.operands.get(1).and_then(number) {
                        cur_size = size;
                    }
                }
                // Text-positioning ops end the current line.
                "Td" | "TD" | "T*" | "Tm" => {
                    self.flush_line(&mut block, &mut line);
                }
                "Tj" => {
                    if let Some(Object::String(bytes, _)) = op.operands.first() {
                        line.append(bytes, cur_size, cur_bold);
                    }
                }
                "'" => {
                    self.flush_line(&mut block, &mut line);
                    if let Some(Object::String(bytes, _)) = op.operands.first() {
                        line.append(bytes, cur_size, cur_bold);
                    }
                }
                "\"" => {
                    self.flush_line(&mut block, &mut line);
                    if let Some(Object::String(bytes, _)) = op.operands.get(2) {
                        line.append(bytes, cur_size, cur_bold);
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = op.operands.first() {
                        for item in items {
                            if let Object::String(bytes, _) = item {
                                line.append(bytes, cur_size, cur_bold);
                            }
                        }
                    }
                }
                "ET" => {
                    self.flush_line(&mut block, &mut line);
                    flush_block(&mut page_out, &mut block);
                }
                "re" => rect_ops += 1,
                _ => {}
            }
        }

        self.flush_line(&mut block, &mut line);
        flush_block(&mut page_out, &mut block);

        (page_out, rect_ops)
    }

    fn flush_line(&self, block: &mut String, line: &mut LineBuf) {
        let text = std::mem::take(&mut line.text);
        let (size, bold) = (line.size, line.bold);
        line.size = 0.0;
        line.bold = false;

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return;
        }

        match self.heading_level(size, bold) {
            Some(level) => {
                if !block.is_empty() && !block.ends_with('\n') {
                    block.push('\n');
                }
                for _ in 0..level {
                    block.push('#');
                }
                block.push(' ');
                block.push_str(trimmed);
                block.push('\n');
            }
            None => {
                block.push_str(trimmed);
                block.push(' ');
            }
        }
    }
}

impl TextExtractor for PdfExtractor {
    fn extract(&self, path: &Path) -> Result<ExtractedDocument, ExtractError> {
        let _span = tracing::info_span!("extract.pdf").entered();

        if !path.exists() {
            return Err(ExtractError::FileNotFound(path.to_path_buf()));
        }
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        if extension != "pdf" {
            return Err(ExtractError::UnsupportedType(extension));
        }

        let file_size = std::fs::metadata(path)
            .map_err(|e| ExtractError::ReadDocument {
                path: path.to_path_buf(),
                source: e,
            })?
            .len();

        let doc = Document::load(path).map_err(|e| ExtractError::Pdf(e.to_string()))?;
        let pages = doc.get_pages();

        let mut page_texts = Vec::with_capacity(pages.len());
        let mut has_images = false;
        let mut has_tables = false;

        for page_id in pages.values() {
            let resources = page_resources(&doc, *page_id);
            let bold_fonts = resources
                .map(|r| page_bold_fonts(&doc, r))
                .unwrap_or_default();
            if let Some(resources) = resources {
                has_images = has_images || page_has_images(&doc, resources);
            }

            let (text, rect_ops) = self.page_text(&doc, *page_id, &bold_fonts);
            if rect_ops >= self.config.table_rect_threshold {
                has_tables = true;
            }
            page_texts.push(text);
        }

        let text = normalize_whitespace(&page_texts.join("\n---\n\n"));

        tracing::debug!(
            pages = pages.len(),
            chars = text.chars().count(),
            "extracted text from {}",
            path.display()
        );

        Ok(ExtractedDocument {
            text,
            metadata: ExtractionMetadata {
                pages: pages.len(),
                file_size,
                extraction_date: chrono::Utc::now().to_rfc3339(),
                converter: "lopdf".to_string(),
                format: "markdown".to_string(),
                has_images,
                has_tables,
                quality_score: None,
            },
        })
    }
}

/// Accumulates one visual line of text. Font size and bold flag come from
/// the first run appended to the line.
#[derive(Default)]
struct LineBuf {
    text: String,
    size: f64,
    bold: bool,
}

impl LineBuf {
    fn append(&mut self, bytes: &[u8], size: f64, bold: bool) {
        if self.text.is_empty() {
            self.size = size;
            self.bold = bold;
        }
        self.text.push_str(&String::from_utf8_lossy(bytes));
    }
}

fn flush_block(page_out: &mut String, block: &mut String) {
    let text = std::mem::take(block);
    if !text.trim().is_empty() {
        page_out.push_str(text.trim_end_matches(' '));
        page_out.push_str("\n\n");
    }
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Finds the resource dictionary for a page, following the Parent chain for
/// inherited resources. Depth-limited to guard against cyclic page trees.
fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut dict = doc.get_object(page_id).ok()?.as_dict().ok()?;
    for _ in 0..16 {
        if let Ok(resources) = dict.get(b"Resources") {
            return resolve(doc, resources).as_dict().ok();
        }
        let parent = dict.get(b"Parent").ok()?;
        dict = resolve(doc, parent).as_dict().ok()?;
    }
    None
}

/// Maps font resource names to whether their BaseFont looks bold.
fn page_bold_fonts(doc: &Document, resources: &Dictionary) -> HashMap<Vec<u8>, bool> {
    let mut bold = HashMap::new();
    let fonts = match resources.get(b"Font").map(|f| resolve(doc, f)) {
        Ok(Object::Dictionary(fonts)) => fonts,
        _ => return bold,
    };
    for (name, obj) in fonts.iter() {
        let is_bold = resolve(doc, obj)
            .as_dict()
            .ok()
            .and_then(|d| d.get(b"BaseFont").ok())
            .and_then(|o| match resolve(doc, o) {
                Object::Name(n) => Some(n.clone()),
                _ => None,
            })
            .map(|n| String::from_utf8_lossy(&n).to_ascii_lowercase().contains("bold"))
            .unwrap_or(false);
        bold.insert(name.clone(), is_bold);
    }
    bold
}

fn page_has_images(doc: &Document, resources: &Dictionary) -> bool {
    let xobjects = match resources.get(b"XObject").map(|x| resolve(doc, x)) {
        Ok(Object::Dictionary(xobjects)) => xobjects,
        _ => return false,
    };
    for (_name, obj) in xobjects.iter() {
        if let Object::Stream(stream) = resolve(doc, obj) {
            if let Ok(Object::Name(subtype)) = stream.dict.get(b"Subtype") {
                if subtype.as_slice() == b"Image" {
                    return true;
                }
            }
        }
    }
    false
}

/// Collapses runs of 3+ newlines to exactly 2 and runs of 2+ spaces to 1,
/// then trims leading and trailing whitespace.
fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut newlines = 0_usize;
    let mut spaces = 0_usize;

    for c in text.chars() {
        match c {
            '\n' => {
                newlines += 1;
                spaces = 0;
                if newlines <= 2 {
                    out.push('\n');
                }
            }
            ' ' => {
                spaces += 1;
                newlines = 0;
                if spaces <= 1 {
                    out.push(' ');
                }
            }
            _ => {
                newlines = 0;
                spaces = 0;
                out.push(c);
            }
        }
    }

    out.trim().to_string()
}
