//! Splits extracted text into ordered, typed sections using the heading
//! markers the extractor emits.

use crate::model::SectionType;

/// One ordered fragment of a document's extracted text. Order is positional
/// in the returned vector; the repository assigns contiguous indices when
/// persisting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub section_type: SectionType,
    pub content: String,
}

/// Segments text into sections, line by line.
///
/// `# ` opens a title, `## ` a section, `### ` a subsection; each marker
/// match is exact, so `## ` is never claimed by the `# ` rule. A title holds
/// only its heading line; prose after it opens a fresh body section. Section
/// and subsection headings keep accumulating the lines that follow them.
/// Lines without a marker otherwise append to the currently open section,
/// which defaults to `body`. A section is flushed only when its content is
/// non-blank. The result is never empty for non-empty input: degenerate
/// input falls back to a single body section holding the whole text.
pub fn segment(text: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current = Section {
        section_type: SectionType::Body,
        content: String::new(),
    };

    for line in text.split('\n') {
        let stripped = line.trim();

        if let Some(rest) = stripped.strip_prefix("# ") {
            flush(&mut sections, current);
            // Titles are single-line; close immediately and reopen a body.
            flush(
                &mut sections,
                Section {
                    section_type: SectionType::Title,
                    content: rest.to_string(),
                },
            );
            current = Section {
                section_type: SectionType::Body,
                content: String::new(),
            };
        } else if let Some(rest) = stripped.strip_prefix("## ") {
            flush(&mut sections, current);
            current = Section {
                section_type: SectionType::Section,
                content: format!("{}\n", rest),
            };
        } else if let Some(rest) = stripped.strip_prefix("### ") {
            flush(&mut sections, current);
            current = Section {
                section_type: SectionType::Subsection,
                content: format!("{}\n", rest),
            };
        } else {
            current.content.push_str(line);
            current.content.push('\n');
        }
    }

    flush(&mut sections, current);

    if sections.is_empty() {
        sections.push(Section {
            section_type: SectionType::Body,
            content: text.to_string(),
        });
    }

    sections
}

fn flush(sections: &mut Vec<Section>, section: Section) {
    if !section.content.trim().is_empty() {
        sections.push(section);
    }
}
