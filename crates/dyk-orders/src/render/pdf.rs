//! PDF output for invoice layouts.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};

use super::layout::{FontWeight, InvoiceLayout, Page, PAGE_HEIGHT, PAGE_WIDTH};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Layout has no pages")]
    EmptyLayout,

    #[error("PDF encoding failed: {0}")]
    Pdf(String),
}

/// Turns a layout into a document.
pub trait PdfEngine: Send + Sync {
    fn render(&self, layout: &InvoiceLayout) -> Result<Vec<u8>, RenderError>;
}

/// Writes PDF 1.5 with the standard Helvetica fonts, one uncompressed content
/// stream per page.
#[derive(Debug, Clone, Default)]
pub struct LopdfEngine;

impl LopdfEngine {
    pub fn new() -> Self {
        LopdfEngine
    }
}

impl PdfEngine for LopdfEngine {
    fn render(&self, layout: &InvoiceLayout) -> Result<Vec<u8>, RenderError> {
        if layout.pages.is_empty() {
            return Err(RenderError::EmptyLayout);
        }

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let regular_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let bold_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => Object::Reference(regular_id),
                "F2" => Object::Reference(bold_id),
            },
        });

        let mut kids: Vec<Object> = Vec::with_capacity(layout.pages.len());
        for page in &layout.pages {
            let content_id = add_content(&mut doc, page)?;
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => Object::Reference(pages_id),
                "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
                "Contents" => Object::Reference(content_id),
                "Resources" => Object::Reference(resources_id),
            });
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::String(win_ansi(&layout.title), StringFormat::Literal),
            "Producer" => Object::string_literal("dyk-orders"),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));
        doc.trailer.set("Info", Object::Reference(info_id));

        let mut output = Vec::new();
        doc.save_to(&mut output)
            .map_err(|e| RenderError::Pdf(format!("failed to save PDF: {e}")))?;

        Ok(output)
    }
}

fn add_content(doc: &mut Document, page: &Page) -> Result<ObjectId, RenderError> {
    let mut operations = Vec::with_capacity(page.texts.len() * 5 + page.rules.len() * 3 + 1);

    if !page.rules.is_empty() {
        operations.push(Operation::new("w", vec![Object::Real(0.5)]));
        for rule in &page.rules {
            operations.push(Operation::new("m", vec![rule.x1.into(), rule.y.into()]));
            operations.push(Operation::new("l", vec![rule.x2.into(), rule.y.into()]));
            operations.push(Operation::new("S", vec![]));
        }
    }

    for run in &page.texts {
        let font = match run.weight {
            FontWeight::Regular => "F1",
            FontWeight::Bold => "F2",
        };
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec![Object::Name(font.as_bytes().to_vec()), run.size.into()],
        ));
        operations.push(Operation::new("Td", vec![run.x.into(), run.y.into()]));
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(win_ansi(&run.text), StringFormat::Literal)],
        ));
        operations.push(Operation::new("ET", vec![]));
    }

    let bytes = Content { operations }
        .encode()
        .map_err(|e| RenderError::Pdf(format!("failed to encode content: {e}")))?;

    Ok(doc.add_object(Stream::new(dictionary! {}, bytes)))
}

/// Encodes text for the WinAnsi font encoding. Characters outside it
/// become `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20}'..='\u{7e}' | '\u{a0}'..='\u{ff}' => c as u32 as u8,
            '€' => 0x80,
            '…' => 0x85,
            '–' => 0x96,
            '—' => 0x97,
            _ => b'?',
        })
        .collect()
}
