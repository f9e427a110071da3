use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};

use crate::pdf::{PdfRenderer, PdfResult, TicketDocument};

// US Letter, in points
const PAGE_WIDTH: i64 = 612;
const PAGE_HEIGHT: i64 = 792;
const MARGIN: i64 = 54;

const TITLE_SIZE: i64 = 16;
const BODY_SIZE: i64 = 11;
const LEADING: i64 = 15;
/// Helvetica at 11pt fits roughly this many characters between the margins
const WRAP_WIDTH: usize = 88;

const TITLE: &str = "Traffic Ticket Dispute";

/// Plain-text ticket response PDF built directly with `lopdf`
#[derive(Debug, Default, Clone)]
pub struct TicketPdfRenderer;

impl TicketPdfRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl PdfRenderer for TicketPdfRenderer {
    #[tracing::instrument(name = "Render ticket PDF", skip_all, fields(ticket_number = %document.ticket_number))]
    fn render(&self, document: &TicketDocument) -> PdfResult<Vec<u8>> {
        let lines: Vec<String> = document
            .fields()
            .iter()
            .flat_map(|(label, value)| wrap(&format!("{}: {}", label, value), WRAP_WIDTH))
            .collect();

        let lines_per_page = ((PAGE_HEIGHT - 2 * MARGIN - 2 * LEADING) / LEADING) as usize;

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let regular_id = doc.add_object(font("Helvetica"));
        let bold_id = doc.add_object(font("Helvetica-Bold"));
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => regular_id,
                "F2" => bold_id,
            },
        });

        let mut kids: Vec<Object> = Vec::new();
        for (page, chunk) in lines.chunks(lines_per_page).enumerate() {
            let content = page_content(page == 0, chunk).encode()?;
            let content_id = doc.add_object(Stream::new(dictionary! {}, content));
            let page_id = add_page(&mut doc, pages_id, content_id, resources_id);
            kids.push(page_id.into());
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
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer)?;

        Ok(buffer)
    }
}

fn font(base_font: &str) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base_font,
        "Encoding" => "WinAnsiEncoding",
    }
}

/// Every page carries its own MediaBox so it survives being re-parented by a merge
fn add_page(
    doc: &mut Document,
    pages_id: ObjectId,
    content_id: ObjectId,
    resources_id: ObjectId,
) -> ObjectId {
    doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        "Contents" => content_id,
        "Resources" => resources_id,
    })
}

fn page_content(first_page: bool, lines: &[String]) -> Content {
    let mut operations = vec![Operation::new("BT", vec![])];
    let top = PAGE_HEIGHT - MARGIN;

    if first_page {
        operations.push(Operation::new("Tf", vec!["F2".into(), TITLE_SIZE.into()]));
        operations.push(Operation::new("Td", vec![MARGIN.into(), top.into()]));
        operations.push(Operation::new("Tj", vec![text(TITLE)]));
        operations.push(Operation::new("Tf", vec!["F1".into(), BODY_SIZE.into()]));
        operations.push(Operation::new("Td", vec![0.into(), (-2 * LEADING).into()]));
    } else {
        operations.push(Operation::new("Tf", vec!["F1".into(), BODY_SIZE.into()]));
        operations.push(Operation::new("Td", vec![MARGIN.into(), top.into()]));
    }

    operations.push(Operation::new("TL", vec![LEADING.into()]));
    for line in lines {
        operations.push(Operation::new("Tj", vec![text(line)]));
        operations.push(Operation::new("T*", vec![]));
    }
    operations.push(Operation::new("ET", vec![]));

    Content { operations }
}

/// Latin-1 bytes for the WinAnsi standard fonts; anything outside becomes `?`
fn text(value: &str) -> Object {
    let bytes = value
        .chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect();

    Object::String(bytes, StringFormat::Literal)
}

/// Greedy word wrap; words longer than `width` are split
fn wrap(line: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in line.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(width);
            lines.push(word.into_iter().collect());
            word = rest;
        }

        let word: String = word.into_iter().collect();
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() {
        lines.push(current);
    }

    lines
}
