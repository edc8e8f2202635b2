//! PDF layout of a [`ReportDocument`] via `printpdf`.
//!
//! A4 pages, built-in fonts only. Rows go in fixed-width Courier columns;
//! a new page starts whenever the next block would cross the bottom margin.

use std::io::BufWriter;

use printpdf::*;

use super::document::{Entry, ReportDocument, Section};
use super::ReportError;

const PAGE_WIDTH: Mm = Mm(210.0);
const PAGE_HEIGHT: Mm = Mm(297.0);
const TOP: f32 = 280.0;
const BOTTOM: f32 = 20.0;
const LEFT: f32 = 20.0;
const TABLE_LEFT: f32 = 25.0;
const TABLE_WIDTH: f32 = 165.0;
const ROW_SIZE: f32 = 8.0;
const ROW_STEP: f32 = 4.0;
/// Approximate advance of one Courier glyph at `ROW_SIZE`.
const MONO_CHAR_MM: f32 = 1.7;

#[derive(Clone, Copy)]
enum Style {
    Regular,
    Bold,
    Mono,
}

struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    font: IndirectFontRef,
    bold: IndirectFontRef,
    courier: IndirectFontRef,
    footer: String,
    y: f32,
    pages: usize,
}

fn pdf_error(what: &str, e: impl std::fmt::Display) -> ReportError {
    ReportError::Render(format!("PDF {what} error: {e}"))
}

impl PageWriter {
    fn new(title: &str, footer: String) -> Result<Self, ReportError> {
        let (doc, page1, layer1) = PdfDocument::new(title, PAGE_WIDTH, PAGE_HEIGHT, "Layer 1");
        let layer = doc.get_page(page1).get_layer(layer1);
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| pdf_error("font", e))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| pdf_error("font", e))?;
        let courier = doc
            .add_builtin_font(BuiltinFont::Courier)
            .map_err(|e| pdf_error("font", e))?;

        let mut writer = Self {
            doc,
            layer,
            font,
            bold,
            courier,
            footer,
            y: TOP,
            pages: 1,
        };
        writer.write_footer();
        Ok(writer)
    }

    fn write_footer(&self) {
        let text = format!("{} - page {}", self.footer, self.pages);
        self.layer.use_text(text, 7.0, Mm(LEFT), Mm(BOTTOM - 8.0), &self.font);
    }

    /// Start a new page unless `height` millimetres still fit.
    fn reserve(&mut self, height: f32) {
        if self.y - height >= BOTTOM {
            return;
        }
        let (page, layer) = self.doc.add_page(PAGE_WIDTH, PAGE_HEIGHT, "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.pages += 1;
        self.y = TOP;
        self.write_footer();
    }

    fn text(&mut self, text: &str, size: f32, x: f32, style: Style) {
        let font = match style {
            Style::Regular => &self.font,
            Style::Bold => &self.bold,
            Style::Mono => &self.courier,
        };
        self.layer.use_text(text, size, Mm(x), Mm(self.y), font);
    }

    fn line(&mut self, text: &str, size: f32, step: f32, style: Style) {
        self.reserve(step);
        self.text(text, size, LEFT, style);
        self.y -= step;
    }

    fn paragraph(&mut self, text: &str, size: f32, max_chars: usize) {
        for line in wrap_text(text, max_chars) {
            self.reserve(4.5);
            self.text(&line, size, TABLE_LEFT, Style::Regular);
            self.y -= 4.5;
        }
    }

    /// Cells share the table width equally; long cells wrap inside their column.
    fn row(&mut self, cells: &[String]) {
        if cells.is_empty() {
            return;
        }
        let column_width = TABLE_WIDTH / cells.len() as f32;
        let max_chars = ((column_width / MONO_CHAR_MM) as usize).saturating_sub(1).max(1);
        let wrapped: Vec<Vec<String>> = cells.iter().map(|c| wrap_cell(c, max_chars)).collect();
        let height = wrapped.iter().map(Vec::len).max().unwrap_or(1) as f32 * ROW_STEP;

        self.reserve(height);
        for (column, lines) in wrapped.iter().enumerate() {
            let x = TABLE_LEFT + column as f32 * column_width;
            let top = self.y;
            for line in lines {
                self.text(line, ROW_SIZE, x, Style::Mono);
                self.y -= ROW_STEP;
            }
            self.y = top;
        }
        self.y -= height;
    }

    fn section(&mut self, section: &Section) {
        // Keep a heading on the same page as its first entry.
        self.reserve(6.0 + ROW_STEP);
        self.line(&section.heading.to_uppercase(), 11.0, 6.0, Style::Bold);
        if section.entries.is_empty() {
            self.paragraph("None", 9.0, 90);
        }
        for entry in &section.entries {
            match entry {
                Entry::Row(cells) => self.row(cells),
                Entry::Text(text) => self.paragraph(text, 9.0, 90),
            }
        }
        self.y -= 4.0;
    }

    fn finish(self) -> Result<Vec<u8>, ReportError> {
        let mut buf = BufWriter::new(Vec::new());
        self.doc.save(&mut buf).map_err(|e| pdf_error("save", e))?;
        buf.into_inner().map_err(|e| pdf_error("buffer", e))
    }
}

fn lay_out(document: &ReportDocument) -> Result<PageWriter, ReportError> {
    let header = &document.header;
    let mut writer = PageWriter::new(&document.title, header.order_code.clone())?;

    for (i, line) in header.lab_lines.iter().enumerate() {
        if i == 0 {
            writer.line(line, 12.0, 5.5, Style::Bold);
        } else {
            writer.line(line, 8.0, 4.0, Style::Regular);
        }
    }
    writer.y -= 6.0;

    writer.line(&document.title, 14.0, 8.0, Style::Bold);
    writer.line(&format!("Order: {}", header.order_code), 9.0, 4.5, Style::Regular);
    writer.line(&format!("Patient: {}", header.patient_name), 9.0, 4.5, Style::Regular);
    if let Some(birth_date) = header.patient_birth_date {
        writer.line(
            &format!("Date of birth: {}", birth_date.format("%d/%m/%Y")),
            9.0,
            4.5,
            Style::Regular,
        );
    }
    writer.line(
        &format!("Requested by: {}", header.professional_name),
        9.0,
        4.5,
        Style::Regular,
    );
    if let Some(executed_at) = header.executed_at {
        writer.line(
            &format!("Analysis completed: {}", executed_at.format("%d/%m/%Y")),
            9.0,
            4.5,
            Style::Regular,
        );
    }
    writer.y -= 6.0;

    for section in &document.sections {
        writer.section(section);
    }

    writer.y -= 4.0;
    writer.line(
        &format!("Issued by: {}", header.scientist_name),
        10.0,
        5.0,
        Style::Bold,
    );
    Ok(writer)
}

/// Lay the document out as PDF bytes.
pub fn to_pdf(document: &ReportDocument) -> Result<Vec<u8>, ReportError> {
    lay_out(document)?.finish()
}

fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.len() + word.len() + 1 > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Word-wrap a cell, hard-splitting words that alone exceed the column.
fn wrap_cell(cell: &str, max_chars: usize) -> Vec<String> {
    wrap_text(cell, max_chars)
        .into_iter()
        .flat_map(|line| {
            let chars: Vec<char> = line.chars().collect();
            if chars.len() <= max_chars {
                vec![line]
            } else {
                chars.chunks(max_chars).map(|c| c.iter().collect()).collect()
            }
        })
        .collect()
}
