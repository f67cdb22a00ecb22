//! Minimal PDF writer for bordered tables.
//!
//! Pages are A4 landscape. Text uses the standard Helvetica fonts with
//! WinAnsiEncoding, which covers Portuguese; characters outside it print as
//! `?`. Column widths follow the longest cell of each column, and cells too
//! wide for their column are cut with an ellipsis.

use super::Table;
use std::io::Write;

const PAGE_WIDTH: f32 = 842.0;
const PAGE_HEIGHT: f32 = 595.0;
const MARGIN: f32 = 36.0;
const TITLE_SIZE: f32 = 14.0;
const FONT_SIZE: f32 = 9.0;
const ROW_HEIGHT: f32 = 16.0;
const CELL_PADDING: f32 = 3.0;
/// Average Helvetica glyph width as a fraction of the font size.
const GLYPH_WIDTH: f32 = 0.52;
/// Columns never shrink below this many characters when scaled down.
const MIN_COLUMN_CHARS: usize = 4;

/// Map a character to its WinAnsiEncoding byte.
fn win_ansi(c: char) -> u8 {
    match c as u32 {
        0x20..=0x7E => c as u8,
        0xA0..=0xFF => c as u32 as u8,
        0x20AC => 0x80, // €
        0x2013 => 0x96, // en dash
        0x2014 => 0x97, // em dash
        0x2018 => 0x91,
        0x2019 => 0x92,
        0x201C => 0x93,
        0x201D => 0x94,
        0x2022 => 0x95, // bullet
        0x2026 => 0x85, // ellipsis
        _ => b'?',
    }
}

/// Encode text as a PDF literal string, escaping delimiters.
fn literal(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() + 2);
    out.push(b'(');
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push(b'\\');
                out.push(c as u8);
            }
            '\n' | '\r' | '\t' => out.push(b' '),
            c => out.push(win_ansi(c)),
        }
    }
    out.push(b')');
    out
}

fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * GLYPH_WIDTH
}

/// Cut `text` so it fits `width` points, adding an ellipsis when cut.
fn fit(text: &str, width: f32, size: f32) -> String {
    let text = text.replace(['\n', '\r'], " ");
    if text_width(&text, size) <= width {
        return text;
    }
    let max_chars = ((width / (size * GLYPH_WIDTH)) as usize).saturating_sub(1);
    let mut cut: String = text.chars().take(max_chars).collect();
    cut.push('\u{2026}');
    cut
}

/// Column widths in points, scaled to fill the usable page width.
fn column_widths(table: &Table) -> Vec<f32> {
    let columns = table.headers.len().max(1);
    let chars: Vec<usize> = (0..columns)
        .map(|col| {
            let header = table.headers.get(col).map_or(0, |h| h.chars().count());
            let longest = table
                .rows
                .iter()
                .filter_map(|row| row.get(col))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0);
            header.max(longest).clamp(MIN_COLUMN_CHARS, 40)
        })
        .collect();
    let total: usize = chars.iter().sum();
    let usable = PAGE_WIDTH - 2.0 * MARGIN;
    chars
        .iter()
        .map(|c| usable * *c as f32 / total as f32)
        .collect()
}

fn rows_per_page() -> usize {
    let body = PAGE_HEIGHT - 2.0 * MARGIN - TITLE_SIZE - 10.0 - ROW_HEIGHT - 14.0;
    ((body / ROW_HEIGHT) as usize).max(1)
}

struct PageWriter {
    content: Vec<u8>,
}

impl PageWriter {
    fn new() -> Self {
        Self {
            content: Vec::new(),
        }
    }

    fn text(&mut self, font: &str, size: f32, x: f32, y: f32, text: &str) {
        let _ = write!(self.content, "BT /{} {} Tf {:.2} {:.2} Td ", font, size, x, y);
        self.content.extend_from_slice(&literal(text));
        self.content.extend_from_slice(b" Tj ET\n");
    }

    fn row(&mut self, cells: &[String], widths: &[f32], top: f32, font: &str, shaded: bool) {
        let mut x = MARGIN;
        let bottom = top - ROW_HEIGHT;
        for (col, width) in widths.iter().enumerate() {
            if shaded {
                let _ = writeln!(
                    self.content,
                    "0.88 g {:.2} {:.2} {:.2} {:.2} re f 0 g",
                    x, bottom, width, ROW_HEIGHT
                );
            }
            let _ = writeln!(
                self.content,
                "{:.2} {:.2} {:.2} {:.2} re S",
                x, bottom, width, ROW_HEIGHT
            );
            let cell = cells.get(col).map(String::as_str).unwrap_or("");
            let shown = fit(cell, width - 2.0 * CELL_PADDING, FONT_SIZE);
            self.text(font, FONT_SIZE, x + CELL_PADDING, bottom + 5.0, &shown);
            x += width;
        }
    }
}

/// Collects numbered objects and writes the file with its xref table.
struct Document {
    objects: Vec<Vec<u8>>,
}

impl Document {
    fn new() -> Self {
        Self {
            objects: Vec::new(),
        }
    }

    /// Reserve an object number to fill later.
    fn reserve(&mut self) -> usize {
        self.objects.push(Vec::new());
        self.objects.len()
    }

    fn set(&mut self, id: usize, body: Vec<u8>) {
        self.objects[id - 1] = body;
    }

    fn add(&mut self, body: Vec<u8>) -> usize {
        self.objects.push(body);
        self.objects.len()
    }

    fn stream(&mut self, data: &[u8]) -> usize {
        let mut body = format!("<< /Length {} >>\nstream\n", data.len()).into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(b"\nendstream");
        self.add(body)
    }

    fn finish(self, root: usize) -> Vec<u8> {
        let mut out: Vec<u8> = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
        let mut offsets = Vec::with_capacity(self.objects.len());
        for (i, body) in self.objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
            out.extend_from_slice(body);
            out.extend_from_slice(b"\nendobj\n");
        }
        let xref_at = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n", self.objects.len() + 1).as_bytes());
        out.extend_from_slice(b"0000000000 65535 f \n");
        for offset in offsets {
            out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root {} 0 R >>\nstartxref\n{}\n%%EOF\n",
                self.objects.len() + 1,
                root,
                xref_at
            )
            .as_bytes(),
        );
        out
    }
}

/// Encode a table as a paginated PDF.
pub fn render(table: &Table) -> Vec<u8> {
    let widths = column_widths(table);
    let per_page = rows_per_page();
    let chunks: Vec<&[Vec<String>]> = if table.rows.is_empty() {
        vec![&[]]
    } else {
        table.rows.chunks(per_page).collect()
    };
    let page_count = chunks.len();

    let mut doc = Document::new();
    let catalog = doc.reserve();
    let pages = doc.reserve();
    let regular = doc.add(
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>".to_vec(),
    );
    let bold = doc.add(
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>"
            .to_vec(),
    );

    let mut kids = Vec::with_capacity(page_count);
    for (number, rows) in chunks.iter().enumerate() {
        let mut page = PageWriter::new();
        page.content.extend_from_slice(b"0.5 w\n");

        let mut top = PAGE_HEIGHT - MARGIN;
        page.text("F2", TITLE_SIZE, MARGIN, top - TITLE_SIZE, &table.title);
        top -= TITLE_SIZE + 10.0;

        page.row(&table.headers, &widths, top, "F2", true);
        top -= ROW_HEIGHT;
        for row in rows.iter() {
            page.row(row, &widths, top, "F1", false);
            top -= ROW_HEIGHT;
        }

        let footer = format!("Página {} de {}", number + 1, page_count);
        let footer_x = PAGE_WIDTH - MARGIN - text_width(&footer, FONT_SIZE);
        page.text("F1", FONT_SIZE, footer_x, MARGIN - 14.0, &footer);

        let content = doc.stream(&page.content);
        let page_id = doc.add(
            format!(
                "<< /Type /Page /Parent {} 0 R /MediaBox [0 0 {} {}] /Resources << /Font << /F1 {} 0 R /F2 {} 0 R >> >> /Contents {} 0 R >>",
                pages, PAGE_WIDTH, PAGE_HEIGHT, regular, bold, content
            )
            .into_bytes(),
        );
        kids.push(format!("{} 0 R", page_id));
    }

    doc.set(
        pages,
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            page_count
        )
        .into_bytes(),
    );
    doc.set(
        catalog,
        format!("<< /Type /Catalog /Pages {} 0 R >>", pages).into_bytes(),
    );
    doc.finish(catalog)
}
