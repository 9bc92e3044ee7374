use crate::services::export::{Align, FontStyle, Page, PageGeometry, TextLayout};
use anyhow::{anyhow, Result};
use std::io::Write;

const PT_PER_MM: f32 = 72.0 / 25.4;

// Helvetica advance widths (1/1000 em) for ASCII 32..=126.
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0..9
    278, 278, 584, 584, 584, 556, 1015, // :..@
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // A..M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N..Z
    278, 278, 278, 469, 556, 333, // [..`
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // a..m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // n..z
    334, 260, 334, 584, // {..~
];

const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

const FALLBACK_WIDTH: u16 = 556;

fn glyph_width(c: char, bold: bool) -> u16 {
    let table = if bold { &HELVETICA_BOLD } else { &HELVETICA };
    match c as u32 {
        code @ 32..=126 => table[(code - 32) as usize],
        0x2022 => 350,
        _ => FALLBACK_WIDTH,
    }
}

/// Rendered width of `text` in millimetres.
pub fn text_width(text: &str, font: FontStyle) -> f32 {
    let units: u32 = text.chars().map(|c| glyph_width(c, font.bold) as u32).sum();
    units as f32 / 1000.0 * font.size / PT_PER_MM
}

/// Greedy word wrap against the Helvetica metrics of the base-14 fonts.
pub struct HelveticaLayout;

impl HelveticaLayout {
    fn wrap_paragraph(paragraph: &str, max_width: f32, font: FontStyle) -> Vec<String> {
        let mut lines = Vec::new();
        let mut current = String::new();

        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current, word)
            };
            if text_width(&candidate, font) <= max_width {
                current = candidate;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }

            // Hard-break words that do not fit on a line of their own.
            for ch in word.chars() {
                current.push(ch);
                if current.chars().count() > 1 && text_width(&current, font) > max_width {
                    if let Some(last) = current.pop() {
                        lines.push(std::mem::take(&mut current));
                        current.push(last);
                    }
                }
            }
        }

        if !current.is_empty() || lines.is_empty() {
            lines.push(current);
        }
        lines
    }
}

impl TextLayout for HelveticaLayout {
    fn split_text_to_size(&self, text: &str, max_width: f32, font: FontStyle) -> Result<Vec<String>> {
        if !(max_width > 0.0) || !(font.size > 0.0) {
            return Err(anyhow!(
                "Cannot wrap text to width {} at size {}",
                max_width,
                font.size
            ));
        }

        Ok(text
            .split('\n')
            .flat_map(|p| Self::wrap_paragraph(p.trim_end_matches('\r'), max_width, font))
            .collect())
    }
}

/// Maps text onto WinAnsiEncoding, substituting `?` for anything it lacks.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{a0}'..='\u{ff}' => c as u32 as u8,
            '€' => 0x80,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            _ => b'?',
        })
        .collect()
}

fn escape_pdf_string(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + 2);
    out.push(b'(');
    for &b in bytes {
        if matches!(b, b'(' | b')' | b'\\') {
            out.push(b'\\');
        }
        out.push(b);
    }
    out.push(b')');
    out
}

fn content_stream(page: &Page, geometry: &PageGeometry) -> Result<Vec<u8>> {
    let mut stream = Vec::new();
    for block in &page.blocks {
        let font = if block.font.bold { "F2" } else { "F1" };
        let x = match block.align {
            Align::Left => block.x,
            Align::Center => block.x - text_width(&block.text, block.font) / 2.0,
        };
        let x_pt = x * PT_PER_MM;
        let y_pt = (geometry.page_height - block.y) * PT_PER_MM;

        write!(stream, "BT /{} {:.2} Tf {:.2} {:.2} Td ", font, block.font.size, x_pt, y_pt)?;
        stream.extend(escape_pdf_string(&encode_win_ansi(&block.text)));
        stream.extend_from_slice(b" Tj ET\n");
    }
    Ok(stream)
}

struct PdfWriter {
    buf: Vec<u8>,
    offsets: Vec<usize>,
}

impl PdfWriter {
    fn new() -> Self {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n");
        Self {
            buf,
            offsets: Vec::new(),
        }
    }

    fn object(&mut self, body: &[u8]) -> Result<()> {
        self.offsets.push(self.buf.len());
        write!(self.buf, "{} 0 obj\n", self.offsets.len())?;
        self.buf.extend_from_slice(body);
        self.buf.extend_from_slice(b"\nendobj\n");
        Ok(())
    }

    fn finish(mut self, root: usize) -> Result<Vec<u8>> {
        let xref = self.buf.len();
        write!(self.buf, "xref\n0 {}\n0000000000 65535 f \n", self.offsets.len() + 1)?;
        for offset in &self.offsets {
            write!(self.buf, "{:010} 00000 n \n", offset)?;
        }
        write!(
            self.buf,
            "trailer\n<< /Size {} /Root {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            self.offsets.len() + 1,
            root,
            xref
        )?;
        Ok(self.buf)
    }
}

/// Serializes pages into a PDF 1.4 document using Helvetica and Helvetica-Bold.
///
/// Objects: 1 catalog, 2 page tree, 3-4 fonts, then a page and its content
/// stream for every page.
pub fn write_pdf(pages: &[Page], geometry: &PageGeometry) -> Result<Vec<u8>> {
    if pages.is_empty() {
        return Err(anyhow!("Nothing to write: no pages"));
    }

    let page_id = |i: usize| 5 + 2 * i;
    let kids: Vec<String> = (0..pages.len()).map(|i| format!("{} 0 R", page_id(i))).collect();

    let mut writer = PdfWriter::new();
    writer.object(b"<< /Type /Catalog /Pages 2 0 R >>")?;
    writer.object(
        format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), pages.len()).as_bytes(),
    )?;
    for base in ["Helvetica", "Helvetica-Bold"] {
        writer.object(
            format!(
                "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                base
            )
            .as_bytes(),
        )?;
    }

    let width = geometry.page_width * PT_PER_MM;
    let height = geometry.page_height * PT_PER_MM;
    for (i, page) in pages.iter().enumerate() {
        writer.object(
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>",
                width,
                height,
                page_id(i) + 1
            )
            .as_bytes(),
        )?;

        let stream = content_stream(page, geometry)?;
        let mut body = format!("<< /Length {} >>\nstream\n", stream.len()).into_bytes();
        body.extend(stream);
        body.extend_from_slice(b"\nendstream");
        writer.object(&body)?;
    }

    writer.finish(1)
}
