//! Plain text laid out as a monospaced multi-page A4 PDF.

use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use crate::error::RenderError;

/// A4 in PDF points.
const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 50;
const FONT_SIZE: i64 = 10;
const LEADING: i64 = 12;
const TAB_WIDTH: usize = 4;

/// Printable columns per line. Courier advance width is 0.6 em.
pub const COLUMNS: usize = ((PAGE_WIDTH - 2 * MARGIN) * 10 / (FONT_SIZE * 6)) as usize;
/// Lines per page.
pub const LINES_PER_PAGE: usize = ((PAGE_HEIGHT - 2 * MARGIN) / LEADING) as usize;

/// Renders `text` into PDF bytes. `title` goes into the document info.
pub fn text_to_pdf(title: &str, text: &str) -> Result<Vec<u8>, RenderError> {
    let mut lines = wrap_text(text, COLUMNS);
    if lines.is_empty() {
        lines.push(String::new());
    }
    let pages: Vec<&[String]> = lines.chunks(LINES_PER_PAGE).collect();

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let kids: Vec<Object> = pages
        .iter()
        .map(|page_lines| {
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, page_content(page_lines)));
            let page_id: ObjectId = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
                "Resources" => resources_id,
                "Contents" => content_id,
            });
            page_id.into()
        })
        .collect();

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::String(encode_win_ansi(title), lopdf::StringFormat::Literal),
        "Producer" => Object::string_literal("printbot"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| RenderError::Pdf(e.to_string()))?;

    Ok(buffer)
}

fn page_content(lines: &[String]) -> Vec<u8> {
    let mut content = Vec::new();
    content.extend_from_slice(b"BT\n");
    content.extend_from_slice(format!("/F1 {} Tf\n", FONT_SIZE).as_bytes());
    content.extend_from_slice(format!("{} TL\n", LEADING).as_bytes());
    content
        .extend_from_slice(format!("{} {} Td\n", MARGIN, PAGE_HEIGHT - MARGIN - FONT_SIZE).as_bytes());

    for line in lines {
        content.push(b'(');
        content.extend(escape_pdf_bytes(&encode_win_ansi(line)));
        content.extend_from_slice(b") Tj T*\n");
    }

    content.extend_from_slice(b"ET\n");
    content
}

/// Splits text into lines no wider than `columns`, expanding tabs.
/// Long lines break at the last space that fits, or hard at the column limit.
pub fn wrap_text(text: &str, columns: usize) -> Vec<String> {
    let columns = columns.max(1);
    let mut out = Vec::new();

    for raw in text.lines() {
        let line: Vec<char> = expand_tabs(raw.trim_end()).chars().collect();
        if line.is_empty() {
            out.push(String::new());
            continue;
        }

        let mut start = 0;
        while start < line.len() {
            let remaining = line.len() - start;
            if remaining <= columns {
                out.push(line[start..].iter().collect());
                break;
            }

            let window = &line[start..start + columns + 1];
            let cut = match window.iter().rposition(|c| *c == ' ') {
                Some(pos) if pos > 0 => pos,
                _ => columns,
            };
            let piece: String = line[start..start + cut].iter().collect();
            out.push(piece.trim_end().to_string());

            start += cut;
            while start < line.len() && line[start] == ' ' {
                start += 1;
            }
        }
    }

    out
}

fn expand_tabs(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    for c in line.chars() {
        if c == '\t' {
            let pad = TAB_WIDTH - (out.chars().count() % TAB_WIDTH);
            out.extend(std::iter::repeat(' ').take(pad));
        } else {
            out.push(c);
        }
    }
    out
}

/// Maps text to single-byte WinAnsi codes. Unmappable characters become `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{a0}'..='\u{ff}' => c as u32 as u8,
            '€' => 0x80,
            '‚' => 0x82,
            '„' => 0x84,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '™' => 0x99,
            c if c.is_control() => b' ',
            _ => b'?',
        })
        .collect()
}

fn escape_pdf_bytes(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            b'(' | b')' | b'\\' => {
                out.push(b'\\');
                out.push(b);
            }
            0x20..=0x7e => out.push(b),
            _ => out.extend_from_slice(format!("\\{:03o}", b).as_bytes()),
        }
    }
    out
}
