use std::io::{self, Write};

use encoding_rs::WINDOWS_1252;
use pagepress_logging::press_debug;
use printpdf::{
    BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
};
use url::Url;

use crate::layout::{layout_document, Block, BlockKind, PageLayout};

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 18.0;
const PT_TO_MM: f32 = 0.352_778;
const LINE_SPACING: f32 = 1.35;
const LAYER_NAME: &str = "Layer 1";

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("pdf generation failed: {0}")]
    Pdf(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Turns HTML into PDF bytes written to `out`.
///
/// `base_uri` is the page's own address; relative resources resolve against it.
pub trait Renderer: Send + Sync {
    fn render(&self, html: &str, base_uri: &str, out: &mut dyn Write) -> Result<(), RenderError>;
}

/// Text-only renderer on A4 pages with the PDF built-in fonts.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrintPdfRenderer;

impl Renderer for PrintPdfRenderer {
    fn render(&self, html: &str, base_uri: &str, out: &mut dyn Write) -> Result<(), RenderError> {
        let base_url = Url::parse(base_uri).ok();
        let layout = layout_document(html, base_url.as_ref());
        press_debug!(
            "Laid out {} blocks for {} (title {:?})",
            layout.blocks.len(),
            base_uri,
            layout.title
        );
        let bytes = typeset(&layout, base_uri)?;
        out.write_all(&bytes)?;
        Ok(())
    }
}

fn typeset(layout: &PageLayout, base_uri: &str) -> Result<Vec<u8>, RenderError> {
    let title = to_pdf_text(layout.title.as_deref().unwrap_or(base_uri));
    let (doc, page, layer) = PdfDocument::new(
        title.as_str(),
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        LAYER_NAME,
    );
    let fonts = Fonts::load(&doc)?;
    let layer = doc.get_page(page).get_layer(layer);
    let mut setter = Typesetter {
        doc: &doc,
        layer,
        cursor_mm: PAGE_HEIGHT_MM - MARGIN_MM,
    };

    setter.write_block(&fonts, &Style::source(), &to_pdf_text(base_uri));
    for block in &layout.blocks {
        let style = Style::for_block(block);
        match block.kind {
            BlockKind::Rule => setter.write_block(&fonts, &style, &"-".repeat(60)),
            BlockKind::ListItem => {
                let item = format!("- {}", to_pdf_text(&block.text));
                setter.write_block(&fonts, &style, &item)
            }
            _ => setter.write_block(&fonts, &style, &to_pdf_text(&block.text)),
        }
    }

    doc.save_to_bytes()
        .map_err(|err| RenderError::Pdf(err.to_string()))
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
    mono: IndirectFontRef,
}

impl Fonts {
    fn load(doc: &PdfDocumentReference) -> Result<Self, RenderError> {
        let load = |font: BuiltinFont| {
            doc.add_builtin_font(font)
                .map_err(|err| RenderError::Pdf(err.to_string()))
        };
        Ok(Self {
            regular: load(BuiltinFont::Helvetica)?,
            bold: load(BuiltinFont::HelveticaBold)?,
            italic: load(BuiltinFont::HelveticaOblique)?,
            mono: load(BuiltinFont::Courier)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Face {
    Regular,
    Bold,
    Italic,
    Mono,
}

#[derive(Debug, Clone, Copy)]
struct Style {
    face: Face,
    size_pt: f32,
    indent_mm: f32,
    space_before_mm: f32,
}

impl Style {
    fn source() -> Self {
        Self {
            face: Face::Italic,
            size_pt: 8.0,
            indent_mm: 0.0,
            space_before_mm: 0.0,
        }
    }

    fn for_block(block: &Block) -> Self {
        let (face, size_pt, indent_mm, space_before_mm) = match block.kind {
            BlockKind::Heading(1) => (Face::Bold, 20.0, 0.0, 6.0),
            BlockKind::Heading(2) => (Face::Bold, 16.0, 0.0, 5.0),
            BlockKind::Heading(3) => (Face::Bold, 14.0, 0.0, 4.0),
            BlockKind::Heading(_) => (Face::Bold, 12.0, 0.0, 3.0),
            BlockKind::Paragraph => (Face::Regular, 11.0, 0.0, 2.5),
            BlockKind::ListItem => (Face::Regular, 11.0, 5.0, 1.0),
            BlockKind::Quote => (Face::Italic, 11.0, 8.0, 2.5),
            BlockKind::Preformatted => (Face::Mono, 9.0, 3.0, 2.5),
            BlockKind::Image => (Face::Italic, 9.0, 0.0, 2.0),
            BlockKind::Rule => (Face::Regular, 8.0, 0.0, 3.0),
        };
        Self {
            face,
            size_pt,
            indent_mm,
            space_before_mm,
        }
    }

    fn line_height_mm(&self) -> f32 {
        self.size_pt * LINE_SPACING * PT_TO_MM
    }

    /// Conservative glyph budget per line for the built-in fonts.
    fn chars_per_line(&self) -> usize {
        let avg_width_pt = match self.face {
            Face::Mono => self.size_pt * 0.6,
            Face::Bold => self.size_pt * 0.56,
            Face::Regular | Face::Italic => self.size_pt * 0.5,
        };
        let usable_mm = PAGE_WIDTH_MM - 2.0 * MARGIN_MM - self.indent_mm;
        ((usable_mm / PT_TO_MM) / avg_width_pt).floor().max(10.0) as usize
    }
}

struct Typesetter<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    cursor_mm: f32,
}

impl Typesetter<'_> {
    fn write_block(&mut self, fonts: &Fonts, style: &Style, text: &str) {
        let font = match style.face {
            Face::Regular => &fonts.regular,
            Face::Bold => &fonts.bold,
            Face::Italic => &fonts.italic,
            Face::Mono => &fonts.mono,
        };
        self.cursor_mm -= style.space_before_mm;
        let line_height = style.line_height_mm();
        for line in wrap_text(text, style.chars_per_line(), style.face == Face::Mono) {
            if self.cursor_mm - line_height < MARGIN_MM {
                self.new_page();
            }
            self.cursor_mm -= line_height;
            self.layer.use_text(
                line,
                style.size_pt,
                Mm(MARGIN_MM + style.indent_mm),
                Mm(self.cursor_mm),
                font,
            );
        }
    }

    fn new_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), LAYER_NAME);
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.cursor_mm = PAGE_HEIGHT_MM - MARGIN_MM;
    }
}

/// Greedy word wrap. Preformatted text keeps its own line breaks and spacing.
fn wrap_text(text: &str, width: usize, preformatted: bool) -> Vec<String> {
    let mut lines = Vec::new();
    for source_line in text.lines() {
        if preformatted {
            lines.extend(split_long(source_line, width));
            continue;
        }
        let mut current = String::new();
        for word in source_line.split_whitespace() {
            let needed = if current.is_empty() {
                word.chars().count()
            } else {
                current.chars().count() + 1 + word.chars().count()
            };
            if needed <= width {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(word);
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let mut pieces = split_long(word, width);
            if let Some(last) = pieces.pop() {
                lines.extend(pieces);
                current = last;
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    lines
}

fn split_long(text: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars
        .chunks(width.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// The built-in fonts are WinAnsi encoded; anything windows-1252 cannot
/// represent is folded to a close ASCII form or `?`.
fn to_pdf_text(text: &str) -> String {
    let mut buf = [0u8; 4];
    text.chars()
        .map(|c| match c {
            '\n' => "\n".to_string(),
            '\t' => "    ".to_string(),
            c if c.is_control() => "?".to_string(),
            c if encodes_as_win_ansi(c.encode_utf8(&mut buf)) => c.to_string(),
            '\u{2032}' => "'".to_string(),
            '\u{2033}' => "\"".to_string(),
            '\u{2212}' | '\u{2010}' | '\u{2011}' => "-".to_string(),
            '\u{2009}' | '\u{200A}' | '\u{202F}' | '\u{2002}' | '\u{2003}' => " ".to_string(),
            _ => "?".to_string(),
        })
        .collect()
}

fn encodes_as_win_ansi(c: &str) -> bool {
    let (_, _, unmappable) = WINDOWS_1252.encode(c);
    !unmappable
}
