//! Multi-page PDF output.
//!
//! [`PdfDocument`] owns the object graph. Pages are opened one at a time with
//! [`PdfDocument::begin_page`]; the returned [`PdfPage`] is a [`Surface`] and
//! writes its content stream when finished. Images are embedded the first
//! time their key is drawn and referenced from then on, so a flag that
//! appears on forty cards is stored once.
//!
//! | Object | Encoding |
//! |---|---|
//! | Content streams | Flate |
//! | Images | RGB, Flate, 8-bit soft mask when any pixel is translucent |
//! | Built-in font | base-14 `Helvetica-Bold`, WinAnsi |
//! | Embedded font | `/TrueType` with `FontFile2`, or `/Type1` with CFF OpenType in `FontFile3`; WinAnsi |

use super::{RenderError, Rotation, Surface};
use crate::assets::ImageAsset;
use crate::geometry::{Point, Rect};
use crate::text::metrics::{self, FIRST_CHAR, LAST_CHAR};
use crate::text::{FontFace, OutlineKind};
use pdf_writer::types::FontFlags;
use pdf_writer::{Content, Filter, Name, Pdf, Rect as PdfRect, Ref, Str};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

const FONT_RESOURCE: &[u8] = b"F1";
const COMPRESSION_LEVEL: u8 = 6;
/// Bézier handle length for a quarter circle.
const KAPPA: f32 = 0.552_284_8;

fn deflate(data: &[u8]) -> Vec<u8> {
    miniz_oxide::deflate::compress_to_vec_zlib(data, COMPRESSION_LEVEL)
}

/// Simple-font subtype for an embedded program. PDF files CFF outlines
/// under Type 1.
fn font_subtype(kind: OutlineKind) -> Name<'static> {
    match kind {
        OutlineKind::TrueType => Name(b"TrueType"),
        OutlineKind::OpenType => Name(b"Type1"),
    }
}

/// An embedded image and the resource name pages refer to it by.
#[derive(Debug, Clone)]
struct XObject {
    name: String,
    id: Ref,
}

pub struct PdfDocument {
    pdf: Pdf,
    next_id: i32,
    catalog_id: Ref,
    pages_id: Ref,
    font_id: Ref,
    page_ids: Vec<Ref>,
    images: HashMap<String, XObject>,
    width: f32,
    height: f32,
}

impl PdfDocument {
    /// Start a document whose pages measure `width × height` points.
    pub fn new(width: f32, height: f32, font: &FontFace) -> Self {
        let mut doc = Self {
            pdf: Pdf::new(),
            next_id: 1,
            catalog_id: Ref::new(1),
            pages_id: Ref::new(1),
            font_id: Ref::new(1),
            page_ids: Vec::new(),
            images: HashMap::new(),
            width,
            height,
        };
        doc.catalog_id = doc.alloc();
        doc.pages_id = doc.alloc();
        doc.font_id = doc.write_font(font);
        doc
    }

    fn alloc(&mut self) -> Ref {
        let id = Ref::new(self.next_id);
        self.next_id += 1;
        id
    }

    fn write_font(&mut self, font: &FontFace) -> Ref {
        let font_id = self.alloc();
        let Some(program) = font.program() else {
            self.pdf
                .type1_font(font_id)
                .base_font(Name(font.name().as_bytes()))
                .encoding_predefined(Name(b"WinAnsiEncoding"));
            return font_id;
        };

        let descriptor_id = self.alloc();
        let file_id = self.alloc();

        let compressed = deflate(&program.data);
        let mut stream = self.pdf.stream(file_id, &compressed);
        stream.filter(Filter::FlateDecode);
        match program.kind {
            OutlineKind::TrueType => {
                stream.pair(Name(b"Length1"), program.data.len() as i32);
            }
            OutlineKind::OpenType => {
                stream.pair(Name(b"Subtype"), Name(b"OpenType"));
            }
        }
        drop(stream);

        let m = program.metrics;
        let mut descriptor = self.pdf.font_descriptor(descriptor_id);
        descriptor
            .name(Name(font.name().as_bytes()))
            .flags(FontFlags::NON_SYMBOLIC)
            .bbox(PdfRect::new(0.0, m.descent, 1000.0, m.ascent))
            .italic_angle(0.0)
            .ascent(m.ascent)
            .descent(m.descent)
            .cap_height(m.cap_height)
            .stem_v(80.0);
        match program.kind {
            OutlineKind::TrueType => descriptor.font_file2(file_id),
            OutlineKind::OpenType => descriptor.font_file3(file_id),
        };
        drop(descriptor);

        let mut dict = self.pdf.indirect(font_id).dict();
        dict.pair(Name(b"Type"), Name(b"Font"));
        dict.pair(Name(b"Subtype"), font_subtype(program.kind));
        dict.pair(Name(b"BaseFont"), Name(font.name().as_bytes()));
        dict.pair(Name(b"FirstChar"), FIRST_CHAR as i32);
        dict.pair(Name(b"LastChar"), LAST_CHAR as i32);
        dict.insert(Name(b"Widths"))
            .array()
            .items(font.widths().iter().copied());
        dict.pair(Name(b"FontDescriptor"), descriptor_id);
        dict.pair(Name(b"Encoding"), Name(b"WinAnsiEncoding"));
        drop(dict);

        font_id
    }

    /// Embed `asset` unless an image with the same key is already present.
    fn embed_image(&mut self, asset: &ImageAsset) -> XObject {
        if let Some(existing) = self.images.get(&asset.key) {
            return existing.clone();
        }
        let (w, h) = (asset.width() as i32, asset.height() as i32);
        let pixels = &asset.pixels;

        let smask_id = if pixels.pixels().any(|p| p.0[3] < 255) {
            let alpha: Vec<u8> = pixels.pixels().map(|p| p.0[3]).collect();
            let id = self.alloc();
            let compressed = deflate(&alpha);
            let mut mask = self.pdf.image_xobject(id, &compressed);
            mask.filter(Filter::FlateDecode);
            mask.width(w);
            mask.height(h);
            mask.color_space().device_gray();
            mask.bits_per_component(8);
            Some(id)
        } else {
            None
        };

        let rgb: Vec<u8> = pixels
            .pixels()
            .flat_map(|p| [p.0[0], p.0[1], p.0[2]])
            .collect();
        let id = self.alloc();
        let compressed = deflate(&rgb);
        let mut xobj = self.pdf.image_xobject(id, &compressed);
        xobj.filter(Filter::FlateDecode);
        xobj.width(w);
        xobj.height(h);
        xobj.color_space().device_rgb();
        xobj.bits_per_component(8);
        if let Some(mask_id) = smask_id {
            xobj.s_mask(mask_id);
        }
        drop(xobj);

        let entry = XObject {
            name: format!("Im{}", self.images.len() + 1),
            id,
        };
        self.images.insert(asset.key.clone(), entry.clone());
        entry
    }

    pub fn begin_page(&mut self) -> PdfPage<'_> {
        PdfPage {
            doc: self,
            content: Content::new(),
            used: BTreeMap::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Distinct images embedded so far.
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Write the page tree and return the file bytes.
    pub fn finish(mut self) -> Vec<u8> {
        self.pdf.catalog(self.catalog_id).pages(self.pages_id);
        self.pdf
            .pages(self.pages_id)
            .kids(self.page_ids.iter().copied())
            .count(self.page_ids.len() as i32);
        self.pdf.finish()
    }

    pub fn save(self, path: &Path) -> Result<(), RenderError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.finish())?;
        Ok(())
    }
}

/// One page being drawn.
pub struct PdfPage<'a> {
    doc: &'a mut PdfDocument,
    content: Content,
    /// Images referenced from this page, by resource name.
    used: BTreeMap<String, Ref>,
}

impl PdfPage<'_> {
    /// Write the content stream and page object.
    pub fn finish(self) {
        let PdfPage { doc, content, used } = self;
        let page_id = doc.alloc();
        let content_id = doc.alloc();

        let compressed = deflate(content.finish().as_slice());
        doc.pdf
            .stream(content_id, &compressed)
            .filter(Filter::FlateDecode);

        let mut page = doc.pdf.page(page_id);
        page.media_box(PdfRect::new(0.0, 0.0, doc.width, doc.height))
            .parent(doc.pages_id)
            .contents(content_id);
        let mut resources = page.resources();
        resources.fonts().pair(Name(FONT_RESOURCE), doc.font_id);
        if !used.is_empty() {
            let mut xobjects = resources.x_objects();
            for (name, id) in &used {
                xobjects.pair(Name(name.as_bytes()), *id);
            }
        }
        drop(resources);
        drop(page);

        doc.page_ids.push(page_id);
    }
}

impl Surface for PdfPage<'_> {
    fn draw_image(&mut self, asset: &Arc<ImageAsset>, rect: Rect, rotation: Rotation) {
        let xobj = self.doc.embed_image(asset);
        let matrix = match rotation {
            Rotation::None => [rect.width, 0.0, 0.0, rect.height, rect.x, rect.y],
            // The image's bottom edge runs up the rect's right side.
            Rotation::QuarterTurn => [0.0, rect.height, -rect.width, 0.0, rect.right(), rect.y],
        };
        self.content.save_state();
        self.content.transform(matrix);
        self.content.x_object(Name(xobj.name.as_bytes()));
        self.content.restore_state();
        self.used.insert(xobj.name, xobj.id);
    }

    fn draw_text(&mut self, text: &str, size: f32, origin: Point) {
        let bytes = metrics::encode(text);
        self.content
            .begin_text()
            .set_font(Name(FONT_RESOURCE), size)
            .set_text_matrix([1.0, 0.0, 0.0, 1.0, origin.x, origin.y])
            .show(Str(&bytes))
            .end_text();
    }

    fn stroke_round_rect(&mut self, rect: Rect, radius: f32, width: f32) {
        let r = radius.clamp(0.0, rect.width.min(rect.height) / 2.0);
        let k = r * KAPPA;
        let (x0, y0, x1, y1) = (rect.x, rect.y, rect.right(), rect.top());
        let c = &mut self.content;
        c.set_line_width(width);
        c.move_to(x0 + r, y0);
        c.line_to(x1 - r, y0);
        c.cubic_to(x1 - r + k, y0, x1, y0 + r - k, x1, y0 + r);
        c.line_to(x1, y1 - r);
        c.cubic_to(x1, y1 - r + k, x1 - r + k, y1, x1 - r, y1);
        c.line_to(x0 + r, y1);
        c.cubic_to(x0 + r - k, y1, x0, y1 - r + k, x0, y1 - r);
        c.line_to(x0, y0 + r);
        c.cubic_to(x0, y0 + r - k, x0 + r - k, y0, x0 + r, y0);
        c.close_path();
        c.stroke();
    }

    fn stroke_line(&mut self, from: Point, to: Point, width: f32) {
        self.content
            .set_line_width(width)
            .move_to(from.x, from.y)
            .line_to(to.x, to.y)
            .stroke();
    }
}
