//! PDF serializer – takes a frozen [`SheetLayout`] and produces PDF bytes
//! using `printpdf` (v0.8 ops-based API).
//!
//! The form renders with the builtin Helvetica faces (WinAnsi encoded, which
//! covers the Spanish accents the certificate needs), so no fonts are
//! embedded. Image assets are read from disk once per document and reused as
//! XObjects across pages.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use printpdf::*;

use crate::grid::{self, BorderKind, CellBox, PlacedText, SheetLayout};

const PT_PER_MM: f32 = 2.834_646;

/// Border rule thickness on the certificate.
const BORDER_THICKNESS_PT: f32 = 0.5;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to read form asset {path:?}: {source}")]
    AssetRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode form asset {path:?}: {message}")]
    AssetDecode { path: PathBuf, message: String },
}

/// A printpdf XObject together with the pixel dimensions of the source image.
struct ImageResource {
    xobj_id: XObjectId,
    px_width: u32,
    px_height: u32,
}

/// Render a frozen layout into PDF bytes.
///
/// Image names are resolved against `assets_dir`; a missing or undecodable
/// asset aborts the document, it is not skipped.
pub fn render_pdf(layout: &SheetLayout, assets_dir: &Path) -> Result<Vec<u8>, RenderError> {
    let page_w = Mm(layout.page_width_mm);
    let page_h = Mm(layout.page_height_mm);

    let mut doc = PdfDocument::new(&layout.title);

    // ── Pre-register all image assets ─────────────────────────────────────
    let mut names: Vec<&str> = Vec::new();
    for page in &layout.pages {
        for cell in &page.cells {
            if let Some(img) = &cell.image {
                if !names.contains(&img.name.as_str()) {
                    names.push(&img.name);
                }
            }
        }
    }

    let mut image_resources: HashMap<String, ImageResource> = HashMap::new();
    let mut img_warnings: Vec<PdfWarnMsg> = Vec::new();

    for name in names {
        let path = assets_dir.join(name);
        let bytes = std::fs::read(&path).map_err(|source| RenderError::AssetRead {
            path: path.clone(),
            source,
        })?;

        // Decode with the `image` crate to obtain pixel dimensions.
        let dyn_img = ::image::load_from_memory(&bytes).map_err(|e| RenderError::AssetDecode {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let (px_width, px_height) = (dyn_img.width(), dyn_img.height());

        // Register with printpdf as a reusable XObject.
        let raw = RawImage::decode_from_bytes(&bytes, &mut img_warnings).map_err(|e| {
            RenderError::AssetDecode {
                path: path.clone(),
                message: e.to_string(),
            }
        })?;
        let xobj_id = doc.add_image(&raw);

        image_resources.insert(
            name.to_string(),
            ImageResource {
                xobj_id,
                px_width,
                px_height,
            },
        );
    }

    // ── Render pages ──────────────────────────────────────────────────────
    let page_height_pt = layout.page_height_mm * PT_PER_MM;
    let mut pages = Vec::new();

    for page in &layout.pages {
        let mut ops = Vec::new();

        // Backgrounds first so borders and text stay visible on shaded rows.
        for cell in &page.cells {
            render_background(&mut ops, cell, page_height_pt);
        }
        for cell in &page.cells {
            render_cell(&mut ops, cell, page_height_pt, &image_resources);
        }

        pages.push(PdfPage::new(page_w, page_h, ops));
    }

    // Ensure at least one page.
    if pages.is_empty() {
        pages.push(PdfPage::new(page_w, page_h, Vec::new()));
    }

    doc.with_pages(pages);
    let bytes = doc.save(&PdfSaveOptions::default(), &mut Vec::new());

    Ok(bytes)
}

fn pdf_color(c: grid::Rgb) -> Color {
    Color::Rgb(Rgb {
        r: f32::from(c.r) / 255.0,
        g: f32::from(c.g) / 255.0,
        b: f32::from(c.b) / 255.0,
        icc_profile: None,
    })
}

fn point(x_pt: f32, y_pt: f32) -> LinePoint {
    LinePoint {
        p: Point {
            x: Pt(x_pt),
            y: Pt(y_pt),
        },
        bezier: false,
    }
}

fn render_background(ops: &mut Vec<Op>, cell: &CellBox, page_height_pt: f32) {
    let Some(bg) = cell.style.background else {
        return;
    };
    if cell.width <= 0.0 {
        return;
    }

    // PDF coordinate system: origin at bottom-left. The layout uses origin at
    // top-left. Convert:
    let x1 = cell.x * PT_PER_MM;
    let x2 = (cell.x + cell.width) * PT_PER_MM;
    let y2 = page_height_pt - cell.y * PT_PER_MM;
    let y1 = y2 - cell.height * PT_PER_MM;

    ops.push(Op::SetFillColor { col: pdf_color(bg) });
    ops.push(Op::DrawPolygon {
        polygon: Polygon {
            rings: vec![PolygonRing {
                points: vec![point(x1, y1), point(x2, y1), point(x2, y2), point(x1, y2)],
            }],
            mode: PaintMode::Fill,
            winding_order: WindingOrder::NonZero,
        },
    });
}

fn render_cell(
    ops: &mut Vec<Op>,
    cell: &CellBox,
    page_height_pt: f32,
    images: &HashMap<String, ImageResource>,
) {
    let x1 = cell.x * PT_PER_MM;
    let x2 = (cell.x + cell.width) * PT_PER_MM;
    let y2 = page_height_pt - cell.y * PT_PER_MM;
    let y1 = y2 - cell.height * PT_PER_MM;

    // Border
    if cell.style.border != BorderKind::None {
        let color = cell.style.border_color.unwrap_or(grid::Rgb::new(0, 0, 0));
        ops.push(Op::SetOutlineColor {
            col: pdf_color(color),
        });
        ops.push(Op::SetOutlineThickness {
            pt: Pt(BORDER_THICKNESS_PT),
        });

        match cell.style.border {
            BorderKind::Full => {
                ops.push(Op::DrawLine {
                    line: Line {
                        points: vec![
                            point(x1, y2),
                            point(x2, y2),
                            point(x2, y1),
                            point(x1, y1),
                        ],
                        is_closed: true,
                    },
                });
            }
            BorderKind::Left => {
                ops.push(Op::DrawLine {
                    line: Line {
                        points: vec![point(x1, y2), point(x1, y1)],
                        is_closed: false,
                    },
                });
            }
            BorderKind::None => {}
        }
    }

    // Text
    for line in &cell.texts {
        render_text(ops, line, page_height_pt);
    }

    // Image – embed from pre-registered XObject
    if let Some(img) = &cell.image {
        if let Some(res) = images.get(&img.name) {
            let box_w_pt = img.width * PT_PER_MM;
            let box_h_pt = img.height * PT_PER_MM;

            // Aspect-fit the decoded pixels inside the placed box.
            let (draw_w, draw_h) = if res.px_width > 0 && res.px_height > 0 {
                let aspect = res.px_width as f32 / res.px_height as f32;
                if box_w_pt / box_h_pt > aspect {
                    (box_h_pt * aspect, box_h_pt)
                } else {
                    (box_w_pt, box_w_pt / aspect)
                }
            } else {
                (box_w_pt, box_h_pt)
            };

            // translate_y = bottom edge of the image in PDF coordinates.
            let img_bottom_y = page_height_pt - img.y * PT_PER_MM - draw_h;

            // At dpi=72 printpdf renders 1 px = 1 pt, so
            // scale = desired_pt / px_dim.
            let scale_x = if res.px_width > 0 {
                draw_w / res.px_width as f32
            } else {
                1.0
            };
            let scale_y = if res.px_height > 0 {
                draw_h / res.px_height as f32
            } else {
                1.0
            };

            ops.push(Op::UseXobject {
                id: res.xobj_id.clone(),
                transform: XObjectTransform {
                    translate_x: Some(Pt(img.x * PT_PER_MM)),
                    translate_y: Some(Pt(img_bottom_y)),
                    dpi: Some(72.0),
                    scale_x: Some(scale_x),
                    scale_y: Some(scale_y),
                    rotate: None,
                },
            });
        }
    }
}

fn render_text(ops: &mut Vec<Op>, line: &PlacedText, page_height_pt: f32) {
    if line.text.is_empty() {
        return;
    }

    let font = if line.bold {
        BuiltinFont::HelveticaBold
    } else {
        BuiltinFont::Helvetica
    };

    let text_x = line.x * PT_PER_MM;
    // Baseline ≈ top of line + ascender (approx 0.75 × font_size)
    let ascender_offset = line.size * 0.75;
    let text_y = page_height_pt - line.y * PT_PER_MM - ascender_offset;

    let color = line.color.unwrap_or(grid::Rgb::new(0, 0, 0));

    ops.push(Op::StartTextSection);
    ops.push(Op::SetTextCursor {
        pos: Point {
            x: Pt(text_x),
            y: Pt(text_y),
        },
    });
    ops.push(Op::SetFontSizeBuiltinFont {
        size: Pt(line.size),
        font,
    });
    ops.push(Op::SetFillColor {
        col: pdf_color(color),
    });
    ops.push(Op::WriteTextBuiltinFont {
        items: vec![TextItem::Text(to_winlatin(&line.text))],
        font,
    });
    ops.push(Op::EndTextSection);
}

/// Convert a UTF-8 string to raw Windows-1252 bytes then wrap in a String so
/// printpdf writes the bytes unchanged into the PDF stream (builtin fonts use
/// WinAnsiEncoding, so each glyph is one byte 0x00–0xFF). The certificate's
/// Spanish text (á, é, í, ñ, …) all lives below 0x100.
fn to_winlatin(s: &str) -> String {
    let bytes: Vec<u8> = s
        .chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80, // euro
            '\u{2018}' => 0x91, // left single quote
            '\u{2019}' => 0x92, // right single quote
            '\u{201C}' => 0x93, // left double quote
            '\u{201D}' => 0x94, // right double quote
            '\u{2013}' => 0x96, // en-dash
            '\u{00A0}' => 0x20, // non-breaking space -> space
            c if (c as u32) < 256 => c as u8,
            _ => b'?',
        })
        .collect();
    // SAFETY: intentionally non-UTF-8 for the 0x80-0x9F range; printpdf passes
    // these bytes straight to the PDF stream, decoded by WinAnsiEncoding.
    #[allow(unsafe_code)]
    unsafe {
        String::from_utf8_unchecked(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{
        Cell, CellStyle, DocumentSpec, ImageRef, PageSpec, Row, SheetConfig, TextProps,
    };

    fn empty_layout() -> SheetLayout {
        grid::layout(&DocumentSpec {
            sheet: SheetConfig::letter(28),
            pages: vec![PageSpec::default()],
        })
    }

    #[test]
    fn render_empty_page() {
        let bytes = render_pdf(&empty_layout(), Path::new(".")).unwrap();
        assert!(bytes.len() > 100, "PDF should have content");
        // PDF magic number
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn render_text_and_borders() {
        let doc = DocumentSpec {
            sheet: SheetConfig::letter(28),
            pages: vec![PageSpec::new(vec![Row::new(vec![Cell::text(
                28,
                "Año gravable 2022",
                TextProps::sized(8.0).top(2.0),
            )
            .styled(CellStyle {
                border: BorderKind::Full,
                border_color: Some(grid::Rgb::new(65, 95, 126)),
                background: Some(grid::Rgb::new(242, 245, 248)),
            })])])],
        };
        let bytes = render_pdf(&grid::layout(&doc), Path::new(".")).unwrap();
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn missing_asset_is_an_error() {
        let doc = DocumentSpec {
            sheet: SheetConfig::letter(28),
            pages: vec![PageSpec::new(vec![Row::new(vec![Cell::new(6).with_image(
                ImageRef {
                    name: "does-not-exist.png".to_string(),
                    top: 1.0,
                    left: 1.0,
                    percent: 95.0,
                },
            )])])],
        };
        let err = render_pdf(&grid::layout(&doc), Path::new("/nonexistent")).unwrap_err();
        assert!(matches!(err, RenderError::AssetRead { .. }));
    }

    #[test]
    fn winlatin_keeps_spanish_accents_one_byte_each() {
        let converted = to_winlatin("retención año");
        assert_eq!(converted.len(), "retención año".chars().count());
    }
}
