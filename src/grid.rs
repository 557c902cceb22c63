//! Grid model – declarative page descriptors for the fixed-layout forms, and
//! the layout pass that freezes them into positioned cell boxes.
//!
//! A page is described as rows of cells on a fixed-width unit grid (the
//! certificate uses 28 units per row). The frozen [`SheetLayout`] is the
//! intermediate representation handed to the PDF serializer: everything in
//! millimetres, origin at the page's top-left corner.

use serde::{Deserialize, Serialize};

/// Letter paper, in millimetres.
pub const LETTER_WIDTH_MM: f32 = 215.9;
pub const LETTER_HEIGHT_MM: f32 = 279.4;

const MM_PER_PT: f32 = 0.352_778;

/// Approximate glyph advance for the builtin Helvetica faces, as a fraction
/// of the font size. Enough accuracy to wrap 5 pt labels into their cells.
const AVG_ADVANCE_REGULAR: f32 = 0.50;
const AVG_ADVANCE_BOLD: f32 = 0.54;

/// Vertical space one text line occupies.
fn line_height_mm(size_pt: f32) -> f32 {
    size_pt * MM_PER_PT * 1.2
}

/// Estimated rendered width of a single line.
pub(crate) fn text_width_mm(text: &str, size_pt: f32, bold: bool) -> f32 {
    let advance = if bold {
        AVG_ADVANCE_BOLD
    } else {
        AVG_ADVANCE_REGULAR
    };
    text.chars().count() as f32 * size_pt * advance * MM_PER_PT
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Where a cell draws its border. `Left` cells draw a single vertical rule;
/// `Full` cells draw the whole rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BorderKind {
    #[default]
    None,
    Left,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CellStyle {
    pub border: BorderKind,
    pub border_color: Option<Rgb>,
    pub background: Option<Rgb>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// Text styling within a cell. Offsets are millimetres from the cell edges;
/// each run positions itself independently, so a label at `top: 1.0` and a
/// value at `top: 4.0` stack the way the form expects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextProps {
    /// Font size in points.
    pub size: f32,
    pub align: Align,
    pub bold: bool,
    /// `None` renders black.
    pub color: Option<Rgb>,
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
    /// Extra vertical spacing between wrapped lines.
    pub line_gap: f32,
}

impl Default for TextProps {
    fn default() -> Self {
        Self {
            size: 10.0,
            align: Align::Left,
            bold: false,
            color: None,
            top: 0.0,
            bottom: 0.0,
            left: 0.0,
            right: 0.0,
            line_gap: 0.0,
        }
    }
}

impl TextProps {
    pub fn sized(size: f32) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn color(mut self, color: Rgb) -> Self {
        self.color = Some(color);
        self
    }

    pub fn top(mut self, mm: f32) -> Self {
        self.top = mm;
        self
    }

    pub fn bottom(mut self, mm: f32) -> Self {
        self.bottom = mm;
        self
    }

    pub fn left(mut self, mm: f32) -> Self {
        self.left = mm;
        self
    }

    pub fn right(mut self, mm: f32) -> Self {
        self.right = mm;
        self
    }

    pub fn line_gap(mut self, mm: f32) -> Self {
        self.line_gap = mm;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    pub props: TextProps,
}

/// Reference to an image asset by file name, resolved against the configured
/// assets directory when the PDF is serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    pub name: String,
    /// Offsets within the cell, millimetres.
    pub top: f32,
    pub left: f32,
    /// Fraction of the cell box the image may fill (0–100).
    pub percent: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Width in grid units. A zero-span cell has no width of its own and is
    /// used purely to draw a trailing border at the running x position.
    pub span: u8,
    pub style: CellStyle,
    pub texts: Vec<TextRun>,
    pub image: Option<ImageRef>,
}

impl Cell {
    pub fn new(span: u8) -> Self {
        Self {
            span,
            style: CellStyle::default(),
            texts: Vec::new(),
            image: None,
        }
    }

    /// Cell containing a single text run.
    pub fn text(span: u8, text: impl Into<String>, props: TextProps) -> Self {
        Self::new(span).with_text(text, props)
    }

    pub fn styled(mut self, style: CellStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>, props: TextProps) -> Self {
        self.texts.push(TextRun {
            text: text.into(),
            props,
        });
        self
    }

    pub fn with_image(mut self, image: ImageRef) -> Self {
        self.image = Some(image);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageSpec {
    pub rows: Vec<Row>,
}

impl PageSpec {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }
}

/// Page geometry shared by every page of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetConfig {
    /// Document title embedded in the PDF metadata.
    pub title: String,
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    /// Units per row; every row's spans must sum to at most this.
    pub grid_units: u8,
}

impl SheetConfig {
    /// Letter page with 10 mm side margins.
    pub fn letter(grid_units: u8) -> Self {
        Self {
            title: String::new(),
            page_width_mm: LETTER_WIDTH_MM,
            page_height_mm: LETTER_HEIGHT_MM,
            margin_top: 10.0,
            margin_bottom: 10.0,
            margin_left: 10.0,
            margin_right: 10.0,
            grid_units,
        }
    }

    pub fn content_width(&self) -> f32 {
        self.page_width_mm - self.margin_left - self.margin_right
    }

    pub fn unit_width(&self) -> f32 {
        self.content_width() / f32::from(self.grid_units)
    }
}

/// A document ready to freeze: shared geometry plus one [`PageSpec`] per page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSpec {
    pub sheet: SheetConfig,
    pub pages: Vec<PageSpec>,
}

// ── Frozen layout ─────────────────────────────────────────────────────────

/// A complete document layout ready for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetLayout {
    pub title: String,
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    pub pages: Vec<PageLayout>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub page_index: usize,
    pub cells: Vec<CellBox>,
}

/// A positioned cell: geometry in millimetres from the page top-left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub style: CellStyle,
    pub texts: Vec<PlacedText>,
    pub image: Option<PlacedImage>,
}

/// One wrapped line of text with its final position resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedText {
    pub text: String,
    /// Top-left of the line box, millimetres from the page top-left.
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub bold: bool,
    pub color: Option<Rgb>,
}

/// Bounding box an image asset may fill; the serializer aspect-fits the
/// decoded pixels inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedImage {
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Freeze a document into positioned cell boxes.
///
/// Rows stack top to bottom starting at the top margin; a row's height is the
/// largest extent any of its text runs needs. Images never drive row height —
/// they fit whatever box their cell ends up with.
pub fn layout(doc: &DocumentSpec) -> SheetLayout {
    let sheet = &doc.sheet;
    let unit = sheet.unit_width();

    let mut pages = Vec::with_capacity(doc.pages.len());
    for (page_index, page) in doc.pages.iter().enumerate() {
        let mut cells = Vec::new();
        let mut cursor_y = sheet.margin_top;

        for row in &page.rows {
            debug_assert!(
                row.cells.iter().map(|c| u32::from(c.span)).sum::<u32>()
                    <= u32::from(sheet.grid_units),
                "row spans exceed the grid width"
            );

            let row_height = row_extent(row, unit);
            let mut cursor_x = sheet.margin_left;

            for cell in &row.cells {
                let width = f32::from(cell.span) * unit;
                cells.push(place_cell(cell, cursor_x, cursor_y, width, row_height));
                cursor_x += width;
            }

            cursor_y += row_height;
        }

        pages.push(PageLayout { page_index, cells });
    }

    SheetLayout {
        title: sheet.title.clone(),
        page_width_mm: sheet.page_width_mm,
        page_height_mm: sheet.page_height_mm,
        pages,
    }
}

/// Minimum height for rows whose cells carry no text at all.
const MIN_ROW_HEIGHT_MM: f32 = 4.0;

fn row_extent(row: &Row, unit: f32) -> f32 {
    let mut extent = MIN_ROW_HEIGHT_MM;
    for cell in &row.cells {
        let inner_width = (f32::from(cell.span) * unit).max(unit);
        for run in &cell.texts {
            let p = &run.props;
            let wrap_width = (inner_width - p.left - p.right).max(1.0);
            let lines = wrap_text(&run.text, wrap_width, p.size, p.bold);
            let line_count = lines.len().max(1) as f32;
            let text_height =
                line_count * line_height_mm(p.size) + (line_count - 1.0) * p.line_gap;
            extent = extent.max(p.top + text_height + p.bottom);
        }
    }
    extent
}

fn place_cell(cell: &Cell, x: f32, y: f32, width: f32, height: f32) -> CellBox {
    let mut texts = Vec::new();
    for run in &cell.texts {
        let p = &run.props;
        let wrap_width = (width - p.left - p.right).max(1.0);
        let lines = wrap_text(&run.text, wrap_width, p.size, p.bold);
        for (i, line) in lines.into_iter().enumerate() {
            let line_x = match p.align {
                Align::Left => x + p.left,
                Align::Center => {
                    x + p.left + (wrap_width - text_width_mm(&line, p.size, p.bold)) / 2.0
                }
                Align::Right => x + width - p.right - text_width_mm(&line, p.size, p.bold),
            };
            let line_y = y + p.top + i as f32 * (line_height_mm(p.size) + p.line_gap);
            texts.push(PlacedText {
                text: line,
                x: line_x,
                y: line_y,
                size: p.size,
                bold: p.bold,
                color: p.color,
            });
        }
    }

    let image = cell.image.as_ref().map(|img| {
        let scale = img.percent / 100.0;
        PlacedImage {
            name: img.name.clone(),
            x: x + img.left,
            y: y + img.top,
            width: (width * scale).max(0.0),
            height: (height * scale).max(0.0),
        }
    });

    CellBox {
        x,
        y,
        width,
        height,
        style: cell.style,
        texts,
        image,
    }
}

/// Greedy word wrap against the estimated Helvetica advance. Text that fits
/// is passed through untouched (interior spacing and all); words longer than
/// the line are emitted on their own line rather than split.
fn wrap_text(text: &str, width_mm: f32, size_pt: f32, bold: bool) -> Vec<String> {
    if text.is_empty() || text_width_mm(text, size_pt, bold) <= width_mm {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if text_width_mm(&candidate, size_pt, bold) <= width_mm || current.is_empty() {
            current = candidate;
        } else {
            lines.push(current);
            current = word.to_string();
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_page(rows: Vec<Row>) -> DocumentSpec {
        DocumentSpec {
            sheet: SheetConfig::letter(28),
            pages: vec![PageSpec::new(rows)],
        }
    }

    #[test]
    fn unit_width_divides_content_width() {
        let sheet = SheetConfig::letter(28);
        let expected = (LETTER_WIDTH_MM - 20.0) / 28.0;
        assert!((sheet.unit_width() - expected).abs() < 1e-4);
    }

    #[test]
    fn cells_advance_left_to_right() {
        let doc = one_page(vec![Row::new(vec![
            Cell::text(14, "left", TextProps::sized(5.0)),
            Cell::text(14, "right", TextProps::sized(5.0)),
        ])]);
        let layout = layout(&doc);
        let cells = &layout.pages[0].cells;
        assert_eq!(cells.len(), 2);
        assert!((cells[0].x - 10.0).abs() < 1e-4);
        assert!((cells[1].x - (10.0 + 14.0 * doc.sheet.unit_width())).abs() < 1e-3);
        assert!((cells[0].width - cells[1].width).abs() < 1e-4);
    }

    #[test]
    fn zero_span_cell_sits_at_the_row_edge() {
        let doc = one_page(vec![Row::new(vec![
            Cell::text(28, "body", TextProps::sized(5.0)),
            Cell::new(0),
        ])]);
        let layout = layout(&doc);
        let trailing = &layout.pages[0].cells[1];
        assert_eq!(trailing.width, 0.0);
        let sheet = SheetConfig::letter(28);
        assert!((trailing.x - (sheet.margin_left + sheet.content_width())).abs() < 1e-3);
    }

    #[test]
    fn rows_stack_downward() {
        let props = TextProps::sized(5.0).top(1.0).bottom(1.0);
        let doc = one_page(vec![
            Row::new(vec![Cell::text(28, "first", props)]),
            Row::new(vec![Cell::text(28, "second", props)]),
        ]);
        let layout = layout(&doc);
        let cells = &layout.pages[0].cells;
        assert!(cells[1].y > cells[0].y);
        assert!((cells[1].y - (cells[0].y + cells[0].height)).abs() < 1e-4);
    }

    #[test]
    fn row_height_follows_the_tallest_run() {
        let shallow = TextProps::sized(5.0).top(1.0);
        let deep = TextProps::sized(5.0).top(4.0).bottom(1.5);
        let doc = one_page(vec![Row::new(vec![Cell::new(14)
            .with_text("label", shallow)
            .with_text("value", deep)])]);
        let layout = layout(&doc);
        let cell = &layout.pages[0].cells[0];
        let expected = 4.0 + 5.0 * MM_PER_PT * 1.2 + 1.5;
        assert!((cell.height - expected).abs() < 1e-3);
    }

    #[test]
    fn long_text_wraps_to_the_cell_width() {
        let text = "una frase suficientemente larga para exigir varias lineas \
                    dentro de una celda angosta del formulario";
        let doc = one_page(vec![Row::new(vec![Cell::text(
            6,
            text,
            TextProps::sized(8.0),
        )])]);
        let layout = layout(&doc);
        let cell = &layout.pages[0].cells[0];
        assert!(cell.texts.len() > 1, "expected wrapping, got one line");
        for line in &cell.texts {
            assert!(text_width_mm(&line.text, 8.0, false) <= cell.width + 1.0);
        }
    }

    #[test]
    fn right_aligned_text_ends_at_the_cell_edge() {
        let doc = one_page(vec![Row::new(vec![Cell::text(
            7,
            "1.234.567",
            TextProps::sized(5.0).align(Align::Right).right(1.0),
        )])]);
        let layout = layout(&doc);
        let cell = &layout.pages[0].cells[0];
        let line = &cell.texts[0];
        let end = line.x + text_width_mm(&line.text, 5.0, false);
        assert!((end - (cell.x + cell.width - 1.0)).abs() < 1e-3);
    }

    #[test]
    fn empty_text_still_reserves_its_line() {
        let props = TextProps::sized(5.0).top(0.9).bottom(1.0);
        let doc = one_page(vec![Row::new(vec![Cell::text(6, "", props)])]);
        let layout = layout(&doc);
        let cell = &layout.pages[0].cells[0];
        let expected = 0.9 + 5.0 * MM_PER_PT * 1.2 + 1.0;
        assert!((cell.height - expected).abs() < 1e-3);
    }

    #[test]
    fn image_box_scales_with_percent() {
        let doc = one_page(vec![Row::new(vec![
            Cell::new(6)
                .with_image(ImageRef {
                    name: "logo.png".to_string(),
                    top: 1.0,
                    left: 1.0,
                    percent: 95.0,
                })
                .styled(CellStyle::default()),
            Cell::text(22, "heading", TextProps::sized(8.0).top(2.0).bottom(4.0)),
        ])]);
        let layout = layout(&doc);
        let image = layout.pages[0].cells[0].image.as_ref().unwrap();
        assert_eq!(image.name, "logo.png");
        assert!((image.width - layout.pages[0].cells[0].width * 0.95).abs() < 1e-3);
    }

    #[test]
    fn one_page_spec_one_page_layout() {
        let row = Row::new(vec![Cell::text(28, "x", TextProps::sized(5.0))]);
        let doc = DocumentSpec {
            sheet: SheetConfig::letter(28),
            pages: vec![
                PageSpec::new(vec![row.clone()]),
                PageSpec::new(vec![row.clone()]),
                PageSpec::new(vec![row]),
            ],
        };
        let layout = layout(&doc);
        assert_eq!(layout.pages.len(), 3);
        assert_eq!(layout.pages[2].page_index, 2);
    }
}
