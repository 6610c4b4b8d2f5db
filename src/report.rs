//! Single-page PDF report for one MRI classification.
//!
//! The page is drawn with absolute coordinates in PDF points (origin at the
//! bottom-left corner) using the standard Helvetica family, so no font files
//! are embedded. Content that does not fit the descriptive block is drawn
//! anyway; there is no pagination.

use chrono::{Local, NaiveDateTime};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

use crate::error::ReportError;
use crate::tumor_info::TumorInfo;

/// File name offered for the downloaded report.
pub const REPORT_FILE_NAME: &str = "Brain_MRI_Report.pdf";

/// Character budget per line of the descriptive paragraphs.
pub const WRAP_WIDTH: usize = 100;

const NOT_PROVIDED: &str = "Not Provided";

const PAGE_WIDTH: f32 = 595.2756;
const PAGE_HEIGHT: f32 = 841.8898;
const MM: f32 = 72.0 / 25.4;

const BRAND_BLUE: Rgb = Rgb(0x00, 0x59, 0xB3);
const PANEL_BLUE: Rgb = Rgb(0xE7, 0xF0, 0xFA);
const RULE_GREY: Rgb = Rgb(0x99, 0x99, 0x99);
const BLACK: Rgb = Rgb(0x00, 0x00, 0x00);
const WHITE: Rgb = Rgb(0xFF, 0xFF, 0xFF);

const DISCLAIMER: [&str; 3] = [
    "This report is generated only for educational and research purposes.",
    "It must NOT be used for real medical diagnosis, treatment, or clinical decisions.",
    "Always consult a qualified doctor.",
];

/// Optional patient details printed on the report. Blank fields print as
/// `Not Provided`.
#[derive(Debug, Clone, Default)]
pub struct PatientRecord {
    pub name: Option<String>,
    pub age: Option<String>,
    pub gender: Option<String>,
}

impl PatientRecord {
    fn field(value: &Option<String>) -> &str {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(NOT_PROVIDED)
    }

    pub fn name(&self) -> &str {
        Self::field(&self.name)
    }

    pub fn age(&self) -> &str {
        Self::field(&self.age)
    }

    pub fn gender(&self) -> &str {
        Self::field(&self.gender)
    }
}

/// Fixed texts of the page template.
#[derive(Debug, Clone)]
pub struct ReportTemplate {
    pub centre_name: String,
    pub title: String,
    /// Printed under "Report Generated By"; the block is skipped when empty.
    pub credits: Vec<String>,
    pub project_note: Option<String>,
}

impl Default for ReportTemplate {
    fn default() -> Self {
        Self {
            centre_name: "Brain & Spine Scan Centre".to_string(),
            title: "Brain MRI Analysis Report (AI-Assisted)".to_string(),
            credits: Vec::new(),
            project_note: Some(
                "Academic Project: Brain Tumor Detection & Medical AI Chatbot".to_string(),
            ),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReportSynthesizer {
    pub template: ReportTemplate,
}

impl ReportSynthesizer {
    pub fn new(template: ReportTemplate) -> Self {
        Self { template }
    }

    /// Render the report stamped with the current local time.
    pub fn generate(
        &self,
        patient: &PatientRecord,
        label: &str,
        confidence: f64,
    ) -> Result<Vec<u8>, ReportError> {
        self.generate_at(patient, label, confidence, Local::now().naive_local())
    }

    pub fn generate_at(
        &self,
        patient: &PatientRecord,
        label: &str,
        confidence: f64,
        at: NaiveDateTime,
    ) -> Result<Vec<u8>, ReportError> {
        let info = TumorInfo::lookup(label);
        let mut page = Canvas::default();
        let margin = 20.0 * MM;
        let inner_width = PAGE_WIDTH - 2.0 * margin;

        // Header band
        let header_h = 22.0 * MM;
        page.fill_color(BRAND_BLUE);
        page.rect(0.0, PAGE_HEIGHT - header_h, PAGE_WIDTH, header_h);
        page.fill_color(WHITE);
        page.centred_text(Font::Bold, 18.0, PAGE_WIDTH / 2.0, PAGE_HEIGHT - 10.0 * MM, &self.template.centre_name);
        page.centred_text(Font::Regular, 11.0, PAGE_WIDTH / 2.0, PAGE_HEIGHT - 17.0 * MM, &self.template.title);
        page.fill_color(BLACK);

        // Report meta
        let mut y = PAGE_HEIGHT - header_h - 12.0 * MM;
        let stamp = at.format("%d-%m-%Y %H:%M");
        page.text(Font::Regular, 11.0, margin, y, &format!("Report Date & Time : {stamp}"));
        y -= 8.0;
        page.stroke_color(RULE_GREY);
        page.line(margin, y, PAGE_WIDTH - margin, y, 0.5);
        y -= 18.0;

        // Patient block
        let box_h = 42.0 * MM;
        page.fill_color(PANEL_BLUE);
        page.round_rect(margin, y - box_h + 5.0 * MM, inner_width, box_h, 5.0);
        page.fill_color(BRAND_BLUE);
        page.text(Font::Bold, 12.0, margin + 5.0 * MM, y, "Patient Information");
        page.fill_color(BLACK);
        for line in [
            format!("Name   : {}", patient.name()),
            format!("Age    : {}", patient.age()),
            format!("Gender : {}", patient.gender()),
        ] {
            y -= 16.0;
            page.text(Font::Regular, 11.0, margin + 7.0 * MM, y, &line);
        }
        y -= 24.0;

        // Result block
        page.fill_color(BRAND_BLUE);
        page.text(Font::Bold, 12.0, margin, y, "AI Analysis Result");
        page.fill_color(BLACK);
        for line in [
            format!("Predicted Tumor Type : {}", info.display_name),
            format!("Model Confidence     : {confidence:.2}%"),
            format!("Severity Level       : {}", info.severity),
        ] {
            y -= 16.0;
            page.text(Font::Regular, 11.0, margin, y, &line);
        }
        y -= 24.0;

        // Descriptive block
        let about_h = 75.0 * MM;
        page.fill_color(PANEL_BLUE);
        page.round_rect(margin, y - about_h + 5.0 * MM, inner_width, about_h, 5.0);
        page.fill_color(BRAND_BLUE);
        page.text(Font::Bold, 12.0, margin + 5.0 * MM, y, "About The Detected Condition");
        page.fill_color(BLACK);
        y -= 18.0;

        let mut paragraph = wrap_words(&format!("Typical Location: {}", info.location), WRAP_WIDTH);
        paragraph.push(String::new());
        paragraph.extend(wrap_words(info.description, WRAP_WIDTH));
        let leading = 14.0;
        for line in &paragraph {
            if !line.is_empty() {
                page.text(Font::Regular, 10.0, margin + 7.0 * MM, y, line);
            }
            y -= leading;
        }
        y -= 18.0;

        // Credits
        if !self.template.credits.is_empty() {
            page.text(Font::Bold, 11.0, margin, y, "Report Generated By:");
            for credit in &self.template.credits {
                y -= 16.0;
                page.text(Font::Regular, 10.0, margin + 7.0 * MM, y, &format!("• {credit}"));
            }
            y -= 18.0;
        }
        if let Some(note) = &self.template.project_note {
            page.text(Font::Oblique, 9.0, margin + 7.0 * MM, y, note);
        }

        // Footer band
        let footer_h = 28.0 * MM;
        page.fill_color(BRAND_BLUE);
        page.rect(0.0, 0.0, PAGE_WIDTH, footer_h);
        page.fill_color(WHITE);
        page.centred_text(Font::Bold, 9.0, PAGE_WIDTH / 2.0, 18.0 * MM, "Disclaimer");
        for (line, baseline) in DISCLAIMER.iter().zip([13.0, 8.0, 4.0]) {
            page.centred_text(Font::Regular, 8.0, PAGE_WIDTH / 2.0, baseline * MM, line);
        }

        page.into_pdf()
    }
}

/// Greedy word wrap: a word moves to a new line when the current line, its
/// separating space and the word would exceed `max_chars`.
///
/// A single word longer than `max_chars` is kept whole on its own line.
pub fn wrap_words(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if line_len > 0 && line_len + 1 + word_len + 1 > max_chars {
            lines.push(std::mem::take(&mut line));
            line_len = 0;
        }
        if line_len > 0 {
            line.push(' ');
            line_len += 1;
        }
        line.push_str(word);
        line_len += word_len;
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

#[derive(Debug, Clone, Copy)]
struct Rgb(u8, u8, u8);

impl Rgb {
    fn operands(self) -> Vec<Object> {
        [self.0, self.1, self.2]
            .into_iter()
            .map(|c| Object::Real(c as f32 / 255.0))
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
enum Font {
    Regular,
    Bold,
    Oblique,
}

impl Font {
    const ALL: [Font; 3] = [Font::Regular, Font::Bold, Font::Oblique];

    fn resource(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
            Font::Oblique => "F3",
        }
    }

    fn base_font(self) -> &'static str {
        match self {
            Font::Regular => "Helvetica",
            Font::Bold => "Helvetica-Bold",
            Font::Oblique => "Helvetica-Oblique",
        }
    }

    /// Oblique shares the upright metrics.
    fn widths(self) -> &'static [u16; 95] {
        match self {
            Font::Regular | Font::Oblique => &HELVETICA_WIDTHS,
            Font::Bold => &HELVETICA_BOLD_WIDTHS,
        }
    }
}

/// Drawing operations of one page.
#[derive(Default)]
struct Canvas {
    ops: Vec<Operation>,
}

impl Canvas {
    fn op(&mut self, operator: &str, operands: Vec<Object>) {
        self.ops.push(Operation::new(operator, operands));
    }

    fn fill_color(&mut self, color: Rgb) {
        self.op("rg", color.operands());
    }

    fn stroke_color(&mut self, color: Rgb) {
        self.op("RG", color.operands());
    }

    fn rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        self.op("re", reals(&[x, y, w, h]));
        self.op("f", vec![]);
    }

    fn round_rect(&mut self, x: f32, y: f32, w: f32, h: f32, r: f32) {
        // Bezier control distance for a quarter circle
        let k = r * 0.552_284_8;
        let (x1, y1) = (x + w, y + h);
        self.op("m", reals(&[x + r, y]));
        self.op("l", reals(&[x1 - r, y]));
        self.op("c", reals(&[x1 - r + k, y, x1, y + r - k, x1, y + r]));
        self.op("l", reals(&[x1, y1 - r]));
        self.op("c", reals(&[x1, y1 - r + k, x1 - r + k, y1, x1 - r, y1]));
        self.op("l", reals(&[x + r, y1]));
        self.op("c", reals(&[x + r - k, y1, x, y1 - r + k, x, y1 - r]));
        self.op("l", reals(&[x, y + r]));
        self.op("c", reals(&[x, y + r - k, x + r - k, y, x + r, y]));
        self.op("h", vec![]);
        self.op("f", vec![]);
    }

    fn line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, width: f32) {
        self.op("w", reals(&[width]));
        self.op("m", reals(&[x0, y0]));
        self.op("l", reals(&[x1, y1]));
        self.op("S", vec![]);
    }

    fn text(&mut self, font: Font, size: f32, x: f32, y: f32, text: &str) {
        self.op("BT", vec![]);
        self.op("Tf", vec![font.resource().into(), Object::Real(size)]);
        self.op("Td", reals(&[x, y]));
        self.op("Tj", vec![Object::string_literal(encode_win_ansi(text))]);
        self.op("ET", vec![]);
    }

    fn centred_text(&mut self, font: Font, size: f32, centre_x: f32, y: f32, text: &str) {
        let width = text_width(font, text, size);
        self.text(font, size, centre_x - width / 2.0, y, text);
    }

    fn into_pdf(self) -> Result<Vec<u8>, ReportError> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut fonts = lopdf::Dictionary::new();
        for font in Font::ALL {
            let font_id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => font.base_font(),
                "Encoding" => "WinAnsiEncoding",
            });
            fonts.set(font.resource(), font_id);
        }
        let resources_id = doc.add_object(dictionary! {
            "Font" => fonts,
        });

        let content = Content {
            operations: self.ops,
        };
        let encoded = content
            .encode()
            .map_err(|e| ReportError::Encode(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => reals(&[0.0, 0.0, PAGE_WIDTH, PAGE_HEIGHT]),
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer)
            .map_err(|e| ReportError::Write(e.to_string()))?;
        Ok(buffer)
    }
}

fn reals(values: &[f32]) -> Vec<Object> {
    values.iter().map(|v| Object::Real(*v)).collect()
}

/// Encode text for the standard fonts' WinAnsi encoding; unmapped characters become `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| match ch {
            ' '..='~' => ch as u8,
            '\u{A0}'..='\u{FF}' => ch as u32 as u8,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            _ => b'?',
        })
        .collect()
}

/// Helvetica advance widths for ASCII 32..=126, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, // '0'..'?'
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, // 'P'..'_'
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // '`'..'o'
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, // 'p'..'~'
];

fn text_width(font: Font, text: &str, size: f32) -> f32 {
    let widths = font.widths();
    let units: u32 = text
        .chars()
        .map(|ch| match ch {
            ' '..='~' => widths[ch as usize - 32] as u32,
            _ => 556,
        })
        .sum();
    units as f32 * size / 1000.0
}
