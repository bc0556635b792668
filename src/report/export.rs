//! Renderers for the daily series: CSV, spreadsheet and PDF.
//!
//! All three emit the same columns in the same order
//! (date, Present, Absent, Late, Total). CSV is produced lazily, one chunk
//! per row; the workbook and the PDF are built in memory before the first
//! byte is sent since both formats carry trailing index structures.

use actix_web::web::Bytes;
use futures::Stream;
use printpdf::{BuiltinFont, Mm, PdfDocument};
use rust_xlsxwriter::{Format, Workbook};
use std::str::FromStr;
use strum_macros::{Display, EnumString};

use super::series::{DailySeriesRow, SERIES_FIELDS};
use crate::error::ReportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ExportFormat {
    Csv,
    Excel,
    Pdf,
}

impl ExportFormat {
    pub fn parse(raw: &str) -> Result<Self, ReportError> {
        Self::from_str(raw.trim()).map_err(|_| ReportError::ExportFormat(raw.to_string()))
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Excel => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::Pdf => "application/pdf",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Excel => "xlsx",
            ExportFormat::Pdf => "pdf",
        }
    }
}

/// Human-readable titles for the workbook and PDF headers.
const COLUMN_TITLES: [&str; 5] = ["Date", "Present", "Absent", "Late", "Total"];
const COLUMN_WIDTHS: [f64; 5] = [15.0, 10.0, 10.0, 10.0, 10.0];

const SHEET_NAME: &str = "Attendance Report";
const PDF_TITLE: &str = "Attendance Report";

// ---------- CSV ----------

fn csv_record(record: &[String]) -> Result<Bytes, ReportError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::with_capacity(64));
    writer.write_record(record)?;
    let buf = writer
        .into_inner()
        .map_err(|e| ReportError::Render(format!("csv: {}", e.error())))?;
    Ok(Bytes::from(buf))
}

/// Header chunk followed by one chunk per row, each encoded when polled.
pub fn csv_stream(
    series: Vec<DailySeriesRow>,
) -> impl Stream<Item = Result<Bytes, ReportError>> + 'static {
    let header = std::iter::once(SERIES_FIELDS.map(String::from));
    let rows = series.into_iter().map(|row| row.fields());

    futures::stream::iter(header.chain(rows).map(|record| csv_record(&record)))
}

// ---------- Spreadsheet ----------

pub fn render_workbook(series: &[DailySeriesRow]) -> Result<Vec<u8>, ReportError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (col, (title, width)) in COLUMN_TITLES.iter().zip(COLUMN_WIDTHS).enumerate() {
        let col = col as u16;
        worksheet.set_column_width(col, width)?;
        worksheet.write_string_with_format(0, col, *title, &header_format)?;
    }

    for (i, row) in series.iter().enumerate() {
        let r = i as u32 + 1;
        worksheet.write_string(r, 0, row.iso_date())?;
        worksheet.write_number(r, 1, row.present as f64)?;
        worksheet.write_number(r, 2, row.absent as f64)?;
        worksheet.write_number(r, 3, row.late as f64)?;
        worksheet.write_number(r, 4, row.total as f64)?;
    }

    Ok(workbook.save_to_buffer()?)
}

// ---------- PDF ----------

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
const LINE_HEIGHT_MM: f32 = 6.0;
const TITLE_SIZE: f32 = 18.0;
const BODY_SIZE: f32 = 12.0;

fn fixed_width_line<S: AsRef<str>>(fields: &[S]) -> String {
    let mut line = format!("{:<12}", fields[0].as_ref());
    for field in &fields[1..] {
        line.push_str(&format!("{:>9}", field.as_ref()));
    }
    line
}

/// Header line plus one fixed-width line per row, exactly as printed.
pub fn pdf_lines(series: &[DailySeriesRow]) -> (String, Vec<String>) {
    let header = fixed_width_line(&COLUMN_TITLES);
    let rows = series.iter().map(|row| fixed_width_line(&row.fields())).collect();
    (header, rows)
}

/// Courier glyphs are 0.6 em wide; 1pt = 0.3528mm.
fn courier_width_mm(text: &str, size_pt: f32) -> f32 {
    text.chars().count() as f32 * 0.6 * size_pt * 0.3528
}

pub fn render_pdf(series: &[DailySeriesRow]) -> Result<Vec<u8>, ReportError> {
    let (doc, page, layer) = PdfDocument::new(
        PDF_TITLE,
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Layer 1",
    );
    let title_font = doc.add_builtin_font(BuiltinFont::CourierBold)?;
    let body_font = doc.add_builtin_font(BuiltinFont::Courier)?;

    let (header, rows) = pdf_lines(series);
    let mut layer = doc.get_page(page).get_layer(layer);
    let mut y = PAGE_HEIGHT_MM - MARGIN_MM;

    let title_x = (PAGE_WIDTH_MM - courier_width_mm(PDF_TITLE, TITLE_SIZE)) / 2.0;
    layer.use_text(PDF_TITLE, TITLE_SIZE, Mm(title_x), Mm(y), &title_font);
    y -= 2.0 * LINE_HEIGHT_MM;
    layer.use_text(header.as_str(), BODY_SIZE, Mm(MARGIN_MM), Mm(y), &body_font);

    for line in rows {
        y -= LINE_HEIGHT_MM;
        if y < MARGIN_MM {
            let (next_page, next_layer) =
                doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
            layer = doc.get_page(next_page).get_layer(next_layer);
            y = PAGE_HEIGHT_MM - MARGIN_MM;
            layer.use_text(header.as_str(), BODY_SIZE, Mm(MARGIN_MM), Mm(y), &body_font);
            y -= LINE_HEIGHT_MM;
        }
        layer.use_text(line, BODY_SIZE, Mm(MARGIN_MM), Mm(y), &body_font);
    }

    Ok(doc.save_to_bytes()?)
}
