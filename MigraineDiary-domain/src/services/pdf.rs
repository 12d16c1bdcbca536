//! PDF rendering for diary reports
//!
//! A4 pages with built-in Helvetica: a header and summary block followed by
//! the entry table, continued on further pages as space runs out.

use std::ops::Range;

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};

use crate::entities::entry::PainEntry;
use crate::entities::report::ReportData;
use crate::entities::share::SharedDiary;
use crate::entities::statistics::EntryStatistics;
use crate::services::error::ServiceError;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 15.0;
const ROW_HEIGHT: f32 = 6.0;

/// Baseline of the first line on a page
const TOP: f32 = PAGE_HEIGHT - MARGIN - 5.0;
/// Content stays above the page footer
const CONTENT_BOTTOM: f32 = MARGIN + 8.0;

/// Table rows that fit below a table header drawn at `y`
pub fn rows_below(y: f32) -> usize {
    if y < CONTENT_BOTTOM + ROW_HEIGHT {
        return 0;
    }
    ((y - CONTENT_BOTTOM) / ROW_HEIGHT).floor() as usize
}

/// Split `rows` table rows into page ranges
///
/// The first page holds at most `first_page_rows`, every other page
/// `page_rows`. An empty table still yields one (empty) page so the summary
/// is printed.
pub fn paginate(rows: usize, first_page_rows: usize, page_rows: usize) -> Vec<Range<usize>> {
    let page_rows = page_rows.max(1);
    let first = first_page_rows.min(rows);
    let mut pages = vec![0..first];

    let mut start = first;
    while start < rows {
        let end = (start + page_rows).min(rows);
        pages.push(start..end);
        start = end;
    }
    pages
}

/// Builtin fonts only cover Latin-1; anything else is replaced
fn pdf_text(text: &str) -> String {
    text.chars()
        .map(|c| if (c as u32) < 0x100 && !c.is_control() { c } else { '?' })
        .collect()
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut short: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        short.push_str("...");
        short
    }
}

fn format_avg(value: Option<f64>) -> String {
    value.map(|v| format!("{:.1}", v)).unwrap_or_else(|| "n/a".to_string())
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

struct Writer<'a> {
    doc: &'a PdfDocumentReference,
    fonts: &'a Fonts,
    pages: Vec<PdfLayerReference>,
    y: f32,
    lowest_y: f32,
}

impl<'a> Writer<'a> {
    fn layer(&self) -> Option<&PdfLayerReference> {
        self.pages.last()
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        self.pages.push(self.doc.get_page(page).get_layer(layer));
        self.y = TOP;
    }

    fn advance(&mut self, mm: f32) {
        self.lowest_y = self.lowest_y.min(self.y);
        self.y -= mm;
    }

    /// Text lines that would run into the footer continue on a new page
    fn line(&mut self, text: &str, size: f32, bold: bool) {
        if self.y < CONTENT_BOTTOM {
            self.new_page();
        }
        let font = if bold { &self.fonts.bold } else { &self.fonts.regular };
        if let Some(layer) = self.layer() {
            layer.use_text(pdf_text(text), size, Mm(MARGIN), Mm(self.y), font);
        }
        self.advance(size * 0.5 + 2.0);
    }

    fn cells(&mut self, cells: &[(f32, String)], bold: bool) {
        let font = if bold { &self.fonts.bold } else { &self.fonts.regular };
        if let Some(layer) = self.layer() {
            for (x, text) in cells {
                layer.use_text(pdf_text(text), 9.0, Mm(*x), Mm(self.y), font);
            }
        }
        self.advance(ROW_HEIGHT);
    }

    fn gap(&mut self, mm: f32) {
        self.y -= mm;
    }
}

fn pdf_error(err: printpdf::Error) -> ServiceError {
    ServiceError::Internal(format!("PDF rendering failed: {}", err))
}

fn summary(writer: &mut Writer<'_>, stats: &EntryStatistics) {
    writer.line("Summary", 12.0, true);
    writer.line(&format!("Entries: {}    Pain days: {}", stats.entry_count, stats.pain_days), 10.0, false);
    writer.line(
        &format!(
            "Average pain: {}    Maximum pain: {}",
            format_avg(stats.avg_pain),
            stats.max_pain.map(|m| m.to_string()).unwrap_or_else(|| "n/a".to_string())
        ),
        10.0,
        false,
    );
    writer.line(&format!("Days with medication: {}", stats.medication_days), 10.0, false);

    let triggers: Vec<String> = stats
        .top_triggers
        .iter()
        .map(|item| format!("{} ({})", item.name, item.count))
        .collect();
    if !triggers.is_empty() {
        writer.line(&truncate(&format!("Top triggers: {}", triggers.join(", ")), 95), 10.0, false);
    }
    let medications: Vec<String> = stats
        .top_medications
        .iter()
        .map(|item| format!("{} ({})", item.name, item.count))
        .collect();
    if !medications.is_empty() {
        writer.line(&truncate(&format!("Top medications: {}", medications.join(", ")), 95), 10.0, false);
    }
    if stats.me_cfs.sample_size > 0 {
        writer.line(
            &format!(
                "ME/CFS severity: average {} over {} days",
                format_avg(stats.me_cfs.avg_severity),
                stats.me_cfs.days_recorded
            ),
            10.0,
            false,
        );
    }
}

fn table_header(writer: &mut Writer<'_>, include_notes: bool) {
    let mut cells = vec![
        (MARGIN, "Date".to_string()),
        (50.0, "Pain".to_string()),
        (63.0, "Location".to_string()),
        (100.0, "Medications".to_string()),
    ];
    if include_notes {
        cells.push((145.0, "Notes".to_string()));
    }
    writer.cells(&cells, true);
}

fn table_row(writer: &mut Writer<'_>, entry: &PainEntry, include_notes: bool) {
    let mut cells = vec![
        (MARGIN, entry.timestamp.format("%Y-%m-%d %H:%M").to_string()),
        (50.0, entry.pain_level.to_string()),
        (63.0, truncate(entry.pain_location.as_deref().unwrap_or("-"), 20)),
        (100.0, truncate(&entry.medications.join(", "), 24)),
    ];
    if include_notes {
        cells.push((145.0, truncate(entry.notes.as_deref().unwrap_or(""), 30)));
    }
    writer.cells(&cells, false);
}

struct Document {
    doc: PdfDocumentReference,
    fonts: Fonts,
    first_layer: PdfLayerReference,
}

fn new_document(title: &str) -> Result<Document, ServiceError> {
    let (doc, page, layer) = PdfDocument::new(pdf_text(title), Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let fonts = Fonts {
        regular: doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?,
        bold: doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_error)?,
    };
    let first_layer = doc.get_page(page).get_layer(layer);
    Ok(Document { doc, fonts, first_layer })
}

/// Pages and lowest content baseline of a laid out document
struct Layout {
    doc: PdfDocumentReference,
    pages: usize,
    lowest_y: f32,
}

/// Header, optional extra lines, summary, then the paginated entry table
fn layout(
    title: &str,
    subtitle: &str,
    extra: &[String],
    stats: &EntryStatistics,
    entries: &[PainEntry],
    include_notes: bool,
) -> Result<Layout, ServiceError> {
    let document = new_document(title)?;
    let mut writer = Writer {
        doc: &document.doc,
        fonts: &document.fonts,
        pages: vec![document.first_layer.clone()],
        y: TOP,
        lowest_y: TOP,
    };

    writer.line(title, 18.0, true);
    writer.line(subtitle, 10.0, false);
    writer.gap(3.0);
    for line in extra {
        writer.line(line, 10.0, false);
    }
    summary(&mut writer, stats);
    writer.gap(4.0);

    let mut first_page_rows = rows_below(writer.y);
    if first_page_rows == 0 && !entries.is_empty() {
        writer.new_page();
        first_page_rows = rows_below(writer.y);
    }
    let page_rows = rows_below(TOP);

    for (index, range) in paginate(entries.len(), first_page_rows, page_rows).into_iter().enumerate() {
        if index > 0 {
            writer.new_page();
        }
        table_header(&mut writer, include_notes);
        for entry in &entries[range] {
            table_row(&mut writer, entry, include_notes);
        }
    }

    let total = writer.pages.len();
    for (index, layer) in writer.pages.iter().enumerate() {
        layer.use_text(
            format!("Page {} of {}", index + 1, total),
            8.0,
            Mm(MARGIN),
            Mm(MARGIN),
            &document.fonts.regular,
        );
    }

    let lowest_y = writer.lowest_y;
    Ok(Layout {
        doc: document.doc,
        pages: total,
        lowest_y,
    })
}

fn render(
    title: &str,
    subtitle: &str,
    extra: &[String],
    stats: &EntryStatistics,
    entries: &[PainEntry],
    include_notes: bool,
) -> Result<Vec<u8>, ServiceError> {
    let layout = layout(title, subtitle, extra, stats, entries, include_notes)?;
    layout.doc.save_to_bytes().map_err(pdf_error)
}

/// Render a user's report
pub fn render_report(data: &ReportData) -> Result<Vec<u8>, ServiceError> {
    let subtitle = format!(
        "{} to {} - generated {}",
        data.statistics.from.format("%Y-%m-%d"),
        data.statistics.to.format("%Y-%m-%d"),
        data.generated_at.format("%Y-%m-%d %H:%M UTC")
    );

    let mut extra = Vec::new();
    if let Some(hit6) = &data.latest_hit6 {
        extra.push(format!(
            "Latest HIT-6: {} ({}) on {}",
            hit6.assessment.score,
            hit6.category.label(),
            hit6.assessment.completed_at.format("%Y-%m-%d")
        ));
    }
    for limit in &data.limits {
        extra.push(format!(
            "Limit {}: {} of {} per {} ({})",
            limit.medication_name,
            limit.used,
            limit.limit,
            limit.period,
            limit.status.as_str()
        ));
    }

    render(&data.title, &subtitle, &extra, &data.statistics, &data.entries, data.include_notes)
}

/// Render the physician view of a share
pub fn render_shared(diary: &SharedDiary) -> Result<Vec<u8>, ServiceError> {
    let subtitle = format!(
        "{} to {} - shared access valid until {}",
        diary.from_date.format("%Y-%m-%d"),
        diary.to_date.format("%Y-%m-%d"),
        diary.expires_at.format("%Y-%m-%d %H:%M UTC")
    );
    render(
        "Headache diary",
        &subtitle,
        &[],
        &diary.statistics,
        &diary.entries,
        diary.include_notes,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::statistics::compute;
    use chrono::{DateTime, Duration, Utc};

    #[test]
    fn test_paginate_empty_table_has_one_page() {
        assert_eq!(paginate(0, 18, 40), vec![0..0]);
    }

    #[test]
    fn test_paginate_boundaries() {
        assert_eq!(paginate(18, 18, 40), vec![0..18]);
        assert_eq!(paginate(19, 18, 40), vec![0..18, 18..19]);
        assert_eq!(paginate(58, 18, 40), vec![0..18, 18..58]);
        assert_eq!(paginate(59, 18, 40), vec![0..18, 18..58, 58..59]);
        assert_eq!(paginate(5, 18, 40), vec![0..5]);
    }

    #[test]
    fn test_rows_below_respects_footer() {
        assert_eq!(rows_below(TOP), 42);
        assert_eq!(rows_below(CONTENT_BOTTOM + ROW_HEIGHT), 1);
        assert_eq!(rows_below(CONTENT_BOTTOM + 5.0), 0);
        assert_eq!(rows_below(0.0), 0);
    }

    #[test]
    fn test_paginate_zero_page_rows_still_terminates() {
        assert_eq!(paginate(3, 1, 0), vec![0..1, 1..2, 2..3]);
    }

    #[test]
    fn test_text_helpers() {
        assert_eq!(pdf_text("Kopfschmerz ✓"), "Kopfschmerz ?");
        assert_eq!(truncate("abcdefghij", 6), "abc...");
        assert_eq!(truncate("abc", 6), "abc");
    }

    fn sample_entries(count: i64, now: DateTime<Utc>) -> Vec<PainEntry> {
        (0..count)
            .map(|i| PainEntry {
                id: uuid::Uuid::new_v4(),
                user_id: "user-1".to_string(),
                timestamp: now - Duration::hours(i),
                pain_level: (i % 10) as u8,
                pain_location: Some("forehead".to_string()),
                aura_type: None,
                triggers: vec!["sleep".to_string()],
                medications: vec!["Ibuprofen".to_string()],
                me_cfs_severity: None,
                notes: Some("note".to_string()),
                latitude: None,
                longitude: None,
                weather_id: None,
                created_at: now,
                updated_at: now,
            })
            .collect()
    }

    #[test]
    fn test_render_shared_produces_pdf() {
        let now = Utc::now();
        let entries = sample_entries(25, now);
        let stats = compute(&entries, &[], now - Duration::days(2), now);

        let layout = layout("Headache diary", "range", &[], &stats, &entries, true).unwrap();
        assert_eq!(layout.pages, 1);

        let diary = SharedDiary {
            from_date: (now - Duration::days(2)).date_naive(),
            to_date: now.date_naive(),
            expires_at: now + Duration::hours(24),
            include_notes: true,
            entries,
            statistics: stats,
        };
        let bytes = render_shared(&diary).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_long_header_block_stays_clear_of_footer() {
        let now = Utc::now();
        let entries = sample_entries(60, now);
        let stats = compute(&entries, &[], now - Duration::days(3), now);
        let limits: Vec<String> = (0..40)
            .map(|i| format!("Limit Medication {}: 2 of 10 per month (ok)", i))
            .collect();

        let layout = layout("Headache report", "range", &limits, &stats, &entries, false).unwrap();
        assert!(layout.lowest_y >= CONTENT_BOTTOM);
        assert!(layout.pages >= 3);
        assert!(layout.doc.save_to_bytes().unwrap().starts_with(b"%PDF"));
    }
}
