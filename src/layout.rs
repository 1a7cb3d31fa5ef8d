//! Presentation details of a tracking sheet that calamine does not expose:
//! per-cell number formats, merged ranges and custom column widths.
//!
//! They are read straight from the xlsx package (`xl/styles.xml` and the
//! worksheet parts) so the rewritten workbook keeps the look the user
//! maintains by hand. Other formats have no layout to carry.

use log::debug;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::{BTreeMap, HashMap};
use std::io::{Read, Seek};
use zip::ZipArchive;

/// Number format attached to a cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NumberFormat {
    /// One of Excel's predefined formats, by id (e.g. 14 for the locale date).
    Builtin(u8),
    /// A format code declared in the workbook, e.g. `dd/mm/yyyy hh:mm`.
    Custom(String),
}

/// Inclusive, 1-based cell range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergedRange {
    pub first_row: usize,
    pub first_col: usize,
    pub last_row: usize,
    pub last_col: usize,
}

impl MergedRange {
    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.first_row..=self.last_row).contains(&row)
            && (self.first_col..=self.last_col).contains(&col)
    }

    pub fn is_origin(&self, row: usize, col: usize) -> bool {
        row == self.first_row && col == self.first_col
    }
}

/// Layout of one sheet. Coordinates are 1-based like the rest of the model.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SheetLayout {
    pub number_formats: HashMap<(usize, usize), NumberFormat>,
    pub merged_ranges: Vec<MergedRange>,
    pub column_widths: BTreeMap<usize, f64>,
}

impl SheetLayout {
    pub fn number_format(&self, row: usize, col: usize) -> Option<&NumberFormat> {
        self.number_formats.get(&(row, col))
    }

    /// True for cells covered by a merge but not at its top-left corner.
    pub fn is_merge_hidden(&self, row: usize, col: usize) -> bool {
        self.merged_ranges
            .iter()
            .any(|m| m.contains(row, col) && !m.is_origin(row, col))
    }

    pub fn is_empty(&self) -> bool {
        self.number_formats.is_empty()
            && self.merged_ranges.is_empty()
            && self.column_widths.is_empty()
    }
}

/// Reads the layout of every named sheet, in order. Anything that is not a
/// readable xlsx package yields default layouts.
pub fn read_xlsx_layouts<R: Read + Seek>(reader: R, sheet_names: &[String]) -> Vec<SheetLayout> {
    let mut archive = match ZipArchive::new(reader) {
        Ok(archive) => archive,
        Err(e) => {
            debug!("No xlsx layout available: {}", e);
            return vec![SheetLayout::default(); sheet_names.len()];
        }
    };

    let cell_formats = read_zip_file(&mut archive, "xl/styles.xml")
        .map(|xml| parse_cell_formats(&xml))
        .unwrap_or_default();
    let workbook_xml = read_zip_file(&mut archive, "xl/workbook.xml").unwrap_or_default();
    let rels_xml = read_zip_file(&mut archive, "xl/_rels/workbook.xml.rels").unwrap_or_default();
    let parts = worksheet_parts(&workbook_xml, &rels_xml);

    sheet_names
        .iter()
        .map(|name| {
            parts
                .get(name)
                .and_then(|part| read_zip_file(&mut archive, part))
                .map(|xml| parse_sheet_layout(&xml, &cell_formats))
                .unwrap_or_default()
        })
        .collect()
}

fn read_zip_file<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Option<String> {
    let mut file = match archive.by_name(path) {
        Ok(file) => file,
        Err(e) => {
            debug!("'{}' not found in xlsx package: {}", path, e);
            return None;
        }
    };
    let mut content = String::new();
    match file.read_to_string(&mut content) {
        Ok(_) => Some(content),
        Err(e) => {
            debug!("Failed to read '{}': {}", path, e);
            None
        }
    }
}

fn attr_value(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .map(|attr| unescape_xml(&String::from_utf8_lossy(&attr.value)))
}

fn unescape_xml(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Resolves `cellXfs` style indices to number formats. Index `i` of the
/// result is the format of cells carrying `s="i"`; `None` means General.
fn parse_cell_formats(xml: &str) -> Vec<Option<NumberFormat>> {
    let mut custom: HashMap<u16, String> = HashMap::new();
    let mut xf_format_ids: Vec<u16> = Vec::new();

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_cell_xfs = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"cellXfs" => in_cell_xfs = true,
            Ok(Event::End(ref e)) if e.name().as_ref() == b"cellXfs" => in_cell_xfs = false,
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"numFmt" => {
                    let id = attr_value(e, b"numFmtId").and_then(|s| s.parse().ok());
                    if let (Some(id), Some(code)) = (id, attr_value(e, b"formatCode")) {
                        custom.insert(id, code);
                    }
                }
                b"xf" if in_cell_xfs => {
                    let id = attr_value(e, b"numFmtId")
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(0);
                    xf_format_ids.push(id);
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                debug!("Stopped reading styles.xml: {}", e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    xf_format_ids
        .into_iter()
        .map(|id| match (id, custom.get(&id)) {
            (0, _) => None,
            (_, Some(code)) => Some(NumberFormat::Custom(code.clone())),
            (id, None) => u8::try_from(id).ok().map(NumberFormat::Builtin),
        })
        .collect()
}

/// Maps sheet names to their worksheet part, e.g. `xl/worksheets/sheet2.xml`.
fn worksheet_parts(workbook_xml: &str, rels_xml: &str) -> HashMap<String, String> {
    let mut targets: HashMap<String, String> = HashMap::new();
    let mut reader = Reader::from_str(rels_xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if e.name().as_ref() == b"Relationship" =>
            {
                if let (Some(id), Some(target)) = (attr_value(e, b"Id"), attr_value(e, b"Target")) {
                    let part = match target.strip_prefix('/') {
                        Some(absolute) => absolute.to_string(),
                        None => format!("xl/{}", target),
                    };
                    targets.insert(id, part);
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    let mut parts = HashMap::new();
    let mut reader = Reader::from_str(workbook_xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) if e.name().as_ref() == b"sheet" => {
                let name = attr_value(e, b"name");
                let part = attr_value(e, b"r:id").and_then(|rid| targets.get(&rid).cloned());
                if let (Some(name), Some(part)) = (name, part) {
                    parts.insert(name, part);
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    parts
}

fn parse_sheet_layout(xml: &str, cell_formats: &[Option<NumberFormat>]) -> SheetLayout {
    let mut layout = SheetLayout::default();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"c" => {
                    let style = attr_value(e, b"s").and_then(|s| s.parse::<usize>().ok());
                    let position = attr_value(e, b"r").and_then(|r| parse_cell_ref(&r));
                    if let (Some(style), Some(position)) = (style, position) {
                        if let Some(Some(format)) = cell_formats.get(style) {
                            layout.number_formats.insert(position, format.clone());
                        }
                    }
                }
                b"col" => {
                    let custom = attr_value(e, b"customWidth")
                        .is_some_and(|v| v == "1" || v == "true");
                    let min = attr_value(e, b"min").and_then(|s| s.parse::<usize>().ok());
                    let max = attr_value(e, b"max").and_then(|s| s.parse::<usize>().ok());
                    let width = attr_value(e, b"width").and_then(|s| s.parse::<f64>().ok());
                    if let (true, Some(min), Some(max), Some(width)) = (custom, min, max, width) {
                        // A trailing <col> often spans every remaining column.
                        for col in min..=max.min(min + 255) {
                            layout.column_widths.insert(col, character_width(width));
                        }
                    }
                }
                b"mergeCell" => {
                    if let Some(range) = attr_value(e, b"ref").and_then(|r| parse_range_ref(&r)) {
                        layout.merged_ranges.push(range);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                debug!("Stopped reading worksheet layout: {}", e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    layout
}

/// Converts a stored `<col width>` back to the character width Excel shows
/// and rust_xlsxwriter accepts, removing the Calibri 11 cell padding.
fn character_width(stored: f64) -> f64 {
    const MAX_DIGIT_WIDTH: f64 = 7.0;
    const PADDING: f64 = 5.0;
    if stored <= 0.0 {
        0.0
    } else if stored < (MAX_DIGIT_WIDTH + PADDING) / MAX_DIGIT_WIDTH {
        stored * MAX_DIGIT_WIDTH / (MAX_DIGIT_WIDTH + PADDING)
    } else {
        (stored * MAX_DIGIT_WIDTH - PADDING) / MAX_DIGIT_WIDTH
    }
}

/// `B5` → `(5, 2)`, 1-based. Absolute markers (`$B$5`) are accepted.
fn parse_cell_ref(reference: &str) -> Option<(usize, usize)> {
    let reference = reference.replace('$', "");
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let col = letters.chars().fold(0usize, |acc, c| {
        acc * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1)
    });
    let row = digits.parse::<usize>().ok().filter(|&r| r > 0)?;
    Some((row, col))
}

fn parse_range_ref(reference: &str) -> Option<MergedRange> {
    let (first, last) = reference.split_once(':')?;
    let (first_row, first_col) = parse_cell_ref(first)?;
    let (last_row, last_col) = parse_cell_ref(last)?;
    Some(MergedRange {
        first_row,
        first_col,
        last_row,
        last_col,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <numFmts count="1"><numFmt numFmtId="164" formatCode="dd/mm/yyyy hh:mm"/></numFmts>
  <cellStyleXfs count="1"><xf numFmtId="4"/></cellStyleXfs>
  <cellXfs count="4">
    <xf numFmtId="0" fontId="0"/>
    <xf numFmtId="164" applyNumberFormat="1"/>
    <xf numFmtId="14" applyNumberFormat="1"/>
    <xf numFmtId="4" applyNumberFormat="1"><alignment horizontal="center"/></xf>
  </cellXfs>
</styleSheet>"#;

    #[test]
    fn test_cell_formats_follow_cell_xfs_only() {
        let formats = parse_cell_formats(STYLES);
        assert_eq!(
            formats,
            vec![
                None,
                Some(NumberFormat::Custom("dd/mm/yyyy hh:mm".to_string())),
                Some(NumberFormat::Builtin(14)),
                Some(NumberFormat::Builtin(4)),
            ]
        );
    }

    #[test]
    fn test_sheet_layout_collects_formats_merges_and_widths() {
        let sheet = r#"<worksheet>
  <cols><col min="1" max="1" width="24.7109375" customWidth="1"/><col min="2" max="3" width="9" /></cols>
  <sheetData>
    <row r="1"><c r="A1" t="s" s="0"><v>0</v></c></row>
    <row r="5"><c r="B5" s="1"><v>45356.6</v></c><c r="D5" s="3"><v>1500</v></c></row>
  </sheetData>
  <mergeCells count="1"><mergeCell ref="A1:D1"/></mergeCells>
</worksheet>"#;
        let layout = parse_sheet_layout(sheet, &parse_cell_formats(STYLES));

        assert_eq!(
            layout.number_format(5, 2),
            Some(&NumberFormat::Custom("dd/mm/yyyy hh:mm".to_string()))
        );
        assert_eq!(layout.number_format(5, 4), Some(&NumberFormat::Builtin(4)));
        assert_eq!(layout.number_format(1, 1), None);
        let width = layout.column_widths[&1];
        assert!((width - 24.0).abs() < 0.01, "width {}", width);
        assert_eq!(layout.column_widths.get(&2), None);
        assert_eq!(
            layout.merged_ranges,
            vec![MergedRange {
                first_row: 1,
                first_col: 1,
                last_row: 1,
                last_col: 4
            }]
        );
        assert!(layout.is_merge_hidden(1, 3));
        assert!(!layout.is_merge_hidden(1, 1));
        assert!(!layout.is_merge_hidden(2, 1));
    }

    #[test]
    fn test_worksheet_parts_resolve_relationships() {
        let workbook = r#"<workbook xmlns:r="r"><sheets>
  <sheet name="Resumo" sheetId="1" r:id="rId1"/>
  <sheet name="12 - Site Alpha" sheetId="2" r:id="rId2"/>
</sheets></workbook>"#;
        let rels = r#"<Relationships>
  <Relationship Id="rId1" Target="worksheets/sheet1.xml"/>
  <Relationship Id="rId2" Target="/xl/worksheets/sheet2.xml"/>
</Relationships>"#;
        let parts = worksheet_parts(workbook, rels);
        assert_eq!(parts["Resumo"], "xl/worksheets/sheet1.xml");
        assert_eq!(parts["12 - Site Alpha"], "xl/worksheets/sheet2.xml");
    }

    #[test]
    fn test_cell_references() {
        assert_eq!(parse_cell_ref("A1"), Some((1, 1)));
        assert_eq!(parse_cell_ref("$AB$12"), Some((12, 28)));
        assert_eq!(parse_cell_ref("12"), None);
        assert_eq!(parse_cell_ref("A0"), None);
    }

    #[test]
    fn test_non_zip_input_gives_default_layouts() {
        let names = vec!["a".to_string(), "b".to_string()];
        let layouts = read_xlsx_layouts(std::io::Cursor::new(b"not a zip".to_vec()), &names);
        assert_eq!(layouts.len(), 2);
        assert!(layouts.iter().all(SheetLayout::is_empty));
    }
}
