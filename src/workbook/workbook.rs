//! Streaming workbook bound to one output file
//!
//! The workbook owns the ZIP sink. Worksheet parts are appended as their
//! writers commit; the bookkeeping parts (content types, relationships,
//! styles, document properties) are written once at [`Workbook::finish`],
//! when the sheet registry is complete.

use std::cell::RefCell;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::rc::Rc;

use chrono::Utc;
use indexmap::IndexMap;
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

use super::worksheet::Worksheet;
use super::xml::XmlWriter;
use crate::error::{ExportError, Result};
use crate::schema::Column;

fn zip_options() -> FileOptions {
    FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(6))
}

struct SheetEntry {
    sheet_id: u32,
    committed: bool,
}

pub(crate) struct WorkbookInner {
    zip: ZipWriter<BufWriter<File>>,
    sheets: IndexMap<String, SheetEntry>,
}

/// Streaming XLSX workbook.
///
/// Cloning the handle shares the same underlying file; the handle is
/// single-threaded (worksheet tasks interleave cooperatively) and the
/// inner state is only ever borrowed between suspension points.
#[derive(Clone)]
pub struct Workbook {
    inner: Rc<RefCell<WorkbookInner>>,
}

impl Workbook {
    /// Create an empty workbook bound to `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        let writer = BufWriter::with_capacity(64 * 1024, file);
        let zip = ZipWriter::new(writer);

        Ok(Workbook {
            inner: Rc::new(RefCell::new(WorkbookInner {
                zip,
                sheets: IndexMap::new(),
            })),
        })
    }

    /// Register a worksheet and return its independent streaming handle.
    ///
    /// Duplicate names are rejected; sheet ids follow registration order.
    pub async fn add_worksheet(&self, name: &str, columns: &[Column]) -> Result<Worksheet> {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.sheets.contains_key(name) {
                return Err(ExportError::Write(format!(
                    "worksheet '{name}' already exists"
                )));
            }
            let sheet_id = inner.sheets.len() as u32 + 1;
            inner.sheets.insert(
                name.to_string(),
                SheetEntry {
                    sheet_id,
                    committed: false,
                },
            );
        }
        Worksheet::open(Rc::clone(&self.inner), name.to_string(), columns.to_vec()).await
    }

    /// Number of registered worksheets
    pub fn sheet_count(&self) -> usize {
        self.inner.borrow().sheets.len()
    }

    /// Finalize the workbook: write the bookkeeping parts and close the
    /// ZIP. Every worksheet must have been committed first.
    pub fn finish(self) -> Result<()> {
        let mut inner = self.inner.borrow_mut();

        if let Some(name) = inner
            .sheets
            .iter()
            .find(|(_, entry)| !entry.committed)
            .map(|(name, _)| name.clone())
        {
            return Err(ExportError::Write(format!(
                "worksheet '{name}' was never committed"
            )));
        }

        inner.write_content_types()?;
        inner.write_root_rels()?;
        inner.write_core_props()?;
        inner.write_app_props()?;
        inner.write_workbook_xml()?;
        inner.write_workbook_rels()?;
        inner.write_styles()?;

        inner.zip.finish()?;
        Ok(())
    }
}

impl WorkbookInner {
    /// Store a committed worksheet part in the ZIP. Called from
    /// `Worksheet::commit` with the rewound spill file.
    pub(crate) fn attach_sheet(&mut self, name: &str, spill: &mut File) -> Result<()> {
        let sheet_id = match self.sheets.get(name) {
            Some(entry) => entry.sheet_id,
            None => {
                return Err(ExportError::Write(format!(
                    "worksheet '{name}' is not registered"
                )))
            }
        };

        self.zip
            .start_file(format!("xl/worksheets/sheet{sheet_id}.xml"), zip_options())?;
        std::io::copy(spill, &mut self.zip).map_err(|err| {
            ExportError::Write(format!("failed to store worksheet '{name}': {err}"))
        })?;

        if let Some(entry) = self.sheets.get_mut(name) {
            entry.committed = true;
        }
        Ok(())
    }

    fn write_content_types(&mut self) -> Result<()> {
        self.zip.start_file("[Content_Types].xml", zip_options())?;

        let mut xml = XmlWriter::new(&mut self.zip);
        xml.write_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n")?;
        xml.start_element("Types")?;
        xml.attribute(
            "xmlns",
            "http://schemas.openxmlformats.org/package/2006/content-types",
        )?;
        xml.close_start_tag()?;

        xml.write_str("<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>")?;
        xml.write_str("<Default Extension=\"xml\" ContentType=\"application/xml\"/>")?;
        xml.write_str("<Override PartName=\"/xl/workbook.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml\"/>")?;

        for entry in self.sheets.values() {
            xml.start_element("Override")?;
            xml.attribute(
                "PartName",
                &format!("/xl/worksheets/sheet{}.xml", entry.sheet_id),
            )?;
            xml.attribute(
                "ContentType",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml",
            )?;
            xml.close_empty_tag()?;
        }

        xml.write_str("<Override PartName=\"/xl/styles.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml\"/>")?;
        xml.write_str("<Override PartName=\"/docProps/core.xml\" ContentType=\"application/vnd.openxmlformats-package.core-properties+xml\"/>")?;
        xml.write_str("<Override PartName=\"/docProps/app.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.extended-properties+xml\"/>")?;

        xml.end_element("Types")?;
        xml.flush()
    }

    fn write_root_rels(&mut self) -> Result<()> {
        self.zip.start_file("_rels/.rels", zip_options())?;

        let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/>
</Relationships>"#;
        self.zip.write_all(xml.as_bytes())?;
        Ok(())
    }

    fn write_core_props(&mut self) -> Result<()> {
        self.zip.start_file("docProps/core.xml", zip_options())?;

        let stamp = Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
<dc:creator>sheetstream</dc:creator>
<cp:lastModifiedBy>sheetstream</cp:lastModifiedBy>
<dcterms:created xsi:type="dcterms:W3CDTF">{stamp}</dcterms:created>
<dcterms:modified xsi:type="dcterms:W3CDTF">{stamp}</dcterms:modified>
</cp:coreProperties>"#
        );
        self.zip.write_all(xml.as_bytes())?;
        Ok(())
    }

    fn write_app_props(&mut self) -> Result<()> {
        self.zip.start_file("docProps/app.xml", zip_options())?;

        let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties">
<Application>sheetstream</Application>
<DocSecurity>0</DocSecurity>
<ScaleCrop>false</ScaleCrop>
<Company></Company>
<LinksUpToDate>false</LinksUpToDate>
<SharedDoc>false</SharedDoc>
<HyperlinksChanged>false</HyperlinksChanged>
<AppVersion>1.0</AppVersion>
</Properties>"#;
        self.zip.write_all(xml.as_bytes())?;
        Ok(())
    }

    fn write_workbook_xml(&mut self) -> Result<()> {
        self.zip.start_file("xl/workbook.xml", zip_options())?;

        let mut xml = XmlWriter::new(&mut self.zip);
        xml.write_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n")?;
        xml.start_element("workbook")?;
        xml.attribute(
            "xmlns",
            "http://schemas.openxmlformats.org/spreadsheetml/2006/main",
        )?;
        xml.attribute(
            "xmlns:r",
            "http://schemas.openxmlformats.org/officeDocument/2006/relationships",
        )?;
        xml.close_start_tag()?;

        xml.start_element("sheets")?;
        xml.close_start_tag()?;
        for (name, entry) in &self.sheets {
            xml.start_element("sheet")?;
            xml.attribute("name", name)?;
            xml.attribute_int("sheetId", entry.sheet_id as i64)?;
            xml.attribute("r:id", &format!("rId{}", entry.sheet_id))?;
            xml.close_empty_tag()?;
        }
        xml.end_element("sheets")?;

        xml.end_element("workbook")?;
        xml.flush()
    }

    fn write_workbook_rels(&mut self) -> Result<()> {
        self.zip
            .start_file("xl/_rels/workbook.xml.rels", zip_options())?;

        let mut xml = XmlWriter::new(&mut self.zip);
        xml.write_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n")?;
        xml.start_element("Relationships")?;
        xml.attribute(
            "xmlns",
            "http://schemas.openxmlformats.org/package/2006/relationships",
        )?;
        xml.close_start_tag()?;

        for entry in self.sheets.values() {
            xml.start_element("Relationship")?;
            xml.attribute("Id", &format!("rId{}", entry.sheet_id))?;
            xml.attribute(
                "Type",
                "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet",
            )?;
            xml.attribute(
                "Target",
                &format!("worksheets/sheet{}.xml", entry.sheet_id),
            )?;
            xml.close_empty_tag()?;
        }

        let styles_rid = self.sheets.len() as u32 + 1;
        xml.start_element("Relationship")?;
        xml.attribute("Id", &format!("rId{styles_rid}"))?;
        xml.attribute(
            "Type",
            "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles",
        )?;
        xml.attribute("Target", "styles.xml")?;
        xml.close_empty_tag()?;

        xml.end_element("Relationships")?;
        xml.flush()
    }

    /// Style table: xf 1 is the 0.000 amount format, xf 2 the yyyy-mm-dd
    /// date format (matching `CellFormat::style_index`).
    fn write_styles(&mut self) -> Result<()> {
        self.zip.start_file("xl/styles.xml", zip_options())?;

        let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<numFmts count="2">
<numFmt numFmtId="164" formatCode="0.000"/>
<numFmt numFmtId="165" formatCode="yyyy-mm-dd"/>
</numFmts>
<fonts count="1">
<font><sz val="11"/><name val="Calibri"/></font>
</fonts>
<fills count="2">
<fill><patternFill patternType="none"/></fill>
<fill><patternFill patternType="gray125"/></fill>
</fills>
<borders count="1">
<border><left/><right/><top/><bottom/><diagonal/></border>
</borders>
<cellStyleXfs count="1">
<xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>
</cellStyleXfs>
<cellXfs count="3">
<xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>
<xf numFmtId="164" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/>
<xf numFmtId="165" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/>
</cellXfs>
</styleSheet>"#;
        self.zip.write_all(xml.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{report_columns, Cell};
    use std::io::Read;

    fn read_entry(path: &std::path::Path, entry: &str) -> String {
        let file = File::open(path).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        let mut content = String::new();
        archive
            .by_name(entry)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        content
    }

    #[tokio::test]
    async fn writes_a_single_sheet_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.xlsx");

        let workbook = Workbook::create(&path).unwrap();
        let mut sheet = workbook
            .add_worksheet("Sheet1", &report_columns())
            .await
            .unwrap();
        sheet
            .append_row(&[Cell::Text("alpha".to_string()), Cell::Number(1.0)])
            .await
            .unwrap();
        sheet.commit().await.unwrap();
        workbook.finish().unwrap();

        let sheet_xml = read_entry(&path, "xl/worksheets/sheet1.xml");
        assert!(sheet_xml.contains("<row r=\"1\">")); // header
        assert!(sheet_xml.contains("<row r=\"2\">"));
        assert!(sheet_xml.contains("alpha"));

        let workbook_xml = read_entry(&path, "xl/workbook.xml");
        assert!(workbook_xml.contains("name=\"Sheet1\""));
    }

    #[tokio::test]
    async fn rejects_duplicate_sheet_names() {
        let dir = tempfile::tempdir().unwrap();
        let workbook = Workbook::create(dir.path().join("dup.xlsx")).unwrap();
        let columns = report_columns();

        let first = workbook.add_worksheet("Sheet1", &columns).await.unwrap();
        let err = workbook.add_worksheet("Sheet1", &columns).await.unwrap_err();
        assert!(matches!(err, ExportError::Write(_)));
        assert!(err.to_string().contains("already exists"));

        first.commit().await.unwrap();
    }

    #[tokio::test]
    async fn refuses_to_finish_with_uncommitted_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let workbook = Workbook::create(dir.path().join("open.xlsx")).unwrap();

        let _sheet = workbook
            .add_worksheet("Sheet1", &report_columns())
            .await
            .unwrap();

        let err = workbook.clone().finish().unwrap_err();
        assert!(err.to_string().contains("never committed"));
    }

    #[tokio::test]
    async fn styles_declare_the_two_custom_formats() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("styles.xlsx");

        let workbook = Workbook::create(&path).unwrap();
        let sheet = workbook
            .add_worksheet("Sheet1", &report_columns())
            .await
            .unwrap();
        sheet.commit().await.unwrap();
        workbook.finish().unwrap();

        let styles = read_entry(&path, "xl/styles.xml");
        assert!(styles.contains("formatCode=\"0.000\""));
        assert!(styles.contains("formatCode=\"yyyy-mm-dd\""));
    }
}
