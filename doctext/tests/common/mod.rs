#![allow(dead_code)]

use std::io::{Cursor, Read, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use doctext::config::OfficeConfig;
use doctext::error::{DoctextError, Result};
use doctext::ocr::{Rasterizer, TextRecognizer};
use doctext::processing::ContentExtractor;
use zip::write::FileOptions;
use zip::CompressionMethod;

type ExtendedOptions = FileOptions<'static, zip::write::ExtendedFileOptions>;

fn zip_options() -> ExtendedOptions {
    FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644)
}

// ---------------------------------------------------------------------------
// DOCX
// ---------------------------------------------------------------------------

/// Build a DOCX with the docx-rs builder.
pub fn docx_bytes<F>(builder_fn: F) -> Vec<u8>
where
    F: FnOnce(docx_rs::Docx) -> docx_rs::Docx,
{
    let docx = builder_fn(docx_rs::Docx::new());
    let mut buffer = Cursor::new(Vec::new());
    docx.build().pack(&mut buffer).expect("Failed to pack DOCX");
    buffer.into_inner()
}

pub fn core_xml(title: Option<&str>, creator: Option<&str>, created: Option<&str>) -> String {
    let mut fields = String::new();
    if let Some(title) = title {
        fields.push_str(&format!("<dc:title>{title}</dc:title>"));
    }
    if let Some(creator) = creator {
        fields.push_str(&format!("<dc:creator>{creator}</dc:creator>"));
    }
    if let Some(created) = created {
        fields.push_str(&format!(
            r#"<dcterms:created xsi:type="dcterms:W3CDTF">{created}</dcterms:created>"#
        ));
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">{fields}</cp:coreProperties>"#
    )
}

/// Replace (or add) `docProps/core.xml` in an OOXML package.
pub fn with_core_properties(package: &[u8], core_xml: &str) -> Vec<u8> {
    let mut archive = zip::ZipArchive::new(Cursor::new(package)).expect("Invalid package");
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buffer);
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).unwrap();
            let name = entry.name().to_string();
            if name == "docProps/core.xml" || entry.is_dir() {
                continue;
            }
            let mut contents = Vec::new();
            entry.read_to_end(&mut contents).unwrap();
            zip.start_file(name, zip_options()).unwrap();
            zip.write_all(&contents).unwrap();
        }
        zip.start_file("docProps/core.xml", zip_options()).unwrap();
        zip.write_all(core_xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    buffer.into_inner()
}

pub fn paragraph(text: &str) -> docx_rs::Paragraph {
    docx_rs::Paragraph::new().add_run(docx_rs::Run::new().add_text(text))
}

pub fn table(rows: &[&[&str]]) -> docx_rs::Table {
    use docx_rs::{TableCell, TableRow};

    docx_rs::Table::new(
        rows.iter()
            .map(|cells| {
                TableRow::new(
                    cells
                        .iter()
                        .map(|text| TableCell::new().add_paragraph(paragraph(text)))
                        .collect(),
                )
            })
            .collect(),
    )
}

// ---------------------------------------------------------------------------
// XLSX
// ---------------------------------------------------------------------------

/// One worksheet per `(name, rows)`. Cells that parse as numbers are stored
/// as numbers, `TRUE`/`FALSE` as booleans, empty strings are omitted.
pub fn xlsx_bytes(sheets: &[(&str, &[&[&str]])]) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buffer);

        zip.start_file("[Content_Types].xml", zip_options()).unwrap();
        zip.write_all(content_types_xlsx(sheets.len()).as_bytes())
            .unwrap();

        zip.add_directory("_rels", zip_options()).unwrap();
        zip.start_file("_rels/.rels", zip_options()).unwrap();
        zip.write_all(RELS_XLSX.as_bytes()).unwrap();

        zip.add_directory("xl", zip_options()).unwrap();
        zip.start_file("xl/workbook.xml", zip_options()).unwrap();
        zip.write_all(workbook_xml(sheets).as_bytes()).unwrap();

        zip.add_directory("xl/_rels", zip_options()).unwrap();
        zip.start_file("xl/_rels/workbook.xml.rels", zip_options())
            .unwrap();
        zip.write_all(workbook_rels(sheets.len()).as_bytes())
            .unwrap();

        zip.add_directory("xl/worksheets", zip_options()).unwrap();
        for (i, (_, rows)) in sheets.iter().enumerate() {
            zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), zip_options())
                .unwrap();
            zip.write_all(sheet_xml(rows).as_bytes()).unwrap();
        }

        zip.finish().unwrap();
    }
    buffer.into_inner()
}

const RELS_XLSX: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

fn content_types_xlsx(sheet_count: usize) -> String {
    let overrides: String = (1..=sheet_count)
        .map(|i| {
            format!(
                r#"<Override PartName="/xl/worksheets/sheet{i}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Default Extension="xml" ContentType="application/xml"/>
    <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
    {overrides}
</Types>"#
    )
}

fn workbook_xml(sheets: &[(&str, &[&[&str]])]) -> String {
    let entries: String = sheets
        .iter()
        .enumerate()
        .map(|(i, (name, _))| {
            format!(
                r#"<sheet name="{name}" sheetId="{id}" r:id="rId{id}"/>"#,
                id = i + 1
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
    <sheets>{entries}</sheets>
</workbook>"#
    )
}

fn workbook_rels(sheet_count: usize) -> String {
    let entries: String = (1..=sheet_count)
        .map(|i| {
            format!(
                r#"<Relationship Id="rId{i}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{i}.xml"/>"#
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{entries}</Relationships>"#
    )
}

fn column_name(index: usize) -> String {
    let mut name = String::new();
    let mut n = index + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        name.insert(0, (b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    name
}

fn sheet_xml(rows: &[&[&str]]) -> String {
    let mut data = String::new();
    for (r, cells) in rows.iter().enumerate() {
        let row_number = r + 1;
        data.push_str(&format!(r#"<row r="{row_number}">"#));
        for (c, value) in cells.iter().enumerate() {
            let reference = format!("{}{}", column_name(c), row_number);
            if value.is_empty() {
                continue;
            }
            if value.parse::<f64>().is_ok() {
                data.push_str(&format!(r#"<c r="{reference}"><v>{value}</v></c>"#));
            } else if *value == "TRUE" || *value == "FALSE" {
                let flag = if *value == "TRUE" { 1 } else { 0 };
                data.push_str(&format!(r#"<c r="{reference}" t="b"><v>{flag}</v></c>"#));
            } else {
                data.push_str(&format!(
                    r#"<c r="{reference}" t="inlineStr"><is><t>{value}</t></is></c>"#
                ));
            }
        }
        data.push_str("</row>");
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
    <sheetData>{data}</sheetData>
</worksheet>"#
    )
}

// ---------------------------------------------------------------------------
// PDF
// ---------------------------------------------------------------------------

/// One page per entry; an empty entry becomes a page with no text layer.
pub fn pdf_bytes(pages: &[&str]) -> Vec<u8> {
    use lopdf::content::{Content, Operation};
    use lopdf::Object;

    let contents: Vec<Vec<u8>> = pages
        .iter()
        .map(|text| {
            let operations = if text.is_empty() {
                vec![Operation::new("q", vec![]), Operation::new("Q", vec![])]
            } else {
                vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ]
            };
            Content { operations }.encode().unwrap()
        })
        .collect();
    pdf_with_contents(&contents)
}

/// One page per raw content stream, all sharing a Helvetica `/F1`.
pub fn pdf_with_contents(contents: &[Vec<u8>]) -> Vec<u8> {
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for content in contents {
        let content_id = doc.add_object(Stream::new(lopdf::Dictionary::new(), content.clone()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Parses as a PDF, but its `cm` operator is missing operands.
pub fn malformed_pdf_bytes() -> Vec<u8> {
    pdf_with_contents(&[b"1 0 0 cm BT /F1 12 Tf (Broken) Tj ET".to_vec()])
}

// ---------------------------------------------------------------------------
// OCR fakes
// ---------------------------------------------------------------------------

/// Writes a placeholder PNG into the scratch dir and remembers the pages asked for.
#[derive(Default)]
pub struct FakeRasterizer {
    pub pages: Mutex<Vec<usize>>,
}

impl Rasterizer for FakeRasterizer {
    fn rasterize(&self, _pdf: &Path, page_number: usize, scratch_dir: &Path) -> Result<Vec<u8>> {
        let image = scratch_dir.join("page.png");
        std::fs::write(&image, b"png")?;
        self.pages.lock().unwrap().push(page_number);
        Ok(std::fs::read(image)?)
    }

    fn dpi(&self) -> u32 {
        300
    }
}

pub struct FakeRecognizer {
    pub reply: Option<&'static str>,
}

impl TextRecognizer for FakeRecognizer {
    fn recognize(&self, _image: &[u8]) -> Result<String> {
        self.reply
            .map(str::to_string)
            .ok_or_else(|| DoctextError::OcrUnavailable("no engine in tests".into()))
    }

    fn is_available(&self) -> bool {
        self.reply.is_some()
    }
}

/// Extractor whose OCR answers every page with `ocr_reply`.
pub fn test_extractor(ocr_reply: Option<&'static str>) -> (ContentExtractor, Arc<FakeRasterizer>) {
    let rasterizer = Arc::new(FakeRasterizer::default());
    let extractor = ContentExtractor::new(
        rasterizer.clone(),
        Arc::new(FakeRecognizer { reply: ocr_reply }),
        OfficeConfig::default(),
    );
    (extractor, rasterizer)
}
