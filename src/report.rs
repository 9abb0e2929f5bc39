// Renders verified records into a .docx report, returned base64-encoded.

use crate::error::ReportError;
use crate::record::VerifiedRecord;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Local;
use std::fmt::Write as _;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const VALID_COLOR: &str = "28a745";
const INVALID_COLOR: &str = "dc3545";
const HEADER_FILL: &str = "4a90d9";
const BORDER_COLOR: &str = "CCCCCC";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/></Relationships>"#;

const HYPERLINK_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";

/// Renders the report and returns it base64-encoded for transport.
pub fn generate_report(query: &str, records: &[VerifiedRecord]) -> Result<String, ReportError> {
    let generated = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let bytes = render_docx(query, records, &generated)?;
    Ok(STANDARD.encode(bytes))
}

pub fn render_docx(query: &str, records: &[VerifiedRecord], generated: &str) -> Result<Vec<u8>, ReportError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", PACKAGE_RELS.to_string()),
        ("docProps/core.xml", core_properties(query)),
        ("word/_rels/document.xml.rels", document_rels(records)),
        ("word/document.xml", document(query, records, generated)),
    ];

    for (name, body) in parts {
        zip.start_file(name, options)?;
        zip.write_all(body.as_bytes())?;
    }

    Ok(zip.finish()?.into_inner())
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn core_properties(query: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:title>Journal Search Results: {}</dc:title><dc:creator>Journal Scraper</dc:creator><dc:description>Academic journal search results with link verification</dc:description></cp:coreProperties>"#,
        escape(query)
    )
}

// rIdN for record N-1; rId ids in this part only need to be unique here.
fn document_rels(records: &[VerifiedRecord]) -> String {
    let mut rels = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for (i, r) in records.iter().enumerate() {
        let _ = write!(
            rels,
            r#"<Relationship Id="rId{}" Type="{}" Target="{}" TargetMode="External"/>"#,
            i + 1,
            HYPERLINK_REL,
            escape(&r.record.link)
        );
    }
    rels.push_str("</Relationships>");
    rels
}

struct Run<'a> {
    text: &'a str,
    size: u32,
    bold: bool,
    italic: bool,
    color: Option<&'a str>,
}

impl<'a> Run<'a> {
    fn new(text: &'a str, size: u32) -> Self {
        Self { text, size, bold: false, italic: false, color: None }
    }

    fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    fn color(mut self, color: &'a str) -> Self {
        self.color = Some(color);
        self
    }

    fn xml(&self) -> String {
        let mut props = String::new();
        if self.bold {
            props.push_str("<w:b/>");
        }
        if self.italic {
            props.push_str("<w:i/>");
        }
        if let Some(color) = self.color {
            let _ = write!(props, r#"<w:color w:val="{}"/>"#, color);
        }
        let _ = write!(props, r#"<w:sz w:val="{}"/>"#, self.size);

        format!(
            r#"<w:r><w:rPr>{}</w:rPr><w:t xml:space="preserve">{}</w:t></w:r>"#,
            props,
            escape(self.text)
        )
    }
}

fn paragraph(runs: &str, centered: bool, after: u32) -> String {
    let align = if centered { r#"<w:jc w:val="center"/>"# } else { "" };
    format!(r#"<w:p><w:pPr><w:spacing w:after="{}"/>{}</w:pPr>{}</w:p>"#, after, align, runs)
}

fn cell(content: &str, width: u32, fill: Option<&str>) -> String {
    let shading = fill
        .map(|f| format!(r#"<w:shd w:val="clear" w:color="auto" w:fill="{}"/>"#, f))
        .unwrap_or_default();
    let border = format!(r#"w:val="single" w:sz="4" w:color="{}""#, BORDER_COLOR);
    format!(
        r#"<w:tc><w:tcPr><w:tcW w:w="{}" w:type="dxa"/><w:tcBorders><w:top {b}/><w:left {b}/><w:bottom {b}/><w:right {b}/></w:tcBorders>{}</w:tcPr>{}</w:tc>"#,
        width,
        shading,
        content,
        b = border
    )
}

fn results_table(records: &[VerifiedRecord]) -> String {
    let widths = [500, 4000, 2500, 1000];
    let header: String = ["#", "Title", "Authors", "Status"]
        .iter()
        .zip(widths)
        .map(|(label, w)| cell(&paragraph(&Run::new(label, 22).bold().color("FFFFFF").xml(), true, 0), w, Some(HEADER_FILL)))
        .collect();

    let mut table = format!(
        r#"<w:tbl><w:tblPr><w:tblW w:w="5000" w:type="pct"/></w:tblPr><w:tblGrid>{}</w:tblGrid><w:tr><w:trPr><w:tblHeader/></w:trPr>{}</w:tr>"#,
        widths.iter().map(|w| format!(r#"<w:gridCol w:w="{}"/>"#, w)).collect::<String>(),
        header
    );

    for (i, r) in records.iter().enumerate() {
        let index = (i + 1).to_string();
        let title = format!(
            r#"<w:hyperlink r:id="rId{}" w:history="1">{}</w:hyperlink>"#,
            i + 1,
            Run::new(&r.record.title, 20).color("0563C1").xml()
        );
        let (status, color) = if r.is_valid {
            ("✓ Valid", VALID_COLOR)
        } else {
            ("✗ Invalid", INVALID_COLOR)
        };

        let _ = write!(
            table,
            "<w:tr>{}{}{}{}</w:tr>",
            cell(&paragraph(&Run::new(&index, 20).xml(), false, 0), widths[0], None),
            cell(&paragraph(&title, false, 0), widths[1], None),
            cell(&paragraph(&Run::new(&r.record.authors, 20).xml(), false, 0), widths[2], None),
            cell(&paragraph(&Run::new(status, 20).bold().color(color).xml(), true, 0), widths[3], None),
        );
    }

    table.push_str("</w:tbl>");
    table
}

fn document(query: &str, records: &[VerifiedRecord], generated: &str) -> String {
    let valid = records.iter().filter(|r| r.is_valid).count();
    let invalid = records.len() - valid;

    let query_line = format!("Search Query: \"{}\"", query);
    let generated_line = format!("Generated: {}", generated);
    let total_line = format!("Total Results: {}", records.len());
    let valid_line = format!("Valid Links: {}", valid);
    let invalid_line = format!("Invalid Links: {}", invalid);

    let body = [
        paragraph(&Run::new("Journal Search Report", 48).bold().xml(), true, 400),
        paragraph(&Run::new(&query_line, 24).italic().xml(), true, 200),
        paragraph(&Run::new(&generated_line, 20).color("666666").xml(), true, 400),
        paragraph(&Run::new("Summary", 32).bold().xml(), false, 100),
        paragraph(&Run::new(&total_line, 22).xml(), false, 80),
        paragraph(&Run::new(&valid_line, 22).color(VALID_COLOR).xml(), false, 80),
        paragraph(&Run::new(&invalid_line, 22).color(INVALID_COLOR).xml(), false, 300),
        paragraph(&Run::new("Search Results", 32).bold().xml(), false, 200),
        results_table(records),
        // Word requires a paragraph after a trailing table.
        paragraph("", false, 0),
    ]
    .concat();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><w:body>{}<w:sectPr/></w:body></w:document>"#,
        body
    )
}
