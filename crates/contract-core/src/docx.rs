//! DOCX template filling
//!
//! A DOCX file is a zip archive; visible text lives in `<w:t>` elements (one
//! per run) inside `word/document.xml` and the header/footer parts. Each run
//! is substituted independently, so paragraph and table text are handled
//! alike and run formatting is preserved. All other archive entries are
//! copied through unchanged.

use std::io::{Cursor, Read, Write};

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::ContractError;
use crate::template::Substitutions;

lazy_static! {
    /// A text run: opening tag (with optional attributes), body, closing tag.
    /// Self-closing `<w:t/>` is not an opening tag and the body never holds markup.
    static ref TEXT_RUN: Regex = Regex::new(r"(<w:t(?:\s[^>]*[^/>]|\s)?>)([^<]*)(</w:t>)").unwrap();
    static ref CHAR_REF: Regex = Regex::new(r"&(#x[0-9A-Fa-f]+|#[0-9]+|lt|gt|amp|quot|apos);").unwrap();
}

/// Result of filling a template
#[derive(Debug, Clone)]
pub struct FilledDocument {
    pub bytes: Vec<u8>,
    /// Number of text runs in which at least one token was replaced
    pub replaced_runs: usize,
}

/// Archive entries whose runs are substituted
pub fn is_text_part(name: &str) -> bool {
    name == "word/document.xml"
        || (name.starts_with("word/header") && name.ends_with(".xml"))
        || (name.starts_with("word/footer") && name.ends_with(".xml"))
}

/// Fill every placeholder of a DOCX template held in memory
pub fn fill_docx(template: &[u8], subs: &Substitutions) -> Result<FilledDocument, ContractError> {
    let mut archive = ZipArchive::new(Cursor::new(template))?;
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let mut replaced_runs = 0;
    let mut saw_document = false;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        let method = match entry.compression() {
            CompressionMethod::Stored => CompressionMethod::Stored,
            _ => CompressionMethod::Deflated,
        };
        let options = SimpleFileOptions::default().compression_method(method);

        if entry.is_dir() {
            writer.add_directory(name, options)?;
            continue;
        }

        let mut data = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut data)?;

        if is_text_part(&name) {
            saw_document |= name == "word/document.xml";
            let xml = String::from_utf8(data)
                .map_err(|_| ContractError::InvalidTemplate(format!("{} is not valid UTF-8", name)))?;
            let (filled, count) = fill_part(&xml, subs);
            debug!(part = %name, runs = count, "Filled template part");
            replaced_runs += count;
            data = filled.into_bytes();
        }

        writer.start_file(name, options)?;
        writer.write_all(&data)?;
    }

    if !saw_document {
        return Err(ContractError::InvalidTemplate(
            "archive has no word/document.xml".to_string(),
        ));
    }

    let bytes = writer.finish()?.into_inner();
    Ok(FilledDocument {
        bytes,
        replaced_runs,
    })
}

/// Substitute inside every text run of one XML part.
///
/// Returns the new XML and the number of runs changed.
pub fn fill_part(xml: &str, subs: &Substitutions) -> (String, usize) {
    let mut count = 0;
    let filled = TEXT_RUN.replace_all(xml, |caps: &Captures| {
        let open = &caps[1];
        let body = &caps[2];
        let close = &caps[3];
        match subs.apply(&unescape(body)) {
            Some(replaced) => {
                count += 1;
                // Leading/trailing spaces in values are dropped without this
                let open = if open.contains("xml:space") {
                    open.to_string()
                } else {
                    r#"<w:t xml:space="preserve">"#.to_string()
                };
                format!("{}{}{}", open, escape(&replaced), close)
            }
            None => caps[0].to_string(),
        }
    });
    (filled.into_owned(), count)
}

/// Plain text of every run in a part, in document order
pub fn run_texts(xml: &str) -> Vec<String> {
    TEXT_RUN
        .captures_iter(xml)
        .map(|caps| unescape(&caps[2]))
        .collect()
}

/// Read the run texts of `word/document.xml` from a DOCX archive
pub fn document_runs(docx: &[u8]) -> Result<Vec<String>, ContractError> {
    let mut archive = ZipArchive::new(Cursor::new(docx))?;
    let mut entry = archive.by_name("word/document.xml")?;
    let mut xml = String::new();
    entry.read_to_string(&mut xml)?;
    Ok(run_texts(&xml))
}

fn unescape(text: &str) -> String {
    CHAR_REF
        .replace_all(text, |caps: &Captures| match &caps[1] {
            "lt" => "<".to_string(),
            "gt" => ">".to_string(),
            "amp" => "&".to_string(),
            "quot" => "\"".to_string(),
            "apos" => "'".to_string(),
            num => {
                let code = match num.strip_prefix("#x") {
                    Some(hex) => u32::from_str_radix(hex, 16).ok(),
                    None => num[1..].parse().ok(),
                };
                code.and_then(char::from_u32)
                    .map(String::from)
                    .unwrap_or_else(|| caps[0].to_string())
            }
        })
        .into_owned()
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preparer::SubstitutionMap;
    use crate::template::TokenStyle;

    fn subs(pairs: &[(&str, &str)], style: TokenStyle) -> Substitutions {
        let map: SubstitutionMap = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Substitutions::new(&map, &style)
    }

    fn build_docx(document_xml: &str, extra: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("[Content_Types].xml", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"<Types/>").unwrap();
        writer
            .start_file("word/document.xml", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(document_xml.as_bytes()).unwrap();
        for (name, body) in extra {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn read_entry(docx: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(docx)).unwrap();
        let mut entry = archive.by_name(name).unwrap();
        let mut out = String::new();
        entry.read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn test_fill_part_paragraph_and_table_runs() {
        let xml = concat!(
            "<w:body><w:p><w:r><w:t>Nome: NOME_DONATARIO</w:t></w:r></w:p>",
            "<w:tbl><w:tr><w:tc><w:p><w:r><w:t xml:space=\"preserve\">CPF_DONATARIO </w:t></w:r></w:p></w:tc></w:tr></w:tbl>",
            "</w:body>"
        );
        let s = subs(
            &[("NOME_DONATARIO", "ANA"), ("CPF_DONATARIO", "123")],
            TokenStyle::default(),
        );
        let (filled, count) = fill_part(xml, &s);
        assert_eq!(count, 2);
        assert!(filled.contains(r#"<w:t xml:space="preserve">Nome: ANA</w:t>"#));
        assert!(filled.contains(r#"<w:t xml:space="preserve">123 </w:t>"#));
    }

    #[test]
    fn test_fill_part_escapes_values_and_matches_escaped_tokens() {
        let xml = "<w:p><w:r><w:t>&lt;&lt;BANCO_DONATARIO&gt;&gt;</w:t></w:r></w:p>";
        let s = subs(&[("BANCO_DONATARIO", "A&B <S/A>")], TokenStyle::new("<<", ">>"));
        let (filled, count) = fill_part(xml, &s);
        assert_eq!(count, 1);
        assert!(filled.contains("A&amp;B &lt;S/A&gt;"));
    }

    #[test]
    fn test_fill_part_leaves_split_tokens_and_tabs() {
        let xml = "<w:p><w:r><w:t>NOME_</w:t></w:r><w:r><w:tab/><w:t>DONATARIO</w:t></w:r></w:p>";
        let s = subs(&[("NOME_DONATARIO", "ANA")], TokenStyle::default());
        let (filled, count) = fill_part(xml, &s);
        assert_eq!(count, 0);
        assert_eq!(filled, xml);
    }

    #[test]
    fn test_fill_part_skips_self_closing_runs() {
        let xml = r#"<w:p><w:r><w:t xml:space="preserve"/></w:r><w:r><w:t/></w:r><w:r><w:t>NOME_DONATARIO</w:t></w:r></w:p>"#;
        let s = subs(&[("NOME_DONATARIO", "ANA")], TokenStyle::default());
        let (filled, count) = fill_part(xml, &s);
        assert_eq!(count, 1);
        assert_eq!(
            filled,
            r#"<w:p><w:r><w:t xml:space="preserve"/></w:r><w:r><w:t/></w:r><w:r><w:t xml:space="preserve">ANA</w:t></w:r></w:p>"#
        );
        assert_eq!(run_texts(xml), vec!["NOME_DONATARIO"]);
    }

    #[test]
    fn test_fill_docx_roundtrip_preserves_other_entries() {
        let docx = build_docx(
            "<w:document><w:p><w:r><w:t>LOCAL_DATA_COMPLETA</w:t></w:r></w:p></w:document>",
            &[
                ("word/header1.xml", "<w:hdr><w:r><w:t>NOME_DONATARIO</w:t></w:r></w:hdr>"),
                ("word/styles.xml", "<w:styles>NOME_DONATARIO</w:styles>"),
            ],
        );
        let s = subs(
            &[
                ("LOCAL_DATA_COMPLETA", "Mossoró/RN, 12 de maio de 2025"),
                ("NOME_DONATARIO", "ANA"),
            ],
            TokenStyle::default(),
        );

        let filled = fill_docx(&docx, &s).unwrap();
        assert_eq!(filled.replaced_runs, 2);
        assert_eq!(
            document_runs(&filled.bytes).unwrap(),
            vec!["Mossoró/RN, 12 de maio de 2025"]
        );
        assert!(read_entry(&filled.bytes, "word/header1.xml").contains("ANA"));
        // Non-text parts are copied verbatim
        assert_eq!(
            read_entry(&filled.bytes, "word/styles.xml"),
            "<w:styles>NOME_DONATARIO</w:styles>"
        );
        assert_eq!(read_entry(&filled.bytes, "[Content_Types].xml"), "<Types/>");
    }

    #[test]
    fn test_fill_docx_rejects_non_zip() {
        let s = subs(&[], TokenStyle::default());
        assert!(matches!(
            fill_docx(b"not a zip", &s),
            Err(ContractError::Archive(_))
        ));
    }

    #[test]
    fn test_fill_docx_requires_document_part() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("readme.txt", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"hi").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let s = subs(&[], TokenStyle::default());
        assert!(matches!(
            fill_docx(&bytes, &s),
            Err(ContractError::InvalidTemplate(_))
        ));
    }

    #[test]
    fn test_unescape_numeric_references() {
        assert_eq!(unescape("&#65;&#x42;&amp;"), "AB&");
        assert_eq!(unescape("&#xD800;"), "&#xD800;");
    }
}
