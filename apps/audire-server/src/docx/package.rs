//! DOCX package (ZIP) access

use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::error::{DocxError, DocxResult};

/// Main document part
pub const DOCUMENT_PART: &str = "word/document.xml";

/// Read one part of the package as UTF-8 text
pub fn read_part(package: &[u8], name: &str) -> DocxResult<String> {
    let mut archive = ZipArchive::new(Cursor::new(package))?;
    let mut file = archive.by_name(name).map_err(|e| match e {
        zip::result::ZipError::FileNotFound => DocxError::MissingPart(name.to_string()),
        other => DocxError::Zip(other),
    })?;

    // Declared sizes are untrusted; cap the up-front allocation
    let declared = usize::try_from(file.size()).unwrap_or(usize::MAX);
    let mut content = Vec::with_capacity(declared.min(package.len().saturating_mul(8)));
    file.read_to_end(&mut content)?;
    Ok(String::from_utf8(content)?)
}

/// Copy the package, replacing the content of one part
///
/// Every other entry is copied raw (no recompression), in its original
/// order, so it stays byte-identical.
pub fn replace_part(package: &[u8], name: &str, content: &[u8]) -> DocxResult<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(package))?;
    let mut writer = ZipWriter::new(Cursor::new(Vec::with_capacity(package.len())));
    let mut replaced = false;

    for i in 0..archive.len() {
        let file = archive.by_index_raw(i)?;
        if file.name() == name {
            drop(file);
            writer.start_file(name, deflated())?;
            writer.write_all(content)?;
            replaced = true;
        } else {
            writer.raw_copy_file(file)?;
        }
    }

    if !replaced {
        return Err(DocxError::MissingPart(name.to_string()));
    }

    Ok(writer.finish()?.into_inner())
}

/// Build a new package from `(name, content)` parts
pub fn write_package(parts: &[(&str, &[u8])]) -> DocxResult<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in parts {
        writer.start_file(*name, deflated())?;
        writer.write_all(content)?;
    }
    Ok(writer.finish()?.into_inner())
}

fn deflated() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}
