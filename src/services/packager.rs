use crate::api::error::AppError;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use zip::ZipWriter;
use zip::write::FileOptions;

/// Download name of the group-merge archive
pub const ARCHIVE_NAME: &str = "documentos_unidos.zip";

/// Fallback base name for the ordered merge
pub const DEFAULT_OUTPUT_NAME: &str = "documento-unido";

/// Lowercases and collapses every run of non-alphanumeric characters into
/// `separator`, trimming it from both ends. Common accented Latin letters are
/// folded to ASCII first.
pub fn slugify(input: &str, separator: char) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_separator = false;

    for c in input.chars().flat_map(char::to_lowercase).map(fold_accent) {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push(separator);
            }
            pending_separator = false;
            slug.push(c);
        } else {
            pending_separator = true;
        }
    }

    slug
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' | 'ã' | 'å' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' | 'õ' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        other => other,
    }
}

/// Safe `<slug>.pdf` download name for the ordered merge
pub fn output_filename(requested: Option<&str>) -> String {
    let slug = requested
        .map(|name| slugify(name, '-'))
        .filter(|slug| !slug.is_empty())
        .unwrap_or_else(|| DEFAULT_OUTPUT_NAME.to_string());
    format!("{}.pdf", slug)
}

/// Writes every PDF into a zip at `dest`, each entry named by its base file name.
pub fn build_archive(pdfs: &[PathBuf], dest: &Path) -> Result<u64, AppError> {
    let file = File::create(dest).map_err(|e| {
        AppError::Packaging(format!(
            "Could not create archive {}: {}",
            dest.display(),
            e
        ))
    })?;

    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for pdf in pdfs {
        let entry_name = pdf
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| AppError::Packaging(format!("Invalid entry name {}", pdf.display())))?;

        zip.start_file(entry_name, options)
            .map_err(|e| AppError::Packaging(e.to_string()))?;
        let mut input = File::open(pdf)
            .map_err(|e| AppError::Packaging(format!("Could not read {}: {}", pdf.display(), e)))?;
        io::copy(&mut input, &mut zip).map_err(|e| AppError::Packaging(e.to_string()))?;
        tracing::info!("Added to archive: {}", entry_name);
    }

    let mut file = zip
        .finish()
        .map_err(|e| AppError::Packaging(e.to_string()))?;
    file.flush().map_err(|e| AppError::Packaging(e.to_string()))?;

    let size = file
        .metadata()
        .map_err(|e| AppError::Packaging(e.to_string()))?
        .len();
    Ok(size)
}
