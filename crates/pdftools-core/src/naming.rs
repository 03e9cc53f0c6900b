//! Output file names derived from input names

/// Name used for every merge result
pub const MERGED_FILE_NAME: &str = "merged.pdf";

/// Strip `ext` (with its dot, case-insensitive) from the end of `name`
pub fn file_stem<'a>(name: &'a str, ext: &str) -> &'a str {
    let split = name.len().saturating_sub(ext.len());
    if name.is_char_boundary(split) && name[split..].eq_ignore_ascii_case(ext) {
        &name[..split]
    } else {
        name
    }
}

/// Replace a trailing `from` extension with `to`, or append `to`
pub fn replace_extension(name: &str, from: &str, to: &str) -> String {
    format!("{}{}", file_stem(name, from), to)
}

/// `report.pdf` -> `report{suffix}.pdf`
pub fn with_pdf_suffix(name: &str, suffix: &str) -> String {
    format!("{}{}.pdf", file_stem(name, ".pdf"), suffix)
}

pub fn text_output_name(name: &str) -> String {
    replace_extension(name, ".pdf", ".txt")
}

pub fn word_output_name(name: &str) -> String {
    replace_extension(name, ".pdf", ".docx")
}

pub fn word_to_pdf_output_name(name: &str) -> String {
    replace_extension(name, ".docx", ".pdf")
}

pub fn protected_output_name(name: &str) -> String {
    with_pdf_suffix(name, "_protected")
}

pub fn unlocked_output_name(name: &str) -> String {
    with_pdf_suffix(name, "_unlocked")
}

pub fn split_output_name(name: &str) -> String {
    with_pdf_suffix(name, "_split")
}

pub fn compressed_output_name(name: &str) -> String {
    with_pdf_suffix(name, "_compressed")
}

pub fn edited_output_name(name: &str) -> String {
    with_pdf_suffix(name, "_edited")
}
