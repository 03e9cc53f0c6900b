//! Tool dispatch
//!
//! Every operation the suite offers is a `ToolCommand` variant carrying its
//! parameters. `execute` runs one command over the acquired inputs and
//! produces the single output document.

use crate::acquire::{MediaType, SourceDocument};
use crate::apply_operations::apply_operations;
use crate::compress::{compress_document, CompressionStats};
use crate::delivery::OutputDocument;
use crate::error::PdfToolsError;
use crate::merge::{merge_documents, MergeOptions};
use crate::naming;
use crate::operations::OperationLog;
use crate::progress::{Progress, ProgressSink};
use crate::protect::{protect_document, unlock_document, Credential};
use crate::split::split_document;
use crate::text::{convert_to_text, TextOptions};
use crate::word::{convert_to_word, word_to_pdf};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ToolCommand {
    ToText {
        #[serde(default)]
        options: TextOptions,
    },
    ToWord,
    WordToPdf,
    Protect {
        credential: Credential,
    },
    Unlock {
        password: String,
    },
    Merge {
        #[serde(default)]
        options: MergeOptions,
    },
    Compress,
    Split {
        pages: String,
    },
    Edit {
        log: OperationLog,
    },
}

/// Output formats offered by the convert tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConversionFormat {
    Text,
    #[default]
    Word,
    WordToPdf,
    Protect,
}

impl ConversionFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(ConversionFormat::Text),
            "word" => Some(ConversionFormat::Word),
            "wordToPdf" => Some(ConversionFormat::WordToPdf),
            "protect" => Some(ConversionFormat::Protect),
            _ => None,
        }
    }

    /// Type of the file the conversion reads
    pub fn input_type(&self) -> MediaType {
        match self {
            ConversionFormat::WordToPdf => MediaType::Docx,
            _ => MediaType::Pdf,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConversionFormat::Text => "TEXT",
            ConversionFormat::Word => "WORD",
            ConversionFormat::WordToPdf => "PDF",
            ConversionFormat::Protect => "PROTECTED PDF",
        }
    }

    pub fn command(&self, text_options: &TextOptions, credential: &Credential) -> ToolCommand {
        match self {
            ConversionFormat::Text => ToolCommand::ToText {
                options: text_options.clone(),
            },
            ConversionFormat::Word => ToolCommand::ToWord,
            ConversionFormat::WordToPdf => ToolCommand::WordToPdf,
            ConversionFormat::Protect => ToolCommand::Protect {
                credential: credential.clone(),
            },
        }
    }
}

/// Result of one executed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub document: OutputDocument,
    /// Set by `Compress`
    pub compression: Option<CompressionStats>,
}

impl From<OutputDocument> for ToolOutput {
    fn from(document: OutputDocument) -> Self {
        Self {
            document,
            compression: None,
        }
    }
}

impl ToolCommand {
    pub fn name(&self) -> &'static str {
        match self {
            ToolCommand::ToText { .. } => "to-text",
            ToolCommand::ToWord => "to-word",
            ToolCommand::WordToPdf => "word-to-pdf",
            ToolCommand::Protect { .. } => "protect",
            ToolCommand::Unlock { .. } => "unlock",
            ToolCommand::Merge { .. } => "merge",
            ToolCommand::Compress => "compress",
            ToolCommand::Split { .. } => "split",
            ToolCommand::Edit { .. } => "edit",
        }
    }

    /// Type every input must have
    pub fn input_type(&self) -> MediaType {
        match self {
            ToolCommand::WordToPdf => MediaType::Docx,
            _ => MediaType::Pdf,
        }
    }
}

pub fn execute(
    command: &ToolCommand,
    inputs: &[SourceDocument],
    progress: &mut dyn ProgressSink,
) -> Result<ToolOutput, PdfToolsError> {
    let expected = command.input_type();
    if let Some(wrong) = inputs.iter().find(|d| d.media_type != expected) {
        return Err(PdfToolsError::InvalidFileType(format!(
            "{} is not a {} file",
            wrong.name,
            expected.extension()
        )));
    }
    debug!(command = command.name(), inputs = inputs.len(), "executing");

    let output = match command {
        ToolCommand::Merge { options } => {
            let buffers: Vec<&[u8]> = inputs.iter().map(|d| d.bytes.as_slice()).collect();
            OutputDocument::new(
                merge_documents(&buffers, options, progress)?,
                MediaType::Pdf,
                naming::MERGED_FILE_NAME,
            )
        }
        ToolCommand::ToText { options } => {
            let input = single_input(command, inputs)?;
            let text = convert_to_text(&input.bytes, options, progress)?;
            OutputDocument::new(
                text.into_bytes(),
                MediaType::PlainText,
                naming::text_output_name(&input.name),
            )
        }
        ToolCommand::ToWord => {
            let input = single_input(command, inputs)?;
            OutputDocument::new(
                convert_to_word(&input.bytes, progress)?,
                MediaType::Docx,
                naming::word_output_name(&input.name),
            )
        }
        ToolCommand::WordToPdf => {
            let input = single_input(command, inputs)?;
            OutputDocument::new(
                stepped(progress, || word_to_pdf(&input.bytes))?,
                MediaType::Pdf,
                naming::word_to_pdf_output_name(&input.name),
            )
        }
        ToolCommand::Protect { credential } => {
            let input = single_input(command, inputs)?;
            OutputDocument::new(
                stepped(progress, || protect_document(&input.bytes, credential))?,
                MediaType::Pdf,
                naming::protected_output_name(&input.name),
            )
        }
        ToolCommand::Unlock { password } => {
            let input = single_input(command, inputs)?;
            OutputDocument::new(
                stepped(progress, || unlock_document(&input.bytes, password))?,
                MediaType::Pdf,
                naming::unlocked_output_name(&input.name),
            )
        }
        ToolCommand::Compress => {
            let input = single_input(command, inputs)?;
            let (output, stats) = compress_document(&input.bytes, progress)?;
            return Ok(ToolOutput {
                document: OutputDocument::new(
                    output,
                    MediaType::Pdf,
                    naming::compressed_output_name(&input.name),
                ),
                compression: Some(stats),
            });
        }
        ToolCommand::Split { pages } => {
            let input = single_input(command, inputs)?;
            OutputDocument::new(
                stepped(progress, || split_document(&input.bytes, pages))?,
                MediaType::Pdf,
                naming::split_output_name(&input.name),
            )
        }
        ToolCommand::Edit { log } => {
            let input = single_input(command, inputs)?;
            OutputDocument::new(
                apply_operations(&input.bytes, log, progress)?,
                MediaType::Pdf,
                naming::edited_output_name(&input.name),
            )
        }
    };
    Ok(output.into())
}

fn single_input<'a>(
    command: &ToolCommand,
    inputs: &'a [SourceDocument],
) -> Result<&'a SourceDocument, PdfToolsError> {
    match inputs {
        [single] => Ok(single),
        [] => Err(PdfToolsError::Validation("Please select a file".into())),
        _ => Err(PdfToolsError::Validation(format!(
            "{} works on one file at a time",
            command.name()
        ))),
    }
}

/// Run an operation with no internal progress as a single 0 -> 100 step
fn stepped<T>(
    sink: &mut dyn ProgressSink,
    op: impl FnOnce() -> Result<T, PdfToolsError>,
) -> Result<T, PdfToolsError> {
    let mut progress = Progress::start(sink);
    let result = op()?;
    progress.finish();
    Ok(result)
}
