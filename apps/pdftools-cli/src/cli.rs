//! Command-line arguments and their mapping onto tool controllers

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use pdftools_core::{
    ConversionFormat, EditOperation, IncomingFile, OperationLog, Permissions, TextOptions,
    ToolController, ToolKind,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "pdftools")]
#[command(version, about = "Merge, split, compress, convert, edit and protect PDF files")]
pub struct Cli {
    /// Directory that receives the output file
    #[arg(short, long, global = true, env = "PDFTOOLS_OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(ClapArgs, Debug)]
pub struct PasswordArgs {
    #[arg(short, long)]
    pub password: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Describe each page of a PDF as plain text
    Text {
        input: PathBuf,
        /// Append the text found on each page
        #[arg(long)]
        include_content: bool,
    },
    /// Convert a PDF into a Word document
    Word { input: PathBuf },
    /// Convert a Word document into a PDF
    WordToPdf { input: PathBuf },
    /// Encrypt a PDF with a password
    Protect {
        input: PathBuf,
        #[command(flatten)]
        password: PasswordArgs,
        /// Separate password for full access
        #[arg(long)]
        owner_password: Option<String>,
        #[arg(long)]
        no_print: bool,
        #[arg(long)]
        no_copy: bool,
        #[arg(long)]
        no_modify: bool,
    },
    /// Remove the password from a protected PDF
    Unlock {
        input: PathBuf,
        #[command(flatten)]
        password: PasswordArgs,
    },
    /// Combine PDFs in the given order
    Merge {
        #[arg(required = true, num_args = 2..)]
        inputs: Vec<PathBuf>,
        #[arg(long)]
        reverse: bool,
    },
    /// Drop unused objects and compress streams
    Compress { input: PathBuf },
    /// Extract a page selection such as "1-3, 5"
    Split {
        input: PathBuf,
        #[arg(long)]
        pages: String,
    },
    /// Apply edit operations from a JSON file
    Edit {
        input: PathBuf,
        /// JSON array of operations
        #[arg(long)]
        ops: PathBuf,
    },
    /// Print document information as JSON
    Info { input: PathBuf },
}

pub fn read_input(path: &Path) -> Result<IncomingFile> {
    let bytes = fs::read(path).with_context(|| format!("Cannot read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    // No declared type: the media type comes from the extension
    Ok(IncomingFile::new(name, "", bytes))
}

fn read_operations(path: &Path) -> Result<OperationLog> {
    let json = fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))?;
    let operations: Vec<EditOperation> = serde_json::from_str(&json)
        .with_context(|| format!("Invalid operations in {}", path.display()))?;
    let mut log = OperationLog::new();
    for op in operations {
        log.add(op);
    }
    Ok(log)
}

/// Build a controller loaded with the command's inputs and options
///
/// Returns `None` for commands that do not run a tool.
pub fn controller_for(command: &Command) -> Result<Option<(ToolController, Vec<PathBuf>)>> {
    let (mut tool, inputs) = match command {
        Command::Info { .. } => return Ok(None),
        Command::Text {
            input,
            include_content,
        } => {
            let mut tool = ToolController::new(ToolKind::Convert);
            tool.set_format(ConversionFormat::Text);
            tool.set_text_options(TextOptions {
                include_content: *include_content,
            });
            (tool, vec![input.clone()])
        }
        Command::Word { input } => {
            let mut tool = ToolController::new(ToolKind::Convert);
            tool.set_format(ConversionFormat::Word);
            (tool, vec![input.clone()])
        }
        Command::WordToPdf { input } => {
            let mut tool = ToolController::new(ToolKind::Convert);
            tool.set_format(ConversionFormat::WordToPdf);
            (tool, vec![input.clone()])
        }
        Command::Protect {
            input,
            password,
            owner_password,
            no_print,
            no_copy,
            no_modify,
        } => {
            let mut tool = ToolController::new(ToolKind::Convert);
            tool.set_format(ConversionFormat::Protect);
            tool.set_password(password.password.as_str());
            tool.set_owner_password(owner_password.clone());
            tool.set_permissions(Permissions {
                print: !no_print,
                modify: !no_modify,
                copy: !no_copy,
                ..Permissions::default()
            });
            (tool, vec![input.clone()])
        }
        Command::Unlock { input, password } => {
            let mut tool = ToolController::new(ToolKind::Unlock);
            tool.set_password(password.password.as_str());
            (tool, vec![input.clone()])
        }
        Command::Merge { inputs, reverse } => {
            let mut tool = ToolController::new(ToolKind::Merge);
            tool.set_reverse_order(*reverse);
            (tool, inputs.clone())
        }
        Command::Compress { input } => (ToolController::new(ToolKind::Compress), vec![input.clone()]),
        Command::Split { input, pages } => {
            let mut tool = ToolController::new(ToolKind::Split);
            tool.set_page_selection(pages.as_str());
            (tool, vec![input.clone()])
        }
        Command::Edit { input, ops } => {
            let mut tool = ToolController::new(ToolKind::Edit);
            tool.set_edit_log(read_operations(ops)?);
            (tool, vec![input.clone()])
        }
    };

    // One file per call so a multi-file tool keeps the command-line order
    for path in &inputs {
        let notification = tool.add_files(vec![read_input(path)?]);
        if !notification.is_success() {
            anyhow::bail!("{}: {}", path.display(), notification.description);
        }
    }
    Ok(Some((tool, inputs)))
}
