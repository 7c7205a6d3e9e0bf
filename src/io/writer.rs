use crate::{
    core::{header::VcfHeader, variant::VariantRecord},
    error::VcfxError,
    io::{vcf_text_writer::VcfTextWriter, xml_writer::XmlVariantWriter},
    utils::util::Result,
};
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
    sync::Arc,
};

/// A sink for variant records that agrees with a previously written header.
///
/// The header must be written exactly once before any record, and nothing
/// may be written after `close`.
pub trait VariantContextWriter {
    fn write_header(&mut self, header: Arc<VcfHeader>) -> Result<()>;
    fn add(&mut self, record: &VariantRecord) -> Result<()>;
    fn close(&mut self) -> Result<()>;
    fn records_written(&self) -> u64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Vcf,
    Xml,
}

impl OutputFormat {
    pub fn resolve(output_format: Option<OutputFormat>, output: Option<&Path>) -> OutputFormat {
        match (output_format, output) {
            (Some(format), _) => format,
            (None, Some(path)) => Self::infer_from_extension(path),
            (None, None) => OutputFormat::Vcf,
        }
    }

    fn infer_from_extension(path: &Path) -> OutputFormat {
        let path_lower = path.to_string_lossy().to_lowercase();
        match path_lower.as_str() {
            s if s.ends_with(".xml") => OutputFormat::Xml,
            _ => OutputFormat::Vcf,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WriterOptions {
    pub sites_only: bool,
    pub allow_missing_fields_in_header: bool,
}

impl WriterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, updates: impl FnOnce(&mut Self)) -> Self {
        updates(&mut self);
        self
    }
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            sites_only: crate::constants::DEFAULT_SITES_ONLY,
            allow_missing_fields_in_header: crate::constants::DEFAULT_LENIENT,
        }
    }
}

/// Lifecycle shared by every writer: `Unopened -> Open -> Closed`.
#[derive(Debug, Clone, Default)]
pub enum WriterState {
    #[default]
    Unopened,
    Open(Arc<VcfHeader>),
    Closed,
}

impl WriterState {
    pub fn open(&mut self, header: Arc<VcfHeader>, stream: &str) -> Result<()> {
        match self {
            WriterState::Unopened => {
                *self = WriterState::Open(header);
                Ok(())
            }
            WriterState::Open(_) => Err(VcfxError::HeaderAlreadyWritten {
                stream: stream.to_string(),
            }),
            WriterState::Closed => Err(VcfxError::WriterClosed {
                stream: stream.to_string(),
            }),
        }
    }

    /// The written header, if records may be added.
    pub fn header(&self, stream: &str) -> Result<Arc<VcfHeader>> {
        match self {
            WriterState::Open(header) => Ok(Arc::clone(header)),
            WriterState::Unopened => Err(VcfxError::HeaderNotWritten {
                stream: stream.to_string(),
            }),
            WriterState::Closed => Err(VcfxError::WriterClosed {
                stream: stream.to_string(),
            }),
        }
    }

    pub fn close(&mut self, stream: &str) -> Result<()> {
        match self {
            WriterState::Open(_) => {
                *self = WriterState::Closed;
                Ok(())
            }
            WriterState::Unopened => Err(VcfxError::HeaderNotWritten {
                stream: stream.to_string(),
            }),
            WriterState::Closed => Err(VcfxError::WriterClosed {
                stream: stream.to_string(),
            }),
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, WriterState::Open(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, WriterState::Closed)
    }
}

/// Opens `output` (stdout when `None`) and wraps it in the writer for `format`.
pub fn create_writer(
    output: Option<&Path>,
    format: OutputFormat,
    options: WriterOptions,
) -> Result<Box<dyn VariantContextWriter>> {
    let (sink, stream): (Box<dyn Write>, String) = match output {
        Some(path) => {
            let file = File::create(path).map_err(|e| {
                crate::vcfx_error!("Failed to create output {}: {}", path.display(), e)
            })?;
            (Box::new(BufWriter::new(file)), path.display().to_string())
        }
        None => (Box::new(BufWriter::new(io::stdout())), "stdout".to_string()),
    };
    log::debug!("Writer: {:?} output to {}", format, stream);

    Ok(match format {
        OutputFormat::Vcf => Box::new(VcfTextWriter::new(sink, stream, options)),
        OutputFormat::Xml => Box::new(XmlVariantWriter::new(sink, stream, options)),
    })
}
