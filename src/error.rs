use std::fmt;
use thiserror::Error;

pub type VcfxResult<T> = std::result::Result<T, VcfxError>;

/// The header line kind a record field is validated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Info,
    Format,
    Filter,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Info => write!(f, "INFO"),
            FieldKind::Format => write!(f, "FORMAT"),
            FieldKind::Filter => write!(f, "FILTER"),
        }
    }
}

#[derive(Debug, Error)]
pub enum VcfxError {
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Xml(#[from] quick_xml::Error),
    #[error(transparent)]
    Htslib(#[from] rust_htslib::errors::Error),
    #[error(
        "Key {key} found in record field {kind} at {contig}:{position} but this key isn't defined in the VCF header. \
         All records must have complete VCF headers; rerun with --lenient to disable this check"
    )]
    MissingHeaderField {
        kind: FieldKind,
        key: String,
        contig: String,
        position: u64,
    },
    #[error("The VCF header must be written before records can be added to {stream}")]
    HeaderNotWritten { stream: String },
    #[error("The VCF header has already been written to {stream}")]
    HeaderAlreadyWritten { stream: String },
    #[error("Writer for {stream} is already closed")]
    WriterClosed { stream: String },
    #[error("Allele {allele} at {contig}:{position} is not an allele of the record")]
    UnknownAllele {
        allele: String,
        contig: String,
        position: u64,
    },
    #[error(
        "All samples in the VCF header require genotype data; missing samples at {contig}:{position} are {}",
        .samples.join(",")
    )]
    MissingSamples {
        samples: Vec<String>,
        contig: String,
        position: u64,
    },
    #[error(
        "Sample {sample} at {contig}:{position} has no allele calls, but GT is written for other samples in the record"
    )]
    MissingGenotypeCalls {
        sample: String,
        contig: String,
        position: u64,
    },
}

impl VcfxError {
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

#[macro_export]
macro_rules! vcfx_error {
    ($($arg:tt)*) => {
        $crate::error::VcfxError::message(format!($($arg)*))
    };
}
