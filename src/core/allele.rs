use crate::{constants::NO_CALL_ALLELE, core::variant::VariantRecord, utils::util::Result};
use std::{collections::HashMap, fmt};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Allele {
    bases: String,
    reference: bool,
}

impl Allele {
    pub fn reference(bases: impl Into<String>) -> Self {
        Self {
            bases: bases.into(),
            reference: true,
        }
    }

    pub fn alternate(bases: impl Into<String>) -> Self {
        Self {
            bases: bases.into(),
            reference: false,
        }
    }

    pub fn no_call() -> Self {
        Self {
            bases: NO_CALL_ALLELE.to_string(),
            reference: false,
        }
    }

    pub fn is_reference(&self) -> bool {
        self.reference
    }

    pub fn is_no_call(&self) -> bool {
        !self.reference && self.bases == NO_CALL_ALLELE
    }

    pub fn display_string(&self) -> &str {
        &self.bases
    }
}

impl fmt::Display for Allele {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bases)?;
        if self.reference {
            write!(f, "*")?;
        }
        Ok(())
    }
}

/// Per-record mapping from allele to its GT index text.
///
/// Index 0 is the reference, 1..N the alternates in declared order. The
/// no-call allele is always present and maps to `.`.
#[derive(Debug)]
pub struct AlleleMap<'a> {
    indices: HashMap<&'a Allele, String>,
    contig: &'a str,
    position: u64,
}

impl<'a> AlleleMap<'a> {
    pub fn build(record: &'a VariantRecord) -> Self {
        let mut indices = HashMap::with_capacity(record.alternates().len() + 1);
        for (index, allele) in record.alleles().enumerate() {
            indices.insert(allele, index.to_string());
        }
        Self {
            indices,
            contig: record.contig(),
            position: record.position(),
        }
    }

    pub fn encode(&self, allele: &Allele) -> Result<&str> {
        if allele.is_no_call() {
            return Ok(NO_CALL_ALLELE);
        }
        self.indices
            .get(allele)
            .map(String::as_str)
            .ok_or_else(|| crate::error::VcfxError::UnknownAllele {
                allele: allele.to_string(),
                contig: self.contig.to_string(),
                position: self.position,
            })
    }

    /// Number of entries including the no-call allele.
    pub fn len(&self) -> usize {
        self.indices.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}
