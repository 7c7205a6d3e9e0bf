use crate::{
    constants::{EMPTY_ID_FIELD, FILTER_CODE_SEPARATOR, PASSES_FILTERS, UNFILTERED},
    core::{allele::Allele, genotype::Genotype, value::FieldValue},
};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt, iter,
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FilterStatus {
    #[default]
    NotEvaluated,
    Passed,
    Failed(BTreeSet<String>),
}

impl FilterStatus {
    pub fn failed<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: BTreeSet<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            FilterStatus::Passed
        } else {
            FilterStatus::Failed(names)
        }
    }

    /// True only when at least one filter name failed; an empty set counts as passed.
    pub fn is_failed(&self) -> bool {
        matches!(self, FilterStatus::Failed(names) if !names.is_empty())
    }

    /// Parses a VCF FILTER column value.
    pub fn parse(text: &str) -> Self {
        match text {
            UNFILTERED | "" => FilterStatus::NotEvaluated,
            PASSES_FILTERS => FilterStatus::Passed,
            _ => FilterStatus::failed(text.split(FILTER_CODE_SEPARATOR)),
        }
    }
}

impl fmt::Display for FilterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterStatus::NotEvaluated => write!(f, "{UNFILTERED}"),
            FilterStatus::Passed => write!(f, "{PASSES_FILTERS}"),
            FilterStatus::Failed(names) if names.is_empty() => write!(f, "{PASSES_FILTERS}"),
            FilterStatus::Failed(names) => {
                // BTreeSet iterates in sorted order
                let joined: Vec<&str> = names.iter().map(String::as_str).collect();
                write!(f, "{}", joined.join(&FILTER_CODE_SEPARATOR.to_string()))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenotypeData {
    Parsed(Vec<Genotype>),
    /// FORMAT and sample columns kept as already-serialized text.
    Unparsed(String),
}

impl Default for GenotypeData {
    fn default() -> Self {
        GenotypeData::Parsed(Vec::new())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantRecord {
    contig: String,
    position: u64,
    id: Option<String>,
    reference: Allele,
    alternates: Vec<Allele>,
    log10_p_error: Option<f64>,
    filter: FilterStatus,
    info: BTreeMap<String, FieldValue>,
    genotypes: GenotypeData,
}

impl VariantRecord {
    pub fn new(contig: impl Into<String>, position: u64, reference: Allele) -> Self {
        Self {
            contig: contig.into(),
            position,
            id: None,
            reference,
            alternates: Vec::new(),
            log10_p_error: None,
            filter: FilterStatus::NotEvaluated,
            info: BTreeMap::new(),
            genotypes: GenotypeData::default(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_alternates(mut self, alternates: Vec<Allele>) -> Self {
        self.alternates = alternates;
        self
    }

    pub fn with_log10_p_error(mut self, log10_p_error: f64) -> Self {
        self.log10_p_error = Some(log10_p_error);
        self
    }

    pub fn with_phred_qual(self, qual: f64) -> Self {
        self.with_log10_p_error(qual / -10.0)
    }

    pub fn with_filter(mut self, filter: FilterStatus) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_info(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.info.insert(key.into(), value.into());
        self
    }

    pub fn with_genotypes(mut self, genotypes: Vec<Genotype>) -> Self {
        self.genotypes = GenotypeData::Parsed(genotypes);
        self
    }

    pub fn with_unparsed_genotypes(mut self, genotypes: impl Into<String>) -> Self {
        self.genotypes = GenotypeData::Unparsed(genotypes.into());
        self
    }

    pub fn contig(&self) -> &str {
        &self.contig
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    /// The identifier, or `None` when empty or the missing sentinel.
    pub fn id(&self) -> Option<&str> {
        self.id
            .as_deref()
            .filter(|id| !id.is_empty() && *id != EMPTY_ID_FIELD)
    }

    pub fn reference(&self) -> &Allele {
        &self.reference
    }

    pub fn alternates(&self) -> &[Allele] {
        &self.alternates
    }

    /// Reference first, then alternates in declared order.
    pub fn alleles(&self) -> impl Iterator<Item = &Allele> {
        iter::once(&self.reference).chain(self.alternates.iter())
    }

    pub fn is_variant(&self) -> bool {
        !self.alternates.is_empty()
    }

    pub fn log10_p_error(&self) -> Option<f64> {
        self.log10_p_error
    }

    pub fn phred_scaled_qual(&self) -> Option<f64> {
        self.log10_p_error.map(|log10| log10 * -10.0)
    }

    pub fn filter(&self) -> &FilterStatus {
        &self.filter
    }

    pub fn info(&self) -> &BTreeMap<String, FieldValue> {
        &self.info
    }

    pub fn genotype_data(&self) -> &GenotypeData {
        &self.genotypes
    }

    /// Decoded genotypes; empty for unparsed genotype data.
    pub fn genotypes(&self) -> &[Genotype] {
        match &self.genotypes {
            GenotypeData::Parsed(genotypes) => genotypes,
            GenotypeData::Unparsed(_) => &[],
        }
    }

    pub fn genotype(&self, sample: &str) -> Option<&Genotype> {
        self.genotypes()
            .iter()
            .find(|genotype| genotype.sample_name == sample)
    }

    pub fn has_genotypes(&self) -> bool {
        match &self.genotypes {
            GenotypeData::Parsed(genotypes) => !genotypes.is_empty(),
            GenotypeData::Unparsed(text) => !text.is_empty(),
        }
    }
}

impl fmt::Display for VariantRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "(contig: {}, pos: {}, id: {}, ref: {})",
            self.contig,
            self.position,
            self.id().unwrap_or(EMPTY_ID_FIELD),
            self.reference.display_string()
        )
    }
}
