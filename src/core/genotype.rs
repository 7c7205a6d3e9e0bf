use crate::core::{allele::Allele, value::FieldValue, variant::FilterStatus};
use std::collections::BTreeMap;

/// One allele call of a genotype.
///
/// `phased` describes the separator written before this call; it is ignored
/// on the first call.
#[derive(Debug, Clone, PartialEq)]
pub struct AlleleCall {
    pub allele: Allele,
    pub phased: bool,
}

impl AlleleCall {
    pub fn unphased(allele: Allele) -> Self {
        Self {
            allele,
            phased: false,
        }
    }

    pub fn phased(allele: Allele) -> Self {
        Self {
            allele,
            phased: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Genotype {
    pub sample_name: String,
    pub calls: Vec<AlleleCall>,
    pub gq: Option<i32>,
    pub dp: Option<i32>,
    pub ad: Option<Vec<i32>>,
    pub pl: Option<Vec<i32>>,
    pub filter: FilterStatus,
    pub attributes: BTreeMap<String, FieldValue>,
}

impl Genotype {
    pub fn new(sample_name: impl Into<String>) -> Self {
        Self {
            sample_name: sample_name.into(),
            calls: Vec::new(),
            gq: None,
            dp: None,
            ad: None,
            pl: None,
            filter: FilterStatus::NotEvaluated,
            attributes: BTreeMap::new(),
        }
    }

    /// Unphased diploid-style call list built from `alleles`.
    pub fn with_alleles(mut self, alleles: Vec<Allele>) -> Self {
        self.calls = alleles.into_iter().map(AlleleCall::unphased).collect();
        self
    }

    pub fn with_phased_alleles(mut self, alleles: Vec<Allele>) -> Self {
        self.calls = alleles.into_iter().map(AlleleCall::phased).collect();
        self
    }

    pub fn with_gq(mut self, gq: i32) -> Self {
        self.gq = Some(gq);
        self
    }

    pub fn with_dp(mut self, dp: i32) -> Self {
        self.dp = Some(dp);
        self
    }

    pub fn with_ad(mut self, ad: Vec<i32>) -> Self {
        self.ad = Some(ad);
        self
    }

    pub fn with_pl(mut self, pl: Vec<i32>) -> Self {
        self.pl = Some(pl);
        self
    }

    pub fn with_filter(mut self, filter: FilterStatus) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn ploidy(&self) -> usize {
        self.calls.len()
    }

    /// A genotype is available when it carries at least one call, no-calls included.
    pub fn is_available(&self) -> bool {
        !self.calls.is_empty()
    }

    pub fn is_filtered(&self) -> bool {
        self.filter.is_failed()
    }
}
