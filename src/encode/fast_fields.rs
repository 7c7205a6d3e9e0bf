use crate::{
    constants::{
        DEPTH_KEY, GENOTYPE_ALLELE_DEPTHS, GENOTYPE_PL_KEY, GENOTYPE_QUALITY_KEY, LIST_SEPARATOR,
        MISSING_VALUE,
    },
    core::genotype::Genotype,
};

/// Reads an integer-array field straight off a genotype.
pub type FastFieldAccessor = fn(&Genotype) -> Option<&[i32]>;

fn gq(genotype: &Genotype) -> Option<&[i32]> {
    genotype.gq.as_ref().map(std::slice::from_ref)
}

fn dp(genotype: &Genotype) -> Option<&[i32]> {
    genotype.dp.as_ref().map(std::slice::from_ref)
}

fn ad(genotype: &Genotype) -> Option<&[i32]> {
    genotype.ad.as_deref()
}

fn pl(genotype: &Genotype) -> Option<&[i32]> {
    genotype.pl.as_deref()
}

/// Name to accessor table for the inline genotype fields.
pub struct FastFieldAccessors;

impl FastFieldAccessors {
    const TABLE: [(&'static str, FastFieldAccessor); 4] = [
        (GENOTYPE_QUALITY_KEY, gq),
        (DEPTH_KEY, dp),
        (GENOTYPE_ALLELE_DEPTHS, ad),
        (GENOTYPE_PL_KEY, pl),
    ];

    pub fn get(key: &str) -> Option<FastFieldAccessor> {
        Self::TABLE
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, accessor)| *accessor)
    }

    pub fn is_fast_field(key: &str) -> bool {
        Self::get(key).is_some()
    }
}

/// Formats an extracted value: `.` when absent, the comma-joined integers otherwise.
pub fn format_int_array(values: Option<&[i32]>) -> String {
    match values {
        None | Some([]) => MISSING_VALUE.to_string(),
        Some([single]) => single.to_string(),
        Some(values) => values
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(&LIST_SEPARATOR.to_string()),
    }
}
