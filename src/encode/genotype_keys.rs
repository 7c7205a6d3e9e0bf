use crate::{
    constants::{
        DEPTH_KEY, GENOTYPE_ALLELE_DEPTHS, GENOTYPE_FILTER_KEY, GENOTYPE_KEY, GENOTYPE_PL_KEY,
        GENOTYPE_QUALITY_KEY,
    },
    core::{header::VcfHeader, variant::VariantRecord},
};
use std::collections::BTreeSet;

/// Ordered FORMAT keys for `record`.
///
/// Keys present in any genotype are sorted; `GT` is placed first whenever a
/// genotype carries allele calls. A record without any per-sample values
/// still gets `GT` when the header declares samples.
pub fn calc_vcf_genotype_keys(record: &VariantRecord, header: &VcfHeader) -> Vec<String> {
    let mut keys: BTreeSet<&str> = BTreeSet::new();
    let mut saw_calls = false;

    for genotype in record.genotypes() {
        keys.extend(genotype.attributes.keys().map(String::as_str));
        if genotype.gq.is_some() {
            keys.insert(GENOTYPE_QUALITY_KEY);
        }
        if genotype.dp.is_some() {
            keys.insert(DEPTH_KEY);
        }
        if genotype.ad.is_some() {
            keys.insert(GENOTYPE_ALLELE_DEPTHS);
        }
        if genotype.pl.is_some() {
            keys.insert(GENOTYPE_PL_KEY);
        }
        if genotype.is_filtered() {
            keys.insert(GENOTYPE_FILTER_KEY);
        }
        saw_calls |= genotype.is_available();
    }

    // GT as an attribute would otherwise land in sorted position
    keys.remove(GENOTYPE_KEY);

    let mut ordered = Vec::with_capacity(keys.len() + 1);
    if saw_calls {
        ordered.push(GENOTYPE_KEY.to_string());
    }
    ordered.extend(keys.into_iter().map(str::to_string));

    if ordered.is_empty() && header.has_genotyping_data() {
        ordered.push(GENOTYPE_KEY.to_string());
    }
    ordered
}
