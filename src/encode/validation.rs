//! Checks of record content against the header contract.
//!
//! Missing header definitions are fatal unless the writer runs leniently.
//! Sample and allele checks are structural and never relaxed.

use crate::{
    core::{allele::AlleleMap, header::VcfHeader, variant::FilterStatus, variant::VariantRecord},
    error::{FieldKind, VcfxError},
    utils::util::Result,
};

/// Fails with [`VcfxError::MissingHeaderField`] when `key` has no definition
/// of the given kind, unless `lenient` is set.
pub fn check_field_in_header(
    kind: FieldKind,
    key: &str,
    record: &VariantRecord,
    header: &VcfHeader,
    lenient: bool,
) -> Result<()> {
    let declared = match kind {
        FieldKind::Info => header.has_info_line(key),
        FieldKind::Format => header.has_format_line(key),
        FieldKind::Filter => header.has_filter_line(key),
    };
    if declared {
        return Ok(());
    }
    if lenient {
        log::debug!(
            "{} key {} at {}:{} is not in the header, writing it anyway",
            kind,
            key,
            record.contig(),
            record.position()
        );
        return Ok(());
    }
    Err(VcfxError::MissingHeaderField {
        kind,
        key: key.to_string(),
        contig: record.contig().to_string(),
        position: record.position(),
    })
}

pub fn validate_filters(record: &VariantRecord, header: &VcfHeader, lenient: bool) -> Result<()> {
    if let FilterStatus::Failed(names) = record.filter() {
        for name in names {
            check_field_in_header(FieldKind::Filter, name, record, header, lenient)?;
        }
    }
    Ok(())
}

pub fn validate_info(record: &VariantRecord, header: &VcfHeader, lenient: bool) -> Result<()> {
    for key in record.info().keys() {
        check_field_in_header(FieldKind::Info, key, record, header, lenient)?;
    }
    Ok(())
}

pub fn validate_format_keys(
    keys: &[String],
    record: &VariantRecord,
    header: &VcfHeader,
    lenient: bool,
) -> Result<()> {
    for key in keys {
        check_field_in_header(FieldKind::Format, key, record, header, lenient)?;
    }
    Ok(())
}

/// Every header sample must have a genotype in the record.
///
/// Reports all absent samples at once, in header order.
pub fn check_samples(record: &VariantRecord, header: &VcfHeader) -> Result<()> {
    let missing: Vec<String> = header
        .samples()
        .iter()
        .filter(|sample| record.genotype(sample).is_none())
        .cloned()
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(VcfxError::MissingSamples {
            samples: missing,
            contig: record.contig().to_string(),
            position: record.position(),
        })
    }
}

/// Every called allele must belong to the record.
pub fn check_genotype_alleles(record: &VariantRecord, alleles: &AlleleMap) -> Result<()> {
    for genotype in record.genotypes() {
        for call in &genotype.calls {
            alleles.encode(&call.allele)?;
        }
    }
    Ok(())
}
