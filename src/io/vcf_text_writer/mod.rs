use crate::{
    constants::{
        EMPTY_ALTERNATE_ALLELE_FIELD, EMPTY_ID_FIELD, EMPTY_INFO_FIELD, FIELD_SEPARATOR,
        FILE_FORMAT_KEY, FORMAT_HEADER_FIELD, GENOTYPE_FIELD_SEPARATOR, GENOTYPE_FILTER_KEY,
        GENOTYPE_KEY, HEADER_FIELDS, HEADER_INDICATOR, INFO_FIELD_SEPARATOR, LIST_SEPARATOR,
        METADATA_INDICATOR, MISSING_VALUE, PASSES_FILTERS, PHASED, UNPHASED, VCF_VERSION,
    },
    core::{
        allele::AlleleMap,
        genotype::Genotype,
        header::VcfHeader,
        value::FieldValue,
        variant::{GenotypeData, VariantRecord},
    },
    encode::{
        fast_fields::{format_int_array, FastFieldAccessors},
        format::{format_qual_value, format_vcf_field, is_missing_value, missing_values},
        genotype_keys::calc_vcf_genotype_keys,
        validation::{check_samples, validate_filters, validate_format_keys, validate_info},
    },
    error::VcfxError,
    io::writer::{VariantContextWriter, WriterOptions, WriterState},
    utils::util::Result,
};
use std::{io::Write, sync::Arc};

/// Writes records as tab-delimited VCF text.
pub struct VcfTextWriter<W: Write> {
    sink: W,
    stream: String,
    options: WriterOptions,
    state: WriterState,
    records_written: u64,
    line: String,
}

impl<W: Write> VcfTextWriter<W> {
    pub fn new(sink: W, stream: impl Into<String>, options: WriterOptions) -> Self {
        Self {
            sink,
            stream: stream.into(),
            options,
            state: WriterState::default(),
            records_written: 0,
            line: String::new(),
        }
    }

    /// Gives back the sink, e.g. to inspect an in-memory buffer.
    pub fn into_inner(self) -> W {
        self.sink
    }

    fn lenient(&self) -> bool {
        self.options.allow_missing_fields_in_header
    }

    fn render_header(header: &VcfHeader) -> String {
        let mut text = String::new();
        text.push_str(&format!(
            "{METADATA_INDICATOR}{FILE_FORMAT_KEY}={VCF_VERSION}\n"
        ));
        for line in header.metadata_in_sorted_order() {
            if line.is_file_format() {
                continue;
            }
            text.push_str(&format!("{METADATA_INDICATOR}{line}\n"));
        }

        text.push_str(HEADER_INDICATOR);
        text.push_str(&HEADER_FIELDS.join(&FIELD_SEPARATOR.to_string()));
        if header.has_genotyping_data() {
            text.push(FIELD_SEPARATOR);
            text.push_str(FORMAT_HEADER_FIELD);
            for sample in header.samples() {
                text.push(FIELD_SEPARATOR);
                text.push_str(sample);
            }
        }
        text.push('\n');
        text
    }

    /// Formats `record` into `self.line` without touching the sink.
    fn render_record(&mut self, record: &VariantRecord, header: &VcfHeader) -> Result<()> {
        let lenient = self.lenient();
        let line = &mut self.line;
        line.clear();

        let alleles = AlleleMap::build(record);

        line.push_str(record.contig());
        line.push(FIELD_SEPARATOR);
        line.push_str(&record.position().to_string());
        line.push(FIELD_SEPARATOR);
        line.push_str(record.id().unwrap_or(EMPTY_ID_FIELD));
        line.push(FIELD_SEPARATOR);
        line.push_str(record.reference().display_string());
        line.push(FIELD_SEPARATOR);

        if record.is_variant() {
            for (i, alt) in record.alternates().iter().enumerate() {
                if i > 0 {
                    line.push(LIST_SEPARATOR);
                }
                line.push_str(alt.display_string());
            }
        } else {
            line.push_str(EMPTY_ALTERNATE_ALLELE_FIELD);
        }
        line.push(FIELD_SEPARATOR);

        match record.phred_scaled_qual() {
            Some(qual) => line.push_str(&format_qual_value(qual)),
            None => line.push_str(MISSING_VALUE),
        }
        line.push(FIELD_SEPARATOR);

        validate_filters(record, header, lenient)?;
        line.push_str(&record.filter().to_string());
        line.push(FIELD_SEPARATOR);

        validate_info(record, header, lenient)?;
        write_info(line, record, header);

        if self.options.sites_only {
            return Ok(());
        }

        match record.genotype_data() {
            GenotypeData::Unparsed(text) => {
                if !text.is_empty() {
                    line.push(FIELD_SEPARATOR);
                    line.push_str(text);
                }
            }
            GenotypeData::Parsed(_) => {
                let keys = calc_vcf_genotype_keys(record, header);
                if keys.is_empty() {
                    return Ok(());
                }
                validate_format_keys(&keys, record, header, lenient)?;
                line.push(FIELD_SEPARATOR);
                line.push_str(&keys.join(&GENOTYPE_FIELD_SEPARATOR.to_string()));
                check_samples(record, header)?;
                write_genotypes(line, record, header, &alleles, &keys)?;
            }
        }
        Ok(())
    }
}

fn write_info(line: &mut String, record: &VariantRecord, header: &VcfHeader) {
    let mut first = true;
    for (key, value) in record.info() {
        let Some(text) = format_vcf_field(value) else {
            continue;
        };
        if !first {
            line.push(INFO_FIELD_SEPARATOR);
        }
        first = false;

        line.push_str(key);
        let bare_key = text.is_empty()
            || header
                .info_line(key)
                .is_some_and(|def| def.is_flag_count());
        if !bare_key {
            line.push('=');
            line.push_str(&text);
        }
    }
    if first {
        line.push_str(EMPTY_INFO_FIELD);
    }
}

fn write_genotypes(
    line: &mut String,
    record: &VariantRecord,
    header: &VcfHeader,
    alleles: &AlleleMap,
    keys: &[String],
) -> Result<()> {
    let has_gt = keys.iter().any(|key| key == GENOTYPE_KEY);
    let n_alt = record.alternates().len();

    for sample in header.samples() {
        line.push(FIELD_SEPARATOR);
        let genotype = record
            .genotype(sample)
            .ok_or_else(|| VcfxError::MissingSamples {
                samples: vec![sample.clone()],
                contig: record.contig().to_string(),
                position: record.position(),
            })?;

        let mut values: Vec<String> = Vec::with_capacity(keys.len());
        for key in keys {
            if key == GENOTYPE_KEY {
                write_alleles(line, record, genotype, alleles)?;
                continue;
            }
            if let Some(value) = genotype_value(genotype, key, header, n_alt) {
                values.push(value);
            }
        }

        while values.last().is_some_and(|value| is_missing_value(value)) {
            values.pop();
        }

        for (i, value) in values.iter().enumerate() {
            if i > 0 || has_gt {
                line.push(GENOTYPE_FIELD_SEPARATOR);
            }
            line.push_str(value);
        }
    }
    Ok(())
}

fn write_alleles(
    line: &mut String,
    record: &VariantRecord,
    genotype: &Genotype,
    alleles: &AlleleMap,
) -> Result<()> {
    if !genotype.is_available() {
        return Err(VcfxError::MissingGenotypeCalls {
            sample: genotype.sample_name.clone(),
            contig: record.contig().to_string(),
            position: record.position(),
        });
    }
    for (i, call) in genotype.calls.iter().enumerate() {
        if i > 0 {
            line.push(if call.phased { PHASED } else { UNPHASED });
        }
        line.push_str(alleles.encode(&call.allele)?);
    }
    Ok(())
}

/// Text for a non-GT FORMAT key, or `None` when the value is omitted.
fn genotype_value(
    genotype: &Genotype,
    key: &str,
    header: &VcfHeader,
    n_alt: usize,
) -> Option<String> {
    if key == GENOTYPE_FILTER_KEY {
        return Some(if genotype.filter.is_failed() {
            genotype.filter.to_string()
        } else {
            PASSES_FILTERS.to_string()
        });
    }
    if let Some(accessor) = FastFieldAccessors::get(key) {
        // partly missing vectors are carried as attributes instead
        if let Some(values) = accessor(genotype) {
            return Some(format_int_array(Some(values)));
        }
        if !genotype.attributes.contains_key(key) {
            return Some(format_int_array(None));
        }
    }

    let value = genotype.attributes.get(key);
    let is_missing = match value {
        None | Some(FieldValue::Missing) => true,
        Some(FieldValue::Text(text)) => text == MISSING_VALUE,
        Some(_) => false,
    };
    if is_missing {
        let count = header.format_count(key, n_alt).unwrap_or(1);
        return Some(missing_values(count));
    }
    value.and_then(format_vcf_field)
}

impl<W: Write> VariantContextWriter for VcfTextWriter<W> {
    fn write_header(&mut self, header: Arc<VcfHeader>) -> Result<()> {
        let header = if self.options.sites_only {
            Arc::new(header.without_samples())
        } else {
            header
        };
        let text = Self::render_header(&header);
        self.state.open(header, &self.stream)?;

        self.sink.write_all(text.as_bytes())?;
        self.sink.flush()?;
        log::debug!("Writer: wrote VCF header to {}", self.stream);
        Ok(())
    }

    fn add(&mut self, record: &VariantRecord) -> Result<()> {
        let header = self.state.header(&self.stream)?;
        log::trace!("Writer: adding {}", record);

        self.render_record(record, &header)?;
        self.line.push('\n');
        self.sink.write_all(self.line.as_bytes())?;
        self.sink.flush()?;
        self.records_written += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.state.close(&self.stream)?;
        self.sink.flush()?;
        log::debug!(
            "Writer: closed {} after {} records",
            self.stream,
            self.records_written
        );
        Ok(())
    }

    fn records_written(&self) -> u64 {
        self.records_written
    }
}

#[cfg(test)]
mod tests;
