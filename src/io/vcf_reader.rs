use crate::{
    constants::{
        DEPTH_KEY, GENOTYPE_ALLELE_DEPTHS, GENOTYPE_FILTER_KEY, GENOTYPE_KEY, GENOTYPE_PL_KEY,
        GENOTYPE_QUALITY_KEY, LIST_SEPARATOR, MISSING_VALUE, PASSES_FILTERS,
    },
    core::{
        allele::Allele,
        genotype::{AlleleCall, Genotype},
        header::{FieldDefinition, FieldType, HeaderLine, ValueCount, VcfHeader},
        value::FieldValue,
        variant::{FilterStatus, VariantRecord},
    },
    utils::util::{Result, MISSING_INTEGER, VECTOR_END_INTEGER},
};
use rust_htslib::bcf::{self, header::HeaderView, record::GenotypeAllele, HeaderRecord, Read};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

const VECTOR_END_FLOAT_BITS: u32 = 0x7F80_0002;

/// Reads VCF/BCF input through htslib and converts it into the crate's record model.
pub struct VcfReader {
    reader: bcf::Reader,
    current_record: bcf::Record,
    header: Arc<VcfHeader>,
    decode_genotypes: bool,
    path: PathBuf,
}

impl VcfReader {
    pub fn new(path: &Path, decode_genotypes: bool) -> Result<Self> {
        log::trace!("Start loading VCF {:?}", path);
        let reader = bcf::Reader::from_path(path)
            .map_err(|e| crate::vcfx_error!("Failed to open VCF file {}: {}", path.display(), e))?;
        let header = convert_header(reader.header())
            .map_err(|e| crate::vcfx_error!("Malformed header in {}: {}", path.display(), e))?;
        log::debug!(
            "Reader: {} has {} header lines and {} samples",
            path.display(),
            header.lines().len(),
            header.samples().len()
        );

        let current_record = reader.empty_record();
        Ok(Self {
            reader,
            current_record,
            header: Arc::new(header),
            decode_genotypes,
            path: path.to_path_buf(),
        })
    }

    pub fn header(&self) -> Arc<VcfHeader> {
        Arc::clone(&self.header)
    }

    /// Contig names and lengths; contigs declared without a length are left out.
    pub fn sequence_dictionary(&self) -> Vec<(String, u64)> {
        self.header
            .contigs()
            .filter_map(|contig| match contig.length {
                Some(length) => Some((contig.id.clone(), length)),
                None => {
                    log::debug!("Reader: contig {} has no declared length", contig.id);
                    None
                }
            })
            .collect()
    }

    pub fn read_next(&mut self) -> Result<Option<VariantRecord>> {
        match self.reader.read(&mut self.current_record) {
            Some(Ok(())) => convert_record(&self.current_record, &self.header, self.decode_genotypes)
                .map(Some),
            Some(Err(e)) => Err(crate::vcfx_error!(
                "Error reading record from {}: {e}",
                self.path.display()
            )),
            None => Ok(None),
        }
    }
}

impl Iterator for VcfReader {
    type Item = Result<VariantRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_next().transpose()
    }
}

fn parse_contig_header_fields(
    id: Option<&str>,
    length: Option<&str>,
) -> Result<(String, Option<u64>)> {
    let id = id
        .ok_or_else(|| crate::vcfx_error!("Contig header is missing required 'ID' field"))?
        .to_string();
    let length = match length {
        Some(length) => Some(length.parse::<u64>().map_err(|e| {
            crate::vcfx_error!("Contig '{id}' has invalid 'length' value '{length}': {e}")
        })?),
        None => None,
    };

    Ok((id, length))
}

fn unquote(text: &str) -> String {
    text.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(text)
        .replace("\\\"", "\"")
        .replace("\\\\", "\\")
}

type HeaderValues = Vec<(String, String)>;

fn lookup<'a>(values: &'a HeaderValues, key: &str) -> Option<&'a str> {
    values
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, value)| value.as_str())
}

fn required<'a>(values: &'a HeaderValues, key: &str, kind: &str) -> Result<&'a str> {
    lookup(values, key)
        .ok_or_else(|| crate::vcfx_error!("{kind} header record is missing required {key} field"))
}

/// Attributes other than `known` and htslib's own IDX, in input order.
fn extra_attributes(values: &HeaderValues, known: &[&str]) -> Vec<(String, String)> {
    values
        .iter()
        .filter(|(key, _)| key != "IDX" && !known.contains(&key.as_str()))
        .cloned()
        .collect()
}

fn parse_field_definition(kind: &str, values: &HeaderValues) -> Result<FieldDefinition> {
    let id = required(values, "ID", kind)?;
    let number: ValueCount = required(values, "Number", kind)?.parse()?;
    let field_type: FieldType = required(values, "Type", kind)?.parse()?;
    let description = lookup(values, "Description").map(unquote).unwrap_or_default();
    let mut def = FieldDefinition::new(id, number, field_type, description);
    def.extra = extra_attributes(values, &["ID", "Number", "Type", "Description"]);
    Ok(def)
}

/// Rebuilds `<K=V,...>` for structured lines htslib does not model, dropping its IDX key.
fn render_structured(values: &HeaderValues) -> String {
    let fields: Vec<String> = values
        .iter()
        .filter(|(key, _)| key != "IDX")
        .map(|(key, value)| format!("{key}={value}"))
        .collect();
    format!("<{}>", fields.join(&LIST_SEPARATOR.to_string()))
}

pub fn convert_header(view: &HeaderView) -> Result<VcfHeader> {
    let mut header = VcfHeader::default();
    for record in view.header_records() {
        header = match record {
            HeaderRecord::Info { values, .. } => {
                let values: HeaderValues = values.into_iter().collect();
                header.with_info(parse_field_definition("INFO", &values)?)
            }
            HeaderRecord::Format { values, .. } => {
                let values: HeaderValues = values.into_iter().collect();
                header.with_format(parse_field_definition("FORMAT", &values)?)
            }
            HeaderRecord::Filter { values, .. } => {
                let values: HeaderValues = values.into_iter().collect();
                let id = required(&values, "ID", "FILTER")?.to_string();
                let description = lookup(&values, "Description")
                    .map(unquote)
                    .unwrap_or_default();
                header.with_filter(id, description)
            }
            HeaderRecord::Contig { values, .. } => {
                let values: HeaderValues = values.into_iter().collect();
                let (id, length) = parse_contig_header_fields(
                    lookup(&values, "ID"),
                    lookup(&values, "length"),
                )?;
                header.with_contig_attributes(
                    id,
                    length,
                    extra_attributes(&values, &["ID", "length"]),
                )
            }
            HeaderRecord::Structured { key, values } => {
                let values: HeaderValues = values.into_iter().collect();
                header.with_line(HeaderLine::Other {
                    key,
                    value: render_structured(&values),
                })
            }
            HeaderRecord::Generic { key, value } => {
                header.with_line(HeaderLine::Other { key, value })
            }
        };
    }
    for sample in view.samples() {
        header = header.with_sample(String::from_utf8_lossy(sample).into_owned());
    }
    Ok(header)
}

fn format_record_vcf_line(record: &bcf::Record) -> Result<String> {
    let formatted =
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| record.to_vcf_string()));

    match formatted {
        Ok(Ok(vcf_line)) => Ok(vcf_line),
        Ok(Err(e)) => Err(crate::vcfx_error!("Failed to format record as VCF: {e}")),
        Err(_) => Err(crate::vcfx_error!(
            "Failed to format record as VCF: rust-htslib panicked"
        )),
    }
}

fn int_values(values: &[i32]) -> Vec<FieldValue> {
    values
        .iter()
        .take_while(|v| **v != VECTOR_END_INTEGER)
        .map(|v| match *v {
            MISSING_INTEGER => FieldValue::Missing,
            v => FieldValue::Integer(i64::from(v)),
        })
        .collect()
}

fn float_values(values: &[f32]) -> Vec<FieldValue> {
    values
        .iter()
        .take_while(|v| v.to_bits() != VECTOR_END_FLOAT_BITS)
        .map(|v| {
            if v.is_nan() {
                FieldValue::Missing
            } else {
                FieldValue::Float(f64::from(*v))
            }
        })
        .collect()
}

/// Collapses decoded values: nothing when all are missing, a scalar for one value.
fn collapse(mut values: Vec<FieldValue>) -> Option<FieldValue> {
    if values.iter().all(|v| *v == FieldValue::Missing) {
        return None;
    }
    if values.len() == 1 {
        return values.pop();
    }
    Some(FieldValue::List(values))
}

fn text_value(bytes: &[u8]) -> Option<FieldValue> {
    let text = String::from_utf8_lossy(bytes);
    if text.is_empty() || text == MISSING_VALUE {
        None
    } else {
        Some(FieldValue::Text(text.into_owned()))
    }
}

fn info_value(record: &bcf::Record, def: &FieldDefinition) -> Result<Option<FieldValue>> {
    let tag = def.id.as_bytes();
    let context = |e: rust_htslib::errors::Error| {
        crate::vcfx_error!("Error reading {} INFO from record: {e}", def.id)
    };
    let value = match def.field_type {
        FieldType::Flag => record
            .info(tag)
            .flag()
            .map_err(context)?
            .then_some(FieldValue::Flag(true)),
        FieldType::Integer => record
            .info(tag)
            .integer()
            .map_err(context)?
            .and_then(|values| collapse(int_values(&values))),
        FieldType::Float => record
            .info(tag)
            .float()
            .map_err(context)?
            .and_then(|values| collapse(float_values(&values))),
        FieldType::String | FieldType::Character => {
            record.info(tag).string().map_err(context)?.and_then(|values| {
                let joined = values.join(&(LIST_SEPARATOR as u8));
                text_value(&joined)
            })
        }
    };
    Ok(value)
}

fn filter_status(record: &bcf::Record) -> FilterStatus {
    let names: Vec<String> = record
        .filters()
        .map(|id| String::from_utf8_lossy(&record.header().id_to_name(id)).into_owned())
        .collect();
    if names.is_empty() {
        FilterStatus::NotEvaluated
    } else if names.iter().all(|name| name == PASSES_FILTERS) {
        FilterStatus::Passed
    } else {
        FilterStatus::failed(names.into_iter().filter(|name| name != PASSES_FILTERS))
    }
}

fn allele_call(gt: GenotypeAllele, alleles: &[Allele]) -> Result<AlleleCall> {
    let phased = matches!(gt, GenotypeAllele::Phased(_) | GenotypeAllele::PhasedMissing);
    let allele = match gt.index() {
        None => Allele::no_call(),
        Some(index) => alleles.get(index as usize).cloned().ok_or_else(|| {
            crate::vcfx_error!("GT allele index {index} is out of range for the record")
        })?,
    };
    Ok(AlleleCall { allele, phased })
}

fn decode_genotypes(
    record: &bcf::Record,
    header: &VcfHeader,
    alleles: &[Allele],
) -> Result<Vec<Genotype>> {
    let mut genotypes: Vec<Genotype> = header.samples().iter().map(Genotype::new).collect();

    // records without GT in FORMAT keep empty call lists
    if let Ok(gts) = record.genotypes() {
        for (i, genotype) in genotypes.iter_mut().enumerate() {
            genotype.calls = gts
                .get(i)
                .iter()
                .map(|gt| allele_call(*gt, alleles))
                .collect::<Result<Vec<_>>>()?;
        }
    }

    for def in header.format_lines() {
        if def.id == GENOTYPE_KEY {
            continue;
        }
        let tag = def.id.as_bytes();
        match def.field_type {
            FieldType::Integer => {
                let Ok(per_sample) = record.format(tag).integer() else {
                    continue;
                };
                for (genotype, values) in genotypes.iter_mut().zip(per_sample.iter()) {
                    let decoded = int_values(values);
                    let present: Vec<i32> = values
                        .iter()
                        .copied()
                        .take_while(|v| *v != VECTOR_END_INTEGER)
                        .filter(|v| *v != MISSING_INTEGER)
                        .collect();
                    if present.is_empty() {
                        continue;
                    }
                    // typed fields only hold complete vectors; gaps keep their positions
                    let complete = present.len() == decoded.len();
                    match def.id.as_str() {
                        GENOTYPE_QUALITY_KEY => genotype.gq = present.first().copied(),
                        DEPTH_KEY => genotype.dp = present.first().copied(),
                        GENOTYPE_ALLELE_DEPTHS if complete => genotype.ad = Some(present),
                        GENOTYPE_PL_KEY if complete => genotype.pl = Some(present),
                        _ => {
                            if let Some(value) = collapse(decoded) {
                                genotype.attributes.insert(def.id.clone(), value);
                            }
                        }
                    }
                }
            }
            FieldType::Float => {
                let Ok(per_sample) = record.format(tag).float() else {
                    continue;
                };
                for (genotype, values) in genotypes.iter_mut().zip(per_sample.iter()) {
                    if let Some(value) = collapse(float_values(values)) {
                        genotype.attributes.insert(def.id.clone(), value);
                    }
                }
            }
            FieldType::String | FieldType::Character => {
                let Ok(per_sample) = record.format(tag).string() else {
                    continue;
                };
                for (genotype, bytes) in genotypes.iter_mut().zip(per_sample.iter()) {
                    let Some(FieldValue::Text(text)) = text_value(bytes) else {
                        continue;
                    };
                    if def.id == GENOTYPE_FILTER_KEY {
                        genotype.filter = FilterStatus::parse(&text);
                    } else {
                        genotype
                            .attributes
                            .insert(def.id.clone(), FieldValue::Text(text));
                    }
                }
            }
            FieldType::Flag => {}
        }
    }
    Ok(genotypes)
}

pub fn convert_record(
    record: &bcf::Record,
    header: &VcfHeader,
    decode: bool,
) -> Result<VariantRecord> {
    let rid = record
        .rid()
        .ok_or_else(|| crate::vcfx_error!("Record has no contig"))?;
    let contig = String::from_utf8_lossy(record.header().rid2name(rid)?).into_owned();
    let position = u64::try_from(record.pos() + 1)
        .map_err(|_| crate::vcfx_error!("Record on {contig} has a negative position"))?;

    let alleles: Vec<Allele> = record
        .alleles()
        .iter()
        .enumerate()
        .map(|(i, bases)| {
            let bases = String::from_utf8_lossy(bases).into_owned();
            if i == 0 {
                Allele::reference(bases)
            } else {
                Allele::alternate(bases)
            }
        })
        .collect();
    let Some((reference, alternates)) = alleles.split_first() else {
        return Err(crate::vcfx_error!(
            "Record at {contig}:{position} has no reference allele"
        ));
    };

    let mut variant = VariantRecord::new(contig, position, reference.clone())
        .with_alternates(alternates.to_vec())
        .with_filter(filter_status(record));

    let id = record.id();
    if id.as_slice() != MISSING_VALUE.as_bytes() {
        variant = variant.with_id(String::from_utf8_lossy(&id).into_owned());
    }

    let qual = record.qual();
    if !qual.is_nan() {
        variant = variant.with_phred_qual(f64::from(qual));
    }

    for def in header.info_lines() {
        if let Some(value) = info_value(record, def)? {
            variant = variant.with_info(def.id.clone(), value);
        }
    }

    if !header.has_genotyping_data() {
        return Ok(variant);
    }
    if decode {
        let genotypes = decode_genotypes(record, header, &alleles)?;
        return Ok(variant.with_genotypes(genotypes));
    }

    let line = format_record_vcf_line(record)?;
    match line.trim_end_matches(['\r', '\n']).splitn(9, '\t').nth(8) {
        Some(genotype_columns) => Ok(variant.with_unparsed_genotypes(genotype_columns)),
        None => Ok(variant),
    }
}
