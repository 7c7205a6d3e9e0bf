use crate::{constants::FILE_FORMAT_KEY, utils::util::Result};
use std::{collections::HashMap, fmt, str::FromStr};

/// Declared number of values of an INFO or FORMAT field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueCount {
    Fixed(u32),
    PerAltAllele,
    PerAllele,
    PerGenotype,
    Unbounded,
}

impl ValueCount {
    /// Number of values expected for a record with `n_alt_alleles` alternates,
    /// or `None` when the count is unbounded.
    pub fn resolve(&self, n_alt_alleles: usize) -> Option<usize> {
        match self {
            ValueCount::Fixed(n) => Some(*n as usize),
            ValueCount::PerAltAllele => Some(n_alt_alleles),
            ValueCount::PerAllele => Some(n_alt_alleles + 1),
            ValueCount::PerGenotype => Some((n_alt_alleles + 1) * (n_alt_alleles + 2) / 2),
            ValueCount::Unbounded => None,
        }
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self, ValueCount::Fixed(_))
    }
}

impl fmt::Display for ValueCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueCount::Fixed(n) => write!(f, "{n}"),
            ValueCount::PerAltAllele => write!(f, "A"),
            ValueCount::PerAllele => write!(f, "R"),
            ValueCount::PerGenotype => write!(f, "G"),
            ValueCount::Unbounded => write!(f, "."),
        }
    }
}

impl FromStr for ValueCount {
    type Err = crate::error::VcfxError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "A" => Ok(ValueCount::PerAltAllele),
            "R" => Ok(ValueCount::PerAllele),
            "G" => Ok(ValueCount::PerGenotype),
            "." => Ok(ValueCount::Unbounded),
            _ => s
                .parse::<u32>()
                .map(ValueCount::Fixed)
                .map_err(|e| crate::vcfx_error!("Invalid header Number value '{s}': {e}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Integer,
    Float,
    Flag,
    Character,
    String,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Integer => "Integer",
            FieldType::Float => "Float",
            FieldType::Flag => "Flag",
            FieldType::Character => "Character",
            FieldType::String => "String",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = crate::error::VcfxError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Integer" => Ok(FieldType::Integer),
            "Float" => Ok(FieldType::Float),
            "Flag" => Ok(FieldType::Flag),
            "Character" => Ok(FieldType::Character),
            "String" => Ok(FieldType::String),
            _ => Err(crate::vcfx_error!("Invalid header Type value '{s}'")),
        }
    }
}

/// An INFO or FORMAT definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDefinition {
    pub id: String,
    pub number: ValueCount,
    pub field_type: FieldType,
    pub description: String,
    /// Further `key=value` attributes (e.g. `Source`, `Version`), kept in input order.
    pub extra: Vec<(String, String)>,
}

impl FieldDefinition {
    pub fn new(
        id: impl Into<String>,
        number: ValueCount,
        field_type: FieldType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            number,
            field_type,
            description: description.into(),
            extra: Vec::new(),
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push((key.into(), value.into()));
        self
    }

    /// A flag-like definition whose values are written as bare keys.
    pub fn is_flag_count(&self) -> bool {
        self.number == ValueCount::Fixed(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterDefinition {
    pub id: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContigDefinition {
    pub id: String,
    pub length: Option<u64>,
    pub index: usize,
    pub extra: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderLine {
    Info(FieldDefinition),
    Format(FieldDefinition),
    Filter(FilterDefinition),
    Contig(ContigDefinition),
    Other { key: String, value: String },
}

fn write_extra(f: &mut fmt::Formatter<'_>, extra: &[(String, String)]) -> fmt::Result {
    for (key, value) in extra {
        write!(f, ",{key}={value}")?;
    }
    Ok(())
}

fn quoted(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

impl HeaderLine {
    pub fn key(&self) -> &str {
        match self {
            HeaderLine::Info(_) => "INFO",
            HeaderLine::Format(_) => "FORMAT",
            HeaderLine::Filter(_) => "FILTER",
            HeaderLine::Contig(_) => "contig",
            HeaderLine::Other { key, .. } => key,
        }
    }

    pub fn is_file_format(&self) -> bool {
        self.key() == FILE_FORMAT_KEY
    }
}

/// Renders the line without its `##` prefix.
impl fmt::Display for HeaderLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderLine::Info(def) | HeaderLine::Format(def) => {
                write!(
                    f,
                    "{}=<ID={},Number={},Type={},Description={}",
                    self.key(),
                    def.id,
                    def.number,
                    def.field_type,
                    quoted(&def.description)
                )?;
                write_extra(f, &def.extra)?;
                write!(f, ">")
            }
            HeaderLine::Filter(def) => write!(
                f,
                "FILTER=<ID={},Description={}>",
                def.id,
                quoted(&def.description)
            ),
            HeaderLine::Contig(def) => {
                write!(f, "contig=<ID={}", def.id)?;
                if let Some(length) = def.length {
                    write!(f, ",length={length}")?;
                }
                write_extra(f, &def.extra)?;
                write!(f, ">")
            }
            HeaderLine::Other { key, value } => write!(f, "{key}={value}"),
        }
    }
}

/// The declared header of a VCF stream.
///
/// Once handed to a writer the header is shared read-only; records are
/// validated against the lookups built here.
#[derive(Debug, Clone, Default)]
pub struct VcfHeader {
    lines: Vec<HeaderLine>,
    samples: Vec<String>,
    info_index: HashMap<String, usize>,
    format_index: HashMap<String, usize>,
    filter_index: HashMap<String, usize>,
}

impl VcfHeader {
    pub fn new(lines: Vec<HeaderLine>, samples: Vec<String>) -> Self {
        let mut header = Self {
            samples,
            ..Self::default()
        };
        for line in lines {
            header.push_line(line);
        }
        header
    }

    pub fn with_line(mut self, line: HeaderLine) -> Self {
        self.push_line(line);
        self
    }

    pub fn with_sample(mut self, sample: impl Into<String>) -> Self {
        self.samples.push(sample.into());
        self
    }

    pub fn with_info(self, def: FieldDefinition) -> Self {
        self.with_line(HeaderLine::Info(def))
    }

    pub fn with_format(self, def: FieldDefinition) -> Self {
        self.with_line(HeaderLine::Format(def))
    }

    pub fn with_filter(self, id: impl Into<String>, description: impl Into<String>) -> Self {
        self.with_line(HeaderLine::Filter(FilterDefinition {
            id: id.into(),
            description: description.into(),
        }))
    }

    pub fn with_contig(self, id: impl Into<String>, length: Option<u64>) -> Self {
        self.with_contig_attributes(id, length, Vec::new())
    }

    /// Adds a contig line that carries attributes beyond `ID` and `length`, e.g. `assembly`.
    pub fn with_contig_attributes(
        self,
        id: impl Into<String>,
        length: Option<u64>,
        extra: Vec<(String, String)>,
    ) -> Self {
        let index = self.contigs().count();
        self.with_line(HeaderLine::Contig(ContigDefinition {
            id: id.into(),
            length,
            index,
            extra,
        }))
    }

    fn push_line(&mut self, line: HeaderLine) {
        let position = self.lines.len();
        match &line {
            HeaderLine::Info(def) => {
                self.info_index.insert(def.id.clone(), position);
            }
            HeaderLine::Format(def) => {
                self.format_index.insert(def.id.clone(), position);
            }
            HeaderLine::Filter(def) => {
                self.filter_index.insert(def.id.clone(), position);
            }
            HeaderLine::Contig(_) | HeaderLine::Other { .. } => {}
        }
        self.lines.push(line);
    }

    /// Copy of this header without samples, used for sites-only output.
    pub fn without_samples(&self) -> Self {
        Self {
            samples: Vec::new(),
            ..self.clone()
        }
    }

    pub fn lines(&self) -> &[HeaderLine] {
        &self.lines
    }

    /// Metadata lines sorted by their rendered text, duplicates removed.
    pub fn metadata_in_sorted_order(&self) -> Vec<&HeaderLine> {
        let mut rendered: Vec<(String, &HeaderLine)> = self
            .lines
            .iter()
            .map(|line| (line.to_string(), line))
            .collect();
        rendered.sort_by(|a, b| a.0.cmp(&b.0));
        rendered.dedup_by(|a, b| a.0 == b.0);
        rendered.into_iter().map(|(_, line)| line).collect()
    }

    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    pub fn has_genotyping_data(&self) -> bool {
        !self.samples.is_empty()
    }

    pub fn info_line(&self, key: &str) -> Option<&FieldDefinition> {
        match self.info_index.get(key).map(|&i| &self.lines[i]) {
            Some(HeaderLine::Info(def)) => Some(def),
            _ => None,
        }
    }

    pub fn format_line(&self, key: &str) -> Option<&FieldDefinition> {
        match self.format_index.get(key).map(|&i| &self.lines[i]) {
            Some(HeaderLine::Format(def)) => Some(def),
            _ => None,
        }
    }

    pub fn has_info_line(&self, key: &str) -> bool {
        self.info_index.contains_key(key)
    }

    pub fn has_format_line(&self, key: &str) -> bool {
        self.format_index.contains_key(key)
    }

    pub fn has_filter_line(&self, key: &str) -> bool {
        self.filter_index.contains_key(key)
    }

    /// Number of values a FORMAT field carries for a record with
    /// `n_alt_alleles` alternates, if the field is declared with a bounded count.
    pub fn format_count(&self, key: &str, n_alt_alleles: usize) -> Option<usize> {
        self.format_line(key)
            .and_then(|def| def.number.resolve(n_alt_alleles))
    }

    pub fn info_lines(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.lines.iter().filter_map(|line| match line {
            HeaderLine::Info(def) => Some(def),
            _ => None,
        })
    }

    pub fn format_lines(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.lines.iter().filter_map(|line| match line {
            HeaderLine::Format(def) => Some(def),
            _ => None,
        })
    }

    pub fn filter_lines(&self) -> impl Iterator<Item = &FilterDefinition> {
        self.lines.iter().filter_map(|line| match line {
            HeaderLine::Filter(def) => Some(def),
            _ => None,
        })
    }

    pub fn contigs(&self) -> impl Iterator<Item = &ContigDefinition> {
        self.lines.iter().filter_map(|line| match line {
            HeaderLine::Contig(def) => Some(def),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_header() -> VcfHeader {
        VcfHeader::default()
            .with_line(HeaderLine::Other {
                key: "fileformat".to_string(),
                value: "VCFv4.2".to_string(),
            })
            .with_contig("chr1", Some(1000))
            .with_contig("chr2", None)
            .with_info(FieldDefinition::new(
                "DP",
                ValueCount::Fixed(1),
                FieldType::Integer,
                "Total depth",
            ))
            .with_format(FieldDefinition::new(
                "PL",
                ValueCount::PerGenotype,
                FieldType::Integer,
                "Phred-scaled genotype likelihoods",
            ))
            .with_format(FieldDefinition::new(
                "HQ",
                ValueCount::Fixed(2),
                FieldType::Integer,
                "Haplotype quality",
            ))
            .with_filter("q10", "Quality below 10")
            .with_sample("S1")
    }

    #[test]
    fn header_lookups_follow_declared_lines() {
        let header = make_header();
        assert!(header.has_info_line("DP"));
        assert!(!header.has_info_line("PL"));
        assert!(header.has_format_line("PL"));
        assert!(header.has_filter_line("q10"));
        assert!(!header.has_filter_line("PASS"));
        assert_eq!(header.samples(), ["S1".to_string()]);
        assert!(header.has_genotyping_data());
        assert!(!header.without_samples().has_genotyping_data());
    }

    #[test]
    fn format_count_resolves_symbolic_numbers() {
        let header = make_header();
        assert_eq!(header.format_count("HQ", 3), Some(2));
        assert_eq!(header.format_count("PL", 1), Some(3));
        assert_eq!(header.format_count("PL", 2), Some(6));
        assert_eq!(header.format_count("XX", 1), None);
        assert_eq!(ValueCount::PerAltAllele.resolve(2), Some(2));
        assert_eq!(ValueCount::PerAllele.resolve(2), Some(3));
        assert_eq!(ValueCount::Unbounded.resolve(2), None);
    }

    #[test]
    fn header_lines_render_as_vcf_metadata() {
        let header = make_header();
        let rendered: Vec<String> = header.lines().iter().map(ToString::to_string).collect();
        assert_eq!(rendered[0], "fileformat=VCFv4.2");
        assert_eq!(rendered[1], "contig=<ID=chr1,length=1000>");
        assert_eq!(rendered[2], "contig=<ID=chr2>");
        assert_eq!(
            rendered[3],
            "INFO=<ID=DP,Number=1,Type=Integer,Description=\"Total depth\">"
        );
        assert_eq!(
            rendered[4],
            "FORMAT=<ID=PL,Number=G,Type=Integer,Description=\"Phred-scaled genotype likelihoods\">"
        );
        assert_eq!(
            rendered[6],
            "FILTER=<ID=q10,Description=\"Quality below 10\">"
        );
    }

    #[test]
    fn extra_attributes_render_after_known_keys() {
        let header = VcfHeader::default()
            .with_contig_attributes(
                "chr1",
                Some(248_956_422),
                vec![
                    ("assembly".to_string(), "GRCh38".to_string()),
                    ("md5".to_string(), "6aef897c".to_string()),
                ],
            )
            .with_info(
                FieldDefinition::new("AF", ValueCount::PerAltAllele, FieldType::Float, "Allele frequency")
                    .with_extra("Source", "\"gnomAD\"")
                    .with_extra("Version", "\"4.1\""),
            );
        let rendered: Vec<String> = header.lines().iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered[0],
            "contig=<ID=chr1,length=248956422,assembly=GRCh38,md5=6aef897c>"
        );
        assert_eq!(
            rendered[1],
            "INFO=<ID=AF,Number=A,Type=Float,Description=\"Allele frequency\",Source=\"gnomAD\",Version=\"4.1\">"
        );
    }

    #[test]
    fn sorted_metadata_is_lexicographic_and_deduplicated() {
        let header = make_header().with_filter("q10", "Quality below 10");
        let keys: Vec<&str> = header
            .metadata_in_sorted_order()
            .iter()
            .map(|line| line.key())
            .collect();
        assert_eq!(
            keys,
            vec!["FILTER", "FORMAT", "FORMAT", "INFO", "contig", "contig", "fileformat"]
        );
    }

    #[test]
    fn contig_indices_follow_declaration_order() {
        let header = make_header();
        let indices: Vec<(String, usize)> = header
            .contigs()
            .map(|contig| (contig.id.clone(), contig.index))
            .collect();
        assert_eq!(
            indices,
            vec![("chr1".to_string(), 0), ("chr2".to_string(), 1)]
        );
    }

    #[test]
    fn value_count_and_type_parse_from_header_text() {
        assert_eq!("A".parse::<ValueCount>().unwrap(), ValueCount::PerAltAllele);
        assert_eq!("3".parse::<ValueCount>().unwrap(), ValueCount::Fixed(3));
        assert!("x".parse::<ValueCount>().is_err());
        assert_eq!("Flag".parse::<FieldType>().unwrap(), FieldType::Flag);
        assert!("Blob".parse::<FieldType>().is_err());
    }
}
