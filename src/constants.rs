pub const VCF_VERSION: &str = "VCFv4.1";
pub const FILE_FORMAT_KEY: &str = "fileformat";
pub const METADATA_INDICATOR: &str = "##";
pub const HEADER_INDICATOR: &str = "#";
pub const HEADER_FIELDS: [&str; 8] = ["CHROM", "POS", "ID", "REF", "ALT", "QUAL", "FILTER", "INFO"];
pub const FORMAT_HEADER_FIELD: &str = "FORMAT";

pub const GENOTYPE_KEY: &str = "GT";
pub const GENOTYPE_QUALITY_KEY: &str = "GQ";
pub const DEPTH_KEY: &str = "DP";
pub const GENOTYPE_ALLELE_DEPTHS: &str = "AD";
pub const GENOTYPE_PL_KEY: &str = "PL";
pub const GENOTYPE_FILTER_KEY: &str = "FT";

pub const MISSING_VALUE: &str = ".";
pub const EMPTY_ID_FIELD: &str = ".";
pub const EMPTY_ALTERNATE_ALLELE_FIELD: &str = ".";
pub const EMPTY_INFO_FIELD: &str = ".";
pub const UNFILTERED: &str = ".";
pub const PASSES_FILTERS: &str = "PASS";
pub const NO_CALL_ALLELE: &str = ".";

pub const FIELD_SEPARATOR: char = '\t';
pub const INFO_FIELD_SEPARATOR: char = ';';
pub const FILTER_CODE_SEPARATOR: char = ';';
pub const GENOTYPE_FIELD_SEPARATOR: char = ':';
pub const LIST_SEPARATOR: char = ',';
pub const PHASED: char = '|';
pub const UNPHASED: char = '/';

pub const XML_NAMESPACE: &str = "http://xml.1000genomes.org/";

pub const DEFAULT_LENIENT: bool = false;
pub const DEFAULT_SITES_ONLY: bool = false;
pub const DEFAULT_DECODE_GENOTYPES: bool = false;
pub const DEFAULT_SHARD_SIZE: u64 = 100_000;
