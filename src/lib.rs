pub mod cli;
pub mod error;

pub mod commands {
    pub mod convert;
}

pub mod core {
    pub mod allele;
    pub mod genotype;
    pub mod header;
    pub mod locus_shards;
    pub mod value;
    pub mod variant;
}

pub mod encode {
    pub mod fast_fields;
    pub mod format;
    pub mod genotype_keys;
    pub mod validation;
}

pub mod io {
    pub mod vcf_reader;
    pub mod vcf_text_writer;
    pub mod writer;
    pub mod xml_writer;
}

pub mod utils {
    pub mod util;
}

pub mod constants;

pub use constants::*;
