use crate::{
    cli::ConvertArgs,
    core::locus_shards::{LocusShards, ShardConfig},
    io::{
        vcf_reader::VcfReader,
        writer::{create_writer, OutputFormat, VariantContextWriter},
    },
    utils::util::{format_number_with_commas, Result},
};
use std::time;

/// Logs how the input's contigs would be partitioned into shards.
fn log_shard_plan(dictionary: &[(String, u64)], args: &ConvertArgs) -> Result<u64> {
    let config = ShardConfig::new(args.shard_size, args.shard_growth)?;
    let mut n_shards = 0u64;
    for shard in LocusShards::new(dictionary, &config)? {
        log::trace!("Shard plan: {}", shard);
        n_shards += 1;
    }
    log::debug!(
        "Shard plan: {} shards over {} contigs ({:?} growth from {} loci)",
        format_number_with_commas(n_shards),
        dictionary.len(),
        args.shard_growth,
        format_number_with_commas(args.shard_size)
    );
    Ok(n_shards)
}

/// Streams every record of `reader` into `writer`, header first.
pub fn write_all(reader: &mut VcfReader, writer: &mut dyn VariantContextWriter) -> Result<u64> {
    writer.write_header(reader.header())?;
    for record in reader {
        writer.add(&record?)?;
    }
    writer.close()?;
    Ok(writer.records_written())
}

pub fn convert(args: ConvertArgs) -> Result<()> {
    let start_timer = time::Instant::now();
    let mut reader = VcfReader::new(&args.input, args.decode_genotypes)?;
    log_shard_plan(&reader.sequence_dictionary(), &args)?;

    let format = OutputFormat::resolve(args.output_type, args.output.as_deref());
    let mut writer = create_writer(args.output.as_deref(), format, args.writer_options())?;
    let n_records = write_all(&mut reader, writer.as_mut())?;

    log::info!(
        "Wrote {} records as {:?} in {:.2?}",
        format_number_with_commas(n_records),
        format,
        start_timer.elapsed()
    );
    Ok(())
}
