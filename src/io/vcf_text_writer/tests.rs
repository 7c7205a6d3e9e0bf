use super::VcfTextWriter;
use crate::{
    core::{
        allele::Allele,
        genotype::Genotype,
        header::{FieldDefinition, FieldType, ValueCount, VcfHeader},
        value::FieldValue,
        variant::{FilterStatus, VariantRecord},
    },
    error::{FieldKind, VcfxError},
    io::writer::{VariantContextWriter, WriterOptions},
    utils::util::init_logger,
};
use rust_htslib::bcf::{self, record::GenotypeAllele, Read};
use std::sync::Arc;

fn info(id: &str, number: ValueCount, field_type: FieldType) -> FieldDefinition {
    FieldDefinition::new(id, number, field_type, format!("{id} description"))
}

fn format(id: &str, number: ValueCount, field_type: FieldType) -> FieldDefinition {
    FieldDefinition::new(id, number, field_type, format!("{id} description"))
}

fn base_header() -> VcfHeader {
    VcfHeader::default()
        .with_contig("1", Some(10_000))
        .with_info(info("DP", ValueCount::Fixed(1), FieldType::Integer))
        .with_info(info("DB", ValueCount::Fixed(0), FieldType::Flag))
        .with_info(info("NS", ValueCount::Fixed(1), FieldType::Integer))
        .with_format(format("GT", ValueCount::Fixed(1), FieldType::String))
        .with_format(format("GQ", ValueCount::Fixed(1), FieldType::Integer))
        .with_format(format("DP", ValueCount::Fixed(1), FieldType::Integer))
        .with_format(format("AD", ValueCount::PerAllele, FieldType::Integer))
        .with_format(format("PL", ValueCount::PerGenotype, FieldType::Integer))
        .with_format(format("FT", ValueCount::Fixed(1), FieldType::String))
        .with_format(format("HQ", ValueCount::Fixed(2), FieldType::Integer))
        .with_format(format("XG", ValueCount::Fixed(1), FieldType::Integer))
        .with_filter("q10", "Quality below 10")
        .with_filter("s50", "Less than 50% of samples have data")
}

fn header_with_samples(samples: &[&str]) -> VcfHeader {
    samples
        .iter()
        .fold(base_header(), |header, sample| header.with_sample(*sample))
}

fn snv() -> VariantRecord {
    VariantRecord::new("1", 100, Allele::reference("A")).with_alternates(vec![Allele::alternate("T")])
}

fn het(sample: &str) -> Genotype {
    Genotype::new(sample).with_alleles(vec![Allele::reference("A"), Allele::alternate("T")])
}

fn open_writer(header: VcfHeader, options: WriterOptions) -> VcfTextWriter<Vec<u8>> {
    init_logger();
    let mut writer = VcfTextWriter::new(Vec::new(), "memory", options);
    writer
        .write_header(Arc::new(header))
        .expect("header should be written");
    writer
}

fn output(writer: VcfTextWriter<Vec<u8>>) -> String {
    String::from_utf8(writer.into_inner()).expect("output should be UTF-8")
}

fn record_lines(text: &str) -> Vec<&str> {
    text.lines().filter(|line| !line.starts_with('#')).collect()
}

fn write_single(header: VcfHeader, record: &VariantRecord) -> String {
    let mut writer = open_writer(header, WriterOptions::default());
    writer.add(record).expect("record should be written");
    let text = output(writer);
    record_lines(&text)
        .first()
        .map(|line| line.to_string())
        .expect("one record line should be written")
}

#[test]
fn header_starts_with_version_and_sorted_metadata() {
    let header = header_with_samples(&["S1", "S2"]).with_line(
        crate::core::header::HeaderLine::Other {
            key: "fileformat".to_string(),
            value: "VCFv4.3".to_string(),
        },
    );
    let writer = open_writer(header, WriterOptions::default());
    let text = output(writer);
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], "##fileformat=VCFv4.1");
    assert_eq!(
        lines.iter().filter(|line| line.starts_with("##fileformat")).count(),
        1
    );
    let metadata: Vec<&str> = lines[1..lines.len() - 1].to_vec();
    let mut sorted = metadata.clone();
    sorted.sort();
    assert_eq!(metadata, sorted);
    assert_eq!(
        *lines.last().expect("column line should exist"),
        "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\tS2"
    );
}

#[test]
fn header_without_samples_has_no_format_column() {
    let writer = open_writer(base_header(), WriterOptions::default());
    let text = output(writer);
    assert!(text.ends_with("#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n"));
}

#[test]
fn end_to_end_single_sample_line() {
    let record = snv().with_info("DP", 30).with_genotypes(vec![het("S1")]);
    let line = write_single(header_with_samples(&["S1"]), &record);
    assert_eq!(line, "1\t100\t.\tA\tT\t.\t.\tDP=30\tGT\t0/1");
}

#[test]
fn monomorphic_record_writes_missing_alt_and_trimmed_qual() {
    let record = VariantRecord::new("1", 200, Allele::reference("G"))
        .with_id("rs42")
        .with_phred_qual(50.0)
        .with_filter(FilterStatus::Passed);
    let line = write_single(base_header(), &record);
    assert_eq!(line, "1\t200\trs42\tG\t.\t50\tPASS\t.");
}

#[test]
fn multi_allelic_columns_and_fractional_qual() {
    let record = VariantRecord::new("1", 300, Allele::reference("A"))
        .with_alternates(vec![Allele::alternate("G"), Allele::alternate("T")])
        .with_phred_qual(10.55)
        .with_filter(FilterStatus::failed(["s50", "q10"]));
    let line = write_single(base_header(), &record);
    assert_eq!(line, "1\t300\t.\tA\tG,T\t10.55\tq10;s50\t.");
}

#[test]
fn info_flags_and_zero_count_keys_are_bare() {
    let record = snv()
        .with_info("DB", true)
        .with_info("NS", 3)
        .with_info("DP", 14);
    let line = write_single(base_header(), &record);
    assert!(line.ends_with("\tDB;DP=14;NS=3"), "{line}");

    let record = snv().with_info("DB", false);
    let line = write_single(base_header(), &record);
    assert!(line.ends_with("\t."), "{line}");
}

#[test]
fn strict_mode_rejects_undeclared_info_key() {
    let mut writer = open_writer(base_header(), WriterOptions::default());
    let record = snv().with_info("AF", 0.5);
    let err = writer.add(&record).unwrap_err();
    assert!(matches!(
        err,
        VcfxError::MissingHeaderField { kind: FieldKind::Info, ref key, .. } if key == "AF"
    ));
    let message = err.to_string();
    assert!(message.contains("AF") && message.contains("1:100"), "{message}");

    // nothing of the failed record reaches the sink
    assert!(record_lines(&output(writer)).is_empty());
}

#[test]
fn lenient_mode_writes_undeclared_info_key() {
    let options = WriterOptions::new().with(|o| o.allow_missing_fields_in_header = true);
    let mut writer = open_writer(base_header(), options);
    let record = snv()
        .with_info("AF", 0.5)
        .with_filter(FilterStatus::failed(["LowQual"]));
    writer.add(&record).expect("lenient writer should accept record");
    let text = output(writer);
    assert_eq!(record_lines(&text), vec!["1\t100\t.\tA\tT\t.\tLowQual\tAF=0.500"]);
}

#[test]
fn strict_mode_rejects_undeclared_filter_and_format() {
    let mut writer = open_writer(base_header(), WriterOptions::default());
    let record = snv().with_filter(FilterStatus::failed(["LowQual"]));
    assert!(matches!(
        writer.add(&record),
        Err(VcfxError::MissingHeaderField { kind: FieldKind::Filter, .. })
    ));

    let mut writer = open_writer(header_with_samples(&["S1"]), WriterOptions::default());
    let record = snv().with_genotypes(vec![het("S1").with_attribute("ZZ", 1)]);
    assert!(matches!(
        writer.add(&record),
        Err(VcfxError::MissingHeaderField { kind: FieldKind::Format, ref key, .. }) if key == "ZZ"
    ));
}

#[test]
fn trailing_missing_values_are_stripped() {
    let record = snv().with_genotypes(vec![
        het("S1"),
        het("S2").with_gq(40).with_dp(12),
    ]);
    let line = write_single(header_with_samples(&["S1", "S2"]), &record);
    assert_eq!(line, "1\t100\t.\tA\tT\t.\t.\t.\tGT:DP:GQ\t0/1\t0/1:12:40");
}

#[test]
fn missing_multi_valued_field_is_padded() {
    let record = snv().with_genotypes(vec![
        het("S1").with_attribute("XG", 5),
        het("S2")
            .with_attribute("HQ", vec![10, 12])
            .with_attribute("XG", 7),
    ]);
    let line = write_single(header_with_samples(&["S1", "S2"]), &record);
    assert_eq!(
        line,
        "1\t100\t.\tA\tT\t.\t.\t.\tGT:HQ:XG\t0/1:.,.:5\t0/1:10,12:7"
    );
}

#[test]
fn fast_fields_and_genotype_filters() {
    let record = snv().with_genotypes(vec![
        het("S1")
            .with_ad(vec![10, 5])
            .with_pl(vec![30, 0, 300])
            .with_filter(FilterStatus::failed(["q10"])),
        het("S2").with_ad(vec![3, 9]).with_pl(vec![200, 10, 0]),
    ]);
    let line = write_single(header_with_samples(&["S1", "S2"]), &record);
    assert_eq!(
        line,
        "1\t100\t.\tA\tT\t.\t.\t.\tGT:AD:FT:PL\t0/1:10,5:q10:30,0,300\t0/1:3,9:PASS:200,10,0"
    );
}

#[test]
fn partly_missing_fast_field_falls_back_to_attribute() {
    let record = snv().with_genotypes(vec![
        het("S1").with_attribute("AD", vec![FieldValue::Missing, FieldValue::Integer(5)]),
        het("S2"),
    ]);
    let line = write_single(header_with_samples(&["S1", "S2"]), &record);
    assert_eq!(line, "1\t100\t.\tA\tT\t.\t.\t.\tGT:AD\t0/1:.,5\t0/1");
}

#[test]
fn empty_failed_filter_sets_write_pass() {
    let record = snv()
        .with_filter(FilterStatus::Failed(Default::default()))
        .with_genotypes(vec![het("S1").with_filter(FilterStatus::Failed(Default::default()))]);
    let line = write_single(header_with_samples(&["S1"]), &record);
    assert_eq!(line, "1\t100\t.\tA\tT\t.\tPASS\t.\tGT\t0/1");
}

#[test]
fn phased_and_no_call_alleles() {
    let record = snv().with_genotypes(vec![
        Genotype::new("S1")
            .with_phased_alleles(vec![Allele::alternate("T"), Allele::reference("A")]),
        Genotype::new("S2").with_alleles(vec![Allele::no_call(), Allele::no_call()]),
    ]);
    let line = write_single(header_with_samples(&["S1", "S2"]), &record);
    assert_eq!(line, "1\t100\t.\tA\tT\t.\t.\t.\tGT\t1|0\t./.");
}

#[test]
fn missing_samples_are_reported_together() {
    let mut writer = open_writer(header_with_samples(&["S1", "S2", "S3"]), WriterOptions::default());
    let record = snv().with_genotypes(vec![het("S2")]);
    let err = writer.add(&record).unwrap_err();
    assert!(matches!(
        err,
        VcfxError::MissingSamples { ref samples, position: 100, .. } if samples == &["S1", "S3"]
    ));
    assert!(record_lines(&output(writer)).is_empty());
}

#[test]
fn sample_without_calls_fails_when_gt_is_written() {
    let mut writer = open_writer(header_with_samples(&["S1", "S2"]), WriterOptions::default());
    let record = snv().with_genotypes(vec![het("S1"), Genotype::new("S2").with_gq(10)]);
    assert!(matches!(
        writer.add(&record),
        Err(VcfxError::MissingGenotypeCalls { ref sample, .. }) if sample == "S2"
    ));
}

#[test]
fn undeclared_called_allele_fails() {
    let mut writer = open_writer(header_with_samples(&["S1"]), WriterOptions::default());
    let record = snv().with_genotypes(vec![Genotype::new("S1")
        .with_alleles(vec![Allele::reference("A"), Allele::alternate("C")])]);
    assert!(matches!(
        writer.add(&record),
        Err(VcfxError::UnknownAllele { ref allele, .. }) if allele == "C"
    ));
}

#[test]
fn unparsed_genotypes_pass_through() {
    let record = snv().with_unparsed_genotypes("GT:GQ\t0/1:35\t1/1:.");
    let line = write_single(header_with_samples(&["S1", "S2"]), &record);
    assert_eq!(line, "1\t100\t.\tA\tT\t.\t.\t.\tGT:GQ\t0/1:35\t1/1:.");
}

#[test]
fn header_samples_get_gt_when_record_has_no_genotypes() {
    let mut writer = open_writer(header_with_samples(&["S1"]), WriterOptions::default());
    assert!(matches!(
        writer.add(&snv()),
        Err(VcfxError::MissingSamples { .. })
    ));
}

#[test]
fn sites_only_drops_samples_and_genotypes() {
    let options = WriterOptions::new().with(|o| o.sites_only = true);
    let mut writer = open_writer(header_with_samples(&["S1"]), options);
    let record = snv().with_genotypes(vec![het("S1")]);
    writer.add(&record).expect("record should be written");
    writer
        .add(&snv().with_unparsed_genotypes("GT\t0/1"))
        .expect("record should be written");
    let text = output(writer);
    assert!(text.contains("#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n"));
    assert_eq!(
        record_lines(&text),
        vec!["1\t100\t.\tA\tT\t.\t.\t.", "1\t100\t.\tA\tT\t.\t.\t."]
    );
}

#[test]
fn lifecycle_misuse_is_rejected() {
    init_logger();
    let mut writer = VcfTextWriter::new(Vec::new(), "memory", WriterOptions::default());
    assert!(matches!(
        writer.add(&snv()),
        Err(VcfxError::HeaderNotWritten { .. })
    ));
    assert!(matches!(
        writer.close(),
        Err(VcfxError::HeaderNotWritten { .. })
    ));

    let header = Arc::new(base_header());
    writer
        .write_header(header.clone())
        .expect("header should be written");
    assert!(matches!(
        writer.write_header(header),
        Err(VcfxError::HeaderAlreadyWritten { .. })
    ));

    writer.add(&snv()).expect("record should be written");
    assert_eq!(writer.records_written(), 1);
    writer.close().expect("writer should close");
    assert!(matches!(writer.add(&snv()), Err(VcfxError::WriterClosed { .. })));
    assert!(matches!(writer.close(), Err(VcfxError::WriterClosed { .. })));
}

#[test]
fn written_file_reads_back_with_htslib() {
    init_logger();
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let path = dir.path().join("round_trip.vcf");
    let file = std::fs::File::create(&path).expect("output should be created");

    let header = header_with_samples(&["S1", "S2"]);
    let records = vec![
        snv()
            .with_id("rs1")
            .with_phred_qual(30.0)
            .with_filter(FilterStatus::Passed)
            .with_info("DP", 25)
            .with_genotypes(vec![
                het("S1").with_gq(40),
                Genotype::new("S2")
                    .with_phased_alleles(vec![Allele::alternate("T"), Allele::alternate("T")])
                    .with_gq(20),
            ]),
        VariantRecord::new("1", 250, Allele::reference("C"))
            .with_alternates(vec![Allele::alternate("G"), Allele::alternate("CT")])
            .with_filter(FilterStatus::failed(["q10"]))
            .with_genotypes(vec![
                Genotype::new("S1")
                    .with_alleles(vec![Allele::alternate("G"), Allele::alternate("CT")]),
                Genotype::new("S2").with_alleles(vec![Allele::no_call(), Allele::no_call()]),
            ]),
    ];

    let mut writer = VcfTextWriter::new(file, path.display().to_string(), WriterOptions::default());
    writer
        .write_header(Arc::new(header))
        .expect("header should be written");
    for record in &records {
        writer.add(record).expect("record should be written");
    }
    writer.close().expect("writer should close");
    drop(writer);

    let mut reader = bcf::Reader::from_path(&path).expect("htslib should open output");
    let samples: Vec<String> = reader
        .header()
        .samples()
        .iter()
        .map(|s| String::from_utf8_lossy(s).into_owned())
        .collect();
    assert_eq!(samples, vec!["S1", "S2"]);

    let read_back: Vec<bcf::Record> = reader
        .records()
        .map(|record| record.expect("record should parse"))
        .collect();
    assert_eq!(read_back.len(), 2);

    let first = &read_back[0];
    let contig = first
        .header()
        .rid2name(first.rid().expect("record rid should exist"))
        .expect("rid should map to contig");
    assert_eq!(contig, b"1");
    assert_eq!(first.pos(), 99);
    assert_eq!(first.id(), b"rs1".to_vec());
    assert_eq!(first.alleles(), vec![&b"A"[..], &b"T"[..]]);
    let filters: Vec<Vec<u8>> = first
        .filters()
        .map(|id| first.header().id_to_name(id))
        .collect();
    assert_eq!(filters, vec![b"PASS".to_vec()]);
    let genotypes = first.genotypes().expect("genotypes should decode");
    let s1: Vec<GenotypeAllele> = genotypes.get(0).iter().copied().collect();
    assert_eq!(s1, vec![GenotypeAllele::Unphased(0), GenotypeAllele::Unphased(1)]);
    let s2: Vec<GenotypeAllele> = genotypes.get(1).iter().copied().collect();
    assert_eq!(s2.iter().map(|a| a.index()).collect::<Vec<_>>(), vec![Some(1), Some(1)]);
    assert_eq!(s2[1], GenotypeAllele::Phased(1));

    let second = &read_back[1];
    assert_eq!(second.pos(), 249);
    assert_eq!(second.alleles(), vec![&b"C"[..], &b"G"[..], &b"CT"[..]]);
    let filters: Vec<Vec<u8>> = second
        .filters()
        .map(|id| second.header().id_to_name(id))
        .collect();
    assert_eq!(filters, vec![b"q10".to_vec()]);
    let genotypes = second.genotypes().expect("genotypes should decode");
    let s1: Vec<Option<u32>> = genotypes.get(0).iter().map(|allele| allele.index()).collect();
    assert_eq!(s1, vec![Some(1), Some(2)]);
    let s2: Vec<Option<u32>> = genotypes.get(1).iter().map(|allele| allele.index()).collect();
    assert_eq!(s2, vec![None, None]);
}
