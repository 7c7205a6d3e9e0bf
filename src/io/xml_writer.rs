//! Sites-only XML rendering of variant records.
//!
//! The document mirrors the VCF header (INFO, FORMAT, FILTER, contig and
//! sample declarations) followed by one `variation` element per record.
//! Genotypes are validated but never written.

use crate::{
    constants::{FILE_FORMAT_KEY, VCF_VERSION, XML_NAMESPACE},
    core::{
        allele::AlleleMap,
        header::{FieldDefinition, VcfHeader},
        variant::{GenotypeData, VariantRecord},
    },
    encode::validation::{check_genotype_alleles, check_samples, validate_filters, validate_info},
    io::writer::{VariantContextWriter, WriterOptions, WriterState},
    utils::util::Result,
};
use quick_xml::{
    events::{BytesEnd, BytesStart, BytesText, Event},
    Writer,
};
use std::{io::Write, sync::Arc};

/// Elements are rendered into an in-memory buffer and reach the sink one
/// whole header or record at a time.
pub struct XmlVariantWriter<W: Write> {
    sink: W,
    xml: Writer<Vec<u8>>,
    stream: String,
    options: WriterOptions,
    state: WriterState,
    records_written: u64,
    open_elements: Vec<&'static str>,
}

impl<W: Write> XmlVariantWriter<W> {
    pub fn new(sink: W, stream: impl Into<String>, options: WriterOptions) -> Self {
        Self {
            sink,
            xml: Writer::new(Vec::new()),
            stream: stream.into(),
            options,
            state: WriterState::default(),
            records_written: 0,
            open_elements: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.sink
    }

    /// Moves the rendered buffer to the sink in a single write.
    fn emit(&mut self) -> Result<()> {
        let pending = self.xml.get_mut();
        let written = self.sink.write_all(pending);
        pending.clear();
        written?;
        self.sink.flush()?;
        Ok(())
    }

    fn start(&mut self, name: &'static str, attributes: &[(&str, &str)]) -> Result<()> {
        let element = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.xml.write_event(Event::Start(element))?;
        self.open_elements.push(name);
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        if let Some(name) = self.open_elements.pop() {
            self.xml.write_event(Event::End(BytesEnd::new(name)))?;
        }
        Ok(())
    }

    fn text_element(
        &mut self,
        name: &'static str,
        attributes: &[(&str, &str)],
        text: &str,
    ) -> Result<()> {
        self.start(name, attributes)?;
        self.xml.write_event(Event::Text(BytesText::new(text)))?;
        self.end()
    }

    fn write_field_definitions<'a>(
        &mut self,
        list: &'static str,
        item: &'static str,
        definitions: impl Iterator<Item = &'a FieldDefinition>,
    ) -> Result<()> {
        self.start(list, &[])?;
        for def in definitions {
            let count = def.number.is_fixed().then(|| def.number.to_string());
            let mut attributes = vec![("ID", def.id.as_str()), ("type", def.field_type.as_str())];
            if let Some(count) = count.as_deref() {
                attributes.push(("count", count));
            }
            self.text_element(item, &attributes, &def.description)?;
        }
        self.end()
    }

    fn write_head(&mut self, header: &VcfHeader) -> Result<()> {
        self.start("vcf", &[("xmlns", XML_NAMESPACE)])?;
        self.start("head", &[])?;
        self.text_element("metadata", &[("key", FILE_FORMAT_KEY)], VCF_VERSION)?;

        self.write_field_definitions("info-list", "info", header.info_lines())?;
        self.write_field_definitions("format-list", "format", header.format_lines())?;

        self.start("filters-list", &[])?;
        for def in header.filter_lines() {
            self.text_element("filter", &[("ID", def.id.as_str())], &def.description)?;
        }
        self.end()?;

        self.start("contigs-list", &[])?;
        for def in header.contigs() {
            let index = def.index.to_string();
            self.start("contig", &[("ID", def.id.as_str()), ("index", index.as_str())])?;
            self.end()?;
        }
        self.end()?;

        self.start("samples-list", &[])?;
        for (i, sample) in header.samples().iter().enumerate() {
            let id = (i + 1).to_string();
            self.text_element("sample", &[("id", id.as_str())], sample)?;
        }
        self.end()?;

        self.end()?; // head
        self.start("body", &[])?;
        self.start("variations", &[])
    }

    fn validate(&self, record: &VariantRecord, header: &VcfHeader) -> Result<()> {
        let lenient = self.options.allow_missing_fields_in_header;
        validate_filters(record, header, lenient)?;
        validate_info(record, header, lenient)?;

        if self.options.sites_only || !header.has_genotyping_data() {
            return Ok(());
        }
        if let GenotypeData::Parsed(_) = record.genotype_data() {
            check_samples(record, header)?;
            check_genotype_alleles(record, &AlleleMap::build(record))?;
        }
        Ok(())
    }
}

impl<W: Write> VariantContextWriter for XmlVariantWriter<W> {
    fn write_header(&mut self, header: Arc<VcfHeader>) -> Result<()> {
        let header = if self.options.sites_only {
            Arc::new(header.without_samples())
        } else {
            header
        };
        self.state.open(Arc::clone(&header), &self.stream)?;
        self.write_head(&header)?;
        self.emit()?;
        log::debug!("Writer: wrote XML header to {}", self.stream);
        Ok(())
    }

    fn add(&mut self, record: &VariantRecord) -> Result<()> {
        let header = self.state.header(&self.stream)?;
        self.validate(record, &header)?;
        log::trace!("Writer: adding {}", record);

        let position = record.position().to_string();
        self.start(
            "variation",
            &[("chrom", record.contig()), ("pos", position.as_str())],
        )?;
        if let Some(id) = record.id() {
            self.text_element("id", &[], id)?;
        }
        self.text_element("ref", &[], record.reference().display_string())?;
        for alt in record.alternates() {
            self.text_element("alt", &[], alt.display_string())?;
        }
        self.end()?;

        self.emit()?;
        self.records_written += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.state.close(&self.stream)?;
        while !self.open_elements.is_empty() {
            self.end()?;
        }
        self.emit()?;
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
