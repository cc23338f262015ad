//! Lay out and write the output object file.

use std::fs::File;
use std::io::{BufWriter, Write};

use crate::elfio::header::FileHeader;
use crate::elfio::section::RawSectionHeader;
use crate::elfio::{Endian, ToWriter};
use crate::error::Result;
use crate::model::Graph;

/// Compute each output section's file offset (sequential, immediately
/// after the header, `SHT_NOBITS` sections consuming no file bytes) and
/// point `e_shoff` at the section header table that follows the data.
fn layout(graph: &mut Graph) {
    let mut position = FileHeader::SIZE;
    for section in graph.sections.iter_mut() {
        section.header.offset = position;
        if !matches!(
            section.header.section_type(),
            crate::elfio::section::RawOrKnown::Known(crate::elfio::section::SectionType::NoBits)
        ) {
            position += section.data.len() as u64;
        }
    }
    graph.header.section_header_offset = position;
}

/// Write `graph` to `path` as an ELF64 relocatable object.
pub fn emit(graph: &mut Graph, path: &str) -> Result<()> {
    layout(graph);

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let endian = graph.header.endian;

    graph.header.to_writer(&mut writer, endian)?;

    for section in &graph.sections {
        if matches!(
            section.header.section_type(),
            crate::elfio::section::RawOrKnown::Known(crate::elfio::section::SectionType::NoBits)
        ) {
            continue;
        }
        writer.write_all(&section.data)?;
    }

    // The reserved null section header, all zero.
    let null_header = RawSectionHeader::builder()
        .name_offset(0)
        .r#type(0)
        .flags(0)
        .address(0)
        .offset(0)
        .size(0)
        .link(0)
        .info(0)
        .address_align(0)
        .entry_size(0)
        .build();
    null_header.to_writer(&mut writer, endian)?;

    for section in &graph.sections {
        section.header.to_writer(&mut writer, endian)?;
    }

    writer.flush()?;
    Ok(())
}
