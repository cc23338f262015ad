//! Build an in-memory [`Graph`](crate::model::Graph) from an object file
//! on disk.

use std::fs;
use std::io::Cursor;

use tracing::debug;

use crate::elfio::header::FileHeader;
use crate::elfio::section::{RawSectionHeader, SectionType, RawOrKnown, SectionFlags};
use crate::elfio::symbol::{self, RawSymbol, SHN_ABS, SHN_UNDEF};
use crate::elfio::rela::RawRela;
use crate::elfio::{string_at, FromReader};
use crate::error::{Error, Result};
use crate::model::{
    ContentSection, Graph, Relocation, RelocationSection, RelocationStatus, Section, SectionKind,
    Status, Symbol,
};

/// Name of the section the kernel build populates with export-string
/// literals; `FUNC`/`OBJECT` symbols may legitimately reference a
/// nonzero offset inside it.
const KSYMTAB_STRINGS: &str = "__ksymtab_strings";

/// Load an object file at `path` into an in-memory [`Graph`].
pub fn load(path: &str) -> Result<Graph> {
    let bytes = fs::read(path).map_err(Error::Io)?;
    let mut cursor = Cursor::new(&bytes);

    let header = FileHeader::from_reader(&mut cursor, crate::elfio::Endian::Little)
        .map_err(|e| tag_path(e, path))?;
    let endian = header.endian;

    let raw_headers = read_section_headers(&bytes, &header, endian, path)?;

    let shstrtab_index = header.section_name_string_table_index as usize;
    let shstrtab_bytes = section_bytes(&bytes, &raw_headers, shstrtab_index, path)?;

    let mut sections = Vec::with_capacity(raw_headers.len().saturating_sub(1));
    for (index, raw) in raw_headers.iter().enumerate().skip(1) {
        let name = string_at(shstrtab_bytes, raw.name_offset).map_err(|e| tag_path(e, path))?;
        let data = if matches!(raw.section_type(), RawOrKnown::Known(SectionType::NoBits)) {
            Vec::new()
        } else {
            section_bytes(&bytes, &raw_headers, index, path)?.to_vec()
        };
        sections.push(Section {
            header: raw.clone(),
            data,
            name,
            index,
            status: Status::Same,
            twin: None,
            output: None,
            source: None,
            kind: SectionKind::Content(ContentSection::default()),
        });
    }

    let symtab_index = sections
        .iter()
        .position(|s| s.name == ".symtab")
        .ok_or_else(|| Error::RequiredSectionMissing {
            path: path.to_string(),
            name: ".symtab",
        })?;
    let strtab_index = sections[symtab_index].header.link as usize;
    let strtab_bytes = if strtab_index == 0 {
        &[][..]
    } else {
        section_bytes(&bytes, &raw_headers, strtab_index, path)?
    };

    let symbols = load_symbols(
        &sections[symtab_index].data,
        strtab_bytes,
        endian,
        &mut sections,
        path,
    )?;

    load_relocations(&mut sections, &symbols, endian, path)?;

    debug!(
        path,
        sections = sections.len(),
        symbols = symbols.len(),
        "loaded object"
    );

    Ok(Graph {
        path: path.to_string(),
        header,
        sections,
        symbols,
    })
}

fn tag_path(err: Error, path: &str) -> Error {
    match err {
        Error::NotElf64 { reason, .. } => Error::NotElf64 {
            path: path.to_string(),
            reason,
        },
        Error::StringTableOutOfRange { offset, size, .. } => Error::StringTableOutOfRange {
            path: path.to_string(),
            offset,
            size,
        },
        other => other,
    }
}

fn read_section_headers(
    bytes: &[u8],
    header: &FileHeader,
    endian: crate::elfio::Endian,
    path: &str,
) -> Result<Vec<RawSectionHeader>> {
    let count = header.section_header_entry_count as usize;
    let mut cursor = Cursor::new(bytes);
    cursor.set_position(header.section_header_offset);
    let mut headers = Vec::with_capacity(count);
    for _ in 0..count {
        headers.push(
            RawSectionHeader::from_reader(&mut cursor, endian).map_err(|_| {
                Error::TruncatedSectionTable {
                    path: path.to_string(),
                    count: headers.len(),
                }
            })?,
        );
    }
    Ok(headers)
}

fn section_bytes<'a>(
    bytes: &'a [u8],
    headers: &[RawSectionHeader],
    index: usize,
    path: &str,
) -> Result<&'a [u8]> {
    let header = headers.get(index).ok_or_else(|| Error::TruncatedSectionTable {
        path: path.to_string(),
        count: headers.len(),
    })?;
    let start = header.offset as usize;
    let end = start + header.size as usize;
    bytes.get(start..end).ok_or_else(|| Error::TruncatedSectionTable {
        path: path.to_string(),
        count: headers.len(),
    })
}

fn load_symbols(
    symtab_data: &[u8],
    strtab_data: &[u8],
    endian: crate::elfio::Endian,
    sections: &mut [Section],
    path: &str,
) -> Result<Vec<Symbol>> {
    let count = symtab_data.len() / RawSymbol::SIZE as usize;
    let mut cursor = Cursor::new(symtab_data);
    let mut symbols = Vec::with_capacity(count);

    // Index 0 stays a zeroed placeholder so on-disk indexes and Vec
    // indexes coincide.
    symbols.push(Symbol {
        record: RawSymbol::builder()
            .name_offset(0)
            .info(0)
            .other(0)
            .shndx(0)
            .value(0)
            .size(0)
            .build(),
        name: String::new(),
        index: 0,
        section: None,
        status: Status::Same,
        twin: None,
        output: None,
        source: None,
    });

    for index in 1..count {
        let record = RawSymbol::from_reader(&mut cursor, endian)?;
        let mut name = string_at(strtab_data, record.name_offset).map_err(|e| tag_path(e, path))?;

        let section = if record.shndx == SHN_UNDEF
            || record.shndx == SHN_ABS
            || record.shndx as usize > sections.len()
        {
            None
        } else {
            // `sections` is keyed by Vec position, not on-disk index;
            // on-disk section N lives at position N - 1 since the
            // reserved null section is never stored.
            Some(record.shndx as usize - 1)
        };

        if let (Some(sec_index), Some(kind)) = (section, record.sym_type()) {
            let is_entity = matches!(
                kind,
                symbol::SymType::Func | symbol::SymType::Object
            );
            if is_entity && record.value != 0 {
                let section_name = sections[sec_index].name.clone();
                if section_name != KSYMTAB_STRINGS {
                    return Err(Error::NonZeroEntityOffset {
                        path: path.to_string(),
                        name: name.clone(),
                        value: record.value,
                    });
                }
            }

            match kind {
                symbol::SymType::Section => {
                    name = sections[sec_index].name.clone();
                    if let Some(content) = sections[sec_index].as_content_mut() {
                        content.section_symbol = Some(index);
                    }
                }
                symbol::SymType::Func | symbol::SymType::Object => {
                    if let Some(content) = sections[sec_index].as_content_mut() {
                        content.entity_symbol = Some(index);
                    }
                }
                _ => {}
            }
        } else if section.is_none() && record.shndx != SHN_UNDEF && record.shndx != SHN_ABS {
            return Err(Error::SymbolSectionOutOfRange {
                path: path.to_string(),
                index,
                shndx: record.shndx,
            });
        }

        symbols.push(Symbol {
            record,
            name,
            index,
            section,
            status: Status::Same,
            twin: None,
            output: None,
            source: None,
        });
    }

    Ok(symbols)
}

fn load_relocations(
    sections: &mut Vec<Section>,
    symbols: &[Symbol],
    endian: crate::elfio::Endian,
    path: &str,
) -> Result<()> {
    let rela_indices: Vec<usize> = sections
        .iter()
        .enumerate()
        .filter(|(_, s)| matches!(s.header.section_type(), RawOrKnown::Known(SectionType::Rela)))
        .map(|(i, _)| i)
        .collect();

    for rela_index in rela_indices {
        let name = sections[rela_index].name.clone();
        let base_name = name
            .strip_prefix(".rela")
            .map(|rest| format!(".{}", rest.trim_start_matches('.')))
            .unwrap_or_else(|| name.clone());

        let base_index = sections
            .iter()
            .position(|s| s.name == base_name && s.as_content().is_some())
            .ok_or_else(|| Error::RelocationBaseMissing {
                path: path.to_string(),
                name: name.clone(),
                expected: base_name.clone(),
            })?;

        let data = sections[rela_index].data.clone();
        let mut cursor = Cursor::new(&data);
        let count = data.len() / RawRela::SIZE as usize;
        let mut relocations = Vec::with_capacity(count);
        for _ in 0..count {
            let raw = RawRela::from_reader(&mut cursor, endian)?;
            let target = raw.symbol as usize;
            if target >= symbols.len() {
                return Err(Error::SymbolSectionOutOfRange {
                    path: path.to_string(),
                    index: target,
                    shndx: 0,
                });
            }

            let string = symbols[target].section.and_then(|sec_index| {
                let target_section = &sections[sec_index];
                target_section
                    .header
                    .section_flags()
                    .contains(SectionFlags::STRINGS)
                    .then(|| {
                        let at = symbols[target].record.value as i64 + raw.addend;
                        string_at(&target_section.data, at as u32).ok()
                    })
                    .flatten()
            });

            relocations.push(Relocation {
                r#type: raw.type_,
                offset: raw.offset,
                addend: raw.addend,
                target,
                string,
                status: RelocationStatus::Same,
                twin: None,
            });
        }

        if let Some(content) = sections[base_index].as_content_mut() {
            content.rela = Some(rela_index);
        }
        sections[rela_index].kind = SectionKind::Relocation(RelocationSection {
            base: base_index,
            relocations,
        });
    }

    Ok(())
}
