//! Build the output object graph from the patched graph's inclusion
//! closure: copy the surviving sections and symbols, re-target
//! relocations onto their output-side symbols, and rebuild the string
//! tables that name everything.

use std::collections::HashMap;

use crate::closure::Closure;
use crate::elfio::section::{RawOrKnown, SectionType};
use crate::elfio::symbol::{self, RawSymbol, SHN_ABS, SHN_UNDEF};
use crate::error::{Error, Result};
use crate::model::{
    ContentSection, Graph, Relocation, RelocationSection, Section, SectionKind, Status, Symbol,
};

const SHSTRTAB: &str = ".shstrtab";
const STRTAB: &str = ".strtab";
const SYMTAB: &str = ".symtab";

/// Consumes nothing permanently from `patched` but does record forward
/// crosslinks (`section.output` / `symbol.output`) on it, so later stages
/// (none currently) could still find where an entity landed.
pub fn synthesize(patched: &mut Graph, closure: &Closure) -> Result<Graph> {
    let (section_map, mut out_sections) = copy_sections(patched, closure);
    let endian = patched.header.endian;
    let mut out_symbols = copy_symbols(patched, closure, &section_map)?;
    retarget_relocations(patched, &mut out_sections, &section_map, &out_symbols)?;
    rebuild_string_tables(&mut out_sections, &mut out_symbols, endian)?;

    let header = crate::elfio::header::FileHeader {
        endian: patched.header.endian,
        os_abi: patched.header.os_abi,
        abi_version: patched.header.abi_version,
        r#type: patched.header.r#type,
        machine: patched.header.machine,
        version: 1,
        entry: 0,
        program_header_offset: 0,
        section_header_offset: 0,
        flags: patched.header.flags,
        header_size: crate::elfio::header::FileHeader::SIZE as u16,
        program_header_entry_size: 0,
        program_header_entry_count: 0,
        section_header_entry_size: crate::elfio::section::RawSectionHeader::SIZE as u16,
        section_header_entry_count: (out_sections.len() + 1) as u16,
        section_name_string_table_index: out_sections
            .iter()
            .position(|s| s.name == SHSTRTAB)
            .map(|p| (p + 1) as u16)
            .unwrap_or(0),
    };

    Ok(Graph {
        path: String::new(),
        header,
        sections: out_sections,
        symbols: out_symbols,
    })
}

/// Sections required regardless of the closure: the three conventional
/// metadata sections.
fn is_required_metadata(name: &str) -> bool {
    matches!(name, SHSTRTAB | STRTAB | SYMTAB)
}

/// Copy every closure-included (or required-metadata) section into the
/// output graph in on-disk order, assigning dense output indexes.
/// Returns a map from source `Vec` position to output `Vec` position and
/// the partially-built output section list (relocation/content internals
/// still reference *source* indexes and are fixed up by later passes).
fn copy_sections(patched: &mut Graph, closure: &Closure) -> (HashMap<usize, usize>, Vec<Section>) {
    let mut map = HashMap::new();
    let mut out = Vec::new();

    for (source_index, section) in patched.sections.iter().enumerate() {
        if !closure.includes_section(source_index) && !is_required_metadata(&section.name) {
            continue;
        }
        let out_index = out.len();
        map.insert(source_index, out_index);

        out.push(Section {
            header: section.header.clone(),
            data: section.data.clone(),
            name: section.name.clone(),
            index: out_index + 1,
            status: section.status,
            twin: None,
            output: None,
            source: Some(source_index),
            kind: section.kind.clone(),
        });
    }

    for (&source_index, &out_index) in &map {
        patched.sections[source_index].output = Some(out_index);
    }

    (map, out)
}

/// Copy closure-included symbols into the output graph, ordered index 0
/// null; local `FILE`; local `FUNC`; remaining local; all non-local. A
/// `FUNC`/`OBJECT` symbol whose section did not survive into the output
/// is rewritten as an undefined global `NOTYPE` symbol of size 0, so
/// relocations that still reference it resolve against a stub rather
/// than a missing section.
///
fn copy_symbols(
    patched: &mut Graph,
    closure: &Closure,
    section_map: &HashMap<usize, usize>,
) -> Result<Vec<Symbol>> {
    let mut all: Vec<usize> = closure.symbols.iter().copied().collect();
    all.sort_unstable();

    let is_local = |i: usize| patched.symbols[i].is_local();
    let is_file = |i: usize| matches!(patched.symbols[i].sym_type(), Some(symbol::SymType::File));
    let is_func = |i: usize| matches!(patched.symbols[i].sym_type(), Some(symbol::SymType::Func));

    let local_file: Vec<usize> = all.iter().copied().filter(|&i| is_local(i) && is_file(i)).collect();
    let local_func: Vec<usize> = all
        .iter()
        .copied()
        .filter(|&i| is_local(i) && is_func(i) && !is_file(i))
        .collect();
    let remaining_local: Vec<usize> = all
        .iter()
        .copied()
        .filter(|&i| is_local(i) && !is_file(i) && !is_func(i))
        .collect();
    let non_local: Vec<usize> = all.iter().copied().filter(|&i| !is_local(i)).collect();

    let ordered: Vec<usize> = local_file
        .into_iter()
        .chain(local_func)
        .chain(remaining_local)
        .chain(non_local)
        .collect();

    let mut out = Vec::with_capacity(ordered.len() + 1);
    out.push(Symbol {
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
        source: Some(0),
    });

    for (position, &source_index) in ordered.iter().enumerate() {
        let out_index = position + 1;
        let source = &patched.symbols[source_index];
        let is_entity = matches!(
            source.sym_type(),
            Some(symbol::SymType::Func) | Some(symbol::SymType::Object)
        );
        let section_survived = source.section.map(|s| section_map.contains_key(&s)).unwrap_or(true);

        let (record, section_out) = if is_entity && !section_survived {
            (
                RawSymbol::builder()
                    .name_offset(0)
                    .info(symbol::make_info(symbol::Bind::Global, symbol::SymType::NoType))
                    .other(0)
                    .shndx(SHN_UNDEF)
                    .value(0)
                    .size(0)
                    .build(),
                None,
            )
        } else {
            let section_out = source.section.and_then(|s| section_map.get(&s).copied());
            let shndx = match (source.section, section_out) {
                (Some(_), Some(out_sec)) => (out_sec + 1) as u16,
                (Some(_), None) => source.record.shndx,
                (None, _) => {
                    if source.record.shndx == SHN_ABS {
                        SHN_ABS
                    } else {
                        SHN_UNDEF
                    }
                }
            };
            (
                RawSymbol::builder()
                    .name_offset(0)
                    .info(source.record.info)
                    .other(source.record.other)
                    .shndx(shndx)
                    .value(source.record.value)
                    .size(source.record.size)
                    .build(),
                section_out,
            )
        };

        let name = source.name.clone();
        let status = source.status;

        out.push(Symbol {
            record,
            name,
            index: out_index,
            section: section_out,
            status,
            twin: None,
            output: None,
            source: Some(source_index),
        });
        patched.symbols[source_index].output = Some(out_index);
    }

    Ok(out)
}

fn retarget_relocations(
    patched: &Graph,
    out_sections: &mut [Section],
    section_map: &HashMap<usize, usize>,
    out_symbols: &[Symbol],
) -> Result<()> {
    let symtab_out = out_sections
        .iter()
        .position(|s| s.name == SYMTAB)
        .map(|p| (p + 1) as u32)
        .unwrap_or(0);

    for out_section in out_sections.iter_mut() {
        let Some(source_index) = out_section.source else {
            continue;
        };
        let source = &patched.sections[source_index];
        let Some(source_reloc) = source.as_relocation() else {
            continue;
        };

        let base_out = *section_map.get(&source_reloc.base).ok_or_else(|| {
            Error::DanglingRelocationTarget {
                name: format!("{} (base section)", source.name),
            }
        })?;

        let mut relocations = Vec::with_capacity(source_reloc.relocations.len());
        for entry in &source_reloc.relocations {
            let target_symbol = &patched.symbols[entry.target];
            let target_out = target_symbol.output.ok_or_else(|| Error::DanglingRelocationTarget {
                name: target_symbol.name.clone(),
            })?;
            relocations.push(Relocation {
                r#type: entry.r#type,
                offset: entry.offset,
                addend: entry.addend,
                target: target_out,
                string: entry.string.clone(),
                status: entry.status,
                twin: None,
            });
        }

        out_section.kind = SectionKind::Relocation(RelocationSection {
            base: base_out,
            relocations,
        });
        out_section.header.link = symtab_out;
        out_section.header.info = (base_out + 1) as u32;
        out_section.data = encode_relocations(&out_section.kind, patched.header.endian)?;
        out_section.header.size = out_section.data.len() as u64;
    }

    // Content sections' internal cross-references (rela/section_symbol/
    // entity_symbol) are re-expressed in terms of output indexes too, so
    // downstream consumers of the output graph (tests, inventory) see a
    // consistent graph rather than one with dangling source-side indexes.
    for out_section in out_sections.iter_mut() {
        let Some(source_index) = out_section.source else {
            continue;
        };
        let Some(source_content) = patched.sections[source_index].as_content() else {
            continue;
        };
        let rela = source_content.rela.and_then(|r| section_map.get(&r).copied());
        let section_symbol = source_content
            .section_symbol
            .and_then(|s| out_symbols.iter().position(|o| o.source == Some(s)));
        let entity_symbol = source_content
            .entity_symbol
            .and_then(|s| out_symbols.iter().position(|o| o.source == Some(s)));
        out_section.kind = SectionKind::Content(ContentSection {
            rela,
            section_symbol,
            entity_symbol,
        });
    }

    Ok(())
}

fn encode_relocations(kind: &SectionKind, endian: crate::elfio::Endian) -> Result<Vec<u8>> {
    let SectionKind::Relocation(reloc) = kind else {
        return Ok(Vec::new());
    };
    use crate::elfio::rela::RawRela;
    use crate::elfio::ToWriter;

    let mut buf = Vec::with_capacity(reloc.relocations.len() * RawRela::SIZE as usize);
    for entry in &reloc.relocations {
        let raw = RawRela::builder()
            .offset(entry.offset)
            .symbol(entry.target as u32)
            .type_(entry.r#type)
            .addend(entry.addend)
            .build();
        raw.to_writer(&mut buf, endian)?;
    }
    Ok(buf)
}

fn rebuild_string_tables(
    out_sections: &mut [Section],
    out_symbols: &mut [Symbol],
    endian: crate::elfio::Endian,
) -> Result<()> {
    // .shstrtab: NUL, then each section's name+NUL, in output order.
    let mut shstrtab_bytes = vec![0u8];
    let mut name_offsets = Vec::with_capacity(out_sections.len());
    for section in out_sections.iter() {
        name_offsets.push(shstrtab_bytes.len() as u32);
        shstrtab_bytes.extend_from_slice(section.name.as_bytes());
        shstrtab_bytes.push(0);
    }
    for (section, offset) in out_sections.iter_mut().zip(name_offsets) {
        section.header.name_offset = offset;
    }

    // .strtab: NUL, then each non-null non-SECTION symbol's name+NUL, in
    // output symbol-table order. SECTION symbols keep name offset 0.
    let mut strtab_bytes = vec![0u8];
    for symbol in out_symbols.iter_mut().skip(1) {
        if matches!(symbol.sym_type(), Some(symbol::SymType::Section)) {
            symbol.record.name_offset = 0;
            continue;
        }
        symbol.record.name_offset = strtab_bytes.len() as u32;
        strtab_bytes.extend_from_slice(symbol.name.as_bytes());
        strtab_bytes.push(0);
    }

    if let Some(shstrtab) = out_sections.iter_mut().find(|s| s.name == SHSTRTAB) {
        shstrtab.header.size = shstrtab_bytes.len() as u64;
        shstrtab.data = shstrtab_bytes;
    }
    if let Some(strtab) = out_sections.iter_mut().find(|s| s.name == STRTAB) {
        strtab.header.size = strtab_bytes.len() as u64;
        strtab.data = strtab_bytes;
    }

    let strtab_out = out_sections
        .iter()
        .position(|s| s.name == STRTAB)
        .map(|p| (p + 1) as u32)
        .unwrap_or(0);
    let shstrtab_out = out_sections
        .iter()
        .position(|s| s.name == SHSTRTAB)
        .map(|p| (p + 1) as u32)
        .unwrap_or(0);

    if let Some(symtab) = out_sections.iter_mut().find(|s| s.name == SYMTAB) {
        use crate::elfio::ToWriter;
        let mut buf = Vec::with_capacity(out_symbols.len() * RawSymbol::SIZE as usize);
        for symbol in out_symbols.iter() {
            symbol.record.to_writer(&mut buf, endian)?;
        }
        symtab.header.link = strtab_out;
        symtab.header.info = shstrtab_out;
        symtab.header.size = buf.len() as u64;
        symtab.data = buf;
    }

    // Content sections keep their declared size for SHT_NOBITS (no file
    // bytes); everything else must match its (possibly rebuilt) buffer.
    for section in out_sections.iter_mut() {
        if matches!(section.header.section_type(), RawOrKnown::Known(SectionType::NoBits)) {
            continue;
        }
        if section.name != SHSTRTAB && section.name != STRTAB && section.name != SYMTAB {
            section.header.size = section.data.len() as u64;
        }
    }

    Ok(())
}
