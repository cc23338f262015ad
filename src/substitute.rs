//! Re-target relocations that reference a section's anonymous
//! `STT_SECTION` symbol onto that section's named entity symbol, when it
//! has one.
//!
//! Compilers frequently emit references to local functions and objects
//! through the enclosing section's section symbol rather than the named
//! symbol directly; re-targeting lets the final link resolve against the
//! unchanged definition in the original image instead of pulling in an
//! unwanted copy of the section.

use crate::model::Graph;

pub fn substitute_section_symbols(graph: &mut Graph) {
    for section_index in 0..graph.sections.len() {
        let Some(reloc) = graph.sections[section_index].as_relocation() else {
            continue;
        };
        let targets: Vec<usize> = reloc.relocations.iter().map(|r| r.target).collect();

        let mut replacements = Vec::new();
        for (entry_index, target) in targets.into_iter().enumerate() {
            let symbol = &graph.symbols[target];
            if !matches!(
                symbol.sym_type(),
                Some(crate::elfio::symbol::SymType::Section)
            ) {
                continue;
            }
            let Some(owning_section) = symbol.section else {
                continue;
            };
            let Some(entity) = graph.sections[owning_section]
                .as_content()
                .and_then(|c| c.entity_symbol)
            else {
                continue;
            };
            if entity != target {
                replacements.push((entry_index, entity));
            }
        }

        if replacements.is_empty() {
            continue;
        }
        let Some(reloc) = graph.sections[section_index].as_relocation_mut() else {
            continue;
        };
        for (entry_index, entity) in replacements {
            reloc.relocations[entry_index].target = entity;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::elfio::section::RawSectionHeader;
    use crate::elfio::symbol::{make_info, Bind, RawSymbol, SymType};
    use crate::model::{
        ContentSection, Relocation, RelocationSection, RelocationStatus, Section, SectionKind,
        Status, Symbol,
    };

    fn dummy_section(name: &str, kind: SectionKind) -> Section {
        Section {
            header: RawSectionHeader::builder()
                .name_offset(0)
                .r#type(1)
                .flags(0)
                .address(0)
                .offset(0)
                .size(0)
                .link(0)
                .info(0)
                .address_align(1)
                .entry_size(0)
                .build(),
            data: Vec::new(),
            name: name.to_string(),
            index: 0,
            status: Status::Same,
            twin: None,
            output: None,
            source: None,
            kind,
        }
    }

    fn dummy_symbol(name: &str, sym_type: SymType, section: Option<usize>) -> Symbol {
        Symbol {
            record: RawSymbol::builder()
                .name_offset(0)
                .info(make_info(Bind::Local, sym_type))
                .other(0)
                .shndx(section.map(|s| s as u16).unwrap_or(0))
                .value(0)
                .size(0)
                .build(),
            name: name.to_string(),
            index: 0,
            section,
            status: Status::Same,
            twin: None,
            output: None,
            source: None,
        }
    }

    #[test]
    fn retargets_section_symbol_to_entity_symbol() {
        let mut graph = Graph {
            path: "t.o".into(),
            header: crate::elfio::header::FileHeader::builder()
                .endian(crate::elfio::Endian::Little)
                .os_abi(0)
                .abi_version(0)
                .r#type(1)
                .machine(62)
                .version(1)
                .entry(0)
                .program_header_offset(0)
                .section_header_offset(0)
                .flags(0)
                .header_size(64)
                .program_header_entry_size(0)
                .program_header_entry_count(0)
                .section_header_entry_size(64)
                .section_header_entry_count(0)
                .section_name_string_table_index(0)
                .build(),
            sections: vec![
                dummy_section(
                    ".text.foo",
                    SectionKind::Content(ContentSection {
                        rela: Some(1),
                        section_symbol: Some(1),
                        entity_symbol: Some(2),
                    }),
                ),
                dummy_section(
                    ".rela.text.foo",
                    SectionKind::Relocation(RelocationSection {
                        base: 0,
                        relocations: vec![Relocation {
                            r#type: 1,
                            offset: 0,
                            addend: 0,
                            target: 1,
                            string: None,
                            status: RelocationStatus::Same,
                            twin: None,
                        }],
                    }),
                ),
            ],
            symbols: vec![
                dummy_symbol("", SymType::NoType, None),
                dummy_symbol(".text.foo", SymType::Section, Some(0)),
                dummy_symbol("foo", SymType::Func, Some(0)),
            ],
        };

        substitute_section_symbols(&mut graph);

        let reloc = graph.sections[1].as_relocation().unwrap();
        assert_eq!(reloc.relocations[0].target, 2);
    }
}
