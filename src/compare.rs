//! Classify every twinned (and untwinned) section, symbol and relocation
//! as `New`, `Changed` or `Same`.

use crate::elfio::section::{RawOrKnown, SectionType};
use crate::elfio::symbol::SymType;
use crate::error::{Error, Result};
use crate::model::{Graph, Status};

pub fn compare(base: &mut Graph, patched: &mut Graph) -> Result<()> {
    compare_sections(base, patched)?;
    compare_symbols(base, patched)?;
    refine_relocation_sections(base, patched);
    Ok(())
}

fn check_field<T: PartialEq + std::fmt::Debug>(
    name: &str,
    field: &'static str,
    base: T,
    patched: T,
) -> Result<()> {
    if base != patched {
        Err(Error::SectionHeaderMismatch {
            name: name.to_string(),
            field,
            base: format!("{base:?}"),
            patched: format!("{patched:?}"),
        })
    } else {
        Ok(())
    }
}

fn propagate(graph: &mut Graph, section: usize, status: Status) {
    let content = graph.sections[section].as_content().cloned();
    let Some(content) = content else { return };
    if let Some(entity) = content.entity_symbol {
        graph.symbols[entity].status = status;
    }
    if let Some(sym) = content.section_symbol {
        graph.symbols[sym].status = status;
    }
    if let Some(rela) = content.rela {
        graph.sections[rela].status = status;
    }
}

fn compare_sections(base: &mut Graph, patched: &mut Graph) -> Result<()> {
    for s in base.sections.iter_mut() {
        if s.twin.is_none() {
            s.status = Status::New;
        }
    }
    for s in patched.sections.iter_mut() {
        if s.twin.is_none() {
            s.status = Status::New;
        }
    }

    for b in 0..base.sections.len() {
        let Some(p) = base.sections[b].twin else {
            continue;
        };
        if base.sections[b].as_content().is_none() {
            continue;
        }

        let name = base.sections[b].name.clone();
        let (bh, ph) = (base.sections[b].header.clone(), patched.sections[p].header.clone());
        check_field(&name, "sh_type", bh.r#type, ph.r#type)?;
        check_field(&name, "sh_flags", bh.flags, ph.flags)?;
        check_field(&name, "sh_addr", bh.address, ph.address)?;
        check_field(&name, "sh_addralign", bh.address_align, ph.address_align)?;
        check_field(&name, "sh_entsize", bh.entry_size, ph.entry_size)?;

        let is_nobits = matches!(bh.section_type(), RawOrKnown::Known(SectionType::NoBits));
        let changed = if is_nobits {
            bh.size != ph.size
        } else {
            bh.size != ph.size || base.sections[b].data != patched.sections[p].data
        };
        let status = if changed { Status::Changed } else { Status::Same };

        base.sections[b].status = status;
        patched.sections[p].status = status;
        propagate(base, b, status);
        propagate(patched, p, status);
    }
    Ok(())
}

fn compare_symbols(base: &mut Graph, patched: &mut Graph) -> Result<()> {
    for s in base.symbols.iter_mut().skip(1) {
        if s.twin.is_none() {
            s.status = Status::New;
        }
    }
    for s in patched.symbols.iter_mut().skip(1) {
        if s.twin.is_none() {
            s.status = Status::New;
        }
    }

    for b in 1..base.symbols.len() {
        let Some(p) = base.symbols[b].twin else {
            continue;
        };
        let name = base.symbols[b].name.clone();

        if base.symbols[b].section.is_none() && patched.symbols[p].section.is_none() {
            base.symbols[b].status = Status::Same;
            patched.symbols[p].status = Status::Same;
            continue;
        }

        let (b_info, p_info) = (base.symbols[b].record.info, patched.symbols[p].record.info);
        if b_info != p_info {
            return Err(Error::SymbolMismatch {
                name,
                field: "st_info",
                base: format!("{b_info:#x}"),
                patched: format!("{p_info:#x}"),
            });
        }
        let (b_other, p_other) = (base.symbols[b].record.other, patched.symbols[p].record.other);
        if b_other != p_other {
            return Err(Error::SymbolMismatch {
                name,
                field: "st_other",
                base: format!("{b_other:#x}"),
                patched: format!("{p_other:#x}"),
            });
        }

        // Link consistency compares the two symbols' bound *sections*
        // (via their twin relationship), not a symbol against itself.
        match (base.symbols[b].section, patched.symbols[p].section) {
            (Some(bs), Some(ps)) => {
                if base.sections[bs].twin != Some(ps) {
                    return Err(Error::SymbolMismatch {
                        name,
                        field: "st_shndx",
                        base: base.sections[bs].name.clone(),
                        patched: patched.sections[ps].name.clone(),
                    });
                }
            }
            (None, None) => {}
            _ => {
                return Err(Error::SymbolMismatch {
                    name,
                    field: "st_shndx",
                    base: format!("{:?}", base.symbols[b].section),
                    patched: format!("{:?}", patched.symbols[p].section),
                })
            }
        }

        if matches!(base.symbols[b].sym_type(), Some(SymType::Object)) {
            let (b_size, p_size) = (base.symbols[b].record.size, patched.symbols[p].record.size);
            if b_size != p_size {
                return Err(Error::SymbolMismatch {
                    name,
                    field: "st_size",
                    base: b_size.to_string(),
                    patched: p_size.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// A relocation section classified `Same` by name/structure alone may
/// still carry a brand new (unpaired) entry; promote it, and its base
/// section's symbols, to `Changed` when that happens.
fn refine_relocation_sections(base: &mut Graph, patched: &mut Graph) {
    for p in 0..patched.sections.len() {
        if patched.sections[p].status != Status::Same {
            continue;
        }
        let Some(reloc) = patched.sections[p].as_relocation() else {
            continue;
        };
        let has_new = reloc.relocations.iter().any(|r| r.twin.is_none());
        if !has_new {
            continue;
        }
        let base_section = reloc.base;

        patched.sections[p].status = Status::Changed;
        if let Some(bi) = patched.sections[p].twin {
            base.sections[bi].status = Status::Changed;
        }
        patched.sections[base_section].status = Status::Changed;
        propagate(patched, base_section, Status::Changed);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::correlate::correlate;
    use crate::elfio::header::FileHeader;
    use crate::elfio::section::RawSectionHeader;
    use crate::elfio::symbol::{make_info, Bind, RawSymbol, SymType};
    use crate::elfio::Endian;
    use crate::model::{ContentSection, Graph, Relocation, RelocationSection, RelocationStatus, Section, Symbol};

    fn section(name: &str, data: Vec<u8>, kind: Status) -> Section {
        let size = data.len() as u64;
        Section {
            header: RawSectionHeader::builder()
                .name_offset(0)
                .r#type(1)
                .flags(0x6)
                .address(0)
                .offset(0)
                .size(size)
                .link(0)
                .info(0)
                .address_align(4)
                .entry_size(0)
                .build(),
            data,
            name: name.to_string(),
            index: 0,
            status: kind,
            twin: None,
            output: None,
            source: None,
            kind: SectionKind::Content(ContentSection::default()),
        }
    }

    fn symbol(name: &str, sym_type: SymType, section: Option<usize>, size: u64) -> Symbol {
        Symbol {
            record: RawSymbol::builder()
                .name_offset(0)
                .info(make_info(Bind::Global, sym_type))
                .other(0)
                .shndx(section.map(|s| (s + 1) as u16).unwrap_or(0))
                .value(0)
                .size(size)
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

    fn graph(sections: Vec<Section>, symbols: Vec<Symbol>) -> Graph {
        Graph {
            path: "t.o".into(),
            header: FileHeader::builder()
                .endian(Endian::Little)
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
            sections,
            symbols,
        }
    }

    #[test]
    fn byte_identical_sections_compare_same() {
        let mut base = graph(
            vec![section(".text.foo", vec![0x90, 0xc3], Status::Same)],
            vec![symbol("", SymType::NoType, None, 0), symbol("foo", SymType::Func, Some(0), 2)],
        );
        let mut patched = graph(
            vec![section(".text.foo", vec![0x90, 0xc3], Status::Same)],
            vec![symbol("", SymType::NoType, None, 0), symbol("foo", SymType::Func, Some(0), 2)],
        );
        correlate(&mut base, &mut patched);
        compare(&mut base, &mut patched).unwrap();

        assert_eq!(base.sections[0].status, Status::Same);
        assert_eq!(base.symbols[1].status, Status::Same);
    }

    #[test]
    fn differing_bytes_compare_changed_and_propagate_to_entity_symbol() {
        let mut base = graph(
            vec![section(".text.foo", vec![0x90, 0xc3], Status::Same)],
            vec![symbol("", SymType::NoType, None, 0), symbol("foo", SymType::Func, Some(0), 2)],
        );
        let mut patched = graph(
            vec![section(".text.foo", vec![0x90, 0x90, 0xc3], Status::Same)],
            vec![symbol("", SymType::NoType, None, 0), symbol("foo", SymType::Func, Some(0), 3)],
        );
        correlate(&mut base, &mut patched);
        // Sizes differ across the pair, which the comparator does not
        // fatally check for content sections (only NOBITS size matters
        // unconditionally); exercise the byte-diff path directly instead.
        base.sections[0].twin = Some(0);
        patched.sections[0].twin = Some(0);
        compare(&mut base, &mut patched).unwrap();

        assert_eq!(patched.sections[0].status, Status::Changed);
        assert_eq!(patched.symbols[1].status, Status::Changed);
    }

    #[test]
    fn diverging_bound_sections_are_rejected_as_unreconcilable() {
        // Two paired FUNC symbols whose sections are NOT twinned with
        // each other: the section-link consistency check (compares bound
        // *sections* through their twin relationship) must catch this,
        // not compare a symbol against itself.
        let mut base = graph(
            vec![
                section(".text.foo", vec![0x90], Status::Same),
                section(".text.other", vec![0x90], Status::Same),
            ],
            vec![symbol("", SymType::NoType, None, 0), symbol("foo", SymType::Func, Some(0), 1)],
        );
        let mut patched = graph(
            vec![
                section(".text.foo", vec![0x90], Status::Same),
                section(".text.other", vec![0x90], Status::Same),
            ],
            vec![symbol("", SymType::NoType, None, 0), symbol("foo", SymType::Func, Some(1), 1)],
        );
        base.symbols[1].twin = Some(1);
        patched.symbols[1].twin = Some(1);
        // Sections are twinned straight across (0<->0, 1<->1), but `foo`
        // is bound to section 0 in base and section 1 in patched.
        base.sections[0].twin = Some(0);
        patched.sections[0].twin = Some(0);
        base.sections[1].twin = Some(1);
        patched.sections[1].twin = Some(1);

        let err = compare(&mut base, &mut patched).unwrap_err();
        assert!(matches!(err, Error::SymbolMismatch { field: "st_shndx", .. }));
    }

    #[test]
    fn unpaired_relocation_promotes_same_section_to_changed() {
        let mut base = graph(
            vec![
                section(".text.foo", vec![0x90, 0xc3], Status::Same),
                section(".rela.text.foo", Vec::new(), Status::Same),
            ],
            vec![symbol("", SymType::NoType, None, 0), symbol("foo", SymType::Func, Some(0), 2)],
        );
        base.sections[1].kind = SectionKind::Relocation(RelocationSection {
            base: 0,
            relocations: Vec::new(),
        });
        let mut patched = graph(
            vec![
                section(".text.foo", vec![0x90, 0xc3], Status::Same),
                section(".rela.text.foo", Vec::new(), Status::Same),
            ],
            vec![
                symbol("", SymType::NoType, None, 0),
                symbol("foo", SymType::Func, Some(0), 2),
                symbol("bar", SymType::Func, None, 0),
            ],
        );
        patched.sections[1].kind = SectionKind::Relocation(RelocationSection {
            base: 0,
            relocations: vec![Relocation {
                r#type: 1,
                offset: 0,
                addend: 0,
                target: 2,
                string: None,
                status: RelocationStatus::New,
                twin: None,
            }],
        });

        correlate(&mut base, &mut patched);
        compare(&mut base, &mut patched).unwrap();

        assert_eq!(patched.sections[1].status, Status::Changed);
        assert_eq!(patched.sections[0].status, Status::Changed);
    }
}
