//! Pair sections, symbols and relocations across a base graph and a
//! patched graph by name (and, for relocations, by structural shape).

use crate::model::{Graph, RelocationSection, RelocationStatus, SectionKind, Status, Symbol};

/// Pair every section and symbol that exists in both graphs by name
/// equality, then pair relocations within each twinned relocation
/// section. Sets `twin` on both sides and pre-seeds `status` to `Same`;
/// the comparator may revise it later.
pub fn correlate(base: &mut Graph, patched: &mut Graph) {
    correlate_sections(base, patched);
    correlate_symbols(base, patched);
    correlate_relocations(base, patched);
}

fn correlate_sections(base: &mut Graph, patched: &mut Graph) {
    for b in 0..base.sections.len() {
        let name = base.sections[b].name.clone();
        if let Some(p) = patched.find_section_by_name(&name) {
            base.sections[b].twin = Some(p);
            patched.sections[p].twin = Some(b);
            base.sections[b].status = Status::Same;
            patched.sections[p].status = Status::Same;
        }
    }
}

fn correlate_symbols(base: &mut Graph, patched: &mut Graph) {
    // Index 0 is the reserved null symbol and is never paired.
    for b in 1..base.symbols.len() {
        let name = base.symbols[b].name.clone();
        if let Some(p) = patched.find_symbol_by_name(&name) {
            base.symbols[b].twin = Some(p);
            patched.symbols[p].twin = Some(b);
            base.symbols[b].status = Status::Same;
            patched.symbols[p].status = Status::Same;
        }
    }
}

/// For one twinned pair of relocation sections, find the base-side index
/// paired with each patched-side index, by structural match (type,
/// offset, then either equal materialized strings or equal target-symbol
/// name and addend).
fn match_relocations(
    base_reloc: &RelocationSection,
    patched_reloc: &RelocationSection,
    base_symbols: &[Symbol],
    patched_symbols: &[Symbol],
) -> Vec<(usize, usize)> {
    let mut matched = vec![false; patched_reloc.relocations.len()];
    let mut pairs = Vec::new();

    for (bi, b_rela) in base_reloc.relocations.iter().enumerate() {
        let candidate = patched_reloc.relocations.iter().enumerate().find(|(pi, p_rela)| {
            if matched[*pi] {
                return false;
            }
            if p_rela.r#type != b_rela.r#type || p_rela.offset != b_rela.offset {
                return false;
            }
            match (&b_rela.string, &p_rela.string) {
                (Some(bs), Some(ps)) => bs == ps,
                (Some(_), None) | (None, Some(_)) => false,
                (None, None) => {
                    let b_target = &base_symbols[b_rela.target];
                    let p_target = &patched_symbols[p_rela.target];
                    b_target.name == p_target.name && b_rela.addend == p_rela.addend
                }
            }
        });

        if let Some((pi, _)) = candidate {
            matched[pi] = true;
            pairs.push((bi, pi));
        }
    }

    pairs
}

fn correlate_relocations(base: &mut Graph, patched: &mut Graph) {
    for b_sec in 0..base.sections.len() {
        let Some(p_sec) = base.sections[b_sec].twin else {
            continue;
        };
        let SectionKind::Relocation(base_reloc) = &base.sections[b_sec].kind else {
            continue;
        };
        let SectionKind::Relocation(patched_reloc) = &patched.sections[p_sec].kind else {
            continue;
        };

        let pairs = match_relocations(base_reloc, patched_reloc, &base.symbols, &patched.symbols);

        let Some(base_reloc) = base.sections[b_sec].as_relocation_mut() else {
            continue;
        };
        for &(bi, pi) in &pairs {
            base_reloc.relocations[bi].twin = Some(pi);
            base_reloc.relocations[bi].status = RelocationStatus::Same;
        }

        let Some(patched_reloc) = patched.sections[p_sec].as_relocation_mut() else {
            continue;
        };
        for &(bi, pi) in &pairs {
            patched_reloc.relocations[pi].twin = Some(bi);
            patched_reloc.relocations[pi].status = RelocationStatus::Same;
        }
    }
}
