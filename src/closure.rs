//! Depth-first walk computing the set of sections and symbols that must
//! survive into the output object.

use std::collections::HashSet;

use crate::elfio::symbol::SymType;
use crate::model::{Graph, Status};

/// The result of walking the inclusion closure: which sections and which
/// symbols (by index into the source [`Graph`]) must be carried into the
/// output.
#[derive(Debug, Default)]
pub struct Closure {
    pub sections: HashSet<usize>,
    pub symbols: HashSet<usize>,
}

impl Closure {
    pub fn includes_section(&self, index: usize) -> bool {
        self.sections.contains(&index)
    }

    pub fn includes_symbol(&self, index: usize) -> bool {
        self.symbols.contains(&index)
    }
}

/// Starting set: every `FUNC` symbol marked `Changed` or `New` (a function
/// with no byte-identical twin in the base graph, whether modified or
/// freshly added, belongs in the patch), plus every `FILE` symbol
/// unconditionally.
pub fn compute(graph: &Graph) -> Closure {
    let mut closure = Closure::default();
    let mut stack: Vec<usize> = graph
        .symbols
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(_, sym)| {
            matches!(sym.sym_type(), Some(SymType::File))
                || (matches!(sym.sym_type(), Some(SymType::Func))
                    && matches!(sym.status, Status::Changed | Status::New))
        })
        .map(|(i, _)| i)
        .collect();

    while let Some(index) = stack.pop() {
        if !closure.symbols.insert(index) {
            continue;
        }
        let symbol = &graph.symbols[index];

        let Some(section) = symbol.section else {
            continue;
        };
        let is_section_symbol = matches!(symbol.sym_type(), Some(SymType::Section));
        if !is_section_symbol && symbol.status == Status::Same {
            continue;
        }

        closure.sections.insert(section);
        let Some(content) = graph.sections[section].as_content() else {
            continue;
        };

        if let Some(section_symbol) = content.section_symbol {
            if section_symbol != index && !closure.symbols.contains(&section_symbol) {
                stack.push(section_symbol);
            }
        }

        if let Some(rela) = content.rela {
            closure.sections.insert(rela);
            if let Some(reloc) = graph.sections[rela].as_relocation() {
                for entry in &reloc.relocations {
                    if !closure.symbols.contains(&entry.target) {
                        stack.push(entry.target);
                    }
                }
            }
        }
    }

    closure
}
