//! In-memory object graph: sections, symbols and relocations, and the
//! cross-file/cross-graph index links used to thread the pipeline
//! together.
//!
//! Twins and crosslinks are plain `usize` indexes into the owning
//! [`Graph`]'s vectors, wrapped in `Option` where a pairing may not
//! exist, rather than raw pointers.

use crate::elfio::header::FileHeader;
use crate::elfio::section::RawSectionHeader;
use crate::elfio::symbol::RawSymbol;

/// Classification assigned by the comparator to a section or symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    New,
    Changed,
    Same,
}

/// Classification assigned to a relocation entry. `Changed` is not a
/// member: relocations are compared structurally (type, offset, target),
/// not byte-for-byte, so there is no meaningful "changed but paired"
/// state for one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocationStatus {
    New,
    Same,
}

/// The behavioral split between the two section shapes the pipeline
/// cares about, modeled as a sum type rather than an anonymous union
/// gated on `sh_type`.
#[derive(Debug, Clone)]
pub enum SectionKind {
    Content(ContentSection),
    Relocation(RelocationSection),
}

/// A section that holds code, data, or a string/symbol table — anything
/// that isn't itself a relocation list.
#[derive(Debug, Clone, Default)]
pub struct ContentSection {
    /// Index of the `SHT_RELA` section that patches this one, if any.
    pub rela: Option<usize>,
    /// Index of the anonymous `STT_SECTION` symbol that names this
    /// section, if the symbol table carries one.
    pub section_symbol: Option<usize>,
    /// Index of the named `FUNC`/`OBJECT` symbol defined at offset 0 in
    /// this section, if any.
    pub entity_symbol: Option<usize>,
}

/// An `SHT_RELA` section: a list of relocation entries plus a back-link
/// to the section they patch.
#[derive(Debug, Clone)]
pub struct RelocationSection {
    pub base: usize,
    pub relocations: Vec<Relocation>,
}

/// One entry of a relocation section.
#[derive(Debug, Clone)]
pub struct Relocation {
    pub r#type: u32,
    pub offset: u64,
    pub addend: i64,
    /// Index of the target symbol within the owning graph.
    pub target: usize,
    /// The referenced string literal, materialized when the target
    /// symbol's section has `SHF_STRINGS` set.
    pub string: Option<String>,
    pub status: RelocationStatus,
    pub twin: Option<usize>,
}

/// One entry of the section header table.
#[derive(Debug, Clone)]
pub struct Section {
    pub header: RawSectionHeader,
    pub data: Vec<u8>,
    pub name: String,
    /// Position in [`Graph::sections`], also this section's on-disk
    /// section-header index (index 0, `SHN_UNDEF`, is never stored).
    pub index: usize,
    pub status: Status,
    /// Cross-*file* pairing: the index of the corresponding section in
    /// the other input graph (base<->patched), once correlated.
    pub twin: Option<usize>,
    /// Forward crosslink set during output synthesis: index of this
    /// section's copy in the output graph.
    pub output: Option<usize>,
    /// Backward crosslink: on an output-graph section, the index this
    /// section was copied from in the source (patched) graph.
    pub source: Option<usize>,
    pub kind: SectionKind,
}

impl Section {
    pub fn as_content(&self) -> Option<&ContentSection> {
        match &self.kind {
            SectionKind::Content(c) => Some(c),
            SectionKind::Relocation(_) => None,
        }
    }

    pub fn as_content_mut(&mut self) -> Option<&mut ContentSection> {
        match &mut self.kind {
            SectionKind::Content(c) => Some(c),
            SectionKind::Relocation(_) => None,
        }
    }

    pub fn as_relocation(&self) -> Option<&RelocationSection> {
        match &self.kind {
            SectionKind::Relocation(r) => Some(r),
            SectionKind::Content(_) => None,
        }
    }

    pub fn as_relocation_mut(&mut self) -> Option<&mut RelocationSection> {
        match &mut self.kind {
            SectionKind::Relocation(r) => Some(r),
            SectionKind::Content(_) => None,
        }
    }
}

/// One entry of `.symtab`.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub record: RawSymbol,
    pub name: String,
    pub index: usize,
    /// Index of the owning [`Section`], `None` for `SHN_UNDEF`/`SHN_ABS`
    /// symbols.
    pub section: Option<usize>,
    pub status: Status,
    pub twin: Option<usize>,
    pub output: Option<usize>,
    pub source: Option<usize>,
}

impl Symbol {
    pub fn bind(&self) -> Option<crate::elfio::symbol::Bind> {
        self.record.bind()
    }

    pub fn sym_type(&self) -> Option<crate::elfio::symbol::SymType> {
        self.record.sym_type()
    }

    pub fn is_local(&self) -> bool {
        matches!(self.bind(), Some(crate::elfio::symbol::Bind::Local))
    }
}

/// An entire object file, decoded into sections and symbols.
///
/// Index 0 of `symbols` is always the reserved null symbol, kept in
/// place so that on-disk symbol indexes and `Vec` indexes coincide.
#[derive(Debug, Clone)]
pub struct Graph {
    pub path: String,
    pub header: FileHeader,
    pub sections: Vec<Section>,
    pub symbols: Vec<Symbol>,
}

impl Graph {
    pub fn section(&self, index: usize) -> &Section {
        &self.sections[index]
    }

    pub fn section_mut(&mut self, index: usize) -> &mut Section {
        &mut self.sections[index]
    }

    pub fn symbol(&self, index: usize) -> &Symbol {
        &self.symbols[index]
    }

    pub fn symbol_mut(&mut self, index: usize) -> &mut Symbol {
        &mut self.symbols[index]
    }

    pub fn find_section_by_name(&self, name: &str) -> Option<usize> {
        self.sections.iter().position(|s| s.name == name)
    }

    /// Symbols are indexed from 1; index 0 is the reserved null entry and
    /// is never matched.
    pub fn find_symbol_by_name(&self, name: &str) -> Option<usize> {
        self.symbols
            .iter()
            .skip(1)
            .position(|s| s.name == name)
            .map(|p| p + 1)
    }
}
