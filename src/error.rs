//! Error type and exit-code mapping for the differencing pipeline.

/// Severity class an [`Error`] belongs to, used by `main` to choose the
/// process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Something in the environment (I/O, allocation, an internal
    /// invariant) went wrong. Maps to exit status 1.
    Operational,
    /// The two inputs cannot be reconciled: their headers, or some
    /// paired section/symbol, disagree in a way the pipeline refuses
    /// to patch over. Maps to exit status 2.
    Unreconcilable,
}

#[derive(thiserror::Error, Debug)]
/// Error type for the object-file differencing pipeline.
pub enum Error {
    #[error("an I/O error occurred: {0}")]
    Io(#[from] std::io::Error),

    #[error("{path}: not an ELF64 object ({reason})")]
    NotElf64 { path: String, reason: &'static str },

    #[error("{path}: unexpected end of section table after {count} entries")]
    TruncatedSectionTable { path: String, count: usize },

    #[error("{path}: symbol {index} references out-of-range section index {shndx}")]
    SymbolSectionOutOfRange {
        path: String,
        index: usize,
        shndx: u16,
    },

    #[error("{path}: relocation section {name:?} has no base section (expected {expected:?})")]
    RelocationBaseMissing {
        path: String,
        name: String,
        expected: String,
    },

    #[error("{path}: string table index {offset} out of range for table of size {size}")]
    StringTableOutOfRange {
        path: String,
        offset: u64,
        size: usize,
    },

    #[error("{path}: required section {name:?} is missing")]
    RequiredSectionMissing { path: String, name: &'static str },

    #[error(
        "{path}: FUNC/OBJECT symbol {name:?} has nonzero value {value:#x} inside its section"
    )]
    NonZeroEntityOffset {
        path: String,
        name: String,
        value: u64,
    },

    #[error("object headers differ: {field} ({base:?} vs {patched:?})")]
    HeaderMismatch {
        field: &'static str,
        base: String,
        patched: String,
    },

    #[error("{path} has {count} program header(s); only pure relocatable objects are supported")]
    ProgramHeadersPresent { path: String, count: u16 },

    #[error("paired section {name:?} has incompatible header field {field} ({base:?} vs {patched:?})")]
    SectionHeaderMismatch {
        name: String,
        field: &'static str,
        base: String,
        patched: String,
    },

    #[error("paired symbol {name:?} has incompatible {field} ({base:?} vs {patched:?})")]
    SymbolMismatch {
        name: String,
        field: &'static str,
        base: String,
        patched: String,
    },

    #[error("relocation targeting symbol {name:?} has no counterpart in the output object")]
    DanglingRelocationTarget { name: String },
}

impl Error {
    /// The severity class this error belongs to, and therefore the exit
    /// status `main` should report.
    pub fn severity(&self) -> Severity {
        match self {
            Error::Io(_)
            | Error::NotElf64 { .. }
            | Error::TruncatedSectionTable { .. }
            | Error::SymbolSectionOutOfRange { .. }
            | Error::RelocationBaseMissing { .. }
            | Error::StringTableOutOfRange { .. }
            | Error::RequiredSectionMissing { .. }
            | Error::NonZeroEntityOffset { .. }
            | Error::DanglingRelocationTarget { .. } => Severity::Operational,

            Error::HeaderMismatch { .. }
            | Error::ProgramHeadersPresent { .. }
            | Error::SectionHeaderMismatch { .. }
            | Error::SymbolMismatch { .. } => Severity::Unreconcilable,
        }
    }

    /// The process exit status corresponding to this error's severity.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            Severity::Operational => 1,
            Severity::Unreconcilable => 2,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
