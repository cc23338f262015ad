//! Pre-correlation sanity checks on the two loaded object headers.

use crate::error::{Error, Result};
use crate::model::Graph;

fn check<T: PartialEq + std::fmt::Debug>(field: &'static str, base: T, patched: T) -> Result<()> {
    if base != patched {
        Err(Error::HeaderMismatch {
            field,
            base: format!("{base:?}"),
            patched: format!("{patched:?}"),
        })
    } else {
        Ok(())
    }
}

/// The two input headers must agree on everything that describes the
/// binary's identity and layout conventions; neither may carry program
/// headers (this pipeline only ever sees pure relocatable objects).
pub fn validate(base: &Graph, patched: &Graph) -> Result<()> {
    if base.header.program_header_entry_count != 0 {
        return Err(Error::ProgramHeadersPresent {
            path: base.path.clone(),
            count: base.header.program_header_entry_count,
        });
    }
    if patched.header.program_header_entry_count != 0 {
        return Err(Error::ProgramHeadersPresent {
            path: patched.path.clone(),
            count: patched.header.program_header_entry_count,
        });
    }

    check("e_ident[EI_DATA]", base.header.endian.to_ei_data(), patched.header.endian.to_ei_data())?;
    check("e_ident[EI_OSABI]", base.header.os_abi, patched.header.os_abi)?;
    check("e_type", base.header.r#type, patched.header.r#type)?;
    check("e_machine", base.header.machine, patched.header.machine)?;
    check("e_version", base.header.version, patched.header.version)?;
    check("e_entry", base.header.entry, patched.header.entry)?;
    check(
        "e_phoff",
        base.header.program_header_offset,
        patched.header.program_header_offset,
    )?;
    check("e_flags", base.header.flags, patched.header.flags)?;
    check("e_ehsize", base.header.header_size, patched.header.header_size)?;
    check(
        "e_phentsize",
        base.header.program_header_entry_size,
        patched.header.program_header_entry_size,
    )?;
    check(
        "e_shentsize",
        base.header.section_header_entry_size,
        patched.header.section_header_entry_size,
    )?;

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::elfio::header::FileHeader;
    use crate::elfio::Endian;

    fn header() -> FileHeader {
        FileHeader::builder()
            .endian(Endian::Little)
            .os_abi(0)
            .abi_version(0)
            .r#type(1)
            .machine(62)
            .version(1)
            .entry(0)
            .program_header_offset(0)
            .section_header_offset(64)
            .flags(0)
            .header_size(64)
            .program_header_entry_size(0)
            .program_header_entry_count(0)
            .section_header_entry_size(64)
            .section_header_entry_count(1)
            .section_name_string_table_index(0)
            .build()
    }

    fn graph(header: FileHeader) -> Graph {
        Graph {
            path: "x.o".into(),
            header,
            sections: Vec::new(),
            symbols: Vec::new(),
        }
    }

    #[test]
    fn accepts_matching_headers() {
        assert!(validate(&graph(header()), &graph(header())).is_ok());
    }

    #[test]
    fn rejects_machine_mismatch() {
        let mut patched = header();
        patched.machine = 183; // EM_AARCH64
        assert!(validate(&graph(header()), &graph(patched)).is_err());
    }

    #[test]
    fn rejects_program_headers() {
        let mut base = header();
        base.program_header_entry_count = 1;
        assert!(validate(&graph(base), &graph(header())).is_err());
    }
}
