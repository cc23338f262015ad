//! The ELF64 section header (`Elf64_Shdr`) and its flags/type enums.

use std::io::{Read, Seek, Write};

use bitflags::bitflags;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use typed_builder::TypedBuilder;

use super::{read_u32, read_u64, write_u32, write_u64, Endian, FromReader, ToWriter};
use crate::error::Result;

/// `sh_type` values the pipeline actually has to reason about. Anything
/// else round-trips as an opaque `Other(u32)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum SectionType {
    Null = 0,
    ProgBits = 1,
    SymTab = 2,
    StrTab = 3,
    Rela = 4,
    Hash = 5,
    Dynamic = 6,
    Note = 7,
    NoBits = 8,
    Rel = 9,
    ShLib = 10,
    DynSym = 11,
}

impl SectionType {
    pub fn from_raw(value: u32) -> RawOrKnown<SectionType> {
        match Self::from_u32(value) {
            Some(known) => RawOrKnown::Known(known),
            None => RawOrKnown::Raw(value),
        }
    }

    pub fn to_raw(kind: &RawOrKnown<SectionType>) -> u32 {
        match kind {
            RawOrKnown::Known(k) => *k as u32,
            RawOrKnown::Raw(v) => *v,
        }
    }
}

/// Either a recognized enum value or the raw integer, for fields where the
/// pipeline must preserve unrecognized values byte-for-byte rather than
/// reject them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawOrKnown<T> {
    Known(T),
    Raw(u32),
}

bitflags! {
    /// `sh_flags` bits relevant to the differencing pipeline.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SectionFlags: u64 {
        const WRITE = 0x1;
        const ALLOC = 0x2;
        const EXECINSTR = 0x4;
        const MERGE = 0x10;
        /// SHF_STRINGS: the section holds NUL-terminated strings, the
        /// condition under which relocations materialize a string pointer.
        const STRINGS = 0x20;
        const INFO_LINK = 0x40;
        const LINK_ORDER = 0x80;
        const GROUP = 0x200;
        const TLS = 0x400;
    }
}

/// `Elf64_Shdr`, with `sh_name` left as the raw string-table offset (names
/// are resolved separately once `.shstrtab` is known).
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct RawSectionHeader {
    pub name_offset: u32,
    pub r#type: u32,
    pub flags: u64,
    pub address: u64,
    pub offset: u64,
    pub size: u64,
    /// For `SHT_SYMTAB`/`SHT_DYNSYM`: index of the associated string
    /// table. For `SHT_REL`/`SHT_RELA`: index of the associated symbol
    /// table.
    pub link: u32,
    /// For `SHT_REL`/`SHT_RELA`: index of the section the relocations
    /// apply to. For `SHT_SYMTAB`/`SHT_DYNSYM`: one greater than the
    /// index of the last local symbol.
    pub info: u32,
    pub address_align: u64,
    pub entry_size: u64,
}

impl RawSectionHeader {
    pub const SIZE: u64 = 64;

    pub fn section_type(&self) -> RawOrKnown<SectionType> {
        SectionType::from_raw(self.r#type)
    }

    pub fn section_flags(&self) -> SectionFlags {
        SectionFlags::from_bits_truncate(self.flags)
    }
}

impl FromReader for RawSectionHeader {
    fn from_reader<R: Read + Seek>(reader: &mut R, endian: Endian) -> Result<Self> {
        Ok(RawSectionHeader {
            name_offset: read_u32(reader, endian)?,
            r#type: read_u32(reader, endian)?,
            flags: read_u64(reader, endian)?,
            address: read_u64(reader, endian)?,
            offset: read_u64(reader, endian)?,
            size: read_u64(reader, endian)?,
            link: read_u32(reader, endian)?,
            info: read_u32(reader, endian)?,
            address_align: read_u64(reader, endian)?,
            entry_size: read_u64(reader, endian)?,
        })
    }
}

impl ToWriter for RawSectionHeader {
    fn to_writer<W: Write>(&self, writer: &mut W, endian: Endian) -> Result<()> {
        write_u32(writer, endian, self.name_offset)?;
        write_u32(writer, endian, self.r#type)?;
        write_u64(writer, endian, self.flags)?;
        write_u64(writer, endian, self.address)?;
        write_u64(writer, endian, self.offset)?;
        write_u64(writer, endian, self.size)?;
        write_u32(writer, endian, self.link)?;
        write_u32(writer, endian, self.info)?;
        write_u64(writer, endian, self.address_align)?;
        write_u64(writer, endian, self.entry_size)?;
        Ok(())
    }
}
