//! The ELF64 symbol table entry (`Elf64_Sym`).

use std::io::{Read, Seek, Write};

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use typed_builder::TypedBuilder;

use super::{read_u16, read_u32, read_u64, write_u16, write_u32, write_u64, Endian, FromReader, ToWriter};
use crate::error::Result;

/// Special section-index values `st_shndx` may take instead of a real
/// section number.
pub const SHN_UNDEF: u16 = 0;
pub const SHN_ABS: u16 = 0xfff1;
pub const SHN_COMMON: u16 = 0xfff2;

/// `ST_BIND` component of `st_info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum Bind {
    Local = 0,
    Global = 1,
    Weak = 2,
}

/// `ST_TYPE` component of `st_info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum SymType {
    NoType = 0,
    Object = 1,
    Func = 2,
    Section = 3,
    File = 4,
    Common = 5,
    Tls = 6,
}

pub fn bind_of(info: u8) -> Option<Bind> {
    Bind::from_u8(info >> 4)
}

pub fn sym_type_of(info: u8) -> Option<SymType> {
    SymType::from_u8(info & 0xf)
}

pub fn make_info(bind: Bind, sym_type: SymType) -> u8 {
    ((bind as u8) << 4) | (sym_type as u8 & 0xf)
}

/// `Elf64_Sym`, with `st_name` left as the raw string-table offset.
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct RawSymbol {
    pub name_offset: u32,
    pub info: u8,
    pub other: u8,
    pub shndx: u16,
    pub value: u64,
    pub size: u64,
}

impl RawSymbol {
    pub const SIZE: u64 = 24;

    pub fn bind(&self) -> Option<Bind> {
        bind_of(self.info)
    }

    pub fn sym_type(&self) -> Option<SymType> {
        sym_type_of(self.info)
    }
}

impl FromReader for RawSymbol {
    fn from_reader<R: Read + Seek>(reader: &mut R, endian: Endian) -> Result<Self> {
        let name_offset = read_u32(reader, endian)?;
        let info = crate::elfio::read_u8(reader)?;
        let other = crate::elfio::read_u8(reader)?;
        let shndx = read_u16(reader, endian)?;
        let value = read_u64(reader, endian)?;
        let size = read_u64(reader, endian)?;
        Ok(RawSymbol {
            name_offset,
            info,
            other,
            shndx,
            value,
            size,
        })
    }
}

impl ToWriter for RawSymbol {
    fn to_writer<W: Write>(&self, writer: &mut W, endian: Endian) -> Result<()> {
        write_u32(writer, endian, self.name_offset)?;
        crate::elfio::write_u8(writer, self.info)?;
        crate::elfio::write_u8(writer, self.other)?;
        write_u16(writer, endian, self.shndx)?;
        write_u64(writer, endian, self.value)?;
        write_u64(writer, endian, self.size)?;
        Ok(())
    }
}
