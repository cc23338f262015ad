//! The ELF64 explicit-addend relocation entry (`Elf64_Rela`).

use std::io::{Read, Seek, Write};

use typed_builder::TypedBuilder;

use super::{read_i64, read_u64, write_i64, write_u64, Endian, FromReader, ToWriter};
use crate::error::Result;

/// `Elf64_Rela`. `r_info` is decoded into `symbol` (high 32 bits) and
/// `type_` (low 32 bits) at construction time.
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct RawRela {
    pub offset: u64,
    pub symbol: u32,
    pub type_: u32,
    pub addend: i64,
}

impl RawRela {
    pub const SIZE: u64 = 24;

    fn info(&self) -> u64 {
        ((self.symbol as u64) << 32) | self.type_ as u64
    }
}

impl FromReader for RawRela {
    fn from_reader<R: Read + Seek>(reader: &mut R, endian: Endian) -> Result<Self> {
        let offset = read_u64(reader, endian)?;
        let info = read_u64(reader, endian)?;
        let addend = read_i64(reader, endian)?;
        Ok(RawRela {
            offset,
            symbol: (info >> 32) as u32,
            type_: (info & 0xffff_ffff) as u32,
            addend,
        })
    }
}

impl ToWriter for RawRela {
    fn to_writer<W: Write>(&self, writer: &mut W, endian: Endian) -> Result<()> {
        write_u64(writer, endian, self.offset)?;
        write_u64(writer, endian, self.info())?;
        write_i64(writer, endian, self.addend)?;
        Ok(())
    }
}
