//! The ELF64 file header (`Elf64_Ehdr`).

use std::io::{Read, Seek, Write};

use typed_builder::TypedBuilder;

use super::{
    read_u16, read_u32, read_u64, write_u16, write_u32, write_u64, Endian, FromReader, ToWriter,
    EI_NIDENT, ELF_CLASS_64, ELF_MAGIC,
};
use crate::error::{Error, Result};

/// `e_type` values relevant to relocatable objects.
pub const ET_REL: u16 = 1;

/// The fixed-size portion of an ELF64 file header, with the 16-byte
/// `e_ident` array decoded into its class/data/version fields.
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct FileHeader {
    pub endian: Endian,
    pub os_abi: u8,
    pub abi_version: u8,
    pub r#type: u16,
    pub machine: u16,
    pub version: u32,
    pub entry: u64,
    pub program_header_offset: u64,
    pub section_header_offset: u64,
    pub flags: u32,
    pub header_size: u16,
    pub program_header_entry_size: u16,
    pub program_header_entry_count: u16,
    pub section_header_entry_size: u16,
    pub section_header_entry_count: u16,
    pub section_name_string_table_index: u16,
}

impl FileHeader {
    /// Size of the ELF64 header on disk.
    pub const SIZE: u64 = 64;
}

impl FromReader for FileHeader {
    fn from_reader<R: Read + Seek>(reader: &mut R, _endian: Endian) -> Result<Self> {
        let mut ident = [0u8; EI_NIDENT];
        reader.read_exact(&mut ident)?;
        if ident[0..4] != ELF_MAGIC {
            return Err(Error::NotElf64 {
                path: String::new(),
                reason: "missing ELF magic",
            });
        }
        if ident[4] != ELF_CLASS_64 {
            return Err(Error::NotElf64 {
                path: String::new(),
                reason: "not an ELFCLASS64 object",
            });
        }
        let endian = Endian::from_ei_data(ident[5])?;
        let os_abi = ident[7];
        let abi_version = ident[8];

        let r#type = read_u16(reader, endian)?;
        let machine = read_u16(reader, endian)?;
        let version = read_u32(reader, endian)?;
        let entry = read_u64(reader, endian)?;
        let program_header_offset = read_u64(reader, endian)?;
        let section_header_offset = read_u64(reader, endian)?;
        let flags = read_u32(reader, endian)?;
        let header_size = read_u16(reader, endian)?;
        let program_header_entry_size = read_u16(reader, endian)?;
        let program_header_entry_count = read_u16(reader, endian)?;
        let section_header_entry_size = read_u16(reader, endian)?;
        let section_header_entry_count = read_u16(reader, endian)?;
        let section_name_string_table_index = read_u16(reader, endian)?;

        Ok(FileHeader {
            endian,
            os_abi,
            abi_version,
            r#type,
            machine,
            version,
            entry,
            program_header_offset,
            section_header_offset,
            flags,
            header_size,
            program_header_entry_size,
            program_header_entry_count,
            section_header_entry_size,
            section_header_entry_count,
            section_name_string_table_index,
        })
    }
}

impl ToWriter for FileHeader {
    fn to_writer<W: Write>(&self, writer: &mut W, _endian: Endian) -> Result<()> {
        let mut ident = [0u8; EI_NIDENT];
        ident[0..4].copy_from_slice(&ELF_MAGIC);
        ident[4] = ELF_CLASS_64;
        ident[5] = self.endian.to_ei_data();
        ident[6] = 1; // EV_CURRENT
        ident[7] = self.os_abi;
        ident[8] = self.abi_version;
        writer.write_all(&ident)?;

        write_u16(writer, self.endian, self.r#type)?;
        write_u16(writer, self.endian, self.machine)?;
        write_u32(writer, self.endian, self.version)?;
        write_u64(writer, self.endian, self.entry)?;
        write_u64(writer, self.endian, self.program_header_offset)?;
        write_u64(writer, self.endian, self.section_header_offset)?;
        write_u32(writer, self.endian, self.flags)?;
        write_u16(writer, self.endian, self.header_size)?;
        write_u16(writer, self.endian, self.program_header_entry_size)?;
        write_u16(writer, self.endian, self.program_header_entry_count)?;
        write_u16(writer, self.endian, self.section_header_entry_size)?;
        write_u16(writer, self.endian, self.section_header_entry_count)?;
        write_u16(writer, self.endian, self.section_name_string_table_index)?;
        Ok(())
    }
}
