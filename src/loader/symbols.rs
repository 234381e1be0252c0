//! Symbol-table materialisation.
//!
//! The table is loaded at most once. REL sections name their symbol table
//! through `sh_link`, and the outer scan also feeds SHT_SYMTAB sections
//! here directly, so the loader may legitimately ask for the same section
//! several times; a *different* section is a structural error.

use byteorder::{ByteOrder, LittleEndian};

use super::types::Symbol;
use crate::common::error::LoadError;
use crate::elf::constants::ELF32_SYM_SIZE;
use crate::elf::image::ElfImage;

pub(super) struct SymbolTable {
    pub ndx: usize,
    pub symbols: Vec<Symbol>,
}

pub(super) fn load_symbols(
    elf: &ElfImage,
    table: &mut Option<SymbolTable>,
    scn_ndx: usize,
) -> Result<(), LoadError> {
    if let Some(existing) = table {
        if existing.ndx == scn_ndx {
            return Ok(()); // already loaded
        }
        return Err(LoadError::MultipleSymbolTables);
    }

    let shdr = match elf.shdrs.get(scn_ndx) {
        Some(shdr) => shdr,
        None => {
            return Err(LoadError::Malformed {
                origin: elf.origin().into(),
                what: format!("symbol table section index {} out of range", scn_ndx),
            })
        }
    };
    let entsize = if shdr.entsize > 0 {
        shdr.entsize as usize
    } else {
        ELF32_SYM_SIZE
    };
    if entsize < ELF32_SYM_SIZE {
        return Err(LoadError::Malformed {
            origin: elf.origin().into(),
            what: format!("symbol table entry size {}", entsize),
        });
    }

    let data = elf.section_data(scn_ndx);
    let count = data.len() / entsize;
    let mut symbols = Vec::with_capacity(count);
    for i in 0..count {
        let off = i * entsize;
        let name_off = LittleEndian::read_u32(&data[off..off + 4]);
        let value = LittleEndian::read_u32(&data[off + 4..off + 8]);
        let info = data[off + 12];
        let shndx = LittleEndian::read_u16(&data[off + 14..off + 16]);
        symbols.push(Symbol {
            name: elf.str_at(shdr.link as usize, name_off),
            value,
            sym_type: info & 0xf,
            binding: info >> 4,
            shndx,
        });
    }

    *table = Some(SymbolTable {
        ndx: scn_ndx,
        symbols,
    });
    Ok(())
}
