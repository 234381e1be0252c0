//! ELF32-LE-ARM file reader.
//!
//! Reads the whole file into memory up front and materialises the header
//! tables, with every section's data range bounds-checked during
//! construction. All `section_data` slices borrow from the image and stay
//! valid for its lifetime; string-table reads copy eagerly into owned
//! `String`s. Section data is assumed to be one contiguous range per
//! section, which holds for files produced by a standard toolchain.

use std::fs;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};

use super::constants::*;
use crate::common::error::LoadError;

#[derive(Clone, Debug)]
pub struct Elf32Ehdr {
    #[allow(dead_code)]
    pub e_type: u16,
    pub e_machine: u16,
    #[allow(dead_code)]
    pub e_entry: u32,
    pub e_phoff: u32,
    pub e_shoff: u32,
    #[allow(dead_code)]
    pub e_flags: u32,
    pub e_phentsize: u16,
    pub e_phnum: u16,
    pub e_shentsize: u16,
    pub e_shnum: u16,
    pub e_shstrndx: u16,
}

#[derive(Clone, Debug)]
pub struct Elf32Shdr {
    pub name: u32,
    pub sh_type: u32,
    #[allow(dead_code)]
    pub flags: u32,
    pub addr: u32,
    pub offset: u32,
    pub size: u32,
    pub link: u32,
    pub info: u32,
    #[allow(dead_code)]
    pub addralign: u32,
    pub entsize: u32,
}

#[derive(Clone, Debug)]
pub struct Elf32Phdr {
    pub p_type: u32,
    #[allow(dead_code)]
    pub offset: u32,
    pub vaddr: u32,
    #[allow(dead_code)]
    pub paddr: u32,
    #[allow(dead_code)]
    pub filesz: u32,
    pub memsz: u32,
    #[allow(dead_code)]
    pub flags: u32,
    #[allow(dead_code)]
    pub align: u32,
}

/// An opened, validated ELF32-LE-ARM image.
#[derive(Debug)]
pub struct ElfImage {
    origin: String,
    data: Vec<u8>,
    pub ehdr: Elf32Ehdr,
    pub shdrs: Vec<Elf32Shdr>,
    pub phdrs: Vec<Elf32Phdr>,
}

impl ElfImage {
    /// Open and validate an ELF file from disk.
    pub fn open(path: &Path) -> Result<Self, LoadError> {
        let origin = path.display().to_string();
        let data = fs::read(path).map_err(|source| LoadError::Open {
            path: origin.clone(),
            source,
        })?;
        Self::from_bytes(data, origin)
    }

    /// Validate an in-memory ELF image. `origin` names the input in
    /// diagnostics (a path for on-disk files).
    pub fn from_bytes(data: Vec<u8>, origin: String) -> Result<Self, LoadError> {
        if data.len() < ELF32_EHDR_SIZE {
            return Err(LoadError::Malformed {
                origin,
                what: "file too small for ELF header".into(),
            });
        }
        if data[0..4] != ELF_MAGIC {
            return Err(LoadError::NotElf(origin));
        }
        let e_machine = LittleEndian::read_u16(&data[18..20]);
        if e_machine != EM_ARM {
            return Err(LoadError::NotArm(origin));
        }
        if data[4] != ELFCLASS32 || data[5] != ELFDATA2LSB {
            return Err(LoadError::NotElf32Le(origin));
        }

        let ehdr = Elf32Ehdr {
            e_type: LittleEndian::read_u16(&data[16..18]),
            e_machine,
            e_entry: LittleEndian::read_u32(&data[24..28]),
            e_phoff: LittleEndian::read_u32(&data[28..32]),
            e_shoff: LittleEndian::read_u32(&data[32..36]),
            e_flags: LittleEndian::read_u32(&data[36..40]),
            e_phentsize: LittleEndian::read_u16(&data[42..44]),
            e_phnum: LittleEndian::read_u16(&data[44..46]),
            e_shentsize: LittleEndian::read_u16(&data[46..48]),
            e_shnum: LittleEndian::read_u16(&data[48..50]),
            e_shstrndx: LittleEndian::read_u16(&data[50..52]),
        };

        let shdrs = Self::parse_shdrs(&data, &ehdr, &origin)?;
        let phdrs = Self::parse_phdrs(&data, &ehdr, &origin)?;

        if ehdr.e_shnum > 0 && ehdr.e_shstrndx as usize >= shdrs.len() {
            return Err(LoadError::Malformed {
                origin,
                what: format!("section name table index {} out of range", ehdr.e_shstrndx),
            });
        }

        // Every section's data range must sit inside the file; downstream
        // code slices without further checks.
        for (i, sh) in shdrs.iter().enumerate() {
            if sh.sh_type == SHT_NOBITS {
                continue;
            }
            let end = sh.offset as usize + sh.size as usize;
            if end > data.len() {
                return Err(LoadError::Malformed {
                    origin,
                    what: format!("section {} data extends past end of file", i),
                });
            }
        }

        Ok(Self {
            origin,
            data,
            ehdr,
            shdrs,
            phdrs,
        })
    }

    fn parse_shdrs(
        data: &[u8],
        ehdr: &Elf32Ehdr,
        origin: &str,
    ) -> Result<Vec<Elf32Shdr>, LoadError> {
        let shnum = ehdr.e_shnum as usize;
        if shnum == 0 {
            return Ok(Vec::new());
        }
        let entsize = ehdr.e_shentsize as usize;
        let shoff = ehdr.e_shoff as usize;
        if entsize < ELF32_SHDR_SIZE || shoff + shnum * entsize > data.len() {
            return Err(LoadError::Malformed {
                origin: origin.into(),
                what: "section header table extends past end of file".into(),
            });
        }
        let mut shdrs = Vec::with_capacity(shnum);
        for i in 0..shnum {
            let off = shoff + i * entsize;
            shdrs.push(Elf32Shdr {
                name: LittleEndian::read_u32(&data[off..off + 4]),
                sh_type: LittleEndian::read_u32(&data[off + 4..off + 8]),
                flags: LittleEndian::read_u32(&data[off + 8..off + 12]),
                addr: LittleEndian::read_u32(&data[off + 12..off + 16]),
                offset: LittleEndian::read_u32(&data[off + 16..off + 20]),
                size: LittleEndian::read_u32(&data[off + 20..off + 24]),
                link: LittleEndian::read_u32(&data[off + 24..off + 28]),
                info: LittleEndian::read_u32(&data[off + 28..off + 32]),
                addralign: LittleEndian::read_u32(&data[off + 32..off + 36]),
                entsize: LittleEndian::read_u32(&data[off + 36..off + 40]),
            });
        }
        Ok(shdrs)
    }

    fn parse_phdrs(
        data: &[u8],
        ehdr: &Elf32Ehdr,
        origin: &str,
    ) -> Result<Vec<Elf32Phdr>, LoadError> {
        let phnum = ehdr.e_phnum as usize;
        if phnum == 0 {
            return Ok(Vec::new());
        }
        let entsize = ehdr.e_phentsize as usize;
        let phoff = ehdr.e_phoff as usize;
        if entsize < ELF32_PHDR_SIZE || phoff + phnum * entsize > data.len() {
            return Err(LoadError::Malformed {
                origin: origin.into(),
                what: "program header table extends past end of file".into(),
            });
        }
        let mut phdrs = Vec::with_capacity(phnum);
        for i in 0..phnum {
            let off = phoff + i * entsize;
            phdrs.push(Elf32Phdr {
                p_type: LittleEndian::read_u32(&data[off..off + 4]),
                offset: LittleEndian::read_u32(&data[off + 4..off + 8]),
                vaddr: LittleEndian::read_u32(&data[off + 8..off + 12]),
                paddr: LittleEndian::read_u32(&data[off + 12..off + 16]),
                filesz: LittleEndian::read_u32(&data[off + 16..off + 20]),
                memsz: LittleEndian::read_u32(&data[off + 20..off + 24]),
                flags: LittleEndian::read_u32(&data[off + 24..off + 28]),
                align: LittleEndian::read_u32(&data[off + 28..off + 32]),
            });
        }
        Ok(phdrs)
    }

    /// The input name used in diagnostics.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn num_sections(&self) -> usize {
        self.shdrs.len()
    }

    /// Raw contents of a section. NOBITS and out-of-range sections yield an
    /// empty slice.
    pub fn section_data(&self, ndx: usize) -> &[u8] {
        match self.shdrs.get(ndx) {
            Some(sh) if sh.sh_type != SHT_NOBITS => {
                &self.data[sh.offset as usize..sh.offset as usize + sh.size as usize]
            }
            _ => &[],
        }
    }

    /// Name of a section, resolved through the section-name string table.
    pub fn section_name(&self, ndx: usize) -> String {
        match self.shdrs.get(ndx) {
            Some(sh) => self.str_at(self.ehdr.e_shstrndx as usize, sh.name),
            None => String::new(),
        }
    }

    /// Read a NUL-terminated string out of the string-table section
    /// `strtab_ndx` at byte offset `off`. Unresolvable references yield an
    /// empty string, matching what a stripped or damaged name column looks
    /// like in listings.
    pub fn str_at(&self, strtab_ndx: usize, off: u32) -> String {
        let strtab = self.section_data(strtab_ndx);
        let off = off as usize;
        if off >= strtab.len() {
            return String::new();
        }
        let end = strtab[off..]
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(strtab.len() - off);
        String::from_utf8_lossy(&strtab[off..off + end]).into_owned()
    }
}
