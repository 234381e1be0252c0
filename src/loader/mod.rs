//! The load pipeline and the [`Binary`] aggregate it produces.
//!
//! Loading walks the section table once: stub sections and the symbol
//! table are materialised as they appear, every SHT_REL section is decoded
//! into a relocation table, and debug-relocation or RELA sections abort
//! the load. After the scan, structural requirements are enforced, stubs
//! are bound to their symbols, and the segment map is built. A failure at
//! any point drops the partial state and returns the error; a constructed
//! `Binary` is read-only apart from import resolution.

mod bind;
mod reloc;
mod report;
mod resolve;
mod segments;
mod stubs;
mod symbols;
pub mod types;


use std::path::Path;

use crate::common::error::{DiagnosticEngine, LoadError};
use crate::elf::constants::{SHT_PROGBITS, SHT_REL, SHT_RELA, SHT_SYMTAB};
use crate::elf::image::ElfImage;

pub use types::{RelocEntry, RelocTable, Segment, Stub, StubKind, Symbol};

pub(crate) const FSTUBS_SECTION: &str = ".vitalink.fstubs";
pub(crate) const VSTUBS_SECTION: &str = ".vitalink.vstubs";

/// Relocation sections left behind by unstripped debug info. The runtime
/// cannot process them, so their presence fails the load outright.
const DEBUG_RELOC_SECTIONS: [&str; 4] = [
    ".rel.debug_info",
    ".rel.debug_arange",
    ".rel.debug_line",
    ".rel.debug_frame",
];

/// A fully loaded input binary: the analysed form the module encoder
/// consumes.
#[derive(Debug)]
pub struct Binary {
    elf: ElfImage,
    symtab: Vec<Symbol>,
    #[allow(dead_code)]
    symtab_ndx: usize,
    fstubs_ndx: Option<usize>,
    vstubs_ndx: Option<usize>,
    fstubs: Vec<Stub>,
    vstubs: Vec<Stub>,
    rela_tables: Vec<RelocTable>,
    segments: Vec<Segment>,
}

impl Binary {
    /// Load and analyse an ELF file from disk.
    pub fn load(path: impl AsRef<Path>, diag: &mut DiagnosticEngine) -> Result<Self, LoadError> {
        let elf = ElfImage::open(path.as_ref())?;
        Self::from_image(elf, diag)
    }

    /// Run the analysis pipeline over an already-opened image.
    pub fn from_image(elf: ElfImage, diag: &mut DiagnosticEngine) -> Result<Self, LoadError> {
        let mut symtab: Option<symbols::SymbolTable> = None;
        let mut fstubs_ndx = None;
        let mut vstubs_ndx = None;
        let mut fstubs = Vec::new();
        let mut vstubs = Vec::new();
        let mut rela_tables: Vec<RelocTable> = Vec::new();

        // Section 0 is the NULL section; real sections start at 1.
        for ndx in 1..elf.num_sections() {
            let shdr = &elf.shdrs[ndx];
            let name = elf.section_name(ndx);

            if shdr.sh_type == SHT_PROGBITS && name == FSTUBS_SECTION {
                if fstubs_ndx.is_some() {
                    return Err(LoadError::DuplicateStubSection(FSTUBS_SECTION));
                }
                fstubs_ndx = Some(ndx);
                fstubs = stubs::load_stubs(&elf, ndx)?;
            } else if shdr.sh_type == SHT_PROGBITS && name == VSTUBS_SECTION {
                if vstubs_ndx.is_some() {
                    return Err(LoadError::DuplicateStubSection(VSTUBS_SECTION));
                }
                vstubs_ndx = Some(ndx);
                vstubs = stubs::load_stubs(&elf, ndx)?;
            }

            if DEBUG_RELOC_SECTIONS.contains(&name.as_str()) {
                return Err(LoadError::DebugInfoPresent);
            }

            match shdr.sh_type {
                SHT_SYMTAB => symbols::load_symbols(&elf, &mut symtab, ndx)?,
                SHT_REL => {
                    // The REL section names its symbol table via sh_link.
                    symbols::load_symbols(&elf, &mut symtab, shdr.link as usize)?;
                    let syms: &[Symbol] = match &symtab {
                        Some(table) => &table.symbols,
                        None => &[],
                    };
                    let table = reloc::load_rel_table(&elf, syms, ndx)?;
                    // Prepend, preserving the iteration order the encoder
                    // expects.
                    rela_tables.insert(0, table);
                }
                SHT_RELA => {
                    diag.warning("RELA sections currently unsupported");
                    return Err(LoadError::RelaUnsupported);
                }
                _ => {}
            }
        }

        if fstubs_ndx.is_none() && vstubs_ndx.is_none() {
            return Err(LoadError::NoStubSections);
        }
        let symtab = match symtab {
            Some(table) => table,
            None => return Err(LoadError::NoSymbolTable),
        };
        if rela_tables.is_empty() {
            return Err(LoadError::NoRelocTables);
        }

        if let Some(ndx) = fstubs_ndx {
            bind::bind_stub_symbols(&symtab.symbols, &mut fstubs, ndx, StubKind::Function)?;
        }
        if let Some(ndx) = vstubs_ndx {
            bind::bind_stub_symbols(&symtab.symbols, &mut vstubs, ndx, StubKind::Variable)?;
        }

        let segments = segments::load_segments(&elf)?;

        Ok(Self {
            elf,
            symtab: symtab.symbols,
            symtab_ndx: symtab.ndx,
            fstubs_ndx,
            vstubs_ndx,
            fstubs,
            vstubs,
            rela_tables,
            segments,
        })
    }

    /// The underlying ELF image; sections and program headers stay
    /// accessible for the encoder.
    pub fn elf(&self) -> &ElfImage {
        &self.elf
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symtab
    }

    pub fn function_stubs(&self) -> &[Stub] {
        &self.fstubs
    }

    pub fn variable_stubs(&self) -> &[Stub] {
        &self.vstubs
    }

    /// Section index of `.vitalink.fstubs`, when present.
    pub fn fstubs_section(&self) -> Option<usize> {
        self.fstubs_ndx
    }

    /// Section index of `.vitalink.vstubs`, when present.
    pub fn vstubs_section(&self) -> Option<usize> {
        self.vstubs_ndx
    }

    pub fn reloc_tables(&self) -> &[RelocTable] {
        &self.rela_tables
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}
