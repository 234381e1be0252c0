//! Human-readable listings of the loaded state.
//!
//! These are the dumps a driver prints after a successful load: stub
//! arrays with their resolved import names, relocation tables, and the
//! segment map. All of them write to a caller-supplied sink.

use std::io::{self, Write};

use super::types::Stub;
use super::Binary;
use crate::elf::constants::rel_type_name;
use crate::imports::ImportCatalogue;

impl Binary {
    /// List both stub arrays, naming each stub's symbol and whatever the
    /// resolver attached to it.
    pub fn list_stubs<W: Write>(
        &self,
        out: &mut W,
        catalogues: &[ImportCatalogue],
    ) -> io::Result<()> {
        if let Some(ndx) = self.fstubs_ndx {
            writeln!(out, "Function stubs in section {}:", ndx)?;
            self.print_stub_array(out, &self.fstubs, catalogues)?;
        }
        if let Some(ndx) = self.vstubs_ndx {
            writeln!(out, "Variable stubs in section {}:", ndx)?;
            self.print_stub_array(out, &self.vstubs, catalogues)?;
        }
        Ok(())
    }

    fn print_stub_array<W: Write>(
        &self,
        out: &mut W,
        stubs: &[Stub],
        catalogues: &[ImportCatalogue],
    ) -> io::Result<()> {
        for stub in stubs {
            let sym_name = match stub.symbol {
                Some(ndx) => self.symtab[ndx].name.as_str(),
                None => "unreferenced stub",
            };
            writeln!(out, "  0x{:06x} ({}):", stub.addr, sym_name)?;
            let library = stub
                .library
                .and_then(|r| r.lookup(catalogues))
                .map(|lib| lib.name.as_str())
                .unwrap_or("not found");
            writeln!(out, "    Library: {} ({})", stub.library_nid, library)?;
            let module = stub
                .module
                .and_then(|r| r.lookup(catalogues))
                .map(|module| module.name.as_str())
                .unwrap_or("not found");
            writeln!(out, "    Module : {} ({})", stub.module_nid, module)?;
            let target = stub
                .target
                .and_then(|r| r.lookup(catalogues))
                .map(|entry| entry.name.as_str())
                .unwrap_or("not found");
            writeln!(out, "    NID    : {} ({})", stub.target_nid, target)?;
        }
        Ok(())
    }

    /// List every relocation table in chain order.
    pub fn list_relocations<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for table in &self.rela_tables {
            writeln!(
                out,
                "  Relocations for section {}: {}",
                table.target_ndx,
                self.elf.section_name(table.target_ndx)
            )?;
            for entry in &table.entries {
                match entry.symbol {
                    Some(ndx) => writeln!(
                        out,
                        "    offset {:06x}: type {}, {}{:+}",
                        entry.offset,
                        rel_type_name(entry.rtype),
                        self.symtab[ndx].name,
                        entry.addend
                    )?,
                    None if entry.offset != 0 => writeln!(
                        out,
                        "    offset {:06x}: type {}, absolute {:06x}",
                        entry.offset,
                        rel_type_name(entry.rtype),
                        entry.addend as u32
                    )?,
                    None => {}
                }
            }
        }
        Ok(())
    }

    /// List the segment map with guest and reserved host ranges, plus a few
    /// sample translations through each segment.
    pub fn list_segments<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for (ndx, seg) in self.segments.iter().enumerate() {
            writeln!(
                out,
                "  Segment {}: vaddr {:06x}, size 0x{:x}",
                ndx, seg.vaddr, seg.memsz
            )?;
            if seg.memsz > 0 {
                let host_base = seg.host_base();
                writeln!(
                    out,
                    "    Host address region: 0x{:x} - 0x{:x}",
                    host_base,
                    seg.host_end()
                )?;
                writeln!(
                    out,
                    "    4 bytes into segment (0x{:x}): {:x}",
                    host_base + 4,
                    self.host_to_vaddr(host_base + 4)
                )?;
                writeln!(
                    out,
                    "    addr of 8 bytes into segment ({:x}): 0x{:x}",
                    seg.vaddr + 8,
                    self.vaddr_to_host(seg.vaddr + 8).unwrap_or(0)
                )?;
                writeln!(
                    out,
                    "    12 bytes into segment offset (0x{:x}): {}",
                    host_base + 12,
                    self.host_to_segoffset(host_base + 12, ndx)
                        .map(i64::from)
                        .unwrap_or(-1)
                )?;
                writeln!(
                    out,
                    "    addr of 16 bytes into segment (16): 0x{:x}",
                    self.segoffset_to_host(ndx, 16).unwrap_or(0)
                )?;
            }
        }
        Ok(())
    }
}
