//! Test helpers: a synthetic ELF32 builder and a capturing diagnostic sink.

use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use byteorder::{ByteOrder, LittleEndian};

use crate::elf::constants::{ELF_MAGIC, EM_ARM, SHT_NOBITS, SHT_STRTAB};
use crate::elf::image::ElfImage;

/// One section to place in a built image. Section indices are assigned in
/// insertion order starting at 1 (section 0 is the NULL section); the
/// builder appends `.shstrtab` as the last section.
#[derive(Default)]
pub(crate) struct SectionSpec {
    pub name: String,
    pub sh_type: u32,
    pub flags: u32,
    pub addr: u32,
    pub data: Vec<u8>,
    pub link: u32,
    pub info: u32,
    pub entsize: u32,
}

pub(crate) struct ElfBuilder {
    machine: u16,
    class: u8,
    endian: u8,
    sections: Vec<SectionSpec>,
    phdrs: Vec<(u32, u32, u32)>,
}

impl ElfBuilder {
    pub fn new() -> Self {
        Self {
            machine: EM_ARM,
            class: 1,
            endian: 1,
            sections: Vec::new(),
            phdrs: Vec::new(),
        }
    }

    pub fn machine(mut self, machine: u16) -> Self {
        self.machine = machine;
        self
    }

    pub fn class(mut self, class: u8) -> Self {
        self.class = class;
        self
    }

    pub fn endian(mut self, endian: u8) -> Self {
        self.endian = endian;
        self
    }

    pub fn section(mut self, spec: SectionSpec) -> Self {
        self.sections.push(spec);
        self
    }

    pub fn phdr(mut self, p_type: u32, vaddr: u32, memsz: u32) -> Self {
        self.phdrs.push((p_type, vaddr, memsz));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let phnum = self.phdrs.len();
        let shnum = self.sections.len() + 2; // NULL + users + .shstrtab

        let mut shstrtab = vec![0u8];
        let mut name_offsets = Vec::with_capacity(self.sections.len());
        for spec in &self.sections {
            name_offsets.push(shstrtab.len() as u32);
            shstrtab.extend_from_slice(spec.name.as_bytes());
            shstrtab.push(0);
        }
        let shstrtab_name_off = shstrtab.len() as u32;
        shstrtab.extend_from_slice(b".shstrtab");
        shstrtab.push(0);

        let phoff = if phnum > 0 { 52u32 } else { 0 };
        let mut cursor = 52 + phnum * 32;

        let mut data_offsets = Vec::with_capacity(self.sections.len());
        for spec in &self.sections {
            cursor = (cursor + 3) & !3;
            data_offsets.push(cursor);
            if spec.sh_type != SHT_NOBITS {
                cursor += spec.data.len();
            }
        }
        cursor = (cursor + 3) & !3;
        let shstrtab_off = cursor;
        cursor += shstrtab.len();
        cursor = (cursor + 3) & !3;
        let shoff = cursor;

        let mut out = vec![0u8; 52];
        out[0..4].copy_from_slice(&ELF_MAGIC);
        out[4] = self.class;
        out[5] = self.endian;
        out[6] = 1; // EI_VERSION
        LittleEndian::write_u16(&mut out[16..18], 2); // ET_EXEC
        LittleEndian::write_u16(&mut out[18..20], self.machine);
        LittleEndian::write_u32(&mut out[20..24], 1); // e_version
        LittleEndian::write_u32(&mut out[28..32], phoff);
        LittleEndian::write_u32(&mut out[32..36], shoff as u32);
        LittleEndian::write_u16(&mut out[40..42], 52);
        LittleEndian::write_u16(&mut out[42..44], 32);
        LittleEndian::write_u16(&mut out[44..46], phnum as u16);
        LittleEndian::write_u16(&mut out[46..48], 40);
        LittleEndian::write_u16(&mut out[48..50], shnum as u16);
        LittleEndian::write_u16(&mut out[50..52], (shnum - 1) as u16);

        for &(p_type, vaddr, memsz) in &self.phdrs {
            let mut phdr = [0u8; 32];
            LittleEndian::write_u32(&mut phdr[0..4], p_type);
            LittleEndian::write_u32(&mut phdr[8..12], vaddr);
            LittleEndian::write_u32(&mut phdr[12..16], vaddr);
            LittleEndian::write_u32(&mut phdr[20..24], memsz);
            out.extend_from_slice(&phdr);
        }

        for (spec, &off) in self.sections.iter().zip(&data_offsets) {
            out.resize(off, 0);
            if spec.sh_type != SHT_NOBITS {
                out.extend_from_slice(&spec.data);
            }
        }
        out.resize(shstrtab_off, 0);
        out.extend_from_slice(&shstrtab);
        out.resize(shoff, 0);

        out.extend_from_slice(&[0u8; 40]); // NULL section header
        for ((spec, &off), &name_off) in
            self.sections.iter().zip(&data_offsets).zip(&name_offsets)
        {
            out.extend_from_slice(&shdr_bytes(
                name_off,
                spec.sh_type,
                spec.flags,
                spec.addr,
                off as u32,
                spec.data.len() as u32,
                spec.link,
                spec.info,
                spec.entsize,
            ));
        }
        out.extend_from_slice(&shdr_bytes(
            shstrtab_name_off,
            SHT_STRTAB,
            0,
            0,
            shstrtab_off as u32,
            shstrtab.len() as u32,
            0,
            0,
            0,
        ));
        out
    }

    pub fn build_image(self) -> ElfImage {
        ElfImage::from_bytes(self.build(), "test-image".into()).unwrap()
    }
}

#[allow(clippy::too_many_arguments)]
fn shdr_bytes(
    name: u32,
    sh_type: u32,
    flags: u32,
    addr: u32,
    offset: u32,
    size: u32,
    link: u32,
    info: u32,
    entsize: u32,
) -> [u8; 40] {
    let mut shdr = [0u8; 40];
    LittleEndian::write_u32(&mut shdr[0..4], name);
    LittleEndian::write_u32(&mut shdr[4..8], sh_type);
    LittleEndian::write_u32(&mut shdr[8..12], flags);
    LittleEndian::write_u32(&mut shdr[12..16], addr);
    LittleEndian::write_u32(&mut shdr[16..20], offset);
    LittleEndian::write_u32(&mut shdr[20..24], size);
    LittleEndian::write_u32(&mut shdr[24..28], link);
    LittleEndian::write_u32(&mut shdr[28..32], info);
    LittleEndian::write_u32(&mut shdr[32..36], 4);
    LittleEndian::write_u32(&mut shdr[36..40], entsize);
    shdr
}

/// Build a string table from names; returns the table and each name's
/// offset.
pub(crate) fn strtab(names: &[&str]) -> (Vec<u8>, Vec<u32>) {
    let mut table = vec![0u8];
    let mut offsets = Vec::with_capacity(names.len());
    for name in names {
        offsets.push(table.len() as u32);
        table.extend_from_slice(name.as_bytes());
        table.push(0);
    }
    (table, offsets)
}

/// Encode one ELF32 symbol-table entry.
pub(crate) fn sym_entry(name_off: u32, value: u32, info: u8, shndx: u16) -> [u8; 16] {
    let mut entry = [0u8; 16];
    LittleEndian::write_u32(&mut entry[0..4], name_off);
    LittleEndian::write_u32(&mut entry[4..8], value);
    entry[12] = info;
    LittleEndian::write_u16(&mut entry[14..16], shndx);
    entry
}

/// Encode one ELF32 REL entry.
pub(crate) fn rel_entry(offset: u32, rtype: u32, sym: u32) -> [u8; 8] {
    let mut entry = [0u8; 8];
    LittleEndian::write_u32(&mut entry[0..4], offset);
    LittleEndian::write_u32(&mut entry[4..8], (sym << 8) | (rtype & 0xFF));
    entry
}

/// Encode one 16-byte stub record (placeholder word, then the NID triple).
pub(crate) fn stub_record(library_nid: u32, module_nid: u32, target_nid: u32) -> [u8; 16] {
    let mut record = [0u8; 16];
    LittleEndian::write_u32(&mut record[4..8], library_nid);
    LittleEndian::write_u32(&mut record[8..12], module_nid);
    LittleEndian::write_u32(&mut record[12..16], target_nid);
    record
}

/// A clonable in-memory sink for capturing diagnostic output.
#[derive(Clone, Default)]
pub(crate) struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl SharedBuf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl io::Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
