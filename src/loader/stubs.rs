//! Parsing of the `.vitalink.fstubs`/`.vitalink.vstubs` stub sections.
//!
//! Each 16-byte record names an imported function or variable by a
//! (library, module, target) NID triple. The first word of the record is a
//! placeholder the toolchain leaves behind; the in-memory address is
//! derived from the section base and the record's offset instead.

use byteorder::{ByteOrder, LittleEndian};

use super::types::Stub;
use crate::common::error::LoadError;
use crate::elf::image::ElfImage;

pub(super) const STUB_SIZE: usize = 16;

/// Parse one stub section into its record array. A trailing partial record
/// is ignored, matching the section-size division the toolchain performs.
pub(super) fn load_stubs(elf: &ElfImage, scn_ndx: usize) -> Result<Vec<Stub>, LoadError> {
    let shdr = &elf.shdrs[scn_ndx];
    let data = elf.section_data(scn_ndx);

    let mut stubs = Vec::with_capacity(data.len() / STUB_SIZE);
    let mut off = 0;
    while off + STUB_SIZE <= data.len() {
        stubs.push(Stub {
            addr: shdr.addr + off as u32,
            library_nid: LittleEndian::read_u32(&data[off + 4..off + 8]),
            module_nid: LittleEndian::read_u32(&data[off + 8..off + 12]),
            target_nid: LittleEndian::read_u32(&data[off + 12..off + 16]),
            symbol: None,
            library: None,
            module: None,
            target: None,
        });
        off += STUB_SIZE;
    }
    Ok(stubs)
}
