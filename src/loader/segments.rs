//! Segment map construction and guest/host address translation.
//!
//! Each loadable program header gets a fresh host address range of exactly
//! `memsz` bytes, disjoint from every other reservation. The ranges are
//! never dereferenced; they give the downstream encoder stable host
//! pointers whose arithmetic mirrors guest addresses. Translations scan the
//! segment array linearly, which is fine at the handful of segments a
//! module carries.

use super::types::Segment;
use super::Binary;
use crate::common::error::LoadError;
use crate::elf::constants::PT_ARM_EXIDX;
use crate::elf::image::ElfImage;

pub(super) fn load_segments(elf: &ElfImage) -> Result<Vec<Segment>, LoadError> {
    let mut segments = Vec::with_capacity(elf.phdrs.len());
    for (ndx, phdr) in elf.phdrs.iter().enumerate() {
        segments.push(Segment::reserve(phdr.p_type, phdr.vaddr, phdr.memsz, ndx)?);
    }
    Ok(segments)
}

impl Binary {
    /// Host pointer proxying a guest virtual address, or `None` if no
    /// segment contains it.
    pub fn vaddr_to_host(&self, vaddr: u32) -> Option<usize> {
        self.segments
            .iter()
            .find(|seg| seg.contains_vaddr(vaddr))
            .map(|seg| seg.host_base() + (vaddr - seg.vaddr) as usize)
    }

    /// Host pointer for an offset into a segment, or `None` past its end.
    pub fn segoffset_to_host(&self, segndx: usize, offset: u32) -> Option<usize> {
        let seg = self.segments.get(segndx)?;
        if offset < seg.memsz {
            Some(seg.host_base() + offset as usize)
        } else {
            None
        }
    }

    /// Guest virtual address for a host pointer; 0 for null or unmatched
    /// pointers.
    pub fn host_to_vaddr(&self, host: usize) -> u32 {
        if host == 0 {
            return 0;
        }
        for seg in &self.segments {
            if seg.contains_host(host) {
                return seg.vaddr + (host - seg.host_base()) as u32;
            }
        }
        0
    }

    /// Index of the segment whose host range contains the pointer.
    pub fn host_to_segndx(&self, host: usize) -> Option<usize> {
        self.segments.iter().position(|seg| seg.contains_host(host))
    }

    /// Offset of a host pointer inside the given segment's range.
    pub fn host_to_segoffset(&self, host: usize, segndx: usize) -> Option<u32> {
        let seg = self.segments.get(segndx)?;
        if host != 0 && seg.contains_host(host) {
            Some((host - seg.host_base()) as u32)
        } else {
            None
        }
    }

    /// Index of the segment containing a guest address.
    ///
    /// ARM exception-index segments duplicate `.ARM.extab`/`.ARM.exidx`
    /// ranges already present in a load segment; they are skipped so the
    /// load segment wins.
    pub fn vaddr_to_segndx(&self, vaddr: u32) -> Option<usize> {
        self.segments
            .iter()
            .position(|seg| seg.p_type != PT_ARM_EXIDX && seg.contains_vaddr(vaddr))
    }

    /// Offset of a guest address inside the given segment. The address is
    /// not range-checked; callers have already committed to the segment,
    /// possibly via fuzzy matching.
    pub fn vaddr_to_segoffset(&self, vaddr: u32, segndx: usize) -> u32 {
        if vaddr == 0 {
            return 0;
        }
        vaddr.wrapping_sub(self.segments[segndx].vaddr)
    }
}
