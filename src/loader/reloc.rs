//! REL relocation decoding.
//!
//! The input carries SHT_REL sections, so every addend lives in the
//! instruction stream. For each entry the decoder reads the 32-bit word at
//! the relocation site, extracts the target address the compiler already
//! encoded there, and subtracts the (type-adjusted) symbol value to recover
//! the addend. Thumb-2 instructions are stored as two consecutive LE
//! halfwords, so their words get halfword-swapped before field extraction.

use byteorder::{ByteOrder, LittleEndian};

use super::types::{RelocEntry, RelocTable, Symbol};
use crate::common::error::LoadError;
use crate::elf::constants::*;
use crate::elf::image::ElfImage;

/// Swap the two 16-bit halves of a Thumb-2 instruction word so the leading
/// halfword occupies the high bits.
pub(crate) fn thumb_shuffle(x: u32) -> u32 {
    ((x & 0xFFFF_0000) >> 16) | ((x & 0xFFFF) << 16)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum RelHandling {
    Normal,
    Ignore,
    Invalid,
}

fn rel_handling(rtype: u32) -> RelHandling {
    match rtype {
        R_ARM_NONE | R_ARM_V4BX => RelHandling::Ignore,
        R_ARM_ABS32 | R_ARM_TARGET1 | R_ARM_REL32 | R_ARM_TARGET2 | R_ARM_PREL31
        | R_ARM_THM_CALL | R_ARM_CALL | R_ARM_JUMP24 | R_ARM_MOVW_ABS_NC | R_ARM_MOVT_ABS
        | R_ARM_THM_MOVW_ABS_NC | R_ARM_THM_MOVT_ABS => RelHandling::Normal,
        _ => RelHandling::Invalid,
    }
}

/// Decode the target address encoded in-place at a relocation site.
///
/// `data` is the 32-bit word read from the section, `addr` the guest
/// virtual address of the instruction. Only called for NORMAL-class types;
/// the 0xDEADBEEF sentinel marks words that carry no target.
pub(crate) fn decode_rel_target(data: u32, rtype: u32, addr: u32) -> u32 {
    match rtype {
        R_ARM_ABS32 | R_ARM_TARGET1 => data,
        R_ARM_REL32 | R_ARM_TARGET2 | R_ARM_PREL31 => data.wrapping_add(addr),
        R_ARM_THM_CALL => {
            // bl (Thumb): offset = S:I1:I2:imm10:imm11:0 with
            // I1 = NOT(J1 XOR S), I2 = NOT(J2 XOR S)
            let d = thumb_shuffle(data);
            let upper = d >> 16;
            let lower = d & 0xFFFF;
            let sign = (upper >> 10) & 1;
            let j1 = (lower >> 13) & 1;
            let j2 = (lower >> 11) & 1;
            let imm10 = upper & 0x3FF;
            let imm11 = lower & 0x7FF;
            let mut offset = imm11
                | (imm10 << 11)
                | (((j2 ^ sign) ^ 1) << 21)
                | (((j1 ^ sign) ^ 1) << 22)
                | (sign << 23);
            offset <<= 1;
            if sign != 0 {
                offset |= 0xFF00_0000;
            }
            addr.wrapping_add(offset)
        }
        R_ARM_CALL | R_ARM_JUMP24 => {
            // bl/b: bits [23:0] hold a signed word offset
            let imm26 = (data & 0x00FF_FFFF) << 2;
            let offset = ((imm26 as i32) << 6 >> 6) as u32;
            addr.wrapping_add(offset)
        }
        R_ARM_MOVW_ABS_NC => ((data & 0xF_0000) >> 4) | (data & 0xFFF),
        R_ARM_MOVT_ABS => (((data & 0xF_0000) >> 4) | (data & 0xFFF)) << 16,
        R_ARM_THM_MOVW_ABS_NC => {
            // movw (Thumb): imm16 = imm4:i:imm3:imm8
            let d = thumb_shuffle(data);
            (((d >> 16) & 0xF) << 12) | (((d >> 26) & 1) << 11) | (((d >> 12) & 7) << 8) | (d & 0xFF)
        }
        R_ARM_THM_MOVT_ABS => {
            let d = thumb_shuffle(data);
            (((d >> 16) & 0xF) << 28)
                | (((d >> 26) & 1) << 27)
                | (((d >> 12) & 7) << 24)
                | ((d & 0xFF) << 16)
        }
        _ => 0xDEAD_BEEF,
    }
}

/// Recover the addend: the decoded target minus the symbol value, with the
/// symbol bits that are not part of the relocated field masked off first.
fn compute_addend(rtype: u32, target: u32, sym_value: u32) -> i32 {
    let adjusted = match rtype {
        // MOVT only relocates the high half, MOVW only the low half; from
        // toolchain output the resulting addends are expected to be 0.
        R_ARM_MOVT_ABS | R_ARM_THM_MOVT_ABS => sym_value & 0xFFFF_0000,
        R_ARM_MOVW_ABS_NC | R_ARM_THM_MOVW_ABS_NC => sym_value & 0x0000_FFFF,
        // Bit 0 of a Thumb function's value is the mode flag, not an
        // address bit.
        R_ARM_THM_CALL => sym_value & 0xFFFF_FFFE,
        _ => sym_value,
    };
    target.wrapping_sub(adjusted) as i32
}

/// Decode one SHT_REL section into a relocation table targeting the section
/// named by its `sh_info` field.
pub(super) fn load_rel_table(
    elf: &ElfImage,
    symtab: &[Symbol],
    scn_ndx: usize,
) -> Result<RelocTable, LoadError> {
    let shdr = &elf.shdrs[scn_ndx];
    let entsize = if shdr.entsize > 0 {
        shdr.entsize as usize
    } else {
        ELF32_REL_SIZE
    };
    if entsize < ELF32_REL_SIZE {
        return Err(LoadError::Malformed {
            origin: elf.origin().into(),
            what: format!("REL entry size {}", entsize),
        });
    }

    let target_ndx = shdr.info as usize;
    let target_shdr = match elf.shdrs.get(target_ndx) {
        Some(shdr) => shdr,
        None => {
            return Err(LoadError::Malformed {
                origin: elf.origin().into(),
                what: format!("REL section {} targets missing section {}", scn_ndx, target_ndx),
            })
        }
    };
    let text = elf.section_data(target_ndx);
    let rel_data = elf.section_data(scn_ndx);

    let count = rel_data.len() / entsize;
    let mut entries = Vec::with_capacity(count);
    for i in 0..count {
        let off = i * entsize;
        let r_offset = LittleEndian::read_u32(&rel_data[off..off + 4]);
        let r_info = LittleEndian::read_u32(&rel_data[off + 4..off + 8]);
        let mut rtype = r_info & 0xFF;
        let sym = r_info >> 8;

        // The runtime only supports R_ARM_THM_CALL; R_ARM_THM_JUMP24 is
        // functionally the same for this pipeline.
        if rtype == R_ARM_THM_JUMP24 {
            rtype = R_ARM_THM_CALL;
        }
        // PC-relative and already fully encoded in the instruction.
        if rtype == R_ARM_THM_PC11 {
            continue;
        }

        match rel_handling(rtype) {
            RelHandling::Ignore => {
                entries.push(RelocEntry {
                    offset: r_offset,
                    rtype,
                    symbol: None,
                    addend: 0,
                });
                continue;
            }
            RelHandling::Invalid => return Err(LoadError::InvalidRelocType(rtype)),
            RelHandling::Normal => {}
        }

        if r_offset < target_shdr.addr {
            return Err(LoadError::RelocOffsetOutOfRange {
                offset: r_offset,
                target: target_ndx,
            });
        }
        let text_off = (r_offset - target_shdr.addr) as usize;
        if text_off + 4 > text.len() {
            return Err(LoadError::RelocOffsetOutOfRange {
                offset: r_offset,
                target: target_ndx,
            });
        }
        let insn = LittleEndian::read_u32(&text[text_off..text_off + 4]);

        if sym as usize >= symtab.len() {
            return Err(LoadError::SymbolIndexOutOfRange {
                sym,
                num: symtab.len(),
            });
        }

        let target = decode_rel_target(insn, rtype, r_offset);
        entries.push(RelocEntry {
            offset: r_offset,
            rtype,
            symbol: Some(sym as usize),
            addend: compute_addend(rtype, target, symtab[sym as usize].value),
        });
    }

    Ok(RelocTable {
        target_ndx,
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Re-encoders for the round-trip tests: each takes a decoded target (or
    // its offset/immediate) and rebuilds the instruction word the decoder
    // ought to have started from.

    fn encode_movw_movt(template: u32, val: u32) -> u32 {
        let imm12 = val & 0xFFF;
        let imm4 = (val >> 12) & 0xF;
        (template & 0xFFF0_F000) | (imm4 << 16) | imm12
    }

    fn encode_call(template: u32, offset: i32) -> u32 {
        let imm24 = ((offset >> 2) as u32) & 0x00FF_FFFF;
        (template & 0xFF00_0000) | imm24
    }

    // Thumb-2 BL, stored as two LE halfwords: upper = word[15:0].
    fn encode_thm_branch(offset: i32) -> u32 {
        let s = if offset < 0 { 1u32 } else { 0u32 };
        let uoffset = (offset as u32) >> 1;
        let imm11 = uoffset & 0x7FF;
        let imm10 = (uoffset >> 11) & 0x3FF;
        let i2 = (uoffset >> 21) & 1;
        let i1 = (uoffset >> 22) & 1;
        let j1 = ((i1 ^ s) ^ 1) & 1;
        let j2 = ((i2 ^ s) ^ 1) & 1;
        let upper = 0xF000 | (s << 10) | imm10;
        let lower = 0xD000 | (j1 << 13) | (j2 << 11) | imm11;
        upper | (lower << 16)
    }

    // Thumb-2 MOVW/MOVT: imm16 = imm4:i:imm3:imm8, Rd = r0.
    fn encode_thm_movw_movt(template_upper: u32, val: u32) -> u32 {
        let imm8 = val & 0xFF;
        let imm3 = (val >> 8) & 0x7;
        let i = (val >> 11) & 1;
        let imm4 = (val >> 12) & 0xF;
        let upper = template_upper | (i << 10) | imm4;
        let lower = (imm3 << 12) | imm8;
        upper | (lower << 16)
    }

    #[test]
    fn test_thumb_shuffle_swaps_halfwords() {
        assert_eq!(thumb_shuffle(0x1234_5678), 0x5678_1234);
        assert_eq!(thumb_shuffle(thumb_shuffle(0xF7FF_FFFE)), 0xF7FF_FFFE);
    }

    #[test]
    fn test_abs32_is_raw_word() {
        assert_eq!(decode_rel_target(0x0009_0004, R_ARM_ABS32, 0x8_2000), 0x0009_0004);
        assert_eq!(decode_rel_target(0x0009_0004, R_ARM_TARGET1, 0), 0x0009_0004);
    }

    #[test]
    fn test_rel32_adds_site_address() {
        assert_eq!(decode_rel_target(0x100, R_ARM_REL32, 0x8_1000), 0x8_1100);
        assert_eq!(decode_rel_target(0x100, R_ARM_TARGET2, 0x8_1000), 0x8_1100);
        assert_eq!(decode_rel_target(0x100, R_ARM_PREL31, 0x8_1000), 0x8_1100);
    }

    #[test]
    fn test_call_forward_and_backward() {
        let addr = 0x8_1000;
        // bl +0x40
        let insn = encode_call(0xEB00_0000, 0x40);
        assert_eq!(decode_rel_target(insn, R_ARM_CALL, addr), addr + 0x40);
        // bl -0x40
        let insn = encode_call(0xEB00_0000, -0x40);
        assert_eq!(decode_rel_target(insn, R_ARM_JUMP24, addr), addr - 0x40);
    }

    #[test]
    fn test_movw_movt_immediates() {
        let insn = encode_movw_movt(0xE300_0000, 0x1234);
        assert_eq!(decode_rel_target(insn, R_ARM_MOVW_ABS_NC, 0), 0x1234);

        let insn = encode_movw_movt(0xE340_0000, 0xDEAD);
        assert_eq!(decode_rel_target(insn, R_ARM_MOVT_ABS, 0), 0xDEAD_0000);
    }

    #[test]
    fn test_thm_movw_movt_immediates() {
        let insn = encode_thm_movw_movt(0xF240, 0x1234);
        assert_eq!(decode_rel_target(insn, R_ARM_THM_MOVW_ABS_NC, 0), 0x1234);

        let insn = encode_thm_movw_movt(0xF2C0, 0xBEEF);
        assert_eq!(decode_rel_target(insn, R_ARM_THM_MOVT_ABS, 0), 0xBEEF_0000);
    }

    #[test]
    fn test_thm_call_forward_and_backward() {
        let addr = 0x8_1000;
        let insn = encode_thm_branch(0x100);
        assert_eq!(decode_rel_target(insn, R_ARM_THM_CALL, addr), addr + 0x100);

        let insn = encode_thm_branch(-4);
        assert_eq!(decode_rel_target(insn, R_ARM_THM_CALL, addr), addr - 4);

        let insn = encode_thm_branch(-0x20_0000);
        assert_eq!(decode_rel_target(insn, R_ARM_THM_CALL, addr), addr - 0x20_0000);
    }

    #[test]
    fn test_decode_encode_round_trip() {
        // decode ∘ encode must be the identity on representable targets for
        // every immediate/branch form.
        for &imm in &[0u32, 1, 0x7FF, 0x800, 0x1234, 0xFFFF] {
            let movw = encode_movw_movt(0xE300_0000, imm);
            assert_eq!(decode_rel_target(movw, R_ARM_MOVW_ABS_NC, 0), imm);
            assert_eq!(encode_movw_movt(0xE300_0000, decode_rel_target(movw, R_ARM_MOVW_ABS_NC, 0)), movw);

            let movt = encode_movw_movt(0xE340_0000, imm);
            let target = decode_rel_target(movt, R_ARM_MOVT_ABS, 0);
            assert_eq!(target, imm << 16);
            assert_eq!(encode_movw_movt(0xE340_0000, target >> 16), movt);

            let tmovw = encode_thm_movw_movt(0xF240, imm);
            assert_eq!(decode_rel_target(tmovw, R_ARM_THM_MOVW_ABS_NC, 0), imm);
            assert_eq!(encode_thm_movw_movt(0xF240, decode_rel_target(tmovw, R_ARM_THM_MOVW_ABS_NC, 0)), tmovw);

            let tmovt = encode_thm_movw_movt(0xF2C0, imm);
            let target = decode_rel_target(tmovt, R_ARM_THM_MOVT_ABS, 0);
            assert_eq!(target, imm << 16);
            assert_eq!(encode_thm_movw_movt(0xF2C0, target >> 16), tmovt);
        }

        let addr = 0x10_0000u32;
        for &offset in &[0i32, 4, -4, 0x40, -0x40, 0x3F_FFFC, -0x40_0000] {
            let call = encode_call(0xEB00_0000, offset);
            let target = decode_rel_target(call, R_ARM_CALL, addr);
            assert_eq!(target, addr.wrapping_add(offset as u32));
            assert_eq!(encode_call(0xEB00_0000, target.wrapping_sub(addr) as i32), call);
        }
        for &offset in &[0i32, 2, -4, 0x100, -0x100, 0xFF_FFFE, -0x100_0000] {
            let bl = encode_thm_branch(offset);
            let target = decode_rel_target(bl, R_ARM_THM_CALL, addr);
            assert_eq!(target, addr.wrapping_add(offset as u32));
            assert_eq!(encode_thm_branch(target.wrapping_sub(addr) as i32), bl);
        }
    }

    #[test]
    fn test_addend_masking() {
        // MOVW/MOVT relocate one half each; the other half of the symbol
        // value must not leak into the addend.
        assert_eq!(compute_addend(R_ARM_MOVW_ABS_NC, 0x1234, 0xDEAD_1234), 0);
        assert_eq!(compute_addend(R_ARM_MOVT_ABS, 0xDEAD_0000, 0xDEAD_1234), 0);
        assert_eq!(compute_addend(R_ARM_THM_MOVW_ABS_NC, 0x1234, 0xDEAD_1234), 0);
        assert_eq!(compute_addend(R_ARM_THM_MOVT_ABS, 0xDEAD_0000, 0xDEAD_1234), 0);

        // Thumb bit masked for THM_CALL.
        assert_eq!(compute_addend(R_ARM_THM_CALL, 0x8_1004, 0x8_1001), 4);

        // Everything else subtracts the raw value.
        assert_eq!(compute_addend(R_ARM_ABS32, 0x0009_0004, 0x9_0000), 4);
        assert_eq!(compute_addend(R_ARM_ABS32, 0x8_FFFC, 0x9_0000), -4);
    }

    #[test]
    fn test_classification() {
        assert!(matches!(rel_handling(R_ARM_NONE), RelHandling::Ignore));
        assert!(matches!(rel_handling(R_ARM_V4BX), RelHandling::Ignore));
        assert!(matches!(rel_handling(R_ARM_ABS32), RelHandling::Normal));
        assert!(matches!(rel_handling(R_ARM_THM_CALL), RelHandling::Normal));
        assert!(matches!(rel_handling(99), RelHandling::Invalid));
    }
}
