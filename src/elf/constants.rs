//! ELF32 and ARM relocation constants used by the loader.
//!
//! These are the raw ELF spec constants, organized by category matching the
//! ELF specification sections, plus the name-decode helpers used in
//! diagnostics.

// ── ELF identification ───────────────────────────────────────────────────────

pub const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

pub const ELFCLASS32: u8 = 1;
pub const ELFDATA2LSB: u8 = 1;

// ── Machine types ────────────────────────────────────────────────────────────

pub const EM_ARM: u16 = 40;

// ── Section header types ─────────────────────────────────────────────────────

pub const SHT_PROGBITS: u32 = 1;
pub const SHT_SYMTAB: u32 = 2;
pub const SHT_STRTAB: u32 = 3;
pub const SHT_RELA: u32 = 4;
pub const SHT_NOBITS: u32 = 8;
pub const SHT_REL: u32 = 9;

// ── Symbol binding ───────────────────────────────────────────────────────────

pub const STB_LOCAL: u8 = 0;
pub const STB_GLOBAL: u8 = 1;

// ── Symbol types ─────────────────────────────────────────────────────────────

pub const STT_NOTYPE: u8 = 0;
pub const STT_OBJECT: u8 = 1;
pub const STT_FUNC: u8 = 2;
pub const STT_SECTION: u8 = 3;
pub const STT_FILE: u8 = 4;

// ── Program header types ─────────────────────────────────────────────────────

pub const PT_LOAD: u32 = 1;
/// ARM exception-index table segment. Its address range duplicates the
/// `.ARM.exidx`/`.ARM.extab` data already covered by a load segment.
pub const PT_ARM_EXIDX: u32 = 0x7000_0001;

// ── ARM relocation types ─────────────────────────────────────────────────────

pub const R_ARM_NONE: u32 = 0;
pub const R_ARM_ABS32: u32 = 2;
pub const R_ARM_REL32: u32 = 3;
pub const R_ARM_THM_CALL: u32 = 10;
pub const R_ARM_CALL: u32 = 28;
pub const R_ARM_JUMP24: u32 = 29;
pub const R_ARM_THM_JUMP24: u32 = 30;
pub const R_ARM_TARGET1: u32 = 38;
pub const R_ARM_V4BX: u32 = 40;
pub const R_ARM_TARGET2: u32 = 41;
pub const R_ARM_PREL31: u32 = 42;
pub const R_ARM_MOVW_ABS_NC: u32 = 43;
pub const R_ARM_MOVT_ABS: u32 = 44;
pub const R_ARM_THM_MOVW_ABS_NC: u32 = 47;
pub const R_ARM_THM_MOVT_ABS: u32 = 48;
pub const R_ARM_THM_PC11: u32 = 102;

// ── Structure sizes ──────────────────────────────────────────────────────────

/// Size of ELF32 header in bytes.
pub const ELF32_EHDR_SIZE: usize = 52;
/// Size of ELF32 section header in bytes.
pub const ELF32_SHDR_SIZE: usize = 40;
/// Size of ELF32 program header in bytes.
pub const ELF32_PHDR_SIZE: usize = 32;
/// Size of ELF32 symbol table entry in bytes.
pub const ELF32_SYM_SIZE: usize = 16;
/// Size of ELF32 REL relocation entry in bytes.
pub const ELF32_REL_SIZE: usize = 8;

// ── Name decoding ────────────────────────────────────────────────────────────

/// Human-readable name of an ARM relocation type.
pub fn rel_type_name(rtype: u32) -> &'static str {
    match rtype {
        R_ARM_NONE => "R_ARM_NONE",
        R_ARM_ABS32 => "R_ARM_ABS32",
        R_ARM_REL32 => "R_ARM_REL32",
        R_ARM_THM_CALL => "R_ARM_THM_CALL",
        R_ARM_CALL => "R_ARM_CALL",
        R_ARM_JUMP24 => "R_ARM_JUMP24",
        R_ARM_THM_JUMP24 => "R_ARM_THM_JUMP24",
        R_ARM_TARGET1 => "R_ARM_TARGET1",
        R_ARM_V4BX => "R_ARM_V4BX",
        R_ARM_TARGET2 => "R_ARM_TARGET2",
        R_ARM_PREL31 => "R_ARM_PREL31",
        R_ARM_MOVW_ABS_NC => "R_ARM_MOVW_ABS_NC",
        R_ARM_MOVT_ABS => "R_ARM_MOVT_ABS",
        R_ARM_THM_MOVW_ABS_NC => "R_ARM_THM_MOVW_ABS_NC",
        R_ARM_THM_MOVT_ABS => "R_ARM_THM_MOVT_ABS",
        R_ARM_THM_PC11 => "R_ARM_THM_PC11",
        _ => "R_ARM_unknown",
    }
}

/// Human-readable name of a symbol type.
pub fn st_type_name(sym_type: u8) -> &'static str {
    match sym_type {
        STT_NOTYPE => "STT_NOTYPE",
        STT_OBJECT => "STT_OBJECT",
        STT_FUNC => "STT_FUNC",
        STT_SECTION => "STT_SECTION",
        STT_FILE => "STT_FILE",
        _ => "STT_unknown",
    }
}
