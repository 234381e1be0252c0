//! Input-analysis core for converting statically linked ELF32-LE-ARM
//! executables into PlayStation Vita loadable modules.
//!
//! The entry point is [`Binary::load`], which opens an ELF file, parses the
//! `.vitalink.fstubs`/`.vitalink.vstubs` import-stub sections, materialises
//! the symbol table, decodes every REL relocation (reconstructing the addend
//! from the instruction stream), binds stub records to their symbols, and
//! reserves a host address range per loadable segment. The resulting
//! [`Binary`] is the read-only input consumed by the downstream module
//! encoder; [`Binary::resolve_imports`] additionally resolves each stub's
//! NID triple against caller-supplied import catalogues.

pub mod common;
pub mod elf;
pub mod imports;
pub mod loader;

#[cfg(test)]
pub(crate) mod testutil;

pub use common::error::{DiagnosticEngine, LoadError, Severity};
pub use imports::ImportCatalogue;
pub use loader::Binary;
