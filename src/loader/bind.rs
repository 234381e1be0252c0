//! Stub-to-symbol binding.
//!
//! Every global FUNC/OBJECT symbol defined in a stub section must land on
//! exactly one stub record; the reverse is not required, so stubs without a
//! claiming symbol survive and show up as unreferenced in listings.

use super::types::{Stub, StubKind, Symbol};
use crate::common::error::LoadError;
use crate::elf::constants::{st_type_name, STB_GLOBAL, STT_FUNC, STT_OBJECT};

pub(super) fn bind_stub_symbols(
    symtab: &[Symbol],
    stubs: &mut [Stub],
    stubs_ndx: usize,
    kind: StubKind,
) -> Result<(), LoadError> {
    let want_type = kind.expected_sym_type();

    for (symndx, sym) in symtab.iter().enumerate() {
        if sym.binding != STB_GLOBAL {
            continue;
        }
        if sym.sym_type != STT_FUNC && sym.sym_type != STT_OBJECT {
            continue;
        }
        if sym.shndx as usize != stubs_ndx {
            continue;
        }

        if sym.sym_type != want_type {
            return Err(LoadError::StubTypeMismatch {
                name: sym.name.clone(),
                section: stubs_ndx,
                expected: st_type_name(want_type),
                actual: st_type_name(sym.sym_type),
            });
        }

        let stub = stubs.iter_mut().find(|stub| stub.addr == sym.value);
        match stub {
            Some(stub) => {
                if let Some(prev) = stub.symbol {
                    return Err(LoadError::DuplicateStubSymbol {
                        addr: sym.value,
                        section: stubs_ndx,
                        first: symtab[prev].name.clone(),
                        second: sym.name.clone(),
                    });
                }
                stub.symbol = Some(symndx);
            }
            None => {
                return Err(LoadError::OrphanedStubSymbol {
                    name: sym.name.clone(),
                    section: stubs_ndx,
                })
            }
        }
    }

    Ok(())
}
