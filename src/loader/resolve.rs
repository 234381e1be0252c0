//! Import resolution.
//!
//! Each stub's NID triple is chased through the caller's catalogues:
//! library first (earliest catalogue containing the NID wins), then the
//! module within that library, then the function or variable entry within
//! the module. Failures are warnings, never fatal; the aggregate result
//! tells the driver whether everything resolved.

use super::types::{Stub, StubKind, Symbol};
use super::Binary;
use crate::common::error::DiagnosticEngine;
use crate::imports::{EntryRef, ImportCatalogue, LibraryRef, ModuleRef};

impl Binary {
    /// Resolve every stub against the given catalogues. Returns true when
    /// all stubs resolved completely.
    pub fn resolve_imports(
        &mut self,
        catalogues: &[ImportCatalogue],
        diag: &mut DiagnosticEngine,
    ) -> bool {
        let mut found_all = resolve_stub_array(
            &mut self.fstubs,
            &self.symtab,
            StubKind::Function,
            catalogues,
            diag,
        );
        found_all &= resolve_stub_array(
            &mut self.vstubs,
            &self.symtab,
            StubKind::Variable,
            catalogues,
            diag,
        );
        found_all
    }
}

fn resolve_stub_array(
    stubs: &mut [Stub],
    symtab: &[Symbol],
    kind: StubKind,
    catalogues: &[ImportCatalogue],
    diag: &mut DiagnosticEngine,
) -> bool {
    let mut found_all = true;

    for stub in stubs.iter_mut() {
        let sym_name = match stub.symbol {
            Some(ndx) => symtab[ndx].name.as_str(),
            None => "(unreferenced stub)",
        };

        let library = catalogues.iter().enumerate().find_map(|(ci, catalogue)| {
            catalogue.find_library(stub.library_nid).map(|li| LibraryRef {
                catalogue: ci,
                library: li,
            })
        });
        let library = match library {
            Some(library) => library,
            None => {
                diag.warning(format!(
                    "unable to find library with NID {} for {} symbol {}",
                    stub.library_nid,
                    kind.label(),
                    sym_name
                ));
                found_all = false;
                continue;
            }
        };
        stub.library = Some(library);

        let lib = &catalogues[library.catalogue].libraries[library.library];
        let module = match lib.find_module(stub.module_nid) {
            Some(mi) => ModuleRef {
                catalogue: library.catalogue,
                library: library.library,
                module: mi,
            },
            None => {
                diag.warning(format!(
                    "unable to find module with NID {} for {} symbol {}",
                    stub.module_nid,
                    kind.label(),
                    sym_name
                ));
                found_all = false;
                continue;
            }
        };
        stub.module = Some(module);

        let m = &lib.modules[module.module];
        let entry = match kind {
            StubKind::Function => m.find_function(stub.target_nid),
            StubKind::Variable => m.find_variable(stub.target_nid),
        };
        match entry {
            Some(ei) => {
                stub.target = Some(EntryRef {
                    catalogue: module.catalogue,
                    library: module.library,
                    module: module.module,
                    entry: ei,
                    is_function: kind == StubKind::Function,
                });
            }
            None => {
                diag.warning(format!(
                    "unable to find {} with NID {} for symbol {}",
                    kind.label(),
                    stub.target_nid,
                    sym_name
                ));
                found_all = false;
            }
        }
    }

    found_all
}
