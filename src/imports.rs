//! In-memory import catalogue: libraries, modules, and their exported
//! entries, keyed by NID.
//!
//! Parsing of import-description files is left to the caller; this module
//! only provides the lookup surface the resolver needs. Resolutions are
//! recorded as index paths (`LibraryRef`/`ModuleRef`/`EntryRef`) into the
//! caller's catalogue slice, so the catalogues retain ownership of every
//! descriptor.

/// A single importable function or variable.
#[derive(Clone, Debug)]
pub struct ImportEntry {
    pub nid: u32,
    pub name: String,
}

/// A module within a library, holding its exported functions and variables.
#[derive(Clone, Debug)]
pub struct ImportModule {
    pub nid: u32,
    pub name: String,
    pub functions: Vec<ImportEntry>,
    pub variables: Vec<ImportEntry>,
}

/// A library grouping one or more modules.
#[derive(Clone, Debug)]
pub struct ImportLibrary {
    pub nid: u32,
    pub name: String,
    pub modules: Vec<ImportModule>,
}

/// An ordered set of libraries loaded from one import database.
#[derive(Clone, Debug, Default)]
pub struct ImportCatalogue {
    pub libraries: Vec<ImportLibrary>,
}

impl ImportCatalogue {
    pub fn find_library(&self, nid: u32) -> Option<usize> {
        self.libraries.iter().position(|lib| lib.nid == nid)
    }
}

impl ImportLibrary {
    pub fn find_module(&self, nid: u32) -> Option<usize> {
        self.modules.iter().position(|module| module.nid == nid)
    }
}

impl ImportModule {
    pub fn find_function(&self, nid: u32) -> Option<usize> {
        self.functions.iter().position(|entry| entry.nid == nid)
    }

    pub fn find_variable(&self, nid: u32) -> Option<usize> {
        self.variables.iter().position(|entry| entry.nid == nid)
    }
}

/// Resolved reference to a library in a catalogue slice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LibraryRef {
    pub catalogue: usize,
    pub library: usize,
}

/// Resolved reference to a module.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModuleRef {
    pub catalogue: usize,
    pub library: usize,
    pub module: usize,
}

/// Resolved reference to a function or variable entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntryRef {
    pub catalogue: usize,
    pub library: usize,
    pub module: usize,
    pub entry: usize,
    pub is_function: bool,
}

impl LibraryRef {
    pub fn lookup<'a>(&self, catalogues: &'a [ImportCatalogue]) -> Option<&'a ImportLibrary> {
        catalogues.get(self.catalogue)?.libraries.get(self.library)
    }
}

impl ModuleRef {
    pub fn lookup<'a>(&self, catalogues: &'a [ImportCatalogue]) -> Option<&'a ImportModule> {
        catalogues
            .get(self.catalogue)?
            .libraries
            .get(self.library)?
            .modules
            .get(self.module)
    }
}

impl EntryRef {
    pub fn lookup<'a>(&self, catalogues: &'a [ImportCatalogue]) -> Option<&'a ImportEntry> {
        let module = ModuleRef {
            catalogue: self.catalogue,
            library: self.library,
            module: self.module,
        }
        .lookup(catalogues)?;
        if self.is_function {
            module.functions.get(self.entry)
        } else {
            module.variables.get(self.entry)
        }
    }
}
