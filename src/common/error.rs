//! Load errors and diagnostic reporting.
//!
//! `LoadError` covers every fatal condition the loader can hit; anything
//! non-fatal (unresolved imports, unreferenced stubs) goes through the
//! `DiagnosticEngine` as a warning instead. The engine renders messages
//! immediately into an injected sink so callers and tests can capture the
//! stream without touching process-global stderr.

use std::io;

use thiserror::Error;

/// Fatal errors aborting a module load.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("{0}: not an ELF file")]
    NotElf(String),

    #[error("{0}: not an ARM binary")]
    NotArm(String),

    #[error("{0}: not a 32-bit, little-endian binary")]
    NotElf32Le(String),

    #[error("{origin}: malformed ELF ({what})")]
    Malformed { origin: String, what: String },

    #[error("multiple {0} sections in binary")]
    DuplicateStubSection(&'static str),

    #[error("ELF file appears to have multiple symbol tables")]
    MultipleSymbolTables,

    #[error(
        "binary contains debugging information, which is known to cause issues; \
         run 'arm-vita-eabi-strip -g homebrew.elf' first"
    )]
    DebugInfoPresent,

    #[error("no .vitalink stub sections in binary, probably not a Vita binary")]
    NoStubSections,

    #[error("no symbol table in binary, perhaps stripped out")]
    NoSymbolTable,

    #[error("no relocation sections in binary; use -Wl,-q while compiling")]
    NoRelocTables,

    #[error("invalid relocation type {0}")]
    InvalidRelocType(u32),

    #[error("REL entry tried to access symbol {sym}, but only {num} symbols loaded")]
    SymbolIndexOutOfRange { sym: u32, num: usize },

    #[error("relocation offset {offset:#x} falls outside target section {target}")]
    RelocOffsetOutOfRange { offset: u32, target: usize },

    #[error("RELA sections are unsupported")]
    RelaUnsupported,

    #[error(
        "global symbol {name} in section {section} expected to have type {expected}; \
         instead has type {actual}"
    )]
    StubTypeMismatch {
        name: String,
        section: usize,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("stub at {addr:#08x} in section {section} has duplicate symbols: {first}, {second}")]
    DuplicateStubSymbol {
        addr: u32,
        section: usize,
        first: String,
        second: String,
    },

    #[error("global symbol {name} in section {section} not pointing to a valid stub")]
    OrphanedStubSymbol { name: String, section: usize },

    #[error("could not allocate address space for segment {0}")]
    SegmentReserve(usize),
}

/// Severity level for a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

/// Collects and renders loader diagnostics.
///
/// Messages are written to the sink as soon as they are emitted, so warnings
/// interleave naturally with whatever the caller prints around the load.
/// Counts are kept per severity; `has_errors()` lets a driver decide whether
/// a run that produced only warnings should still be treated as a success.
pub struct DiagnosticEngine {
    sink: Box<dyn io::Write>,
    error_count: usize,
    warning_count: usize,
}

impl DiagnosticEngine {
    /// Create an engine writing to stderr.
    pub fn new() -> Self {
        Self::with_sink(io::stderr())
    }

    /// Create an engine writing to an arbitrary sink.
    pub fn with_sink<W: io::Write + 'static>(sink: W) -> Self {
        Self {
            sink: Box::new(sink),
            error_count: 0,
            warning_count: 0,
        }
    }

    pub fn error(&mut self, message: impl AsRef<str>) {
        self.render(Severity::Error, message.as_ref());
        self.error_count += 1;
    }

    pub fn warning(&mut self, message: impl AsRef<str>) {
        self.render(Severity::Warning, message.as_ref());
        self.warning_count += 1;
    }

    pub fn note(&mut self, message: impl AsRef<str>) {
        self.render(Severity::Note, message.as_ref());
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    fn render(&mut self, severity: Severity, message: &str) {
        // A broken sink must not turn a diagnostic into a second failure.
        let _ = writeln!(self.sink, "{}: {}", severity, message);
    }
}

impl Default for DiagnosticEngine {
    fn default() -> Self {
        Self::new()
    }
}
