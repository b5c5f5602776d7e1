//! The shared event vocabulary produced by the external [`BinaryReader`] and
//! consumed by both the [`crate::emitter::Emitter`] and
//! [`crate::disassembler::Disassembler`].
//!
//! The upstream parser itself (the source of these events) is an external
//! collaborator — out of scope here, see `spec.md` §1/§6.1. This module only
//! models the vocabulary: payload records plus the `ReaderState` tag that
//! carries them.

pub use crate::operator::Operator;

/// An 8-byte little-endian `i64.const` payload, treated bit-exact end to end
/// (never reinterpreted as a signed integer except when the disassembler
/// needs to print it).
pub type Int64 = [u8; 8];

/// `ModuleHeader.magic`/`version` are fixed by the format; nothing else is
/// carried here because the emitter always writes `\0asm\x01\x00\x00\x00`
/// regardless of what the reader decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModuleHeader;

/// A top-level section identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionId {
    Custom,
    Type,
    Import,
    Function,
    Table,
    Memory,
    Global,
    Export,
    Start,
    Element,
    Code,
    Data,
}

impl SectionId {
    pub fn code(self) -> u8 {
        match self {
            SectionId::Custom => 0,
            SectionId::Type => 1,
            SectionId::Import => 2,
            SectionId::Function => 3,
            SectionId::Table => 4,
            SectionId::Memory => 5,
            SectionId::Global => 6,
            SectionId::Export => 7,
            SectionId::Start => 8,
            SectionId::Element => 9,
            SectionId::Code => 10,
            SectionId::Data => 11,
        }
    }
}

/// `BeginSection` payload: the section id plus its custom-section name
/// (empty for any other id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionInfo {
    pub id: SectionId,
    pub name: Vec<u8>,
}

/// A function signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionType {
    /// Raw signed encoding of the type-constructor tag (`-0x20` for `func`).
    pub form: i64,
    pub params: Vec<crate::value::ValueType>,
    pub returns: Vec<crate::value::ValueType>,
}

/// `ResizableLimits` shared by table and memory types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizableLimits {
    pub initial: u32,
    pub maximum: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableType {
    pub element_type: crate::value::ElementType,
    pub limits: ResizableLimits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryType {
    pub limits: ResizableLimits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalType {
    pub content_type: crate::value::ValueType,
    pub mutable: bool,
}

/// The external kind tag shared by import and export entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalKind {
    Function,
    Table,
    Memory,
    Global,
}

impl ExternalKind {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(ExternalKind::Function),
            1 => Some(ExternalKind::Table),
            2 => Some(ExternalKind::Memory),
            3 => Some(ExternalKind::Global),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            ExternalKind::Function => 0,
            ExternalKind::Table => 1,
            ExternalKind::Memory => 2,
            ExternalKind::Global => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportDescriptor {
    Function { type_index: u32 },
    Table(TableType),
    Memory(MemoryType),
    Global(GlobalType),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEntry {
    pub module: Vec<u8>,
    pub field: Vec<u8>,
    pub descriptor: ImportDescriptor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportEntry {
    pub field: Vec<u8>,
    pub kind: ExternalKind,
    pub index: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionEntry {
    pub type_index: u32,
}

/// A declared local slot run: `count` consecutive locals of `value_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalEntry {
    pub count: u32,
    pub value_type: crate::value::ValueType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionInformation {
    pub locals: Vec<LocalEntry>,
}

/// `BeginDataSectionEntry`/`BeginElementSectionEntry` header: the
/// table/memory index the segment targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentHeader {
    pub index: u32,
}

/// `DataSectionEntryBody` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSegmentBody {
    pub data: Vec<u8>,
}

/// `ElementSectionEntryBody` payload: the function indices of the segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSegmentBody {
    pub function_indices: Vec<u32>,
}

/// The event kinds produced by the external [`BinaryReader`] and consumed by
/// both sinks. Payloads are carried inline, fusing the reader's separate
/// `state`/`result` properties (spec.md §6.1) into one Rust enum.
#[derive(Debug, Clone, PartialEq)]
pub enum ReaderState {
    BeginWasm(ModuleHeader),
    EndWasm,
    BeginSection(SectionInfo),
    EndSection,
    TypeSectionEntry(FunctionType),
    ImportSectionEntry(ImportEntry),
    FunctionSectionEntry(FunctionEntry),
    TableSectionEntry(TableType),
    MemorySectionEntry(MemoryType),
    ExportSectionEntry(ExportEntry),
    BeginGlobalSectionEntry(GlobalType),
    EndGlobalSectionEntry,
    BeginFunctionBody(FunctionInformation),
    CodeOperator(Operator),
    EndFunctionBody,
    BeginInitExpressionBody,
    InitExpressionOperator(Operator),
    EndInitExpressionBody,
    BeginDataSectionEntry(SegmentHeader),
    DataSectionEntryBody(DataSegmentBody),
    EndDataSectionEntry,
    BeginElementSectionEntry(SegmentHeader),
    ElementSectionEntryBody(ElementSegmentBody),
    EndElementSectionEntry,
    /// The reader failed; `message` is its propagated failure value
    /// (spec.md §7 `ParserError`).
    Error { message: String },
}

/// The external streaming parser this crate sits downstream of. Its
/// implementation is out of scope (spec.md §1); this trait is only the
/// surface both sinks drive against.
pub trait BinaryReader {
    /// Advances to the next event. Returns `false` when more input bytes are
    /// needed before a full event is available.
    fn read(&mut self) -> bool;
    /// The event produced by the most recent successful `read()`.
    fn state(&self) -> &ReaderState;
    /// Whether the underlying byte source has more data to offer.
    fn has_more_bytes(&self) -> bool;
    /// Seeks past the remainder of the current section without emitting its
    /// entries.
    fn skip_section(&mut self);
}
