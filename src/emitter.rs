//! The emitter: a streaming binary writer that reproduces the canonical
//! Wasm binary byte stream from a sequence of reader events (spec.md §4.2).
//!
//! Grounded in the teacher's approach to "value known only after the fact"
//! framing — `src/prepare/compile.rs` patches branch targets into an
//! instruction stream once their destinations are resolved, the same
//! reserve-then-overwrite shape this module uses for section/body length
//! prefixes, generalized to LEB128's variable width via a fixed five-byte
//! slot (`crate::leb128::write_patchable_var_uint32`).

use core::fmt;
use std::error;

use crate::event::{
    BinaryReader, ExternalKind, FunctionType, GlobalType, ImportDescriptor, ImportEntry,
    MemoryType, ReaderState, ResizableLimits, SectionId, TableType,
};
use crate::leb128;
use crate::operator::{self, Literal, Operator};

/// The emitter's finite-state machine (spec.md §4.2). Kept as a single
/// discriminated enum with a total match at each event boundary rather than
/// a stack of booleans, per spec.md §9.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitterState {
    Initial,
    Error,
    Wasm,
    TypeSection,
    ImportSection,
    FunctionSection,
    /// Reachable only via `EmitterState::Error`: `BeginSection(Table)` is
    /// rejected (spec.md §9 open question 4). Kept to document the
    /// extension point a future emitter would wire up symmetrically with
    /// the disassembler's table printing.
    TableSection,
    MemorySection,
    /// See `TableSection` — `BeginSection(Global)` is currently rejected.
    GlobalSection,
    ExportSection,
    /// See `TableSection` — `BeginSection(Start)` is currently rejected.
    StartSection,
    /// See `TableSection` — `BeginSection(Element)` is currently rejected.
    ElementSection,
    CodeSection,
    DataSection,
    FunctionBody,
    DataSectionEntry,
    DataSectionEntryBody,
    DataSectionEntryEnd,
    InitExpression,
}

/// Errors raised synchronously at the event boundary where they are
/// detected (spec.md §7). An error leaves the `Emitter` poisoned; the
/// caller must discard the instance.
#[derive(Debug)]
pub enum Error {
    /// `event` is not legal while the emitter is in `state`.
    StateViolation { state: EmitterState, event: &'static str },
    /// `EndFunctionBody`/`EndInitExpressionBody` arrived but the last
    /// operator written was not `end`.
    MissingEndOperator,
    /// A section id outside the emitter's supported set (Custom, Table,
    /// Global, Start, Element — spec.md §9 open questions 1 and 4).
    UnknownSectionId(u8),
    /// Reserved for a `BinaryReader` that decodes import/export kind bytes
    /// without going through `ExternalKind`/`ImportDescriptor` — unreachable
    /// through this crate's own typed event model.
    UnknownImportKind(u8),
    UnknownExportKind(u8),
    /// A patched section/body size exceeded `u32::MAX` (spec.md §9 open
    /// question 3).
    ValueOverflow,
    /// An `Operator` was missing an immediate its `code` requires.
    MissingImmediate(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::StateViolation { state, event } => {
                write!(f, "unexpected state: cannot handle `{event}` while in {state:?}")
            }
            Error::MissingEndOperator => {
                write!(f, "function body or init expression closed before an `end` operator")
            }
            Error::UnknownSectionId(id) => write!(f, "unknown or unsupported section id {id}"),
            Error::UnknownImportKind(k) => write!(f, "unknown import kind {k}"),
            Error::UnknownExportKind(k) => write!(f, "unknown export kind {k}"),
            Error::ValueOverflow => write!(f, "patched length exceeds u32::MAX"),
            Error::MissingImmediate(name) => write!(f, "operator is missing its `{name}` immediate"),
        }
    }
}

impl error::Error for Error {}

impl From<leb128::ValueOverflow> for Error {
    fn from(_: leb128::ValueOverflow) -> Self {
        Error::ValueOverflow
    }
}

/// A streaming Wasm binary writer driven by reader events.
#[derive(Debug)]
pub struct Emitter {
    buffer: Vec<u8>,
    state: EmitterState,
    section_start: usize,
    section_size_bytes: usize,
    section_entries_count: u32,
    section_entries_count_bytes: usize,
    body_start: usize,
    body_size_bytes: usize,
    end_written: bool,
    init_expression_after_state: EmitterState,
    data: Option<Vec<u8>>,
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Emitter {
    pub fn new() -> Self {
        Emitter {
            buffer: Vec::new(),
            state: EmitterState::Initial,
            section_start: 0,
            section_size_bytes: 0,
            section_entries_count: 0,
            section_entries_count_bytes: 0,
            body_start: 0,
            body_size_bytes: 0,
            end_written: false,
            init_expression_after_state: EmitterState::Wasm,
            data: None,
        }
    }

    /// Drives the emitter from `reader` until `EndWasm` is handled or the
    /// reader runs out of bytes.
    pub fn write<R: BinaryReader>(&mut self, reader: &mut R) -> Result<(), Error> {
        while reader.read() {
            let event = reader.state().clone();
            self.handle_event(&event)?;
            if let ReaderState::EndWasm = event {
                break;
            }
        }
        Ok(())
    }

    /// Finalizes and returns the emitted bytes. `None` until `EndWasm` has
    /// been handled.
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        self.data
    }

    fn err(&self, event: &'static str) -> Error {
        Error::StateViolation { state: self.state, event }
    }

    pub fn handle_event(&mut self, event: &ReaderState) -> Result<(), Error> {
        use EmitterState as S;
        match (self.state, event) {
            (S::Initial, ReaderState::BeginWasm(_)) => {
                self.buffer.extend_from_slice(b"\0asm");
                self.buffer.extend_from_slice(&1u32.to_le_bytes());
                self.state = S::Wasm;
                Ok(())
            }
            (S::Wasm, ReaderState::BeginSection(info)) => self.begin_section(info.id),
            (S::TypeSection, ReaderState::TypeSectionEntry(ft)) => {
                self.write_function_type(ft);
                self.section_entries_count += 1;
                Ok(())
            }
            (S::ImportSection, ReaderState::ImportSectionEntry(ie)) => {
                self.write_import_entry(ie);
                self.section_entries_count += 1;
                Ok(())
            }
            (S::FunctionSection, ReaderState::FunctionSectionEntry(fe)) => {
                leb128::write_var_uint(&mut self.buffer, fe.type_index as u64);
                self.section_entries_count += 1;
                Ok(())
            }
            (S::MemorySection, ReaderState::MemorySectionEntry(mt)) => {
                self.write_memory_type(mt);
                self.section_entries_count += 1;
                Ok(())
            }
            (S::ExportSection, ReaderState::ExportSectionEntry(ee)) => {
                leb128::write_bytes(&mut self.buffer, &ee.field);
                self.buffer.push(ee.kind.to_byte());
                leb128::write_var_uint(&mut self.buffer, ee.index as u64);
                self.section_entries_count += 1;
                Ok(())
            }
            (S::CodeSection, ReaderState::BeginFunctionBody(info)) => {
                self.section_entries_count += 1;
                self.body_size_bytes = leb128::write_patchable_var_uint32(&mut self.buffer);
                self.body_start = self.buffer.len();
                self.end_written = false;
                leb128::write_var_uint(&mut self.buffer, info.locals.len() as u64);
                for local in &info.locals {
                    leb128::write_var_uint(&mut self.buffer, local.count as u64);
                    leb128::write_var_int(&mut self.buffer, local.value_type.to_tag());
                }
                self.state = S::FunctionBody;
                Ok(())
            }
            (S::FunctionBody, ReaderState::CodeOperator(op)) => {
                self.encode_operator(op)?;
                self.end_written = op.code == operator::opcode::END;
                Ok(())
            }
            (S::FunctionBody, ReaderState::EndFunctionBody) => {
                if !self.end_written {
                    return Err(Error::MissingEndOperator);
                }
                let size = (self.buffer.len() - self.body_start) as u64;
                leb128::patch_var_uint32(&mut self.buffer, self.body_size_bytes, size)?;
                self.state = S::CodeSection;
                Ok(())
            }
            (S::DataSection, ReaderState::BeginDataSectionEntry(seg)) => {
                self.section_entries_count += 1;
                leb128::write_var_uint(&mut self.buffer, seg.index as u64);
                self.state = S::DataSectionEntry;
                Ok(())
            }
            (S::DataSectionEntry, ReaderState::BeginInitExpressionBody) => {
                self.init_expression_after_state = S::DataSectionEntryBody;
                self.end_written = false;
                self.state = S::InitExpression;
                Ok(())
            }
            (S::InitExpression, ReaderState::InitExpressionOperator(op)) => {
                self.encode_operator(op)?;
                self.end_written = op.code == operator::opcode::END;
                Ok(())
            }
            (S::InitExpression, ReaderState::EndInitExpressionBody) => {
                if !self.end_written {
                    return Err(Error::MissingEndOperator);
                }
                self.state = self.init_expression_after_state;
                Ok(())
            }
            (S::DataSectionEntryBody, ReaderState::DataSectionEntryBody(body)) => {
                leb128::write_bytes(&mut self.buffer, &body.data);
                self.state = S::DataSectionEntryEnd;
                Ok(())
            }
            (S::DataSectionEntryEnd, ReaderState::EndDataSectionEntry) => {
                self.state = S::DataSection;
                Ok(())
            }
            (state, ReaderState::EndSection) if Self::is_section_state(state) => {
                leb128::patch_var_uint32(
                    &mut self.buffer,
                    self.section_entries_count_bytes,
                    self.section_entries_count as u64,
                )?;
                let size = (self.buffer.len() - self.section_start) as u64;
                leb128::patch_var_uint32(&mut self.buffer, self.section_size_bytes, size)?;
                self.state = S::Wasm;
                Ok(())
            }
            (S::Wasm, ReaderState::EndWasm) => {
                self.data = Some(std::mem::take(&mut self.buffer));
                self.state = S::Initial;
                Ok(())
            }
            _ => Err(self.err(event_name(event))),
        }
    }

    fn is_section_state(state: EmitterState) -> bool {
        use EmitterState as S;
        matches!(
            state,
            S::TypeSection
                | S::ImportSection
                | S::FunctionSection
                | S::TableSection
                | S::MemorySection
                | S::GlobalSection
                | S::ExportSection
                | S::StartSection
                | S::ElementSection
                | S::CodeSection
                | S::DataSection
        )
    }

    fn begin_section(&mut self, id: SectionId) -> Result<(), Error> {
        match id {
            SectionId::Custom | SectionId::Table | SectionId::Global | SectionId::Start | SectionId::Element => {
                self.state = EmitterState::Error;
                Err(Error::UnknownSectionId(id.code()))
            }
            _ => {
                leb128::write_var_uint(&mut self.buffer, id.code() as u64);
                self.section_size_bytes = leb128::write_patchable_var_uint32(&mut self.buffer);
                self.section_start = self.buffer.len();
                self.section_entries_count_bytes = leb128::write_patchable_var_uint32(&mut self.buffer);
                self.section_entries_count = 0;
                self.state = match id {
                    SectionId::Type => EmitterState::TypeSection,
                    SectionId::Import => EmitterState::ImportSection,
                    SectionId::Function => EmitterState::FunctionSection,
                    SectionId::Memory => EmitterState::MemorySection,
                    SectionId::Export => EmitterState::ExportSection,
                    SectionId::Code => EmitterState::CodeSection,
                    SectionId::Data => EmitterState::DataSection,
                    _ => unreachable!("rejected above"),
                };
                Ok(())
            }
        }
    }

    fn write_resizable_limits(&mut self, limits: ResizableLimits) {
        match limits.maximum {
            Some(max) => {
                leb128::write_var_uint(&mut self.buffer, 1);
                leb128::write_var_uint(&mut self.buffer, limits.initial as u64);
                leb128::write_var_uint(&mut self.buffer, max as u64);
            }
            None => {
                leb128::write_var_uint(&mut self.buffer, 0);
                leb128::write_var_uint(&mut self.buffer, limits.initial as u64);
            }
        }
    }

    fn write_table_type(&mut self, table: &TableType) {
        leb128::write_var_int(&mut self.buffer, table.element_type.to_tag());
        self.write_resizable_limits(table.limits);
    }

    fn write_memory_type(&mut self, memory: &MemoryType) {
        self.write_resizable_limits(memory.limits);
    }

    fn write_global_type(&mut self, global: &GlobalType) {
        leb128::write_var_int(&mut self.buffer, global.content_type.to_tag());
        leb128::write_var_uint(&mut self.buffer, global.mutable as u64);
    }

    fn write_function_type(&mut self, ft: &FunctionType) {
        leb128::write_var_int(&mut self.buffer, ft.form);
        leb128::write_var_uint(&mut self.buffer, ft.params.len() as u64);
        for param in &ft.params {
            leb128::write_var_int(&mut self.buffer, param.to_tag());
        }
        leb128::write_var_uint(&mut self.buffer, ft.returns.len() as u64);
        for ret in &ft.returns {
            leb128::write_var_int(&mut self.buffer, ret.to_tag());
        }
    }

    fn write_import_entry(&mut self, entry: &ImportEntry) {
        leb128::write_bytes(&mut self.buffer, &entry.module);
        leb128::write_bytes(&mut self.buffer, &entry.field);
        match &entry.descriptor {
            ImportDescriptor::Function { type_index } => {
                self.buffer.push(ExternalKind::Function.to_byte());
                leb128::write_var_uint(&mut self.buffer, *type_index as u64);
            }
            ImportDescriptor::Table(tt) => {
                self.buffer.push(ExternalKind::Table.to_byte());
                self.write_table_type(tt);
            }
            ImportDescriptor::Memory(mt) => {
                self.buffer.push(ExternalKind::Memory.to_byte());
                self.write_memory_type(mt);
            }
            ImportDescriptor::Global(gt) => {
                self.buffer.push(ExternalKind::Global.to_byte());
                self.write_global_type(gt);
            }
        }
    }

    fn encode_operator(&mut self, op: &Operator) -> Result<(), Error> {
        use operator::opcode::*;
        self.buffer.push(op.code);
        match op.code {
            BLOCK | LOOP | IF => {
                let bt = op.block_type.ok_or(Error::MissingImmediate("block_type"))?;
                leb128::write_var_int(&mut self.buffer, bt.to_tag());
            }
            BR | BR_IF => {
                let depth = op.br_depth.ok_or(Error::MissingImmediate("br_depth"))?;
                leb128::write_var_uint(&mut self.buffer, depth as u64);
            }
            BR_TABLE => {
                let targets = op.br_table.as_ref().ok_or(Error::MissingImmediate("br_table"))?;
                leb128::write_var_uint(&mut self.buffer, (targets.len() - 1) as u64);
                for target in targets {
                    leb128::write_var_uint(&mut self.buffer, *target as u64);
                }
            }
            CALL => {
                let idx = op.func_index.ok_or(Error::MissingImmediate("func_index"))?;
                leb128::write_var_uint(&mut self.buffer, idx as u64);
            }
            CALL_INDIRECT => {
                let idx = op.type_index.ok_or(Error::MissingImmediate("type_index"))?;
                leb128::write_var_uint(&mut self.buffer, idx as u64);
                leb128::write_var_uint(&mut self.buffer, 0);
            }
            GET_LOCAL | SET_LOCAL | TEE_LOCAL => {
                let idx = op.local_index.ok_or(Error::MissingImmediate("local_index"))?;
                leb128::write_var_uint(&mut self.buffer, idx as u64);
            }
            GET_GLOBAL | SET_GLOBAL => {
                let idx = op.global_index.ok_or(Error::MissingImmediate("global_index"))?;
                leb128::write_var_uint(&mut self.buffer, idx as u64);
            }
            CURRENT_MEMORY | GROW_MEMORY => {
                leb128::write_var_uint(&mut self.buffer, 0);
            }
            I32_CONST => match op.literal {
                Some(Literal::I32(n)) => leb128::write_var_int(&mut self.buffer, n as i64),
                _ => return Err(Error::MissingImmediate("literal")),
            },
            I64_CONST => match op.literal {
                Some(Literal::I64(bytes)) => leb128::write_var_int64_raw(&mut self.buffer, bytes),
                _ => return Err(Error::MissingImmediate("literal")),
            },
            F32_CONST => match op.literal {
                Some(Literal::F32(bits)) => leb128::write_f32_bits(&mut self.buffer, bits),
                _ => return Err(Error::MissingImmediate("literal")),
            },
            F64_CONST => match op.literal {
                Some(Literal::F64(bits)) => leb128::write_f64_bits(&mut self.buffer, bits),
                _ => return Err(Error::MissingImmediate("literal")),
            },
            code if operator::is_memory_opcode(code) => {
                let addr = op.memory_address.ok_or(Error::MissingImmediate("memory_address"))?;
                leb128::write_var_uint(&mut self.buffer, addr.flags as u64);
                leb128::write_var_uint(&mut self.buffer, addr.offset as u64);
            }
            _ => {}
        }
        Ok(())
    }
}

fn event_name(event: &ReaderState) -> &'static str {
    match event {
        ReaderState::BeginWasm(_) => "BeginWasm",
        ReaderState::EndWasm => "EndWasm",
        ReaderState::BeginSection(_) => "BeginSection",
        ReaderState::EndSection => "EndSection",
        ReaderState::TypeSectionEntry(_) => "TypeSectionEntry",
        ReaderState::ImportSectionEntry(_) => "ImportSectionEntry",
        ReaderState::FunctionSectionEntry(_) => "FunctionSectionEntry",
        ReaderState::TableSectionEntry(_) => "TableSectionEntry",
        ReaderState::MemorySectionEntry(_) => "MemorySectionEntry",
        ReaderState::ExportSectionEntry(_) => "ExportSectionEntry",
        ReaderState::BeginGlobalSectionEntry(_) => "BeginGlobalSectionEntry",
        ReaderState::EndGlobalSectionEntry => "EndGlobalSectionEntry",
        ReaderState::BeginFunctionBody(_) => "BeginFunctionBody",
        ReaderState::CodeOperator(_) => "CodeOperator",
        ReaderState::EndFunctionBody => "EndFunctionBody",
        ReaderState::BeginInitExpressionBody => "BeginInitExpressionBody",
        ReaderState::InitExpressionOperator(_) => "InitExpressionOperator",
        ReaderState::EndInitExpressionBody => "EndInitExpressionBody",
        ReaderState::BeginDataSectionEntry(_) => "BeginDataSectionEntry",
        ReaderState::DataSectionEntryBody(_) => "DataSectionEntryBody",
        ReaderState::EndDataSectionEntry => "EndDataSectionEntry",
        ReaderState::BeginElementSectionEntry(_) => "BeginElementSectionEntry",
        ReaderState::ElementSectionEntryBody(_) => "ElementSectionEntryBody",
        ReaderState::EndElementSectionEntry => "EndElementSectionEntry",
        ReaderState::Error { .. } => "Error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{
        FunctionInformation, FunctionType, LocalEntry, ModuleHeader, SectionInfo,
    };
    use crate::value::ValueType;
    use assert_matches::assert_matches;

    fn emit(events: &[ReaderState]) -> Result<Vec<u8>, Error> {
        let mut emitter = Emitter::new();
        for event in events {
            emitter.handle_event(event)?;
        }
        Ok(emitter.into_bytes().expect("EndWasm was handled"))
    }

    #[test]
    fn empty_module() {
        let bytes = emit(&[ReaderState::BeginWasm(ModuleHeader), ReaderState::EndWasm]).unwrap();
        assert_eq!(bytes, vec![0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn br_table_encodes_count_and_default_last() {
        let mut emitter = Emitter::new();
        emitter
            .handle_event(&ReaderState::BeginWasm(ModuleHeader))
            .unwrap();
        emitter
            .handle_event(&ReaderState::BeginSection(SectionInfo {
                id: SectionId::Code,
                name: vec![],
            }))
            .unwrap();
        emitter
            .handle_event(&ReaderState::BeginFunctionBody(FunctionInformation { locals: vec![] }))
            .unwrap();
        let before = emitter.buffer.len();
        emitter
            .handle_event(&ReaderState::CodeOperator(Operator::br_table(vec![1, 2, 3, 0])))
            .unwrap();
        assert_eq!(&emitter.buffer[before..], &[0x0E, 0x03, 0x01, 0x02, 0x03, 0x00]);
    }

    #[test]
    fn missing_end_operator_is_rejected() {
        let mut emitter = Emitter::new();
        emitter.handle_event(&ReaderState::BeginWasm(ModuleHeader)).unwrap();
        emitter
            .handle_event(&ReaderState::BeginSection(SectionInfo {
                id: SectionId::Code,
                name: vec![],
            }))
            .unwrap();
        emitter
            .handle_event(&ReaderState::BeginFunctionBody(FunctionInformation { locals: vec![] }))
            .unwrap();
        emitter.handle_event(&ReaderState::CodeOperator(Operator::nop())).unwrap();
        let result = emitter.handle_event(&ReaderState::EndFunctionBody);
        assert_matches!(result, Err(Error::MissingEndOperator));
    }

    #[test]
    fn unknown_section_id_rejects_custom_sections() {
        let mut emitter = Emitter::new();
        emitter.handle_event(&ReaderState::BeginWasm(ModuleHeader)).unwrap();
        let result = emitter.handle_event(&ReaderState::BeginSection(SectionInfo {
            id: SectionId::Custom,
            name: b"name".to_vec(),
        }));
        assert_matches!(result, Err(Error::UnknownSectionId(0)));
    }

    #[test]
    fn event_out_of_state_is_a_violation() {
        let mut emitter = Emitter::new();
        let result = emitter.handle_event(&ReaderState::EndWasm);
        assert_matches!(result, Err(Error::StateViolation { state: EmitterState::Initial, .. }));
    }

    #[test]
    fn identity_function_round_trips_section_framing() {
        let events = vec![
            ReaderState::BeginWasm(ModuleHeader),
            ReaderState::BeginSection(SectionInfo { id: SectionId::Type, name: vec![] }),
            ReaderState::TypeSectionEntry(FunctionType {
                form: -0x20,
                params: vec![ValueType::I32],
                returns: vec![ValueType::I32],
            }),
            ReaderState::EndSection,
            ReaderState::BeginSection(SectionInfo { id: SectionId::Function, name: vec![] }),
            ReaderState::FunctionSectionEntry(crate::event::FunctionEntry { type_index: 0 }),
            ReaderState::EndSection,
            ReaderState::BeginSection(SectionInfo { id: SectionId::Code, name: vec![] }),
            ReaderState::BeginFunctionBody(FunctionInformation {
                locals: vec![LocalEntry { count: 1, value_type: ValueType::I32 }],
            }),
            ReaderState::CodeOperator(Operator::get_local(0)),
            ReaderState::CodeOperator(Operator::end()),
            ReaderState::EndFunctionBody,
            ReaderState::EndSection,
            ReaderState::EndWasm,
        ];
        let bytes = emit(&events).unwrap();
        assert_eq!(&bytes[0..8], b"\0asm\x01\x00\x00\x00");
        // Type section: id=1, size, count=1, then the signature bytes.
        assert_eq!(bytes[8], 1);
    }
}
