//! The disassembler: a streaming pretty printer that renders reader events
//! as canonical Wasm text (`.wat`, spec.md §4.5).
//!
//! Grounded in the teacher's `engine/bytecode/print.rs` `DisplayContext`,
//! which carries exactly this shape — a running indentation tracker plus
//! small per-construct counters threaded through a `Display` pass — adapted
//! here from the register-machine bytecode it was written for to the
//! section/operator event stream this crate renders.

use core::fmt;
use std::error;

use crate::event::{
    DataSegmentBody, ElementSegmentBody, ExportEntry, ExternalKind, FunctionInformation,
    FunctionType, GlobalType, ImportDescriptor, ImportEntry, MemoryType, ReaderState,
    ResizableLimits, SegmentHeader, TableType,
};
use crate::float;
use crate::operator::{self, operator_mnemonic, Literal, Operator as OperatorEvent};
use crate::value::{BlockType, ElementType, ValueType};

/// Which structured context operators are currently being printed in. The
/// terminal `end` of a function body is implicit and suppressed; the `end`
/// of a global/data/element init expression is not (spec.md §4.5, §8
/// invariant 5 applies only to the function-body case).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PrintContext {
    FunctionBody,
    InitExpression,
}

#[derive(Debug)]
pub enum Error {
    /// An event kind this disassembler does not recognize arrived.
    UnexpectedReaderState(&'static str),
    /// Reserved for a `BinaryReader` that decodes kind bytes without going
    /// through `ExternalKind`/`ImportDescriptor` — unreachable through this
    /// crate's own typed event model.
    UnknownImportKind(u8),
    UnknownExportKind(u8),
    /// The reader's own failure, propagated unchanged (spec.md §7).
    Parser(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnexpectedReaderState(kind) => write!(f, "unexpected reader state: {kind}"),
            Error::UnknownImportKind(k) => write!(f, "unknown import kind {k}"),
            Error::UnknownExportKind(k) => write!(f, "unknown export kind {k}"),
            Error::Parser(message) => write!(f, "parser error: {message}"),
        }
    }
}

impl error::Error for Error {}

/// A streaming Wasm text (`.wat`) pretty printer driven by reader events.
#[derive(Debug)]
pub struct Disassembler {
    buffer: String,
    types: Vec<FunctionType>,
    func_types: Vec<u32>,
    func_body_counter: u32,
    import_func_count: u32,
    global_count: u32,
    table_count: u32,
    indent_level: u32,
    indent: String,
    body_base: String,
    context: PrintContext,
    data: Option<String>,
}

impl Default for Disassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Disassembler {
    pub fn new() -> Self {
        Disassembler {
            buffer: String::new(),
            types: Vec::new(),
            func_types: Vec::new(),
            func_body_counter: 0,
            import_func_count: 0,
            global_count: 0,
            table_count: 0,
            indent_level: 0,
            indent: String::new(),
            body_base: String::new(),
            context: PrintContext::FunctionBody,
            data: None,
        }
    }

    /// Finalized text, `None` until `EndWasm` has been handled.
    pub fn into_text(self) -> Option<String> {
        self.data
    }

    fn enter_body(&mut self, base: &str, context: PrintContext) {
        self.body_base = base.to_string();
        self.indent_level = 0;
        self.context = context;
        self.recompute_indent();
    }

    fn recompute_indent(&mut self) {
        self.indent = format!("{}{}", self.body_base, "  ".repeat(self.indent_level as usize));
    }

    pub fn handle_event(&mut self, event: &ReaderState) -> Result<(), Error> {
        match event {
            ReaderState::Error { message } => return Err(Error::Parser(message.clone())),
            ReaderState::BeginWasm(_) => {
                self.buffer.push_str("(module\n");
            }
            ReaderState::EndWasm => {
                self.buffer.push(')');
                self.buffer.push('\n');
                self.data = Some(std::mem::take(&mut self.buffer));
            }
            ReaderState::BeginSection(_) | ReaderState::EndSection => {}
            ReaderState::TypeSectionEntry(ft) => self.print_type_entry(ft),
            ReaderState::ImportSectionEntry(entry) => self.print_import_entry(entry),
            ReaderState::FunctionSectionEntry(fe) => {
                self.func_types.push(fe.type_index);
            }
            ReaderState::TableSectionEntry(tt) => self.print_table_entry(tt),
            ReaderState::MemorySectionEntry(mt) => self.print_memory_entry(mt),
            ReaderState::ExportSectionEntry(ee) => self.print_export_entry(ee),
            ReaderState::BeginGlobalSectionEntry(gt) => self.begin_global_entry(gt),
            ReaderState::EndGlobalSectionEntry => self.buffer.push_str("  )\n"),
            ReaderState::BeginFunctionBody(info) => self.begin_function_body(info),
            ReaderState::CodeOperator(op) | ReaderState::InitExpressionOperator(op) => {
                self.print_operator(op)
            }
            ReaderState::EndFunctionBody => {
                self.buffer.push_str("  )\n");
                self.func_body_counter += 1;
            }
            ReaderState::BeginInitExpressionBody => {
                self.buffer.push_str("    (\n");
                self.enter_body("      ", PrintContext::InitExpression);
            }
            ReaderState::EndInitExpressionBody => {
                self.buffer.push_str("    )\n");
            }
            ReaderState::BeginDataSectionEntry(SegmentHeader { .. }) => {
                self.buffer.push_str("  (data\n");
            }
            ReaderState::DataSectionEntryBody(DataSegmentBody { data }) => {
                self.buffer.push_str(&format!("    \"{}\"\n", escape_bytes(data)));
            }
            ReaderState::EndDataSectionEntry => self.buffer.push_str("  )\n"),
            ReaderState::BeginElementSectionEntry(SegmentHeader { .. }) => {
                self.buffer.push_str("  (elem\n");
            }
            ReaderState::ElementSectionEntryBody(ElementSegmentBody { function_indices }) => {
                let targets: Vec<String> =
                    function_indices.iter().map(|i| format!("$func{i}")).collect();
                self.buffer.push_str(&format!("   {}\n", targets.join(" ")));
            }
            ReaderState::EndElementSectionEntry => self.buffer.push_str("  )\n"),
        }
        Ok(())
    }

    fn print_type_entry(&mut self, ft: &FunctionType) {
        let index = self.types.len();
        self.buffer
            .push_str(&format!("  (type $type{index} (func{}))\n", signature_unnamed(ft)));
        self.types.push(ft.clone());
    }

    fn print_import_entry(&mut self, entry: &ImportEntry) {
        let module = escape_bytes(&entry.module);
        let field = escape_bytes(&entry.field);
        match &entry.descriptor {
            ImportDescriptor::Function { type_index } => {
                let sig = self
                    .types
                    .get(*type_index as usize)
                    .map(signature_unnamed)
                    .unwrap_or_default();
                let n = self.import_func_count;
                self.import_func_count += 1;
                self.buffer.push_str(&format!(
                    "  (import $func{n} \"{module}\" \"{field}\" (func{sig}))\n"
                ));
            }
            ImportDescriptor::Table(tt) => {
                let n = self.table_count;
                self.table_count += 1;
                self.buffer.push_str(&format!(
                    "  (import \"{module}\" \"{field}\" (table $table{n} {} {}))\n",
                    fmt_limits(tt.limits),
                    elem_type_str(tt.element_type)
                ));
            }
            ImportDescriptor::Memory(mt) => {
                self.buffer.push_str(&format!(
                    "  (import \"{module}\" \"{field}\" (memory {}))\n",
                    fmt_limits(mt.limits)
                ));
            }
            ImportDescriptor::Global(gt) => {
                let n = self.global_count;
                self.global_count += 1;
                self.buffer.push_str(&format!(
                    "  (import \"{module}\" \"{field}\" (global $global{n} {}))\n",
                    global_type_str(gt)
                ));
            }
        }
    }

    fn print_table_entry(&mut self, tt: &TableType) {
        let n = self.table_count;
        self.table_count += 1;
        self.buffer.push_str(&format!(
            "  (table $table{n} {} {})\n",
            fmt_limits(tt.limits),
            elem_type_str(tt.element_type)
        ));
    }

    fn print_memory_entry(&mut self, mt: &MemoryType) {
        self.buffer.push_str(&format!("  (memory {})\n", fmt_limits(mt.limits)));
    }

    fn print_export_entry(&mut self, ee: &ExportEntry) {
        let field = escape_bytes(&ee.field);
        let target = match ee.kind {
            ExternalKind::Function => format!("$func{}", ee.index),
            ExternalKind::Table => format!("(table $table{})", ee.index),
            ExternalKind::Memory => "memory".to_string(),
            ExternalKind::Global => format!("(global $global{})", ee.index),
        };
        self.buffer.push_str(&format!("  (export \"{field}\" {target})\n"));
    }

    fn begin_global_entry(&mut self, gt: &GlobalType) {
        let n = self.global_count;
        self.global_count += 1;
        self.buffer
            .push_str(&format!("  (global $global{n} {}\n", global_type_str(gt)));
    }

    fn begin_function_body(&mut self, info: &FunctionInformation) {
        let declared_index = self.func_body_counter;
        let type_index = self.func_types.get(declared_index as usize).copied().unwrap_or(0);
        let ft = self.types.get(type_index as usize).cloned().unwrap_or(FunctionType {
            form: -0x20,
            params: Vec::new(),
            returns: Vec::new(),
        });
        let func_index = self.import_func_count + declared_index;
        self.buffer.push_str(&format!(
            "  (func $func{func_index}{}\n",
            signature_named(&ft.params, &ft.returns)
        ));
        let mut k = ft.params.len() as u32;
        for local in &info.locals {
            for _ in 0..local.count {
                self.buffer
                    .push_str(&format!("    (local $var{k} {})\n", local.value_type));
                k += 1;
            }
        }
        self.enter_body("    ", PrintContext::FunctionBody);
    }

    fn print_operator(&mut self, op: &OperatorEvent) {
        let code = op.code;
        let is_end_or_else = code == operator::opcode::END || code == operator::opcode::ELSE;
        if is_end_or_else && self.indent_level > 0 {
            self.indent_level -= 1;
            self.recompute_indent();
        }
        let suppressed =
            code == operator::opcode::END && self.indent_level == 0 && self.context == PrintContext::FunctionBody;
        if !suppressed {
            let mut line = self.indent.clone();
            line.push_str(&operator_mnemonic(code).unwrap_or_else(|| format!("unknown(0x{code:02x})")));
            if let Some(bt) = op.block_type {
                if bt != BlockType::Empty {
                    line.push(' ');
                    line.push_str(&block_type_str(bt));
                }
            }
            if let Some(idx) = op.local_index {
                line.push_str(&format!(" $var{idx}"));
            }
            if let Some(idx) = op.func_index {
                line.push_str(&format!(" $func{idx}"));
            }
            if let Some(idx) = op.type_index {
                line.push_str(&format!(" $type{idx}"));
            }
            if let Some(lit) = &op.literal {
                line.push(' ');
                line.push_str(&literal_str(lit));
            }
            if let Some(addr) = op.memory_address {
                line.push(' ');
                line.push_str(&memory_address_str(addr, code));
            }
            if let Some(depth) = op.br_depth {
                line.push(' ');
                line.push_str(&depth.to_string());
            }
            if let Some(targets) = &op.br_table {
                line.push(' ');
                let rendered: Vec<String> = targets.iter().map(|t| t.to_string()).collect();
                line.push_str(&rendered.join(" "));
            }
            if let Some(idx) = op.global_index {
                line.push_str(&format!(" $global{idx}"));
            }
            line.push('\n');
            self.buffer.push_str(&line);
        }
        if matches!(
            code,
            operator::opcode::IF | operator::opcode::BLOCK | operator::opcode::LOOP | operator::opcode::ELSE
        ) {
            self.indent_level += 1;
            self.recompute_indent();
        }
    }
}

fn signature_unnamed(ft: &FunctionType) -> String {
    let mut s = String::new();
    if !ft.params.is_empty() {
        s.push_str("(param");
        for p in &ft.params {
            s.push(' ');
            s.push_str(p.as_str());
        }
        s.push(')');
    }
    if !ft.returns.is_empty() {
        s.push_str("(result");
        for r in &ft.returns {
            s.push(' ');
            s.push_str(r.as_str());
        }
        s.push(')');
    }
    s
}

fn signature_named(params: &[ValueType], returns: &[ValueType]) -> String {
    let mut s = String::new();
    for (k, p) in params.iter().enumerate() {
        s.push_str(&format!(" (param $var{k} {p})"));
    }
    if !returns.is_empty() {
        s.push_str(" (result");
        for r in returns {
            s.push(' ');
            s.push_str(r.as_str());
        }
        s.push(')');
    }
    s
}

fn fmt_limits(limits: ResizableLimits) -> String {
    match limits.maximum {
        Some(max) => format!("{} {}", limits.initial, max),
        None => format!("{}", limits.initial),
    }
}

fn elem_type_str(element_type: ElementType) -> &'static str {
    element_type.as_str()
}

fn global_type_str(gt: &GlobalType) -> String {
    if gt.mutable {
        format!("(mut {})", gt.content_type)
    } else {
        gt.content_type.to_string()
    }
}

fn block_type_str(bt: BlockType) -> String {
    match bt {
        BlockType::Empty => String::new(),
        BlockType::Value(ty) => ty.to_string(),
    }
}

fn literal_str(lit: &Literal) -> String {
    match lit {
        Literal::I32(n) => n.to_string(),
        Literal::I64(bytes) => i64::from_le_bytes(*bytes).to_string(),
        Literal::F32(bits) => float::format_f32(*bits),
        Literal::F64(bits) => float::format_f64(*bits),
    }
}

fn memory_address_str(addr: operator::MemoryImmediate, code: u8) -> String {
    let default = operator::default_alignment(code).unwrap_or(0);
    if addr.flags == default {
        format!("offset={}", addr.offset)
    } else if addr.offset == 0 {
        format!("align={}", 1u32 << addr.flags)
    } else {
        format!("offset={} align={}", addr.offset, 1u32 << addr.flags)
    }
}

fn escape_bytes(bytes: &[u8]) -> String {
    let mut s = String::new();
    for &b in bytes {
        if b < 0x20 || b >= 0x7F || b == b'"' || b == b'\\' {
            s.push_str(&format!("\\{b:02x}"));
        } else {
            s.push(b as char);
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{FunctionEntry, LocalEntry, ModuleHeader, SectionInfo};
    use crate::operator::{MemoryImmediate, Operator};
    use crate::value::ValueType;

    fn disassemble(events: &[ReaderState]) -> String {
        let mut d = Disassembler::new();
        for event in events {
            d.handle_event(event).unwrap();
        }
        d.into_text().expect("EndWasm was handled")
    }

    #[test]
    fn empty_module() {
        let text = disassemble(&[ReaderState::BeginWasm(ModuleHeader), ReaderState::EndWasm]);
        assert_eq!(text, "(module\n)\n");
    }

    #[test]
    fn identity_function() {
        let events = vec![
            ReaderState::BeginWasm(ModuleHeader),
            ReaderState::BeginSection(SectionInfo {
                id: crate::event::SectionId::Type,
                name: vec![],
            }),
            ReaderState::TypeSectionEntry(FunctionType {
                form: -0x20,
                params: vec![ValueType::I32],
                returns: vec![ValueType::I32],
            }),
            ReaderState::EndSection,
            ReaderState::BeginSection(SectionInfo {
                id: crate::event::SectionId::Function,
                name: vec![],
            }),
            ReaderState::FunctionSectionEntry(FunctionEntry { type_index: 0 }),
            ReaderState::EndSection,
            ReaderState::BeginSection(SectionInfo {
                id: crate::event::SectionId::Export,
                name: vec![],
            }),
            ReaderState::ExportSectionEntry(ExportEntry {
                field: b"id".to_vec(),
                kind: ExternalKind::Function,
                index: 0,
            }),
            ReaderState::EndSection,
            ReaderState::BeginSection(SectionInfo { id: crate::event::SectionId::Code, name: vec![] }),
            ReaderState::BeginFunctionBody(FunctionInformation { locals: vec![] }),
            ReaderState::CodeOperator(Operator::get_local(0)),
            ReaderState::CodeOperator(Operator::end()),
            ReaderState::EndFunctionBody,
            ReaderState::EndSection,
            ReaderState::EndWasm,
        ];
        let text = disassemble(&events);
        assert!(text.contains("(func $func0 (param $var0 i32) (result i32)\n    get_local $var0\n  )\n"));
        assert!(text.contains("(export \"id\" $func0)"));
    }

    #[test]
    fn i32_load_prints_full_operator_line() {
        let mut d = Disassembler::new();
        d.enter_body("    ", PrintContext::FunctionBody);
        d.print_operator(&Operator::load(
            operator::opcode::I32_LOAD,
            MemoryImmediate { flags: 2, offset: 16 },
        ));
        assert_eq!(d.buffer, "    i32.load offset=16\n");

        let mut d = Disassembler::new();
        d.enter_body("    ", PrintContext::FunctionBody);
        d.print_operator(&Operator::load(
            operator::opcode::I32_LOAD,
            MemoryImmediate { flags: 1, offset: 16 },
        ));
        assert_eq!(d.buffer, "    i32.load offset=16 align=2\n");

        let mut d = Disassembler::new();
        d.enter_body("    ", PrintContext::FunctionBody);
        d.print_operator(&Operator::load(
            operator::opcode::I32_LOAD,
            MemoryImmediate { flags: 2, offset: 0 },
        ));
        assert_eq!(d.buffer, "    i32.load offset=0\n");
    }

    #[test]
    fn memory_access_elides_default_alignment() {
        assert_eq!(
            memory_address_str(MemoryImmediate { flags: 2, offset: 16 }, operator::opcode::I32_LOAD),
            "offset=16"
        );
        assert_eq!(
            memory_address_str(MemoryImmediate { flags: 1, offset: 16 }, operator::opcode::I32_LOAD),
            "offset=16 align=2"
        );
        assert_eq!(
            memory_address_str(MemoryImmediate { flags: 2, offset: 0 }, operator::opcode::I32_LOAD),
            "offset=0"
        );
    }

    #[test]
    fn data_segment_with_init_expression() {
        let events = vec![
            ReaderState::BeginDataSectionEntry(SegmentHeader { index: 0 }),
            ReaderState::BeginInitExpressionBody,
            ReaderState::InitExpressionOperator(Operator::i32_const(1024)),
            ReaderState::InitExpressionOperator(Operator::end()),
            ReaderState::EndInitExpressionBody,
            ReaderState::DataSectionEntryBody(DataSegmentBody { data: vec![0x68, 0x69] }),
            ReaderState::EndDataSectionEntry,
        ];
        let mut d = Disassembler::new();
        for event in &events {
            d.handle_event(event).unwrap();
        }
        assert_eq!(
            d.buffer,
            "  (data\n    (\n      i32.const 1024\n      end\n    )\n    \"hi\"\n  )\n"
        );
    }

    #[test]
    fn indent_balances_after_function_body() {
        let events = vec![
            ReaderState::BeginFunctionBody(FunctionInformation { locals: vec![] }),
            ReaderState::CodeOperator(Operator::block(BlockType::Empty)),
            ReaderState::CodeOperator(Operator::end()),
            ReaderState::CodeOperator(Operator::end()),
            ReaderState::EndFunctionBody,
        ];
        let mut d = Disassembler::new();
        d.types.push(FunctionType { form: -0x20, params: vec![], returns: vec![] });
        d.func_types.push(0);
        for event in &events {
            d.handle_event(event).unwrap();
        }
        assert_eq!(d.indent_level, 0);
    }
}
