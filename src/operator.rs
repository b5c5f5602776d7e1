//! The operator codec: opcode constants, the symbolic name table the
//! disassembler derives its mnemonics from, and the `Operator` immediate
//! record shared verbatim between the emitter and the disassembler.
//!
//! Grounded in the teacher's `src/isa.rs` `Instruction` enum (same MVP
//! opcode surface: `get_local`/`set_local`/`tee_local`,
//! `current_memory`/`grow_memory`, the four typed consts) — kept here as a
//! raw `u8` code plus a lookup table rather than one enum variant per
//! opcode, matching spec.md §3's literal data model (`code: u8 or two-byte`).

use crate::event::Int64;
use crate::value::BlockType;

pub mod opcode {
    pub const UNREACHABLE: u8 = 0x00;
    pub const NOP: u8 = 0x01;
    pub const BLOCK: u8 = 0x02;
    pub const LOOP: u8 = 0x03;
    pub const IF: u8 = 0x04;
    pub const ELSE: u8 = 0x05;
    pub const END: u8 = 0x0B;
    pub const BR: u8 = 0x0C;
    pub const BR_IF: u8 = 0x0D;
    pub const BR_TABLE: u8 = 0x0E;
    pub const RETURN: u8 = 0x0F;
    pub const CALL: u8 = 0x10;
    pub const CALL_INDIRECT: u8 = 0x11;
    pub const DROP: u8 = 0x1A;
    pub const SELECT: u8 = 0x1B;
    pub const GET_LOCAL: u8 = 0x20;
    pub const SET_LOCAL: u8 = 0x21;
    pub const TEE_LOCAL: u8 = 0x22;
    pub const GET_GLOBAL: u8 = 0x23;
    pub const SET_GLOBAL: u8 = 0x24;
    pub const I32_LOAD: u8 = 0x28;
    pub const I64_LOAD: u8 = 0x29;
    pub const F32_LOAD: u8 = 0x2A;
    pub const F64_LOAD: u8 = 0x2B;
    pub const I32_LOAD8_S: u8 = 0x2C;
    pub const I32_LOAD8_U: u8 = 0x2D;
    pub const I32_LOAD16_S: u8 = 0x2E;
    pub const I32_LOAD16_U: u8 = 0x2F;
    pub const I64_LOAD8_S: u8 = 0x30;
    pub const I64_LOAD8_U: u8 = 0x31;
    pub const I64_LOAD16_S: u8 = 0x32;
    pub const I64_LOAD16_U: u8 = 0x33;
    pub const I64_LOAD32_S: u8 = 0x34;
    pub const I64_LOAD32_U: u8 = 0x35;
    pub const I32_STORE: u8 = 0x36;
    pub const I64_STORE: u8 = 0x37;
    pub const F32_STORE: u8 = 0x38;
    pub const F64_STORE: u8 = 0x39;
    pub const I32_STORE8: u8 = 0x3A;
    pub const I32_STORE16: u8 = 0x3B;
    pub const I64_STORE8: u8 = 0x3C;
    pub const I64_STORE16: u8 = 0x3D;
    pub const I64_STORE32: u8 = 0x3E;
    pub const CURRENT_MEMORY: u8 = 0x3F;
    pub const GROW_MEMORY: u8 = 0x40;
    pub const I32_CONST: u8 = 0x41;
    pub const I64_CONST: u8 = 0x42;
    pub const F32_CONST: u8 = 0x43;
    pub const F64_CONST: u8 = 0x44;
}

/// `(code, raw_name)` pairs covering the full MVP opcode set. `raw_name`
/// uses the underscore spelling (`i32_add`, `i32_trunc_s_f32`) the
/// disassembler's naming rule (spec.md §4.5) rewrites into dotted/slashed
/// `.wat` mnemonics.
pub static OPCODE_NAMES: &[(u8, &str)] = &[
    (opcode::UNREACHABLE, "unreachable"),
    (opcode::NOP, "nop"),
    (opcode::BLOCK, "block"),
    (opcode::LOOP, "loop"),
    (opcode::IF, "if"),
    (opcode::ELSE, "else"),
    (opcode::END, "end"),
    (opcode::BR, "br"),
    (opcode::BR_IF, "br_if"),
    (opcode::BR_TABLE, "br_table"),
    (opcode::RETURN, "return"),
    (opcode::CALL, "call"),
    (opcode::CALL_INDIRECT, "call_indirect"),
    (opcode::DROP, "drop"),
    (opcode::SELECT, "select"),
    (opcode::GET_LOCAL, "get_local"),
    (opcode::SET_LOCAL, "set_local"),
    (opcode::TEE_LOCAL, "tee_local"),
    (opcode::GET_GLOBAL, "get_global"),
    (opcode::SET_GLOBAL, "set_global"),
    (opcode::I32_LOAD, "i32_load"),
    (opcode::I64_LOAD, "i64_load"),
    (opcode::F32_LOAD, "f32_load"),
    (opcode::F64_LOAD, "f64_load"),
    (opcode::I32_LOAD8_S, "i32_load8_s"),
    (opcode::I32_LOAD8_U, "i32_load8_u"),
    (opcode::I32_LOAD16_S, "i32_load16_s"),
    (opcode::I32_LOAD16_U, "i32_load16_u"),
    (opcode::I64_LOAD8_S, "i64_load8_s"),
    (opcode::I64_LOAD8_U, "i64_load8_u"),
    (opcode::I64_LOAD16_S, "i64_load16_s"),
    (opcode::I64_LOAD16_U, "i64_load16_u"),
    (opcode::I64_LOAD32_S, "i64_load32_s"),
    (opcode::I64_LOAD32_U, "i64_load32_u"),
    (opcode::I32_STORE, "i32_store"),
    (opcode::I64_STORE, "i64_store"),
    (opcode::F32_STORE, "f32_store"),
    (opcode::F64_STORE, "f64_store"),
    (opcode::I32_STORE8, "i32_store8"),
    (opcode::I32_STORE16, "i32_store16"),
    (opcode::I64_STORE8, "i64_store8"),
    (opcode::I64_STORE16, "i64_store16"),
    (opcode::I64_STORE32, "i64_store32"),
    (opcode::CURRENT_MEMORY, "current_memory"),
    (opcode::GROW_MEMORY, "grow_memory"),
    (opcode::I32_CONST, "i32_const"),
    (opcode::I64_CONST, "i64_const"),
    (opcode::F32_CONST, "f32_const"),
    (opcode::F64_CONST, "f64_const"),
    (0x45, "i32_eqz"),
    (0x46, "i32_eq"),
    (0x47, "i32_ne"),
    (0x48, "i32_lt_s"),
    (0x49, "i32_lt_u"),
    (0x4A, "i32_gt_s"),
    (0x4B, "i32_gt_u"),
    (0x4C, "i32_le_s"),
    (0x4D, "i32_le_u"),
    (0x4E, "i32_ge_s"),
    (0x4F, "i32_ge_u"),
    (0x50, "i64_eqz"),
    (0x51, "i64_eq"),
    (0x52, "i64_ne"),
    (0x53, "i64_lt_s"),
    (0x54, "i64_lt_u"),
    (0x55, "i64_gt_s"),
    (0x56, "i64_gt_u"),
    (0x57, "i64_le_s"),
    (0x58, "i64_le_u"),
    (0x59, "i64_ge_s"),
    (0x5A, "i64_ge_u"),
    (0x5B, "f32_eq"),
    (0x5C, "f32_ne"),
    (0x5D, "f32_lt"),
    (0x5E, "f32_gt"),
    (0x5F, "f32_le"),
    (0x60, "f32_ge"),
    (0x61, "f64_eq"),
    (0x62, "f64_ne"),
    (0x63, "f64_lt"),
    (0x64, "f64_gt"),
    (0x65, "f64_le"),
    (0x66, "f64_ge"),
    (0x67, "i32_clz"),
    (0x68, "i32_ctz"),
    (0x69, "i32_popcnt"),
    (0x6A, "i32_add"),
    (0x6B, "i32_sub"),
    (0x6C, "i32_mul"),
    (0x6D, "i32_div_s"),
    (0x6E, "i32_div_u"),
    (0x6F, "i32_rem_s"),
    (0x70, "i32_rem_u"),
    (0x71, "i32_and"),
    (0x72, "i32_or"),
    (0x73, "i32_xor"),
    (0x74, "i32_shl"),
    (0x75, "i32_shr_s"),
    (0x76, "i32_shr_u"),
    (0x77, "i32_rotl"),
    (0x78, "i32_rotr"),
    (0x79, "i64_clz"),
    (0x7A, "i64_ctz"),
    (0x7B, "i64_popcnt"),
    (0x7C, "i64_add"),
    (0x7D, "i64_sub"),
    (0x7E, "i64_mul"),
    (0x7F, "i64_div_s"),
    (0x80, "i64_div_u"),
    (0x81, "i64_rem_s"),
    (0x82, "i64_rem_u"),
    (0x83, "i64_and"),
    (0x84, "i64_or"),
    (0x85, "i64_xor"),
    (0x86, "i64_shl"),
    (0x87, "i64_shr_s"),
    (0x88, "i64_shr_u"),
    (0x89, "i64_rotl"),
    (0x8A, "i64_rotr"),
    (0x8B, "f32_abs"),
    (0x8C, "f32_neg"),
    (0x8D, "f32_ceil"),
    (0x8E, "f32_floor"),
    (0x8F, "f32_trunc"),
    (0x90, "f32_nearest"),
    (0x91, "f32_sqrt"),
    (0x92, "f32_add"),
    (0x93, "f32_sub"),
    (0x94, "f32_mul"),
    (0x95, "f32_div"),
    (0x96, "f32_min"),
    (0x97, "f32_max"),
    (0x98, "f32_copysign"),
    (0x99, "f64_abs"),
    (0x9A, "f64_neg"),
    (0x9B, "f64_ceil"),
    (0x9C, "f64_floor"),
    (0x9D, "f64_trunc"),
    (0x9E, "f64_nearest"),
    (0x9F, "f64_sqrt"),
    (0xA0, "f64_add"),
    (0xA1, "f64_sub"),
    (0xA2, "f64_mul"),
    (0xA3, "f64_div"),
    (0xA4, "f64_min"),
    (0xA5, "f64_max"),
    (0xA6, "f64_copysign"),
    (0xA7, "i32_wrap_i64"),
    (0xA8, "i32_trunc_s_f32"),
    (0xA9, "i32_trunc_u_f32"),
    (0xAA, "i32_trunc_s_f64"),
    (0xAB, "i32_trunc_u_f64"),
    (0xAC, "i64_extend_s_i32"),
    (0xAD, "i64_extend_u_i32"),
    (0xAE, "i64_trunc_s_f32"),
    (0xAF, "i64_trunc_u_f32"),
    (0xB0, "i64_trunc_s_f64"),
    (0xB1, "i64_trunc_u_f64"),
    (0xB2, "f32_convert_s_i32"),
    (0xB3, "f32_convert_u_i32"),
    (0xB4, "f32_convert_s_i64"),
    (0xB5, "f32_convert_u_i64"),
    (0xB6, "f32_demote_f64"),
    (0xB7, "f64_convert_s_i32"),
    (0xB8, "f64_convert_u_i32"),
    (0xB9, "f64_convert_s_i64"),
    (0xBA, "f64_convert_u_i64"),
    (0xBB, "f64_promote_f32"),
    (0xBC, "i32_reinterpret_f32"),
    (0xBD, "i64_reinterpret_f64"),
    (0xBE, "f32_reinterpret_i32"),
    (0xBF, "f64_reinterpret_i64"),
];

/// Looks up the raw (underscore-spelled) mnemonic for `code`.
pub fn raw_mnemonic(code: u8) -> Option<&'static str> {
    OPCODE_NAMES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

/// Rewrites a raw mnemonic into its `.wat` spelling: a leading `iNN_`/`fNN_`
/// becomes `iNN.`/`fNN.`, a trailing `_iNN`/`_fNN` becomes `/iNN`/`/fNN`
/// (spec.md §4.5, §8 invariant 8). E.g. `i32_add` -> `i32.add`,
/// `i32_trunc_s_f32` -> `i32.trunc_s/f32`.
pub fn operator_mnemonic(code: u8) -> Option<String> {
    raw_mnemonic(code).map(|raw| {
        let mut name = raw.to_string();
        for prefix in ["i32_", "i64_", "f32_", "f64_"] {
            if let Some(rest) = name.strip_prefix(prefix) {
                name = format!("{}.{}", &prefix[..3], rest);
                break;
            }
        }
        for suffix in ["_i32", "_i64", "_f32", "_f64"] {
            if let Some(rest) = name.strip_suffix(suffix) {
                name = format!("{}/{}", rest, &suffix[1..]);
                break;
            }
        }
        name
    })
}

/// `memoryAddress` immediate: alignment flags (log2 of alignment in bytes)
/// plus byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryImmediate {
    pub flags: u32,
    pub offset: u32,
}

/// The natural (default) alignment flag for a load/store opcode: log2 of
/// the byte width of the memory access itself (not the value type it
/// produces — `i64.load32_u` accesses 4 bytes, so its default is `2`).
pub fn default_alignment(code: u8) -> Option<u32> {
    use opcode::*;
    let width = match code {
        I32_LOAD | I32_STORE | F32_LOAD | F32_STORE => 4,
        I64_LOAD | I64_STORE | F64_LOAD | F64_STORE => 8,
        I32_LOAD8_S | I32_LOAD8_U | I32_STORE8 => 1,
        I32_LOAD16_S | I32_LOAD16_U | I32_STORE16 => 2,
        I64_LOAD8_S | I64_LOAD8_U | I64_STORE8 => 1,
        I64_LOAD16_S | I64_LOAD16_U | I64_STORE16 => 2,
        I64_LOAD32_S | I64_LOAD32_U | I64_STORE32 => 4,
        _ => return None,
    };
    Some((width as u32).trailing_zeros())
}

pub fn is_memory_opcode(code: u8) -> bool {
    default_alignment(code).is_some()
}

/// A typed constant immediate. Floats are kept as raw IEEE-754 bits so the
/// disassembler can inspect them bit-exact (canonical NaN, signed zero)
/// rather than going through a lossy float round-trip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal {
    I32(i32),
    I64(Int64),
    F32(u32),
    F64(u64),
}

/// `OperatorInformation`: `code` plus exactly the immediates `code`
/// requires (spec.md §3, §4.4).
#[derive(Debug, Clone, PartialEq)]
pub struct Operator {
    pub code: u8,
    pub block_type: Option<BlockType>,
    pub br_depth: Option<u32>,
    /// Branch targets for `br_table`; the last entry is the default target.
    pub br_table: Option<Vec<u32>>,
    pub func_index: Option<u32>,
    pub type_index: Option<u32>,
    pub local_index: Option<u32>,
    pub global_index: Option<u32>,
    pub memory_address: Option<MemoryImmediate>,
    pub literal: Option<Literal>,
}

impl Operator {
    fn bare(code: u8) -> Self {
        Operator {
            code,
            block_type: None,
            br_depth: None,
            br_table: None,
            func_index: None,
            type_index: None,
            local_index: None,
            global_index: None,
            memory_address: None,
            literal: None,
        }
    }

    pub fn end() -> Self {
        Self::bare(opcode::END)
    }

    pub fn nop() -> Self {
        Self::bare(opcode::NOP)
    }

    pub fn block(block_type: BlockType) -> Self {
        Operator {
            block_type: Some(block_type),
            ..Self::bare(opcode::BLOCK)
        }
    }

    pub fn get_local(index: u32) -> Self {
        Operator {
            local_index: Some(index),
            ..Self::bare(opcode::GET_LOCAL)
        }
    }

    pub fn br_table(targets: Vec<u32>) -> Self {
        Operator {
            br_table: Some(targets),
            ..Self::bare(opcode::BR_TABLE)
        }
    }

    pub fn call(func_index: u32) -> Self {
        Operator {
            func_index: Some(func_index),
            ..Self::bare(opcode::CALL)
        }
    }

    pub fn i32_const(value: i32) -> Self {
        Operator {
            literal: Some(Literal::I32(value)),
            ..Self::bare(opcode::I32_CONST)
        }
    }

    pub fn i64_const(bits: Int64) -> Self {
        Operator {
            literal: Some(Literal::I64(bits)),
            ..Self::bare(opcode::I64_CONST)
        }
    }

    pub fn f32_const(bits: u32) -> Self {
        Operator {
            literal: Some(Literal::F32(bits)),
            ..Self::bare(opcode::F32_CONST)
        }
    }

    pub fn f64_const(bits: u64) -> Self {
        Operator {
            literal: Some(Literal::F64(bits)),
            ..Self::bare(opcode::F64_CONST)
        }
    }

    pub fn load(code: u8, memory_address: MemoryImmediate) -> Self {
        Operator {
            memory_address: Some(memory_address),
            ..Self::bare(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_dotted_and_slashed_mnemonics() {
        assert_eq!(operator_mnemonic(opcode::I32_LOAD).as_deref(), Some("i32.load"));
        assert_eq!(operator_mnemonic(0xA8).as_deref(), Some("i32.trunc_s/f32"));
        assert_eq!(operator_mnemonic(opcode::GET_LOCAL).as_deref(), Some("get_local"));
        assert_eq!(operator_mnemonic(opcode::BR_TABLE).as_deref(), Some("br_table"));
    }

    #[test]
    fn default_alignment_matches_access_width() {
        assert_eq!(default_alignment(opcode::I32_LOAD), Some(2));
        assert_eq!(default_alignment(opcode::I64_LOAD), Some(3));
        assert_eq!(default_alignment(opcode::I64_LOAD32_U), Some(2));
        assert_eq!(default_alignment(opcode::I32_LOAD8_S), Some(0));
        assert_eq!(default_alignment(opcode::NOP), None);
    }
}
