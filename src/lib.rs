//! # wasm-codec
//!
//! A streaming Wasm binary emitter and text (`.wat`) disassembler.
//!
//! Both sinks are pure consumers of a [`event::ReaderState`] event stream
//! produced by an external [`event::BinaryReader`] (itself out of scope —
//! this crate starts downstream of parsing, see `spec.md` §1/§6.1):
//!
//! - [`emitter::Emitter`] re-encodes the event stream back into the
//!   canonical Wasm binary format, byte for byte.
//! - [`disassembler::Disassembler`] renders the same event stream as
//!   human-readable `.wat` text.
//!
//! Neither sink validates Wasm semantics (type checking, control-flow
//! well-formedness, import resolution): they trust the event stream is
//! already a legal module and focus purely on the encode/pretty-print
//! transformation. A caller that needs semantic validation runs it upstream,
//! against the `BinaryReader` implementation, before these sinks ever see
//! the events.
//!
//! ```no_run
//! use wasm_codec::emitter::Emitter;
//! use wasm_codec::event::{BinaryReader, ReaderState};
//!
//! fn emit<R: BinaryReader>(reader: &mut R) -> Result<Vec<u8>, wasm_codec::emitter::Error> {
//!     let mut emitter = Emitter::new();
//!     emitter.write(reader)?;
//!     Ok(emitter.into_bytes().unwrap_or_default())
//! }
//! ```

pub mod disassembler;
pub mod emitter;
pub mod event;
pub mod float;
pub mod leb128;
pub mod operator;
pub mod value;

pub use disassembler::Disassembler;
pub use emitter::Emitter;
