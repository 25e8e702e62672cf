//! scd-script
//!
//! Reader, typed decoder, AST builder, decompiler and assembler for the SCD room script bytecode
//! used by three related engine dialects.
//!
//! Everything here works on in-memory buffers. Decoding is tolerant: malformed streams produce
//! partial results instead of errors. Assembling collects diagnostics and fails only at the end.

pub mod assembler;
pub mod ast;
pub mod ast_builder;
pub mod builder;
pub mod conditions;
pub mod constants;
pub mod decompiler;
pub mod error;
pub mod instruction;
pub mod opcode;
pub mod reader;
pub mod version;

pub use assembler::{assemble, AssembledScript, Diagnostic, DiagnosticCode, ScdAssembler, Severity};
pub use ast::{AstNode, AstVisitor, ScriptAst, ScriptNode};
pub use ast_builder::ScriptAstBuilder;
pub use conditions::{AstPrinter, ConditionCollector, ConditionSink, ConditionalWalker, ScriptCondition};
pub use constants::{constant_table, ConstantTable};
pub use decompiler::{decompile, disassemble, instruction_operands, ScriptDecompiler};
pub use error::{Result, ScdError};
pub use instruction::{Instruction, Op};
pub use reader::{read_script, ScriptVisitor};
pub use version::{BioVersion, ScriptKind};
