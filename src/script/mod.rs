//! The embedded body language
//!
//! Function bodies are written in a small JavaScript-like language: `let`,
//! `const`, `if`/`else`, `while`, `return`, `throw`, arithmetic, comparisons,
//! property access through `this`, and calls of function values. There is no
//! access to the host: a body can only see its arguments, its receiver and
//! values reachable from them.

pub mod ast;
pub(crate) mod interp;
pub mod lexer;
pub mod parser;

pub use interp::MAX_CALL_DEPTH;
