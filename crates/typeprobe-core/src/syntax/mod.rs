//! Lightweight JavaScript/TypeScript syntax support.
//!
//! A tokenizer, a statement-level declaration binder and the CommonJS
//! assignment facts the checks need. This is not a parser for the full
//! language: anything it does not recognize is skipped.

pub mod commonjs;
pub mod cursor;
pub mod declarations;
pub mod lexer;
pub mod source_file;

pub use commonjs::{commonjs_facts, AssignedValue, CommonJsFacts};
pub use cursor::Cursor;
pub use declarations::{Declarations, ExportEntry, ExportEquals, ExportTarget, Symbol};
pub use lexer::{tokenize, Span, Token, TokenKind};
pub use source_file::{ModuleReference, ReferenceKind, SourceFile};
