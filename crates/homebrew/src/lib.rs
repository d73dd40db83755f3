//! Homebrew formula patching for brewbump.
//!
//! This crate reads a formula file and rewrites its `version` field and the
//! `sha256` field of each platform block, leaving every other byte alone.
//!
//! # Example
//!
//! ```rust,ignore
//! use brewbump_homebrew::{FormulaDocument, FormulaPatcher};
//!
//! let document = FormulaDocument::read("Formula/widget.rb")?;
//! let outcome = FormulaPatcher::patch(&document, "2.3.0", &checksums)?;
//! ```

mod document;
mod patch;

pub use document::FormulaDocument;
pub use patch::{FormulaPatcher, PatchOutcome, PatchReport};
