//! Bank dialects. Each strategy recognizes one export layout and maps its rows
//! into canonical transactions.

pub mod btg;
pub mod bradesco;
pub mod c6;
pub mod clear;
pub mod common;
pub mod inter;
pub mod itau;
pub mod nubank;
pub mod registry;
pub mod xp;

use std::path::Path;

use crate::error::Result;
use crate::models::{AccountKind, FileType, ParseOptions, ParseResult};

pub use registry::BankParserRegistry;

pub trait BankParser: Send + Sync {
    /// Stable identifier, used by `--format`.
    fn key(&self) -> &'static str;
    fn bank_name(&self) -> &'static str;
    fn account_type(&self) -> AccountKind;
    fn file_types(&self) -> &'static [FileType];
    /// Recognize the dialect from the file name and the first lines of the
    /// file as returned by [`crate::formats::probe_lines`].
    fn can_parse(&self, file_name: &str, first_lines: &[String]) -> bool;
    fn parse_file(&self, path: &Path, options: &ParseOptions) -> Result<ParseResult>;
}
