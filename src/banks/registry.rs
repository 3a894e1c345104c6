use std::path::Path;

use tracing::{debug, warn};

use crate::banks::btg::{BtgExcel, BtgPdf};
use crate::banks::bradesco::Bradesco;
use crate::banks::c6::C6Card;
use crate::banks::clear::Clear;
use crate::banks::inter::Inter;
use crate::banks::itau::{ItauExcel, ItauTxt};
use crate::banks::nubank::{NubankAccount, NubankCard};
use crate::banks::xp::{XpAccount, XpCard};
use crate::banks::BankParser;
use crate::formats::{probe_lines, PROBE_LINES};
use crate::models::FileType;

/// Ordered list of dialect parsers. The first recognizer that accepts a file
/// wins, so card parsers sit before their bank's account parser.
pub struct BankParserRegistry {
    parsers: Vec<Box<dyn BankParser>>,
}

impl Default for BankParserRegistry {
    fn default() -> Self {
        Self::default_order()
    }
}

impl BankParserRegistry {
    pub fn empty() -> Self {
        Self { parsers: Vec::new() }
    }

    pub fn default_order() -> Self {
        Self {
            parsers: vec![
                Box::new(NubankCard),
                Box::new(NubankAccount),
                Box::new(XpCard),
                Box::new(XpAccount),
                Box::new(C6Card),
                Box::new(Bradesco),
                Box::new(Inter),
                Box::new(BtgExcel),
                Box::new(BtgPdf),
                Box::new(ItauTxt),
                Box::new(ItauExcel),
                Box::new(Clear),
            ],
        }
    }

    /// Append a parser. It is tried after every parser already registered.
    pub fn register(&mut self, parser: Box<dyn BankParser>) {
        self.parsers.push(parser);
    }

    pub fn parsers(&self) -> impl Iterator<Item = &dyn BankParser> {
        self.parsers.iter().map(|p| p.as_ref())
    }

    pub fn parser_by_key(&self, key: &str) -> Option<&dyn BankParser> {
        self.parsers().find(|p| p.key() == key)
    }

    /// First parser that recognizes already-probed lines.
    pub fn detect_from_lines(&self, file_name: &str, first_lines: &[String]) -> Option<&dyn BankParser> {
        self.parsers().find(|p| p.can_parse(file_name, first_lines))
    }

    /// Probe the file and return the first parser that recognizes it.
    /// `filename_hint` is the user-facing name when `path` is a temp file.
    pub fn detect_parser(&self, path: &Path, filename_hint: Option<&str>) -> Option<&dyn BankParser> {
        let file_name = filename_hint
            .map(str::to_string)
            .or_else(|| path.file_name().and_then(|n| n.to_str()).map(str::to_string))?;
        let file_type = FileType::from_file_name(&file_name)?;
        let lines = match probe_lines(path, file_type, PROBE_LINES) {
            Ok(lines) => lines,
            Err(e) => {
                warn!(file = %file_name, error = %e, "could not probe file for a bank dialect");
                return None;
            }
        };
        let parser = self.detect_from_lines(&file_name, &lines);
        match parser {
            Some(p) => debug!(file = %file_name, parser = p.key(), "detected bank dialect"),
            None => debug!(file = %file_name, "no bank dialect matched"),
        }
        parser
    }
}
