//! Charset sniffing for bank exports.
//!
//! Brazilian banks still ship Latin-1 and Windows-1252 files. Header names like
//! "Descrição" or "Histórico" only survive if the bytes are decoded with the
//! right table before the text is split into lines.

use std::fmt;

use tracing::debug;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Latin1,
    Windows1252,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Utf8 => "UTF-8",
            Self::Latin1 => "ISO-8859-1",
            Self::Windows1252 => "windows-1252",
        })
    }
}

/// Guess the charset of `bytes`. Inconclusive input is treated as UTF-8.
pub fn detect_encoding(bytes: &[u8]) -> Encoding {
    if bytes.starts_with(UTF8_BOM) || std::str::from_utf8(bytes).is_ok() {
        return Encoding::Utf8;
    }
    // 0x80..=0x9F are C1 controls in Latin-1 but printable (“ ” – €) in 1252.
    if bytes.iter().any(|b| (0x80..=0x9F).contains(b)) {
        Encoding::Windows1252
    } else {
        Encoding::Latin1
    }
}

pub fn decode_with(bytes: &[u8], encoding: Encoding) -> String {
    match encoding {
        Encoding::Utf8 => {
            let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
            String::from_utf8_lossy(body).into_owned()
        }
        Encoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
        Encoding::Windows1252 => {
            let (text, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes);
            text.into_owned()
        }
    }
}

/// Detect and decode in one step.
pub fn decode(bytes: &[u8]) -> (String, Encoding) {
    let encoding = detect_encoding(bytes);
    debug!(%encoding, len = bytes.len(), "decoded statement bytes");
    (decode_with(bytes, encoding), encoding)
}
