/* Copyright (C) 2018 Olivier Goffart <ogoffart@woboq.com>

Permission is hereby granted, free of charge, to any person obtaining a copy of this software and
associated documentation files (the "Software"), to deal in the Software without restriction,
including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense,
and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so,
subject to the following conditions:

The above copyright notice and this permission notice shall be included in all copies or substantial
portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT
NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES
OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.
*/

//! `.po` (text catalog) decoder.
//!
//! The decoder is best-effort at the record level: a record with an
//! unterminated string, an unknown keyword or a continuation line without a
//! keyword is logged and skipped, and the rest of the file still loads.
//! Only a payload that is not UTF-8 fails the whole decode.
//!
//! Obsolete records (`#~`) are dropped. `#,` flags are kept on the entry.

use crate::catalog::{Catalog, CatalogFormat, Entry};
use crate::error::{CatalogError, Result};

/// Decodes a `.po` payload into a [`Catalog`].
pub fn decode(bytes: &[u8]) -> Result<Catalog> {
    let text = std::str::from_utf8(bytes).map_err(|source| CatalogError::InvalidUtf8 {
        what: "po file",
        source,
    })?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut catalog = Catalog::new(CatalogFormat::Po);
    let mut record = Record::default();
    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();

        if line.is_empty() {
            record.finish(&mut catalog);
            continue;
        }
        if line.starts_with('#') {
            if record.has_translation() {
                record.finish(&mut catalog);
            }
            record.start(line_no);
            if line.starts_with("#~") {
                record.obsolete = true;
            } else if let Some(flags) = line.strip_prefix("#,") {
                record.flags.extend(
                    flags
                        .split(',')
                        .map(str::trim)
                        .filter(|f| !f.is_empty())
                        .map(str::to_owned),
                );
            }
            continue;
        }
        if record.obsolete {
            record.finish(&mut catalog);
        }
        if line.starts_with('"') {
            record.start(line_no);
            match parse_quoted(line) {
                Ok(s) => record.append(&s),
                Err(e) => record.fail(e),
            }
            continue;
        }

        let (keyword, rest) = line
            .split_once(|c: char| c.is_ascii_whitespace())
            .unwrap_or((line, ""));
        let field = match keyword {
            "msgctxt" => Field::Context,
            "msgid" => Field::Id,
            "msgid_plural" => Field::IdPlural,
            "msgstr" => Field::Text,
            k => match k
                .strip_prefix("msgstr[")
                .and_then(|k| k.strip_suffix(']'))
                .map(str::parse::<usize>)
            {
                Some(Ok(index)) => Field::TextPlural(index),
                _ => {
                    record.start(line_no);
                    record.fail("unknown keyword");
                    continue;
                }
            },
        };
        if matches!(field, Field::Context | Field::Id) && record.has_translation() {
            record.finish(&mut catalog);
        }
        record.start(line_no);
        match parse_quoted(rest) {
            Ok(value) => record.set(field, value),
            Err(e) => record.fail(e),
        }
    }
    record.finish(&mut catalog);

    tracing::debug!(
        entries = catalog.len(),
        language = catalog.language(),
        "decoded po catalog"
    );
    Ok(catalog)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Field {
    Context,
    Id,
    IdPlural,
    Text,
    TextPlural(usize),
}

// Refuses msgstr[N] indices that would allocate absurd vectors.
const MAX_PLURAL_FORMS: usize = 256;

#[derive(Default)]
struct Record {
    start_line: Option<usize>,
    flags: Vec<String>,
    context: Option<String>,
    id: Option<String>,
    id_plural: Option<String>,
    text: Option<String>,
    text_plural: Vec<(usize, String)>,
    last: Option<Field>,
    error: Option<&'static str>,
    obsolete: bool,
}

impl Record {
    fn start(&mut self, line_no: usize) {
        self.start_line.get_or_insert(line_no);
    }

    fn has_translation(&self) -> bool {
        self.text.is_some() || !self.text_plural.is_empty()
    }

    fn fail(&mut self, error: &'static str) {
        self.error.get_or_insert(error);
    }

    fn set(&mut self, field: Field, value: String) {
        let duplicate = match field {
            Field::Context => self.id.is_some() || self.context.replace(value).is_some(),
            Field::Id => self.id.replace(value).is_some(),
            Field::IdPlural if self.id.is_none() => return self.fail("msgid_plural before msgid"),
            Field::IdPlural => self.id_plural.replace(value).is_some(),
            Field::Text | Field::TextPlural(_) if self.id.is_none() => {
                return self.fail("msgstr before msgid")
            }
            Field::Text => self.text.replace(value).is_some(),
            Field::TextPlural(index) if index >= MAX_PLURAL_FORMS => {
                return self.fail("plural index too large")
            }
            Field::TextPlural(index) => {
                let duplicate = self.text_plural.iter().any(|(i, _)| *i == index);
                self.text_plural.push((index, value));
                duplicate
            }
        };
        if duplicate {
            self.fail("duplicate keyword in record");
        }
        self.last = Some(field);
    }

    fn append(&mut self, s: &str) {
        let target = match self.last {
            Some(Field::Context) => self.context.as_mut(),
            Some(Field::Id) => self.id.as_mut(),
            Some(Field::IdPlural) => self.id_plural.as_mut(),
            Some(Field::Text) => self.text.as_mut(),
            Some(Field::TextPlural(_)) => self.text_plural.last_mut().map(|(_, t)| t),
            None => None,
        };
        match target {
            Some(target) => target.push_str(s),
            None => self.fail("continuation line without keyword"),
        }
    }

    fn finish(&mut self, catalog: &mut Catalog) {
        let record = std::mem::take(self);
        let line = record.start_line.unwrap_or(0);
        if record.obsolete {
            return;
        }
        if let Some(error) = record.error {
            tracing::warn!(line, error, "skipping malformed po record");
            return;
        }
        let Some(id) = record.id else {
            if record.context.is_some() || record.text.is_some() || !record.text_plural.is_empty() {
                tracing::warn!(line, error = "missing msgid", "skipping malformed po record");
            }
            return;
        };

        let mut text_plural = Vec::new();
        for (index, form) in record.text_plural {
            if text_plural.len() <= index {
                text_plural.resize(index + 1, String::new());
            }
            text_plural[index] = form;
        }
        if record.id_plural.is_some() && text_plural.is_empty() {
            if let Some(text) = &record.text {
                text_plural.push(text.clone());
            }
        }
        let text = record
            .text
            .or_else(|| text_plural.first().cloned())
            .unwrap_or_default();

        catalog.add_entry(Entry {
            context: record.context,
            id,
            id_plural: record.id_plural,
            text,
            text_plural,
            flags: record.flags,
        });
    }
}

/// Parses one `"..."` literal, resolving C escapes. Only whitespace may
/// follow the closing quote.
fn parse_quoted(s: &str) -> std::result::Result<String, &'static str> {
    let s = s.trim();
    let body = s.strip_prefix('"').ok_or("expected string literal")?;
    let mut out = Vec::with_capacity(body.len());
    let mut chars = body.char_indices().peekable();
    while let Some((pos, c)) = chars.next() {
        match c {
            '"' => {
                if !body[pos + 1..].trim().is_empty() {
                    return Err("trailing characters after string");
                }
                return String::from_utf8(out).map_err(|_| "escape produced invalid utf-8");
            }
            '\\' => {
                let (_, e) = chars.next().ok_or("unterminated string")?;
                match e {
                    'n' => out.push(b'\n'),
                    't' => out.push(b'\t'),
                    'r' => out.push(b'\r'),
                    'a' => out.push(0x07),
                    'b' => out.push(0x08),
                    'f' => out.push(0x0c),
                    'v' => out.push(0x0b),
                    '0'..='7' => {
                        let mut value = e.to_digit(8).unwrap_or(0);
                        for _ in 0..2 {
                            match chars.peek().and_then(|&(_, d)| d.to_digit(8)) {
                                Some(d) => {
                                    value = value * 8 + d;
                                    chars.next();
                                }
                                None => break,
                            }
                        }
                        out.push(value as u8);
                    }
                    'x' => {
                        let mut value = None;
                        for _ in 0..2 {
                            match chars.peek().and_then(|&(_, d)| d.to_digit(16)) {
                                Some(d) => {
                                    value = Some(value.unwrap_or(0) * 16 + d);
                                    chars.next();
                                }
                                None => break,
                            }
                        }
                        out.push(value.ok_or("invalid hex escape")? as u8);
                    }
                    // \" \\ \' \? and anything unknown keep the escaped char.
                    other => {
                        let mut buf = [0; 4];
                        out.extend_from_slice(other.encode_utf8(&mut buf).as_bytes());
                    }
                }
            }
            c => {
                let mut buf = [0; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    Err("unterminated string")
}
