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

//! `.mo` (binary catalog) decoder.
//!
//! Layout, all integers 32 bits in the file's byte order:
//!
//! | offset | field                                   |
//! |--------|-----------------------------------------|
//! | 0      | magic `0x950412de`                      |
//! | 4      | revision                                |
//! | 8      | number of strings N                     |
//! | 12     | offset O of the original string table   |
//! | 16     | offset T of the translated string table |
//! | 20     | hash table size (unused here)           |
//! | 24     | hash table offset (unused here)         |
//!
//! Each table holds N `(length, offset)` descriptors. An original string is
//! `context \x04 id \0 id_plural`, with the context and plural parts
//! optional; a translated string holds the plural forms separated by `\0`.
//!
//! Unlike `.po` decoding, nothing here is best-effort: any descriptor that
//! leaves the buffer or any string that is not UTF-8 fails the decode.

use crate::catalog::{Catalog, CatalogFormat, Entry};
use crate::error::{CatalogError, Result};

const MAGIC: u32 = 0x9504_12de;
const HEADER_LEN: usize = 28;
const CONTEXT_SEPARATOR: char = '\x04';

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ByteOrder {
    Little,
    Big,
}

struct Reader<'a> {
    bytes: &'a [u8],
    order: ByteOrder,
}

impl<'a> Reader<'a> {
    fn u32_at(&self, offset: usize) -> Result<u32> {
        let raw: [u8; 4] = offset
            .checked_add(4)
            .and_then(|end| self.bytes.get(offset..end))
            .and_then(|b| b.try_into().ok())
            .ok_or(CatalogError::OutOfBounds {
                what: "integer",
                offset,
                length: 4,
                size: self.bytes.len(),
            })?;
        Ok(match self.order {
            ByteOrder::Little => u32::from_le_bytes(raw),
            ByteOrder::Big => u32::from_be_bytes(raw),
        })
    }

    /// The string described by descriptor `index` of the table at `table`.
    fn string(&self, table: usize, index: usize, what: &'static str) -> Result<&'a str> {
        let descriptor = table + index * 8;
        let length = self.u32_at(descriptor)? as usize;
        let offset = self.u32_at(descriptor + 4)? as usize;
        let bytes = offset
            .checked_add(length)
            .and_then(|end| self.bytes.get(offset..end))
            .ok_or(CatalogError::OutOfBounds {
                what,
                offset,
                length,
                size: self.bytes.len(),
            })?;
        std::str::from_utf8(bytes).map_err(|source| CatalogError::InvalidUtf8 { what, source })
    }

    /// Checks that a table of `count` descriptors fits at `offset`.
    fn check_table(&self, offset: usize, count: usize, what: &'static str) -> Result<()> {
        let length = count.checked_mul(8).unwrap_or(usize::MAX);
        match offset.checked_add(length) {
            Some(end) if end <= self.bytes.len() => Ok(()),
            _ => Err(CatalogError::OutOfBounds {
                what,
                offset,
                length,
                size: self.bytes.len(),
            }),
        }
    }
}

/// Decodes a `.mo` payload into a [`Catalog`].
pub fn decode(bytes: &[u8]) -> Result<Catalog> {
    if bytes.len() < HEADER_LEN {
        return Err(CatalogError::Truncated {
            needed: HEADER_LEN,
            got: bytes.len(),
        });
    }
    let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let order = if magic == MAGIC {
        ByteOrder::Little
    } else if magic.swap_bytes() == MAGIC {
        ByteOrder::Big
    } else {
        return Err(CatalogError::BadMagic(magic));
    };
    let reader = Reader { bytes, order };

    let revision = reader.u32_at(4)?;
    if revision >> 16 > 1 {
        return Err(CatalogError::UnsupportedRevision(revision));
    }
    let count = reader.u32_at(8)? as usize;
    let originals = reader.u32_at(12)? as usize;
    let translations = reader.u32_at(16)? as usize;
    reader.check_table(originals, count, "original string table")?;
    reader.check_table(translations, count, "translated string table")?;

    let mut catalog = Catalog::new(CatalogFormat::Mo);
    for index in 0..count {
        let original = reader.string(originals, index, "original string")?;
        let translated = reader.string(translations, index, "translated string")?;
        catalog.add_entry(entry(original, translated));
    }

    tracing::debug!(
        entries = catalog.len(),
        language = catalog.language(),
        big_endian = order == ByteOrder::Big,
        "decoded mo catalog"
    );
    Ok(catalog)
}

fn entry(original: &str, translated: &str) -> Entry {
    let (context, key) = match original.split_once(CONTEXT_SEPARATOR) {
        Some((context, key)) => (Some(context.to_owned()), key),
        None => (None, original),
    };
    let (id, id_plural) = match key.split_once('\0') {
        Some((id, plural)) => (id, Some(plural.to_owned())),
        None => (key, None),
    };
    let (text, text_plural) = if id_plural.is_some() {
        let forms: Vec<String> = translated.split('\0').map(str::to_owned).collect();
        (forms.first().cloned().unwrap_or_default(), forms)
    } else {
        (translated.to_owned(), Vec::new())
    };
    Entry {
        context,
        id: id.to_owned(),
        id_plural,
        text,
        text_plural,
        flags: Vec::new(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::decode;
    use crate::error::CatalogError;

    /// Lays out a minimal `.mo` file: header, both tables, then the strings.
    pub(crate) fn build_mo(pairs: &[(&str, &str)], big_endian: bool) -> Vec<u8> {
        let word = |v: usize| -> [u8; 4] {
            let v = v as u32;
            if big_endian {
                v.to_be_bytes()
            } else {
                v.to_le_bytes()
            }
        };
        let n = pairs.len();
        let originals = 28;
        let translations = originals + n * 8;
        let mut data_offset = translations + n * 8;
        let mut tables = (Vec::new(), Vec::new());
        let mut data = Vec::new();
        for (original, translated) in pairs {
            for (s, table) in [(original, &mut tables.0), (translated, &mut tables.1)] {
                table.extend_from_slice(&word(s.len()));
                table.extend_from_slice(&word(data_offset));
                data.extend_from_slice(s.as_bytes());
                data.push(0);
                data_offset += s.len() + 1;
            }
        }
        let mut out = Vec::new();
        for v in [0x9504_12de, 0, n, originals, translations, 0, 0] {
            out.extend_from_slice(&word(v));
        }
        out.extend(tables.0);
        out.extend(tables.1);
        out.extend(data);
        out
    }

    const PAIRS: &[(&str, &str)] = &[
        ("", "Language: fr\nPlural-Forms: nplurals=2; plural=(n > 1);\n"),
        ("Hello", "Bonjour"),
        ("menu\x04Open", "Ouvrir"),
        ("%d file\0%d files", "%d fichier\0%d fichiers"),
    ];

    #[test]
    fn little_endian() {
        let catalog = decode(&build_mo(PAIRS, false)).unwrap();
        assert_eq!(catalog.len(), 4);
        assert_eq!(catalog.language(), "fr");
        assert_eq!(catalog.lookup(None, "Hello"), "Bonjour");
        assert_eq!(catalog.lookup(Some("menu"), "Open"), "Ouvrir");
        assert_eq!(catalog.lookup(None, "Open"), "Open");
        let file = catalog.get(None, "%d file").unwrap();
        assert_eq!(file.id_plural.as_deref(), Some("%d files"));
        assert_eq!(file.text_plural, ["%d fichier", "%d fichiers"]);
        assert_eq!(catalog.lookup_plural(None, "%d file", "%d files", 0), "%d fichier");
        assert_eq!(catalog.lookup_plural(None, "%d file", "%d files", 2), "%d fichiers");
    }

    #[test]
    fn big_endian() {
        let catalog = decode(&build_mo(PAIRS, true)).unwrap();
        assert_eq!(catalog.lookup(None, "Hello"), "Bonjour");
        assert_eq!(catalog.plural_rule().total_forms(), 2);
    }

    #[test]
    fn bad_magic() {
        let mut bytes = build_mo(PAIRS, false);
        bytes[0] = 0;
        assert!(matches!(decode(&bytes), Err(CatalogError::BadMagic(_))));
    }

    #[test]
    fn unsupported_revision() {
        let mut bytes = build_mo(PAIRS, false);
        bytes[6] = 2;
        assert!(matches!(
            decode(&bytes),
            Err(CatalogError::UnsupportedRevision(0x0002_0000))
        ));
    }

    #[test]
    fn truncated() {
        assert!(matches!(
            decode(&[0xde, 0x12, 0x04, 0x95]),
            Err(CatalogError::Truncated { needed: 28, got: 4 })
        ));
        let bytes = build_mo(PAIRS, false);
        // Cuts into the string data.
        let short = &bytes[..bytes.len() - 4];
        assert!(matches!(decode(short), Err(CatalogError::OutOfBounds { .. })));
    }

    #[test]
    fn table_out_of_bounds() {
        let mut bytes = build_mo(PAIRS, false);
        bytes[8..12].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            decode(&bytes),
            Err(CatalogError::OutOfBounds { what: "original string table", .. })
        ));
    }

    #[test]
    fn invalid_utf8() {
        let mut bytes = build_mo(&[("a", "b")], false);
        let last = bytes.len() - 2;
        bytes[last] = 0xff;
        assert!(matches!(decode(&bytes), Err(CatalogError::InvalidUtf8 { .. })));
    }

    #[test]
    fn empty_catalog() {
        let catalog = decode(&build_mo(&[], false)).unwrap();
        assert!(catalog.is_empty());
        assert_eq!(catalog.language(), "");
    }
}
