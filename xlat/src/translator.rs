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

use std::path::Path;
use std::sync::Arc;

use crate::catalog::{default_plural, Catalog};
use crate::error::{CatalogError, Result};
use crate::format::format;
use crate::value::Value;

/// Something that resolves messages for one language.
///
/// `Noop` is what a registry hands out when it has no catalog for the
/// requested language: messages come back in the source language, formatted,
/// with the two-form plural rule. `Catalog` shares a decoded catalog, so
/// cloning a translator is cheap.
#[derive(Clone, Debug, Default)]
pub enum Translator {
    #[default]
    Noop,
    Catalog(Arc<Catalog>),
}

impl Translator {
    /// Decodes a `.po` payload.
    #[cfg(feature = "po")]
    pub fn from_po_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Catalog::from_po(bytes)?.into())
    }

    /// Decodes a `.mo` payload.
    #[cfg(feature = "mo")]
    pub fn from_mo_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Catalog::from_mo(bytes)?.into())
    }

    /// Reads and decodes a catalog file, choosing the decoder by extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match extension {
            #[cfg(feature = "po")]
            "po" => Self::from_po_bytes(&std::fs::read(path)?),
            #[cfg(feature = "mo")]
            "mo" => Self::from_mo_bytes(&std::fs::read(path)?),
            _ => Err(CatalogError::UnknownExtension(path.display().to_string())),
        }
    }

    /// The language this translator produces; `""` for `Noop`.
    pub fn lang(&self) -> &str {
        match self {
            Translator::Noop => "",
            Translator::Catalog(catalog) => catalog.language(),
        }
    }

    pub fn catalog(&self) -> Option<&Catalog> {
        match self {
            Translator::Noop => None,
            Translator::Catalog(catalog) => Some(catalog.as_ref()),
        }
    }

    pub fn translate(&self, context: Option<&str>, id: &str, args: &[Value]) -> String {
        match self {
            Translator::Noop => format(id, args),
            Translator::Catalog(catalog) => catalog.translate(context, id, args),
        }
    }

    pub fn ntranslate(
        &self,
        context: Option<&str>,
        id: &str,
        id_plural: &str,
        n: i64,
        args: &[Value],
    ) -> String {
        match self {
            Translator::Noop => format(default_plural(id, id_plural, n), args),
            Translator::Catalog(catalog) => catalog.ntranslate(context, id, id_plural, n, args),
        }
    }
}

impl From<Catalog> for Translator {
    fn from(catalog: Catalog) -> Self {
        Translator::Catalog(Arc::new(catalog))
    }
}

impl From<Arc<Catalog>> for Translator {
    fn from(catalog: Arc<Catalog>) -> Self {
        Translator::Catalog(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::Translator;
    use crate::args;
    use crate::catalog::{Catalog, CatalogFormat, Entry};
    use crate::error::CatalogError;

    fn polish() -> Translator {
        let mut catalog = Catalog::new(CatalogFormat::Po);
        catalog.add_entry(Entry {
            text: "Language: pl\nPlural-Forms: nplurals=3; plural=(n==1 ? 0 : n%10>=2 && n%10<=4 && (n%100<10 || n%100>=20) ? 1 : 2);\n".into(),
            ..Default::default()
        });
        catalog.add_entry(Entry {
            id: "%d file".into(),
            id_plural: Some("%d files".into()),
            text: "%d plik".into(),
            text_plural: vec!["%d plik".into(), "%d pliki".into(), "%d plików".into()],
            ..Default::default()
        });
        catalog.add_entry(Entry {
            id: "Hello %s".into(),
            text: "Cześć %s".into(),
            ..Default::default()
        });
        catalog.into()
    }

    #[test]
    fn noop() {
        let noop = Translator::Noop;
        assert_eq!(noop.lang(), "");
        assert!(noop.catalog().is_none());
        assert_eq!(noop.translate(None, "Hello %s", &args!["Tom"]), "Hello Tom");
        assert_eq!(noop.translate(Some("ctx"), "100%", &[]), "100%");
        assert_eq!(
            noop.ntranslate(None, "%d file", "%d files", 1, &args![1]),
            "1 file"
        );
        assert_eq!(
            noop.ntranslate(None, "%d file", "%d files", 0, &args![0]),
            "0 files"
        );
    }

    #[test]
    fn catalog() {
        let pl = polish();
        assert_eq!(pl.lang(), "pl");
        assert_eq!(pl.translate(None, "Hello %s", &args!["Ala"]), "Cześć Ala");
        assert_eq!(pl.translate(None, "Bye", &[]), "Bye");
        let files: Vec<_> = [1, 2, 5, 22, 112]
            .iter()
            .map(|&n| pl.ntranslate(None, "%d file", "%d files", n, &args![n]))
            .collect();
        assert_eq!(files, ["1 plik", "2 pliki", "5 plików", "22 pliki", "112 plików"]);
    }

    #[test]
    fn clones_share_the_catalog() {
        let pl = polish();
        let copy = pl.clone();
        match (&pl, &copy) {
            (Translator::Catalog(a), Translator::Catalog(b)) => {
                assert!(std::sync::Arc::ptr_eq(a, b))
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn unknown_extension() {
        assert!(matches!(
            Translator::from_path("messages.json"),
            Err(CatalogError::UnknownExtension(_))
        ));
    }

    #[cfg(feature = "po")]
    #[test]
    fn missing_file() {
        let path = std::env::temp_dir().join("xlat_translator_missing.po");
        assert!(matches!(Translator::from_path(path), Err(CatalogError::Io(_))));
    }
}
