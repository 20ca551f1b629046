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

//! # Message catalogs
//!
//! This crate resolves source-language messages to localized templates using
//! gettext catalogs, and fills the templates in with printf-style arguments.
//!
//! * [`format()`] substitutes [`Value`]s into a template using the printf verb
//!   grammar (`%s`, `%5.2f`, `%[2]d`, ...). Errors are rendered inline
//!   (`%!d(string=hi)`), never raised.
//! * [`PluralRule`] compiles the C-like expression of a `Plural-Forms`
//!   header and maps a count to a plural form index.
//! * [`Catalog`] is the decoded content of one `.po` or `.mo` file.
//! * [`Translator`] and the [`Translations`] registry add text domains and a
//!   current locale on top.
//!
//! Example:
//!
//! ```
//! use xlat::{args, Translator};
//!
//! let po = br#"
//! msgid ""
//! msgstr ""
//! "Language: fr\n"
//! "Plural-Forms: nplurals=2; plural=(n > 1);\n"
//!
//! msgid "%d file in %s"
//! msgid_plural "%d files in %s"
//! msgstr[0] "%d fichier dans %s"
//! msgstr[1] "%d fichiers dans %s"
//! "#;
//! let fr = Translator::from_po_bytes(po).unwrap();
//! assert_eq!(fr.lang(), "fr");
//! assert_eq!(
//!     fr.ntranslate(None, "%d file in %s", "%d files in %s", 0, &args![0, "/tmp"]),
//!     "0 fichier dans /tmp"
//! );
//! assert_eq!(fr.translate(None, "Untranslated %v", &args![true]), "Untranslated true");
//! ```
//!
//! ## Optional features
//!
//! **`po`** and **`mo`** (both on by default) enable the text and binary
//! decoders respectively.

mod catalog;
mod error;
mod format;
pub mod locale;
#[cfg(feature = "mo")]
pub mod mo;
mod plural;
#[cfg(feature = "po")]
pub mod po;
mod registry;
mod translator;
mod value;

pub use catalog::{
    default_plural, parse_headers, Catalog, CatalogFormat, Entry, HEADER_LANGUAGE,
    HEADER_PLURAL_FORMS,
};
pub use error::{CatalogError, Result};
pub use format::{format, FormatArg};
pub use plural::{PluralFormsError, PluralRule};
pub use registry::{Domain, Translations, DEFAULT_DOMAIN, DEFAULT_SOURCE_CODE_LOCALE};
pub use translator::Translator;
pub use value::Value;
