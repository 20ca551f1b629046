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

use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use crate::format::format;
use crate::plural::PluralRule;
use crate::value::Value;

/// Header naming the catalog's language.
pub const HEADER_LANGUAGE: &str = "Language";
/// Header carrying the plural grammar.
pub const HEADER_PLURAL_FORMS: &str = "Plural-Forms";

/// One translatable unit of a catalog.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Entry {
    /// `msgctxt`; `None` is the default context.
    pub context: Option<String>,
    /// `msgid`. The empty id carries the catalog header.
    pub id: String,
    /// `msgid_plural`, present for countable entries.
    pub id_plural: Option<String>,
    /// `msgstr`, or the first plural form of a countable entry.
    pub text: String,
    /// `msgstr[N]`, indexed by plural form.
    pub text_plural: Vec<String>,
    /// `#,` flags from a `.po` file, e.g. `fuzzy` or `c-format`.
    pub flags: Vec<String>,
}

impl Entry {
    pub fn is_header(&self) -> bool {
        self.id.is_empty() && self.context.as_deref().unwrap_or("").is_empty()
    }

    pub fn is_fuzzy(&self) -> bool {
        self.flags.iter().any(|f| f == "fuzzy")
    }

    fn key(&self) -> EntryKey {
        EntryKey {
            context: self.context.clone().unwrap_or_default(),
            id: self.id.clone(),
        }
    }
}

/// Which file format a catalog was decoded from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CatalogFormat {
    Po,
    Mo,
}

/// Entries are indexed by context and message id; an absent context and an
/// empty one are the same key.
#[derive(PartialEq, Eq, Hash, PartialOrd, Ord, Clone, Debug)]
struct EntryKey {
    context: String,
    id: String,
}

/// Lets the map be queried with borrowed `(&str, &str)` pairs, so a lookup
/// does not allocate a key.
trait EntryLookup {
    fn context(&self) -> &str;
    fn id(&self) -> &str;
}

impl EntryLookup for EntryKey {
    fn context(&self) -> &str {
        &self.context
    }

    fn id(&self) -> &str {
        &self.id
    }
}

impl EntryLookup for (&str, &str) {
    fn context(&self) -> &str {
        self.0
    }

    fn id(&self) -> &str {
        self.1
    }
}

impl std::hash::Hash for dyn EntryLookup + '_ {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.context().hash(state);
        self.id().hash(state);
    }
}

impl PartialEq for dyn EntryLookup + '_ {
    fn eq(&self, other: &Self) -> bool {
        self.context() == other.context() && self.id() == other.id()
    }
}

impl Eq for dyn EntryLookup + '_ {}

impl<'a> std::borrow::Borrow<dyn EntryLookup + 'a> for EntryKey {
    fn borrow(&self) -> &(dyn EntryLookup + 'a) {
        self
    }
}

/// A decoded translation catalog for one language: its entries, its header
/// map, and the plural rule compiled from `Plural-Forms` on first use.
///
/// A catalog is not mutated by lookups and can be shared between threads.
#[derive(Debug)]
pub struct Catalog {
    format: CatalogFormat,
    entries: HashMap<EntryKey, Entry>,
    headers: BTreeMap<String, String>,
    plural: OnceLock<PluralRule>,
}

impl Catalog {
    pub fn new(format: CatalogFormat) -> Self {
        Self {
            format,
            entries: HashMap::new(),
            headers: BTreeMap::new(),
            plural: OnceLock::new(),
        }
    }

    /// Parses a `.po` payload. See [`crate::po`].
    #[cfg(feature = "po")]
    pub fn from_po(bytes: &[u8]) -> crate::Result<Self> {
        crate::po::decode(bytes)
    }

    /// Parses a `.mo` payload. See [`crate::mo`].
    #[cfg(feature = "mo")]
    pub fn from_mo(bytes: &[u8]) -> crate::Result<Self> {
        crate::mo::decode(bytes)
    }

    pub fn format(&self) -> CatalogFormat {
        self.format
    }

    /// Adds an entry, replacing any entry with the same context and id.
    ///
    /// Adding the header entry re-reads the header map and drops the cached
    /// plural rule.
    pub fn add_entry(&mut self, entry: Entry) {
        let is_header = entry.is_header();
        self.entries.insert(entry.key(), entry);
        if is_header {
            self.init_headers();
        }
    }

    /// Re-adds every entry of `other`; on conflicts, `other` wins.
    pub fn merge(&mut self, other: &Catalog) {
        for entry in other.entries.values() {
            self.add_entry(entry.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, context: Option<&str>, id: &str) -> Option<&Entry> {
        self.entries.get(&(context.unwrap_or(""), id) as &dyn EntryLookup)
    }

    /// All entries, ordered by context then id.
    pub fn sorted_entries(&self) -> Vec<&Entry> {
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries.into_iter().map(|(_, e)| e).collect()
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }

    /// The `Language` header, or `""`.
    pub fn language(&self) -> &str {
        self.header(HEADER_LANGUAGE).unwrap_or("")
    }

    /// The raw `Plural-Forms` header, or `""`.
    pub fn plural_forms(&self) -> &str {
        self.header(HEADER_PLURAL_FORMS).unwrap_or("")
    }

    /// The plural rule from `Plural-Forms`, compiled once and cached.
    pub fn plural_rule(&self) -> &PluralRule {
        self.plural.get_or_init(|| PluralRule::parse(self.plural_forms()))
    }

    /// The template for `id`: its translation, or `id` itself when there is
    /// no entry or the translation is empty.
    pub fn lookup<'a>(&'a self, context: Option<&str>, id: &'a str) -> &'a str {
        match self.get(context, id) {
            Some(entry) if !entry.is_header() && !entry.text.is_empty() => &entry.text,
            _ => id,
        }
    }

    /// The plural template for `n`.
    ///
    /// Falls back to `id`/`id_plural` chosen by [`PluralRule::default_index`]
    /// when there is no entry, the plural rule is unusable, the selected form
    /// does not exist, or it is empty.
    pub fn lookup_plural<'a>(
        &'a self,
        context: Option<&str>,
        id: &'a str,
        id_plural: &'a str,
        n: i64,
    ) -> &'a str {
        self.get(context, id)
            .filter(|entry| !entry.is_header())
            .and_then(|entry| {
                let index = self.plural_rule().select(n)?;
                entry
                    .text_plural
                    .get(index)
                    .map(String::as_str)
                    .filter(|text| !text.is_empty())
            })
            .unwrap_or_else(|| default_plural(id, id_plural, n))
    }

    /// [`lookup`](Self::lookup) followed by [`format`].
    pub fn translate(&self, context: Option<&str>, id: &str, args: &[Value]) -> String {
        format(self.lookup(context, id), args)
    }

    /// [`lookup_plural`](Self::lookup_plural) followed by [`format`].
    pub fn ntranslate(
        &self,
        context: Option<&str>,
        id: &str,
        id_plural: &str,
        n: i64,
        args: &[Value],
    ) -> String {
        format(self.lookup_plural(context, id, id_plural, n), args)
    }

    fn init_headers(&mut self) {
        self.headers = self
            .get(None, "")
            .map(|header| parse_headers(&header.text))
            .unwrap_or_default();
        self.plural = OnceLock::new();
    }
}

/// Picks between the source singular and plural with the two-form rule.
pub fn default_plural<'a>(id: &'a str, id_plural: &'a str, n: i64) -> &'a str {
    if PluralRule::default_index(n) == 0 {
        id
    } else {
        id_plural
    }
}

/// Splits a header entry's text into `Key: Value` pairs. Lines without a
/// `": "` separator are ignored.
pub fn parse_headers(text: &str) -> BTreeMap<String, String> {
    text.split('\n')
        .filter_map(|line| line.split_once(": "))
        .map(|(k, v)| (k.trim().to_owned(), v.trim().to_owned()))
        .filter(|(k, _)| !k.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;

    fn entry(context: Option<&str>, id: &str, text: &str) -> Entry {
        Entry {
            context: context.map(Into::into),
            id: id.into(),
            text: text.into(),
            ..Default::default()
        }
    }

    fn plural_entry(id: &str, id_plural: &str, forms: &[&str]) -> Entry {
        Entry {
            id: id.into(),
            id_plural: Some(id_plural.into()),
            text: forms.first().copied().unwrap_or_default().into(),
            text_plural: forms.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn header(text: &str) -> Entry {
        entry(None, "", text)
    }

    #[test]
    fn single_message() {
        let mut catalog = Catalog::new(CatalogFormat::Mo);
        catalog.add_entry(header("Language: de\n"));
        catalog.add_entry(entry(None, "Big Error", "Großer Fehler"));
        catalog.add_entry(entry(None, "Small Error", "Kleiner Fehler"));
        catalog.add_entry(entry(Some("some context"), "Small Error", "Kleiner Fehler im Kontext"));
        catalog.add_entry(entry(None, "Untranslated", ""));

        assert_eq!(catalog.lookup(None, "Big Error"), "Großer Fehler");
        assert_eq!(catalog.lookup(None, "Small Error"), "Kleiner Fehler");
        assert_eq!(catalog.lookup(Some(""), "Small Error"), "Kleiner Fehler");
        assert_eq!(
            catalog.lookup(Some("some context"), "Small Error"),
            "Kleiner Fehler im Kontext"
        );
        assert_eq!(catalog.lookup(None, "Untranslated"), "Untranslated");
        assert_eq!(catalog.lookup(None, "Missing"), "Missing");
        assert_eq!(catalog.lookup(None, ""), "");
    }

    #[test]
    fn last_write_wins() {
        let mut catalog = Catalog::new(CatalogFormat::Po);
        catalog.add_entry(entry(None, "a", "first"));
        catalog.add_entry(entry(None, "a", "second"));
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.lookup(None, "a"), "second");
    }

    #[test]
    fn headers_are_parsed() {
        let mut catalog = Catalog::new(CatalogFormat::Po);
        catalog.add_entry(header(
            "Language: de\nPlural-Forms: nplurals=2; plural=(n != 1);\nbogus line\nX-Key:  spaced  \n",
        ));
        assert_eq!(catalog.language(), "de");
        assert_eq!(catalog.header(HEADER_PLURAL_FORMS), Some("nplurals=2; plural=(n != 1);"));
        assert_eq!(catalog.header("X-Key"), Some("spaced"));
        assert_eq!(catalog.headers().len(), 3);
        assert_eq!(catalog.plural_rule().total_forms(), 2);
    }

    #[test]
    fn plural_message() {
        let mut catalog = Catalog::new(CatalogFormat::Mo);
        catalog.add_entry(header("Plural-Forms: nplurals=2; plural=(n != 1);\n"));
        catalog.add_entry(plural_entry("%d file", "%d files", &["%d Datei", "%d Dateien"]));

        assert_eq!(catalog.lookup_plural(None, "%d file", "%d files", 1), "%d Datei");
        assert_eq!(catalog.lookup_plural(None, "%d file", "%d files", 0), "%d Dateien");
        assert_eq!(catalog.ntranslate(None, "%d file", "%d files", 3, &args![3]), "3 Dateien");
        assert_eq!(catalog.lookup(None, "%d file"), "%d Datei");
    }

    #[test]
    fn plural_fallbacks() {
        let mut catalog = Catalog::new(CatalogFormat::Po);
        catalog.add_entry(header("Plural-Forms: nplurals=3; plural=n;\n"));
        catalog.add_entry(plural_entry("one", "many", &["eins", ""]));

        // Form 1 is empty, form 2 is missing, 5 is out of range.
        assert_eq!(catalog.lookup_plural(None, "one", "many", 0), "eins");
        assert_eq!(catalog.lookup_plural(None, "one", "many", 1), "one");
        assert_eq!(catalog.lookup_plural(None, "one", "many", 2), "many");
        assert_eq!(catalog.lookup_plural(None, "one", "many", 5), "many");
        assert_eq!(catalog.lookup_plural(None, "x", "xs", 1), "x");
        assert_eq!(catalog.lookup_plural(None, "x", "xs", -1), "xs");
    }

    #[test]
    fn malformed_plural_forms_uses_default_rule() {
        let mut catalog = Catalog::new(CatalogFormat::Po);
        catalog.add_entry(header("Plural-Forms: nplurals=2;\n"));
        catalog.add_entry(plural_entry("apple", "apples", &["Apfel", "Äpfel"]));
        assert_eq!(catalog.plural_rule().total_forms(), 0);
        assert_eq!(catalog.lookup_plural(None, "apple", "apples", 1), "apple");
        assert_eq!(catalog.lookup_plural(None, "apple", "apples", 2), "apples");
    }

    #[test]
    fn header_replacement_recompiles_plural_rule() {
        let mut catalog = Catalog::new(CatalogFormat::Po);
        catalog.add_entry(header("Plural-Forms: nplurals=1; plural=0;\n"));
        assert_eq!(catalog.plural_rule().total_forms(), 1);
        catalog.add_entry(header("Plural-Forms: nplurals=2; plural=n != 1;\n"));
        assert_eq!(catalog.plural_rule().total_forms(), 2);
    }

    #[test]
    fn merge_and_sorting() {
        let mut a = Catalog::new(CatalogFormat::Mo);
        a.add_entry(entry(None, "b", "B"));
        a.add_entry(entry(Some("ctx"), "a", "A1"));
        let mut b = Catalog::new(CatalogFormat::Po);
        b.add_entry(entry(None, "b", "B2"));
        b.add_entry(entry(None, "a", "A"));
        a.merge(&b);

        let ids: Vec<_> = a
            .sorted_entries()
            .iter()
            .map(|e| (e.context.as_deref(), e.id.as_str(), e.text.as_str()))
            .collect();
        assert_eq!(
            ids,
            [(None, "a", "A"), (None, "b", "B2"), (Some("ctx"), "a", "A1")]
        );
    }

    #[test]
    fn catalog_is_send_sync() {
        fn check<T: Send + Sync>(_: &T) {}
        check(&Catalog::new(CatalogFormat::Po));
    }
}
