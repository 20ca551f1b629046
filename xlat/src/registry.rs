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

//! Catalogs grouped by text domain and language, and the gettext-style
//! entry points that resolve against the current domain and locale.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::catalog::CatalogFormat;
use crate::error::Result;
use crate::locale;
use crate::translator::Translator;
use crate::value::Value;

/// Domain used until [`Translations::set_domain`] picks another.
pub const DEFAULT_DOMAIN: &str = "default";
/// Language the message ids in the source code are written in.
pub const DEFAULT_SOURCE_CODE_LOCALE: &str = "en_US";

static NOOP: Translator = Translator::Noop;

/// The translators of one text domain, keyed by normalized language.
#[derive(Clone, Debug, Default)]
pub struct Domain {
    name: String,
    langs: HashMap<String, Translator>,
}

impl Domain {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            langs: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers `translator` under its language and returns the translator
    /// it replaced. A translator without a language is ignored.
    pub fn add_or_replace(&mut self, translator: Translator) -> Option<Translator> {
        let lang = locale::normalize(translator.lang());
        if lang.is_empty() {
            tracing::debug!(domain = %self.name, "ignoring translator without a language");
            return None;
        }
        self.langs.insert(lang, translator)
    }

    pub fn get(&self, lang: &str) -> Option<&Translator> {
        self.langs.get(&locale::normalize(lang))
    }

    /// The translator for `lang`, or [`Translator::Noop`].
    pub fn get_or_noop(&self, lang: &str) -> &Translator {
        self.get(lang).unwrap_or(&NOOP)
    }

    /// The languages with a translator, sorted.
    pub fn languages(&self) -> Vec<&str> {
        let mut langs: Vec<&str> = self.langs.keys().map(String::as_str).collect();
        langs.sort_unstable();
        langs
    }

    pub fn load_bytes(&mut self, format: CatalogFormat, bytes: &[u8]) -> Result<()> {
        let translator = match format {
            #[cfg(feature = "po")]
            CatalogFormat::Po => Translator::from_po_bytes(bytes)?,
            #[cfg(feature = "mo")]
            CatalogFormat::Mo => Translator::from_mo_bytes(bytes)?,
            #[allow(unreachable_patterns)]
            other => {
                return Err(crate::error::CatalogError::UnknownExtension(format!(
                    "{other:?}"
                )))
            }
        };
        self.add_or_replace(translator);
        Ok(())
    }

    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let translator = Translator::from_path(path)?;
        tracing::debug!(
            domain = %self.name,
            path = %path.display(),
            lang = translator.lang(),
            "loaded catalog"
        );
        self.add_or_replace(translator);
        Ok(())
    }

    /// Loads every catalog below `dir`: all `.mo` files first, then all `.po`
    /// files, so a text catalog overrides a binary one for the same language.
    ///
    /// Files that cannot be read or decoded are logged and skipped. Returns
    /// whether at least one catalog was loaded.
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> bool {
        let mut files = Vec::new();
        collect_files(dir.as_ref(), &mut files);
        files.sort();

        let mut loaded = false;
        for extension in ["mo", "po"] {
            for path in files
                .iter()
                .filter(|p| p.extension().is_some_and(|e| e == extension))
            {
                match self.load_file(path) {
                    Ok(()) => loaded = true,
                    Err(error) => tracing::warn!(
                        domain = %self.name,
                        path = %path.display(),
                        %error,
                        "skipping catalog"
                    ),
                }
            }
        }
        loaded
    }
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(error) => {
            tracing::warn!(path = %dir.display(), %error, "cannot read catalog directory");
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        match entry.file_type() {
            Ok(t) if t.is_dir() => collect_files(&path, files),
            Ok(_) => files.push(path),
            Err(_) => {}
        }
    }
}

/// Text domains plus the current domain and locale.
///
/// Cloning is cheap: domains are shared. [`with_domain`](Self::with_domain)
/// and [`with_locale`](Self::with_locale) derive a view that resolves
/// differently without touching the original.
#[derive(Clone, Debug)]
pub struct Translations {
    locale: String,
    domain: String,
    domains: HashMap<String, Arc<Domain>>,
    source_code_locale: String,
}

impl Default for Translations {
    fn default() -> Self {
        Self::new()
    }
}

impl Translations {
    /// An empty registry using the environment's locale.
    pub fn new() -> Self {
        Self {
            locale: locale::default_locale(),
            domain: DEFAULT_DOMAIN.to_owned(),
            domains: HashMap::new(),
            source_code_locale: DEFAULT_SOURCE_CODE_LOCALE.to_owned(),
        }
    }

    /// Loads the catalogs below `dir` into `domain`. The domain is only
    /// registered (replacing any previous one) if something loaded.
    pub fn bind_dir(&mut self, domain: &str, dir: impl AsRef<Path>) -> bool {
        let mut d = Domain::new(domain);
        if !d.load_dir(dir) {
            tracing::warn!(domain, "no catalogs loaded; domain not bound");
            return false;
        }
        self.bind(d);
        true
    }

    /// Registers `domain` under its name, replacing any previous one.
    pub fn bind(&mut self, domain: Domain) {
        tracing::debug!(domain = domain.name(), langs = ?domain.languages(), "binding domain");
        self.domains.insert(domain.name.clone(), Arc::new(domain));
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn set_domain(&mut self, domain: impl Into<String>) {
        self.domain = domain.into();
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Sets the current locale, normalized. `""` means the environment's.
    pub fn set_locale(&mut self, lang: &str) {
        self.locale = if lang.is_empty() {
            locale::default_locale()
        } else {
            locale::normalize(lang)
        };
        tracing::debug!(locale = %self.locale, "locale set");
    }

    pub fn source_code_locale(&self) -> &str {
        &self.source_code_locale
    }

    pub fn set_source_code_locale(&mut self, lang: &str) {
        self.source_code_locale = locale::normalize(lang);
    }

    pub fn with_domain(&self, domain: impl Into<String>) -> Self {
        let mut result = self.clone();
        result.set_domain(domain);
        result
    }

    pub fn with_locale(&self, lang: &str) -> Self {
        let mut result = self.clone();
        result.set_locale(lang);
        result
    }

    pub fn get(&self, domain: &str) -> Option<&Domain> {
        self.domains.get(domain).map(Arc::as_ref)
    }

    pub fn has_domain(&self, domain: &str) -> bool {
        self.domains.contains_key(domain)
    }

    /// Bound domain names, sorted.
    pub fn domains(&self) -> Vec<&str> {
        let mut domains: Vec<&str> = self.domains.keys().map(String::as_str).collect();
        domains.sort_unstable();
        domains
    }

    /// Languages available in the current domain plus the source-code
    /// locale, sorted and deduplicated.
    pub fn locales(&self) -> Vec<String> {
        let mut locales = BTreeSet::new();
        locales.insert(self.source_code_locale.clone());
        if let Some(domain) = self.get(&self.domain) {
            locales.extend(domain.languages().into_iter().map(str::to_owned));
        }
        locales.into_iter().collect()
    }

    /// The locale messages actually resolve in: the current locale if the
    /// current domain has a translator for it, else the source-code locale.
    pub fn used_locale(&self) -> &str {
        match self.get(&self.domain).and_then(|d| d.get(&self.locale)) {
            Some(_) => &self.locale,
            None => &self.source_code_locale,
        }
    }

    /// The translator for the current domain and locale.
    pub fn translator(&self) -> &Translator {
        self.get(&self.domain)
            .map_or(&NOOP, |d| d.get_or_noop(&self.locale))
    }

    /// `gettext`
    pub fn t(&self, id: &str, args: &[Value]) -> String {
        self.translator().translate(None, id, args)
    }

    /// `ngettext`
    pub fn n(&self, id: &str, id_plural: &str, n: i64, args: &[Value]) -> String {
        self.translator().ntranslate(None, id, id_plural, n, args)
    }

    /// `pgettext`
    pub fn x(&self, context: &str, id: &str, args: &[Value]) -> String {
        self.translator().translate(Some(context), id, args)
    }

    /// `npgettext`
    pub fn xn(&self, context: &str, id: &str, id_plural: &str, n: i64, args: &[Value]) -> String {
        self.translator()
            .ntranslate(Some(context), id, id_plural, n, args)
    }
}
