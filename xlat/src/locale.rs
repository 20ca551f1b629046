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

//! Locale tag handling.

/// Locale used when the environment names none.
pub const FALLBACK_LOCALE: &str = "en_US";

const LOCALE_VARIABLES: [&str; 3] = ["LC_ALL", "LC_MESSAGES", "LANG"];

/// Canonicalizes a locale tag to `ll_RR` form.
///
/// `-` becomes `_`, the language is lowercased, a four-letter script is
/// title-cased, other subtags are uppercased, and any encoding (`.UTF-8`) or
/// modifier (`@euro`) suffix is dropped.
///
/// ```
/// assert_eq!(xlat::locale::normalize("pt-br"), "pt_BR");
/// assert_eq!(xlat::locale::normalize("de_DE.UTF-8@euro"), "de_DE");
/// assert_eq!(xlat::locale::normalize("zh-hant-tw"), "zh_Hant_TW");
/// ```
pub fn normalize(tag: &str) -> String {
    let tag = tag.split(['.', '@']).next().unwrap_or("").trim();
    let mut out = String::with_capacity(tag.len());
    for (i, part) in tag.split(['-', '_']).filter(|p| !p.is_empty()).enumerate() {
        if i == 0 {
            out.push_str(&part.to_ascii_lowercase());
            continue;
        }
        out.push('_');
        if part.len() == 4 && part.chars().all(|c| c.is_ascii_alphabetic()) {
            let (first, rest) = part.split_at(1);
            out.push_str(&first.to_ascii_uppercase());
            out.push_str(&rest.to_ascii_lowercase());
        } else {
            out.push_str(&part.to_ascii_uppercase());
        }
    }
    out
}

/// The locale named by `LC_ALL`, `LC_MESSAGES` or `LANG`, in that order,
/// normalized. `C` and `POSIX` count as unset. Falls back to
/// [`FALLBACK_LOCALE`].
pub fn default_locale() -> String {
    default_locale_from(|name| std::env::var(name).ok())
}

fn default_locale_from(var: impl Fn(&str) -> Option<String>) -> String {
    LOCALE_VARIABLES
        .into_iter()
        .filter_map(var)
        .map(|value| normalize(&value))
        .find(|locale| !locale.is_empty() && locale != "c" && locale != "posix")
        .unwrap_or_else(|| FALLBACK_LOCALE.to_owned())
}
