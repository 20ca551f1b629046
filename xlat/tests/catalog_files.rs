use std::collections::HashSet;

use xlat::{args, parse_headers, Catalog, CatalogError, CatalogFormat, Entry, Translator};

const PO: &str = r#"# Brazilian Portuguese test catalog
msgid ""
msgstr ""
"Project-Id-Version: xlat-tests 1.0\n"
"Content-Type: text/plain; charset=UTF-8\n"
"Language: pt_BR\n"
"Plural-Forms: nplurals=2; plural=(n > 1);\n"

#: src/main.rs:3
msgid "Open"
msgstr "Abrir"

msgctxt "verb"
msgid "File"
msgstr "Arquivar"

msgctxt "noun"
msgid "File"
msgstr "Arquivo"

#, c-format
msgid "%d file in %s"
msgid_plural "%d files in %s"
msgstr[0] "%d arquivo em %s"
msgstr[1] "%d arquivos em %s"

#, fuzzy
msgid "Tab\tseparated"
msgstr "Separado\tpor\ttab"

msgid ""
"Long message "
"on two lines"
msgstr ""
"Mensagem longa "
"em duas linhas"

msgid "Untranslated"
msgstr ""
"#;

/// Writes a `.mo` file holding every entry of `catalog`.
fn to_mo(catalog: &Catalog) -> Vec<u8> {
    let pairs: Vec<(String, String)> = catalog
        .sorted_entries()
        .into_iter()
        .map(|entry| {
            let mut original = String::new();
            if let Some(context) = &entry.context {
                original.push_str(context);
                original.push('\x04');
            }
            original.push_str(&entry.id);
            let translated = match &entry.id_plural {
                Some(plural) => {
                    original.push('\0');
                    original.push_str(plural);
                    entry.text_plural.join("\0")
                }
                None => entry.text.clone(),
            };
            (original, translated)
        })
        .collect();

    let n = pairs.len();
    let originals = 28;
    let translations = originals + n * 8;
    let mut offset = translations + n * 8;
    let (mut table_o, mut table_t, mut data) = (Vec::new(), Vec::new(), Vec::new());
    for (original, translated) in &pairs {
        for (s, table) in [(original, &mut table_o), (translated, &mut table_t)] {
            table.extend_from_slice(&(s.len() as u32).to_le_bytes());
            table.extend_from_slice(&(offset as u32).to_le_bytes());
            data.extend_from_slice(s.as_bytes());
            data.push(0);
            offset += s.len() + 1;
        }
    }
    let mut out = Vec::new();
    for word in [0x9504_12de, 0, n, originals, translations, 0, 0] {
        out.extend_from_slice(&(word as u32).to_le_bytes());
    }
    out.extend(table_o);
    out.extend(table_t);
    out.extend(data);
    out
}

fn without_flags(entries: Vec<&Entry>) -> Vec<Entry> {
    entries
        .into_iter()
        .map(|e| Entry {
            flags: Vec::new(),
            ..e.clone()
        })
        .collect()
}

#[test]
fn po_file() {
    let catalog = Catalog::from_po(PO.as_bytes()).unwrap();
    assert_eq!(catalog.format(), CatalogFormat::Po);
    assert_eq!(catalog.len(), 8);
    assert_eq!(catalog.language(), "pt_BR");
    assert_eq!(catalog.plural_forms(), "nplurals=2; plural=(n > 1);");
    assert_eq!(catalog.plural_rule().total_forms(), 2);

    assert_eq!(catalog.lookup(None, "Open"), "Abrir");
    assert_eq!(catalog.lookup(Some("verb"), "File"), "Arquivar");
    assert_eq!(catalog.lookup(Some("noun"), "File"), "Arquivo");
    assert_eq!(catalog.lookup(None, "File"), "File");
    assert_eq!(catalog.lookup(None, "Tab\tseparated"), "Separado\tpor\ttab");
    assert!(catalog.get(None, "Tab\tseparated").unwrap().is_fuzzy());
    assert_eq!(
        catalog.lookup(None, "Long message on two lines"),
        "Mensagem longa em duas linhas"
    );
    assert_eq!(catalog.lookup(None, "Untranslated"), "Untranslated");

    let plural = |n: i64| {
        catalog.ntranslate(None, "%d file in %s", "%d files in %s", n, &args![n, "/tmp"])
    };
    assert_eq!(plural(0), "0 arquivo em /tmp");
    assert_eq!(plural(1), "1 arquivo em /tmp");
    assert_eq!(plural(2), "2 arquivos em /tmp");
}

#[test]
fn header_round_trip() {
    let catalog = Catalog::from_po(PO.as_bytes()).unwrap();
    let serialized: String = catalog
        .headers()
        .iter()
        .map(|(key, value)| format!("{key}: {value}\n"))
        .collect();
    let reparsed = parse_headers(&serialized);
    assert_eq!(&reparsed, catalog.headers());
    assert_eq!(reparsed["Language"], "pt_BR");
    assert_eq!(reparsed["Plural-Forms"], "nplurals=2; plural=(n > 1);");
}

#[test]
fn po_matches_rspolib() {
    let catalog = Catalog::from_po(PO.as_bytes()).unwrap();
    let reference =
        rspolib::pofile(rspolib::FileOptions::from(PO)).unwrap();

    assert_eq!(
        reference.metadata.get("Language").map(String::as_str),
        Some(catalog.language())
    );
    assert_eq!(
        reference.metadata.get("Plural-Forms").map(String::as_str),
        Some(catalog.plural_forms())
    );

    let mut seen = HashSet::new();
    for expected in reference.entries.iter().filter(|e| !e.msgid.is_empty()) {
        let entry = catalog
            .get(expected.msgctxt.as_deref(), &expected.msgid)
            .unwrap_or_else(|| panic!("missing {:?}", expected.msgid));
        assert_eq!(entry.id_plural, expected.msgid_plural);
        if entry.id_plural.is_some() {
            assert_eq!(entry.text_plural, expected.msgstr_plural);
        } else {
            assert_eq!(entry.text, expected.msgstr.clone().unwrap_or_default());
        }
        seen.insert((expected.msgctxt.clone(), expected.msgid.clone()));
    }
    assert_eq!(seen.len(), catalog.len() - 1);
}

#[test]
fn po_and_mo_agree() {
    let po = Catalog::from_po(PO.as_bytes()).unwrap();
    let mo = Catalog::from_mo(&to_mo(&po)).unwrap();
    assert_eq!(mo.format(), CatalogFormat::Mo);
    assert_eq!(mo.headers(), po.headers());
    assert_eq!(
        without_flags(mo.sorted_entries()),
        without_flags(po.sorted_entries())
    );
}

#[test]
fn mo_matches_gettext() {
    let po = Catalog::from_po(PO.as_bytes()).unwrap();
    let bytes = to_mo(&po);
    let ours = Catalog::from_mo(&bytes).unwrap();
    let reference = gettext::Catalog::parse(&bytes[..]).unwrap();

    for id in ["Open", "Tab\tseparated", "Long message on two lines", "Missing"] {
        assert_eq!(ours.lookup(None, id), reference.gettext(id), "{id:?}");
    }
    for context in ["verb", "noun", "other"] {
        assert_eq!(
            ours.lookup(Some(context), "File"),
            reference.pgettext(context, "File"),
            "{context:?}"
        );
    }
}

#[test]
fn truncated_mo_is_an_error() {
    let po = Catalog::from_po(PO.as_bytes()).unwrap();
    let bytes = to_mo(&po);
    // The final NUL terminator is not part of any string.
    for len in 0..bytes.len() - 1 {
        assert!(
            Catalog::from_mo(&bytes[..len]).is_err(),
            "prefix of {len} bytes decoded"
        );
    }
    assert!(Catalog::from_mo(&bytes[..bytes.len() - 1]).is_ok());
}

#[test]
fn mo_errors() {
    assert!(matches!(
        Catalog::from_mo(PO.as_bytes()),
        Err(CatalogError::BadMagic(_))
    ));
    assert!(matches!(
        Catalog::from_mo(&[]),
        Err(CatalogError::Truncated { .. })
    ));
}

#[test]
fn translator_from_path() {
    let po = Catalog::from_po(PO.as_bytes()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let po_path = dir.path().join("pt_BR.po");
    let mo_path = dir.path().join("pt_BR.mo");
    std::fs::write(&po_path, PO).unwrap();
    std::fs::write(&mo_path, to_mo(&po)).unwrap();

    for path in [po_path, mo_path] {
        let translator = Translator::from_path(&path).unwrap();
        assert_eq!(translator.lang(), "pt_BR");
        assert_eq!(translator.translate(Some("noun"), "File", &[]), "Arquivo");
    }

    let bad = dir.path().join("pt_BR.json");
    std::fs::write(&bad, "{}").unwrap();
    assert!(matches!(
        Translator::from_path(&bad),
        Err(CatalogError::UnknownExtension(_))
    ));
}

#[test]
fn oversized_plural_header_falls_back() {
    for rule in ["-".repeat(500_000) + "n", vec!["n"; 30_000].join("+")] {
        let po = format!(
            "msgid \"\"\nmsgstr \"Plural-Forms: nplurals=2; plural={rule};\\n\"\n\n\
             msgid \"a\"\nmsgid_plural \"as\"\nmsgstr[0] \"x\"\nmsgstr[1] \"xs\"\n"
        );
        let catalog = Catalog::from_po(po.as_bytes()).unwrap();
        assert_eq!(catalog.plural_rule().total_forms(), 0);
        assert_eq!(catalog.lookup_plural(None, "a", "as", 2), "as");
        assert_eq!(catalog.lookup_plural(None, "a", "as", 1), "a");
    }
}
