use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{crate_description, crate_version, value_parser, Arg, ArgAction, ArgMatches, Command};
use tracing_subscriber::EnvFilter;
use xlat::{Catalog, PluralRule, Translator, Value};

fn file_arg() -> Arg {
    Arg::new("FILE")
        .help("Catalog file (.po or .mo)")
        .required(true)
        .value_parser(value_parser!(PathBuf))
}

fn context_arg() -> Arg {
    Arg::new("context")
        .short('c')
        .long("context")
        .value_name("msgctxt")
        .help("Message context")
}

fn args_arg() -> Arg {
    Arg::new("ARGS")
        .help("Format arguments: integers, floats and true/false are typed, anything else is a string")
        .num_args(0..)
        .allow_negative_numbers(true)
        .action(ArgAction::Append)
}

fn cli() -> Command {
    Command::new("xlat")
        .version(crate_version!())
        .about(crate_description!())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("headers")
                .about("Print the header entries of a catalog")
                .arg(file_arg()),
        )
        .subcommand(
            Command::new("entries")
                .about("List the entries of a catalog, sorted by context and id")
                .arg(file_arg()),
        )
        .subcommand(
            Command::new("get")
                .about("Translate and format a message")
                .arg(file_arg())
                .arg(Arg::new("MSGID").required(true))
                .arg(args_arg())
                .arg(context_arg()),
        )
        .subcommand(
            Command::new("nget")
                .about("Translate and format a plural message")
                .arg(file_arg())
                .arg(Arg::new("MSGID").required(true))
                .arg(Arg::new("MSGID_PLURAL").required(true))
                .arg(args_arg())
                .arg(
                    Arg::new("count")
                        .short('n')
                        .long("count")
                        .required(true)
                        .allow_negative_numbers(true)
                        .value_parser(value_parser!(i64))
                        .help("Number selecting the plural form"),
                )
                .arg(context_arg()),
        )
        .subcommand(
            Command::new("plural")
                .about("Print the form index a Plural-Forms header selects for a range of counts")
                .arg(
                    Arg::new("PLURAL_FORMS")
                        .required(true)
                        .help("e.g. \"nplurals=2; plural=(n != 1);\""),
                )
                .arg(
                    Arg::new("from")
                        .long("from")
                        .default_value("0")
                        .allow_negative_numbers(true)
                        .value_parser(value_parser!(i64)),
                )
                .arg(
                    Arg::new("to")
                        .long("to")
                        .default_value("10")
                        .allow_negative_numbers(true)
                        .value_parser(value_parser!(i64)),
                ),
        )
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli().get_matches().subcommand() {
        Some(("headers", m)) => {
            let catalog = load(file(m))?;
            for (key, value) in catalog.headers() {
                println!("{key}: {value}");
            }
        }
        Some(("entries", m)) => {
            let catalog = load(file(m))?;
            for entry in catalog.sorted_entries() {
                if entry.is_header() {
                    continue;
                }
                let context = entry
                    .context
                    .as_deref()
                    .map(|c| format!("[{c}] "))
                    .unwrap_or_default();
                let fuzzy = if entry.is_fuzzy() { " (fuzzy)" } else { "" };
                match &entry.id_plural {
                    Some(plural) => {
                        println!("{context}{:?} / {plural:?}{fuzzy}", entry.id);
                        for (i, form) in entry.text_plural.iter().enumerate() {
                            println!("    [{i}] {form:?}");
                        }
                    }
                    None => println!("{context}{:?} => {:?}{fuzzy}", entry.id, entry.text),
                }
            }
        }
        Some(("get", m)) => {
            let catalog = load(file(m))?;
            let id = string(m, "MSGID");
            println!("{}", catalog.translate(context(m), id, &values(m)));
        }
        Some(("nget", m)) => {
            let catalog = load(file(m))?;
            let n = *m.get_one::<i64>("count").context("missing --count")?;
            println!(
                "{}",
                catalog.ntranslate(
                    context(m),
                    string(m, "MSGID"),
                    string(m, "MSGID_PLURAL"),
                    n,
                    &values(m)
                )
            );
        }
        Some(("plural", m)) => {
            let header = string(m, "PLURAL_FORMS");
            let rule = PluralRule::try_parse(header)
                .with_context(|| format!("cannot compile {header:?}"))?;
            let from = m.get_one::<i64>("from").copied().unwrap_or(0);
            let to = m.get_one::<i64>("to").copied().unwrap_or(10);
            if from > to {
                bail!("--from {from} is greater than --to {to}");
            }
            println!("nplurals = {}", rule.total_forms());
            for n in from..=to {
                match rule.select(n) {
                    Some(index) => println!("{n}: {index}"),
                    None => println!("{n}: out of range"),
                }
            }
        }
        _ => unreachable!("subcommand_required"),
    }
    Ok(())
}

fn file(m: &ArgMatches) -> &Path {
    m.get_one::<PathBuf>("FILE")
        .map(PathBuf::as_path)
        .unwrap_or_else(|| Path::new(""))
}

fn string<'a>(m: &'a ArgMatches, id: &str) -> &'a str {
    m.get_one::<String>(id).map(String::as_str).unwrap_or("")
}

fn context(m: &ArgMatches) -> Option<&str> {
    m.get_one::<String>("context").map(String::as_str)
}

fn values(m: &ArgMatches) -> Vec<Value> {
    m.get_many::<String>("ARGS")
        .into_iter()
        .flatten()
        .map(|s| parse_value(s))
        .collect()
}

/// Types a command line argument: integer, then float, then boolean, else
/// string.
fn parse_value(s: &str) -> Value {
    if let Ok(i) = s.parse::<i64>() {
        Value::Int(i)
    } else if let Ok(f) = s.parse::<f64>() {
        Value::Float(f)
    } else if let Ok(b) = s.parse::<bool>() {
        Value::Bool(b)
    } else {
        Value::from(s)
    }
}

fn load(path: &Path) -> Result<Arc<Catalog>> {
    let translator = Translator::from_path(path)
        .with_context(|| format!("cannot load catalog {}", path.display()))?;
    match translator {
        Translator::Catalog(catalog) => Ok(catalog),
        Translator::Noop => bail!("{} holds no catalog", path.display()),
    }
}
