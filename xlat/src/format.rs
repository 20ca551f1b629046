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

//! printf-style runtime formatter.
//!
//! Templates use the `%[flags][[k]][width][.prec][[k]]verb` grammar. Verbs
//! consume arguments through an implicit cursor; `%[k]` moves the cursor to
//! the 1-based argument `k`.
//!
//! Two rules differ from a strict printf, because translated templates often
//! drop or reorder placeholders:
//!
//! * with no arguments at all, the template is returned verbatim;
//! * a verb whose argument is missing formats an empty string instead, and
//!   arguments that no verb references are dropped without a diagnostic.
//!
//! A verb that does not apply to its argument renders an inline annotation
//! `%!verb(type=value)` rather than failing.

use std::fmt::{self, Write};

use crate::value::Value;

/// Renders `template` against `args`.
///
/// Never fails: mismatches are reported inline in the returned string.
pub fn format(template: &str, args: &[Value]) -> String {
    if args.is_empty() {
        return template.to_owned();
    }
    FormatArg {
        format_str: template,
        args,
    }
    .to_string()
}

/// A template bound to its arguments. Implements `Display`.
pub struct FormatArg<'a> {
    pub format_str: &'a str,
    pub args: &'a [Value],
}

impl fmt::Display for FormatArg<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            return f.write_str(self.format_str);
        }
        self.render(f)
    }
}

#[derive(Clone, Copy, Default, Debug)]
struct Spec {
    plus: bool,
    minus: bool,
    sharp: bool,
    space: bool,
    zero: bool,
    width: Option<usize>,
    precision: Option<usize>,
}

// Widths and precisions read from arguments above this are rejected.
const MAX_STAR: i64 = 1_000_000;

impl FormatArg<'_> {
    fn render<W: Write>(&self, out: &mut W) -> fmt::Result {
        let s = self.format_str;
        let bytes = s.as_bytes();
        let end = s.len();
        let mut i = 0;
        let mut arg_num = 0usize;

        while i < end {
            let lit_end = s[i..].find('%').map_or(end, |p| i + p);
            out.write_str(&s[i..lit_end])?;
            i = lit_end;
            if i >= end {
                break;
            }
            i += 1;

            let mut spec = Spec::default();
            let mut good_arg_num = true;
            while i < end {
                match bytes[i] {
                    b'#' => spec.sharp = true,
                    b'0' => spec.zero = !spec.minus,
                    b'+' => spec.plus = true,
                    b'-' => {
                        spec.minus = true;
                        spec.zero = false;
                    }
                    b' ' => spec.space = true,
                    _ => break,
                }
                i += 1;
            }

            let (n, next, mut after_index, ok) = arg_number(arg_num, s, i);
            arg_num = n;
            i = next;
            good_arg_num &= ok;

            if i < end && bytes[i] == b'*' {
                i += 1;
                let (w, n) = self.int_from_arg(arg_num);
                arg_num = n;
                match w {
                    Some(w) if w < 0 => {
                        spec.minus = true;
                        spec.zero = false;
                        spec.width = Some(w.unsigned_abs() as usize);
                    }
                    Some(w) => spec.width = Some(w as usize),
                    None => out.write_str("%!(BADWIDTH)")?,
                }
                after_index = false;
            } else {
                let (w, next) = parse_num(s, i);
                spec.width = w;
                i = next;
                if after_index && w.is_some() {
                    good_arg_num = false;
                }
            }

            if i < end && bytes[i] == b'.' {
                i += 1;
                if after_index {
                    good_arg_num = false;
                }
                let (n, next, found, ok) = arg_number(arg_num, s, i);
                arg_num = n;
                i = next;
                after_index = found;
                good_arg_num &= ok;
                if i < end && bytes[i] == b'*' {
                    i += 1;
                    let (p, n) = self.int_from_arg(arg_num);
                    arg_num = n;
                    match p {
                        Some(p) if p >= 0 => spec.precision = Some(p as usize),
                        Some(_) => spec.precision = None,
                        None => out.write_str("%!(BADPREC)")?,
                    }
                    after_index = false;
                } else {
                    let (p, next) = parse_num(s, i);
                    spec.precision = Some(p.unwrap_or(0));
                    i = next;
                }
            }

            if !after_index {
                let (n, next, _, ok) = arg_number(arg_num, s, i);
                arg_num = n;
                i = next;
                good_arg_num &= ok;
            }

            let Some(verb) = s[i..].chars().next() else {
                out.write_str("%!(NOVERB)")?;
                break;
            };
            i += verb.len_utf8();

            if verb == '%' {
                out.write_char('%')?;
            } else if !good_arg_num {
                write!(out, "%!{verb}(BADINDEX)")?;
            } else {
                let missing = Value::default();
                let arg = self.args.get(arg_num).unwrap_or(&missing);
                arg_num += 1;
                out.write_str(&print_arg(arg, verb, &spec))?;
            }
        }
        Ok(())
    }

    fn int_from_arg(&self, arg_num: usize) -> (Option<i64>, usize) {
        match self.args.get(arg_num) {
            Some(v) => {
                let n = v.as_int().filter(|n| (-MAX_STAR..=MAX_STAR).contains(n));
                (n, arg_num + 1)
            }
            None => (None, arg_num),
        }
    }
}

/// Parses an optional `[k]` at `i`.
///
/// Returns the new cursor, the new position, whether a bracket was present,
/// and whether the index inside it was usable.
fn arg_number(arg_num: usize, s: &str, i: usize) -> (usize, usize, bool, bool) {
    let bytes = s.as_bytes();
    if i >= bytes.len() || bytes[i] != b'[' {
        return (arg_num, i, false, true);
    }
    let Some(close) = s[i + 1..].find(']').map(|p| i + 1 + p) else {
        return (arg_num, i + 1, true, false);
    };
    let digits = &s[i + 1..close];
    let index = if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        digits.parse::<usize>().ok().filter(|&k| k >= 1)
    } else {
        None
    };
    match index {
        Some(k) => (k - 1, close + 1, true, true),
        None => (arg_num, close + 1, true, false),
    }
}

fn parse_num(s: &str, i: usize) -> (Option<usize>, usize) {
    let digits = s[i..].bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return (None, i);
    }
    // Absurd widths saturate instead of overflowing.
    let n = s[i..i + digits].parse::<usize>().unwrap_or(usize::MAX).min(MAX_STAR as usize);
    (Some(n), i + digits)
}

fn print_arg(arg: &Value, verb: char, spec: &Spec) -> String {
    if verb == 'T' {
        return pad(arg.type_name(), spec, false);
    }
    let rendered = match arg {
        Value::Bool(b) => match verb {
            't' | 'v' => Some(pad(if *b { "true" } else { "false" }, spec, false)),
            _ => None,
        },
        Value::Int(i) => fmt_integer(*i < 0, i.unsigned_abs(), verb, spec),
        Value::Uint(u) => fmt_integer(false, *u, verb, spec),
        Value::Char(c) => fmt_integer(false, *c as u64, verb, spec),
        Value::Float(x) => fmt_float(*x, verb, spec),
        Value::Str(s) => fmt_str(s, verb, spec),
    };
    rendered.unwrap_or_else(|| bad_verb(arg, verb, spec))
}

fn bad_verb(arg: &Value, verb: char, spec: &Spec) -> String {
    format!("%!{verb}({}={})", arg.type_name(), print_arg(arg, 'v', spec))
}

/// Pads `s` to the spec width, counting characters rather than bytes.
fn pad(s: &str, spec: &Spec, numeric: bool) -> String {
    let len = s.chars().count();
    let Some(width) = spec.width.filter(|&w| w > len) else {
        return s.to_owned();
    };
    let fill = width - len;
    if spec.minus {
        let mut r = String::with_capacity(s.len() + fill);
        r.push_str(s);
        r.extend(std::iter::repeat(' ').take(fill));
        return r;
    }
    if spec.zero && numeric {
        // Zeros go between the sign and the digits.
        let (sign, rest) = match s.as_bytes().first() {
            Some(b'+' | b'-' | b' ') => s.split_at(1),
            _ => ("", s),
        };
        return format!("{sign}{}{rest}", "0".repeat(fill));
    }
    let c = if spec.zero { '0' } else { ' ' };
    let mut r: String = std::iter::repeat(c).take(fill).collect();
    r.push_str(s);
    r
}

fn sign_prefix(negative: bool, spec: &Spec) -> &'static str {
    if negative {
        "-"
    } else if spec.plus {
        "+"
    } else if spec.space {
        " "
    } else {
        ""
    }
}

fn fmt_integer(negative: bool, magnitude: u64, verb: char, spec: &Spec) -> Option<String> {
    let (base, upper) = match verb {
        'v' | 'd' => (10, false),
        'b' => (2, false),
        'o' | 'O' => (8, false),
        'x' => (16, false),
        'X' => (16, true),
        'c' => return Some(pad(&to_char(magnitude, negative).to_string(), spec, false)),
        'q' => return Some(pad(&quote_char(to_char(magnitude, negative)), spec, false)),
        'U' => return Some(pad(&fmt_unicode(magnitude, negative, spec), spec, false)),
        _ => return None,
    };
    let mut digits = match base {
        2 => format!("{magnitude:b}"),
        8 => format!("{magnitude:o}"),
        16 if upper => format!("{magnitude:X}"),
        16 => format!("{magnitude:x}"),
        _ => magnitude.to_string(),
    };
    let sign = sign_prefix(negative, spec);
    match spec.precision {
        Some(0) if magnitude == 0 => digits.clear(),
        Some(p) if p > digits.len() => digits.insert_str(0, &"0".repeat(p - digits.len())),
        Some(_) => {}
        None => {
            if let (true, false, Some(w)) = (spec.zero, spec.minus, spec.width) {
                let target = w.saturating_sub(sign.len());
                if target > digits.len() {
                    digits.insert_str(0, &"0".repeat(target - digits.len()));
                }
            }
        }
    }
    let prefix = match (base, spec.sharp, verb) {
        (8, _, 'O') => "0o",
        (8, true, _) if !digits.starts_with('0') => "0",
        (16, true, _) if upper => "0X",
        (16, true, _) => "0x",
        (2, true, _) => "0b",
        _ => "",
    };
    let s = format!("{sign}{prefix}{digits}");
    Some(pad(&s, &Spec { zero: false, ..*spec }, false))
}

fn to_char(magnitude: u64, negative: bool) -> char {
    if negative {
        return char::REPLACEMENT_CHARACTER;
    }
    u32::try_from(magnitude)
        .ok()
        .and_then(char::from_u32)
        .unwrap_or(char::REPLACEMENT_CHARACTER)
}

fn fmt_unicode(magnitude: u64, negative: bool, spec: &Spec) -> String {
    let digits = spec.precision.unwrap_or(4);
    let mut s = if negative {
        format!("U+-{magnitude:0digits$X}")
    } else {
        format!("U+{magnitude:0digits$X}")
    };
    if spec.sharp {
        if let Some(c) = u32::try_from(magnitude).ok().and_then(char::from_u32) {
            if !negative && !c.is_control() {
                s.push_str(&format!(" '{c}'"));
            }
        }
    }
    s
}

fn fmt_float(x: f64, verb: char, spec: &Spec) -> Option<String> {
    let body = match verb {
        'v' => float_g(x, None, false),
        'g' | 'G' => float_g(x, spec.precision, verb == 'G'),
        'e' | 'E' => float_e(x, Some(spec.precision.unwrap_or(6)), verb == 'E'),
        'f' | 'F' => format!("{:.*}", spec.precision.unwrap_or(6), x.abs()),
        _ => return None,
    };
    if x.is_nan() {
        let s = if spec.plus { "+NaN" } else if spec.space { " NaN" } else { "NaN" };
        return Some(pad(s, &Spec { zero: false, ..*spec }, false));
    }
    if x.is_infinite() {
        let s = if x < 0.0 { "-Inf" } else if spec.space && !spec.plus { " Inf" } else { "+Inf" };
        return Some(pad(s, &Spec { zero: false, ..*spec }, false));
    }
    let s = format!("{}{body}", sign_prefix(x.is_sign_negative(), spec));
    Some(pad(&s, spec, true))
}

/// Splits Rust's `{:e}` output into mantissa and exponent.
fn split_exp(s: &str) -> (&str, i32) {
    match s.split_once('e') {
        Some((m, e)) => (m, e.parse().unwrap_or(0)),
        None => (s, 0),
    }
}

fn join_exp(mantissa: &str, exp: i32, upper: bool) -> String {
    let e = if upper { 'E' } else { 'e' };
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{mantissa}{e}{sign}{:02}", exp.unsigned_abs())
}

/// `%e` on the magnitude; `None` precision means shortest representation.
fn float_e(x: f64, precision: Option<usize>, upper: bool) -> String {
    let x = x.abs();
    let raw = match precision {
        Some(p) => format!("{x:.p$e}"),
        None => format!("{x:e}"),
    };
    let (mantissa, exp) = split_exp(&raw);
    join_exp(mantissa, exp, upper)
}

/// `%g` on the magnitude, trailing zeros removed.
fn float_g(x: f64, precision: Option<usize>, upper: bool) -> String {
    let x = x.abs();
    let (raw, shortest) = match precision {
        Some(p) => (format!("{:.*e}", p.max(1) - 1, x), false),
        None => (format!("{x:e}"), true),
    };
    let (mantissa, exp) = split_exp(&raw);
    let mantissa = if mantissa.contains('.') {
        mantissa.trim_end_matches('0').trim_end_matches('.')
    } else {
        mantissa
    };
    let nd = mantissa.bytes().filter(u8::is_ascii_digit).count() as i32;
    let dp = exp + 1;
    let eprec = if shortest {
        6
    } else {
        let p = precision.unwrap_or(6).max(1) as i32;
        if p > nd && nd >= dp {
            nd
        } else {
            p
        }
    };
    if exp < -4 || exp >= eprec {
        return join_exp(mantissa, exp, upper);
    }
    let decimals = (nd - dp).max(0) as usize;
    format!("{x:.decimals$}")
}

fn fmt_str(s: &str, verb: char, spec: &Spec) -> Option<String> {
    let truncated = |s: &str| match spec.precision {
        Some(p) => s.chars().take(p).collect::<String>(),
        None => s.to_owned(),
    };
    match verb {
        'v' | 's' => Some(pad(&truncated(s), spec, false)),
        'q' => Some(pad(&quote_str(&truncated(s)), spec, false)),
        'x' | 'X' => {
            let b = match spec.precision {
                Some(p) => &s.as_bytes()[..p.min(s.len())],
                None => s.as_bytes(),
            };
            Some(pad(&hex_bytes(b, verb == 'X', spec), spec, false))
        }
        _ => None,
    }
}

fn hex_bytes(bytes: &[u8], upper: bool, spec: &Spec) -> String {
    let mut r = String::with_capacity(bytes.len() * 2);
    let prefix = if upper { "0X" } else { "0x" };
    for (i, b) in bytes.iter().enumerate() {
        if spec.space && i > 0 {
            r.push(' ');
        }
        if spec.sharp && (spec.space || i == 0) {
            r.push_str(prefix);
        }
        if upper {
            let _ = write!(r, "{b:02X}");
        } else {
            let _ = write!(r, "{b:02x}");
        }
    }
    r
}

fn push_escaped(r: &mut String, c: char, quote: char) {
    match c {
        '\u{7}' => r.push_str("\\a"),
        '\u{8}' => r.push_str("\\b"),
        '\u{c}' => r.push_str("\\f"),
        '\n' => r.push_str("\\n"),
        '\r' => r.push_str("\\r"),
        '\t' => r.push_str("\\t"),
        '\u{b}' => r.push_str("\\v"),
        '\\' => r.push_str("\\\\"),
        c if c == quote => {
            r.push('\\');
            r.push(c);
        }
        c if (c as u32) < 0x80 && c.is_control() => {
            let _ = write!(r, "\\x{:02x}", c as u32);
        }
        c if c.is_control() => {
            if (c as u32) < 0x10000 {
                let _ = write!(r, "\\u{:04x}", c as u32);
            } else {
                let _ = write!(r, "\\U{:08x}", c as u32);
            }
        }
        c => r.push(c),
    }
}

fn quote_str(s: &str) -> String {
    let mut r = String::with_capacity(s.len() + 2);
    r.push('"');
    for c in s.chars() {
        push_escaped(&mut r, c, '"');
    }
    r.push('"');
    r
}

fn quote_char(c: char) -> String {
    let mut r = String::from("'");
    push_escaped(&mut r, c, '\'');
    r.push('\'');
    r
}
