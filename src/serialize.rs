//! Lua table writer with a stable key order.
//!
//! Output is indented with tabs, one nesting level per tab. Keys are ordered
//! by [`rank::compare_keys`]; tables whose keys are exactly `1..=n` are
//! written as positional lists. Writing fails on the first key or value that
//! has no Lua literal form, so a document is either written whole or not at
//! all.

use crate::error::SerializeError;
use crate::parse;
use crate::rank;
use crate::value::{Key, Table, Value};
use regex::Regex;
use std::cmp::Ordering;
use std::sync::LazyLock;

type Result<T> = std::result::Result<T, SerializeError>;

/// Key comparator used to order entries within one table.
pub type KeyCompare = fn(&Key, &Key) -> Ordering;

static RE_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

const LUA_KEYWORDS: &[&str] = &[
    "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "goto", "if", "in",
    "local", "nil", "not", "or", "repeat", "return", "then", "true", "until", "while",
];

// -- Public API ---------------------------------------------------------------

/// Write a whole description document: `return`, then the root table.
pub fn serialize_document(doc: &Value) -> Result<String> {
    let Value::Table(root) = doc else {
        return Err(SerializeError::UnsupportedValue {
            path: "<root>".to_string(),
            kind: format!("{} (document root must be a table)", doc.type_name()),
        });
    };
    let mut out = String::from("return\n{\n");
    out.push_str(&serialize_table(root, 1)?);
    out.push_str("}\n");
    Ok(out)
}

/// Write the entries of `table` at `indent` tabs, in canonical key order.
/// The surrounding braces are the caller's.
pub fn serialize_table(table: &Table, indent: usize) -> Result<String> {
    serialize_with(table, indent, rank::compare_keys)
}

/// Like [`serialize_table`] with an explicit key comparator.
pub fn serialize_with(table: &Table, indent: usize, compare: KeyCompare) -> Result<String> {
    let mut writer = Writer {
        out: String::new(),
        path: Vec::new(),
        compare,
    };
    writer.write_entries(table, indent)?;
    Ok(writer.out)
}

/// Serialize `doc` and confirm the text reads back to the same value.
pub fn serialize_verified(doc: &Value) -> Result<String> {
    let text = serialize_document(doc)?;
    verify_round_trip(&text, doc)?;
    Ok(text)
}

/// Re-read serialized text and compare it against the value it came from.
pub fn verify_round_trip(text: &str, expected: &Value) -> Result<()> {
    let reread = parse::parse(text).map_err(|e| SerializeError::RoundTripFailure(e.to_string()))?;
    if reread != *expected {
        return Err(SerializeError::RoundTripFailure(
            "re-read document differs from the written value".to_string(),
        ));
    }
    Ok(())
}

// -- Writer -------------------------------------------------------------------

struct Writer {
    out: String,
    /// Key path of the table being written, for error messages.
    path: Vec<String>,
    compare: KeyCompare,
}

impl Writer {
    fn path_with(&self, key: &Key) -> String {
        let mut parts = self.path.clone();
        parts.push(key.to_string());
        parts.join(".")
    }

    fn write_entries(&mut self, table: &Table, indent: usize) -> Result<()> {
        for (key, _) in table.iter() {
            if matches!(key, Key::Float(_) | Key::Bool(_)) {
                return Err(SerializeError::UnsupportedKey {
                    path: self.path.join("."),
                    key: key.to_string(),
                });
            }
        }

        let mut entries: Vec<(&Key, &Value)> = table.iter().collect();
        let compare = self.compare;
        entries.sort_by(|a, b| compare(a.0, b.0));
        let positional = table.is_sequence();
        let tabs = "\t".repeat(indent);

        for (key, value) in entries {
            match value {
                Value::Table(child) => {
                    if positional {
                        self.out.push_str(&format!("{tabs}{{\n"));
                    } else {
                        self.out.push_str(&format!("{tabs}{} =\n{tabs}{{\n", key_literal(key)));
                    }
                    self.path.push(key.to_string());
                    self.write_entries(child, indent + 1)?;
                    self.path.pop();
                    self.out.push_str(&format!("{tabs}}},\n"));
                }
                scalar => {
                    let literal = scalar_literal(scalar).map_err(|kind| {
                        SerializeError::UnsupportedValue {
                            path: self.path_with(key),
                            kind,
                        }
                    })?;
                    if positional {
                        self.out.push_str(&format!("{tabs}{literal},\n"));
                    } else {
                        self.out
                            .push_str(&format!("{tabs}{} = {literal},\n", key_literal(key)));
                    }
                }
            }
        }
        Ok(())
    }
}

// -- Literals -----------------------------------------------------------------

fn key_literal(key: &Key) -> String {
    match key {
        Key::Name(name) if is_identifier(name) => name.clone(),
        Key::Name(name) => format!("[{}]", quote_string(name)),
        Key::Index(i64::MIN) => "[0x8000000000000000]".to_string(),
        other => other.to_string(),
    }
}

fn is_identifier(name: &str) -> bool {
    RE_IDENTIFIER.is_match(name) && !LUA_KEYWORDS.contains(&name)
}

/// Literal text for a non-table value; the error is the offending kind.
fn scalar_literal(value: &Value) -> std::result::Result<String, String> {
    match value {
        Value::Bool(b) => Ok(b.to_string()),
        // The decimal form of i64::MIN reads back as a float.
        Value::Integer(i64::MIN) => Ok("0x8000000000000000".to_string()),
        Value::Integer(i) => Ok(i.to_string()),
        Value::Float(f) if f.is_finite() => Ok(format!("{:?}", f)),
        Value::Float(f) => Err(format!("non-finite number ({})", f)),
        Value::String(s) => Ok(string_literal(s)),
        Value::Nil => Err("nil".to_string()),
        Value::Table(_) => Err("table".to_string()),
    }
}

/// Tabbed text (multi-line descriptions) goes into a long bracket, the rest
/// into a quoted string. Long brackets cannot carry `\r`, so such text is
/// always quoted.
pub fn string_literal(s: &str) -> String {
    if s.contains('\t') && !s.contains('\r') {
        long_bracket(s)
    } else {
        quote_string(s)
    }
}

/// Double-quoted Lua string with escapes.
pub fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            // Three digits so a following digit is not read as part of it.
            c if c.is_ascii_control() => out.push_str(&format!("\\{:03}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// `[==[` + newline + text + `]==]` with the lowest level that `s` cannot
/// terminate early. The reader drops the newline after the opener.
pub fn long_bracket(s: &str) -> String {
    let mut level = 0;
    loop {
        let eq = "=".repeat(level);
        let open = format!("[{eq}[");
        let close = format!("]{eq}]");
        let closes_at_end = format!("{s}{close}").find(&close) == Some(s.len());
        if closes_at_end && !s.contains(&open) {
            return format!("{open}\n{s}{close}");
        }
        level += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn param(name: &str, ty: &str) -> Value {
        let mut t = Table::new();
        t.insert("Type", ty);
        t.insert("Name", name);
        Value::Table(t)
    }

    fn tabs(text: &str) -> String {
        text.replace("    ", "\t")
    }

    #[test]
    fn writes_canonical_document() {
        let mut returns = Table::new();
        let mut ret = Table::new();
        ret.insert("Type", "boolean");
        returns.push(ret);

        let mut func = Table::new();
        func.insert("Notes", "Checks \"pickup\"");
        func.insert("Returns", returns);
        func.insert("Params", Table::from_list([param("Player", "cPlayer")]));

        let mut functions = Table::new();
        functions.insert("CanPickup", func);

        let mut class = Table::new();
        class.insert("Functions", functions);
        class.insert("Desc", "An arrow");

        let mut classes = Table::new();
        classes.insert("cArrow", class);
        let mut root = Table::new();
        root.insert("Classes", classes);

        let expected = tabs(indoc! {r#"
            return
            {
                Classes =
                {
                    cArrow =
                    {
                        Desc = "An arrow",
                        Functions =
                        {
                            CanPickup =
                            {
                                Params =
                                {
                                    {
                                        Name = "Player",
                                        Type = "cPlayer",
                                    },
                                },
                                Returns =
                                {
                                    {
                                        Type = "boolean",
                                    },
                                },
                                Notes = "Checks \"pickup\"",
                            },
                        },
                    },
                },
            }
        "#});
        let doc = Value::Table(root);
        assert_eq!(serialize_document(&doc).unwrap(), expected);
        assert_eq!(serialize_verified(&doc).unwrap(), expected);
    }

    #[test]
    fn class_keys_in_rank_order() {
        let mut class = Table::new();
        class.insert("Variables", Table::new());
        class.insert("Desc", "d");
        class.insert("Functions", Table::new());
        let text = serialize_table(&class, 0).unwrap();
        let keys: Vec<&str> = text
            .lines()
            .filter(|l| !l.starts_with(['{', '}']))
            .map(|l| l.split(' ').next().unwrap_or_default())
            .collect();
        assert_eq!(keys, ["Desc", "Functions", "Variables"]);
    }

    #[test]
    fn custom_comparator_is_used() {
        let mut t = Table::new();
        t.insert("a", 1i64);
        t.insert("b", 2i64);
        let reversed: KeyCompare = |a, b| rank::compare_keys(b, a);
        assert_eq!(serialize_with(&t, 0, reversed).unwrap(), "b = 2,\na = 1,\n");
    }

    #[test]
    fn sparse_and_odd_keys() {
        let mut t = Table::new();
        t.insert(3i64, "c");
        t.insert(1i64, "a");
        t.insert("not an ident", true);
        t.insert("end", false);
        assert_eq!(
            serialize_table(&t, 0).unwrap(),
            "[1] = \"a\",\n[3] = \"c\",\n[\"end\"] = false,\n[\"not an ident\"] = true,\n"
        );
    }

    #[test]
    fn numbers_keep_their_kind() {
        let t = Table::from_list([
            Value::Integer(-4),
            Value::Float(2.0),
            Value::Float(0.25),
            Value::Integer(i64::MIN),
        ]);
        let doc = Value::Table(t);
        let text = serialize_verified(&doc).unwrap();
        assert!(text.contains("\t2.0,\n"), "{}", text);
        assert!(text.contains("\t-4,\n"), "{}", text);
    }

    #[test]
    fn smallest_integer_key_round_trips() {
        let mut t = Table::new();
        t.insert(i64::MIN, "a");
        t.insert(-1i64, "b");
        let doc = Value::Table(t);
        let text = serialize_verified(&doc).unwrap();
        assert!(text.contains("\t[0x8000000000000000] = \"a\",\n"), "{}", text);
        assert!(text.contains("\t[-1] = \"b\",\n"), "{}", text);
    }

    #[test]
    fn quoting_escapes_controls() {
        assert_eq!(quote_string("a\"b\\c\nd"), r#""a\"b\\c\nd""#);
        assert_eq!(quote_string("x\u{0}1"), r#""x\0001""#);
        assert_eq!(quote_string("caf\u{e9}"), "\"caf\u{e9}\"");
    }

    #[test]
    fn tabbed_text_uses_long_bracket() {
        assert_eq!(string_literal("\tIndented"), "[[\n\tIndented]]");
        assert_eq!(string_literal("Plain"), "\"Plain\"");
        assert_eq!(string_literal("\tA\r\nB"), "\"\\tA\\r\\nB\"");
    }

    #[test]
    fn long_bracket_level_escalates() {
        assert_eq!(long_bracket("\tuse ]] here"), "[=[\n\tuse ]] here]=]");
        assert_eq!(long_bracket("\t[[ and ]=]"), "[==[\n\t[[ and ]=]]==]");
        assert_eq!(long_bracket("\tends with ]"), "[=[\n\tends with ]]=]");
    }

    #[test]
    fn long_bracket_round_trips() {
        for text in ["\tplain", "\n\tleading newline", "\t]]", "\t]", "\t[=[ ]=] ]]", "\ttrailing\n"] {
            let doc = Value::Table(Table::from_list([Value::from(text)]));
            serialize_verified(&doc).unwrap_or_else(|e| panic!("{:?}: {}", text, e));
        }
    }

    #[test]
    fn nil_value_is_fatal() {
        let mut inner = Table::new();
        inner.insert("Notes", Value::Nil);
        let mut root = Table::new();
        root.insert("Func", inner);
        let err = serialize_document(&Value::Table(root)).unwrap_err();
        assert_eq!(
            err,
            SerializeError::UnsupportedValue {
                path: "Func.Notes".to_string(),
                kind: "nil".to_string(),
            }
        );
    }

    #[test]
    fn non_finite_float_is_fatal() {
        let doc = Value::Table(Table::from_list([Value::Float(f64::NAN)]));
        assert!(matches!(
            serialize_document(&doc),
            Err(SerializeError::UnsupportedValue { .. })
        ));
    }

    #[test]
    fn boolean_and_float_keys_are_fatal() {
        let mut t = Table::new();
        t.insert(Key::Bool(true), "x");
        assert!(matches!(
            serialize_table(&t, 0),
            Err(SerializeError::UnsupportedKey { .. })
        ));

        let mut t = Table::new();
        t.insert(Key::Float(1.5), "x");
        assert!(matches!(
            serialize_table(&t, 0),
            Err(SerializeError::UnsupportedKey { .. })
        ));
    }

    #[test]
    fn non_table_root_is_fatal() {
        assert!(serialize_document(&Value::from("text")).is_err());
    }

    #[test]
    fn round_trip_detects_mismatch() {
        let doc = Value::Table(Table::from_list([Value::from("a")]));
        let err = verify_round_trip("return { \"b\" }", &doc).unwrap_err();
        assert!(matches!(err, SerializeError::RoundTripFailure(_)));
        let err = verify_round_trip("return { \"b\"", &doc).unwrap_err();
        assert!(matches!(err, SerializeError::RoundTripFailure(_)));
    }
}
