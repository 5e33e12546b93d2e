//! Convert legacy parameter strings into structured parameter lists.
//!
//! A signature's `Params` and `Returns` arrive either as the old
//! comma-separated text or as an already-structured list. Text is tokenized
//! and each token inferred; structured lists pass through untouched, which
//! makes running the conversion twice harmless.

use crate::error::ConvertError;
use crate::infer::{infer_with_rule, UNKNOWN_TYPE};
use crate::known::KnownClasses;
use crate::tokenize::{strip_optional, tokenize};
use crate::value::{Key, Table, Value};
use std::ops::AddAssign;
use tracing::{debug, warn};

/// One parameter or return value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    /// Absent for a return value whose name would repeat its type.
    pub name: Option<String>,
    pub ty: String,
    pub is_optional: bool,
}

impl ParamSpec {
    pub fn is_unknown(&self) -> bool {
        self.ty == UNKNOWN_TYPE
    }

    pub fn to_value(&self) -> Value {
        let mut table = Table::new();
        if let Some(ref name) = self.name {
            table.insert("Name", name.as_str());
        }
        table.insert("Type", self.ty.as_str());
        if self.is_optional {
            table.insert("IsOptional", true);
        }
        Value::Table(table)
    }
}

/// A `Params`/`Returns` value as found in the document.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamSource {
    /// Old comma-separated description.
    Legacy(String),
    /// Already a list of `{ Name, Type, IsOptional }` tables.
    Structured(Table),
}

impl ParamSource {
    /// Resolve the shape of a raw value; the error is the found type name.
    pub fn from_value(value: Value) -> Result<Self, &'static str> {
        match value {
            Value::String(s) => Ok(ParamSource::Legacy(s)),
            Value::Table(t) => Ok(ParamSource::Structured(t)),
            other => Err(other.type_name()),
        }
    }
}

/// Result of [`convert_params`].
#[derive(Debug, Clone, PartialEq)]
pub enum ParamList {
    Converted(Vec<ParamSpec>),
    Structured(Table),
}

impl ParamList {
    pub fn is_empty(&self) -> bool {
        match self {
            ParamList::Converted(specs) => specs.is_empty(),
            ParamList::Structured(table) => table.is_empty(),
        }
    }

    /// Number of `<unknown>` entries produced by this conversion.
    pub fn unknown_count(&self) -> usize {
        match self {
            ParamList::Converted(specs) => specs.iter().filter(|s| s.is_unknown()).count(),
            ParamList::Structured(_) => 0,
        }
    }

    /// Drop `Name` where it equals `Type`.
    pub fn elide_redundant_names(&mut self) {
        match self {
            ParamList::Converted(specs) => {
                for spec in specs {
                    if spec.name.as_deref() == Some(spec.ty.as_str()) {
                        spec.name = None;
                    }
                }
            }
            ParamList::Structured(table) => {
                for (_, entry) in table.iter_mut() {
                    let Some(entry) = entry.as_table_mut() else {
                        continue;
                    };
                    let redundant = match (entry.get("Name"), entry.get("Type")) {
                        (Some(Value::String(name)), Some(Value::String(ty))) => name == ty,
                        _ => false,
                    };
                    if redundant {
                        entry.remove("Name");
                    }
                }
            }
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            ParamList::Converted(specs) => {
                Value::Table(Table::from_list(specs.iter().map(ParamSpec::to_value)))
            }
            ParamList::Structured(table) => Value::Table(table),
        }
    }
}

/// Counters for one conversion run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConvertReport {
    pub classes: usize,
    pub signatures: usize,
    /// Parameters and return values produced from legacy text.
    pub converted: usize,
    /// Of those, how many fell back to `<unknown>`.
    pub unknown: usize,
}

impl AddAssign for ConvertReport {
    fn add_assign(&mut self, rhs: Self) {
        self.classes += rhs.classes;
        self.signatures += rhs.signatures;
        self.converted += rhs.converted;
        self.unknown += rhs.unknown;
    }
}

// -- Params -------------------------------------------------------------------

/// Convert one `Params`/`Returns` value. Absent stays absent and structured
/// input is returned unchanged.
pub fn convert_params(source: Option<ParamSource>, known: &KnownClasses) -> Option<ParamList> {
    match source? {
        ParamSource::Structured(table) => Some(ParamList::Structured(table)),
        ParamSource::Legacy(text) => {
            let specs = tokenize(&text)
                .into_iter()
                .map(|token| {
                    let (is_optional, bare) = match strip_optional(token) {
                        Some(inner) => (true, inner),
                        None => (false, token),
                    };
                    let (rule, inferred) = infer_with_rule(bare, known);
                    debug!(token, rule, ty = %inferred.ty, "inferred parameter");
                    ParamSpec {
                        name: Some(inferred.name),
                        ty: inferred.ty,
                        is_optional,
                    }
                })
                .collect();
            Some(ParamList::Converted(specs))
        }
    }
}

// -- Signatures ---------------------------------------------------------------

/// Normalize one signature table in place.
///
/// `Params` and `Returns` are converted; a legacy `Return` is used when
/// `Returns` is missing and is always removed. Return values whose name
/// equals their type lose the name. Empty lists are removed.
pub fn convert_signature(
    signature: &mut Table,
    known: &KnownClasses,
) -> Result<ConvertReport, ConvertError> {
    convert_signature_at(signature, known, "signature")
}

fn convert_signature_at(
    signature: &mut Table,
    known: &KnownClasses,
    location: &str,
) -> Result<ConvertReport, ConvertError> {
    let mut report = ConvertReport {
        signatures: 1,
        ..ConvertReport::default()
    };

    let params = take_source(signature, "Params", location)?;
    let params = convert_params(params, known);

    let returns = match signature.remove("Returns") {
        Some(Value::Nil) | None => signature.remove("Return"),
        value => value,
    };
    signature.remove("Return");
    let returns = returns
        .filter(|value| !matches!(value, Value::Nil))
        .map(ParamSource::from_value)
        .transpose()
        .map_err(|found| ConvertError::InvalidParamList {
            location: location.to_string(),
            field: "Returns",
            found,
        })?;
    let mut returns = convert_params(returns, known);
    if let Some(ref mut list) = returns {
        list.elide_redundant_names();
    }

    for (field, list) in [("Params", params), ("Returns", returns)] {
        let Some(list) = list else {
            continue;
        };
        if let ParamList::Converted(ref specs) = list {
            report.converted += specs.len();
            for spec in specs.iter().filter(|s| s.is_unknown()) {
                warn!(
                    location,
                    field,
                    token = spec.name.as_deref().unwrap_or_default(),
                    "could not infer type, needs manual review"
                );
            }
        }
        report.unknown += list.unknown_count();
        if !list.is_empty() {
            signature.insert(field, list.into_value());
        }
    }

    Ok(report)
}

fn take_source(
    signature: &mut Table,
    field: &'static str,
    location: &str,
) -> Result<Option<ParamSource>, ConvertError> {
    signature
        .remove(field)
        .filter(|value| !matches!(value, Value::Nil))
        .map(ParamSource::from_value)
        .transpose()
        .map_err(|found| ConvertError::InvalidParamList {
            location: location.to_string(),
            field,
            found,
        })
}

/// Convert a function entry: one signature, or a list of overloads.
/// The entry keeps its shape.
pub fn convert_function(
    entry: &mut Value,
    known: &KnownClasses,
    location: &str,
) -> Result<ConvertReport, ConvertError> {
    let Value::Table(table) = entry else {
        return Err(ConvertError::InvalidSignature {
            location: location.to_string(),
            found: entry.type_name(),
        });
    };

    if table.is_empty() || !table.is_sequence() {
        return convert_signature_at(table, known, location);
    }

    let mut report = ConvertReport::default();
    for (key, overload) in table.iter_mut() {
        let overload_location = format!("{}{}", location, key);
        let Value::Table(signature) = overload else {
            return Err(ConvertError::InvalidSignature {
                location: overload_location,
                found: overload.type_name(),
            });
        };
        report += convert_signature_at(signature, known, &overload_location)?;
    }
    Ok(report)
}

// -- Documents ----------------------------------------------------------------

/// Convert every function of every class in a description document.
///
/// Accepts both `{ Classes = { ... }, ... }` and a bare mapping of class
/// names. Entries that are not tables, and every class key other than
/// `Functions`, are left as they are.
pub fn convert_document(doc: &mut Value, known: &KnownClasses) -> Result<ConvertReport, ConvertError> {
    let Value::Table(root) = doc else {
        return Err(ConvertError::InvalidDocument(doc.type_name()));
    };
    let classes = if matches!(root.get("Classes"), Some(Value::Table(_))) {
        match root.get_mut("Classes") {
            Some(Value::Table(classes)) => classes,
            _ => return Ok(ConvertReport::default()),
        }
    } else {
        root
    };

    let mut report = ConvertReport::default();
    for (class_key, class) in classes.iter_mut() {
        let (Key::Name(class_name), Value::Table(class)) = (class_key, class) else {
            continue;
        };
        report.classes += 1;
        let Some(Value::Table(functions)) = class.get_mut("Functions") else {
            continue;
        };
        debug!(class = %class_name, functions = functions.len(), "converting class");
        for (function_key, entry) in functions.iter_mut() {
            let location = format!("{}.{}", class_name, function_key);
            report += convert_function(entry, known, &location)?;
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;
    use pretty_assertions::assert_eq;

    fn known() -> KnownClasses {
        ["cPlayer", "cWorld", "cEntity"].into_iter().collect()
    }

    fn spec(name: Option<&str>, ty: &str, is_optional: bool) -> ParamSpec {
        ParamSpec {
            name: name.map(str::to_string),
            ty: ty.to_string(),
            is_optional,
        }
    }

    fn legacy(text: &str) -> Vec<ParamSpec> {
        match convert_params(Some(ParamSource::Legacy(text.to_string())), &known()) {
            Some(ParamList::Converted(specs)) => specs,
            other => panic!("unexpected {:?}", other),
        }
    }

    fn signature(src: &str) -> Table {
        parse(src).unwrap().as_table().unwrap().clone()
    }

    #[test]
    fn absent_stays_absent() {
        assert_eq!(convert_params(None, &known()), None);
    }

    #[test]
    fn order_is_preserved() {
        let names: Vec<_> = legacy("A, B, C")
            .into_iter()
            .map(|s| s.name.unwrap_or_default())
            .collect();
        assert_eq!(names, ["A", "B", "C"]);
    }

    #[test]
    fn optional_marker_is_detected() {
        assert_eq!(
            legacy("Foo, [Bar]"),
            vec![
                spec(Some("Foo"), UNKNOWN_TYPE, false),
                spec(Some("Bar"), UNKNOWN_TYPE, true),
            ]
        );
        assert_eq!(legacy("[BlockMeta]"), vec![spec(Some("BlockMeta"), "number", true)]);
    }

    #[test]
    fn structured_input_is_idempotent() {
        let first = convert_params(
            Some(ParamSource::Legacy("BlockX, {{cWorld|World}}, [IsForced]".to_string())),
            &known(),
        )
        .unwrap()
        .into_value();

        let source = ParamSource::from_value(first.clone()).unwrap();
        let second = convert_params(Some(source), &known()).unwrap().into_value();
        assert_eq!(second, first);
    }

    #[test]
    fn non_list_params_are_rejected() {
        assert_eq!(ParamSource::from_value(Value::Integer(3)), Err("number"));
        let mut sig = signature("{ Params = true }");
        let err = convert_signature(&mut sig, &known()).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidParamList { field: "Params", .. }));
    }

    #[test]
    fn returns_drop_redundant_name() {
        let mut sig = signature(r#"{ Params = "cPlayer", Returns = "cPlayer, IsValid" }"#);
        convert_signature(&mut sig, &known()).unwrap();
        let expected = signature(
            r#"{
                Params = { { Name = "cPlayer", Type = "cPlayer" } },
                Returns = { { Type = "cPlayer" }, { Name = "IsValid", Type = "boolean" } },
            }"#,
        );
        assert_eq!(sig, expected);
    }

    #[test]
    fn legacy_return_is_renamed() {
        let mut sig = signature(r#"{ Return = "number", Notes = "n" }"#);
        convert_signature(&mut sig, &known()).unwrap();
        assert_eq!(sig.get("Return"), None);
        assert_eq!(sig, signature(r#"{ Returns = { { Type = "number" } }, Notes = "n" }"#));
    }

    #[test]
    fn legacy_return_is_dropped_when_returns_exists() {
        let mut sig = signature(r#"{ Returns = "string", Return = "number" }"#);
        convert_signature(&mut sig, &known()).unwrap();
        assert_eq!(sig, signature(r#"{ Returns = { { Type = "string" } } }"#));
    }

    #[test]
    fn empty_lists_become_absent() {
        let mut sig = signature(r#"{ Params = "", Returns = " , ", IsStatic = true }"#);
        convert_signature(&mut sig, &known()).unwrap();
        assert_eq!(sig, signature("{ IsStatic = true }"));

        let mut sig = signature("{ Params = {}, Returns = {} }");
        convert_signature(&mut sig, &known()).unwrap();
        assert!(sig.is_empty());
    }

    #[test]
    fn nil_params_are_absent() {
        let mut sig = signature(r#"{ Params = nil, Returns = "cWorld" }"#);
        convert_signature(&mut sig, &known()).unwrap();
        assert_eq!(sig, signature(r#"{ Returns = { { Type = "cWorld" } } }"#));

        let mut sig = Table::new();
        sig.insert("Params", Value::Nil);
        sig.insert("Returns", Value::Nil);
        sig.insert("Return", "number");
        convert_signature(&mut sig, &known()).unwrap();
        assert_eq!(sig, signature(r#"{ Returns = { { Type = "number" } } }"#));
    }

    #[test]
    fn structured_returns_are_elided_too() {
        let mut sig = signature(r#"{ Returns = { { Name = "cWorld", Type = "cWorld" } } }"#);
        convert_signature(&mut sig, &known()).unwrap();
        assert_eq!(sig, signature(r#"{ Returns = { { Type = "cWorld" } } }"#));
    }

    #[test]
    fn report_counts_unknowns() {
        let mut sig = signature(r#"{ Params = "Frobnicator, X", Returns = "Gizmo" }"#);
        let report = convert_signature(&mut sig, &known()).unwrap();
        assert_eq!(
            report,
            ConvertReport {
                classes: 0,
                signatures: 1,
                converted: 3,
                unknown: 2,
            }
        );
    }

    #[test]
    fn overloads_keep_list_shape() {
        let mut entry = parse(r#"{ { Params = "X" }, { Params = "X, Y" } }"#).unwrap();
        let report = convert_function(&mut entry, &known(), "cFoo.Bar").unwrap();
        assert_eq!(report.signatures, 2);
        assert_eq!(
            entry,
            parse(
                r#"{
                    { Params = { { Name = "X", Type = "number" } } },
                    { Params = { { Name = "X", Type = "number" }, { Name = "Y", Type = "number" } } },
                }"#
            )
            .unwrap()
        );
    }

    #[test]
    fn single_signature_stays_single() {
        let mut entry = parse(r#"{ Params = "X", Notes = "n" }"#).unwrap();
        convert_function(&mut entry, &known(), "cFoo.Bar").unwrap();
        let table = entry.as_table().unwrap();
        assert!(!table.is_sequence());
        assert!(table.get("Params").is_some());
    }

    #[test]
    fn bad_overload_reports_location() {
        let mut entry = parse(r#"{ { Params = "X" }, "oops" }"#).unwrap();
        let err = convert_function(&mut entry, &known(), "cFoo.Bar").unwrap_err();
        assert_eq!(
            err,
            ConvertError::InvalidSignature {
                location: "cFoo.Bar[2]".to_string(),
                found: "string",
            }
        );
    }

    #[test]
    fn converts_wrapped_document() {
        let mut doc = parse(
            r#"return {
                Classes = {
                    cEntity = {
                        Desc = "An entity",
                        Functions = { GetWorld = { Return = "cWorld" } },
                    },
                },
                IgnoreClasses = { "^cManual" },
            }"#,
        )
        .unwrap();
        let report = convert_document(&mut doc, &known()).unwrap();
        assert_eq!(report.classes, 1);
        assert_eq!(report.signatures, 1);
        assert_eq!(
            doc,
            parse(
                r#"return {
                    Classes = {
                        cEntity = {
                            Desc = "An entity",
                            Functions = { GetWorld = { Returns = { { Type = "cWorld" } } } },
                        },
                    },
                    IgnoreClasses = { "^cManual" },
                }"#
            )
            .unwrap()
        );
    }

    #[test]
    fn converts_bare_class_mapping() {
        let mut doc = parse(r#"{ cRoot = { Functions = { Get = { Params = "Name" } } } }"#).unwrap();
        convert_document(&mut doc, &known()).unwrap();
        assert_eq!(
            doc,
            parse(r#"{ cRoot = { Functions = { Get = { Params = { { Name = "Name", Type = "string" } } } } } }"#)
                .unwrap()
        );
    }

    #[test]
    fn non_table_document_is_rejected() {
        let mut doc = Value::from("nope");
        assert_eq!(
            convert_document(&mut doc, &known()),
            Err(ConvertError::InvalidDocument("string"))
        );
    }
}
