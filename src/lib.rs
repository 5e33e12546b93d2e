//! apidesc-convert: turn free-text parameter descriptions in Lua API
//! description tables into structured `{ Name, Type, IsOptional }` lists.
//!
//! Pipeline for one document:
//!
//! 1. **Read** the table constructor ([`parse`])
//! 2. **Convert** every function signature ([`convert`]), inferring types
//!    with [`infer`] against a [`KnownClasses`] dictionary
//! 3. **Write** the table back with canonical key order ([`serialize`],
//!    [`rank`]) and re-read it to make sure the output is valid

pub mod convert;
pub mod error;
pub mod infer;
pub mod known;
pub mod parse;
pub mod rank;
pub mod serialize;
pub mod tokenize;
pub mod value;

pub use convert::{ConvertReport, ParamList, ParamSource, ParamSpec};
pub use error::Error;
pub use known::KnownClasses;
pub use value::{Key, Table, Value};

/// A converted, serialized document.
#[derive(Debug, Clone, PartialEq)]
pub struct Converted {
    pub text: String,
    pub report: ConvertReport,
}

/// Convert an already-read document and serialize it, verifying the output.
pub fn convert_parsed(mut doc: Value, known: &KnownClasses) -> Result<Converted, Error> {
    let report = convert::convert_document(&mut doc, known)?;
    let text = serialize::serialize_verified(&doc)?;
    Ok(Converted { text, report })
}

/// Read, convert and serialize one description file's contents.
pub fn convert_source(source: &str, known: &KnownClasses) -> Result<Converted, Error> {
    let doc = parse::parse(source)?;
    convert_parsed(doc, known)
}
