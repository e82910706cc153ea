/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2026 G3-OSS developers.
 */

//! Mapping between terms and their envelope structs.
//!
//! Every term variant is carried by a struct whose two character name
//! identifies the variant, holding exactly one anonymous field with
//! id 1. Lists and tuples keep heterogeneous elements by declaring
//! their element type as struct throughout. A record is a map from
//! field name bytes to element structs, with a reserved empty key
//! naming the record.

use thiserror::Error;

use g3_term_types::{Atom, ContractRegistry, Term};

use crate::types::FieldType;
use crate::value::{FieldData, ThriftField, ThriftList, ThriftMap, ThriftStruct};

/// Name of the messages that carry a term payload.
pub const TERM_MESSAGE_NAME: &[u8] = b"$UBF";

const TERM_BINARY: &[u8] = b"$B";
const TERM_NUMBER: &[u8] = b"$N";
const TERM_BOOL: &[u8] = b"$O";
const TERM_ATOM: &[u8] = b"$A";
const TERM_STRING: &[u8] = b"$S";
const TERM_LIST: &[u8] = b"$L";
const TERM_TUPLE: &[u8] = b"$T";
const TERM_PROPLIST: &[u8] = b"$P";
const TERM_RECORD: &[u8] = b"$R";

const RECORD_NAME_KEY: &[u8] = b"";

const TERM_FIELD_ID: i16 = 1;

#[derive(Debug, Error, PartialEq)]
pub enum TermDecodeError {
    #[error("unknown term struct name {0:?}")]
    InvalidStructName(String),
    #[error("unexpected field count {1} in {0} struct")]
    InvalidFieldCount(&'static str, usize),
    #[error("unexpected field id {1} in {0} struct")]
    InvalidFieldId(&'static str, i16),
    #[error("unexpected field data in {0} struct")]
    InvalidFieldData(&'static str),
    #[error("invalid utf-8 in {0} value")]
    InvalidUtf8(&'static str),
    #[error("unknown atom {0:?}")]
    UnknownAtom(String),
    #[error("unknown record {0}/{1}")]
    UnknownRecord(String, usize),
    #[error("missing record name entry")]
    MissingRecordName,
    #[error("missing field {1:?} of record {0}")]
    MissingRecordField(String, String),
}

/// Encode a term into its envelope struct.
///
/// Total over the term algebra. A record whose `(name, arity)` has no
/// schema in the registry degrades to the tagged tuple form, name
/// first.
pub fn term_to_struct(term: &Term, registry: &ContractRegistry) -> ThriftStruct {
    match term {
        Term::Binary(b) => envelope(TERM_BINARY, FieldData::Binary(b.clone())),
        Term::Int(v) => envelope(TERM_NUMBER, FieldData::I64(*v)),
        Term::Float(v) => envelope(TERM_NUMBER, FieldData::Double(*v)),
        Term::Bool(v) => envelope(TERM_BOOL, FieldData::Bool(*v)),
        Term::Atom(a) => envelope(TERM_ATOM, FieldData::Binary(a.as_bytes().to_vec())),
        Term::String(s) => envelope(TERM_STRING, FieldData::Binary(s.clone().into_bytes())),
        Term::List(elems) => envelope(TERM_LIST, encode_elems(elems, registry)),
        Term::Tuple(elems) => envelope(TERM_TUPLE, encode_elems(elems, registry)),
        Term::PropList(entries) => {
            let entries = entries
                .iter()
                .map(|(k, v)| {
                    (
                        FieldData::Struct(term_to_struct(k, registry)),
                        FieldData::Struct(term_to_struct(v, registry)),
                    )
                })
                .collect();
            envelope(
                TERM_PROPLIST,
                FieldData::Map(ThriftMap {
                    key_type: FieldType::Struct,
                    value_type: FieldType::Struct,
                    entries,
                }),
            )
        }
        Term::Record { name, fields } => {
            match registry.record_fields(name.as_str(), fields.len()) {
                Some(field_names) => {
                    let mut entries = Vec::with_capacity(fields.len() + 1);
                    entries.push((
                        FieldData::Binary(RECORD_NAME_KEY.to_vec()),
                        FieldData::Struct(envelope(
                            TERM_ATOM,
                            FieldData::Binary(name.as_bytes().to_vec()),
                        )),
                    ));
                    for (field_name, value) in field_names.iter().zip(fields) {
                        entries.push((
                            FieldData::Binary(field_name.as_bytes().to_vec()),
                            FieldData::Struct(term_to_struct(value, registry)),
                        ));
                    }
                    envelope(
                        TERM_RECORD,
                        FieldData::Map(ThriftMap {
                            key_type: FieldType::Binary,
                            value_type: FieldType::Struct,
                            entries,
                        }),
                    )
                }
                None => {
                    let mut elems = Vec::with_capacity(fields.len() + 1);
                    elems.push(FieldData::Struct(envelope(
                        TERM_ATOM,
                        FieldData::Binary(name.as_bytes().to_vec()),
                    )));
                    for value in fields {
                        elems.push(FieldData::Struct(term_to_struct(value, registry)));
                    }
                    envelope(
                        TERM_TUPLE,
                        FieldData::List(ThriftList {
                            elem_type: FieldType::Struct,
                            elems,
                        }),
                    )
                }
            }
        }
    }
}

fn envelope(name: &[u8], data: FieldData) -> ThriftStruct {
    let field_type = data.field_type();
    ThriftStruct {
        name: name.to_vec(),
        fields: vec![ThriftField {
            name: Vec::new(),
            field_type,
            id: TERM_FIELD_ID,
            data,
        }],
    }
}

fn encode_elems(terms: &[Term], registry: &ContractRegistry) -> FieldData {
    FieldData::List(ThriftList {
        elem_type: FieldType::Struct,
        elems: terms
            .iter()
            .map(|t| FieldData::Struct(term_to_struct(t, registry)))
            .collect(),
    })
}

/// Decode an envelope struct back into a term.
///
/// With `safe` set, atom names not already known to the registry are
/// rejected instead of interned.
pub fn struct_to_term(
    st: &ThriftStruct,
    registry: &ContractRegistry,
    safe: bool,
) -> Result<Term, TermDecodeError> {
    match st.name.as_slice() {
        TERM_BINARY => {
            let FieldData::Binary(b) = unary_field(st, "$B")? else {
                return Err(TermDecodeError::InvalidFieldData("$B"));
            };
            Ok(Term::Binary(b.clone()))
        }
        TERM_NUMBER => match unary_field(st, "$N")? {
            FieldData::I64(v) => Ok(Term::Int(*v)),
            FieldData::Double(v) => Ok(Term::Float(*v)),
            _ => Err(TermDecodeError::InvalidFieldData("$N")),
        },
        TERM_BOOL => {
            let FieldData::Bool(v) = unary_field(st, "$O")? else {
                return Err(TermDecodeError::InvalidFieldData("$O"));
            };
            Ok(Term::Bool(*v))
        }
        TERM_ATOM => {
            let FieldData::Binary(b) = unary_field(st, "$A")? else {
                return Err(TermDecodeError::InvalidFieldData("$A"));
            };
            Ok(Term::Atom(decode_atom(b, registry, safe)?))
        }
        TERM_STRING => {
            let FieldData::Binary(b) = unary_field(st, "$S")? else {
                return Err(TermDecodeError::InvalidFieldData("$S"));
            };
            let Ok(s) = std::str::from_utf8(b) else {
                return Err(TermDecodeError::InvalidUtf8("$S"));
            };
            Ok(Term::String(s.to_string()))
        }
        TERM_LIST => Ok(Term::List(decode_elems(st, "$L", registry, safe)?)),
        TERM_TUPLE => Ok(Term::Tuple(decode_elems(st, "$T", registry, safe)?)),
        TERM_PROPLIST => {
            let FieldData::Map(m) = unary_field(st, "$P")? else {
                return Err(TermDecodeError::InvalidFieldData("$P"));
            };
            if m.key_type != FieldType::Struct || m.value_type != FieldType::Struct {
                return Err(TermDecodeError::InvalidFieldData("$P"));
            }
            let mut entries = Vec::with_capacity(m.entries.len());
            for (k, v) in &m.entries {
                let (FieldData::Struct(ks), FieldData::Struct(vs)) = (k, v) else {
                    return Err(TermDecodeError::InvalidFieldData("$P"));
                };
                entries.push((
                    struct_to_term(ks, registry, safe)?,
                    struct_to_term(vs, registry, safe)?,
                ));
            }
            Ok(Term::PropList(entries))
        }
        TERM_RECORD => {
            let FieldData::Map(m) = unary_field(st, "$R")? else {
                return Err(TermDecodeError::InvalidFieldData("$R"));
            };
            if m.key_type != FieldType::Binary || m.value_type != FieldType::Struct {
                return Err(TermDecodeError::InvalidFieldData("$R"));
            }

            let mut name: Option<Atom> = None;
            let mut field_values: Vec<(&[u8], &ThriftStruct)> =
                Vec::with_capacity(m.entries.len());
            for (k, v) in &m.entries {
                let (FieldData::Binary(kb), FieldData::Struct(vs)) = (k, v) else {
                    return Err(TermDecodeError::InvalidFieldData("$R"));
                };
                if kb.is_empty() {
                    if name.is_some() {
                        return Err(TermDecodeError::InvalidFieldData("$R"));
                    }
                    match struct_to_term(vs, registry, safe)? {
                        Term::Atom(a) => name = Some(a),
                        _ => return Err(TermDecodeError::InvalidFieldData("$R")),
                    }
                } else {
                    field_values.push((kb.as_slice(), vs));
                }
            }

            let Some(name) = name else {
                return Err(TermDecodeError::MissingRecordName);
            };
            let arity = field_values.len();
            let Some(schema) = registry.record_fields(name.as_str(), arity) else {
                return Err(TermDecodeError::UnknownRecord(
                    name.as_str().to_string(),
                    arity,
                ));
            };

            let mut fields = Vec::with_capacity(arity);
            for field_name in schema {
                let Some((_, vs)) = field_values
                    .iter()
                    .find(|(k, _)| *k == field_name.as_bytes())
                else {
                    return Err(TermDecodeError::MissingRecordField(
                        name.as_str().to_string(),
                        field_name.as_str().to_string(),
                    ));
                };
                fields.push(struct_to_term(vs, registry, safe)?);
            }
            Ok(Term::Record { name, fields })
        }
        other => Err(TermDecodeError::InvalidStructName(
            String::from_utf8_lossy(other).into_owned(),
        )),
    }
}

fn unary_field<'a>(
    st: &'a ThriftStruct,
    what: &'static str,
) -> Result<&'a FieldData, TermDecodeError> {
    if st.fields.len() != 1 {
        return Err(TermDecodeError::InvalidFieldCount(what, st.fields.len()));
    }
    let field = &st.fields[0];
    if field.id != TERM_FIELD_ID {
        return Err(TermDecodeError::InvalidFieldId(what, field.id));
    }
    if field.field_type != field.data.field_type() {
        return Err(TermDecodeError::InvalidFieldData(what));
    }
    Ok(&field.data)
}

fn decode_atom(
    name: &[u8],
    registry: &ContractRegistry,
    safe: bool,
) -> Result<Atom, TermDecodeError> {
    let Ok(name) = std::str::from_utf8(name) else {
        return Err(TermDecodeError::InvalidUtf8("$A"));
    };
    if safe {
        registry
            .atoms()
            .get(name)
            .ok_or_else(|| TermDecodeError::UnknownAtom(name.to_string()))
    } else {
        Ok(registry.atoms().insert(name))
    }
}

fn decode_elems(
    st: &ThriftStruct,
    what: &'static str,
    registry: &ContractRegistry,
    safe: bool,
) -> Result<Vec<Term>, TermDecodeError> {
    let FieldData::List(l) = unary_field(st, what)? else {
        return Err(TermDecodeError::InvalidFieldData(what));
    };
    if l.elem_type != FieldType::Struct {
        return Err(TermDecodeError::InvalidFieldData(what));
    }
    let mut terms = Vec::with_capacity(l.elems.len());
    for e in &l.elems {
        let FieldData::Struct(es) = e else {
            return Err(TermDecodeError::InvalidFieldData(what));
        };
        terms.push(struct_to_term(es, registry, safe)?);
    }
    Ok(terms)
}
