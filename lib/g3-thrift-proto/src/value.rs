/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2026 G3-OSS developers.
 */

use crate::types::{FieldType, MessageType};

/// A complete protocol message.
///
/// The method name is kept as raw bytes. The payload struct carries a
/// name only in memory, except for term envelope traffic where it is
/// also present on the wire.
#[derive(Clone, Debug, PartialEq)]
pub struct ThriftMessage {
    pub name: Vec<u8>,
    pub msg_type: MessageType,
    pub seq_id: i32,
    pub payload: ThriftStruct,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ThriftStruct {
    pub name: Vec<u8>,
    pub fields: Vec<ThriftField>,
}

impl ThriftStruct {
    pub fn unnamed() -> Self {
        ThriftStruct::default()
    }

    pub fn new(name: Vec<u8>) -> Self {
        ThriftStruct {
            name,
            fields: Vec::new(),
        }
    }
}

/// A single struct field. The name is in-memory only and never hits
/// the wire.
#[derive(Clone, Debug, PartialEq)]
pub struct ThriftField {
    pub name: Vec<u8>,
    pub field_type: FieldType,
    pub id: i16,
    pub data: FieldData,
}

impl ThriftField {
    pub fn new(field_type: FieldType, id: i16, data: FieldData) -> Self {
        ThriftField {
            name: Vec::new(),
            field_type,
            id,
            data,
        }
    }
}

/// Map entries keep their decoded order. Duplicate keys are not
/// rejected at this level.
#[derive(Clone, Debug, PartialEq)]
pub struct ThriftMap {
    pub key_type: FieldType,
    pub value_type: FieldType,
    pub entries: Vec<(FieldData, FieldData)>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ThriftSet {
    pub elem_type: FieldType,
    pub elems: Vec<FieldData>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ThriftList {
    pub elem_type: FieldType,
    pub elems: Vec<FieldData>,
}

/// The payload of a field or container element.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldData {
    Void,
    Bool(bool),
    Byte(u8),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U64(u64),
    Double(f64),
    Binary(Vec<u8>),
    Struct(ThriftStruct),
    Map(ThriftMap),
    Set(ThriftSet),
    List(ThriftList),
}

impl FieldData {
    /// The wire type this data serializes as.
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldData::Void => FieldType::Void,
            FieldData::Bool(_) => FieldType::Bool,
            FieldData::Byte(_) => FieldType::Byte,
            FieldData::I8(_) => FieldType::I8,
            FieldData::I16(_) => FieldType::I16,
            FieldData::I32(_) => FieldType::I32,
            FieldData::I64(_) => FieldType::I64,
            FieldData::U64(_) => FieldType::U64,
            FieldData::Double(_) => FieldType::Double,
            FieldData::Binary(_) => FieldType::Binary,
            FieldData::Struct(_) => FieldType::Struct,
            FieldData::Map(_) => FieldType::Map,
            FieldData::Set(_) => FieldType::Set,
            FieldData::List(_) => FieldType::List,
        }
    }
}
