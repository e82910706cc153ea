/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2026 G3-OSS developers.
 */

use thiserror::Error;

use super::primitive;
use crate::bridge::TERM_MESSAGE_NAME;
use crate::types::FieldType;
use crate::value::{FieldData, ThriftMessage, ThriftStruct};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ThriftEncodeError {
    #[error("too long {0} length {1}")]
    TooLongBinary(&'static str, usize),
    #[error("too many {0} elements {1}")]
    TooManyElements(&'static str, usize),
    #[error("data type mismatch for field {0}")]
    FieldTypeMismatch(i16),
    #[error("element type mismatch for {0}")]
    ElementTypeMismatch(&'static str),
    #[error("max nesting depth {0} exceeded")]
    TooDeep(usize),
}

/// Writer for complete messages.
///
/// Runs to completion or fails; there is no partial output contract, a
/// failed encode leaves the buffer in an unspecified state. Struct
/// names go to the wire only for term envelope messages, where the
/// receiving side needs them to tell the envelope variants apart.
pub struct BinaryMessageEncoder {
    versioned: bool,
    max_nesting_depth: usize,
}

impl Default for BinaryMessageEncoder {
    fn default() -> Self {
        BinaryMessageEncoder {
            versioned: false,
            max_nesting_depth: super::DEFAULT_MAX_NESTING_DEPTH,
        }
    }
}

impl BinaryMessageEncoder {
    pub fn new() -> Self {
        BinaryMessageEncoder::default()
    }

    /// Emit the versioned message header instead of the legacy one.
    pub fn set_versioned(&mut self, versioned: bool) {
        self.versioned = versioned;
    }

    pub fn set_max_nesting_depth(&mut self, max: usize) {
        self.max_nesting_depth = max;
    }

    pub fn encode(
        &self,
        msg: &ThriftMessage,
        buf: &mut Vec<u8>,
    ) -> Result<(), ThriftEncodeError> {
        if self.versioned {
            primitive::put_u32(buf, 0x8001_0000 | u32::from(msg.msg_type.wire_tag()));
            encode_binary(buf, &msg.name, "method name")?;
            primitive::put_i32(buf, msg.seq_id);
        } else {
            encode_binary(buf, &msg.name, "method name")?;
            buf.push(msg.msg_type.wire_tag());
            primitive::put_i32(buf, msg.seq_id);
        }

        let with_names = msg.name == TERM_MESSAGE_NAME;
        self.encode_struct(&msg.payload, with_names, 0, buf)
    }

    fn encode_struct(
        &self,
        st: &ThriftStruct,
        with_names: bool,
        depth: usize,
        buf: &mut Vec<u8>,
    ) -> Result<(), ThriftEncodeError> {
        if with_names {
            encode_binary(buf, &st.name, "struct name")?;
        }
        for field in &st.fields {
            if field.data.field_type() != field.field_type {
                return Err(ThriftEncodeError::FieldTypeMismatch(field.id));
            }
            buf.push(field.field_type.wire_tag());
            primitive::put_i16(buf, field.id);
            self.encode_data(&field.data, with_names, depth + 1, buf)?;
        }
        buf.push(FieldType::Stop.wire_tag());
        Ok(())
    }

    fn encode_data(
        &self,
        data: &FieldData,
        with_names: bool,
        depth: usize,
        buf: &mut Vec<u8>,
    ) -> Result<(), ThriftEncodeError> {
        if depth > self.max_nesting_depth {
            return Err(ThriftEncodeError::TooDeep(self.max_nesting_depth));
        }

        match data {
            FieldData::Void => {}
            FieldData::Bool(v) => primitive::put_bool(buf, *v),
            FieldData::Byte(v) => buf.push(*v),
            FieldData::I8(v) => primitive::put_i8(buf, *v),
            FieldData::I16(v) => primitive::put_i16(buf, *v),
            FieldData::I32(v) => primitive::put_i32(buf, *v),
            FieldData::I64(v) => primitive::put_i64(buf, *v),
            FieldData::U64(v) => primitive::put_u64(buf, *v),
            FieldData::Double(v) => primitive::put_double(buf, *v),
            FieldData::Binary(b) => encode_binary(buf, b, "binary")?,
            FieldData::Struct(st) => self.encode_struct(st, with_names, depth, buf)?,
            FieldData::Map(m) => {
                buf.push(m.key_type.wire_tag());
                buf.push(m.value_type.wire_tag());
                encode_size(buf, m.entries.len(), "map")?;
                for (k, v) in &m.entries {
                    if k.field_type() != m.key_type {
                        return Err(ThriftEncodeError::ElementTypeMismatch("map key"));
                    }
                    if v.field_type() != m.value_type {
                        return Err(ThriftEncodeError::ElementTypeMismatch("map value"));
                    }
                    self.encode_data(k, with_names, depth + 1, buf)?;
                    self.encode_data(v, with_names, depth + 1, buf)?;
                }
            }
            FieldData::Set(s) => {
                buf.push(s.elem_type.wire_tag());
                encode_size(buf, s.elems.len(), "set")?;
                for e in &s.elems {
                    if e.field_type() != s.elem_type {
                        return Err(ThriftEncodeError::ElementTypeMismatch("set element"));
                    }
                    self.encode_data(e, with_names, depth + 1, buf)?;
                }
            }
            FieldData::List(l) => {
                buf.push(l.elem_type.wire_tag());
                encode_size(buf, l.elems.len(), "list")?;
                for e in &l.elems {
                    if e.field_type() != l.elem_type {
                        return Err(ThriftEncodeError::ElementTypeMismatch("list element"));
                    }
                    self.encode_data(e, with_names, depth + 1, buf)?;
                }
            }
        }
        Ok(())
    }
}

fn encode_binary(
    buf: &mut Vec<u8>,
    data: &[u8],
    what: &'static str,
) -> Result<(), ThriftEncodeError> {
    let Ok(len) = i32::try_from(data.len()) else {
        return Err(ThriftEncodeError::TooLongBinary(what, data.len()));
    };
    primitive::put_i32(buf, len);
    buf.extend_from_slice(data);
    Ok(())
}

fn encode_size(
    buf: &mut Vec<u8>,
    len: usize,
    what: &'static str,
) -> Result<(), ThriftEncodeError> {
    let Ok(size) = i32::try_from(len) else {
        return Err(ThriftEncodeError::TooManyElements(what, len));
    };
    primitive::put_i32(buf, size);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageType;
    use crate::value::{ThriftField, ThriftList, ThriftMap};
    use hex_literal::hex;

    #[test]
    fn legacy_empty_call() {
        let msg = ThriftMessage {
            name: Vec::new(),
            msg_type: MessageType::Call,
            seq_id: 1,
            payload: ThriftStruct::unnamed(),
        };

        let mut buf = Vec::new();
        BinaryMessageEncoder::new().encode(&msg, &mut buf).unwrap();
        assert_eq!(buf, hex!("00 00 00 00 01 00 00 00 01 00"));
    }

    #[test]
    fn versioned_reply_with_i32_field() {
        let msg = ThriftMessage {
            name: Vec::new(),
            msg_type: MessageType::Reply,
            seq_id: 7,
            payload: ThriftStruct {
                name: Vec::new(),
                fields: vec![ThriftField::new(FieldType::I32, 1, FieldData::I32(42))],
            },
        };

        let mut encoder = BinaryMessageEncoder::new();
        encoder.set_versioned(true);
        let mut buf = Vec::new();
        encoder.encode(&msg, &mut buf).unwrap();
        assert_eq!(
            buf,
            hex!("80 01 00 02 00 00 00 00 00 00 00 07 08 00 01 00 00 00 2A 00")
        );
    }

    #[test]
    fn named_method_call() {
        let msg = ThriftMessage {
            name: b"ping".to_vec(),
            msg_type: MessageType::Call,
            seq_id: 2,
            payload: ThriftStruct::unnamed(),
        };

        let mut buf = Vec::new();
        BinaryMessageEncoder::new().encode(&msg, &mut buf).unwrap();
        assert_eq!(buf, hex!("00 00 00 04 70 69 6E 67 01 00 00 00 02 00"));
    }

    #[test]
    fn container_layout() {
        let msg = ThriftMessage {
            name: Vec::new(),
            msg_type: MessageType::Call,
            seq_id: 0,
            payload: ThriftStruct {
                name: Vec::new(),
                fields: vec![
                    ThriftField::new(
                        FieldType::Map,
                        1,
                        FieldData::Map(ThriftMap {
                            key_type: FieldType::I16,
                            value_type: FieldType::Bool,
                            entries: vec![(FieldData::I16(3), FieldData::Bool(true))],
                        }),
                    ),
                    ThriftField::new(
                        FieldType::List,
                        2,
                        FieldData::List(ThriftList {
                            elem_type: FieldType::I8,
                            elems: vec![FieldData::I8(-1), FieldData::I8(1)],
                        }),
                    ),
                ],
            },
        };

        let mut buf = Vec::new();
        BinaryMessageEncoder::new().encode(&msg, &mut buf).unwrap();
        assert_eq!(
            buf,
            hex!(
                "00 00 00 00 01 00 00 00 00"
                "0D 00 01 06 02 00 00 00 01 00 03 01"
                "0F 00 02 05 00 00 00 02 FF 01"
                "00"
            )
        );
    }

    #[test]
    fn field_type_mismatch() {
        let msg = ThriftMessage {
            name: Vec::new(),
            msg_type: MessageType::Call,
            seq_id: 0,
            payload: ThriftStruct {
                name: Vec::new(),
                fields: vec![ThriftField::new(FieldType::I64, 1, FieldData::I32(1))],
            },
        };

        let mut buf = Vec::new();
        let e = BinaryMessageEncoder::new().encode(&msg, &mut buf).unwrap_err();
        assert_eq!(e, ThriftEncodeError::FieldTypeMismatch(1));
    }

    #[test]
    fn element_type_mismatch() {
        let msg = ThriftMessage {
            name: Vec::new(),
            msg_type: MessageType::Call,
            seq_id: 0,
            payload: ThriftStruct {
                name: Vec::new(),
                fields: vec![ThriftField::new(
                    FieldType::List,
                    1,
                    FieldData::List(ThriftList {
                        elem_type: FieldType::I32,
                        elems: vec![FieldData::I64(1)],
                    }),
                )],
            },
        };

        let mut buf = Vec::new();
        let e = BinaryMessageEncoder::new().encode(&msg, &mut buf).unwrap_err();
        assert_eq!(e, ThriftEncodeError::ElementTypeMismatch("list element"));
    }

    #[test]
    fn nesting_depth_bound() {
        let mut data = FieldData::I32(0);
        for _ in 0..4 {
            data = FieldData::List(ThriftList {
                elem_type: data.field_type(),
                elems: vec![data],
            });
        }
        let msg = ThriftMessage {
            name: Vec::new(),
            msg_type: MessageType::Call,
            seq_id: 0,
            payload: ThriftStruct {
                name: Vec::new(),
                fields: vec![ThriftField::new(FieldType::List, 1, data)],
            },
        };

        let mut encoder = BinaryMessageEncoder::new();
        encoder.set_max_nesting_depth(3);
        let mut buf = Vec::new();
        let e = encoder.encode(&msg, &mut buf).unwrap_err();
        assert_eq!(e, ThriftEncodeError::TooDeep(3));
    }
}
