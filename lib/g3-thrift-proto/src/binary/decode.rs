/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2026 G3-OSS developers.
 */

use thiserror::Error;

use super::primitive::ByteReader;
use crate::bridge::TERM_MESSAGE_NAME;
use crate::types::{FieldType, MessageType};
use crate::value::{
    FieldData, ThriftField, ThriftList, ThriftMap, ThriftMessage, ThriftSet, ThriftStruct,
};

/// Resource bounds applied while decoding untrusted input.
#[derive(Clone, Copy, Debug)]
pub struct DecodeLimits {
    max_name_len: usize,
    max_binary_len: usize,
    max_container_size: usize,
    max_nesting_depth: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        DecodeLimits {
            max_name_len: 1024,
            max_binary_len: 0x0400_0000,
            max_container_size: 0x0100_0000,
            max_nesting_depth: super::DEFAULT_MAX_NESTING_DEPTH,
        }
    }
}

impl DecodeLimits {
    /// Bound on method and struct name lengths.
    pub fn set_max_name_len(&mut self, max: usize) {
        self.max_name_len = max;
    }

    pub fn set_max_binary_len(&mut self, max: usize) {
        self.max_binary_len = max;
    }

    pub fn set_max_container_size(&mut self, max: usize) {
        self.max_container_size = max;
    }

    pub fn set_max_nesting_depth(&mut self, max: usize) {
        self.max_nesting_depth = max;
    }

    pub fn max_nesting_depth(&self) -> usize {
        self.max_nesting_depth
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MessageDecodeError {
    #[error("negative method name length {0}")]
    InvalidMethodNameLength(i32),
    #[error("too long method name length {0}")]
    TooLongMethodName(usize),
    #[error("unknown message type {0}")]
    InvalidMessageType(u8),
    #[error("negative struct name length {0}")]
    InvalidStructNameLength(i32),
    #[error("too long struct name length {0}")]
    TooLongStructName(usize),
    #[error("unknown field type tag {0}")]
    InvalidFieldType(u8),
    #[error("invalid {0} element type tag {1}")]
    InvalidElementType(&'static str, u8),
    #[error("invalid bool value {0}")]
    InvalidBoolValue(u8),
    #[error("negative binary length {0}")]
    InvalidBinaryLength(i32),
    #[error("too long binary length {0}")]
    TooLongBinary(usize),
    #[error("negative {0} size {1}")]
    InvalidContainerSize(&'static str, i32),
    #[error("too large {0} size {1}")]
    TooLargeContainer(&'static str, usize),
    #[error("max nesting depth {0} exceeded")]
    TooDeep(usize),
    #[error("decoder already failed")]
    AlreadyFailed,
}

/// One complete message plus whatever followed it in the stream.
#[derive(Debug)]
pub struct DecodedMessage {
    pub message: ThriftMessage,
    pub remainder: Vec<u8>,
    pub versioned: bool,
}

#[derive(Debug)]
pub enum DecodeOutcome {
    Complete(DecodedMessage),
    NeedMoreData,
}

#[derive(Clone, Copy)]
enum DecodeState {
    MessageBegin,
    StructBegin,
    FieldBegin,
    Value(FieldType),
    Failed,
}

struct MessageHeader {
    name: Vec<u8>,
    msg_type: MessageType,
    seq_id: i32,
    versioned: bool,
}

enum Frame {
    Struct {
        st: ThriftStruct,
        pending: Option<(FieldType, i16)>,
    },
    Map {
        key_type: FieldType,
        value_type: FieldType,
        remaining: usize,
        entries: Vec<(FieldData, FieldData)>,
        key: Option<FieldData>,
    },
    List {
        elem_type: FieldType,
        remaining: usize,
        elems: Vec<FieldData>,
    },
    Set {
        elem_type: FieldType,
        remaining: usize,
        elems: Vec<FieldData>,
    },
}

enum RunOutcome {
    Done {
        message: ThriftMessage,
        consumed: usize,
        versioned: bool,
    },
    More {
        consumed: usize,
    },
}

/// Incremental reader for a single message.
///
/// Feed input chunks through [`decode`](Self::decode) as they arrive;
/// the decoder buffers the unconsumed tail and suspends whenever a
/// construct is cut off mid-way, so any chunking of the byte stream
/// yields the same result. Parsing keeps one heap frame per open
/// container instead of recursing, which keeps adversarially nested
/// input from growing the host stack.
///
/// A completed decode hands back the message together with the bytes
/// that followed it, and the decoder is reset so the remainder can be
/// fed straight back in for the next message. A failed decoder stays
/// failed.
pub struct BinaryMessageDecoder {
    limits: DecodeLimits,
    buf: Vec<u8>,
    state: DecodeState,
    stack: Vec<Frame>,
    header: Option<MessageHeader>,
    with_struct_names: bool,
}

impl BinaryMessageDecoder {
    pub fn new(limits: DecodeLimits) -> Self {
        BinaryMessageDecoder {
            limits,
            buf: Vec::new(),
            state: DecodeState::MessageBegin,
            stack: Vec::new(),
            header: None,
            with_struct_names: false,
        }
    }

    /// Consume `data` and try to finish the message.
    pub fn decode(&mut self, data: &[u8]) -> Result<DecodeOutcome, MessageDecodeError> {
        if matches!(self.state, DecodeState::Failed) {
            return Err(MessageDecodeError::AlreadyFailed);
        }

        let mut buf = std::mem::take(&mut self.buf);
        if !data.is_empty() {
            buf.extend_from_slice(data);
        }

        match self.run(&buf) {
            Ok(RunOutcome::Done {
                message,
                consumed,
                versioned,
            }) => Ok(DecodeOutcome::Complete(DecodedMessage {
                message,
                remainder: buf[consumed..].to_vec(),
                versioned,
            })),
            Ok(RunOutcome::More { consumed }) => {
                buf.drain(..consumed);
                self.buf = buf;
                Ok(DecodeOutcome::NeedMoreData)
            }
            Err(e) => {
                self.state = DecodeState::Failed;
                self.stack.clear();
                self.header = None;
                Err(e)
            }
        }
    }

    fn run(&mut self, buf: &[u8]) -> Result<RunOutcome, MessageDecodeError> {
        let mut off = 0usize;
        loop {
            match self.state {
                DecodeState::MessageBegin => {
                    match self.parse_message_begin(&buf[off..])? {
                        Some(consumed) => off += consumed,
                        None => return Ok(RunOutcome::More { consumed: off }),
                    }
                }
                DecodeState::StructBegin => match self.parse_struct_begin(&buf[off..])? {
                    Some(consumed) => off += consumed,
                    None => return Ok(RunOutcome::More { consumed: off }),
                },
                DecodeState::FieldBegin => {
                    let mut r = ByteReader::new(&buf[off..]);
                    let Some(tag) = r.take_u8() else {
                        return Ok(RunOutcome::More { consumed: off });
                    };
                    if tag == 0 {
                        off += r.consumed();
                        if let Some((message, versioned)) = self.end_struct()? {
                            return Ok(RunOutcome::Done {
                                message,
                                consumed: off,
                                versioned,
                            });
                        }
                    } else {
                        let Some(field_type) = FieldType::parse(tag) else {
                            return Err(MessageDecodeError::InvalidFieldType(tag));
                        };
                        let Some(id) = r.take_i16() else {
                            return Ok(RunOutcome::More { consumed: off });
                        };
                        off += r.consumed();
                        if let Some(Frame::Struct { pending, .. }) = self.stack.last_mut() {
                            *pending = Some((field_type, id));
                        }
                        self.state = DecodeState::Value(field_type);
                    }
                }
                DecodeState::Value(field_type) => {
                    match self.parse_value(field_type, &buf[off..])? {
                        Some(consumed) => off += consumed,
                        None => return Ok(RunOutcome::More { consumed: off }),
                    }
                }
                DecodeState::Failed => return Err(MessageDecodeError::AlreadyFailed),
            }
        }
    }

    fn parse_message_begin(
        &mut self,
        data: &[u8],
    ) -> Result<Option<usize>, MessageDecodeError> {
        let mut r = ByteReader::new(data);
        let Some(first) = r.take_u32() else {
            return Ok(None);
        };

        // the high 16 bits are the only reliable discriminator between
        // the versioned and the legacy header form
        let header = if (first >> 16) as u16 == 0x8001 {
            let type_byte = (first & 0xFF) as u8;
            let Some(msg_type) = MessageType::parse(type_byte) else {
                return Err(MessageDecodeError::InvalidMessageType(type_byte));
            };
            let Some(name_len) = r.take_i32() else {
                return Ok(None);
            };
            let name_len = self.check_method_name_len(name_len)?;
            let Some(name) = r.take_bytes(name_len) else {
                return Ok(None);
            };
            let name = name.to_vec();
            let Some(seq_id) = r.take_i32() else {
                return Ok(None);
            };
            MessageHeader {
                name,
                msg_type,
                seq_id,
                versioned: true,
            }
        } else {
            let name_len = self.check_method_name_len(first.cast_signed())?;
            let Some(name) = r.take_bytes(name_len) else {
                return Ok(None);
            };
            let name = name.to_vec();
            let Some(type_byte) = r.take_u8() else {
                return Ok(None);
            };
            let Some(msg_type) = MessageType::parse(type_byte) else {
                return Err(MessageDecodeError::InvalidMessageType(type_byte));
            };
            let Some(seq_id) = r.take_i32() else {
                return Ok(None);
            };
            MessageHeader {
                name,
                msg_type,
                seq_id,
                versioned: false,
            }
        };

        self.with_struct_names = header.name == TERM_MESSAGE_NAME;
        self.header = Some(header);
        self.stack.push(Frame::Struct {
            st: ThriftStruct::unnamed(),
            pending: None,
        });
        self.state = if self.with_struct_names {
            DecodeState::StructBegin
        } else {
            DecodeState::FieldBegin
        };
        Ok(Some(r.consumed()))
    }

    fn check_method_name_len(&self, len: i32) -> Result<usize, MessageDecodeError> {
        if len < 0 {
            return Err(MessageDecodeError::InvalidMethodNameLength(len));
        }
        let len = len as usize;
        if len > self.limits.max_name_len {
            return Err(MessageDecodeError::TooLongMethodName(len));
        }
        Ok(len)
    }

    fn parse_struct_begin(&mut self, data: &[u8]) -> Result<Option<usize>, MessageDecodeError> {
        let mut r = ByteReader::new(data);
        let Some(len) = r.take_i32() else {
            return Ok(None);
        };
        if len < 0 {
            return Err(MessageDecodeError::InvalidStructNameLength(len));
        }
        let len = len as usize;
        if len > self.limits.max_name_len {
            return Err(MessageDecodeError::TooLongStructName(len));
        }
        let Some(name) = r.take_bytes(len) else {
            return Ok(None);
        };
        let name = name.to_vec();
        if let Some(Frame::Struct { st, .. }) = self.stack.last_mut() {
            st.name = name;
        }
        self.state = DecodeState::FieldBegin;
        Ok(Some(r.consumed()))
    }

    /// Close the struct on top of the stack. Returns the finished
    /// message when it was the message payload.
    fn end_struct(&mut self) -> Result<Option<(ThriftMessage, bool)>, MessageDecodeError> {
        let Some(Frame::Struct { st, .. }) = self.stack.pop() else {
            return Err(MessageDecodeError::AlreadyFailed);
        };
        if self.stack.is_empty() {
            let Some(h) = self.header.take() else {
                return Err(MessageDecodeError::AlreadyFailed);
            };
            let message = ThriftMessage {
                name: h.name,
                msg_type: h.msg_type,
                seq_id: h.seq_id,
                payload: st,
            };
            self.state = DecodeState::MessageBegin;
            self.with_struct_names = false;
            return Ok(Some((message, h.versioned)));
        }
        self.deliver(FieldData::Struct(st));
        Ok(None)
    }

    fn parse_value(
        &mut self,
        field_type: FieldType,
        data: &[u8],
    ) -> Result<Option<usize>, MessageDecodeError> {
        let mut r = ByteReader::new(data);
        match field_type {
            FieldType::Stop => return Err(MessageDecodeError::InvalidFieldType(0)),
            FieldType::Void => self.deliver(FieldData::Void),
            FieldType::Bool => {
                let Some(b) = r.take_u8() else { return Ok(None) };
                let v = match b {
                    0 => false,
                    1 => true,
                    _ => return Err(MessageDecodeError::InvalidBoolValue(b)),
                };
                self.deliver(FieldData::Bool(v));
            }
            FieldType::Byte => {
                let Some(b) = r.take_u8() else { return Ok(None) };
                self.deliver(FieldData::Byte(b));
            }
            FieldType::I8 => {
                let Some(b) = r.take_u8() else { return Ok(None) };
                self.deliver(FieldData::I8(b.cast_signed()));
            }
            FieldType::I16 => {
                let Some(v) = r.take_i16() else { return Ok(None) };
                self.deliver(FieldData::I16(v));
            }
            FieldType::I32 => {
                let Some(v) = r.take_i32() else { return Ok(None) };
                self.deliver(FieldData::I32(v));
            }
            FieldType::I64 => {
                let Some(v) = r.take_i64() else { return Ok(None) };
                self.deliver(FieldData::I64(v));
            }
            FieldType::U64 => {
                let Some(v) = r.take_u64() else { return Ok(None) };
                self.deliver(FieldData::U64(v));
            }
            FieldType::Double => {
                let Some(v) = r.take_double() else { return Ok(None) };
                self.deliver(FieldData::Double(v));
            }
            FieldType::Binary => {
                let Some(len) = r.take_i32() else { return Ok(None) };
                if len < 0 {
                    return Err(MessageDecodeError::InvalidBinaryLength(len));
                }
                let len = len as usize;
                if len > self.limits.max_binary_len {
                    return Err(MessageDecodeError::TooLongBinary(len));
                }
                let Some(bytes) = r.take_bytes(len) else {
                    return Ok(None);
                };
                self.deliver(FieldData::Binary(bytes.to_vec()));
            }
            FieldType::Struct => {
                self.check_depth()?;
                self.stack.push(Frame::Struct {
                    st: ThriftStruct::unnamed(),
                    pending: None,
                });
                self.state = if self.with_struct_names {
                    DecodeState::StructBegin
                } else {
                    DecodeState::FieldBegin
                };
            }
            FieldType::Map => {
                let Some(kt) = r.take_u8() else { return Ok(None) };
                let Some(vt) = r.take_u8() else { return Ok(None) };
                let Some(size) = r.take_i32() else { return Ok(None) };
                let key_type = parse_elem_type(kt, "map key")?;
                let value_type = parse_elem_type(vt, "map value")?;
                let size = self.check_container_size(size, "map")?;
                if size == 0 {
                    self.deliver(FieldData::Map(ThriftMap {
                        key_type,
                        value_type,
                        entries: Vec::new(),
                    }));
                } else {
                    self.check_depth()?;
                    self.stack.push(Frame::Map {
                        key_type,
                        value_type,
                        remaining: size,
                        entries: Vec::new(),
                        key: None,
                    });
                    self.state = DecodeState::Value(key_type);
                }
            }
            FieldType::Set => {
                let Some(et) = r.take_u8() else { return Ok(None) };
                let Some(size) = r.take_i32() else { return Ok(None) };
                let elem_type = parse_elem_type(et, "set")?;
                let size = self.check_container_size(size, "set")?;
                if size == 0 {
                    self.deliver(FieldData::Set(ThriftSet {
                        elem_type,
                        elems: Vec::new(),
                    }));
                } else {
                    self.check_depth()?;
                    self.stack.push(Frame::Set {
                        elem_type,
                        remaining: size,
                        elems: Vec::new(),
                    });
                    self.state = DecodeState::Value(elem_type);
                }
            }
            FieldType::List => {
                let Some(et) = r.take_u8() else { return Ok(None) };
                let Some(size) = r.take_i32() else { return Ok(None) };
                let elem_type = parse_elem_type(et, "list")?;
                let size = self.check_container_size(size, "list")?;
                if size == 0 {
                    self.deliver(FieldData::List(ThriftList {
                        elem_type,
                        elems: Vec::new(),
                    }));
                } else {
                    self.check_depth()?;
                    self.stack.push(Frame::List {
                        elem_type,
                        remaining: size,
                        elems: Vec::new(),
                    });
                    self.state = DecodeState::Value(elem_type);
                }
            }
        }
        Ok(Some(r.consumed()))
    }

    fn check_depth(&self) -> Result<(), MessageDecodeError> {
        if self.stack.len() >= self.limits.max_nesting_depth {
            return Err(MessageDecodeError::TooDeep(self.limits.max_nesting_depth));
        }
        Ok(())
    }

    fn check_container_size(
        &self,
        size: i32,
        what: &'static str,
    ) -> Result<usize, MessageDecodeError> {
        if size < 0 {
            return Err(MessageDecodeError::InvalidContainerSize(what, size));
        }
        let size = size as usize;
        if size > self.limits.max_container_size {
            return Err(MessageDecodeError::TooLargeContainer(what, size));
        }
        Ok(size)
    }

    /// Hand a finished value to the innermost open construct, folding
    /// up completed containers iteratively.
    fn deliver(&mut self, value: FieldData) {
        let mut value = value;
        loop {
            let completed = match self.stack.last_mut() {
                None => return,
                Some(Frame::Struct { st, pending }) => {
                    if let Some((field_type, id)) = pending.take() {
                        st.fields.push(ThriftField {
                            name: Vec::new(),
                            field_type,
                            id,
                            data: value,
                        });
                    }
                    self.state = DecodeState::FieldBegin;
                    return;
                }
                Some(Frame::Map {
                    key_type,
                    value_type,
                    remaining,
                    entries,
                    key,
                }) => match key.take() {
                    None => {
                        *key = Some(value);
                        self.state = DecodeState::Value(*value_type);
                        return;
                    }
                    Some(k) => {
                        entries.push((k, value));
                        *remaining -= 1;
                        if *remaining > 0 {
                            self.state = DecodeState::Value(*key_type);
                            return;
                        }
                        FieldData::Map(ThriftMap {
                            key_type: *key_type,
                            value_type: *value_type,
                            entries: std::mem::take(entries),
                        })
                    }
                },
                Some(Frame::List {
                    elem_type,
                    remaining,
                    elems,
                }) => {
                    elems.push(value);
                    *remaining -= 1;
                    if *remaining > 0 {
                        self.state = DecodeState::Value(*elem_type);
                        return;
                    }
                    FieldData::List(ThriftList {
                        elem_type: *elem_type,
                        elems: std::mem::take(elems),
                    })
                }
                Some(Frame::Set {
                    elem_type,
                    remaining,
                    elems,
                }) => {
                    elems.push(value);
                    *remaining -= 1;
                    if *remaining > 0 {
                        self.state = DecodeState::Value(*elem_type);
                        return;
                    }
                    FieldData::Set(ThriftSet {
                        elem_type: *elem_type,
                        elems: std::mem::take(elems),
                    })
                }
            };
            self.stack.pop();
            value = completed;
        }
    }
}

fn parse_elem_type(tag: u8, what: &'static str) -> Result<FieldType, MessageDecodeError> {
    match FieldType::parse(tag) {
        Some(FieldType::Stop) | None => Err(MessageDecodeError::InvalidElementType(what, tag)),
        Some(t) => Ok(t),
    }
}
