/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2026 G3-OSS developers.
 */

/// Message type as carried in the message header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageType {
    Call,
    Reply,
    Exception,
    Oneway,
}

impl MessageType {
    pub fn parse(v: u8) -> Option<Self> {
        match v {
            1 => Some(MessageType::Call),
            2 => Some(MessageType::Reply),
            3 => Some(MessageType::Exception),
            4 => Some(MessageType::Oneway),
            _ => None,
        }
    }

    pub fn wire_tag(&self) -> u8 {
        match self {
            MessageType::Call => 1,
            MessageType::Reply => 2,
            MessageType::Exception => 3,
            MessageType::Oneway => 4,
        }
    }
}

/// Wire type tag of a field or container element.
///
/// `Byte` and `I8` share the same one-octet wire encoding but keep
/// distinct tag values, so a value decoded through tag 3 surfaces as an
/// opaque octet while tag 5 surfaces as a signed integer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldType {
    Stop,
    Void,
    Bool,
    Byte,
    Double,
    I8,
    I16,
    I32,
    U64,
    I64,
    Binary,
    Struct,
    Map,
    Set,
    List,
}

impl FieldType {
    pub fn parse(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(FieldType::Stop),
            1 => Some(FieldType::Void),
            2 => Some(FieldType::Bool),
            3 => Some(FieldType::Byte),
            4 => Some(FieldType::Double),
            5 => Some(FieldType::I8),
            6 => Some(FieldType::I16),
            8 => Some(FieldType::I32),
            9 => Some(FieldType::U64),
            10 => Some(FieldType::I64),
            11 => Some(FieldType::Binary),
            12 => Some(FieldType::Struct),
            13 => Some(FieldType::Map),
            14 => Some(FieldType::Set),
            15 => Some(FieldType::List),
            _ => None,
        }
    }

    pub fn wire_tag(&self) -> u8 {
        match self {
            FieldType::Stop => 0,
            FieldType::Void => 1,
            FieldType::Bool => 2,
            FieldType::Byte => 3,
            FieldType::Double => 4,
            FieldType::I8 => 5,
            FieldType::I16 => 6,
            FieldType::I32 => 8,
            FieldType::U64 => 9,
            FieldType::I64 => 10,
            FieldType::Binary => 11,
            FieldType::Struct => 12,
            FieldType::Map => 13,
            FieldType::Set => 14,
            FieldType::List => 15,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_type_tags() {
        for tag in 0u8..=255 {
            match FieldType::parse(tag) {
                Some(t) => assert_eq!(t.wire_tag(), tag),
                None => assert!(tag == 7 || tag > 15),
            }
        }

        assert_eq!(FieldType::parse(3), Some(FieldType::Byte));
        assert_eq!(FieldType::parse(4), Some(FieldType::Double));
        assert_eq!(FieldType::parse(5), Some(FieldType::I8));
    }

    #[test]
    fn message_type_tags() {
        for tag in 0u8..=255 {
            match MessageType::parse(tag) {
                Some(t) => assert_eq!(t.wire_tag(), tag),
                None => assert!(tag == 0 || tag > 4),
            }
        }
    }
}
