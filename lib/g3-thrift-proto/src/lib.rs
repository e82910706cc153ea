/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2026 G3-OSS developers.
 */

//! Thrift binary protocol codec with a bidirectional mapping onto a
//! dynamically typed term algebra.
//!
//! The wire surface is standard thrift binary protocol. On top of it,
//! messages named `$UBF` carry terms packed into envelope structs, so
//! a session can exchange rich values with a peer while staying
//! byte-compatible with plain thrift clients. Decoding is incremental
//! and suspends across arbitrary chunk boundaries.

mod types;
pub use types::{FieldType, MessageType};

mod value;
pub use value::{
    FieldData, ThriftField, ThriftList, ThriftMap, ThriftMessage, ThriftSet, ThriftStruct,
};

mod binary;
pub use binary::{
    BinaryMessageDecoder, BinaryMessageEncoder, DecodeLimits, DecodeOutcome, DecodedMessage,
    MessageDecodeError, ThriftEncodeError,
};

mod bridge;
pub use bridge::{TERM_MESSAGE_NAME, TermDecodeError, struct_to_term, term_to_struct};

mod session;
pub use session::{
    PROTO_DRIVER, PROTO_PACKET_TYPE, PROTO_VERSION, SessionCodec, SessionConfig,
    SessionDecodeError, SessionDecoder, SessionEncodeError, SessionMessage, SessionPayload,
    SessionPoll, SessionRole,
};
