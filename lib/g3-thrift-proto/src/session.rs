/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2026 G3-OSS developers.
 */

use std::sync::Arc;

use log::trace;
use thiserror::Error;

use g3_term_types::{ContractRegistry, Term};

use crate::binary::{
    BinaryMessageDecoder, BinaryMessageEncoder, DecodeLimits, DecodeOutcome, MessageDecodeError,
    ThriftEncodeError,
};
use crate::bridge::{self, TERM_MESSAGE_NAME, TermDecodeError};
use crate::types::MessageType;
use crate::value::ThriftMessage;

/// Protocol identity reported to the session layer.
pub const PROTO_VERSION: &str = "tbf1.0";
pub const PROTO_DRIVER: &str = "tbf";
pub const PROTO_PACKET_TYPE: u8 = 0;

const DEFAULT_MAX_FRAME_SIZE: usize = 0x0400_0000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionRole {
    Client,
    Server,
}

/// Per-session codec parameters.
///
/// The role decides how outbound terms are typed and replaces any
/// ambient per-process state. A framed session carries each message
/// behind a big-endian u32 length prefix.
#[derive(Clone, Copy, Debug)]
pub struct SessionConfig {
    role: SessionRole,
    framed: bool,
    safe_decode: bool,
    versioned: bool,
    max_frame_size: usize,
    limits: DecodeLimits,
}

impl SessionConfig {
    pub fn new(role: SessionRole) -> Self {
        SessionConfig {
            role,
            framed: false,
            safe_decode: false,
            versioned: false,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            limits: DecodeLimits::default(),
        }
    }

    #[inline]
    pub fn role(&self) -> SessionRole {
        self.role
    }

    #[inline]
    pub fn framed(&self) -> bool {
        self.framed
    }

    pub fn set_framed(&mut self, framed: bool) {
        self.framed = framed;
    }

    /// Reject unknown atom names on decode instead of interning them.
    pub fn set_safe_decode(&mut self, safe: bool) {
        self.safe_decode = safe;
    }

    /// Emit versioned message headers.
    pub fn set_versioned(&mut self, versioned: bool) {
        self.versioned = versioned;
    }

    pub fn set_max_frame_size(&mut self, max: usize) {
        self.max_frame_size = max;
    }

    pub fn set_decode_limits(&mut self, limits: DecodeLimits) {
        self.limits = limits;
    }
}

/// A unit of traffic as seen by the session layer.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionPayload {
    /// A plain thrift message, passed through unchanged.
    Message(ThriftMessage),
    /// A term carried by a call or reply envelope.
    Value(Term),
    /// A term carried by a oneway event envelope.
    Event(Term),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionEncodeError {
    #[error("message encode failed: {0}")]
    Message(#[from] ThriftEncodeError),
    #[error("too large frame size {0}")]
    TooLargeFrame(usize),
}

#[derive(Debug, Error, PartialEq)]
pub enum SessionDecodeError {
    #[error("message decode failed: {0}")]
    Message(#[from] MessageDecodeError),
    #[error("term decode failed: {0}")]
    Term(#[from] TermDecodeError),
    #[error("too large frame size {0}")]
    TooLargeFrame(usize),
    #[error("framed message truncated")]
    TruncatedFrame,
}

/// One decoded unit plus the stream bytes that followed it.
#[derive(Debug)]
pub struct SessionMessage {
    pub payload: SessionPayload,
    pub remainder: Vec<u8>,
    pub versioned: bool,
}

#[derive(Debug)]
pub enum SessionPoll {
    Complete(SessionMessage),
    NeedMoreData,
}

/// Codec front end for one session.
///
/// Wraps outbound terms into envelope messages, unwraps inbound
/// envelope messages back into terms and passes everything else
/// through untouched. Replies carry the reply value only; there is no
/// state component on the wire.
pub struct SessionCodec {
    config: SessionConfig,
    registry: Arc<ContractRegistry>,
}

impl SessionCodec {
    pub fn new(config: SessionConfig, registry: Arc<ContractRegistry>) -> Self {
        SessionCodec { config, registry }
    }

    pub fn encode(
        &self,
        payload: &SessionPayload,
        buf: &mut Vec<u8>,
    ) -> Result<(), SessionEncodeError> {
        let wrapped;
        let msg = match payload {
            SessionPayload::Message(m) => m,
            SessionPayload::Value(term) => {
                wrapped = self.wrap(term, self.value_msg_type());
                &wrapped
            }
            SessionPayload::Event(term) => {
                wrapped = self.wrap(term, MessageType::Oneway);
                &wrapped
            }
        };

        let mut encoder = BinaryMessageEncoder::new();
        encoder.set_versioned(self.config.versioned);
        encoder.set_max_nesting_depth(self.config.limits.max_nesting_depth());

        if self.config.framed {
            let frame_start = buf.len();
            buf.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
            encoder.encode(msg, buf)?;
            let len = buf.len() - frame_start - 4;
            let Ok(frame_len) = u32::try_from(len) else {
                return Err(SessionEncodeError::TooLargeFrame(len));
            };
            buf[frame_start..frame_start + 4].copy_from_slice(&frame_len.to_be_bytes());
        } else {
            encoder.encode(msg, buf)?;
        }
        Ok(())
    }

    /// One-shot decode of a self-contained buffer.
    ///
    /// Suspended state is dropped; use [`new_decoder`](Self::new_decoder)
    /// when input arrives in chunks.
    pub fn decode(&self, data: &[u8]) -> Result<SessionPoll, SessionDecodeError> {
        self.new_decoder().decode(data)
    }

    pub fn new_decoder(&self) -> SessionDecoder {
        SessionDecoder {
            safe: self.config.safe_decode,
            framed: self.config.framed,
            max_frame_size: self.config.max_frame_size,
            failed: false,
            frame: Vec::new(),
            inner: BinaryMessageDecoder::new(self.config.limits),
            registry: Arc::clone(&self.registry),
        }
    }

    fn wrap(&self, term: &Term, msg_type: MessageType) -> ThriftMessage {
        ThriftMessage {
            name: TERM_MESSAGE_NAME.to_vec(),
            msg_type,
            seq_id: 0,
            payload: bridge::term_to_struct(term, &self.registry),
        }
    }

    fn value_msg_type(&self) -> MessageType {
        match self.config.role {
            SessionRole::Client => MessageType::Call,
            SessionRole::Server => MessageType::Reply,
        }
    }
}

/// Streaming decode front end for one session.
///
/// Single-owner continuation state; callers discard it after an error.
pub struct SessionDecoder {
    safe: bool,
    framed: bool,
    max_frame_size: usize,
    failed: bool,
    frame: Vec<u8>,
    inner: BinaryMessageDecoder,
    registry: Arc<ContractRegistry>,
}

impl SessionDecoder {
    pub fn decode(&mut self, data: &[u8]) -> Result<SessionPoll, SessionDecodeError> {
        if self.failed {
            return Err(MessageDecodeError::AlreadyFailed.into());
        }
        let r = if self.framed {
            self.decode_framed(data)
        } else {
            self.decode_stream(data)
        };
        if r.is_err() {
            self.failed = true;
        }
        r
    }

    fn decode_stream(&mut self, data: &[u8]) -> Result<SessionPoll, SessionDecodeError> {
        match self.inner.decode(data)? {
            DecodeOutcome::NeedMoreData => Ok(SessionPoll::NeedMoreData),
            DecodeOutcome::Complete(done) => {
                let payload = self.unwrap_message(done.message)?;
                Ok(SessionPoll::Complete(SessionMessage {
                    payload,
                    remainder: done.remainder,
                    versioned: done.versioned,
                }))
            }
        }
    }

    fn decode_framed(&mut self, data: &[u8]) -> Result<SessionPoll, SessionDecodeError> {
        if !data.is_empty() {
            self.frame.extend_from_slice(data);
        }
        if self.frame.len() < 4 {
            return Ok(SessionPoll::NeedMoreData);
        }
        let len =
            u32::from_be_bytes([self.frame[0], self.frame[1], self.frame[2], self.frame[3]])
                as usize;
        if len > self.max_frame_size {
            return Err(SessionDecodeError::TooLargeFrame(len));
        }
        if self.frame.len() < 4 + len {
            return Ok(SessionPoll::NeedMoreData);
        }

        let done = match self.inner.decode(&self.frame[4..4 + len])? {
            DecodeOutcome::Complete(done) => done,
            DecodeOutcome::NeedMoreData => return Err(SessionDecodeError::TruncatedFrame),
        };
        let mut remainder = done.remainder;
        remainder.extend_from_slice(&self.frame[4 + len..]);
        self.frame.clear();

        let payload = self.unwrap_message(done.message)?;
        Ok(SessionPoll::Complete(SessionMessage {
            payload,
            remainder,
            versioned: done.versioned,
        }))
    }

    fn unwrap_message(
        &self,
        message: ThriftMessage,
    ) -> Result<SessionPayload, SessionDecodeError> {
        if message.name != TERM_MESSAGE_NAME {
            trace!(
                "passing through thrift message for method {}",
                String::from_utf8_lossy(&message.name)
            );
            return Ok(SessionPayload::Message(message));
        }
        match message.msg_type {
            MessageType::Call | MessageType::Reply => {
                let term = bridge::struct_to_term(&message.payload, &self.registry, self.safe)?;
                Ok(SessionPayload::Value(term))
            }
            MessageType::Oneway => {
                let term = bridge::struct_to_term(&message.payload, &self.registry, self.safe)?;
                Ok(SessionPayload::Event(term))
            }
            MessageType::Exception => {
                // exception envelopes are not part of the term mapping
                trace!("passing through exception envelope message");
                Ok(SessionPayload::Message(message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldType;
    use crate::value::{FieldData, ThriftField, ThriftStruct};
    use hex_literal::hex;

    fn registry() -> Arc<ContractRegistry> {
        let mut r = ContractRegistry::new();
        r.add_record("point", &["x", "y"]);
        Arc::new(r)
    }

    fn decode_once(codec: &SessionCodec, data: &[u8]) -> SessionMessage {
        match codec.decode(data).unwrap() {
            SessionPoll::Complete(m) => m,
            SessionPoll::NeedMoreData => panic!("incomplete input"),
        }
    }

    #[test]
    fn client_wraps_value_as_call() {
        let codec = SessionCodec::new(SessionConfig::new(SessionRole::Client), registry());

        let mut buf = Vec::new();
        codec
            .encode(&SessionPayload::Value(Term::Int(5)), &mut buf)
            .unwrap();

        // name $UBF, type call, seq id 0, then the $N envelope struct
        assert_eq!(
            buf,
            hex!(
                "00 00 00 04 24 55 42 46 01 00 00 00 00"
                "00 00 00 02 24 4E"
                "0A 00 01 00 00 00 00 00 00 00 05"
                "00"
            )
        );
    }

    #[test]
    fn server_wraps_value_as_reply() {
        let codec = SessionCodec::new(SessionConfig::new(SessionRole::Server), registry());

        let mut buf = Vec::new();
        codec
            .encode(&SessionPayload::Value(Term::Bool(true)), &mut buf)
            .unwrap();
        assert_eq!(buf[8], MessageType::Reply.wire_tag());
    }

    #[test]
    fn event_wraps_as_oneway() {
        let codec = SessionCodec::new(SessionConfig::new(SessionRole::Client), registry());

        let mut buf = Vec::new();
        codec
            .encode(&SessionPayload::Event(Term::atom("tick")), &mut buf)
            .unwrap();
        assert_eq!(buf[8], MessageType::Oneway.wire_tag());

        let server = SessionCodec::new(SessionConfig::new(SessionRole::Server), registry());
        let m = decode_once(&server, &buf);
        assert_eq!(m.payload, SessionPayload::Event(Term::atom("tick")));
    }

    #[test]
    fn term_roundtrip_over_the_wire() {
        let client = SessionCodec::new(SessionConfig::new(SessionRole::Client), registry());
        let server = SessionCodec::new(SessionConfig::new(SessionRole::Server), registry());

        let term = Term::record(
            "point",
            vec![Term::Int(3), Term::Int(4)],
        );
        let mut buf = Vec::new();
        client
            .encode(&SessionPayload::Value(term.clone()), &mut buf)
            .unwrap();

        let m = decode_once(&server, &buf);
        assert_eq!(m.payload, SessionPayload::Value(term));
        assert!(m.remainder.is_empty());
    }

    #[test]
    fn term_roundtrip_in_safe_mode() {
        let mut config = SessionConfig::new(SessionRole::Server);
        config.set_safe_decode(true);
        let server = SessionCodec::new(config, registry());
        let client = SessionCodec::new(SessionConfig::new(SessionRole::Client), registry());

        // schema names are known atoms, this passes the safe check
        let term = Term::record("point", vec![Term::Int(1), Term::Int(2)]);
        let mut buf = Vec::new();
        client
            .encode(&SessionPayload::Value(term.clone()), &mut buf)
            .unwrap();
        assert_eq!(decode_once(&server, &buf).payload, SessionPayload::Value(term));

        // an unknown atom name fails
        let mut buf = Vec::new();
        client
            .encode(&SessionPayload::Value(Term::atom("mystery")), &mut buf)
            .unwrap();
        let mut decoder = server.new_decoder();
        assert_eq!(
            decoder.decode(&buf).unwrap_err(),
            SessionDecodeError::Term(TermDecodeError::UnknownAtom("mystery".to_string()))
        );
    }

    #[test]
    fn plain_messages_pass_through() {
        let codec = SessionCodec::new(SessionConfig::new(SessionRole::Server), registry());

        let msg = ThriftMessage {
            name: b"add".to_vec(),
            msg_type: MessageType::Call,
            seq_id: 9,
            payload: ThriftStruct {
                name: Vec::new(),
                fields: vec![ThriftField::new(FieldType::I32, 1, FieldData::I32(2))],
            },
        };
        let mut buf = Vec::new();
        codec
            .encode(&SessionPayload::Message(msg.clone()), &mut buf)
            .unwrap();

        let m = decode_once(&codec, &buf);
        assert_eq!(m.payload, SessionPayload::Message(msg));
    }

    #[test]
    fn versioned_header_is_used_when_configured() {
        let mut config = SessionConfig::new(SessionRole::Client);
        config.set_versioned(true);
        let codec = SessionCodec::new(config, registry());

        let mut buf = Vec::new();
        codec
            .encode(&SessionPayload::Value(Term::Int(1)), &mut buf)
            .unwrap();
        assert_eq!(&buf[..2], &[0x80, 0x01]);

        let m = decode_once(&codec, &buf);
        assert!(m.versioned);
    }

    #[test]
    fn chunked_session_decode() {
        let client = SessionCodec::new(SessionConfig::new(SessionRole::Client), registry());
        let server = SessionCodec::new(SessionConfig::new(SessionRole::Server), registry());

        let term = Term::List(vec![Term::Int(1), Term::String("x".to_string())]);
        let mut buf = Vec::new();
        client
            .encode(&SessionPayload::Value(term.clone()), &mut buf)
            .unwrap();

        let mut decoder = server.new_decoder();
        let mut complete = None;
        for chunk in buf.chunks(3) {
            match decoder.decode(chunk).unwrap() {
                SessionPoll::NeedMoreData => {}
                SessionPoll::Complete(m) => complete = Some(m),
            }
        }
        assert_eq!(complete.unwrap().payload, SessionPayload::Value(term));
    }

    #[test]
    fn framed_roundtrip() {
        let mut client_config = SessionConfig::new(SessionRole::Client);
        client_config.set_framed(true);
        let mut server_config = SessionConfig::new(SessionRole::Server);
        server_config.set_framed(true);
        let client = SessionCodec::new(client_config, registry());
        let server = SessionCodec::new(server_config, registry());

        let term = Term::Tuple(vec![Term::atom("get"), Term::Int(7)]);
        let mut buf = Vec::new();
        client
            .encode(&SessionPayload::Value(term.clone()), &mut buf)
            .unwrap();

        // length prefix covers everything behind it
        let frame_len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        assert_eq!(frame_len + 4, buf.len());

        // feed in small chunks across the frame boundary
        let mut decoder = server.new_decoder();
        let mut complete = None;
        for chunk in buf.chunks(5) {
            match decoder.decode(chunk).unwrap() {
                SessionPoll::NeedMoreData => {}
                SessionPoll::Complete(m) => complete = Some(m),
            }
        }
        let m = complete.unwrap();
        assert_eq!(m.payload, SessionPayload::Value(term));
        assert!(m.remainder.is_empty());
    }

    #[test]
    fn framed_size_bound() {
        let mut config = SessionConfig::new(SessionRole::Server);
        config.set_framed(true);
        config.set_max_frame_size(16);
        let codec = SessionCodec::new(config, registry());

        let mut decoder = codec.new_decoder();
        assert_eq!(
            decoder.decode(&hex!("00 00 00 11")).unwrap_err(),
            SessionDecodeError::TooLargeFrame(17)
        );
        // a failed decoder stays failed
        assert_eq!(
            decoder.decode(&[]).unwrap_err(),
            SessionDecodeError::Message(MessageDecodeError::AlreadyFailed)
        );
    }

    #[test]
    fn stream_remainder_keeps_following_message() {
        let client = SessionCodec::new(SessionConfig::new(SessionRole::Client), registry());
        let server = SessionCodec::new(SessionConfig::new(SessionRole::Server), registry());

        let mut buf = Vec::new();
        client
            .encode(&SessionPayload::Value(Term::Int(1)), &mut buf)
            .unwrap();
        client
            .encode(&SessionPayload::Value(Term::Int(2)), &mut buf)
            .unwrap();

        let first = decode_once(&server, &buf);
        assert_eq!(first.payload, SessionPayload::Value(Term::Int(1)));

        let second = decode_once(&server, &first.remainder);
        assert_eq!(second.payload, SessionPayload::Value(Term::Int(2)));
        assert!(second.remainder.is_empty());
    }
}
