/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2026 G3-OSS developers.
 */

mod primitive;

mod encode;
pub use encode::{BinaryMessageEncoder, ThriftEncodeError};

mod decode;
pub use decode::{
    BinaryMessageDecoder, DecodeLimits, DecodeOutcome, DecodedMessage, MessageDecodeError,
};

pub(crate) const DEFAULT_MAX_NESTING_DEPTH: usize = 128;
