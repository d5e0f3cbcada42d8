// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! Wire framing: header + length-prefixed body. See `message` for the frame
//! itself and `codec` for argument (de)serialization inside the payload.

pub mod codec;
pub mod envelope;
pub mod message;
pub mod path;

pub use codec::{codec_for, BinaryCodec, Codec, JsonCodec, Value};
pub use envelope::{unwrap_response, wrap_error, wrap_success};
pub use message::{CompressType, Header, MsgType, SerializeType, WireMessage, MAGIC};
pub use path::ServicePath;
