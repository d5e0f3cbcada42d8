// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

use std::fmt;

/// Errors that can arise while framing, decoding, dispatching, or transporting an RPC call.
#[derive(Debug)]
pub enum Error {
    /// Bad magic, short read, length-prefix mismatch, or an unknown serialize/compress type.
    Framing(FramingError),

    /// `Codec::encode`/`decode` failed on a payload.
    Codec(CodecError),

    /// Unknown class, unknown method, arity mismatch, or a user-handler error.
    Dispatch(DispatchError),

    /// Dial, read, or write failure.
    Transport(std::io::Error),

    /// Registry returned a non-200 response or the request itself failed.
    Registry(RegistryError),

    /// Duplicate self-registration, or a malformed service path.
    Lifecycle(LifecycleError),
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Framing(e) => write!(f, "framing error: {e}"),
            Self::Codec(e) => write!(f, "codec error: {e}"),
            Self::Dispatch(e) => write!(f, "dispatch error: {e}"),
            Self::Transport(e) => write!(f, "transport error: {e}"),
            Self::Registry(e) => write!(f, "registry error: {e}"),
            Self::Lifecycle(e) => write!(f, "lifecycle error: {e}"),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Transport(e)
    }
}

impl From<FramingError> for Error {
    fn from(e: FramingError) -> Self {
        Self::Framing(e)
    }
}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

impl From<DispatchError> for Error {
    fn from(e: DispatchError) -> Self {
        Self::Dispatch(e)
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Self::Registry(e)
    }
}

impl From<LifecycleError> for Error {
    fn from(e: LifecycleError) -> Self {
        Self::Lifecycle(e)
    }
}

#[derive(Debug)]
pub enum FramingError {
    BadMagic(u8),
    ShortRead { expected: usize, got: usize },
    LengthPrefixOverflow { field_len: u32, remaining: u32 },
    TrailingBytes { body_len: u32, consumed: u32 },
    UnknownCompressType(u8),
    UnknownSerializeType(u8),
    UnknownMsgType(u8),
    Io(std::io::Error),
}

impl std::error::Error for FramingError {}

impl fmt::Display for FramingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadMagic(b) => write!(f, "bad magic byte: {b:#04x}"),
            Self::ShortRead { expected, got } => {
                write!(f, "short read: expected {expected} bytes, got {got}")
            }
            Self::LengthPrefixOverflow {
                field_len,
                remaining,
            } => write!(
                f,
                "length prefix {field_len} exceeds remaining body length {remaining}"
            ),
            Self::TrailingBytes { body_len, consumed } => write!(
                f,
                "body length {body_len} does not match sum of field lengths {consumed}"
            ),
            Self::UnknownCompressType(b) => write!(f, "unknown compress_type byte: {b}"),
            Self::UnknownSerializeType(b) => write!(f, "unknown serialize_type byte: {b}"),
            Self::UnknownMsgType(b) => write!(f, "unknown msg_type byte: {b}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl From<std::io::Error> for FramingError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

#[derive(Debug)]
pub enum CodecError {
    UnsupportedValue(&'static str),
    Malformed(String),
}

impl std::error::Error for CodecError {}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedValue(kind) => write!(f, "value not representable: {kind}"),
            Self::Malformed(msg) => write!(f, "malformed payload: {msg}"),
        }
    }
}

#[derive(Debug)]
pub enum DispatchError {
    UnknownClass(String),
    UnknownMethod(String),
    ArityMismatch { expected: usize, got: usize },
    Handler(String),
}

impl std::error::Error for DispatchError {}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownClass(c) => write!(f, "unknown service class: {c}"),
            Self::UnknownMethod(m) => write!(f, "method not found: {m}"),
            Self::ArityMismatch { expected, got } => {
                write!(f, "argument count mismatch: expected {expected}, got {got}")
            }
            Self::Handler(msg) => write!(f, "handler error: {msg}"),
        }
    }
}

#[derive(Debug)]
pub enum RegistryError {
    Transport(String),
    NonSuccess { code: u32, message: String },
}

impl std::error::Error for RegistryError {}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "registry request failed: {msg}"),
            Self::NonSuccess { code, message } => {
                write!(f, "registry returned code {code}: {message}")
            }
        }
    }
}

impl From<ureq::Error> for RegistryError {
    fn from(e: ureq::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

#[derive(Debug)]
pub enum LifecycleError {
    DuplicateRegistration(String),
    InvalidServicePath(String),
}

impl std::error::Error for LifecycleError {}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateRegistration(appid) => {
                write!(f, "appid already registered: {appid}")
            }
            Self::InvalidServicePath(path) => write!(f, "invalid service path: {path}"),
        }
    }
}
