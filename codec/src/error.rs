//! Typed failures for encode and decode operations.

use thiserror::Error;

/// Failure while encoding or decoding a wire value.
#[derive(Error, Debug)]
pub enum Error {
    /// The buffer ended before the value did.
    #[error("unexpected end of buffer")]
    EndOfBuffer,
    /// The value parsed but left bytes behind.
    #[error("{0} trailing bytes")]
    ExtraData(usize),
    /// A field held bytes that do not form a valid value. Carries the type
    /// and a short description.
    #[error("invalid data in {0}: {1}")]
    Invalid(&'static str, &'static str),
    /// A length field exceeded its allowed maximum.
    #[error("length exceeded: {0} > {1}")]
    LengthExceeded(usize, usize),
    /// A varint ran past its maximum width or held a non-canonical padding
    /// byte.
    #[error("invalid varint")]
    InvalidVarint,
}
