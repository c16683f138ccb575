//! Encode and decode binary wire structures.
//!
//! # Overview
//!
//! A small binary serialization library designed to:
//! - Serialize structured data into a compact, unambiguous binary format
//! - Deserialize untrusted binary input into structured data
//!
//! All multi-byte integers are big-endian. Types implement [`Write`] and
//! [`Read`]; [`Encode`] and [`Decode`] are provided on top of them, with
//! [`Decode`] requiring that the input buffer is fully consumed. Types with a
//! constant encoded length additionally implement [`FixedSize`].
//!
//! # Example
//!
//! ```
//! use bytes::{Buf, BufMut};
//! use hawser_codec::{Decode, Encode, Error, FixedSize, Read, Write};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Point {
//!     x: u32,
//!     y: u32,
//! }
//!
//! impl Write for Point {
//!     fn write(&self, buf: &mut impl BufMut) {
//!         self.x.write(buf);
//!         self.y.write(buf);
//!     }
//! }
//!
//! impl Read for Point {
//!     fn read(buf: &mut impl Buf) -> Result<Self, Error> {
//!         let x = u32::read(buf)?;
//!         let y = u32::read(buf)?;
//!         Ok(Self { x, y })
//!     }
//! }
//!
//! impl FixedSize for Point {
//!     const SIZE: usize = u32::SIZE + u32::SIZE;
//! }
//!
//! let point = Point { x: 7, y: 9 };
//! let encoded = point.encode();
//! assert_eq!(encoded.len(), Point::SIZE);
//! assert_eq!(Point::decode(encoded).unwrap(), point);
//! ```

pub mod codec;
pub mod error;
pub mod primitives;
pub mod varint;

// Re-export main types and traits
pub use codec::{at_least, Decode, Encode, EncodeSize, FixedSize, Read, Write};
pub use error::Error;
