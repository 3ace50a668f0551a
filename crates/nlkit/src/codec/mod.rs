//! Bounded TLV codec shared by every message family.
//!
//! A [`Format`] describes one record layout (header width, key type, where
//! the message length lives). [`Builder`] writes records into a caller
//! buffer; [`Attrs`] and [`AttrIter`] read them back without copying.

pub mod attr;
pub mod builder;
pub mod cursor;
pub mod reader;

pub use attr::{Attr, Format, MAX_ATTR_LEN, Scalar, is_zstr};
pub use builder::{AttrHandle, Builder, NestToken};
pub use cursor::{ALIGNTO, Cursor, Position, align, checked_align};
pub use reader::{AttrIter, Attrs};
