//! Attribute walking and strictly typed lookup.
//!
//! Nothing here trusts a length read from the buffer: every record is checked
//! against the end of the slice it was found in before its payload is sliced
//! out. A record that does not fit stops the walk; the walk never loops,
//! because each step moves forward by at least one header.

use std::marker::PhantomData;

use super::attr::{Attr, Format, Scalar};
use super::cursor::checked_align;

/// Iterator over the attribute records of a byte slice.
///
/// Cheap to clone, so a walk can be restarted from any point.
#[derive(Debug, Clone)]
pub struct AttrIter<'a, F: Format> {
    data: &'a [u8],
    pos: usize,
    malformed: bool,
    _format: PhantomData<F>,
}

impl<'a, F: Format> AttrIter<'a, F> {
    /// Create a new attribute iterator.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            malformed: false,
            _format: PhantomData,
        }
    }

    /// Check if the walk stopped on a record that did not fit.
    pub fn is_malformed(&self) -> bool {
        self.malformed
    }

    /// Check if the walk consumed every byte without error.
    pub fn is_finished(&self) -> bool {
        !self.malformed && self.pos == self.data.len()
    }

    fn fail(&mut self) -> Option<Attr<'a, F>> {
        self.malformed = true;
        self.pos = self.data.len();
        None
    }
}

impl<'a, F: Format> Iterator for AttrIter<'a, F> {
    type Item = Attr<'a, F>;

    fn next(&mut self) -> Option<Self::Item> {
        let end = self.data.len();
        if self.malformed || self.pos >= end {
            return None;
        }

        let rest = &self.data[self.pos..];
        if rest.len() < F::ATTR_HDRLEN {
            return self.fail();
        }
        let Some((len, key)) = F::read_attr_hdr(rest) else {
            return self.fail();
        };
        if len < F::ATTR_HDRLEN {
            return self.fail();
        }
        let next = match checked_align(len).and_then(|step| self.pos.checked_add(step)) {
            Some(next) if next <= end => next,
            _ => return self.fail(),
        };

        let payload = &rest[F::ATTR_HDRLEN..len];
        self.pos = next;
        Some(Attr::new(key, payload))
    }
}

/// A sequence of attributes: a message body or a nest payload.
#[derive(Debug, Clone, Copy)]
pub struct Attrs<'a, F: Format> {
    data: &'a [u8],
    _format: PhantomData<F>,
}

impl<'a, F: Format> Attrs<'a, F> {
    /// Wrap a byte slice without validating it up front.
    ///
    /// Lookups still bounds-check every record; a malformed tail simply
    /// hides whatever follows it.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            _format: PhantomData,
        }
    }

    /// Wrap a nest payload, requiring that its records tile it exactly.
    pub fn parse_nest(data: &'a [u8]) -> Option<Self> {
        let mut iter = AttrIter::<F>::new(data);
        iter.by_ref().for_each(drop);
        iter.is_finished().then(|| Self::new(data))
    }

    /// Raw bytes covered by this sequence.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    /// Check if the sequence holds no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Walk the records in order.
    pub fn iter(&self) -> AttrIter<'a, F> {
        AttrIter::new(self.data)
    }

    /// Check if every record fits and nothing trails the last one.
    pub fn is_clean(&self) -> bool {
        let mut iter = self.iter();
        iter.by_ref().for_each(drop);
        iter.is_finished()
    }

    /// First record with the given key.
    pub fn get(&self, key: F::Key) -> Option<Attr<'a, F>> {
        let key = F::kind(key);
        self.iter().find(|attr| attr.key() == key)
    }

    /// Fixed-width integer attribute.
    pub fn get_int<T: Scalar>(&self, key: F::Key) -> Option<T> {
        self.get(key)?.as_int()
    }

    /// `u8` attribute.
    pub fn get_u8(&self, key: F::Key) -> Option<u8> {
        self.get_int(key)
    }

    /// `u16` attribute.
    pub fn get_u16(&self, key: F::Key) -> Option<u16> {
        self.get_int(key)
    }

    /// `u32` attribute.
    pub fn get_u32(&self, key: F::Key) -> Option<u32> {
        self.get_int(key)
    }

    /// `i32` attribute.
    pub fn get_i32(&self, key: F::Key) -> Option<i32> {
        self.get_int(key)
    }

    /// `u64` attribute.
    pub fn get_u64(&self, key: F::Key) -> Option<u64> {
        self.get_int(key)
    }

    /// `i64` attribute.
    pub fn get_i64(&self, key: F::Key) -> Option<i64> {
        self.get_int(key)
    }

    /// NUL-terminated string attribute.
    pub fn get_str(&self, key: F::Key) -> Option<&'a str> {
        self.get(key)?.as_str()
    }

    /// Byte attribute of exactly `len` bytes.
    pub fn get_bytes(&self, key: F::Key, len: usize) -> Option<&'a [u8]> {
        self.get(key)?.as_bytes(len)
    }

    /// Byte attribute of any length.
    pub fn get_blob(&self, key: F::Key) -> Option<&'a [u8]> {
        self.get(key).map(|attr| attr.payload())
    }

    /// Flag attribute: present with an empty payload.
    pub fn get_flag(&self, key: F::Key) -> bool {
        self.get(key).is_some_and(|attr| attr.payload().is_empty())
    }

    /// Nested attribute sequence.
    pub fn get_nest(&self, key: F::Key) -> Option<Attrs<'a, F>> {
        self.get(key)?.as_nest()
    }
}

impl<'a, F: Format> IntoIterator for Attrs<'a, F> {
    type Item = Attr<'a, F>;
    type IntoIter = AttrIter<'a, F>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
