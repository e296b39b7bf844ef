/*!
Typed, fixed-size pixel buffers.

A [`Buffer`] is allocated once at its final length and never grows or
shrinks; a geometry change releases it and builds a new one. Elements are
[`bytemuck`] types so a whole buffer can be handed to a surface or an encoder
as raw bytes.
*/

use std::{
    marker::PhantomData,
    mem::size_of,
    ops::{Deref, DerefMut},
};

use log::debug;

pub struct Buffer<A> {
    label: Option<&'static str>,
    contents: Box<[A]>,
}

impl<A: bytemuck::Pod + bytemuck::Zeroable> Buffer<A> {
    pub fn label(&self) -> Option<&'static str> {
        self.label
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.contents)
    }

    pub fn size_in_bytes(&self) -> usize {
        self.contents.len() * size_of::<A>()
    }

    pub fn destroy(self) {
        debug!(
            "releasing {} buffer ({} bytes)",
            self.label.unwrap_or("unlabelled"),
            self.size_in_bytes()
        );
    }
}

impl<A> Deref for Buffer<A> {
    type Target = [A];

    fn deref(&self) -> &Self::Target {
        &self.contents
    }
}

impl<A> DerefMut for Buffer<A> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.contents
    }
}

pub struct Builder<A> {
    label: Option<&'static str>,
    len: usize,
    phantom_data: PhantomData<A>,
}

impl<A: bytemuck::Pod + bytemuck::Zeroable> Builder<A> {
    pub fn new(len: usize) -> Self {
        Self {
            label: None,
            len,
            phantom_data: PhantomData,
        }
    }

    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = Some(label);
        self
    }

    /// Allocate a zeroed buffer of exactly `len` elements.
    pub fn create(self) -> Buffer<A> {
        debug!(
            "allocating {} buffer ({} elements)",
            self.label.unwrap_or("unlabelled"),
            self.len
        );
        Buffer {
            label: self.label,
            contents: vec![A::zeroed(); self.len].into_boxed_slice(),
        }
    }
}
