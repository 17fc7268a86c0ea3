// Copyright (C) 2017 Jesse Jones
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 3, or (at your option)
// any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program; if not, write to the Free Software Foundation,
// Inc., 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301, USA.
//! Fixed capacity slot arrays that hand out generation tagged identifiers.
//! Everything the kernel cross references (models, state machines, observers,
//! sources) lives in one of these so that a stale id can never resolve to an
//! unrelated object.
use crate::error::*;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::mem;

/// Implemented by the typed identifiers handed out by an `Arena`. The raw
/// value packs the generation into the high 32 bits and the slot index into
/// the low 32 bits. Generation 0 is never used so the all zero id is null.
pub trait Identifier: Copy + Eq + Ord + Hash + fmt::Debug + fmt::Display
{
	fn from_raw(raw: u64) -> Self;

	fn raw(self) -> u64;

	fn from_parts(generation: u32, index: u32) -> Self
	{
		Self::from_raw(((generation as u64) << 32) | index as u64)
	}

	fn generation(self) -> u32
	{
		(self.raw() >> 32) as u32
	}

	fn index(self) -> u32
	{
		self.raw() as u32
	}

	fn is_null(self) -> bool
	{
		self.generation() == 0
	}
}

/// Defines a new identifier type, e.g. `identifier!(ModelId, "M")`. The prefix
/// is used when formatting, so a model id displays as `M3.1` (index 3,
/// generation 1).
#[macro_export]
macro_rules! identifier
{
	($(#[$meta:meta])* $name:ident, $prefix:expr) => {
		$(#[$meta])*
		#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
		pub struct $name(pub u64);

		impl $crate::arena::Identifier for $name
		{
			fn from_raw(raw: u64) -> Self
			{
				$name(raw)
			}

			fn raw(self) -> u64
			{
				self.0
			}
		}

		impl ::std::fmt::Display for $name
		{
			fn fmt(&self, formatter: &mut ::std::fmt::Formatter) -> ::std::fmt::Result
			{
				use $crate::arena::Identifier;
				write!(formatter, "{}{}.{}", $prefix, self.index(), self.generation())
			}
		}
	};
}

enum Entry<T>
{
	Occupied(T),
	Free(Option<u32>),
}

struct Slot<T>
{
	generation: u32,
	entry: Entry<T>,
}

/// Slot array with a free list. Note that capacity is fixed when the arena is
/// created: callers that need to allocate several objects at once should use
/// `can_alloc` first so that they don't end up with a half built graph.
pub struct Arena<T, I: Identifier>
{
	name: &'static str,
	slots: Vec<Slot<T>>,
	free_head: Option<u32>,
	len: usize,
	capacity: usize,
	marker: PhantomData<I>,
}

impl<T, I: Identifier> Arena<T, I>
{
	/// The name is used in `NotEnoughMemory` errors.
	pub fn with_capacity(name: &'static str, capacity: usize) -> Arena<T, I>
	{
		assert!(capacity < u32::MAX as usize, "{} capacity ({}) is too large", name, capacity);
		Arena {
			name,
			slots: Vec::with_capacity(capacity),
			free_head: None,
			len: 0,
			capacity,
			marker: PhantomData,
		}
	}

	pub fn name(&self) -> &'static str
	{
		self.name
	}

	pub fn len(&self) -> usize
	{
		self.len
	}

	pub fn is_empty(&self) -> bool
	{
		self.len == 0
	}

	pub fn capacity(&self) -> usize
	{
		self.capacity
	}

	/// Returns true if n more objects can be allocated.
	pub fn can_alloc(&self, n: usize) -> bool
	{
		self.len + n <= self.capacity
	}

	pub fn alloc(&mut self, value: T) -> Result<I>
	{
		self.alloc_with(value).map(|(id, _)| id)
	}

	/// Like alloc but also returns a reference to the new object so that
	/// callers can finish filling it in.
	pub fn alloc_with(&mut self, value: T) -> Result<(I, &mut T)>
	{
		if !self.can_alloc(1) {
			return Err(Error::NotEnoughMemory(self.name));
		}

		let index = match self.free_head {
			Some(index) => {
				let slot = &mut self.slots[index as usize];
				self.free_head = match slot.entry {
					Entry::Free(next) => next,
					Entry::Occupied(_) => panic!("{} free list points at a live slot {}", self.name, index),
				};
				slot.entry = Entry::Occupied(value);
				index
			},
			None => {
				let index = self.slots.len() as u32;
				self.slots.push(Slot {generation: 1, entry: Entry::Occupied(value)});
				index
			},
		};
		self.len += 1;

		let slot = &mut self.slots[index as usize];
		let id = I::from_parts(slot.generation, index);
		match slot.entry {
			Entry::Occupied(ref mut value) => Ok((id, value)),
			Entry::Free(_) => unreachable!(),
		}
	}

	/// Releases the object. Stale ids (including the one passed in) will no
	/// longer resolve. Returns None if the id was already stale.
	pub fn free(&mut self, id: I) -> Option<T>
	{
		if !self.is_live(id) {
			return None;
		}

		let index = id.index();
		let slot = &mut self.slots[index as usize];
		slot.generation = slot.generation.wrapping_add(1);
		if slot.generation == 0 {
			slot.generation = 1;	// zero is reserved for null ids
		}
		let old = mem::replace(&mut slot.entry, Entry::Free(self.free_head));
		self.free_head = Some(index);
		self.len -= 1;

		match old {
			Entry::Occupied(value) => Some(value),
			Entry::Free(_) => unreachable!(),
		}
	}

	pub fn get(&self, id: I) -> Option<&T>
	{
		match self.slots.get(id.index() as usize) {
			Some(Slot {generation, entry: Entry::Occupied(value)}) if *generation == id.generation() => Some(value),
			_ => None,
		}
	}

	pub fn get_mut(&mut self, id: I) -> Option<&mut T>
	{
		match self.slots.get_mut(id.index() as usize) {
			Some(Slot {generation, entry: Entry::Occupied(value)}) if *generation == id.generation() => Some(value),
			_ => None,
		}
	}

	pub fn contains(&self, id: I) -> bool
	{
		self.get(id).is_some()
	}

	/// Recovers the id of an object stored within the arena. Returns None if
	/// the reference doesn't point into this arena.
	pub fn get_id(&self, value: &T) -> Option<I>
	{
		let size = mem::size_of::<Slot<T>>();
		let base = self.slots.as_ptr() as usize;
		let address = value as *const T as usize;
		if address < base || address >= base + size*self.slots.len() {
			return None;
		}

		let index = (address - base)/size;
		let slot = &self.slots[index];
		match slot.entry {
			Entry::Occupied(ref candidate) if candidate as *const T as usize == address => Some(I::from_parts(slot.generation, index as u32)),
			_ => None,
		}
	}

	/// Iterates over the live objects in index order.
	pub fn iter(&self) -> impl Iterator<Item = (I, &T)> + '_
	{
		self.slots.iter().enumerate().filter_map(|(index, slot)| match slot.entry {
			Entry::Occupied(ref value) => Some((I::from_parts(slot.generation, index as u32), value)),
			Entry::Free(_) => None,
		})
	}

	pub fn iter_mut(&mut self) -> impl Iterator<Item = (I, &mut T)> + '_
	{
		self.slots.iter_mut().enumerate().filter_map(|(index, slot)| match slot.entry {
			Entry::Occupied(ref mut value) => Some((I::from_parts(slot.generation, index as u32), value)),
			Entry::Free(_) => None,
		})
	}

	/// Snapshot of the live ids, handy when the arena has to be mutated
	/// while walking it.
	pub fn ids(&self) -> Vec<I>
	{
		self.iter().map(|(id, _)| id).collect()
	}

	/// Frees everything. Generations are bumped so that old ids stay stale.
	pub fn clear(&mut self)
	{
		for id in self.ids() {
			self.free(id);
		}
	}

	/// The high water mark, i.e. one past the largest index ever used.
	pub fn max_index(&self) -> usize
	{
		self.slots.len()
	}

	fn is_live(&self, id: I) -> bool
	{
		self.get(id).is_some()
	}
}
