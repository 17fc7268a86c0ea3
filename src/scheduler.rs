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
//! Priority queue of the models that have a finite time of next event.
use crate::model::ModelId;
use crate::sim_time::*;

/// Stable reference to a scheduled model. Handles remain valid until the model
/// is removed (or popped) even though the heap reorders itself.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct HeapHandle(u32);

#[derive(Clone, Debug)]
struct Node
{
	tn: Time,
	seq: u64,
	id: ModelId,
	pos: usize,		// index into heap
}

/// Binary min-heap keyed by (tn, insertion sequence). The sequence breaks ties
/// between models with the same tn so the pop order is deterministic.
pub struct Scheduler
{
	nodes: Vec<Node>,
	free: Vec<u32>,
	heap: Vec<u32>,		// node indexes
	next_seq: u64,
}

impl Scheduler
{
	pub fn with_capacity(capacity: usize) -> Scheduler
	{
		Scheduler {
			nodes: Vec::with_capacity(capacity),
			free: Vec::new(),
			heap: Vec::with_capacity(capacity),
			next_seq: 0,
		}
	}

	pub fn len(&self) -> usize
	{
		self.heap.len()
	}

	pub fn is_empty(&self) -> bool
	{
		self.heap.is_empty()
	}

	pub fn clear(&mut self)
	{
		self.nodes.clear();
		self.free.clear();
		self.heap.clear();
		self.next_seq = 0;
	}

	pub fn insert(&mut self, id: ModelId, tn: Time) -> HeapHandle
	{
		debug_assert!(!tn.is_nan(), "{} has a NaN tn", id);
		let seq = self.next_seq();
		let pos = self.heap.len();
		let node = Node {tn, seq, id, pos};
		let index = match self.free.pop() {
			Some(index) => {
				self.nodes[index as usize] = node;
				index
			},
			None => {
				self.nodes.push(node);
				(self.nodes.len() - 1) as u32
			},
		};
		self.heap.push(index);
		self.sift_up(pos);
		HeapHandle(index)
	}

	/// Changes the time of an already scheduled model. The model goes after
	/// any other models with the same tn.
	pub fn reschedule(&mut self, handle: HeapHandle, tn: Time)
	{
		debug_assert!(!tn.is_nan(), "{} has a NaN tn", self.nodes[handle.0 as usize].id);
		let seq = self.next_seq();
		let node = &mut self.nodes[handle.0 as usize];
		node.tn = tn;
		node.seq = seq;
		let pos = node.pos;
		self.sift_up(pos);
		let pos = self.nodes[handle.0 as usize].pos;
		self.sift_down(pos);
	}

	pub fn remove(&mut self, handle: HeapHandle) -> ModelId
	{
		let pos = self.nodes[handle.0 as usize].pos;
		debug_assert_eq!(self.heap[pos], handle.0, "heap is out of sync");
		let id = self.nodes[handle.0 as usize].id;

		let last = self.heap.len() - 1;
		self.swap(pos, last);
		self.heap.pop();
		self.free.push(handle.0);
		if pos < self.heap.len() {
			let moved = self.heap[pos] as usize;
			self.sift_up(pos);
			let pos = self.nodes[moved].pos;
			self.sift_down(pos);
		}
		id
	}

	/// The earliest scheduled model and its tn.
	pub fn peek(&self) -> Option<(Time, ModelId)>
	{
		self.heap.first().map(|&index| {
			let node = &self.nodes[index as usize];
			(node.tn, node.id)
		})
	}

	/// Time of the next event, INFINITY if nothing is scheduled.
	pub fn tn(&self) -> Time
	{
		self.peek().map_or(INFINITY, |(tn, _)| tn)
	}

	/// The tn and model of a handle that is still in the heap.
	pub fn entry(&self, handle: HeapHandle) -> Option<(Time, ModelId)>
	{
		let node = self.nodes.get(handle.0 as usize)?;
		if self.heap.get(node.pos) == Some(&handle.0) {
			Some((node.tn, node.id))
		} else {
			None
		}
	}

	pub fn tn_of(&self, handle: HeapHandle) -> Time
	{
		self.nodes[handle.0 as usize].tn
	}

	/// Removes every model whose tn is the minimum tn and appends them to
	/// imminents (in pop order). Returns the tn, INFINITY if nothing is
	/// scheduled.
	pub fn pop_imminents(&mut self, imminents: &mut Vec<ModelId>) -> Time
	{
		let tn = self.tn();
		while let Some(&index) = self.heap.first() {
			if self.nodes[index as usize].tn != tn {
				break;
			}
			let id = self.remove(HeapHandle(index));
			imminents.push(id);
		}
		tn
	}

	fn next_seq(&mut self) -> u64
	{
		let seq = self.next_seq;
		self.next_seq += 1;
		seq
	}

	fn less(&self, a: usize, b: usize) -> bool
	{
		let a = &self.nodes[self.heap[a] as usize];
		let b = &self.nodes[self.heap[b] as usize];
		a.tn < b.tn || (a.tn == b.tn && a.seq < b.seq)
	}

	fn swap(&mut self, a: usize, b: usize)
	{
		self.heap.swap(a, b);
		let ia = self.heap[a] as usize;
		let ib = self.heap[b] as usize;
		self.nodes[ia].pos = a;
		self.nodes[ib].pos = b;
	}

	fn sift_up(&mut self, mut pos: usize)
	{
		while pos > 0 {
			let parent = (pos - 1)/2;
			if !self.less(pos, parent) {
				break;
			}
			self.swap(pos, parent);
			pos = parent;
		}
	}

	fn sift_down(&mut self, mut pos: usize)
	{
		loop {
			let left = 2*pos + 1;
			let right = left + 1;
			let mut smallest = pos;
			if left < self.heap.len() && self.less(left, smallest) {
				smallest = left;
			}
			if right < self.heap.len() && self.less(right, smallest) {
				smallest = right;
			}
			if smallest == pos {
				break;
			}
			self.swap(pos, smallest);
			pos = smallest;
		}
	}

	#[cfg(test)]
	fn check(&self)
	{
		for (pos, &index) in self.heap.iter().enumerate() {
			assert_eq!(self.nodes[index as usize].pos, pos);
			if pos > 0 {
				assert!(!self.less(pos, (pos - 1)/2), "heap order violated at {}", pos);
			}
		}
	}
}
