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
//! Models that delay the messages they receive.
use super::Atomic;
use crate::context::*;
use crate::error::*;
use crate::message::*;
use crate::ports::*;
use crate::sim_time::*;
use crate::sources::*;
use std::collections::VecDeque;

pub const QUEUE_IN_PORT: PortIndex = 0;
pub const QUEUE_OUT_PORT: PortIndex = 0;

// Messages waiting to be emitted along with the time they are due.
#[derive(Clone, Debug, Default)]
struct Pending
{
	entries: VecDeque<(Time, Message)>,
}

impl Pending
{
	fn clear(&mut self)
	{
		self.entries.clear();
	}

	fn len(&self) -> usize
	{
		self.entries.len()
	}

	fn push_back(&mut self, due: Time, message: Message)
	{
		self.entries.push_back((due, message));
	}

	// Messages due at the same time keep their arrival order.
	fn insert_sorted(&mut self, due: Time, message: Message)
	{
		let index = self.entries.iter().position(|&(t, _)| t > due).unwrap_or(self.entries.len());
		self.entries.insert(index, (due, message));
	}

	// The front entries that are emitted together: everything due no later
	// than the head.
	fn due(&self) -> impl Iterator<Item = &(Time, Message)> + '_
	{
		let head = self.entries.front().map_or(INFINITY, |e| e.0);
		self.entries.iter().take_while(move |e| e.0 <= head)
	}

	fn pop_due(&mut self)
	{
		let n = self.due().count();
		self.entries.drain(..n);
	}

	fn sigma(&self, now: Time) -> Time
	{
		match self.entries.front() {
			Some(&(due, _)) => (due - now).max(0.0),
			None => INFINITY,
		}
	}

	fn emit(&self, outputs: &mut Outputs)
	{
		for &(_, message) in self.due() {
			outputs.send(QUEUE_OUT_PORT, message);
		}
	}
}

/// Re-emits every message it receives ta time units later.
#[derive(Clone, Debug)]
pub struct Queue
{
	pub ta: Time,
	pending: Pending,
	sigma: Time,
}

impl Queue
{
	pub fn new(ta: Time) -> Queue
	{
		assert!(ta > 0.0 && ta.is_finite(), "queue ta ({}) should be positive", ta);
		Queue {ta, pending: Pending::default(), sigma: INFINITY}
	}

	/// Number of messages waiting to be emitted.
	pub fn len(&self) -> usize
	{
		self.pending.len()
	}

	pub fn is_empty(&self) -> bool
	{
		self.pending.len() == 0
	}
}

impl Default for Queue
{
	fn default() -> Queue
	{
		Queue::new(1.0)
	}
}

impl Atomic for Queue
{
	const INPUTS: &'static [PortType] = &[PortType::Generic];
	const OUTPUTS: &'static [PortType] = &[PortType::Generic];

	fn initialize(&mut self, _ctx: &mut Context) -> Result<()>
	{
		self.pending.clear();
		self.sigma = INFINITY;
		Ok(())
	}

	fn internal(&mut self, ctx: &mut Context) -> Result<()>
	{
		self.pending.pop_due();
		self.sigma = self.pending.sigma(ctx.t);
		Ok(())
	}

	fn external(&mut self, ctx: &mut Context, _e: Time, inputs: Inputs) -> Result<()>
	{
		for message in inputs.on(QUEUE_IN_PORT) {
			self.pending.push_back(ctx.t + self.ta, *message);
		}
		self.sigma = self.pending.sigma(ctx.t);
		Ok(())
	}

	fn lambda(&self, outputs: &mut Outputs)
	{
		self.pending.emit(outputs);
	}

	fn ta(&self) -> Time
	{
		self.sigma
	}

	fn observation(&self) -> Message
	{
		Message::new(self.pending.len() as f64)
	}
}

// Pulls the delay for a message. None means the source is exhausted and the
// queue should stop accepting messages.
fn next_delay(ctx: &mut Context, source: &mut Source, stop_on_error: bool, last: &mut Time) -> Result<Option<Time>>
{
	match ctx.sources.next_value(source) {
		Ok(ta) if is_valid_ta(ta) => {
			*last = ta;
			Ok(Some(ta))
		},
		Ok(ta) => Err(Error::ModelNegativeTa {model: ctx.id, ta}),
		Err(err @ Error::SourceEmpty {..}) => {
			if stop_on_error || last.is_infinite() {
				ctx.log_info(&format!("dropping messages: {}", err));
				Ok(None)
			} else {
				Ok(Some(*last))
			}
		},
		Err(err) => Err(err),
	}
}

/// Like `Queue` but each message's delay is pulled from an external source.
/// Messages are emitted in arrival order.
#[derive(Clone, Debug)]
pub struct DynamicQueue
{
	pub source_ta: Source,

	/// When the source runs dry drop new messages, otherwise reuse the last
	/// delay.
	pub stop_on_error: bool,
	pending: Pending,
	last_ta: Time,
	stopped: bool,
	sigma: Time,
}

impl DynamicQueue
{
	pub fn new(source_ta: Source, stop_on_error: bool) -> DynamicQueue
	{
		DynamicQueue {source_ta, stop_on_error, pending: Pending::default(), last_ta: INFINITY, stopped: false, sigma: INFINITY}
	}

	pub fn len(&self) -> usize
	{
		self.pending.len()
	}

	pub fn is_empty(&self) -> bool
	{
		self.pending.len() == 0
	}
}

impl Atomic for DynamicQueue
{
	const INPUTS: &'static [PortType] = &[PortType::Generic];
	const OUTPUTS: &'static [PortType] = &[PortType::Generic];

	fn initialize(&mut self, ctx: &mut Context) -> Result<()>
	{
		ctx.sources.initialize(&mut self.source_ta)?;
		self.pending.clear();
		self.last_ta = INFINITY;
		self.stopped = false;
		self.sigma = INFINITY;
		Ok(())
	}

	fn internal(&mut self, ctx: &mut Context) -> Result<()>
	{
		self.pending.pop_due();
		self.sigma = self.pending.sigma(ctx.t);
		Ok(())
	}

	fn external(&mut self, ctx: &mut Context, _e: Time, inputs: Inputs) -> Result<()>
	{
		for message in inputs.on(QUEUE_IN_PORT) {
			if self.stopped {
				break;
			}
			match next_delay(ctx, &mut self.source_ta, self.stop_on_error, &mut self.last_ta)? {
				Some(delay) => self.pending.push_back(ctx.t + delay, *message),
				None => self.stopped = true,
			}
		}
		self.sigma = self.pending.sigma(ctx.t);
		Ok(())
	}

	fn lambda(&self, outputs: &mut Outputs)
	{
		self.pending.emit(outputs);
	}

	fn ta(&self) -> Time
	{
		self.sigma
	}

	fn observation(&self) -> Message
	{
		Message::new(self.pending.len() as f64)
	}

	fn finalize(&mut self, ctx: &mut Context)
	{
		ctx.sources.finalize(&mut self.source_ta);
	}
}

/// Like `DynamicQueue` but messages are emitted in due time order.
#[derive(Clone, Debug)]
pub struct PriorityQueue
{
	pub source_ta: Source,
	pub stop_on_error: bool,
	pending: Pending,
	last_ta: Time,
	stopped: bool,
	sigma: Time,
}

impl PriorityQueue
{
	pub fn new(source_ta: Source, stop_on_error: bool) -> PriorityQueue
	{
		PriorityQueue {source_ta, stop_on_error, pending: Pending::default(), last_ta: INFINITY, stopped: false, sigma: INFINITY}
	}

	pub fn len(&self) -> usize
	{
		self.pending.len()
	}

	pub fn is_empty(&self) -> bool
	{
		self.pending.len() == 0
	}
}

impl Atomic for PriorityQueue
{
	const INPUTS: &'static [PortType] = &[PortType::Generic];
	const OUTPUTS: &'static [PortType] = &[PortType::Generic];

	fn initialize(&mut self, ctx: &mut Context) -> Result<()>
	{
		ctx.sources.initialize(&mut self.source_ta)?;
		self.pending.clear();
		self.last_ta = INFINITY;
		self.stopped = false;
		self.sigma = INFINITY;
		Ok(())
	}

	fn internal(&mut self, ctx: &mut Context) -> Result<()>
	{
		self.pending.pop_due();
		self.sigma = self.pending.sigma(ctx.t);
		Ok(())
	}

	fn external(&mut self, ctx: &mut Context, _e: Time, inputs: Inputs) -> Result<()>
	{
		for message in inputs.on(QUEUE_IN_PORT) {
			if self.stopped {
				break;
			}
			match next_delay(ctx, &mut self.source_ta, self.stop_on_error, &mut self.last_ta)? {
				Some(delay) => self.pending.insert_sorted(ctx.t + delay, *message),
				None => self.stopped = true,
			}
		}
		self.sigma = self.pending.sigma(ctx.t);
		Ok(())
	}

	fn lambda(&self, outputs: &mut Outputs)
	{
		self.pending.emit(outputs);
	}

	fn ta(&self) -> Time
	{
		self.sigma
	}

	fn observation(&self) -> Message
	{
		Message::new(self.pending.len() as f64)
	}

	fn finalize(&mut self, ctx: &mut Context)
	{
		ctx.sources.finalize(&mut self.source_ta);
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::dynamics::testing::*;

	#[test]
	fn queues_delay_messages()
	{
		let mut bench = Bench::new();
		let mut queue = Queue::new(2.0);
		queue.initialize(&mut bench.context()).unwrap();
		assert_eq!(queue.ta(), INFINITY);

		send(&mut bench, &mut queue, 1.0, &[(QUEUE_IN_PORT, Message::new(1.0)), (QUEUE_IN_PORT, Message::new(2.0))]);
		assert_eq!(queue.ta(), 2.0);
		send(&mut bench, &mut queue, 0.5, &[(QUEUE_IN_PORT, Message::new(3.0))]);
		assert_eq!(queue.ta(), 1.5);
		assert_eq!(queue.len(), 3);

		assert_eq!(fire(&mut bench, &mut queue), vec![(QUEUE_OUT_PORT, Message::new(1.0)), (QUEUE_OUT_PORT, Message::new(2.0))]);
		assert_eq!(bench.t, 3.0);
		assert_eq!(queue.ta(), 0.5);
		assert_eq!(fire(&mut bench, &mut queue), vec![(QUEUE_OUT_PORT, Message::new(3.0))]);
		assert!(queue.is_empty());
		assert_eq!(queue.ta(), INFINITY);
	}

	#[test]
	fn dynamic_queues_keep_arrival_order()
	{
		let mut bench = Bench::new();
		let delays = bench.sources.alloc_constant(&[3.0, 1.0]).unwrap();
		let mut queue = DynamicQueue::new(Source::constant(delays), true);
		queue.initialize(&mut bench.context()).unwrap();

		send(&mut bench, &mut queue, 0.0, &[(QUEUE_IN_PORT, Message::new(1.0)), (QUEUE_IN_PORT, Message::new(2.0))]);
		assert_eq!(queue.ta(), 3.0);
		assert_eq!(fire(&mut bench, &mut queue), vec![(QUEUE_OUT_PORT, Message::new(1.0)), (QUEUE_OUT_PORT, Message::new(2.0))]);
		assert_eq!(queue.ta(), INFINITY);
	}

	#[test]
	fn priority_queues_sort_by_due_time()
	{
		let mut bench = Bench::new();
		let delays = bench.sources.alloc_constant(&[3.0, 1.0, 1.0]).unwrap();
		let mut queue = PriorityQueue::new(Source::constant(delays), true);
		queue.initialize(&mut bench.context()).unwrap();

		send(&mut bench, &mut queue, 0.0, &[
			(QUEUE_IN_PORT, Message::new(1.0)),
			(QUEUE_IN_PORT, Message::new(2.0)),
			(QUEUE_IN_PORT, Message::new(3.0))]);
		assert_eq!(queue.ta(), 1.0);
		assert_eq!(fire(&mut bench, &mut queue), vec![(QUEUE_OUT_PORT, Message::new(2.0)), (QUEUE_OUT_PORT, Message::new(3.0))]);
		assert_eq!(queue.ta(), 2.0);
		assert_eq!(fire(&mut bench, &mut queue), vec![(QUEUE_OUT_PORT, Message::new(1.0))]);
	}

	#[test]
	fn negative_delays_are_errors()
	{
		let mut bench = Bench::new();
		let delays = bench.sources.alloc_constant(&[-1.0]).unwrap();
		let mut queue = PriorityQueue::new(Source::constant(delays), true);
		queue.initialize(&mut bench.context()).unwrap();

		let deliveries = deliveries(&[(QUEUE_IN_PORT, Message::new(1.0))]);
		let err = queue.external(&mut bench.context(), 0.0, Inputs::new(&deliveries)).unwrap_err();
		assert!(matches!(err, Error::ModelNegativeTa {..}));
	}
}
