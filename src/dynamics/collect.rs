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
//! Sinks that summarize what they receive.
use super::Atomic;
use crate::context::*;
use crate::error::*;
use crate::message::*;
use crate::ports::*;
use crate::sim_time::*;

/// Counts every message it receives.
#[derive(Clone, Debug, Default)]
pub struct Counter
{
	number: u64,
}

impl Counter
{
	pub fn new() -> Counter
	{
		Counter {number: 0}
	}

	pub fn number(&self) -> u64
	{
		self.number
	}
}

impl Atomic for Counter
{
	const INPUTS: &'static [PortType] = &[PortType::Generic];
	const OUTPUTS: &'static [PortType] = &[];

	fn initialize(&mut self, _ctx: &mut Context) -> Result<()>
	{
		self.number = 0;
		Ok(())
	}

	fn internal(&mut self, _ctx: &mut Context) -> Result<()>
	{
		Ok(())
	}

	fn external(&mut self, ctx: &mut Context, _e: Time, inputs: Inputs) -> Result<()>
	{
		self.number += inputs.len() as u64;
		ctx.log_excessive(&format!("count is now {}", self.number));
		Ok(())
	}

	fn lambda(&self, _outputs: &mut Outputs)
	{
	}

	fn ta(&self) -> Time
	{
		INFINITY
	}

	fn observation(&self) -> Message
	{
		Message::new(self.number as f64)
	}
}

const ACCUMULATOR_LEN: usize = 2;

/// Input port of the enable signal for value i.
pub fn accumulator_enable_port(i: usize) -> PortIndex
{
	i
}

/// Input port of value i.
pub fn accumulator_value_port(i: usize) -> PortIndex
{
	ACCUMULATOR_LEN + i
}

/// Keeps the latest message from each value port and adds it to a running sum
/// whenever the matching enable port receives a true message.
#[derive(Clone, Debug, Default)]
pub struct Accumulator
{
	values: [f64; ACCUMULATOR_LEN],
	sum: f64,
}

impl Accumulator
{
	pub fn new() -> Accumulator
	{
		Accumulator {values: [0.0; ACCUMULATOR_LEN], sum: 0.0}
	}

	pub fn sum(&self) -> f64
	{
		self.sum
	}
}

impl Atomic for Accumulator
{
	const INPUTS: &'static [PortType] = &[PortType::Boolean, PortType::Boolean, PortType::Generic, PortType::Generic];
	const OUTPUTS: &'static [PortType] = &[];

	fn initialize(&mut self, _ctx: &mut Context) -> Result<()>
	{
		self.values = [0.0; ACCUMULATOR_LEN];
		self.sum = 0.0;
		Ok(())
	}

	fn internal(&mut self, _ctx: &mut Context) -> Result<()>
	{
		Ok(())
	}

	fn external(&mut self, _ctx: &mut Context, _e: Time, inputs: Inputs) -> Result<()>
	{
		// values first so that a value and its enable can arrive together
		for i in 0..ACCUMULATOR_LEN {
			if let Some(message) = inputs.last(accumulator_value_port(i)) {
				self.values[i] = message.value();
			}
		}
		for i in 0..ACCUMULATOR_LEN {
			for message in inputs.on(accumulator_enable_port(i)) {
				if message.is_true() {
					self.sum += self.values[i];
				}
			}
		}
		Ok(())
	}

	fn lambda(&self, _outputs: &mut Outputs)
	{
	}

	fn ta(&self) -> Time
	{
		INFINITY
	}

	fn observation(&self) -> Message
	{
		Message::new(self.sum)
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::dynamics::testing::*;

	#[test]
	fn counts_every_message()
	{
		let mut bench = Bench::new();
		let mut counter = Counter::new();
		counter.initialize(&mut bench.context()).unwrap();
		send(&mut bench, &mut counter, 1.0, &[(0, Message::new(1.0)), (0, Message::new(-3.0))]);
		send(&mut bench, &mut counter, 1.0, &[(0, Message::default())]);
		assert_eq!(counter.number(), 3);
		assert_eq!(counter.observation(), Message::new(3.0));
		assert_eq!(counter.ta(), INFINITY);
	}

	#[test]
	fn accumulates_enabled_values()
	{
		let mut bench = Bench::new();
		let mut acc = Accumulator::new();
		acc.initialize(&mut bench.context()).unwrap();

		send(&mut bench, &mut acc, 0.0, &[(accumulator_value_port(0), Message::new(2.0)), (accumulator_value_port(1), Message::new(5.0))]);
		assert_eq!(acc.sum(), 0.0);

		send(&mut bench, &mut acc, 1.0, &[(accumulator_enable_port(0), Message::boolean(true))]);
		send(&mut bench, &mut acc, 1.0, &[(accumulator_enable_port(1), Message::boolean(false))]);
		assert_eq!(acc.sum(), 2.0);

		send(&mut bench, &mut acc, 1.0, &[(accumulator_enable_port(1), Message::boolean(true)), (accumulator_value_port(1), Message::new(10.0))]);
		assert_eq!(acc.sum(), 12.0);
	}
}
