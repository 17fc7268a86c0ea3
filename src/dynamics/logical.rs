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
//! Boolean gates. These only emit when their output changes.
use super::Atomic;
use crate::context::*;
use crate::error::*;
use crate::message::*;
use crate::ports::*;
use crate::sim_time::*;

pub const LOGICAL_OUT_PORT: PortIndex = 0;

// Shared by the gates: the latest input values and the last output.
#[derive(Clone, Debug)]
struct Gate<const N: usize>
{
	inputs: [bool; N],
	output: bool,
	sigma: Time,
}

impl<const N: usize> Gate<N>
{
	fn new(output: bool) -> Gate<N>
	{
		Gate {inputs: [false; N], output, sigma: INFINITY}
	}

	fn reset(&mut self, output: bool)
	{
		self.inputs = [false; N];
		self.output = output;
		self.sigma = INFINITY;
	}

	fn update(&mut self, inputs: Inputs, eval: impl Fn(&[bool; N]) -> bool)
	{
		for i in 0..N {
			if let Some(message) = inputs.last(i) {
				self.inputs[i] = message.is_true();
			}
		}

		let output = eval(&self.inputs);
		if output != self.output {
			self.output = output;
			self.sigma = 0.0;
		} else {
			self.sigma = INFINITY;
		}
	}
}

macro_rules! gate
{
	($(#[$meta:meta])* $name:ident<$n:ident>, $initial:expr, $eval:expr) => {
		$(#[$meta])*
		#[derive(Clone, Debug)]
		pub struct $name<const $n: usize>
		{
			gate: Gate<$n>,
		}

		impl<const $n: usize> $name<$n>
		{
			pub fn new() -> $name<$n>
			{
				$name {gate: Gate::new($initial)}
			}

			pub fn output(&self) -> bool
			{
				self.gate.output
			}
		}

		impl<const $n: usize> Default for $name<$n>
		{
			fn default() -> $name<$n>
			{
				$name::new()
			}
		}

		impl<const $n: usize> Atomic for $name<$n>
		{
			const INPUTS: &'static [PortType] = &[PortType::Boolean; $n];
			const OUTPUTS: &'static [PortType] = &[PortType::Boolean];

			fn initialize(&mut self, _ctx: &mut Context) -> Result<()>
			{
				self.gate.reset($initial);
				Ok(())
			}

			fn internal(&mut self, _ctx: &mut Context) -> Result<()>
			{
				self.gate.sigma = INFINITY;
				Ok(())
			}

			fn external(&mut self, _ctx: &mut Context, _e: Time, inputs: Inputs) -> Result<()>
			{
				self.gate.update(inputs, $eval);
				Ok(())
			}

			fn lambda(&self, outputs: &mut Outputs)
			{
				outputs.send(LOGICAL_OUT_PORT, Message::boolean(self.gate.output));
			}

			fn ta(&self) -> Time
			{
				self.gate.sigma
			}

			fn observation(&self) -> Message
			{
				Message::boolean(self.gate.output)
			}
		}
	};
}

gate!(
	/// True when every input is true.
	LogicalAnd<N>, false, |inputs: &[bool; N]| inputs.iter().all(|&b| b));

gate!(
	/// True when any input is true.
	LogicalOr<N>, false, |inputs: &[bool; N]| inputs.iter().any(|&b| b));

/// Negates its input. Inputs start out false so the output starts out true.
#[derive(Clone, Debug)]
pub struct LogicalInvert
{
	gate: Gate<1>,
}

impl LogicalInvert
{
	pub fn new() -> LogicalInvert
	{
		LogicalInvert {gate: Gate::new(true)}
	}

	pub fn output(&self) -> bool
	{
		self.gate.output
	}
}

impl Default for LogicalInvert
{
	fn default() -> LogicalInvert
	{
		LogicalInvert::new()
	}
}

impl Atomic for LogicalInvert
{
	const INPUTS: &'static [PortType] = &[PortType::Boolean];
	const OUTPUTS: &'static [PortType] = &[PortType::Boolean];

	fn initialize(&mut self, _ctx: &mut Context) -> Result<()>
	{
		self.gate.reset(true);
		Ok(())
	}

	fn internal(&mut self, _ctx: &mut Context) -> Result<()>
	{
		self.gate.sigma = INFINITY;
		Ok(())
	}

	fn external(&mut self, _ctx: &mut Context, _e: Time, inputs: Inputs) -> Result<()>
	{
		self.gate.update(inputs, |inputs| !inputs[0]);
		Ok(())
	}

	fn lambda(&self, outputs: &mut Outputs)
	{
		outputs.send(LOGICAL_OUT_PORT, Message::boolean(self.gate.output));
	}

	fn ta(&self) -> Time
	{
		self.gate.sigma
	}

	fn observation(&self) -> Message
	{
		Message::boolean(self.gate.output)
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::dynamics::testing::*;

	#[test]
	fn and_emits_on_change()
	{
		let mut bench = Bench::new();
		let mut and = LogicalAnd::<2>::new();
		and.initialize(&mut bench.context()).unwrap();
		assert_eq!(and.ta(), INFINITY);

		send(&mut bench, &mut and, 1.0, &[(0, Message::boolean(true))]);
		assert_eq!(and.ta(), INFINITY);

		send(&mut bench, &mut and, 1.0, &[(1, Message::new(0.7))]);
		assert_eq!(and.ta(), 0.0);
		assert_eq!(fire(&mut bench, &mut and), vec![(LOGICAL_OUT_PORT, Message::boolean(true))]);
		assert_eq!(and.ta(), INFINITY);

		send(&mut bench, &mut and, 1.0, &[(0, Message::new(-1.0))]);
		assert_eq!(fire(&mut bench, &mut and), vec![(LOGICAL_OUT_PORT, Message::boolean(false))]);
	}

	#[test]
	fn or_of_three()
	{
		let mut bench = Bench::new();
		let mut or = LogicalOr::<3>::new();
		or.initialize(&mut bench.context()).unwrap();

		send(&mut bench, &mut or, 1.0, &[(2, Message::boolean(true))]);
		assert!(or.output());
		fire(&mut bench, &mut or);

		send(&mut bench, &mut or, 1.0, &[(0, Message::boolean(true))]);
		assert_eq!(or.ta(), INFINITY);
	}

	#[test]
	fn invert()
	{
		let mut bench = Bench::new();
		let mut invert = LogicalInvert::new();
		invert.initialize(&mut bench.context()).unwrap();
		assert!(invert.output());

		send(&mut bench, &mut invert, 1.0, &[(0, Message::boolean(true))]);
		assert_eq!(fire(&mut bench, &mut invert), vec![(LOGICAL_OUT_PORT, Message::boolean(false))]);
		assert_eq!(invert.observation(), Message::boolean(false));
	}
}
