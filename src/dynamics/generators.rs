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
//! Models that produce values on their own rather than in response to inputs.
use super::Atomic;
use crate::context::*;
use crate::error::*;
use crate::message::*;
use crate::ports::*;
use crate::sim_time::*;
use crate::sources::*;

pub const GENERATOR_OUT_PORT: PortIndex = 0;

/// Emits value once, offset time units after the simulation starts.
#[derive(Clone, Debug)]
pub struct Constant
{
	pub value: f64,
	pub offset: Time,
	sigma: Time,
}

impl Constant
{
	pub fn new(value: f64, offset: Time) -> Constant
	{
		assert!(is_valid_ta(offset), "offset ({}) should be non-negative", offset);
		Constant {value, offset, sigma: offset}
	}
}

impl Atomic for Constant
{
	const INPUTS: &'static [PortType] = &[];
	const OUTPUTS: &'static [PortType] = &[PortType::Generic];

	fn initialize(&mut self, _ctx: &mut Context) -> Result<()>
	{
		self.sigma = self.offset;
		Ok(())
	}

	fn internal(&mut self, _ctx: &mut Context) -> Result<()>
	{
		self.sigma = INFINITY;
		Ok(())
	}

	fn external(&mut self, _ctx: &mut Context, _e: Time, _inputs: Inputs) -> Result<()>
	{
		Ok(())
	}

	fn lambda(&self, outputs: &mut Outputs)
	{
		outputs.send(GENERATOR_OUT_PORT, Message::new(self.value));
	}

	fn ta(&self) -> Time
	{
		self.sigma
	}

	fn observation(&self) -> Message
	{
		Message::new(self.value)
	}
}

/// Emits a stream of values with time advances pulled from external sources.
/// The first value is emitted at offset and each internal transition pulls
/// the next time advance and value. Without a value source the generator
/// emits true pulses.
#[derive(Clone, Debug)]
pub struct Generator
{
	pub offset: Time,
	pub source_ta: Source,
	pub source_value: Option<Source>,

	/// When a source runs dry stop emitting, otherwise the last time advance
	/// and value are repeated.
	pub stop_on_error: bool,
	value: f64,
	last_ta: Time,
	sigma: Time,
}

impl Generator
{
	pub fn new(offset: Time, source_ta: Source, source_value: Option<Source>, stop_on_error: bool) -> Generator
	{
		assert!(is_valid_ta(offset), "offset ({}) should be non-negative", offset);
		Generator {offset, source_ta, source_value, stop_on_error, value: 1.0, last_ta: INFINITY, sigma: INFINITY}
	}

	pub fn value(&self) -> f64
	{
		self.value
	}

	fn next_value(&mut self, ctx: &mut Context) -> Result<()>
	{
		if let Some(ref mut source) = self.source_value {
			self.value = ctx.sources.next_value(source)?;
		}
		Ok(())
	}

	fn next_ta(&mut self, ctx: &mut Context) -> Result<Time>
	{
		let ta = ctx.sources.next_value(&mut self.source_ta)?;
		if !is_valid_ta(ta) {
			return Err(Error::ModelNegativeTa {model: ctx.id, ta});
		}
		Ok(ta)
	}

	// Exhausted sources aren't errors: the generator either stops or keeps
	// repeating itself.
	fn exhausted(&mut self, ctx: &mut Context, err: Error) -> Result<()>
	{
		match err {
			Error::SourceEmpty {..} => {
				if self.stop_on_error {
					ctx.log_info(&format!("stopping: {}", err));
					self.sigma = INFINITY;
				} else {
					ctx.log_debug(&format!("repeating: {}", err));
					self.sigma = self.last_ta;
				}
				Ok(())
			},
			_ => Err(err),
		}
	}
}

impl Atomic for Generator
{
	const INPUTS: &'static [PortType] = &[];
	const OUTPUTS: &'static [PortType] = &[PortType::Generic];

	fn initialize(&mut self, ctx: &mut Context) -> Result<()>
	{
		ctx.sources.initialize(&mut self.source_ta)?;
		if let Some(ref mut source) = self.source_value {
			ctx.sources.initialize(source)?;
		}

		self.last_ta = INFINITY;
		self.sigma = self.offset;
		if let Err(err) = self.next_value(ctx) {
			if let Error::SourceEmpty {..} = err {
				ctx.log_warning(&format!("nothing to generate: {}", err));
				self.sigma = INFINITY;
			} else {
				return Err(err);
			}
		}
		Ok(())
	}

	fn internal(&mut self, ctx: &mut Context) -> Result<()>
	{
		let ta = match self.next_ta(ctx) {
			Ok(ta) => ta,
			Err(err) => return self.exhausted(ctx, err),
		};
		if let Err(err) = self.next_value(ctx) {
			return self.exhausted(ctx, err);
		}
		self.last_ta = ta;
		self.sigma = ta;
		Ok(())
	}

	fn external(&mut self, _ctx: &mut Context, _e: Time, _inputs: Inputs) -> Result<()>
	{
		Ok(())
	}

	fn lambda(&self, outputs: &mut Outputs)
	{
		outputs.send(GENERATOR_OUT_PORT, Message::new(self.value));
	}

	fn ta(&self) -> Time
	{
		self.sigma
	}

	fn observation(&self) -> Message
	{
		Message::new(self.value)
	}

	fn finalize(&mut self, ctx: &mut Context)
	{
		ctx.sources.finalize(&mut self.source_ta);
		if let Some(ref mut source) = self.source_value {
			ctx.sources.finalize(source);
		}
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TimeFunction
{
	Time,
	Square,
	Sine,
}

impl TimeFunction
{
	pub fn apply(self, t: Time) -> f64
	{
		match self {
			TimeFunction::Time => t,
			TimeFunction::Square => t*t,
			TimeFunction::Sine => t.sin(),
		}
	}
}

/// Samples a function of the simulation time every timestep.
#[derive(Clone, Debug)]
pub struct TimeFunc
{
	pub function: TimeFunction,
	pub timestep: Time,
	value: f64,
	last: Time,		// time of the last transition
	sigma: Time,
}

impl TimeFunc
{
	pub fn new(function: TimeFunction, timestep: Time) -> TimeFunc
	{
		assert!(timestep > 0.0, "timestep ({}) should be positive", timestep);
		TimeFunc {function, timestep, value: 0.0, last: 0.0, sigma: 0.0}
	}
}

impl Atomic for TimeFunc
{
	const INPUTS: &'static [PortType] = &[];
	const OUTPUTS: &'static [PortType] = &[PortType::Real(1)];

	fn initialize(&mut self, ctx: &mut Context) -> Result<()>
	{
		self.last = ctx.t;
		self.value = self.function.apply(ctx.t);
		self.sigma = 0.0;
		Ok(())
	}

	fn internal(&mut self, ctx: &mut Context) -> Result<()>
	{
		self.last = ctx.t;
		self.value = self.function.apply(ctx.t);
		self.sigma = self.timestep;
		Ok(())
	}

	fn external(&mut self, _ctx: &mut Context, _e: Time, _inputs: Inputs) -> Result<()>
	{
		Ok(())
	}

	fn lambda(&self, outputs: &mut Outputs)
	{
		outputs.send(GENERATOR_OUT_PORT, Message::new(self.function.apply(self.last + self.sigma)));
	}

	fn ta(&self) -> Time
	{
		self.sigma
	}

	fn observation(&self) -> Message
	{
		Message::new(self.value)
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::dynamics::testing::*;
	use std::io::Write;

	#[test]
	fn constants_fire_once()
	{
		let mut bench = Bench::new();
		let mut constant = Constant::new(42.0, 2.5);
		constant.initialize(&mut bench.context()).unwrap();
		assert_eq!(constant.ta(), 2.5);
		assert_eq!(fire(&mut bench, &mut constant), vec![(GENERATOR_OUT_PORT, Message::new(42.0))]);
		assert_eq!(constant.ta(), INFINITY);
	}

	#[test]
	fn generators_pull_from_sources()
	{
		let mut bench = Bench::new();
		let tas = bench.sources.alloc_constant(&[1.0, 2.0]).unwrap();
		let values = bench.sources.alloc_constant(&[10.0, 20.0, 30.0]).unwrap();
		let mut generator = Generator::new(0.5, Source::constant(tas), Some(Source::constant(values)), true);
		generator.initialize(&mut bench.context()).unwrap();
		assert_eq!(generator.ta(), 0.5);

		let emitted: Vec<f64> = (0..4).map(|_| fire(&mut bench, &mut generator)[0].1.value()).collect();
		assert_eq!(emitted, vec![10.0, 20.0, 30.0, 10.0]);
		assert_eq!(bench.t, 0.5 + 1.0 + 2.0 + 1.0);
	}

	#[test]
	fn generators_without_values_pulse()
	{
		let mut bench = Bench::new();
		let tas = bench.sources.alloc_constant(&[3.0]).unwrap();
		let mut generator = Generator::new(0.0, Source::constant(tas), None, false);
		generator.initialize(&mut bench.context()).unwrap();
		assert!(fire(&mut bench, &mut generator)[0].1.is_true());
		assert_eq!(generator.ta(), 3.0);
	}

	fn text_source(bench: &mut Bench, name: &str, contents: &str) -> Source
	{
		let mut path = std::env::temp_dir();
		path.push(format!("irritator-generators-{}-{}", std::process::id(), name));
		std::fs::File::create(&path).unwrap().write_all(contents.as_bytes()).unwrap();
		let id = bench.sources.alloc_text_file(&path, 1).unwrap();
		Source::text_file(id)
	}

	#[test]
	fn exhausted_generators_stop()
	{
		let mut bench = Bench::new();
		let tas = bench.sources.alloc_constant(&[1.0]).unwrap();
		let values = text_source(&mut bench, "stop.txt", "1 2");
		let mut generator = Generator::new(0.0, Source::constant(tas), Some(values), true);
		generator.initialize(&mut bench.context()).unwrap();

		assert_eq!(fire(&mut bench, &mut generator)[0].1.value(), 1.0);
		assert_eq!(fire(&mut bench, &mut generator)[0].1.value(), 2.0);
		assert_eq!(generator.ta(), INFINITY);
	}

	#[test]
	fn exhausted_generators_can_repeat()
	{
		let mut bench = Bench::new();
		let tas = bench.sources.alloc_constant(&[1.0]).unwrap();
		let values = text_source(&mut bench, "repeat.txt", "1 2");
		let mut generator = Generator::new(0.0, Source::constant(tas), Some(values), false);
		generator.initialize(&mut bench.context()).unwrap();

		let emitted: Vec<f64> = (0..4).map(|_| fire(&mut bench, &mut generator)[0].1.value()).collect();
		assert_eq!(emitted, vec![1.0, 2.0, 2.0, 2.0]);
		assert_eq!(generator.ta(), 1.0);
	}

	#[test]
	fn negative_time_advances_are_errors()
	{
		let mut bench = Bench::new();
		let tas = bench.sources.alloc_constant(&[-1.0]).unwrap();
		let mut generator = Generator::new(0.0, Source::constant(tas), None, true);
		generator.initialize(&mut bench.context()).unwrap();
		outputs_of(&generator);
		let err = generator.internal(&mut bench.context()).unwrap_err();
		assert!(matches!(err, Error::ModelNegativeTa {..}));
	}

	#[test]
	fn time_functions_sample()
	{
		let mut bench = Bench::new();
		bench.t = 1.0;
		let mut func = TimeFunc::new(TimeFunction::Square, 0.5);
		func.initialize(&mut bench.context()).unwrap();
		assert_eq!(fire(&mut bench, &mut func), vec![(GENERATOR_OUT_PORT, Message::new(1.0))]);
		assert_eq!(fire(&mut bench, &mut func), vec![(GENERATOR_OUT_PORT, Message::new(2.25))]);
		assert_eq!(fire(&mut bench, &mut func), vec![(GENERATOR_OUT_PORT, Message::new(4.0))]);
		assert_eq!(func.observation(), Message::new(4.0));
	}
}
