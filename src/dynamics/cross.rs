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
//! Models that watch an input polynomial for threshold crossings. Level 1
//! inputs are piecewise constant so crossings can only happen when a message
//! arrives. Higher levels also predict when the polynomial will cross.
use super::poly;
use super::Atomic;
use crate::context::*;
use crate::error::*;
use crate::message::*;
use crate::ports::*;
use crate::sim_time::*;

pub const CROSS_VALUE_PORT: PortIndex = 0;
pub const CROSS_IF_VALUE_PORT: PortIndex = 1;
pub const CROSS_THRESHOLD_PORT: PortIndex = 2;

pub const CROSS_OUT_IF_VALUE_PORT: PortIndex = 0;
pub const CROSS_OUT_VALUE_PORT: PortIndex = 1;
pub const CROSS_OUT_EVENT_PORT: PortIndex = 2;

/// Forwards each value it receives on the value output. When the value input
/// crosses the threshold in the detected direction it also emits if_value and
/// a true event.
#[derive(Clone, Debug)]
pub struct Cross<const L: usize>
{
	pub default_threshold: f64,

	/// Used until a message arrives on the if_value port.
	pub default_if_value: f64,

	/// Detect upward crossings, otherwise downward crossings.
	pub detect_up: bool,

	threshold: f64,
	value: [f64; L],
	if_value: [f64; L],
	above: bool,		// value >= threshold
	event: bool,		// the next internal transition emits a crossing
	forward: bool,		// the next internal transition forwards a new value
	predicted: bool,	// sigma is a predicted crossing time
	sigma: Time,
}

impl<const L: usize> Cross<L>
{
	pub fn new(threshold: f64, if_value: f64, detect_up: bool) -> Cross<L>
	{
		Cross {
			default_threshold: threshold,
			default_if_value: if_value,
			detect_up,
			threshold,
			value: [0.0; L],
			if_value: [0.0; L],
			above: false,
			event: false,
			forward: false,
			predicted: false,
			sigma: INFINITY,
		}
	}

	pub fn is_above(&self) -> bool
	{
		self.above
	}

	fn predict(&mut self)
	{
		self.predicted = false;
		self.event = false;
		self.sigma = INFINITY;
		if L > 1 {
			let mut p = self.value;
			p[0] -= self.threshold;
			let root = poly::min_root_after(&p, poly::ROOT_EPSILON);
			if root.is_finite() {
				self.sigma = root;
				self.predicted = true;
				self.event = !self.above == self.detect_up;	// crossing will flip the side
			}
		}
	}
}

impl<const L: usize> Atomic for Cross<L>
{
	const INPUTS: &'static [PortType] = &[PortType::Real(L as u8), PortType::Real(L as u8), PortType::Real(L as u8)];
	const OUTPUTS: &'static [PortType] = &[PortType::Real(L as u8), PortType::Real(L as u8), PortType::Boolean];

	fn initialize(&mut self, _ctx: &mut Context) -> Result<()>
	{
		self.threshold = self.default_threshold;
		self.value = [0.0; L];
		self.if_value = [0.0; L];
		self.if_value[0] = self.default_if_value;
		self.above = self.value[0] >= self.threshold;
		self.forward = false;
		self.predict();
		Ok(())
	}

	fn internal(&mut self, _ctx: &mut Context) -> Result<()>
	{
		poly::advance(&mut self.value, self.sigma);
		poly::advance(&mut self.if_value, self.sigma);
		if self.predicted {
			self.value[0] = self.threshold;
			self.above = !self.above;
		}
		self.forward = false;
		self.predict();
		Ok(())
	}

	fn external(&mut self, ctx: &mut Context, e: Time, inputs: Inputs) -> Result<()>
	{
		poly::advance(&mut self.value, e);
		poly::advance(&mut self.if_value, e);

		if let Some(message) = inputs.last(CROSS_THRESHOLD_PORT) {
			self.threshold = message.value();
		}
		if let Some(message) = inputs.last(CROSS_IF_VALUE_PORT) {
			self.if_value = message.coefficients();
		}
		if let Some(message) = inputs.last(CROSS_VALUE_PORT) {
			self.value = message.coefficients();
			self.forward = true;
		}

		let above = self.value[0] >= self.threshold;
		let crossed = above != self.above && above == self.detect_up;
		self.above = above;
		if crossed {
			ctx.log_debug(&format!("crossed {} at {}", self.threshold, self.value[0]));
			self.event = true;
			self.predicted = false;
			self.sigma = 0.0;
		} else if self.forward {
			// the prediction is redone after the value goes out
			self.event = false;
			self.predicted = false;
			self.sigma = 0.0;
		} else {
			self.predict();
		}
		Ok(())
	}

	fn lambda(&self, outputs: &mut Outputs)
	{
		if !self.event && !self.forward {
			return;
		}

		let mut value = self.value;
		poly::advance(&mut value, self.sigma);
		if self.predicted {
			value[0] = self.threshold;
		}
		if self.event {
			let mut if_value = self.if_value;
			poly::advance(&mut if_value, self.sigma);
			outputs.send(CROSS_OUT_IF_VALUE_PORT, Message::from_polynomial(&if_value));
		}
		outputs.send(CROSS_OUT_VALUE_PORT, Message::from_polynomial(&value));
		if self.event {
			outputs.send(CROSS_OUT_EVENT_PORT, Message::boolean(true));
		}
	}

	fn ta(&self) -> Time
	{
		self.sigma
	}

	fn observation(&self) -> Message
	{
		Message::from_polynomial(&self.value)
	}
}

pub const FILTER_VALUE_PORT: PortIndex = 0;
pub const FILTER_UPPER_PORT: PortIndex = 1;
pub const FILTER_LOWER_PORT: PortIndex = 2;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Region
{
	Below,
	Inside,
	Above,
}

/// Clamps its input to [lower, upper]. The upper and lower ports go true when
/// the input saturates against the corresponding bound and false when it
/// leaves it.
#[derive(Clone, Debug)]
pub struct Filter<const L: usize>
{
	pub lower: f64,
	pub upper: f64,
	value: [f64; L],
	region: Region,		// region the last output was for
	next: Region,		// region the next output is for
	predicted: bool,	// sigma is a predicted boundary hit
	sigma: Time,
}

impl<const L: usize> Filter<L>
{
	pub fn new(lower: f64, upper: f64) -> Filter<L>
	{
		assert!(lower < upper, "lower ({}) should be less than upper ({})", lower, upper);
		Filter {lower, upper, value: [0.0; L], region: Region::Inside, next: Region::Inside, predicted: false, sigma: INFINITY}
	}

	pub fn region(&self) -> Region
	{
		self.region
	}

	fn classify(&self, value: f64) -> Region
	{
		if value > self.upper {
			Region::Above
		} else if value < self.lower {
			Region::Below
		} else {
			Region::Inside
		}
	}

	fn clamped(&self, value: &[f64; L], region: Region) -> Message
	{
		match region {
			Region::Above => Message::new(self.upper),
			Region::Below => Message::new(self.lower),
			Region::Inside => Message::from_polynomial(value),
		}
	}

	fn predict(&mut self)
	{
		self.sigma = INFINITY;
		self.next = self.region;
		self.predicted = false;
		if L == 1 {
			return;
		}

		let hit = |bound: f64| {
			let mut p = self.value;
			p[0] -= bound;
			poly::min_root_after(&p, poly::ROOT_EPSILON)
		};
		let (sigma, next) = match self.region {
			Region::Above => (hit(self.upper), Region::Inside),
			Region::Below => (hit(self.lower), Region::Inside),
			Region::Inside => {
				let up = hit(self.upper);
				let down = hit(self.lower);
				if up <= down {(up, Region::Above)} else {(down, Region::Below)}
			},
		};
		if sigma.is_finite() {
			self.sigma = sigma;
			self.next = next;
			self.predicted = true;
		}
	}
}

impl<const L: usize> Atomic for Filter<L>
{
	const INPUTS: &'static [PortType] = &[PortType::Real(L as u8)];
	const OUTPUTS: &'static [PortType] = &[PortType::Real(L as u8), PortType::Boolean, PortType::Boolean];

	fn initialize(&mut self, _ctx: &mut Context) -> Result<()>
	{
		self.value = [0.0; L];
		self.region = self.classify(0.0);
		self.next = self.region;
		self.predicted = false;
		self.sigma = INFINITY;
		Ok(())
	}

	fn internal(&mut self, _ctx: &mut Context) -> Result<()>
	{
		poly::advance(&mut self.value, self.sigma);
		if self.predicted && self.next != self.region {
			match (self.region, self.next) {
				(Region::Above, _) | (_, Region::Above) => self.value[0] = self.upper,
				_ => self.value[0] = self.lower,
			}
		}
		self.region = self.next;
		self.predict();
		Ok(())
	}

	fn external(&mut self, _ctx: &mut Context, e: Time, inputs: Inputs) -> Result<()>
	{
		poly::advance(&mut self.value, e);
		if let Some(message) = inputs.last(FILTER_VALUE_PORT) {
			self.value = message.coefficients();
		}
		self.next = self.classify(self.value[0]);
		self.predicted = false;
		self.sigma = 0.0;
		Ok(())
	}

	fn lambda(&self, outputs: &mut Outputs)
	{
		let mut value = self.value;
		poly::advance(&mut value, self.sigma);
		outputs.send(FILTER_VALUE_PORT, self.clamped(&value, self.next));

		if self.next != self.region {
			if self.region == Region::Above {
				outputs.send(FILTER_UPPER_PORT, Message::boolean(false));
			}
			if self.region == Region::Below {
				outputs.send(FILTER_LOWER_PORT, Message::boolean(false));
			}
			if self.next == Region::Above {
				outputs.send(FILTER_UPPER_PORT, Message::boolean(true));
			}
			if self.next == Region::Below {
				outputs.send(FILTER_LOWER_PORT, Message::boolean(true));
			}
		}
	}

	fn ta(&self) -> Time
	{
		self.sigma
	}

	fn observation(&self) -> Message
	{
		self.clamped(&self.value, self.region)
	}
}
