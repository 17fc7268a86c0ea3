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
//! Adaptive quantization. Unlike the QSS integrators, which quantize their own
//! state, here quantization is split into two models: a quantifier that
//! decides the band the state may move within and an integrator that tells
//! the quantifier when the state reaches an edge of the band.
use super::Atomic;
use crate::context::*;
use crate::error::*;
use crate::message::*;
use crate::ports::*;
use crate::sim_time::*;
use std::collections::VecDeque;

pub const INTEGRATOR_QUANTA_PORT: PortIndex = 0;
pub const INTEGRATOR_X_DOT_PORT: PortIndex = 1;
pub const INTEGRATOR_RESET_PORT: PortIndex = 2;
pub const INTEGRATOR_OUT_PORT: PortIndex = 0;

/// Integrates x_dot and emits the state whenever it reaches the up or down
/// threshold last received from a quantifier.
#[derive(Clone, Debug)]
pub struct AqssIntegrator
{
	pub x0: f64,
	x: f64,
	x_dot: f64,
	band: Option<(f64, f64)>,	// (up, down)
	sigma: Time,
}

impl AqssIntegrator
{
	pub fn new(x0: f64) -> AqssIntegrator
	{
		AqssIntegrator {x0, x: x0, x_dot: 0.0, band: None, sigma: 0.0}
	}

	pub fn value(&self) -> f64
	{
		self.x
	}

	// Where the state will be when sigma expires. Edges are returned exactly so
	// that the quantifier can tell which one was reached.
	fn projected(&self) -> f64
	{
		match self.band {
			Some((up, down)) if self.sigma.is_finite() => {
				if self.x_dot > 0.0 {
					up
				} else if self.x_dot < 0.0 {
					down
				} else {
					self.x
				}
			},
			_ => self.x,
		}
	}

	fn edge_sigma(&self) -> Time
	{
		match self.band {
			Some((up, down)) => {
				if self.x >= up || self.x <= down {
					0.0
				} else if self.x_dot > 0.0 {
					(up - self.x)/self.x_dot
				} else if self.x_dot < 0.0 {
					(down - self.x)/self.x_dot
				} else {
					INFINITY
				}
			},
			None => INFINITY,
		}
	}
}

impl Atomic for AqssIntegrator
{
	const INPUTS: &'static [PortType] = &[PortType::Generic, PortType::Real(1), PortType::Generic];
	const OUTPUTS: &'static [PortType] = &[PortType::Real(1)];

	fn initialize(&mut self, _ctx: &mut Context) -> Result<()>
	{
		self.x = self.x0;
		self.x_dot = 0.0;
		self.band = None;
		self.sigma = 0.0;
		Ok(())
	}

	fn internal(&mut self, _ctx: &mut Context) -> Result<()>
	{
		self.x = self.projected();
		self.band = None;		// wait for the quantifier to respond
		self.sigma = INFINITY;
		Ok(())
	}

	fn external(&mut self, ctx: &mut Context, e: Time, inputs: Inputs) -> Result<()>
	{
		self.x += self.x_dot*e;

		if let Some(message) = inputs.last(INTEGRATOR_X_DOT_PORT) {
			self.x_dot = message.value();
		}
		if let Some(message) = inputs.last(INTEGRATOR_QUANTA_PORT) {
			self.band = Some((message[0], message[1]));
		}
		if let Some(message) = inputs.last(INTEGRATOR_RESET_PORT) {
			self.x = message.value();
			self.band = None;
			self.sigma = 0.0;
			ctx.log_debug(&format!("reset to {}", self.x));
			return Ok(());
		}

		self.sigma = self.edge_sigma();
		Ok(())
	}

	fn lambda(&self, outputs: &mut Outputs)
	{
		outputs.send(INTEGRATOR_OUT_PORT, Message::new(self.projected()));
	}

	fn ta(&self) -> Time
	{
		self.sigma
	}

	fn observation(&self) -> Message
	{
		Message::new(self.x)
	}
}

pub const QUANTIFIER_IN_PORT: PortIndex = 0;
pub const QUANTIFIER_OUT_PORT: PortIndex = 0;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Direction
{
	Up,
	Down,
}

/// Receives states and emits the [up, down] band the state may move within
/// before it is reported again. When adaptive the step grows while the state
/// keeps moving in the same direction and shrinks back when it oscillates.
#[derive(Clone, Debug)]
pub struct Quantifier
{
	pub step_size: f64,
	pub adaptive: bool,

	/// Number of same direction moves before the step doubles.
	pub past_length: usize,
	step: f64,
	band: Option<(f64, f64)>,
	past: VecDeque<Direction>,
	sigma: Time,
}

impl Quantifier
{
	pub fn new(step_size: f64, adaptive: bool, past_length: usize) -> Quantifier
	{
		assert!(step_size > 0.0, "step_size ({}) should be positive", step_size);
		assert!(past_length >= 2, "past_length ({}) should be at least 2", past_length);
		Quantifier {step_size, adaptive, past_length, step: step_size, band: None, past: VecDeque::with_capacity(past_length), sigma: INFINITY}
	}

	pub fn step(&self) -> f64
	{
		self.step
	}

	pub fn band(&self) -> Option<(f64, f64)>
	{
		self.band
	}

	fn adapt(&mut self, direction: Direction)
	{
		if self.past.len() == self.past_length {
			self.past.pop_front();
		}
		self.past.push_back(direction);

		let len = self.past.len();
		if len == self.past_length && self.past.iter().all(|&d| d == direction) {
			self.step *= 2.0;
			self.past.clear();
		} else if len >= 2 && self.past[len - 2] != direction {
			self.step = (self.step/2.0).max(self.step_size);
		}
	}
}

impl Atomic for Quantifier
{
	const INPUTS: &'static [PortType] = &[PortType::Real(1)];
	const OUTPUTS: &'static [PortType] = &[PortType::Generic];

	fn initialize(&mut self, _ctx: &mut Context) -> Result<()>
	{
		self.step = self.step_size;
		self.band = None;
		self.past.clear();
		self.sigma = INFINITY;
		Ok(())
	}

	fn internal(&mut self, _ctx: &mut Context) -> Result<()>
	{
		self.sigma = INFINITY;
		Ok(())
	}

	fn external(&mut self, ctx: &mut Context, _e: Time, inputs: Inputs) -> Result<()>
	{
		if let Some(message) = inputs.last(QUANTIFIER_IN_PORT) {
			let x = message.value();
			let direction = match self.band {
				Some((up, _)) if x >= up => Some(Direction::Up),
				Some((_, down)) if x <= down => Some(Direction::Down),
				_ => None,
			};
			if let (true, Some(direction)) = (self.adaptive, direction) {
				self.adapt(direction);
				ctx.log_excessive(&format!("step is now {}", self.step));
			}
			self.band = Some((x + self.step, x - self.step));
			self.sigma = 0.0;
		}
		Ok(())
	}

	fn lambda(&self, outputs: &mut Outputs)
	{
		if let Some((up, down)) = self.band {
			outputs.send(QUANTIFIER_OUT_PORT, Message::from_polynomial(&[up, down]));
		}
	}

	fn ta(&self) -> Time
	{
		self.sigma
	}

	fn observation(&self) -> Message
	{
		Message::new(self.step)
	}
}
