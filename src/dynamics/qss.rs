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
//! Quantized state system integrators. Instead of advancing time by a fixed
//! step these advance the state by a fixed quantum (dq) and compute the time
//! at which the next quantum will be reached.
use super::poly;
use super::Atomic;
use crate::context::*;
use crate::error::*;
use crate::message::*;
use crate::ports::*;
use crate::sim_time::*;

pub const X_DOT_PORT: PortIndex = 0;
pub const RESET_PORT: PortIndex = 1;
pub const Y_PORT: PortIndex = 0;

/// QSS integrator of level L (1, 2, or 3). The input is the derivative of
/// the state as a polynomial with L coefficients and the output is the state
/// as a polynomial with L coefficients.
#[derive(Clone, Debug)]
pub struct QssIntegrator<const L: usize>
{
	/// Initial state.
	pub x0: f64,

	/// Quantum size.
	pub dq: f64,

	x: f64,			// state at the last transition
	u: [f64; L],	// derivative polynomial at the last transition
	q: [f64; L],	// quantized state polynomial at the last transition
	sigma: Time,
}

impl<const L: usize> QssIntegrator<L>
{
	pub fn new(x0: f64, dq: f64) -> QssIntegrator<L>
	{
		assert!(L >= 1 && L <= MESSAGE_LEN, "bad QSS level {}", L);
		assert!(dq > 0.0, "dq ({}) is not positive", dq);
		QssIntegrator {x0, dq, x: x0, u: [0.0; L], q: [0.0; L], sigma: 0.0}
	}

	/// The state at the last transition.
	pub fn value(&self) -> f64
	{
		self.x
	}

	// Coefficients of the state polynomial, one more than the level.
	fn state_poly(&self) -> [f64; 4]
	{
		let mut p = [0.0; 4];
		p[0] = self.x;
		for i in 0..L {
			p[i + 1] = self.u[i]/(i + 1) as f64;
		}
		p
	}

	// The first L Taylor coefficients of the state.
	fn taylor(x: f64, u: &[f64; L]) -> [f64; L]
	{
		let mut q = [0.0; L];
		q[0] = x;
		for i in 1..L {
			q[i] = u[i - 1]/i as f64;
		}
		q
	}

	fn advanced(&self, e: Time) -> (f64, [f64; L])
	{
		let x = poly::evaluate(&self.state_poly()[..L + 1], e);
		let mut u = self.u;
		poly::advance(&mut u, e);
		(x, u)
	}

	// The error between the state and its quantized version grows as the
	// leading term of the state polynomial.
	fn internal_sigma(&self) -> Time
	{
		let top = self.u[L - 1];
		if top == 0.0 {
			INFINITY
		} else {
			(L as f64*self.dq/top.abs()).powf(1.0/L as f64)
		}
	}

	fn external_sigma(&self) -> Time
	{
		let mut error = self.state_poly();
		for i in 0..L {
			error[i] -= self.q[i];
		}
		if error[0].abs() >= self.dq {
			0.0
		} else {
			poly::first_crossing(&error[..L + 1], self.dq)
		}
	}
}

impl<const L: usize> Atomic for QssIntegrator<L>
{
	const INPUTS: &'static [PortType] = &[PortType::Real(L as u8), PortType::Real(L as u8)];
	const OUTPUTS: &'static [PortType] = &[PortType::Real(L as u8)];

	fn initialize(&mut self, _ctx: &mut Context) -> Result<()>
	{
		self.x = self.x0;
		self.u = [0.0; L];
		self.q = Self::taylor(self.x, &self.u);
		self.sigma = 0.0;		// emit the initial value
		Ok(())
	}

	fn internal(&mut self, _ctx: &mut Context) -> Result<()>
	{
		let (x, u) = self.advanced(self.sigma);
		self.x = x;
		self.u = u;
		self.q = Self::taylor(x, &u);
		self.sigma = self.internal_sigma();
		Ok(())
	}

	fn external(&mut self, ctx: &mut Context, e: Time, inputs: Inputs) -> Result<()>
	{
		let (x, u) = self.advanced(e);
		self.x = x;
		self.u = u;
		poly::advance(&mut self.q, e);

		if let Some(message) = inputs.last(X_DOT_PORT) {
			self.u = message.coefficients();
		}

		if let Some(message) = inputs.last(RESET_PORT) {
			self.x = message.value();
			self.q = Self::taylor(self.x, &self.u);
			self.sigma = 0.0;
			ctx.log_debug(&format!("reset to {}", self.x));
			return Ok(());
		}

		self.sigma = self.external_sigma();
		Ok(())
	}

	fn lambda(&self, outputs: &mut Outputs)
	{
		let (x, u) = self.advanced(self.sigma);
		outputs.send(Y_PORT, Message::from_polynomial(&Self::taylor(x, &u)));
	}

	fn ta(&self) -> Time
	{
		self.sigma
	}

	fn observation(&self) -> Message
	{
		Message::from_polynomial(&Self::taylor(self.x, &self.u))
	}
}
