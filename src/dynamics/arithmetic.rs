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
//! Reactive QSS models: each input is stored as a polynomial which is
//! advanced as time passes and every batch of inputs produces one output.
use super::poly;
use super::{reactive_sigma, Atomic};
use crate::context::*;
use crate::error::*;
use crate::message::*;
use crate::ports::*;
use crate::sim_time::*;

pub const OUT_PORT: PortIndex = 0;

fn advance_all<const L: usize, const N: usize>(values: &mut [[f64; L]; N], e: Time)
{
	for value in values.iter_mut() {
		poly::advance(value, e);
	}
}

fn store_inputs<const L: usize, const N: usize>(values: &mut [[f64; L]; N], inputs: Inputs)
{
	for (port, message) in inputs.iter() {
		if port < N {
			values[port] = message.coefficients();
		}
	}
}

fn initial_values<const L: usize, const N: usize>(defaults: &[f64; N]) -> [[f64; L]; N]
{
	let mut values = [[0.0; L]; N];
	for (value, default) in values.iter_mut().zip(defaults.iter()) {
		value[0] = *default;
	}
	values
}

/// Adds N inputs together.
#[derive(Clone, Debug)]
pub struct Sum<const L: usize, const N: usize>
{
	/// Input values used until messages arrive.
	pub default_values: [f64; N],
	values: [[f64; L]; N],
	sigma: Time,
}

impl<const L: usize, const N: usize> Sum<L, N>
{
	pub fn new() -> Sum<L, N>
	{
		Sum {default_values: [0.0; N], values: [[0.0; L]; N], sigma: INFINITY}
	}

	fn output(&self) -> Message
	{
		let mut sum = [0.0; L];
		for value in self.values.iter() {
			for (s, v) in sum.iter_mut().zip(value.iter()) {
				*s += v;
			}
		}
		Message::from_polynomial(&sum)
	}
}

impl<const L: usize, const N: usize> Atomic for Sum<L, N>
{
	const INPUTS: &'static [PortType] = &[PortType::Real(L as u8); N];
	const OUTPUTS: &'static [PortType] = &[PortType::Real(L as u8)];

	fn initialize(&mut self, _ctx: &mut Context) -> Result<()>
	{
		self.values = initial_values(&self.default_values);
		self.sigma = INFINITY;
		Ok(())
	}

	fn internal(&mut self, _ctx: &mut Context) -> Result<()>
	{
		self.sigma = INFINITY;
		Ok(())
	}

	fn external(&mut self, _ctx: &mut Context, e: Time, inputs: Inputs) -> Result<()>
	{
		advance_all(&mut self.values, e);
		store_inputs(&mut self.values, inputs);
		self.sigma = reactive_sigma(!inputs.is_empty());
		Ok(())
	}

	fn lambda(&self, outputs: &mut Outputs)
	{
		outputs.send(OUT_PORT, self.output());
	}

	fn ta(&self) -> Time
	{
		self.sigma
	}

	fn observation(&self) -> Message
	{
		self.output()
	}
}

/// Weighted sum of N inputs.
#[derive(Clone, Debug)]
pub struct Wsum<const L: usize, const N: usize>
{
	pub coefficients: [f64; N],

	/// Input values used until messages arrive.
	pub default_values: [f64; N],
	values: [[f64; L]; N],
	sigma: Time,
}

impl<const L: usize, const N: usize> Wsum<L, N>
{
	pub fn new(coefficients: [f64; N]) -> Wsum<L, N>
	{
		Wsum {coefficients, default_values: [0.0; N], values: [[0.0; L]; N], sigma: INFINITY}
	}

	fn output(&self) -> Message
	{
		let mut sum = [0.0; L];
		for (value, coefficient) in self.values.iter().zip(self.coefficients.iter()) {
			for (s, v) in sum.iter_mut().zip(value.iter()) {
				*s += coefficient*v;
			}
		}
		Message::from_polynomial(&sum)
	}
}

impl<const L: usize, const N: usize> Atomic for Wsum<L, N>
{
	const INPUTS: &'static [PortType] = &[PortType::Real(L as u8); N];
	const OUTPUTS: &'static [PortType] = &[PortType::Real(L as u8)];

	fn initialize(&mut self, _ctx: &mut Context) -> Result<()>
	{
		self.values = initial_values(&self.default_values);
		self.sigma = INFINITY;
		Ok(())
	}

	fn internal(&mut self, _ctx: &mut Context) -> Result<()>
	{
		self.sigma = INFINITY;
		Ok(())
	}

	fn external(&mut self, _ctx: &mut Context, e: Time, inputs: Inputs) -> Result<()>
	{
		advance_all(&mut self.values, e);
		store_inputs(&mut self.values, inputs);
		self.sigma = reactive_sigma(!inputs.is_empty());
		Ok(())
	}

	fn lambda(&self, outputs: &mut Outputs)
	{
		outputs.send(OUT_PORT, self.output());
	}

	fn ta(&self) -> Time
	{
		self.sigma
	}

	fn observation(&self) -> Message
	{
		self.output()
	}
}

/// Product of two inputs, truncated to L coefficients.
#[derive(Clone, Debug)]
pub struct Multiplier<const L: usize>
{
	values: [[f64; L]; 2],
	sigma: Time,
}

impl<const L: usize> Multiplier<L>
{
	pub fn new() -> Multiplier<L>
	{
		Multiplier {values: [[0.0; L]; 2], sigma: INFINITY}
	}

	fn output(&self) -> Message
	{
		let (a, b) = (&self.values[0], &self.values[1]);
		let mut product = [0.0; L];
		for i in 0..L {
			for j in 0..=i {
				product[i] += a[j]*b[i - j];
			}
		}
		Message::from_polynomial(&product)
	}
}

impl<const L: usize> Atomic for Multiplier<L>
{
	const INPUTS: &'static [PortType] = &[PortType::Real(L as u8), PortType::Real(L as u8)];
	const OUTPUTS: &'static [PortType] = &[PortType::Real(L as u8)];

	fn initialize(&mut self, _ctx: &mut Context) -> Result<()>
	{
		self.values = [[0.0; L]; 2];
		self.sigma = INFINITY;
		Ok(())
	}

	fn internal(&mut self, _ctx: &mut Context) -> Result<()>
	{
		self.sigma = INFINITY;
		Ok(())
	}

	fn external(&mut self, _ctx: &mut Context, e: Time, inputs: Inputs) -> Result<()>
	{
		advance_all(&mut self.values, e);
		store_inputs(&mut self.values, inputs);
		self.sigma = reactive_sigma(!inputs.is_empty());
		Ok(())
	}

	fn lambda(&self, outputs: &mut Outputs)
	{
		outputs.send(OUT_PORT, self.output());
	}

	fn ta(&self) -> Time
	{
		self.sigma
	}

	fn observation(&self) -> Message
	{
		self.output()
	}
}

// Taylor coefficients of u(t)^n given the coefficients of u.
fn power<const L: usize>(u: &[f64; L], n: f64) -> Message
{
	let mut result = [0.0; L];
	result[0] = u[0].powf(n);
	if L > 1 {
		result[1] = n*u[0].powf(n - 1.0)*u[1];
	}
	if L > 2 {
		result[2] = n*u[0].powf(n - 1.0)*u[2] + 0.5*n*(n - 1.0)*u[0].powf(n - 2.0)*u[1]*u[1];
	}
	Message::from_polynomial(&result)
}

/// Raises the input to the power n.
#[derive(Clone, Debug)]
pub struct Power<const L: usize>
{
	pub n: f64,
	value: [f64; L],
	sigma: Time,
}

impl<const L: usize> Power<L>
{
	pub fn new(n: f64) -> Power<L>
	{
		Power {n, value: [0.0; L], sigma: INFINITY}
	}
}

impl<const L: usize> Atomic for Power<L>
{
	const INPUTS: &'static [PortType] = &[PortType::Real(L as u8)];
	const OUTPUTS: &'static [PortType] = &[PortType::Real(L as u8)];

	fn initialize(&mut self, _ctx: &mut Context) -> Result<()>
	{
		self.value = [0.0; L];
		self.sigma = INFINITY;
		Ok(())
	}

	fn internal(&mut self, _ctx: &mut Context) -> Result<()>
	{
		self.sigma = INFINITY;
		Ok(())
	}

	fn external(&mut self, _ctx: &mut Context, e: Time, inputs: Inputs) -> Result<()>
	{
		poly::advance(&mut self.value, e);
		if let Some(message) = inputs.last(0) {
			self.value = message.coefficients();
		}
		self.sigma = reactive_sigma(!inputs.is_empty());
		Ok(())
	}

	fn lambda(&self, outputs: &mut Outputs)
	{
		outputs.send(OUT_PORT, power(&self.value, self.n));
	}

	fn ta(&self) -> Time
	{
		self.sigma
	}

	fn observation(&self) -> Message
	{
		power(&self.value, self.n)
	}
}

/// Squares the input.
#[derive(Clone, Debug)]
pub struct Square<const L: usize>
{
	value: [f64; L],
	sigma: Time,
}

impl<const L: usize> Square<L>
{
	pub fn new() -> Square<L>
	{
		Square {value: [0.0; L], sigma: INFINITY}
	}

	fn output(&self) -> Message
	{
		let u = &self.value;
		let mut result = [0.0; L];
		result[0] = u[0]*u[0];
		if L > 1 {
			result[1] = 2.0*u[0]*u[1];
		}
		if L > 2 {
			result[2] = 2.0*u[0]*u[2] + u[1]*u[1];
		}
		Message::from_polynomial(&result)
	}
}

impl<const L: usize> Atomic for Square<L>
{
	const INPUTS: &'static [PortType] = &[PortType::Real(L as u8)];
	const OUTPUTS: &'static [PortType] = &[PortType::Real(L as u8)];

	fn initialize(&mut self, _ctx: &mut Context) -> Result<()>
	{
		self.value = [0.0; L];
		self.sigma = INFINITY;
		Ok(())
	}

	fn internal(&mut self, _ctx: &mut Context) -> Result<()>
	{
		self.sigma = INFINITY;
		Ok(())
	}

	fn external(&mut self, _ctx: &mut Context, e: Time, inputs: Inputs) -> Result<()>
	{
		poly::advance(&mut self.value, e);
		if let Some(message) = inputs.last(0) {
			self.value = message.coefficients();
		}
		self.sigma = reactive_sigma(!inputs.is_empty());
		Ok(())
	}

	fn lambda(&self, outputs: &mut Outputs)
	{
		outputs.send(OUT_PORT, self.output());
	}

	fn ta(&self) -> Time
	{
		self.sigma
	}

	fn observation(&self) -> Message
	{
		self.output()
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::dynamics::testing::*;

	#[test]
	fn weighted_sums_use_the_latest_inputs()
	{
		let mut bench = Bench::new();
		let mut wsum = Wsum::<1, 2>::new([2.0, -0.4]);
		wsum.initialize(&mut bench.context()).unwrap();
		assert_eq!(wsum.ta(), INFINITY);

		send(&mut bench, &mut wsum, 0.0, &[(0, Message::new(18.0)), (1, Message::new(7.0))]);
		assert_eq!(wsum.ta(), 0.0);
		let out = fire(&mut bench, &mut wsum);
		assert!((out[0].1.value() - (36.0 - 2.8)).abs() < 1.0e-12);
		assert_eq!(wsum.ta(), INFINITY);

		send(&mut bench, &mut wsum, 1.0, &[(1, Message::new(10.0))]);
		let out = fire(&mut bench, &mut wsum);
		assert!((out[0].1.value() - (36.0 - 4.0)).abs() < 1.0e-12);
	}

	#[test]
	fn sums_advance_stored_inputs()
	{
		let mut bench = Bench::new();
		let mut sum = Sum::<2, 2>::new();
		sum.default_values = [1.0, 0.0];
		sum.initialize(&mut bench.context()).unwrap();

		send(&mut bench, &mut sum, 0.0, &[(1, Message::with_slope(0.0, 2.0))]);
		fire(&mut bench, &mut sum);

		// input 1 has moved along its slope by the time input 0 changes
		send(&mut bench, &mut sum, 0.5, &[(0, Message::new(3.0))]);
		let out = fire(&mut bench, &mut sum);
		assert_eq!(out[0].1, Message::with_slope(4.0, 2.0));
	}

	#[test]
	fn products_are_truncated()
	{
		let mut bench = Bench::new();
		let mut multiplier = Multiplier::<2>::new();
		multiplier.initialize(&mut bench.context()).unwrap();
		send(&mut bench, &mut multiplier, 0.0, &[(0, Message::with_slope(2.0, 1.0)), (1, Message::with_slope(3.0, -1.0))]);
		let out = fire(&mut bench, &mut multiplier);
		assert_eq!(out[0].1, Message::with_slope(6.0, 1.0));
	}

	#[test]
	fn powers()
	{
		let mut bench = Bench::new();
		let mut cube = Power::<3>::new(3.0);
		cube.initialize(&mut bench.context()).unwrap();
		send(&mut bench, &mut cube, 0.0, &[(0, Message::with_coefficients(2.0, 1.0, 0.0))]);
		let out = fire(&mut bench, &mut cube);

		// (2 + t)^3 = 8 + 12t + 6t^2 + t^3
		assert!((out[0].1[0] - 8.0).abs() < 1.0e-12);
		assert!((out[0].1[1] - 12.0).abs() < 1.0e-12);
		assert!((out[0].1[2] - 6.0).abs() < 1.0e-12);

		let mut square = Square::<3>::new();
		square.initialize(&mut bench.context()).unwrap();
		send(&mut bench, &mut square, 0.0, &[(0, Message::with_coefficients(2.0, 1.0, 0.0))]);
		let out = fire(&mut bench, &mut square);
		assert_eq!(out[0].1, Message::with_coefficients(4.0, 4.0, 1.0));
	}
}
