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
use std::fmt;
use std::ops::{Index, IndexMut};

/// Number of reals carried by a `Message`.
pub const MESSAGE_LEN: usize = 3;

/// Messages are what models send one another. They are fixed size so that
/// routing them never allocates. The reals are the coefficients of a polynomial
/// of the time elapsed since the message was sent: QSS1 models only use the
/// first, QSS2 models the first two, and QSS3 models all three. Boolean
/// messages use the sign of the first real.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Message(pub [f64; MESSAGE_LEN]);

impl Message
{
	pub fn new(value: f64) -> Message
	{
		Message([value, 0.0, 0.0])
	}

	pub fn with_slope(value: f64, slope: f64) -> Message
	{
		Message([value, slope, 0.0])
	}

	pub fn with_coefficients(value: f64, slope: f64, curvature: f64) -> Message
	{
		Message([value, slope, curvature])
	}

	/// Builds a message from the first `level` coefficients of a polynomial,
	/// the rest are zero filled.
	pub fn from_polynomial(coefficients: &[f64]) -> Message
	{
		let mut message = Message::default();
		for (i, c) in coefficients.iter().take(MESSAGE_LEN).enumerate() {
			message.0[i] = *c;
		}
		message
	}

	pub fn boolean(value: bool) -> Message
	{
		Message::new(if value {1.0} else {0.0})
	}

	pub fn value(&self) -> f64
	{
		self.0[0]
	}

	pub fn is_true(&self) -> bool
	{
		self.0[0] > 0.0
	}

	/// Evaluates the polynomial `elapsed` time units after the message was sent.
	pub fn at(&self, elapsed: f64) -> f64
	{
		self.0[0] + (self.0[1] + self.0[2]*elapsed)*elapsed
	}

	/// Copies the first `level` coefficients into a fixed size array.
	pub fn coefficients<const L: usize>(&self) -> [f64; L]
	{
		let mut result = [0.0; L];
		for (i, c) in result.iter_mut().enumerate() {
			if i < MESSAGE_LEN {
				*c = self.0[i];
			}
		}
		result
	}
}

impl Index<usize> for Message
{
	type Output = f64;

	fn index(&self, index: usize) -> &f64
	{
		&self.0[index]
	}
}

impl IndexMut<usize> for Message
{
	fn index_mut(&mut self, index: usize) -> &mut f64
	{
		&mut self.0[index]
	}
}

impl fmt::Display for Message
{
	fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result
	{
		if self.0[1] == 0.0 && self.0[2] == 0.0 {
			write!(formatter, "{}", self.0[0])
		} else if self.0[2] == 0.0 {
			write!(formatter, "({}, {})", self.0[0], self.0[1])
		} else {
			write!(formatter, "({}, {}, {})", self.0[0], self.0[1], self.0[2])
		}
	}
}

#[cfg(test)]
mod tests
{
	use super::*;

	#[test]
	fn booleans_use_the_sign()
	{
		assert!(Message::boolean(true).is_true());
		assert!(!Message::boolean(false).is_true());
		assert!(!Message::new(-3.0).is_true());
		assert!(Message::new(0.5).is_true());
	}

	#[test]
	fn evaluates_the_polynomial()
	{
		let m = Message::with_coefficients(1.0, 2.0, 3.0);
		assert_eq!(m.at(0.0), 1.0);
		assert_eq!(m.at(2.0), 1.0 + 4.0 + 12.0);
	}

	#[test]
	fn zero_fills()
	{
		let m = Message::from_polynomial(&[4.0]);
		assert_eq!(m, Message([4.0, 0.0, 0.0]));

		let c: [f64; 2] = Message::with_coefficients(1.0, 2.0, 3.0).coefficients();
		assert_eq!(c, [1.0, 2.0]);
	}

	#[test]
	fn display()
	{
		assert_eq!(Message::new(2.5).to_string(), "2.5");
		assert_eq!(Message::with_slope(1.0, -1.0).to_string(), "(1, -1)");
	}
}
