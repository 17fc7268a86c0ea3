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
/// QSS integrators schedule events at arbitrary real offsets so, unlike a
/// classic discrete event simulation, time is continuous. Infinity is used
/// for "never", e.g. a model that is passive until it receives a message.
pub type Time = f64;

pub const INFINITY: Time = f64::INFINITY;

pub fn is_infinity(t: Time) -> bool
{
	t == INFINITY
}

pub fn is_zero(t: Time) -> bool
{
	t == 0.0
}

/// Time advances must be non-negative numbers (infinity is OK).
pub fn is_valid_ta(ta: Time) -> bool
{
	!ta.is_nan() && ta >= 0.0
}
