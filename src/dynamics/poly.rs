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
//! Polynomial helpers shared by the QSS models. Polynomials are stored lowest
//! order coefficient first and have at most four coefficients.
use crate::sim_time::*;
use std::f64::consts::PI;

/// Roots closer to zero than this are treated as the current instant, e.g.
/// when a crossing has just been handled.
pub const ROOT_EPSILON: f64 = 1.0e-12;

pub fn evaluate(p: &[f64], t: f64) -> f64
{
	p.iter().rev().fold(0.0, |sum, c| sum*t + c)
}

/// Re-expresses a polynomial of elapsed time so that it is relative to a
/// point e later.
pub fn advance(p: &mut [f64], e: f64)
{
	if e == 0.0 {
		return;
	}

	match p.len() {
		0 | 1 => (),
		2 => p[0] += p[1]*e,
		3 => {
			p[0] += (p[1] + p[2]*e)*e;
			p[1] += 2.0*p[2]*e;
		},
		_ => {
			p[0] += (p[1] + (p[2] + p[3]*e)*e)*e;
			p[1] += (2.0*p[2] + 3.0*p[3]*e)*e;
			p[2] += 3.0*p[3]*e;
		},
	}
}

/// Real roots of a polynomial of degree at most three. Returns the roots and
/// how many there are.
pub fn roots(p: &[f64]) -> ([f64; 3], usize)
{
	let mut result = [0.0; 3];
	let mut degree = p.len();
	while degree > 0 && p[degree - 1] == 0.0 {
		degree -= 1;
	}

	let count = match degree {
		0 | 1 => 0,
		2 => {
			result[0] = -p[0]/p[1];
			1
		},
		3 => quadratic(p[0], p[1], p[2], &mut result),
		_ => cubic(p[0]/p[3], p[1]/p[3], p[2]/p[3], &mut result),
	};
	(result, count)
}

/// Smallest root strictly greater than after, INFINITY if there isn't one.
pub fn min_root_after(p: &[f64], after: f64) -> Time
{
	let (roots, count) = roots(p);
	roots[..count].iter().copied().filter(|r| r.is_finite() && *r > after).fold(INFINITY, f64::min)
}

/// Smallest positive t at which |p(t)| reaches band.
pub fn first_crossing(p: &[f64], band: f64) -> Time
{
	let mut shifted = [0.0; 4];
	let len = p.len().min(4);
	shifted[..len].copy_from_slice(&p[..len]);

	shifted[0] = p[0] - band;
	let upper = min_root_after(&shifted[..len], 0.0);
	shifted[0] = p[0] + band;
	let lower = min_root_after(&shifted[..len], 0.0);
	upper.min(lower)
}

// c + bx + ax^2
fn quadratic(c: f64, b: f64, a: f64, result: &mut [f64; 3]) -> usize
{
	let discriminant = b*b - 4.0*a*c;
	if discriminant < 0.0 {
		return 0;
	}

	let q = -0.5*(b + b.signum()*discriminant.sqrt());
	if q == 0.0 {
		result[0] = 0.0;
		return 1;
	}
	result[0] = q/a;
	result[1] = c/q;
	2
}

// c + bx + ax^2 + x^3
fn cubic(c: f64, b: f64, a: f64, result: &mut [f64; 3]) -> usize
{
	let q = (a*a - 3.0*b)/9.0;
	let r = (2.0*a*a*a - 9.0*a*b + 27.0*c)/54.0;
	let q3 = q*q*q;
	if r*r < q3 {
		let theta = (r/q3.sqrt()).acos();
		let scale = -2.0*q.sqrt();
		result[0] = scale*(theta/3.0).cos() - a/3.0;
		result[1] = scale*((theta + 2.0*PI)/3.0).cos() - a/3.0;
		result[2] = scale*((theta - 2.0*PI)/3.0).cos() - a/3.0;
		3
	} else {
		let s = -r.signum()*(r.abs() + (r*r - q3).sqrt()).cbrt();
		let t = if s == 0.0 {0.0} else {q/s};
		result[0] = s + t - a/3.0;
		1
	}
}
