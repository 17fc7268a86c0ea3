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
use crate::sim_time::*;
use std::fmt;

/// Where a `Simulation` is in its life cycle. Models can be allocated and
/// connected in any state but Finalized. Stepping requires Running.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SimState
{
	Building,
	Running,
	Finalized,
}

impl SimState
{
	pub fn name(self) -> &'static str
	{
		match self {
			SimState::Building => "building",
			SimState::Running => "running",
			SimState::Finalized => "finalized",
		}
	}
}

impl fmt::Display for SimState
{
	fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result
	{
		write!(formatter, "{}", self.name())
	}
}

/// Returned by `Simulation::step` and `Simulation::run`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepReport
{
	/// Simulation time before the step (or run).
	pub t_prev: Time,

	/// Simulation time after the step, INFINITY if there was nothing left to
	/// do.
	pub t_now: Time,

	/// Number of models that transitioned.
	pub events: usize,
}
