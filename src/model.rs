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
use crate::dynamics::*;
use crate::observer::ObserverId;
use crate::scheduler::HeapHandle;
use crate::sim_time::*;

crate::identifier!(
	/// Refers to a `Model` allocated within a `Simulation`.
	ModelId, "M");

/// An atomic model: its dynamics plus the bookkeeping the simulation needs to
/// schedule it.
#[derive(Clone, Debug)]
pub struct Model
{
	/// Time of the last transition.
	pub tl: Time,

	/// Time of the next internal transition, INFINITY if the model is passive.
	pub tn: Time,

	/// Set when the model is in the scheduler, i.e. when tn is finite.
	pub handle: Option<HeapHandle>,

	pub dynamics: Dynamics,

	pub observer: Option<ObserverId>,
}

impl Model
{
	pub fn new(dynamics: Dynamics) -> Model
	{
		Model {
			tl: 0.0,
			tn: INFINITY,
			handle: None,
			dynamics,
			observer: None,
		}
	}

	pub fn dynamics_type(&self) -> DynamicsType
	{
		self.dynamics.dynamics_type()
	}
}
