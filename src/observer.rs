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
use crate::message::*;
use crate::model::ModelId;
use crate::sim_time::*;
use std::collections::VecDeque;

crate::identifier!(
	/// Refers to an `Observer` allocated with `Simulation::observe`.
	ObserverId, "O");

/// Records what a model looked like each time it transitioned. This is how
/// results get out of a simulation: the observation for a QSS integrator is its
/// state, for a counter its count, etc. Observers are bounded: once capacity
/// observations have been recorded the oldest are dropped.
#[derive(Clone, Debug)]
pub struct Observer
{
	model: ModelId,
	capacity: usize,
	observations: VecDeque<(Time, Message)>,
}

impl Observer
{
	pub fn new(model: ModelId, capacity: usize) -> Observer
	{
		assert!(capacity > 0, "observer capacity should be positive");
		Observer {model, capacity, observations: VecDeque::with_capacity(capacity)}
	}

	/// The model being observed.
	pub fn model(&self) -> ModelId
	{
		self.model
	}

	pub fn capacity(&self) -> usize
	{
		self.capacity
	}

	pub fn len(&self) -> usize
	{
		self.observations.len()
	}

	pub fn is_empty(&self) -> bool
	{
		self.observations.is_empty()
	}

	/// Adds an observation. Observations must be pushed in time order.
	pub fn push(&mut self, time: Time, observation: Message)
	{
		debug_assert!(self.observations.back().map_or(true, |&(t, _)| t <= time), "observations for {} went back in time", self.model);
		if self.observations.len() == self.capacity {
			self.observations.pop_front();
		}
		self.observations.push_back((time, observation));
	}

	/// Oldest first.
	pub fn iter(&self) -> impl Iterator<Item = &(Time, Message)> + '_
	{
		self.observations.iter()
	}

	pub fn last(&self) -> Option<(Time, Message)>
	{
		self.observations.back().copied()
	}

	/// The most recent observation at or before time.
	pub fn at(&self, time: Time) -> Option<Message>
	{
		self.observations.iter().rev().find(|&&(t, _)| t <= time).map(|&(_, m)| m)
	}

	pub fn clear(&mut self)
	{
		self.observations.clear();
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::arena::Identifier;

	#[test]
	fn drops_the_oldest()
	{
		let mut observer = Observer::new(ModelId::from_parts(1, 0), 3);
		for i in 0..5 {
			observer.push(i as Time, Message::new(10.0*i as f64));
		}
		assert_eq!(observer.len(), 3);
		let times: Vec<Time> = observer.iter().map(|o| o.0).collect();
		assert_eq!(times, vec![2.0, 3.0, 4.0]);
		assert_eq!(observer.last(), Some((4.0, Message::new(40.0))));
	}

	#[test]
	fn lookup_by_time()
	{
		let mut observer = Observer::new(ModelId::from_parts(1, 0), 8);
		observer.push(1.0, Message::new(1.0));
		observer.push(2.0, Message::new(2.0));
		observer.push(2.0, Message::new(3.0));
		assert_eq!(observer.at(0.5), None);
		assert_eq!(observer.at(1.5), Some(Message::new(1.0)));
		assert_eq!(observer.at(2.0), Some(Message::new(3.0)));
	}
}
