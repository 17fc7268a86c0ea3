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
use crate::model::*;
use std::vec;

/// Holds the new states of the models that transitioned during a step. Nothing
/// is written back to the simulation until every model has run so a failing
/// model leaves the simulation exactly as it was before the step.
pub struct Effector
{
	staged: Vec<(ModelId, Model)>,
}

impl Effector
{
	pub fn new() -> Effector
	{
		Effector {staged: Vec::new()}
	}

	pub fn stage(&mut self, id: ModelId, model: Model)
	{
		debug_assert!(self.staged.last().map_or(true, |s| s.0 < id), "{} was staged out of order", id);
		self.staged.push((id, model));
	}

	pub fn len(&self) -> usize
	{
		self.staged.len()
	}

	pub fn is_empty(&self) -> bool
	{
		self.staged.is_empty()
	}

	/// Staged models in ascending id order.
	pub fn drain(&mut self) -> vec::Drain<'_, (ModelId, Model)>
	{
		self.staged.drain(..)
	}

	pub fn clear(&mut self)
	{
		self.staged.clear();
	}
}

impl Default for Effector
{
	fn default() -> Effector
	{
		Effector::new()
	}
}
