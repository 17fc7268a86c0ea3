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
use crate::arena::Arena;
use crate::hsm::*;
use crate::logger::*;
use crate::model::ModelId;
use crate::sim_time::Time;
use crate::sources::*;

/// Passed into a model's transition functions. This is how dynamics get at
/// shared simulation state, e.g. the external sources they pull values from.
pub struct Context<'a>
{
	/// The current simulation time.
	pub t: Time,

	/// The model currently being executed.
	pub id: ModelId,

	/// Name of the model's dynamics. This is used by the log methods.
	pub name: &'static str,

	pub sources: &'a mut ExternalSources,

	/// State machine definitions used by `HsmWrapper` models.
	pub hsms: &'a Arena<StateMachine, HsmId>,

	/// Instead of using this field directly it is generally simplest to use
	/// the log methods on Context.
	pub logger: &'a Logger,
}

impl<'a> Context<'a>
{
	pub fn log_error(&self, message: &str)
	{
		log_error!(self.logger, self.name, "{} {}", self.id, message);
	}

	pub fn log_warning(&self, message: &str)
	{
		log_warning!(self.logger, self.name, "{} {}", self.id, message);
	}

	pub fn log_info(&self, message: &str)
	{
		log_info!(self.logger, self.name, "{} {}", self.id, message);
	}

	pub fn log_debug(&self, message: &str)
	{
		log_debug!(self.logger, self.name, "{} {}", self.id, message);
	}

	pub fn log_excessive(&self, message: &str)
	{
		log_excessive!(self.logger, self.name, "{} {}", self.id, message);
	}
}
