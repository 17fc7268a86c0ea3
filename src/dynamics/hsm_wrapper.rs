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
use super::Atomic;
use crate::context::*;
use crate::error::*;
use crate::hsm::*;
use crate::message::*;
use crate::ports::*;
use crate::sim_time::*;

/// Runs a hierarchical state machine registered with `Simulation::alloc_hsm`.
/// Every input port sets the matching port flag of the machine and stores the
/// message's value. Outputs queued by the machine's actions are sent as soon
/// as the machine finishes handling its inputs.
#[derive(Clone, Debug)]
pub struct HsmWrapper
{
	pub hsm: HsmId,
	exec: Execution,
	sigma: Time,
}

impl HsmWrapper
{
	pub fn new(hsm: HsmId) -> HsmWrapper
	{
		HsmWrapper {hsm, exec: Execution::new(), sigma: INFINITY}
	}

	pub fn execution(&self) -> &Execution
	{
		&self.exec
	}

	fn machine<'a>(&self, ctx: &'a Context) -> Result<&'a StateMachine>
	{
		ctx.hsms.get(self.hsm).ok_or_else(|| Error::InvalidHsm(format!("{} has not been allocated", self.hsm)))
	}

	fn update_sigma(&mut self)
	{
		self.sigma = if self.exec.outputs().is_empty() {INFINITY} else {0.0};
	}
}

impl Atomic for HsmWrapper
{
	const INPUTS: &'static [PortType] = &[PortType::Generic; PORTS];
	const OUTPUTS: &'static [PortType] = &[PortType::Generic; PORTS];

	fn initialize(&mut self, ctx: &mut Context) -> Result<()>
	{
		let machine = self.machine(ctx)?;
		self.exec = Execution::new();
		machine.start(&mut self.exec)?;
		self.update_sigma();
		Ok(())
	}

	fn internal(&mut self, _ctx: &mut Context) -> Result<()>
	{
		self.exec.clear_outputs();
		self.sigma = INFINITY;
		Ok(())
	}

	fn external(&mut self, ctx: &mut Context, _e: Time, inputs: Inputs) -> Result<()>
	{
		let machine = self.machine(ctx)?;
		for (port, message) in inputs.iter() {
			self.exec.receive(port, message.value());
		}
		if !machine.dispatch(&mut self.exec)? {
			ctx.log_debug("event was not handled");
		}
		self.update_sigma();
		Ok(())
	}

	fn lambda(&self, outputs: &mut Outputs)
	{
		for &(port, value) in self.exec.outputs() {
			outputs.send(port, Message::new(value));
		}
	}

	fn ta(&self) -> Time
	{
		self.sigma
	}

	fn observation(&self) -> Message
	{
		Message::new(self.exec.current as f64)
	}
}
