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
//! Hierarchical state machines. A `StateMachine` is an immutable definition
//! stored in the simulation; models that run one (see `HsmWrapper`) carry
//! their own `Execution` state so that many models can share one definition.
use crate::error::*;
use crate::ports::PortIndex;

crate::identifier!(
	/// Refers to a `StateMachine` registered with a `Simulation`.
	HsmId, "H");

pub type StateId = u8;

/// Used for "no state", e.g. a state without a parent.
pub const INVALID_STATE: StateId = 255;

/// Largest number of states a machine may have. Ids are 0..MAX_STATES.
pub const MAX_STATES: usize = 254;

/// Number of integer registers available to actions and conditions.
pub const REGISTERS: usize = 4;

/// Number of input and output ports.
pub const PORTS: usize = 4;

/// Largest number of outputs a single transition may queue.
pub const MAX_OUTPUTS: usize = 8;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Compare
{
	Equal,
	NotEqual,
	Less,
	LessEqual,
	Greater,
	GreaterEqual,
}

impl Compare
{
	pub fn test(self, a: i32, b: i32) -> bool
	{
		match self {
			Compare::Equal			=> a == b,
			Compare::NotEqual		=> a != b,
			Compare::Less			=> a < b,
			Compare::LessEqual		=> a <= b,
			Compare::Greater		=> a > b,
			Compare::GreaterEqual	=> a >= b,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Condition
{
	/// The state doesn't handle events: its parent is asked instead.
	None,
	Always,

	/// True if the port flags selected by mask equal the corresponding bits
	/// of values. Bit i is port i.
	Port {mask: u8, values: u8},
	RegConst {reg: u8, cmp: Compare, value: i32},
	RegReg {a: u8, cmp: Compare, b: u8},
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Action
{
	None,

	/// Sets a port flag.
	Set(u8),

	/// Clears a port flag.
	Unset(u8),

	/// Clears all of the port flags.
	Reset,

	/// Queues a message for an output port.
	Output {port: u8, value: f64},

	/// Stores then or otherwise into reg depending upon condition.
	Select {reg: u8, condition: Condition, then: i32, otherwise: i32},

	/// Stores the (truncated) value last received on port into reg.
	Affect {reg: u8, port: u8},
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct State
{
	pub enter: Action,
	pub exit: Action,
	pub condition: Condition,
	pub if_action: Action,
	pub if_target: StateId,
	pub else_action: Action,
	pub else_target: StateId,
	pub parent: StateId,
	pub first_child: StateId,
}

impl State
{
	pub fn new() -> State
	{
		State {
			enter: Action::None,
			exit: Action::None,
			condition: Condition::None,
			if_action: Action::None,
			if_target: INVALID_STATE,
			else_action: Action::None,
			else_target: INVALID_STATE,
			parent: INVALID_STATE,
			first_child: INVALID_STATE,
		}
	}
}

impl Default for State
{
	fn default() -> State
	{
		State::new()
	}
}

/// The per model state of a running machine.
#[derive(Clone, Debug, PartialEq)]
pub struct Execution
{
	pub current: StateId,
	pub registers: [i32; REGISTERS],

	/// Latest value received on each input port.
	pub values: [f64; PORTS],

	/// Bit i is set when port i receives a message (or a Set action runs).
	pub flags: u8,
	outputs: [(PortIndex, f64); MAX_OUTPUTS],
	output_len: usize,
}

impl Execution
{
	pub fn new() -> Execution
	{
		Execution {
			current: INVALID_STATE,
			registers: [0; REGISTERS],
			values: [0.0; PORTS],
			flags: 0,
			outputs: [(0, 0.0); MAX_OUTPUTS],
			output_len: 0,
		}
	}

	/// Records a message arriving on an input port.
	pub fn receive(&mut self, port: PortIndex, value: f64)
	{
		self.values[port] = value;
		self.flags |= 1 << port;
	}

	pub fn outputs(&self) -> &[(PortIndex, f64)]
	{
		&self.outputs[..self.output_len]
	}

	pub fn clear_outputs(&mut self)
	{
		self.output_len = 0;
	}

	fn push_output(&mut self, port: PortIndex, value: f64) -> Result<()>
	{
		if self.output_len == MAX_OUTPUTS {
			return Err(Error::InvalidHsm(format!("more than {} outputs were queued", MAX_OUTPUTS)));
		}
		self.outputs[self.output_len] = (port, value);
		self.output_len += 1;
		Ok(())
	}

	fn evaluate(&self, condition: Condition) -> bool
	{
		match condition {
			Condition::None => false,
			Condition::Always => true,
			Condition::Port {mask, values} => self.flags & mask == values & mask,
			Condition::RegConst {reg, cmp, value} => cmp.test(self.registers[reg as usize], value),
			Condition::RegReg {a, cmp, b} => cmp.test(self.registers[a as usize], self.registers[b as usize]),
		}
	}

	fn execute(&mut self, action: Action) -> Result<()>
	{
		match action {
			Action::None => (),
			Action::Set(port) => self.flags |= 1 << port,
			Action::Unset(port) => self.flags &= !(1 << port),
			Action::Reset => self.flags = 0,
			Action::Output {port, value} => self.push_output(port as PortIndex, value)?,
			Action::Select {reg, condition, then, otherwise} => {
				self.registers[reg as usize] = if self.evaluate(condition) {then} else {otherwise};
			},
			Action::Affect {reg, port} => self.registers[reg as usize] = self.values[port as usize] as i32,
		}
		Ok(())
	}
}

impl Default for Execution
{
	fn default() -> Execution
	{
		Execution::new()
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct StateMachine
{
	pub states: Vec<State>,

	/// The outermost state, entered when the machine starts.
	pub top: StateId,
}

impl StateMachine
{
	pub fn new() -> StateMachine
	{
		StateMachine {states: Vec::new(), top: 0}
	}

	/// Appends a new state as a child of parent (which may be INVALID_STATE).
	/// The first child added becomes the parent's initial state.
	pub fn add_state(&mut self, parent: StateId) -> Result<StateId>
	{
		if self.states.len() == MAX_STATES {
			return Err(Error::InvalidHsm(format!("more than {} states", MAX_STATES)));
		}
		if parent != INVALID_STATE && parent as usize >= self.states.len() {
			return Err(Error::InvalidHsm(format!("parent {} does not exist", parent)));
		}

		let id = self.states.len() as StateId;
		let mut state = State::new();
		state.parent = parent;
		self.states.push(state);

		if parent != INVALID_STATE && self.states[parent as usize].first_child == INVALID_STATE {
			self.states[parent as usize].first_child = id;
		}
		Ok(id)
	}

	pub fn state(&self, id: StateId) -> &State
	{
		&self.states[id as usize]
	}

	pub fn state_mut(&mut self, id: StateId) -> &mut State
	{
		&mut self.states[id as usize]
	}

	/// Checks that every state reference, port, and register is in range and
	/// that the parent links form a tree.
	pub fn validate(&self) -> Result<()>
	{
		let len = self.states.len();
		if len == 0 {
			return Err(Error::InvalidHsm("there are no states".to_string()));
		}
		if len > MAX_STATES {
			return Err(Error::InvalidHsm(format!("{} states is more than {}", len, MAX_STATES)));
		}
		if self.top as usize >= len {
			return Err(Error::InvalidHsm(format!("top state {} does not exist", self.top)));
		}

		let state_ok = |id: StateId| id == INVALID_STATE || (id as usize) < len;
		for (i, state) in self.states.iter().enumerate() {
			for (what, id) in [("parent", state.parent), ("first child", state.first_child), ("if target", state.if_target), ("else target", state.else_target)] {
				if !state_ok(id) {
					return Err(Error::InvalidHsm(format!("state {} {} {} does not exist", i, what, id)));
				}
			}
			if state.first_child != INVALID_STATE && self.states[state.first_child as usize].parent as usize != i {
				return Err(Error::InvalidHsm(format!("state {} first child {} has a different parent", i, state.first_child)));
			}
			check_condition(i, state.condition)?;
			for action in [state.enter, state.exit, state.if_action, state.else_action] {
				check_action(i, action)?;
			}

			let mut depth = 0;
			let mut ancestor = state.parent;
			while ancestor != INVALID_STATE {
				depth += 1;
				if depth > len {
					return Err(Error::InvalidHsm(format!("state {} has a parent cycle", i)));
				}
				ancestor = self.states[ancestor as usize].parent;
			}
		}
		Ok(())
	}

	/// Enters the top state and then its chain of initial states.
	pub fn start(&self, exec: &mut Execution) -> Result<()>
	{
		exec.current = INVALID_STATE;
		exec.clear_outputs();
		self.enter(exec, self.top)?;
		self.enter_initial(exec, self.top)
	}

	/// Gives the current state (or the closest ancestor that has a condition)
	/// a chance to transition. Returns true if some state handled the event.
	pub fn dispatch(&self, exec: &mut Execution) -> Result<bool>
	{
		let mut handler = exec.current;
		while handler != INVALID_STATE && self.state(handler).condition == Condition::None {
			handler = self.state(handler).parent;
		}
		if handler == INVALID_STATE {
			return Ok(false);
		}

		let state = *self.state(handler);
		let (action, target) = if exec.evaluate(state.condition) {
			(state.if_action, state.if_target)
		} else {
			(state.else_action, state.else_target)
		};
		exec.execute(action)?;
		if target != INVALID_STATE {
			self.transition(exec, target)?;
		}
		Ok(true)
	}

	fn transition(&self, exec: &mut Execution, target: StateId) -> Result<()>
	{
		let source = exec.current;
		let lca = self.common_ancestor(source, target);

		let mut state = source;
		while state != lca && state != INVALID_STATE {
			exec.execute(self.state(state).exit)?;
			state = self.state(state).parent;
		}

		// enter from just below the ancestor down to the target
		let mut path = [INVALID_STATE; MAX_STATES];
		let mut len = 0;
		let mut state = target;
		while state != lca && state != INVALID_STATE {
			path[len] = state;
			len += 1;
			state = self.state(state).parent;
		}
		for &state in path[..len].iter().rev() {
			self.enter(exec, state)?;
		}
		self.enter_initial(exec, target)
	}

	fn enter(&self, exec: &mut Execution, state: StateId) -> Result<()>
	{
		exec.current = state;
		exec.execute(self.state(state).enter)
	}

	fn enter_initial(&self, exec: &mut Execution, state: StateId) -> Result<()>
	{
		let mut child = self.state(state).first_child;
		while child != INVALID_STATE {
			self.enter(exec, child)?;
			child = self.state(child).first_child;
		}
		Ok(())
	}

	fn is_ancestor(&self, ancestor: StateId, mut state: StateId) -> bool
	{
		while state != INVALID_STATE {
			if state == ancestor {
				return true;
			}
			state = self.state(state).parent;
		}
		false
	}

	// The innermost state that contains both source and target but is neither
	// of them. So a transition to self (or to an ancestor) exits and re-enters
	// the target.
	fn common_ancestor(&self, source: StateId, target: StateId) -> StateId
	{
		let mut candidate = self.state(target).parent;
		while candidate != INVALID_STATE && !self.is_ancestor(candidate, source) {
			candidate = self.state(candidate).parent;
		}
		candidate
	}
}

impl Default for StateMachine
{
	fn default() -> StateMachine
	{
		StateMachine::new()
	}
}

fn check_reg(state: usize, reg: u8) -> Result<()>
{
	if reg as usize >= REGISTERS {
		return Err(Error::InvalidHsm(format!("state {} uses register {}", state, reg)));
	}
	Ok(())
}

fn check_port(state: usize, port: u8) -> Result<()>
{
	if port as usize >= PORTS {
		return Err(Error::InvalidHsm(format!("state {} uses port {}", state, port)));
	}
	Ok(())
}

fn check_condition(state: usize, condition: Condition) -> Result<()>
{
	match condition {
		Condition::None | Condition::Always => Ok(()),
		Condition::Port {mask, ..} => {
			if mask >> PORTS != 0 {
				return Err(Error::InvalidHsm(format!("state {} port mask {:#x} is too wide", state, mask)));
			}
			Ok(())
		},
		Condition::RegConst {reg, ..} => check_reg(state, reg),
		Condition::RegReg {a, b, ..} => {
			check_reg(state, a)?;
			check_reg(state, b)
		},
	}
}

fn check_action(state: usize, action: Action) -> Result<()>
{
	match action {
		Action::None | Action::Reset => Ok(()),
		Action::Set(port) | Action::Unset(port) | Action::Output {port, ..} => check_port(state, port),
		Action::Select {reg, condition, ..} => {
			check_reg(state, reg)?;
			check_condition(state, condition)
		},
		Action::Affect {reg, port} => {
			check_reg(state, reg)?;
			check_port(state, port)
		},
	}
}

#[cfg(test)]
mod tests
{
	use super::*;

	// top
	//   a
	//     a1
	//     a2
	//   b
	fn machine() -> (StateMachine, [StateId; 5])
	{
		let mut m = StateMachine::new();
		let top = m.add_state(INVALID_STATE).unwrap();
		let a = m.add_state(top).unwrap();
		let a1 = m.add_state(a).unwrap();
		let a2 = m.add_state(a).unwrap();
		let b = m.add_state(top).unwrap();
		for (i, &s) in [top, a, a1, a2, b].iter().enumerate() {
			m.state_mut(s).enter = Action::Output {port: 0, value: i as f64};
			m.state_mut(s).exit = Action::Output {port: 1, value: i as f64};
		}
		(m, [top, a, a1, a2, b])
	}

	#[test]
	fn start_enters_initial_states()
	{
		let (m, [_, _, a1, _, _]) = machine();
		m.validate().unwrap();

		let mut exec = Execution::new();
		m.start(&mut exec).unwrap();
		assert_eq!(exec.current, a1);
		assert_eq!(exec.outputs(), &[(0, 0.0), (0, 1.0), (0, 2.0)]);
	}

	#[test]
	fn transitions_exit_and_enter_up_to_the_common_ancestor()
	{
		let (mut m, [_, a, a1, _, b]) = machine();
		m.state_mut(a1).condition = Condition::Port {mask: 0b1, values: 0b1};
		m.state_mut(a1).if_target = b;
		m.state_mut(a1).if_action = Action::Output {port: 2, value: 9.0};
		m.validate().unwrap();

		let mut exec = Execution::new();
		m.start(&mut exec).unwrap();
		exec.clear_outputs();

		assert!(m.dispatch(&mut exec).unwrap());	// flag not set so the else branch (internal) is taken
		assert_eq!(exec.current, a1);
		assert!(exec.outputs().is_empty());

		exec.receive(0, 3.0);
		assert!(m.dispatch(&mut exec).unwrap());
		assert_eq!(exec.current, b);
		assert_eq!(exec.outputs(), &[(2, 9.0), (1, 2.0), (1, 1.0), (0, 4.0)]);
		let _ = a;
	}

	#[test]
	fn parents_handle_events_their_children_ignore()
	{
		let (mut m, [top, a, _, a2, _]) = machine();
		m.state_mut(a).condition = Condition::Always;
		m.state_mut(a).if_target = a2;

		let mut exec = Execution::new();
		m.start(&mut exec).unwrap();
		exec.clear_outputs();
		assert!(m.dispatch(&mut exec).unwrap());
		assert_eq!(exec.current, a2);
		assert_eq!(exec.outputs(), &[(1, 2.0), (0, 3.0)]);
		let _ = top;
	}

	#[test]
	fn self_transitions_reenter()
	{
		let mut m = StateMachine::new();
		let s = m.add_state(INVALID_STATE).unwrap();
		m.state_mut(s).condition = Condition::Always;
		m.state_mut(s).if_target = s;
		m.state_mut(s).enter = Action::Output {port: 0, value: 1.0};
		m.state_mut(s).exit = Action::Output {port: 0, value: 0.0};

		let mut exec = Execution::new();
		m.start(&mut exec).unwrap();
		exec.clear_outputs();
		m.dispatch(&mut exec).unwrap();
		assert_eq!(exec.outputs(), &[(0, 0.0), (0, 1.0)]);
	}

	#[test]
	fn registers()
	{
		let mut m = StateMachine::new();
		let s = m.add_state(INVALID_STATE).unwrap();
		let t = m.add_state(INVALID_STATE).unwrap();
		m.state_mut(s).condition = Condition::RegConst {reg: 0, cmp: Compare::GreaterEqual, value: 5};
		m.state_mut(s).if_target = t;
		m.state_mut(s).else_action = Action::Affect {reg: 0, port: 1};
		m.state_mut(t).enter = Action::Select {reg: 1, condition: Condition::RegReg {a: 0, cmp: Compare::Greater, b: 2}, then: 10, otherwise: 20};
		m.validate().unwrap();

		let mut exec = Execution::new();
		m.start(&mut exec).unwrap();
		exec.receive(1, 7.9);
		m.dispatch(&mut exec).unwrap();		// else branch copies the port value
		assert_eq!(exec.registers[0], 7);
		assert_eq!(exec.current, s);

		m.dispatch(&mut exec).unwrap();
		assert_eq!(exec.current, t);
		assert_eq!(exec.registers[1], 10);
	}

	#[test]
	fn flags()
	{
		let mut exec = Execution::new();
		exec.execute(Action::Set(2)).unwrap();
		exec.receive(0, 1.0);
		assert_eq!(exec.flags, 0b101);
		assert!(exec.evaluate(Condition::Port {mask: 0b101, values: 0b101}));
		exec.execute(Action::Unset(0)).unwrap();
		assert!(!exec.evaluate(Condition::Port {mask: 0b101, values: 0b101}));
		exec.execute(Action::Reset).unwrap();
		assert_eq!(exec.flags, 0);
	}

	#[test]
	fn too_many_outputs()
	{
		let mut exec = Execution::new();
		for _ in 0..MAX_OUTPUTS {
			exec.execute(Action::Output {port: 0, value: 1.0}).unwrap();
		}
		assert!(matches!(exec.execute(Action::Output {port: 0, value: 1.0}), Err(Error::InvalidHsm(_))));
	}

	#[test]
	fn validation()
	{
		assert!(StateMachine::new().validate().is_err());

		let (mut m, [_, a, _, _, _]) = machine();
		m.state_mut(a).if_target = 200;
		assert!(m.validate().is_err());

		let (mut m, [top, _, _, _, b]) = machine();
		m.state_mut(top).parent = b;
		assert!(m.validate().is_err());

		let (mut m, [_, _, a1, _, _]) = machine();
		m.state_mut(a1).condition = Condition::RegConst {reg: 4, cmp: Compare::Equal, value: 0};
		assert!(m.validate().is_err());

		let (mut m, [_, _, a1, _, _]) = machine();
		m.state_mut(a1).exit = Action::Output {port: 7, value: 0.0};
		assert!(m.validate().is_err());
	}
}
