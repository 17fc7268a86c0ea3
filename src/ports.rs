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
//! Ports are how models exchange `Message`s. Each dynamics type has a fixed
//! list of typed input and output ports and connections are only allowed
//! between compatible ports, see `is_compatible`.
use crate::message::*;
use crate::model::ModelId;
use std::fmt;

/// Port index within a model. Models have only a handful of ports.
pub type PortIndex = usize;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PortType
{
	/// A QSS polynomial with level coefficients (1, 2, or 3).
	Real(u8),

	/// True or false encoded as the sign of the first coefficient.
	Boolean,

	/// Anything at all, e.g. counters count any message and queues forward
	/// whatever they are given.
	Generic,
}

impl fmt::Display for PortType
{
	fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result
	{
		match *self {
			PortType::Real(level)	=> write!(formatter, "qss{}", level),
			PortType::Boolean		=> write!(formatter, "boolean"),
			PortType::Generic		=> write!(formatter, "generic"),
		}
	}
}

/// Returns true if messages sent from an output port of the first type can be
/// received by an input port of the second type. Lower level QSS outputs may
/// feed higher level inputs (the missing coefficients are zero) but not the
/// reverse.
pub fn is_compatible(output: PortType, input: PortType) -> bool
{
	match (output, input) {
		(_, PortType::Generic)						=> true,
		(PortType::Generic, _)						=> true,
		(PortType::Boolean, PortType::Boolean)		=> true,
		(PortType::Real(k), PortType::Real(m))		=> k <= m,
		_											=> false,
	}
}

impl PortType
{
	/// Shapes a message for delivery to an input port of this type. Generic
	/// outputs (e.g. a queue) can pass along anything so level k inputs drop
	/// the coefficients past k and boolean inputs only see true or false.
	pub fn conform(self, message: Message) -> Message
	{
		match self {
			PortType::Real(level) => {
				let mut message = message;
				for c in message.0.iter_mut().skip(level as usize) {
					*c = 0.0;
				}
				message
			},
			PortType::Boolean => Message::boolean(message.is_true()),
			PortType::Generic => message,
		}
	}
}

/// A message that has been routed to an input port.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Delivery
{
	pub dst: ModelId,
	pub port: PortIndex,
	pub message: Message,
}

/// The messages a model received during the current step. This is a view into
/// the simulation's routing buffer so nothing is retained once the model's
/// transition finishes.
#[derive(Clone, Copy)]
pub struct Inputs<'a>
{
	deliveries: &'a [Delivery],
}

impl<'a> Inputs<'a>
{
	pub fn new(deliveries: &'a [Delivery]) -> Inputs<'a>
	{
		Inputs {deliveries}
	}

	pub fn empty() -> Inputs<'static>
	{
		Inputs {deliveries: &[]}
	}

	pub fn is_empty(&self) -> bool
	{
		self.deliveries.is_empty()
	}

	pub fn len(&self) -> usize
	{
		self.deliveries.len()
	}

	pub fn has(&self, port: PortIndex) -> bool
	{
		self.deliveries.iter().any(|d| d.port == port)
	}

	/// Messages received on one port, in delivery order.
	pub fn on(&self, port: PortIndex) -> impl Iterator<Item = &'a Message> + 'a
	{
		self.deliveries.iter().filter(move |d| d.port == port).map(|d| &d.message)
	}

	/// The most recent message received on a port.
	pub fn last(&self, port: PortIndex) -> Option<Message>
	{
		self.on(port).last().copied()
	}

	pub fn count(&self, port: PortIndex) -> usize
	{
		self.on(port).count()
	}

	pub fn iter(&self) -> impl Iterator<Item = (PortIndex, &'a Message)> + 'a
	{
		self.deliveries.iter().map(|d| (d.port, &d.message))
	}
}

/// Filled in by a model's output function. The simulation routes the messages
/// through the connection graph and then clears this.
#[derive(Default)]
pub struct Outputs
{
	messages: Vec<(PortIndex, Message)>,
}

impl Outputs
{
	pub fn new() -> Outputs
	{
		Outputs {messages: Vec::with_capacity(16)}
	}

	pub fn send(&mut self, port: PortIndex, message: Message)
	{
		self.messages.push((port, message));
	}

	pub fn is_empty(&self) -> bool
	{
		self.messages.is_empty()
	}

	pub fn len(&self) -> usize
	{
		self.messages.len()
	}

	pub fn iter(&self) -> impl Iterator<Item = &(PortIndex, Message)> + '_
	{
		self.messages.iter()
	}

	pub fn clear(&mut self)
	{
		self.messages.clear();
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::arena::Identifier;

	#[test]
	fn compatibility()
	{
		assert!(is_compatible(PortType::Real(1), PortType::Real(3)));
		assert!(is_compatible(PortType::Real(2), PortType::Real(2)));
		assert!(!is_compatible(PortType::Real(3), PortType::Real(1)));
		assert!(!is_compatible(PortType::Real(2), PortType::Boolean));
		assert!(!is_compatible(PortType::Boolean, PortType::Real(1)));
		assert!(is_compatible(PortType::Boolean, PortType::Boolean));
		assert!(is_compatible(PortType::Boolean, PortType::Generic));
		assert!(is_compatible(PortType::Generic, PortType::Boolean));
	}

	#[test]
	fn deliveries_match_the_input_type()
	{
		let message = Message::with_coefficients(2.5, -1.0, 0.5);
		assert_eq!(PortType::Real(1).conform(message), Message::new(2.5));
		assert_eq!(PortType::Real(2).conform(message), Message::with_slope(2.5, -1.0));
		assert_eq!(PortType::Real(3).conform(message), message);
		assert_eq!(PortType::Generic.conform(message), message);
		assert_eq!(PortType::Boolean.conform(message), Message::boolean(true));
		assert_eq!(PortType::Boolean.conform(Message::with_slope(-0.5, 10.0)), Message::boolean(false));
	}

	#[test]
	fn inputs_by_port()
	{
		let dst = ModelId::from_parts(1, 0);
		let deliveries = [
			Delivery {dst, port: 0, message: Message::new(1.0)},
			Delivery {dst, port: 1, message: Message::new(2.0)},
			Delivery {dst, port: 0, message: Message::new(3.0)},
		];
		let inputs = Inputs::new(&deliveries);
		assert_eq!(inputs.len(), 3);
		assert_eq!(inputs.count(0), 2);
		assert_eq!(inputs.last(0), Some(Message::new(3.0)));
		assert_eq!(inputs.last(1), Some(Message::new(2.0)));
		assert_eq!(inputs.last(2), None);
		assert!(!inputs.has(2));
		assert!(Inputs::empty().is_empty());
	}
}
