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
//! Errors returned by the kernel. Note that programmer errors, e.g. a corrupted
//! free list, are still reported with assert!.
use crate::model::ModelId;
use crate::ports::PortType;
use crate::sim_time::Time;
use crate::sources::SourceKind;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error
{
	/// One of the fixed capacity pools is full. The payload names the pool.
	#[error("not enough memory for {0}")]
	NotEnoughMemory(&'static str),

	#[error("model {0} does not exist")]
	UnknownModel(ModelId),

	#[error("model {model} has no {direction} port {port}")]
	UnknownPort {model: ModelId, port: usize, direction: &'static str},

	#[error("can't connect {src} output {src_port} ({output}) to {dst} input {dst_port} ({input})")]
	IncompatiblePorts {src: ModelId, src_port: usize, dst: ModelId, dst_port: usize, output: PortType, input: PortType},

	#[error("{src} output {src_port} is already connected to {dst} input {dst_port}")]
	AlreadyConnected {src: ModelId, src_port: usize, dst: ModelId, dst_port: usize},

	#[error("{src} output {src_port} is not connected to {dst} input {dst_port}")]
	NotConnected {src: ModelId, src_port: usize, dst: ModelId, dst_port: usize},

	#[error("{kind} source {id} has no more values")]
	SourceEmpty {kind: SourceKind, id: u64},

	#[error("{kind} source {id} does not exist")]
	UnknownSource {kind: SourceKind, id: u64},

	#[error("{kind} source {id} is invalid: {reason}")]
	InvalidSource {kind: SourceKind, id: u64, reason: String},

	#[error("model {model} has a bad time advance ({ta})")]
	ModelNegativeTa {model: ModelId, ta: Time},

	/// A pool or buffer was asked for with room for nothing.
	#[error("{0} capacity should be positive")]
	ZeroCapacity(&'static str),

	#[error("state machine is invalid: {0}")]
	InvalidHsm(String),

	/// A run time failure. The simulation is left in the state it had before
	/// the failed step.
	#[error("step failed at model {model}: {cause}")]
	Step {model: ModelId, #[source] cause: Box<Error>},

	#[error("simulation was interrupted")]
	Interrupted,

	#[error("simulation is {actual} but should be {expected}")]
	BadState {expected: &'static str, actual: &'static str},

	#[error("{}: {}", .path.display(), .source)]
	Io {path: PathBuf, #[source] source: io::Error},
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error
{
	/// The model a step failed at, if this is a run time error.
	pub fn model(&self) -> Option<ModelId>
	{
		match *self {
			Error::Step {model, ..} => Some(model),
			Error::ModelNegativeTa {model, ..} => Some(model),
			Error::UnknownModel(model) => Some(model),
			Error::UnknownPort {model, ..} => Some(model),
			_ => None,
		}
	}

	/// Errors raised while a step is executing are wrapped so that callers
	/// know which model failed.
	pub fn in_step(self, model: ModelId) -> Error
	{
		match self {
			Error::Step {..} => self,
			cause => Error::Step {model, cause: Box::new(cause)},
		}
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::arena::Identifier;

	#[test]
	fn display_names_the_model()
	{
		let model = ModelId::from_parts(1, 4);
		let err = Error::ModelNegativeTa {model, ta: -1.0};
		assert!(err.to_string().contains("M4.1"));
		assert!(err.to_string().contains("-1"));
	}

	#[test]
	fn step_errors_keep_their_cause()
	{
		let model = ModelId::from_parts(1, 2);
		let err = Error::SourceEmpty {kind: SourceKind::Constant, id: 3}.in_step(model);
		assert_eq!(err.model(), Some(model));
		match err {
			Error::Step {cause, ..} => assert!(matches!(*cause, Error::SourceEmpty {..})),
			_ => panic!("expected a step error"),
		}
	}

	#[test]
	fn step_errors_are_not_wrapped_twice()
	{
		let a = ModelId::from_parts(1, 2);
		let b = ModelId::from_parts(1, 3);
		let err = Error::Interrupted.in_step(a).in_step(b);
		assert_eq!(err.model(), Some(a));
	}

	#[test]
	fn is_std_error()
	{
		let err: Box<dyn std::error::Error> = Box::new(Error::Interrupted);
		assert!(!err.to_string().is_empty());
	}
}
