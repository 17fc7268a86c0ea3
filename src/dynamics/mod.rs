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
//! The atomic model catalogue. Every kind of model implements `Atomic` and is
//! stored inline within the `Dynamics` sum type so that models can live in an
//! arena and be dispatched with a match rather than through a vtable.
pub mod aqss;
pub mod arithmetic;
pub mod collect;
pub mod cross;
pub mod generators;
pub mod hsm_wrapper;
pub mod logical;
pub mod poly;
pub mod qss;
pub mod queue;

pub use self::aqss::*;
pub use self::arithmetic::*;
pub use self::collect::*;
pub use self::cross::*;
pub use self::generators::*;
pub use self::hsm_wrapper::*;
pub use self::logical::*;
pub use self::qss::*;
pub use self::queue::*;

use crate::context::*;
use crate::error::*;
use crate::message::*;
use crate::ports::*;
use crate::sim_time::*;
use std::fmt;

/// The DEVS atomic model protocol. The simulation calls `lambda` just before
/// an internal (or confluent) transition and uses `ta` afterwards to decide
/// when the model runs next.
pub trait Atomic: Clone + fmt::Debug
{
	/// Types of the input ports, indexed by port.
	const INPUTS: &'static [PortType];

	/// Types of the output ports, indexed by port.
	const OUTPUTS: &'static [PortType];

	/// Called when the simulation starts (or when the model is allocated
	/// into a running simulation). ctx.t is the start time.
	fn initialize(&mut self, _ctx: &mut Context) -> Result<()>
	{
		Ok(())
	}

	/// Internal transition, called when ta expires.
	fn internal(&mut self, ctx: &mut Context) -> Result<()>;

	/// External transition, e is the time since the last transition.
	fn external(&mut self, ctx: &mut Context, e: Time, inputs: Inputs) -> Result<()>;

	/// Called instead of internal when messages arrive as ta expires.
	fn confluent(&mut self, ctx: &mut Context, _e: Time, inputs: Inputs) -> Result<()>
	{
		self.internal(ctx)?;
		self.external(ctx, 0.0, inputs)
	}

	/// Output function.
	fn lambda(&self, outputs: &mut Outputs);

	/// Time advance. INFINITY means passive.
	fn ta(&self) -> Time;

	/// What observers record when the model transitions.
	fn observation(&self) -> Message;

	/// Releases external resources, e.g. source clients.
	fn finalize(&mut self, _ctx: &mut Context)
	{
	}
}

/// Allows `Simulation::get` to return the concrete dynamics of a model.
pub trait DynamicsKind: Sized
{
	fn from_dynamics(dynamics: &Dynamics) -> Option<&Self>;
	fn from_dynamics_mut(dynamics: &mut Dynamics) -> Option<&mut Self>;
}

macro_rules! dynamics
{
	($($variant:ident($ty:ty) => $name:expr),+ $(,)?) => {
		/// Identifies the kind of a `Dynamics` without carrying its state.
		#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
		pub enum DynamicsType
		{
			$($variant),+
		}

		impl DynamicsType
		{
			pub fn all() -> &'static [DynamicsType]
			{
				&[$(DynamicsType::$variant),+]
			}

			/// Used to name models in log messages, e.g. "qss2_integrator".
			pub fn name(self) -> &'static str
			{
				match self {
					$(DynamicsType::$variant => $name),+
				}
			}

			pub fn input_ports(self) -> &'static [PortType]
			{
				match self {
					$(DynamicsType::$variant => <$ty as Atomic>::INPUTS),+
				}
			}

			pub fn output_ports(self) -> &'static [PortType]
			{
				match self {
					$(DynamicsType::$variant => <$ty as Atomic>::OUTPUTS),+
				}
			}
		}

		/// The state of a model, one variant per kind of atomic model.
		#[derive(Clone, Debug)]
		pub enum Dynamics
		{
			$($variant($ty)),+
		}

		impl Dynamics
		{
			pub fn dynamics_type(&self) -> DynamicsType
			{
				match self {
					$(Dynamics::$variant(_) => DynamicsType::$variant),+
				}
			}

			pub fn initialize(&mut self, ctx: &mut Context) -> Result<()>
			{
				match self {
					$(Dynamics::$variant(d) => d.initialize(ctx)),+
				}
			}

			pub fn internal(&mut self, ctx: &mut Context) -> Result<()>
			{
				match self {
					$(Dynamics::$variant(d) => d.internal(ctx)),+
				}
			}

			pub fn external(&mut self, ctx: &mut Context, e: Time, inputs: Inputs) -> Result<()>
			{
				match self {
					$(Dynamics::$variant(d) => d.external(ctx, e, inputs)),+
				}
			}

			pub fn confluent(&mut self, ctx: &mut Context, e: Time, inputs: Inputs) -> Result<()>
			{
				match self {
					$(Dynamics::$variant(d) => d.confluent(ctx, e, inputs)),+
				}
			}

			pub fn lambda(&self, outputs: &mut Outputs)
			{
				match self {
					$(Dynamics::$variant(d) => d.lambda(outputs)),+
				}
			}

			pub fn ta(&self) -> Time
			{
				match self {
					$(Dynamics::$variant(d) => d.ta()),+
				}
			}

			pub fn observation(&self) -> Message
			{
				match self {
					$(Dynamics::$variant(d) => d.observation()),+
				}
			}

			pub fn finalize(&mut self, ctx: &mut Context)
			{
				match self {
					$(Dynamics::$variant(d) => d.finalize(ctx)),+
				}
			}
		}

		$(
			impl From<$ty> for Dynamics
			{
				fn from(dynamics: $ty) -> Dynamics
				{
					Dynamics::$variant(dynamics)
				}
			}

			impl DynamicsKind for $ty
			{
				fn from_dynamics(dynamics: &Dynamics) -> Option<&Self>
				{
					match dynamics {
						Dynamics::$variant(d) => Some(d),
						#[allow(unreachable_patterns)]
						_ => None,
					}
				}

				fn from_dynamics_mut(dynamics: &mut Dynamics) -> Option<&mut Self>
				{
					match dynamics {
						Dynamics::$variant(d) => Some(d),
						#[allow(unreachable_patterns)]
						_ => None,
					}
				}
			}
		)+
	};
}

dynamics! {
	Qss1Integrator(QssIntegrator<1>) => "qss1_integrator",
	Qss2Integrator(QssIntegrator<2>) => "qss2_integrator",
	Qss3Integrator(QssIntegrator<3>) => "qss3_integrator",

	Qss1Sum2(Sum<1, 2>) => "qss1_sum_2",
	Qss1Sum3(Sum<1, 3>) => "qss1_sum_3",
	Qss1Sum4(Sum<1, 4>) => "qss1_sum_4",
	Qss2Sum2(Sum<2, 2>) => "qss2_sum_2",
	Qss2Sum3(Sum<2, 3>) => "qss2_sum_3",
	Qss2Sum4(Sum<2, 4>) => "qss2_sum_4",
	Qss3Sum2(Sum<3, 2>) => "qss3_sum_2",
	Qss3Sum3(Sum<3, 3>) => "qss3_sum_3",
	Qss3Sum4(Sum<3, 4>) => "qss3_sum_4",

	Qss1Wsum2(Wsum<1, 2>) => "qss1_wsum_2",
	Qss1Wsum3(Wsum<1, 3>) => "qss1_wsum_3",
	Qss1Wsum4(Wsum<1, 4>) => "qss1_wsum_4",
	Qss2Wsum2(Wsum<2, 2>) => "qss2_wsum_2",
	Qss2Wsum3(Wsum<2, 3>) => "qss2_wsum_3",
	Qss2Wsum4(Wsum<2, 4>) => "qss2_wsum_4",
	Qss3Wsum2(Wsum<3, 2>) => "qss3_wsum_2",
	Qss3Wsum3(Wsum<3, 3>) => "qss3_wsum_3",
	Qss3Wsum4(Wsum<3, 4>) => "qss3_wsum_4",

	Qss1Multiplier(Multiplier<1>) => "qss1_multiplier",
	Qss2Multiplier(Multiplier<2>) => "qss2_multiplier",
	Qss3Multiplier(Multiplier<3>) => "qss3_multiplier",

	Qss1Power(Power<1>) => "qss1_power",
	Qss2Power(Power<2>) => "qss2_power",
	Qss3Power(Power<3>) => "qss3_power",

	Qss1Square(Square<1>) => "qss1_square",
	Qss2Square(Square<2>) => "qss2_square",
	Qss3Square(Square<3>) => "qss3_square",

	Qss1Cross(Cross<1>) => "qss1_cross",
	Qss2Cross(Cross<2>) => "qss2_cross",
	Qss3Cross(Cross<3>) => "qss3_cross",

	Qss1Filter(Filter<1>) => "qss1_filter",
	Qss2Filter(Filter<2>) => "qss2_filter",
	Qss3Filter(Filter<3>) => "qss3_filter",

	Integrator(AqssIntegrator) => "integrator",
	Quantifier(Quantifier) => "quantifier",

	Constant(Constant) => "constant",
	Generator(Generator) => "generator",
	TimeFunc(TimeFunc) => "time_func",
	Counter(Counter) => "counter",
	Accumulator2(Accumulator) => "accumulator_2",

	Queue(Queue) => "queue",
	DynamicQueue(DynamicQueue) => "dynamic_queue",
	PriorityQueue(PriorityQueue) => "priority_queue",

	LogicalAnd2(LogicalAnd<2>) => "logical_and_2",
	LogicalAnd3(LogicalAnd<3>) => "logical_and_3",
	LogicalOr2(LogicalOr<2>) => "logical_or_2",
	LogicalOr3(LogicalOr<3>) => "logical_or_3",
	LogicalInvert(LogicalInvert) => "logical_invert",

	Hsm(HsmWrapper) => "hsm_wrapper",
}

impl fmt::Display for DynamicsType
{
	fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result
	{
		write!(formatter, "{}", self.name())
	}
}

/// Reactive models (sums, multipliers, etc) respond to every input with an
/// immediate output and are otherwise passive.
pub(crate) fn reactive_sigma(received: bool) -> Time
{
	if received {0.0} else {INFINITY}
}
