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
use crate::arena::*;
use crate::config::*;
use crate::context::*;
use crate::dynamics::*;
use crate::effector::*;
use crate::error::*;
use crate::graph::*;
use crate::hsm::*;
use crate::logger::*;
use crate::model::*;
use crate::observer::*;
use crate::ports::*;
use crate::scheduler::*;
use crate::sim_state::*;
use crate::sim_time::*;
use crate::sources::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use time::OffsetDateTime;

/// Used to stop a simulation from another thread. The simulation checks the
/// token before each step and returns `Error::Interrupted` once it has been
/// cancelled.
#[derive(Clone, Debug, Default)]
pub struct CancelToken
{
	cancelled: Arc<AtomicBool>,
}

impl CancelToken
{
	pub fn new() -> CancelToken
	{
		CancelToken {cancelled: Arc::new(AtomicBool::new(false))}
	}

	pub fn cancel(&self)
	{
		self.cancelled.store(true, Ordering::SeqCst);
	}

	pub fn is_cancelled(&self) -> bool
	{
		self.cancelled.load(Ordering::SeqCst)
	}

	/// Allows a cancelled simulation to be stepped again.
	pub fn reset(&self)
	{
		self.cancelled.store(false, Ordering::SeqCst);
	}
}

/// This is the top-level data structure. Models are allocated, connected
/// together, and then the simulation is initialized and stepped (or run)
/// until there is nothing left to do or a time limit is reached.
///
/// Each step executes every model whose time of next event is the earliest
/// scheduled time (the imminents) along with every model they send messages
/// to. Models execute in ascending id order and all of their new states are
/// committed together: if any model fails the step is undone.
pub struct Simulation
{
	config: Config,
	logger: Logger,
	state: SimState,
	t: Time,
	steps: u64,
	cancel: CancelToken,

	models: Arena<Model, ModelId>,
	graph: Graph,
	scheduler: Scheduler,
	hsms: Arena<StateMachine, HsmId>,
	observers: Arena<Observer, ObserverId>,
	sources: ExternalSources,

	// Scratch buffers, reused from step to step.
	imminents: Vec<ModelId>,
	active: Vec<ModelId>,
	deliveries: Vec<Delivery>,
	outputs: Outputs,
	effector: Effector,
}

impl Simulation
{
	pub fn new(config: Config) -> Simulation
	{
		assert!(config.max_models > 0, "max_models ({}) is not positive", config.max_models);
		assert!(config.max_secs > 0.0, "max_secs ({}) is not positive", config.max_secs);

		let logger = Logger::new(&config);
		Simulation {
			logger,
			state: SimState::Building,
			t: 0.0,
			steps: 0,
			cancel: CancelToken::new(),
			models: Arena::with_capacity("models", config.max_models),
			graph: Graph::new(config.max_node_blocks),
			scheduler: Scheduler::with_capacity(config.max_models),
			hsms: Arena::with_capacity("state machines", config.max_hsms),
			observers: Arena::with_capacity("observers", config.max_observers),
			sources: ExternalSources::new(config.max_sources, config.seed),
			imminents: Vec::new(),
			active: Vec::new(),
			deliveries: Vec::new(),
			outputs: Outputs::new(),
			effector: Effector::new(),
			config,
		}
	}

	// --- building --------------------------------------------------------------
	/// Adds a new model. If the simulation is already running the model is
	/// initialized at the current time.
	pub fn alloc<D: Into<Dynamics>>(&mut self, dynamics: D) -> Result<ModelId>
	{
		self.check_not_finalized()?;

		let model = Model::new(dynamics.into());
		let outputs = model.dynamics_type().output_ports().len();
		let id = self.models.alloc(model)?;
		self.graph.add_model(id, outputs);
		log_debug!(self.logger, "simulation", "allocated {} {}", self.models.get(id).map_or("?", |m| m.dynamics_type().name()), id);

		if self.state == SimState::Running {
			self.active.clear();
			self.active.push(id);
			if let Err(err) = self.initialize_active(self.t) {
				self.graph.clear_model(id);
				self.models.free(id);
				return Err(err);
			}
		}
		Ok(id)
	}

	/// Removes a model along with all of the connections to and from it.
	pub fn free(&mut self, id: ModelId) -> Result<()>
	{
		self.check_not_finalized()?;

		let mut model = self.models.free(id).ok_or(Error::UnknownModel(id))?;
		if let Some(handle) = model.handle.take() {
			self.scheduler.remove(handle);
		}
		if let Some(observer) = model.observer.take() {
			self.observers.free(observer);
		}
		self.graph.remove_edges_to(id);
		self.graph.clear_model(id);

		if self.state == SimState::Running {
			let mut ctx = Context {
				t: self.t,
				id,
				name: model.dynamics_type().name(),
				sources: &mut self.sources,
				hsms: &self.hsms,
				logger: &self.logger,
			};
			model.dynamics.finalize(&mut ctx);
		}
		log_debug!(self.logger, "simulation", "freed {}", id);
		Ok(())
	}

	/// Registers a state machine for use by `HsmWrapper` models.
	pub fn alloc_hsm(&mut self, machine: StateMachine) -> Result<HsmId>
	{
		machine.validate()?;
		self.hsms.alloc(machine)
	}

	pub fn hsm(&self, id: HsmId) -> Option<&StateMachine>
	{
		self.hsms.get(id)
	}

	/// Connects an output port of src to an input port of dst. The port types
	/// must be compatible, see `is_compatible`.
	pub fn connect(&mut self, src: ModelId, src_port: PortIndex, dst: ModelId, dst_port: PortIndex) -> Result<()>
	{
		self.check_not_finalized()?;

		let (output, input) = self.port_types(src, src_port, dst, dst_port)?;
		if !is_compatible(output, input) {
			return Err(Error::IncompatiblePorts {src, src_port, dst, dst_port, output, input});
		}
		self.graph.connect(src, src_port, dst, dst_port)
	}

	pub fn disconnect(&mut self, src: ModelId, src_port: PortIndex, dst: ModelId, dst_port: PortIndex) -> Result<()>
	{
		self.check_not_finalized()?;

		self.port_types(src, src_port, dst, dst_port)?;
		self.graph.disconnect(src, src_port, dst, dst_port)
	}

	/// The input ports an output port is connected to, in connection order.
	/// Freed models have no fanout even if their slot has been reused.
	pub fn fanout(&self, src: ModelId, src_port: PortIndex) -> Fanout<'_>
	{
		self.graph.fanout(src, src_port)
	}

	/// Starts recording the model's observation each time it transitions.
	/// Only the most recent capacity observations are kept.
	pub fn observe(&mut self, id: ModelId, capacity: usize) -> Result<ObserverId>
	{
		let model = self.models.get(id).ok_or(Error::UnknownModel(id))?;
		if capacity == 0 {
			return Err(Error::ZeroCapacity("observer"));
		}
		let mut observer = Observer::new(id, capacity);
		if self.state == SimState::Running {
			observer.push(model.tl, model.dynamics.observation());
		}

		let observer = self.observers.alloc(observer)?;
		if let Some(model) = self.models.get_mut(id) {
			if let Some(old) = model.observer.replace(observer) {
				self.observers.free(old);
			}
		}
		Ok(observer)
	}

	pub fn observer(&self, id: ObserverId) -> Option<&Observer>
	{
		self.observers.get(id)
	}

	// --- running ---------------------------------------------------------------
	/// Initializes every model and schedules the ones that have a finite time
	/// advance. t0 is the start time.
	pub fn initialize(&mut self, t0: Time) -> Result<()>
	{
		self.check_state(SimState::Building)?;
		assert!(t0.is_finite(), "t0 ({}) should be finite", t0);

		self.t = t0;
		self.logger.time = t0;
		self.steps = 0;
		self.active.clear();
		self.active.extend(self.models.iter().map(|(id, _)| id));
		self.active.sort();
		self.initialize_active(t0)?;

		self.state = SimState::Running;
		log_info!(self.logger, "simulation", "initialized {} models ({} scheduled)", self.models.len(), self.scheduler.len());
		Ok(())
	}

	/// Executes the imminent models (and the models they send messages to).
	/// If nothing is scheduled the report's t_now is INFINITY and there are no
	/// events. On error the simulation is left as it was before the step.
	pub fn step(&mut self) -> Result<StepReport>
	{
		self.check_state(SimState::Running)?;
		if self.cancel.is_cancelled() {
			return Err(Error::Interrupted);
		}

		let t_prev = self.t;
		if self.scheduler.is_empty() {
			return Ok(StepReport {t_prev, t_now: INFINITY, events: 0});
		}

		self.imminents.clear();
		let t = self.scheduler.pop_imminents(&mut self.imminents);
		debug_assert!(t >= t_prev, "time went backwards from {} to {}", t_prev, t);
		self.imminents.sort();
		for &id in &self.imminents {
			if let Some(model) = self.models.get_mut(id) {
				model.handle = None;
			}
		}

		self.t = t;
		self.logger.time = t;
		self.sources.checkpoint();
		match self.execute(t) {
			Ok(()) => {
				let events = self.effector.len();
				self.commit(t);
				self.steps += 1;
				log_excessive!(self.logger, "simulation", "step {} ran {} models", self.steps, events);
				Ok(StepReport {t_prev, t_now: t, events})
			},
			Err(err) => {
				log_error!(self.logger, "simulation", "{}", err);
				self.abort(t_prev);
				Err(err)
			},
		}
	}

	/// Steps until the next event would be after t_end, there are no events
	/// left, or one of the config limits (max_steps, max_secs) is reached. If
	/// the run stops because of t_end the simulation time becomes t_end. The
	/// report covers the whole run.
	pub fn run(&mut self, t_end: Time) -> Result<StepReport>
	{
		self.check_state(SimState::Running)?;

		let t_prev = self.t;
		let started = OffsetDateTime::now_utc();
		let mut steps = 0;
		let mut events = 0;
		loop {
			if self.scheduler.is_empty() || self.scheduler.tn() > t_end {
				if t_end.is_finite() && t_end > self.t {
					self.t = t_end;
					self.logger.time = t_end;
				}
				break;
			}
			if steps >= self.config.max_steps {
				log_info!(self.logger, "simulation", "stopping after {} steps", steps);
				break;
			}
			if self.config.max_secs.is_finite() && (OffsetDateTime::now_utc() - started).as_seconds_f64() >= self.config.max_secs {
				log_info!(self.logger, "simulation", "stopping after {:.1}s", self.config.max_secs);
				break;
			}

			let report = self.step()?;
			events += report.events;
			steps += 1;
		}
		Ok(StepReport {t_prev, t_now: self.t, events})
	}

	/// Releases the external resources held by models. The simulation can't
	/// be used after this.
	pub fn finalize(&mut self) -> Result<()>
	{
		self.check_not_finalized()?;

		let t = self.t;
		for (id, model) in self.models.iter_mut() {
			let mut ctx = Context {
				t,
				id,
				name: model.dynamics_type().name(),
				sources: &mut self.sources,
				hsms: &self.hsms,
				logger: &self.logger,
			};
			model.dynamics.finalize(&mut ctx);
			model.handle = None;
		}
		self.scheduler.clear();
		self.state = SimState::Finalized;
		log_info!(self.logger, "simulation", "finalized after {} steps", self.steps);
		Ok(())
	}

	// --- accessors -------------------------------------------------------------
	pub fn state(&self) -> SimState
	{
		self.state
	}

	/// The current simulation time.
	pub fn time(&self) -> Time
	{
		self.t
	}

	/// Time of the next event, INFINITY if there is nothing to do.
	pub fn next_time(&self) -> Time
	{
		self.scheduler.tn()
	}

	/// Number of steps executed since initialize.
	pub fn steps(&self) -> u64
	{
		self.steps
	}

	pub fn config(&self) -> &Config
	{
		&self.config
	}

	pub fn logger(&self) -> &Logger
	{
		&self.logger
	}

	pub fn cancel_token(&self) -> CancelToken
	{
		self.cancel.clone()
	}

	pub fn model(&self, id: ModelId) -> Option<&Model>
	{
		self.models.get(id)
	}

	pub fn models(&self) -> impl Iterator<Item = (ModelId, &Model)> + '_
	{
		self.models.iter()
	}

	pub fn len(&self) -> usize
	{
		self.models.len()
	}

	pub fn is_empty(&self) -> bool
	{
		self.models.is_empty()
	}

	/// Returns the dynamics of a model as its concrete type, e.g.
	/// `sim.get::<Counter>(id)`. Returns None if the model doesn't exist or
	/// has a different type.
	pub fn get<T: DynamicsKind>(&self, id: ModelId) -> Option<&T>
	{
		self.models.get(id).and_then(|m| T::from_dynamics(&m.dynamics))
	}

	/// Normally used to tweak parameters before initialize. Note that changing
	/// a running model's state won't reschedule it.
	pub fn get_mut<T: DynamicsKind>(&mut self, id: ModelId) -> Option<&mut T>
	{
		self.models.get_mut(id).and_then(|m| T::from_dynamics_mut(&mut m.dynamics))
	}

	/// The time the scheduler holds for a model, None if the model isn't
	/// scheduled (or its handle refers to some other model).
	pub fn scheduled_time(&self, id: ModelId) -> Option<Time>
	{
		let handle = self.models.get(id)?.handle?;
		match self.scheduler.entry(handle) {
			Some((tn, owner)) if owner == id => Some(tn),
			_ => None,
		}
	}

	/// Number of models in the scheduler.
	pub fn scheduled_len(&self) -> usize
	{
		self.scheduler.len()
	}

	pub fn sources(&self) -> &ExternalSources
	{
		&self.sources
	}

	pub fn sources_mut(&mut self) -> &mut ExternalSources
	{
		&mut self.sources
	}

	// --- internals -------------------------------------------------------------
	fn check_state(&self, expected: SimState) -> Result<()>
	{
		if self.state != expected {
			return Err(Error::BadState {expected: expected.name(), actual: self.state.name()});
		}
		Ok(())
	}

	fn check_not_finalized(&self) -> Result<()>
	{
		if self.state == SimState::Finalized {
			return Err(Error::BadState {expected: "building or running", actual: self.state.name()});
		}
		Ok(())
	}

	fn port_types(&self, src: ModelId, src_port: PortIndex, dst: ModelId, dst_port: PortIndex) -> Result<(PortType, PortType)>
	{
		let src_type = self.models.get(src).ok_or(Error::UnknownModel(src))?.dynamics_type();
		let dst_type = self.models.get(dst).ok_or(Error::UnknownModel(dst))?.dynamics_type();
		let output = *src_type.output_ports().get(src_port).ok_or(Error::UnknownPort {model: src, port: src_port, direction: "output"})?;
		let input = *dst_type.input_ports().get(dst_port).ok_or(Error::UnknownPort {model: dst, port: dst_port, direction: "input"})?;
		Ok((output, input))
	}

	// Initializes the models in active (which must be sorted). Like a step
	// nothing is committed unless every model succeeds.
	fn initialize_active(&mut self, t: Time) -> Result<()>
	{
		self.sources.checkpoint();
		for &id in &self.active {
			let mut model = match self.models.get(id) {
				Some(model) => model.clone(),
				None => continue,
			};

			let mut ctx = Context {
				t,
				id,
				name: model.dynamics_type().name(),
				sources: &mut self.sources,
				hsms: &self.hsms,
				logger: &self.logger,
			};
			let result = model.dynamics.initialize(&mut ctx).and_then(|_| schedule(&mut model, id, t));
			if let Err(err) = result {
				self.effector.clear();
				self.sources.rollback();
				return Err(err);
			}
			self.effector.stage(id, model);
		}
		self.commit(t);
		Ok(())
	}

	// Runs the output functions of the imminents, routes their messages, and
	// then runs the transition functions. New model states are staged in the
	// effector.
	fn execute(&mut self, t: Time) -> Result<()>
	{
		self.deliveries.clear();
		for &id in &self.imminents {
			let model = self.models.get(id).ok_or(Error::UnknownModel(id))?;
			self.outputs.clear();
			model.dynamics.lambda(&mut self.outputs);
			for &(port, message) in self.outputs.iter() {
				for edge in self.graph.fanout(id, port) {
					let input = self.models.get(edge.dst).and_then(|m| m.dynamics_type().input_ports().get(edge.port).copied());
					let message = input.map_or(message, |input| input.conform(message));
					log_excessive!(self.logger, model.dynamics_type().name(), "{} sent {} to {} port {}", id, message, edge.dst, edge.port);
					self.deliveries.push(Delivery {dst: edge.dst, port: edge.port, message});
				}
			}
		}
		self.deliveries.sort_by_key(|d| (d.dst, d.port));

		self.active.clear();
		self.active.extend(self.imminents.iter().copied());
		self.active.extend(self.deliveries.iter().map(|d| d.dst));
		self.active.sort();
		self.active.dedup();

		let mut start = 0;
		for &id in &self.active {
			let mut model = match self.models.get(id) {
				Some(model) => model.clone(),
				None => continue,
			};

			while start < self.deliveries.len() && self.deliveries[start].dst < id {
				start += 1;
			}
			let mut end = start;
			while end < self.deliveries.len() && self.deliveries[end].dst == id {
				end += 1;
			}
			let inputs = Inputs::new(&self.deliveries[start..end]);
			start = end;

			let imminent = self.imminents.binary_search(&id).is_ok();
			let e = t - model.tl;
			let mut ctx = Context {
				t,
				id,
				name: model.dynamics_type().name(),
				sources: &mut self.sources,
				hsms: &self.hsms,
				logger: &self.logger,
			};
			let result = if imminent && inputs.is_empty() {
				model.dynamics.internal(&mut ctx)
			} else if imminent {
				model.dynamics.confluent(&mut ctx, e, inputs)
			} else {
				model.dynamics.external(&mut ctx, e, inputs)
			};
			result.and_then(|_| schedule(&mut model, id, t)).map_err(|err| err.in_step(id))?;
			self.effector.stage(id, model);
		}
		Ok(())
	}

	// Writes the staged models back and updates the scheduler and observers.
	fn commit(&mut self, t: Time)
	{
		for (id, mut model) in self.effector.drain() {
			model.handle = match (model.handle, model.tn.is_finite()) {
				(Some(handle), true) => {
					self.scheduler.reschedule(handle, model.tn);
					Some(handle)
				},
				(Some(handle), false) => {
					self.scheduler.remove(handle);
					None
				},
				(None, true) => Some(self.scheduler.insert(id, model.tn)),
				(None, false) => None,
			};

			if let Some(observer) = model.observer.and_then(|o| self.observers.get_mut(o)) {
				observer.push(t, model.dynamics.observation());
			}
			if let Some(slot) = self.models.get_mut(id) {
				*slot = model;
			}
		}
		self.sources.commit();
	}

	// Undoes a failed step.
	fn abort(&mut self, t_prev: Time)
	{
		self.effector.clear();
		self.deliveries.clear();
		self.sources.rollback();
		for &id in &self.imminents {
			if let Some(model) = self.models.get_mut(id) {
				model.handle = Some(self.scheduler.insert(id, model.tn));
			}
		}
		self.t = t_prev;
		self.logger.time = t_prev;
	}
}

// Validates the new time advance and updates tl and tn.
fn schedule(model: &mut Model, id: ModelId, t: Time) -> Result<()>
{
	let ta = model.dynamics.ta();
	if !is_valid_ta(ta) {
		return Err(Error::ModelNegativeTa {model: id, ta});
	}
	model.tl = t;
	model.tn = t + ta;
	Ok(())
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::message::*;

	fn config() -> Config
	{
		let mut config = Config::new();
		config.seed = 7;
		config.colorize = false;
		config
	}

	#[test]
	fn life_cycle()
	{
		let mut sim = Simulation::new(config());
		assert_eq!(sim.state(), SimState::Building);
		assert!(matches!(sim.step().unwrap_err(), Error::BadState {..}));

		sim.initialize(0.0).unwrap();
		assert_eq!(sim.state(), SimState::Running);
		assert!(matches!(sim.initialize(0.0).unwrap_err(), Error::BadState {..}));

		let report = sim.step().unwrap();
		assert_eq!(report, StepReport {t_prev: 0.0, t_now: INFINITY, events: 0});

		sim.finalize().unwrap();
		assert!(matches!(sim.alloc(Counter::new()).unwrap_err(), Error::BadState {..}));
	}

	#[test]
	fn constants_feed_counters()
	{
		let mut sim = Simulation::new(config());
		let constant = sim.alloc(Constant::new(1.0, 0.0)).unwrap();
		let counter = sim.alloc(Counter::new()).unwrap();
		sim.connect(constant, 0, counter, 0).unwrap();
		sim.initialize(0.0).unwrap();

		let report = sim.step().unwrap();
		assert_eq!(report, StepReport {t_prev: 0.0, t_now: 0.0, events: 2});
		assert_eq!(sim.get::<Counter>(counter).unwrap().number(), 1);
		assert!(sim.model(constant).unwrap().handle.is_none());
		assert_eq!(sim.step().unwrap().t_now, INFINITY);
	}

	#[test]
	fn fanout_is_visible()
	{
		let mut sim = Simulation::new(config());
		let a = sim.alloc(Constant::new(1.0, 0.0)).unwrap();
		let b = sim.alloc(Counter::new()).unwrap();
		let c = sim.alloc(Counter::new()).unwrap();
		sim.connect(a, 0, c, 0).unwrap();
		sim.connect(a, 0, b, 0).unwrap();
		let dsts: Vec<ModelId> = sim.fanout(a, 0).map(|e| e.dst).collect();
		assert_eq!(dsts, vec![c, b]);
	}

	#[test]
	fn connection_errors()
	{
		let mut sim = Simulation::new(config());
		let integrator = sim.alloc(QssIntegrator::<3>::new(0.0, 0.1)).unwrap();
		let sum = sim.alloc(Sum::<1, 2>::new()).unwrap();
		let counter = sim.alloc(Counter::new()).unwrap();

		let err = sim.connect(integrator, 0, sum, 0).unwrap_err();
		assert!(matches!(err, Error::IncompatiblePorts {..}));
		assert!(matches!(sim.connect(integrator, 1, sum, 0).unwrap_err(), Error::UnknownPort {direction: "output", ..}));
		assert!(matches!(sim.connect(integrator, 0, sum, 2).unwrap_err(), Error::UnknownPort {direction: "input", ..}));

		sim.connect(sum, 0, integrator, 0).unwrap();
		assert!(matches!(sim.connect(sum, 0, integrator, 0).unwrap_err(), Error::AlreadyConnected {..}));
		sim.connect(integrator, 0, counter, 0).unwrap();

		sim.free(counter).unwrap();
		assert!(matches!(sim.connect(integrator, 0, counter, 0).unwrap_err(), Error::UnknownModel(_)));
		assert!(sim.fanout(integrator, 0).next().is_none());
	}

	#[test]
	fn stale_ids_stay_stale()
	{
		let mut sim = Simulation::new(config());
		let a = sim.alloc(Counter::new()).unwrap();
		sim.free(a).unwrap();
		let b = sim.alloc(Counter::new()).unwrap();
		assert_ne!(a, b);
		assert!(sim.model(a).is_none());
		assert!(sim.get::<Counter>(b).is_some());
		assert!(matches!(sim.free(a).unwrap_err(), Error::UnknownModel(_)));
	}

	#[test]
	fn stale_ids_have_no_fanout()
	{
		let mut sim = Simulation::new(config());
		let a = sim.alloc(Constant::new(1.0, 0.0)).unwrap();
		sim.free(a).unwrap();
		let c = sim.alloc(Constant::new(2.0, 0.0)).unwrap();
		let counter = sim.alloc(Counter::new()).unwrap();
		sim.connect(c, 0, counter, 0).unwrap();

		assert_eq!(sim.fanout(c, 0).count(), 1);
		assert_eq!(sim.fanout(a, 0).count(), 0);
		assert!(matches!(sim.disconnect(a, 0, counter, 0).unwrap_err(), Error::UnknownModel(_)));
	}

	#[test]
	fn observers_need_room()
	{
		let mut sim = Simulation::new(config());
		let id = sim.alloc(Counter::new()).unwrap();
		assert!(matches!(sim.observe(id, 0).unwrap_err(), Error::ZeroCapacity("observer")));
		assert!(sim.model(id).unwrap().observer.is_none());
		sim.observe(id, 1).unwrap();
	}

	#[test]
	fn generic_outputs_are_shaped_for_their_inputs()
	{
		let mut sim = Simulation::new(config());
		let constant = sim.alloc(Constant::new(2.5, 0.0)).unwrap();
		let and = sim.alloc(LogicalAnd::<2>::new()).unwrap();
		let counter = sim.alloc(Counter::new()).unwrap();
		sim.connect(constant, 0, and, 0).unwrap();
		sim.connect(constant, 0, counter, 0).unwrap();
		sim.initialize(0.0).unwrap();
		sim.step().unwrap();

		assert_eq!(sim.deliveries, vec![
			Delivery {dst: and, port: 0, message: Message::boolean(true)},
			Delivery {dst: counter, port: 0, message: Message::new(2.5)}]);
	}

	#[test]
	fn typed_access_checks_the_type()
	{
		let mut sim = Simulation::new(config());
		let id = sim.alloc(Constant::new(2.0, 1.0)).unwrap();
		assert!(sim.get::<Counter>(id).is_none());
		sim.get_mut::<Constant>(id).unwrap().value = 5.0;
		assert_eq!(sim.get::<Constant>(id).unwrap().value, 5.0);
	}

	#[test]
	fn models_can_be_added_while_running()
	{
		let mut sim = Simulation::new(config());
		let counter = sim.alloc(Counter::new()).unwrap();
		sim.initialize(0.0).unwrap();
		sim.run(5.0).unwrap();
		assert_eq!(sim.time(), 5.0);

		let constant = sim.alloc(Constant::new(1.0, 2.0)).unwrap();
		sim.connect(constant, 0, counter, 0).unwrap();
		assert_eq!(sim.next_time(), 7.0);
		sim.run(10.0).unwrap();
		assert_eq!(sim.get::<Counter>(counter).unwrap().number(), 1);
	}

	#[test]
	fn observers_record_transitions()
	{
		let mut sim = Simulation::new(config());
		let func = sim.alloc(TimeFunc::new(TimeFunction::Time, 1.0)).unwrap();
		let observer = sim.observe(func, 3).unwrap();
		sim.initialize(0.0).unwrap();
		sim.run(4.0).unwrap();

		let observations: Vec<(Time, f64)> = sim.observer(observer).unwrap().iter().map(|&(t, m)| (t, m.value())).collect();
		assert_eq!(observations, vec![(2.0, 2.0), (3.0, 3.0), (4.0, 4.0)]);
	}

	#[test]
	fn run_limits()
	{
		let mut config = config();
		config.max_steps = 3;
		let mut sim = Simulation::new(config);
		sim.alloc(TimeFunc::new(TimeFunction::Time, 1.0)).unwrap();
		sim.initialize(0.0).unwrap();

		let report = sim.run(100.0).unwrap();
		assert_eq!(sim.steps(), 3);
		assert_eq!(report.t_now, 2.0);
		assert_eq!(report.events, 3);
	}

	#[test]
	fn cancellation()
	{
		let mut sim = Simulation::new(config());
		sim.alloc(TimeFunc::new(TimeFunction::Time, 1.0)).unwrap();
		sim.initialize(0.0).unwrap();

		let token = sim.cancel_token();
		token.cancel();
		assert!(matches!(sim.step().unwrap_err(), Error::Interrupted));
		assert!(matches!(sim.run(10.0).unwrap_err(), Error::Interrupted));
		assert_eq!(sim.time(), 0.0);

		token.reset();
		sim.step().unwrap();
	}

	#[test]
	fn bad_time_advances_abort_the_step()
	{
		let mut sim = Simulation::new(config());
		let tas = sim.sources_mut().alloc_constant(&[1.0, -1.0]).unwrap();
		let generator = sim.alloc(Generator::new(0.0, Source::constant(tas), None, true)).unwrap();
		let counter = sim.alloc(Counter::new()).unwrap();
		sim.connect(generator, 0, counter, 0).unwrap();
		sim.initialize(0.0).unwrap();

		sim.step().unwrap();		// t = 0, pulls ta 1
		let err = sim.step().unwrap_err();		// t = 1, pulls ta -1
		match err {
			Error::Step {model, cause} => {
				assert_eq!(model, generator);
				assert!(matches!(*cause, Error::ModelNegativeTa {..}));
			},
			_ => panic!("expected a step error not {}", err),
		}

		// nothing changed
		assert_eq!(sim.time(), 0.0);
		assert_eq!(sim.next_time(), 1.0);
		assert_eq!(sim.get::<Counter>(counter).unwrap().number(), 1);
		assert!(sim.model(generator).unwrap().handle.is_some());

		// and the step fails the same way again since the source was rolled back
		assert!(sim.step().is_err());
	}
}
