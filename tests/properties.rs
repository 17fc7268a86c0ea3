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
extern crate irritator;
extern crate proptest;

use irritator::*;
use proptest::prelude::*;
use std::thread;

fn config(seed: u64) -> Config
{
	let mut config = Config::new();
	config.seed = seed;
	config.colorize = false;
	config
}

// Random values are summed and the sum is integrated.
fn noisy(seed: u64) -> (Simulation, Vec<ObserverId>)
{
	let mut sim = Simulation::new(config(seed));
	let tas = sim.sources_mut().alloc_random(RandomDistribution::Exponential {lambda: 2.0}, 4).unwrap();
	let values = sim.sources_mut().alloc_random(RandomDistribution::Normal {mean: 0.0, stddev: 1.0}, 4).unwrap();
	let a = sim.alloc(Generator::new(0.0, Source::random(tas), Some(Source::random(values)), false)).unwrap();
	let b = sim.alloc(Generator::new(0.5, Source::random(tas), Some(Source::random(values)), false)).unwrap();
	let sum = sim.alloc(Sum::<2, 2>::new()).unwrap();
	let integrator = sim.alloc(QssIntegrator::<2>::new(0.0, 0.01)).unwrap();
	sim.connect(a, GENERATOR_OUT_PORT, sum, 0).unwrap();
	sim.connect(b, GENERATOR_OUT_PORT, sum, 1).unwrap();
	sim.connect(sum, OUT_PORT, integrator, X_DOT_PORT).unwrap();

	let observers = [a, b, sum, integrator].iter().map(|&id| sim.observe(id, 100_000).unwrap()).collect();
	(sim, observers)
}

fn traces(sim: &Simulation, observers: &[ObserverId]) -> Vec<Vec<(Time, Message)>>
{
	observers.iter().map(|&o| sim.observer(o).unwrap().iter().copied().collect()).collect()
}

#[test]
fn same_seed_same_trace()
{
	let mut runs = Vec::new();
	for _ in 0..2 {
		let (mut sim, observers) = noisy(42);
		sim.initialize(0.0).unwrap();
		sim.run(20.0).unwrap();
		runs.push(traces(&sim, &observers));
	}
	assert!(runs[0][0].len() > 10);
	assert_eq!(runs[0], runs[1]);

	let (mut sim, observers) = noisy(43);
	sim.initialize(0.0).unwrap();
	sim.run(20.0).unwrap();
	assert_ne!(runs[0], traces(&sim, &observers));
}

#[test]
fn time_never_goes_backwards()
{
	let (mut sim, _) = noisy(7);
	sim.initialize(0.0).unwrap();
	let mut t = sim.time();
	for _ in 0..500 {
		let report = sim.step().unwrap();
		if report.t_now == INFINITY {
			break;
		}
		assert_eq!(report.t_prev, t);
		assert!(report.t_now >= report.t_prev, "went from {} to {}", report.t_prev, report.t_now);
		assert!(report.events > 0);
		t = report.t_now;
	}
}

// x' = -x so x(t) = exp(-t). For a stable linear system the QSS error stays
// within a small multiple of the quantum.
fn decay<const L: usize>(dq: f64)
where
	QssIntegrator<L>: Into<Dynamics>,
	Wsum<L, 2>: Into<Dynamics>,
{
	let mut sim = Simulation::new(config(1));
	let x = sim.alloc(QssIntegrator::<L>::new(1.0, dq)).unwrap();
	let x_dot = sim.alloc(Wsum::<L, 2>::new([-1.0, 0.0])).unwrap();
	sim.connect(x, Y_PORT, x_dot, 0).unwrap();
	sim.connect(x_dot, OUT_PORT, x, X_DOT_PORT).unwrap();
	let observer = sim.observe(x, 100_000).unwrap();
	sim.initialize(0.0).unwrap();
	sim.run(5.0).unwrap();

	let observer = sim.observer(observer).unwrap();
	assert!(observer.len() > 5);
	for &(t, m) in observer.iter() {
		let error = (m.value() - (-t).exp()).abs();
		assert!(error <= 2.0*dq, "level {} error at {} is {}", L, t, error);
	}
}

#[test]
fn qss_error_is_bounded()
{
	decay::<1>(0.01);
	decay::<2>(0.01);
	decay::<3>(0.01);
}

#[test]
fn failed_steps_change_nothing()
{
	let mut sim = Simulation::new(config(1));
	let tas = sim.sources_mut().alloc_constant(&[0.5, 0.5, -2.0]).unwrap();
	let values = sim.sources_mut().alloc_random(RandomDistribution::UniformReal {a: 0.0, b: 1.0}, 2).unwrap();
	let generator = sim.alloc(Generator::new(0.0, Source::constant(tas), Some(Source::random(values)), true)).unwrap();
	let counter = sim.alloc(Counter::new()).unwrap();
	sim.connect(generator, GENERATOR_OUT_PORT, counter, 0).unwrap();
	let observer = sim.observe(generator, 16).unwrap();
	sim.initialize(0.0).unwrap();

	sim.step().unwrap();
	sim.step().unwrap();
	let before: Vec<(Time, Message)> = sim.observer(observer).unwrap().iter().copied().collect();
	let value = sim.get::<Generator>(generator).unwrap().value();

	let err = sim.run(10.0).unwrap_err();
	assert_eq!(err.model(), Some(generator));
	assert_eq!(sim.time(), 0.5);
	assert_eq!(sim.next_time(), 1.0);
	assert_eq!(sim.get::<Counter>(counter).unwrap().number(), 2);
	assert_eq!(sim.get::<Generator>(generator).unwrap().value(), value);
	let after: Vec<(Time, Message)> = sim.observer(observer).unwrap().iter().copied().collect();
	assert_eq!(before, after);

	// the simulation can still be inspected and finalized
	sim.finalize().unwrap();
	assert_eq!(sim.state(), SimState::Finalized);
}

// A generator that binds its ta source and then fails because its value
// source has been freed.
fn half_bound(sim: &mut Simulation, tas: RandomSourceId) -> Generator
{
	let dead = sim.sources_mut().alloc_random(RandomDistribution::UniformReal {a: 0.0, b: 1.0}, 1).unwrap();
	assert!(sim.sources_mut().free_random(dead));
	Generator::new(0.0, Source::random(tas), Some(Source::random(dead)), false)
}

#[test]
fn failed_allocs_release_their_sources()
{
	let mut runs = Vec::new();
	for &fail_first in &[false, true] {
		let mut sim = Simulation::new(config(9));
		let tas = sim.sources_mut().alloc_random(RandomDistribution::Exponential {lambda: 1.0}, 1).unwrap();
		let values = sim.sources_mut().alloc_random(RandomDistribution::Normal {mean: 0.0, stddev: 1.0}, 1).unwrap();
		sim.initialize(0.0).unwrap();

		if fail_first {
			let generator = half_bound(&mut sim, tas);
			assert!(matches!(sim.alloc(generator).unwrap_err(), Error::UnknownSource {..}));
			assert!(sim.is_empty());
			assert_eq!(sim.scheduled_len(), 0);
			assert_eq!(sim.sources().random(tas).unwrap().clients(), 0);
		}

		// the one ta client is still available
		let id = sim.alloc(Generator::new(0.5, Source::random(tas), Some(Source::random(values)), false)).unwrap();
		assert_eq!(sim.sources().random(tas).unwrap().clients(), 1);
		let observer = sim.observe(id, 1000).unwrap();
		let value = sim.get::<Generator>(id).unwrap().value();
		sim.run(5.0).unwrap();
		runs.push((value, traces(&sim, &[observer])));
	}
	assert!(runs[0].1[0].len() > 2);
	assert_eq!(runs[0], runs[1]);
}

#[test]
fn failed_initialize_releases_its_sources()
{
	let mut runs = Vec::new();
	for &with_bad in &[false, true] {
		let mut sim = Simulation::new(config(9));
		let tas = sim.sources_mut().alloc_random(RandomDistribution::Exponential {lambda: 1.0}, 2).unwrap();
		let values = sim.sources_mut().alloc_random(RandomDistribution::Normal {mean: 0.0, stddev: 1.0}, 1).unwrap();
		let id = sim.alloc(Generator::new(0.0, Source::random(tas), Some(Source::random(values)), false)).unwrap();
		let observer = sim.observe(id, 1000).unwrap();

		if with_bad {
			let generator = half_bound(&mut sim, tas);
			let bad = sim.alloc(generator).unwrap();
			assert!(matches!(sim.initialize(0.0).unwrap_err(), Error::UnknownSource {..}));
			assert_eq!(sim.state(), SimState::Building);
			assert_eq!(sim.scheduled_len(), 0);
			assert_eq!(sim.sources().random(tas).unwrap().clients(), 0);
			assert_eq!(sim.sources().random(values).unwrap().clients(), 0);
			assert!(sim.observer(observer).unwrap().is_empty());
			sim.free(bad).unwrap();
		}

		sim.initialize(0.0).unwrap();
		assert_eq!(sim.sources().random(tas).unwrap().clients(), 1);
		assert_eq!(sim.sources().random(values).unwrap().clients(), 1);
		sim.run(5.0).unwrap();
		runs.push(traces(&sim, &[observer]));
	}
	assert!(runs[0][0].len() > 2);
	assert_eq!(runs[0], runs[1]);
}

// Every model with a finite tn is in the scheduler under that tn and no other
// model is.
fn check_schedule(sim: &Simulation) -> std::result::Result<(), TestCaseError>
{
	let mut scheduled = 0;
	for (id, model) in sim.models() {
		if model.tn.is_finite() {
			scheduled += 1;
			prop_assert_eq!(sim.scheduled_time(id), Some(model.tn), "{} is out of sync", id);
		} else {
			prop_assert!(model.handle.is_none(), "passive {} has a handle", id);
		}
	}
	prop_assert_eq!(sim.scheduled_len(), scheduled);
	Ok(())
}

#[test]
fn cancel_from_another_thread()
{
	let (mut sim, _) = noisy(3);
	sim.initialize(0.0).unwrap();
	sim.step().unwrap();

	let token = sim.cancel_token();
	thread::spawn(move || token.cancel()).join().unwrap();

	let t = sim.time();
	let next = sim.next_time();
	assert!(matches!(sim.run(INFINITY).unwrap_err(), Error::Interrupted));
	assert_eq!(sim.time(), t);
	assert_eq!(sim.next_time(), next);
}

#[test]
fn wall_clock_limit()
{
	let mut config = config(5);
	config.max_secs = 0.05;
	let mut sim = Simulation::new(config);
	sim.alloc(TimeFunc::new(TimeFunction::Time, 1.0e-9)).unwrap();
	sim.initialize(0.0).unwrap();

	let report = sim.run(INFINITY).unwrap();
	assert!(report.events > 0);
	assert!(report.t_now < INFINITY);
}

#[test]
fn alloc_free_round_trip()
{
	let mut sim = Simulation::new(config(1));
	let a = sim.alloc(Counter::new()).unwrap();
	let b = sim.alloc(Constant::new(1.0, 0.0)).unwrap();
	sim.connect(b, GENERATOR_OUT_PORT, a, 0).unwrap();
	let len = sim.len();

	let c = sim.alloc(Counter::new()).unwrap();
	sim.connect(b, GENERATOR_OUT_PORT, c, 0).unwrap();
	sim.disconnect(b, GENERATOR_OUT_PORT, c, 0).unwrap();
	sim.free(c).unwrap();
	assert_eq!(sim.len(), len);
	assert!(sim.model(c).is_none());

	let dsts: Vec<ModelId> = sim.fanout(b, GENERATOR_OUT_PORT).map(|e| e.dst).collect();
	assert_eq!(dsts, vec![a]);
}

#[test]
fn capacity_is_enforced()
{
	let mut config = config(1);
	config.max_models = 2;
	let mut sim = Simulation::new(config);
	sim.alloc(Counter::new()).unwrap();
	let b = sim.alloc(Counter::new()).unwrap();
	assert!(matches!(sim.alloc(Counter::new()).unwrap_err(), Error::NotEnoughMemory(_)));

	sim.free(b).unwrap();
	sim.alloc(Counter::new()).unwrap();
}

proptest! {
	// Surviving models are unaffected by the allocation and freeing of other
	// models.
	#[test]
	fn ids_are_stable(ops in proptest::collection::vec(any::<Option<u8>>(), 1..60))
	{
		let mut sim = Simulation::new(config(1));
		let mut live: Vec<(ModelId, f64)> = Vec::new();
		for (i, op) in ops.into_iter().enumerate() {
			match op {
				Some(k) if !live.is_empty() => {
					let (id, _) = live.remove(k as usize % live.len());
					sim.free(id).unwrap();
					prop_assert!(sim.model(id).is_none());
				},
				_ => {
					let value = i as f64;
					let id = sim.alloc(Constant::new(value, 0.0)).unwrap();
					live.push((id, value));
				},
			}
			for &(id, value) in &live {
				prop_assert_eq!(sim.get::<Constant>(id).map(|c| c.value), Some(value));
			}
			prop_assert_eq!(sim.len(), live.len());
		}
	}

	// Steps, failed steps, and models coming and going while running never
	// leave a model in the scheduler under the wrong time (or missing).
	#[test]
	fn scheduler_tracks_models(ops in proptest::collection::vec((0u8..4, any::<u8>()), 1..80))
	{
		let mut sim = Simulation::new(config(1));
		let bad_tas = sim.sources_mut().alloc_constant(&[0.25, -1.0]).unwrap();
		let counter = sim.alloc(Counter::new()).unwrap();
		let mut live = Vec::new();
		for k in 0..3 {
			let id = sim.alloc(TimeFunc::new(TimeFunction::Time, 0.5 + k as f64)).unwrap();
			sim.connect(id, GENERATOR_OUT_PORT, counter, 0).unwrap();
			live.push(id);
		}
		sim.initialize(0.0).unwrap();
		check_schedule(&sim)?;

		for (op, k) in ops {
			match op {
				0 => {
					if let Err(err) = sim.step() {
						// only the generators with a negative ta fail
						let id = err.model();
						prop_assert!(id.is_some(), "{}", err);
						let id = id.unwrap();
						check_schedule(&sim)?;
						sim.free(id).unwrap();
						live.retain(|&m| m != id);
					}
				},
				1 => {
					let id = sim.alloc(TimeFunc::new(TimeFunction::Time, 0.1 + (k % 20) as f64*0.1)).unwrap();
					sim.connect(id, GENERATOR_OUT_PORT, counter, 0).unwrap();
					live.push(id);
				},
				2 if !live.is_empty() => {
					let id = live.remove(k as usize % live.len());
					sim.free(id).unwrap();
				},
				_ => {
					let id = sim.alloc(Generator::new(0.0, Source::constant(bad_tas), None, true)).unwrap();
					sim.connect(id, GENERATOR_OUT_PORT, counter, 0).unwrap();
					live.push(id);
				},
			}
			check_schedule(&sim)?;
		}
	}

	// Rejected connections leave the graph alone.
	#[test]
	fn bad_connections_change_nothing(src_port in 0usize..4, dst_port in 0usize..4)
	{
		let mut sim = Simulation::new(config(1));
		let cross = sim.alloc(Cross::<3>::new(0.0, 1.0, true)).unwrap();
		let and = sim.alloc(LogicalAnd::<2>::new()).unwrap();
		let result = sim.connect(cross, src_port, and, dst_port);
		if src_port == CROSS_OUT_EVENT_PORT && dst_port < 2 {
			prop_assert!(result.is_ok());
			prop_assert_eq!(sim.fanout(cross, src_port).count(), 1);
		} else {
			prop_assert!(result.is_err());
			for port in 0..3 {
				prop_assert_eq!(sim.fanout(cross, port).count(), 0);
			}
		}
	}
}
