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
//! Predator prey simulation using QSS integrators. Prints the populations as
//! they change.
extern crate clap;
extern crate irritator;

use clap::{Arg, ArgAction, ArgMatches, Command};
use irritator::*;
use std::fmt::Display;
use std::io::{stderr, Write};
use std::process;
use std::str::FromStr;

#[derive(Clone)]
struct LocalConfig
{
	level: u8,
	dq: f64,
	prey: f64,
	predators: f64,
	t_end: f64,
}

impl LocalConfig
{
	fn new() -> LocalConfig
	{
		LocalConfig {level: 1, dq: 0.1, prey: 18.0, predators: 7.0, t_end: 15.0}
	}
}

struct Populations
{
	prey: ModelId,
	predators: ModelId,
	prey_observer: ObserverId,
	predator_observer: ObserverId,
}

fn fatal_err(message: &str) -> !
{
	let _ = writeln!(&mut stderr(), "{}", message);
	process::exit(1);
}

// Min and max are inclusive.
fn match_num<T>(matches: &ArgMatches, name: &str, min: T, max: T) -> T
		where T: Copy + Display + FromStr + PartialOrd
{
	let text = matches.get_one::<String>(name).map(|s| s.as_str()).unwrap_or("");
	match text.parse::<T>() {
		Ok(value) if value < min => fatal_err(&format!("--{} should be greater than {}", name, min)),
		Ok(value) if value > max => fatal_err(&format!("--{} should be less than {}", name, max)),
		Ok(value) => value,
		_ => fatal_err(&format!("--{} should be a number", name)),
	}
}

fn parse_options() -> (LocalConfig, Config)
{
	let mut local = LocalConfig::new();
	let mut config = Config::new();

	let matches = Command::new("lotka-volterra")
		.version("1.0")
		.author("Jesse Jones <jesse9jones@gmail.com>")
		.about("Simulates predators and their prey.")
		.arg(Arg::new("dq").long("dq").value_name("N").help(format!("Quantum size [{}]", local.dq)))
		.arg(Arg::new("level").long("level").value_name("N").help(format!("QSS level, 1 to 3 [{}]", local.level)))
		.arg(Arg::new("log").long("log").value_name("LEVEL:GLOB").action(ArgAction::Append).help("Overrides --log-level, glob is used to match model names"))
		.arg(Arg::new("log-level").long("log-level").value_name("LEVEL").help(format!("Default log level: {} [{}]", log_levels(), format!("{:?}", config.log_level).to_lowercase())))
		.arg(Arg::new("max-time").long("max-time").value_name("TIME").help(format!("Maximum time to run the simulation, use {} suffixes [no limit]", time_suffixes())))
		.arg(Arg::new("no-colors").long("no-colors").action(ArgAction::SetTrue).help("Don't color code console output"))
		.arg(Arg::new("predators").long("predators").value_name("N").help(format!("Initial number of predators [{}]", local.predators)))
		.arg(Arg::new("prey").long("prey").value_name("N").help(format!("Initial number of prey [{}]", local.prey)))
		.arg(Arg::new("seed").long("seed").value_name("N").help("Random number generator seed [random]"))
		.arg(Arg::new("t-end").long("t-end").value_name("TIME").help(format!("Simulation time to stop at [{}]", local.t_end)))
		.get_matches();

	if matches.contains_id("dq") {
		local.dq = match_num(&matches, "dq", 1.0e-6, 10.0);
	}
	if matches.contains_id("level") {
		local.level = match_num(&matches, "level", 1, 3);
	}
	if matches.contains_id("predators") {
		local.predators = match_num(&matches, "predators", 0.1, 1.0e6);
	}
	if matches.contains_id("prey") {
		local.prey = match_num(&matches, "prey", 0.1, 1.0e6);
	}
	if matches.contains_id("t-end") {
		local.t_end = match_num(&matches, "t-end", 0.0, 1.0e6);
	}
	if matches.contains_id("seed") {
		config.seed = match_num(&matches, "seed", 1, u64::MAX);
	}

	if let Some(level) = matches.get_one::<String>("log-level") {
		if let Some(e) = config.parse_log_level(level) {
			fatal_err(&e);
		}
	}

	if let Some(values) = matches.get_many::<String>("log") {
		if let Some(e) = config.parse_log_levels(values.map(|s| s.as_str()).collect()) {
			fatal_err(&e);
		}
	}

	if let Some(max_secs) = matches.get_one::<String>("max-time") {
		if let Some(e) = config.parse_max_secs(max_secs) {
			fatal_err(&e);
		}
	}

	config.colorize = !matches.get_flag("no-colors");

	(local, config)
}

fn wire<const L: usize>(sim: &mut Simulation, local: &LocalConfig) -> Result<Populations>
where
	QssIntegrator<L>: Into<Dynamics>,
	Multiplier<L>: Into<Dynamics>,
	Wsum<L, 2>: Into<Dynamics>,
{
	let prey = sim.alloc(QssIntegrator::<L>::new(local.prey, local.dq))?;
	let predators = sim.alloc(QssIntegrator::<L>::new(local.predators, local.dq))?;
	let product = sim.alloc(Multiplier::<L>::new())?;
	let prey_dot = sim.alloc(Wsum::<L, 2>::new([2.0, -0.4]))?;
	let predator_dot = sim.alloc(Wsum::<L, 2>::new([-1.0, 0.1]))?;

	sim.connect(prey, Y_PORT, product, 0)?;
	sim.connect(predators, Y_PORT, product, 1)?;
	sim.connect(prey, Y_PORT, prey_dot, 0)?;
	sim.connect(product, OUT_PORT, prey_dot, 1)?;
	sim.connect(predators, Y_PORT, predator_dot, 0)?;
	sim.connect(product, OUT_PORT, predator_dot, 1)?;
	sim.connect(prey_dot, OUT_PORT, prey, X_DOT_PORT)?;
	sim.connect(predator_dot, OUT_PORT, predators, X_DOT_PORT)?;

	let prey_observer = sim.observe(prey, 1)?;
	let predator_observer = sim.observe(predators, 1)?;
	Ok(Populations {prey, predators, prey_observer, predator_observer})
}

fn create_sim(local: &LocalConfig, config: Config) -> Result<(Simulation, Populations)>
{
	let mut sim = Simulation::new(config);
	let populations = match local.level {
		1 => wire::<1>(&mut sim, local)?,
		2 => wire::<2>(&mut sim, local)?,
		_ => wire::<3>(&mut sim, local)?,
	};
	Ok((sim, populations))
}

fn run(local: LocalConfig, config: Config) -> Result<()>
{
	let (mut sim, populations) = create_sim(&local, config)?;
	sim.initialize(0.0)?;

	println!("{:>10} {:>10} {:>10}", "time", "prey", "predators");
	let mut events = 0;
	while sim.next_time() <= local.t_end {
		let report = sim.step()?;
		events += report.events;

		let prey = sim.observer(populations.prey_observer).and_then(|o| o.last());
		let predators = sim.observer(populations.predator_observer).and_then(|o| o.last());
		if let (Some((t, x)), Some((_, y))) = (prey, predators) {
			if t == report.t_now {
				println!("{:>10.3} {:>10.3} {:>10.3}", t, x.value(), y.value());
			}
		}
	}
	println!("{} events ({} prey, {} predators)", events, populations.prey, populations.predators);

	sim.finalize()
}

fn main()
{
	let (local, config) = parse_options();
	if let Err(err) = run(local, config) {
		fatal_err(&err.to_string());
	}
}
