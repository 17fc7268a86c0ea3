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
//! Leaky integrate-and-fire neuron: V' = (V0 - V)/tau and whenever V reaches
//! the threshold the neuron spikes and V is reset.
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
	tau: f64,
	v0: f64,
	threshold: f64,
	reset: f64,
	dq: f64,
	t_end: f64,
}

impl LocalConfig
{
	fn new() -> LocalConfig
	{
		LocalConfig {tau: 10.0, v0: 10.0, threshold: 1.0, reset: -10.0, dq: 0.001, t_end: 100.0}
	}

	// Time between spikes.
	fn period(&self) -> f64
	{
		self.tau*((self.v0 - self.reset)/(self.v0 - self.threshold)).ln()
	}
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

	let matches = Command::new("neuron")
		.version("1.0")
		.author("Jesse Jones <jesse9jones@gmail.com>")
		.about("Simulates a leaky integrate-and-fire neuron.")
		.arg(Arg::new("dq").long("dq").value_name("N").help(format!("Quantum size [{}]", local.dq)))
		.arg(Arg::new("log").long("log").value_name("LEVEL:GLOB").action(ArgAction::Append).help("Overrides --log-level, glob is used to match model names"))
		.arg(Arg::new("log-level").long("log-level").value_name("LEVEL").help(format!("Default log level: {} [{}]", log_levels(), format!("{:?}", config.log_level).to_lowercase())))
		.arg(Arg::new("max-time").long("max-time").value_name("TIME").help(format!("Maximum time to run the simulation, use {} suffixes [no limit]", time_suffixes())))
		.arg(Arg::new("no-colors").long("no-colors").action(ArgAction::SetTrue).help("Don't color code console output"))
		.arg(Arg::new("reset").long("reset").value_name("V").help(format!("Potential after a spike [{}]", local.reset)))
		.arg(Arg::new("t-end").long("t-end").value_name("TIME").help(format!("Simulation time to stop at [{}]", local.t_end)))
		.arg(Arg::new("tau").long("tau").value_name("TIME").help(format!("Membrane time constant [{}]", local.tau)))
		.arg(Arg::new("threshold").long("threshold").value_name("V").help(format!("Potential at which the neuron spikes [{}]", local.threshold)))
		.get_matches();

	if matches.contains_id("dq") {
		local.dq = match_num(&matches, "dq", 1.0e-6, 1.0);
	}
	if matches.contains_id("reset") {
		local.reset = match_num(&matches, "reset", -1.0e3, local.threshold);
	}
	if matches.contains_id("t-end") {
		local.t_end = match_num(&matches, "t-end", 0.0, 1.0e6);
	}
	if matches.contains_id("tau") {
		local.tau = match_num(&matches, "tau", 1.0e-3, 1.0e3);
	}
	if matches.contains_id("threshold") {
		local.threshold = match_num(&matches, "threshold", local.reset, local.v0 - 1.0e-3);
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

fn create_sim(local: &LocalConfig, config: Config) -> Result<(Simulation, ObserverId, ModelId)>
{
	let mut sim = Simulation::new(config);
	let v = sim.alloc(QssIntegrator::<1>::new(0.0, local.dq))?;
	let one = sim.alloc(Constant::new(1.0, 0.0))?;
	let v_dot = sim.alloc(Wsum::<1, 2>::new([-1.0/local.tau, local.v0/local.tau]))?;
	let cross = sim.alloc(Cross::<1>::new(local.threshold, local.reset, true))?;
	let spikes = sim.alloc(Counter::new())?;

	sim.connect(v, Y_PORT, v_dot, 0)?;
	sim.connect(one, GENERATOR_OUT_PORT, v_dot, 1)?;
	sim.connect(v_dot, OUT_PORT, v, X_DOT_PORT)?;
	sim.connect(v, Y_PORT, cross, CROSS_VALUE_PORT)?;
	sim.connect(cross, CROSS_OUT_IF_VALUE_PORT, v, RESET_PORT)?;
	sim.connect(cross, CROSS_OUT_EVENT_PORT, spikes, 0)?;

	let observer = sim.observe(spikes, 1024)?;
	Ok((sim, observer, spikes))
}

fn run(local: LocalConfig, config: Config) -> Result<()>
{
	let (mut sim, observer, spikes) = create_sim(&local, config)?;
	sim.initialize(0.0)?;
	let report = sim.run(local.t_end)?;

	if let Some(observer) = sim.observer(observer) {
		for &(t, _) in observer.iter().skip(1) {
			println!("spike at {:.3}", t);
		}
	}
	let count = sim.get::<Counter>(spikes).map_or(0, |c| c.number());
	println!("{} spikes in {} events, the analytic period is {:.3}", count, report.events, local.period());

	sim.finalize()
}

fn main()
{
	let (local, config) = parse_options();
	if let Err(err) = run(local, config) {
		fatal_err(&err.to_string());
	}
}
