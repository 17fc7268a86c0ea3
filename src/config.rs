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
use crate::logging::*;
use glob;
use std::f64::INFINITY;

/// Used to configure the `Simulation`.
pub struct Config
{
	/// Random number generator seed used by the random external sources.
	/// Defaults to 0 which means seed with entropy. Note that if you want
	/// deterministic results you should use a fixed seed.
	pub seed: u64,

	/// Maximum wall clock time `Simulation::run` may use.
	/// Defaults to INFINITY.
	pub max_secs: f64,

	/// Maximum number of steps `Simulation::run` may execute.
	/// Defaults to u64::MAX.
	pub max_steps: u64,

	/// Default log level. Defaults to warning.
	pub log_level: LogLevel,

	/// Overrides log_level for models whose dynamics name (e.g. "qss2_integrator")
	/// match the glob. The first matching pattern wins.
	pub log_levels: Vec<(glob::Pattern, LogLevel)>,

	/// Number of decimal places to use when logging times.
	/// Defaults to 6.
	pub precision: usize,

	/// Capacity of the model arena. Defaults to 4096.
	pub max_models: usize,

	/// Capacity of the connection graph's node block pool. Each block holds
	/// up to four destinations for one output port. Defaults to 16384.
	pub max_node_blocks: usize,

	/// Capacity of the hierarchical state machine arena. Defaults to 64.
	pub max_hsms: usize,

	/// Capacity of the observer arena. Defaults to 256.
	pub max_observers: usize,

	/// Capacity of each of the external source arenas. Defaults to 64.
	pub max_sources: usize,

	/// Use escape sequences to color code stdout.
	/// Defaults to true.
	pub colorize: bool,

	/// Used when logging to stdout when colorize is on.
	/// Defaults to bright red. See See https://en.wikipedia.org/wiki/ANSI_escape_code#Colors
	/// and https://aweirdimagination.net/2015/02/21/256-color-terminals for information on
	/// color escape codes.
	pub error_escape_code: String,

	/// Used when logging to stdout when colorize is on.
	/// Defaults to red.
	pub warning_escape_code: String,

	/// Used when logging to stdout when colorize is on.
	/// Defaults to bold black.
	pub info_escape_code: String,

	/// Used when logging to stdout when colorize is on.
	/// Defaults to black.
	pub debug_escape_code: String,

	/// Used when logging to stdout when colorize is on.
	/// Defaults to light gray.
	pub excessive_escape_code: String,
}

/// For use in --help messages.
pub fn time_suffixes() -> &'static str
{
	"ms, s, m, or h"
}

impl Config
{
	pub fn new() -> Config
	{
		Config {
			seed: 0,
			max_secs: INFINITY,
			max_steps: u64::MAX,
			log_level: LogLevel::Warning,
			log_levels: Vec::new(),
			precision: 6,
			max_models: 4096,
			max_node_blocks: 16384,
			max_hsms: 64,
			max_observers: 256,
			max_sources: 64,
			colorize: true,
			error_escape_code: "\x1b[31;1m".to_string(),
			warning_escape_code: "\x1b[31m".to_string(),
			info_escape_code: "\x1b[30;1m".to_string(),
			debug_escape_code: "".to_string(),
			excessive_escape_code: "\x1b[1;38;5;244m".to_string(),
		}
	}

	/// Sets log_level. Returns an error message if the level is malformed.
	pub fn parse_log_level(&mut self, level: &str) -> Option<String>
	{
		match level.parse::<LogLevel>() {
			Ok(level) => {self.log_level = level; None},
			Err(message) => Some(format!("--log-level {}", message)),
		}
	}

	/// Appends to log_levels. Values should look like "debug:qss*".
	pub fn parse_log_levels(&mut self, values: Vec<&str>) -> Option<String>
	{
		for value in values {
			let parts: Vec<&str> = value.splitn(2, ':').collect();
			if parts.len() != 2 {
				return Some(format!("--log value '{}' should be formatted as LEVEL:GLOB", value));
			}

			let level = match parts[0].parse::<LogLevel>() {
				Ok(level) => level,
				Err(message) => return Some(format!("--log {}", message)),
			};

			match glob::Pattern::new(parts[1]) {
				Ok(pattern) => self.log_levels.push((pattern, level)),
				Err(err) => return Some(format!("--log '{}' has a bad glob: {}", parts[1], err.msg)),
			}
		}
		None
	}

	/// Sets max_secs. The value should be a number followed by one of the
	/// time_suffixes, e.g. "30s" or "5m".
	pub fn parse_max_secs(&mut self, value: &str) -> Option<String>
	{
		let (number, scale) = if let Some(n) = value.strip_suffix("ms") {
			(n, 0.001)
		} else if let Some(n) = value.strip_suffix('s') {
			(n, 1.0)
		} else if let Some(n) = value.strip_suffix('m') {
			(n, 60.0)
		} else if let Some(n) = value.strip_suffix('h') {
			(n, 60.0*60.0)
		} else {
			return Some(format!("--max-time should have a {} suffix", time_suffixes()));
		};

		match number.parse::<f64>() {
			Ok(n) if n > 0.0 => {self.max_secs = n*scale; None},
			Ok(_) => Some("--max-time should be positive".to_string()),
			Err(_) => Some(format!("--max-time '{}' should be a number", number)),
		}
	}
}

impl Default for Config
{
	fn default() -> Config
	{
		Config::new()
	}
}

#[cfg(test)]
mod tests
{
	use super::*;

	#[test]
	fn log_level()
	{
		let mut config = Config::new();
		assert_eq!(config.parse_log_level("debug"), None);
		assert_eq!(config.log_level, LogLevel::Debug);
		assert!(config.parse_log_level("chatty").is_some());
	}

	#[test]
	fn log_level_overrides()
	{
		let mut config = Config::new();
		assert_eq!(config.parse_log_levels(vec!["excessive:qss*", "error:counter"]), None);
		assert_eq!(config.log_levels.len(), 2);
		assert!(config.log_levels[0].0.matches("qss1_integrator"));
		assert_eq!(config.log_levels[1].1, LogLevel::Error);

		assert!(config.parse_log_levels(vec!["qss*"]).is_some());
		assert!(config.parse_log_levels(vec!["info:[qss"]).is_some());
	}

	#[test]
	fn max_secs()
	{
		let mut config = Config::new();
		assert_eq!(config.parse_max_secs("2m"), None);
		assert_eq!(config.max_secs, 120.0);
		assert_eq!(config.parse_max_secs("250ms"), None);
		assert_eq!(config.max_secs, 0.25);
		assert!(config.parse_max_secs("10").is_some());
		assert!(config.parse_max_secs("xs").is_some());
		assert!(config.parse_max_secs("-1s").is_some());
	}
}
