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
use crate::config::*;
use crate::logging::*;
use crate::sim_time::Time;
use glob;

/// Writes log messages to stdout. Messages are prefixed with the current
/// simulation time and a topic, normally the name of the dynamics that is
/// executing (or "simulation").
pub struct Logger
{
	/// Updated by the simulation as time advances.
	pub time: Time,

	level: LogLevel,
	overrides: Vec<(glob::Pattern, LogLevel)>,
	precision: usize,
	colorize: bool,
	escapes: [String; 5],
}

impl Logger
{
	pub fn new(config: &Config) -> Logger
	{
		Logger {
			time: 0.0,
			level: config.log_level,
			overrides: config.log_levels.clone(),
			precision: config.precision,
			colorize: config.colorize,
			escapes: [
				config.error_escape_code.clone(),
				config.warning_escape_code.clone(),
				config.info_escape_code.clone(),
				config.debug_escape_code.clone(),
				config.excessive_escape_code.clone(),
			],
		}
	}

	pub fn is_enabled(&self, level: LogLevel, topic: &str) -> bool
	{
		if !self.overrides.is_empty() {	// short circuit some work if we have no overrides
			for (pattern, clevel) in self.overrides.iter() {
				if pattern.matches(topic) {
					return level <= *clevel
				}
			}
		}

		level <= self.level
	}

	/// Normally you'll use one of the log macros, e.g. log_info!.
	pub fn log(&self, level: LogLevel, topic: &str, message: &str)
	{
		if self.colorize {
			let begin_escape = &self.escapes[level as usize];
			print!("{0}{1:.2$}   {3} {4}{5}\n", begin_escape, self.time, self.precision, topic, message, end_escape());
		} else {
			let prefix = match level {
				LogLevel::Error		=> "Error",
				LogLevel::Warning	=> "Warn ",
				LogLevel::Info		=> "Info ",
				LogLevel::Debug		=> "Debug",
				LogLevel::Excessive	=> "Exces",
			};
			print!("{0:.1$}  {2} {3}  {4}\n", self.time, self.precision, prefix, topic, message);
		}
	}
}

fn end_escape() -> &'static str
{
	"\x1b[0m"
}
