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
#![macro_use]
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum LogLevel
{
	Error,	// update log_levels if this changes
	Warning,
	Info,
	Debug,
	Excessive
}

/// For use in --help messages.
pub fn log_levels() -> &'static str
{
	"error, warning, info, debug, or excessive"
}

impl FromStr for LogLevel
{
	type Err = String;

	fn from_str(s: &str) -> Result<LogLevel, String>
	{
		match s {
			"error"		=> Ok(LogLevel::Error),
			"warning"	=> Ok(LogLevel::Warning),
			"info"		=> Ok(LogLevel::Info),
			"debug"		=> Ok(LogLevel::Debug),
			"excessive"	=> Ok(LogLevel::Excessive),
			_			=> Err(format!("level should be {}", log_levels())),
		}
	}
}

/// Generic macro that calls the `Logger` log method. More often you'll use one of
/// the other macros like log_info!. Note that the message is only formatted if
/// the logger would actually print it.
#[macro_export]
macro_rules! log_at
{
	($logger:expr, $level:expr, $topic:expr, $msg:expr) => ({
		let logger: &$crate::logger::Logger = &$logger;
		if logger.is_enabled($level, $topic) {
			logger.log($level, $topic, $msg);
		}
	});
	($logger:expr, $level:expr, $topic:expr, $fmt:expr, $($arg:tt)*) => ({
		let logger: &$crate::logger::Logger = &$logger;
		if logger.is_enabled($level, $topic) {
			logger.log($level, $topic, &format!($fmt, $($arg)*));
		}
	});
}

#[macro_export]
macro_rules! log_error
{
	($logger:expr, $topic:expr, $msg:expr) => ($crate::log_at!($logger, $crate::logging::LogLevel::Error, $topic, $msg));
	($logger:expr, $topic:expr, $fmt:expr, $($arg:tt)*) => ($crate::log_at!($logger, $crate::logging::LogLevel::Error, $topic, $fmt, $($arg)*));
}

#[macro_export]
macro_rules! log_warning
{
	($logger:expr, $topic:expr, $msg:expr) => ($crate::log_at!($logger, $crate::logging::LogLevel::Warning, $topic, $msg));
	($logger:expr, $topic:expr, $fmt:expr, $($arg:tt)*) => ($crate::log_at!($logger, $crate::logging::LogLevel::Warning, $topic, $fmt, $($arg)*));
}

/// # Examples
///
/// ```rust
/// #[macro_use]
/// extern crate irritator;
///
/// use irritator::*;
///
/// fn main()
/// {
/// 	let logger = Logger::new(&Config::new());
/// 	let x = 10;
/// 	log_info!(logger, "simulation", "hello");			// logs a string
/// 	log_info!(logger, "simulation", "x = {:?}", x);	// logs using a format string
/// }
/// ```
#[macro_export]
macro_rules! log_info
{
	($logger:expr, $topic:expr, $msg:expr) => ($crate::log_at!($logger, $crate::logging::LogLevel::Info, $topic, $msg));
	($logger:expr, $topic:expr, $fmt:expr, $($arg:tt)*) => ($crate::log_at!($logger, $crate::logging::LogLevel::Info, $topic, $fmt, $($arg)*));
}

#[macro_export]
macro_rules! log_debug
{
	($logger:expr, $topic:expr, $msg:expr) => ($crate::log_at!($logger, $crate::logging::LogLevel::Debug, $topic, $msg));
	($logger:expr, $topic:expr, $fmt:expr, $($arg:tt)*) => ($crate::log_at!($logger, $crate::logging::LogLevel::Debug, $topic, $fmt, $($arg)*));
}

#[macro_export]
macro_rules! log_excessive
{
	($logger:expr, $topic:expr, $msg:expr) => ($crate::log_at!($logger, $crate::logging::LogLevel::Excessive, $topic, $msg));
	($logger:expr, $topic:expr, $fmt:expr, $($arg:tt)*) => ($crate::log_at!($logger, $crate::logging::LogLevel::Excessive, $topic, $fmt, $($arg)*));
}
