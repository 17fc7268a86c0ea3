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
//! Irritator is a discrete event (DEVS) simulation kernel with a catalogue of
//! quantized state system (QSS) models for simulating continuous systems.
//!
//! Models are allocated within a `Simulation`, connected together through
//! typed ports, and then the simulation is stepped: each step runs the models
//! with the earliest time of next event along with the models they send
//! messages to.
#[macro_use]
pub mod logging;

pub mod arena;
pub mod config;
pub mod context;
pub mod dynamics;
pub mod effector;
pub mod error;
pub mod graph;
pub mod hsm;
pub mod logger;
pub mod message;
pub mod model;
pub mod observer;
pub mod ports;
pub mod scheduler;
pub mod sim_state;
pub mod sim_time;
pub mod simulation;
pub mod sources;

pub use arena::*;
pub use config::*;
pub use context::*;
pub use dynamics::*;
pub use error::*;
pub use graph::*;
pub use hsm::*;
pub use logger::*;
pub use logging::*;
pub use message::*;
pub use model::*;
pub use observer::*;
pub use ports::*;
pub use sim_state::*;
pub use sim_time::*;
pub use simulation::*;
pub use sources::*;
