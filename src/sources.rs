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
//! External sources stream numbers into models, e.g. the inter-arrival times
//! used by a generator. Models never see a source directly: they hold a small
//! `Source` handle and ask `ExternalSources` for the next value. Values are
//! produced a chunk at a time so that file backed sources don't have to read
//! their whole file up front.
use crate::arena::*;
use crate::error::*;
use rand::SeedableRng;
use rand_distr::{Bernoulli, Binomial, Cauchy, ChiSquared, Distribution, Exp, FisherF, Gamma, Geometric, Gumbel, LogNormal, Normal, Poisson, StudentT, Uniform, Weibull};
use rand_xorshift::XorShiftRng;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Number of values each client buffers.
pub const CHUNK_LEN: usize = 512;

const NO_CLIENT: u32 = u32::MAX;

crate::identifier!(ConstantSourceId, "C");
crate::identifier!(RandomSourceId, "R");
crate::identifier!(BinaryFileSourceId, "B");
crate::identifier!(TextFileSourceId, "T");

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum SourceKind
{
	Constant,
	Random,
	BinaryFile,
	TextFile,
}

impl fmt::Display for SourceKind
{
	fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result
	{
		let name = match *self {
			SourceKind::Constant	=> "constant",
			SourceKind::Random		=> "random",
			SourceKind::BinaryFile	=> "binary file",
			SourceKind::TextFile	=> "text file",
		};
		write!(formatter, "{}", name)
	}
}

/// What a model holds onto in order to pull values from a source. `chunk_id`
/// is the client slot the registry assigned in `initialize` and `index` is the
/// position of the next value within the client's chunk.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Source
{
	pub kind: SourceKind,
	pub id: u64,
	pub chunk_id: u32,
	pub index: usize,
}

impl Source
{
	pub fn constant(id: ConstantSourceId) -> Source
	{
		Source::new(SourceKind::Constant, id.raw())
	}

	pub fn random(id: RandomSourceId) -> Source
	{
		Source::new(SourceKind::Random, id.raw())
	}

	pub fn binary_file(id: BinaryFileSourceId) -> Source
	{
		Source::new(SourceKind::BinaryFile, id.raw())
	}

	pub fn text_file(id: TextFileSourceId) -> Source
	{
		Source::new(SourceKind::TextFile, id.raw())
	}

	/// True between initialize and finalize.
	pub fn is_bound(&self) -> bool
	{
		self.chunk_id != NO_CLIENT
	}

	fn new(kind: SourceKind, id: u64) -> Source
	{
		Source {kind, id, chunk_id: NO_CLIENT, index: 0}
	}
}

/// The distributions random sources can draw from. Parameters follow the
/// usual textbook conventions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RandomDistribution
{
	/// Integers in [a, b].
	UniformInt {a: i64, b: i64},

	/// Reals in [a, b).
	UniformReal {a: f64, b: f64},
	Bernoulli {p: f64},
	Binomial {t: u64, p: f64},

	/// Number of failures before the kth success.
	NegativeBinomial {k: f64, p: f64},

	/// Number of failures before the first success.
	Geometric {p: f64},
	Poisson {mean: f64},
	Exponential {lambda: f64},
	Gamma {alpha: f64, beta: f64},
	Weibull {a: f64, b: f64},

	/// Gumbel distribution with location a and scale b.
	ExtremeValue {a: f64, b: f64},
	Normal {mean: f64, stddev: f64},
	Lognormal {m: f64, s: f64},
	ChiSquared {n: f64},
	Cauchy {a: f64, b: f64},
	FisherF {m: f64, n: f64},
	StudentT {n: f64},
}

impl RandomDistribution
{
	/// Returns an error message if the parameters are out of range.
	pub fn check(&self) -> std::result::Result<(), String>
	{
		let mut rng = XorShiftRng::seed_from_u64(1);
		let mut scratch = Vec::new();
		self.fill(&mut rng, 0, &mut scratch)
	}

	fn fill(&self, rng: &mut XorShiftRng, n: usize, out: &mut Vec<f64>) -> std::result::Result<(), String>
	{
		fn take<T, D: Distribution<T>>(dist: D, rng: &mut XorShiftRng, n: usize, out: &mut Vec<f64>, convert: impl Fn(T) -> f64)
		{
			out.extend(dist.sample_iter(rng).take(n).map(convert));
		}

		fn bad<E: fmt::Debug>(err: E) -> String
		{
			format!("{:?}", err)
		}

		match *self {
			RandomDistribution::UniformInt {a, b} => {
				if a > b {
					return Err(format!("uniform int needs a <= b (a = {}, b = {})", a, b));
				}
				take(Uniform::new_inclusive(a, b), rng, n, out, |v: i64| v as f64);
			},
			RandomDistribution::UniformReal {a, b} => {
				if !(a < b) || !a.is_finite() || !b.is_finite() {
					return Err(format!("uniform real needs finite a < b (a = {}, b = {})", a, b));
				}
				take(Uniform::new(a, b), rng, n, out, |v: f64| v);
			},
			RandomDistribution::Bernoulli {p} => take(Bernoulli::new(p).map_err(bad)?, rng, n, out, |v: bool| if v {1.0} else {0.0}),
			RandomDistribution::Binomial {t, p} => take(Binomial::new(t, p).map_err(bad)?, rng, n, out, |v: u64| v as f64),
			RandomDistribution::NegativeBinomial {k, p} => {
				if !(k > 0.0) || !(p > 0.0 && p <= 1.0) {
					return Err(format!("negative binomial needs k > 0 and p in (0, 1] (k = {}, p = {})", k, p));
				}
				if p == 1.0 {
					out.extend(std::iter::repeat(0.0).take(n));
				} else {
					// Gamma-Poisson mixture
					let gamma = Gamma::new(k, (1.0 - p)/p).map_err(bad)?;
					for _ in 0..n {
						let lambda: f64 = gamma.sample(rng);
						let v: f64 = if lambda > 0.0 {Poisson::new(lambda).map_err(bad)?.sample(rng)} else {0.0};
						out.push(v);
					}
				}
			},
			RandomDistribution::Geometric {p} => take(Geometric::new(p).map_err(bad)?, rng, n, out, |v: u64| v as f64),
			RandomDistribution::Poisson {mean} => take::<f64, _>(Poisson::new(mean).map_err(bad)?, rng, n, out, |v| v),
			RandomDistribution::Exponential {lambda} => take(Exp::new(lambda).map_err(bad)?, rng, n, out, |v: f64| v),
			RandomDistribution::Gamma {alpha, beta} => take(Gamma::new(alpha, beta).map_err(bad)?, rng, n, out, |v: f64| v),
			RandomDistribution::Weibull {a, b} => take(Weibull::new(b, a).map_err(bad)?, rng, n, out, |v: f64| v),
			RandomDistribution::ExtremeValue {a, b} => take(Gumbel::new(a, b).map_err(bad)?, rng, n, out, |v: f64| v),
			RandomDistribution::Normal {mean, stddev} => take(Normal::new(mean, stddev).map_err(bad)?, rng, n, out, |v: f64| v),
			RandomDistribution::Lognormal {m, s} => take(LogNormal::new(m, s).map_err(bad)?, rng, n, out, |v: f64| v),
			RandomDistribution::ChiSquared {n: k} => take(ChiSquared::new(k).map_err(bad)?, rng, n, out, |v: f64| v),
			RandomDistribution::Cauchy {a, b} => take(Cauchy::new(a, b).map_err(bad)?, rng, n, out, |v: f64| v),
			RandomDistribution::FisherF {m, n: d} => take(FisherF::new(m, d).map_err(bad)?, rng, n, out, |v: f64| v),
			RandomDistribution::StudentT {n: k} => take(StudentT::new(k).map_err(bad)?, rng, n, out, |v: f64| v),
		}
		Ok(())
	}
}

pub struct ConstantSource
{
	values: Vec<f64>,
}

impl ConstantSource
{
	pub fn values(&self) -> &[f64]
	{
		&self.values
	}
}

#[derive(Clone, Debug, Default)]
struct Chunk
{
	values: Vec<f64>,
	number: u64,	// position of the chunk within the source's stream
}

pub struct RandomSource
{
	pub distribution: RandomDistribution,
	max_clients: u32,
	clients: Vec<Option<Chunk>>,
}

impl RandomSource
{
	/// Number of handles currently bound to the source.
	pub fn clients(&self) -> usize
	{
		self.clients.iter().filter(|c| c.is_some()).count()
	}

	pub fn max_clients(&self) -> u32
	{
		self.max_clients
	}
}

struct FileClient
{
	chunk: Chunk,
	reader: BufReader<File>,
	offset: u64,		// bytes consumed so far
	tokens: u64,		// text files only, number of tokens consumed so far
	needs_seek: bool,	// set after a rollback
}

/// A file of little endian doubles or a text file of whitespace separated
/// numbers. Note that each client gets its own file handle.
pub struct FileSource
{
	path: PathBuf,
	max_clients: u32,
	clients: Vec<Option<FileClient>>,
}

impl FileSource
{
	pub fn path(&self) -> &Path
	{
		&self.path
	}

	pub fn clients(&self) -> usize
	{
		self.clients.iter().filter(|c| c.is_some()).count()
	}

	pub fn max_clients(&self) -> u32
	{
		self.max_clients
	}
}

#[derive(Clone)]
struct Snapshot
{
	kind: SourceKind,
	id: u64,
	slot: u32,
	chunk: Chunk,
	offset: u64,
	tokens: u64,
}

#[derive(Default)]
struct Journal
{
	active: bool,
	rng: Option<XorShiftRng>,
	clients: Vec<Snapshot>,
	bound: Vec<(SourceKind, u64, u32)>,	// slots handed out since checkpoint
}

impl Journal
{
	fn save_rng(&mut self, rng: &XorShiftRng)
	{
		if self.active && self.rng.is_none() {
			self.rng = Some(rng.clone());
		}
	}

	fn bind(&mut self, kind: SourceKind, id: u64, slot: u32)
	{
		if self.active {
			self.bound.push((kind, id, slot));
		}
	}

	fn has(&self, kind: SourceKind, id: u64, slot: u32) -> bool
	{
		self.clients.iter().any(|s| s.kind == kind && s.id == id && s.slot == slot)
	}
}

/// Owns every external source along with the one random number generator
/// all of the random sources share.
pub struct ExternalSources
{
	constants: Arena<ConstantSource, ConstantSourceId>,
	randoms: Arena<RandomSource, RandomSourceId>,
	binary_files: Arena<FileSource, BinaryFileSourceId>,
	text_files: Arena<FileSource, TextFileSourceId>,
	rng: XorShiftRng,
	journal: Journal,
}

impl ExternalSources
{
	/// A seed of zero means seed from the wall clock.
	pub fn new(capacity: usize, seed: u64) -> ExternalSources
	{
		ExternalSources {
			constants: Arena::with_capacity("constant sources", capacity),
			randoms: Arena::with_capacity("random sources", capacity),
			binary_files: Arena::with_capacity("binary file sources", capacity),
			text_files: Arena::with_capacity("text file sources", capacity),
			rng: new_rng(seed),
			journal: Journal::default(),
		}
	}

	pub fn reseed(&mut self, seed: u64)
	{
		self.rng = new_rng(seed);
	}

	// --- registration ----------------------------------------------------------
	/// Values are replayed cyclically.
	pub fn alloc_constant(&mut self, values: &[f64]) -> Result<ConstantSourceId>
	{
		if values.len() > CHUNK_LEN {
			return Err(Error::InvalidSource {kind: SourceKind::Constant, id: 0, reason: format!("{} values is more than {}", values.len(), CHUNK_LEN)});
		}
		self.constants.alloc(ConstantSource {values: values.to_vec()})
	}

	pub fn alloc_random(&mut self, distribution: RandomDistribution, max_clients: u32) -> Result<RandomSourceId>
	{
		if let Err(reason) = distribution.check() {
			return Err(Error::InvalidSource {kind: SourceKind::Random, id: 0, reason});
		}
		self.randoms.alloc(RandomSource {distribution, max_clients: max_clients.max(1), clients: Vec::new()})
	}

	/// Clients divide the file round robin: client k of max_clients reads
	/// chunks k, k + max_clients, etc.
	pub fn alloc_binary_file(&mut self, path: &Path, max_clients: u32) -> Result<BinaryFileSourceId>
	{
		open(path)?;
		self.binary_files.alloc(FileSource {path: path.to_path_buf(), max_clients: max_clients.max(1), clients: Vec::new()})
	}

	pub fn alloc_text_file(&mut self, path: &Path, max_clients: u32) -> Result<TextFileSourceId>
	{
		open(path)?;
		self.text_files.alloc(FileSource {path: path.to_path_buf(), max_clients: max_clients.max(1), clients: Vec::new()})
	}

	pub fn free_constant(&mut self, id: ConstantSourceId) -> bool
	{
		self.constants.free(id).is_some()
	}

	pub fn free_random(&mut self, id: RandomSourceId) -> bool
	{
		self.randoms.free(id).is_some()
	}

	pub fn free_binary_file(&mut self, id: BinaryFileSourceId) -> bool
	{
		self.binary_files.free(id).is_some()
	}

	pub fn free_text_file(&mut self, id: TextFileSourceId) -> bool
	{
		self.text_files.free(id).is_some()
	}

	pub fn constant(&self, id: ConstantSourceId) -> Option<&ConstantSource>
	{
		self.constants.get(id)
	}

	pub fn random(&self, id: RandomSourceId) -> Option<&RandomSource>
	{
		self.randoms.get(id)
	}

	pub fn binary_file(&self, id: BinaryFileSourceId) -> Option<&FileSource>
	{
		self.binary_files.get(id)
	}

	pub fn text_file(&self, id: TextFileSourceId) -> Option<&FileSource>
	{
		self.text_files.get(id)
	}

	// --- client protocol -------------------------------------------------------
	/// Binds a client slot to the handle and loads its first chunk. Between
	/// checkpoint and rollback the binding is undone by rollback.
	pub fn initialize(&mut self, src: &mut Source) -> Result<()>
	{
		src.index = 0;
		match src.kind {
			SourceKind::Constant => {
				if !self.constants.contains(ConstantSourceId(src.id)) {
					return Err(Error::UnknownSource {kind: src.kind, id: src.id});
				}
				src.chunk_id = 0;
			},
			SourceKind::Random => {
				let source = self.randoms.get_mut(RandomSourceId(src.id)).ok_or(Error::UnknownSource {kind: src.kind, id: src.id})?;
				let slot = free_slot(&mut source.clients, source.max_clients).ok_or(Error::NotEnoughMemory("random source clients"))?;
				let mut chunk = Chunk {values: Vec::with_capacity(CHUNK_LEN), number: 0};
				self.journal.save_rng(&self.rng);
				source.distribution.fill(&mut self.rng, CHUNK_LEN, &mut chunk.values).map_err(|reason| Error::InvalidSource {kind: src.kind, id: src.id, reason})?;
				source.clients[slot as usize] = Some(chunk);
				self.journal.bind(src.kind, src.id, slot);
				src.chunk_id = slot;
			},
			SourceKind::BinaryFile | SourceKind::TextFile => {
				let source = self.file_source_mut(src.kind, src.id).ok_or(Error::UnknownSource {kind: src.kind, id: src.id})?;
				let slot = free_slot(&mut source.clients, source.max_clients).ok_or(Error::NotEnoughMemory("file source clients"))?;
				let reader = BufReader::new(open(&source.path)?);
				let mut client = FileClient {chunk: Chunk::default(), reader, offset: 0, tokens: 0, needs_seek: false};
				load_chunk(src.kind, src.id, &source.path, &mut client, slot as u64)?;
				source.clients[slot as usize] = Some(client);
				self.journal.bind(src.kind, src.id, slot);
				src.chunk_id = slot;
			},
		}
		Ok(())
	}

	/// Loads the client's next chunk. Returns SourceEmpty if the new chunk has
	/// no values.
	pub fn update(&mut self, src: &mut Source) -> Result<()>
	{
		src.index = 0;
		let empty = Error::SourceEmpty {kind: src.kind, id: src.id};
		match src.kind {
			SourceKind::Constant => {
				let source = self.constants.get(ConstantSourceId(src.id)).ok_or(empty)?;
				if source.values.is_empty() {
					return Err(Error::SourceEmpty {kind: src.kind, id: src.id});
				}
			},
			SourceKind::Random => {
				let source = self.randoms.get_mut(RandomSourceId(src.id)).ok_or(empty)?;
				let chunk = match source.clients.get_mut(src.chunk_id as usize) {
					Some(Some(chunk)) => chunk,
					_ => return Err(Error::SourceEmpty {kind: src.kind, id: src.id}),
				};
				if self.journal.active {
					self.journal.save_rng(&self.rng);
					if !self.journal.has(src.kind, src.id, src.chunk_id) {
						self.journal.clients.push(Snapshot {kind: src.kind, id: src.id, slot: src.chunk_id, chunk: chunk.clone(), offset: 0, tokens: 0});
					}
				}
				chunk.values.clear();
				chunk.number += source.max_clients as u64;
				source.distribution.fill(&mut self.rng, CHUNK_LEN, &mut chunk.values).map_err(|reason| Error::InvalidSource {kind: src.kind, id: src.id, reason})?;
			},
			SourceKind::BinaryFile | SourceKind::TextFile => {
				let (kind, id, slot) = (src.kind, src.id, src.chunk_id);
				let active = self.journal.active && !self.journal.has(kind, id, slot);
				let source = match kind {
					SourceKind::BinaryFile => self.binary_files.get_mut(BinaryFileSourceId(id)),
					_ => self.text_files.get_mut(TextFileSourceId(id)),
				}.ok_or(empty)?;
				let client = match source.clients.get_mut(slot as usize) {
					Some(Some(client)) => client,
					_ => return Err(Error::SourceEmpty {kind, id}),
				};
				if active {
					self.journal.clients.push(Snapshot {kind, id, slot, chunk: client.chunk.clone(), offset: client.offset, tokens: client.tokens});
				}
				let number = client.chunk.number + source.max_clients as u64;
				load_chunk(kind, id, &source.path, client, number)?;
				if client.chunk.values.is_empty() {
					return Err(Error::SourceEmpty {kind, id});
				}
			},
		}
		Ok(())
	}

	/// Rewinds the handle to the start of the chunk it last loaded so the
	/// same values are produced again.
	pub fn restore(&mut self, src: &mut Source)
	{
		src.index = 0;
	}

	/// Releases the client slot (and file handle) bound to the handle.
	pub fn finalize(&mut self, src: &mut Source)
	{
		if !src.is_bound() {
			return;
		}

		let slot = src.chunk_id as usize;
		match src.kind {
			SourceKind::Constant => (),
			SourceKind::Random => {
				if let Some(source) = self.randoms.get_mut(RandomSourceId(src.id)) {
					if let Some(client) = source.clients.get_mut(slot) {
						*client = None;
					}
				}
			},
			SourceKind::BinaryFile | SourceKind::TextFile => {
				if let Some(source) = self.file_source_mut(src.kind, src.id) {
					if let Some(client) = source.clients.get_mut(slot) {
						*client = None;
					}
				}
			},
		}
		src.chunk_id = NO_CLIENT;
		src.index = 0;
	}

	/// Returns the next value for the handle, loading a new chunk when the
	/// current one has been consumed.
	pub fn next_value(&mut self, src: &mut Source) -> Result<f64>
	{
		if !src.is_bound() {
			self.initialize(src)?;
		}

		if src.kind == SourceKind::Constant {
			let source = self.constants.get(ConstantSourceId(src.id)).ok_or(Error::SourceEmpty {kind: src.kind, id: src.id})?;
			if source.values.is_empty() {
				return Err(Error::SourceEmpty {kind: src.kind, id: src.id});
			}
			let value = source.values[src.index % source.values.len()];
			src.index = (src.index + 1) % source.values.len();
			return Ok(value);
		}

		if src.index >= self.chunk(src)?.len() {
			self.update(src)?;
		}
		let value = self.chunk(src)?.get(src.index).copied().ok_or(Error::SourceEmpty {kind: src.kind, id: src.id})?;
		src.index += 1;
		Ok(value)
	}

	// --- journal ---------------------------------------------------------------
	/// Start recording client changes so that they can be undone with rollback.
	pub fn checkpoint(&mut self)
	{
		self.journal.active = true;
		self.journal.rng = None;
		self.journal.clients.clear();
		self.journal.bound.clear();
	}

	/// Forgets the changes recorded since checkpoint.
	pub fn commit(&mut self)
	{
		self.journal.active = false;
		self.journal.rng = None;
		self.journal.clients.clear();
		self.journal.bound.clear();
	}

	/// Undoes every client change made since checkpoint, including releasing
	/// the slots that initialize bound.
	pub fn rollback(&mut self)
	{
		if let Some(rng) = self.journal.rng.take() {
			self.rng = rng;
		}

		let snapshots: Vec<Snapshot> = self.journal.clients.drain(..).rev().collect();
		for snapshot in snapshots {
			match snapshot.kind {
				SourceKind::Constant => (),
				SourceKind::Random => {
					if let Some(source) = self.randoms.get_mut(RandomSourceId(snapshot.id)) {
						if let Some(Some(chunk)) = source.clients.get_mut(snapshot.slot as usize) {
							*chunk = snapshot.chunk;
						}
					}
				},
				SourceKind::BinaryFile | SourceKind::TextFile => {
					if let Some(source) = self.file_source_mut(snapshot.kind, snapshot.id) {
						if let Some(Some(client)) = source.clients.get_mut(snapshot.slot as usize) {
							client.chunk = snapshot.chunk;
							client.offset = snapshot.offset;
							client.tokens = snapshot.tokens;
							client.needs_seek = true;
						}
					}
				},
			}
		}

		let bound: Vec<(SourceKind, u64, u32)> = self.journal.bound.drain(..).collect();
		for (kind, id, slot) in bound {
			match kind {
				SourceKind::Constant => (),
				SourceKind::Random => {
					if let Some(Some(client)) = self.randoms.get_mut(RandomSourceId(id)).map(|s| s.clients.get_mut(slot as usize)) {
						*client = None;
					}
				},
				SourceKind::BinaryFile | SourceKind::TextFile => {
					if let Some(Some(client)) = self.file_source_mut(kind, id).map(|s| s.clients.get_mut(slot as usize)) {
						*client = None;
					}
				},
			}
		}
		self.journal.active = false;
	}

	fn chunk(&self, src: &Source) -> Result<&[f64]>
	{
		let slot = src.chunk_id as usize;
		let chunk = match src.kind {
			SourceKind::Constant => None,
			SourceKind::Random => self.randoms.get(RandomSourceId(src.id)).and_then(|s| s.clients.get(slot)).and_then(|c| c.as_ref()),
			SourceKind::BinaryFile => self.binary_files.get(BinaryFileSourceId(src.id)).and_then(|s| s.clients.get(slot)).and_then(|c| c.as_ref()).map(|c| &c.chunk),
			SourceKind::TextFile => self.text_files.get(TextFileSourceId(src.id)).and_then(|s| s.clients.get(slot)).and_then(|c| c.as_ref()).map(|c| &c.chunk),
		};
		chunk.map(|c| c.values.as_slice()).ok_or(Error::SourceEmpty {kind: src.kind, id: src.id})
	}

	fn file_source_mut(&mut self, kind: SourceKind, id: u64) -> Option<&mut FileSource>
	{
		match kind {
			SourceKind::BinaryFile => self.binary_files.get_mut(BinaryFileSourceId(id)),
			SourceKind::TextFile => self.text_files.get_mut(TextFileSourceId(id)),
			_ => None,
		}
	}
}

fn new_rng(seed: u64) -> XorShiftRng
{
	let seed = if seed == 0 {
		time::OffsetDateTime::now_utc().unix_timestamp_nanos() as u64
	} else {
		seed
	};
	XorShiftRng::seed_from_u64(seed)
}

fn open(path: &Path) -> Result<File>
{
	File::open(path).map_err(|source| Error::Io {path: path.to_path_buf(), source})
}

fn free_slot<T>(clients: &mut Vec<Option<T>>, max_clients: u32) -> Option<u32>
{
	if let Some(index) = clients.iter().position(|c| c.is_none()) {
		return Some(index as u32);
	}
	if clients.len() < max_clients as usize {
		clients.push(None);
		return Some((clients.len() - 1) as u32);
	}
	None
}

fn load_chunk(kind: SourceKind, id: u64, path: &Path, client: &mut FileClient, number: u64) -> Result<()>
{
	let io_error = |source: io::Error| Error::Io {path: path.to_path_buf(), source};
	client.chunk.values.clear();
	client.chunk.number = number;

	if kind == SourceKind::BinaryFile {
		client.offset = number*(CHUNK_LEN as u64)*8;
		client.reader.seek(SeekFrom::Start(client.offset)).map_err(io_error)?;
		client.needs_seek = false;

		let mut bytes = [0u8; 8];
		while client.chunk.values.len() < CHUNK_LEN {
			match client.reader.read_exact(&mut bytes) {
				Ok(()) => {
					client.offset += 8;
					client.chunk.values.push(f64::from_le_bytes(bytes));
				},
				Err(ref err) if err.kind() == io::ErrorKind::UnexpectedEof => break,
				Err(err) => return Err(io_error(err)),
			}
		}
	} else {
		if client.needs_seek {
			client.reader.seek(SeekFrom::Start(client.offset)).map_err(io_error)?;
			client.needs_seek = false;
		}

		let start = number*CHUNK_LEN as u64;
		let mut token = String::new();
		while client.tokens < start + CHUNK_LEN as u64 {
			if !next_token(&mut client.reader, &mut client.offset, &mut token).map_err(io_error)? {
				break;
			}
			if client.tokens >= start {
				let value = token.parse::<f64>().map_err(|_| Error::InvalidSource {
					kind, id,
					reason: format!("'{}' near byte {} of {} is not a number", token, client.offset, path.display())})?;
				client.chunk.values.push(value);
			}
			client.tokens += 1;
		}
	}
	Ok(())
}

fn read_byte<R: BufRead>(reader: &mut R) -> io::Result<Option<u8>>
{
	let byte = match reader.fill_buf()?.first() {
		Some(byte) => *byte,
		None => return Ok(None),
	};
	reader.consume(1);
	Ok(Some(byte))
}

// Whitespace separates tokens and # starts a comment that runs to the end of
// the line. Returns false at end of file.
fn next_token<R: BufRead>(reader: &mut R, offset: &mut u64, token: &mut String) -> io::Result<bool>
{
	token.clear();
	let mut in_comment = false;
	while let Some(byte) = read_byte(reader)? {
		*offset += 1;
		if in_comment {
			if byte == b'\n' {
				in_comment = false;
				if !token.is_empty() {
					break;
				}
			}
		} else if byte == b'#' {
			in_comment = true;
		} else if byte.is_ascii_whitespace() {
			if !token.is_empty() {
				break;
			}
		} else {
			token.push(byte as char);
		}
	}
	Ok(!token.is_empty())
}
