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
//! The connection graph between model output ports and model input ports.
//! Edges are stored in fixed size node blocks drawn from a bounded pool so
//! that connecting and disconnecting at run time doesn't grow without limit.
use crate::arena::Identifier;
use crate::error::*;
use crate::model::ModelId;
use crate::ports::PortIndex;

/// Number of edges stored in each node block.
pub const BLOCK_LEN: usize = 4;

const NO_BLOCK: u32 = u32::MAX;

/// A connection to a model's input port.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Edge
{
	pub dst: ModelId,
	pub port: PortIndex,
}

#[derive(Clone, Debug)]
struct NodeBlock
{
	edges: [Edge; BLOCK_LEN],
	len: usize,
	next: u32,
}

impl NodeBlock
{
	fn new() -> NodeBlock
	{
		NodeBlock {edges: [Edge::default(); BLOCK_LEN], len: 0, next: NO_BLOCK}
	}
}

// First and last blocks of an output port's edge list.
#[derive(Clone, Copy, Debug)]
struct Chain
{
	head: u32,
	tail: u32,
}

impl Chain
{
	const EMPTY: Chain = Chain {head: NO_BLOCK, tail: NO_BLOCK};
}

// The edge lists of one model slot. owner is the id of the model currently
// using the slot so that stale ids don't pick up a newer model's edges.
#[derive(Clone, Debug, Default)]
struct Node
{
	owner: Option<ModelId>,
	chains: Vec<Chain>,
}

pub struct Graph
{
	blocks: Vec<NodeBlock>,
	free_head: u32,
	capacity: usize,
	used: usize,
	nodes: Vec<Node>,	// indexed by model index
}

impl Graph
{
	pub fn new(max_blocks: usize) -> Graph
	{
		Graph {
			blocks: Vec::new(),
			free_head: NO_BLOCK,
			capacity: max_blocks,
			used: 0,
			nodes: Vec::new(),
		}
	}

	/// Number of node blocks in use.
	pub fn blocks_used(&self) -> usize
	{
		self.used
	}

	pub fn capacity(&self) -> usize
	{
		self.capacity
	}

	/// Sets up (empty) edge lists for each output port of a new model.
	pub fn add_model(&mut self, id: ModelId, outputs: usize)
	{
		let index = id.index() as usize;
		if index >= self.nodes.len() {
			self.nodes.resize(index + 1, Node::default());
		}
		debug_assert!(self.nodes[index].chains.iter().all(|c| c.head == NO_BLOCK), "{} still has edges", id);
		self.nodes[index] = Node {owner: Some(id), chains: vec![Chain::EMPTY; outputs]};
	}

	pub fn is_connected(&self, src: ModelId, src_port: PortIndex, dst: ModelId, dst_port: PortIndex) -> bool
	{
		let edge = Edge {dst, port: dst_port};
		self.fanout(src, src_port).any(|e| e == edge)
	}

	/// Adds an edge. Note that this doesn't check port types: that's done by
	/// the simulation which knows the dynamics.
	///
	/// Linking the edge in is O(1): each port tracks its tail block and new
	/// edges are appended there so that fanout stays in connection order
	/// (which keeps runs reproducible). Rejecting duplicate edges does walk
	/// the chain.
	pub fn connect(&mut self, src: ModelId, src_port: PortIndex, dst: ModelId, dst_port: PortIndex) -> Result<()>
	{
		let chain = self.chain(src, src_port)?;
		if self.is_connected(src, src_port, dst, dst_port) {
			return Err(Error::AlreadyConnected {src, src_port, dst, dst_port});
		}

		let edge = Edge {dst, port: dst_port};
		if chain.tail != NO_BLOCK && self.blocks[chain.tail as usize].len < BLOCK_LEN {
			let block = &mut self.blocks[chain.tail as usize];
			block.edges[block.len] = edge;
			block.len += 1;
			return Ok(());
		}

		let new = self.alloc_block()?;
		let block = &mut self.blocks[new as usize];
		block.edges[0] = edge;
		block.len = 1;
		let head = if chain.tail == NO_BLOCK {
			new
		} else {
			self.blocks[chain.tail as usize].next = new;
			chain.head
		};
		self.set_chain(src, src_port, Chain {head, tail: new});
		Ok(())
	}

	pub fn disconnect(&mut self, src: ModelId, src_port: PortIndex, dst: ModelId, dst_port: PortIndex) -> Result<()>
	{
		let chain = self.chain(src, src_port)?;
		let edge = Edge {dst, port: dst_port};
		let (chain, removed) = self.remove_matching(chain, |e| e == edge);
		if removed == 0 {
			return Err(Error::NotConnected {src, src_port, dst, dst_port});
		}
		self.set_chain(src, src_port, chain);
		Ok(())
	}

	/// The input ports connected to an output port, in connection order.
	/// Unknown (or freed) models and ports have no edges.
	pub fn fanout(&self, src: ModelId, src_port: PortIndex) -> Fanout<'_>
	{
		let block = self.chain(src, src_port).map_or(NO_BLOCK, |c| c.head);
		Fanout {graph: self, block, index: 0}
	}

	/// Removes all edges out of a model (and its edge lists).
	pub fn clear_model(&mut self, id: ModelId)
	{
		let index = id.index() as usize;
		if self.nodes.get(index).map_or(false, |n| n.owner == Some(id)) {
			self.free_lists(index);
		}
	}

	/// Removes every edge into a model. Returns the number removed.
	pub fn remove_edges_to(&mut self, dst: ModelId) -> usize
	{
		let mut removed = 0;
		for index in 0..self.nodes.len() {
			for port in 0..self.nodes[index].chains.len() {
				let chain = self.nodes[index].chains[port];
				let (chain, count) = self.remove_matching(chain, |e| e.dst == dst);
				self.nodes[index].chains[port] = chain;
				removed += count;
			}
		}
		removed
	}

	/// Drops every edge but keeps the block pool.
	pub fn clear(&mut self)
	{
		for index in 0..self.nodes.len() {
			self.free_lists(index);
		}
		self.nodes.clear();
	}

	fn free_lists(&mut self, index: usize)
	{
		let chains = std::mem::take(&mut self.nodes[index].chains);
		self.nodes[index].owner = None;
		for chain in chains {
			let mut current = chain.head;
			while current != NO_BLOCK {
				let next = self.blocks[current as usize].next;
				self.free_block(current);
				current = next;
			}
		}
	}

	fn chain(&self, src: ModelId, src_port: PortIndex) -> Result<Chain>
	{
		let node = self.nodes.get(src.index() as usize).filter(|n| n.owner == Some(src)).ok_or(Error::UnknownModel(src))?;
		node.chains.get(src_port).copied().ok_or(Error::UnknownPort {model: src, port: src_port, direction: "output"})
	}

	fn set_chain(&mut self, src: ModelId, src_port: PortIndex, chain: Chain)
	{
		self.nodes[src.index() as usize].chains[src_port] = chain;
	}

	// Removes the edges that match from the chain, compacting blocks as it
	// goes and freeing blocks that become empty. Returns the new chain and
	// the number of edges removed.
	fn remove_matching(&mut self, chain: Chain, matches: impl Fn(Edge) -> bool) -> (Chain, usize)
	{
		let mut removed = 0;
		let mut head = chain.head;
		let mut prev = NO_BLOCK;
		let mut current = chain.head;
		while current != NO_BLOCK {
			let block = &mut self.blocks[current as usize];
			let mut kept = 0;
			for i in 0..block.len {
				let edge = block.edges[i];
				if matches(edge) {
					removed += 1;
				} else {
					block.edges[kept] = edge;
					kept += 1;
				}
			}
			block.len = kept;

			let next = block.next;
			if kept == 0 {
				if prev == NO_BLOCK {
					head = next;
				} else {
					self.blocks[prev as usize].next = next;
				}
				self.free_block(current);
			} else {
				prev = current;
			}
			current = next;
		}
		(Chain {head, tail: prev}, removed)
	}

	fn alloc_block(&mut self) -> Result<u32>
	{
		if self.free_head != NO_BLOCK {
			let index = self.free_head;
			self.free_head = self.blocks[index as usize].next;
			self.blocks[index as usize] = NodeBlock::new();
			self.used += 1;
			return Ok(index);
		}

		if self.blocks.len() >= self.capacity {
			return Err(Error::NotEnoughMemory("node blocks"));
		}
		self.blocks.push(NodeBlock::new());
		self.used += 1;
		Ok((self.blocks.len() - 1) as u32)
	}

	fn free_block(&mut self, index: u32)
	{
		let block = &mut self.blocks[index as usize];
		block.len = 0;
		block.next = self.free_head;
		self.free_head = index;
		self.used -= 1;
	}
}

pub struct Fanout<'a>
{
	graph: &'a Graph,
	block: u32,
	index: usize,
}

impl<'a> Iterator for Fanout<'a>
{
	type Item = Edge;

	fn next(&mut self) -> Option<Edge>
	{
		while self.block != NO_BLOCK {
			let block = &self.graph.blocks[self.block as usize];
			if self.index < block.len {
				self.index += 1;
				return Some(block.edges[self.index - 1]);
			}
			self.block = block.next;
			self.index = 0;
		}
		None
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use proptest::prelude::*;

	fn id(index: u32) -> ModelId
	{
		ModelId::from_parts(1, index)
	}

	fn graph(models: u32, outputs: usize, blocks: usize) -> Graph
	{
		let mut graph = Graph::new(blocks);
		for i in 0..models {
			graph.add_model(id(i), outputs);
		}
		graph
	}

	fn edges(graph: &Graph, src: ModelId, port: PortIndex) -> Vec<(u32, PortIndex)>
	{
		graph.fanout(src, port).map(|e| (e.dst.index(), e.port)).collect()
	}

	#[test]
	fn fanout_is_in_connection_order()
	{
		let mut graph = graph(8, 2, 16);
		for i in 1..7 {
			graph.connect(id(0), 1, id(i), 0).unwrap();
		}
		assert_eq!(edges(&graph, id(0), 1), vec![(1, 0), (2, 0), (3, 0), (4, 0), (5, 0), (6, 0)]);
		assert!(edges(&graph, id(0), 0).is_empty());
		assert_eq!(graph.blocks_used(), 2);
	}

	#[test]
	fn duplicate_edges_are_rejected()
	{
		let mut graph = graph(2, 1, 16);
		graph.connect(id(0), 0, id(1), 0).unwrap();
		graph.connect(id(0), 0, id(1), 1).unwrap();
		let err = graph.connect(id(0), 0, id(1), 0).unwrap_err();
		assert!(matches!(err, Error::AlreadyConnected {..}));
	}

	#[test]
	fn bad_sources()
	{
		let mut graph = graph(2, 1, 16);
		assert!(matches!(graph.connect(id(5), 0, id(1), 0).unwrap_err(), Error::UnknownModel(_)));
		assert!(matches!(graph.connect(id(0), 3, id(1), 0).unwrap_err(), Error::UnknownPort {..}));
		assert!(matches!(graph.disconnect(id(0), 0, id(1), 0).unwrap_err(), Error::NotConnected {..}));
	}

	#[test]
	fn pool_exhaustion()
	{
		let mut graph = graph(10, 1, 2);
		for i in 0..BLOCK_LEN as u32 {
			graph.connect(id(0), 0, id(i + 1), 0).unwrap();
		}
		graph.connect(id(1), 0, id(0), 0).unwrap();
		let err = graph.connect(id(2), 0, id(0), 0).unwrap_err();
		assert!(matches!(err, Error::NotEnoughMemory("node blocks")));

		// blocks are recycled
		graph.disconnect(id(1), 0, id(0), 0).unwrap();
		graph.connect(id(2), 0, id(0), 0).unwrap();
	}

	#[test]
	fn disconnect_keeps_order()
	{
		let mut graph = graph(8, 1, 16);
		for i in 1..7 {
			graph.connect(id(0), 0, id(i), 0).unwrap();
		}
		graph.disconnect(id(0), 0, id(2), 0).unwrap();
		graph.disconnect(id(0), 0, id(5), 0).unwrap();
		graph.disconnect(id(0), 0, id(6), 0).unwrap();
		assert_eq!(edges(&graph, id(0), 0), vec![(1, 0), (3, 0), (4, 0)]);
		assert_eq!(graph.blocks_used(), 1);
	}

	#[test]
	fn removing_a_model()
	{
		let mut graph = graph(4, 2, 16);
		graph.connect(id(0), 0, id(1), 0).unwrap();
		graph.connect(id(0), 1, id(1), 1).unwrap();
		graph.connect(id(0), 1, id(2), 0).unwrap();
		graph.connect(id(1), 0, id(3), 0).unwrap();
		graph.connect(id(2), 0, id(1), 0).unwrap();

		assert_eq!(graph.remove_edges_to(id(1)), 3);
		graph.clear_model(id(1));
		assert_eq!(edges(&graph, id(0), 1), vec![(2, 0)]);
		assert!(edges(&graph, id(1), 0).is_empty());
		assert_eq!(graph.blocks_used(), 1);
	}

	#[test]
	fn appends_after_removals()
	{
		let mut graph = graph(12, 1, 16);
		for i in 1..7 {
			graph.connect(id(0), 0, id(i), 0).unwrap();
		}
		graph.disconnect(id(0), 0, id(5), 0).unwrap();
		graph.disconnect(id(0), 0, id(6), 0).unwrap();
		for i in 7..10 {
			graph.connect(id(0), 0, id(i), 0).unwrap();
		}
		assert_eq!(edges(&graph, id(0), 0), vec![(1, 0), (2, 0), (3, 0), (4, 0), (7, 0), (8, 0), (9, 0)]);
		assert_eq!(graph.blocks_used(), 2);

		// emptying the chain resets the tail too
		for i in [1, 2, 3, 4, 7, 8, 9] {
			graph.disconnect(id(0), 0, id(i), 0).unwrap();
		}
		assert_eq!(graph.blocks_used(), 0);
		graph.connect(id(0), 0, id(10), 0).unwrap();
		assert_eq!(edges(&graph, id(0), 0), vec![(10, 0)]);
	}

	#[test]
	fn stale_ids_have_no_edges()
	{
		let mut graph = graph(2, 1, 16);
		graph.connect(id(0), 0, id(1), 0).unwrap();
		graph.clear_model(id(0));

		let reused = ModelId::from_parts(2, 0);
		graph.add_model(reused, 1);
		graph.connect(reused, 0, id(1), 0).unwrap();
		assert_eq!(edges(&graph, reused, 0), vec![(1, 0)]);
		assert!(edges(&graph, id(0), 0).is_empty());
		assert!(matches!(graph.connect(id(0), 0, id(1), 0).unwrap_err(), Error::UnknownModel(_)));
		assert!(matches!(graph.disconnect(id(0), 0, id(1), 0).unwrap_err(), Error::UnknownModel(_)));

		// clearing with the stale id leaves the new model alone
		graph.clear_model(id(0));
		assert_eq!(edges(&graph, reused, 0), vec![(1, 0)]);
	}

	proptest! {
		// Connecting and then disconnecting everything returns every block.
		#[test]
		fn connect_disconnect_round_trip(pairs in proptest::collection::vec((0u32..6, 0usize..2, 0u32..6, 0usize..3), 0..40))
		{
			let mut graph = graph(6, 2, 64);
			let mut connected = Vec::new();
			for &(src, src_port, dst, dst_port) in &pairs {
				if graph.connect(id(src), src_port, id(dst), dst_port).is_ok() {
					connected.push((src, src_port, dst, dst_port));
				}
			}
			for &(src, src_port, dst, dst_port) in &connected {
				prop_assert!(graph.is_connected(id(src), src_port, id(dst), dst_port));
			}
			for &(src, src_port, dst, dst_port) in connected.iter().rev() {
				graph.disconnect(id(src), src_port, id(dst), dst_port).unwrap();
			}
			prop_assert_eq!(graph.blocks_used(), 0);
		}
	}
}
