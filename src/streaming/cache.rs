use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use log::trace;

use crate::model::octant_id::OctantId;
use crate::model::options::IndexWidth;
use crate::model::vector3::Vector3;
use crate::reader::points::DecodedPointBuffer;
use crate::streaming::mesh::{chunk_ranges, MeshFactory, PointChunk};

pub struct CacheEntry<H> {
	pub id: OctantId,
	pub points: Arc<DecodedPointBuffer>,
	pub meshes: Vec<H>,
	last_used: u64,
}

impl<H> CacheEntry<H> {
	pub fn num_points(&self) -> u64 {
		self.points.len() as u64
	}
}

/// Evicted entries waiting for their meshes to be released. Holds at most
/// `max_pending` entries; pushing past that releases the oldest at once.
pub struct DisposalQueue<H> {
	entries: VecDeque<CacheEntry<H>>,
	queued: HashSet<OctantId>,
	max_pending: usize,
}

impl<H> DisposalQueue<H> {
	pub fn new(max_pending: usize) -> DisposalQueue<H> {
		DisposalQueue {
			entries: VecDeque::new(),
			queued: HashSet::new(),
			max_pending,
		}
	}

	pub fn set_max_pending(&mut self, max_pending: usize) {
		self.max_pending = max_pending;
	}

	pub fn push<F: MeshFactory<Handle = H>>(&mut self, entry: CacheEntry<H>, factory: &mut F) {
		self.queued.insert(entry.id);
		self.entries.push_back(entry);
		let overflow = self.entries.len().saturating_sub(self.max_pending);
		if overflow > 0 {
			trace!("disposal queue over {} entries, releasing {} early", self.max_pending, overflow);
			self.drain(factory, overflow);
		}
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn contains(&self, id: OctantId) -> bool {
		self.queued.contains(&id)
	}

	/// Takes an entry back out before its meshes are released.
	pub fn reclaim(&mut self, id: OctantId) -> Option<CacheEntry<H>> {
		if !self.queued.remove(&id) {
			return None;
		}
		let position = self.entries.iter().position(|entry| entry.id == id)?;
		self.entries.remove(position)
	}

	/// Releases the meshes of at most `max` entries, oldest first.
	pub fn drain<F: MeshFactory<Handle = H>>(&mut self, factory: &mut F, max: usize) -> usize {
		let mut drained = 0;
		while drained < max {
			let entry = match self.entries.pop_front() {
				Some(entry) => entry,
				None => break,
			};
			self.queued.remove(&entry.id);
			trace!("disposing {} meshes of {}", entry.meshes.len(), entry.id);
			for mesh in entry.meshes {
				factory.dispose(mesh);
			}
			drained += 1;
		}
		drained
	}
}

/// Meshes per octant, bounded by the number of points they hold. Entries
/// of pinned octants are never evicted; evicted entries go through the
/// disposal queue instead of being released on the spot.
pub struct MeshCache<F: MeshFactory> {
	factory: F,
	entries: HashMap<OctantId, CacheEntry<F::Handle>>,
	lru: BTreeMap<u64, OctantId>,
	pinned: HashSet<OctantId>,
	disposal: DisposalQueue<F::Handle>,
	capacity_points: u64,
	cached_points: u64,
	max_vertices: usize,
	clock: u64,
}

impl<F: MeshFactory> MeshCache<F> {
	pub fn new(
		factory: F,
		capacity_points: u64,
		index_width: IndexWidth,
		max_pending_disposals: usize,
	) -> MeshCache<F> {
		MeshCache {
			factory,
			entries: HashMap::new(),
			lru: BTreeMap::new(),
			pinned: HashSet::new(),
			disposal: DisposalQueue::new(max_pending_disposals),
			capacity_points,
			cached_points: 0,
			max_vertices: index_width.max_vertices(),
			clock: 0,
		}
	}

	/// Applies to later insertions and evictions; built meshes keep their
	/// chunking.
	pub fn configure(&mut self, capacity_points: u64, index_width: IndexWidth, max_pending_disposals: usize) {
		self.capacity_points = capacity_points;
		self.max_vertices = index_width.max_vertices();
		self.disposal.set_max_pending(max_pending_disposals);
	}

	pub fn factory(&self) -> &F {
		&self.factory
	}

	pub fn contains(&self, id: OctantId) -> bool {
		self.entries.contains_key(&id)
	}

	pub fn get(&self, id: OctantId) -> Option<&CacheEntry<F::Handle>> {
		self.entries.get(&id)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn cached_points(&self) -> u64 {
		self.cached_points
	}

	pub fn disposal_queue(&self) -> &DisposalQueue<F::Handle> {
		&self.disposal
	}

	/// Meshes of `id`, built from `points` on first request. An entry still
	/// waiting in the disposal queue is taken back instead of rebuilt.
	pub fn get_or_build(
		&mut self,
		id: OctantId,
		points: Arc<DecodedPointBuffer>,
		origin: Vector3,
	) -> &[F::Handle] {
		if !self.entries.contains_key(&id) && !self.reclaim(id) {
			let meshes = chunk_ranges(points.len(), self.max_vertices)
				.into_iter()
				.map(|range| self.factory.build(&PointChunk::new(&points, range, origin)))
				.collect();
			self.insert(CacheEntry {
				id,
				points,
				meshes,
				last_used: 0,
			});
		}
		self.touch(id);
		&self.entries[&id].meshes
	}

	/// Marks `id` as most recently used.
	pub fn touch(&mut self, id: OctantId) {
		if let Some(entry) = self.entries.get_mut(&id) {
			self.lru.remove(&entry.last_used);
			self.clock += 1;
			entry.last_used = self.clock;
			self.lru.insert(self.clock, id);
		}
	}

	/// Replaces the pinned set. Pinned entries found in the disposal queue
	/// are moved back into the cache.
	pub fn pin<I: IntoIterator<Item = OctantId>>(&mut self, ids: I) -> usize {
		self.pinned = ids.into_iter().collect();
		let waiting: Vec<OctantId> = self
			.pinned
			.iter()
			.copied()
			.filter(|id| !self.entries.contains_key(id) && self.disposal.contains(*id))
			.collect();
		waiting.into_iter().filter(|id| self.reclaim(*id)).count()
	}

	/// Evicts least recently used unpinned entries until the cached points
	/// fit the capacity again, or only pinned entries remain.
	pub fn evict_over_capacity(&mut self) -> Vec<OctantId> {
		let mut evicted = Vec::new();
		while self.cached_points > self.capacity_points {
			let victim = self
				.lru
				.iter()
				.find(|(_, id)| !self.pinned.contains(*id))
				.map(|(stamp, id)| (*stamp, *id));
			let (stamp, id) = match victim {
				Some(victim) => victim,
				None => break,
			};
			self.lru.remove(&stamp);
			if let Some(entry) = self.entries.remove(&id) {
				self.cached_points -= entry.num_points();
				trace!("evicting {} ({} points)", id, entry.num_points());
				self.disposal.push(entry, &mut self.factory);
				evicted.push(id);
			}
		}
		evicted
	}

	/// Releases at most `max` queued entries.
	pub fn drain_disposals(&mut self, max: usize) -> usize {
		self.disposal.drain(&mut self.factory, max)
	}

	/// Queues every entry and releases all meshes.
	pub fn dispose_all(&mut self) {
		self.pinned.clear();
		self.lru.clear();
		let pending = self.disposal.len();
		self.disposal.drain(&mut self.factory, pending);
		for (_, mut entry) in self.entries.drain() {
			for mesh in entry.meshes.drain(..) {
				self.factory.dispose(mesh);
			}
		}
		self.cached_points = 0;
	}

	fn insert(&mut self, entry: CacheEntry<F::Handle>) {
		self.cached_points += entry.num_points();
		self.entries.insert(entry.id, entry);
	}

	fn reclaim(&mut self, id: OctantId) -> bool {
		match self.disposal.reclaim(id) {
			Some(entry) => {
				trace!("reclaimed {} from the disposal queue", id);
				self.insert(entry);
				self.touch(id);
				true
			}
			None => false,
		}
	}
}
