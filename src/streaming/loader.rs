use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::{debug, trace, warn};
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::{DecodeError, Result};
use crate::model::node::NodeIndex;
use crate::model::octant_id::OctantId;
use crate::model::options::StreamingConfig;
use crate::model::vector3::Vector3;
use crate::reader::points::DecodedPointBuffer;
use crate::reader::PointCloud;
use crate::streaming::cache::MeshCache;
use crate::streaming::camera::CameraState;
use crate::streaming::lod::{select_visible, VisibleSet};
use crate::streaming::mesh::MeshFactory;
use crate::streaming::picking::{pick, PickResult};

/// Posted by a decode worker when it is done with one octant.
pub struct DecodeMessage {
	pub id: OctantId,
	pub index: NodeIndex,
	pub result: std::result::Result<DecodedPointBuffer, DecodeError>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OctantState {
	Unloaded,
	Loading,
	/// Cached and part of the current visible set.
	Visible,
	/// Cached, not visible, may be evicted.
	Cached,
	/// Evicted, meshes not released yet.
	PendingDisposal,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoaderStats {
	pub ticks: u64,
	pub visible_nodes: usize,
	pub visible_points: u64,
	pub in_flight: usize,
	pub cached_entries: usize,
	pub cached_points: u64,
	pub pending_disposals: usize,
	pub failed_decodes: u64,
}

/// Streams the octants of one point cloud into meshes as the camera moves.
///
/// Everything except decoding happens on the thread calling [`update`],
/// which must be the thread owning the factory's resources.
///
/// [`update`]: OctreeLoader::update
pub struct OctreeLoader<F: MeshFactory> {
	cloud: PointCloud,
	pool: ThreadPool,
	sender: Sender<DecodeMessage>,
	receiver: Receiver<DecodeMessage>,
	in_flight: HashSet<OctantId>,
	cache: MeshCache<F>,
	visible: VisibleSet,
	render_list: Vec<F::Handle>,
	last_tick: Option<Instant>,
	stats: LoaderStats,
}

impl<F: MeshFactory> OctreeLoader<F> {
	/// The decode worker count is taken from `config` once; later configs
	/// only change the per tick tunables.
	pub fn new(cloud: PointCloud, factory: F, config: &StreamingConfig) -> Result<OctreeLoader<F>> {
		let pool = ThreadPoolBuilder::new()
			.num_threads(config.decode_workers.max(1))
			.thread_name(|index| format!("potree-decode-{}", index))
			.build()?;
		let (sender, receiver) = crossbeam_channel::unbounded();
		Ok(OctreeLoader {
			cloud,
			pool,
			sender,
			receiver,
			in_flight: HashSet::new(),
			cache: MeshCache::new(
				factory,
				config.cache_point_capacity,
				config.index_width,
				config.max_pending_disposals,
			),
			visible: VisibleSet::default(),
			render_list: Vec::new(),
			last_tick: None,
			stats: LoaderStats::default(),
		})
	}

	pub fn cloud(&self) -> &PointCloud {
		&self.cloud
	}

	pub fn factory(&self) -> &F {
		self.cache.factory()
	}

	pub fn visible(&self) -> &VisibleSet {
		&self.visible
	}

	pub fn stats(&self) -> LoaderStats {
		self.stats
	}

	/// Meshes to draw, as of the last tick.
	pub fn render_list(&self) -> &[F::Handle] {
		&self.render_list
	}

	pub fn state(&self, id: OctantId) -> OctantState {
		if self.cache.contains(id) {
			if self.visible.contains(id) {
				OctantState::Visible
			} else {
				OctantState::Cached
			}
		} else if self.in_flight.contains(&id) {
			OctantState::Loading
		} else if self.cache.disposal_queue().contains(id) {
			OctantState::PendingDisposal
		} else {
			OctantState::Unloaded
		}
	}

	pub fn update(&mut self, camera: &CameraState, config: &StreamingConfig) -> &[F::Handle] {
		self.update_at(camera, config, Instant::now())
	}

	/// Runs one tick unless the previous one is less than the update
	/// interval ago, then returns the meshes to draw.
	pub fn update_at(&mut self, camera: &CameraState, config: &StreamingConfig, now: Instant) -> &[F::Handle] {
		if let Some(last) = self.last_tick {
			if now.saturating_duration_since(last) < config.update_interval() {
				return &self.render_list;
			}
		}
		self.last_tick = Some(now);
		self.tick(camera, config);
		&self.render_list
	}

	/// Blocks until no decode is in flight or `timeout` passes. Finished
	/// decodes are turned into meshes right away. Returns whether the
	/// loader is idle.
	pub fn wait_idle(&mut self, timeout: Duration) -> bool {
		let deadline = Instant::now() + timeout;
		while !self.in_flight.is_empty() {
			let remaining = deadline.saturating_duration_since(Instant::now());
			match self.receiver.recv_timeout(remaining) {
				Ok(message) => self.handle_message(message),
				Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
			}
		}
		self.stats.in_flight = self.in_flight.len();
		self.in_flight.is_empty()
	}

	/// Nearest point to `origin` within `max_distance_to_ray` of the ray,
	/// among the visible octants that are cached.
	pub fn pick(&self, origin: &Vector3, direction: &Vector3, max_distance_to_ray: f64) -> Option<PickResult> {
		let octree = self.cloud.octree();
		let octants = self.visible.octants.iter().filter_map(|octant| {
			self.cache
				.get(octant.id)
				.map(|entry| (octant.id, &octree[octant.index].bounds, entry.points.as_ref()))
		});
		pick(octants, origin, direction, max_distance_to_ray)
	}

	/// Releases every mesh. The next tick starts over from an empty cache.
	pub fn release_all(&mut self) {
		self.cache.dispose_all();
		self.render_list.clear();
		self.visible = VisibleSet::default();
		self.last_tick = None;
	}

	fn tick(&mut self, camera: &CameraState, config: &StreamingConfig) {
		self.cache.configure(
			config.cache_point_capacity,
			config.index_width,
			config.max_pending_disposals,
		);

		let ready: Vec<DecodeMessage> = self.receiver.try_iter().collect();
		for message in ready {
			self.handle_message(message);
		}

		self.visible = select_visible(self.cloud.octree(), camera, config);

		let reclaimed = self.cache.pin(self.visible.ids());
		if reclaimed > 0 {
			trace!("reclaimed {} octants from the disposal queue", reclaimed);
		}
		for octant in &self.visible.octants {
			self.cache.touch(octant.id);
		}

		self.submit_missing(config.max_in_flight);

		self.cache.evict_over_capacity();
		self.cache.drain_disposals(config.disposals_per_tick);

		self.render_list.clear();
		for octant in &self.visible.octants {
			if let Some(entry) = self.cache.get(octant.id) {
				self.render_list.extend(entry.meshes.iter().cloned());
			}
		}

		self.stats = LoaderStats {
			ticks: self.stats.ticks + 1,
			visible_nodes: self.visible.len(),
			visible_points: self.visible.total_points,
			in_flight: self.in_flight.len(),
			cached_entries: self.cache.len(),
			cached_points: self.cache.cached_points(),
			pending_disposals: self.cache.disposal_queue().len(),
			failed_decodes: self.stats.failed_decodes,
		};
		debug!("{:?}", self.stats);
	}

	fn submit_missing(&mut self, max_in_flight: usize) {
		for octant in &self.visible.octants {
			if self.in_flight.len() >= max_in_flight {
				break;
			}
			if self.cache.contains(octant.id) || self.in_flight.contains(&octant.id) {
				continue;
			}
			trace!("decoding {} ({} points)", octant.id, octant.num_points);
			self.in_flight.insert(octant.id);

			let cloud = self.cloud.clone();
			let sender = self.sender.clone();
			let (id, index) = (octant.id, octant.index);
			self.pool.spawn(move || {
				let result = cloud.decode(index);
				// The loader is gone if this fails.
				let _ = sender.send(DecodeMessage { id, index, result });
			});
		}
	}

	/// Decodes that finish after their octant left the visible set are
	/// cached anyway and become eviction candidates.
	fn handle_message(&mut self, message: DecodeMessage) {
		self.in_flight.remove(&message.id);
		match message.result {
			Ok(points) => {
				let origin = self.cloud.octree()[message.index].bounds.center();
				self.cache.get_or_build(message.id, Arc::new(points), origin);
			}
			Err(error) => {
				self.stats.failed_decodes += 1;
				warn!("could not decode {}: {}", message.id, error);
			}
		}
	}
}
