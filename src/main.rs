use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use log::info;

use rusty_potree_loader::model::vector3::Vector3;
use rusty_potree_loader::{CameraState, OpenOptions, OctreeLoader, PointCloud, StreamingConfig, VertexMeshFactory};

/// Streams a Potree 2.0 dataset along an orbiting camera and logs what
/// would be drawn.
#[derive(Parser, Debug)]
#[command(name = "rusty-potree-loader")]
struct Args {
	/// Folder holding metadata.json, hierarchy.bin and octree.bin.
	dataset: PathBuf,

	/// Streaming tunables as JSON.
	#[arg(short, long)]
	config: Option<PathBuf>,

	/// Number of camera positions to visit.
	#[arg(short, long, default_value_t = 36)]
	ticks: u32,

	/// Open datasets written for another major version.
	#[arg(long)]
	allow_version_mismatch: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
	env_logger::init();
	let args = Args::parse();

	let config = match &args.config {
		Some(path) => StreamingConfig::from_file(path)?,
		None => StreamingConfig::default(),
	};
	let options = OpenOptions {
		allow_version_mismatch: args.allow_version_mismatch,
		..OpenOptions::default()
	};
	let cloud = PointCloud::open(&args.dataset, &options)?;

	let bounds = cloud.bounds();
	let center = bounds.center();
	let distance = bounds.radius() * 2.5;
	let mut loader = OctreeLoader::new(cloud, VertexMeshFactory::new(), &config)?;

	for tick in 0..args.ticks {
		let angle = f64::from(tick) / f64::from(args.ticks.max(1)) * std::f64::consts::TAU;
		let position = center + Vector3::new(angle.cos() * distance, distance * 0.3, angle.sin() * distance);
		let camera = CameraState::perspective(
			position,
			center,
			Vector3::new(0.0, 1.0, 0.0),
			60f64.to_radians(),
			16.0 / 9.0,
			distance * 0.001,
			distance * 10.0,
			1080.0,
		);

		let meshes = loader.update(&camera, &config).len();
		loader.wait_idle(Duration::from_secs(5));
		let stats = loader.stats();
		info!(
			"tick {}: {} meshes, {} visible nodes, {} visible points, {} cached points",
			tick, meshes, stats.visible_nodes, stats.visible_points, stats.cached_points
		);
		std::thread::sleep(config.update_interval());
	}

	let stats = loader.stats();
	info!(
		"{} meshes built, {} live, {} failed decodes",
		loader.factory().built,
		loader.factory().live(),
		stats.failed_decodes
	);
	loader.release_all();
	Ok(())
}
