//! Collision demo
//!
//! Drives the mesh BVH the way a game loop would: a ship hull flies through
//! a field of rock meshes, the camera picks whatever is under the cursor,
//! and a probe reports how close the hull came to the nearest rock.
//!
//! Usage: `collision_demo [build_options.toml|.ron]`

use log::{info, warn};
use mesh_bvh::foundation::math::Quat;
use mesh_bvh::mesh::shapes::{box_geometry, icosphere};
use mesh_bvh::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

/// Demo failures
#[derive(Error, Debug)]
enum DemoError {
    #[error("BVH error: {0}")]
    Bvh(#[from] BvhError),

    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transform of {0} is not invertible")]
    SingularTransform(String),
}

/// A placed mesh with its hierarchy
struct Body {
    name: String,
    bvh: MeshBvh,
    transform: Transform,
}

impl Body {
    /// Matrix taking `other`'s local space into this body's local space
    fn relative(&self, other: &Self) -> Result<Mat4, DemoError> {
        other
            .transform
            .relative_to(&self.transform)
            .ok_or_else(|| DemoError::SingularTransform(self.name.clone()))
    }
}

fn load_options() -> Result<BuildOptions, DemoError> {
    match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading build options from {path}");
            Ok(BuildOptions::load_from_file(path)?)
        }
        None => Ok(BuildOptions::with_strategy(SplitStrategy::Sah)),
    }
}

fn spawn_rocks(options: &BuildOptions, rng: &mut StdRng) -> Result<Vec<Body>, DemoError> {
    (0..12)
        .map(|i| {
            let size = rng.gen_range(0.5..2.0);
            let geometry = if i % 2 == 0 {
                icosphere(size, 2)?
            } else {
                box_geometry(size, size * 0.7, size * 1.3)?
            };
            let position = Vec3::new(rng.gen_range(-3.0..3.0), rng.gen_range(-3.0..3.0), -(i as f32) * 4.0);
            let rotation = Quat::from_axis_angle(&Vec3::y_axis(), rng.gen_range(0.0..std::f32::consts::TAU));
            Ok(Body {
                name: format!("rock {i}"),
                bvh: MeshBvh::build(geometry, options)?,
                transform: Transform::from_position_rotation(position, rotation),
            })
        })
        .collect()
}

/// Nearest rock under a world-space ray, as (rock name, world distance)
fn pick(rocks: &[Body], origin: Vec3, direction: Vec3) -> Result<Option<(String, f32)>, DemoError> {
    let mut best: Option<(String, f32)> = None;
    for rock in rocks {
        let to_local = rock
            .transform
            .to_matrix()
            .try_inverse()
            .ok_or_else(|| DemoError::SingularTransform(rock.name.clone()))?;
        let ray = Ray::new(origin, direction).transformed(&to_local);
        if let Some(hit) = rock.bvh.raycast_first(&ray, 0.0, f32::INFINITY) {
            // Rigid transforms keep distances, so local and world agree
            if best.as_ref().map_or(true, |(_, distance)| hit.distance < *distance) {
                best = Some((rock.name.clone(), hit.distance));
            }
        }
    }
    Ok(best)
}

fn main() -> Result<(), DemoError> {
    if std::env::var_os("RUST_LOG").is_some() {
        mesh_bvh::foundation::logging::init();
    } else {
        env_logger::Builder::new().filter_level(log::LevelFilter::Info).init();
    }

    let options = load_options()?;
    let mut rng = StdRng::seed_from_u64(7);
    let rocks = spawn_rocks(&options, &mut rng)?;
    let mut hull = Body {
        name: "hull".to_string(),
        bvh: MeshBvh::build(icosphere(0.8, 2)?, &options)?,
        transform: Transform::from_position(Vec3::new(0.0, 0.0, 6.0)),
    };

    let stats = hull.bvh.stats();
    info!(
        "{}: {} triangles in {} nodes, depth {}",
        hull.name, stats.triangles, stats.nodes, stats.max_depth
    );

    let camera = Vec3::new(0.0, 1.0, 12.0);
    let mut collisions = 0;
    for frame in 0..60 {
        hull.transform.position.z -= 0.8;
        hull.transform.position.x = (frame as f32 * 0.2).sin() * 2.0;

        for rock in &rocks {
            let to_rock = rock.relative(&hull)?;
            if rock.bvh.intersects_bvh(&hull.bvh, &to_rock) {
                collisions += 1;
                warn!("Frame {frame}: {} hit {}", hull.name, rock.name);
            }
        }

        if frame % 15 == 0 {
            let target = hull.transform.position;
            match pick(&rocks, camera, target - camera)? {
                Some((name, distance)) => info!("Frame {frame}: camera sees {name} at {distance:.2}"),
                None => info!("Frame {frame}: camera ray is clear"),
            }
        }
    }

    // Distance probe between the hull's final position and every rock
    let probe = ClosestPointOptions {
        max_distance: 10.0,
        ..Default::default()
    };
    let nearest = rocks
        .iter()
        .filter_map(|rock| {
            let to_rock = rock.relative(&hull).ok()?;
            rock.bvh
                .closest_point_to_geometry(hull.bvh.geometry(), &to_rock, &probe)
                .map(|hit| (rock.name.as_str(), hit.distance))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1));

    match nearest {
        Some((name, distance)) => info!("Closest rock at the end: {name}, {distance:.3} away"),
        None => info!("No rock within {}", probe.max_distance),
    }
    info!("{collisions} hull/rock contacts over 60 frames");
    Ok(())
}
