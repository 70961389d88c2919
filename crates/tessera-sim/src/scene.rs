//! Builds a body and a camera flight path from the loaded configuration.

use glam::{DVec3, Vec3};
use tessera_config::{BodyKind, Config, MaterialConfig};
use tessera_coords::SectorPos;
use tessera_lod::{Body, LodError, LodPolicy, PlanetDesc, TerrainDesc, TraversalSettings};
use tessera_terrain::{Material, NoiseSurface, NoiseSurfaceParams};

pub fn lod_policy(config: &Config) -> LodPolicy {
    LodPolicy {
        viewport_width: config.lod.viewport_width,
        pixels_per_triangle_edge: config.lod.pixels_per_triangle_edge,
        max_subdivisions: config.lod.max_subdivisions,
    }
}

pub fn traversal_settings(config: &Config) -> TraversalSettings {
    TraversalSettings {
        split_budget: config.lod.split_budget,
        prune_after_frames: config.lod.prune_after_frames,
        debug_depth_colors: config.debug.depth_colors,
    }
}

fn materials(configs: &[MaterialConfig]) -> Vec<Material> {
    configs
        .iter()
        .map(|m| Material::new(m.name.clone(), Vec3::from_array(m.color)))
        .collect()
}

/// The body named by `config.sim.body`, centered on the world origin.
pub fn build_body(config: &Config) -> Result<Body, LodError> {
    let policy = lod_policy(config);
    let settings = traversal_settings(config);
    let planet = &config.planet;

    match config.sim.body {
        BodyKind::Planet => {
            let params = NoiseSurfaceParams {
                seed: planet.seed,
                amplitude: planet.amplitude,
                frequency: planet.noise_scale,
                octaves: planet.octaves,
                materials: materials(&planet.materials),
                ..NoiseSurfaceParams::default()
            };
            Body::planet(
                &PlanetDesc {
                    center: SectorPos::default(),
                    radius: planet.radius,
                    rows: config.lod.tile_rows,
                },
                Box::new(NoiseSurface::new(params)),
                policy,
                settings,
            )
        }
        BodyKind::Terrain => {
            let terrain = &config.terrain;
            let params = NoiseSurfaceParams {
                seed: planet.seed,
                amplitude: terrain.amplitude,
                frequency: terrain.noise_scale,
                octaves: planet.octaves,
                materials: materials(&planet.materials),
                ..NoiseSurfaceParams::default()
            };
            Body::terrain(
                &TerrainDesc {
                    origin: SectorPos::default(),
                    cells_x: terrain.cells_x,
                    cells_z: terrain.cells_z,
                    cell_size: terrain.cell_size,
                    rows: config.lod.tile_rows,
                },
                Box::new(NoiseSurface::new(params)),
                policy,
                settings,
            )
        }
    }
}

/// A camera descending vertically toward a fixed point of the body.
#[derive(Clone, Copy, Debug)]
pub struct Flight {
    /// Point on the nominal surface below the camera.
    ground: SectorPos,
    /// Unit direction away from the surface.
    up: DVec3,
    start_altitude: f64,
    descent_per_frame: f64,
    min_altitude: f64,
}

impl Flight {
    /// Above the north pole of a planet, or above the middle of a terrain grid.
    pub fn new(config: &Config) -> Self {
        let ground = match config.sim.body {
            BodyKind::Planet => SectorPos::from_origin(DVec3::Y * config.planet.radius),
            BodyKind::Terrain => {
                let terrain = &config.terrain;
                SectorPos::from_origin(DVec3::new(
                    terrain.cells_x as f64 * terrain.cell_size / 2.0,
                    0.0,
                    terrain.cells_z as f64 * terrain.cell_size / 2.0,
                ))
            }
        };
        Self {
            ground,
            up: DVec3::Y,
            start_altitude: config.sim.start_altitude,
            descent_per_frame: config.sim.descent_per_frame,
            min_altitude: config.sim.min_altitude,
        }
    }

    /// Nominal altitude at `frame`; never below the configured floor.
    pub fn altitude(&self, frame: u32) -> f64 {
        (self.start_altitude - frame as f64 * self.descent_per_frame).max(self.min_altitude)
    }

    pub fn camera(&self, frame: u32) -> SectorPos {
        self.ground + self.up * self.altitude(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config(body: BodyKind) -> Config {
        let mut config = Config::default();
        config.sim.body = body;
        config.lod.tile_rows = 4;
        config.terrain.cells_x = 2;
        config.terrain.cells_z = 3;
        config
    }

    #[test]
    fn test_planet_body_has_twenty_roots() {
        let body = build_body(&small_config(BodyKind::Planet)).unwrap();
        assert_eq!(body.roots().len(), tessera_lod::PLANET_ROOTS);
        assert_eq!(body.surface().rows(), 4);
    }

    #[test]
    fn test_terrain_body_has_two_roots_per_cell() {
        let body = build_body(&small_config(BodyKind::Terrain)).unwrap();
        assert_eq!(body.roots().len(), 2 * 2 * 3);
    }

    #[test]
    fn test_config_maps_onto_policy_and_settings() {
        let mut config = Config::default();
        config.lod.split_budget = 7;
        config.lod.max_subdivisions = 3;
        config.debug.depth_colors = true;
        let policy = lod_policy(&config);
        let settings = traversal_settings(&config);
        assert_eq!(policy.max_subdivisions, 3);
        assert_eq!(policy.viewport_width, 1920.0);
        assert_eq!(settings.split_budget, 7);
        assert!(settings.debug_depth_colors);
    }

    #[test]
    fn test_invalid_radius_is_rejected() {
        let mut config = small_config(BodyKind::Planet);
        config.planet.radius = 0.0;
        assert!(matches!(build_body(&config), Err(LodError::InvalidBody(_))));
    }

    #[test]
    fn test_flight_descends_to_floor() {
        let mut config = Config::default();
        config.sim.start_altitude = 1000.0;
        config.sim.descent_per_frame = 300.0;
        config.sim.min_altitude = 50.0;
        let flight = Flight::new(&config);
        assert_eq!(flight.altitude(0), 1000.0);
        assert_eq!(flight.altitude(3), 100.0);
        assert_eq!(flight.altitude(4), 50.0);
        assert_eq!(flight.altitude(1000), 50.0);

        let camera = flight.camera(0).delta(&SectorPos::default());
        assert!((camera - DVec3::Y * (config.planet.radius + 1000.0)).length() < 1e-6);
    }

    #[test]
    fn test_terrain_flight_starts_over_grid_center() {
        let config = small_config(BodyKind::Terrain);
        let camera = Flight::new(&config).camera(0).delta(&SectorPos::default());
        assert_eq!(camera.x, config.terrain.cell_size);
        assert_eq!(camera.z, 1.5 * config.terrain.cell_size);
        assert_eq!(camera.y, config.sim.start_altitude);
    }
}
