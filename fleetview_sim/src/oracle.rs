//! Ground truth oracle for simulation.
//!
//! The Oracle maintains the "God's eye view" of the simulated fleet:
//! - True positions of all vehicles (local east/north metres around an origin)
//! - Kinematics (constant speed, slowly wandering heading)
//! - Feed message generation (with GPS noise and injected defects)

use fleetview_env::{
    DriverId, DriverRecord, EntityId, EntityRecord, FeedMessage, GeoPoint, RawLocation, TripId,
    TripRecord,
};
use nalgebra::{Rotation2, Vector2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use uuid::Uuid;

/// Metres per degree of latitude.
const METRES_PER_DEGREE: f64 = 111_320.0;

/// Points per generated historical trip.
const TRIP_POINTS: usize = 12;

/// Seconds between generated trip points.
const TRIP_STEP_SECS: f64 = 30.0;

/// Derives a stable vehicle id from the physics seed and the vehicle index.
pub fn vehicle_id(seed: u64, index: u64) -> EntityId {
    let mixed = seed ^ index.wrapping_mul(0x9e3779b97f4a7c15);
    let mut bytes = [0u8; 16];
    bytes[0..8].copy_from_slice(&mixed.to_le_bytes());
    bytes[8..16].copy_from_slice(&mixed.wrapping_mul(0x517cc1b727220a95).to_le_bytes());
    EntityId::new(Uuid::from_bytes(bytes).to_string())
}

/// A ground truth vehicle.
#[derive(Debug, Clone)]
pub struct SimVehicle {
    pub id: EntityId,
    pub name: String,
    pub driver: DriverId,
    pub driver_name: String,
    pub trip: TripId,

    /// Position [east, north] in metres from the origin
    pub position: Vector2<f64>,

    /// Velocity [east, north] in m/s
    pub velocity: Vector2<f64>,
}

impl SimVehicle {
    pub fn record(&self) -> EntityRecord {
        let mut record = EntityRecord::new(self.id.clone(), self.name.clone());
        record.driver_name = Some(self.driver_name.clone());
        record
    }

    pub fn driver_record(&self) -> DriverRecord {
        DriverRecord {
            id: self.driver.clone(),
            name: self.driver_name.clone(),
            vehicle: Some(self.id.clone()),
        }
    }

    /// Heading in degrees clockwise from north, in [0, 360).
    pub fn heading_degrees(&self) -> f64 {
        self.velocity.x.atan2(self.velocity.y).to_degrees().rem_euclid(360.0)
    }
}

/// The Oracle - maintains ground truth and generates feed traffic.
pub struct Oracle {
    /// Seed the vehicle ids derive from
    physics_seed: u64,

    /// RNG for physics (noise, random events)
    physics_rng: ChaCha8Rng,

    vehicles: Vec<SimVehicle>,
    trips: Vec<TripRecord>,

    /// Map position of (0, 0)
    origin: GeoPoint,

    /// Current simulation time (seconds)
    current_time: f64,

    /// GPS noise standard deviation (metres)
    position_noise_std: f64,

    /// Heading drift standard deviation (radians per sqrt-second)
    heading_noise_std: f64,

    malformed_generated: u64,
    missing_timestamps_generated: u64,
}

impl Oracle {
    /// Creates a new Oracle with the given physics seed.
    pub fn new(physics_seed: u64) -> Self {
        Self {
            physics_seed,
            physics_rng: ChaCha8Rng::seed_from_u64(physics_seed),
            vehicles: Vec::new(),
            trips: Vec::new(),
            origin: GeoPoint::new(52.52, 13.405),
            current_time: 0.0,
            position_noise_std: 3.0,
            heading_noise_std: 0.05,
            malformed_generated: 0,
            missing_timestamps_generated: 0,
        }
    }

    pub fn set_position_noise(&mut self, std_dev: f64) {
        self.position_noise_std = std_dev;
    }

    pub fn set_heading_noise(&mut self, std_dev: f64) {
        self.heading_noise_std = std_dev;
    }

    /// Spawns `count` vehicles around the origin, each with one historical trip.
    pub fn spawn_fleet(&mut self, count: usize) {
        for _ in 0..count {
            let index = self.vehicles.len() as u64;
            let position = Vector2::new(
                self.physics_rng.gen_range(-2_000.0..2_000.0),
                self.physics_rng.gen_range(-2_000.0..2_000.0),
            );
            let speed = self.physics_rng.gen_range(5.0..20.0);
            let angle = self.physics_rng.gen_range(0.0..std::f64::consts::TAU);
            let velocity = Rotation2::new(angle) * Vector2::new(0.0, speed);

            let vehicle = SimVehicle {
                id: vehicle_id(self.physics_seed, index),
                name: format!("Van {}", index + 1),
                driver: DriverId::new(format!("driver-{}", index)),
                driver_name: format!("Driver {}", index + 1),
                trip: TripId::new(format!("trip-{}", index)),
                position,
                velocity,
            };

            // The trip ends where the vehicle starts.
            let events = (0..TRIP_POINTS)
                .rev()
                .map(|k| self.to_geo(&(position - velocity * (k as f64) * TRIP_STEP_SECS)))
                .collect();
            self.trips.push(TripRecord {
                id: vehicle.trip.clone(),
                driver: vehicle.driver.clone(),
                events,
            });
            self.vehicles.push(vehicle);
        }
    }

    /// Advances physics by dt seconds.
    pub fn step(&mut self, dt: f64) {
        self.current_time += dt;

        let drift = Normal::new(0.0, self.heading_noise_std * dt.sqrt()).ok();
        for vehicle in &mut self.vehicles {
            if let Some(drift) = drift {
                let turn = drift.sample(&mut self.physics_rng);
                vehicle.velocity = Rotation2::new(turn) * vehicle.velocity;
            }
            vehicle.position += vehicle.velocity * dt;
        }
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> f64 {
        self.current_time
    }

    pub fn vehicles(&self) -> &[SimVehicle] {
        &self.vehicles
    }

    pub fn trips(&self) -> &[TripRecord] {
        &self.trips
    }

    pub fn vehicle(&self, id: &EntityId) -> Option<&SimVehicle> {
        self.vehicles.iter().find(|v| &v.id == id)
    }

    /// Converts local metres to a map coordinate.
    pub fn to_geo(&self, position: &Vector2<f64>) -> GeoPoint {
        let latitude = self.origin.latitude + position.y / METRES_PER_DEGREE;
        let longitude = self.origin.longitude
            + position.x / (METRES_PER_DEGREE * self.origin.latitude.to_radians().cos());
        GeoPoint::new(latitude, longitude)
    }

    /// Generates one feed message per vehicle.
    ///
    /// With probability `malformed_rate` a message loses its longitude; with
    /// probability `missing_timestamp_rate` it carries no timestamp.
    pub fn generate_messages(
        &mut self,
        malformed_rate: f64,
        missing_timestamp_rate: f64,
        now_millis: i64,
    ) -> Vec<FeedMessage> {
        let noise = Normal::new(0.0, self.position_noise_std).ok();
        let mut messages = Vec::with_capacity(self.vehicles.len());

        for i in 0..self.vehicles.len() {
            let offset = match noise {
                Some(n) => Vector2::new(
                    n.sample(&mut self.physics_rng),
                    n.sample(&mut self.physics_rng),
                ),
                None => Vector2::zeros(),
            };
            let vehicle = &self.vehicles[i];
            let point = self.to_geo(&(vehicle.position + offset));
            let mut raw = RawLocation::new(
                point.latitude,
                point.longitude,
                vehicle.velocity.norm(),
                vehicle.heading_degrees(),
            );
            let id = vehicle.id.clone();

            if self.physics_rng.gen::<f64>() < malformed_rate {
                raw.longitude = None;
                self.malformed_generated += 1;
            }
            if self.physics_rng.gen::<f64>() < missing_timestamp_rate {
                self.missing_timestamps_generated += 1;
            } else {
                raw = raw.with_timestamp(now_millis);
            }

            messages.push(FeedMessage::new(id, raw));
        }
        messages
    }

    /// True positions of every vehicle.
    pub fn ground_truth_positions(&self) -> Vec<(EntityId, GeoPoint)> {
        self.vehicles
            .iter()
            .map(|v| (v.id.clone(), self.to_geo(&v.position)))
            .collect()
    }

    /// Messages generated without a longitude so far.
    pub fn malformed_generated(&self) -> u64 {
        self.malformed_generated
    }

    /// Messages generated without a timestamp so far.
    pub fn missing_timestamps_generated(&self) -> u64 {
        self.missing_timestamps_generated
    }
}
