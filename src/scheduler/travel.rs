//! Travel time estimation between service sites.
//!
//! The oracle is a capability: the solver only sees the
//! [`TravelTimeEstimator`] trait, so an external routing provider can
//! substitute for the default great-circle estimate without touching the
//! constraint checker or the optimizer.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::GeoPoint;

/// Estimates travel minutes between two geographic points.
///
/// Contract: non-negative, symmetric, zero for equal points, and
/// deterministic for a given input within a process lifetime. The triangle
/// inequality is not required.
pub trait TravelTimeEstimator: Send + Sync {
    fn estimate(&self, from: GeoPoint, to: GeoPoint) -> u32;
}

/// Mean radius of the Earth in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance at an assumed average road speed, with a floor
/// between distinct sites to avoid zero-travel optimism.
#[derive(Debug, Clone)]
pub struct GreatCircleEstimator {
    pub road_speed_kmh: f64,
    pub floor_minutes: u32,
}

impl Default for GreatCircleEstimator {
    fn default() -> Self {
        Self {
            road_speed_kmh: 50.0,
            floor_minutes: 5,
        }
    }
}

impl GreatCircleEstimator {
    pub fn new(road_speed_kmh: f64, floor_minutes: u32) -> Self {
        Self {
            road_speed_kmh,
            floor_minutes,
        }
    }

    fn haversine_km(from: GeoPoint, to: GeoPoint) -> f64 {
        let lat1 = from.latitude.to_radians();
        let lat2 = to.latitude.to_radians();
        let dlat = (to.latitude - from.latitude).to_radians();
        let dlng = (to.longitude - from.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();
        EARTH_RADIUS_KM * c
    }
}

impl TravelTimeEstimator for GreatCircleEstimator {
    fn estimate(&self, from: GeoPoint, to: GeoPoint) -> u32 {
        if from == to {
            return 0;
        }
        let km = Self::haversine_km(from, to);
        let minutes = (km / self.road_speed_kmh * 60.0).ceil() as u32;
        minutes.max(self.floor_minutes)
    }
}

/// Cache key: coordinates quantized to ~1e-5 degrees, symmetric.
type CacheKey = (i64, i64, i64, i64);

fn cache_key(a: GeoPoint, b: GeoPoint) -> CacheKey {
    let qa = ((a.latitude * 1e5).round() as i64, (a.longitude * 1e5).round() as i64);
    let qb = ((b.latitude * 1e5).round() as i64, (b.longitude * 1e5).round() as i64);
    // Symmetric: order the endpoints so (a,b) and (b,a) share an entry.
    if qa <= qb {
        (qa.0, qa.1, qb.0, qb.1)
    } else {
        (qb.0, qb.1, qa.0, qa.1)
    }
}

/// Read-through, size-bounded, process-local cache around any estimator.
///
/// Safe for concurrent access; never stale beyond process lifetime. When
/// full, the cache stops admitting new entries rather than evicting —
/// day-scale inputs never come close to the bound.
pub struct CachedEstimator {
    inner: Arc<dyn TravelTimeEstimator>,
    cache: RwLock<HashMap<CacheKey, u32>>,
    max_entries: usize,
}

impl CachedEstimator {
    pub fn new(inner: Arc<dyn TravelTimeEstimator>) -> Self {
        Self::with_capacity(inner, 65_536)
    }

    pub fn with_capacity(inner: Arc<dyn TravelTimeEstimator>, max_entries: usize) -> Self {
        Self {
            inner,
            cache: RwLock::new(HashMap::new()),
            max_entries,
        }
    }

    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }
}

impl TravelTimeEstimator for CachedEstimator {
    fn estimate(&self, from: GeoPoint, to: GeoPoint) -> u32 {
        let key = cache_key(from, to);
        if let Some(&minutes) = self.cache.read().get(&key) {
            return minutes;
        }
        let minutes = self.inner.estimate(from, to);
        let mut cache = self.cache.write();
        if cache.len() < self.max_entries {
            cache.insert(key, minutes);
        }
        minutes
    }
}
