use cashup_types::{Festival, Result, RewardError};

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two coordinates, in meters.
pub fn haversine_distance_m(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Geofence gate. A festival without a geofence accepts any location;
/// with one, missing coordinates fail rather than pass.
pub fn check_geofence(festival: &Festival, lat: Option<f64>, lng: Option<f64>) -> Result<()> {
    let Some(fence) = &festival.geofence else {
        return Ok(());
    };

    let (lat, lng) = match (lat, lng) {
        (Some(lat), Some(lng)) => (lat, lng),
        _ => {
            return Err(RewardError::OutsideGeofence(format!(
                "festival {} requires a location",
                festival.id
            )))
        }
    };

    let distance = haversine_distance_m(lat, lng, fence.center_lat, fence.center_lng);
    if distance > fence.radius() {
        return Err(RewardError::OutsideGeofence(format!(
            "{}m from festival {} center, limit {}m",
            distance.round(),
            festival.id,
            fence.radius()
        )));
    }
    Ok(())
}
