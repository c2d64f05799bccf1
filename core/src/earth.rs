//! Earth-related constants and functions
//!
//! This module contains the geophysical reference models used to turn raw phone measurements
//! into anomalies. The Earth is modeled as an ellipsoid (WGS84) with a semi-major axis and a
//! semi-minor axis. Normal gravity is modeled as a function of the latitude and altitude using
//! the Somigliana method. The main magnetic field is approximated by a tilted dipole whose
//! north pole is placed at the 2025 IGRF geomagnetic pole.
//!
//! All functions take geodetic latitude and longitude in degrees and altitude in meters.
use ::nalgebra::Vector3;

// Earth constants (WGS84)
/// Earth's equitorial radius in meters
pub const EQUATORIAL_RADIUS: f64 = 6378137.0; // meters
/// Earth's polar radius in meters
pub const POLAR_RADIUS: f64 = 6356752.31425; // meters
/// Earth's mean radius in meters
pub const MEAN_RADIUS: f64 = 6371000.0; // meters
/// Earth's eccentricity ($e$)
pub const ECCENTRICITY: f64 = 0.0818191908425; // unit-less
/// Earth's eccentricity squared ($e^2$)
pub const ECCENTRICITY_SQUARED: f64 = ECCENTRICITY * ECCENTRICITY;
/// Earth's gravitational acceleration at the equator ($g_e$) in $m/s^2$
pub const GE: f64 = 9.7803253359; // m/s^2, equatorial radius
/// Earth's gravitational acceleration at the poles ($g_p$) in $m/s^2$
pub const GP: f64 = 9.8321849378; // $m/s^2$, polar radius
/// Somigliana's constant ($K$)
pub const K: f64 = (POLAR_RADIUS * GP - EQUATORIAL_RADIUS * GE) / (EQUATORIAL_RADIUS * GE); // Somigliana's constant
/// Free-air gradient of normal gravity, $m/s^2$ per meter
pub const FREE_AIR_GRADIENT: f64 = 3.08e-6;
// Earth magnetic field constants (dipole model)
/// Earth's magnetic north pole latitude, degrees (2025, International Geomagnetic Reference Field)
pub const MAGNETIC_NORTH_LATITUDE: f64 = 80.8; // degrees, geomagnetic north pole latitude
/// Earth's magnetic north pole longitude, degrees (2025, International Geomagnetic Reference Field)
pub const MAGNETIC_NORTH_LONGITUDE: f64 = -72.8; // degrees, geomagnetic north pole longitude
/// Earth's magnetic reference radius, meters (2025, International Geomagnetic Reference Field)
pub const MAGNETIC_REFERENCE_RADIUS: f64 = 6371200.0; // meters, reference radius for magnetic field calculations
/// Earth's magnetic field strength ($B_0$), teslas (2025, International Geomagnetic Reference Field)
pub const MAGNETIC_FIELD_STRENGTH: f64 = 3.12e-5; // T, reference mean magnetic field strength
/// Teslas to microteslas, the unit phone magnetometers report in
pub const TESLA_TO_MICROTESLA: f64 = 1e6;
/// $m/s^2$ to milligals
pub const MPS2_TO_MGAL: f64 = 1e5;

/// Calculate the WGS84 gravity scalar
///
/// The [gravity model](https://en.wikipedia.org/wiki/Gravity_of_Earth) is based on the [Somigliana
/// method](https://en.wikipedia.org/wiki/Theoretical_gravity#Somigliana_equation), which models
/// the Earth's gravity as a function of the latitude and altitude. Free-air correction is applied.
///
/// # Parameters
/// - `latitude` - The WGS84 latitude in degrees
/// - `altitude` - The WGS84 altitude in meters
///
/// # Returns
/// The gravitational force scalar in m/s^2
///
/// # Example
/// ```rust
/// use mems_nav::earth;
/// let latitude: f64 = 45.0;
/// let altitude: f64 = 1000.0;
/// let grav = earth::gravity(&latitude, &altitude);
/// ```
pub fn gravity(latitude: &f64, altitude: &f64) -> f64 {
    let sin_lat: f64 = (latitude).to_radians().sin();
    let g0: f64 = (GE * (1.0 + K * sin_lat * sin_lat))
        / (1.0 - ECCENTRICITY_SQUARED * sin_lat * sin_lat).sqrt();
    g0 - FREE_AIR_GRADIENT * altitude
}

/// Free-air gravity anomaly in milligals
///
/// Difference between the magnitude of a measured gravity vector and normal gravity at the
/// given latitude on the ellipsoid (sea level).
///
/// # Example
/// ```rust
/// use nalgebra::Vector3;
/// use mems_nav::earth;
/// let measured = Vector3::new(0.0, 0.0, earth::gravity(&45.0, &0.0));
/// let anomaly = earth::free_air_anomaly(&measured, &45.0);
/// assert!(anomaly.abs() < 1e-6);
/// ```
pub fn free_air_anomaly(measured: &Vector3<f64>, latitude: &f64) -> f64 {
    (measured.norm() - gravity(latitude, &0.0)) * MPS2_TO_MGAL
}

/// Calculate the magnetic field using the Earth's dipole model in the local-level frame
///
/// This function computes the Earth's magnetic field at a given position using a simple
/// dipole model centered at the Earth's center with its axis through the geomagnetic poles.
///
/// # Parameters
/// - `latitude` - The WGS84 latitude in degrees
/// - `longitude` - The WGS84 longitude in degrees
/// - `altitude` - The WGS84 altitude in meters
///
/// # Returns
/// The magnetic field vector in teslas in the local-level frame (North, East, Down)
///
/// # Example
/// ```rust
/// use mems_nav::earth;
/// let magnetic_field = earth::calculate_magnetic_field(&45.0, &-75.0, &0.0);
/// ```
pub fn calculate_magnetic_field(latitude: &f64, longitude: &f64, altitude: &f64) -> Vector3<f64> {
    let (mag_colatitude, _) = wgs84_to_magnetic(latitude, longitude);
    let radius = MAGNETIC_REFERENCE_RADIUS + *altitude;

    let radial_field = calculate_radial_magnetic_field(mag_colatitude.to_radians(), radius);
    let lat_field = calculate_latitudinal_magnetic_field(mag_colatitude.to_radians(), radius);

    Vector3::new(radial_field, lat_field, 0.0)
}

/// Magnetic anomaly in microteslas
///
/// Difference between the magnitude of a measured magnetic field vector (microteslas, as
/// reported by the phone) and the magnitude of the dipole field at the given position.
pub fn magnetic_anomaly(
    measured: &Vector3<f64>,
    latitude: &f64,
    longitude: &f64,
    altitude: &f64,
) -> f64 {
    let model = calculate_magnetic_field(latitude, longitude, altitude) * TESLA_TO_MICROTESLA;
    measured.norm() - model.norm()
}

/// Calculate the radial component of Earth's magnetic field using the dipole model
///
/// # Parameters
/// - `colatitude` - The magnetic *colatitude* in radians (angle from magnetic north pole)
/// - `radius` - The distance from Earth's center in meters
///
/// # Returns
/// The radial component of the magnetic field in teslas
pub fn calculate_radial_magnetic_field(colatitude: f64, radius: f64) -> f64 {
    -2.0 * MAGNETIC_FIELD_STRENGTH * (MAGNETIC_REFERENCE_RADIUS / radius).powi(3) * colatitude.cos()
}

/// Calculate the latitudinal component of Earth's magnetic field using the dipole model
///
/// # Parameters
/// - `colatitude` - The magnetic *colatitude* in radians (angle from magnetic north pole)
/// - `radius` - The distance from Earth's center in meters
///
/// # Returns
/// The latitudinal component of the magnetic field in teslas
pub fn calculate_latitudinal_magnetic_field(colatitude: f64, radius: f64) -> f64 {
    -MAGNETIC_FIELD_STRENGTH * (MAGNETIC_REFERENCE_RADIUS / radius).powi(3) * colatitude.sin()
}

/// Calculate magnetic colatitude and longitude from WGS84 coordinates
///
/// This function transforms WGS84 geographic coordinates to geomagnetic coordinates
/// using the dipole model of Earth's magnetic field. The transformation is based on
/// the location of the geomagnetic north pole.
///
/// # Returns
/// A tuple containing (magnetic_colatitude, magnetic_longitude) in degrees. Colatitude
/// is the angle from the magnetic north pole [0, 180], and longitude is the angle from the
/// magnetic meridian.
pub fn wgs84_to_magnetic(latitude: &f64, longitude: &f64) -> (f64, f64) {
    let lat_rad = latitude.to_radians();
    let lon_rad = longitude.to_radians();
    let mag_lat_rad = MAGNETIC_NORTH_LATITUDE.to_radians();
    let mag_lon_rad = MAGNETIC_NORTH_LONGITUDE.to_radians();

    // spherical angle between the point and the geomagnetic pole
    let cos_theta = lat_rad.sin() * mag_lat_rad.sin()
        + lat_rad.cos() * mag_lat_rad.cos() * (lon_rad - mag_lon_rad).cos();
    // azimuth from the magnetic pole to the point
    let y = (lon_rad - mag_lon_rad).sin() * lat_rad.cos();
    let x = mag_lat_rad.cos() * lat_rad.sin()
        - mag_lat_rad.sin() * lat_rad.cos() * (lon_rad - mag_lon_rad).cos();

    let mag_colatitude = cos_theta.clamp(-1.0, 1.0).acos().to_degrees();
    let mag_longitude = y.atan2(x).to_degrees();

    (mag_colatitude, mag_longitude)
}

/// Calculate the magnetic inclination (dip angle) at a given location
///
/// The magnetic inclination is the angle between the horizontal plane and the
/// magnetic field vector, positive downward.
///
/// # Returns
/// The magnetic inclination angle in degrees
pub fn magnetic_inclination(latitude: &f64, longitude: &f64, altitude: &f64) -> f64 {
    let b_vector = calculate_magnetic_field(latitude, longitude, altitude);
    let b_h = (b_vector[0].powi(2) + b_vector[1].powi(2)).sqrt();
    b_vector[2].atan2(b_h).to_degrees()
}

/// Calculate the magnetic declination (variation) at a given location
///
/// The magnetic declination is the angle between true north and magnetic north,
/// positive eastward.
///
/// # Returns
/// The magnetic declination angle in degrees
pub fn magnetic_declination(latitude: &f64, longitude: &f64, altitude: &f64) -> f64 {
    let b_vector = calculate_magnetic_field(latitude, longitude, altitude);
    b_vector[1].atan2(b_vector[0]).to_degrees()
}

// === Unit tests ===
#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn gravity() {
        // test polar gravity
        let latitude: f64 = 90.0;
        let grav = super::gravity(&latitude, &0.0);
        assert_approx_eq!(grav, GP);
        // test equatorial gravity
        let latitude: f64 = 0.0;
        let grav = super::gravity(&latitude, &0.0);
        assert_approx_eq!(grav, GE);
        // free-air correction
        let grav = super::gravity(&latitude, &1000.0);
        assert_approx_eq!(grav, GE - 3.08e-3);
        // WGS84 normal gravity at 45 degrees
        let grav = super::gravity(&45.0, &0.0);
        assert_approx_eq!(grav, 9.806198, 1e-5);
    }

    #[test]
    fn free_air_anomaly() {
        let latitude: f64 = 40.0;
        let normal = super::gravity(&latitude, &0.0);
        let measured = Vector3::new(0.0, 0.0, normal);
        assert_approx_eq!(super::free_air_anomaly(&measured, &latitude), 0.0, 1e-6);
        // 1 mGal above normal, split across axes
        let g = normal + 1e-5;
        let measured = Vector3::new(g / 3.0_f64.sqrt(), g / 3.0_f64.sqrt(), -g / 3.0_f64.sqrt());
        assert_approx_eq!(super::free_air_anomaly(&measured, &latitude), 1.0, 1e-6);
    }

    #[test]
    fn magnetic_radial_field() {
        // Using magnetic co-latitude [0, 180]
        let lat: f64 = 0.0;
        let b_r: f64 = calculate_radial_magnetic_field(lat.to_radians(), MAGNETIC_REFERENCE_RADIUS);
        assert_approx_eq!(b_r, -2.0 * MAGNETIC_FIELD_STRENGTH, 1e-12);
        let lat: f64 = 180.0;
        let b_r: f64 = calculate_radial_magnetic_field(lat.to_radians(), MAGNETIC_REFERENCE_RADIUS);
        assert_approx_eq!(b_r, 2.0 * MAGNETIC_FIELD_STRENGTH, 1e-12);
        let lat: f64 = 90.0;
        let b_r: f64 = calculate_radial_magnetic_field(lat.to_radians(), MAGNETIC_REFERENCE_RADIUS);
        assert_approx_eq!(b_r, 0.0, 1e-12);
    }

    #[test]
    fn magnetic_field_falls_off_with_cube_of_radius() {
        let near = calculate_latitudinal_magnetic_field(1.0, MAGNETIC_REFERENCE_RADIUS);
        let far = calculate_latitudinal_magnetic_field(1.0, 2.0 * MAGNETIC_REFERENCE_RADIUS);
        assert_approx_eq!(near / far, 8.0, 1e-9);
    }

    #[test]
    fn wgs84_to_magnetic() {
        let lat: f64 = 80.8;
        let lon: f64 = -72.8;
        let (mag_lat, _) = super::wgs84_to_magnetic(&lat, &lon);
        assert_approx_eq!(mag_lat, 0.0, 1e-5);
        // antipode of the geomagnetic pole
        let (mag_lat, _) = super::wgs84_to_magnetic(&-80.8, &107.2);
        assert_approx_eq!(mag_lat, 180.0, 1e-5);
    }

    #[test]
    fn magnetic_field_magnitude() {
        let (lat, lon, alt) = (39.95, -75.16, 0.0);
        let (colat, _) = super::wgs84_to_magnetic(&lat, &lon);
        let theta = colat.to_radians();
        let expected = MAGNETIC_FIELD_STRENGTH * (1.0 + 3.0 * theta.cos().powi(2)).sqrt();
        let b = calculate_magnetic_field(&lat, &lon, &alt);
        assert_approx_eq!(b.norm(), expected, 1e-12);
        assert_eq!(b[2], 0.0);
    }

    #[test]
    fn magnetic_anomaly_vanishes_for_model_field() {
        let (lat, lon, alt) = (39.95, -75.16, 120.0);
        let model = calculate_magnetic_field(&lat, &lon, &alt) * TESLA_TO_MICROTESLA;
        let measured = Vector3::new(model.norm(), 0.0, 0.0);
        assert_approx_eq!(super::magnetic_anomaly(&measured, &lat, &lon, &alt), 0.0, 1e-9);
    }

    #[test]
    fn inclination_and_declination() {
        let (lat, lon, alt) = (45.0, -75.0, 0.0);
        assert_approx_eq!(magnetic_inclination(&lat, &lon, &alt), 0.0, 1e-9);
        let b = calculate_magnetic_field(&lat, &lon, &alt);
        let expected = b[1].atan2(b[0]).to_degrees();
        assert_approx_eq!(magnetic_declination(&lat, &lon, &alt), expected, 1e-12);
    }
}
