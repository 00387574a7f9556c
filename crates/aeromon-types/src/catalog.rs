//! Static catalogs shared by the store seeds and the API client.

/// Codename of the synthetic "overall" air-quality index type.
///
/// The remote service reports the overall station index without a pollutant
/// code of its own; this codename gives it a slot in the sensor-type catalog.
pub const OVERALL_INDEX_CODE: &str = "Ogólny";

/// Sensor-type codenames seeded into a fresh store.
///
/// Sensors for pollutants outside this list are accepted too; their
/// codenames are added to the catalog on first sight.
pub const SENSOR_TYPE_CATALOG: [&str; 6] = ["Ogólny", "SO2", "NO2", "PM10", "PM2.5", "O3"];

/// Pollutants the air-quality index endpoint reports a sub-index for.
pub const INDEX_POLLUTANTS: [&str; 5] = ["NO2", "O3", "PM10", "PM2.5", "SO2"];

/// Air-quality index categories as published by the service, keyed by the
/// numeric index value. `-1` stands for "no value".
pub const INDEX_CATEGORIES: [(i64, &str); 6] = [
    (-1, "Brak wartości"),
    (0, "Bardzo dobry"),
    (1, "Dobry"),
    (2, "Umiarkowany"),
    (3, "Zły"),
    (4, "Bardzo zły"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overall_code_is_in_catalog() {
        assert!(SENSOR_TYPE_CATALOG.contains(&OVERALL_INDEX_CODE));
    }

    #[test]
    fn pollutants_are_catalogued() {
        for pollutant in INDEX_POLLUTANTS {
            assert!(SENSOR_TYPE_CATALOG.contains(&pollutant));
        }
    }

    #[test]
    fn categories_cover_no_value_marker() {
        assert!(INDEX_CATEGORIES.iter().any(|&(v, _)| v == -1));
    }
}
