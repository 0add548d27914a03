use serde::{Deserialize, Serialize};

use crate::Point;

/// Area of interest with the drones that should cover it.
///
/// `width` and `height` only describe the drawing area. The planner works on
/// the points and on `viable_paths`, which (when given) is the complete list
/// of straight segments a drone may fly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub width: f64,
    pub height: f64,
    pub depots: Vec<Point>,
    pub targets: Vec<Point>,
    #[serde(default)]
    pub dwell_time: f64,
    #[serde(default)]
    pub viable_paths: Option<Vec<(Point, Point)>>,
    #[serde(default)]
    pub drones: Vec<DroneSpec>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DroneSpec {
    /// Seconds of flight per round.
    pub autonomy: f64,
    /// Meters per second.
    pub speed: f64,
    /// Index into `Scenario::depots`.
    pub depot: usize,
}

#[cfg(test)]
mod tests {
    use super::Scenario;

    #[test]
    fn optional_fields_default() {
        let scenario: Scenario = serde_json::from_str(
            r#"{
                "width": 100.0,
                "height": 50.0,
                "depots": [{"x": 0.0, "y": 0.0}],
                "targets": [{"x": 10.0, "y": 0.0}, {"x": 0.0, "y": 10.0}]
            }"#,
        )
        .unwrap();
        assert_eq!(scenario.dwell_time, 0.0);
        assert!(scenario.viable_paths.is_none());
        assert!(scenario.drones.is_empty());
        assert_eq!(scenario.targets.len(), 2);
    }
}
