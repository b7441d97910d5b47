use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Conversion factor from m/s (positioning subsystem) to km/h (operator UI).
const MPS_TO_KMH: f32 = 3.6;

/// A single raw sample from the positioning subsystem. Immutable once
/// created.
#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
pub struct PositionFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Estimated accuracy radius in meters.
    pub accuracy: f32,
    /// Ground speed in m/s.
    #[serde(default)]
    pub speed: f32,
    /// Heading in degrees (0-360), when the platform knows it.
    #[serde(default)]
    pub heading: Option<f32>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

/// Status projection pushed to the operator-facing UI.
///
/// Refreshed for every incoming fix, significant or not, so the UI always
/// shows the latest raw telemetry even while delivery is failing.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct PositionUpdate {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f32,
    pub speed_kmh: f32,
    pub heading_deg: Option<f32>,
    pub timestamp: DateTime<Utc>,
    /// Human-readable speed, "stationary" when not moving.
    pub speed_label: String,
}

impl From<&PositionFix> for PositionUpdate {
    fn from(fix: &PositionFix) -> Self {
        let speed_kmh = fix.speed * MPS_TO_KMH;
        let speed_label = if fix.speed > 0.0 {
            format!("{:.1} km/h", speed_kmh)
        } else {
            "stationary".to_string()
        };

        Self {
            latitude: fix.latitude,
            longitude: fix.longitude,
            accuracy: fix.accuracy,
            speed_kmh,
            heading_deg: fix.heading,
            timestamp: fix.timestamp,
            speed_label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fix_with_speed(speed: f32) -> PositionFix {
        PositionFix {
            latitude: 24.0,
            longitude: 46.0,
            accuracy: 5.0,
            speed,
            heading: Some(90.0),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn converts_speed_to_kmh() {
        let update = PositionUpdate::from(&fix_with_speed(10.0));
        assert!((update.speed_kmh - 36.0).abs() < 1e-4);
        assert_eq!(update.speed_label, "36.0 km/h");
    }

    #[test]
    fn zero_speed_is_stationary() {
        let update = PositionUpdate::from(&fix_with_speed(0.0));
        assert_eq!(update.speed_kmh, 0.0);
        assert_eq!(update.speed_label, "stationary");
    }

    #[test]
    fn ingest_body_tolerates_missing_optional_fields() {
        let json = r#"{"latitude": 24.0, "longitude": 46.0, "accuracy": 5.0}"#;
        let fix: PositionFix = serde_json::from_str(json).unwrap();
        assert_eq!(fix.speed, 0.0);
        assert!(fix.heading.is_none());
    }
}
