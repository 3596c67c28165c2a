use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum BatteryLevel {
    Low,
    Stable,
    Strong,
}

impl BatteryLevel {
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn label(&self) -> &'static str {
        match self {
            BatteryLevel::Low => "Low",
            BatteryLevel::Stable => "Stable",
            BatteryLevel::Strong => "Strong",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MentalBattery {
    pub percentage: f64,
    pub level: BatteryLevel,
    pub level_index: usize,
}

pub fn clamp_percentage(percentage: f64) -> f64 {
    if percentage.is_nan() {
        0.0
    } else {
        percentage.clamp(0.0, 100.0)
    }
}

/// Resolves the backend's level label against the clamped percentage.
/// A strong label or reading wins over a low one.
pub fn normalize_level(label: Option<&str>, percentage: f64) -> BatteryLevel {
    let label = label.map(|value| value.trim().to_lowercase());
    let label = label.as_deref();

    if matches!(label, Some("optimal" | "strong")) || percentage >= 66.0 {
        BatteryLevel::Strong
    } else if matches!(label, Some("strained" | "low" | "high risk" | "high_risk")) || percentage < 33.0 {
        BatteryLevel::Low
    } else {
        BatteryLevel::Stable
    }
}

pub fn mental_battery(percentage: f64, label: Option<&str>) -> MentalBattery {
    let percentage = clamp_percentage(percentage);
    let level = normalize_level(label, percentage);
    MentalBattery {
        percentage,
        level,
        level_index: level.index(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_thresholds() {
        assert_eq!(mental_battery(66.0, None).level, BatteryLevel::Strong);
        assert_eq!(mental_battery(65.9, None).level, BatteryLevel::Stable);
        assert_eq!(mental_battery(33.0, None).level, BatteryLevel::Stable);
        assert_eq!(mental_battery(32.9, None).level, BatteryLevel::Low);
    }

    #[test]
    fn labels_are_case_insensitive() {
        assert_eq!(normalize_level(Some("OPTIMAL"), 40.0), BatteryLevel::Strong);
        assert_eq!(normalize_level(Some("High Risk"), 50.0), BatteryLevel::Low);
        assert_eq!(normalize_level(Some("high_risk"), 50.0), BatteryLevel::Low);
        assert_eq!(normalize_level(Some("Stable"), 50.0), BatteryLevel::Stable);
    }

    #[test]
    fn strong_reading_overrides_low_label() {
        assert_eq!(normalize_level(Some("strained"), 80.0), BatteryLevel::Strong);
    }

    #[test]
    fn percentage_is_clamped_before_classification() {
        let battery = mental_battery(180.0, Some("low"));
        assert_eq!(battery.percentage, 100.0);
        assert_eq!(battery.level, BatteryLevel::Strong);
        assert_eq!(battery.level_index, 2);

        let battery = mental_battery(-10.0, None);
        assert_eq!(battery.percentage, 0.0);
        assert_eq!(battery.level_index, 0);
    }
}
