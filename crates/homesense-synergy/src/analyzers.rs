//! Capability benefit analyzers.
//!
//! Each analyzer estimates one flavor of benefit for a device chain; the
//! impact score is their weighted combination. Analyzers only look at
//! capability metadata, never at raw events.

use homesense_core::{DeviceCapability, DeviceInfo};

/// Per-analyzer benefit estimates in [0,1].
#[derive(Debug, Clone, Default)]
pub struct BenefitBreakdown {
    /// Sensor-gated power loads: lights or switches that could turn off
    /// when nothing is happening.
    pub energy: f64,
    /// Hands-free operation of controllable devices.
    pub convenience: f64,
    /// Climate devices reacting to presence or ambient sensing.
    pub comfort: f64,
}

impl BenefitBreakdown {
    /// Weighted combination into a single impact score.
    pub fn impact_score(&self) -> f64 {
        (0.45 * self.energy + 0.35 * self.convenience + 0.2 * self.comfort).clamp(0.0, 1.0)
    }

    /// The dominant benefit, when one clearly leads.
    pub fn dominant(&self) -> Option<Benefit> {
        let max = self.energy.max(self.convenience).max(self.comfort);
        if max < 0.5 {
            return None;
        }
        if self.energy == max {
            Some(Benefit::Energy)
        } else if self.convenience == max {
            Some(Benefit::Convenience)
        } else {
            Some(Benefit::Comfort)
        }
    }
}

/// Benefit flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Benefit {
    Energy,
    Convenience,
    Comfort,
}

/// Analyze a chain of devices.
pub fn analyze_chain(chain: &[&DeviceInfo]) -> BenefitBreakdown {
    let has_sensor = chain.iter().any(|d| d.capability.is_sensor());
    let power_loads = chain
        .iter()
        .filter(|d| d.capability.draws_power())
        .count();
    let controllable = chain
        .iter()
        .filter(|d| d.capability.is_controllable())
        .count();
    let climate = chain
        .iter()
        .filter(|d| {
            matches!(
                d.capability,
                DeviceCapability::Thermostat | DeviceCapability::ClimateSensor
            )
        })
        .count();

    let mut benefits = BenefitBreakdown::default();

    // Energy: a sensor gating power loads means those loads can follow
    // actual occupancy.
    if has_sensor && power_loads > 0 {
        benefits.energy = (0.4 + 0.2 * power_loads as f64).min(1.0);
    }

    // Convenience scales with how much of the chain can be automated.
    if controllable > 0 {
        benefits.convenience = (controllable as f64 / chain.len() as f64).min(1.0);
    }

    // Comfort: climate control paired with any sensing.
    if climate > 0 && has_sensor {
        benefits.comfort = (0.5 + 0.25 * (climate.saturating_sub(1)) as f64).min(1.0);
    }

    benefits
}

#[cfg(test)]
mod tests {
    use super::*;
    use homesense_core::DeviceInfo;

    #[test]
    fn test_sensor_and_light_scores_energy() {
        let motion = DeviceInfo::new("motion", DeviceCapability::MotionSensor);
        let light = DeviceInfo::new("light", DeviceCapability::DimmableLight);
        let benefits = analyze_chain(&[&motion, &light]);
        assert!(benefits.energy > 0.0);
        assert_eq!(benefits.dominant(), Some(Benefit::Energy));
    }

    #[test]
    fn test_climate_chain_scores_comfort() {
        let sensor = DeviceInfo::new("temp", DeviceCapability::ClimateSensor);
        let thermostat = DeviceInfo::new("thermostat", DeviceCapability::Thermostat);
        let benefits = analyze_chain(&[&sensor, &thermostat]);
        assert!(benefits.comfort > 0.0);
    }

    #[test]
    fn test_sensor_only_chain_has_no_benefit() {
        let a = DeviceInfo::new("a", DeviceCapability::MotionSensor);
        let b = DeviceInfo::new("b", DeviceCapability::ContactSensor);
        let benefits = analyze_chain(&[&a, &b]);
        assert_eq!(benefits.impact_score(), 0.0);
        assert!(benefits.dominant().is_none());
    }
}
