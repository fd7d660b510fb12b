//! Resource pools and their resolved per-day parameters.

use chrono::NaiveDate;

use crate::config::{ConfigError, PoolConfig};
use crate::parameters::{resolve_series, ParameterSpec};
use crate::timeline::Timeline;

/// Per-day attribute series of one pool, all of timeline length.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedParameters {
    pub capacity: Vec<f64>,
    pub efficiency: Vec<f64>,
    pub parallelizability: Vec<f64>,
    pub base_cost: Vec<f64>,
}

impl ResolvedParameters {
    /// Capacity claimed by the pool on day `index`, base cost included.
    #[inline]
    pub fn steady_state(&self, index: usize) -> f64 {
        self.capacity[index] + self.base_cost[index]
    }
}

/// A named unit of labor.
///
/// Resolved series are cached per timeline bounds and recomputed only when the
/// bounds change; callers treat the returned series as read-only snapshots.
#[derive(Clone, Debug)]
pub struct ResourcePool {
    config: PoolConfig,
    resolved: Option<((NaiveDate, NaiveDate), ResolvedParameters)>,
}

impl ResourcePool {
    pub fn new(config: PoolConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            resolved: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn label(&self) -> &str {
        self.config.display_label()
    }

    pub fn color(&self) -> &str {
        &self.config.color
    }

    pub fn absorbs_surplus(&self) -> bool {
        self.config.absorbs_surplus
    }

    pub fn yields_unused(&self) -> bool {
        self.config.yields_unused
    }

    /// Resolved series for `timeline`, recomputed if the bounds changed.
    pub fn parameters(&mut self, timeline: &Timeline) -> Result<&ResolvedParameters, ConfigError> {
        let stale = match &self.resolved {
            Some((bounds, _)) => *bounds != timeline.bounds(),
            None => true,
        };
        if stale {
            let resolved = self.resolve(timeline)?;
            self.resolved = Some((timeline.bounds(), resolved));
        }
        match &self.resolved {
            Some((_, resolved)) => Ok(resolved),
            None => unreachable!("parameters resolved above"),
        }
    }

    fn resolve(&self, timeline: &Timeline) -> Result<ResolvedParameters, ConfigError> {
        Ok(ResolvedParameters {
            capacity: self.resolve_attribute("capacity", &self.config.capacity, timeline)?,
            efficiency: self.resolve_attribute("efficiency", &self.config.efficiency, timeline)?,
            parallelizability: self.resolve_attribute(
                "parallelizability",
                &self.config.parallelizability,
                timeline,
            )?,
            base_cost: self.resolve_attribute("base_cost", &self.config.base_cost, timeline)?,
        })
    }

    fn resolve_attribute(
        &self,
        attribute: &str,
        spec: &ParameterSpec,
        timeline: &Timeline,
    ) -> Result<Vec<f64>, ConfigError> {
        resolve_series(&spec.constraints(), timeline).ok_or_else(|| {
            ConfigError::UnresolvableAttribute {
                pool: self.config.name.clone(),
                attribute: attribute.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::Constraint;

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_defaults_resolve() {
        let mut pool = ResourcePool::new(PoolConfig::with_capacity("dev", 2.0)).unwrap();
        let timeline = Timeline::new(d(2024, 1, 1), d(2024, 1, 7)).unwrap();
        let params = pool.parameters(&timeline).unwrap();
        assert_eq!(params.capacity, vec![2.0; 7]);
        assert_eq!(params.efficiency, vec![1.0; 7]);
        assert_eq!(params.base_cost, vec![0.0; 7]);
        assert!(params.parallelizability.iter().all(|p| *p <= 0.0));
    }

    #[test]
    fn test_cache_follows_timeline_bounds() {
        let mut pool = ResourcePool::new(PoolConfig::with_capacity("dev", 1.0)).unwrap();
        let week = Timeline::new(d(2024, 1, 1), d(2024, 1, 7)).unwrap();
        let fortnight = Timeline::new(d(2024, 1, 1), d(2024, 1, 14)).unwrap();
        assert_eq!(pool.parameters(&week).unwrap().capacity.len(), 7);
        assert_eq!(pool.parameters(&fortnight).unwrap().capacity.len(), 14);
        assert_eq!(pool.parameters(&week).unwrap().capacity.len(), 7);
    }

    #[test]
    fn test_empty_piecewise_is_unresolvable() {
        let mut config = PoolConfig::with_capacity("dev", 1.0);
        config.efficiency = ParameterSpec::Piecewise(vec![]);
        let mut pool = ResourcePool::new(config).unwrap();
        let timeline = Timeline::new(d(2024, 1, 1), d(2024, 1, 7)).unwrap();
        match pool.parameters(&timeline) {
            Err(ConfigError::UnresolvableAttribute { pool, attribute }) => {
                assert_eq!(pool, "dev");
                assert_eq!(attribute, "efficiency");
            }
            other => panic!("expected unresolvable attribute, got {:?}", other),
        }
    }

    #[test]
    fn test_steady_state_includes_base_cost() {
        let mut config = PoolConfig::with_capacity("support", 1.5);
        config.base_cost = ParameterSpec::Piecewise(vec![Constraint::between(
            d(2024, 1, 3),
            d(2024, 1, 7),
            0.5,
        )]);
        let mut pool = ResourcePool::new(config).unwrap();
        let timeline = Timeline::new(d(2024, 1, 1), d(2024, 1, 7)).unwrap();
        let params = pool.parameters(&timeline).unwrap();
        // Leading days are back-filled from the first defined value
        assert_eq!(params.steady_state(0), 2.0);
        assert_eq!(params.steady_state(6), 2.0);
    }

    #[test]
    fn test_negative_base_cost_rejected() {
        let mut config = PoolConfig::with_capacity("support", 1.0);
        config.base_cost = ParameterSpec::Constant(-0.5);
        assert!(matches!(
            ResourcePool::new(config),
            Err(ConfigError::NegativeValue { .. })
        ));
    }
}
