//! A configured scenario: timeline, pools and run-wide policies.
//!
//! `Scenario` validates a [`ScenarioConfig`] once, then runs any number of
//! independent schedules against it. Each run gets cloned parameter snapshots,
//! so nothing is shared between runs.

use rustc_hash::FxHashSet;

use crate::config::{ConfigError, ScenarioConfig};
use crate::log_warn;
use crate::models::Plan;
use crate::parameters::{resolve_series, ParameterSpec};
use crate::pool::{ResolvedParameters, ResourcePool};
use crate::scheduler::{PoolSnapshot, ScheduleOutcome, Scheduler, SchedulerError, SchedulerOptions};
use crate::timeline::Timeline;

const TOTAL_CAPACITY: &str = "total_capacity";

pub struct Scenario {
    name: String,
    timeline: Timeline,
    pools: Vec<ResourcePool>,
    total_capacity: ParameterSpec,
    options: SchedulerOptions,
}

impl Scenario {
    /// Validate `config` and build its pools.
    pub fn new(config: ScenarioConfig) -> Result<Self, ConfigError> {
        let timeline = Timeline::new(config.timeline_start, config.timeline_end)?;
        if config.total_capacity.values().iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::NonFiniteValue {
                pool: config.name,
                attribute: TOTAL_CAPACITY.to_string(),
            });
        }

        let mut names = FxHashSet::default();
        let mut pools = Vec::with_capacity(config.pools.len());
        for pool in config.pools {
            if !names.insert(pool.name.clone()) {
                return Err(ConfigError::DuplicatePool(pool.name));
            }
            pools.push(ResourcePool::new(pool)?);
        }

        let scenario = Self {
            name: config.name,
            timeline,
            pools,
            total_capacity: config.total_capacity,
            options: SchedulerOptions {
                holidays: config.holidays,
                show_unused: config.show_unused,
                blocking_policy: config.blocking_policy,
                verbosity: config.verbosity,
            },
        };
        scenario.check_surplus_capacity()?;
        Ok(scenario)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn pools(&self) -> &[ResourcePool] {
        &self.pools
    }

    /// Move the scenario to another timeline; pool series re-resolve lazily.
    pub fn set_timeline(&mut self, timeline: Timeline) -> Result<(), ConfigError> {
        let previous = std::mem::replace(&mut self.timeline, timeline);
        if let Err(e) = self.check_surplus_capacity() {
            self.timeline = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Resolved series of pool `name` on the current timeline.
    pub fn parameters(&mut self, name: &str) -> Result<&ResolvedParameters, ConfigError> {
        let timeline = self.timeline;
        self.pools
            .iter_mut()
            .find(|p| p.name() == name)
            .ok_or_else(|| ConfigError::UnknownPool(name.to_string()))?
            .parameters(&timeline)
    }

    /// Capacity pool `name` can actually work with per day: zero on weekends
    /// and holidays.
    pub fn daily_capacity(&mut self, name: &str) -> Result<Vec<f64>, ConfigError> {
        let working = self.timeline.working_days(&self.options.holidays);
        let params = self.parameters(name)?;
        Ok(params
            .capacity
            .iter()
            .zip(working)
            .map(|(capacity, works)| if works { *capacity } else { 0.0 })
            .collect())
    }

    /// Total capacity per day on the current timeline.
    pub fn total_capacity(&self) -> Result<Vec<f64>, ConfigError> {
        resolve_series(&self.total_capacity.constraints(), &self.timeline).ok_or_else(|| {
            ConfigError::UnresolvableAttribute {
                pool: self.name.clone(),
                attribute: TOTAL_CAPACITY.to_string(),
            }
        })
    }

    /// Absorbing pools need some surplus to absorb on at least one day.
    fn check_surplus_capacity(&self) -> Result<(), ConfigError> {
        let absorbing: Vec<String> = self
            .pools
            .iter()
            .filter(|p| p.absorbs_surplus())
            .map(|p| p.name().to_string())
            .collect();
        if absorbing.is_empty() {
            return Ok(());
        }
        if self.total_capacity()?.iter().all(|v| *v <= 0.0) {
            return Err(ConfigError::NonPositiveSurplusCapacity(absorbing));
        }
        Ok(())
    }

    /// Run one schedule of `plan` on this scenario.
    pub fn schedule(&mut self, plan: &Plan) -> Result<ScheduleOutcome, SchedulerError> {
        plan.validate()?;
        for pool in plan.referenced_pools() {
            if !self.pools.iter().any(|p| p.name() == pool) {
                log_warn!("Tasks assign effort to unknown pool {}; ignoring it", pool);
            }
        }

        let timeline = self.timeline;
        let mut snapshots = Vec::with_capacity(self.pools.len());
        for pool in &mut self.pools {
            let params = pool.parameters(&timeline)?.clone();
            snapshots.push(PoolSnapshot {
                name: pool.name().to_string(),
                label: pool.label().to_string(),
                color: pool.color().to_string(),
                params,
                absorbs_surplus: pool.absorbs_surplus(),
                yields_unused: pool.yields_unused(),
            });
        }
        let total_capacity = self.total_capacity()?;

        let scheduler = Scheduler::new(
            plan,
            timeline,
            snapshots,
            total_capacity,
            self.options.clone(),
        )?;
        Ok(scheduler.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolConfig;
    use crate::models::{Task, TaskGroup};
    use crate::parameters::Constraint;
    use chrono::NaiveDate;

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn config(pools: Vec<PoolConfig>) -> ScenarioConfig {
        ScenarioConfig {
            name: "test".to_string(),
            timeline_start: d(2024, 1, 1),
            timeline_end: d(2024, 1, 31),
            total_capacity: ParameterSpec::Constant(4.0),
            pools,
            ..ScenarioConfig::default()
        }
    }

    #[test]
    fn test_scenario_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Scenario>();
        assert_send::<ScheduleOutcome>();
    }

    #[test]
    fn test_duplicate_pool_rejected() {
        let result = Scenario::new(config(vec![
            PoolConfig::with_capacity("dev", 1.0),
            PoolConfig::with_capacity("dev", 2.0),
        ]));
        assert!(matches!(result, Err(ConfigError::DuplicatePool(name)) if name == "dev"));
    }

    #[test]
    fn test_inverted_timeline_rejected() {
        let mut config = config(vec![]);
        config.timeline_end = d(2023, 12, 1);
        assert!(matches!(
            Scenario::new(config),
            Err(ConfigError::InvalidTimeline { .. })
        ));
    }

    #[test]
    fn test_absorbing_pool_needs_positive_total() {
        let mut dev = PoolConfig::with_capacity("dev", 1.0);
        dev.absorbs_surplus = true;
        let mut config = config(vec![dev]);
        config.total_capacity = ParameterSpec::Constant(0.0);
        assert!(matches!(
            Scenario::new(config),
            Err(ConfigError::NonPositiveSurplusCapacity(pools)) if pools == vec!["dev".to_string()]
        ));
    }

    #[test]
    fn test_non_finite_total_capacity_rejected() {
        let mut config = config(vec![PoolConfig::with_capacity("dev", 1.0)]);
        config.total_capacity = ParameterSpec::Constant(f64::NAN);
        assert!(matches!(
            Scenario::new(config),
            Err(ConfigError::NonFiniteValue { ref attribute, .. }) if attribute == TOTAL_CAPACITY
        ));
    }

    #[test]
    fn test_negative_efficiency_pool_rejected() {
        let mut dev = PoolConfig::with_capacity("dev", 1.0);
        dev.efficiency = ParameterSpec::Constant(-1.0);
        assert!(matches!(
            Scenario::new(config(vec![dev])),
            Err(ConfigError::NegativeValue { .. })
        ));
    }

    #[test]
    fn test_unknown_pool_lookup() {
        let mut scenario = Scenario::new(config(vec![PoolConfig::with_capacity("dev", 1.0)])).unwrap();
        assert!(scenario.parameters("dev").is_ok());
        assert!(matches!(
            scenario.parameters("qa"),
            Err(ConfigError::UnknownPool(_))
        ));
    }

    #[test]
    fn test_schedule_runs_and_repeats() {
        let mut scenario = Scenario::new(config(vec![PoolConfig::with_capacity("dev", 2.0)])).unwrap();
        let plan = Plan::new(
            vec![TaskGroup::named("r1")],
            vec![
                Task::new("1.1.1", "a", 0).with_effort("dev", 3.0),
                Task::new("1.1.2", "b", 0).with_effort("unknown", 3.0),
            ],
        );
        let first = scenario.schedule(&plan).unwrap();
        let second = scenario.schedule(&plan).unwrap();
        assert_eq!(first.completion("1.1.1", "dev"), Some(d(2024, 1, 2)));
        assert_eq!(first.roadmap, second.roadmap);
        assert_eq!(first.completions(), second.completions());
    }

    #[test]
    fn test_piecewise_capacity_changes_pace() {
        let mut dev = PoolConfig::with_capacity("dev", 1.0);
        dev.capacity = ParameterSpec::Piecewise(vec![
            Constraint::always(1.0),
            Constraint {
                start: Some(d(2024, 1, 3)),
                end: None,
                value: 3.0,
            },
        ]);
        let mut scenario = Scenario::new(config(vec![dev])).unwrap();
        let plan = Plan::new(
            vec![TaskGroup::named("r1")],
            vec![Task::new("1.1.1", "a", 0).with_effort("dev", 5.0)],
        );
        let outcome = scenario.schedule(&plan).unwrap();
        // 1 + 1 on Jan 1-2, then 3 on Jan 3
        assert_eq!(outcome.completion("1.1.1", "dev"), Some(d(2024, 1, 3)));
    }

    #[test]
    fn test_set_timeline_resolves_for_new_bounds() {
        let mut scenario = Scenario::new(config(vec![PoolConfig::with_capacity("dev", 1.0)])).unwrap();
        let week = Timeline::new(d(2024, 2, 1), d(2024, 2, 7)).unwrap();
        scenario.set_timeline(week).unwrap();
        assert_eq!(scenario.parameters("dev").unwrap().capacity.len(), 7);
        assert_eq!(scenario.total_capacity().unwrap().len(), 7);
    }
}
