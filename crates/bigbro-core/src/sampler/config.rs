//! Task configuration.

use std::collections::{BTreeSet, HashSet};
use std::time::Duration;

use crate::model::SampleCategory;

/// Invalid task configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyName,
    ZeroPeriod,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::EmptyName => f.write_str("task name must not be empty"),
            ConfigError::ZeroPeriod => f.write_str("task period must be greater than zero"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Settings of one sampling task.
///
/// Immutable once built; reconfiguring a task replaces the whole value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskConfig {
    name: String,
    due_time: Duration,
    period: Duration,
    categories: BTreeSet<SampleCategory>,
    print_threads: HashSet<String>,
}

impl TaskConfig {
    pub fn builder(name: impl Into<String>) -> TaskConfigBuilder {
        TaskConfigBuilder {
            name: name.into(),
            due_time: Duration::ZERO,
            period: Duration::from_secs(1),
            categories: BTreeSet::new(),
            print_threads: HashSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Delay between start and the first tick.
    pub fn due_time(&self) -> Duration {
        self.due_time
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Enabled categories, iterated in emission order.
    pub fn categories(&self) -> impl Iterator<Item = SampleCategory> + '_ {
        self.categories.iter().copied()
    }

    pub fn is_enabled(&self, category: SampleCategory) -> bool {
        self.categories.contains(&category)
    }

    /// True when no category is enabled; such a task ticks but emits nothing.
    pub fn is_idle(&self) -> bool {
        self.categories.is_empty()
    }

    /// Process names whose thread IDs are rendered.
    pub fn print_threads(&self) -> &HashSet<String> {
        &self.print_threads
    }
}

/// Builder for [`TaskConfig`].
#[derive(Debug, Clone)]
pub struct TaskConfigBuilder {
    name: String,
    due_time: Duration,
    period: Duration,
    categories: BTreeSet<SampleCategory>,
    print_threads: HashSet<String>,
}

impl TaskConfigBuilder {
    pub fn due_time(mut self, due_time: Duration) -> Self {
        self.due_time = due_time;
        self
    }

    pub fn period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn category(mut self, category: SampleCategory) -> Self {
        self.categories.insert(category);
        self
    }

    pub fn categories(mut self, categories: impl IntoIterator<Item = SampleCategory>) -> Self {
        self.categories.extend(categories);
        self
    }

    pub fn print_threads_for(mut self, process_name: impl Into<String>) -> Self {
        self.print_threads.insert(process_name.into());
        self
    }

    pub fn build(self) -> Result<TaskConfig, ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.period.is_zero() {
            return Err(ConfigError::ZeroPeriod);
        }
        Ok(TaskConfig {
            name: self.name,
            due_time: self.due_time,
            period: self.period,
            categories: self.categories,
            print_threads: self.print_threads,
        })
    }
}
