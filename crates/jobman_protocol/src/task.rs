use serde::{Deserialize, Serialize};

/// A single task triple: `namespace/name/arguments`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Task {
    pub namespace: String,
    pub name: String,
    pub arguments: String,
}

impl Task {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Render as `namespace/name/arguments`.
    pub fn render(&self) -> String {
        format!("{}/{}/{}", self.namespace, self.name, self.arguments)
    }
}

/// A job: a level-of-analysis plus an ordered, non-empty list of tasks.
///
/// Identity is the canonical path (`render`), used as a key everywhere a job
/// is referenced (lock keys, error keys, cache keys).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub loa: String,
    pub tasks: Vec<Task>,
}

impl Job {
    pub fn new(loa: impl Into<String>, tasks: Vec<Task>) -> Self {
        Self { loa: loa.into(), tasks }
    }

    /// Canonical path: `loa/<task1>/<task2>/.../<taskN>`.
    pub fn render(&self) -> String {
        let mut parts = Vec::with_capacity(1 + self.tasks.len() * 3);
        parts.push(self.loa.clone());
        for task in &self.tasks {
            parts.push(task.namespace.clone());
            parts.push(task.name.clone());
            parts.push(task.arguments.clone());
        }
        parts.join("/")
    }

    /// The subjob chain, leaf (shortest, one task) first, root (this job) last.
    ///
    /// For a job with N tasks, element i (1-indexed) is the job formed from
    /// the last i tasks. The chain is strictly increasing in length by one
    /// task per step, and the final element equals this job's own path.
    pub fn chain(&self) -> Vec<String> {
        let n = self.tasks.len();
        (1..=n)
            .map(|len| {
                let subjob = Job::new(self.loa.clone(), self.tasks[n - len..].to_vec());
                subjob.render()
            })
            .collect()
    }
}
