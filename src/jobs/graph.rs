// graph.rs - Dependency graph of compute jobs

use std::collections::{HashMap, VecDeque};
use crate::error::GraphError;
use super::job::{ComparisonUnit, Job, JobState, Stage};

/// DAG of jobs with per-job lifecycle state.
///
/// Jobs are addressed by their insertion index; edges point from a job to the
/// jobs that depend on it.
#[derive(Debug, Clone, Default)]
pub struct JobGraph {
    jobs: Vec<Job>,
    states: Vec<JobState>,
    index: HashMap<String, usize>,
}

impl JobGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph for a set of units: one align and one dependent filter job each
    pub fn from_units<'a, I>(units: I) -> Result<Self, GraphError>
    where
        I: IntoIterator<Item = &'a ComparisonUnit>,
    {
        let mut graph = Self::new();
        for unit in units {
            graph.add_job(unit.align.clone())?;
            graph.add_job(unit.filter.clone())?;
        }
        graph.validate()?;
        Ok(graph)
    }

    pub fn add_job(&mut self, job: Job) -> Result<usize, GraphError> {
        if self.index.contains_key(&job.id) {
            return Err(GraphError::DuplicateJob(job.id));
        }
        let idx = self.jobs.len();
        self.index.insert(job.id.clone(), idx);
        self.jobs.push(job);
        self.states.push(JobState::Pending);
        Ok(idx)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn job(&self, idx: usize) -> &Job {
        &self.jobs[idx]
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn state(&self, idx: usize) -> JobState {
        self.states[idx]
    }

    pub fn set_state(&mut self, idx: usize, state: JobState) {
        self.states[idx] = state;
    }

    pub fn count_in(&self, state: JobState) -> usize {
        self.states.iter().filter(|s| **s == state).count()
    }

    /// Indices of the jobs each job depends on
    pub fn dependencies_of(&self, idx: usize) -> Result<Vec<usize>, GraphError> {
        let job = &self.jobs[idx];
        job.dependencies
            .iter()
            .map(|dep| {
                self.index_of(dep).ok_or_else(|| GraphError::UnknownDependency {
                    job: job.id.clone(),
                    dependency: dep.clone(),
                })
            })
            .collect()
    }

    /// Reverse adjacency: for each job, the jobs that depend on it
    pub fn dependents(&self) -> Result<Vec<Vec<usize>>, GraphError> {
        let mut dependents = vec![Vec::new(); self.jobs.len()];
        for idx in 0..self.jobs.len() {
            for dep in self.dependencies_of(idx)? {
                dependents[dep].push(idx);
            }
        }
        Ok(dependents)
    }

    /// Kahn's algorithm; any cycle or dangling dependency is an invariant failure
    pub fn topological_order(&self) -> Result<Vec<usize>, GraphError> {
        let dependents = self.dependents()?;
        let mut in_degree: Vec<usize> = (0..self.jobs.len())
            .map(|idx| self.jobs[idx].dependencies.len())
            .collect();

        let mut queue: VecDeque<usize> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == 0)
            .map(|(idx, _)| idx)
            .collect();
        let mut order = Vec::with_capacity(self.jobs.len());

        while let Some(idx) = queue.pop_front() {
            order.push(idx);
            for &next in &dependents[idx] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    queue.push_back(next);
                }
            }
        }

        if order.len() != self.jobs.len() {
            let stuck = (0..self.jobs.len())
                .filter(|idx| in_degree[*idx] > 0)
                .map(|idx| self.jobs[idx].id.clone())
                .collect();
            return Err(GraphError::CycleDetected(stuck));
        }
        Ok(order)
    }

    pub fn validate(&self) -> Result<(), GraphError> {
        self.topological_order().map(|_| ())
    }

    /// Pending jobs whose dependencies have all completed
    pub fn ready_jobs(&self) -> Result<Vec<usize>, GraphError> {
        let mut ready = Vec::new();
        for idx in 0..self.jobs.len() {
            if self.states[idx] != JobState::Pending {
                continue;
            }
            let deps = self.dependencies_of(idx)?;
            if deps.iter().all(|d| self.states[*d].is_complete()) {
                ready.push(idx);
            }
        }
        Ok(ready)
    }

    /// Mark every pending job downstream of `idx` as skipped; returns how many were marked
    pub fn skip_dependents(&mut self, idx: usize, dependents: &[Vec<usize>]) -> usize {
        let mut skipped = 0;
        let mut stack = dependents[idx].clone();
        while let Some(next) = stack.pop() {
            if self.states[next] == JobState::Pending {
                self.states[next] = JobState::Skipped;
                skipped += 1;
                stack.extend(dependents[next].iter().copied());
            }
        }
        skipped
    }

    /// Job indices for one stage, in insertion order
    pub fn stage_jobs(&self, stage: Stage) -> Vec<usize> {
        (0..self.jobs.len())
            .filter(|idx| self.jobs[*idx].stage == stage)
            .collect()
    }

    /// Jobs that failed or were skipped
    pub fn failure_count(&self) -> usize {
        self.count_in(JobState::Failed) + self.count_in(JobState::Skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn job(id: &str, stage: Stage, deps: &[&str]) -> Job {
        let mut job = Job::new(id, stage, format!("run {}", id), PathBuf::from(id));
        for dep in deps {
            job.add_dependency(dep);
        }
        job
    }

    fn pair_graph(pairs: usize) -> JobGraph {
        let mut graph = JobGraph::new();
        for i in 0..pairs {
            let align = format!("a{}", i);
            graph.add_job(job(&align, Stage::Align, &[])).unwrap();
            graph.add_job(job(&format!("f{}", i), Stage::Filter, &[&align])).unwrap();
        }
        graph
    }

    #[test]
    fn test_topological_order_puts_align_first() {
        let graph = pair_graph(3);
        let order = graph.topological_order().unwrap();
        assert_eq!(order.len(), 6);

        let position: HashMap<usize, usize> =
            order.iter().enumerate().map(|(pos, idx)| (*idx, pos)).collect();
        for i in 0..3 {
            let a = graph.index_of(&format!("a{}", i)).unwrap();
            let f = graph.index_of(&format!("f{}", i)).unwrap();
            assert!(position[&a] < position[&f]);
        }
    }

    #[test]
    fn test_cycle_is_detected() {
        let mut graph = JobGraph::new();
        graph.add_job(job("x", Stage::Align, &["y"])).unwrap();
        graph.add_job(job("y", Stage::Filter, &["x"])).unwrap();

        match graph.validate() {
            Err(GraphError::CycleDetected(ids)) => assert_eq!(ids.len(), 2),
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_dependency_and_duplicates() {
        let mut graph = JobGraph::new();
        graph.add_job(job("f", Stage::Filter, &["missing"])).unwrap();
        assert!(matches!(graph.validate(), Err(GraphError::UnknownDependency { .. })));
        assert_eq!(
            graph.add_job(job("f", Stage::Filter, &[])),
            Err(GraphError::DuplicateJob("f".to_string()))
        );
    }

    #[test]
    fn test_ready_jobs_follow_completion() {
        let mut graph = pair_graph(2);
        let ready = graph.ready_jobs().unwrap();
        assert_eq!(ready, graph.stage_jobs(Stage::Align));

        let a0 = graph.index_of("a0").unwrap();
        graph.set_state(a0, JobState::Running);
        assert_eq!(graph.ready_jobs().unwrap(), vec![graph.index_of("a1").unwrap()]);

        graph.set_state(a0, JobState::Done);
        let ready = graph.ready_jobs().unwrap();
        assert!(ready.contains(&graph.index_of("f0").unwrap()));
    }

    #[test]
    fn test_skip_dependents_is_transitive() {
        let mut graph = JobGraph::new();
        graph.add_job(job("a", Stage::Align, &[])).unwrap();
        graph.add_job(job("b", Stage::Filter, &["a"])).unwrap();
        graph.add_job(job("c", Stage::Filter, &["b"])).unwrap();
        graph.add_job(job("d", Stage::Align, &[])).unwrap();
        let dependents = graph.dependents().unwrap();

        graph.set_state(0, JobState::Failed);
        assert_eq!(graph.skip_dependents(0, &dependents), 2);
        assert_eq!(graph.state(2), JobState::Skipped);
        assert_eq!(graph.state(3), JobState::Pending);
        assert_eq!(graph.failure_count(), 3);
    }
}
