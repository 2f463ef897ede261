//! Named tasks with declared dependencies, run in dependency order.
//!
//! A [`TaskGraph`] is an explicit registry: tasks are values registered one
//! by one, dependencies may name tasks registered later, and the whole
//! relation is validated (unknown names, cycles) before any action executes.
//! Within one run every task executes at most once; ties between tasks whose
//! dependencies are all satisfied are broken by registration order.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use crate::error::EngineError;

/// A unit of pipeline work.
pub trait Task<C> {
    /// Unique name; also the target name used to run it.
    fn name(&self) -> &str;

    /// Names of tasks that must complete before this one, in declared order.
    fn dependencies(&self) -> &[String];

    /// One-line human description for task listings.
    fn description(&self) -> &str;

    /// Execute the task against the run context.
    ///
    /// # Errors
    /// Any error aborts the run.
    fn run(&self, ctx: &mut C) -> Result<(), EngineError>;
}

/// Boxed task action.
pub type Action<C> = Box<dyn Fn(&mut C) -> Result<(), EngineError>>;

/// A closure-backed [`Task`]. Without an action it is a composite task that
/// only groups its dependencies.
pub struct Step<C> {
    name: String,
    depends_on: Vec<String>,
    description: String,
    action: Option<Action<C>>,
}

impl<C> Step<C> {
    /// Create a task with no dependencies and no action.
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_owned(),
            depends_on: Vec::new(),
            description: description.to_owned(),
            action: None,
        }
    }

    /// Set the dependency list, replacing any previous one.
    pub fn depends_on<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.depends_on = names.iter().map(|n| n.as_ref().to_owned()).collect();
        self
    }

    /// Attach the work this task performs.
    pub fn action<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut C) -> Result<(), EngineError> + 'static,
    {
        self.action = Some(Box::new(f));
        self
    }
}

impl<C> Task<C> for Step<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> &[String] {
        &self.depends_on
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn run(&self, ctx: &mut C) -> Result<(), EngineError> {
        match &self.action {
            Some(action) => action(ctx),
            None => Ok(()),
        }
    }
}

/// Which tasks a run executed, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub executed: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Registry of tasks and the engine that orders and executes them.
pub struct TaskGraph<C> {
    tasks: Vec<Box<dyn Task<C>>>,
    index: HashMap<String, usize>,
}

impl<C> Default for TaskGraph<C> {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<C> TaskGraph<C> {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task. Its dependencies are checked when the graph runs.
    ///
    /// # Errors
    /// Returns `EngineError::DuplicateTask` if the name is taken.
    pub fn register<T>(&mut self, task: T) -> Result<(), EngineError>
    where
        T: Task<C> + 'static,
    {
        let name = task.name().to_owned();
        if self.index.contains_key(&name) {
            return Err(EngineError::DuplicateTask { name });
        }
        self.index.insert(name, self.tasks.len());
        self.tasks.push(Box::new(task));
        Ok(())
    }

    /// Registered tasks in registration order.
    pub fn tasks(&self) -> &[Box<dyn Task<C>>] {
        &self.tasks
    }

    /// Check every dependency names a registered task and the relation is acyclic.
    ///
    /// # Errors
    /// Returns `UnknownDependency` or `DependencyCycle`.
    pub fn validate(&self) -> Result<(), EngineError> {
        let edges = self.edges()?;
        let mut marks = vec![Mark::Unvisited; self.tasks.len()];
        let mut stack = Vec::new();
        for start in 0..self.tasks.len() {
            self.visit(start, &edges, &mut marks, &mut stack)?;
        }
        Ok(())
    }

    /// Resolve each task's dependency names to indices.
    fn edges(&self) -> Result<Vec<Vec<usize>>, EngineError> {
        self.tasks
            .iter()
            .map(|task| {
                task.dependencies()
                    .iter()
                    .map(|dep| {
                        self.index.get(dep).copied().ok_or_else(|| {
                            EngineError::UnknownDependency {
                                task: task.name().to_owned(),
                                dependency: dep.clone(),
                            }
                        })
                    })
                    .collect()
            })
            .collect()
    }

    /// DFS with three-state marking; a back edge to an in-progress task is a cycle.
    fn visit(
        &self,
        node: usize,
        edges: &[Vec<usize>],
        marks: &mut [Mark],
        stack: &mut Vec<usize>,
    ) -> Result<(), EngineError> {
        match marks.get(node).copied() {
            Some(Mark::Done) | None => return Ok(()),
            Some(Mark::InProgress) => {
                let start = stack.iter().position(|n| *n == node).unwrap_or(0);
                let mut cycle: Vec<&str> = stack
                    .get(start..)
                    .unwrap_or_default()
                    .iter()
                    .map(|n| self.task_name(*n))
                    .collect();
                cycle.push(self.task_name(node));
                return Err(EngineError::DependencyCycle {
                    cycle: cycle.join(" -> "),
                });
            }
            Some(Mark::Unvisited) => {}
        }

        if let Some(mark) = marks.get_mut(node) {
            *mark = Mark::InProgress;
        }
        stack.push(node);
        for dep in edges.get(node).map(Vec::as_slice).unwrap_or_default() {
            self.visit(*dep, edges, marks, stack)?;
        }
        stack.pop();
        if let Some(mark) = marks.get_mut(node) {
            *mark = Mark::Done;
        }
        Ok(())
    }

    fn task_name(&self, index: usize) -> &str {
        self.tasks.get(index).map_or("?", |t| t.name())
    }

    /// Compute the execution order for `targets` without running anything.
    ///
    /// The order covers the transitive dependency closure of all targets;
    /// each task appears once, after all its dependencies.
    ///
    /// # Errors
    /// Returns a configuration error for unknown targets, unknown
    /// dependencies, or cycles anywhere in the graph.
    pub fn plan<S: AsRef<str>>(&self, targets: &[S]) -> Result<Vec<&str>, EngineError> {
        let roots = targets
            .iter()
            .map(|t| {
                let name = t.as_ref();
                self.index
                    .get(name)
                    .copied()
                    .ok_or_else(|| EngineError::UnknownTarget {
                        name: name.to_owned(),
                        available: self.names().join(", "),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.validate()?;
        let edges = self.edges()?;

        // Transitive closure of the targets.
        let mut in_closure = vec![false; self.tasks.len()];
        let mut pending = roots;
        while let Some(node) = pending.pop() {
            let Some(slot) = in_closure.get_mut(node) else {
                continue;
            };
            if *slot {
                continue;
            }
            *slot = true;
            pending.extend(edges.get(node).map(Vec::as_slice).unwrap_or_default());
        }

        // Kahn's algorithm over the closure, always taking the earliest-registered ready task.
        let mut waiting_on = vec![0usize; self.tasks.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.tasks.len()];
        for (node, deps) in edges.iter().enumerate() {
            if !in_closure.get(node).copied().unwrap_or(false) {
                continue;
            }
            let mut unique = deps.clone();
            unique.sort_unstable();
            unique.dedup();
            if let Some(count) = waiting_on.get_mut(node) {
                *count = unique.len();
            }
            for dep in unique {
                if let Some(list) = dependents.get_mut(dep) {
                    list.push(node);
                }
            }
        }

        let mut ready: BinaryHeap<Reverse<usize>> = (0..self.tasks.len())
            .filter(|n| {
                in_closure.get(*n).copied().unwrap_or(false)
                    && waiting_on.get(*n).copied() == Some(0)
            })
            .map(Reverse)
            .collect();

        let mut order = Vec::new();
        while let Some(Reverse(node)) = ready.pop() {
            order.push(self.task_name(node));
            for dependent in dependents.get(node).map(Vec::as_slice).unwrap_or_default() {
                if let Some(count) = waiting_on.get_mut(*dependent) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        ready.push(Reverse(*dependent));
                    }
                }
            }
        }
        Ok(order)
    }

    /// Run `target` and its transitive dependencies.
    ///
    /// # Errors
    /// Returns a configuration error before any task executes, or
    /// `EngineError::TaskFailed` naming the first task whose action failed.
    pub fn run(&self, target: &str, ctx: &mut C) -> Result<RunReport, EngineError> {
        self.run_targets(&[target], ctx)
    }

    /// Run several targets in one run; shared dependencies still execute once.
    ///
    /// # Errors
    /// Same as [`TaskGraph::run`].
    pub fn run_targets<S: AsRef<str>>(
        &self,
        targets: &[S],
        ctx: &mut C,
    ) -> Result<RunReport, EngineError> {
        self.run_targets_with(targets, ctx, |_| {})
    }

    /// Like [`TaskGraph::run_targets`], calling `on_start` with each task name
    /// just before the task runs.
    ///
    /// # Errors
    /// Same as [`TaskGraph::run`].
    pub fn run_targets_with<S, F>(
        &self,
        targets: &[S],
        ctx: &mut C,
        mut on_start: F,
    ) -> Result<RunReport, EngineError>
    where
        S: AsRef<str>,
        F: FnMut(&str),
    {
        let order = self.plan(targets)?;
        tracing::debug!(?order, "resolved task order");

        let mut report = RunReport::default();
        for name in order {
            let Some(task) = self.index.get(name).and_then(|i| self.tasks.get(*i)) else {
                continue;
            };
            on_start(name);
            tracing::info!(task = name, "running task");
            task.run(ctx).map_err(|source| EngineError::TaskFailed {
                task: name.to_owned(),
                source: Box::new(source),
            })?;
            tracing::info!(task = name, "finished task");
            report.executed.push(name.to_owned());
        }
        Ok(report)
    }

    fn names(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.name()).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    type Log = Vec<String>;

    fn logging(name: &str, deps: &[&str]) -> Step<Log> {
        let owned = name.to_owned();
        Step::new(name, "")
            .depends_on(deps)
            .action(move |log: &mut Log| {
                log.push(owned.clone());
                Ok(())
            })
    }

    fn graph(steps: Vec<Step<Log>>) -> TaskGraph<Log> {
        let mut g = TaskGraph::new();
        for step in steps {
            g.register(step).unwrap();
        }
        g
    }

    #[test]
    fn dependencies_run_before_dependents() {
        let g = graph(vec![
            logging("clean", &[]),
            logging("version", &[]),
            logging("build", &[]),
            logging("compile", &["version", "build"]),
            logging("tests", &["compile"]),
        ]);
        let mut log = Log::new();
        let report = g.run("tests", &mut log).unwrap();
        assert_eq!(log, vec!["version", "build", "compile", "tests"]);
        assert_eq!(report.executed, log);
    }

    #[test]
    fn diamond_dependency_runs_once() {
        let g = graph(vec![
            logging("base", &[]),
            logging("left", &["base"]),
            logging("right", &["base"]),
            logging("top", &["left", "right"]),
        ]);
        let mut log = Log::new();
        g.run("top", &mut log).unwrap();
        assert_eq!(log, vec!["base", "left", "right", "top"]);
    }

    #[test]
    fn ties_follow_registration_order() {
        let g = graph(vec![
            logging("z", &[]),
            logging("a", &[]),
            logging("m", &[]),
            logging("all", &["m", "a", "z"]),
        ]);
        let mut log = Log::new();
        g.run("all", &mut log).unwrap();
        assert_eq!(log, vec!["z", "a", "m", "all"]);
    }

    #[test]
    fn only_the_target_closure_runs() {
        let g = graph(vec![
            logging("a", &[]),
            logging("b", &["a"]),
            logging("unrelated", &[]),
        ]);
        let mut log = Log::new();
        g.run("b", &mut log).unwrap();
        assert_eq!(log, vec!["a", "b"]);
    }

    #[test]
    fn composite_task_is_a_no_op() {
        let mut g = graph(vec![logging("a", &[]), logging("b", &[])]);
        let composite = Step::new("default", "a then b").depends_on(&["a", "b"]);
        g.register(composite).unwrap();

        let mut log = Log::new();
        let report = g.run("default", &mut log).unwrap();
        assert_eq!(log, vec!["a", "b"]);
        assert_eq!(report.executed, vec!["a", "b", "default"]);
    }

    #[test]
    fn run_reports_each_task_before_it_runs() {
        let mut g = graph(vec![
            logging("clean", &[]),
            logging("compile", &[]),
            logging("tests", &["compile"]),
        ]);
        g.register(
            Step::new("broken", "")
                .depends_on(&["tests"])
                .action(|_: &mut Log| Err(EngineError::DuplicateTask { name: "x".to_owned() })),
        )
        .unwrap();

        let mut started = Vec::new();
        let mut log = Log::new();
        let report = g
            .run_targets_with(&["tests", "clean"], &mut log, |name| started.push(name.to_owned()))
            .unwrap();
        assert_eq!(started, vec!["clean", "compile", "tests"]);
        assert_eq!(started, report.executed);

        started.clear();
        let err = g
            .run_targets_with(&["broken"], &mut log, |name| started.push(name.to_owned()))
            .unwrap_err();
        assert_eq!(err.failed_task(), Some("broken"));
        assert_eq!(started, vec!["compile", "tests", "broken"]);
    }

    #[test]
    fn each_run_executes_tasks_again() {
        let g = graph(vec![logging("a", &[])]);
        let mut log = Log::new();
        g.run("a", &mut log).unwrap();
        g.run("a", &mut log).unwrap();
        assert_eq!(log, vec!["a", "a"]);
    }

    #[test]
    fn run_targets_shares_dependencies() {
        let g = graph(vec![
            logging("clean", &[]),
            logging("compile", &["clean"]),
            logging("tests", &["compile"]),
        ]);
        let mut log = Log::new();
        g.run_targets(&["compile", "tests"], &mut log).unwrap();
        assert_eq!(log, vec!["clean", "compile", "tests"]);
    }

    #[test]
    fn cycle_fails_before_any_action() {
        let g = graph(vec![
            logging("a", &["c"]),
            logging("b", &["a"]),
            logging("c", &["b"]),
            logging("d", &[]),
        ]);
        let mut log = Log::new();
        let err = g.run("a", &mut log).unwrap_err();
        assert!(log.is_empty());
        assert!(err.is_configuration());
        match err {
            EngineError::DependencyCycle { cycle } => {
                assert_eq!(cycle, "a -> c -> b -> a");
            }
            other => panic!("expected DependencyCycle, got {other:?}"),
        }
    }

    #[test]
    fn cycle_elsewhere_in_graph_still_fails() {
        let g = graph(vec![
            logging("ok", &[]),
            logging("x", &["y"]),
            logging("y", &["x"]),
        ]);
        let mut log = Log::new();
        assert!(matches!(
            g.run("ok", &mut log),
            Err(EngineError::DependencyCycle { .. })
        ));
        assert!(log.is_empty());
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let g = graph(vec![logging("a", &["a"])]);
        let err = g.plan(&["a"]).unwrap_err();
        assert_eq!(err.to_string(), "task dependency cycle: a -> a");
    }

    #[test]
    fn unknown_dependency_is_a_configuration_error() {
        let g = graph(vec![logging("a", &["missing"])]);
        let mut log = Log::new();
        let err = g.run("a", &mut log).unwrap_err();
        assert_eq!(
            err.to_string(),
            "task `a` depends on unknown task `missing`"
        );
        assert!(log.is_empty());
    }

    #[test]
    fn unknown_target_lists_available() {
        let g = graph(vec![logging("clean", &[]), logging("compile", &[])]);
        let err = g.run("deploy", &mut Log::new()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("`deploy`"), "message was: {message}");
        assert!(message.contains("clean, compile"), "message was: {message}");
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut g = graph(vec![logging("a", &[])]);
        let err = g.register(logging("a", &[])).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateTask { name } if name == "a"));
    }

    #[test]
    fn failure_stops_the_run_and_names_the_task() {
        let mut g = graph(vec![logging("first", &[])]);
        g.register(
            Step::new("broken", "")
                .depends_on(&["first"])
                .action(|_: &mut Log| {
                    Err(EngineError::Descriptor {
                        id: "A".to_owned(),
                        message: "boom".to_owned(),
                    })
                }),
        )
        .unwrap();
        g.register(logging("after", &["broken"])).unwrap();

        let mut log = Log::new();
        let err = g.run("after", &mut log).unwrap_err();
        assert_eq!(log, vec!["first"]);
        assert_eq!(err.failed_task(), Some("broken"));
        match err {
            EngineError::TaskFailed { source, .. } => {
                assert!(matches!(*source, EngineError::Descriptor { .. }));
            }
            other => panic!("expected TaskFailed, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_dependency_entries_are_harmless() {
        let g = graph(vec![logging("a", &[]), logging("b", &["a", "a"])]);
        let mut log = Log::new();
        g.run("b", &mut log).unwrap();
        assert_eq!(log, vec!["a", "b"]);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;
        use std::collections::BTreeSet;

        /// Random DAG: task `i` may depend only on tasks with a smaller index.
        fn dag() -> impl Strategy<Value = Vec<Vec<usize>>> {
            (1usize..12).prop_flat_map(|n| {
                (0..n)
                    .map(|i| proptest::collection::vec(0..i.max(1), 0..=i.min(4)))
                    .collect::<Vec<_>>()
                    .prop_map(|deps| {
                        deps.into_iter()
                            .enumerate()
                            .map(|(i, d)| d.into_iter().filter(|x| *x < i).collect())
                            .collect()
                    })
            })
        }

        fn closure(deps: &[Vec<usize>], target: usize) -> BTreeSet<usize> {
            let mut seen = BTreeSet::new();
            let mut pending = vec![target];
            while let Some(n) = pending.pop() {
                if seen.insert(n) {
                    pending.extend(deps.get(n).cloned().unwrap_or_default());
                }
            }
            seen
        }

        proptest! {
            #[test]
            #[allow(clippy::unwrap_used)]
            fn runs_closure_once_in_dependency_order(deps in dag()) {
                let names: Vec<String> = (0..deps.len()).map(|i| format!("t{i}")).collect();
                let mut g = TaskGraph::new();
                for (i, d) in deps.iter().enumerate() {
                    let dep_names: Vec<&str> = d.iter().map(|x| names.get(*x).unwrap().as_str()).collect();
                    g.register(logging(names.get(i).unwrap(), &dep_names)).unwrap();
                }
                let target = deps.len() - 1;
                let mut log = Log::new();
                g.run(names.get(target).unwrap(), &mut log).unwrap();

                let expected: BTreeSet<String> = closure(&deps, target)
                    .into_iter()
                    .map(|i| names.get(i).unwrap().clone())
                    .collect();
                let ran: BTreeSet<String> = log.iter().cloned().collect();
                prop_assert_eq!(ran.len(), log.len(), "a task ran twice");
                prop_assert_eq!(ran, expected);

                for (i, d) in deps.iter().enumerate() {
                    let Some(pos) = log.iter().position(|n| n == names.get(i).unwrap()) else { continue };
                    for dep in d {
                        let dep_pos = log.iter().position(|n| n == names.get(*dep).unwrap()).unwrap();
                        prop_assert!(dep_pos < pos);
                    }
                }
            }
        }
    }
}
