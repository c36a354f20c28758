//! Pipeline builder with validation.

use super::Pipeline;
use crate::errors::{ContractErrorInfo, CycleDetectedError, PipelineValidationError};
use crate::stages::StageSpec;
use std::collections::{HashMap, HashSet};

/// Builder for creating validated pipelines.
///
/// Stages are collected in declaration order; every check runs in
/// [`PipelineBuilder::build`], so a pipeline that builds is safe to execute.
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    /// The pipeline name.
    name: String,
    /// The stage specifications, in declaration order.
    stages: Vec<StageSpec>,
}

impl PipelineBuilder {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
        }
    }

    /// Adds a stage to the pipeline.
    #[must_use]
    pub fn stage(mut self, spec: StageSpec) -> Self {
        self.stages.push(spec);
        self
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Builds the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the pipeline is empty, a stage is invalid, names
    /// collide, or the context references are unknown, cyclic, or point at a
    /// later stage.
    pub fn build(self) -> Result<Pipeline, PipelineValidationError> {
        if self.stages.is_empty() {
            return Err(PipelineValidationError::new("Pipeline has no stages")
                .with_error_info(
                    ContractErrorInfo::new("CONTRACT-EMPTY", "Cannot build an empty pipeline")
                        .with_fix_hint("Add at least one stage to the pipeline before building."),
                ));
        }

        for spec in &self.stages {
            spec.validate()?;
        }

        let mut positions: HashMap<&str, usize> = HashMap::new();
        for (index, spec) in self.stages.iter().enumerate() {
            if positions.insert(spec.name.as_str(), index).is_some() {
                return Err(PipelineValidationError::new(format!(
                    "Stage '{}' is declared more than once",
                    spec.name
                ))
                .with_stages(vec![spec.name.clone()])
                .with_error_info(
                    ContractErrorInfo::new(
                        "CONTRACT-DUPLICATE",
                        format!("Duplicate stage name '{}'", spec.name),
                    )
                    .with_fix_hint("Give every stage a unique name."),
                ));
            }
        }

        for spec in &self.stages {
            for dep in &spec.context {
                if !positions.contains_key(dep.as_str()) {
                    return Err(PipelineValidationError::new(format!(
                        "Stage '{}' takes context from unknown stage '{}'",
                        spec.name, dep
                    ))
                    .with_stages(vec![spec.name.clone(), dep.clone()])
                    .with_error_info(
                        ContractErrorInfo::new(
                            "CONTRACT-MISSING_DEP",
                            format!("Context stage '{}' not found", dep),
                        )
                        .with_fix_hint("Declare the context stage in the same pipeline."),
                    ));
                }
            }
        }

        self.detect_cycles(&positions)?;

        for (index, spec) in self.stages.iter().enumerate() {
            for dep in &spec.context {
                if positions.get(dep.as_str()).is_some_and(|&at| at > index) {
                    return Err(PipelineValidationError::new(format!(
                        "Stage '{}' takes context from '{}', which runs after it",
                        spec.name, dep
                    ))
                    .with_stages(vec![spec.name.clone(), dep.clone()])
                    .with_error_info(
                        ContractErrorInfo::new(
                            "CONTRACT-FORWARD_REF",
                            format!("Context stage '{}' is declared later", dep),
                        )
                        .with_fix_hint(
                            "Stages run in declaration order; move the context stage earlier.",
                        )
                        .with_context_entry("stage", spec.name.clone())
                        .with_context_entry("context", dep.clone()),
                    ));
                }
            }
        }

        Ok(Pipeline::new(self.name, self.stages))
    }

    /// Detects cycles in the context graph.
    fn detect_cycles(&self, positions: &HashMap<&str, usize>) -> Result<(), CycleDetectedError> {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();
        let mut path = Vec::new();

        for spec in &self.stages {
            if !visited.contains(spec.name.as_str()) {
                if let Some(cycle) =
                    self.dfs_cycle(&spec.name, positions, &mut visited, &mut rec_stack, &mut path)
                {
                    return Err(CycleDetectedError::new(cycle));
                }
            }
        }

        Ok(())
    }

    fn dfs_cycle<'a>(
        &'a self,
        node: &'a str,
        positions: &HashMap<&str, usize>,
        visited: &mut HashSet<&'a str>,
        rec_stack: &mut HashSet<&'a str>,
        path: &mut Vec<&'a str>,
    ) -> Option<Vec<String>> {
        visited.insert(node);
        rec_stack.insert(node);
        path.push(node);

        if let Some(spec) = positions.get(node).map(|&index| &self.stages[index]) {
            for dep in &spec.context {
                let dep = dep.as_str();
                if !visited.contains(dep) {
                    if let Some(cycle) = self.dfs_cycle(dep, positions, visited, rec_stack, path) {
                        return Some(cycle);
                    }
                } else if rec_stack.contains(dep) {
                    if let Some(start) = path.iter().position(|n| *n == dep) {
                        let mut cycle: Vec<String> =
                            path[start..].iter().map(|n| (*n).to_string()).collect();
                        cycle.push(dep.to_string());
                        return Some(cycle);
                    }
                }
            }
        }

        path.pop();
        rec_stack.remove(node);
        None
    }
}
