//! Batching plan for a parsed script.
//!
//! Programs on the multiplex list are queued; a run of consecutive lines with
//! the same program name forms one batch, closed by a synchronization as soon
//! as the next command names a different program or the script ends. Every
//! other program runs immediately on its own. Blank and comment lines keep
//! their slot in the progress count but do not break a batch.

use crate::script::{matches_prefix_list, ParsedLine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanStep {
    /// Run the task for this line synchronously, outside any batch
    RunImmediately { line: usize },
    /// Append the task for this line to the pending queue
    Enqueue { line: usize },
    /// Run the pending queue to completion
    Synchronize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionPlan {
    steps: Vec<PlanStep>,
}

impl ExecutionPlan {
    pub fn build<S: AsRef<str>>(lines: &[ParsedLine], multiplex: &[S]) -> Self {
        // next_program[i]: program of the first command line after i
        let mut next_program: Vec<Option<&str>> = vec![None; lines.len()];
        let mut following = None;
        for (index, line) in lines.iter().enumerate().rev() {
            next_program[index] = following;
            if let Some(program) = line.program() {
                following = Some(program);
            }
        }

        let mut steps = Vec::new();
        let mut queued = 0usize;

        for (index, line) in lines.iter().enumerate() {
            let Some(program) = line.program() else {
                continue;
            };

            if !matches_prefix_list(program, multiplex) {
                steps.push(PlanStep::RunImmediately { line: index });
                continue;
            }

            steps.push(PlanStep::Enqueue { line: index });
            queued += 1;

            if next_program[index] != Some(program) {
                steps.push(PlanStep::Synchronize);
                queued = 0;
            }
        }

        if queued > 0 {
            steps.push(PlanStep::Synchronize);
        }

        Self { steps }
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn synchronize_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| matches!(step, PlanStep::Synchronize))
            .count()
    }

    pub fn task_count(&self) -> usize {
        self.steps.len() - self.synchronize_count()
    }
}
