mod worklist_interpreter;

pub use worklist_interpreter::{eval_value, refine_branch, run_fixpoint, step, FixpointResult, State};
