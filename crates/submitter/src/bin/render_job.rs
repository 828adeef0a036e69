//! render-job: print the plan of a task declaration
//!
//! Usage: `render-job <task.json> [config.json]`
//!
//! Prints the task type, then the `PyTorchJob` manifest for distributed
//! plans. Nothing is sent to a cluster.

use adapter_core::telemetry::init_tracing;
use adapter_core::AdapterConfig;
use submitter::{Planner, SubmissionPlan, TaskDeclaration};

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_tracing("render_job=info,submitter=info,job_spec=info")?;

    let mut args = std::env::args().skip(1);
    let task_path = args
        .next()
        .ok_or("usage: render-job <task.json> [config.json]")?;
    let config = match args.next() {
        Some(path) => AdapterConfig::from_file(path)?,
        None => AdapterConfig::default(),
    };

    let raw = std::fs::read_to_string(&task_path)?;
    let declaration: TaskDeclaration = serde_json::from_str(&raw)?;

    let planner = Planner::new(config.job.clone());
    let plan = planner.plan_declaration(&declaration)?;

    println!("task_type: {}", plan.task_type());
    if let SubmissionPlan::Distributed(submission) = &plan {
        let job = submission.to_resource(&config.submit.namespace);
        println!("{}", serde_json::to_string_pretty(&job)?);
    }

    Ok(())
}
