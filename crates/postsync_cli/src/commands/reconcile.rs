//! Reconcile command implementation.

use super::read_json;
use postsync_core::{PostRecord, RemotePost};
use postsync_reconcile::{Plan, ReconcilePolicy, Reconciler};
use std::fmt::Write as _;
use std::path::Path;

/// Runs the reconcile command.
pub fn run(
    local: &Path,
    remote: &Path,
    overwrite: bool,
    purge: bool,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let local: Vec<PostRecord> = read_json(local)?;
    let remote: Vec<RemotePost> = read_json(remote)?;

    let policy = ReconcilePolicy::new()
        .with_overwrite(overwrite)
        .with_purge_existing(purge);
    let plan = Reconciler::new(policy).reconcile(&local, &remote)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&plan)?),
        _ => print!("{}", render_text(&plan)),
    }
    Ok(())
}

/// Renders a plan as human-readable text.
pub fn render_text(plan: &Plan) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Plan: {}", plan.counts());

    for record in &plan.inserts {
        let remote = record
            .remote_id
            .map_or_else(|| "-".to_string(), |id| id.to_string());
        let _ = writeln!(out, "  insert  {remote}  {:?}", record.fields.title);
    }
    for update in &plan.updates {
        let _ = writeln!(
            out,
            "  update  {}  {:?} ({:?}, {:?})",
            update.target, update.record.fields.title, update.matched_by, update.outcome
        );
    }
    for delete in &plan.deletes {
        let remote = delete
            .remote_id
            .map_or_else(|| "-".to_string(), |id| id.to_string());
        let _ = writeln!(out, "  delete  {}  {remote}", delete.target);
    }
    for conflict in &plan.conflicts {
        let _ = writeln!(
            out,
            "  conflict  {}  {}  {}: local {:?} vs remote {:?}",
            conflict.target,
            conflict.remote_id,
            conflict.reason,
            conflict.local_fields.title,
            conflict.remote_fields.title
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use postsync_testkit::prelude::*;

    #[test]
    fn text_lists_every_operation() {
        let draft = RecordBuilder::draft(blog(1)).title("Draft").build();
        let stale = RecordBuilder::synced(blog(1), 9, 10).build();
        let remote = vec![
            RemoteBuilder::new(blog(1), 42, 100)
                .title("Published")
                .correlation(draft.foreign_id)
                .build(),
            RemoteBuilder::new(blog(1), 43, 100).title("Fresh").build(),
        ];
        let policy = ReconcilePolicy::new().with_purge_existing(true);
        let plan = Reconciler::new(policy)
            .reconcile(&[draft, stale], &remote)
            .unwrap();

        let text = render_text(&plan);
        assert!(text.starts_with("Plan: 1 inserted, 1 updated, 1 deleted, 0 conflicts"));
        assert!(text.contains("insert  post:43  \"Fresh\""));
        assert!(text.contains("\"Published\""));
        assert!(text.contains("delete"));
    }

    #[test]
    fn reads_json_files() {
        let dir = tempfile::tempdir().unwrap();
        let local_path = dir.path().join("local.json");
        let remote_path = dir.path().join("remote.json");

        let local = vec![RecordBuilder::synced(blog(1), 1, 10).build()];
        let remote = vec![RemoteBuilder::new(blog(1), 1, 20).title("New").build()];
        std::fs::write(&local_path, serde_json::to_string(&local).unwrap()).unwrap();
        std::fs::write(&remote_path, serde_json::to_string(&remote).unwrap()).unwrap();

        run(&local_path, &remote_path, false, false, "json").unwrap();

        let missing = dir.path().join("missing.json");
        let err = run(&missing, &remote_path, false, false, "text").unwrap_err();
        assert!(err.to_string().contains("cannot open"));
    }
}
