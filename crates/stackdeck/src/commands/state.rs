use std::fmt::Write as _;

use stackdeck_core::{DeploymentState, StackConfig};

pub fn state(config: &StackConfig, json: bool) -> anyhow::Result<()> {
    let state = super::open_store(config)?.get_state();
    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        print!("{}", format_state(&state));
    }
    Ok(())
}

/// Human-readable snapshot: a summary line and one row per service.
pub fn format_state(state: &DeploymentState) -> String {
    let name_width = state
        .services
        .iter()
        .map(|s| s.name.len())
        .max()
        .unwrap_or(0)
        .max("SERVICE".len());
    let image_width = state
        .services
        .iter()
        .map(|s| s.image.len())
        .max()
        .unwrap_or(0)
        .max("IMAGE".len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} pods across {} services on {} nodes ({})",
        state.total_pods,
        state.services.len(),
        state.nodes,
        if state.databases.is_empty() { "no databases" } else { &state.databases },
    );
    let _ = writeln!(
        out,
        "Last deployment: {}",
        state
            .last_deployment
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".to_string())
    );
    let _ = writeln!(
        out,
        "{:<name_width$}  {:>8}  {:<8}  {:<image_width$}  LAST UPDATE",
        "SERVICE", "REPLICAS", "STATUS", "IMAGE"
    );
    for svc in &state.services {
        let _ = writeln!(
            out,
            "{:<name_width$}  {:>8}  {:<8}  {:<image_width$}  {}",
            svc.name, svc.replicas, svc.status, svc.image, svc.last_update
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackdeck_state::DeploymentStore;

    #[test]
    fn summary_and_rows() {
        let state = DeploymentStore::with_defaults().get_state();
        let text = format_state(&state);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "10 pods across 6 services on 3 nodes (MySQL + MongoDB)");
        assert_eq!(lines[1], "Last deployment: never");
        assert!(lines[2].starts_with("SERVICE"));
        assert_eq!(lines.len(), 3 + 6);
        assert!(lines[3].starts_with("wordpress "));
        assert!(lines[3].contains("running"));
    }
}
