//! Human-readable rendering

use sophia_config_core::{
    ConfigurationReport, DetectedEnvironment, HealthCheckResult, PersistSummary, RepairAction, ResolvedEntries,
};

pub fn print_detected(detected: &DetectedEnvironment) {
    println!(
        "environment: {} (via {})",
        detected.environment, detected.strategy
    );
    println!("context:     {}", detected.context_path());
}

pub fn print_entries(entries: &ResolvedEntries) {
    let width = entries.keys().map(String::len).max().unwrap_or(0);
    for entry in entries.values() {
        println!(
            "  {:<width$}  {:<24}  {}",
            entry.key,
            entry.display_value(),
            entry.source_detail,
            width = width
        );
    }
}

pub fn print_health(health: &HealthCheckResult) {
    println!("health: {}", health.level());
    for (name, check) in &health.checks {
        let mark = if check.ok { "ok  " } else { "FAIL" };
        match &check.detail {
            Some(detail) => println!("  [{}] {} ({} ms): {}", mark, name, check.latency_ms, detail),
            None => println!("  [{}] {} ({} ms)", mark, name, check.latency_ms),
        }
    }
}

pub fn print_repairs(repairs: &[RepairAction]) {
    if repairs.is_empty() {
        println!("nothing to repair");
        return;
    }
    for action in repairs {
        let status = match (action.attempted, action.succeeded) {
            (false, _) => "skipped",
            (true, true) => "done",
            (true, false) => "failed",
        };
        println!("  {:<26} {:<8} {}", action.name, status, action.detail);
    }
}

fn print_list(title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("{}:", title);
    for item in items {
        println!("  - {}", item);
    }
}

pub fn print_report(report: &ConfigurationReport, entries: &ResolvedEntries) {
    if let (Some(environment), Some(stack)) = (report.environment, &report.stack) {
        println!(
            "environment: {} ({}/{})",
            environment,
            report.organization.as_deref().unwrap_or("-"),
            stack
        );
    }
    println!(
        "status:      {} ({}/{} keys loaded)",
        report.health_level, report.loaded_count, report.total_schema_keys
    );
    println!();
    print_entries(entries);
    println!();

    if let Some(health) = &report.health {
        print_health(health);
    }
    if !report.repairs.is_empty() {
        println!("repairs:");
        print_repairs(&report.repairs);
    }

    print_list("errors", &report.errors);
    print_list("warnings", &report.warnings);
    print_list("recommendations", &report.recommendations);
}

pub fn print_persist(summary: &PersistSummary) {
    for path in &summary.updated {
        println!("updated   {}", path.display());
    }
    for path in &summary.unchanged {
        println!("unchanged {}", path.display());
    }
    for (path, reason) in &summary.failed {
        println!("failed    {}: {}", path.display(), reason);
    }
    if summary.updated.is_empty() && summary.unchanged.is_empty() && summary.failed.is_empty() {
        println!("no shell profiles found");
    }
}
