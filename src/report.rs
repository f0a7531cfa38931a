use colored::*;
use std::path::Path;

use crate::error::{LoadError, Result};
use crate::models::metrics::Metrics;

pub fn print_summary(metrics: &Metrics) {
    let checks_line = format!(
        "{:.2}% ({} passed / {} failed)",
        metrics.pass_rate * 100.0,
        metrics.checks_passed,
        metrics.checks_failed
    );
    let checks_line = if metrics.checks_failed == 0 {
        checks_line.green().bold()
    } else {
        checks_line.red().bold()
    };

    println!();
    println!("\x1b[1;97;44m🔥 ======== TEST RESULTS ======== 🔥\x1b[0m");
    println!("\x1b[1;94m⏰ Timestamp                : \x1b[0m\x1b[1;97m{}\x1b[0m", metrics.timestamp);
    println!("\x1b[1;94m🎯 Target                   : \x1b[0m\x1b[1;97m{}\x1b[0m", metrics.target_url);
    println!(
        "\x1b[1;94m👥 VUs / duration / max RPS : \x1b[0m\x1b[1;97m{} / {}s / {}\x1b[0m",
        metrics.vus,
        metrics.duration_secs,
        if metrics.max_rps == 0 { "unlimited".to_string() } else { metrics.max_rps.to_string() }
    );
    println!("{} {}", format!("✔  status is {:<13}:", metrics.expected_status).bold(), checks_line);
    println!("\x1b[1;92m✅ Total requests           : \x1b[0m\x1b[1;97m{}\x1b[0m", metrics.total_requests);
    println!("\x1b[1;96m⚡ Fastest response (ms)    : \x1b[0m\x1b[1;97m{:.2}\x1b[0m", metrics.latency.min);
    println!("\x1b[1;93m🐢 Slowest response (ms)    : \x1b[0m\x1b[1;97m{:.2}\x1b[0m", metrics.latency.max);
    println!("\x1b[1;95m📊 Average response (ms)    : \x1b[0m\x1b[1;97m{:.2}\x1b[0m", metrics.latency.avg);
    println!("\x1b[1;95m📊 Median response time (ms): \x1b[0m\x1b[1;97m{:.2}\x1b[0m", metrics.latency.median);
    println!(
        "\x1b[1;95m📊 p(90) / p(95) (ms)      : \x1b[0m\x1b[1;97m{:.2} / {:.2}\x1b[0m",
        metrics.latency.p90, metrics.latency.p95
    );
    println!("\x1b[1;94m📈 Requests per second (RPS): \x1b[0m\x1b[1;97m{:.2}\x1b[0m", metrics.throughput);
    println!("\x1b[1;94m⌛ Elapsed (s)              : \x1b[0m\x1b[1;97m{:.2}\x1b[0m", metrics.elapsed_secs);
    println!("\x1b[1;94m📥 Data received (bytes)    : \x1b[0m\x1b[1;97m{}\x1b[0m", metrics.bytes_received);
    println!("\x1b[1;94m🔀 Peak in-flight requests  : \x1b[0m\x1b[1;97m{}\x1b[0m", metrics.max_in_flight);

    println!();
    println!("\x1b[1;97;44m📦 ======== STATUS BREAKDOWN ========\x1b[0m");
    let mut statuses: Vec<_> = metrics.status_counts.iter().collect();
    statuses.sort();
    for (status, count) in statuses {
        println!("\x1b[1;97m• {}: {}\x1b[0m", status, count);
    }

    println!();
    println!("\x1b[1;97;44m🖥  ======== LOAD GENERATOR HOST ========\x1b[0m");
    println!(
        "\x1b[1;97m• cpu cores: {} | memory: {} MiB free of {} MiB\x1b[0m",
        metrics.host.cpu_cores,
        metrics.host.available_memory_bytes / (1024 * 1024),
        metrics.host.total_memory_bytes / (1024 * 1024)
    );
}

/// Writes the report as pretty JSON, the same document worker mode sends back.
pub fn export_summary(metrics: &Metrics, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(metrics)?;
    std::fs::write(path, json).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}
