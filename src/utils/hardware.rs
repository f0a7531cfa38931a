use serde::Serialize;
use sysinfo::System;

/// Snapshot of the load generator's own host, attached to every report so a
/// saturated client can be told apart from a slow target.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HostInfo {
    pub cpu_cores: u64,
    pub total_memory_bytes: u64,
    pub available_memory_bytes: u64,
}

pub fn get_hardware_info() -> HostInfo {
    let mut sys = System::new();
    sys.refresh_cpu();
    sys.refresh_memory();

    HostInfo {
        cpu_cores: sys.cpus().len() as u64,
        total_memory_bytes: sys.total_memory(),
        available_memory_bytes: sys.available_memory(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_at_least_one_core() {
        let info = get_hardware_info();
        assert!(info.cpu_cores >= 1);
        assert!(info.total_memory_bytes >= info.available_memory_bytes);
    }
}
