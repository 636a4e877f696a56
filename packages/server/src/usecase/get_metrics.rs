//! UseCase: インスタンスの状態取得
//!
//! 接続数はハブが公開する統計から、メモリと CPU はプロセスから取得する。

use std::{
    sync::{Mutex, PoisonError},
    time::Instant,
};

use sysinfo::{ProcessesToUpdate, System};

use crate::{domain::InstanceId, infrastructure::hub::HubHandle};

/// Point-in-time view of one instance.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceSnapshot {
    pub instance_id: InstanceId,
    pub open_connections: usize,
    pub accepted_total: u64,
    pub uptime_secs: u64,
    pub memory_bytes: u64,
    pub cpu_percent: f32,
}

pub struct GetMetricsUseCase {
    hub: HubHandle,
    instance_id: InstanceId,
    started_at: Instant,
    system: Mutex<System>,
}

impl GetMetricsUseCase {
    pub fn new(hub: HubHandle, instance_id: InstanceId) -> Self {
        Self {
            hub,
            instance_id,
            started_at: Instant::now(),
            system: Mutex::new(System::new()),
        }
    }

    pub fn execute(&self) -> InstanceSnapshot {
        let stats = self.hub.stats();
        let (memory_bytes, cpu_percent) = self.process_usage();

        InstanceSnapshot {
            instance_id: self.instance_id.clone(),
            open_connections: stats.open_connections,
            accepted_total: stats.accepted_total,
            uptime_secs: self.started_at.elapsed().as_secs(),
            memory_bytes,
            cpu_percent,
        }
    }

    /// CPU usage is measured since the previous refresh, so the first call reports 0.
    fn process_usage(&self) -> (u64, f32) {
        let Ok(pid) = sysinfo::get_current_pid() else {
            return (0, 0.0);
        };
        let mut system = self.system.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = system.refresh_processes(ProcessesToUpdate::Some(&[pid]), false);
        system
            .process(pid)
            .map_or((0, 0.0), |process| (process.memory(), process.cpu_usage()))
    }
}
