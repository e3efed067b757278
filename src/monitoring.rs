//! Modulo per il monitoraggio delle risorse del processo server
//!
//! Campiona a intervalli regolari CPU e memoria **del processo corrente**
//! tramite `sysinfo` e le riversa nel logging strutturato. Non misura la
//! macchina nel suo complesso: lo scopo è isolare il consumo del relay.

use std::time::Duration;
use sysinfo::{ProcessesToUpdate, System, get_current_pid};
use tokio::time;
use tracing::{error, info};

/// Configurazione del sampler di processo
pub struct MonitorConfig {
    /// Intervallo di campionamento in secondi
    pub interval_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: 120, // 2 minuti
        }
    }
}

/// Loop infinito di campionamento, da lanciare con tokio::spawn.
/// Il primo campione di CPU non è significativo (serve un delta tra due
/// refresh), per questo viene scartato.
pub async fn run_process_monitor(config: MonitorConfig) {
    let pid = match get_current_pid() {
        Ok(pid) => pid,
        Err(e) => {
            error!("Cannot resolve current pid, monitor disabled: {}", e);
            return;
        }
    };

    let mut system = System::new();
    let mut ticker = time::interval(Duration::from_secs(config.interval_secs));

    // primo refresh per inizializzare il delta CPU
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    ticker.tick().await;

    loop {
        ticker.tick().await;
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

        match system.process(pid) {
            Some(process) => {
                let memory_mb = process.memory() as f64 / (1024.0 * 1024.0);
                info!(
                    cpu_percent = process.cpu_usage(),
                    memory_mb = format!("{:.2}", memory_mb).as_str(),
                    "Process stats"
                );
            }
            None => {
                error!("Current process not found in sysinfo snapshot");
                return;
            }
        }
    }
}
