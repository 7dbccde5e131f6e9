use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::engine::EngineConfig;
use crate::simulation::PersistOptions;

/// Pallet parking simulator HTTP service
#[derive(Parser, Debug, Clone)]
#[command(name = "pallet-sim", version, about)]
pub struct Config {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Simulation workbook; relative paths resolve against the working directory
    #[arg(long, env = "SIMULACION_WORKBOOK", default_value = "simulacion.xlsx")]
    pub workbook: PathBuf,

    /// Sheet to simulate on; the first sheet is used if it does not exist
    #[arg(long, default_value = "cliente")]
    pub sheet: String,

    /// Path to the LibreOffice `soffice` executable. Searches PATH if omitted.
    #[arg(long, env = "SOFFICE_PATH")]
    pub soffice: Option<PathBuf>,

    /// Seconds a recalculation may run before the engine is killed
    #[arg(long, default_value_t = 60)]
    pub recalc_timeout_secs: u64,

    /// Seed for reproducible movement generation
    #[arg(long)]
    pub seed: Option<u64>,

    /// Copy the workbook aside before each write-back
    #[arg(long)]
    pub backup: bool,

    /// Never write the recalculated workbook back to disk
    #[arg(long)]
    pub no_persist: bool,
}

impl Config {
    pub fn workbook_path(&self) -> std::io::Result<PathBuf> {
        if self.workbook.is_absolute() {
            Ok(self.workbook.clone())
        } else {
            Ok(std::env::current_dir()?.join(&self.workbook))
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            soffice_path: self.soffice.clone(),
            timeout: Duration::from_secs(self.recalc_timeout_secs),
        }
    }

    pub fn persist_options(&self) -> PersistOptions {
        PersistOptions {
            disabled: self.no_persist,
            backup: self.backup,
        }
    }
}
