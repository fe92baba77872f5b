pub mod employees;
pub mod penalties;
pub mod stats;

use std::path::{Path, PathBuf};

use clap::Args;
use muster_core::{ReadModel, SyncStore};

use crate::dataset::Dataset;
use crate::output::{CliError, OutputMode, render_error};

/// Dataset selection shared by every read command.
#[derive(Args, Debug, Clone)]
pub struct DataArgs {
    /// JSON dataset with employees, departments, designations and penalties.
    #[arg(long, value_name = "FILE")]
    pub data: PathBuf,
}

/// Load `path`, mirror it through a [`SyncStore`] and return the settled
/// read model.
///
/// Any slice that failed to sync is reported and fails the command.
pub fn open_model(path: &Path, output: OutputMode) -> anyhow::Result<ReadModel> {
    let collections = match Dataset::load(path).and_then(Dataset::into_collections) {
        Ok(collections) => collections,
        Err(err) => {
            render_error(
                output,
                &CliError::with_details(
                    format!("{err:#}"),
                    "pass a JSON object with employees, departments, designations and penalties arrays",
                    "dataset_unreadable",
                ),
            )?;
            return Err(err);
        }
    };

    let store = SyncStore::open(&collections);
    let model = store.snapshot();
    let failures = store.drain_failures();
    store.close();

    if let Some(failure) = failures.first() {
        render_error(
            output,
            &CliError::from_code(failure.error.code(), failure.to_string()),
        )?;
        anyhow::bail!("{} collection(s) failed to sync", failures.len());
    }

    Ok(model)
}
