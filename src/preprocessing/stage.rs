//! Preparation stage: resolve raw data, clean, split, persist

use super::prepare::{DataPreparer, PreparationReport};
use super::split::SplitConfig;
use crate::artifacts::{Artifact, ArtifactResolver, PublishAck};
use crate::config::Settings;
use crate::error::Result;
use crate::utils::{DataLoader, DataSaver, Timer};
use serde::Serialize;
use tracing::{info, warn};

/// Result of a preparation stage run
#[derive(Debug, Clone, Serialize)]
pub struct PreparationOutcome {
    pub report: PreparationReport,
    pub train: PublishAck,
    pub test: PublishAck,
}

/// Run the preparation stage end to end
pub fn run_preparation(settings: &Settings, resolver: &ArtifactResolver) -> Result<PreparationOutcome> {
    let timer = Timer::start();

    let raw_path = resolver.resolve(Artifact::RawDataset)?;
    info!(path = %raw_path.display(), "Loading raw dataset");
    let raw = DataLoader::new().load_csv(&raw_path)?;

    let preparer = DataPreparer::new(SplitConfig::new(settings.test_size, settings.random_state));
    let mut prepared = preparer.prepare_with_report(&raw)?;

    let train_path = settings.train_file();
    let test_path = settings.test_file();
    DataSaver::save_csv(&mut prepared.train, &train_path)?;
    DataSaver::save_csv(&mut prepared.test, &test_path)?;

    let train = resolver.publish(&train_path, Artifact::TrainSplit)?;
    let test = resolver.publish(&test_path, Artifact::TestSplit)?;
    for ack in [&train, &test] {
        if !ack.remote_stored() {
            warn!(artifact = %ack.artifact, remote = ?ack.remote, "Split kept locally only");
        }
    }

    info!(
        train = %train.local_path.display(),
        test = %test.local_path.display(),
        elapsed_secs = timer.elapsed_secs(),
        "Preparation stage complete"
    );

    Ok(PreparationOutcome {
        report: prepared.report,
        train,
        test,
    })
}
