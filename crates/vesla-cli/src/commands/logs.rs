use std::path::Path;

use vesla::engine::DEFAULT_LOG_TAIL;

pub async fn logs(config_dir: &Path, app: &str, tail: Option<usize>) -> anyhow::Result<()> {
    let pipeline = super::host_pipeline(config_dir)?;
    let tail = tail.unwrap_or(DEFAULT_LOG_TAIL);

    match pipeline.logs(app, tail).await? {
        Some(logs) => print!("{logs}"),
        None => anyhow::bail!("app not found: {app}"),
    }
    Ok(())
}
