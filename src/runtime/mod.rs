pub mod report;

use std::{future::Future, sync::Arc, time::Duration};

use log::{info, warn};
use tokio::sync::watch;

use crate::{
    bundle::Bundle,
    cli::{Args, Format, PolicyLoader},
    error::PolicyError,
    policy::{HostDefaults, Restrictions},
    profile::{FileSource, ProfileManager, ShutdownSignal, WithOverrides, spawn_watcher},
};

pub use report::{Report, evaluate, render};

/// Evaluate the layers named by `args` and print the result
///
/// With `--watch`, keep re-evaluating whenever the provisioning file changes
/// until Ctrl-C.
pub async fn run(args: &Args) -> Result<(), PolicyError> {
    let loaded = PolicyLoader::load(args)?;
    let host: Arc<dyn HostDefaults> = Arc::new(loaded.host);
    let mut restrictions = Restrictions::new(host);
    let manager = Arc::new(ProfileManager::new(loaded.layers));

    let report = evaluate(&mut restrictions, &manager.merged(), &args.check_url);
    println!("{}", render(&report, args.format)?);

    let (true, Some(path)) = (args.watch, args.provisioning.as_ref()) else {
        return Ok(());
    };

    let source = WithOverrides::new(
        FileSource::primed(path)?,
        loaded.provisioning_base,
        loaded.overrides,
    );
    let shutdown = ShutdownSignal::new();
    let watcher = spawn_watcher(
        source,
        Arc::clone(&manager),
        Arc::clone(&shutdown),
        Duration::from_secs(args.interval.max(1)),
    );
    info!("watching {} for changes", path.display());

    let result = watch_changes(
        manager.subscribe(),
        &mut restrictions,
        &args.check_url,
        args.format,
        async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("failed to listen for Ctrl-C: {err}");
            }
        },
        |rendered| println!("{rendered}"),
    )
    .await;

    shutdown.shutdown();
    if let Err(err) = watcher.await {
        warn!("provisioning watcher ended abnormally: {err}");
    }
    result
}

/// Re-evaluate and emit a report for every merged bundle published on `rx`
/// until `stop` completes or the publisher goes away
pub async fn watch_changes<F>(
    mut rx: watch::Receiver<Bundle>,
    restrictions: &mut Restrictions,
    check_urls: &[String],
    format: Format,
    stop: F,
    mut emit: impl FnMut(String),
) -> Result<(), PolicyError>
where
    F: Future<Output = ()>,
{
    tokio::pin!(stop);
    loop {
        tokio::select! {
            _ = &mut stop => {
                info!("stopping");
                return Ok(());
            }
            changed = rx.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let bundle = rx.borrow_and_update().clone();
                let report = evaluate(restrictions, &bundle, check_urls);
                emit(render(&report, format)?);
            }
        }
    }
}
