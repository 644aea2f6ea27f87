use topoff_core::models::{BrewOperation, CoreError, CoreErrorKind, OutdatedPackage};
use topoff_core::orchestration::{OperationOutcome, UpdateOrchestrator};

pub async fn check(orchestrator: &UpdateOrchestrator) -> Result<(), CoreError> {
    if !orchestrator.refresh().await {
        return Err(CoreError::new(
            CoreErrorKind::Internal,
            "could not check for updates; see the log for details",
        )
        .attributed(BrewOperation::ListOutdated));
    }

    let snapshot = orchestrator.snapshot();
    print_outdated(&snapshot.visible_outdated_packages);
    Ok(())
}

pub async fn upgrade(
    orchestrator: &UpdateOrchestrator,
    package: Option<&str>,
    greedy: bool,
) -> Result<(), CoreError> {
    match package {
        Some(name) => match orchestrator.upgrade_package(name).await {
            OperationOutcome::Completed(Some(upgraded)) => {
                println!(
                    "  {} {} -> {}",
                    upgraded.name, upgraded.old_version, upgraded.new_version
                );
                Ok(())
            }
            OperationOutcome::Completed(None) => Ok(()),
            outcome => settle(outcome),
        },
        None => {
            let greedy = greedy || orchestrator.snapshot().settings.greedy_mode;
            match orchestrator.update_all(greedy).await {
                OperationOutcome::Completed(result) => {
                    for upgraded in &result.packages {
                        println!(
                            "  {} {} -> {}",
                            upgraded.name, upgraded.old_version, upgraded.new_version
                        );
                    }
                    Ok(())
                }
                outcome => settle(outcome),
            }
        }
    }
}

pub async fn cleanup(orchestrator: &UpdateOrchestrator) -> Result<(), CoreError> {
    match orchestrator.run_cleanup().await {
        OperationOutcome::Completed(result) => {
            println!("Cleanup freed {}", result.freed_space);
            Ok(())
        }
        outcome => settle(outcome),
    }
}

fn settle<T>(outcome: OperationOutcome<T>) -> Result<(), CoreError> {
    match outcome {
        OperationOutcome::Completed(_) => Ok(()),
        OperationOutcome::Skipped => {
            println!("Another operation is already running");
            Ok(())
        }
        OperationOutcome::Failed(error) => Err(error),
    }
}

fn print_outdated(packages: &[OutdatedPackage]) {
    if packages.is_empty() {
        println!("Everything is up to date!");
        return;
    }

    println!("{} outdated package(s):", packages.len());
    let width = packages
        .iter()
        .map(|package| package.name.len())
        .max()
        .unwrap_or(0);
    for package in packages {
        println!(
            "  {:width$}  {} -> {}",
            package.name, package.current_version, package.latest_version
        );
    }
}
