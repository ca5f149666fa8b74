use crate::commands::{prepare, CommandResult};
use productmaster_db::{connect_with_config, migrations, seed_demo_catalog, SeedReport};

pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("seed") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let report = seed_demo_catalog(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8));

        pool.close().await;
        report
    });

    match result {
        Ok(report) => CommandResult::success("seed", seed_message(&report)),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn seed_message(report: &SeedReport) -> String {
    format!(
        "demo catalog loaded: {} products upserted ({} active, {} inactive)",
        report.upserted, report.active, report.inactive
    )
}
