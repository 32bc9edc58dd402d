use std::path::PathBuf;

use agora::fixtures::Fixture;
use anyhow::{Context, Result};
use clap::Args;

use crate::context::{AppContext, AppStore};
use crate::examples::ExampleGroup;
use crate::output::OutputManager;

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Seeding",
    commands: &[
        "agora seed fixtures/demo.json          # Write the fixture into the configured store",
        "agora seed fixtures/demo.json --reset  # Clear the key prefix first",
    ],
}];

#[derive(Args)]
pub struct SeedArgs {
    /// JSON fixture mapping collection paths to documents
    pub path: PathBuf,

    /// Delete every document under the configured key prefix first
    #[arg(long)]
    pub reset: bool,
}

pub async fn handle_seed(args: SeedArgs, ctx: &AppContext, output: &OutputManager) -> Result<()> {
    let fixture = Fixture::from_file(&args.path)
        .with_context(|| format!("Failed to read fixture {}", args.path.display()))?;

    match &ctx.store {
        AppStore::Memory(_) => {
            output.warning("The memory backend does not persist; seeded data is dropped on exit");
        }
        AppStore::Redis(store) if args.reset => {
            let deleted = store.reset().await?;
            output.info(&format!(
                "Deleted {deleted} keys under '{}'",
                ctx.settings.store.key_prefix
            ));
        }
        AppStore::Redis(_) => {}
    }

    output.progress("Seeding");
    let written = fixture.load(&ctx.store).await?;
    output.clear_line();
    output.success(&format!("Seeded {written} documents from {}", args.path.display()));
    Ok(())
}
