use anyhow::Result;
use clap::Args;
use facture_core::ProfileStore;
use std::path::PathBuf;

#[derive(Args)]
pub struct ProfilesArgs {
    /// Profile store (JSON object keyed by profile name)
    #[arg(long, env = "FACTURE_PROFILES_FILE", default_value = "profiles.json")]
    pub profiles_file: PathBuf,
}

/// List the profile names available in the store
pub fn execute(args: &ProfilesArgs) -> Result<()> {
    let store = ProfileStore::load(&args.profiles_file)?;
    let names = store.names();

    if names.is_empty() {
        println!("No profiles defined in {}", args.profiles_file.display());
        return Ok(());
    }

    println!("Available profiles:");
    for name in names {
        println!("  {name}");
    }

    Ok(())
}
