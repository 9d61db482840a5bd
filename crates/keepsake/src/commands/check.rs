//! Check-config command - validates configuration without serving.

use anyhow::Result;
use clap::Args;
use keepsake_session::StoreRegistry;

use super::Context;

/// Arguments for the check-config command.
#[derive(Args, Debug)]
pub struct CheckArgs {}

/// Run the check-config command.
pub fn run(_args: CheckArgs, ctx: &Context) -> Result<()> {
    let config = ctx.load_config()?;

    // Resolve the backend the same way `serve` would, without installing.
    StoreRegistry::with_memory().get(&config.session.backend)?;

    let store = config.session.store_config();
    println!("backend           = {}", config.session.backend);
    println!("cookie_name       = {}", config.session.cookie_name);
    println!("max_lifetime_secs = {}", store.max_idle.as_secs());
    println!("gc_interval_secs  = {}", store.gc_interval().as_secs());
    println!("bind              = {}", config.server.bind);
    println!("request_logging   = {}", config.server.request_logging);
    Ok(())
}
