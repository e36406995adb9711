use anyhow::Result;

use crate::init::AppContext;
use crate::server;

pub async fn handle_serve(ctx: &AppContext, bind: Option<&str>) -> Result<()> {
    let addr = bind.unwrap_or(&ctx.config.server.bind);
    server::serve(addr, ctx.app_state()).await?;
    Ok(())
}
