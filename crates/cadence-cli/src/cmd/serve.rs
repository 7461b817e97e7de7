use crate::cmd::Ctx;

/// Run the in-memory mock backend until Ctrl-C.
pub fn run(ctx: &Ctx, port: u16, seed: bool) -> anyhow::Result<()> {
    ctx.block_on(async move {
        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
        let actual_port = listener.local_addr()?.port();
        println!(
            "Mock backend on http://localhost:{actual_port}{}{}",
            cadence_server::API_PREFIX,
            if seed { " (demo data)" } else { "" }
        );

        tokio::select! {
            res = cadence_server::serve_on(listener, seed) => res,
            _ = tokio::signal::ctrl_c() => Ok(()),
        }
    })?
}
