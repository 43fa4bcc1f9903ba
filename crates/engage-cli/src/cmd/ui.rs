use anyhow::Context;
use engage_core::config::Config;
use std::path::Path;

pub fn run(root: &Path, port: Option<u16>, no_open: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let port = port.unwrap_or(config.server.port);
    let root_buf = root.to_path_buf();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{port}"))
            .await
            .with_context(|| format!("failed to bind port {port}"))?;
        let actual_port = listener.local_addr()?.port();
        println!(
            "engage API for '{}' → http://localhost:{actual_port}",
            config.workspace.name
        );

        tokio::select! {
            res = engage_server::serve_on(root_buf, listener, !no_open) => res,
            _ = tokio::signal::ctrl_c() => Ok(()),
        }
    })
}
