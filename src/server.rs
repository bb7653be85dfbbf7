use std::sync::Arc;

use tokio::{net::TcpListener, task::JoinSet};

use crate::{
    config::{Config, Interface},
    observer::Observer,
    session::Session,
};

/// Bind every configured interface and run its accept loop.
///
/// Each listener gets its own worker, the first one to exit takes the
/// whole server down.
pub async fn run<T>(config: Arc<Config>, observer: Arc<T>) -> anyhow::Result<()>
where
    T: Observer + 'static,
{
    let mut workers = JoinSet::new();

    for Interface { listen } in config.server.interfaces.iter().copied() {
        let listener = TcpListener::bind(listen).await?;
        log::info!("websocket server listening: interface={}", listen);

        workers.spawn(accept_loop(listener, observer.clone()));
    }

    if let Some(res) = workers.join_next().await {
        workers.abort_all();

        return res?;
    }

    Ok(())
}

/// Accept connections on one listener, one task per connection.
///
/// A failed session only ever takes down its own task, the listener
/// and every other session keep running.
pub async fn accept_loop<T>(listener: TcpListener, observer: Arc<T>) -> anyhow::Result<()>
where
    T: Observer + 'static,
{
    let local_addr = listener.local_addr()?;

    while let Ok((socket, addr)) = listener.accept().await {
        log::info!("tcp socket accept: addr={}, interface={}", addr, local_addr);

        // Disable the Nagle algorithm.
        // because to maintain real-time, any received data should be processed
        // as soon as possible.
        if let Err(e) = socket.set_nodelay(true) {
            log::error!("tcp socket set nodelay failed!: addr={}, err={}", addr, e);
        }

        let observer = observer.clone();
        tokio::spawn(async move {
            let mut session = Session::new(socket, addr, observer);
            match session.run().await {
                Ok(()) => {
                    log::info!("tcp socket disconnect: addr={}, interface={}", addr, local_addr)
                }
                Err(e) => log::error!("websocket session failed: addr={}, err={}", addr, e),
            }
        });
    }

    log::error!("tcp server close: interface={}", local_addr);
    Ok(())
}
